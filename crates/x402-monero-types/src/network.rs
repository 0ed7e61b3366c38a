//! Monero network identifiers.
//!
//! Networks are written CAIP-style on the wire (`monero:stagenet`), matching
//! the identifiers a facilitator advertises via its `/supported` endpoint.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Supported Monero networks.
///
/// Used to differentiate between test and production environments. The serde
/// representation is the CAIP-style identifier, e.g. `monero:stagenet`.
#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoneroNetwork {
    /// Monero mainnet.
    #[serde(rename = "monero:mainnet")]
    Mainnet,
    /// Monero stagenet, the public staging network with valueless coins.
    #[serde(rename = "monero:stagenet")]
    Stagenet,
    /// Monero testnet, the development network.
    #[serde(rename = "monero:testnet")]
    Testnet,
}

impl Display for MoneroNetwork {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MoneroNetwork::Mainnet => write!(f, "monero:mainnet"),
            MoneroNetwork::Stagenet => write!(f, "monero:stagenet"),
            MoneroNetwork::Testnet => write!(f, "monero:testnet"),
        }
    }
}

impl From<MoneroNetwork> for String {
    fn from(network: MoneroNetwork) -> Self {
        network.to_string()
    }
}

impl MoneroNetwork {
    /// Return all known [`MoneroNetwork`] variants.
    pub fn variants() -> &'static [MoneroNetwork] {
        &[
            MoneroNetwork::Mainnet,
            MoneroNetwork::Stagenet,
            MoneroNetwork::Testnet,
        ]
    }
}

/// Error for an unrecognized network identifier.
#[derive(Debug, thiserror::Error)]
#[error("unknown Monero network: {0}")]
pub struct UnknownNetwork(String);

impl FromStr for MoneroNetwork {
    type Err = UnknownNetwork;

    /// Parses both the CAIP form (`monero:stagenet`) and the bare suffix
    /// (`stagenet`) as emitted inside 402 challenge bodies.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.strip_prefix("monero:").unwrap_or(s);
        match name {
            "mainnet" => Ok(MoneroNetwork::Mainnet),
            "stagenet" => Ok(MoneroNetwork::Stagenet),
            "testnet" => Ok(MoneroNetwork::Testnet),
            _ => Err(UnknownNetwork(s.to_string())),
        }
    }
}
