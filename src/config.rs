//! Configuration for the x402-monero payment client.

use clap::Parser;
use std::time::Duration;
use url::Url;
use x402_monero_types::amount::MoneyAmount;
use x402_monero_types::network::MoneroNetwork;

use crate::proof::{ProofStrategy, TxKeyPolicy};

/// CLI arguments and environment configuration for one flow invocation.
///
/// Every field falls back to an environment variable, so the binary runs
/// unattended from a `.env` file as well as interactively.
#[derive(Parser, Debug, Clone)]
#[command(name = "x402-monero")]
#[command(about = "Pay a Monero x402 invoice and prove the payment")]
pub struct Config {
    /// Base URL of the facilitator API
    #[arg(long, env = "FACILITATOR_URL", default_value = "http://localhost:3113")]
    pub facilitator_url: Url,

    /// JSON-RPC endpoint of the paying wallet daemon
    #[arg(
        long,
        env = "WALLET_RPC_URL",
        default_value = "http://localhost:18084/json_rpc"
    )]
    pub wallet_rpc_url: Url,

    /// URL of the payment-gated resource; required for the header-retry
    /// strategy and for challenge-based invoicing
    #[arg(long, env = "RESOURCE_URL")]
    pub resource_url: Option<Url>,

    /// Monero network the facilitator settles on
    #[arg(long, env = "XMR_NETWORK", default_value = "monero:stagenet")]
    pub network: MoneroNetwork,

    /// USD price to request an invoice for, e.g. "$0.10"
    #[arg(long, env = "AMOUNT_USD", default_value = "$0.10")]
    pub amount_usd: MoneyAmount,

    /// Correlation metadata attached to the invoice request
    #[arg(long, env = "INVOICE_METADATA")]
    pub metadata: Option<String>,

    /// Obtain the invoice by fetching the resource and parsing its 402
    /// challenge instead of calling POST /invoices
    #[arg(long, env = "FROM_CHALLENGE", default_value_t = false)]
    pub from_challenge: bool,

    /// Protocol variant carrying the payment evidence
    #[arg(long, env = "PROOF_STRATEGY", value_enum, default_value_t = ProofStrategy::Verify)]
    pub strategy: ProofStrategy,

    /// Whether the wallet is asked for the private transaction key
    #[arg(long, env = "TX_KEY_POLICY", value_enum, default_value_t = TxKeyPolicy::Required)]
    pub tx_key_policy: TxKeyPolicy,

    /// Seconds to wait for mempool propagation between payment and proof
    #[arg(long, env = "PROPAGATION_WAIT_SECS", default_value_t = 15)]
    pub propagation_wait_secs: u64,

    /// Poll interval of the propagation wait; bounds cancellation latency
    #[arg(long, env = "PROPAGATION_POLL_SECS", default_value_t = 1)]
    pub propagation_poll_secs: u64,

    /// Client-enforced timeout for every HTTP request
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value_t = 30)]
    pub http_timeout_secs: u64,
}

/// Configuration errors found after parsing.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("the {0} strategy requires --resource-url")]
    ResourceUrlRequired(ProofStrategy),
    #[error("--from-challenge requires --resource-url")]
    ChallengeRequiresResourceUrl,
}

impl Config {
    /// Cross-field validation clap cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resource_url.is_none() {
            if self.strategy == ProofStrategy::HeaderRetry {
                return Err(ConfigError::ResourceUrlRequired(self.strategy));
            }
            if self.from_challenge {
                return Err(ConfigError::ChallengeRequiresResourceUrl);
            }
        }
        Ok(())
    }

    pub fn propagation_wait(&self) -> Duration {
        Duration::from_secs(self.propagation_wait_secs)
    }

    pub fn propagation_poll(&self) -> Duration {
        Duration::from_secs(self.propagation_poll_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
