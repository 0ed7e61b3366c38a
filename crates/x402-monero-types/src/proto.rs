//! Wire format types for the Monero x402 payment flow.
//!
//! These types mirror the facilitator HTTP API and the 402 challenge body:
//!
//! - [`CreateInvoiceRequest`] / [`Invoice`] - `POST /invoices` and
//!   `GET /invoices/{address}` messages
//! - [`PaymentChallenge`] - inline 402 response body from a protected resource
//! - [`PaymentProof`] - payment evidence, also the `POST /verify` body
//! - [`SettleRequest`] / [`SettleOutcome`] - `POST /settle` envelope and answer
//! - [`VerifyOutcome`] - `POST /verify` answer
//! - [`SettlementResult`] - client-side normalization of either answer

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Display;

use crate::amount::Piconero;
use crate::network::MoneroNetwork;

/// Proof header carrying the paid-to address on a header-retry request.
pub const X_MONERO_ADDRESS: &str = "x-monero-address";
/// Proof header carrying the transaction id on a header-retry request.
pub const X_MONERO_TX_ID: &str = "x-monero-tx-id";
/// Proof header carrying the private transaction key on a header-retry request.
pub const X_MONERO_TX_KEY: &str = "x-monero-tx-key";

/// The payment scheme identifier used by the Monero facilitator.
pub const SCHEME_EXACT: &str = "exact";

/// Body of `POST /invoices`: ask the facilitator to price and issue an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateInvoiceRequest {
    /// Price in USD; the facilitator converts to piconero at issuance time.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount_usd: Decimal,
    /// Opaque correlation string; the facilitator may reuse a pending invoice
    /// issued for the same metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

/// A facilitator-issued request for payment of a specific amount to a
/// specific address. Immutable once issued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    /// Chain-specific receiving address, unique per invoice.
    pub address: String,
    /// Amount due in atomic units.
    pub amount_piconero: Piconero,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<MoneroNetwork>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

/// Inline challenge body of a 402 response from a protected resource.
///
/// `address` and `amount_piconero` are mandatory: a body missing either is a
/// malformed challenge, never "no payment needed". The remaining fields are
/// advisory and tolerated when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentChallenge {
    pub address: String,
    pub amount_piconero: Piconero,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<String>,
}

impl From<PaymentChallenge> for Invoice {
    fn from(challenge: PaymentChallenge) -> Self {
        let network = challenge
            .network
            .as_deref()
            .and_then(|n| n.parse::<MoneroNetwork>().ok());
        Invoice {
            address: challenge.address,
            amount_piconero: challenge.amount_piconero,
            invoice_id: challenge.invoice_id,
            status: None,
            network,
            metadata: None,
        }
    }
}

/// Payment evidence tying a wallet transaction to an invoice address.
///
/// With `tx_key` present this is a private spend proof verifiable by anyone
/// holding the key and the transaction id; without it, the evidence is
/// address correlation only. Serializes directly as the `POST /verify` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentProof {
    pub address: String,
    pub tx_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_key: Option<String>,
}

/// Payment terms echoed back to the facilitator in a settle envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequirements {
    pub scheme: String,
    pub network: MoneroNetwork,
}

impl PaymentRequirements {
    /// The `exact` scheme on the given network.
    pub fn exact(network: MoneroNetwork) -> Self {
        Self {
            scheme: SCHEME_EXACT.to_string(),
            network,
        }
    }
}

/// Body of `POST /settle`: the proof wrapped in the x402 envelope that
/// distinguishes the payment payload from the payment requirements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleRequest {
    pub payment_payload: PaymentProof,
    pub payment_requirements: PaymentRequirements,
}

/// Answer to `POST /settle`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettleOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<MoneroNetwork>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,
}

/// Answer to `POST /verify`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyOutcome {
    pub status: SettlementStatus,
    pub amount_received: Piconero,
}

/// Facilitator-reported settlement state of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementStatus {
    Pending,
    Paid,
    Failed,
}

impl Display for SettlementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettlementStatus::Pending => write!(f, "pending"),
            SettlementStatus::Paid => write!(f, "paid"),
            SettlementStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Client-side normalization of a facilitator's verify or settle answer.
///
/// Read-only to the client: repeated submission of the same proof is expected
/// to yield the same result, an invariant the facilitator upholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementResult {
    pub status: SettlementStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_received: Option<Piconero>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<MoneroNetwork>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
}

impl From<VerifyOutcome> for SettlementResult {
    fn from(outcome: VerifyOutcome) -> Self {
        SettlementResult {
            status: outcome.status,
            amount_received: Some(outcome.amount_received),
            network: None,
            payer: None,
        }
    }
}

impl SettlementResult {
    /// Normalizes a successful settle answer. Callers must branch on
    /// `success == false` before reaching for this.
    pub fn from_settled(outcome: SettleOutcome) -> Self {
        SettlementResult {
            status: SettlementStatus::Paid,
            amount_received: None,
            network: outcome.network,
            payer: outcome.payer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settle_request_uses_camel_case_envelope() {
        let request = SettleRequest {
            payment_payload: PaymentProof {
                address: "4xyz".to_string(),
                tx_id: "abc".to_string(),
                tx_key: Some("k1".to_string()),
            },
            payment_requirements: PaymentRequirements::exact(MoneroNetwork::Stagenet),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "paymentPayload": {
                    "address": "4xyz",
                    "tx_id": "abc",
                    "tx_key": "k1"
                },
                "paymentRequirements": {
                    "scheme": "exact",
                    "network": "monero:stagenet"
                }
            })
        );
    }

    #[test]
    fn payment_proof_omits_absent_tx_key() {
        let proof = PaymentProof {
            address: "4abc".to_string(),
            tx_id: "def".to_string(),
            tx_key: None,
        };
        let json = serde_json::to_value(&proof).unwrap();
        assert!(json.get("tx_key").is_none());
    }

    #[test]
    fn challenge_requires_amount_piconero() {
        let missing_amount = serde_json::json!({ "address": "4abc" });
        assert!(serde_json::from_value::<PaymentChallenge>(missing_amount).is_err());

        let missing_address = serde_json::json!({ "amount_piconero": 500 });
        assert!(serde_json::from_value::<PaymentChallenge>(missing_address).is_err());
    }

    #[test]
    fn challenge_tolerates_advisory_fields() {
        let body = serde_json::json!({
            "protocol": "monero",
            "network": "stagenet",
            "address": "4abc",
            "amount_piconero": 500,
            "invoice_id": "inv-1"
        });
        let challenge: PaymentChallenge = serde_json::from_value(body).unwrap();
        let invoice = Invoice::from(challenge);
        assert_eq!(invoice.address, "4abc");
        assert_eq!(invoice.amount_piconero, Piconero(500));
        assert_eq!(invoice.network, Some(MoneroNetwork::Stagenet));
    }

    #[test]
    fn settlement_status_is_lowercase_on_the_wire() {
        let paid: SettlementStatus = serde_json::from_str("\"paid\"").unwrap();
        assert_eq!(paid, SettlementStatus::Paid);
        assert_eq!(serde_json::to_string(&SettlementStatus::Failed).unwrap(), "\"failed\"");
    }

    #[test]
    fn verify_outcome_normalizes_to_settlement_result() {
        let outcome = VerifyOutcome {
            status: SettlementStatus::Paid,
            amount_received: Piconero(1000),
        };
        let result = SettlementResult::from(outcome);
        assert_eq!(result.status, SettlementStatus::Paid);
        assert_eq!(result.amount_received, Some(Piconero(1000)));
    }

    #[test]
    fn create_invoice_request_serializes_usd_as_number() {
        let request = CreateInvoiceRequest {
            amount_usd: Decimal::new(10, 2),
            metadata: Some("agent_request".to_string()),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["amount_usd"], serde_json::json!(0.1));
        assert_eq!(json["metadata"], serde_json::json!("agent_request"));
    }
}
