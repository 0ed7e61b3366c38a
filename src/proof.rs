//! Proof submission strategies.
//!
//! The facilitator ecosystem exposes three ways to prove a payment:
//!
//! - **Verify**: `POST /verify` with the flat proof body
//! - **Settle**: `POST /settle` with the x402 envelope
//! - **Header-retry**: re-request the protected resource with `x-monero-*`
//!   proof headers
//!
//! The variant is selected by configuration, never guessed, and all three
//! normalize into one [`SubmissionOutcome`]. A rejected proof is an ordinary
//! [`SubmissionOutcome::Declined`] value carrying the server's diagnostic
//! payload; only transport and deserialization failures are errors.

use clap::ValueEnum;
use reqwest::StatusCode;
use std::fmt;
use std::fmt::Display;
use x402_monero_types::network::MoneroNetwork;
use x402_monero_types::proto::{
    PaymentProof, PaymentRequirements, SettleRequest, SettlementResult, SettlementStatus,
};

use crate::facilitator::{FacilitatorClient, FacilitatorClientError};
use crate::resource::{ResourceClient, ResourceClientError};

/// Which protocol variant carries the payment evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProofStrategy {
    /// `POST /verify` with `{address, tx_id, tx_key?}`.
    Verify,
    /// `POST /settle` with the `paymentPayload`/`paymentRequirements` envelope.
    Settle,
    /// Re-request the protected resource with proof headers.
    HeaderRetry,
}

impl Display for ProofStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProofStrategy::Verify => write!(f, "verify"),
            ProofStrategy::Settle => write!(f, "settle"),
            ProofStrategy::HeaderRetry => write!(f, "header-retry"),
        }
    }
}

/// Whether the wallet is asked for the private transaction key.
///
/// `Required` yields a proof verifiable by anyone holding the key and the
/// transaction id. `AddressOnly` relies on address correlation, weaker
/// evidence some facilitators reject; choosing it is an explicit decision,
/// never a fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TxKeyPolicy {
    Required,
    AddressOnly,
}

impl TxKeyPolicy {
    /// True when the wallet should be asked for the proof key.
    pub fn wants_proof_key(&self) -> bool {
        matches!(self, TxKeyPolicy::Required)
    }
}

impl Display for TxKeyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxKeyPolicy::Required => write!(f, "required"),
            TxKeyPolicy::AddressOnly => write!(f, "address-only"),
        }
    }
}

/// Result of submitting payment evidence. Declined is a value, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    /// The facilitator recognizes the payment as settled.
    Confirmed(SettlementResult),
    /// Header-retry unlocked the resource; the body is the payload.
    Unlocked { body: String },
    /// The proof was rejected or the payment not recognized.
    Declined {
        /// HTTP status of the rejection, when one was received.
        status: Option<StatusCode>,
        /// Server-provided diagnostic payload, verbatim.
        detail: String,
    },
}

/// Errors surfaced by proof submission. Transport only: a rejected proof is
/// a [`SubmissionOutcome::Declined`], never an `Err`.
#[derive(Debug, thiserror::Error)]
pub enum ProofSubmissionError {
    #[error(transparent)]
    Facilitator(#[from] FacilitatorClientError),
    #[error(transparent)]
    Resource(#[from] ResourceClientError),
    #[error("the {0} strategy requires a protected resource URL")]
    MissingResource(ProofStrategy),
}

/// Submits payment evidence via the configured strategy.
pub struct ProofSubmitter {
    strategy: ProofStrategy,
    facilitator: FacilitatorClient,
    resource: Option<ResourceClient>,
    network: MoneroNetwork,
}

impl ProofSubmitter {
    pub fn new(
        strategy: ProofStrategy,
        facilitator: FacilitatorClient,
        resource: Option<ResourceClient>,
        network: MoneroNetwork,
    ) -> Self {
        Self {
            strategy,
            facilitator,
            resource,
            network,
        }
    }

    /// Returns the configured strategy.
    pub fn strategy(&self) -> ProofStrategy {
        self.strategy
    }

    /// Submits the proof once and interprets the answer.
    ///
    /// A non-200 from `/verify` or `/settle`, a `success=false`, or a
    /// `status != "paid"` all come back as [`SubmissionOutcome::Declined`];
    /// the caller branches on the outcome explicitly.
    pub async fn submit(
        &self,
        proof: &PaymentProof,
    ) -> Result<SubmissionOutcome, ProofSubmissionError> {
        tracing::info!(strategy = %self.strategy, tx_id = %proof.tx_id, "Submitting payment proof");
        match self.strategy {
            ProofStrategy::Verify => self.submit_verify(proof).await,
            ProofStrategy::Settle => self.submit_settle(proof).await,
            ProofStrategy::HeaderRetry => self.submit_header_retry(proof).await,
        }
    }

    async fn submit_verify(
        &self,
        proof: &PaymentProof,
    ) -> Result<SubmissionOutcome, ProofSubmissionError> {
        match self.facilitator.verify(proof).await {
            Ok(outcome) => {
                if outcome.status == SettlementStatus::Paid {
                    Ok(SubmissionOutcome::Confirmed(outcome.into()))
                } else {
                    Ok(SubmissionOutcome::Declined {
                        status: None,
                        detail: serde_json::to_string(&outcome)
                            .unwrap_or_else(|_| format!("{outcome:?}")),
                    })
                }
            }
            Err(FacilitatorClientError::HttpStatus { status, body, .. }) => {
                Ok(SubmissionOutcome::Declined {
                    status: Some(status),
                    detail: body,
                })
            }
            Err(other) => Err(other.into()),
        }
    }

    async fn submit_settle(
        &self,
        proof: &PaymentProof,
    ) -> Result<SubmissionOutcome, ProofSubmissionError> {
        let request = SettleRequest {
            payment_payload: proof.clone(),
            payment_requirements: PaymentRequirements::exact(self.network),
        };
        match self.facilitator.settle(&request).await {
            Ok(outcome) => {
                if outcome.success {
                    Ok(SubmissionOutcome::Confirmed(SettlementResult::from_settled(
                        outcome,
                    )))
                } else {
                    Ok(SubmissionOutcome::Declined {
                        status: None,
                        detail: serde_json::to_string(&outcome)
                            .unwrap_or_else(|_| format!("{outcome:?}")),
                    })
                }
            }
            Err(FacilitatorClientError::HttpStatus { status, body, .. }) => {
                Ok(SubmissionOutcome::Declined {
                    status: Some(status),
                    detail: body,
                })
            }
            Err(other) => Err(other.into()),
        }
    }

    async fn submit_header_retry(
        &self,
        proof: &PaymentProof,
    ) -> Result<SubmissionOutcome, ProofSubmissionError> {
        let resource = self
            .resource
            .as_ref()
            .ok_or(ProofSubmissionError::MissingResource(self.strategy))?;
        let reply = resource.retry_with_proof(proof).await?;
        if reply.status == StatusCode::OK {
            Ok(SubmissionOutcome::Unlocked { body: reply.body })
        } else {
            Ok(SubmissionOutcome::Declined {
                status: Some(reply.status),
                detail: reply.body,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};
    use x402_monero_types::amount::Piconero;

    fn proof_with_key() -> PaymentProof {
        PaymentProof {
            address: "4xyz".to_string(),
            tx_id: "abc".to_string(),
            tx_key: Some("k1".to_string()),
        }
    }

    fn submitter(
        strategy: ProofStrategy,
        server: &MockServer,
        resource: Option<ResourceClient>,
    ) -> ProofSubmitter {
        let facilitator = FacilitatorClient::try_from(server.uri()).unwrap();
        ProofSubmitter::new(strategy, facilitator, resource, MoneroNetwork::Stagenet)
    }

    #[tokio::test]
    async fn settle_scenario_confirms_with_payer() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/settle"))
            .and(body_json(serde_json::json!({
                "paymentPayload": {"address": "4xyz", "tx_id": "abc", "tx_key": "k1"},
                "paymentRequirements": {"scheme": "exact", "network": "monero:stagenet"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "network": "monero:stagenet",
                "payer": "anonymous",
                "transaction": "abc"
            })))
            .mount(&mock_server)
            .await;

        let outcome = submitter(ProofStrategy::Settle, &mock_server, None)
            .submit(&proof_with_key())
            .await
            .unwrap();

        match outcome {
            SubmissionOutcome::Confirmed(result) => {
                assert_eq!(result.status, SettlementStatus::Paid);
                assert_eq!(result.network, Some(MoneroNetwork::Stagenet));
                assert!(result.payer.is_some());
            }
            other => panic!("expected Confirmed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn settle_failure_is_declined_not_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/settle"))
            .respond_with(ResponseTemplate::new(400).set_body_string(
                r#"{"error":"Payment failed. Received: 0/1000 piconero."}"#,
            ))
            .mount(&mock_server)
            .await;

        let outcome = submitter(ProofStrategy::Settle, &mock_server, None)
            .submit(&proof_with_key())
            .await
            .unwrap();

        match outcome {
            SubmissionOutcome::Declined { status, detail } => {
                assert_eq!(status, Some(StatusCode::BAD_REQUEST));
                assert!(detail.contains("Received: 0/1000"));
            }
            other => panic!("expected Declined, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn verify_pending_status_is_declined() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/verify"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "pending",
                "amount_received": 0
            })))
            .mount(&mock_server)
            .await;

        let outcome = submitter(ProofStrategy::Verify, &mock_server, None)
            .submit(&proof_with_key())
            .await
            .unwrap();

        match outcome {
            SubmissionOutcome::Declined { detail, .. } => {
                assert!(detail.contains("pending"));
            }
            other => panic!("expected Declined, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn verify_paid_confirms_with_amount() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/verify"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "paid",
                "amount_received": 1000
            })))
            .mount(&mock_server)
            .await;

        let outcome = submitter(ProofStrategy::Verify, &mock_server, None)
            .submit(&proof_with_key())
            .await
            .unwrap();

        match outcome {
            SubmissionOutcome::Confirmed(result) => {
                assert_eq!(result.amount_received, Some(Piconero(1000)));
            }
            other => panic!("expected Confirmed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn resubmission_yields_the_same_result() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/verify"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "paid",
                "amount_received": 1000
            })))
            .mount(&mock_server)
            .await;

        let submitter = submitter(ProofStrategy::Verify, &mock_server, None);
        let proof = proof_with_key();
        let first = submitter.submit(&proof).await.unwrap();
        let second = submitter.submit(&proof).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn header_retry_unlocks_on_200() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/content"))
            .and(header("x-monero-address", "4xyz"))
            .and(header("x-monero-tx-id", "abc"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ACCESS_GRANTED"))
            .mount(&mock_server)
            .await;

        let resource =
            ResourceClient::new(format!("{}/content", mock_server.uri()).parse().unwrap());
        let outcome = submitter(ProofStrategy::HeaderRetry, &mock_server, Some(resource))
            .submit(&proof_with_key())
            .await
            .unwrap();

        match outcome {
            SubmissionOutcome::Unlocked { body } => assert_eq!(body, "ACCESS_GRANTED"),
            other => panic!("expected Unlocked, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn header_retry_without_resource_url_is_an_error() {
        let mock_server = MockServer::start().await;
        let err = submitter(ProofStrategy::HeaderRetry, &mock_server, None)
            .submit(&proof_with_key())
            .await
            .unwrap_err();
        assert!(matches!(err, ProofSubmissionError::MissingResource(_)));
    }

    #[tokio::test]
    async fn address_only_evidence_declined_when_facilitator_insists_on_key() {
        let mock_server = MockServer::start().await;
        // This gate wants the spend proof, not just address correlation.
        Mock::given(method("GET"))
            .and(path("/content"))
            .respond_with(
                ResponseTemplate::new(403).set_body_string(r#"{"error":"tx_key required"}"#),
            )
            .mount(&mock_server)
            .await;

        let resource =
            ResourceClient::new(format!("{}/content", mock_server.uri()).parse().unwrap());
        let outcome = submitter(ProofStrategy::HeaderRetry, &mock_server, Some(resource))
            .submit(&PaymentProof {
                address: "4abc".to_string(),
                tx_id: "abc".to_string(),
                tx_key: None,
            })
            .await
            .unwrap();

        match outcome {
            SubmissionOutcome::Declined { status, detail } => {
                assert_eq!(status, Some(StatusCode::FORBIDDEN));
                assert!(detail.contains("tx_key required"));
            }
            other => panic!("expected Declined, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn address_only_evidence_unlocks_when_accepted() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/content"))
            .and(header("x-monero-address", "4abc"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ACCESS_GRANTED"))
            .mount(&mock_server)
            .await;

        let resource =
            ResourceClient::new(format!("{}/content", mock_server.uri()).parse().unwrap());
        let outcome = submitter(ProofStrategy::HeaderRetry, &mock_server, Some(resource))
            .submit(&PaymentProof {
                address: "4abc".to_string(),
                tx_id: "abc".to_string(),
                tx_key: None,
            })
            .await
            .unwrap();

        assert!(matches!(outcome, SubmissionOutcome::Unlocked { .. }));
    }
}
