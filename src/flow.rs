//! The payment flow orchestrator.
//!
//! Sequences one complete pay-per-request cycle:
//!
//! ```text
//! START -> INVOICED -> PAID -> PROPAGATING -> PROOF_SUBMITTED -> {CONFIRMED | DECLINED}
//! ```
//!
//! No state is re-entered and the flow is not resumable: each invocation is a
//! fresh attempt against a fresh or still-open invoice. Proof submission runs
//! exactly once per invocation; a Declined outcome is reported, never retried
//! automatically. On confirmation, one read-only invoice-status lookup runs
//! for observability and degrades to a warning if it fails.

use reqwest::StatusCode;
use rust_decimal::Decimal;
use std::fmt;
use std::fmt::Display;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use x402_monero_types::proto::{
    CreateInvoiceRequest, Invoice, PaymentProof, SettlementResult,
};

use crate::facilitator::{FacilitatorClient, FacilitatorClientError};
use crate::proof::{ProofSubmissionError, ProofSubmitter, SubmissionOutcome, TxKeyPolicy};
use crate::resource::{FetchOutcome, ResourceClient, ResourceClientError};
use crate::wallet::{WalletClientError, WalletRpcClient};

/// States of one flow invocation, in order. Logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Start,
    Invoiced,
    Paid,
    Propagating,
    ProofSubmitted,
    Confirmed,
    Declined,
}

impl Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowState::Start => write!(f, "START"),
            FlowState::Invoiced => write!(f, "INVOICED"),
            FlowState::Paid => write!(f, "PAID"),
            FlowState::Propagating => write!(f, "PROPAGATING"),
            FlowState::ProofSubmitted => write!(f, "PROOF_SUBMITTED"),
            FlowState::Confirmed => write!(f, "CONFIRMED"),
            FlowState::Declined => write!(f, "DECLINED"),
        }
    }
}

/// How the flow obtains its invoice.
pub enum InvoiceSource {
    /// `POST /invoices` with a USD price and optional correlation metadata.
    Request {
        amount_usd: Decimal,
        metadata: Option<String>,
    },
    /// Fetch the protected resource and parse its 402 challenge.
    Challenge(ResourceClient),
}

/// Terminal result of one flow invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowOutcome {
    /// The facilitator recognizes the payment as settled.
    Confirmed {
        settlement: SettlementResult,
        /// The final-state lookup, when it succeeded.
        invoice: Option<Invoice>,
    },
    /// The resource is unlocked; the body is the payload.
    Unlocked {
        body: String,
        invoice: Option<Invoice>,
    },
    /// The proof was rejected; the detail is the server's diagnostic payload.
    Declined {
        status: Option<StatusCode>,
        detail: String,
    },
}

/// Errors that terminate the flow before a settlement decision.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("invoice step failed: {0}")]
    Facilitator(#[from] FacilitatorClientError),
    #[error("resource step failed: {0}")]
    Resource(#[from] ResourceClientError),
    #[error("payment step failed: {0}")]
    Wallet(#[from] WalletClientError),
    #[error("proof submission failed: {0}")]
    Submission(#[from] ProofSubmissionError),
    /// The operator cancelled during the propagation wait. Funds are already
    /// sent; no proof was submitted.
    #[error("flow interrupted during propagation wait")]
    Interrupted,
}

/// Bounded, cancellable wait for mempool propagation.
///
/// The facilitator watches the pending-transaction pool rather than requiring
/// block confirmation; this wait makes propagation overwhelmingly likely but
/// is not a correctness guarantee. The total wait is split into poll
/// intervals so cancellation takes effect within one interval.
#[derive(Debug, Clone, Copy)]
pub struct PropagationWait {
    total: Duration,
    interval: Duration,
}

impl PropagationWait {
    pub fn new(total: Duration, interval: Duration) -> Self {
        Self { total, interval }
    }

    /// Waits for the configured total. Returns false if cancelled early.
    pub async fn wait(&self, cancel: &CancellationToken) -> bool {
        let mut remaining = self.total;
        while !remaining.is_zero() {
            let step = if self.interval.is_zero() {
                remaining
            } else {
                remaining.min(self.interval)
            };
            tokio::select! {
                _ = cancel.cancelled() => return false,
                _ = tokio::time::sleep(step) => {}
            }
            remaining -= step;
        }
        true
    }
}

/// One-shot orchestrator for the pay-and-prove cycle.
pub struct PaymentFlow {
    facilitator: FacilitatorClient,
    wallet: WalletRpcClient,
    submitter: ProofSubmitter,
    tx_key_policy: TxKeyPolicy,
    wait: PropagationWait,
}

impl PaymentFlow {
    pub fn new(
        facilitator: FacilitatorClient,
        wallet: WalletRpcClient,
        submitter: ProofSubmitter,
        tx_key_policy: TxKeyPolicy,
        wait: PropagationWait,
    ) -> Self {
        Self {
            facilitator,
            wallet,
            submitter,
            tx_key_policy,
            wait,
        }
    }

    /// Runs one complete flow invocation.
    ///
    /// Terminates with no side effects if the invoice cannot be obtained,
    /// and with funds sent but no proof submitted if the wallet succeeded
    /// and a later step failed.
    pub async fn run(
        &self,
        source: InvoiceSource,
        cancel: CancellationToken,
    ) -> Result<FlowOutcome, FlowError> {
        let mut state = FlowState::Start;

        let invoice = match source {
            InvoiceSource::Request {
                amount_usd,
                metadata,
            } => {
                self.facilitator
                    .create_invoice(&CreateInvoiceRequest {
                        amount_usd,
                        metadata,
                    })
                    .await?
            }
            InvoiceSource::Challenge(resource) => match resource.fetch().await? {
                FetchOutcome::Unlocked { body } => {
                    // The resource is not gated; there is nothing to pay.
                    tracing::info!("Resource served without a payment challenge");
                    return Ok(FlowOutcome::Unlocked {
                        body,
                        invoice: None,
                    });
                }
                FetchOutcome::PaymentRequired(challenge) => Invoice::from(challenge),
            },
        };
        self.advance(&mut state, FlowState::Invoiced);
        tracing::info!(
            address = %invoice.address,
            amount_piconero = %invoice.amount_piconero,
            "Invoice obtained"
        );

        let want_proof = self.tx_key_policy.wants_proof_key();
        let transfer = self
            .wallet
            .transfer(&invoice.address, invoice.amount_piconero, want_proof)
            .await?;
        self.advance(&mut state, FlowState::Paid);

        let proof = PaymentProof {
            address: invoice.address.clone(),
            tx_id: transfer.tx_hash,
            tx_key: transfer.tx_key,
        };

        self.advance(&mut state, FlowState::Propagating);
        if !self.wait.wait(&cancel).await {
            return Err(FlowError::Interrupted);
        }

        let outcome = self.submitter.submit(&proof).await?;
        self.advance(&mut state, FlowState::ProofSubmitted);

        match outcome {
            SubmissionOutcome::Confirmed(settlement) => {
                self.advance(&mut state, FlowState::Confirmed);
                let final_invoice = self.confirmation_read(&invoice.address).await;
                Ok(FlowOutcome::Confirmed {
                    settlement,
                    invoice: final_invoice,
                })
            }
            SubmissionOutcome::Unlocked { body } => {
                self.advance(&mut state, FlowState::Confirmed);
                let final_invoice = self.confirmation_read(&invoice.address).await;
                Ok(FlowOutcome::Unlocked {
                    body,
                    invoice: final_invoice,
                })
            }
            SubmissionOutcome::Declined { status, detail } => {
                self.advance(&mut state, FlowState::Declined);
                tracing::warn!(?status, %detail, "Proof declined by facilitator");
                Ok(FlowOutcome::Declined { status, detail })
            }
        }
    }

    /// The read-only final-state lookup. Failure degrades to a warning: the
    /// settlement decision is already made.
    async fn confirmation_read(&self, address: &str) -> Option<Invoice> {
        match self.facilitator.invoice_status(address).await {
            Ok(invoice) => Some(invoice),
            Err(err) => {
                tracing::warn!(error = %err, "Final invoice-status lookup failed");
                None
            }
        }
    }

    fn advance(&self, state: &mut FlowState, next: FlowState) {
        tracing::info!(from = %state, to = %next, "Flow transition");
        *state = next;
    }
}
