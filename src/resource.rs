//! Client for a payment-gated resource.
//!
//! A protected resource answers either `200` with the payload or
//! `402 Payment Required` with an inline challenge naming the receiving
//! address and the amount due. After paying, the client retries the same
//! request carrying the payment evidence as `x-monero-*` headers.
//!
//! A 402 body missing the required challenge fields is a protocol error,
//! never "no payment needed": the caller must not fall through to the
//! unpaid path on a parse failure.

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use url::Url;
use x402_monero_types::proto::{
    PaymentChallenge, PaymentProof, X_MONERO_ADDRESS, X_MONERO_TX_ID, X_MONERO_TX_KEY,
};

/// Result of fetching the protected resource without payment evidence.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// The resource is not gated (or already unlocked); the body is the payload.
    Unlocked { body: String },
    /// The server demands payment; the challenge names address and amount.
    PaymentRequired(PaymentChallenge),
}

/// Raw answer to a header-retry request. The proof layer decides what a
/// non-200 status means; this type only carries the facts.
#[derive(Debug, Clone)]
pub struct ProofReply {
    pub status: StatusCode,
    pub body: String,
}

/// Errors surfaced by the resource client.
#[derive(Debug, thiserror::Error)]
pub enum ResourceClientError {
    #[error("HTTP error fetching resource: {source}")]
    Http {
        #[source]
        source: reqwest::Error,
    },
    #[error("Resource request timed out")]
    Timeout,
    #[error("Failed to read resource response body: {source}")]
    BodyRead {
        #[source]
        source: reqwest::Error,
    },
    /// The server answered 402 but the challenge is missing required fields.
    #[error("Malformed 402 challenge: {detail}")]
    MalformedChallenge { detail: String },
    /// The resource answered with a status that is neither the payload nor a
    /// challenge.
    #[error("Unexpected HTTP status {status} from resource: {body}")]
    HttpStatus { status: StatusCode, body: String },
    /// Proof evidence contained bytes that cannot be sent as an HTTP header.
    #[error("Payment proof not representable as request headers")]
    InvalidProofHeader,
}

/// Client for one protected resource URL.
#[derive(Clone, Debug)]
pub struct ResourceClient {
    url: Url,
    client: Client,
    timeout: Option<Duration>,
}

impl ResourceClient {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            client: Client::new(),
            timeout: None,
        }
    }

    /// Sets a timeout for all future requests.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let mut this = self.clone();
        this.timeout = Some(timeout);
        this
    }

    /// Returns the resource URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Fetches the resource, expecting either the payload or a 402 challenge.
    pub async fn fetch(&self) -> Result<FetchOutcome, ResourceClientError> {
        let response = self.send(HeaderMap::new()).await?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ResourceClientError::BodyRead { source: e })?;

        match status {
            StatusCode::OK => Ok(FetchOutcome::Unlocked { body }),
            StatusCode::PAYMENT_REQUIRED => {
                let challenge = parse_challenge(&body)?;
                tracing::info!(
                    address = %challenge.address,
                    amount_piconero = %challenge.amount_piconero,
                    "Resource demands payment"
                );
                Ok(FetchOutcome::PaymentRequired(challenge))
            }
            status => Err(ResourceClientError::HttpStatus { status, body }),
        }
    }

    /// Re-issues the resource request with payment evidence attached as
    /// `x-monero-*` headers. Any status comes back as data, not as an error:
    /// only transport failures are errors here.
    pub async fn retry_with_proof(
        &self,
        proof: &PaymentProof,
    ) -> Result<ProofReply, ResourceClientError> {
        let headers = proof_headers(proof)?;
        let response = self.send(headers).await?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ResourceClientError::BodyRead { source: e })?;
        Ok(ProofReply { status, body })
    }

    async fn send(&self, headers: HeaderMap) -> Result<reqwest::Response, ResourceClientError> {
        let mut req = self.client.get(self.url.clone()).headers(headers);
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }
        req.send().await.map_err(|e| {
            if e.is_timeout() {
                ResourceClientError::Timeout
            } else {
                ResourceClientError::Http { source: e }
            }
        })
    }
}

/// Parses a 402 body into a [`PaymentChallenge`].
///
/// Missing `address` or `amount_piconero` fails with
/// [`ResourceClientError::MalformedChallenge`] carrying the serde diagnostic;
/// callers must treat that as fatal rather than proceeding unpaid.
pub fn parse_challenge(body: &str) -> Result<PaymentChallenge, ResourceClientError> {
    serde_json::from_str::<PaymentChallenge>(body).map_err(|e| {
        ResourceClientError::MalformedChallenge {
            detail: e.to_string(),
        }
    })
}

fn proof_headers(proof: &PaymentProof) -> Result<HeaderMap, ResourceClientError> {
    let mut headers = HeaderMap::new();
    let value = |s: &str| {
        HeaderValue::from_str(s).map_err(|_| ResourceClientError::InvalidProofHeader)
    };
    headers.insert(X_MONERO_ADDRESS, value(&proof.address)?);
    headers.insert(X_MONERO_TX_ID, value(&proof.tx_id)?);
    if let Some(tx_key) = &proof.tx_key {
        headers.insert(X_MONERO_TX_KEY, value(tx_key)?);
    }
    Ok(headers)
}
