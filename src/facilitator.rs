//! HTTP client for a remote Monero x402 facilitator.
//!
//! This [`FacilitatorClient`] handles the `/invoices`, `/verify`, and
//! `/settle` endpoints of a facilitator over JSON HTTP.
//!
//! ## Example
//!
//! ```rust
//! use x402_monero::facilitator::FacilitatorClient;
//!
//! let facilitator = FacilitatorClient::try_from("http://localhost:3113").unwrap();
//! ```
//!
//! ## Error Handling
//!
//! Custom error types capture detailed failure contexts, including
//! - URL construction
//! - HTTP transport failures and client-enforced timeouts
//! - JSON deserialization errors
//! - Unexpected HTTP status responses, with the raw body preserved verbatim

use reqwest::{Client, StatusCode};
use std::time::Duration;
use url::Url;
use x402_monero_types::proto::{
    CreateInvoiceRequest, Invoice, PaymentProof, SettleOutcome, SettleRequest, VerifyOutcome,
};

/// A client for communicating with a remote Monero x402 facilitator.
///
/// Handles invoice issuance and lookup plus the `/verify` and `/settle`
/// proof endpoints. Endpoint URLs are computed once at construction.
#[derive(Clone, Debug)]
pub struct FacilitatorClient {
    /// Base URL of the facilitator (e.g. `http://localhost:3113/`)
    base_url: Url,
    /// Full URL to `POST /invoices` requests
    invoices_url: Url,
    /// Full URL to `POST /verify` requests
    verify_url: Url,
    /// Full URL to `POST /settle` requests
    settle_url: Url,
    /// Shared Reqwest HTTP client
    client: Client,
    /// Optional request timeout
    timeout: Option<Duration>,
}

/// Errors that can occur while interacting with a remote facilitator.
#[derive(Debug, thiserror::Error)]
pub enum FacilitatorClientError {
    #[error("URL parse error: {context}: {source}")]
    UrlParse {
        context: &'static str,
        #[source]
        source: url::ParseError,
    },
    #[error("Request timed out: {context}")]
    Timeout { context: &'static str },
    #[error("HTTP error: {context}: {source}")]
    Http {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("Failed to deserialize JSON: {context}: {source}")]
    JsonDeserialization {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("Unexpected HTTP status {status}: {context}: {body}")]
    HttpStatus {
        context: &'static str,
        status: StatusCode,
        body: String,
    },
    #[error("Failed to read response body as text: {context}: {source}")]
    ResponseBodyRead {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

impl FacilitatorClient {
    /// Constructs a new [`FacilitatorClient`] from a base URL.
    ///
    /// This sets up `./invoices`, `./verify`, and `./settle` endpoint URLs
    /// relative to the base.
    pub fn try_new(base_url: Url) -> Result<Self, FacilitatorClientError> {
        let client = Client::new();
        let invoices_url =
            base_url
                .join("./invoices")
                .map_err(|e| FacilitatorClientError::UrlParse {
                    context: "Failed to construct ./invoices URL",
                    source: e,
                })?;
        let verify_url =
            base_url
                .join("./verify")
                .map_err(|e| FacilitatorClientError::UrlParse {
                    context: "Failed to construct ./verify URL",
                    source: e,
                })?;
        let settle_url =
            base_url
                .join("./settle")
                .map_err(|e| FacilitatorClientError::UrlParse {
                    context: "Failed to construct ./settle URL",
                    source: e,
                })?;
        Ok(Self {
            client,
            base_url,
            invoices_url,
            verify_url,
            settle_url,
            timeout: None,
        })
    }

    /// Returns the base URL used by this client.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the configured timeout, if any.
    pub fn timeout(&self) -> &Option<Duration> {
        &self.timeout
    }

    /// Sets a timeout for all future requests.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let mut this = self.clone();
        this.timeout = Some(timeout);
        this
    }

    /// Sends a `POST /invoices` request asking the facilitator to issue an
    /// invoice for the given USD amount.
    ///
    /// A non-200 answer fails with [`FacilitatorClientError::HttpStatus`]
    /// carrying the raw response body; the caller must not proceed to payment.
    pub async fn create_invoice(
        &self,
        request: &CreateInvoiceRequest,
    ) -> Result<Invoice, FacilitatorClientError> {
        self.post_json(&self.invoices_url, "POST /invoices", request)
            .await
    }

    /// Sends a `GET /invoices/{address}` request, the read-only status lookup
    /// for an issued invoice.
    pub async fn invoice_status(&self, address: &str) -> Result<Invoice, FacilitatorClientError> {
        let url = self
            .base_url
            .join(&format!("./invoices/{address}"))
            .map_err(|e| FacilitatorClientError::UrlParse {
                context: "Failed to construct ./invoices/{address} URL",
                source: e,
            })?;
        self.get_json(&url, "GET /invoices/{address}").await
    }

    /// Sends a `POST /verify` request submitting payment evidence.
    pub async fn verify(
        &self,
        proof: &PaymentProof,
    ) -> Result<VerifyOutcome, FacilitatorClientError> {
        self.post_json(&self.verify_url, "POST /verify", proof)
            .await
    }

    /// Sends a `POST /settle` request with the enveloped payment payload.
    pub async fn settle(
        &self,
        request: &SettleRequest,
    ) -> Result<SettleOutcome, FacilitatorClientError> {
        self.post_json(&self.settle_url, "POST /settle", request)
            .await
    }

    /// Generic POST helper that handles JSON serialization, error mapping,
    /// and timeout application.
    ///
    /// `context` is a human-readable identifier used in tracing and error
    /// messages (e.g. `"POST /verify"`).
    async fn post_json<T, R>(
        &self,
        url: &Url,
        context: &'static str,
        payload: &T,
    ) -> Result<R, FacilitatorClientError>
    where
        T: serde::Serialize + ?Sized,
        R: serde::de::DeserializeOwned,
    {
        let mut req = self.client.post(url.clone()).json(payload);
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }
        let http_response = req.send().await.map_err(|e| transport_error(context, e))?;

        let result = if http_response.status() == StatusCode::OK {
            http_response
                .json::<R>()
                .await
                .map_err(|e| FacilitatorClientError::JsonDeserialization { context, source: e })
        } else {
            let status = http_response.status();
            let body = http_response
                .text()
                .await
                .map_err(|e| FacilitatorClientError::ResponseBodyRead { context, source: e })?;
            Err(FacilitatorClientError::HttpStatus {
                context,
                status,
                body,
            })
        };

        if let Err(err) = &result {
            tracing::debug!(error = %err, "Request to facilitator failed");
        }

        result
    }

    /// Generic GET helper mirroring [`Self::post_json`].
    async fn get_json<R>(
        &self,
        url: &Url,
        context: &'static str,
    ) -> Result<R, FacilitatorClientError>
    where
        R: serde::de::DeserializeOwned,
    {
        let mut req = self.client.get(url.clone());
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }
        let http_response = req.send().await.map_err(|e| transport_error(context, e))?;

        let result = if http_response.status() == StatusCode::OK {
            http_response
                .json::<R>()
                .await
                .map_err(|e| FacilitatorClientError::JsonDeserialization { context, source: e })
        } else {
            let status = http_response.status();
            let body = http_response
                .text()
                .await
                .map_err(|e| FacilitatorClientError::ResponseBodyRead { context, source: e })?;
            Err(FacilitatorClientError::HttpStatus {
                context,
                status,
                body,
            })
        };

        if let Err(err) = &result {
            tracing::debug!(error = %err, "Request to facilitator failed");
        }

        result
    }
}

/// Classifies a reqwest transport failure: client-enforced timeouts are kept
/// distinct from unreachable-host and other connectivity errors.
fn transport_error(context: &'static str, source: reqwest::Error) -> FacilitatorClientError {
    if source.is_timeout() {
        FacilitatorClientError::Timeout { context }
    } else {
        FacilitatorClientError::Http { context, source }
    }
}

/// Converts a string URL into a `FacilitatorClient`, parsing the URL and calling `try_new`.
impl TryFrom<&str> for FacilitatorClient {
    type Error = FacilitatorClientError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        // Normalize: strip trailing slashes and add a single trailing slash
        let mut normalized = value.trim_end_matches('/').to_string();
        normalized.push('/');
        let url = Url::parse(&normalized).map_err(|e| FacilitatorClientError::UrlParse {
            context: "Failed to parse base url",
            source: e,
        })?;
        FacilitatorClient::try_new(url)
    }
}

/// Converts a String URL into a `FacilitatorClient`.
impl TryFrom<String> for FacilitatorClient {
    type Error = FacilitatorClientError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        FacilitatorClient::try_from(value.as_str())
    }
}
