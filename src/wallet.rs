//! JSON-RPC client for a local Monero wallet daemon.
//!
//! Speaks the `monero-wallet-rpc` protocol, exposing the single `transfer`
//! operation the payment flow needs: send an amount to an invoice address,
//! optionally requesting the private transaction key as a proof artifact.
//!
//! The wallet holds the keys and broadcasts the transaction; this client only
//! carries the request and interprets the answer. Failures are never retried
//! here: by the time a transfer request reaches the wallet, funds may move,
//! so the caller decides what a failure means.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;
use x402_monero_types::amount::Piconero;

/// Account index transfers are sent from. The flow always spends from the
/// wallet's primary account.
const ACCOUNT_INDEX: u32 = 0;

/// Transaction priority passed to the wallet (1 = normal).
const PRIORITY: u32 = 1;

/// A completed wallet transfer: the transaction id and, when requested, the
/// private transaction key proving the payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub tx_hash: String,
    pub tx_key: Option<String>,
}

/// Errors surfaced by the wallet RPC client.
#[derive(Debug, thiserror::Error)]
pub enum WalletClientError {
    /// The wallet daemon could not be reached at all. Funds were not sent.
    #[error("Wallet RPC unreachable: {source}")]
    Unreachable {
        #[source]
        source: reqwest::Error,
    },
    /// The request timed out client-side. The transfer outcome is unknown.
    #[error("Wallet RPC request timed out")]
    Timeout,
    /// The wallet answered but without a `result`, reporting a reason.
    #[error("Payment rejected by wallet: {reason}")]
    Rejected { reason: String },
    /// The wallet answered something that is not a JSON-RPC response.
    #[error("Malformed wallet RPC response: {source}")]
    MalformedResponse {
        #[source]
        source: reqwest::Error,
    },
    /// A proof artifact was requested but the wallet omitted it. The transfer
    /// happened; treating this as success would lose the evidence.
    #[error("Wallet returned tx {tx_hash} without the requested tx_key")]
    MissingTxKey { tx_hash: String },
}

#[derive(Debug, Serialize)]
struct RpcRequest<T> {
    jsonrpc: &'static str,
    id: &'static str,
    method: &'static str,
    params: T,
}

#[derive(Debug, Serialize)]
struct TransferParams {
    destinations: Vec<TransferDestination>,
    account_index: u32,
    priority: u32,
    get_tx_key: bool,
}

#[derive(Debug, Serialize)]
struct TransferDestination {
    amount: Piconero,
    address: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct TransferResult {
    tx_hash: String,
    tx_key: Option<String>,
}

/// Client for the local wallet daemon's JSON-RPC endpoint.
#[derive(Clone, Debug)]
pub struct WalletRpcClient {
    rpc_url: Url,
    client: Client,
    timeout: Option<Duration>,
}

impl WalletRpcClient {
    /// Creates a client for the wallet daemon at `rpc_url`
    /// (e.g. `http://localhost:18084/json_rpc`).
    pub fn new(rpc_url: Url) -> Self {
        Self {
            rpc_url,
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

    /// Sends `amount` to `address` as a single-destination transfer.
    ///
    /// When `want_proof` is true the wallet is asked for the private
    /// transaction key alongside the transaction id; an answer carrying the
    /// id but not the key is surfaced as
    /// [`WalletClientError::MissingTxKey`], never as success.
    pub async fn transfer(
        &self,
        address: &str,
        amount: Piconero,
        want_proof: bool,
    ) -> Result<Transfer, WalletClientError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: "0",
            method: "transfer",
            params: TransferParams {
                destinations: vec![TransferDestination {
                    amount,
                    address: address.to_string(),
                }],
                account_index: ACCOUNT_INDEX,
                priority: PRIORITY,
                get_tx_key: want_proof,
            },
        };

        tracing::info!(%address, %amount, want_proof, "Submitting transfer to wallet RPC");

        let mut req = self.client.post(self.rpc_url.clone()).json(&request);
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }
        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                WalletClientError::Timeout
            } else {
                WalletClientError::Unreachable { source: e }
            }
        })?;

        let rpc: RpcResponse<TransferResult> = response
            .json()
            .await
            .map_err(|e| WalletClientError::MalformedResponse { source: e })?;

        match rpc.result {
            Some(result) => {
                if want_proof && result.tx_key.is_none() {
                    return Err(WalletClientError::MissingTxKey {
                        tx_hash: result.tx_hash,
                    });
                }
                tracing::info!(tx_hash = %result.tx_hash, "Wallet accepted transfer");
                Ok(Transfer {
                    tx_hash: result.tx_hash,
                    tx_key: result.tx_key,
                })
            }
            None => {
                let reason = match rpc.error {
                    Some(err) => format!("{} (code {})", err.message, err.code),
                    None => "wallet response carried neither result nor error".to_string(),
                };
                Err(WalletClientError::Rejected { reason })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> WalletRpcClient {
        let url = format!("{}/json_rpc", server.uri()).parse().unwrap();
        WalletRpcClient::new(url)
    }

    #[tokio::test]
    async fn transfer_sends_fixed_account_and_priority() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/json_rpc"))
            .and(body_json(serde_json::json!({
                "jsonrpc": "2.0",
                "id": "0",
                "method": "transfer",
                "params": {
                    "destinations": [{"amount": 1000, "address": "4xyz"}],
                    "account_index": 0,
                    "priority": 1,
                    "get_tx_key": true
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0",
                "id": "0",
                "result": {"tx_hash": "abc", "tx_key": "k1"}
            })))
            .mount(&mock_server)
            .await;

        let transfer = client_for(&mock_server)
            .transfer("4xyz", Piconero(1000), true)
            .await
            .unwrap();

        assert_eq!(transfer.tx_hash, "abc");
        assert_eq!(transfer.tx_key.as_deref(), Some("k1"));
    }

    #[tokio::test]
    async fn response_without_result_is_never_success() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/json_rpc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0",
                "id": "0",
                "error": {"code": -17, "message": "not enough money"}
            })))
            .mount(&mock_server)
            .await;

        let err = client_for(&mock_server)
            .transfer("4xyz", Piconero(1000), true)
            .await
            .unwrap_err();

        match err {
            WalletClientError::Rejected { reason } => {
                assert!(reason.contains("not enough money"));
                assert!(reason.contains("-17"));
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_rpc_envelope_is_rejected() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/json_rpc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0",
                "id": "0"
            })))
            .mount(&mock_server)
            .await;

        let err = client_for(&mock_server)
            .transfer("4xyz", Piconero(1000), false)
            .await
            .unwrap_err();

        assert!(matches!(err, WalletClientError::Rejected { .. }));
    }

    #[tokio::test]
    async fn missing_requested_tx_key_is_a_protocol_inconsistency() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/json_rpc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0",
                "id": "0",
                "result": {"tx_hash": "abc"}
            })))
            .mount(&mock_server)
            .await;

        let err = client_for(&mock_server)
            .transfer("4xyz", Piconero(1000), true)
            .await
            .unwrap_err();

        match err {
            WalletClientError::MissingTxKey { tx_hash } => assert_eq!(tx_hash, "abc"),
            other => panic!("expected MissingTxKey, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn tx_key_not_requested_means_none_is_fine() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/json_rpc"))
            .and(body_json(serde_json::json!({
                "jsonrpc": "2.0",
                "id": "0",
                "method": "transfer",
                "params": {
                    "destinations": [{"amount": 500, "address": "4abc"}],
                    "account_index": 0,
                    "priority": 1,
                    "get_tx_key": false
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0",
                "id": "0",
                "result": {"tx_hash": "def"}
            })))
            .mount(&mock_server)
            .await;

        let transfer = client_for(&mock_server)
            .transfer("4abc", Piconero(500), false)
            .await
            .unwrap();

        assert_eq!(transfer.tx_hash, "def");
        assert_eq!(transfer.tx_key, None);
    }

    #[tokio::test]
    async fn unreachable_wallet_is_surfaced_as_such() {
        let url = "http://127.0.0.1:1/json_rpc".parse().unwrap();
        let err = WalletRpcClient::new(url)
            .transfer("4xyz", Piconero(1000), true)
            .await
            .unwrap_err();
        assert!(matches!(err, WalletClientError::Unreachable { .. }));
    }
}
