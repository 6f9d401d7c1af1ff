//! A minimal TronGrid (java-tron full node HTTP API) client.
//!
//! Covers the four endpoints contract settlement needs:
//!
//! - `POST /wallet/triggerconstantcontract` - read-only contract call
//! - `POST /wallet/triggersmartcontract` - build an unsigned contract call transaction
//! - `POST /wallet/broadcasttransaction` - submit a signed transaction
//! - `POST /wallet/gettransactioninfobyid` - execution result of a transaction
//!
//! Requests use `visible: true`, so addresses travel in Base58Check form.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use url::Url;

#[cfg(feature = "telemetry")]
use tracing::instrument;

/// Header carrying the TronGrid API key.
pub const API_KEY_HEADER: &str = "TRON-PRO-API-KEY";

#[derive(Debug, thiserror::Error)]
pub enum TronGridError {
    #[error("URL parse error: {context}: {source}")]
    UrlParse {
        context: &'static str,
        #[source]
        source: url::ParseError,
    },
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

/// Contract call parameters shared by the trigger endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerContractRequest {
    pub owner_address: String,
    pub contract_address: String,
    /// Solidity signature, e.g. `approve(address,uint256)`.
    pub function_selector: String,
    /// Hex ABI-encoded arguments, without the selector and without `0x`.
    pub parameter: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee_limit: Option<u64>,
    pub call_value: u64,
    pub visible: bool,
}

impl TriggerContractRequest {
    /// Splits `calldata` into selector and arguments.
    pub fn new(owner: String, contract: String, function: &str, calldata: &[u8]) -> Self {
        let arguments = calldata.get(4..).unwrap_or_default();
        Self {
            owner_address: owner,
            contract_address: contract,
            function_selector: function.to_string(),
            parameter: hex::encode(arguments),
            fee_limit: None,
            call_value: 0,
            visible: true,
        }
    }

    pub fn with_fee_limit(mut self, fee_limit: u64) -> Self {
        self.fee_limit = Some(fee_limit);
        self
    }
}

/// Node verdict on a trigger request. `message` is hex-encoded UTF-8.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TriggerResult {
    #[serde(default)]
    pub result: bool,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl TriggerResult {
    pub fn describe(&self) -> String {
        describe_failure(self.code.as_deref(), self.message.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TriggerConstantResponse {
    #[serde(default)]
    pub result: TriggerResult,
    #[serde(default)]
    pub constant_result: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TriggerSmartContractResponse {
    #[serde(default)]
    pub result: TriggerResult,
    #[serde(default)]
    pub transaction: Option<Transaction>,
}

/// A transaction as returned by `triggersmartcontract` and accepted by `broadcasttransaction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "txID")]
    pub tx_id: String,
    pub raw_data: serde_json::Value,
    pub raw_data_hex: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signature: Vec<String>,
    #[serde(default)]
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BroadcastResponse {
    #[serde(default)]
    pub result: bool,
    #[serde(default)]
    pub txid: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl BroadcastResponse {
    pub fn describe(&self) -> String {
        describe_failure(self.code.as_deref(), self.message.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ResourceReceipt {
    #[serde(default)]
    pub result: Option<String>,
}

/// Execution result of a transaction. The node answers `{}` for unknown ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TransactionInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "blockNumber")]
    pub block_number: Option<u64>,
    #[serde(default)]
    pub receipt: Option<ResourceReceipt>,
    /// `FAILED` when the transaction did not execute.
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default, rename = "resMessage")]
    pub res_message: Option<String>,
}

impl TransactionInfo {
    /// Whether the transaction executed without a revert.
    pub fn succeeded(&self) -> bool {
        let receipt_ok = self
            .receipt
            .as_ref()
            .and_then(|receipt| receipt.result.as_deref())
            .is_none_or(|result| result == "SUCCESS");
        self.result.as_deref() != Some("FAILED") && receipt_ok
    }
}

/// Decodes the hex-encoded message TronGrid puts in error responses.
fn decode_message(message: &str) -> String {
    hex::decode(message)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| message.to_string())
}

fn describe_failure(code: Option<&str>, message: Option<&str>) -> String {
    let message = message.map(decode_message).unwrap_or_default();
    match code {
        Some(code) => format!("{code}: {message}"),
        None => message,
    }
}

#[derive(Serialize)]
struct TransactionIdRequest<'a> {
    value: &'a str,
    visible: bool,
}

/// Spaces requests evenly at a fixed rate. Clones share the schedule.
#[derive(Clone, Debug)]
struct Throttle {
    requests_per_second: u32,
    period: Duration,
    next_slot: Arc<Mutex<Instant>>,
}

impl Throttle {
    fn per_second(requests_per_second: u32) -> Self {
        Self {
            requests_per_second,
            period: Duration::from_secs(1) / requests_per_second.max(1),
            next_slot: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Waits for the next free slot.
    async fn acquire(&self) {
        let slot = {
            let mut next_slot = self.next_slot.lock().await;
            let slot = (*next_slot).max(Instant::now());
            *next_slot = slot + self.period;
            slot
        };
        tokio::time::sleep_until(slot).await;
    }
}

/// HTTP client for a TronGrid endpoint.
#[derive(Clone, Debug)]
pub struct TronGridClient {
    base_url: Url,
    client: Client,
    api_key: Option<String>,
    timeout: Option<Duration>,
    throttle: Option<Throttle>,
}

impl TronGridClient {
    pub fn new(mut base_url: Url) -> Self {
        // Endpoints are joined relative to the base.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            base_url,
            client: Client::new(),
            api_key: None,
            timeout: None,
            throttle: None,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn with_api_key<S: Into<String>>(mut self, api_key: S) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets a timeout for every request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Limits the client to `requests_per_second`, queueing requests beyond it.
    pub fn with_rate_limit(mut self, requests_per_second: u32) -> Self {
        self.throttle = Some(Throttle::per_second(requests_per_second));
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn rate_limit(&self) -> Option<u32> {
        self.throttle
            .as_ref()
            .map(|throttle| throttle.requests_per_second)
    }

    #[cfg_attr(
        feature = "telemetry",
        instrument(
            skip_all,
            err,
            fields(contract = %request.contract_address, function = %request.function_selector)
        )
    )]
    pub async fn trigger_constant_contract(
        &self,
        request: &TriggerContractRequest,
    ) -> Result<TriggerConstantResponse, TronGridError> {
        self.post_json(
            "wallet/triggerconstantcontract",
            "POST /wallet/triggerconstantcontract",
            request,
        )
        .await
    }

    #[cfg_attr(
        feature = "telemetry",
        instrument(
            skip_all,
            err,
            fields(contract = %request.contract_address, function = %request.function_selector)
        )
    )]
    pub async fn trigger_smart_contract(
        &self,
        request: &TriggerContractRequest,
    ) -> Result<TriggerSmartContractResponse, TronGridError> {
        self.post_json(
            "wallet/triggersmartcontract",
            "POST /wallet/triggersmartcontract",
            request,
        )
        .await
    }

    #[cfg_attr(
        feature = "telemetry",
        instrument(skip_all, err, fields(tx_id = %transaction.tx_id))
    )]
    pub async fn broadcast_transaction(
        &self,
        transaction: &Transaction,
    ) -> Result<BroadcastResponse, TronGridError> {
        self.post_json(
            "wallet/broadcasttransaction",
            "POST /wallet/broadcasttransaction",
            transaction,
        )
        .await
    }

    /// Execution result of `tx_id`, `None` while the transaction is not in a block yet.
    pub async fn get_transaction_info_by_id(
        &self,
        tx_id: &str,
    ) -> Result<Option<TransactionInfo>, TronGridError> {
        let info: TransactionInfo = self
            .post_json(
                "wallet/gettransactioninfobyid",
                "POST /wallet/gettransactioninfobyid",
                &TransactionIdRequest {
                    value: tx_id,
                    visible: true,
                },
            )
            .await?;
        Ok(info.id.is_some().then_some(info))
    }

    async fn post_json<T, R>(
        &self,
        endpoint: &str,
        context: &'static str,
        payload: &T,
    ) -> Result<R, TronGridError>
    where
        T: Serialize + ?Sized,
        R: serde::de::DeserializeOwned,
    {
        let url = self
            .base_url
            .join(endpoint)
            .map_err(|e| TronGridError::UrlParse { context, source: e })?;
        if let Some(throttle) = &self.throttle {
            throttle.acquire().await;
        }
        let mut req = self.client.post(url).json(payload);
        if let Some(api_key) = &self.api_key {
            req = req.header(API_KEY_HEADER, api_key);
        }
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }
        let http_response = req
            .send()
            .await
            .map_err(|e| TronGridError::Http { context, source: e })?;

        if http_response.status() == StatusCode::OK {
            http_response
                .json::<R>()
                .await
                .map_err(|e| TronGridError::JsonDeserialization { context, source: e })
        } else {
            let status = http_response.status();
            let body = http_response
                .text()
                .await
                .map_err(|e| TronGridError::ResponseBodyRead { context, source: e })?;
            tracing::warn!(%status, context, "TronGrid request failed");
            Err(TronGridError::HttpStatus {
                context,
                status,
                body,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> TronGridClient {
        TronGridClient::new(server.uri().parse().unwrap())
    }

    fn request() -> TriggerContractRequest {
        let mut calldata = vec![0xde, 0xad, 0xbe, 0xef];
        calldata.extend_from_slice(&[0u8; 31]);
        calldata.push(7);
        TriggerContractRequest::new(
            "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t".into(),
            "TFxDcGvS7zfQrS1YzcCMp673ta2NHHzsiH".into(),
            "balanceOf(address)",
            &calldata,
        )
    }

    #[test]
    fn test_trigger_request_drops_selector() {
        let request = request();
        assert_eq!(request.parameter.len(), 64);
        assert!(request.parameter.ends_with("07"));
        assert!(request.visible);
        let json = serde_json::to_value(request.with_fee_limit(5)).unwrap();
        assert_eq!(json["fee_limit"], 5);
        assert_eq!(json["function_selector"], "balanceOf(address)");
    }

    #[tokio::test]
    async fn test_trigger_constant_contract() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/wallet/triggerconstantcontract"))
            .and(header(API_KEY_HEADER, "key"))
            .and(body_partial_json(serde_json::json!({
                "function_selector": "balanceOf(address)",
                "visible": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": { "result": true },
                "constant_result": ["00000000000000000000000000000000000000000000000000000000000f4240"]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = client(&server)
            .with_api_key("key")
            .trigger_constant_contract(&request())
            .await
            .unwrap();
        assert!(response.result.result);
        assert_eq!(response.constant_result.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_transaction_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/wallet/gettransactioninfobyid"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;
        let info = client(&server)
            .get_transaction_info_by_id("abcd")
            .await
            .unwrap();
        assert!(info.is_none());
    }

    #[tokio::test]
    async fn test_http_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/wallet/broadcasttransaction"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .mount(&server)
            .await;
        let transaction = Transaction {
            tx_id: "00".repeat(32),
            raw_data: serde_json::json!({}),
            raw_data_hex: String::new(),
            signature: vec![],
            visible: true,
        };
        let err = client(&server)
            .broadcast_transaction(&transaction)
            .await
            .unwrap_err();
        match err {
            TronGridError::HttpStatus { status, body, .. } => {
                assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
                assert_eq!(body, "busy");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_transaction_info_outcome() {
        let success: TransactionInfo = serde_json::from_value(serde_json::json!({
            "id": "ab", "blockNumber": 12, "receipt": { "result": "SUCCESS" }
        }))
        .unwrap();
        assert!(success.succeeded());
        assert_eq!(success.block_number, Some(12));

        let reverted: TransactionInfo = serde_json::from_value(serde_json::json!({
            "id": "ab", "blockNumber": 12, "receipt": { "result": "REVERT" }, "result": "FAILED"
        }))
        .unwrap();
        assert!(!reverted.succeeded());
    }

    #[test]
    fn test_failure_message_is_decoded() {
        let result = TriggerResult {
            result: false,
            code: Some("CONTRACT_VALIDATE_ERROR".into()),
            message: Some(hex::encode("account does not exist")),
        };
        assert_eq!(result.describe(), "CONTRACT_VALIDATE_ERROR: account does not exist");
    }

    #[tokio::test]
    async fn test_rate_limit_spaces_requests() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/wallet/gettransactioninfobyid"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(3)
            .mount(&server)
            .await;
        let client = client(&server).with_rate_limit(10);
        assert_eq!(client.rate_limit(), Some(10));

        let started = Instant::now();
        for _ in 0..3 {
            assert!(client.get_transaction_info_by_id("ab").await.unwrap().is_none());
        }
        assert!(started.elapsed() >= Duration::from_millis(180));
    }

    #[tokio::test]
    async fn test_request_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/wallet/broadcasttransaction"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "result": true }))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;
        let client = client(&server).with_timeout(Duration::from_millis(100));
        assert_eq!(client.timeout(), Some(Duration::from_millis(100)));

        let transaction = Transaction {
            tx_id: "ab".into(),
            raw_data: serde_json::json!({}),
            raw_data_hex: "0a02".into(),
            signature: vec![],
            visible: true,
        };
        let err = client.broadcast_transaction(&transaction).await.unwrap_err();
        assert!(matches!(err, TronGridError::Http { .. }));
    }
}
