//! TronGrid mocks shared by the provider and end-to-end tests.

use alloy_primitives::Address;
use alloy_signer_local::PrivateKeySigner;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use x402_permit::address::AddressCodec;
use x402_types::chain::ChainId;
use x402_types::networks::NetworkRegistry;

use crate::address::TronAddressCodec;
use crate::chain::{TronChainProvider, TronGridClient};

pub const NILE_CONTRACT: &str = "TFxDcGvS7zfQrS1YzcCMp673ta2NHHzsiH";
pub const USDT: &str = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t";
/// Serialized `raw_data` of the transaction the mocked node builds.
pub const RAW_DATA_HEX: &str = "0a025d1a2208a1b2c3d4e5f60718";

pub fn nile() -> ChainId {
    ChainId::new("tron", "nile")
}

pub fn canonical(native: &str) -> Address {
    TronAddressCodec.to_canonical(native).unwrap()
}

/// The id a node assigns to [`RAW_DATA_HEX`].
pub fn tx_id() -> String {
    hex::encode(Sha256::digest(hex::decode(RAW_DATA_HEX).unwrap()))
}

/// Provider with a fresh key, talking to `server`, with short receipt polling.
pub fn provider(server: &MockServer) -> TronChainProvider {
    TronChainProvider::new(
        nile(),
        PrivateKeySigner::random(),
        TronGridClient::new(server.uri().parse().unwrap()),
        Arc::new(NetworkRegistry::with_defaults()),
    )
    .with_receipt_timeout(Duration::from_millis(500))
    .with_poll_interval(Duration::from_millis(20))
}

/// `triggersmartcontract` response carrying an unsigned transaction with id `tx_id`.
pub fn unsigned_transaction_with_id(tx_id: &str) -> serde_json::Value {
    serde_json::json!({
        "result": { "result": true },
        "transaction": {
            "txID": tx_id,
            "raw_data": { "contract": [], "expiration": 1 },
            "raw_data_hex": RAW_DATA_HEX,
            "visible": true
        }
    })
}

pub fn unsigned_transaction() -> serde_json::Value {
    unsigned_transaction_with_id(&tx_id())
}

pub async fn mount_json(server: &MockServer, endpoint: &str, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path(endpoint))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Mounts a node that reports an allowance of `allowance_hex`, accepts every contract call
/// and confirms every transaction.
pub async fn mount_node(server: &MockServer, allowance_hex: &str) {
    mount_json(
        server,
        "/wallet/triggerconstantcontract",
        serde_json::json!({ "result": { "result": true }, "constant_result": [allowance_hex] }),
    )
    .await;
    mount_json(server, "/wallet/triggersmartcontract", unsigned_transaction()).await;
    mount_json(
        server,
        "/wallet/broadcasttransaction",
        serde_json::json!({ "result": true, "txid": tx_id() }),
    )
    .await;
    mount_json(
        server,
        "/wallet/gettransactioninfobyid",
        serde_json::json!({ "id": tx_id(), "blockNumber": 7, "receipt": { "result": "SUCCESS" } }),
    )
    .await;
}

/// JSON body of the first request `server` received on `endpoint`.
pub async fn request_body(server: &MockServer, endpoint: &str) -> serde_json::Value {
    let requests = server.received_requests().await.unwrap();
    let request = requests
        .iter()
        .find(|request| request.url.path() == endpoint)
        .unwrap();
    serde_json::from_slice(&request.body).unwrap()
}
