use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use x402_types::chain::ChainId;
use x402_types::config::{LiteralOrEnv, RpcConfig};

/// Configuration for one TRON network.
///
/// ```json
/// {
///   "chainId": "tron:nile",
///   "signer": "$TRON_PRIVATE_KEY",
///   "apiKey": "${TRONGRID_API_KEY}",
///   "feeLimit": 100000000
/// }
/// ```
///
/// Without `rpc`, the public TronGrid host of a known network is used.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TronChainConfig {
    pub chain_id: ChainId,
    /// Private key (hex, with or without `0x`) or an env var reference.
    pub signer: LiteralOrEnv<TronPrivateKey>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rpc: Vec<RpcConfig>,
    /// Sent as `TRON-PRO-API-KEY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<LiteralOrEnv<String>>,
    /// Maximum energy fee per contract call, in sun.
    #[serde(default = "tron_chain_config::default_fee_limit")]
    pub fee_limit: u64,
    #[serde(default = "tron_chain_config::default_receipt_timeout_secs")]
    pub receipt_timeout_secs: u64,
    /// Timeout of a single TronGrid request.
    #[serde(default = "tron_chain_config::default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

mod tron_chain_config {
    pub fn default_fee_limit() -> u64 {
        100_000_000
    }
    pub fn default_receipt_timeout_secs() -> u64 {
        30
    }
    pub fn default_request_timeout_secs() -> u64 {
        10
    }
}

/// A validated secp256k1 private key (32 bytes).
#[derive(Clone, Copy, Serialize, Deserialize)]
pub struct TronPrivateKey(B256);

impl TronPrivateKey {
    pub fn as_b256(&self) -> &B256 {
        &self.0
    }
}

impl std::fmt::Debug for TronPrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TronPrivateKey(..)")
    }
}

impl PartialEq for TronPrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl FromStr for TronPrivateKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        B256::from_str(s)
            .map(Self)
            .map_err(|e| format!("Invalid tron private key: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "cafe000000000000000000000000000000000000000000000000000000000001";

    #[test]
    fn test_config_defaults() {
        let config: TronChainConfig = serde_json::from_value(serde_json::json!({
            "chainId": "tron:nile",
            "signer": KEY
        }))
        .unwrap();
        assert_eq!(config.chain_id, ChainId::new("tron", "nile"));
        assert!(config.rpc.is_empty());
        assert!(config.api_key.is_none());
        assert_eq!(config.fee_limit, 100_000_000);
        assert_eq!(config.receipt_timeout_secs, 30);
        assert_eq!(config.request_timeout_secs, 10);
    }

    #[test]
    fn test_key_with_and_without_prefix() {
        let bare: TronPrivateKey = KEY.parse().unwrap();
        let prefixed: TronPrivateKey = format!("0x{KEY}").parse().unwrap();
        assert_eq!(bare, prefixed);
        assert!("0x12".parse::<TronPrivateKey>().is_err());
    }

    #[test]
    fn test_api_key_from_env() {
        // SAFETY: test-local variable name, not read concurrently elsewhere.
        unsafe { std::env::set_var("X402_TRON_TEST_API_KEY", "secret") };
        let config: TronChainConfig = serde_json::from_value(serde_json::json!({
            "chainId": "tron:shasta",
            "signer": KEY,
            "apiKey": "$X402_TRON_TEST_API_KEY",
            "rpc": [{ "http": "https://api.shasta.trongrid.io" }]
        }))
        .unwrap();
        assert_eq!(config.api_key.unwrap().inner(), "secret");
        assert_eq!(config.rpc[0].http.as_str(), "https://api.shasta.trongrid.io/");
    }
}
