use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use x402_types::chain::ChainId;
use x402_types::config::{LiteralOrEnv, RpcConfig};

/// Configuration for one EVM chain.
///
/// ```json
/// {
///   "chainId": "eip155:8453",
///   "signer": "$HOT_WALLET_KEY",
///   "rpc": [{ "http": "https://mainnet.base.org", "rateLimit": 20 }],
///   "receiptTimeoutSecs": 60
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip155ChainConfig {
    /// Network this configuration serves, `eip155:<chain id>`.
    pub chain_id: ChainId,
    /// Private key (hex, `0x`-prefixed) or an env var reference.
    pub signer: LiteralOrEnv<EvmPrivateKey>,
    /// RPC endpoints. The first HTTP(S) endpoint is used.
    pub rpc: Vec<RpcConfig>,
    /// How long to wait for a transaction receipt (optional).
    #[serde(default = "eip155_chain_config::default_receipt_timeout_secs")]
    pub receipt_timeout_secs: u64,
}

mod eip155_chain_config {
    pub fn default_receipt_timeout_secs() -> u64 {
        30
    }
}

/// A validated EVM private key (32 bytes).
#[derive(Clone, Copy, Serialize, Deserialize)]
pub struct EvmPrivateKey(B256);

impl EvmPrivateKey {
    pub fn as_b256(&self) -> &B256 {
        &self.0
    }
}

impl std::fmt::Debug for EvmPrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EvmPrivateKey(..)")
    }
}

impl PartialEq for EvmPrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl FromStr for EvmPrivateKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        B256::from_str(s)
            .map(Self)
            .map_err(|e| format!("Invalid evm private key: {}", e))
    }
}
