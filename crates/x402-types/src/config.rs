//! Configuration primitives shared by the engine and the chain backends.
//!
//! Configuration is plain JSON deserialized with serde. Secrets (private keys, API keys,
//! RPC URLs with credentials) can be kept out of the file with [`LiteralOrEnv`]:
//!
//! ```json
//! {
//!   "rpc": [{ "http": "https://nile.trongrid.io" }],
//!   "signer": "$TRON_PRIVATE_KEY",
//!   "apiKey": "${TRONGRID_API_KEY}"
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Deref;
use std::str::FromStr;
use url::Url;

use crate::chain::ChainId;

/// RPC endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RpcConfig {
    /// HTTP URL of the endpoint.
    pub http: Url,
    /// Requests per second the endpoint tolerates (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<u32>,
}

/// Per-network overrides for the [network registry](crate::networks::NetworkRegistry).
///
/// ```json
/// {
///   "eip155:8453": { "settlementContract": "0x..." },
///   "tron:nile": { "settlementContract": "$NILE_PAYMENT_PERMIT" }
/// }
/// ```
pub type NetworksConfig = HashMap<ChainId, NetworkOverride>;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkOverride {
    /// Numeric chain id. Required for networks that are neither known nor `eip155`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    /// Settlement contract in the chain's native address form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settlement_contract: Option<LiteralOrEnv<String>>,
}

// ============================================================================
// Environment Variable Resolution
// ============================================================================

/// A transparent wrapper that resolves environment variables during deserialization.
///
/// Supports both literal values and environment variable references:
/// - Literal: `"TFxDcGvS7zfQrS1YzcCMp673ta2NHHzsiH"`
/// - Simple env var: `"$PAYMENT_PERMIT"`
/// - Braced env var: `"${PAYMENT_PERMIT}"`
///
/// The resolved string is then parsed into `T` with [`FromStr`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralOrEnv<T>(T);

impl<T> LiteralOrEnv<T> {
    pub fn from_literal(value: T) -> Self {
        Self(value)
    }

    pub fn inner(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

/// Returns the variable name if `s` is `$VAR` or `${VAR}`.
fn env_var_name(s: &str) -> Option<&str> {
    if let Some(braced) = s.strip_prefix("${").and_then(|rest| rest.strip_suffix('}')) {
        return (!braced.is_empty()).then_some(braced);
    }
    let name = s.strip_prefix('$')?;
    let valid = !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_');
    valid.then_some(name)
}

impl<T> Deref for LiteralOrEnv<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'de, T> Deserialize<'de> for LiteralOrEnv<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        let value = match env_var_name(&raw) {
            Some(var_name) => std::env::var(var_name).map_err(|_| {
                serde::de::Error::custom(format!(
                    "Environment variable '{}' not found (referenced as '{}')",
                    var_name, raw
                ))
            })?,
            None => raw,
        };
        value
            .parse::<T>()
            .map(LiteralOrEnv)
            .map_err(|e| serde::de::Error::custom(format!("Failed to parse value: {}", e)))
    }
}

impl<T> Serialize for LiteralOrEnv<T>
where
    T: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_name() {
        assert_eq!(env_var_name("$FOO"), Some("FOO"));
        assert_eq!(env_var_name("${FOO_BAR}"), Some("FOO_BAR"));
        assert_eq!(env_var_name("$"), None);
        assert_eq!(env_var_name("${}"), None);
        assert_eq!(env_var_name("$FOO-BAR"), None);
        assert_eq!(env_var_name("literal"), None);
    }

    #[test]
    fn test_literal_is_parsed() {
        let value: LiteralOrEnv<u64> = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(*value, 42);
    }

    #[test]
    fn test_env_reference_is_resolved() {
        // SAFETY: the variable name is unique to this test.
        unsafe {
            std::env::set_var("X402_TYPES_TEST_CONTRACT", "TFxDcGvS7zfQrS1YzcCMp673ta2NHHzsiH")
        };
        let value: LiteralOrEnv<String> =
            serde_json::from_str("\"${X402_TYPES_TEST_CONTRACT}\"").unwrap();
        assert_eq!(value.inner(), "TFxDcGvS7zfQrS1YzcCMp673ta2NHHzsiH");
    }

    #[test]
    fn test_missing_env_reference_fails() {
        let result: Result<LiteralOrEnv<String>, _> =
            serde_json::from_str("\"$X402_TYPES_TEST_SURELY_MISSING\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_rpc_config_camel_case() {
        let config: RpcConfig =
            serde_json::from_str(r#"{ "http": "https://nile.trongrid.io", "rateLimit": 5 }"#)
                .unwrap();
        assert_eq!(config.rate_limit, Some(5));
        assert_eq!(config.http.host_str(), Some("nile.trongrid.io"));
    }
}
