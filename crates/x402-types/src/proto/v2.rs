//! Protocol version 2 types.
//!
//! - [`X402Version2`] - Version marker that serializes as `2`
//! - [`PaymentRequirements`] - Payment terms set by the resource server
//! - [`PaymentPayload`] - Signed payment with the requirements it accepted
//! - [`PaymentRequired`] - HTTP 402 response body
//! - [`ResourceInfo`] - The paid resource

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fmt::{Display, Formatter};

use crate::chain::ChainId;
use crate::proto::FeeInfo;

/// Version marker for x402 protocol version 2.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct X402Version2;

impl X402Version2 {
    pub const VALUE: u8 = 2;
}

impl From<X402Version2> for u8 {
    fn from(_: X402Version2) -> Self {
        X402Version2::VALUE
    }
}

impl Serialize for X402Version2 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(Self::VALUE)
    }
}

impl<'de> Deserialize<'de> for X402Version2 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let num = u8::deserialize(deserializer)?;
        if num == Self::VALUE {
            Ok(X402Version2)
        } else {
            Err(serde::de::Error::custom(format!(
                "expected version {}, got {}",
                Self::VALUE,
                num
            )))
        }
    }
}

impl Display for X402Version2 {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Self::VALUE)
    }
}

/// The resource being paid for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceInfo {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl ResourceInfo {
    pub fn new<U: Into<String>>(url: U) -> Self {
        Self {
            url: url.into(),
            description: None,
            mime_type: None,
        }
    }
}

/// Scheme-specific extras on a requirement.
///
/// Only `fee` is interpreted by the engine. Token metadata and anything unknown is kept
/// verbatim so requirements survive a round trip through a client unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementsExtra {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<FeeInfo>,
    /// Token name, e.g. `Tether USD`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

/// Payment terms presented by a resource server. Immutable once presented.
///
/// Addresses stay in the chain's native form and amounts are decimal strings in the
/// token's smallest unit.
///
/// ```
/// use x402_types::proto::PaymentRequirements;
///
/// let requirements: PaymentRequirements = serde_json::from_str(r#"{
///     "scheme": "upto",
///     "network": "tron:nile",
///     "amount": "1000000",
///     "asset": "TXYZopYRdj2D9XRtbG411XZZ3kM5VkAeBf",
///     "payTo": "TPXrwNuRbkEJhAqn4YhNdaR7xnxg8ZSgrG",
///     "extra": { "fee": { "feeTo": "TPXrwNuRbkEJhAqn4YhNdaR7xnxg8ZSgrG", "feeAmount": "1000" } }
/// }"#).unwrap();
/// assert_eq!(requirements.fee().map(|fee| fee.fee_amount.as_str()), Some("1000"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirements {
    pub scheme: String,
    pub network: ChainId,
    pub amount: String,
    pub asset: String,
    pub pay_to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_timeout_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<RequirementsExtra>,
}

impl PaymentRequirements {
    /// Fee routing carried in `extra.fee`, if any.
    pub fn fee(&self) -> Option<&FeeInfo> {
        self.extra.as_ref().and_then(|extra| extra.fee.as_ref())
    }
}

/// A signed payment authorization, together with the requirements the buyer accepted.
///
/// `TPayload` is the scheme-specific signed payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload<TPayload = serde_json::Value> {
    pub x402_version: X402Version2,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceInfo>,
    pub accepted: PaymentRequirements,
    pub payload: TPayload,
    #[serde(default)]
    pub extensions: serde_json::Map<String, serde_json::Value>,
}

/// HTTP 402 Payment Required response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequired {
    pub x402_version: X402Version2,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceInfo>,
    #[serde(default)]
    pub accepts: Vec<PaymentRequirements>,
    /// Extensions the client feeds into payload construction, e.g. `paymentPermitContext`.
    #[serde(default)]
    pub extensions: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_marker() {
        assert_eq!(serde_json::to_string(&X402Version2).unwrap(), "2");
        assert!(serde_json::from_str::<X402Version2>("2").is_ok());
        assert!(serde_json::from_str::<X402Version2>("1").is_err());
    }

    #[test]
    fn test_requirements_keep_unknown_extra() {
        let json = serde_json::json!({
            "scheme": "upto",
            "network": "eip155:8453",
            "amount": "1000000",
            "asset": "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913",
            "payTo": "0x1111111111111111111111111111111111111111",
            "extra": { "name": "USD Coin", "decimals": 6 }
        });
        let requirements: PaymentRequirements = serde_json::from_value(json.clone()).unwrap();
        assert!(requirements.fee().is_none());
        let extra = requirements.extra.as_ref().unwrap();
        assert_eq!(extra.name.as_deref(), Some("USD Coin"));
        assert_eq!(extra.other.get("decimals"), Some(&serde_json::json!(6)));
        assert_eq!(serde_json::to_value(&requirements).unwrap(), json);
    }

    #[test]
    fn test_payment_required_defaults() {
        let required: PaymentRequired =
            serde_json::from_str(r#"{ "x402Version": 2, "accepts": [] }"#).unwrap();
        assert!(required.accepts.is_empty());
        assert!(required.extensions.is_empty());
        assert!(required.resource.is_none());
    }
}
