//! The payment permit and its wire representation.
//!
//! A [`PaymentPermit`] is what the buyer signs. On the wire it keeps chain-native address
//! strings and decimal-string amounts, exactly as the buyer's wallet saw them:
//!
//! ```json
//! {
//!   "meta": {
//!     "kind": "PAYMENT_ONLY",
//!     "paymentId": "0x8f0c4ab2d8e2d3b4a3f1c0d9e8b7a6f5",
//!     "nonce": "0",
//!     "validAfter": 0,
//!     "validBefore": 1700003600
//!   },
//!   "buyer": "TPXrwNuRbkEJhAqn4YhNdaR7xnxg8ZSgrG",
//!   "caller": "T9yD14Nj9j7xAB4dbGeiX9h8unkKHxuWwb",
//!   "payment": { "payToken": "TXYZ...", "maxPayAmount": "1000000", "payTo": "TMer..." },
//!   "fee": { "feeTo": "TFee...", "feeAmount": "1000" },
//!   "delivery": { "receiveToken": "T9yD14Nj9j7xAB4dbGeiX9h8unkKHxuWwb", "miniReceiveAmount": "0", "tokenId": "0" }
//! }
//! ```
//!
//! Conversion into signed, strongly-typed form happens only in [`crate::typed_data`].

use alloy_primitives::{Bytes, U256};
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use x402_types::proto::v2;
use x402_types::timestamp::UnixTimestamp;

/// Extension key under which a client receives permit construction hints.
pub const PAYMENT_PERMIT_CONTEXT: &str = "paymentPermitContext";

/// Validity window used when requirements do not state `maxTimeoutSeconds`.
pub const DEFAULT_VALIDITY_SECS: u64 = 3600;

/// Scheme identifier for bounded pull payments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UptoScheme;

impl UptoScheme {
    pub const VALUE: &'static str = "upto";
}

impl AsRef<str> for UptoScheme {
    fn as_ref(&self) -> &str {
        Self::VALUE
    }
}

impl Display for UptoScheme {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(Self::VALUE)
    }
}

impl PartialEq<UptoScheme> for String {
    fn eq(&self, _other: &UptoScheme) -> bool {
        self == UptoScheme::VALUE
    }
}

/// What the settlement is expected to do besides pulling the payment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermitKind {
    /// Pull the payment, nothing else.
    #[default]
    PaymentOnly,
    /// Pull the payment through a merchant contract that delivers in the same transaction.
    PaymentAndDelivery,
}

impl PermitKind {
    /// Value of the `kind` field in the signed struct.
    pub fn as_u8(&self) -> u8 {
        match self {
            PermitKind::PaymentOnly => 0,
            PermitKind::PaymentAndDelivery => 1,
        }
    }
}

/// 16-byte payment identifier, half of the on-chain replay key.
///
/// Serialized as `0x`-prefixed hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PaymentId(pub [u8; 16]);

impl PaymentId {
    pub const LEN: usize = 16;

    /// Fresh identifier from the thread-local CSPRNG.
    pub fn random() -> Self {
        Self(rand::rng().random())
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentIdError {
    #[error("Payment id is not hex: {0}")]
    NotHex(String),
    #[error("Payment id must be {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },
}

impl FromStr for PaymentId {
    type Err = PaymentIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = alloy_primitives::hex::decode(digits)
            .map_err(|_| PaymentIdError::NotHex(s.to_string()))?;
        let array: [u8; 16] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| PaymentIdError::Length {
                expected: Self::LEN,
                actual: bytes.len(),
            })?;
        Ok(Self(array))
    }
}

impl Display for PaymentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", alloy_primitives::hex::encode(self.0))
    }
}

impl Serialize for PaymentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PaymentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Accepts a decimal amount either as a string or as a bare JSON integer.
mod decimal_string {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Wire {
        Text(String),
        Number(u64),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(match Wire::deserialize(deserializer)? {
            Wire::Text(s) => s,
            Wire::Number(n) => n.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermitMeta {
    pub kind: PermitKind,
    pub payment_id: PaymentId,
    #[serde(deserialize_with = "decimal_string::deserialize")]
    pub nonce: String,
    pub valid_after: UnixTimestamp,
    pub valid_before: UnixTimestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub pay_token: String,
    /// Upper bound of the pull, not the charged amount.
    #[serde(deserialize_with = "decimal_string::deserialize")]
    pub max_pay_amount: String,
    pub pay_to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fee {
    pub fee_to: String,
    #[serde(deserialize_with = "decimal_string::deserialize")]
    pub fee_amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    pub receive_token: String,
    #[serde(deserialize_with = "decimal_string::deserialize")]
    pub mini_receive_amount: String,
    #[serde(deserialize_with = "decimal_string::deserialize")]
    pub token_id: String,
}

/// A bounded pull-payment authorization. Immutable once signed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPermit {
    pub meta: PermitMeta,
    pub buyer: String,
    /// Only this address may submit the permit; the chain's zero address means anyone.
    pub caller: String,
    pub payment: Payment,
    pub fee: Fee,
    pub delivery: Delivery,
}

/// Signed payload carried in `PaymentPayload.payload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UptoPayload {
    /// 65-byte `r || s || v` signature, `0x`-hex on the wire.
    pub signature: Bytes,
    pub payment_permit: PaymentPermit,
}

pub type UptoPaymentPayload = v2::PaymentPayload<UptoPayload>;

// ============================================================================
// Permit context extension
// ============================================================================

/// Buyer-side overrides for permit construction, read from
/// `extensions.paymentPermitContext`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermitContext {
    #[serde(default)]
    pub meta: PermitContextMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caller: Option<String>,
    #[serde(default)]
    pub delivery: PermitContextDelivery,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermitContextMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<PermitKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<PaymentId>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "optional_decimal_string"
    )]
    pub nonce: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_after: Option<UnixTimestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_before: Option<UnixTimestamp>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermitContextDelivery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receive_token: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "optional_decimal_string"
    )]
    pub mini_receive_amount: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "optional_decimal_string"
    )]
    pub token_id: Option<String>,
}

fn optional_decimal_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    decimal_string::deserialize(deserializer).map(Some)
}

impl PermitContext {
    /// Reads the context from payment extensions.
    ///
    /// `Ok(None)` when the key is absent. An explicit `null` counts as absent.
    pub fn from_extensions(
        extensions: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Option<Self>, serde_json::Error> {
        match extensions.get(PAYMENT_PERMIT_CONTEXT) {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone()).map(Some),
        }
    }
}

// ============================================================================
// Amounts
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid amount {0:?}: expected a non-negative decimal integer")]
pub struct AmountError(pub String);

/// Parses a decimal amount in the token's smallest unit.
pub fn parse_amount(s: &str) -> Result<U256, AmountError> {
    let trimmed = s.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AmountError(s.to_string()));
    }
    U256::from_str_radix(trimmed, 10).map_err(|_| AmountError(s.to_string()))
}
