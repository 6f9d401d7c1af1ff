//! Protocol types for x402 payment messages.
//!
//! All types serialize to JSON with camelCase field names.
//!
//! - [`v2`] - Requirements, payloads and the 402 body (protocol version 2)
//! - [`VerifyResponse`] / [`SettleResponse`] / [`FeeQuoteResponse`] - Facilitator answers
//! - [`ErrorReason`] - Machine-readable failure codes
//! - [`SupportedResponse`] - What a facilitator can verify and settle

use serde::{Deserialize, Serialize};
use serde_with::{VecSkipError, serde_as};
use std::collections::HashMap;

use crate::chain::ChainId;
use crate::timestamp::UnixTimestamp;

pub mod v2;

pub use v2::{
    PaymentPayload, PaymentRequired, PaymentRequirements, RequirementsExtra, ResourceInfo,
    X402Version2,
};

/// Machine-readable reason codes for failed verification or settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorReason {
    /// The permit's `maxPayAmount` is below the required amount.
    AmountMismatch,
    /// The permit pays a different recipient than required.
    #[serde(rename = "payto_mismatch")]
    PayToMismatch,
    /// The permit pays with a different token than required.
    TokenMismatch,
    /// `validBefore` is in the past.
    Expired,
    /// `validAfter` is in the future.
    NotYetValid,
    /// The signature does not recover to the permit's buyer.
    InvalidSignature,
    /// The settlement write produced no transaction id.
    TransactionFailed,
    /// No chain id or contract is known for the network.
    UnsupportedNetwork,
    /// No mechanism handles the scheme on the network.
    UnsupportedScheme,
    /// The payload could not be interpreted.
    InvalidFormat,
    /// Anything else, typically a transport or signer failure.
    UnexpectedError,
}

impl ErrorReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorReason::AmountMismatch => "amount_mismatch",
            ErrorReason::PayToMismatch => "payto_mismatch",
            ErrorReason::TokenMismatch => "token_mismatch",
            ErrorReason::Expired => "expired",
            ErrorReason::NotYetValid => "not_yet_valid",
            ErrorReason::InvalidSignature => "invalid_signature",
            ErrorReason::TransactionFailed => "transaction_failed",
            ErrorReason::UnsupportedNetwork => "unsupported_network",
            ErrorReason::UnsupportedScheme => "unsupported_scheme",
            ErrorReason::InvalidFormat => "invalid_format",
            ErrorReason::UnexpectedError => "unexpected_error",
        }
    }
}

impl std::fmt::Display for ErrorReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of verifying a payment payload against requirements.
///
/// ```json
/// { "isValid": false, "invalidReason": "amount_mismatch" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_reason: Option<ErrorReason>,
}

impl VerifyResponse {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            invalid_reason: None,
        }
    }

    pub fn invalid(reason: ErrorReason) -> Self {
        Self {
            is_valid: false,
            invalid_reason: Some(reason),
        }
    }
}

/// Result of settling a payment on-chain.
///
/// ```json
/// { "success": true, "transaction": "0xabc...", "network": "tron:nile" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<ErrorReason>,
    pub network: ChainId,
}

impl SettleResponse {
    pub fn success(transaction: String, network: ChainId) -> Self {
        Self {
            success: true,
            transaction: Some(transaction),
            error_reason: None,
            network,
        }
    }

    pub fn failure(reason: ErrorReason, network: ChainId) -> Self {
        Self {
            success: false,
            transaction: None,
            error_reason: Some(reason),
            network,
        }
    }
}

/// Fee routing: who receives the facilitator fee and how much.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeInfo {
    pub fee_to: String,
    /// Decimal string in the token's smallest unit.
    pub fee_amount: String,
}

/// A facilitator's fee offer for one accepted requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeQuoteResponse {
    pub fee: FeeInfo,
    /// Pricing model, `per_accept` for a flat fee per accepted requirement.
    pub pricing: String,
    pub network: ChainId,
    pub expires_at: UnixTimestamp,
}

/// Describes a payment method supported by a facilitator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedPaymentKind {
    pub x402_version: u8,
    pub scheme: String,
    /// A network id or a network pattern such as `tron:*`.
    pub network: String,
}

/// What a facilitator can verify and settle, and with which signer addresses.
///
/// ```json
/// {
///   "kinds": [{ "x402Version": 2, "scheme": "upto", "network": "tron:nile" }],
///   "signers": { "tron:*": ["TXYZ..."] }
/// }
/// ```
#[serde_as]
#[derive(Clone, Default, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedResponse {
    #[serde_as(as = "VecSkipError<_>")]
    pub kinds: Vec<SupportedPaymentKind>,
    /// Signer addresses in native form, keyed by network pattern.
    #[serde(default)]
    pub signers: HashMap<String, Vec<String>>,
}
