use x402_types::chain::ChainId;
use x402_types::networks::NetworkError;

use crate::address::AddressError;
use crate::permit::AmountError;
use crate::signer::SignerError;
use crate::typed_data::CanonicalizeError;

/// Client-side failures: selection, construction and signing.
///
/// None of these are retried by the engine.
#[derive(Debug, thiserror::Error)]
pub enum X402Error {
    #[error("No supported payment requirements found")]
    NoSupportedRequirements,
    #[error("No mechanism registered for network {0}")]
    NoMechanismRegistered(ChainId),
    #[error("paymentPermitContext is required")]
    MissingPaymentContext,
    #[error("Invalid paymentPermitContext: {0}")]
    InvalidPaymentContext(#[source] serde_json::Error),
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error(transparent)]
    Amount(#[from] AmountError),
    #[error(transparent)]
    Canonicalize(#[from] CanonicalizeError),
    #[error(transparent)]
    Signer(#[from] SignerError),
    #[error("Failed to serialize payload: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Facilitator-side failures that cannot be reported as an
/// [`ErrorReason`](x402_types::proto::ErrorReason).
#[derive(Debug, thiserror::Error)]
pub enum FacilitatorError {
    /// Network registry or settlement contract misconfiguration.
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error(transparent)]
    Signer(#[from] SignerError),
}
