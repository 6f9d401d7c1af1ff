//! Mechanism traits.
//!
//! A mechanism is one payment scheme on one chain family. Client mechanisms build signed
//! payloads; facilitator mechanisms quote fees, verify and settle. Both are used as trait
//! objects so that a registry can hold mechanisms for several chains at once.

use alloy_primitives::U256;
use async_trait::async_trait;
use x402_types::proto::{
    FeeQuoteResponse, PaymentPayload, PaymentRequirements, SettleResponse, VerifyResponse,
};

use crate::error::{FacilitatorError, X402Error};

#[async_trait]
pub trait ClientMechanism: Send + Sync {
    fn scheme(&self) -> &str;

    /// Builds and signs a payload satisfying `requirements`.
    ///
    /// `resource` is the URL of the paid resource. `extensions` are the extensions the server
    /// sent along with its requirements.
    async fn create_payment_payload(
        &self,
        requirements: &PaymentRequirements,
        resource: &str,
        extensions: Option<&serde_json::Map<String, serde_json::Value>>,
    ) -> Result<PaymentPayload, X402Error>;

    /// Balance the mechanism's signer holds of `requirements.asset`, if it can tell.
    async fn balance_of(
        &self,
        _requirements: &PaymentRequirements,
    ) -> Result<Option<U256>, X402Error> {
        Ok(None)
    }
}

#[async_trait]
pub trait FacilitatorMechanism: Send + Sync {
    fn scheme(&self) -> &str;

    /// Address the mechanism settles from, in the chain's native form.
    fn signer_address(&self) -> String;

    async fn fee_quote(
        &self,
        requirements: &PaymentRequirements,
    ) -> Result<FeeQuoteResponse, FacilitatorError>;

    /// Off-chain pre-check of `payload` against `requirements`. Side-effect free.
    ///
    /// Every rule violation is an `isValid: false` response; `Err` is reserved for
    /// configuration and transport failures.
    async fn verify(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<VerifyResponse, FacilitatorError>;

    /// Verifies, then submits the permit and waits for finality.
    async fn settle(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<SettleResponse, FacilitatorError>;
}
