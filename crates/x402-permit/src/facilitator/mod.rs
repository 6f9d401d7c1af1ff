//! Facilitator side: fee quotes, permit validation and settlement.
//!
//! [`UptoFacilitator`] is the facilitator mechanism for the `upto` scheme on one chain family.
//! [`FacilitatorRegistry`] routes requests to mechanisms by scheme and network.
//!
//! Verification is an optimistic off-chain pre-check. The settlement contract re-checks the
//! time window, caller restriction and amount bound, and alone enforces nonce uniqueness: two
//! concurrent settlements of the same permit both pass [`verify`](UptoFacilitator::verify_permit)
//! and exactly one lands on-chain.

mod registry;
mod settle;
mod verify;

pub use registry::*;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use x402_types::networks::NetworkRegistry;
use x402_types::proto::{
    ErrorReason, FeeInfo, FeeQuoteResponse, PaymentPayload, PaymentRequirements, SettleResponse,
    VerifyResponse,
};
use x402_types::timestamp::UnixTimestamp;

use crate::address::AddressCodec;
use crate::error::FacilitatorError;
use crate::permit::{UptoPayload, UptoScheme};
use crate::scheme::FacilitatorMechanism;
use crate::signer::FacilitatorSigner;

/// Pricing model reported in fee quotes: one flat fee per accepted requirement.
pub const PRICING_PER_ACCEPT: &str = "per_accept";

/// Fee offered to clients.
///
/// ```json
/// { "feeTo": "TFee...", "baseFee": 1000000, "quoteTtlSeconds": 300 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeConfig {
    /// Fee recipient in native form. Defaults to the facilitator signer's address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_to: Option<String>,
    /// Flat fee in the token's smallest unit.
    #[serde(default = "fee_config::default_base_fee")]
    pub base_fee: u64,
    /// How long a quote stays valid.
    #[serde(default = "fee_config::default_quote_ttl_seconds")]
    pub quote_ttl_seconds: u64,
}

mod fee_config {
    pub fn default_base_fee() -> u64 {
        1_000_000
    }
    pub fn default_quote_ttl_seconds() -> u64 {
        300
    }
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            fee_to: None,
            base_fee: fee_config::default_base_fee(),
            quote_ttl_seconds: fee_config::default_quote_ttl_seconds(),
        }
    }
}

/// Facilitator mechanism for the `upto` scheme.
///
/// Stateless apart from configuration: every verify and settle call is independent and may run
/// concurrently with others.
pub struct UptoFacilitator<S, C> {
    signer: S,
    codec: C,
    networks: Arc<NetworkRegistry>,
    fee: FeeConfig,
}

impl<S, C> UptoFacilitator<S, C>
where
    S: FacilitatorSigner,
    C: AddressCodec,
{
    pub fn new(signer: S, codec: C, networks: Arc<NetworkRegistry>) -> Self {
        let facilitator = Self {
            signer,
            codec,
            networks,
            fee: FeeConfig::default(),
        };
        tracing::info!(
            namespace = facilitator.codec.namespace(),
            fee_to = %facilitator.fee_to(),
            base_fee = facilitator.fee.base_fee,
            "Initialized upto facilitator"
        );
        facilitator
    }

    pub fn with_fee_config(mut self, fee: FeeConfig) -> Self {
        self.fee = fee;
        self
    }

    pub fn signer(&self) -> &S {
        &self.signer
    }

    fn fee_to(&self) -> String {
        self.fee
            .fee_to
            .clone()
            .unwrap_or_else(|| self.codec.to_native(self.signer.address()))
    }

    /// Quotes the flat fee for `requirements`, valid from `now` for the configured TTL.
    pub fn fee_quote_at(
        &self,
        requirements: &PaymentRequirements,
        now: UnixTimestamp,
    ) -> FeeQuoteResponse {
        let fee_amount = self.fee.base_fee.to_string();
        tracing::info!(
            network = %requirements.network,
            amount = %requirements.amount,
            fee = %fee_amount,
            "Fee quote requested"
        );
        FeeQuoteResponse {
            fee: FeeInfo {
                fee_to: self.fee_to(),
                fee_amount,
            },
            pricing: PRICING_PER_ACCEPT.to_string(),
            network: requirements.network.clone(),
            expires_at: now + self.fee.quote_ttl_seconds,
        }
    }
}

/// Reads the scheme payload; anything that does not deserialize is `invalid_format`.
fn upto_payload(payload: &PaymentPayload) -> Result<UptoPayload, ErrorReason> {
    serde_json::from_value(payload.payload.clone()).map_err(|e| {
        tracing::warn!(error = %e, "Malformed upto payload");
        ErrorReason::InvalidFormat
    })
}

#[async_trait]
impl<S, C> FacilitatorMechanism for UptoFacilitator<S, C>
where
    S: FacilitatorSigner,
    C: AddressCodec,
{
    fn scheme(&self) -> &str {
        UptoScheme::VALUE
    }

    fn signer_address(&self) -> String {
        self.codec.to_native(self.signer.address())
    }

    async fn fee_quote(
        &self,
        requirements: &PaymentRequirements,
    ) -> Result<FeeQuoteResponse, FacilitatorError> {
        Ok(self.fee_quote_at(requirements, UnixTimestamp::now()))
    }

    async fn verify(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<VerifyResponse, FacilitatorError> {
        match upto_payload(payload) {
            Ok(payload) => self.verify_permit(&payload, requirements).await,
            Err(reason) => Ok(VerifyResponse::invalid(reason)),
        }
    }

    async fn settle(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<SettleResponse, FacilitatorError> {
        match upto_payload(payload) {
            Ok(payload) => self.settle_permit(&payload, requirements).await,
            Err(reason) => Ok(SettleResponse::failure(
                reason,
                requirements.network.clone(),
            )),
        }
    }
}
