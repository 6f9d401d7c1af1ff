use x402_types::proto::{ErrorReason, PaymentRequirements, VerifyResponse};
use x402_types::timestamp::UnixTimestamp;

#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::address::AddressCodec;
use crate::error::FacilitatorError;
use crate::facilitator::UptoFacilitator;
use crate::permit::{PaymentPermit, UptoPayload, parse_amount};
use crate::signer::FacilitatorSigner;
use crate::typed_data::{CanonicalizeError, TypedPermit};

impl<S, C> UptoFacilitator<S, C>
where
    S: FacilitatorSigner,
    C: AddressCodec,
{
    /// Verifies a permit against `requirements` at the current time.
    #[cfg_attr(
        feature = "telemetry",
        instrument(skip_all, err, fields(network = %requirements.network))
    )]
    pub async fn verify_permit(
        &self,
        payload: &UptoPayload,
        requirements: &PaymentRequirements,
    ) -> Result<VerifyResponse, FacilitatorError> {
        self.verify_permit_at(payload, requirements, UnixTimestamp::now())
            .await
    }

    pub async fn verify_permit_at(
        &self,
        payload: &UptoPayload,
        requirements: &PaymentRequirements,
        now: UnixTimestamp,
    ) -> Result<VerifyResponse, FacilitatorError> {
        let response = match self.validate(payload, requirements, now).await? {
            Ok(_) => VerifyResponse::valid(),
            Err(reason) => VerifyResponse::invalid(reason),
        };
        Ok(response)
    }

    /// Runs every check in order and stops at the first failure.
    ///
    /// On success returns the canonical permit, ready for settlement.
    pub(crate) async fn validate(
        &self,
        payload: &UptoPayload,
        requirements: &PaymentRequirements,
        now: UnixTimestamp,
    ) -> Result<Result<TypedPermit, ErrorReason>, FacilitatorError> {
        let permit = &payload.payment_permit;
        tracing::info!(
            payment_id = %permit.meta.payment_id,
            buyer = %permit.buyer,
            amount = %permit.payment.max_pay_amount,
            "Verifying payment permit"
        );

        if let Err(reason) = self.check_terms(permit, requirements, now) {
            tracing::warn!(%reason, payment_id = %permit.meta.payment_id, "Permit rejected");
            return Ok(Err(reason));
        }

        let built = TypedPermit::build(permit, &requirements.network, &self.networks, &self.codec);
        let typed = match built {
            Ok(typed) => typed,
            Err(CanonicalizeError::Network(e)) => return Err(e.into()),
            Err(e) => {
                tracing::warn!(error = %e, "Permit cannot be canonicalized");
                return Ok(Err(ErrorReason::InvalidFormat));
            }
        };
        let buyer = typed.message.buyer;
        let signed_by_buyer = self
            .signer
            .verify_typed_data(buyer, &typed, &payload.signature)
            .await?;
        if !signed_by_buyer {
            tracing::warn!(%buyer, "Invalid permit signature");
            return Ok(Err(ErrorReason::InvalidSignature));
        }

        tracing::info!(payment_id = %permit.meta.payment_id, "Payment permit verified");
        Ok(Ok(typed))
    }

    /// Field and time-window checks, everything except the signature.
    ///
    /// Both ends of the validity window are inclusive.
    fn check_terms(
        &self,
        permit: &PaymentPermit,
        requirements: &PaymentRequirements,
        now: UnixTimestamp,
    ) -> Result<(), ErrorReason> {
        let max_pay_amount =
            parse_amount(&permit.payment.max_pay_amount).map_err(|_| ErrorReason::InvalidFormat)?;
        let required_amount =
            parse_amount(&requirements.amount).map_err(|_| ErrorReason::InvalidFormat)?;
        if max_pay_amount < required_amount {
            return Err(ErrorReason::AmountMismatch);
        }
        if !self
            .codec
            .same_address(&permit.payment.pay_to, &requirements.pay_to)
        {
            return Err(ErrorReason::PayToMismatch);
        }
        if !self
            .codec
            .same_address(&permit.payment.pay_token, &requirements.asset)
        {
            return Err(ErrorReason::TokenMismatch);
        }
        if now > permit.meta.valid_before {
            return Err(ErrorReason::Expired);
        }
        if now < permit.meta.valid_after {
            return Err(ErrorReason::NotYetValid);
        }
        Ok(())
    }
}
