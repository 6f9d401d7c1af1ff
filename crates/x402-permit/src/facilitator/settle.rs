use alloy_primitives::Bytes;
use alloy_sol_types::SolCall;
use x402_types::networks::NetworkError;
use x402_types::proto::{ErrorReason, PaymentRequirements, SettleResponse};
use x402_types::timestamp::UnixTimestamp;

#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::address::AddressCodec;
use crate::error::FacilitatorError;
use crate::facilitator::UptoFacilitator;
use crate::permit::{PermitKind, UptoPayload};
use crate::signer::{ContractCall, FacilitatorSigner, SignerError};
use crate::typed_data::{TypedPermit, sol};

impl<S, C> UptoFacilitator<S, C>
where
    S: FacilitatorSigner,
    C: AddressCodec,
{
    /// Verifies the permit, submits it and waits for the transaction to be final.
    ///
    /// Nothing is sent when verification fails. A transaction that reverts is reported as
    /// `transaction_failed` together with its id.
    #[cfg_attr(
        feature = "telemetry",
        instrument(skip_all, err, fields(network = %requirements.network))
    )]
    pub async fn settle_permit(
        &self,
        payload: &UptoPayload,
        requirements: &PaymentRequirements,
    ) -> Result<SettleResponse, FacilitatorError> {
        let network = requirements.network.clone();
        let permit = &payload.payment_permit;
        tracing::info!(
            payment_id = %permit.meta.payment_id,
            kind = ?permit.meta.kind,
            %network,
            "Starting settlement"
        );

        let typed = match self
            .validate(payload, requirements, UnixTimestamp::now())
            .await?
        {
            Ok(typed) => typed,
            Err(reason) => {
                tracing::warn!(%reason, "Settlement refused, permit did not verify");
                return Ok(SettleResponse::failure(reason, network));
            }
        };

        let call =
            self.settlement_call(&typed, permit.meta.kind, requirements, &payload.signature)?;
        tracing::info!(to = %call.to, function = call.function, "Submitting settlement");
        let Some(transaction) = self.signer.write_contract(call).await? else {
            tracing::error!("Settlement produced no transaction id");
            return Ok(SettleResponse::failure(
                ErrorReason::TransactionFailed,
                network,
            ));
        };

        tracing::info!(%transaction, "Settlement broadcast, waiting for receipt");
        match self.signer.wait_for_transaction_receipt(&transaction).await {
            Ok(receipt) => {
                tracing::info!(%transaction, block = ?receipt.block_number, "Settlement confirmed");
                Ok(SettleResponse::success(transaction, network))
            }
            Err(SignerError::Reverted(_)) => {
                tracing::error!(%transaction, "Settlement reverted");
                Ok(SettleResponse {
                    transaction: Some(transaction),
                    ..SettleResponse::failure(ErrorReason::TransactionFailed, network)
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// The contract write for `kind`.
    ///
    /// `PAYMENT_ONLY` goes to the settlement contract the permit was signed for.
    /// `PAYMENT_AND_DELIVERY` goes to the merchant contract at `requirements.payTo`.
    fn settlement_call(
        &self,
        typed: &TypedPermit,
        kind: PermitKind,
        requirements: &PaymentRequirements,
        signature: &Bytes,
    ) -> Result<ContractCall, FacilitatorError> {
        let call = match kind {
            PermitKind::PaymentOnly => ContractCall {
                to: typed.verifying_contract().ok_or_else(|| {
                    NetworkError::MissingSettlementContract(requirements.network.clone())
                })?,
                function: sol::IPaymentPermit::permitTransferFromCall::SIGNATURE,
                calldata: typed.permit_transfer_from_calldata(signature),
            },
            PermitKind::PaymentAndDelivery => ContractCall {
                to: self.codec.to_canonical(&requirements.pay_to)?,
                function: sol::IMerchant::settleCall::SIGNATURE,
                calldata: typed.merchant_settle_calldata(signature),
            },
        };
        Ok(call)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permit::PermitKind;
    use crate::test_support::{
        HexCodec, MERCHANT, MockFacilitatorSigner, TEST_CONTRACT, requirements, signed_payload,
        test_registry,
    };
    use alloy_primitives::Address;
    use alloy_signer_local::PrivateKeySigner;
    use std::sync::Arc;

    fn facilitator(
        signer: MockFacilitatorSigner,
    ) -> UptoFacilitator<MockFacilitatorSigner, HexCodec> {
        UptoFacilitator::new(signer, HexCodec, Arc::new(test_registry()))
    }

    #[tokio::test]
    async fn test_payment_only_targets_settlement_contract() {
        let key = PrivateKeySigner::random();
        let payload = signed_payload(&key, |_| {});
        let facilitator = facilitator(MockFacilitatorSigner::new().with_transaction("0xabc"));
        let response = facilitator
            .settle_permit(&payload, &requirements())
            .await
            .unwrap();
        assert_eq!(response, SettleResponse::success("0xabc".into(), requirements().network));

        let calls = facilitator.signer().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].to, TEST_CONTRACT.parse::<Address>().unwrap());
        assert_ne!(calls[0].to, MERCHANT.parse::<Address>().unwrap());
        assert_eq!(
            &calls[0].calldata[..4],
            &sol::IPaymentPermit::permitTransferFromCall::SELECTOR[..]
        );
        let decoded =
            sol::IPaymentPermit::permitTransferFromCall::abi_decode(&calls[0].calldata).unwrap();
        assert_eq!(decoded.owner, key.address());
        assert_eq!(decoded.signature, payload.signature);
        assert_eq!(facilitator.signer().awaited(), vec!["0xabc".to_string()]);
    }

    #[tokio::test]
    async fn test_payment_and_delivery_targets_merchant() {
        let key = PrivateKeySigner::random();
        let payload = signed_payload(&key, |p| p.meta.kind = PermitKind::PaymentAndDelivery);
        let facilitator = facilitator(MockFacilitatorSigner::new().with_transaction("0xdef"));
        let response = facilitator
            .settle_permit(&payload, &requirements())
            .await
            .unwrap();
        assert!(response.success);

        let calls = facilitator.signer().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].to, MERCHANT.parse::<Address>().unwrap());
        assert_ne!(calls[0].to, TEST_CONTRACT.parse::<Address>().unwrap());
        assert_eq!(&calls[0].calldata[..4], &sol::IMerchant::settleCall::SELECTOR[..]);
    }

    #[tokio::test]
    async fn test_failed_verification_touches_nothing() {
        let key = PrivateKeySigner::random();
        let payload = signed_payload(&key, |p| p.payment.max_pay_amount = "999999".into());
        let facilitator = facilitator(MockFacilitatorSigner::new().with_transaction("0xabc"));
        let response = facilitator
            .settle_permit(&payload, &requirements())
            .await
            .unwrap();
        assert_eq!(
            response,
            SettleResponse::failure(ErrorReason::AmountMismatch, requirements().network)
        );
        assert!(facilitator.signer().calls().is_empty());
        assert!(facilitator.signer().awaited().is_empty());
    }

    #[tokio::test]
    async fn test_no_transaction_id() {
        let key = PrivateKeySigner::random();
        let payload = signed_payload(&key, |_| {});
        let facilitator = facilitator(MockFacilitatorSigner::new());
        let response = facilitator
            .settle_permit(&payload, &requirements())
            .await
            .unwrap();
        assert_eq!(
            response,
            SettleResponse::failure(ErrorReason::TransactionFailed, requirements().network)
        );
        assert_eq!(facilitator.signer().calls().len(), 1);
        assert!(facilitator.signer().awaited().is_empty());
    }

    #[tokio::test]
    async fn test_revert_is_reported_with_transaction() {
        let key = PrivateKeySigner::random();
        let payload = signed_payload(&key, |_| {});
        let facilitator = facilitator(
            MockFacilitatorSigner::new()
                .with_transaction("0xbad")
                .reverting(),
        );
        let response = facilitator
            .settle_permit(&payload, &requirements())
            .await
            .unwrap();
        assert!(!response.success);
        assert_eq!(response.error_reason, Some(ErrorReason::TransactionFailed));
        assert_eq!(response.transaction.as_deref(), Some("0xbad"));
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let key = PrivateKeySigner::random();
        let payload = signed_payload(&key, |_| {});
        let facilitator = facilitator(MockFacilitatorSigner::new().failing_writes());
        let err = facilitator
            .settle_permit(&payload, &requirements())
            .await
            .unwrap_err();
        assert!(matches!(err, FacilitatorError::Signer(SignerError::Rpc(_))));
    }
}
