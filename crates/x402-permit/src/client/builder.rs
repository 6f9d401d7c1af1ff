use alloy_primitives::U256;
use async_trait::async_trait;
use std::sync::Arc;
use x402_types::networks::NetworkRegistry;
use x402_types::proto::{PaymentPayload, PaymentRequirements, ResourceInfo, X402Version2};
use x402_types::timestamp::UnixTimestamp;

#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::address::AddressCodec;
use crate::error::X402Error;
use crate::permit::{
    AmountError, DEFAULT_VALIDITY_SECS, Delivery, Fee, Payment, PaymentId, PaymentPermit,
    PermitContext, PermitMeta, UptoPayload, UptoPaymentPayload, UptoScheme, parse_amount,
};
use crate::scheme::ClientMechanism;
use crate::signer::{ClientSigner, SignerError};
use crate::typed_data::TypedPermit;

/// Client mechanism for the `upto` scheme: builds, approves and signs payment permits.
///
/// Generic over the signer `S` and the chain's address codec `C`, so the same builder serves
/// every chain family.
pub struct UptoClient<S, C> {
    signer: S,
    codec: C,
    networks: Arc<NetworkRegistry>,
}

impl<S, C> UptoClient<S, C> {
    pub fn new(signer: S, codec: C, networks: Arc<NetworkRegistry>) -> Self {
        Self {
            signer,
            codec,
            networks,
        }
    }

    pub fn signer(&self) -> &S {
        &self.signer
    }
}

impl<S, C> UptoClient<S, C>
where
    S: ClientSigner,
    C: AddressCodec,
{
    /// Assembles the unsigned permit.
    ///
    /// Payment terms come from `requirements`, fee routing from `requirements.extra.fee`, the
    /// rest from `context` with these defaults: kind `PAYMENT_ONLY`, a random payment id,
    /// nonce `0`, valid from `0` until `now + maxTimeoutSeconds`, and the chain's zero address
    /// for `caller`, `fee.feeTo` and `delivery.receiveToken`.
    pub fn build_permit(
        &self,
        requirements: &PaymentRequirements,
        context: &PermitContext,
        now: UnixTimestamp,
    ) -> PaymentPermit {
        let zero = self.codec.zero_address();
        let validity = requirements
            .max_timeout_seconds
            .unwrap_or(DEFAULT_VALIDITY_SECS);
        let (fee_to, fee_amount) = match requirements.fee() {
            Some(fee) => (fee.fee_to.clone(), fee.fee_amount.clone()),
            None => (zero.clone(), "0".to_string()),
        };
        let meta = &context.meta;
        let delivery = &context.delivery;
        PaymentPermit {
            meta: PermitMeta {
                kind: meta.kind.unwrap_or_default(),
                payment_id: meta.payment_id.unwrap_or_else(PaymentId::random),
                nonce: meta.nonce.clone().unwrap_or_else(|| "0".to_string()),
                valid_after: meta.valid_after.unwrap_or_default(),
                valid_before: meta.valid_before.unwrap_or(now + validity),
            },
            buyer: self.codec.to_native(self.signer.address()),
            caller: context.caller.clone().unwrap_or_else(|| zero.clone()),
            payment: Payment {
                pay_token: requirements.asset.clone(),
                max_pay_amount: requirements.amount.clone(),
                pay_to: requirements.pay_to.clone(),
            },
            fee: Fee {
                fee_to,
                fee_amount,
            },
            delivery: Delivery {
                receive_token: delivery.receive_token.clone().unwrap_or(zero),
                mini_receive_amount: delivery
                    .mini_receive_amount
                    .clone()
                    .unwrap_or_else(|| "0".to_string()),
                token_id: delivery.token_id.clone().unwrap_or_else(|| "0".to_string()),
            },
        }
    }

    /// Builds a signed `upto` payload for `requirements`.
    ///
    /// The permit is canonicalized before any allowance transaction is sent, so a
    /// misconfigured network fails without touching the chain.
    #[cfg_attr(
        feature = "telemetry",
        instrument(skip_all, err, fields(network = %requirements.network))
    )]
    pub async fn build_payment_payload(
        &self,
        requirements: &PaymentRequirements,
        resource: &str,
        extensions: Option<&serde_json::Map<String, serde_json::Value>>,
    ) -> Result<UptoPaymentPayload, X402Error> {
        let context = match extensions {
            Some(extensions) => PermitContext::from_extensions(extensions)
                .map_err(X402Error::InvalidPaymentContext)?,
            None => None,
        }
        .ok_or(X402Error::MissingPaymentContext)?;

        let permit = self.build_permit(requirements, &context, UnixTimestamp::now());
        let typed =
            TypedPermit::build(&permit, &requirements.network, &self.networks, &self.codec)?;

        let total = typed
            .message
            .payment
            .maxPayAmount
            .checked_add(typed.message.fee.feeAmount)
            .ok_or_else(|| {
                AmountError(format!(
                    "{} + {}",
                    permit.payment.max_pay_amount, permit.fee.fee_amount
                ))
            })?;
        tracing::debug!(token = %permit.payment.pay_token, %total, "Ensuring allowance");
        self.signer
            .ensure_allowance(typed.message.payment.payToken, total, &requirements.network)
            .await?;

        let signature = self.signer.sign_typed_data(&typed).await?;
        tracing::info!(
            payment_id = %permit.meta.payment_id,
            buyer = %permit.buyer,
            kind = ?permit.meta.kind,
            "Signed payment permit"
        );

        Ok(UptoPaymentPayload {
            x402_version: X402Version2,
            resource: Some(ResourceInfo::new(resource)),
            accepted: requirements.clone(),
            payload: UptoPayload {
                signature,
                payment_permit: permit,
            },
            extensions: serde_json::Map::new(),
        })
    }
}

#[async_trait]
impl<S, C> ClientMechanism for UptoClient<S, C>
where
    S: ClientSigner,
    C: AddressCodec,
{
    fn scheme(&self) -> &str {
        UptoScheme::VALUE
    }

    async fn create_payment_payload(
        &self,
        requirements: &PaymentRequirements,
        resource: &str,
        extensions: Option<&serde_json::Map<String, serde_json::Value>>,
    ) -> Result<PaymentPayload, X402Error> {
        let typed = self
            .build_payment_payload(requirements, resource, extensions)
            .await?;
        Ok(PaymentPayload {
            x402_version: typed.x402_version,
            resource: typed.resource,
            accepted: typed.accepted,
            payload: serde_json::to_value(&typed.payload)?,
            extensions: typed.extensions,
        })
    }

    async fn balance_of(
        &self,
        requirements: &PaymentRequirements,
    ) -> Result<Option<U256>, X402Error> {
        let token = self.codec.to_canonical(&requirements.asset)?;
        match self.signer.token_balance(token, &requirements.network).await {
            Ok(balance) => Ok(Some(balance)),
            Err(SignerError::Unsupported(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Sum of `amount` and the fee carried in `extra.fee`, as the buyer must hold it.
pub(crate) fn amount_with_fee(requirements: &PaymentRequirements) -> Result<U256, AmountError> {
    let amount = parse_amount(&requirements.amount)?;
    let fee = match requirements.fee() {
        Some(fee) => parse_amount(&fee.fee_amount)?,
        None => U256::ZERO,
    };
    amount
        .checked_add(fee)
        .ok_or_else(|| AmountError(requirements.amount.clone()))
}
