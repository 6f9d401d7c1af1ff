//! Typed-data canonicalization of payment permits.
//!
//! A [`PaymentPermit`] travels with chain-native addresses and decimal-string amounts. Before it
//! is signed, verified or sent to a contract it is turned into the strongly typed
//! [`sol::PaymentPermit`] message here, bound to an EIP-712 domain:
//!
//! ```text
//! { name: "PaymentPermit", version: "1", chainId, verifyingContract }
//! ```
//!
//! `chainId` and `verifyingContract` come from the [`NetworkRegistry`] entry of the network the
//! permit is paid on, so a signature made for one chain or contract never validates on another.
//! The client builder, the validator and the settlement orchestrator all go through
//! [`TypedPermit::build`]; there is no second path into a signed message.

use alloy_primitives::{Address, B256, Bytes, FixedBytes, Signature, U256};
use alloy_sol_types::{Eip712Domain, SolCall, SolStruct, eip712_domain};
use x402_types::chain::ChainId;
use x402_types::networks::{NetworkError, NetworkRegistry};

use crate::address::{AddressCodec, AddressError};
use crate::permit::{AmountError, PaymentPermit, parse_amount};

pub const DOMAIN_NAME: &str = "PaymentPermit";
pub const DOMAIN_VERSION: &str = "1";

/// Solidity-side definitions: the signed structs and the settlement entry points.
///
/// Field order is part of the EIP-712 type hash and of the ABI tuple layout.
pub mod sol {
    alloy_sol_types::sol! {
        #[derive(Debug, PartialEq, Eq)]
        struct PermitMeta {
            uint8 kind;
            bytes16 paymentId;
            uint256 nonce;
            uint256 validAfter;
            uint256 validBefore;
        }

        #[derive(Debug, PartialEq, Eq)]
        struct Payment {
            address payToken;
            uint256 maxPayAmount;
            address payTo;
        }

        #[derive(Debug, PartialEq, Eq)]
        struct Fee {
            address feeTo;
            uint256 feeAmount;
        }

        #[derive(Debug, PartialEq, Eq)]
        struct Delivery {
            address receiveToken;
            uint256 miniReceiveAmount;
            uint256 tokenId;
        }

        #[derive(Debug, PartialEq, Eq)]
        struct PaymentPermit {
            PermitMeta meta;
            address buyer;
            address caller;
            Payment payment;
            Fee fee;
            Delivery delivery;
        }

        #[derive(Debug, PartialEq, Eq)]
        struct TransferDetails {
            uint256 amount;
        }

        /// The settlement contract.
        interface IPaymentPermit {
            function permitTransferFrom(
                PaymentPermit permit,
                TransferDetails transferDetails,
                address owner,
                bytes signature
            ) external;
        }

        /// A merchant contract that pulls payment and delivers atomically.
        interface IMerchant {
            function settle(PaymentPermit permit, bytes signature) external;
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CanonicalizeError {
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error("Field {field}: {source}")]
    Address {
        field: &'static str,
        #[source]
        source: AddressError,
    },
    #[error("Field {field}: {source}")]
    Amount {
        field: &'static str,
        #[source]
        source: AmountError,
    },
    #[error("Malformed signature: {0}")]
    Signature(String),
}

impl CanonicalizeError {
    /// Whether the failure comes from the permit content rather than from configuration.
    pub fn is_malformed_input(&self) -> bool {
        !matches!(self, CanonicalizeError::Network(_))
    }
}

/// A permit in canonical form, bound to its domain.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedPermit {
    pub domain: Eip712Domain,
    pub message: sol::PaymentPermit,
}

impl TypedPermit {
    /// Canonicalizes `permit` for `network`.
    ///
    /// Every address goes through `codec`, every amount is parsed into `uint256`. The
    /// settlement contract is read from the registry in native form and canonicalized with the
    /// same codec.
    pub fn build<C: AddressCodec + ?Sized>(
        permit: &PaymentPermit,
        network: &ChainId,
        registry: &NetworkRegistry,
        codec: &C,
    ) -> Result<Self, CanonicalizeError> {
        let chain_id = registry.chain_id(network)?;
        let contract = registry.settlement_contract(network)?;
        let verifying_contract = address(codec, "verifyingContract", contract)?;
        let domain = eip712_domain! {
            name: DOMAIN_NAME,
            version: DOMAIN_VERSION,
            chain_id: chain_id,
            verifying_contract: verifying_contract,
        };
        let message = Self::message(permit, codec)?;
        Ok(Self { domain, message })
    }

    /// The domain-free part of canonicalization.
    pub fn message<C: AddressCodec + ?Sized>(
        permit: &PaymentPermit,
        codec: &C,
    ) -> Result<sol::PaymentPermit, CanonicalizeError> {
        let meta = &permit.meta;
        Ok(sol::PaymentPermit {
            meta: sol::PermitMeta {
                kind: meta.kind.as_u8(),
                paymentId: FixedBytes::from(meta.payment_id.0),
                nonce: amount("meta.nonce", &meta.nonce)?,
                validAfter: U256::from(meta.valid_after.as_secs()),
                validBefore: U256::from(meta.valid_before.as_secs()),
            },
            buyer: address(codec, "buyer", &permit.buyer)?,
            caller: address(codec, "caller", &permit.caller)?,
            payment: sol::Payment {
                payToken: address(codec, "payment.payToken", &permit.payment.pay_token)?,
                maxPayAmount: amount("payment.maxPayAmount", &permit.payment.max_pay_amount)?,
                payTo: address(codec, "payment.payTo", &permit.payment.pay_to)?,
            },
            fee: sol::Fee {
                feeTo: address(codec, "fee.feeTo", &permit.fee.fee_to)?,
                feeAmount: amount("fee.feeAmount", &permit.fee.fee_amount)?,
            },
            delivery: sol::Delivery {
                receiveToken: address(
                    codec,
                    "delivery.receiveToken",
                    &permit.delivery.receive_token,
                )?,
                miniReceiveAmount: amount(
                    "delivery.miniReceiveAmount",
                    &permit.delivery.mini_receive_amount,
                )?,
                tokenId: amount("delivery.tokenId", &permit.delivery.token_id)?,
            },
        })
    }

    /// EIP-712 digest that is signed and recovered.
    pub fn signing_hash(&self) -> B256 {
        self.message.eip712_signing_hash(&self.domain)
    }

    pub fn verifying_contract(&self) -> Option<Address> {
        self.domain.verifying_contract
    }

    /// Address that produced `signature` over this permit.
    pub fn recover(&self, signature: &[u8]) -> Result<Address, CanonicalizeError> {
        let signature = Signature::from_raw(signature)
            .map_err(|e| CanonicalizeError::Signature(e.to_string()))?;
        signature
            .recover_address_from_prehash(&self.signing_hash())
            .map_err(|e| CanonicalizeError::Signature(e.to_string()))
    }

    /// Calldata for `IPaymentPermit.permitTransferFrom`, pulling the full `maxPayAmount`.
    pub fn permit_transfer_from_calldata(&self, signature: &Bytes) -> Bytes {
        sol::IPaymentPermit::permitTransferFromCall {
            permit: self.message.clone(),
            transferDetails: sol::TransferDetails {
                amount: self.message.payment.maxPayAmount,
            },
            owner: self.message.buyer,
            signature: signature.clone(),
        }
        .abi_encode()
        .into()
    }

    /// Calldata for `IMerchant.settle`.
    pub fn merchant_settle_calldata(&self, signature: &Bytes) -> Bytes {
        sol::IMerchant::settleCall {
            permit: self.message.clone(),
            signature: signature.clone(),
        }
        .abi_encode()
        .into()
    }
}

fn address<C: AddressCodec + ?Sized>(
    codec: &C,
    field: &'static str,
    native: &str,
) -> Result<Address, CanonicalizeError> {
    codec
        .to_canonical(native)
        .map_err(|source| CanonicalizeError::Address { field, source })
}

fn amount(field: &'static str, value: &str) -> Result<U256, CanonicalizeError> {
    parse_amount(value).map_err(|source| CanonicalizeError::Amount { field, source })
}
