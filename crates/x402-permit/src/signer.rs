//! Interfaces to key material and chain access.
//!
//! The engine never touches private keys or RPC endpoints itself. A client mechanism drives a
//! [`ClientSigner`], a facilitator mechanism drives a [`FacilitatorSigner`]; chain backends
//! implement one or both.
//!
//! Addresses cross this boundary in canonical form. Transaction ids are opaque strings in the
//! chain's own notation (`0x`-prefixed hash on EVM, bare hex id on TRON).

use alloy_primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use x402_types::chain::ChainId;

use crate::typed_data::TypedPermit;

#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error("Signing failed: {0}")]
    Signing(String),
    #[error("RPC error: {0}")]
    Rpc(String),
    #[error("Transaction {0} reverted")]
    Reverted(String),
    #[error("Timed out waiting for transaction {0}")]
    ReceiptTimeout(String),
    #[error("Operation not supported by this signer: {0}")]
    Unsupported(&'static str),
    #[error("{0}")]
    Custom(String),
}

/// A contract write prepared by the settlement orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    /// Target contract, canonical form.
    pub to: Address,
    /// Solidity signature of the called function, e.g. `settle((...),bytes)`.
    pub function: &'static str,
    /// ABI-encoded call including the selector.
    pub calldata: Bytes,
}

/// Evidence that a transaction was included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
}

/// Buyer-side key and chain access.
#[async_trait]
pub trait ClientSigner: Send + Sync {
    /// The buyer address, canonical form.
    fn address(&self) -> Address;

    /// Signs the EIP-712 digest of `permit`, returning the 65-byte `r || s || v` signature.
    async fn sign_typed_data(&self, permit: &TypedPermit) -> Result<Bytes, SignerError>;

    /// Makes sure the settlement contract may pull at least `amount` of `token`.
    ///
    /// May submit an approval transaction and wait for it.
    async fn ensure_allowance(
        &self,
        token: Address,
        amount: U256,
        network: &ChainId,
    ) -> Result<(), SignerError>;

    /// Buyer balance of `token`. Optional.
    async fn token_balance(
        &self,
        _token: Address,
        _network: &ChainId,
    ) -> Result<U256, SignerError> {
        Err(SignerError::Unsupported("token_balance"))
    }
}

/// Facilitator-side key and chain access.
#[async_trait]
pub trait FacilitatorSigner: Send + Sync {
    /// The submitting account, canonical form.
    fn address(&self) -> Address;

    /// Whether `signature` over `permit` was produced by `address`.
    ///
    /// Defaults to local secp256k1 recovery. A malformed signature is `Ok(false)`.
    async fn verify_typed_data(
        &self,
        address: Address,
        permit: &TypedPermit,
        signature: &[u8],
    ) -> Result<bool, SignerError> {
        Ok(permit
            .recover(signature)
            .is_ok_and(|recovered| recovered == address))
    }

    /// Broadcasts a contract write. `Ok(None)` means the node accepted the request but
    /// produced no transaction id.
    async fn write_contract(&self, call: ContractCall) -> Result<Option<String>, SignerError>;

    /// Blocks until `transaction` is final. A reverted transaction is
    /// [`SignerError::Reverted`].
    async fn wait_for_transaction_receipt(
        &self,
        transaction: &str,
    ) -> Result<TransactionReceipt, SignerError>;
}

#[async_trait]
impl<T: ClientSigner + ?Sized> ClientSigner for Arc<T> {
    fn address(&self) -> Address {
        (**self).address()
    }

    async fn sign_typed_data(&self, permit: &TypedPermit) -> Result<Bytes, SignerError> {
        (**self).sign_typed_data(permit).await
    }

    async fn ensure_allowance(
        &self,
        token: Address,
        amount: U256,
        network: &ChainId,
    ) -> Result<(), SignerError> {
        (**self).ensure_allowance(token, amount, network).await
    }

    async fn token_balance(&self, token: Address, network: &ChainId) -> Result<U256, SignerError> {
        (**self).token_balance(token, network).await
    }
}

#[async_trait]
impl<T: FacilitatorSigner + ?Sized> FacilitatorSigner for Arc<T> {
    fn address(&self) -> Address {
        (**self).address()
    }

    async fn verify_typed_data(
        &self,
        address: Address,
        permit: &TypedPermit,
        signature: &[u8],
    ) -> Result<bool, SignerError> {
        (**self).verify_typed_data(address, permit, signature).await
    }

    async fn write_contract(&self, call: ContractCall) -> Result<Option<String>, SignerError> {
        (**self).write_contract(call).await
    }

    async fn wait_for_transaction_receipt(
        &self,
        transaction: &str,
    ) -> Result<TransactionReceipt, SignerError> {
        (**self).wait_for_transaction_receipt(transaction).await
    }
}
