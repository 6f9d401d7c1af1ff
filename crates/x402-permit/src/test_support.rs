//! Fixtures shared by the unit tests: a plain hex address codec, a registry with one EVM test
//! network, real-key signing helpers and in-memory signers.

use alloy_primitives::{Address, Bytes, U256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use std::str::FromStr;
use std::sync::Mutex;
use x402_types::chain::ChainId;
use x402_types::networks::{NetworkEntry, NetworkRegistry};
use x402_types::proto::PaymentRequirements;
use x402_types::timestamp::UnixTimestamp;

use crate::address::{AddressCodec, AddressError};
use crate::permit::{
    Delivery, Fee, PAYMENT_PERMIT_CONTEXT, Payment, PaymentId, PaymentPermit, PermitKind,
    PermitMeta, UptoPayload,
};
use crate::signer::{ClientSigner, ContractCall, FacilitatorSigner, SignerError, TransactionReceipt};
use crate::typed_data::TypedPermit;

pub const TEST_CONTRACT: &str = "0x3333333333333333333333333333333333333333";
pub const TOKEN: &str = "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913";
pub const MERCHANT: &str = "0x1111111111111111111111111111111111111111";

/// `0x`-hex addresses, checksummed on output.
pub struct HexCodec;

impl AddressCodec for HexCodec {
    fn namespace(&self) -> &str {
        "eip155"
    }

    fn to_canonical(&self, native: &str) -> Result<Address, AddressError> {
        Address::from_str(native).map_err(|e| AddressError::new("eip155", native, e))
    }

    fn to_native(&self, canonical: Address) -> String {
        canonical.to_checksum(None)
    }
}

pub fn test_network() -> ChainId {
    ChainId::new("eip155", "84532")
}

pub fn test_registry() -> NetworkRegistry {
    NetworkRegistry::new().and_register(
        test_network(),
        NetworkEntry {
            chain_id: 84532,
            settlement_contract: Some(TEST_CONTRACT.to_string()),
        },
    )
}

pub fn requirements() -> PaymentRequirements {
    PaymentRequirements {
        scheme: "upto".to_string(),
        network: test_network(),
        amount: "1000000".to_string(),
        asset: TOKEN.to_string(),
        pay_to: MERCHANT.to_string(),
        max_timeout_seconds: Some(3600),
        extra: None,
    }
}

/// Extensions carrying an empty `paymentPermitContext`.
pub fn with_context() -> serde_json::Map<String, serde_json::Value> {
    let mut extensions = serde_json::Map::new();
    extensions.insert(PAYMENT_PERMIT_CONTEXT.to_string(), serde_json::json!({}));
    extensions
}

/// A permit matching [`requirements`], valid for the next hour.
pub fn sample_permit(buyer: &str) -> PaymentPermit {
    let zero = HexCodec.zero_address();
    PaymentPermit {
        meta: PermitMeta {
            kind: PermitKind::PaymentOnly,
            payment_id: PaymentId([7u8; 16]),
            nonce: "0".to_string(),
            valid_after: UnixTimestamp::from_secs(0),
            valid_before: UnixTimestamp::now() + 3600,
        },
        buyer: buyer.to_string(),
        caller: zero.clone(),
        payment: Payment {
            pay_token: TOKEN.to_string(),
            max_pay_amount: "1000000".to_string(),
            pay_to: MERCHANT.to_string(),
        },
        fee: Fee {
            fee_to: zero.clone(),
            fee_amount: "0".to_string(),
        },
        delivery: Delivery {
            receive_token: zero,
            mini_receive_amount: "0".to_string(),
            token_id: "0".to_string(),
        },
    }
}

/// [`sample_permit`] for `key`, adjusted by `adjust` and then signed.
pub fn signed_payload<F: FnOnce(&mut PaymentPermit)>(
    key: &PrivateKeySigner,
    adjust: F,
) -> UptoPayload {
    let mut permit = sample_permit(&key.address().to_string());
    adjust(&mut permit);
    let typed = TypedPermit::build(&permit, &test_network(), &test_registry(), &HexCodec)
        .expect("test permit canonicalizes");
    let signature = key
        .sign_hash_sync(&typed.signing_hash())
        .expect("local signing");
    UptoPayload {
        signature: Bytes::from(signature.as_bytes().to_vec()),
        payment_permit: permit,
    }
}

/// Buyer signer with a real key that records allowance requests.
pub struct LocalClientSigner {
    key: PrivateKeySigner,
    allowances: Mutex<Vec<(Address, U256)>>,
}

impl LocalClientSigner {
    pub fn random() -> Self {
        Self {
            key: PrivateKeySigner::random(),
            allowances: Mutex::new(Vec::new()),
        }
    }

    pub fn allowance_requests(&self) -> Vec<(Address, U256)> {
        self.allowances.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClientSigner for LocalClientSigner {
    fn address(&self) -> Address {
        self.key.address()
    }

    async fn sign_typed_data(&self, permit: &TypedPermit) -> Result<Bytes, SignerError> {
        let signature = self
            .key
            .sign_hash_sync(&permit.signing_hash())
            .map_err(|e| SignerError::Signing(e.to_string()))?;
        Ok(Bytes::from(signature.as_bytes().to_vec()))
    }

    async fn ensure_allowance(
        &self,
        token: Address,
        amount: U256,
        _network: &ChainId,
    ) -> Result<(), SignerError> {
        self.allowances.lock().unwrap().push((token, amount));
        Ok(())
    }
}

/// Facilitator signer that records writes instead of sending them.
pub struct MockFacilitatorSigner {
    transaction: Option<String>,
    revert: bool,
    fail_writes: bool,
    calls: Mutex<Vec<ContractCall>>,
    awaited: Mutex<Vec<String>>,
}

impl MockFacilitatorSigner {
    /// A signer whose writes produce no transaction id.
    pub fn new() -> Self {
        Self {
            transaction: None,
            revert: false,
            fail_writes: false,
            calls: Mutex::new(Vec::new()),
            awaited: Mutex::new(Vec::new()),
        }
    }

    pub fn with_transaction(mut self, transaction: &str) -> Self {
        self.transaction = Some(transaction.to_string());
        self
    }

    pub fn reverting(mut self) -> Self {
        self.revert = true;
        self
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn calls(&self) -> Vec<ContractCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn awaited(&self) -> Vec<String> {
        self.awaited.lock().unwrap().clone()
    }
}

#[async_trait]
impl FacilitatorSigner for MockFacilitatorSigner {
    fn address(&self) -> Address {
        Address::repeat_byte(0xfa)
    }

    async fn write_contract(&self, call: ContractCall) -> Result<Option<String>, SignerError> {
        if self.fail_writes {
            return Err(SignerError::Rpc("connection refused".into()));
        }
        self.calls.lock().unwrap().push(call);
        Ok(self.transaction.clone())
    }

    async fn wait_for_transaction_receipt(
        &self,
        transaction: &str,
    ) -> Result<TransactionReceipt, SignerError> {
        self.awaited.lock().unwrap().push(transaction.to_string());
        if self.revert {
            return Err(SignerError::Reverted(transaction.to_string()));
        }
        Ok(TransactionReceipt {
            transaction: transaction.to_string(),
            block_number: Some(1),
        })
    }
}
