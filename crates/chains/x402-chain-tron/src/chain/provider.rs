use alloy_primitives::{Address, B256, Bytes, U256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use x402_permit::address::AddressCodec;
use x402_permit::signer::{
    ClientSigner, ContractCall, FacilitatorSigner, SignerError, TransactionReceipt,
};
use x402_permit::typed_data::TypedPermit;
use x402_types::chain::ChainId;
use x402_types::networks::{NetworkError, NetworkRegistry, TRON_NAMESPACE};

#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::address::TronAddressCodec;
use crate::chain::config::TronChainConfig;
use crate::chain::grid::{Transaction, TransactionInfo, TriggerContractRequest, TronGridClient};
use crate::chain::trc20::ITrc20;
use crate::networks::default_grid_url;

/// Default maximum energy fee per contract call: 100 TRX, in sun.
pub const DEFAULT_FEE_LIMIT: u64 = 100_000_000;

const DEFAULT_RECEIPT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, thiserror::Error)]
pub enum TronProviderError {
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error("Network {0} is not a tron network")]
    NotTron(ChainId),
    #[error("Invalid signer key: {0}")]
    InvalidKey(String),
    #[error("No HTTP endpoint configured for {0}")]
    NoRpcEndpoint(ChainId),
}

/// Signer and TronGrid access for one TRON network.
///
/// TRON accounts use secp256k1 keys like EVM accounts, so one local key signs both the
/// EIP-712 permit digest and the ids of the transactions this provider builds. Contract
/// writes go through `triggersmartcontract`, are signed locally and then broadcast.
#[derive(Clone)]
pub struct TronChainProvider {
    network: ChainId,
    signer: PrivateKeySigner,
    grid: TronGridClient,
    networks: Arc<NetworkRegistry>,
    fee_limit: u64,
    receipt_timeout: Duration,
    poll_interval: Duration,
}

impl std::fmt::Debug for TronChainProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TronChainProvider")
            .field("network", &self.network)
            .field("signer", &self.native_address())
            .field("grid", self.grid.base_url())
            .field("fee_limit", &self.fee_limit)
            .finish()
    }
}

fn grid_error<E: std::fmt::Display>(e: E) -> SignerError {
    SignerError::Rpc(e.to_string())
}

impl TronChainProvider {
    pub fn new(
        network: ChainId,
        signer: PrivateKeySigner,
        grid: TronGridClient,
        networks: Arc<NetworkRegistry>,
    ) -> Self {
        Self {
            network,
            signer,
            grid,
            networks,
            fee_limit: DEFAULT_FEE_LIMIT,
            receipt_timeout: DEFAULT_RECEIPT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Builds the provider. Falls back to the public TronGrid host when no endpoint is set.
    ///
    /// The `rateLimit` of the configured endpoint throttles every TronGrid request.
    pub fn from_config(
        config: &TronChainConfig,
        networks: Arc<NetworkRegistry>,
    ) -> Result<Self, TronProviderError> {
        if config.chain_id.namespace != TRON_NAMESPACE {
            return Err(TronProviderError::NotTron(config.chain_id.clone()));
        }
        networks.chain_id(&config.chain_id)?;
        let signer = PrivateKeySigner::from_bytes(config.signer.inner().as_b256())
            .map_err(|e| TronProviderError::InvalidKey(e.to_string()))?;
        let rpc = config
            .rpc
            .iter()
            .find(|rpc| rpc.http.scheme() == "http" || rpc.http.scheme() == "https");
        let url = rpc
            .map(|rpc| rpc.http.clone())
            .or_else(|| default_grid_url(&config.chain_id))
            .ok_or_else(|| TronProviderError::NoRpcEndpoint(config.chain_id.clone()))?;
        let mut grid = TronGridClient::new(url)
            .with_timeout(Duration::from_secs(config.request_timeout_secs));
        if let Some(api_key) = &config.api_key {
            grid = grid.with_api_key(api_key.inner().clone());
        }
        if let Some(rate_limit) = rpc.and_then(|rpc| rpc.rate_limit) {
            grid = grid.with_rate_limit(rate_limit);
        }

        let provider = Self::new(config.chain_id.clone(), signer, grid, networks)
            .with_fee_limit(config.fee_limit)
            .with_receipt_timeout(Duration::from_secs(config.receipt_timeout_secs));
        tracing::info!(
            chain = %provider.network,
            grid = %provider.grid.base_url(),
            rate_limit = ?provider.grid.rate_limit(),
            signer = %provider.native_address(),
            "Using TRON provider"
        );
        Ok(provider)
    }

    pub fn with_fee_limit(mut self, fee_limit: u64) -> Self {
        self.fee_limit = fee_limit;
        self
    }

    pub fn with_receipt_timeout(mut self, timeout: Duration) -> Self {
        self.receipt_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// The account behind this provider, canonical form.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// The account behind this provider, Base58Check.
    pub fn native_address(&self) -> String {
        TronAddressCodec.to_native(self.signer.address())
    }

    pub fn network(&self) -> &ChainId {
        &self.network
    }

    pub fn grid(&self) -> &TronGridClient {
        &self.grid
    }

    fn settlement_contract(&self, network: &ChainId) -> Result<Address, SignerError> {
        let contract = self
            .networks
            .settlement_contract(network)
            .map_err(|e| SignerError::Custom(e.to_string()))?;
        TronAddressCodec
            .to_canonical(contract)
            .map_err(|e| SignerError::Custom(e.to_string()))
    }

    fn trigger_request(
        &self,
        contract: Address,
        function: &str,
        calldata: &[u8],
    ) -> TriggerContractRequest {
        TriggerContractRequest::new(
            self.native_address(),
            TronAddressCodec.to_native(contract),
            function,
            calldata,
        )
    }

    /// Read-only call, returning the raw ABI-encoded result.
    async fn call_constant(
        &self,
        contract: Address,
        function: &str,
        calldata: &[u8],
    ) -> Result<Bytes, SignerError> {
        let request = self.trigger_request(contract, function, calldata);
        let response = self
            .grid
            .trigger_constant_contract(&request)
            .await
            .map_err(grid_error)?;
        if !response.result.result {
            return Err(SignerError::Rpc(response.result.describe()));
        }
        let output = response
            .constant_result
            .first()
            .ok_or_else(|| SignerError::Rpc(format!("{function} returned no result")))?;
        hex::decode(output).map(Bytes::from).map_err(grid_error)
    }

    async fn read_uint(
        &self,
        contract: Address,
        function: &str,
        calldata: &[u8],
    ) -> Result<U256, SignerError> {
        let output = self.call_constant(contract, function, calldata).await?;
        ITrc20::balanceOfCall::abi_decode_returns(&output).map_err(grid_error)
    }

    /// Signs the transaction id with the provider key.
    ///
    /// The id is recomputed as the SHA-256 of `raw_data_hex`. A node-supplied `txID` that
    /// does not match it is refused.
    fn sign_transaction(&self, transaction: &mut Transaction) -> Result<(), SignerError> {
        let raw_data = hex::decode(&transaction.raw_data_hex)
            .map_err(|e| SignerError::Signing(format!("Invalid raw_data_hex: {e}")))?;
        let tx_id = B256::from_slice(Sha256::digest(&raw_data).as_slice());
        let claimed = B256::from_str(&transaction.tx_id).map_err(|e| {
            SignerError::Signing(format!("Invalid txID {}: {e}", transaction.tx_id))
        })?;
        if claimed != tx_id {
            tracing::warn!(
                claimed = %transaction.tx_id,
                computed = %hex::encode(tx_id),
                "Transaction id does not match raw data"
            );
            return Err(SignerError::Signing(format!(
                "txID {} does not match raw_data_hex",
                transaction.tx_id
            )));
        }
        let signature = self
            .signer
            .sign_hash_sync(&tx_id)
            .map_err(|e| SignerError::Signing(e.to_string()))?;
        transaction.signature.push(hex::encode(signature.as_bytes()));
        Ok(())
    }

    /// Builds, signs and broadcasts a contract call.
    async fn send_contract_call(
        &self,
        contract: Address,
        function: &str,
        calldata: &[u8],
    ) -> Result<Option<String>, SignerError> {
        let request = self
            .trigger_request(contract, function, calldata)
            .with_fee_limit(self.fee_limit);
        let response = self
            .grid
            .trigger_smart_contract(&request)
            .await
            .map_err(grid_error)?;
        if !response.result.result {
            let reason = response.result.describe();
            tracing::warn!(
                contract = %request.contract_address,
                function,
                %reason,
                "Contract call rejected"
            );
            return Err(SignerError::Rpc(reason));
        }
        let Some(mut transaction) = response.transaction else {
            tracing::warn!(
                contract = %request.contract_address,
                function,
                "Node returned no transaction"
            );
            return Ok(None);
        };

        self.sign_transaction(&mut transaction)?;
        let broadcast = self
            .grid
            .broadcast_transaction(&transaction)
            .await
            .map_err(grid_error)?;
        if !broadcast.result {
            let reason = broadcast.describe();
            tracing::warn!(tx_id = %transaction.tx_id, %reason, "Broadcast rejected");
            return Err(SignerError::Rpc(reason));
        }
        let tx_id = broadcast.txid.unwrap_or(transaction.tx_id);
        tracing::info!(%tx_id, function, "Transaction broadcast");
        Ok(Some(tx_id))
    }

    /// Polls `gettransactioninfobyid` until the transaction is in a block or the timeout elapses.
    async fn poll_transaction(&self, tx_id: &str) -> Result<TransactionReceipt, SignerError> {
        let poll = async {
            loop {
                if let Some(info) = self
                    .grid
                    .get_transaction_info_by_id(tx_id)
                    .await
                    .map_err(grid_error)?
                {
                    return Ok::<TransactionInfo, SignerError>(info);
                }
                tokio::time::sleep(self.poll_interval).await;
            }
        };
        let info = tokio::time::timeout(self.receipt_timeout, poll)
            .await
            .map_err(|_| SignerError::ReceiptTimeout(tx_id.to_string()))??;
        if !info.succeeded() {
            tracing::warn!(
                %tx_id,
                block = ?info.block_number,
                message = ?info.res_message,
                "Transaction reverted"
            );
            return Err(SignerError::Reverted(tx_id.to_string()));
        }
        tracing::debug!(%tx_id, block = ?info.block_number, "Transaction confirmed");
        Ok(TransactionReceipt {
            transaction: tx_id.to_string(),
            block_number: info.block_number,
        })
    }
}

#[async_trait]
impl ClientSigner for TronChainProvider {
    fn address(&self) -> Address {
        self.signer.address()
    }

    async fn sign_typed_data(&self, permit: &TypedPermit) -> Result<Bytes, SignerError> {
        let signature = self
            .signer
            .sign_hash_sync(&permit.signing_hash())
            .map_err(|e| SignerError::Signing(e.to_string()))?;
        Ok(Bytes::from(signature.as_bytes().to_vec()))
    }

    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(%token, %amount)))]
    async fn ensure_allowance(
        &self,
        token: Address,
        amount: U256,
        network: &ChainId,
    ) -> Result<(), SignerError> {
        let spender = self.settlement_contract(network)?;
        let owner = self.signer.address();
        let allowance = self
            .read_uint(
                token,
                ITrc20::allowanceCall::SIGNATURE,
                &ITrc20::allowanceCall { owner, spender }.abi_encode(),
            )
            .await?;
        if allowance >= amount {
            tracing::debug!(%token, %allowance, %amount, "Allowance sufficient");
            return Ok(());
        }

        tracing::info!(
            token = %TronAddressCodec.to_native(token),
            spender = %TronAddressCodec.to_native(spender),
            %allowance,
            %amount,
            "Approving settlement contract"
        );
        let tx_id = self
            .send_contract_call(
                token,
                ITrc20::approveCall::SIGNATURE,
                &ITrc20::approveCall { spender, amount }.abi_encode(),
            )
            .await?
            .ok_or_else(|| SignerError::Rpc("Approval produced no transaction".into()))?;
        self.poll_transaction(&tx_id).await?;
        tracing::info!(%tx_id, "Approval confirmed");
        Ok(())
    }

    async fn token_balance(&self, token: Address, _network: &ChainId) -> Result<U256, SignerError> {
        let account = self.signer.address();
        self.read_uint(
            token,
            ITrc20::balanceOfCall::SIGNATURE,
            &ITrc20::balanceOfCall { account }.abi_encode(),
        )
        .await
    }
}

#[async_trait]
impl FacilitatorSigner for TronChainProvider {
    fn address(&self) -> Address {
        self.signer.address()
    }

    #[cfg_attr(
        feature = "telemetry",
        instrument(skip_all, err, fields(function = call.function))
    )]
    async fn write_contract(&self, call: ContractCall) -> Result<Option<String>, SignerError> {
        self.send_contract_call(call.to, call.function, &call.calldata)
            .await
    }

    #[cfg_attr(feature = "telemetry", instrument(skip(self), err))]
    async fn wait_for_transaction_receipt(
        &self,
        transaction: &str,
    ) -> Result<TransactionReceipt, SignerError> {
        self.poll_transaction(transaction).await
    }
}
