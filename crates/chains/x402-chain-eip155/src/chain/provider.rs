use alloy_network::{EthereumWallet, ReceiptResponse};
use alloy_primitives::{Address, B256};
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_rpc_client::RpcClient;
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use alloy_transport::layers::ThrottleLayer;
use alloy_transport_http::Http;
use async_trait::async_trait;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use x402_permit::signer::{SignerError, TransactionReceipt};
use x402_types::chain::ChainId;
use x402_types::config::RpcConfig;
use x402_types::networks::{EIP155_NAMESPACE, NetworkError, NetworkRegistry};

#[cfg(feature = "client")]
use alloy_primitives::{Bytes, U256};
#[cfg(feature = "client")]
use x402_permit::{signer::ClientSigner, typed_data::TypedPermit};

#[cfg(feature = "facilitator")]
use alloy_network::TransactionBuilder;
#[cfg(feature = "facilitator")]
use alloy_rpc_types_eth::TransactionRequest;
#[cfg(feature = "facilitator")]
use x402_permit::signer::{ContractCall, FacilitatorSigner};

#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::chain::config::Eip155ChainConfig;
#[cfg(feature = "client")]
use crate::chain::erc20::IERC20;

/// Interval between receipt polls.
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, thiserror::Error)]
pub enum Eip155ProviderError {
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error("Network {0} is not an eip155 network")]
    NotEip155(ChainId),
    #[error("Invalid signer key: {0}")]
    InvalidKey(String),
    #[error("No HTTP RPC endpoint configured for {0}")]
    NoRpcEndpoint(ChainId),
}

/// Signer and RPC access for one EVM chain.
///
/// Holds a single local key, used both for EIP-712 permit signatures and for sending
/// transactions. Gas, nonce and chain id are filled by alloy's recommended fillers.
///
/// As a buyer, [`ensure_allowance`](ClientSigner::ensure_allowance) approves the settlement
/// contract of the payment network when the current ERC-20 allowance is too small. As a
/// facilitator, contract writes are broadcast and receipts polled until
/// `receiptTimeoutSecs` elapses.
#[derive(Clone)]
pub struct Eip155ChainProvider {
    network: ChainId,
    signer: PrivateKeySigner,
    inner: DynProvider,
    networks: Arc<NetworkRegistry>,
    receipt_timeout: Duration,
}

impl std::fmt::Debug for Eip155ChainProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Eip155ChainProvider")
            .field("network", &self.network)
            .field("signer", &self.signer.address())
            .field("receipt_timeout", &self.receipt_timeout)
            .finish()
    }
}

impl Eip155ChainProvider {
    /// Builds the provider. No RPC call is made until the provider is used.
    pub fn from_config(
        config: &Eip155ChainConfig,
        networks: Arc<NetworkRegistry>,
    ) -> Result<Self, Eip155ProviderError> {
        if config.chain_id.namespace != EIP155_NAMESPACE {
            return Err(Eip155ProviderError::NotEip155(config.chain_id.clone()));
        }
        let chain_id = networks.chain_id(&config.chain_id)?;
        let signer = PrivateKeySigner::from_bytes(config.signer.inner().as_b256())
            .map_err(|e| Eip155ProviderError::InvalidKey(e.to_string()))?
            .with_chain_id(Some(chain_id));
        let rpc = config
            .rpc
            .iter()
            .find(|rpc| rpc.http.scheme() == "http" || rpc.http.scheme() == "https")
            .ok_or_else(|| Eip155ProviderError::NoRpcEndpoint(config.chain_id.clone()))?;

        tracing::info!(
            chain = %config.chain_id,
            rpc_url = %rpc.http,
            rate_limit = ?rpc.rate_limit,
            signer = %signer.address(),
            "Using EVM provider"
        );
        let inner = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer.clone()))
            .connect_client(Self::rpc_client(rpc))
            .erased();

        Ok(Self {
            network: config.chain_id.clone(),
            signer,
            inner,
            networks,
            receipt_timeout: Duration::from_secs(config.receipt_timeout_secs),
        })
    }

    /// HTTP transport for `rpc`, throttled to `rpc.rate_limit` requests per second.
    pub fn rpc_client(rpc: &RpcConfig) -> RpcClient {
        let rate_limit = rpc.rate_limit.unwrap_or(u32::MAX);
        let transport = ServiceBuilder::new()
            .layer(ThrottleLayer::new(rate_limit))
            .service(Http::new(rpc.http.clone()));
        RpcClient::new(transport, false)
    }

    /// The account behind this provider.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn network(&self) -> &ChainId {
        &self.network
    }

    pub fn inner(&self) -> &DynProvider {
        &self.inner
    }

    #[cfg(feature = "client")]
    fn settlement_contract(&self, network: &ChainId) -> Result<Address, SignerError> {
        let contract = self
            .networks
            .settlement_contract(network)
            .map_err(|e| SignerError::Custom(e.to_string()))?;
        Address::from_str(contract).map_err(|e| {
            SignerError::Custom(format!("Invalid settlement contract {contract}: {e}"))
        })
    }

    #[cfg(feature = "client")]
    async fn sign_hash(&self, hash: &B256) -> Result<Bytes, SignerError> {
        let signature = self
            .signer
            .sign_hash(hash)
            .await
            .map_err(|e| SignerError::Signing(e.to_string()))?;
        Ok(Bytes::from(signature.as_bytes().to_vec()))
    }

    /// Polls for the receipt of `hash` until it appears or the timeout elapses.
    async fn poll_receipt(&self, hash: B256) -> Result<TransactionReceipt, SignerError> {
        let transaction = hash.to_string();
        let poll = async {
            loop {
                let receipt = self
                    .inner
                    .get_transaction_receipt(hash)
                    .await
                    .map_err(|e| SignerError::Rpc(e.to_string()))?;
                if let Some(receipt) = receipt {
                    return Ok::<_, SignerError>(receipt);
                }
                tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
            }
        };
        let receipt = tokio::time::timeout(self.receipt_timeout, poll)
            .await
            .map_err(|_| SignerError::ReceiptTimeout(transaction.clone()))??;
        let block_number = ReceiptResponse::block_number(&receipt);
        if !ReceiptResponse::status(&receipt) {
            tracing::warn!(%transaction, block = ?block_number, "Transaction reverted");
            return Err(SignerError::Reverted(transaction));
        }
        tracing::debug!(%transaction, block = ?block_number, "Transaction confirmed");
        Ok(TransactionReceipt {
            transaction,
            block_number,
        })
    }
}

fn rpc_error<E: std::fmt::Display>(e: E) -> SignerError {
    SignerError::Rpc(e.to_string())
}

#[cfg(feature = "client")]
#[async_trait]
impl ClientSigner for Eip155ChainProvider {
    fn address(&self) -> Address {
        self.signer.address()
    }

    async fn sign_typed_data(&self, permit: &TypedPermit) -> Result<Bytes, SignerError> {
        self.sign_hash(&permit.signing_hash()).await
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
        let erc20 = IERC20::new(token, &self.inner);
        let allowance = erc20
            .allowance(owner, spender)
            .call()
            .await
            .map_err(rpc_error)?;
        if allowance >= amount {
            tracing::debug!(%token, %allowance, %amount, "Allowance sufficient");
            return Ok(());
        }

        tracing::info!(%token, %spender, %allowance, %amount, "Approving settlement contract");
        let pending = erc20
            .approve(spender, amount)
            .send()
            .await
            .map_err(rpc_error)?;
        let hash = *pending.tx_hash();
        self.poll_receipt(hash).await?;
        tracing::info!(transaction = %hash, "Approval confirmed");
        Ok(())
    }

    async fn token_balance(&self, token: Address, _network: &ChainId) -> Result<U256, SignerError> {
        IERC20::new(token, &self.inner)
            .balanceOf(self.signer.address())
            .call()
            .await
            .map_err(rpc_error)
    }
}

#[cfg(feature = "facilitator")]
#[async_trait]
impl FacilitatorSigner for Eip155ChainProvider {
    fn address(&self) -> Address {
        self.signer.address()
    }

    #[cfg_attr(
        feature = "telemetry",
        instrument(skip_all, err, fields(to = %call.to, function = call.function))
    )]
    async fn write_contract(&self, call: ContractCall) -> Result<Option<String>, SignerError> {
        let request = TransactionRequest::default()
            .with_from(self.signer.address())
            .with_to(call.to)
            .with_input(call.calldata);
        let pending = self
            .inner
            .send_transaction(request)
            .await
            .map_err(rpc_error)?;
        let hash = pending.tx_hash().to_string();
        tracing::info!(transaction = %hash, function = call.function, "Transaction sent");
        Ok(Some(hash))
    }

    #[cfg_attr(feature = "telemetry", instrument(skip(self), err))]
    async fn wait_for_transaction_receipt(
        &self,
        transaction: &str,
    ) -> Result<TransactionReceipt, SignerError> {
        let hash = B256::from_str(transaction).map_err(|e| {
            SignerError::Custom(format!("Invalid transaction hash {transaction}: {e}"))
        })?;
        self.poll_receipt(hash).await
    }
}
