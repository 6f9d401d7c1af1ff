//! TRON backend for the x402 payment permit engine.
//!
//! TRON accounts are secp256k1 keys and TRON contracts speak the Solidity ABI, so permits
//! are hashed and signed exactly as on EVM chains. What differs is the address text form
//! (Base58Check over `0x41 || address`) and the node API, which is TronGrid's HTTP interface
//! instead of JSON-RPC.
//!
//! - [`TronAddressCodec`] - Base58Check and `41`-prefixed hex in, Base58Check out
//! - [`chain::TronChainConfig`] - signer key, TronGrid endpoint, API key and fee limit
//! - [`chain::TronChainProvider`] - implements [`ClientSigner`](x402_permit::signer::ClientSigner)
//!   and [`FacilitatorSigner`](x402_permit::signer::FacilitatorSigner) over TronGrid
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use x402_chain_tron::TronAddressCodec;
//! use x402_chain_tron::chain::{TronChainConfig, TronChainProvider};
//! use x402_permit::facilitator::UptoFacilitator;
//! use x402_types::networks::NetworkRegistry;
//!
//! let networks = Arc::new(NetworkRegistry::with_defaults());
//! let config: TronChainConfig = serde_json::from_str(r#"{
//!     "chainId": "tron:nile",
//!     "signer": "$FACILITATOR_KEY",
//!     "apiKey": "$TRONGRID_API_KEY"
//! }"#)?;
//! let provider = TronChainProvider::from_config(&config, networks.clone())?;
//! let facilitator = UptoFacilitator::new(provider, TronAddressCodec, networks);
//! ```

mod address;
pub use address::*;

pub mod networks;
pub use networks::*;

pub mod chain;

#[cfg(test)]
pub(crate) mod test_support;
