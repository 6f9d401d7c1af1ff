//! EIP-155 (EVM) backend for the x402 payment permit engine.
//!
//! Provides the pieces the engine in `x402-permit` leaves to a chain backend:
//!
//! - [`Eip155AddressCodec`] - `0x`-hex addresses in, EIP-55 checksummed addresses out
//! - [`chain::Eip155ChainConfig`] - signer key, RPC endpoints and receipt timeout for one chain
//! - [`chain::Eip155ChainProvider`] - an alloy provider implementing both
//!   [`ClientSigner`](x402_permit::signer::ClientSigner) and
//!   [`FacilitatorSigner`](x402_permit::signer::FacilitatorSigner)
//!
//! # Feature Flags
//!
//! - `client` - buyer-side signing and ERC-20 allowance management
//! - `facilitator` - contract writes and receipt polling
//! - `telemetry` - tracing spans on provider calls
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use x402_chain_eip155::Eip155AddressCodec;
//! use x402_chain_eip155::chain::{Eip155ChainConfig, Eip155ChainProvider};
//! use x402_permit::facilitator::UptoFacilitator;
//! use x402_types::networks::NetworkRegistry;
//!
//! let networks = Arc::new(NetworkRegistry::with_defaults().with_overrides(&overrides)?);
//! let config: Eip155ChainConfig = serde_json::from_str(r#"{
//!     "chainId": "eip155:8453",
//!     "signer": "$FACILITATOR_KEY",
//!     "rpc": [{ "http": "https://mainnet.base.org" }]
//! }"#)?;
//! let provider = Eip155ChainProvider::from_config(&config, networks.clone())?;
//! let facilitator = UptoFacilitator::new(provider, Eip155AddressCodec, networks);
//! ```

mod address;
pub use address::*;

pub mod chain;
