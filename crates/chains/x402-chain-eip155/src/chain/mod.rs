//! EVM chain access for the permit engine.
//!
//! - [`Eip155ChainConfig`] - per-chain configuration, deserialized from JSON
//! - [`Eip155ChainProvider`] - signer and RPC access, behind the `client` and `facilitator`
//!   features

pub mod config;
pub use config::*;

#[cfg(feature = "client")]
mod erc20;

#[cfg(any(feature = "client", feature = "facilitator"))]
pub mod provider;
#[cfg(any(feature = "client", feature = "facilitator"))]
pub use provider::*;
