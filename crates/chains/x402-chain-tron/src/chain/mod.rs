//! TRON network access for the permit engine.
//!
//! - [`TronChainConfig`] - per-network configuration, deserialized from JSON
//! - [`TronGridClient`] - the TronGrid HTTP API subset used for contract calls
//! - [`TronChainProvider`] - signer and TronGrid access implementing both signer traits

pub mod config;
pub use config::*;

pub mod grid;
pub use grid::*;

pub mod provider;
pub use provider::*;

mod trc20;
