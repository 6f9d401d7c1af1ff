//! Blockchain identifiers for x402 payment permits.
//!
//! - [`ChainId`] - A CAIP-2 style identifier such as `tron:nile` or `eip155:8453`
//! - [`ChainIdPattern`] - Pattern matching for chain ids (exact, wildcard, or set),
//!   carrying the routing priority used by mechanism registries

mod chain_id;

pub use chain_id::*;
