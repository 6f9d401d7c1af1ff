#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Payment permit engine for the x402 "upto" scheme.
//!
//! A buyer signs a bounded pull-payment authorization (a *permit*) as EIP-712 typed data; a
//! facilitator checks it against the resource server's requirements and submits it to the
//! settlement contract. This crate holds the chain-agnostic half of that protocol:
//!
//! - [`address`] - The [`AddressCodec`](address::AddressCodec) seam between native and canonical addresses
//! - [`permit`] - The permit data model and the `paymentPermitContext` extension
//! - [`typed_data`] - The single canonicalization path used for signing, verifying and ABI encoding
//! - [`signer`] - Interfaces to key material and chain access
//! - [`scheme`] - Client and facilitator mechanism traits
//! - [`client`] - Mechanism registry, permit builder and payment policies
//! - [`facilitator`] - Permit validator, settlement orchestrator, fee quotes and dispatch
//!
//! Chain backends (EVM, TRON) live in their own crates and plug in through
//! [`AddressCodec`](address::AddressCodec), [`ClientSigner`](signer::ClientSigner) and
//! [`FacilitatorSigner`](signer::FacilitatorSigner).

pub mod address;
pub mod client;
pub mod error;
pub mod facilitator;
pub mod permit;
pub mod scheme;
pub mod signer;
pub mod typed_data;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::X402Error;
