#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types for the x402 payment permit protocol.
//!
//! This crate carries everything that is shared between clients, facilitators and
//! chain backends but does not depend on any particular blockchain:
//!
//! - [`chain`] - CAIP-2 style chain identifiers and the patterns used to route them
//! - [`networks`] - The network registry: chain id and settlement contract per network
//! - [`proto`] - Wire format types (requirements, payloads, verify/settle/fee-quote responses)
//! - [`timestamp`] - Unix timestamps for permit validity windows
//! - [`config`] - Configuration primitives, including environment variable resolution
//! - [`util`] - Base64 helpers and the header codec

pub mod chain;
pub mod config;
pub mod networks;
pub mod proto;
pub mod timestamp;
pub mod util;
