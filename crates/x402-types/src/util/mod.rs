//! Helper types for x402.
//!
//! - [`b64`] - Base64 byte wrapper and the JSON-in-base64 header codec

pub mod b64;

pub use b64::*;
