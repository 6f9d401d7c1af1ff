//! Base64 helpers.
//!
//! Payment messages travel in HTTP headers as standard base64 of their JSON form
//! (`PAYMENT-REQUIRED` carries a [`PaymentRequired`](crate::proto::v2::PaymentRequired),
//! `PAYMENT-SIGNATURE` carries a signed payment payload). [`encode_header`] and
//! [`decode_header`] implement that codec; the HTTP plumbing itself lives elsewhere.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as b64;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::fmt::Display;

/// A wrapper for base64-encoded byte data.
///
/// ```rust
/// use x402_types::util::Base64Bytes;
///
/// let encoded = Base64Bytes::encode(b"hello world");
/// assert_eq!(encoded.to_string(), "aGVsbG8gd29ybGQ=");
/// assert_eq!(encoded.decode().unwrap(), b"hello world");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Base64Bytes<'a>(pub Cow<'a, [u8]>);

impl Base64Bytes<'_> {
    /// Decodes the base64 text to raw bytes.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        b64.decode(&self.0)
    }

    /// Encodes raw bytes into base64 text.
    pub fn encode<T: AsRef<[u8]>>(input: T) -> Base64Bytes<'static> {
        let encoded = b64.encode(input.as_ref());
        Base64Bytes(Cow::Owned(encoded.into_bytes()))
    }
}

impl AsRef<[u8]> for Base64Bytes<'_> {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl<'a> From<&'a [u8]> for Base64Bytes<'a> {
    fn from(slice: &'a [u8]) -> Self {
        Base64Bytes(Cow::Borrowed(slice))
    }
}

impl<'a> From<&'a str> for Base64Bytes<'a> {
    fn from(text: &'a str) -> Self {
        Base64Bytes(Cow::Borrowed(text.as_bytes()))
    }
}

impl Display for Base64Bytes<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(self.0.as_ref()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HeaderCodecError {
    #[error("Header is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Header does not carry the expected JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serializes `value` to JSON and base64-encodes it for a header.
pub fn encode_header<T: Serialize>(value: &T) -> Result<String, HeaderCodecError> {
    let json = serde_json::to_vec(value)?;
    Ok(Base64Bytes::encode(json).to_string())
}

/// Reverses [`encode_header`]. Surrounding whitespace is ignored.
pub fn decode_header<T: DeserializeOwned>(header: &str) -> Result<T, HeaderCodecError> {
    let bytes = Base64Bytes::from(header.trim()).decode()?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        amount: String,
    }

    #[test]
    fn test_header_codec() {
        let sample = Sample {
            amount: "1000000".into(),
        };
        let header = encode_header(&sample).unwrap();
        assert_eq!(header, "eyJhbW91bnQiOiIxMDAwMDAwIn0=");
        let decoded: Sample = decode_header(&format!(" {header}\n")).unwrap();
        assert_eq!(decoded, sample);
    }

    #[test]
    fn test_decode_header_errors() {
        assert!(matches!(
            decode_header::<Sample>("%%%"),
            Err(HeaderCodecError::Base64(_))
        ));
        let not_header = Base64Bytes::encode(b"[1,2]").to_string();
        assert!(matches!(
            decode_header::<Sample>(&not_header),
            Err(HeaderCodecError::Json(_))
        ));
    }
}
