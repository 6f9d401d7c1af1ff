use alloy_primitives::Address;
use std::str::FromStr;
use x402_permit::address::{AddressCodec, AddressError};
use x402_types::networks::TRON_NAMESPACE;

/// Version byte prefixed to every TRON mainnet-format address.
pub const TRON_ADDRESS_PREFIX: u8 = 0x41;

/// Base58Check spelling of the all-zero address.
pub const TRON_ZERO_ADDRESS: &str = "T9yD14Nj9j7xAB4dbGeiX9h8unkKHxuWwb";

/// Address codec for TRON.
///
/// The native form is Base58Check over `0x41 || 20 bytes`, e.g.
/// `TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t`. Hex input is accepted too, either with the `41`
/// prefix (`41a614f8...`) or EVM-style (`0xa614f8...`), since both show up in node responses
/// and contract events. Output is always Base58Check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TronAddressCodec;

impl TronAddressCodec {
    fn decode_base58(native: &str) -> Result<Address, AddressError> {
        let bytes = bs58::decode(native)
            .with_check(None)
            .into_vec()
            .map_err(|e| AddressError::new(TRON_NAMESPACE, native, e))?;
        Self::strip_prefix(native, &bytes)
    }

    fn decode_prefixed_hex(native: &str) -> Result<Address, AddressError> {
        let bytes = hex::decode(native).map_err(|e| AddressError::new(TRON_NAMESPACE, native, e))?;
        Self::strip_prefix(native, &bytes)
    }

    fn strip_prefix(native: &str, bytes: &[u8]) -> Result<Address, AddressError> {
        match bytes {
            [TRON_ADDRESS_PREFIX, rest @ ..] if rest.len() == 20 => Ok(Address::from_slice(rest)),
            [TRON_ADDRESS_PREFIX, ..] => Err(AddressError::new(
                TRON_NAMESPACE,
                native,
                format!("expected 21 bytes, got {}", bytes.len()),
            )),
            _ => Err(AddressError::new(TRON_NAMESPACE, native, "missing 0x41 prefix")),
        }
    }
}

impl AddressCodec for TronAddressCodec {
    fn namespace(&self) -> &str {
        TRON_NAMESPACE
    }

    fn to_canonical(&self, native: &str) -> Result<Address, AddressError> {
        if let Some(hex) = native
            .strip_prefix("0x")
            .or_else(|| native.strip_prefix("0X"))
        {
            return Address::from_str(hex)
                .map_err(|e| AddressError::new(TRON_NAMESPACE, native, e));
        }
        if native.len() == 42 && native.starts_with("41") {
            return Self::decode_prefixed_hex(native);
        }
        Self::decode_base58(native)
    }

    fn to_native(&self, canonical: Address) -> String {
        let mut bytes = Vec::with_capacity(21);
        bytes.push(TRON_ADDRESS_PREFIX);
        bytes.extend_from_slice(canonical.as_slice());
        bs58::encode(bytes).with_check().into_string()
    }

    fn zero_address(&self) -> String {
        TRON_ZERO_ADDRESS.to_string()
    }
}
