use alloy_primitives::Address;
use std::str::FromStr;
use x402_permit::address::{AddressCodec, AddressError};
use x402_types::networks::EIP155_NAMESPACE;

/// Address codec for EVM chains.
///
/// Accepts `0x`-hex in any letter case and emits the EIP-55 checksummed spelling, e.g.
/// `0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045`. The checksum is not enforced on input, so
/// all-lowercase and all-uppercase addresses decode to the same canonical bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Eip155AddressCodec;

impl AddressCodec for Eip155AddressCodec {
    fn namespace(&self) -> &str {
        EIP155_NAMESPACE
    }

    fn to_canonical(&self, native: &str) -> Result<Address, AddressError> {
        let hex = native
            .strip_prefix("0x")
            .or_else(|| native.strip_prefix("0X"))
            .ok_or_else(|| AddressError::new(EIP155_NAMESPACE, native, "missing 0x prefix"))?;
        Address::from_str(hex).map_err(|e| AddressError::new(EIP155_NAMESPACE, native, e))
    }

    fn to_native(&self, canonical: Address) -> String {
        canonical.to_checksum(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VITALIK: &str = "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045";

    #[test]
    fn test_any_case_decodes_to_same_bytes() {
        let codec = Eip155AddressCodec;
        let checksummed = codec.to_canonical(VITALIK).unwrap();
        let lower = codec.to_canonical(&VITALIK.to_lowercase()).unwrap();
        let upper = codec
            .to_canonical(&format!("0x{}", &VITALIK[2..].to_uppercase()))
            .unwrap();
        let upper_prefix = codec
            .to_canonical(&format!("0X{}", &VITALIK[2..]))
            .unwrap();
        assert_eq!(checksummed, lower);
        assert_eq!(checksummed, upper);
        assert_eq!(checksummed, upper_prefix);
    }

    #[test]
    fn test_emits_checksummed() {
        let codec = Eip155AddressCodec;
        let canonical = codec.to_canonical(&VITALIK.to_lowercase()).unwrap();
        assert_eq!(codec.to_native(canonical), VITALIK);
    }

    #[test]
    fn test_zero_literal() {
        assert_eq!(
            Eip155AddressCodec.zero_address(),
            "0x0000000000000000000000000000000000000000"
        );
    }

    #[test]
    fn test_rejects_malformed() {
        let codec = Eip155AddressCodec;
        assert!(codec.to_canonical("d8dA6BF26964aF9D7eEd9e03E53415D37aA96045").is_err());
        assert!(codec.to_canonical("0x1234").is_err());
        assert!(codec.to_canonical("TFxDcGvS7zfQrS1YzcCMp673ta2NHHzsiH").is_err());
        let err = codec.to_canonical("0xzz").unwrap_err();
        assert_eq!(err.namespace, "eip155");
        assert_eq!(err.address, "0xzz");
    }

    #[test]
    fn test_same_address_ignores_case() {
        let codec = Eip155AddressCodec;
        assert!(codec.same_address(VITALIK, &VITALIK.to_lowercase()));
        assert!(!codec.same_address(VITALIK, "0x0000000000000000000000000000000000000000"));
    }
}
