//! Conversion between chain-native and canonical addresses.
//!
//! Every chain spells addresses its own way (`0x`-hex on EVM, Base58Check on TRON), but the
//! typed-data message must hash the same 20 bytes regardless of spelling. An [`AddressCodec`]
//! turns a native string into the canonical [`Address`] and back. Canonical form is the only
//! form that enters a signed message or an address comparison.

use alloy_primitives::Address;

/// Bidirectional address conversion for one chain family.
pub trait AddressCodec: Send + Sync {
    /// The chain namespace this codec serves, e.g. `tron`.
    fn namespace(&self) -> &str;

    /// Decodes a native address into its canonical 20 bytes.
    fn to_canonical(&self, native: &str) -> Result<Address, AddressError>;

    /// Encodes canonical bytes in the chain's preferred native spelling.
    fn to_native(&self, canonical: Address) -> String;

    /// The chain's literal for the all-zero address, meaning "anyone" or "no recipient".
    fn zero_address(&self) -> String {
        self.to_native(Address::ZERO)
    }

    /// Whether two native addresses name the same account.
    ///
    /// Both sides are compared in canonical form. Strings that do not decode are only equal
    /// to themselves.
    fn same_address(&self, a: &str, b: &str) -> bool {
        match (self.to_canonical(a), self.to_canonical(b)) {
            (Ok(a), Ok(b)) => a == b,
            _ => a == b,
        }
    }
}

impl<T: AddressCodec + ?Sized> AddressCodec for &T {
    fn namespace(&self) -> &str {
        (**self).namespace()
    }
    fn to_canonical(&self, native: &str) -> Result<Address, AddressError> {
        (**self).to_canonical(native)
    }
    fn to_native(&self, canonical: Address) -> String {
        (**self).to_native(canonical)
    }
    fn zero_address(&self) -> String {
        (**self).zero_address()
    }
    fn same_address(&self, a: &str, b: &str) -> bool {
        (**self).same_address(a, b)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid {namespace} address {address:?}: {reason}")]
pub struct AddressError {
    pub namespace: String,
    pub address: String,
    pub reason: String,
}

impl AddressError {
    pub fn new<N: Into<String>, A: Into<String>, R: ToString>(
        namespace: N,
        address: A,
        reason: R,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            address: address.into(),
            reason: reason.to_string(),
        }
    }
}
