use std::fmt;
use std::str::FromStr;

use crate::error::TypeError;
use crate::serde_hex::{decode_fixed, encode_prefixed, hex_newtype_serde};

/// Width of an account identity in bytes.
pub const ADDRESS_LEN: usize = 20;

/// Account identity for callers, the registry, the coin, and the store.
///
/// Component configuration defaults to [`Address::NULL`], which no real
/// caller can present, so an unset trusted-caller slot authorizes nobody.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    /// The all-zero identity.
    pub const NULL: Address = Address([0u8; ADDRESS_LEN]);

    /// Derive a deterministic address from a human label.
    ///
    /// Used by deployments and scenario files to name accounts
    /// (`"owner"`, `"alice"`) without writing out hex.
    pub fn derive(label: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"geon-address-v1:");
        hasher.update(label.as_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes.copy_from_slice(&hash.as_bytes()[..ADDRESS_LEN]);
        Self(bytes)
    }

    pub const fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    pub fn is_null(&self) -> bool {
        self.0 == [0u8; ADDRESS_LEN]
    }

    /// Parse from 40 hex characters, with or without `0x`.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        decode_fixed::<ADDRESS_LEN>(s).map(Self)
    }

    /// Resolve a scenario reference: hex if it looks like hex, label otherwise.
    pub fn resolve(reference: &str) -> Result<Self, TypeError> {
        if reference.starts_with("0x") || reference.starts_with("0X") {
            Self::from_hex(reference)
        } else {
            Ok(Self::derive(reference))
        }
    }

    /// First four bytes in hex, for log fields.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address(0x{})", self.short_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode_prefixed(&self.0))
    }
}

impl FromStr for Address {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; ADDRESS_LEN]> for Address {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}

hex_newtype_serde!(Address, 20);
