use std::fmt;
use std::str::FromStr;

use crate::error::TypeError;
use crate::serde_hex::{decode_fixed, encode_prefixed, hex_newtype_serde};

/// Width of caller-supplied identifiers in bytes (128 bits).
pub const ID_LEN: usize = 16;

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident, $debug:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name([u8; ID_LEN]);

        impl $name {
            pub const fn from_bytes(bytes: [u8; ID_LEN]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; ID_LEN] {
                &self.0
            }

            /// Parse from 32 hex characters, with or without `0x`.
            pub fn from_hex(s: &str) -> Result<Self, TypeError> {
                decode_fixed::<ID_LEN>(s).map(Self)
            }

            pub fn short_hex(&self) -> String {
                hex::encode(&self.0[..4])
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($debug, "(0x{})"), self.short_hex())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&encode_prefixed(&self.0))
            }
        }

        impl FromStr for $name {
            type Err = TypeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_hex(s)
            }
        }

        impl From<[u8; ID_LEN]> for $name {
            fn from(bytes: [u8; ID_LEN]) -> Self {
                Self(bytes)
            }
        }

        impl From<u128> for $name {
            fn from(value: u128) -> Self {
                Self(value.to_be_bytes())
            }
        }

        hex_newtype_serde!($name, 16);
    };
}

opaque_id!(
    /// Identifier of a Geon. Supplied by the creator, never generated here.
    GeonId,
    "GeonId"
);

opaque_id!(
    /// Opaque token distinguishing separate geomining grants for the same
    /// Geon and geominer.
    RequestId,
    "RequestId"
);
