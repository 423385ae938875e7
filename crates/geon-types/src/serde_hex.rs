//! Shared hex handling for fixed-width identity types.
//!
//! Human-readable formats (TOML, JSON) carry `0x`-prefixed hex strings;
//! binary formats carry the raw byte array.

use crate::error::TypeError;

pub(crate) fn decode_fixed<const N: usize>(s: &str) -> Result<[u8; N], TypeError> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    let bytes = hex::decode(digits).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
    if bytes.len() != N {
        return Err(TypeError::InvalidLength {
            expected: N,
            actual: bytes.len(),
        });
    }
    let mut arr = [0u8; N];
    arr.copy_from_slice(&bytes);
    Ok(arr)
}

pub(crate) fn encode_prefixed(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Implements `Serialize`/`Deserialize` for a newtype over `[u8; $len]`
/// that also has `from_hex` and `Display`.
macro_rules! hex_newtype_serde {
    ($ty:ident, $len:expr) => {
        impl serde::Serialize for $ty {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                if serializer.is_human_readable() {
                    serializer.serialize_str(&self.to_string())
                } else {
                    serde::Serialize::serialize(&self.0, serializer)
                }
            }
        }

        impl<'de> serde::Deserialize<'de> for $ty {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                if deserializer.is_human_readable() {
                    let s = <String as serde::Deserialize>::deserialize(deserializer)?;
                    $ty::from_hex(&s).map_err(serde::de::Error::custom)
                } else {
                    let bytes = <[u8; $len] as serde::Deserialize>::deserialize(deserializer)?;
                    Ok($ty(bytes))
                }
            }
        }
    };
}

pub(crate) use hex_newtype_serde;
