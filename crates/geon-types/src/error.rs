use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while parsing or converting foundation types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid amount '{input}': {reason}")]
    InvalidAmount { input: String, reason: String },
}

/// Failure classes shared by every component.
///
/// Each crate keeps its own error enum; `kind()` on those enums maps a
/// concrete failure onto one of these classes so callers can match on the
/// class without depending on every crate's error type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    DuplicateId,
    NotFound,
    Unauthorized,
    InsufficientBalance,
    LengthMismatch,
    ValueNotAccepted,
    UnknownCall,
    Overflow,
    /// A collaborator's identity does not match the configured address.
    Misconfigured,
    /// Stored or encoded bytes could not be decoded.
    Codec,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 10] = [
        Self::DuplicateId,
        Self::NotFound,
        Self::Unauthorized,
        Self::InsufficientBalance,
        Self::LengthMismatch,
        Self::ValueNotAccepted,
        Self::UnknownCall,
        Self::Overflow,
        Self::Misconfigured,
        Self::Codec,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DuplicateId => "DuplicateId",
            Self::NotFound => "NotFound",
            Self::Unauthorized => "Unauthorized",
            Self::InsufficientBalance => "InsufficientBalance",
            Self::LengthMismatch => "LengthMismatch",
            Self::ValueNotAccepted => "ValueNotAccepted",
            Self::UnknownCall => "UnknownCall",
            Self::Overflow => "Overflow",
            Self::Misconfigured => "Misconfigured",
            Self::Codec => "Codec",
        }
    }

    /// Parse a kind from its name, as written in scenario files.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
