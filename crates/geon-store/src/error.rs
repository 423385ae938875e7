use geon_types::{Address, ErrorKind};

/// Errors from ledger store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A write was attempted by an account that is not whitelisted.
    #[error("Caller is not a whitelisted writer: {writer}")]
    NotWhitelisted { writer: Address },

    /// A whitelist edit was attempted by someone other than the owner.
    #[error("Can only be called by the store owner.")]
    NotOwner { caller: Address },

    /// Stored bytes could not be decoded into the requested record type,
    /// or a record could not be encoded.
    #[error("corrupt record at key {key}: {reason}")]
    Codec { key: String, reason: String },
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotWhitelisted { .. } | Self::NotOwner { .. } => ErrorKind::Unauthorized,
            Self::Codec { .. } => ErrorKind::Codec,
        }
    }

    pub(crate) fn codec(key: &[u8], reason: impl ToString) -> Self {
        Self::Codec {
            key: hex::encode(key),
            reason: reason.to_string(),
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
