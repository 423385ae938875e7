use std::fmt;

use geon_coin::CoinError;
use geon_store::StoreError;
use geon_types::{Address, Amount, ErrorKind, GeonId};

/// A collaborator whose identity the registry checks before use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collaborator {
    RewardToken,
    Storage,
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RewardToken => f.write_str("reward token"),
            Self::Storage => f.write_str("storage"),
        }
    }
}

/// Errors produced by registry operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Geon with this ID already exists.")]
    DuplicateId { id: GeonId },

    #[error("Geon with this ID does not exist.")]
    NotFound { id: GeonId },

    #[error("Can only be called by the Geon creator.")]
    NotCreator { id: GeonId, caller: Address },

    #[error("Can only be called by the reward token contract.")]
    NotRewardToken { caller: Address },

    #[error("Can only be called by the owner.")]
    NotOwner { caller: Address },

    #[error("insufficient Geon balance: {id} holds {available}, grant requires {required}")]
    InsufficientBalance {
        id: GeonId,
        available: Amount,
        required: Amount,
    },

    #[error("balance of Geon {id} would overflow")]
    BalanceOverflow { id: GeonId },

    #[error("Geon count would overflow")]
    CountOverflow,

    /// The presented collaborator does not live at the configured address.
    #[error("{role} is misconfigured: configured {configured}, presented {actual}")]
    Misconfigured {
        role: Collaborator,
        configured: Address,
        actual: Address,
    },

    #[error("Registry does not accept direct value transfers ({value} offered).")]
    ValueNotAccepted { value: Amount },

    #[error("unknown call selector 0x{selector}")]
    UnknownCall { selector: String },

    #[error("malformed call data: {0}")]
    Codec(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Coin(#[from] CoinError),
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DuplicateId { .. } => ErrorKind::DuplicateId,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::NotCreator { .. } | Self::NotRewardToken { .. } | Self::NotOwner { .. } => {
                ErrorKind::Unauthorized
            }
            Self::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            Self::BalanceOverflow { .. } | Self::CountOverflow => ErrorKind::Overflow,
            Self::Misconfigured { .. } => ErrorKind::Misconfigured,
            Self::ValueNotAccepted { .. } => ErrorKind::ValueNotAccepted,
            Self::UnknownCall { .. } => ErrorKind::UnknownCall,
            Self::Codec(_) => ErrorKind::Codec,
            Self::Store(e) => e.kind(),
            Self::Coin(e) => e.kind(),
        }
    }
}

pub type RegistryResult<T> = Result<T, RegistryError>;
