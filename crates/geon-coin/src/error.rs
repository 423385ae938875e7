use geon_types::{Address, Amount, ErrorKind};

/// Errors produced by the asset ledger itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoinError {
    #[error("Can only be called by the coin owner.")]
    NotOwner { caller: Address },

    #[error("insufficient balance: {account} holds {available}, needs {required}")]
    InsufficientBalance {
        account: Address,
        available: Amount,
        required: Amount,
    },

    #[error("balance of {account} would overflow")]
    BalanceOverflow { account: Address },

    #[error("total supply would overflow")]
    SupplyOverflow,

    #[error("Geon IDs and amounts differ in length: {ids} ids, {amounts} amounts")]
    LengthMismatch { ids: usize, amounts: usize },

    /// The registry handed to a top-up is not the configured top-up account.
    #[error("top-up target {actual} does not match configured Geon registry {configured}")]
    TopupTargetMismatch { configured: Address, actual: Address },
}

impl CoinError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotOwner { .. } => ErrorKind::Unauthorized,
            Self::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            Self::BalanceOverflow { .. } | Self::SupplyOverflow => ErrorKind::Overflow,
            Self::LengthMismatch { .. } => ErrorKind::LengthMismatch,
            Self::TopupTargetMismatch { .. } => ErrorKind::Misconfigured,
        }
    }
}

pub type CoinResult<T> = Result<T, CoinError>;

/// Failure of a directed top-up.
///
/// Either the ledger refused the transfer, or the registry refused the
/// balance increase. In both cases no balance has moved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopupError<E> {
    #[error(transparent)]
    Coin(#[from] CoinError),

    #[error("{0}")]
    Geon(E),
}
