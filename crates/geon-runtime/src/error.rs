use geon_coin::{CoinError, TopupError};
use geon_registry::RegistryError;
use geon_store::StoreError;
use geon_types::ErrorKind;

/// Why a top-level invocation was reverted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvocationError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Coin(#[from] CoinError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl InvocationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Registry(e) => e.kind(),
            Self::Coin(e) => e.kind(),
            Self::Store(e) => e.kind(),
        }
    }
}

impl From<TopupError<RegistryError>> for InvocationError {
    fn from(err: TopupError<RegistryError>) -> Self {
        match err {
            TopupError::Coin(e) => Self::Coin(e),
            TopupError::Geon(e) => Self::Registry(e),
        }
    }
}

pub type InvocationResult<T> = Result<T, InvocationError>;
