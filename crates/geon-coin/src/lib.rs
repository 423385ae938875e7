//! Reward asset ledger ("GeonCoin") for the Geon registry.
//!
//! Tracks fungible balances per account. Beyond plain transfers it offers a
//! directed top-up: tokens move from the sender into the registry's pooled
//! custody account and the registry is told, in the same call, which Geon
//! the tokens belong to.
//!
//! - [`GeonCoin`]: balances, owner-gated minting, transfers, top-ups
//! - [`GeonTopup`]: the registry-side boundary a top-up notifies
//! - [`CoinError`] / [`TopupError`]: failures of the ledger itself and of
//!   a top-up whose registry notification was rejected

pub mod coin;
pub mod error;
pub mod topup;

pub use coin::GeonCoin;
pub use error::{CoinError, CoinResult, TopupError};
pub use topup::GeonTopup;
