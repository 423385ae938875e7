//! The Geon registry.
//!
//! A Geon is a uniquely identified account holding a share of the reward
//! tokens the registry keeps in pooled custody on the coin. The registry:
//!
//! - creates Geons (any caller) and deletes them (creator only, paying out
//!   the Geon's balance);
//! - credits Geon balances when the trusted reward token reports a top-up;
//! - records one-time geomining grants (owner only) that a geominer claims
//!   exactly once.
//!
//! Records live in a [`geon_store::LedgerStore`] the registry is whitelisted
//! on. At every commit point the sum of Geon balances equals the registry's
//! custody balance on the coin.
//!
//! [`call`] provides the selector-prefixed encoding used to invoke the
//! registry from raw input.

pub mod call;
pub mod error;
pub mod geon;
pub mod registry;

pub use call::{CallOutput, RegistryCall, Selector, SELECTOR_LEN};
pub use error::{Collaborator, RegistryError, RegistryResult};
pub use geon::Geon;
pub use registry::{GeonRegistry, RegistryTopup};
