//! Whitelisted-writer key/value store for the Geon reward ledger.
//!
//! The store is a passive backing map. It never interprets the records it
//! holds; its only rule is that writes must come from an account its owner
//! has whitelisted. The registry is expected to be the single whitelisted
//! writer and owns the layout of the keys it writes.
//!
//! # Design Rules
//!
//! 1. Reads are open to everyone and never fail for authorization reasons.
//! 2. Every write (`put`, `delete`) names its writer and is rejected unless
//!    that writer is whitelisted.
//! 3. Only the store owner edits the whitelist.
//! 4. Typed helpers encode records with bincode; malformed bytes surface as
//!    [`StoreError::Codec`], never as a panic.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryLedgerStore;
pub use traits::LedgerStore;
