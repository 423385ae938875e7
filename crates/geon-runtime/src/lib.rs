//! Execution environment for the Geon ledger.
//!
//! The components in `geon-coin`, `geon-registry`, and `geon-store` each
//! validate before they mutate, but a top-up or payout spans several of
//! them. [`Runtime`] makes every top-level invocation all-or-nothing across
//! all three: invocations are serialized behind one lock, run against a
//! staged copy of the [`World`], and commit only on success.
//!
//! ```text
//! caller ──▶ Runtime::transact ──▶ staged World
//!                                   ├─ GeonCoin
//!                                   ├─ GeonRegistry ──▶ InMemoryLedgerStore
//!                                   └─ commit on Ok / discard on Err
//! ```
//!
//! [`Runtime::deploy`] builds and wires a world from a [`DeploymentConfig`];
//! [`Runtime::audit`] reconciles custody against Geon balances.

pub mod audit;
pub mod config;
pub mod error;
pub mod runtime;
pub mod world;

pub use audit::CustodyAudit;
pub use config::{ConfigError, DeploymentConfig};
pub use error::{InvocationError, InvocationResult};
pub use runtime::Runtime;
pub use world::World;
