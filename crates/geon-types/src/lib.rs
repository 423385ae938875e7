//! Foundation types for the Geon reward ledger.
//!
//! Every other Geon crate depends on `geon-types`. It provides the identity
//! and value types that cross component boundaries, plus the shared error
//! taxonomy every component error maps onto.
//!
//! # Key Types
//!
//! - [`Address`]: 160-bit account identity; [`Address::NULL`] means "unset"
//! - [`GeonId`]: caller-supplied 128-bit Geon identifier
//! - [`RequestId`]: caller-supplied 128-bit geomining request token
//! - [`Amount`]: non-negative token amount with checked arithmetic
//! - [`ErrorKind`]: the failure classes every invocation can end in

pub mod address;
pub mod amount;
pub mod error;
pub mod id;

mod serde_hex;

pub use address::Address;
pub use amount::{Amount, TOKEN_DECIMALS};
pub use error::{ErrorKind, TypeError};
pub use id::{GeonId, RequestId};
