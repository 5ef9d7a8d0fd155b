//! `stockbook-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod version;

pub use error::{FieldViolation, LedgerError, LedgerResult, ValidationError};
pub use id::{MovementId, ProductId, UserId};
pub use version::ExpectedVersion;
