//! Stock-movement domain: the ledger entries, the product balance they drive,
//! and validation of incoming submissions.
//!
//! Pure domain logic: no IO, no storage, no transport.

pub mod movement;
pub mod product;
pub mod validator;

pub use movement::{Movement, MovementReason, MovementType};
pub use product::{Product, ProductBalance};
pub use validator::{MovementCommand, MovementDraft, ProductLookup, validate};
