//! Ledger error model.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::id::ProductId;

/// Result type used across the ledger.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// A single validation rule violation, tied to the offending field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

/// Accumulated validation failures for one submission.
///
/// Every violation is collected before returning, so a caller can surface all
/// problems with a form at once instead of one per round trip.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationError {
    violations: Vec<FieldViolation>,
}

impl ValidationError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.violations.push(FieldViolation {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }
}

impl core::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for (idx, v) in self.violations.iter().enumerate() {
            if idx > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", v.field, v.message)?;
        }
        Ok(())
    }
}

/// Ledger-level error.
///
/// Every failure here is returned before or instead of a commit: no variant
/// leaves the ledger or a product balance partially updated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// One or more fields of a submission failed validation.
    #[error("validation failed: {0}")]
    Validation(ValidationError),

    /// The referenced product does not exist.
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    /// An issue would drive the balance negative.
    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i64, available: i64 },

    /// The retry ceiling was exhausted under write contention.
    #[error("concurrency conflict: gave up after {attempts} attempts")]
    ConcurrencyConflict { attempts: u32 },

    /// The ledger sum and the stored balance disagree.
    #[error("balance drift: ledger expects {expected}, stored balance is {actual}")]
    DriftDetected { expected: i64, actual: i64 },

    /// Infrastructure failure surfaced from the store.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl From<ValidationError> for LedgerError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_lists_every_violation() {
        let mut errors = ValidationError::new();
        errors.push("quantity", "must be a positive integer");
        errors.push("type", "must be \"in\" or \"out\"");

        assert_eq!(errors.violations().len(), 2);
        assert_eq!(
            errors.to_string(),
            "quantity: must be a positive integer; type: must be \"in\" or \"out\""
        );
    }
}
