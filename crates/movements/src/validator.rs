//! Boundary validation: loosely shaped form input becomes a typed command,
//! checked once.

use core::str::FromStr;

use stockbook_core::{LedgerError, ProductId, UserId, ValidationError};

use crate::movement::{MovementReason, MovementType};

const MAX_REFERENCE_LEN: usize = 120;
const MAX_NOTES_LEN: usize = 2000;

/// Raw movement submission, as collected by a form or transport layer.
///
/// Stringly typed on purpose: this is the shape a dialog or request body
/// produces before anything has been checked.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MovementDraft {
    pub product_id: String,
    pub movement_type: String,
    pub quantity: i64,
    pub reason: String,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub idempotency_key: Option<String>,
}

/// Validated movement command, ready for the balance updater.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementCommand {
    pub product_id: ProductId,
    pub movement_type: MovementType,
    pub quantity: i64,
    pub reason: MovementReason,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub recorded_by: UserId,
    pub idempotency_key: Option<String>,
}

/// Read-only product existence lookup for the validator's fast pre-check.
///
/// The balance updater re-checks existence inside the commit attempt; this
/// check only exists to reject obviously bad submissions before any write
/// path is entered.
pub trait ProductLookup {
    fn exists(&self, product_id: ProductId) -> bool;
}

/// Validate a raw draft into a typed command.
///
/// Collects every field violation instead of stopping at the first, then runs
/// the existence pre-check. No side effects.
pub fn validate(
    draft: &MovementDraft,
    recorded_by: UserId,
    products: &dyn ProductLookup,
) -> Result<MovementCommand, LedgerError> {
    let mut errors = ValidationError::new();

    let product_id = match ProductId::from_str(draft.product_id.trim()) {
        Ok(id) => Some(id),
        Err(_) => {
            errors.push("product_id", "must be a valid product identifier");
            None
        }
    };

    let movement_type = MovementType::parse(draft.movement_type.trim());
    if movement_type.is_none() {
        errors.push("type", "must be \"in\" or \"out\"");
    }

    if draft.quantity <= 0 {
        errors.push("quantity", "must be a positive integer");
    }

    let reason_raw = draft.reason.trim();
    let reason = if reason_raw.is_empty() {
        errors.push("reason", "must not be empty");
        None
    } else {
        let parsed = MovementReason::parse(reason_raw);
        if parsed.is_none() {
            errors.push("reason", "is not a recognized movement reason");
        }
        parsed
    };

    let reference = normalized(&draft.reference);
    if let Some(r) = &reference {
        if r.len() > MAX_REFERENCE_LEN {
            errors.push("reference", "is too long");
        }
    }

    let notes = normalized(&draft.notes);
    if let Some(n) = &notes {
        if n.len() > MAX_NOTES_LEN {
            errors.push("notes", "is too long");
        }
    }

    match (product_id, movement_type, reason) {
        (Some(product_id), Some(movement_type), Some(reason)) if errors.is_empty() => {
            if !products.exists(product_id) {
                return Err(LedgerError::ProductNotFound(product_id));
            }

            Ok(MovementCommand {
                product_id,
                movement_type,
                quantity: draft.quantity,
                reason,
                reference,
                notes,
                recorded_by,
                idempotency_key: normalized(&draft.idempotency_key),
            })
        }
        _ => Err(LedgerError::Validation(errors)),
    }
}

fn normalized(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AllProducts;
    impl ProductLookup for AllProducts {
        fn exists(&self, _product_id: ProductId) -> bool {
            true
        }
    }

    struct NoProducts;
    impl ProductLookup for NoProducts {
        fn exists(&self, _product_id: ProductId) -> bool {
            false
        }
    }

    fn draft(product_id: ProductId) -> MovementDraft {
        MovementDraft {
            product_id: product_id.to_string(),
            movement_type: "in".to_string(),
            quantity: 10,
            reason: "Purchase".to_string(),
            reference: Some("  PO-7 ".to_string()),
            notes: Some("   ".to_string()),
            idempotency_key: None,
        }
    }

    #[test]
    fn valid_draft_becomes_a_typed_command() {
        let product_id = ProductId::new();
        let recorded_by = UserId::new();

        let command = validate(&draft(product_id), recorded_by, &AllProducts).unwrap();

        assert_eq!(command.product_id, product_id);
        assert_eq!(command.movement_type, MovementType::In);
        assert_eq!(command.quantity, 10);
        assert_eq!(command.reason, MovementReason::Purchase);
        assert_eq!(command.reference.as_deref(), Some("PO-7"));
        assert_eq!(command.notes, None);
        assert_eq!(command.recorded_by, recorded_by);
    }

    #[test]
    fn all_violations_are_collected_at_once() {
        let bad = MovementDraft {
            product_id: "not-a-uuid".to_string(),
            movement_type: "sideways".to_string(),
            quantity: 0,
            reason: String::new(),
            ..MovementDraft::default()
        };

        let err = validate(&bad, UserId::new(), &AllProducts).unwrap_err();
        match err {
            LedgerError::Validation(errors) => {
                let fields: Vec<&str> = errors
                    .violations()
                    .iter()
                    .map(|v| v.field.as_str())
                    .collect();
                assert_eq!(fields, vec!["product_id", "type", "quantity", "reason"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn unknown_product_is_reported_as_not_found() {
        let product_id = ProductId::new();
        let err = validate(&draft(product_id), UserId::new(), &NoProducts).unwrap_err();
        assert_eq!(err, LedgerError::ProductNotFound(product_id));
    }

    #[test]
    fn overlong_free_text_is_rejected() {
        let mut d = draft(ProductId::new());
        d.notes = Some("x".repeat(5000));

        let err = validate(&d, UserId::new(), &AllProducts).unwrap_err();
        match err {
            LedgerError::Validation(errors) => {
                assert_eq!(errors.violations()[0].field, "notes");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: non-positive quantities never validate.
            #[test]
            fn non_positive_quantities_are_rejected(quantity in i64::MIN..=0) {
                let mut d = draft(ProductId::new());
                d.quantity = quantity;

                let err = validate(&d, UserId::new(), &AllProducts).unwrap_err();
                prop_assert!(matches!(err, LedgerError::Validation(_)));
            }

            /// Property: every enumerated reason round-trips through parse,
            /// regardless of the casing the form submits.
            #[test]
            fn reasons_round_trip_in_any_casing(idx in 0usize..7, upper in proptest::bool::ANY) {
                let reason = MovementReason::ALL[idx];
                let mut s = reason.as_str().to_string();
                if upper {
                    s = s.to_ascii_uppercase();
                }
                prop_assert_eq!(MovementReason::parse(&s), Some(reason));
            }
        }
    }
}
