use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockbook_core::{MovementId, ProductId, UserId};

/// Direction of a stock movement.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    In,
    Out,
}

impl MovementType {
    /// Parse the exact wire form (`"in"` / `"out"`).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in" => Some(Self::In),
            "out" => Some(Self::Out),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
        }
    }

    /// Signed multiplier applied to a quantity when it hits the balance.
    pub fn signum(self) -> i64 {
        match self {
            Self::In => 1,
            Self::Out => -1,
        }
    }
}

/// Why stock moved. Mirrors the set a warehouse operator can pick from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementReason {
    Purchase,
    Return,
    Adjustment,
    Sale,
    Damaged,
    Transfer,
    Other,
}

impl MovementReason {
    pub const ALL: [MovementReason; 7] = [
        Self::Purchase,
        Self::Return,
        Self::Adjustment,
        Self::Sale,
        Self::Damaged,
        Self::Transfer,
        Self::Other,
    ];

    /// Parse a reason, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::Return => "return",
            Self::Adjustment => "adjustment",
            Self::Sale => "sale",
            Self::Damaged => "damaged",
            Self::Transfer => "transfer",
            Self::Other => "other",
        }
    }
}

/// An immutable ledger entry.
///
/// A movement is created exactly once, by the balance updater, inside the same
/// transaction that updates the product balance. It is never edited or deleted
/// afterwards; corrections are new compensating movements (e.g. an
/// `Adjustment` entry), preserving full history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub id: MovementId,
    pub product_id: ProductId,
    #[serde(rename = "type")]
    pub movement_type: MovementType,
    /// Always positive; direction is carried by `movement_type`.
    pub quantity: i64,
    pub reason: MovementReason,
    pub reference: Option<String>,
    pub notes: Option<String>,
    /// Authenticated caller identity, attached for audit.
    pub recorded_by: UserId,
    /// Server-assigned at commit time.
    pub created_at: DateTime<Utc>,
    pub idempotency_key: Option<String>,
}

impl Movement {
    /// Effect of this movement on the balance: `+quantity` or `-quantity`.
    pub fn signed_delta(&self) -> i64 {
        self.movement_type.signum() * self.quantity
    }
}
