//! Checkout attempt state machine.

use serde::{Deserialize, Serialize};

/// The phase of a checkout attempt.
///
/// Phase transitions:
/// ```text
/// Idle ──► Validating ──► CreatingOrder ──► CreatingLineItems ──► AdjustingInventory ──► Succeeded
///              │                │                  │                      │
///              └────────────────┴──────────────────┴──────────────────────┴──► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CheckoutPhase {
    /// No attempt is in flight.
    #[default]
    Idle,

    /// Checking the cart snapshot and customer fields; nothing written yet.
    Validating,

    /// Writing the order header.
    CreatingOrder,

    /// Writing the order's line items.
    CreatingLineItems,

    /// Decrementing inventory per line item.
    AdjustingInventory,

    /// All writes landed (terminal state).
    Succeeded,

    /// The attempt stopped before completing (terminal state).
    Failed,
}

impl CheckoutPhase {
    /// Returns true once the attempt can no longer progress.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CheckoutPhase::Succeeded | CheckoutPhase::Failed)
    }

    /// Returns true for phases where a failure leaves remote state behind.
    pub fn leaves_partial_state(&self) -> bool {
        matches!(
            self,
            CheckoutPhase::CreatingLineItems | CheckoutPhase::AdjustingInventory
        )
    }

    /// Returns the phase name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutPhase::Idle => "Idle",
            CheckoutPhase::Validating => "Validating",
            CheckoutPhase::CreatingOrder => "CreatingOrder",
            CheckoutPhase::CreatingLineItems => "CreatingLineItems",
            CheckoutPhase::AdjustingInventory => "AdjustingInventory",
            CheckoutPhase::Succeeded => "Succeeded",
            CheckoutPhase::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for CheckoutPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
