//! Domain error taxonomy for the card ledger.
//!
//! Every variant is a recoverable-to-caller condition; the boundary layer
//! maps each kind to a transport status. The core never formats transport
//! responses itself.

use thiserror::Error;

/// Card ledger error types
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Referenced card or user is absent, or outside the caller's scope.
    #[error("{0}")]
    NotFound(String),

    /// A state-transition guard was violated (already active/blocked/exists).
    #[error("{0}")]
    Conflict(String),

    #[error("Card is not active")]
    CardNotActive,

    #[error("Insufficient funds")]
    InsufficientFunds,

    #[error("Cannot transfer to the same card")]
    SelfTransfer,

    #[error("You can transfer only from your own card")]
    NotOwner,

    #[error("Amount must be greater than zero")]
    InvalidAmount,

    /// Identity cipher malfunction. Misconfiguration, not a business
    /// condition: abort the operation and surface as an internal error.
    #[error("Identity cipher failure: {0}")]
    Crypto(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl LedgerError {
    pub fn not_found(what: impl Into<String>) -> Self {
        LedgerError::NotFound(what.into())
    }

    pub fn conflict(what: impl Into<String>) -> Self {
        LedgerError::Conflict(what.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            LedgerError::not_found("Card not found").to_string(),
            "Card not found"
        );
        assert_eq!(
            LedgerError::conflict("Card already blocked").to_string(),
            "Card already blocked"
        );
        assert_eq!(
            LedgerError::SelfTransfer.to_string(),
            "Cannot transfer to the same card"
        );
        assert_eq!(LedgerError::InsufficientFunds.to_string(), "Insufficient funds");
    }
}
