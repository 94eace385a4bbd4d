//! Error types for donation processing

use crate::store::PaymentId;
use give_bongloy_payments::GatewayError;
use thiserror::Error;

/// Generic text shown to donors when a remote call fails.
pub const GENERIC_DONOR_MESSAGE: &str =
    "An error occurred while processing the donation. Please try again.";

/// A required form field was missing or blank
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: &'static str,
}

impl ValidationError {
    pub const fn new(field: &'static str, message: &'static str) -> Self {
        Self { field, message }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Storage errors reported by a [`PaymentStore`](crate::PaymentStore) or
/// [`CustomerMappingStore`](crate::CustomerMappingStore)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Payment not found: {0}")]
    PaymentNotFound(PaymentId),

    #[error("Invalid status transition for payment {payment}: {from} -> {to}")]
    InvalidTransition {
        payment: PaymentId,
        from: String,
        to: String,
    },

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Everything that can stop a donation or a reconciliation
#[derive(Error, Debug)]
pub enum DonationError {
    /// Missing donor input, one entry per field
    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),

    /// No token, no fallback, no hosted checkout
    #[error("Payment token is missing")]
    MissingToken,

    #[error("Customer creation failed: {0}")]
    CustomerCreationFailed(#[source] GatewayError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Webhook event could not be resolved
    #[error("Reconciliation failed: {0}")]
    Reconciliation(String),

    /// A payment record exists but nothing succeeded that could settle it
    #[error("Payment {0} could not be settled")]
    PersistenceInconsistency(PaymentId),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl DonationError {
    /// Remote API failures are audited and never shown verbatim.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::CustomerCreationFailed(_) | Self::Gateway(_))
    }

    /// Text safe to show the donor.
    pub fn donor_message(&self) -> String {
        match self {
            Self::Validation(errors) => errors
                .iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join("\n"),
            Self::MissingToken => "The Bongloy token is missing. Please contact support.".into(),
            Self::CustomerCreationFailed(_) => {
                "The Bongloy Gateway returned an error while processing the donation.".into()
            }
            Self::Gateway(GatewayError::Api { message: None, .. }) => {
                "The Bongloy API request was invalid, please try again.".into()
            }
            Self::Gateway(_) | Self::Reconciliation(_) => GENERIC_DONOR_MESSAGE.into(),
            Self::PersistenceInconsistency(_) | Self::Storage(_) => {
                "Your donation could not be recorded, please contact the site administrator."
                    .into()
            }
        }
    }
}

/// Result type for donation processing
pub type DonationResult<T> = Result<T, DonationError>;
