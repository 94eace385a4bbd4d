//! Remote API implementations

#[cfg(feature = "bongloy")]
pub mod bongloy;

#[cfg(feature = "plaid")]
pub mod plaid;

#[cfg(feature = "bongloy")]
pub use bongloy::{BONGLOY_API_BASE, BongloyProvider};

#[cfg(feature = "plaid")]
pub use plaid::{PLAID_PRODUCTION_BASE, PLAID_SANDBOX_BASE, PlaidClient};
