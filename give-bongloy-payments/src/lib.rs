//! Remote API layer for the Give Bongloy gateway
//!
//! Talks to the Bongloy card API (Stripe v1 compatible) and the Plaid
//! bank-link API. The orchestration above it only sees the
//! [`CardGateway`] and [`BankAuth`] traits, so tests can swap either side
//! for an in-process double.
//!
//! ## Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  give-bongloy-payments                    │
//! │                                                           │
//! │  Money / Currency ── zero-decimal aware minor units       │
//! │                                                           │
//! │  CardGateway                         BankAuth             │
//! │  tokens | customers | sources        public token ──►     │
//! │  charges | refunds | events          bank account token   │
//! │        │                                  │               │
//! │        ▼                                  ▼               │
//! │  BongloyProvider                     PlaidClient          │
//! │        └──────────── ProviderClient ──────┘               │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use give_bongloy_payments::{BongloyProvider, CardGateway, Currency, Money};
//!
//! let provider = BongloyProvider::new(settings.clone());
//! let env = settings.environment();
//!
//! let customer = provider.create_customer(env, &request).await?;
//! let charge = provider
//!     .create_charge(env, &ChargeRequest::new(money, customer.id))
//!     .await?;
//! ```

pub mod error;
pub mod money;
pub mod provider;
pub mod types;
pub mod webhook;

pub mod providers;

pub use error::*;
pub use money::*;
pub use provider::*;
pub use types::*;
pub use webhook::*;

#[cfg(feature = "bongloy")]
pub use providers::BongloyProvider;

#[cfg(feature = "plaid")]
pub use providers::PlaidClient;

pub use give_bongloy_config::Environment;

/// Prelude for common imports
pub mod prelude {
    pub use crate::error::{GatewayError, GatewayResult};
    pub use crate::money::{Currency, Money};
    pub use crate::provider::{BankAuth, CardGateway};
    pub use crate::types::*;
    pub use crate::webhook::{Event, EventType};
    pub use give_bongloy_config::Environment;

    #[cfg(feature = "bongloy")]
    pub use crate::providers::BongloyProvider;

    #[cfg(feature = "plaid")]
    pub use crate::providers::PlaidClient;
}
