//! Persistence seams owned by the host CMS
//!
//! Payment records and customer mappings live in the host's storage. The
//! gateway reaches them only through [`PaymentStore`] and
//! [`CustomerMappingStore`]; [`InMemoryStore`] backs tests and embedders
//! without a CMS.

mod memory;

pub use memory::InMemoryStore;

use crate::error::StoreError;
use crate::request::{DonorIdentity, GatewayId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use give_bongloy_config::Environment;
use give_bongloy_payments::{ChargeId, Currency, CustomerId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque id issued by the host when a record is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PaymentId(pub u64);

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Payment record status as the host stores it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "preapproval")]
    Preapproval,
    #[serde(rename = "publish")]
    Published,
    #[serde(rename = "failed")]
    Failed,
    #[serde(rename = "refunded")]
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Preapproval => "preapproval",
            Self::Published => "publish",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "preapproval" => Some(Self::Preapproval),
            "publish" => Some(Self::Published),
            "failed" => Some(Self::Failed),
            "refunded" => Some(Self::Refunded),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Refunded | Self::Failed)
    }

    /// Allowed moves. Staying put is always allowed so repeated
    /// reconciliation is a no-op.
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        if *self == next {
            return true;
        }
        match self {
            Pending => matches!(next, Preapproval | Published | Failed | Refunded),
            Preapproval => matches!(next, Published | Failed | Refunded),
            Published => matches!(next, Refunded),
            Failed | Refunded => false,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields for a new record, which always starts `pending`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPayment {
    pub amount: Decimal,
    pub currency: Currency,
    pub gateway: GatewayId,
    pub mode: Environment,
    pub customer_id: Option<CustomerId>,
    pub purchase_key: String,
    pub form_id: u64,
    pub form_title: String,
    pub donor_email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentNote {
    pub created_at: DateTime<Utc>,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: PaymentId,
    pub status: PaymentStatus,
    pub amount: Decimal,
    pub currency: Currency,
    pub gateway: GatewayId,
    pub mode: Environment,
    pub transaction_id: Option<ChargeId>,
    pub customer_id: Option<CustomerId>,
    pub purchase_key: String,
    pub form_id: u64,
    pub donor_email: String,
    pub created_at: DateTime<Utc>,
}

/// Payment record persistence
#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn create_payment_record(&self, payment: NewPayment) -> Result<PaymentId, StoreError>;

    /// Enforces [`PaymentStatus::can_transition_to`].
    async fn update_payment_status(
        &self,
        id: PaymentId,
        status: PaymentStatus,
    ) -> Result<(), StoreError>;

    async fn append_note(&self, id: PaymentId, text: &str) -> Result<(), StoreError>;

    async fn set_transaction_id(&self, id: PaymentId, txn: &ChargeId) -> Result<(), StoreError>;

    /// Notes oldest first
    async fn get_payment_notes(&self, id: PaymentId) -> Result<Vec<PaymentNote>, StoreError>;

    async fn get_payment(&self, id: PaymentId) -> Result<Option<PaymentRecord>, StoreError>;

    /// Reverse lookup by remote charge id
    async fn find_by_transaction_id(
        &self,
        txn: &ChargeId,
    ) -> Result<Option<PaymentRecord>, StoreError>;
}

/// Outcome of [`CustomerMappingStore::compare_and_set`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingWrite {
    Stored,
    /// Someone else changed the mapping first; this is what is stored now
    Conflict(Option<CustomerId>),
}

/// Donor identity to remote customer id, one mapping per environment.
///
/// Hosts keeping mappings in user meta store them under
/// [`Environment::customer_key`].
#[async_trait]
pub trait CustomerMappingStore: Send + Sync {
    async fn get_customer_mapping(
        &self,
        identity: &DonorIdentity,
        env: Environment,
    ) -> Result<Option<CustomerId>, StoreError>;

    async fn set_customer_mapping(
        &self,
        identity: &DonorIdentity,
        env: Environment,
        customer: &CustomerId,
    ) -> Result<(), StoreError>;

    /// Store `customer` only if the current mapping equals `expected`.
    async fn compare_and_set(
        &self,
        identity: &DonorIdentity,
        env: Environment,
        expected: Option<&CustomerId>,
        customer: &CustomerId,
    ) -> Result<MappingWrite, StoreError>;
}
