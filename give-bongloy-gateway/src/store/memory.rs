//! In-memory store

use super::*;
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
struct StoredPayment {
    record: PaymentRecord,
    notes: Vec<PaymentNote>,
}

/// In-memory [`PaymentStore`] and [`CustomerMappingStore`]
#[derive(Debug, Default)]
pub struct InMemoryStore {
    next_id: AtomicU64,
    payments: RwLock<HashMap<PaymentId, StoredPayment>>,
    /// transaction id -> payment
    by_transaction: RwLock<HashMap<ChargeId, PaymentId>>,
    mappings: RwLock<HashMap<(DonorIdentity, Environment), CustomerId>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored payment records
    pub fn payment_count(&self) -> usize {
        self.payments.read().map(|p| p.len()).unwrap_or(0)
    }

    /// Set a status without transition checks, the way an operator edit
    /// in the host admin would.
    pub fn force_status(&self, id: PaymentId, status: PaymentStatus) -> Result<(), StoreError> {
        let mut payments = self.payments.write().map_err(|_| StoreError::LockPoisoned)?;
        let stored = payments.get_mut(&id).ok_or(StoreError::PaymentNotFound(id))?;
        stored.record.status = status;
        Ok(())
    }
}

#[async_trait]
impl PaymentStore for InMemoryStore {
    async fn create_payment_record(&self, payment: NewPayment) -> Result<PaymentId, StoreError> {
        let id = PaymentId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let record = PaymentRecord {
            id,
            status: PaymentStatus::Pending,
            amount: payment.amount,
            currency: payment.currency,
            gateway: payment.gateway,
            mode: payment.mode,
            transaction_id: None,
            customer_id: payment.customer_id,
            purchase_key: payment.purchase_key,
            form_id: payment.form_id,
            donor_email: payment.donor_email,
            created_at: Utc::now(),
        };

        let mut payments = self.payments.write().map_err(|_| StoreError::LockPoisoned)?;
        payments.insert(
            id,
            StoredPayment {
                record,
                notes: Vec::new(),
            },
        );
        Ok(id)
    }

    async fn update_payment_status(
        &self,
        id: PaymentId,
        status: PaymentStatus,
    ) -> Result<(), StoreError> {
        let mut payments = self.payments.write().map_err(|_| StoreError::LockPoisoned)?;
        let stored = payments.get_mut(&id).ok_or(StoreError::PaymentNotFound(id))?;

        let current = stored.record.status;
        if !current.can_transition_to(status) {
            return Err(StoreError::InvalidTransition {
                payment: id,
                from: current.to_string(),
                to: status.to_string(),
            });
        }
        stored.record.status = status;
        Ok(())
    }

    async fn append_note(&self, id: PaymentId, text: &str) -> Result<(), StoreError> {
        let mut payments = self.payments.write().map_err(|_| StoreError::LockPoisoned)?;
        let stored = payments.get_mut(&id).ok_or(StoreError::PaymentNotFound(id))?;
        stored.notes.push(PaymentNote {
            created_at: Utc::now(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn set_transaction_id(&self, id: PaymentId, txn: &ChargeId) -> Result<(), StoreError> {
        let mut payments = self.payments.write().map_err(|_| StoreError::LockPoisoned)?;
        let mut index = self
            .by_transaction
            .write()
            .map_err(|_| StoreError::LockPoisoned)?;

        let stored = payments.get_mut(&id).ok_or(StoreError::PaymentNotFound(id))?;
        if let Some(previous) = stored.record.transaction_id.replace(txn.clone()) {
            index.remove(&previous);
        }
        index.insert(txn.clone(), id);
        Ok(())
    }

    async fn get_payment_notes(&self, id: PaymentId) -> Result<Vec<PaymentNote>, StoreError> {
        let payments = self.payments.read().map_err(|_| StoreError::LockPoisoned)?;
        payments
            .get(&id)
            .map(|stored| stored.notes.clone())
            .ok_or(StoreError::PaymentNotFound(id))
    }

    async fn get_payment(&self, id: PaymentId) -> Result<Option<PaymentRecord>, StoreError> {
        let payments = self.payments.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(payments.get(&id).map(|stored| stored.record.clone()))
    }

    async fn find_by_transaction_id(
        &self,
        txn: &ChargeId,
    ) -> Result<Option<PaymentRecord>, StoreError> {
        let payments = self.payments.read().map_err(|_| StoreError::LockPoisoned)?;
        let index = self
            .by_transaction
            .read()
            .map_err(|_| StoreError::LockPoisoned)?;

        Ok(index
            .get(txn)
            .and_then(|id| payments.get(id))
            .map(|stored| stored.record.clone()))
    }
}

#[async_trait]
impl CustomerMappingStore for InMemoryStore {
    async fn get_customer_mapping(
        &self,
        identity: &DonorIdentity,
        env: Environment,
    ) -> Result<Option<CustomerId>, StoreError> {
        let mappings = self.mappings.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(mappings.get(&(identity.clone(), env)).cloned())
    }

    async fn set_customer_mapping(
        &self,
        identity: &DonorIdentity,
        env: Environment,
        customer: &CustomerId,
    ) -> Result<(), StoreError> {
        let mut mappings = self.mappings.write().map_err(|_| StoreError::LockPoisoned)?;
        mappings.insert((identity.clone(), env), customer.clone());
        Ok(())
    }

    async fn compare_and_set(
        &self,
        identity: &DonorIdentity,
        env: Environment,
        expected: Option<&CustomerId>,
        customer: &CustomerId,
    ) -> Result<MappingWrite, StoreError> {
        let mut mappings = self.mappings.write().map_err(|_| StoreError::LockPoisoned)?;
        let key = (identity.clone(), env);

        let current = mappings.get(&key);
        if current != expected {
            return Ok(MappingWrite::Conflict(current.cloned()));
        }
        mappings.insert(key, customer.clone());
        Ok(MappingWrite::Stored)
    }
}
