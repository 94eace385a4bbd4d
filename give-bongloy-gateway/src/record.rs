//! Payment record state machine
//!
//! ```text
//! pending ──► preapproval ──► publish
//!    │             │             │
//!    └─────────────┴─────────────┴──► refunded (terminal)
//! ```

use crate::error::{DonationError, DonationResult};
use crate::notify::Notifier;
use crate::store::{NewPayment, PaymentId, PaymentStatus, PaymentStore};
use give_bongloy_payments::{ChargeId, CustomerId};
use std::sync::Arc;
use tracing::{info, warn};

/// Note prefix for charge ids; also how lost transaction ids are recovered.
pub const CHARGE_NOTE_PREFIX: &str = "Bongloy Charge ID: ";
pub const CUSTOMER_NOTE_PREFIX: &str = "Bongloy Customer ID: ";

/// What the orchestration produced for one record
#[derive(Debug, Clone, Default)]
pub struct Settlement {
    pub customer: Option<CustomerId>,
    pub charge: Option<ChargeId>,
    pub preapproval: bool,
}

pub struct PaymentRecorder {
    payments: Arc<dyn PaymentStore>,
    notifier: Arc<dyn Notifier>,
}

impl PaymentRecorder {
    pub fn new(payments: Arc<dyn PaymentStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { payments, notifier }
    }

    /// Create the record in `pending`.
    pub async fn open(&self, payment: NewPayment) -> DonationResult<PaymentId> {
        let id = self.payments.create_payment_record(payment).await?;
        info!(payment = %id, "payment record created");
        Ok(id)
    }

    /// Move a pending record to its success status.
    ///
    /// A record with neither a customer nor a charge cannot be settled and
    /// is marked `failed`. `publish` also requires a transaction id, from
    /// this run or an earlier one.
    pub async fn settle(&self, id: PaymentId, settlement: Settlement) -> DonationResult<PaymentStatus> {
        if settlement.customer.is_none() && settlement.charge.is_none() {
            return Err(self.fail(id).await);
        }

        let status = if settlement.preapproval {
            PaymentStatus::Preapproval
        } else {
            let has_transaction = match &settlement.charge {
                Some(_) => true,
                None => self
                    .payments
                    .get_payment(id)
                    .await?
                    .is_some_and(|record| record.transaction_id.is_some()),
            };
            if !has_transaction {
                return Err(self.fail(id).await);
            }
            PaymentStatus::Published
        };

        if let Some(charge) = &settlement.charge {
            self.payments
                .append_note(id, &format!("{}{}", CHARGE_NOTE_PREFIX, charge))
                .await?;
            self.payments.set_transaction_id(id, charge).await?;
        }

        self.payments.update_payment_status(id, status).await?;

        if let Some(customer) = &settlement.customer {
            self.payments
                .append_note(id, &format!("{}{}", CUSTOMER_NOTE_PREFIX, customer))
                .await?;
        }

        if status == PaymentStatus::Preapproval {
            self.notifier.preapproval_admin_notice(id).await;
            self.notifier.preapproval_donor_notice(id).await;
        }

        info!(payment = %id, status = %status, "payment settled");
        Ok(status)
    }

    async fn fail(&self, id: PaymentId) -> DonationError {
        warn!(payment = %id, "payment could not be settled");
        if let Err(e) = self
            .payments
            .update_payment_status(id, PaymentStatus::Failed)
            .await
        {
            warn!(payment = %id, error = %e, "could not mark payment failed");
        }
        DonationError::PersistenceInconsistency(id)
    }
}

/// Charge id from a `Bongloy Charge ID: <id>` note
pub fn charge_id_from_note(text: &str) -> Option<ChargeId> {
    let rest = text.trim_start().strip_prefix(CHARGE_NOTE_PREFIX)?;
    rest.split_whitespace().next().and_then(ChargeId::new)
}
