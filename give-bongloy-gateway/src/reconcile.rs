//! Refund reconciliation for webhook events and operator refunds

use crate::error::{DonationError, DonationResult};
use crate::hooks::GatewayHooks;
use crate::notify::GatewayErrorLog;
use crate::record::charge_id_from_note;
use crate::store::{PaymentId, PaymentStatus, PaymentStore};
use give_bongloy_config::Environment;
use give_bongloy_payments::{CardGateway, ChargeId, Refund, RefundRequest};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Result of handling one webhook event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Refunded(PaymentId),
    /// The record was refunded before; nothing changed
    AlreadyRefunded(PaymentId),
    /// No record carries this charge
    NoMatchingPayment(ChargeId),
    /// Verified, but not an event the gateway acts on
    Ignored,
}

/// Operator status edit in the host admin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChange {
    pub payment_id: PaymentId,
    pub old_status: PaymentStatus,
    pub new_status: PaymentStatus,
    /// The operator ticked "refund in Bongloy"
    pub refund_in_gateway: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefundOutcome {
    Refunded(Refund),
    /// Preconditions not met; no remote call was made
    Skipped,
}

pub struct RefundReconciler {
    cards: Arc<dyn CardGateway>,
    payments: Arc<dyn PaymentStore>,
    error_log: Arc<dyn GatewayErrorLog>,
    hooks: Arc<dyn GatewayHooks>,
}

impl RefundReconciler {
    pub fn new(
        cards: Arc<dyn CardGateway>,
        payments: Arc<dyn PaymentStore>,
        error_log: Arc<dyn GatewayErrorLog>,
        hooks: Arc<dyn GatewayHooks>,
    ) -> Self {
        Self {
            cards,
            payments,
            error_log,
            hooks,
        }
    }

    /// Re-fetch the event by id and apply it. An id that cannot be
    /// retrieved changes nothing and is an error.
    pub async fn handle_event(&self, env: Environment, event_id: &str) -> DonationResult<EventOutcome> {
        let event = self
            .cards
            .retrieve_event(env, event_id)
            .await
            .map_err(|e| {
                warn!(event = event_id, env = %env, error = %e, "could not verify webhook event");
                DonationError::Reconciliation(format!("event {} could not be retrieved: {}", event_id, e))
            })?;

        debug!(event = %event.id, event_type = event.event_type.as_str(), "webhook event verified");

        let outcome = match event.refunded_charge() {
            Some(charge) => self.apply_refund_event(&charge, &event.id).await?,
            None => EventOutcome::Ignored,
        };

        self.hooks.on_event(&event);
        Ok(outcome)
    }

    async fn apply_refund_event(&self, charge: &ChargeId, event_id: &str) -> DonationResult<EventOutcome> {
        let Some(record) = self.payments.find_by_transaction_id(charge).await? else {
            debug!(charge = %charge, "refund event for unknown charge");
            return Ok(EventOutcome::NoMatchingPayment(charge.clone()));
        };

        if record.status == PaymentStatus::Refunded {
            debug!(payment = %record.id, "payment already refunded");
            return Ok(EventOutcome::AlreadyRefunded(record.id));
        }

        self.payments
            .update_payment_status(record.id, PaymentStatus::Refunded)
            .await?;
        self.payments
            .append_note(
                record.id,
                &format!("Charge refunded in Bongloy (event {}).", event_id),
            )
            .await?;

        info!(payment = %record.id, charge = %charge, "payment refunded from webhook");
        Ok(EventOutcome::Refunded(record.id))
    }

    /// Refund remotely after an operator moved a published record to
    /// `refunded` with the refund box ticked.
    ///
    /// Anything else is skipped silently. A remote failure is logged and
    /// returned; the local status stays `refunded` either way.
    pub async fn admin_refund(&self, change: &StatusChange) -> DonationResult<RefundOutcome> {
        if !(change.refund_in_gateway
            && change.old_status == PaymentStatus::Published
            && change.new_status == PaymentStatus::Refunded)
        {
            return Ok(RefundOutcome::Skipped);
        }

        let id = change.payment_id;
        let Some(record) = self.payments.get_payment(id).await? else {
            return Ok(RefundOutcome::Skipped);
        };

        let charge = match record.transaction_id {
            Some(charge) => charge,
            None => match self.transaction_from_notes(id).await? {
                Some(charge) => charge,
                None => {
                    debug!(payment = %id, "no transaction id, skipping remote refund");
                    return Ok(RefundOutcome::Skipped);
                }
            },
        };

        let refund = match self
            .cards
            .create_refund(record.mode, &RefundRequest::full(charge.clone()))
            .await
        {
            Ok(refund) => refund,
            Err(e) => {
                error!(payment = %id, charge = %charge, error = %e, "remote refund failed");
                self.error_log.record_gateway_error(
                    "Bongloy Refund Error",
                    &format!("Refund of charge {} for payment {} failed: {}", charge, id, e),
                );
                return Err(DonationError::Gateway(e));
            }
        };

        self.payments
            .append_note(id, &format!("Charge refunded in Bongloy: {}", refund.id))
            .await?;
        self.hooks.on_donation_refunded(id, &refund);

        info!(payment = %id, refund = %refund.id, "payment refunded remotely");
        Ok(RefundOutcome::Refunded(refund))
    }

    /// Recover a lost transaction id from the newest charge note and
    /// backfill it.
    async fn transaction_from_notes(&self, id: PaymentId) -> DonationResult<Option<ChargeId>> {
        let notes = self.payments.get_payment_notes(id).await?;
        let Some(charge) = notes
            .iter()
            .rev()
            .find_map(|note| charge_id_from_note(&note.text))
        else {
            return Ok(None);
        };

        self.payments.set_transaction_id(id, &charge).await?;
        info!(payment = %id, charge = %charge, "transaction id recovered from notes");
        Ok(Some(charge))
    }
}
