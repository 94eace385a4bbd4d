//! Extension points for embedders.
//!
//! Every method has a no-op default, so implementors override only what
//! they need.

use crate::request::DonationRequest;
use crate::store::PaymentId;
use give_bongloy_payments::{ChargeRequest, Event, Refund};
use std::collections::BTreeMap;

pub trait GatewayHooks: Send + Sync {
    /// Amend metadata before a remote customer is created
    fn customer_metadata(&self, _metadata: &mut BTreeMap<String, String>, _request: &DonationRequest) {}

    /// Amend a charge before it is sent
    fn charge_request(&self, _charge: &mut ChargeRequest, _request: &DonationRequest) {}

    /// Called for every verified webhook event after built-in handling
    fn on_event(&self, _event: &Event) {}

    /// Called after an operator refund went through remotely
    fn on_donation_refunded(&self, _payment: PaymentId, _refund: &Refund) {}
}

/// No hooks
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl GatewayHooks for NoHooks {}
