//! Donation orchestration for the Give Bongloy gateway
//!
//! Turns a donation submission into a remote customer, a charge and a payment
//! record in the host CMS, and keeps those records in step with refunds made
//! remotely or by an operator.
//!
//! # Features
//!
//! - **Token resolution**: client tokens, server-side card tokenization,
//!   hosted checkout and Plaid bank accounts
//! - **Customer reuse**: one remote customer per donor and environment
//! - **Source dedup**: a card already on file is never attached twice
//! - **Preapproval**: authorize-only donations parked in `preapproval`
//! - **Refund reconciliation**: webhook events are re-fetched before they
//!   are trusted, and operator refunds are pushed to the API
//!
//! # Example: Processing a Donation
//!
//! ```rust,ignore
//! use give_bongloy_gateway::{DonationGateway, DonationRequest, DonorProfile, PaymentInput};
//!
//! let gateway = DonationGateway::bongloy(settings, store.clone(), store);
//!
//! let request = DonationRequest::new(amount, currency, DonorProfile::new("donor@example.org"), PaymentInput::Token(token))
//!     .with_form(FormInfo::new(12, "Winter Appeal"))
//!     .with_purchase_key(purchase_key);
//!
//! match gateway.process_donation(request).await {
//!     Ok(done) => redirect_to(done.redirect),
//!     Err(rejected) => show_error(rejected.donor_message(), rejected.redirect),
//! }
//! ```
//!
//! # Example: Webhooks
//!
//! ```rust,ignore
//! use give_bongloy_gateway::ListenerRequest;
//!
//! if let Some(response) = gateway.handle_listener(&ListenerRequest::new(query, body)).await {
//!     respond(response.status, response.body);
//! }
//! ```

mod charge;
mod customer;
mod error;
mod gateway;
mod hooks;
mod listener;
mod notify;
mod reconcile;
mod record;
mod registry;
mod request;
mod token;

pub mod store;
pub mod testing;

pub use charge::{ChargeExecutor, STATEMENT_DESCRIPTOR_MAX, statement_descriptor};
pub use customer::CustomerRegistry;
pub use error::{DonationError, DonationResult, GENERIC_DONOR_MESSAGE, StoreError, ValidationError};
pub use gateway::{Completed, DonationGateway, DonationOutcome, Redirect, Rejected};
pub use hooks::{GatewayHooks, NoHooks};
pub use listener::{LISTENER_NAME, LISTENER_PARAM, ListenerRequest, ListenerResponse, WebhookListener};
pub use notify::{GatewayErrorLog, LogNotifier, Notifier, TracingErrorLog};
pub use reconcile::{EventOutcome, RefundOutcome, RefundReconciler, StatusChange};
pub use record::{
    CHARGE_NOTE_PREFIX, CUSTOMER_NOTE_PREFIX, PaymentRecorder, Settlement, charge_id_from_note,
};
pub use registry::{GatewayRegistration, StatusRegistration, gateway_registrations, status_registrations};
pub use request::{
    DonationRequest, DonorIdentity, DonorProfile, FormInfo, GatewayId, PaymentInput, RawCardFields,
};
pub use store::{
    CustomerMappingStore, InMemoryStore, MappingWrite, NewPayment, PaymentId, PaymentNote,
    PaymentRecord, PaymentStatus, PaymentStore,
};
pub use token::{TokenResolution, TokenResolver};
