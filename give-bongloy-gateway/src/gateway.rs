//! Donation orchestration
//!
//! ```text
//! validate ─► resolve token ─► customer ─► source ─► charge ─► record
//!    │              │              │          │         │         │
//!    └──────────────┴──────────────┴──────────┴─────────┴─────────┴─► Rejected + checkout redirect
//! ```
//!
//! Steps run strictly in order and the first failure ends the submission.
//! The payment record is opened only once every remote step has succeeded,
//! so a declined card never leaves a record behind.

use crate::charge::ChargeExecutor;
use crate::customer::CustomerRegistry;
use crate::error::{DonationError, DonationResult};
use crate::hooks::{GatewayHooks, NoHooks};
use crate::listener::{ListenerRequest, ListenerResponse, WebhookListener};
use crate::notify::{GatewayErrorLog, LogNotifier, Notifier, TracingErrorLog};
use crate::reconcile::{EventOutcome, RefundOutcome, RefundReconciler, StatusChange};
use crate::record::{PaymentRecorder, Settlement};
use crate::request::{DonationRequest, GatewayId};
use crate::store::{CustomerMappingStore, NewPayment, PaymentId, PaymentStatus, PaymentStore};
use crate::token::{TokenResolution, TokenResolver};
use give_bongloy_config::{Environment, GatewaySettings};
use give_bongloy_payments::{
    BankAuth, BongloyProvider, CardGateway, ChargeId, CustomerId, PlaidClient,
};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Where the host should send the donor next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redirect {
    /// Back to the payment step of the form
    Checkout { payment_mode: GatewayId, form_id: u64 },
    SuccessPage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completed {
    pub payment_id: PaymentId,
    pub status: PaymentStatus,
    pub redirect: Redirect,
}

#[derive(Debug)]
pub struct Rejected {
    pub error: DonationError,
    pub redirect: Redirect,
}

impl Rejected {
    /// Text safe to show the donor
    pub fn donor_message(&self) -> String {
        self.error.donor_message()
    }
}

pub type DonationOutcome = Result<Completed, Rejected>;

/// Entry point the host calls for submissions, webhooks and refunds.
///
/// Collaborators are injected; the component services are rebuilt from them
/// per call and hold nothing but shared handles.
pub struct DonationGateway {
    settings: Arc<GatewaySettings>,
    cards: Arc<dyn CardGateway>,
    bank: Option<Arc<dyn BankAuth>>,
    payments: Arc<dyn PaymentStore>,
    mappings: Arc<dyn CustomerMappingStore>,
    notifier: Arc<dyn Notifier>,
    error_log: Arc<dyn GatewayErrorLog>,
    hooks: Arc<dyn GatewayHooks>,
}

impl DonationGateway {
    pub fn new(
        settings: Arc<GatewaySettings>,
        cards: Arc<dyn CardGateway>,
        payments: Arc<dyn PaymentStore>,
        mappings: Arc<dyn CustomerMappingStore>,
    ) -> Self {
        Self {
            settings,
            cards,
            bank: None,
            payments,
            mappings,
            notifier: Arc::new(LogNotifier),
            error_log: Arc::new(TracingErrorLog),
            hooks: Arc::new(NoHooks),
        }
    }

    /// Gateway talking to the live Bongloy API, plus Plaid when
    /// credentials are configured.
    pub fn bongloy(
        settings: Arc<GatewaySettings>,
        payments: Arc<dyn PaymentStore>,
        mappings: Arc<dyn CustomerMappingStore>,
    ) -> Self {
        let cards = Arc::new(BongloyProvider::new(settings.clone()));
        let plaid = settings.plaid.is_some();
        let gateway = Self::new(settings.clone(), cards, payments, mappings);
        if plaid {
            gateway.with_bank_auth(Arc::new(PlaidClient::new(settings)))
        } else {
            gateway
        }
    }

    pub fn with_bank_auth(mut self, bank: Arc<dyn BankAuth>) -> Self {
        self.bank = Some(bank);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_error_log(mut self, error_log: Arc<dyn GatewayErrorLog>) -> Self {
        self.error_log = error_log;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn GatewayHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    pub fn environment(&self) -> Environment {
        self.settings.environment()
    }

    /// Process one submission end to end.
    pub async fn process_donation(&self, request: DonationRequest) -> DonationOutcome {
        let env = self.environment();
        match self.run(env, &request).await {
            Ok((payment_id, status)) => Ok(Completed {
                payment_id,
                status,
                redirect: Redirect::SuccessPage,
            }),
            Err(error) => {
                self.audit(&error, &request);
                Err(Rejected {
                    error,
                    redirect: Redirect::Checkout {
                        payment_mode: request.gateway,
                        form_id: request.form.id,
                    },
                })
            }
        }
    }

    /// Run the steps for one submission.
    ///
    /// In preapproval mode no charge is created, so no authorization hold is
    /// placed on the card. The source stays attached to the customer and the
    /// operator charges it later.
    async fn run(
        &self,
        env: Environment,
        request: &DonationRequest,
    ) -> DonationResult<(PaymentId, PaymentStatus)> {
        request.validate()?;

        let resolution = self.token_resolver().resolve(env, request).await?;
        let customer = self.customer_registry().get_or_create(env, request).await?;

        let executor = self.charge_executor();
        let source = match &resolution {
            TokenResolution::Token(token) => {
                Some(executor.find_or_create_source(env, &customer, token).await?)
            }
            TokenResolution::Deferred => None,
        };

        let preapproval = self.settings.preapprove_only;
        let charge = if preapproval {
            None
        } else {
            Some(
                executor
                    .charge(env, &customer, source.as_ref(), request)
                    .await?
                    .id,
            )
        };

        let recorded = self
            .record(env, request, &customer, charge.clone(), preapproval)
            .await;
        if let (Err(e), Some(charge)) = (&recorded, &charge) {
            self.orphaned_charge(env, request, &customer, charge, e);
        }
        recorded
    }

    async fn record(
        &self,
        env: Environment,
        request: &DonationRequest,
        customer: &CustomerId,
        charge: Option<ChargeId>,
        preapproval: bool,
    ) -> DonationResult<(PaymentId, PaymentStatus)> {
        let recorder = self.recorder();
        let payment_id = recorder
            .open(NewPayment {
                amount: request.amount,
                currency: request.currency.clone(),
                gateway: request.gateway,
                mode: env,
                customer_id: Some(customer.clone()),
                purchase_key: request.purchase_key.clone(),
                form_id: request.form.id,
                form_title: request.form.title().to_string(),
                donor_email: request.donor.email.trim().to_string(),
            })
            .await?;

        let status = recorder
            .settle(
                payment_id,
                Settlement {
                    customer: Some(customer.clone()),
                    charge,
                    preapproval,
                },
            )
            .await?;

        info!(payment = %payment_id, status = %status, env = %env, "donation processed");
        Ok((payment_id, status))
    }

    /// The donor was charged but the record could not be written. Keep the
    /// remote ids so the operator can trace or refund the charge.
    fn orphaned_charge(
        &self,
        env: Environment,
        request: &DonationRequest,
        customer: &CustomerId,
        charge: &ChargeId,
        error: &DonationError,
    ) {
        error!(charge = %charge, customer = %customer, env = %env, error = %error, "charge has no payment record");
        self.error_log.record_gateway_error(
            "Bongloy Orphaned Charge",
            &format!(
                "Charge {} for customer {} ({}) succeeded but the payment record for {} {} from {} on form {} was not saved: {}",
                charge,
                customer,
                env,
                request.amount,
                request.currency,
                request.donor.email.trim(),
                request.form.id,
                error
            ),
        );
    }

    /// Remote failures go to the error log with full detail. Everything
    /// else is the donor's to fix and only gets a warning.
    fn audit(&self, error: &DonationError, request: &DonationRequest) {
        let title = match error {
            DonationError::MissingToken => "Missing Bongloy Token",
            DonationError::CustomerCreationFailed(_) => "Bongloy Customer Creation Failed",
            DonationError::Gateway(_) => "Bongloy Error",
            DonationError::PersistenceInconsistency(_) | DonationError::Storage(_) => {
                "Payment Error"
            }
            DonationError::Validation(_) | DonationError::Reconciliation(_) => {
                warn!(form = request.form.id, error = %error, "donation rejected");
                return;
            }
        };

        error!(form = request.form.id, gateway = %request.gateway, error = %error, "donation failed");
        self.error_log.record_gateway_error(
            title,
            &format!(
                "Donation of {} {} from {} on form {} failed: {}",
                request.amount,
                request.currency,
                request.donor.email.trim(),
                request.form.id,
                error
            ),
        );
    }

    /// Re-fetch and apply a webhook event in the active environment.
    pub async fn handle_event(&self, event_id: &str) -> DonationResult<EventOutcome> {
        self.reconciler()
            .handle_event(self.environment(), event_id)
            .await
    }

    /// Remote refund after an operator status change
    pub async fn admin_refund(&self, change: &StatusChange) -> DonationResult<RefundOutcome> {
        self.reconciler().admin_refund(change).await
    }

    pub fn listener(&self) -> WebhookListener {
        WebhookListener::new(
            self.settings.clone(),
            Arc::new(self.reconciler()),
            self.error_log.clone(),
        )
    }

    pub async fn handle_listener(&self, request: &ListenerRequest) -> Option<ListenerResponse> {
        self.listener().handle(request).await
    }

    fn token_resolver(&self) -> TokenResolver {
        TokenResolver::new(self.settings.clone(), self.cards.clone(), self.bank.clone())
    }

    fn customer_registry(&self) -> CustomerRegistry {
        CustomerRegistry::new(self.cards.clone(), self.mappings.clone(), self.hooks.clone())
    }

    fn charge_executor(&self) -> ChargeExecutor {
        ChargeExecutor::new(self.settings.clone(), self.cards.clone(), self.hooks.clone())
    }

    fn recorder(&self) -> PaymentRecorder {
        PaymentRecorder::new(self.payments.clone(), self.notifier.clone())
    }

    fn reconciler(&self) -> RefundReconciler {
        RefundReconciler::new(
            self.cards.clone(),
            self.payments.clone(),
            self.error_log.clone(),
            self.hooks.clone(),
        )
    }
}
