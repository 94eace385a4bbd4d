// Test doubles for the remote APIs and host collaborators

use crate::hooks::GatewayHooks;
use crate::notify::{GatewayErrorLog, Notifier};
use crate::store::PaymentId;
use async_trait::async_trait;
use give_bongloy_config::Environment;
use give_bongloy_payments::*;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct MockState {
    sequence: u64,
    tokens: HashMap<String, InstrumentSummary>,
    customers: HashMap<String, Customer>,
    sources: HashMap<String, Vec<Source>>,
    events: HashMap<String, Event>,
    charges: Vec<(Environment, ChargeRequest)>,
    refunds: Vec<(Environment, RefundRequest)>,
    failing: HashMap<&'static str, String>,
}

impl MockState {
    fn next(&mut self, prefix: &str) -> String {
        self.sequence += 1;
        format!("{}_{}", prefix, self.sequence)
    }
}

/// In-process [`CardGateway`] that records every call
#[derive(Default)]
pub struct MockCardGateway {
    state: Mutex<MockState>,
    calls: Mutex<Vec<String>>,
}

impl MockCardGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token and the instrument behind it
    pub fn with_token(self, token: &str, instrument: InstrumentSummary) -> Self {
        lock(&self.state).tokens.insert(token.to_string(), instrument);
        self
    }

    pub fn with_customer(self, id: &str, deleted: bool) -> Self {
        if let Some(customer_id) = CustomerId::new(id) {
            lock(&self.state).customers.insert(
                id.to_string(),
                Customer {
                    id: customer_id,
                    email: None,
                    description: None,
                    metadata: BTreeMap::new(),
                    deleted,
                },
            );
        }
        self
    }

    pub fn with_source(self, customer: &str, source: &str, instrument: InstrumentSummary) -> Self {
        if let Some(id) = SourceId::new(source) {
            lock(&self.state)
                .sources
                .entry(customer.to_string())
                .or_default()
                .push(Source {
                    id,
                    object: "card".to_string(),
                    instrument,
                });
        }
        self
    }

    pub fn with_event(self, event: Event) -> Self {
        lock(&self.state).events.insert(event.id.clone(), event);
        self
    }

    /// Make `method` answer with an API error carrying `message`
    pub fn fail_on(self, method: &'static str, message: &str) -> Self {
        lock(&self.state).failing.insert(method, message.to_string());
        self
    }

    pub fn record_call(&self, method: &str) {
        lock(&self.calls).push(method.to_string());
    }

    pub fn get_calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    pub fn was_called(&self, method: &str) -> bool {
        lock(&self.calls).iter().any(|m| m == method)
    }

    pub fn method_call_count(&self, method: &str) -> usize {
        lock(&self.calls).iter().filter(|m| *m == method).count()
    }

    /// Charge requests received, oldest first
    pub fn charges(&self) -> Vec<(Environment, ChargeRequest)> {
        lock(&self.state).charges.clone()
    }

    /// Refund requests received, oldest first
    pub fn refunds(&self) -> Vec<(Environment, RefundRequest)> {
        lock(&self.state).refunds.clone()
    }

    pub fn customer(&self, id: &str) -> Option<Customer> {
        lock(&self.state).customers.get(id).cloned()
    }

    fn enter(&self, method: &'static str) -> GatewayResult<MutexGuard<'_, MockState>> {
        self.record_call(method);
        let state = lock(&self.state);
        if let Some(message) = state.failing.get(method) {
            return Err(GatewayError::Api {
                provider: "mock",
                status: 402,
                message: Some(message.clone()),
                code: Some("mock_error".to_string()),
            });
        }
        Ok(state)
    }
}

fn new_id<T>(id: Option<T>) -> GatewayResult<T> {
    id.ok_or_else(|| GatewayError::Serialization("empty id".to_string()))
}

#[async_trait]
impl CardGateway for MockCardGateway {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn create_token(&self, _env: Environment, card: &CardDetails) -> GatewayResult<Token> {
        let mut state = self.enter("create_token")?;
        let id = state.next("tok");
        let last4 = card.number.get(card.number.len().saturating_sub(4)..).map(str::to_string);
        let instrument = InstrumentSummary {
            fingerprint: Some(format!("fp_{}", card.number)),
            last4,
            exp_year: card.exp_year.parse().ok(),
            brand: None,
        };
        state.tokens.insert(id.clone(), instrument.clone());
        Ok(Token {
            id: new_id(TokenId::new(id))?,
            instrument: Some(instrument),
            livemode: false,
        })
    }

    async fn retrieve_token(&self, env: Environment, token: &TokenId) -> GatewayResult<Token> {
        let state = self.enter("retrieve_token")?;
        let instrument = state
            .tokens
            .get(token.as_str())
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("token {}", token)))?;
        Ok(Token {
            id: token.clone(),
            instrument: Some(instrument),
            livemode: !env.is_test(),
        })
    }

    async fn retrieve_customer(&self, _env: Environment, id: &CustomerId) -> GatewayResult<Customer> {
        let state = self.enter("retrieve_customer")?;
        state
            .customers
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("customer {}", id)))
    }

    async fn create_customer(
        &self,
        _env: Environment,
        request: &CreateCustomerRequest,
    ) -> GatewayResult<Customer> {
        let mut state = self.enter("create_customer")?;
        let id = state.next("cus");
        let customer = Customer {
            id: new_id(CustomerId::new(id.clone()))?,
            email: request.email.clone(),
            description: request.description.clone(),
            metadata: request.metadata.clone(),
            deleted: false,
        };
        state.customers.insert(id, customer.clone());
        Ok(customer)
    }

    async fn list_sources(&self, _env: Environment, customer: &CustomerId) -> GatewayResult<Vec<Source>> {
        let state = self.enter("list_sources")?;
        Ok(state
            .sources
            .get(customer.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn create_source(
        &self,
        _env: Environment,
        customer: &CustomerId,
        token: &TokenId,
    ) -> GatewayResult<Source> {
        let mut state = self.enter("create_source")?;
        let instrument = state.tokens.get(token.as_str()).cloned().unwrap_or_default();
        let id = state.next("card");
        let source = Source {
            id: new_id(SourceId::new(id))?,
            object: "card".to_string(),
            instrument,
        };
        state
            .sources
            .entry(customer.as_str().to_string())
            .or_default()
            .push(source.clone());
        Ok(source)
    }

    async fn create_charge(&self, env: Environment, request: &ChargeRequest) -> GatewayResult<Charge> {
        let mut state = self.enter("create_charge")?;
        let id = state.next("ch");
        state.charges.push((env, request.clone()));
        Ok(Charge {
            id: new_id(ChargeId::new(id))?,
            amount: request.amount.amount,
            currency: request.amount.currency.code().to_string(),
            customer: Some(request.customer.clone()),
            status: "succeeded".to_string(),
            captured: request.capture,
            paid: true,
            refunded: false,
        })
    }

    async fn retrieve_event(&self, _env: Environment, id: &str) -> GatewayResult<Event> {
        let state = self.enter("retrieve_event")?;
        state
            .events
            .get(id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("event {}", id)))
    }

    async fn create_refund(&self, env: Environment, request: &RefundRequest) -> GatewayResult<Refund> {
        let mut state = self.enter("create_refund")?;
        let id = state.next("re");
        state.refunds.push((env, request.clone()));
        Ok(Refund {
            id: new_id(RefundId::new(id))?,
            charge: Some(request.charge.clone()),
            amount: request.amount.unwrap_or_default(),
            status: "succeeded".to_string(),
        })
    }
}

/// [`BankAuth`] double returning `btok_<account id>`
#[derive(Default)]
pub struct MockBankAuth {
    exchanges: Mutex<Vec<(Environment, String, String)>>,
}

impl MockBankAuth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exchanges(&self) -> Vec<(Environment, String, String)> {
        lock(&self.exchanges).clone()
    }
}

#[async_trait]
impl BankAuth for MockBankAuth {
    async fn exchange_bank_token(
        &self,
        env: Environment,
        public_token: &str,
        account_id: &str,
    ) -> GatewayResult<TokenId> {
        lock(&self.exchanges).push((env, public_token.to_string(), account_id.to_string()));
        new_id(TokenId::new(format!("btok_{}", account_id)))
    }
}

/// Notifier that remembers which notices went out
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(&'static str, PaymentId)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(&'static str, PaymentId)> {
        lock(&self.sent).clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn preapproval_admin_notice(&self, payment: PaymentId) {
        lock(&self.sent).push(("admin", payment));
    }

    async fn preapproval_donor_notice(&self, payment: PaymentId) {
        lock(&self.sent).push(("donor", payment));
    }
}

/// Error log that keeps entries in memory
#[derive(Default)]
pub struct RecordingErrorLog {
    entries: Mutex<Vec<(String, String)>>,
}

impl RecordingErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(String, String)> {
        lock(&self.entries).clone()
    }
}

impl GatewayErrorLog for RecordingErrorLog {
    fn record_gateway_error(&self, title: &str, details: &str) {
        lock(&self.entries).push((title.to_string(), details.to_string()));
    }
}

/// Hooks that remember what they saw
#[derive(Default)]
pub struct RecordingHooks {
    events: Mutex<Vec<String>>,
    refunded: Mutex<HashSet<PaymentId>>,
}

impl RecordingHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Event types seen, in order
    pub fn events(&self) -> Vec<String> {
        lock(&self.events).clone()
    }

    pub fn was_refunded(&self, payment: PaymentId) -> bool {
        lock(&self.refunded).contains(&payment)
    }
}

impl GatewayHooks for RecordingHooks {
    fn on_event(&self, event: &Event) {
        lock(&self.events).push(event.event_type.as_str().to_string());
    }

    fn on_donation_refunded(&self, payment: PaymentId, _refund: &Refund) {
        lock(&self.refunded).insert(payment);
    }
}

/// Instrument summary for tests
pub fn card(fingerprint: &str, exp_year: u32, last4: &str) -> InstrumentSummary {
    InstrumentSummary {
        fingerprint: Some(fingerprint.to_string()),
        last4: Some(last4.to_string()),
        exp_year: Some(exp_year),
        brand: Some("Visa".to_string()),
    }
}

/// A `charge.refunded` event for `charge`
pub fn refund_event(id: &str, charge: &str) -> Event {
    Event {
        id: id.to_string(),
        event_type: EventType::ChargeRefunded,
        livemode: false,
        created_at: None,
        object: serde_json::json!({"id": charge, "object": "charge", "refunded": true}),
    }
}
