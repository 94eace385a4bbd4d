//! Bongloy payment provider implementation
//!
//! Bongloy speaks the Stripe v1 wire format: form-encoded requests, bearer
//! secret key, `{"error": {...}}` bodies on failure.

use crate::{
    error::{GatewayError, GatewayResult},
    provider::{CardGateway, ProviderClient},
    types::*,
    webhook::{Event, EventType},
};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use give_bongloy_config::{Environment, GatewaySettings};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Production API base
pub const BONGLOY_API_BASE: &str = "https://api.bongloy.com/v1";

/// Bongloy provider
pub struct BongloyProvider {
    settings: Arc<GatewaySettings>,
    client: ProviderClient,
}

impl BongloyProvider {
    /// Create a new Bongloy provider
    pub fn new(settings: Arc<GatewaySettings>) -> Self {
        Self::with_base_url(settings, BONGLOY_API_BASE)
    }

    /// Point the provider at another host (sandbox proxies, tests)
    pub fn with_base_url(settings: Arc<GatewaySettings>, base_url: impl Into<String>) -> Self {
        Self {
            settings,
            client: ProviderClient::new("bongloy", base_url),
        }
    }

    fn secret(&self, env: Environment) -> GatewayResult<&str> {
        self.settings
            .secret_key(env)
            .ok_or_else(|| GatewayError::Config(format!("{}_secret_key is not set", env)))
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        env: Environment,
        path: &str,
        what: &str,
    ) -> GatewayResult<T> {
        debug!(env = %env, path, "bongloy GET");
        let response = self.client.get(path, self.secret(env)?).await?;
        self.client.decode(response, what).await
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        env: Environment,
        path: &str,
        params: &[(String, String)],
        idempotency_key: Option<&str>,
        what: &str,
    ) -> GatewayResult<T> {
        debug!(env = %env, path, "bongloy POST");
        let response = self
            .client
            .post_form(path, self.secret(env)?, params, idempotency_key)
            .await?;
        self.client.decode(response, what).await
    }
}

/// Form parameters in insertion order
#[derive(Default)]
struct Params(Vec<(String, String)>);

impl Params {
    fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.0.push((key.into(), value.into()));
        self
    }

    fn set_opt(&mut self, key: &str, value: Option<&str>) -> &mut Self {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            self.set(key, value);
        }
        self
    }

    fn metadata(&mut self, metadata: &BTreeMap<String, String>) -> &mut Self {
        for (key, value) in metadata {
            self.set(format!("metadata[{}]", key), value.as_str());
        }
        self
    }
}

#[async_trait]
impl CardGateway for BongloyProvider {
    fn name(&self) -> &'static str {
        "bongloy"
    }

    async fn create_token(&self, env: Environment, card: &CardDetails) -> GatewayResult<Token> {
        let mut params = Params::default();
        params
            .set("card[number]", card.number.as_str())
            .set("card[exp_month]", card.exp_month.as_str())
            .set("card[exp_year]", card.exp_year.as_str())
            .set("card[cvc]", card.cvc.as_str())
            .set_opt("card[name]", Some(card.name.as_str()));

        if let Some(address) = &card.address {
            params
                .set_opt("card[address_line1]", address.line1.as_deref())
                .set_opt("card[address_line2]", address.line2.as_deref())
                .set_opt("card[address_city]", address.city.as_deref())
                .set_opt("card[address_state]", address.state.as_deref())
                .set_opt("card[address_country]", address.country.as_deref())
                .set_opt("card[address_zip]", address.zip.as_deref());
        }

        let token: BongloyToken = self.post(env, "/tokens", &params.0, None, "token").await?;
        token.try_into()
    }

    async fn retrieve_token(&self, env: Environment, token: &TokenId) -> GatewayResult<Token> {
        let token: BongloyToken = self
            .get(env, &format!("/tokens/{}", token), &format!("token {}", token))
            .await?;
        token.try_into()
    }

    async fn retrieve_customer(&self, env: Environment, id: &CustomerId) -> GatewayResult<Customer> {
        let customer: BongloyCustomer = self
            .get(env, &format!("/customers/{}", id), &format!("customer {}", id))
            .await?;
        customer.try_into()
    }

    async fn create_customer(
        &self,
        env: Environment,
        request: &CreateCustomerRequest,
    ) -> GatewayResult<Customer> {
        let mut params = Params::default();
        params
            .set_opt("description", request.description.as_deref())
            .set_opt("email", request.email.as_deref())
            .metadata(&request.metadata);

        let customer: BongloyCustomer =
            self.post(env, "/customers", &params.0, None, "customer").await?;
        customer.try_into()
    }

    async fn list_sources(&self, env: Environment, customer: &CustomerId) -> GatewayResult<Vec<Source>> {
        let list: BongloyList<BongloySource> = self
            .get(
                env,
                &format!("/customers/{}/sources", customer),
                &format!("customer {}", customer),
            )
            .await?;
        list.data.into_iter().map(Source::try_from).collect()
    }

    async fn create_source(
        &self,
        env: Environment,
        customer: &CustomerId,
        token: &TokenId,
    ) -> GatewayResult<Source> {
        let mut params = Params::default();
        params.set("source", token.as_str());

        let source: BongloySource = self
            .post(
                env,
                &format!("/customers/{}/sources", customer),
                &params.0,
                None,
                &format!("customer {}", customer),
            )
            .await?;
        source.try_into()
    }

    async fn create_charge(&self, env: Environment, request: &ChargeRequest) -> GatewayResult<Charge> {
        let mut params = Params::default();
        params
            .set("amount", request.amount.amount.to_string())
            .set("currency", request.amount.currency.code().to_lowercase())
            .set("customer", request.customer.as_str())
            .set_opt("source", request.source.as_ref().map(SourceId::as_str))
            .set_opt("description", request.description.as_deref())
            .set_opt("statement_descriptor", request.statement_descriptor.as_deref())
            .set("capture", request.capture.to_string())
            .metadata(&request.metadata);

        let charge: BongloyCharge = self
            .post(
                env,
                "/charges",
                &params.0,
                request.idempotency_key.as_deref(),
                "charge",
            )
            .await?;
        charge.try_into()
    }

    async fn retrieve_event(&self, env: Environment, id: &str) -> GatewayResult<Event> {
        let event: BongloyEvent = self
            .get(env, &format!("/events/{}", id), &format!("event {}", id))
            .await?;
        Ok(event.into())
    }

    async fn create_refund(&self, env: Environment, request: &RefundRequest) -> GatewayResult<Refund> {
        let mut params = Params::default();
        params.set("charge", request.charge.as_str());
        if let Some(amount) = request.amount {
            params.set("amount", amount.to_string());
        }

        let refund: BongloyRefund = self.post(env, "/refunds", &params.0, None, "refund").await?;
        refund.try_into()
    }
}

// Bongloy API types

fn required<T>(id: Option<T>, what: &str) -> GatewayResult<T> {
    id.ok_or_else(|| GatewayError::Serialization(format!("{} without an id", what)))
}

#[derive(Debug, Deserialize)]
struct BongloyList<T> {
    data: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
struct BongloyInstrument {
    fingerprint: Option<String>,
    last4: Option<String>,
    exp_year: Option<u32>,
    brand: Option<String>,
    bank_name: Option<String>,
}

impl From<BongloyInstrument> for InstrumentSummary {
    fn from(bi: BongloyInstrument) -> Self {
        Self {
            fingerprint: bi.fingerprint,
            last4: bi.last4,
            exp_year: bi.exp_year,
            brand: bi.brand.or(bi.bank_name),
        }
    }
}

#[derive(Debug, Deserialize)]
struct BongloyToken {
    id: String,
    #[serde(default)]
    livemode: bool,
    card: Option<BongloyInstrument>,
    bank_account: Option<BongloyInstrument>,
}

impl TryFrom<BongloyToken> for Token {
    type Error = GatewayError;

    fn try_from(bt: BongloyToken) -> GatewayResult<Self> {
        Ok(Self {
            id: required(TokenId::new(bt.id), "token")?,
            instrument: bt.card.or(bt.bank_account).map(Into::into),
            livemode: bt.livemode,
        })
    }
}

#[derive(Debug, Deserialize)]
struct BongloyCustomer {
    id: String,
    email: Option<String>,
    description: Option<String>,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
    #[serde(default)]
    deleted: bool,
}

impl TryFrom<BongloyCustomer> for Customer {
    type Error = GatewayError;

    fn try_from(bc: BongloyCustomer) -> GatewayResult<Self> {
        Ok(Self {
            id: required(CustomerId::new(bc.id), "customer")?,
            email: bc.email,
            description: bc.description,
            metadata: bc.metadata,
            deleted: bc.deleted,
        })
    }
}

#[derive(Debug, Deserialize)]
struct BongloySource {
    id: String,
    #[serde(default)]
    object: String,
    #[serde(flatten)]
    instrument: BongloyInstrument,
}

impl TryFrom<BongloySource> for Source {
    type Error = GatewayError;

    fn try_from(bs: BongloySource) -> GatewayResult<Self> {
        Ok(Self {
            id: required(SourceId::new(bs.id), "source")?,
            object: bs.object,
            instrument: bs.instrument.into(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct BongloyCharge {
    id: String,
    amount: i64,
    currency: String,
    customer: Option<String>,
    #[serde(default)]
    status: String,
    #[serde(default)]
    captured: bool,
    #[serde(default)]
    paid: bool,
    #[serde(default)]
    refunded: bool,
}

impl TryFrom<BongloyCharge> for Charge {
    type Error = GatewayError;

    fn try_from(bc: BongloyCharge) -> GatewayResult<Self> {
        Ok(Self {
            id: required(ChargeId::new(bc.id), "charge")?,
            amount: bc.amount,
            currency: bc.currency.to_uppercase(),
            customer: bc.customer.and_then(CustomerId::new),
            status: bc.status,
            captured: bc.captured,
            paid: bc.paid,
            refunded: bc.refunded,
        })
    }
}

#[derive(Debug, Deserialize)]
struct BongloyRefund {
    id: String,
    charge: Option<String>,
    amount: i64,
    #[serde(default)]
    status: String,
}

impl TryFrom<BongloyRefund> for Refund {
    type Error = GatewayError;

    fn try_from(br: BongloyRefund) -> GatewayResult<Self> {
        Ok(Self {
            id: required(RefundId::new(br.id), "refund")?,
            charge: br.charge.and_then(ChargeId::new),
            amount: br.amount,
            status: br.status,
        })
    }
}

#[derive(Debug, Deserialize)]
struct BongloyEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    livemode: bool,
    created: Option<i64>,
    data: BongloyEventData,
}

#[derive(Debug, Deserialize)]
struct BongloyEventData {
    object: serde_json::Value,
}

impl From<BongloyEvent> for Event {
    fn from(be: BongloyEvent) -> Self {
        Self {
            id: be.id,
            event_type: EventType::from_str(&be.event_type),
            livemode: be.livemode,
            created_at: be.created.and_then(|ts| Utc.timestamp_opt(ts, 0).single()),
            object: be.data.object,
        }
    }
}
