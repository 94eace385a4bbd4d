//! Remote API traits and the shared HTTP client

use crate::{
    error::{GatewayError, GatewayResult},
    types::*,
    webhook::Event,
};
use async_trait::async_trait;
use give_bongloy_config::Environment;
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Card-processing API.
///
/// Every call names the environment whose keys it must use; the provider
/// never decides that on its own.
#[async_trait]
pub trait CardGateway: Send + Sync {
    /// Get provider name
    fn name(&self) -> &'static str;

    /// Tokenize raw card fields server side
    async fn create_token(&self, env: Environment, card: &CardDetails) -> GatewayResult<Token>;

    /// Look up a token to learn which instrument it stands for
    async fn retrieve_token(&self, env: Environment, token: &TokenId) -> GatewayResult<Token>;

    /// Get a customer. Deleted customers come back with `deleted = true`.
    async fn retrieve_customer(&self, env: Environment, id: &CustomerId)
        -> GatewayResult<Customer>;

    /// Create a customer
    async fn create_customer(
        &self,
        env: Environment,
        request: &CreateCustomerRequest,
    ) -> GatewayResult<Customer>;

    /// List sources attached to a customer
    async fn list_sources(&self, env: Environment, customer: &CustomerId)
        -> GatewayResult<Vec<Source>>;

    /// Attach a token to a customer as a reusable source
    async fn create_source(
        &self,
        env: Environment,
        customer: &CustomerId,
        token: &TokenId,
    ) -> GatewayResult<Source>;

    /// Create a charge
    async fn create_charge(&self, env: Environment, request: &ChargeRequest)
        -> GatewayResult<Charge>;

    /// Get an event by id
    async fn retrieve_event(&self, env: Environment, id: &str) -> GatewayResult<Event>;

    /// Refund a charge
    async fn create_refund(&self, env: Environment, request: &RefundRequest)
        -> GatewayResult<Refund>;
}

/// Bank-account authorization API.
#[async_trait]
pub trait BankAuth: Send + Sync {
    /// Trade a bank-link public token and account id for a single-use bank
    /// account token the card API accepts.
    async fn exchange_bank_token(
        &self,
        env: Environment,
        public_token: &str,
        account_id: &str,
    ) -> GatewayResult<TokenId>;
}

/// Common HTTP client for providers
#[derive(Debug, Clone)]
pub struct ProviderClient {
    client: reqwest::Client,
    base_url: String,
    provider: &'static str,
}

impl ProviderClient {
    /// Create a new provider client
    pub fn new(provider: &'static str, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            provider,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET request
    pub async fn get(&self, path: &str, secret: &str) -> GatewayResult<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        Ok(self.client.get(&url).bearer_auth(secret).send().await?)
    }

    /// POST request with form body
    pub async fn post_form<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        secret: &str,
        body: &T,
        idempotency_key: Option<&str>,
    ) -> GatewayResult<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.post(&url).bearer_auth(secret).form(body);
        if let Some(key) = idempotency_key {
            request = request.header("Idempotency-Key", key);
        }
        Ok(request.send().await?)
    }

    /// POST request with JSON body
    pub async fn post_json<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> GatewayResult<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        Ok(self.client.post(&url).json(body).send().await?)
    }

    /// Decode a success body, or turn an error body into [`GatewayError`].
    pub async fn decode<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
        what: &str,
    ) -> GatewayResult<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound(what.to_string()));
        }

        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorBody>(&body)
            .map(ErrorBody::into_parts)
            .unwrap_or_default();

        Err(GatewayError::Api {
            provider: self.provider,
            status: status.as_u16(),
            message: detail.0,
            code: detail.1,
        })
    }
}

/// Error envelopes: `{"error": {"message", "code"}}` for the card API,
/// flat `{"error_message", "error_code"}` for the bank-link API.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Nested { error: NestedError },
    Flat {
        error_message: Option<String>,
        error_code: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct NestedError {
    message: Option<String>,
    code: Option<String>,
}

impl ErrorBody {
    fn into_parts(self) -> (Option<String>, Option<String>) {
        match self {
            Self::Nested { error } => (error.message, error.code),
            Self::Flat {
                error_message,
                error_code,
            } => (error_message, error_code),
        }
    }
}
