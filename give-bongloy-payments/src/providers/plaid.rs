//! Plaid bank-link client
//!
//! Turns a Plaid Link `public_token` and account id into a single-use bank
//! account token for the card API, in two calls:
//! `/item/public_token/exchange` then
//! `/processor/stripe/bank_account_token/create`.

use crate::{
    error::{GatewayError, GatewayResult},
    provider::{BankAuth, ProviderClient},
    types::TokenId,
};
use async_trait::async_trait;
use give_bongloy_config::{Environment, GatewaySettings, PlaidCredentials};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

pub const PLAID_SANDBOX_BASE: &str = "https://sandbox.plaid.com";
pub const PLAID_PRODUCTION_BASE: &str = "https://production.plaid.com";

/// Plaid client
pub struct PlaidClient {
    settings: Arc<GatewaySettings>,
    sandbox: ProviderClient,
    production: ProviderClient,
}

impl PlaidClient {
    pub fn new(settings: Arc<GatewaySettings>) -> Self {
        Self::with_base_urls(settings, PLAID_SANDBOX_BASE, PLAID_PRODUCTION_BASE)
    }

    pub fn with_base_urls(
        settings: Arc<GatewaySettings>,
        sandbox: impl Into<String>,
        production: impl Into<String>,
    ) -> Self {
        Self {
            settings,
            sandbox: ProviderClient::new("plaid", sandbox),
            production: ProviderClient::new("plaid", production),
        }
    }

    fn client(&self, env: Environment) -> &ProviderClient {
        match env {
            Environment::Test => &self.sandbox,
            Environment::Live => &self.production,
        }
    }

    fn credentials(&self) -> GatewayResult<&PlaidCredentials> {
        self.settings
            .plaid
            .as_ref()
            .ok_or_else(|| GatewayError::Config("Plaid credentials are not set".to_string()))
    }
}

#[derive(Serialize)]
struct ExchangeRequest<'a> {
    client_id: &'a str,
    secret: &'a str,
    public_token: &'a str,
}

#[derive(Deserialize)]
struct ExchangeResponse {
    access_token: String,
}

#[derive(Serialize)]
struct BankAccountTokenRequest<'a> {
    client_id: &'a str,
    secret: &'a str,
    access_token: &'a str,
    account_id: &'a str,
}

#[derive(Deserialize)]
struct BankAccountTokenResponse {
    stripe_bank_account_token: String,
}

#[async_trait]
impl BankAuth for PlaidClient {
    async fn exchange_bank_token(
        &self,
        env: Environment,
        public_token: &str,
        account_id: &str,
    ) -> GatewayResult<TokenId> {
        let credentials = self.credentials()?;
        let client = self.client(env);
        let secret = credentials.secret.expose_secret();

        debug!(env = %env, "exchanging plaid public token");
        let response = client
            .post_json(
                "/item/public_token/exchange",
                &ExchangeRequest {
                    client_id: &credentials.client_id,
                    secret,
                    public_token,
                },
            )
            .await?;
        let exchange: ExchangeResponse = client.decode(response, "public token").await?;

        let response = client
            .post_json(
                "/processor/stripe/bank_account_token/create",
                &BankAccountTokenRequest {
                    client_id: &credentials.client_id,
                    secret,
                    access_token: &exchange.access_token,
                    account_id,
                },
            )
            .await?;
        let token: BankAccountTokenResponse = client.decode(response, "bank account").await?;

        TokenId::new(token.stripe_bank_account_token).ok_or_else(|| {
            GatewayError::Serialization("Plaid returned an empty bank account token".to_string())
        })
    }
}
