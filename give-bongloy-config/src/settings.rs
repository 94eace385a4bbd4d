//! Typed gateway settings.

use crate::{ConfigError, OptionStore, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;

/// API environment. Keys, customer mappings and Plaid hosts are all scoped by
/// it, so it is passed explicitly into every gateway call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Test,
    Live,
}

impl Environment {
    pub fn from_test_mode(test_mode: bool) -> Self {
        if test_mode { Self::Test } else { Self::Live }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Test => "test",
            Self::Live => "live",
        }
    }

    pub fn is_test(&self) -> bool {
        matches!(self, Self::Test)
    }

    /// Meta key under which remote customer ids are stored for a donor.
    pub fn customer_key(&self) -> &'static str {
        match self {
            Self::Test => "_give_stripe_customer_id_test",
            Self::Live => "_give_stripe_customer_id",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Secret and publishable keys for both environments.
#[derive(Debug, Default)]
pub struct ApiKeys {
    test_secret: Option<SecretString>,
    live_secret: Option<SecretString>,
    test_publishable: Option<String>,
    live_publishable: Option<String>,
}

impl ApiKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(mut self, env: Environment, key: impl Into<String>) -> Self {
        let key = non_empty(key.into()).map(SecretString::from);
        match env {
            Environment::Test => self.test_secret = key,
            Environment::Live => self.live_secret = key,
        }
        self
    }

    pub fn with_publishable(mut self, env: Environment, key: impl Into<String>) -> Self {
        let key = non_empty(key.into());
        match env {
            Environment::Test => self.test_publishable = key,
            Environment::Live => self.live_publishable = key,
        }
        self
    }

    /// Trimmed secret key, `None` when unset or blank.
    pub fn secret_key(&self, env: Environment) -> Option<&SecretString> {
        match env {
            Environment::Test => self.test_secret.as_ref(),
            Environment::Live => self.live_secret.as_ref(),
        }
    }

    pub fn publishable_key(&self, env: Environment) -> Option<&str> {
        match env {
            Environment::Test => self.test_publishable.as_deref(),
            Environment::Live => self.live_publishable.as_deref(),
        }
    }
}

/// Plaid Link credentials used for bank-transfer donations.
#[derive(Debug)]
pub struct PlaidCredentials {
    pub client_id: String,
    pub public_key: String,
    pub secret: SecretString,
}

/// Everything the gateway reads from the host's option table.
#[derive(Debug)]
pub struct GatewaySettings {
    pub keys: ApiKeys,
    pub test_mode: bool,
    pub currency: String,
    pub site_name: String,
    /// Authorize only; donations land in `preapproval`.
    pub preapprove_only: bool,
    /// Tokenize raw card fields server side when no client token arrives.
    pub js_fallback: bool,
    /// Hosted checkout modal collects the card.
    pub checkout_enabled: bool,
    pub collect_billing: bool,
    pub checkout_name: Option<String>,
    pub plaid: Option<PlaidCredentials>,
}

impl GatewaySettings {
    pub fn new(site_name: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            keys: ApiKeys::new(),
            test_mode: false,
            currency: currency.into(),
            site_name: site_name.into(),
            preapprove_only: false,
            js_fallback: false,
            checkout_enabled: false,
            collect_billing: false,
            checkout_name: None,
            plaid: None,
        }
    }

    /// Read settings from the host's option table.
    pub fn from_options(store: &dyn OptionStore) -> Self {
        let opt = |key: &str| store.get_option(key).and_then(non_empty);
        let checked = |key: &str| opt(key).is_some_and(|v| v == "on" || v == "1" || v == "true");

        let mut keys = ApiKeys::new();
        for env in [Environment::Test, Environment::Live] {
            if let Some(secret) = opt(&format!("{}_secret_key", env.as_str())) {
                keys = keys.with_secret(env, secret);
            }
            if let Some(publishable) = opt(&format!("{}_publishable_key", env.as_str())) {
                keys = keys.with_publishable(env, publishable);
            }
        }

        let plaid = match (
            opt("plaid_client_id"),
            opt("plaid_public_key"),
            opt("plaid_secret_key"),
        ) {
            (Some(client_id), Some(public_key), Some(secret)) => Some(PlaidCredentials {
                client_id,
                public_key,
                secret: SecretString::from(secret),
            }),
            _ => None,
        };

        Self {
            keys,
            test_mode: checked("test_mode"),
            currency: opt("currency").unwrap_or_else(|| "USD".to_string()),
            site_name: opt("sitename").unwrap_or_default(),
            preapprove_only: opt("stripe_preapprove_only").is_some_and(|v| v == "on"),
            // any non-empty value enables the fallback
            js_fallback: opt("stripe_js_fallback").is_some(),
            checkout_enabled: opt("stripe_checkout_enabled").is_some_and(|v| v == "on"),
            collect_billing: checked("stripe_collect_billing"),
            checkout_name: opt("stripe_checkout_name"),
            plaid,
        }
    }

    pub fn environment(&self) -> Environment {
        Environment::from_test_mode(self.test_mode)
    }

    pub fn secret_key(&self, env: Environment) -> Option<&str> {
        self.keys.secret_key(env).map(|s| s.expose_secret())
    }

    /// Report every missing setting required to talk to the API in `env`.
    pub fn validate(&self, env: Environment) -> Result<()> {
        let mut problems = Vec::new();

        if self.keys.secret_key(env).is_none() {
            problems.push(format!("{}_secret_key is not set", env.as_str()));
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_alphabetic()) {
            problems.push(format!("currency '{}' is not an ISO 4217 code", self.currency));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }

    pub fn with_keys(mut self, keys: ApiKeys) -> Self {
        self.keys = keys;
        self
    }

    pub fn with_test_mode(mut self, test_mode: bool) -> Self {
        self.test_mode = test_mode;
        self
    }

    pub fn with_preapproval(mut self, enabled: bool) -> Self {
        self.preapprove_only = enabled;
        self
    }

    pub fn with_js_fallback(mut self, enabled: bool) -> Self {
        self.js_fallback = enabled;
        self
    }

    pub fn with_checkout(mut self, enabled: bool) -> Self {
        self.checkout_enabled = enabled;
        self
    }

    pub fn with_plaid(mut self, plaid: PlaidCredentials) -> Self {
        self.plaid = Some(plaid);
        self
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
