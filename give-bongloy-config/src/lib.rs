//! Gateway configuration for the Give Bongloy gateway.
//!
//! The host CMS exposes its settings as a flat key/value option table. This
//! crate models that table ([`OptionStore`]), an in-process implementation
//! that can be filled from environment variables, `.env` files and TOML/JSON
//! files ([`Options`]), and the typed view the gateway works with
//! ([`GatewaySettings`]).
//!
//! ```rust,no_run
//! use give_bongloy_config::{GatewaySettings, Options};
//!
//! let options = Options::new();
//! options.load_dotenv(None)?;
//! let settings = GatewaySettings::from_options(&options);
//! settings.validate(settings.environment())?;
//! # Ok::<(), give_bongloy_config::ConfigError>(())
//! ```

pub mod env;
pub mod error;
pub mod loader;
pub mod settings;

pub use env::{ENV_PREFIX, EnvLoader};
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use settings::{ApiKeys, Environment, GatewaySettings, PlaidCredentials};

use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Read access to the host's option table.
pub trait OptionStore: Send + Sync {
    /// Raw option value, `None` when unset.
    fn get_option(&self, key: &str) -> Option<String>;
}

/// In-process option table
#[derive(Clone, Default)]
pub struct Options {
    values: Arc<RwLock<HashMap<String, serde_json::Value>>>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `GIVE_BONGLOY_*` environment variables
    pub fn load_env(&self) -> Result<()> {
        let vars = EnvLoader::gateway().load()?;
        debug!(count = vars.len(), prefix = ENV_PREFIX, "loaded options from environment");

        let mut values = self.values.write().map_err(|_| ConfigError::LockPoisoned)?;
        for (key, value) in vars {
            values.insert(key, serde_json::Value::String(value));
        }

        Ok(())
    }

    /// Load a `.env` file into the process environment, then pick up the
    /// gateway variables. A missing default `.env` is not an error.
    pub fn load_dotenv(&self, path: Option<&str>) -> Result<()> {
        match path {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| ConfigError::LoadError(e.to_string()))?;
            }
            None => {
                if let Err(e) = dotenvy::dotenv() {
                    debug!(error = %e, "no .env file loaded");
                }
            }
        }
        self.load_env()
    }

    /// Merge the top-level table of a JSON/TOML/env file
    pub fn load_file(&self, path: &str, format: FileFormat) -> Result<()> {
        let data = ConfigLoader::new(format).load_file(path)?;
        debug!(path, ?format, "loaded options file");
        self.merge_value(data)
    }

    fn merge_value(&self, data: serde_json::Value) -> Result<()> {
        let serde_json::Value::Object(map) = data else {
            return Err(ConfigError::ParseError(
                "option file must contain a table".to_string(),
            ));
        };

        let mut values = self.values.write().map_err(|_| ConfigError::LockPoisoned)?;
        for (key, value) in map {
            values.insert(key, value);
        }

        Ok(())
    }

    pub fn set<T: serde::Serialize>(&self, key: &str, value: T) -> Result<()> {
        let json_value = serde_json::to_value(value)
            .map_err(|e| ConfigError::SerializationError(e.to_string()))?;

        let mut values = self.values.write().map_err(|_| ConfigError::LockPoisoned)?;
        values.insert(key.to_string(), json_value);

        Ok(())
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let values = self.values.read().map_err(|_| ConfigError::LockPoisoned)?;

        let value = values
            .get(key)
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))?;

        serde_json::from_value(value.clone())
            .map_err(|e| ConfigError::DeserializationError(e.to_string()))
    }

    pub fn has(&self, key: &str) -> bool {
        self.values
            .read()
            .map(|values| values.contains_key(key))
            .unwrap_or(false)
    }
}

impl OptionStore for Options {
    /// Options are flattened the way a CMS stores them: checkboxes that are
    /// ticked read as `"on"`, unticked ones as unset.
    fn get_option(&self, key: &str) -> Option<String> {
        let values = self.values.read().ok()?;
        match values.get(key)? {
            serde_json::Value::Null | serde_json::Value::Bool(false) => None,
            serde_json::Value::Bool(true) => Some("on".to_string()),
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

impl OptionStore for HashMap<String, String> {
    fn get_option(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}
