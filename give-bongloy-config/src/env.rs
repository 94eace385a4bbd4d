// Environment variable loading

use crate::{ConfigError, Result};
use std::collections::HashMap;
use std::env;

/// Prefix used for gateway options supplied through the process environment.
pub const ENV_PREFIX: &str = "GIVE_BONGLOY";

/// Loads gateway options from environment variables.
///
/// `GIVE_BONGLOY_TEST_SECRET_KEY=sk_test_x` becomes the option
/// `test_secret_key`.
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Loader scoped to [`ENV_PREFIX`].
    pub fn gateway() -> Self {
        Self::new(Some(ENV_PREFIX.to_string()))
    }

    /// Load every matching variable as an option key/value pair
    pub fn load(&self) -> Result<HashMap<String, String>> {
        Ok(self.collect(env::vars()))
    }

    fn collect(&self, vars: impl Iterator<Item = (String, String)>) -> HashMap<String, String> {
        let mut options = HashMap::new();

        for (key, value) in vars {
            match self.prefix {
                Some(ref prefix) => {
                    if let Some(rest) = key.strip_prefix(prefix.as_str()) {
                        let Some(option) = rest.strip_prefix('_') else {
                            continue;
                        };
                        options.insert(option.to_lowercase(), value);
                    }
                }
                None => {
                    options.insert(key.to_lowercase(), value);
                }
            }
        }

        options
    }

    /// Load a single option
    pub fn load_var(&self, key: &str) -> Result<String> {
        let full_key = match self.prefix {
            Some(ref prefix) => format!("{}_{}", prefix, key.to_uppercase()),
            None => key.to_uppercase(),
        };

        env::var(&full_key).map_err(ConfigError::EnvError)
    }

    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::gateway()
    }
}
