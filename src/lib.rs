// Give Bongloy - card and bank payments for Give donation forms
//
// This library re-exports the gateway crates under one roof and sets up
// logging for hosts that do not bring their own subscriber.

pub use give_bongloy_config as config;
pub use give_bongloy_gateway as gateway;
pub use give_bongloy_payments as payments;

pub use give_bongloy_config::{Environment, GatewaySettings, OptionStore, Options};
pub use give_bongloy_gateway::{
    Completed, DonationError, DonationGateway, DonationOutcome, DonationRequest, DonorProfile,
    FormInfo, GatewayId, ListenerRequest, ListenerResponse, PaymentInput, PaymentStatus, Redirect,
    Rejected, StatusChange,
};
pub use give_bongloy_payments::{CardGateway, Currency, GatewayError, Money};

/// Environment variable holding the log filter
pub const LOG_LEVEL_ENV: &str = "GIVE_BONGLOY_LOG_LEVEL";

const DEFAULT_LOG_LEVEL: &str = "info";

/// Build the subscriber used by [`init_logging`].
///
/// The filter comes from `GIVE_BONGLOY_LOG_LEVEL` (any `EnvFilter`
/// directive, e.g. `give_bongloy_gateway=debug`), falling back to `info`.
pub fn subscriber() -> impl tracing::Subscriber + Send + Sync {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_env(LOG_LEVEL_ENV)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
}

/// Install the global subscriber. Returns `false` if one was already set.
pub fn init_logging() -> bool {
    tracing::subscriber::set_global_default(subscriber()).is_ok()
}

/// Common imports for hosts embedding the gateway.
pub mod prelude {
    pub use give_bongloy_config::{Environment, GatewaySettings, OptionStore, Options};
    pub use give_bongloy_gateway::{
        CustomerMappingStore, DonationGateway, DonationRequest, DonorProfile, FormInfo,
        GatewayErrorLog, GatewayHooks, GatewayId, InMemoryStore, ListenerRequest, Notifier,
        PaymentInput, PaymentStatus, PaymentStore, Redirect, StatusChange,
    };
    pub use give_bongloy_payments::{CardGateway, Currency, TokenId};
}
