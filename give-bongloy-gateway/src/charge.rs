//! Charge executor: source dedup and charge creation

use crate::error::DonationResult;
use crate::hooks::GatewayHooks;
use crate::request::DonationRequest;
use give_bongloy_config::{Environment, GatewaySettings};
use give_bongloy_payments::{
    CardGateway, Charge, ChargeRequest, CustomerId, Money, SourceId, TokenId,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Longest statement descriptor the API accepts
pub const STATEMENT_DESCRIPTOR_MAX: usize = 22;

/// `"<site> - <form title>"` without `<>"'`, cut to 22 characters.
pub fn statement_descriptor(site_name: &str, form_title: &str) -> String {
    format!("{} - {}", site_name.trim(), form_title.trim())
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | '"' | '\''))
        .take(STATEMENT_DESCRIPTOR_MAX)
        .collect()
}

pub struct ChargeExecutor {
    settings: Arc<GatewaySettings>,
    cards: Arc<dyn CardGateway>,
    hooks: Arc<dyn GatewayHooks>,
}

impl ChargeExecutor {
    pub fn new(
        settings: Arc<GatewaySettings>,
        cards: Arc<dyn CardGateway>,
        hooks: Arc<dyn GatewayHooks>,
    ) -> Self {
        Self {
            settings,
            cards,
            hooks,
        }
    }

    /// Reuse a source already on the customer for the same instrument,
    /// otherwise attach the token as a new one.
    pub async fn find_or_create_source(
        &self,
        env: Environment,
        customer: &CustomerId,
        token: &TokenId,
    ) -> DonationResult<SourceId> {
        let candidate = self.cards.retrieve_token(env, token).await?;

        if let Some(instrument) = &candidate.instrument {
            let sources = self.cards.list_sources(env, customer).await?;
            if let Some(existing) = sources
                .into_iter()
                .find(|source| source.instrument.same_instrument(instrument))
            {
                debug!(customer = %customer, source = %existing.id, "reusing existing source");
                return Ok(existing.id);
            }
        }

        let source = self.cards.create_source(env, customer, token).await?;
        debug!(customer = %customer, source = %source.id, "attached new source");
        Ok(source.id)
    }

    /// Create the charge. `source = None` charges the customer's default
    /// source. With preapproval on the charge is authorized only.
    pub async fn charge(
        &self,
        env: Environment,
        customer: &CustomerId,
        source: Option<&SourceId>,
        request: &DonationRequest,
    ) -> DonationResult<Charge> {
        let amount = Money::from_decimal(request.amount, request.currency.clone())?;

        let mut charge = ChargeRequest::new(amount, customer.clone())
            .description(request.summary())
            .statement_descriptor(statement_descriptor(
                &self.settings.site_name,
                request.form.title(),
            ))
            .metadata("email", request.donor.email.trim());

        if let Some(source) = source {
            charge = charge.source(source.clone());
        }
        if self.settings.preapprove_only {
            charge = charge.auth_only();
        }
        if !request.purchase_key.is_empty() {
            charge = charge.idempotency_key(request.purchase_key.as_str());
        }

        self.hooks.charge_request(&mut charge, request);

        let result = self.cards.create_charge(env, &charge).await?;
        info!(
            charge = %result.id,
            amount = %charge.amount,
            captured = result.captured,
            "charge created"
        );
        Ok(result)
    }
}
