//! Token resolution

use crate::error::{DonationError, DonationResult};
use crate::request::{DonationRequest, GatewayId, PaymentInput};
use give_bongloy_config::{Environment, GatewaySettings};
use give_bongloy_payments::{BankAuth, CardGateway, GatewayError, TokenId};
use std::sync::Arc;
use tracing::debug;

/// What the charge will be made against
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenResolution {
    Token(TokenId),
    /// Hosted checkout collected the card; charge the customer's default source
    Deferred,
}

/// Turns submitted payment input into a single-use token
pub struct TokenResolver {
    settings: Arc<GatewaySettings>,
    cards: Arc<dyn CardGateway>,
    bank: Option<Arc<dyn BankAuth>>,
}

impl TokenResolver {
    pub fn new(
        settings: Arc<GatewaySettings>,
        cards: Arc<dyn CardGateway>,
        bank: Option<Arc<dyn BankAuth>>,
    ) -> Self {
        Self {
            settings,
            cards,
            bank,
        }
    }

    pub async fn resolve(
        &self,
        env: Environment,
        request: &DonationRequest,
    ) -> DonationResult<TokenResolution> {
        match request.gateway {
            GatewayId::Card => self.resolve_card(env, request).await,
            GatewayId::BankTransfer => self.resolve_bank(env, request).await,
        }
    }

    async fn resolve_card(
        &self,
        env: Environment,
        request: &DonationRequest,
    ) -> DonationResult<TokenResolution> {
        match &request.payment {
            PaymentInput::Token(token) => Ok(TokenResolution::Token(token.clone())),
            PaymentInput::Card(fields) if self.settings.js_fallback => {
                fields.validate().map_err(DonationError::Validation)?;

                debug!(env = %env, "tokenizing card server side");
                let details = fields.to_card_details(request.donor.address.clone());
                let token = self.cards.create_token(env, &details).await?;
                Ok(TokenResolution::Token(token.id))
            }
            _ if self.settings.checkout_enabled => Ok(TokenResolution::Deferred),
            _ => Err(DonationError::MissingToken),
        }
    }

    async fn resolve_bank(
        &self,
        env: Environment,
        request: &DonationRequest,
    ) -> DonationResult<TokenResolution> {
        let PaymentInput::BankAccount {
            public_token,
            account_id,
        } = &request.payment
        else {
            return Err(DonationError::MissingToken);
        };

        if public_token.trim().is_empty() || account_id.trim().is_empty() {
            return Err(DonationError::MissingToken);
        }

        let bank = self.bank.as_ref().ok_or_else(|| {
            GatewayError::Config("bank transfers need Plaid credentials".to_string())
        })?;

        let token = bank
            .exchange_bank_token(env, public_token.trim(), account_id.trim())
            .await?;
        Ok(TokenResolution::Token(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{DonorProfile, RawCardFields};
    use crate::testing::{MockBankAuth, MockCardGateway};
    use give_bongloy_payments::Currency;
    use rust_decimal_macros::dec;

    fn request(payment: PaymentInput) -> DonationRequest {
        DonationRequest::new(
            dec!(20),
            Currency::from_code("USD").unwrap(),
            DonorProfile::new("donor@example.org"),
            payment,
        )
    }

    fn resolver(settings: GatewaySettings, cards: Arc<MockCardGateway>) -> TokenResolver {
        TokenResolver::new(Arc::new(settings), cards, None)
    }

    fn settings() -> GatewaySettings {
        GatewaySettings::new("Charity", "USD")
    }

    fn fields() -> RawCardFields {
        RawCardFields {
            card_name: "Jane Donor".into(),
            card_number: "4242 4242 4242 4242".into(),
            card_cvc: "123".into(),
            card_exp_month: "12".into(),
            card_exp_year: "2030".into(),
        }
    }

    #[tokio::test]
    async fn test_client_token_is_used_unchanged() {
        let cards = Arc::new(MockCardGateway::new());
        let token = TokenId::new("tok_client").unwrap();

        let resolution = resolver(settings().with_js_fallback(true), cards.clone())
            .resolve(Environment::Test, &request(PaymentInput::Token(token.clone())))
            .await
            .unwrap();

        assert_eq!(resolution, TokenResolution::Token(token));
        assert!(cards.get_calls().is_empty());
    }

    #[tokio::test]
    async fn test_fallback_tokenizes_card_fields() {
        let cards = Arc::new(MockCardGateway::new());

        let resolution = resolver(settings().with_js_fallback(true), cards.clone())
            .resolve(Environment::Test, &request(PaymentInput::Card(fields())))
            .await
            .unwrap();

        assert!(matches!(resolution, TokenResolution::Token(_)));
        assert_eq!(cards.method_call_count("create_token"), 1);
    }

    #[tokio::test]
    async fn test_fallback_reports_every_blank_field() {
        let cards = Arc::new(MockCardGateway::new());
        let blank = RawCardFields {
            card_name: "  ".into(),
            ..Default::default()
        };

        let err = resolver(settings().with_js_fallback(true), cards.clone())
            .resolve(Environment::Test, &request(PaymentInput::Card(blank)))
            .await
            .unwrap_err();

        let DonationError::Validation(errors) = &err else {
            panic!("expected validation errors, got {err:?}");
        };
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            ["card_name", "card_number", "card_cvc", "card_exp_month", "card_exp_year"]
        );
        assert!(!cards.was_called("create_token"));
    }

    #[tokio::test]
    async fn test_hosted_checkout_defers() {
        let cards = Arc::new(MockCardGateway::new());
        let resolution = resolver(settings().with_checkout(true), cards)
            .resolve(Environment::Test, &request(PaymentInput::Absent))
            .await
            .unwrap();
        assert_eq!(resolution, TokenResolution::Deferred);
    }

    #[tokio::test]
    async fn test_missing_token() {
        let cards = Arc::new(MockCardGateway::new());

        // card fields without the fallback switched on are not enough
        let err = resolver(settings(), cards.clone())
            .resolve(Environment::Test, &request(PaymentInput::Card(fields())))
            .await
            .unwrap_err();

        assert!(matches!(err, DonationError::MissingToken));
        assert!(cards.get_calls().is_empty());
    }

    #[tokio::test]
    async fn test_bank_account_exchange() {
        let bank = Arc::new(MockBankAuth::new());
        let resolver = TokenResolver::new(
            Arc::new(settings()),
            Arc::new(MockCardGateway::new()),
            Some(bank.clone()),
        );
        let request = request(PaymentInput::BankAccount {
            public_token: "public-sandbox-1".into(),
            account_id: "acc_9".into(),
        })
        .with_gateway(GatewayId::BankTransfer);

        let resolution = resolver.resolve(Environment::Live, &request).await.unwrap();

        assert_eq!(
            resolution,
            TokenResolution::Token(TokenId::new("btok_acc_9").unwrap())
        );
        assert_eq!(
            bank.exchanges(),
            [(Environment::Live, "public-sandbox-1".to_string(), "acc_9".to_string())]
        );
    }

    #[tokio::test]
    async fn test_bank_transfer_needs_account() {
        let resolver = TokenResolver::new(
            Arc::new(settings()),
            Arc::new(MockCardGateway::new()),
            Some(Arc::new(MockBankAuth::new())),
        );
        let request = request(PaymentInput::BankAccount {
            public_token: "public-sandbox-1".into(),
            account_id: " ".into(),
        })
        .with_gateway(GatewayId::BankTransfer);

        let err = resolver.resolve(Environment::Test, &request).await.unwrap_err();
        assert!(matches!(err, DonationError::MissingToken));
    }

    #[tokio::test]
    async fn test_bank_transfer_without_plaid() {
        let request = request(PaymentInput::BankAccount {
            public_token: "public-sandbox-1".into(),
            account_id: "acc_9".into(),
        })
        .with_gateway(GatewayId::BankTransfer);

        let err = resolver(settings(), Arc::new(MockCardGateway::new()))
            .resolve(Environment::Test, &request)
            .await
            .unwrap_err();

        assert!(matches!(err, DonationError::Gateway(GatewayError::Config(_))));
    }
}
