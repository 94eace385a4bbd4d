//! Integration tests for common gateway workflows.
//!
//! These run the crates together the way a host embeds them: options in,
//! settings built, donations processed, webhooks and refunds reconciled.

use give_bongloy::gateway::testing::{MockCardGateway, RecordingErrorLog, card, refund_event};
use give_bongloy::payments::format_amount;
use give_bongloy::prelude::*;
use give_bongloy::{DonationError, Redirect};
use rust_decimal_macros::dec;
use std::sync::Arc;

// =============================================================================
// Configuration
// =============================================================================

fn options() -> Options {
    let options = Options::new();
    options.set("test_mode", true).unwrap();
    options.set("test_secret_key", "sk_test_123").unwrap();
    options.set("live_secret_key", "sk_live_456").unwrap();
    options.set("currency", "USD").unwrap();
    options.set("sitename", "Helping Hands").unwrap();
    options
}

#[test]
fn test_settings_from_options() {
    let options = options();
    options.set("stripe_preapprove_only", "on").unwrap();
    options.set("stripe_js_fallback", "1").unwrap();

    let settings = GatewaySettings::from_options(&options);

    assert_eq!(settings.environment(), Environment::Test);
    assert_eq!(settings.secret_key(Environment::Test), Some("sk_test_123"));
    assert_eq!(settings.secret_key(Environment::Live), Some("sk_live_456"));
    assert!(settings.preapprove_only);
    assert!(settings.js_fallback);
    assert!(!settings.checkout_enabled);
    assert!(settings.validate(Environment::Live).is_ok());
}

#[test]
fn test_missing_live_key_is_reported() {
    let options = Options::new();
    options.set("test_secret_key", "sk_test_123").unwrap();

    let settings = GatewaySettings::from_options(&options);
    assert!(settings.validate(Environment::Test).is_ok());
    assert!(settings.validate(Environment::Live).is_err());
}

// =============================================================================
// Money
// =============================================================================

#[test]
fn test_minor_units() {
    let jpy = Currency::from_code("JPY").unwrap();
    let usd = Currency::from_code("usd").unwrap();

    assert_eq!(format_amount(dec!(1000), &jpy).unwrap(), 1000);
    assert_eq!(format_amount(dec!(10.00), &usd).unwrap(), 1000);
}

// =============================================================================
// Donations
// =============================================================================

struct Host {
    cards: Arc<MockCardGateway>,
    store: Arc<InMemoryStore>,
    log: Arc<RecordingErrorLog>,
    gateway: DonationGateway,
}

fn host(options: &Options, cards: MockCardGateway) -> Host {
    let cards = Arc::new(cards);
    let store = Arc::new(InMemoryStore::new());
    let log = Arc::new(RecordingErrorLog::new());
    let settings = Arc::new(GatewaySettings::from_options(options));
    let gateway = DonationGateway::new(settings, cards.clone(), store.clone(), store.clone())
        .with_error_log(log.clone());
    Host {
        cards,
        store,
        log,
        gateway,
    }
}

fn donation(token: &str) -> DonationRequest {
    DonationRequest::new(
        dec!(42.50),
        Currency::from_code("USD").unwrap(),
        DonorProfile::new("Donor@Example.org").with_name("Sam", "Giver"),
        PaymentInput::Token(TokenId::new(token).unwrap()),
    )
    .with_form(FormInfo::new(3, "Spring Drive"))
    .with_purchase_key("pk_spring_1")
}

#[tokio::test]
async fn test_donation_then_webhook_refund() {
    // new donor: cus_1, card_2, charge ch_3
    let cards = MockCardGateway::new()
        .with_token("tok_card", card("fp_1", 2031, "1881"))
        .with_event(refund_event("evt_9", "ch_3"));
    let host = host(&options(), cards);

    let done = host.gateway.process_donation(donation("tok_card")).await.unwrap();
    assert_eq!(done.status, PaymentStatus::Published);
    assert_eq!(done.redirect, Redirect::SuccessPage);

    let (_, charge) = host.cards.charges().pop().unwrap();
    assert_eq!(charge.amount.amount, 4250);
    assert_eq!(charge.statement_descriptor.as_deref(), Some("Helping Hands - Spring"));

    let response = host
        .gateway
        .handle_listener(&ListenerRequest::new("give-listener=bongloy", r#"{"id":"evt_9"}"#))
        .await
        .unwrap();
    assert_eq!((response.status, response.body), (200, "1"));

    let record = host.store.get_payment(done.payment_id).await.unwrap().unwrap();
    assert_eq!(record.status, PaymentStatus::Refunded);
}

#[tokio::test]
async fn test_second_donation_reuses_customer_and_card() {
    let cards = MockCardGateway::new().with_token("tok_card", card("fp_1", 2031, "1881"));
    let host = host(&options(), cards);

    host.gateway.process_donation(donation("tok_card")).await.unwrap();
    host.gateway.process_donation(donation("tok_card")).await.unwrap();

    assert_eq!(host.cards.method_call_count("create_customer"), 1);
    assert_eq!(host.cards.method_call_count("create_source"), 1);
    assert_eq!(host.cards.method_call_count("create_charge"), 2);
    assert_eq!(host.store.payment_count(), 2);
}

#[tokio::test]
async fn test_failed_refund_is_reported_to_operator() {
    let cards = MockCardGateway::new()
        .with_token("tok_card", card("fp_1", 2031, "1881"))
        .fail_on("create_refund", "charge already refunded");
    let host = host(&options(), cards);

    let done = host.gateway.process_donation(donation("tok_card")).await.unwrap();
    host.store
        .update_payment_status(done.payment_id, PaymentStatus::Refunded)
        .await
        .unwrap();

    let err = host
        .gateway
        .admin_refund(&StatusChange {
            payment_id: done.payment_id,
            old_status: PaymentStatus::Published,
            new_status: PaymentStatus::Refunded,
            refund_in_gateway: true,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, DonationError::Gateway(_)));
    assert_eq!(host.log.entries().pop().unwrap().0, "Bongloy Refund Error");

    // the operator's status change stands
    let record = host.store.get_payment(done.payment_id).await.unwrap().unwrap();
    assert_eq!(record.status, PaymentStatus::Refunded);
}

// =============================================================================
// Logging
// =============================================================================

#[test]
fn test_subscriber_can_be_scoped() {
    tracing::subscriber::with_default(give_bongloy::subscriber(), || {
        tracing::info!(target: "give_bongloy_gateway", "scoped subscriber");
    });
}
