//! Integration tests for give-bongloy-payments against a mocked API

use give_bongloy_config::{ApiKeys, Environment, GatewaySettings, PlaidCredentials};
use give_bongloy_payments::*;
use rust_decimal_macros::dec;
use secrecy::SecretString;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings() -> Arc<GatewaySettings> {
    let keys = ApiKeys::new()
        .with_secret(Environment::Test, "sk_test_abc")
        .with_secret(Environment::Live, "sk_live_xyz");
    Arc::new(
        GatewaySettings::new("Helping Hands", "USD")
            .with_keys(keys)
            .with_test_mode(true)
            .with_plaid(PlaidCredentials {
                client_id: "plaid_client".into(),
                public_key: "plaid_public".into(),
                secret: SecretString::from("plaid_secret".to_string()),
            }),
    )
}

fn usd() -> Currency {
    Currency::from_code("USD").unwrap()
}

#[tokio::test]
async fn test_environment_selects_secret_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/customers/cus_live"))
        .and(header("authorization", "Bearer sk_live_xyz"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cus_live",
            "email": "donor@example.org"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = BongloyProvider::with_base_url(settings(), server.uri());
    let customer = provider
        .retrieve_customer(Environment::Live, &CustomerId::new("cus_live").unwrap())
        .await
        .unwrap();

    assert_eq!(customer.id.as_str(), "cus_live");
    assert!(!customer.deleted);
}

#[tokio::test]
async fn test_missing_secret_key_never_calls_out() {
    let server = MockServer::start().await;
    let settings = Arc::new(GatewaySettings::new("Site", "USD"));
    let provider = BongloyProvider::with_base_url(settings, server.uri());

    let result = provider.retrieve_event(Environment::Test, "evt_1").await;
    assert!(matches!(result, Err(GatewayError::Config(_))));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_charge_sends_form_params() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/charges"))
        .and(body_string_contains("amount=2500"))
        .and(body_string_contains("currency=usd"))
        .and(body_string_contains("customer=cus_1"))
        .and(body_string_contains("capture=false"))
        .and(header("idempotency-key", "purchase-key-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "ch_1",
            "amount": 2500,
            "currency": "usd",
            "customer": "cus_1",
            "status": "succeeded",
            "captured": false,
            "paid": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = BongloyProvider::with_base_url(settings(), server.uri());
    let request = ChargeRequest::new(
        Money::from_decimal(dec!(25), usd()).unwrap(),
        CustomerId::new("cus_1").unwrap(),
    )
    .auth_only()
    .idempotency_key("purchase-key-1");

    let charge = provider.create_charge(Environment::Test, &request).await.unwrap();
    assert_eq!(charge.id.as_str(), "ch_1");
    assert_eq!(charge.currency, "USD");
    assert!(!charge.captured);
}

#[tokio::test]
async fn test_api_error_body_is_mapped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/charges"))
        .respond_with(ResponseTemplate::new(402).set_body_json(json!({
            "error": {
                "type": "card_error",
                "code": "card_declined",
                "message": "Your card was declined."
            }
        })))
        .mount(&server)
        .await;

    let provider = BongloyProvider::with_base_url(settings(), server.uri());
    let request = ChargeRequest::new(Money::new(1000, usd()), CustomerId::new("cus_1").unwrap());

    let err = provider
        .create_charge(Environment::Test, &request)
        .await
        .unwrap_err();
    match err {
        GatewayError::Api { status, .. } => assert_eq!(status, 402),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_not_found_maps_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/events/evt_missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"message": "No such event"}
        })))
        .mount(&server)
        .await;

    let provider = BongloyProvider::with_base_url(settings(), server.uri());
    let err = provider
        .retrieve_event(Environment::Test, "evt_missing")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_list_sources() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/customers/cus_1/sources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [
                {"id": "card_1", "object": "card", "fingerprint": "fp_1", "last4": "4242", "exp_year": 2030, "brand": "Visa"},
                {"id": "card_2", "object": "card", "fingerprint": "fp_2", "last4": "0005", "exp_year": 2031, "brand": "Amex"}
            ]
        })))
        .mount(&server)
        .await;

    let provider = BongloyProvider::with_base_url(settings(), server.uri());
    let sources = provider
        .list_sources(Environment::Test, &CustomerId::new("cus_1").unwrap())
        .await
        .unwrap();

    assert_eq!(sources.len(), 2);
    assert_eq!(sources[1].instrument.last4.as_deref(), Some("0005"));
}

#[tokio::test]
async fn test_plaid_exchange_two_steps() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/item/public_token/exchange"))
        .and(body_json(json!({
            "client_id": "plaid_client",
            "secret": "plaid_secret",
            "public_token": "public-sandbox-1"
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"access_token": "access-sandbox-1"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/processor/stripe/bank_account_token/create"))
        .and(body_string_contains("access-sandbox-1"))
        .and(body_string_contains("acc_1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"stripe_bank_account_token": "btok_1", "request_id": "r1"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let plaid = PlaidClient::with_base_urls(settings(), server.uri(), "http://127.0.0.1:9");
    let token = plaid
        .exchange_bank_token(Environment::Test, "public-sandbox-1", "acc_1")
        .await
        .unwrap();
    assert_eq!(token.as_str(), "btok_1");
}

#[tokio::test]
async fn test_plaid_error_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/item/public_token/exchange"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error_type": "INVALID_INPUT",
            "error_code": "INVALID_PUBLIC_TOKEN",
            "error_message": "provided public token is in an invalid format"
        })))
        .mount(&server)
        .await;

    let plaid = PlaidClient::with_base_urls(settings(), server.uri(), server.uri());
    let err = plaid
        .exchange_bank_token(Environment::Test, "bad", "acc_1")
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some("INVALID_PUBLIC_TOKEN"));
}
