//! Integration tests for give-bongloy-config

use give_bongloy_config::*;
use std::fs;

fn write_temp(name: &str, content: &str) -> String {
    let path = std::env::temp_dir().join(format!("{}-{}", std::process::id(), name));
    fs::write(&path, content).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn test_settings_from_toml_file() {
    let path = write_temp(
        "gateway.toml",
        r#"
        test_mode = true
        test_secret_key = "sk_test_file"
        currency = "EUR"
        sitename = "Friends of the Library"
        stripe_preapprove_only = true
        stripe_checkout_enabled = "on"
        "#,
    );

    let options = Options::new();
    options.load_file(&path, FileFormat::Toml).unwrap();
    let settings = GatewaySettings::from_options(&options);

    assert_eq!(settings.environment(), Environment::Test);
    assert_eq!(settings.secret_key(Environment::Test), Some("sk_test_file"));
    assert_eq!(settings.site_name, "Friends of the Library");
    assert!(settings.preapprove_only);
    assert!(settings.checkout_enabled);
    assert!(settings.validate(Environment::Test).is_ok());

    fs::remove_file(path).ok();
}

#[test]
fn test_settings_from_json_file() {
    let path = write_temp(
        "gateway.json",
        r#"{"live_secret_key": "sk_live_json", "currency": "KRW", "stripe_js_fallback": "on"}"#,
    );

    let options = Options::new();
    options.load_file(&path, FileFormat::Json).unwrap();
    let settings = GatewaySettings::from_options(&options);

    assert_eq!(settings.environment(), Environment::Live);
    assert_eq!(settings.secret_key(Environment::Live), Some("sk_live_json"));
    assert!(settings.js_fallback);

    fs::remove_file(path).ok();
}

#[test]
fn test_missing_file_is_load_error() {
    let options = Options::new();
    let result = options.load_file("/nonexistent/give-bongloy.toml", FileFormat::Toml);
    assert!(matches!(result, Err(ConfigError::LoadError(_))));
}

#[test]
fn test_config_error_display() {
    let err = ConfigError::Invalid(vec![
        "live_secret_key is not set".to_string(),
        "currency 'X' is not an ISO 4217 code".to_string(),
    ]);
    let display = err.to_string();
    assert!(display.contains("live_secret_key"));
    assert!(display.contains("currency"));
}
