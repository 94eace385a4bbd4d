//! Payment types and data structures

use crate::money::Money;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

macro_rules! remote_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a remote id. Blank ids are rejected.
            pub fn new(id: impl Into<String>) -> Option<Self> {
                let id = id.into();
                if id.trim().is_empty() {
                    None
                } else {
                    Some(Self(id))
                }
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

remote_id!(
    /// Single-use token for a card or bank account
    TokenId
);
remote_id!(
    /// Remote customer id (`cus_...`)
    CustomerId
);
remote_id!(
    /// Reusable source attached to a customer (`card_...`, `ba_...`)
    SourceId
);
remote_id!(
    /// Charge id (`ch_...`)
    ChargeId
);
remote_id!(
    /// Refund id (`re_...`)
    RefundId
);

/// Billing address
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub zip: Option<String>,
}

impl Address {
    pub fn is_empty(&self) -> bool {
        [
            &self.line1,
            &self.line2,
            &self.city,
            &self.state,
            &self.country,
            &self.zip,
        ]
        .iter()
        .all(|field| field.as_deref().is_none_or(|v| v.trim().is_empty()))
    }
}

/// Raw card fields for server-side tokenization
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct CardDetails {
    pub number: String,
    pub name: String,
    pub exp_month: String,
    pub exp_year: String,
    pub cvc: String,
    pub address: Option<Address>,
}

impl fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let last4 = self
            .number
            .len()
            .checked_sub(4)
            .and_then(|start| self.number.get(start..))
            .unwrap_or("");
        f.debug_struct("CardDetails")
            .field("number", &format_args!("**** {}", last4))
            .field("name", &self.name)
            .field("exp_month", &self.exp_month)
            .field("exp_year", &self.exp_year)
            .finish_non_exhaustive()
    }
}

/// What the API reveals about a card or bank account behind a token or
/// source. Used to spot the same instrument across tokenizations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentSummary {
    pub fingerprint: Option<String>,
    pub last4: Option<String>,
    pub exp_year: Option<u32>,
    pub brand: Option<String>,
}

impl InstrumentSummary {
    /// Same physical instrument: fingerprint, expiry year and last4 all equal.
    /// Without a fingerprint nothing matches.
    pub fn same_instrument(&self, other: &InstrumentSummary) -> bool {
        match (&self.fingerprint, &other.fingerprint) {
            (Some(a), Some(b)) => a == b && self.exp_year == other.exp_year && self.last4 == other.last4,
            _ => false,
        }
    }
}

/// Single-use token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub id: TokenId,
    pub instrument: Option<InstrumentSummary>,
    pub livemode: bool,
}

/// Source stored on a customer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: SourceId,
    pub object: String,
    pub instrument: InstrumentSummary,
}

/// Remote customer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub email: Option<String>,
    pub description: Option<String>,
    pub metadata: BTreeMap<String, String>,
    /// Deleted customers are still retrievable by id.
    pub deleted: bool,
}

/// Create customer request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateCustomerRequest {
    pub description: Option<String>,
    pub email: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

impl CreateCustomerRequest {
    pub fn with_email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Default::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Charge request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeRequest {
    pub amount: Money,
    pub customer: CustomerId,
    /// `None` charges the customer's default source
    pub source: Option<SourceId>,
    pub description: Option<String>,
    pub statement_descriptor: Option<String>,
    pub metadata: BTreeMap<String, String>,
    /// `false` authorizes without capturing
    pub capture: bool,
    pub idempotency_key: Option<String>,
}

impl ChargeRequest {
    pub fn new(amount: Money, customer: CustomerId) -> Self {
        Self {
            amount,
            customer,
            source: None,
            description: None,
            statement_descriptor: None,
            metadata: BTreeMap::new(),
            capture: true,
            idempotency_key: None,
        }
    }

    pub fn source(mut self, source: SourceId) -> Self {
        self.source = Some(source);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn statement_descriptor(mut self, descriptor: impl Into<String>) -> Self {
        self.statement_descriptor = Some(descriptor.into());
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Auth only (no capture)
    pub fn auth_only(mut self) -> Self {
        self.capture = false;
        self
    }

    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Charge result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Charge {
    pub id: ChargeId,
    pub amount: i64,
    pub currency: String,
    pub customer: Option<CustomerId>,
    pub status: String,
    pub captured: bool,
    pub paid: bool,
    pub refunded: bool,
}

/// Refund request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundRequest {
    pub charge: ChargeId,
    /// `None` refunds the full amount
    pub amount: Option<i64>,
}

impl RefundRequest {
    pub fn full(charge: ChargeId) -> Self {
        Self {
            charge,
            amount: None,
        }
    }
}

/// Refund result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refund {
    pub id: RefundId,
    pub charge: Option<ChargeId>,
    pub amount: i64,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;

    fn summary(fingerprint: Option<&str>, exp_year: u32, last4: &str) -> InstrumentSummary {
        InstrumentSummary {
            fingerprint: fingerprint.map(str::to_string),
            last4: Some(last4.to_string()),
            exp_year: Some(exp_year),
            brand: Some("Visa".to_string()),
        }
    }

    #[test]
    fn test_blank_ids_rejected() {
        assert!(CustomerId::new("").is_none());
        assert!(CustomerId::new("   ").is_none());
        assert_eq!(CustomerId::new("cus_123").unwrap().as_str(), "cus_123");
    }

    #[test]
    fn test_same_instrument() {
        let a = summary(Some("fp_1"), 2030, "4242");
        assert!(a.same_instrument(&summary(Some("fp_1"), 2030, "4242")));
        assert!(!a.same_instrument(&summary(Some("fp_1"), 2031, "4242")));
        assert!(!a.same_instrument(&summary(Some("fp_1"), 2030, "1111")));
        assert!(!a.same_instrument(&summary(Some("fp_2"), 2030, "4242")));
        assert!(!summary(None, 2030, "4242").same_instrument(&summary(None, 2030, "4242")));
    }

    #[test]
    fn test_charge_request_builder() {
        let usd = Currency::from_code("USD").unwrap();
        let req = ChargeRequest::new(Money::new(2500, usd), CustomerId::new("cus_1").unwrap())
            .source(SourceId::new("card_1").unwrap())
            .metadata("email", "donor@example.org")
            .auth_only();

        assert!(!req.capture);
        assert_eq!(req.source.as_ref().map(SourceId::as_str), Some("card_1"));
        assert_eq!(req.metadata.get("email").map(String::as_str), Some("donor@example.org"));
    }

    #[test]
    fn test_card_details_debug_masks_number() {
        let card = CardDetails {
            number: "4242424242424242".into(),
            cvc: "123".into(),
            ..Default::default()
        };
        let debug = format!("{:?}", card);
        assert!(debug.contains("**** 4242"));
        assert!(!debug.contains("4242424242424242"));
        assert!(!debug.contains("123"));
    }

    #[test]
    fn test_address_is_empty() {
        assert!(Address::default().is_empty());
        let address = Address {
            city: Some("Phnom Penh".into()),
            ..Default::default()
        };
        assert!(!address.is_empty());
    }
}
