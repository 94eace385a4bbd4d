//! Webhook events
//!
//! Notifications are never trusted as delivered. Only the event id is read
//! from the body; the event itself is re-fetched through
//! [`CardGateway::retrieve_event`](crate::CardGateway::retrieve_event).

use crate::types::ChargeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event retrieved from the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Event ID
    pub id: String,
    /// Event type
    pub event_type: EventType,
    /// Livemode
    pub livemode: bool,
    /// Timestamp
    pub created_at: Option<DateTime<Utc>>,
    /// `data.object` of the event
    pub object: serde_json::Value,
}

impl Event {
    /// Charge id carried by a `charge.refunded` event whose charge is
    /// actually marked refunded
    pub fn refunded_charge(&self) -> Option<ChargeId> {
        if self.event_type != EventType::ChargeRefunded {
            return None;
        }
        let refunded = self
            .object
            .get("refunded")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);
        if !refunded {
            return None;
        }
        self.object
            .get("id")
            .and_then(serde_json::Value::as_str)
            .and_then(ChargeId::new)
    }
}

/// Event types the gateway distinguishes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ChargeSucceeded,
    ChargeFailed,
    ChargeRefunded,
    ChargeCaptured,
    CustomerCreated,
    CustomerDeleted,
    Unknown(String),
}

impl EventType {
    /// Parse from the API's dotted name
    pub fn from_str(s: &str) -> Self {
        match s {
            "charge.succeeded" => Self::ChargeSucceeded,
            "charge.failed" => Self::ChargeFailed,
            "charge.refunded" => Self::ChargeRefunded,
            "charge.captured" => Self::ChargeCaptured,
            "customer.created" => Self::CustomerCreated,
            "customer.deleted" => Self::CustomerDeleted,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::ChargeSucceeded => "charge.succeeded",
            Self::ChargeFailed => "charge.failed",
            Self::ChargeRefunded => "charge.refunded",
            Self::ChargeCaptured => "charge.captured",
            Self::CustomerCreated => "customer.created",
            Self::CustomerDeleted => "customer.deleted",
            Self::Unknown(name) => name,
        }
    }
}

#[derive(Deserialize)]
struct Notification {
    id: Option<String>,
}

/// Extract the event id from a notification body.
///
/// Empty, malformed or id-less bodies yield `None`.
pub fn parse_notification(body: &[u8]) -> Option<String> {
    let notification: Notification = serde_json::from_slice(body).ok()?;
    notification
        .id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(event_type: &str, object: serde_json::Value) -> Event {
        Event {
            id: "evt_1".into(),
            event_type: EventType::from_str(event_type),
            livemode: false,
            created_at: None,
            object,
        }
    }

    #[test]
    fn test_parse_notification() {
        assert_eq!(
            parse_notification(br#"{"id":"evt_123","type":"charge.refunded"}"#).as_deref(),
            Some("evt_123")
        );
        assert_eq!(parse_notification(b""), None);
        assert_eq!(parse_notification(b"not json"), None);
        assert_eq!(parse_notification(br#"{"type":"charge.refunded"}"#), None);
        assert_eq!(parse_notification(br#"{"id":"  "}"#), None);
    }

    #[test]
    fn test_event_type_round_trip_names() {
        assert_eq!(EventType::from_str("charge.refunded"), EventType::ChargeRefunded);
        assert_eq!(EventType::ChargeRefunded.as_str(), "charge.refunded");

        let unknown = EventType::from_str("invoice.paid");
        assert_eq!(unknown, EventType::Unknown("invoice.paid".into()));
        assert_eq!(unknown.as_str(), "invoice.paid");
    }

    #[test]
    fn test_refunded_charge() {
        let refunded = event("charge.refunded", json!({"id": "ch_1", "refunded": true}));
        assert_eq!(refunded.refunded_charge().unwrap().as_str(), "ch_1");

        let succeeded = event("charge.succeeded", json!({"id": "ch_1"}));
        assert!(succeeded.refunded_charge().is_none());

        let missing = event("charge.refunded", json!({"refunded": true}));
        assert!(missing.refunded_charge().is_none());

        let partial = event("charge.refunded", json!({"id": "ch_1", "refunded": false}));
        assert!(partial.refunded_charge().is_none());
    }
}
