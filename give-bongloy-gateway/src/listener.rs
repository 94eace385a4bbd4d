//! Webhook listener
//!
//! The host routes every request carrying `give-listener=bongloy` here. The
//! body is only trusted for its event `id`; the event itself is re-fetched
//! from the API before anything changes.

use crate::notify::GatewayErrorLog;
use crate::reconcile::RefundReconciler;
use give_bongloy_config::GatewaySettings;
use give_bongloy_payments::parse_notification;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Query parameter the host uses to dispatch listener requests
pub const LISTENER_PARAM: &str = "give-listener";
pub const LISTENER_NAME: &str = "bongloy";

/// Raw inbound request as the host received it
#[derive(Debug, Clone, Default)]
pub struct ListenerRequest {
    /// Query string without the leading `?`
    pub query: String,
    pub body: Vec<u8>,
}

impl ListenerRequest {
    pub fn new(query: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            query: query.into(),
            body: body.into(),
        }
    }

    /// Whether the query addresses this listener
    pub fn is_addressed(&self) -> bool {
        url::form_urlencoded::parse(self.query.trim_start_matches('?').as_bytes())
            .any(|(key, value)| key == LISTENER_PARAM && value == LISTENER_NAME)
    }
}

/// Status code plus the `1` / `-1` exit code body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerResponse {
    pub status: u16,
    pub body: &'static str,
}

impl ListenerResponse {
    pub const OK: Self = Self {
        status: 200,
        body: "1",
    };

    pub const FAILED: Self = Self {
        status: 500,
        body: "-1",
    };

    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

pub struct WebhookListener {
    settings: Arc<GatewaySettings>,
    reconciler: Arc<RefundReconciler>,
    error_log: Arc<dyn GatewayErrorLog>,
}

impl WebhookListener {
    pub fn new(
        settings: Arc<GatewaySettings>,
        reconciler: Arc<RefundReconciler>,
        error_log: Arc<dyn GatewayErrorLog>,
    ) -> Self {
        Self {
            settings,
            reconciler,
            error_log,
        }
    }

    /// Handle one request. `None` means the request is not for us.
    pub async fn handle(&self, request: &ListenerRequest) -> Option<ListenerResponse> {
        if !request.is_addressed() {
            return None;
        }

        let env = self.settings.environment();
        if self.settings.secret_key(env).is_none() {
            error!(env = %env, "webhook received without a secret key configured");
            self.error_log.record_gateway_error(
                "Bongloy Webhook Error",
                &format!("No {} secret key is configured; webhook ignored.", env),
            );
            return Some(ListenerResponse::FAILED);
        }

        let Some(event_id) = parse_notification(&request.body) else {
            warn!(bytes = request.body.len(), "webhook body has no event id");
            return Some(ListenerResponse::FAILED);
        };

        match self.reconciler.handle_event(env, &event_id).await {
            Ok(outcome) => {
                debug!(event = %event_id, ?outcome, "webhook handled");
                Some(ListenerResponse::OK)
            }
            Err(e) => {
                error!(event = %event_id, error = %e, "webhook reconciliation failed");
                Some(ListenerResponse::FAILED)
            }
        }
    }
}
