//! Notices and the gateway error log

use crate::store::PaymentId;
use async_trait::async_trait;
use tracing::{error, info};

/// Preapproval notices. Templates and delivery belong to the host.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn preapproval_admin_notice(&self, payment: PaymentId);

    async fn preapproval_donor_notice(&self, payment: PaymentId);
}

/// Server-side audit of remote failures
pub trait GatewayErrorLog: Send + Sync {
    fn record_gateway_error(&self, title: &str, details: &str);
}

/// Writes gateway errors to the `tracing` error stream
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorLog;

impl GatewayErrorLog for TracingErrorLog {
    fn record_gateway_error(&self, title: &str, details: &str) {
        error!(title, details, "gateway error");
    }
}

/// Logs notices instead of sending them
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn preapproval_admin_notice(&self, payment: PaymentId) {
        info!(%payment, "preapproval admin notice");
    }

    async fn preapproval_donor_notice(&self, payment: PaymentId) {
        info!(%payment, "preapproval donor notice");
    }
}
