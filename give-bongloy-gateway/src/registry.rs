//! What the gateway registers with the host: gateway ids with their labels,
//! plus the extra `preapproval` record status.

use crate::request::GatewayId;
use crate::store::PaymentStatus;
use serde::Serialize;

/// One payment gateway as the host lists it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GatewayRegistration {
    pub id: GatewayId,
    pub admin_label: &'static str,
    pub checkout_label: &'static str,
}

impl GatewayId {
    pub fn registration(self) -> GatewayRegistration {
        let (admin_label, checkout_label) = match self {
            Self::Card => ("Bongloy - Credit Card", "Credit Card"),
            Self::BankTransfer => ("Bongloy - ACH", "Bank Account"),
        };
        GatewayRegistration {
            id: self,
            admin_label,
            checkout_label,
        }
    }
}

/// Record status the host does not know by itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusRegistration {
    pub status: PaymentStatus,
    pub label: &'static str,
}

/// Both gateways, card first
pub fn gateway_registrations() -> [GatewayRegistration; 2] {
    [
        GatewayId::Card.registration(),
        GatewayId::BankTransfer.registration(),
    ]
}

pub fn status_registrations() -> [StatusRegistration; 1] {
    [StatusRegistration {
        status: PaymentStatus::Preapproval,
        label: "Preapproved",
    }]
}
