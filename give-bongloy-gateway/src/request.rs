//! Donation request, built once per submission and validated at the boundary

use crate::error::{DonationError, DonationResult, ValidationError};
use give_bongloy_payments::{Address, CardDetails, Currency, TokenId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Gateways this crate registers with the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayId {
    Card,
    BankTransfer,
}

impl GatewayId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::BankTransfer => "bank_transfer",
        }
    }
}

impl fmt::Display for GatewayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key of a customer mapping. Email first, local user id second.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DonorIdentity {
    Email(String),
    UserId(u64),
}

impl fmt::Display for DonorIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Email(email) => write!(f, "email:{}", email),
            Self::UserId(id) => write!(f, "user:{}", id),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DonorProfile {
    pub email: String,
    pub user_id: Option<u64>,
    pub first_name: String,
    pub last_name: String,
    pub address: Option<Address>,
}

impl DonorProfile {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = first.into();
        self.last_name = last.into();
        self
    }

    pub fn with_user_id(mut self, user_id: u64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_address(mut self, address: Address) -> Self {
        self.address = Some(address);
        self
    }

    /// Identities in lookup order
    pub fn identities(&self) -> Vec<DonorIdentity> {
        let mut identities = Vec::with_capacity(2);
        let email = self.email.trim();
        if !email.is_empty() {
            identities.push(DonorIdentity::Email(email.to_lowercase()));
        }
        if let Some(user_id) = self.user_id {
            identities.push(DonorIdentity::UserId(user_id));
        }
        identities
    }
}

/// Raw card form fields, posted when client-side tokenization did not run
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct RawCardFields {
    pub card_name: String,
    pub card_number: String,
    pub card_cvc: String,
    pub card_exp_month: String,
    pub card_exp_year: String,
}

impl fmt::Debug for RawCardFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawCardFields")
            .field("card_name", &self.card_name)
            .finish_non_exhaustive()
    }
}

impl RawCardFields {
    /// Every blank field, in form order
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let checks = [
            (
                &self.card_name,
                ValidationError::new("card_name", "Please enter a name for the credit card."),
            ),
            (
                &self.card_number,
                ValidationError::new("card_number", "Please enter a credit card number."),
            ),
            (
                &self.card_cvc,
                ValidationError::new("card_cvc", "Please enter a CVC/CVV for the credit card."),
            ),
            (
                &self.card_exp_month,
                ValidationError::new("card_exp_month", "Please enter an expiration month."),
            ),
            (
                &self.card_exp_year,
                ValidationError::new("card_exp_year", "Please enter an expiration year."),
            ),
        ];

        let errors: Vec<_> = checks
            .into_iter()
            .filter(|(value, _)| value.trim().is_empty())
            .map(|(_, error)| error)
            .collect();

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    pub fn to_card_details(&self, address: Option<Address>) -> CardDetails {
        CardDetails {
            number: self.card_number.trim().replace(' ', ""),
            name: self.card_name.trim().to_string(),
            exp_month: self.card_exp_month.trim().to_string(),
            exp_year: self.card_exp_year.trim().to_string(),
            cvc: self.card_cvc.trim().to_string(),
            address,
        }
    }
}

/// How the donor's payment method reached us
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PaymentInput {
    /// Token issued by client-side tokenization
    Token(TokenId),
    /// Plaid Link result for bank transfers
    BankAccount {
        public_token: String,
        account_id: String,
    },
    /// Raw card fields
    Card(RawCardFields),
    /// Nothing posted (hosted checkout collects the card)
    Absent,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormInfo {
    pub id: u64,
    pub title: Option<String>,
}

impl FormInfo {
    pub fn new(id: u64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: Some(title.into()),
        }
    }

    pub fn title(&self) -> &str {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or("Untitled donation form")
    }
}

/// One donation submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonationRequest {
    pub amount: Decimal,
    pub currency: Currency,
    pub donor: DonorProfile,
    pub payment: PaymentInput,
    pub form: FormInfo,
    pub gateway: GatewayId,
    pub purchase_key: String,
}

impl DonationRequest {
    pub fn new(
        amount: Decimal,
        currency: Currency,
        donor: DonorProfile,
        payment: PaymentInput,
    ) -> Self {
        Self {
            amount,
            currency,
            donor,
            payment,
            form: FormInfo::default(),
            gateway: GatewayId::Card,
            purchase_key: String::new(),
        }
    }

    pub fn with_form(mut self, form: FormInfo) -> Self {
        self.form = form;
        self
    }

    pub fn with_gateway(mut self, gateway: GatewayId) -> Self {
        self.gateway = gateway;
        self
    }

    pub fn with_purchase_key(mut self, key: impl Into<String>) -> Self {
        self.purchase_key = key.into();
        self
    }

    /// Check the fields every gateway path relies on.
    pub fn validate(&self) -> DonationResult<()> {
        let mut errors = Vec::new();
        if self.amount <= Decimal::ZERO {
            errors.push(ValidationError::new(
                "amount",
                "Please enter a donation amount greater than zero.",
            ));
        }
        if self.donor.email.trim().is_empty() {
            errors.push(ValidationError::new("email", "Please enter a valid email address."));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(DonationError::Validation(errors))
        }
    }

    /// `<form title> - <email>`, used as the charge description
    pub fn summary(&self) -> String {
        format!("{} - {}", self.form.title(), self.donor.email.trim())
    }
}
