//! Error types surfaced by the purchase flow and the payment widget.
//!
//! Every network failure ends up in one of these enums and is shown to the
//! user through [`PurchaseError::user_message`] or
//! [`PaymentError::user_message`]; nothing is dropped on the floor.

use thiserror::Error;

/// Failure of a single backoffice HTTP call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),
    #[error("server responded with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not decode response: {0}")]
    Decode(String),
}

impl From<gloo_net::Error> for ApiError {
    fn from(err: gloo_net::Error) -> Self {
        match err {
            gloo_net::Error::SerdeError(e) => ApiError::Decode(e.to_string()),
            other => ApiError::Network(other.to_string()),
        }
    }
}

/// Failure reading the purchase draft left by the previous step.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StorageError {
    #[error("no purchase draft found under `{0}`")]
    Missing(String),
    #[error("purchase draft is unreadable: {0}")]
    Decode(String),
}

/// Failure building an [`AppConfig`](crate::config::AppConfig).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("window is not available")]
    NoWindow,
    #[error("global `{0}` is not defined")]
    MissingGlobal(String),
    #[error("invalid configuration: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PurchaseError {
    #[error("purchase form has validation errors")]
    Validation,
    #[error("no country selected")]
    MissingCountry,
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("could not load countries: {0}")]
    Countries(#[source] ApiError),
    #[error("purchase request failed: {0}")]
    Purchase(#[source] ApiError),
    #[error("license activation failed for payment {payment_id}: {source}")]
    DuplicateLabs {
        payment_id: i64,
        #[source]
        source: ApiError,
    },
}

impl PurchaseError {
    /// Message suitable for showing next to the purchase buttons.
    pub fn user_message(&self) -> String {
        match self {
            PurchaseError::Validation => "Please correct the highlighted fields.".to_string(),
            PurchaseError::MissingCountry => "Please select a country.".to_string(),
            PurchaseError::Storage(_) => {
                "Your lab selection has expired. Please start again.".to_string()
            }
            PurchaseError::Countries(_) => {
                "Could not load the list of countries. Please reload the page.".to_string()
            }
            PurchaseError::Purchase(_) => {
                "We could not place your order. Please try again.".to_string()
            }
            PurchaseError::DuplicateLabs { payment_id, .. } => format!(
                "Your order #{} was placed but the licenses could not be activated. \
                 Please contact support.",
                payment_id
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PaymentError {
    #[error("amount {0} cannot be charged")]
    InvalidAmount(String),
    #[error("checkout form error: {0}")]
    Checkout(String),
    #[error("charge failed: {0}")]
    Charge(#[source] ApiError),
    #[error("enrollment failed: {0}")]
    Enrollment(#[source] ApiError),
}

impl PaymentError {
    pub fn user_message(&self) -> String {
        match self {
            PaymentError::InvalidAmount(_) => {
                "This invoice amount cannot be paid by card. Please contact support.".to_string()
            }
            PaymentError::Checkout(_) => {
                "The payment form could not be opened. Please reload the page.".to_string()
            }
            PaymentError::Charge(_) => {
                "Your card could not be charged. Please try again.".to_string()
            }
            PaymentError::Enrollment(_) => {
                "Your payment went through but enrollment failed. Please contact support."
                    .to_string()
            }
        }
    }
}
