//! Yew components and controllers for the back-office license checkout:
//! the billing/VAT step of a license purchase ([`PurchaseForm`]) and the
//! credit card button that settles an invoice ([`StripePaymentButton`]).

pub mod api;
pub mod bindings;
pub mod client;
pub mod config;
pub mod error;
mod interop;
pub mod model;
pub mod payment;
pub mod purchase;
pub mod storage;
pub mod vat;
mod components;

pub use components::*;
pub use interop::*;

pub use config::AppConfig;
pub use error::{ApiError, ConfigError, PaymentError, PurchaseError, StorageError};

/// Route `log` records to the browser console. Call once at startup.
pub fn init_logging(level: log::Level) {
    wasm_logger::init(wasm_logger::Config::new(level));
}
