//! labster_checkout/src/client.rs
//!
//! High-level Rust API over the hosted Stripe Checkout popup.
//!
//! This module provides:
//! - `configure_checkout()` to create a handler whose token callback is a Rust closure.
//! - `CheckoutHandler::open()` to show the popup with typed `CheckoutOptions`.
//! - `CheckoutHandler::close()` to dismiss it programmatically.
//!
//! # Example Usage
//! ```rust,ignore
//! use labster_checkout::client::configure_checkout;
//! use labster_checkout::payment::checkout_options;
//!
//! let handler = configure_checkout("pk_test_...", |token| {
//!     log::info!("received token {}", token.id);
//! })?;
//! handler.open(&checkout_options(&session)?)?;
//! ```

use gloo_utils::format::JsValueSerdeExt;
use serde::Serialize;
use serde_wasm_bindgen::to_value;
use wasm_bindgen::prelude::Closure;
use wasm_bindgen::JsValue;
use web_sys::js_sys::Reflect;

use crate::bindings::{configure, JsCheckoutHandler};
use crate::error::PaymentError;
use crate::model::CheckoutToken;
use crate::payment::CheckoutOptions;

/// Static part of `StripeCheckout.configure({ ... })`.
#[derive(Serialize, Clone, Debug)]
struct ConfigureOptions<'a> {
    key: &'a str,
    #[serde(rename = "allowRememberMe")]
    allow_remember_me: bool,
}

/// A configured checkout popup. Keeps the token closure alive for as long
/// as the handler exists.
pub struct CheckoutHandler {
    handler: JsCheckoutHandler,
    _on_token: Closure<dyn FnMut(JsValue)>,
}

/// Configure the popup for `publishable_key`, routing tokens to `on_token`.
///
/// # Errors
///
/// Fails when `checkout.js` is not loaded yet or rejects the options.
pub fn configure_checkout<F>(publishable_key: &str, on_token: F) -> Result<CheckoutHandler, PaymentError>
where
    F: Fn(CheckoutToken) + 'static,
{
    let opts = to_value(&ConfigureOptions {
        key: publishable_key,
        allow_remember_me: false,
    })
    .map_err(|e| PaymentError::Checkout(e.to_string()))?;

    let token_closure = Closure::wrap(Box::new(move |raw: JsValue| {
        match raw.into_serde::<CheckoutToken>() {
            Ok(token) => on_token(token),
            Err(e) => log::error!("checkout returned an unreadable token: {}", e),
        }
    }) as Box<dyn FnMut(JsValue)>);

    Reflect::set(&opts, &JsValue::from_str("token"), token_closure.as_ref())
        .map_err(js_to_payment_error)?;
    let handler = configure(&opts).map_err(js_to_payment_error)?;

    Ok(CheckoutHandler {
        handler,
        _on_token: token_closure,
    })
}

impl CheckoutHandler {
    pub fn open(&self, options: &CheckoutOptions) -> Result<(), PaymentError> {
        let opts = to_value(options).map_err(|e| PaymentError::Checkout(e.to_string()))?;
        self.handler.open(opts).map_err(js_to_payment_error)
    }

    pub fn close(&self) -> Result<(), PaymentError> {
        self.handler.close().map_err(js_to_payment_error)
    }
}

/// Convert any caught `JsValue` into a `PaymentError` with best effort.
fn js_to_payment_error(value: JsValue) -> PaymentError {
    PaymentError::Checkout(value.as_string().unwrap_or_else(|| format!("{:?}", value)))
}
