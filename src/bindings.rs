//! labster_checkout/src/bindings.rs
//!
//! Low‐level wasm-bindgen bindings to Stripe Checkout (`checkout.js`).
//!
//! Exposes the raw handler returned by `StripeCheckout.configure(...)`.
//! Higher-level wrappers live in `client.rs`.

use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    //------------------------------------------------------------------------------
    // Core Types
    //------------------------------------------------------------------------------

    /// Raw handler controlling the hosted checkout popup.
    #[derive(Debug, Clone)]
    pub type JsCheckoutHandler;

    //------------------------------------------------------------------------------
    // Constructors
    //------------------------------------------------------------------------------

    /// ```js
    ///   const handler = StripeCheckout.configure({ key, token });
    /// ```
    #[wasm_bindgen(catch, js_namespace = StripeCheckout, js_name = configure)]
    pub fn configure(options: &JsValue) -> Result<JsCheckoutHandler, JsValue>;

    //------------------------------------------------------------------------------
    // Instance Methods
    //------------------------------------------------------------------------------

    /// `handler.open({ name, description, amount, email })` → `()`
    #[wasm_bindgen(method, catch, js_name = open)]
    pub fn open(this: &JsCheckoutHandler, options: JsValue) -> Result<(), JsValue>;

    /// `handler.close()` → `()`
    #[wasm_bindgen(method, catch, js_name = close)]
    pub fn close(this: &JsCheckoutHandler) -> Result<(), JsValue>;
}
