//! Custom Yew hook to load Stripe Checkout at runtime (no inline JS).
//!
//! # Overview
//! This hook, `use_stripe_checkout()`, injects a single
//! `<script id="stripe-checkout-sdk" src="https://checkout.stripe.com/checkout.js" defer>`
//! into `<head>` on first use, returns `false` until the
//! script’s `load` event fires, then returns `true`
//! on every subsequent call.
//!
//! # Usage
//! ```rust,ignore
//! use yew::prelude::*;
//! use labster_checkout::use_stripe_checkout;
//!
//! #[function_component(App)]
//! fn app() -> Html {
//!     let ready = use_stripe_checkout();
//!     html! {
//!         if ready {
//!             <p>{"Checkout loaded"}</p>
//!         } else {
//!             <p>{"Loading checkout..."}</p>
//!         }
//!     }
//! }
//! ```

use wasm_bindgen::{prelude::Closure, JsCast, JsValue};
use web_sys::js_sys::Reflect;
use web_sys::{Document, Element, HtmlScriptElement};
use yew::functional::hook;
use yew::prelude::*;

const SCRIPT_ID: &str = "stripe-checkout-sdk";
const SCRIPT_SRC: &str = "https://checkout.stripe.com/checkout.js";

fn checkout_present() -> bool {
    web_sys::window()
        .and_then(|win| Reflect::has(&win, &JsValue::from_str("StripeCheckout")).ok())
        .unwrap_or(false)
}

/// What a widget must do to get `window.StripeCheckout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScriptStep {
    Ready,
    /// No tag yet: this widget injects it.
    Inject,
    /// Another widget's tag is still loading.
    AwaitLoad,
}

fn next_step(tag_present: bool, checkout_loaded: bool) -> ScriptStep {
    match (checkout_loaded, tag_present) {
        (true, _) => ScriptStep::Ready,
        (false, false) => ScriptStep::Inject,
        (false, true) => ScriptStep::AwaitLoad,
    }
}

fn on_load_listener(on_load: impl Fn() + 'static) -> Closure<dyn Fn()> {
    Closure::wrap(Box::new(on_load) as Box<dyn Fn()>)
}

/// Append the `<script>` tag, firing `on_load` once it has been parsed.
fn inject_script(document: &Document, on_load: impl Fn() + 'static) -> Result<(), JsValue> {
    let script: HtmlScriptElement = document.create_element("script")?.dyn_into()?;
    script.set_id(SCRIPT_ID);
    script.set_src(SCRIPT_SRC);
    script.set_defer(true);

    let listener = on_load_listener(on_load);
    script.set_onload(Some(listener.as_ref().unchecked_ref()));
    // Leak so it lives until the load event
    listener.forget();

    let head = document
        .head()
        .ok_or_else(|| JsValue::from_str("document has no <head>"))?;
    head.append_child(&script)?;
    Ok(())
}

/// Listen for `load` on a tag injected by someone else. `onload` is left
/// alone so the injecting widget still gets its own callback.
fn await_existing_script(script: &Element, on_load: impl Fn() + 'static) -> Result<(), JsValue> {
    let listener = on_load_listener(on_load);
    script.add_event_listener_with_callback("load", listener.as_ref().unchecked_ref())?;
    listener.forget();
    Ok(())
}

/// Custom hook: load Stripe Checkout exactly once and track readiness.
///
/// Any number of widgets may mount while the script is in flight; each one
/// turns ready when the shared tag fires `load`.
///
/// # Returns
/// - `false` while the `<script>` is being fetched & parsed.
/// - `true` once `window.StripeCheckout` exists.
#[hook]
pub fn use_stripe_checkout() -> bool {
    let loaded = use_state(checkout_present);

    {
        let loaded = loaded.clone();
        use_effect_with((), move |_| {
            let Some(document) = web_sys::window().and_then(|w| w.document()) else {
                log::error!("no document to load Stripe Checkout into");
                return;
            };
            let existing = document.get_element_by_id(SCRIPT_ID);
            let on_load = {
                let loaded = loaded.clone();
                move || loaded.set(true)
            };
            let result = match next_step(existing.is_some(), checkout_present()) {
                ScriptStep::Ready => {
                    loaded.set(true);
                    Ok(())
                }
                ScriptStep::Inject => inject_script(&document, on_load),
                ScriptStep::AwaitLoad => match &existing {
                    Some(script) => await_existing_script(script, on_load),
                    None => Ok(()),
                },
            };
            if let Err(err) = result {
                log::error!("could not load Stripe Checkout: {:?}", err);
            }
        });
    }

    *loaded
}
