//! Explicit per-page configuration handed to each component.
//!
//! The page renders one JS object (by default `window.labsterConfig`) holding
//! the session, the backoffice endpoints and the Stripe publishable key.

use serde::{Deserialize, Serialize};
use wasm_bindgen::JsValue;
use web_sys::js_sys::Reflect;

use crate::error::ConfigError;

pub const DEFAULT_GLOBAL: &str = "labsterConfig";

/// Who is logged in and how to authorize on their behalf.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SessionContext {
    pub user_id: i64,
    pub backoffice_token: String,
    /// Platform token; only used to authorize the duplicate-labs call.
    pub user_token: String,
    #[serde(default)]
    pub organization_name: String,
    /// ISO code of the user's home country, if known.
    #[serde(default)]
    pub default_country: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BackofficeUrls {
    pub country: String,
    pub buy_lab: String,
    pub duplicate_labs: String,
    /// Prefix of the charge endpoint; the payment id and `/charge_stripe/` are appended.
    pub payment: String,
    pub enroll: String,
}

impl BackofficeUrls {
    pub fn charge_url(&self, payment_id: &str) -> String {
        format!("{}{}/charge_stripe/", self.payment, payment_id)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub session: SessionContext,
    pub urls: BackofficeUrls,
    pub stripe_key: String,
}

impl AppConfig {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|e| ConfigError::Decode(e.to_string()))
    }

    /// Read `window[global_name]` and deserialize it.
    pub fn from_window(global_name: &str) -> Result<Self, ConfigError> {
        let window = web_sys::window().ok_or(ConfigError::NoWindow)?;
        let value = Reflect::get(&window, &JsValue::from_str(global_name))
            .map_err(|_| ConfigError::MissingGlobal(global_name.to_string()))?;
        if value.is_undefined() || value.is_null() {
            return Err(ConfigError::MissingGlobal(global_name.to_string()));
        }
        serde_wasm_bindgen::from_value(value).map_err(|e| ConfigError::Decode(e.to_string()))
    }
}
