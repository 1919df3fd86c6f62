//! VAT calculation and the institution/VAT-number field checks.
//!
//! Countries present in the VAT table are EU members. Danish buyers always
//! pay VAT; other EU organizations are reverse-charged; EU individuals pay
//! their country's rate; everyone outside the table pays none.

use crate::model::{Country, InstitutionType, VatTable};

const DENMARK: &str = "DK";

#[derive(Clone, Debug, PartialEq)]
pub struct VatResult {
    pub total_price: f64,
    pub vat: f64,
    pub is_eu_country: bool,
    pub is_denmark: bool,
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn check_vat(
    country: Option<&Country>,
    sub_total: f64,
    institution_type: InstitutionType,
    table: &VatTable,
) -> VatResult {
    let code = country.map(|c| c.code.to_ascii_uppercase());
    let rate = code.as_deref().and_then(|c| table.get(c)).copied();
    let is_eu_country = rate.is_some();
    let is_denmark = code.as_deref() == Some(DENMARK);

    let applies = is_denmark || (is_eu_country && institution_type == InstitutionType::Individual);
    let vat = match rate {
        Some(rate) if applies => round_cents(sub_total * rate / 100.0),
        _ => 0.0,
    };

    VatResult {
        total_price: round_cents(sub_total + vat),
        vat,
        is_eu_country,
        is_denmark,
    }
}

/// Empty string when the number looks like `CC` followed by 2-12 alphanumerics.
pub fn check_vat_format(vat_number: &str) -> String {
    let compact: String = vat_number
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '.')
        .collect();
    if compact.is_empty() {
        return "Please enter your VAT number.".to_string();
    }

    let prefix_ok = compact.chars().take(2).filter(|c| c.is_ascii_alphabetic()).count() == 2;
    let rest = compact.get(2..).unwrap_or_default();
    let rest_ok = (2..=12).contains(&rest.len()) && rest.chars().all(|c| c.is_ascii_alphanumeric());

    if prefix_ok && rest_ok {
        String::new()
    } else {
        "Invalid VAT number format.".to_string()
    }
}

pub fn check_institution(name: &str) -> String {
    if name.trim().is_empty() {
        "Please enter your institution name.".to_string()
    } else {
        String::new()
    }
}
