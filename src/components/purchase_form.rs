//! Billing details step of the license purchase.

use std::rc::Rc;

use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlSelectElement;
use yew::prelude::*;

use crate::api::HttpBackofficeApi;
use crate::config::AppConfig;
use crate::model::{InstitutionType, LabKind, LabSelection, PaymentMethod};
use crate::purchase::PurchaseController;
use crate::storage::LocalDraftStore;

#[derive(Properties, PartialEq, Clone)]
pub struct PurchaseFormProps {
    pub config: AppConfig,
    /// Called with the invoice path once the order is placed. When absent
    /// the browser is sent there.
    #[prop_or_default]
    pub on_complete: Option<Callback<String>>,
}

fn navigate(path: &str) {
    let Some(window) = web_sys::window() else {
        log::error!("no window to navigate to {}", path);
        return;
    };
    if let Err(err) = window.location().set_href(path) {
        log::error!("navigation to {} failed: {:?}", path, err);
    }
}

fn lab_label(lab: &LabSelection) -> String {
    match &lab.kind {
        LabKind::Individual { .. } => format!("Lab #{}", lab.id),
        LabKind::Package { products } => format!("Package #{} ({} labs)", lab.id, products.len()),
    }
}

fn format_price(value: f64) -> String {
    format!("{:.2}", value)
}

type FormController = PurchaseController<HttpBackofficeApi, LocalDraftStore>;

/// The controller owns the form state. Every change it makes re-renders
/// the form, including the ones made by in-flight requests.
#[function_component(PurchaseForm)]
pub fn purchase_form(props: &PurchaseFormProps) -> Html {
    let trigger = use_force_update();
    let controller: Rc<FormController> = {
        let trigger = trigger.clone();
        let config = props.config.clone();
        use_memo((), move |_| {
            let api = HttpBackofficeApi::new(config.urls.clone(), config.session.clone());
            PurchaseController::new(api, LocalDraftStore, config.session.clone())
                .on_change(move || trigger.force_update())
        })
    };

    // Load the draft and the country list once
    {
        let controller = controller.clone();
        use_effect_with((), move |_| {
            spawn_local(async move {
                // Failures are already on the form
                let _ = controller.initialize().await;
            });
            || ()
        });
    }

    let on_buy = |method: PaymentMethod| {
        let controller = controller.clone();
        let on_complete = props.on_complete.clone();
        Callback::from(move |_: MouseEvent| {
            if controller.state().is_processing {
                return;
            }
            let controller = controller.clone();
            let on_complete = on_complete.clone();
            spawn_local(async move {
                if let Ok(path) = controller.buy_labs(method).await {
                    match &on_complete {
                        Some(cb) => cb.emit(path),
                        None => navigate(&path),
                    }
                }
            });
        })
    };

    let on_type_change = {
        let controller = controller.clone();
        Callback::from(move |e: Event| {
            let select: HtmlSelectElement = e.target_unchecked_into();
            let code = select.value().parse::<u8>().unwrap_or(1);
            controller.update(|s| s.set_institution_type(InstitutionType::from_code(code)));
        })
    };

    let on_country_change = {
        let controller = controller.clone();
        Callback::from(move |e: Event| {
            let select: HtmlSelectElement = e.target_unchecked_into();
            if let Ok(id) = select.value().parse::<i64>() {
                controller.update(|s| s.set_country_by_id(id));
            }
        })
    };

    let on_name = {
        let controller = controller.clone();
        Callback::from(move |name: String| controller.update(|s| s.set_institution_name(name)))
    };

    let on_vat = {
        let controller = controller.clone();
        Callback::from(move |vat: String| controller.update(|s| s.set_vat_number(vat)))
    };

    let s = controller.state().clone();
    let selected_country = s.country.as_ref().map(|c| c.id);
    let is_organization = s.institution_type == InstitutionType::Organization;

    html! {
        <div class="license-step2">
            <table class="table">
                <thead>
                    <tr><th>{ "Lab" }</th><th>{ "Licenses" }</th><th>{ "Months" }</th></tr>
                </thead>
                <tbody>
                    { for s.labs.iter().filter(|lab| lab.license > 0).map(|lab| html! {
                        <tr key={lab.id}>
                            <td>{ lab_label(lab) }</td>
                            <td>{ lab.license }</td>
                            <td>{ lab.month_subscription }</td>
                        </tr>
                    }) }
                </tbody>
            </table>

            <div class="form-group">
                <label>{ "I am buying as" }</label>
                <select class="form-control" onchange={on_type_change}>
                    <option value="1" selected={!is_organization}>{ "An individual" }</option>
                    <option value="2" selected={is_organization}>{ "An institution" }</option>
                </select>
            </div>

            if is_organization {
                <>
                    <label>{ "Institution name" }</label>
                    <super::TextInput
                        value={s.institution_name.clone()}
                        oninput={on_name}
                        error={s.institution_error.clone()}
                    />
                    <label>{ "VAT number" }</label>
                    <super::TextInput
                        value={s.vat_number.clone()}
                        oninput={on_vat}
                        placeholder={"DK12345678".to_string()}
                        error={s.vat_error.clone()}
                    />
                </>
            }

            <div class="form-group">
                <label>{ "Country" }</label>
                <select class="form-control" onchange={on_country_change}>
                    { for s.countries.iter().map(|c| html! {
                        <option key={c.id} value={c.id.to_string()} selected={selected_country == Some(c.id)}>
                            { &c.name }
                        </option>
                    }) }
                </select>
            </div>

            <dl class="price-summary">
                <dt>{ "Subtotal" }</dt><dd>{ format_price(s.sub_total_price) }</dd>
                <dt>{ "VAT" }</dt><dd>{ format_price(s.tax) }</dd>
                <dt>{ "Total" }</dt><dd>{ format_price(s.total_price) }</dd>
            </dl>

            if let Some(msg) = &s.request_error {
                <div class="alert alert-danger">{ msg }</div>
            }

            <super::Button
                label={"Pay with Credit Card".to_string()}
                onclick={on_buy(PaymentMethod::CreditCard)}
                disabled={s.is_processing}
                loading={s.loading_cc}
            />
            <super::Button
                label={"Pay by Invoice".to_string()}
                onclick={on_buy(PaymentMethod::Manual)}
                disabled={s.is_processing}
                loading={s.loading_man}
            />
        </div>
    }
}
