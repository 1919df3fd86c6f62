//! A drop-in "Pay with Credit Card" button for an existing invoice.
//!
//! This component loads Stripe Checkout, opens the hosted card form on
//! click, then charges the payment and enrolls the student with the
//! returned token while a progress dialog blocks the page.

use std::rc::Rc;

use wasm_bindgen_futures::spawn_local;
use yew::prelude::*;

use crate::api::HttpBackofficeApi;
use crate::client::{configure_checkout, CheckoutHandler};
use crate::config::AppConfig;
use crate::model::PaymentSession;
use crate::payment::{PaymentController, PaymentStatus};
use crate::use_stripe_checkout;

/// Properties for the [`StripePaymentButton`] component.
///
/// # Fields
///
/// * `config` – Page configuration (Stripe key, endpoints, session).
/// * `payment_id` – Backoffice payment being settled.
/// * `email` – Prefills the hosted form and receives the enrollment.
/// * `amount` – Amount in major units, e.g. `19.99`.
/// * `description` – Shown under the merchant name in the hosted form.
/// * `course_id` – Course to enroll the student in once charged.
/// * `on_enrolled` – Invoked after charge and enrollment both succeed.
#[derive(Properties, PartialEq, Clone)]
pub struct StripePaymentButtonProps {
    pub config: AppConfig,
    pub payment_id: String,
    pub email: String,
    pub amount: f64,
    #[prop_or_default]
    pub description: String,
    pub course_id: String,
    #[prop_or_default]
    pub on_enrolled: Callback<()>,
}

impl StripePaymentButtonProps {
    fn session(&self) -> PaymentSession {
        PaymentSession {
            payment_id: self.payment_id.clone(),
            email: self.email.clone(),
            amount: self.amount,
            description: self.description.clone(),
            course_id: self.course_id.clone(),
        }
    }
}

fn status_message(status: &PaymentStatus) -> String {
    match status {
        PaymentStatus::Idle => String::new(),
        PaymentStatus::Processing => "Please wait. We are processing your payment.".to_string(),
        PaymentStatus::Enrolled => "Thank you! Your payment was received.".to_string(),
        PaymentStatus::Failed(msg) => msg.clone(),
    }
}

type WidgetController = PaymentController<HttpBackofficeApi>;

#[function_component(StripePaymentButton)]
pub fn stripe_payment_button(props: &StripePaymentButtonProps) -> Html {
    let checkout_ready = use_stripe_checkout();
    let handler = use_mut_ref(|| None::<CheckoutHandler>);
    let trigger = use_force_update();
    let controller: Rc<WidgetController> = {
        let trigger = trigger.clone();
        let props = props.clone();
        use_memo((), move |_| {
            let api = HttpBackofficeApi::new(
                props.config.urls.clone(),
                props.config.session.clone(),
            );
            PaymentController::new(api, props.session()).on_change(move || trigger.force_update())
        })
    };

    // Configure the hosted form once checkout.js is available
    {
        let handler = handler.clone();
        let controller = controller.clone();
        let stripe_key = props.config.stripe_key.clone();
        let on_enrolled = props.on_enrolled.clone();
        use_effect_with(checkout_ready, move |ready| {
            if *ready && handler.borrow().is_none() {
                let token_controller = controller.clone();
                let configured = configure_checkout(&stripe_key, move |token| {
                    let controller = token_controller.clone();
                    let on_enrolled = on_enrolled.clone();
                    spawn_local(async move {
                        if controller.handle_token(token).await.is_ok() {
                            on_enrolled.emit(());
                        }
                    });
                });
                match configured {
                    Ok(h) => *handler.borrow_mut() = Some(h),
                    Err(err) => controller.fail(&err),
                }
            }
            || ()
        });
    }

    let on_click = {
        let handler = handler.clone();
        let controller = controller.clone();
        Callback::from(move |e: MouseEvent| {
            e.prevent_default();
            if controller.status() == PaymentStatus::Processing {
                return;
            }
            if handler.borrow().is_none() {
                log::warn!("payment form clicked before Stripe Checkout loaded");
                return;
            }
            let Ok(options) = controller.checkout_options() else {
                return;
            };
            let opened = match handler.borrow().as_ref() {
                Some(h) => h.open(&options),
                None => return,
            };
            if let Err(err) = opened {
                controller.fail(&err);
            }
        })
    };

    let status = controller.status();
    let on_close = status.is_dismissable().then(|| {
        let controller = controller.clone();
        Callback::from(move |_: ()| controller.dismiss())
    });

    html! {
        <>
            <a class="btn-labster-regular" id="stripe-button" href="#" onclick={on_click}>
                <i class="fa fa-credit-card"></i>{ "\u{00a0}\u{00a0}Pay with Credit Card" }
            </a>
            if status.is_open() {
                <super::ProgressDialog message={status_message(&status)} {on_close} />
            }
        </>
    }
}
