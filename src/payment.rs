//! Credit card payment for an existing invoice.
//!
//! The widget opens the hosted checkout form with [`checkout_options`],
//! then hands the returned token to [`submit_token`], which charges the
//! payment and enrolls the student, strictly in that order.

use std::cell::RefCell;

use serde::Serialize;

use crate::api::BackofficeApi;
use crate::error::PaymentError;
use crate::model::{ChargeRequest, CheckoutToken, EnrollmentRequest, PaymentSession};

/// Merchant name shown at the top of the hosted form.
pub const ITEM_NAME: &str = "Labster";

/// Convert a major-unit amount to cents, rounding half away from zero on
/// the decimal value (`19.995` → `2000`).
///
/// Works on the shortest decimal representation of `amount`, so binary
/// representation error (`19.995 * 100 == 1999.4999…`) does not leak in.
///
/// # Errors
///
/// Negative, non-finite, or amounts whose cents do not fit in `i64` are
/// rejected with [`PaymentError::InvalidAmount`].
pub fn amount_in_minor_units(amount: f64) -> Result<i64, PaymentError> {
    let invalid = || PaymentError::InvalidAmount(amount.to_string());
    if !amount.is_finite() || amount < 0.0 {
        return Err(invalid());
    }
    let repr = amount.to_string();
    let (whole, frac) = repr.split_once('.').unwrap_or((repr.as_str(), ""));
    let whole: i64 = whole.parse().map_err(|_| invalid())?;

    let mut digits = frac.bytes().map(|b| i64::from(b - b'0'));
    let tens = digits.next().unwrap_or(0);
    let units = digits.next().unwrap_or(0);
    let round_up = digits.next().unwrap_or(0) >= 5;

    whole
        .checked_mul(100)
        .and_then(|cents| cents.checked_add(tens * 10 + units + i64::from(round_up)))
        .ok_or_else(invalid)
}

/// Options for `handler.open(...)` on the hosted form.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct CheckoutOptions {
    pub name: String,
    pub description: String,
    pub amount: i64,
    pub email: String,
}

pub fn checkout_options(session: &PaymentSession) -> Result<CheckoutOptions, PaymentError> {
    Ok(CheckoutOptions {
        name: ITEM_NAME.to_string(),
        description: session.description.clone(),
        amount: amount_in_minor_units(session.amount)?,
        email: session.email.clone(),
    })
}

/// What the progress modal shows.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum PaymentStatus {
    #[default]
    Idle,
    Processing,
    Enrolled,
    Failed(String),
}

impl PaymentStatus {
    pub fn is_open(&self) -> bool {
        !matches!(self, PaymentStatus::Idle)
    }

    /// The modal cannot be closed while the charge is in flight.
    pub fn is_dismissable(&self) -> bool {
        !matches!(self, PaymentStatus::Processing)
    }

    pub fn from_result(result: &Result<(), PaymentError>) -> Self {
        match result {
            Ok(()) => PaymentStatus::Enrolled,
            Err(err) => PaymentStatus::Failed(err.user_message()),
        }
    }
}

/// Charge the card behind `token`, then enroll the student.
pub async fn submit_token<A>(
    api: &A,
    session: &PaymentSession,
    token: CheckoutToken,
) -> Result<(), PaymentError>
where
    A: BackofficeApi + ?Sized,
{
    let charge = ChargeRequest {
        stripe_token: token.id,
    };
    api.charge_stripe(&session.payment_id, &charge)
        .await
        .map_err(|err| {
            log::error!("charge for payment {} failed: {}", session.payment_id, err);
            PaymentError::Charge(err)
        })?;
    log::info!("payment {} charged", session.payment_id);

    let enrollment = EnrollmentRequest {
        course_id: session.course_id.clone(),
        payment_id: session.payment_id.clone(),
        email: session.email.clone(),
    };
    api.enroll_student(&enrollment).await.map_err(|err| {
        log::error!(
            "enrollment in {} after payment {} failed: {}",
            session.course_id,
            session.payment_id,
            err
        );
        PaymentError::Enrollment(err)
    })?;
    log::info!("enrolled in {} for payment {}", session.course_id, session.payment_id);
    Ok(())
}

/// Payment widget state bound to one [`PaymentSession`].
///
/// Methods take `&self` so the widget can share the controller with its
/// async tasks; the status borrow is never held across an `await`.
pub struct PaymentController<A> {
    api: A,
    session: PaymentSession,
    status: RefCell<PaymentStatus>,
    on_change: Option<Box<dyn Fn()>>,
}

impl<A: BackofficeApi> PaymentController<A> {
    pub fn new(api: A, session: PaymentSession) -> Self {
        Self {
            api,
            session,
            status: RefCell::new(PaymentStatus::Idle),
            on_change: None,
        }
    }

    /// Run `f` after every status change, e.g. to re-render.
    pub fn on_change(mut self, f: impl Fn() + 'static) -> Self {
        self.on_change = Some(Box::new(f));
        self
    }

    fn set_status(&self, status: PaymentStatus) {
        *self.status.borrow_mut() = status;
        if let Some(notify) = &self.on_change {
            notify();
        }
    }

    pub fn status(&self) -> PaymentStatus {
        self.status.borrow().clone()
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Options for the hosted form. An unusable amount fails the widget.
    pub fn checkout_options(&self) -> Result<CheckoutOptions, PaymentError> {
        checkout_options(&self.session).map_err(|err| {
            self.fail(&err);
            err
        })
    }

    pub fn fail(&self, err: &PaymentError) {
        log::error!("{}", err);
        self.set_status(PaymentStatus::Failed(err.user_message()));
    }

    /// Close the progress dialog unless a charge is in flight.
    pub fn dismiss(&self) {
        if self.status.borrow().is_dismissable() {
            self.set_status(PaymentStatus::Idle);
        }
    }

    pub async fn handle_token(&self, token: CheckoutToken) -> Result<(), PaymentError> {
        self.set_status(PaymentStatus::Processing);
        let result = submit_token(&self.api, &self.session, token).await;
        self.set_status(PaymentStatus::from_result(&result));
        result
    }
}
