//! Backoffice HTTP collaborators.
//!
//! Controllers only see [`BackofficeApi`]; [`HttpBackofficeApi`] is the
//! browser implementation on top of `gloo-net`.

use async_trait::async_trait;
use gloo_net::http::{Request, Response};
use serde::de::DeserializeOwned;

use crate::config::{BackofficeUrls, SessionContext};
use crate::error::ApiError;
use crate::model::{
    ChargeRequest, CountryList, DuplicateLabsRequest, EnrollmentRequest, PurchaseOrder,
    PurchaseReceipt,
};

#[async_trait(?Send)]
pub trait BackofficeApi {
    async fn countries(&self) -> Result<CountryList, ApiError>;

    async fn buy_labs(&self, order: &PurchaseOrder) -> Result<PurchaseReceipt, ApiError>;

    async fn duplicate_labs(&self, request: &DuplicateLabsRequest) -> Result<(), ApiError>;

    async fn charge_stripe(
        &self,
        payment_id: &str,
        request: &ChargeRequest,
    ) -> Result<(), ApiError>;

    async fn enroll_student(&self, request: &EnrollmentRequest) -> Result<(), ApiError>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct HttpBackofficeApi {
    urls: BackofficeUrls,
    session: SessionContext,
}

fn token_header(token: &str) -> String {
    format!("Token {}", token)
}

/// Turn a non-2xx response into [`ApiError::Status`].
async fn ensure_ok(resp: Response) -> Result<Response, ApiError> {
    if resp.ok() {
        return Ok(resp);
    }
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    Err(ApiError::Status { status, body })
}

async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    let resp = ensure_ok(resp).await?;
    resp.json::<T>()
        .await
        .map_err(|e| ApiError::Decode(e.to_string()))
}

impl HttpBackofficeApi {
    pub fn new(urls: BackofficeUrls, session: SessionContext) -> Self {
        Self { urls, session }
    }
}

#[async_trait(?Send)]
impl BackofficeApi for HttpBackofficeApi {
    async fn countries(&self) -> Result<CountryList, ApiError> {
        log::debug!("GET {}", self.urls.country);
        let resp = Request::get(&self.urls.country).send().await?;
        read_json(resp).await
    }

    async fn buy_labs(&self, order: &PurchaseOrder) -> Result<PurchaseReceipt, ApiError> {
        log::debug!(
            "POST {} with {} line items",
            self.urls.buy_lab,
            order.list_product.len()
        );
        let resp = Request::post(&self.urls.buy_lab)
            .header("Authorization", &token_header(&self.session.backoffice_token))
            .json(order)?
            .send()
            .await?;
        read_json(resp).await
    }

    async fn duplicate_labs(&self, request: &DuplicateLabsRequest) -> Result<(), ApiError> {
        log::debug!(
            "POST {} for payment {}",
            self.urls.duplicate_labs,
            request.payment_id
        );
        let resp = Request::post(&self.urls.duplicate_labs)
            .header("Authorization", &token_header(&self.session.user_token))
            .json(request)?
            .send()
            .await?;
        ensure_ok(resp).await.map(|_| ())
    }

    async fn charge_stripe(
        &self,
        payment_id: &str,
        request: &ChargeRequest,
    ) -> Result<(), ApiError> {
        let url = self.urls.charge_url(payment_id);
        log::debug!("POST {}", url);
        let resp = Request::post(&url)
            .header("Authorization", &token_header(&self.session.backoffice_token))
            .json(request)?
            .send()
            .await?;
        ensure_ok(resp).await.map(|_| ())
    }

    async fn enroll_student(&self, request: &EnrollmentRequest) -> Result<(), ApiError> {
        log::debug!(
            "POST {} for course {}",
            self.urls.enroll,
            request.course_id
        );
        let resp = Request::post(&self.urls.enroll)
            .header("Authorization", &token_header(&self.session.user_token))
            .json(request)?
            .send()
            .await?;
        ensure_ok(resp).await.map(|_| ())
    }
}
