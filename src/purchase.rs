//! Second step of the license purchase: billing details, VAT, and order
//! submission.
//!
//! [`PurchaseState`] is the form state and its synchronous transitions.
//! [`submit_purchase`] runs the two backoffice calls in order. The
//! [`PurchaseController`] ties both to a [`BackofficeApi`] and a
//! [`DraftStore`]; the Yew form drives the same pieces step by step so no
//! state is borrowed across an `await`.

use std::cell::{Ref, RefCell};

use crate::api::BackofficeApi;
use crate::config::SessionContext;
use crate::error::PurchaseError;
use crate::model::{
    build_line_items, Country, CountryList, DuplicateLabsRequest, InstitutionType,
    LabSelection, PaymentMethod, PurchaseDraft, PurchaseOrder, VatTable,
};
use crate::storage::DraftStore;
use crate::vat;

#[derive(Clone, Debug, PartialEq, Default)]
pub struct PurchaseState {
    pub labs: Vec<LabSelection>,
    pub sub_total_price: f64,
    pub total_price: f64,
    pub tax: f64,

    pub institution_type: InstitutionType,
    pub institution_name: String,
    pub vat_number: String,
    pub vat_error: String,
    pub institution_error: String,

    pub countries: Vec<Country>,
    pub vat_table: VatTable,
    pub country: Option<Country>,
    pub is_eu_country: bool,
    pub is_denmark: bool,

    pub is_processing: bool,
    pub loading_cc: bool,
    pub loading_man: bool,
    /// Last failed request, shown above the purchase buttons.
    pub request_error: Option<String>,
}

/// Index of the country whose code matches `code`, else the first entry.
pub fn select_default_country(countries: &[Country], code: Option<&str>) -> Option<usize> {
    if countries.is_empty() {
        return None;
    }
    let matched = code.and_then(|code| {
        countries
            .iter()
            .position(|c| c.code.eq_ignore_ascii_case(code.trim()))
    });
    Some(matched.unwrap_or(0))
}

pub fn invoice_path(payment_id: i64) -> String {
    format!("/invoice/{}", payment_id)
}

impl PurchaseState {
    pub fn new(session: &SessionContext, draft: PurchaseDraft) -> Self {
        Self {
            labs: draft.labs,
            sub_total_price: draft.sub_total_price,
            total_price: draft.total_price,
            institution_name: session.organization_name.clone(),
            ..Self::default()
        }
    }

    pub fn apply_countries(&mut self, list: CountryList, default_country: Option<&str>) {
        self.country = select_default_country(&list.countries, default_country)
            .map(|idx| list.countries[idx].clone());
        self.countries = list.countries;
        self.vat_table = list.countries_vat;
        self.check_vat();
    }

    pub fn check_vat(&mut self) {
        let result = vat::check_vat(
            self.country.as_ref(),
            self.sub_total_price,
            self.institution_type,
            &self.vat_table,
        );
        self.total_price = result.total_price;
        self.tax = result.vat;
        self.is_eu_country = result.is_eu_country;
        self.is_denmark = result.is_denmark;
    }

    pub fn set_institution_type(&mut self, institution_type: InstitutionType) {
        self.institution_type = institution_type;
        self.check_vat();
    }

    /// Unknown ids leave the selection unchanged.
    pub fn set_country_by_id(&mut self, id: i64) {
        if let Some(country) = self.countries.iter().find(|c| c.id == id) {
            self.country = Some(country.clone());
            self.check_vat();
        }
    }

    pub fn set_institution_name(&mut self, name: String) {
        self.institution_name = name;
    }

    pub fn set_vat_number(&mut self, vat_number: String) {
        self.vat_number = vat_number;
    }

    /// Validate the form, raise the loading flags and build the order.
    ///
    /// Organizational buyers must pass both field checks; individuals are
    /// exempt. Nothing is sent when this returns an error.
    pub fn begin_purchase(
        &mut self,
        session: &SessionContext,
        method: PaymentMethod,
    ) -> Result<PurchaseOrder, PurchaseError> {
        self.is_processing = true;
        self.request_error = None;

        if self.institution_type == InstitutionType::Individual {
            self.vat_error.clear();
            self.institution_error.clear();
        } else {
            self.vat_error = vat::check_vat_format(&self.vat_number);
            self.institution_error = vat::check_institution(&self.institution_name);
        }

        if !self.vat_error.is_empty() || !self.institution_error.is_empty() {
            self.is_processing = false;
            self.request_error = Some(PurchaseError::Validation.user_message());
            return Err(PurchaseError::Validation);
        }

        let Some(country_id) = self.country.as_ref().map(|c| c.id) else {
            self.is_processing = false;
            self.request_error = Some(PurchaseError::MissingCountry.user_message());
            return Err(PurchaseError::MissingCountry);
        };

        match method {
            PaymentMethod::Manual => self.loading_man = true,
            PaymentMethod::CreditCard => self.loading_cc = true,
        }

        Ok(PurchaseOrder {
            user: session.user_id,
            is_teacher: true,
            payment_type: method,
            institution_type: self.institution_type,
            institution_name: self.institution_name.clone(),
            country: country_id,
            total_before_tax: self.sub_total_price,
            vat_number: self.vat_number.clone(),
            list_product: build_line_items(&self.labs),
        })
    }

    /// Drop the busy flags once [`submit_purchase`] has settled.
    ///
    /// On success the flags stay up while the page navigates away.
    pub fn finish_purchase(&mut self, result: &Result<String, PurchaseError>) {
        if let Err(err) = result {
            self.is_processing = false;
            self.loading_cc = false;
            self.loading_man = false;
            self.request_error = Some(err.user_message());
        }
    }
}

/// Place the order, then activate the purchased licenses.
///
/// Returns the invoice path to navigate to. The duplicate-labs call is only
/// made after the order call succeeded, and its failure blocks navigation.
pub async fn submit_purchase<A>(
    api: &A,
    session: &SessionContext,
    order: &PurchaseOrder,
) -> Result<String, PurchaseError>
where
    A: BackofficeApi + ?Sized,
{
    let receipt = api.buy_labs(order).await.map_err(|err| {
        log::error!("purchase request failed: {}", err);
        PurchaseError::Purchase(err)
    })?;
    log::info!("purchase {} created", receipt.id);

    let request =
        DuplicateLabsRequest::new(&order.list_product, receipt.id, &session.backoffice_token);
    api.duplicate_labs(&request).await.map_err(|err| {
        log::error!("license activation for purchase {} failed: {}", receipt.id, err);
        PurchaseError::DuplicateLabs {
            payment_id: receipt.id,
            source: err,
        }
    })?;

    Ok(invoice_path(receipt.id))
}

/// Whole purchase step driven against its collaborators.
///
/// Methods take `&self` so the form can share the controller with its
/// async tasks. State borrows are released before every `await` and
/// before `on_change` runs.
pub struct PurchaseController<A, S> {
    api: A,
    store: S,
    session: SessionContext,
    state: RefCell<PurchaseState>,
    on_change: Option<Box<dyn Fn()>>,
}

impl<A: BackofficeApi, S: DraftStore> PurchaseController<A, S> {
    pub fn new(api: A, store: S, session: SessionContext) -> Self {
        Self {
            api,
            store,
            session,
            state: RefCell::new(PurchaseState::default()),
            on_change: None,
        }
    }

    /// Run `f` after every state change, e.g. to re-render.
    pub fn on_change(mut self, f: impl Fn() + 'static) -> Self {
        self.on_change = Some(Box::new(f));
        self
    }

    pub fn state(&self) -> Ref<'_, PurchaseState> {
        self.state.borrow()
    }

    /// Apply `f` to the form state and announce the change.
    pub fn update<R>(&self, f: impl FnOnce(&mut PurchaseState) -> R) -> R {
        let out = f(&mut self.state.borrow_mut());
        if let Some(notify) = &self.on_change {
            notify();
        }
        out
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Load the draft and the country list, then select the home country.
    pub async fn initialize(&self) -> Result<(), PurchaseError> {
        let draft = match self.store.load() {
            Ok(draft) => draft,
            Err(err) => {
                log::warn!("{}", err);
                let err = PurchaseError::from(err);
                self.update(|s| s.request_error = Some(err.user_message()));
                return Err(err);
            }
        };
        self.update(|s| *s = PurchaseState::new(&self.session, draft));

        match self.api.countries().await {
            Ok(list) => {
                self.update(|s| {
                    s.apply_countries(list, self.session.default_country.as_deref())
                });
                Ok(())
            }
            Err(err) => {
                log::warn!("country list unavailable: {}", err);
                let err = PurchaseError::Countries(err);
                self.update(|s| s.request_error = Some(err.user_message()));
                Err(err)
            }
        }
    }

    pub fn check_vat(&self) {
        self.update(PurchaseState::check_vat);
    }

    /// Submit the order. On success the draft is discarded and the invoice
    /// path returned.
    pub async fn buy_labs(&self, method: PaymentMethod) -> Result<String, PurchaseError> {
        let order = self.update(|s| s.begin_purchase(&self.session, method))?;
        let result = submit_purchase(&self.api, &self.session, &order).await;
        self.update(|s| s.finish_purchase(&result));
        if result.is_ok() {
            self.store.clear();
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use futures::executor::block_on;

    use super::*;
    use crate::api::fake::{Call, FakeApi};
    use crate::error::StorageError;
    use crate::model::{LabKind, PackageMember};

    struct MemoryStore {
        draft: Option<PurchaseDraft>,
        cleared: Cell<bool>,
    }

    impl DraftStore for MemoryStore {
        fn load(&self) -> Result<PurchaseDraft, StorageError> {
            self.draft
                .clone()
                .ok_or_else(|| StorageError::Missing("paymentStorage".into()))
        }

        fn clear(&self) {
            self.cleared.set(true);
        }
    }

    fn session(default_country: Option<&str>) -> SessionContext {
        SessionContext {
            user_id: 5,
            backoffice_token: "bo".into(),
            user_token: "lms".into(),
            organization_name: String::new(),
            default_country: default_country.map(String::from),
        }
    }

    fn country(id: i64, code: &str) -> Country {
        Country {
            id,
            code: code.into(),
            name: code.into(),
        }
    }

    fn country_list() -> CountryList {
        CountryList {
            countries: vec![country(1, "US"), country(2, "DK"), country(3, "DE")],
            countries_vat: [("DK".to_string(), 25.0), ("DE".to_string(), 19.0)]
                .into_iter()
                .collect(),
        }
    }

    fn draft() -> PurchaseDraft {
        PurchaseDraft {
            labs: vec![
                LabSelection {
                    id: 10,
                    license: 3,
                    month_subscription: 12,
                    kind: LabKind::Individual { external_id: 1001 },
                },
                LabSelection {
                    id: 20,
                    license: 2,
                    month_subscription: 6,
                    kind: LabKind::Package {
                        products: vec![
                            PackageMember { external_id: 2001 },
                            PackageMember { external_id: 2002 },
                        ],
                    },
                },
            ],
            sub_total_price: 100.0,
            total_price: 100.0,
        }
    }

    fn controller(
        api: FakeApi,
        default_country: Option<&str>,
    ) -> PurchaseController<FakeApi, MemoryStore> {
        let store = MemoryStore {
            draft: Some(draft()),
            cleared: Cell::new(false),
        };
        PurchaseController::new(api, store, session(default_country))
    }

    fn api() -> FakeApi {
        FakeApi {
            countries: Some(country_list()),
            receipt_id: 314,
            ..FakeApi::default()
        }
    }

    #[test]
    fn home_country_is_selected_by_code() {
        let countries = country_list().countries;
        assert_eq!(select_default_country(&countries, Some("dk")), Some(1));
        assert_eq!(select_default_country(&countries, Some("FR")), Some(0));
        assert_eq!(select_default_country(&countries, None), Some(0));
        assert_eq!(select_default_country(&[], Some("DK")), None);
    }

    #[test]
    fn initialize_loads_draft_and_countries() {
        let ctl = controller(api(), Some("DK"));
        block_on(ctl.initialize()).unwrap();
        let state = ctl.state();
        assert_eq!(state.labs.len(), 2);
        assert_eq!(state.country.as_ref().map(|c| c.id), Some(2));
        assert!(state.is_denmark);
        assert_eq!(state.tax, 25.0);
        assert_eq!(state.total_price, 125.0);
    }

    #[test]
    fn initialize_without_draft_fails() {
        let store = MemoryStore {
            draft: None,
            cleared: Cell::new(false),
        };
        let ctl = PurchaseController::new(api(), store, session(None));
        let err = block_on(ctl.initialize()).unwrap_err();
        assert!(matches!(err, PurchaseError::Storage(StorageError::Missing(_))));
        assert!(ctl.api().calls().is_empty());
    }

    #[test]
    fn country_failure_is_reported() {
        let ctl = controller(FakeApi::default(), None);
        let err = block_on(ctl.initialize()).unwrap_err();
        assert!(matches!(err, PurchaseError::Countries(_)));
        assert!(ctl.state().request_error.is_some());
    }

    #[test]
    fn every_state_change_is_announced() {
        let seen = Rc::new(Cell::new(0));
        let counter = seen.clone();
        let ctl = controller(api(), None).on_change(move || counter.set(counter.get() + 1));
        block_on(ctl.initialize()).unwrap();
        assert_eq!(seen.get(), 2);
        ctl.check_vat();
        assert_eq!(seen.get(), 3);
        block_on(ctl.buy_labs(PaymentMethod::CreditCard)).unwrap();
        assert_eq!(seen.get(), 5);
    }

    #[test]
    fn changing_institution_type_recomputes_vat() {
        let ctl = controller(api(), Some("DE"));
        block_on(ctl.initialize()).unwrap();
        assert_eq!(ctl.state().tax, 19.0);
        ctl.update(|s| s.set_institution_type(InstitutionType::Organization));
        assert_eq!(ctl.state().tax, 0.0);
        ctl.update(|s| s.set_country_by_id(2));
        assert_eq!(ctl.state().tax, 25.0);
    }

    #[test]
    fn individual_buyer_skips_validation() {
        let ctl = controller(api(), None);
        block_on(ctl.initialize()).unwrap();
        ctl.update(|s| s.vat_error = "stale".into());
        let path = block_on(ctl.buy_labs(PaymentMethod::CreditCard)).unwrap();
        assert_eq!(path, "/invoice/314");
        assert!(ctl.state().vat_error.is_empty());
        assert!(ctl.state().institution_error.is_empty());
        assert!(ctl.state().loading_cc);
        assert!(!ctl.state().loading_man);
        assert!(ctl.store.cleared.get());
    }

    #[test]
    fn organization_with_bad_vat_is_blocked() {
        let ctl = controller(api(), None);
        block_on(ctl.initialize()).unwrap();
        ctl.update(|s| s.set_institution_type(InstitutionType::Organization));
        ctl.update(|s| s.set_institution_name("Aarhus University".into()));
        ctl.update(|s| s.set_vat_number("123".into()));

        let err = block_on(ctl.buy_labs(PaymentMethod::Manual)).unwrap_err();
        assert_eq!(err, PurchaseError::Validation);
        assert!(!ctl.state().vat_error.is_empty());
        assert!(!ctl.state().is_processing);
        assert!(!ctl.state().loading_man);
        assert_eq!(
            ctl.state().request_error.as_deref(),
            Some("Please correct the highlighted fields.")
        );
        assert_eq!(ctl.api().calls(), vec![Call::Countries]);

        ctl.update(|s| s.set_vat_number("DK12345678".into()));
        block_on(ctl.buy_labs(PaymentMethod::Manual)).unwrap();
        assert!(ctl.state().vat_error.is_empty());
        assert_eq!(ctl.state().request_error, None);
    }

    #[test]
    fn organization_without_name_is_blocked() {
        let ctl = controller(api(), None);
        block_on(ctl.initialize()).unwrap();
        ctl.update(|s| s.set_institution_type(InstitutionType::Organization));
        ctl.update(|s| s.set_vat_number("DK12345678".into()));

        let err = block_on(ctl.buy_labs(PaymentMethod::Manual)).unwrap_err();
        assert_eq!(err, PurchaseError::Validation);
        assert!(ctl.state().vat_error.is_empty());
        assert!(!ctl.state().institution_error.is_empty());
        assert_eq!(ctl.api().calls().len(), 1);
    }

    #[test]
    fn valid_organization_order_is_sent() {
        let ctl = controller(api(), Some("DE"));
        block_on(ctl.initialize()).unwrap();
        ctl.update(|s| s.set_institution_type(InstitutionType::Organization));
        ctl.update(|s| s.set_institution_name("Aarhus University".into()));
        ctl.update(|s| s.set_vat_number("DE123456789".into()));

        block_on(ctl.buy_labs(PaymentMethod::Manual)).unwrap();
        assert!(ctl.state().loading_man);

        let calls = ctl.api().calls();
        let Call::BuyLabs(order) = &calls[1] else {
            panic!("expected purchase call, got {:?}", calls[1]);
        };
        assert_eq!(order.user, 5);
        assert_eq!(order.country, 3);
        assert_eq!(order.institution_type, InstitutionType::Organization);
        assert_eq!(order.payment_type, PaymentMethod::Manual);
        assert_eq!(order.total_before_tax, 100.0);
        assert_eq!(order.list_product.len(), 2);
        assert_eq!(order.list_product[0].item_count(), 3);
        assert_eq!(order.list_product[0].labster_labs(), &[1001]);
        assert_eq!(order.list_product[1].labster_labs(), &[2001, 2002]);
    }

    #[test]
    fn duplicate_follows_purchase_success() {
        let ctl = controller(api(), None);
        block_on(ctl.initialize()).unwrap();
        block_on(ctl.buy_labs(PaymentMethod::CreditCard)).unwrap();

        let calls = ctl.api().calls();
        assert_eq!(calls.len(), 3);
        assert!(matches!(calls[1], Call::BuyLabs(_)));
        let Call::DuplicateLabs(req) = &calls[2] else {
            panic!("expected duplicate call, got {:?}", calls[2]);
        };
        assert_eq!(req.payment_id, 314);
        assert_eq!(req.token, "bo");
        assert_eq!(req.labs.len(), 3);
    }

    #[test]
    fn failed_purchase_never_duplicates() {
        let ctl = controller(
            FakeApi {
                fail_buy: true,
                ..api()
            },
            None,
        );
        block_on(ctl.initialize()).unwrap();
        let err = block_on(ctl.buy_labs(PaymentMethod::CreditCard)).unwrap_err();
        assert!(matches!(err, PurchaseError::Purchase(_)));
        assert!(!ctl
            .api()
            .calls()
            .iter()
            .any(|c| matches!(c, Call::DuplicateLabs(_))));
        assert!(!ctl.state().is_processing);
        assert!(!ctl.state().loading_cc);
        assert!(ctl.state().request_error.is_some());
        assert!(!ctl.store.cleared.get());
    }

    #[test]
    fn failed_duplicate_blocks_navigation() {
        let ctl = controller(
            FakeApi {
                fail_duplicate: true,
                ..api()
            },
            None,
        );
        block_on(ctl.initialize()).unwrap();
        let err = block_on(ctl.buy_labs(PaymentMethod::CreditCard)).unwrap_err();
        assert!(matches!(err, PurchaseError::DuplicateLabs { payment_id: 314, .. }));
        assert!(ctl
            .state()
            .request_error
            .as_deref()
            .unwrap_or_default()
            .contains("#314"));
        assert!(!ctl.store.cleared.get());
    }
}
