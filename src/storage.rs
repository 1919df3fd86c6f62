//! Access to the purchase draft left in local storage by the license picker.

use gloo_storage::{errors::StorageError as GlooStorageError, LocalStorage, Storage};

use crate::error::StorageError;
use crate::model::PurchaseDraft;

pub const DRAFT_KEY: &str = "paymentStorage";

pub trait DraftStore {
    fn load(&self) -> Result<PurchaseDraft, StorageError>;
    fn clear(&self);
}

/// `window.localStorage` under [`DRAFT_KEY`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LocalDraftStore;

impl DraftStore for LocalDraftStore {
    fn load(&self) -> Result<PurchaseDraft, StorageError> {
        LocalStorage::get::<PurchaseDraft>(DRAFT_KEY).map_err(|err| match err {
            GlooStorageError::KeyNotFound(key) => StorageError::Missing(key),
            other => StorageError::Decode(other.to_string()),
        })
    }

    fn clear(&self) {
        LocalStorage::delete(DRAFT_KEY);
    }
}
