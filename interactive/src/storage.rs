use memeshare_sync::{Error, KeyValueStore, Result};
use web_sys::{window, Storage};

use crate::api::js_error;

/// Browser `localStorage`, looked up on every call.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalStorage;

fn storage() -> Result<Storage> {
    window()
        .ok_or_else(|| Error::Unavailable("window".into()))?
        .local_storage()
        .map_err(|e| Error::Unavailable(js_error(e)))?
        .ok_or_else(|| Error::Unavailable("localStorage".into()))
}

impl KeyValueStore for LocalStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        storage().ok()?.get_item(key).ok()?
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        storage()?
            .set_item(key, value)
            .map_err(|e| Error::Unavailable(js_error(e)))
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        storage()?
            .remove_item(key)
            .map_err(|e| Error::Unavailable(js_error(e)))
    }
}
