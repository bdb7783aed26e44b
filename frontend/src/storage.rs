use web_sys::Storage;

use neurocom_client::{AUTH_TOKEN_KEY, TokenStore};

/// Keeps the auth token in `localStorage`, so a reload can restore the session.
#[derive(Debug, Default)]
pub struct BrowserTokenStore;

fn local_storage() -> Option<Storage> {
    web_sys::window()?.local_storage().ok().flatten()
}

impl TokenStore for BrowserTokenStore {
    fn token(&self) -> Option<String> {
        local_storage()?
            .get_item(AUTH_TOKEN_KEY)
            .ok()
            .flatten()
            .filter(|t| !t.is_empty())
    }

    fn set_token(&self, token: &str) {
        match local_storage() {
            Some(storage) => {
                if storage.set_item(AUTH_TOKEN_KEY, token).is_err() {
                    log::warn!("Failed to persist auth token");
                }
            }
            None => log::warn!("localStorage unavailable, token not persisted"),
        }
    }

    fn clear_token(&self) {
        if let Some(storage) = local_storage() {
            let _ = storage.remove_item(AUTH_TOKEN_KEY);
        }
    }
}
