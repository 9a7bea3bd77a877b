//! Session persistence across page reloads.
//!
//! On the web the session is kept in `localStorage`; elsewhere it only lives for the
//! lifetime of the process.

use std::cell::RefCell;
use std::rc::Rc;

use crate::models::Session;

/// Key under which the serialized session is stored.
pub const SESSION_STORAGE_KEY: &str = "fitgallery.auth.session";

/// Load/save/clear of the current session.
#[derive(Clone, Debug, Default)]
pub struct SessionPersistence {
    #[cfg_attr(target_arch = "wasm32", allow(dead_code))]
    memory: Rc<RefCell<Option<String>>>,
}

impl SessionPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self) -> Option<Session> {
        let raw = self.read()?;
        match serde_json::from_str(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!("Discarding unreadable stored session: {}", e);
                self.clear();
                None
            }
        }
    }

    pub fn save(&self, session: &Session) {
        match serde_json::to_string(session) {
            Ok(raw) => self.write(Some(raw)),
            Err(e) => tracing::error!("Failed to serialize session: {}", e),
        }
    }

    pub fn clear(&self) {
        self.write(None);
    }

    #[cfg(target_arch = "wasm32")]
    fn read(&self) -> Option<String> {
        local_storage()?.get_item(SESSION_STORAGE_KEY).ok().flatten()
    }

    #[cfg(target_arch = "wasm32")]
    fn write(&self, value: Option<String>) {
        let Some(storage) = local_storage() else {
            return;
        };
        let result = match value {
            Some(raw) => storage.set_item(SESSION_STORAGE_KEY, &raw),
            None => storage.remove_item(SESSION_STORAGE_KEY),
        };
        if result.is_err() {
            tracing::warn!("localStorage rejected session update");
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn read(&self) -> Option<String> {
        self.memory.borrow().clone()
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn write(&self, value: Option<String>) {
        *self.memory.borrow_mut() = value;
    }
}

#[cfg(target_arch = "wasm32")]
fn local_storage() -> Option<web_sys::Storage> {
    web_sys::window()?.local_storage().ok().flatten()
}
