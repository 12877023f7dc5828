//! Persisted UI state stores.
//!
//! A [`Store`] holds one piece of state (such as [`MailLayout`]) and writes it
//! back to a [`KeyValueStore`] after every change, under the state's
//! [`Persisted::STORE_ID`]. Missing or unreadable saved state falls back to
//! defaults.

mod model;
mod repository;

pub use model::{
    DEFAULT_INBOX_WIDTH, DEFAULT_SIDEBAR_WIDTH, MAX_ZOOM, MIN_PANE_WIDTH, MIN_ZOOM, MailLayout,
    ScreenSize, SearchState, ZOOM_STEP,
};
pub use repository::{FileStore, KeyValueStore, MemoryStore, PREFERENCES_FILE};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::Result;

/// State that can be saved in a [`KeyValueStore`].
pub trait Persisted: Serialize + DeserializeOwned + Default {
    /// Key the state is saved under.
    const STORE_ID: &'static str;
}

/// A piece of persisted state.
#[derive(Debug)]
pub struct Store<T, S> {
    state: T,
    backend: S,
}

impl<T, S> Store<T, S>
where
    T: Persisted,
    S: KeyValueStore,
{
    /// Loads the state from `backend`, or uses defaults.
    ///
    /// Unreadable or malformed saved state is logged and ignored.
    pub fn load(backend: S) -> Self {
        let state = match backend.load(T::STORE_ID) {
            Ok(Some(value)) => serde_json::from_value(value).unwrap_or_else(|e| {
                warn!(store = T::STORE_ID, %e, "ignoring malformed saved state");
                T::default()
            }),
            Ok(None) => T::default(),
            Err(e) => {
                warn!(store = T::STORE_ID, %e, "failed to read saved state");
                T::default()
            }
        };

        Self { state, backend }
    }

    /// Returns the current state.
    pub const fn get(&self) -> &T {
        &self.state
    }

    /// Applies `f` to the state and saves the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be saved. The in-memory change is
    /// kept either way.
    pub fn update(&mut self, f: impl FnOnce(&mut T)) -> Result<()> {
        f(&mut self.state);
        self.persist()
    }

    /// Restores the defaults and removes the saved state.
    ///
    /// # Errors
    ///
    /// Returns an error if the saved state cannot be removed.
    pub fn reset(&mut self) -> Result<()> {
        self.state = T::default();
        self.backend.remove(T::STORE_ID)
    }

    /// Returns the backend.
    pub const fn backend(&self) -> &S {
        &self.backend
    }

    fn persist(&self) -> Result<()> {
        let value = serde_json::to_value(&self.state)?;
        self.backend.save(T::STORE_ID, value)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_load_defaults_when_missing() {
        let store: Store<MailLayout, _> = Store::load(MemoryStore::new());
        assert_eq!(store.get(), &MailLayout::default());
    }

    #[test]
    fn test_update_persists() {
        let mut store: Store<SearchState, _> = Store::load(MemoryStore::new());
        store.update(|s| s.query = "invoice".to_string()).unwrap();

        assert_eq!(
            store.backend().load("search").unwrap(),
            Some(json!({"query": "invoice"}))
        );
    }

    #[test]
    fn test_state_survives_reload() {
        let backend = MemoryStore::new();
        backend
            .save("mailLayout", json!({"inboxWidth": 420, "sidebarCollapsed": true}))
            .unwrap();

        let store: Store<MailLayout, _> = Store::load(backend);
        assert_eq!(store.get().inbox_width, 420);
        assert!(store.get().sidebar_collapsed);
        assert_eq!(store.get().sidebar_width, DEFAULT_SIDEBAR_WIDTH);
    }

    #[test]
    fn test_malformed_state_falls_back_to_defaults() {
        let backend = MemoryStore::new();
        backend.save("search", json!({"query": 42})).unwrap();

        let store: Store<SearchState, _> = Store::load(backend);
        assert_eq!(store.get(), &SearchState::default());
    }

    #[test]
    fn test_reset() {
        let mut store: Store<MailLayout, _> = Store::load(MemoryStore::new());
        store.update(MailLayout::toggle_sidebar).unwrap();
        assert!(store.get().sidebar_collapsed);

        store.reset().unwrap();
        assert_eq!(store.get(), &MailLayout::default());
        assert_eq!(store.backend().load("mailLayout").unwrap(), None);
    }

    #[test]
    fn test_stores_share_backend_by_reference() {
        let backend = MemoryStore::new();
        let mut layout: Store<MailLayout, _> = Store::load(&backend);
        let mut search: Store<SearchState, _> = Store::load(&backend);

        layout.update(|l| l.set_zoom(1.5)).unwrap();
        search.update(|s| s.query = "x".to_string()).unwrap();

        assert!(backend.load("mailLayout").unwrap().is_some());
        assert!(backend.load("search").unwrap().is_some());
    }
}
