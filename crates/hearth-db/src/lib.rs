pub mod artifact;
pub mod error;
pub mod migrations;
pub mod queries;
pub mod sessions;
pub mod special_users;
pub mod state;

use std::sync::Mutex;

pub use artifact::SnapshotArtifact;
pub use error::{StoreError, StoreResult};
pub use sessions::SessionIndex;
pub use state::StoreState;

/// The shared record store. All state sits behind one mutex, so every
/// closure passed to [`Store::with_state_mut`] or [`Store::transaction`]
/// runs as a single serialized unit.
pub struct Store {
    state: Mutex<StoreState>,
}

impl Store {
    pub fn new() -> Self {
        Self::from_state(StoreState::default())
    }

    pub fn from_state(state: StoreState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn with_state<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&StoreState) -> T,
    {
        let state = self
            .state
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        Ok(f(&state))
    }

    pub fn with_state_mut<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut StoreState) -> T,
    {
        let mut state = self
            .state
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        Ok(f(&mut state))
    }

    /// Run a fallible multi-step update under the store lock. The closure
    /// must validate before it mutates: nothing is rolled back on `Err`.
    pub fn transaction<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut StoreState) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut state = self
            .state
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        f(&mut state)
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}
