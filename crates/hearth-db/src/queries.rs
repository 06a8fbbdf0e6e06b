use tracing::{debug, info};

use hearth_types::api::StoreStats;
use hearth_types::models::{Kind, MessageRecord, Record};

use crate::error::{StoreError, StoreResult};
use crate::state::StoreState;
use crate::Store;

impl Store {
    // -- Ids --

    pub fn allocate_id(&self, kind: Kind) -> StoreResult<u64> {
        self.with_state_mut(|state| state.allocate_id(kind))
    }

    // -- Reads (always copies) --

    /// Every record of `kind`, in insertion order. Changing the returned
    /// vector has no effect on the store.
    pub fn get_all(&self, kind: Kind) -> StoreResult<Vec<Record>> {
        self.with_state(|state| state.records(kind).to_vec())
    }

    pub fn get_by_id(&self, kind: Kind, id: u64) -> StoreResult<Option<Record>> {
        self.with_state(|state| state.find(kind, id).cloned())
    }

    // -- Writes --

    /// Replace the record with `id`. Returns false (and writes nothing) when
    /// no such record exists.
    pub fn replace_by_id(&self, kind: Kind, id: u64, record: Record) -> StoreResult<bool> {
        self.transaction(|state| state.replace(kind, id, record))
    }

    /// Read-modify-write a single record in one critical section.
    pub fn update_by_id<F>(&self, kind: Kind, id: u64, f: F) -> StoreResult<bool>
    where
        F: FnOnce(&mut Record),
    {
        self.transaction(|state| {
            let Some(record) = state.find_mut(kind, id) else {
                return Ok(false);
            };
            let mut updated = record.clone();
            f(&mut updated);
            if updated.kind() != kind || updated.id() != id {
                return Err(StoreError::KindMismatch {
                    expected: kind,
                    found: updated.kind(),
                });
            }
            *record = updated;
            Ok(true)
        })
    }

    pub fn append(&self, kind: Kind, record: Record) -> StoreResult<()> {
        if record.kind() != kind {
            return Err(StoreError::KindMismatch {
                expected: kind,
                found: record.kind(),
            });
        }
        self.transaction(|state| state.push(record))
    }

    pub fn remove(&self, kind: Kind, record: &Record) -> StoreResult<bool> {
        self.transaction(|state| state.remove(kind, record))
    }

    pub fn set_all(&self, kind: Kind, records: Vec<Record>) -> StoreResult<()> {
        self.transaction(|state| state.set(kind, records))
    }

    // -- Messages --

    /// Store a message and append its id to the owning channel atomically.
    pub fn commit_message(&self, message: MessageRecord) -> StoreResult<bool> {
        self.transaction(|state| state.commit_message(message))
    }

    /// Remove a message and its id from the owning channel atomically.
    pub fn delete_message(&self, id: u64) -> StoreResult<bool> {
        self.with_state_mut(|state| state.delete_message(id))
    }

    // -- Whole store --

    /// Reset every collection and id counter.
    pub fn clear_all(&self) -> StoreResult<()> {
        self.with_state_mut(|state| *state = StoreState::default())?;
        info!("Store cleared");
        Ok(())
    }

    pub fn snapshot(&self) -> StoreResult<Vec<u8>> {
        // Serialize under the lock so the blob is a consistent cut.
        self.transaction(|state| Ok(serde_json::to_vec(state)?))
    }

    /// Replace the whole store with a decoded snapshot. On a decode error
    /// the current state is left untouched.
    pub fn restore(&self, blob: &[u8]) -> StoreResult<()> {
        let restored: StoreState = serde_json::from_slice(blob)?;
        self.with_state_mut(|state| *state = restored)?;
        debug!("Store restored from {} byte snapshot", blob.len());
        Ok(())
    }

    pub fn stats(&self) -> StoreResult<StoreStats> {
        self.with_state(StoreState::stats)
    }
}
