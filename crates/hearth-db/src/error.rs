use hearth_types::models::Kind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A record was handed to a collection of a different kind.
    #[error("record of kind {found} cannot be stored in {expected}")]
    KindMismatch { expected: Kind, found: Kind },

    #[error("{kind} {id} already exists")]
    DuplicateId { kind: Kind, id: u64 },

    #[error("store lock poisoned: {0}")]
    Poisoned(String),

    #[error("snapshot codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
