use chrono::{DateTime, Utc};
use thiserror::Error;

use hearth_db::StoreError;
use hearth_types::events::DeferredKey;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("channel {0} already has an active standup")]
    StandupActive(u64),

    #[error("channel {0} has no active standup")]
    NoActiveStandup(u64),

    #[error("channel {0} not found")]
    ChannelNotFound(u64),

    #[error("fire time {0} is in the past")]
    FireTimeInPast(DateTime<Utc>),

    #[error("message id {0} was never allocated")]
    UnallocatedId(u64),

    #[error("{0:?} is already scheduled")]
    AlreadyScheduled(DeferredKey),

    #[error("clock skew of {0} s is out of range")]
    SkewOutOfRange(i64),

    #[error("scheduler must be created inside a Tokio runtime")]
    NoRuntime,

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
