use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::MessageRecord;

/// Work that applies at a future time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum DeferredItem {
    /// A fully formed message waiting in `pending-message`. Fires at its
    /// `time_created`.
    Message(MessageRecord),

    /// Close the standup window on a channel and post its buffer.
    Standup { channel_id: u64, creator: u64 },
}

impl DeferredItem {
    pub fn key(&self) -> DeferredKey {
        match self {
            Self::Message(msg) => DeferredKey::Message(msg.id),
            Self::Standup { channel_id, .. } => DeferredKey::Standup(*channel_id),
        }
    }
}

/// Identifies a deferred item without its payload. This is what a timer
/// holds on to; the payload is re-read from the store when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id")]
pub enum DeferredKey {
    Message(u64),
    Standup(u64),
}

/// Outcome of handing an item to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scheduled {
    /// The fire time had already passed and the effect was applied inline.
    Fired,
    /// A timer was armed for the given instant.
    Armed { fire_time: DateTime<Utc> },
}
