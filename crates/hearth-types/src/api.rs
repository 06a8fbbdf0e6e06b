use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Kind;

// -- Standups --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandupStatus {
    pub is_active: bool,
    pub time_finish: Option<DateTime<Utc>>,
}

impl StandupStatus {
    pub fn inactive() -> Self {
        Self {
            is_active: false,
            time_finish: None,
        }
    }
}

// -- Store --

/// Record counts per collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub counts: BTreeMap<Kind, usize>,
}

impl StoreStats {
    pub fn count(&self, kind: Kind) -> usize {
        self.counts.get(&kind).copied().unwrap_or(0)
    }
}

/// What boot recovery did with the pending work it found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recovery {
    pub fired: usize,
    pub armed: usize,
}

// -- Health --

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub counts: BTreeMap<Kind, usize>,
}
