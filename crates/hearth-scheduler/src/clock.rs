use chrono::{DateTime, Duration, Utc};

use crate::error::{SchedulerError, SchedulerResult};

/// Largest skew accepted, in either direction: 100 years.
pub const MAX_SKEW_SECS: i64 = 100 * 365 * 86_400;

/// Source of "now" for fire-time decisions.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock shifted by a fixed skew.
///
/// Older deployments stamped times with a fixed +36000 s offset; set the
/// skew to that value to keep reading artifacts they wrote.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    skew: Duration,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            skew: Duration::zero(),
        }
    }

    pub fn with_skew_secs(secs: i64) -> SchedulerResult<Self> {
        if secs.unsigned_abs() > MAX_SKEW_SECS.unsigned_abs() {
            return Err(SchedulerError::SkewOutOfRange(secs));
        }
        let skew = Duration::try_seconds(secs).ok_or(SchedulerError::SkewOutOfRange(secs))?;
        Ok(Self { skew })
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now() + self.skew
    }
}
