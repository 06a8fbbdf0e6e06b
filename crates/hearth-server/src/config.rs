use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use hearth_scheduler::{BootConfig, SystemClock};

/// Server settings, read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub boot: BootConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("HEARTH_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = std::env::var("HEARTH_PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .context("HEARTH_PORT")?;
        let data_path: PathBuf = std::env::var("HEARTH_DATA_PATH")
            .unwrap_or_else(|_| "hearth-data.db".into())
            .into();
        let period_ms: u64 = std::env::var("HEARTH_SNAPSHOT_PERIOD_MS")
            .unwrap_or_else(|_| "1000".into())
            .parse()
            .context("HEARTH_SNAPSHOT_PERIOD_MS")?;
        let clock_skew_secs: i64 = std::env::var("HEARTH_CLOCK_SKEW_SECS")
            .unwrap_or_else(|_| "0".into())
            .parse()
            .context("HEARTH_CLOCK_SKEW_SECS")?;
        SystemClock::with_skew_secs(clock_skew_secs).context("HEARTH_CLOCK_SKEW_SECS")?;
        let discard_corrupt_snapshot = std::env::var("HEARTH_DISCARD_CORRUPT_SNAPSHOT")
            .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            host,
            port,
            boot: BootConfig {
                data_path,
                snapshot_period: Duration::from_millis(period_ms),
                clock_skew_secs,
                discard_corrupt_snapshot,
            },
        })
    }
}
