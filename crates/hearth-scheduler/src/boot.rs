use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use hearth_db::{SessionIndex, SnapshotArtifact, Store};
use hearth_types::api::Recovery;
use hearth_types::models::Kind;

use crate::clock::SystemClock;
use crate::persistence::PersistenceHandle;
use crate::scheduler::Scheduler;

#[derive(Debug, Clone)]
pub struct BootConfig {
    pub data_path: PathBuf,
    /// Clamped to [`crate::persistence::MIN_SNAPSHOT_PERIOD`].
    pub snapshot_period: Duration,
    pub clock_skew_secs: i64,
    /// Set the artifact aside and start empty when it cannot be read,
    /// instead of refusing to start.
    pub discard_corrupt_snapshot: bool,
}

/// Everything a running server needs, wired to one store.
pub struct Booted {
    pub store: Arc<Store>,
    pub sessions: SessionIndex,
    pub scheduler: Scheduler,
    pub artifact: Arc<SnapshotArtifact>,
    pub recovery: Recovery,
    pub persistence: PersistenceHandle,
}

/// Restore the store from the artifact, replay pending deferred work and
/// start the persistence loop. Call before serving any request.
pub async fn boot(config: &BootConfig) -> Result<Booted> {
    let clock = SystemClock::with_skew_secs(config.clock_skew_secs)?;

    let (artifact, store) = match restore_from(&config.data_path) {
        Ok(restored) => restored,
        Err(e) if config.discard_corrupt_snapshot => {
            error!(
                "Snapshot at {} is unreadable, starting EMPTY: {:#}",
                config.data_path.display(),
                e
            );
            set_aside(&config.data_path)?;
            (SnapshotArtifact::open(&config.data_path)?, Store::new())
        }
        Err(e) => {
            return Err(e.context(format!(
                "cannot restore {} (set HEARTH_DISCARD_CORRUPT_SNAPSHOT=true to start empty)",
                config.data_path.display()
            )));
        }
    };

    let store = Arc::new(store);
    store.seed_special_users()?;

    let scheduler = Scheduler::new(store.clone(), Arc::new(clock))?;
    let recovery = scheduler.recover_pending()?;

    let artifact = Arc::new(artifact);
    let persistence = PersistenceHandle::spawn(store.clone(), artifact.clone(), config.snapshot_period);

    let stats = store.stats()?;
    info!(
        "Store ready: {} users, {} channels, {} messages, {} pending",
        stats.count(Kind::User),
        stats.count(Kind::Channel),
        stats.count(Kind::Message),
        stats.count(Kind::PendingMessage),
    );

    Ok(Booted {
        sessions: SessionIndex::new(store.clone()),
        store,
        scheduler,
        artifact,
        recovery,
        persistence,
    })
}

fn restore_from(path: &Path) -> Result<(SnapshotArtifact, Store)> {
    let artifact = SnapshotArtifact::open(path)?;
    let store = Store::new();
    match artifact.load()? {
        Some(blob) => {
            store.restore(&blob).context("snapshot does not decode")?;
            info!("Restored {} byte snapshot from {}", blob.len(), path.display());
        }
        None => info!("No snapshot at {}, starting empty", path.display()),
    }
    Ok((artifact, store))
}

/// Move an unreadable artifact out of the way, keeping it for inspection.
fn set_aside(path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    let mut corrupt = path.as_os_str().to_owned();
    corrupt.push(".corrupt");
    std::fs::rename(path, &corrupt)
        .with_context(|| format!("cannot move {} aside", path.display()))?;
    warn!("Moved unreadable snapshot to {:?}", corrupt);

    // WAL side files belong to the old database.
    for suffix in ["-wal", "-shm"] {
        let mut side = path.as_os_str().to_owned();
        side.push(suffix);
        let _ = std::fs::remove_file(side);
    }
    Ok(())
}
