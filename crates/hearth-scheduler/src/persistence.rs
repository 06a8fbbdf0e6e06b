use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use hearth_db::{SnapshotArtifact, Store};

/// Shortest snapshot period the loop will run with.
pub const MIN_SNAPSHOT_PERIOD: Duration = Duration::from_millis(10);

/// A running persistence loop.
pub struct PersistenceHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PersistenceHandle {
    pub fn spawn(store: Arc<Store>, artifact: Arc<SnapshotArtifact>, period: Duration) -> Self {
        let (stop, stopped) = watch::channel(false);
        let task = tokio::spawn(run_persistence_loop(store, artifact, period, stopped));
        Self { stop, task }
    }

    /// Stop the loop and wait until a write already in flight has landed.
    /// A snapshot saved after this returns is never overwritten by the loop.
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        if let Err(e) = self.task.await {
            warn!("Persistence loop ended abnormally: {}", e);
        }
    }
}

/// Write the whole store to the artifact every `period` until `stop`
/// flips or its sender is dropped.
///
/// At most the last `period` of mutations is lost on a crash. A failed write
/// is logged and retried on the next tick.
pub async fn run_persistence_loop(
    store: Arc<Store>,
    artifact: Arc<SnapshotArtifact>,
    period: Duration,
    mut stop: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(period.max(MIN_SNAPSHOT_PERIOD));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = stop.changed() => break,
        }
        if *stop.borrow() {
            break;
        }

        match save_snapshot(&store, &artifact).await {
            Ok(bytes) => debug!("Snapshot written ({} bytes)", bytes),
            Err(e) => warn!("Snapshot write to {} failed: {}", artifact.path().display(), e),
        }
    }
    debug!("Persistence loop stopped");
}

/// Snapshot the store and overwrite the artifact. Returns the blob size.
pub async fn save_snapshot(store: &Store, artifact: &Arc<SnapshotArtifact>) -> anyhow::Result<usize> {
    let blob = store.snapshot()?;
    let len = blob.len();

    // SQLite writes block; keep them off the async workers.
    let artifact = artifact.clone();
    tokio::task::spawn_blocking(move || artifact.save(&blob)).await??;

    Ok(len)
}
