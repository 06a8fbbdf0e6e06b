//! Restart scenarios: state goes through a real snapshot artifact and comes
//! back through `boot`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use hearth_db::{SnapshotArtifact, Store};
use hearth_scheduler::persistence::save_snapshot;
use hearth_scheduler::{BootConfig, boot};
use hearth_types::api::Recovery;
use hearth_types::models::{ChannelRecord, Kind, MessageRecord, Record};
use uuid::Uuid;

fn config(path: PathBuf) -> BootConfig {
    BootConfig {
        data_path: path,
        snapshot_period: Duration::from_millis(100),
        clock_skew_secs: 0,
        discard_corrupt_snapshot: false,
    }
}

fn temp_path() -> PathBuf {
    std::env::temp_dir().join(format!("hearth-recovery-{}.db", Uuid::new_v4()))
}

fn cleanup(path: &PathBuf) {
    for suffix in ["", "-wal", "-shm", ".corrupt"] {
        let mut p = path.as_os_str().to_owned();
        p.push(suffix);
        let _ = std::fs::remove_file(p);
    }
}

/// A store as it looked right before the process died.
fn crashed_store() -> (Store, u64) {
    let store = Store::new();
    let channel_id = store.allocate_id(Kind::Channel).unwrap();
    let mut channel = ChannelRecord::new(channel_id, "general", true, 0);
    channel.standup_time = Some(Utc::now() - ChronoDuration::seconds(30));
    channel.standup_creator = Some(0);
    channel.standup_buffer = "0: before the crash".into();
    store.append(Kind::Channel, Record::Channel(channel)).unwrap();

    let overdue = store.allocate_id(Kind::PendingMessage).unwrap();
    store
        .append(
            Kind::PendingMessage,
            Record::PendingMessage(MessageRecord::new(
                overdue,
                0,
                channel_id,
                "was due ten seconds ago",
                Utc::now() - ChronoDuration::seconds(10),
            )),
        )
        .unwrap();
    (store, overdue)
}

fn write_artifact(path: &PathBuf, store: &Store) {
    let artifact = SnapshotArtifact::open(path).unwrap();
    artifact.save(&store.snapshot().unwrap()).unwrap();
}

#[tokio::test]
async fn overdue_work_fires_exactly_once_on_boot() {
    let path = temp_path();
    let (store, overdue) = crashed_store();
    write_artifact(&path, &store);

    let booted = boot(&config(path.clone())).await.unwrap();
    assert_eq!(booted.recovery, Recovery { fired: 2, armed: 0 });

    let store = &booted.store;
    let hits = store
        .get_all(Kind::Message)
        .unwrap()
        .iter()
        .filter(|r| r.id() == overdue)
        .count();
    assert_eq!(hits, 1);
    assert!(store.get_all(Kind::PendingMessage).unwrap().is_empty());

    let channel = store
        .get_by_id(Kind::Channel, 0)
        .unwrap()
        .and_then(Record::into_channel)
        .unwrap();
    assert!(!channel.has_standup());
    assert_eq!(channel.messages.len(), 2);

    // A second recovery pass finds nothing left to do.
    assert_eq!(
        booted.scheduler.recover_pending().unwrap(),
        Recovery::default()
    );

    booted.persistence.stop().await;
    cleanup(&path);
}

#[tokio::test]
async fn future_work_is_rearmed_after_restart() {
    let path = temp_path();
    let store = Store::new();
    let channel_id = store.allocate_id(Kind::Channel).unwrap();
    store
        .append(
            Kind::Channel,
            Record::Channel(ChannelRecord::new(channel_id, "general", true, 0)),
        )
        .unwrap();
    let id = store.allocate_id(Kind::PendingMessage).unwrap();
    store
        .append(
            Kind::PendingMessage,
            Record::PendingMessage(MessageRecord::new(
                id,
                0,
                channel_id,
                "after restart",
                Utc::now() + ChronoDuration::milliseconds(400),
            )),
        )
        .unwrap();
    write_artifact(&path, &store);

    let booted = boot(&config(path.clone())).await.unwrap();
    assert_eq!(booted.recovery, Recovery { fired: 0, armed: 1 });
    assert!(booted.store.get_by_id(Kind::Message, id).unwrap().is_none());

    tokio::time::sleep(Duration::from_millis(700)).await;
    assert!(booted.store.get_by_id(Kind::Message, id).unwrap().is_some());
    assert!(booted.store.get_all(Kind::PendingMessage).unwrap().is_empty());

    booted.persistence.stop().await;
    cleanup(&path);
}

#[tokio::test]
async fn persistence_loop_writes_the_store() {
    let path = temp_path();
    let booted = boot(&config(path.clone())).await.unwrap();
    let token = booted.sessions.issue(7).unwrap();

    tokio::time::sleep(Duration::from_millis(350)).await;
    booted.persistence.stop().await;

    let blob = booted.artifact.load().unwrap().expect("snapshot written");
    let restored = Store::new();
    restored.restore(&blob).unwrap();
    let sessions = hearth_db::SessionIndex::new(Arc::new(restored));
    assert_eq!(sessions.lookup(&token).unwrap(), Some(7));

    cleanup(&path);
}

#[tokio::test]
async fn save_snapshot_reports_blob_size() {
    let path = temp_path();
    let artifact = Arc::new(SnapshotArtifact::open(&path).unwrap());
    let store = Store::new();
    let bytes = save_snapshot(&store, &artifact).await.unwrap();
    assert_eq!(artifact.load().unwrap().map(|b| b.len()), Some(bytes));
    cleanup(&path);
}

#[tokio::test]
async fn undecodable_snapshot_is_fatal_unless_discarded() {
    let path = temp_path();
    SnapshotArtifact::open(&path).unwrap().save(b"{ not a store").unwrap();

    assert!(boot(&config(path.clone())).await.is_err());

    let mut lenient = config(path.clone());
    lenient.discard_corrupt_snapshot = true;
    let booted = boot(&lenient).await.unwrap();
    assert_eq!(booted.store.stats().unwrap().count(Kind::Channel), 0);
    assert_eq!(booted.store.stats().unwrap().count(Kind::SpecialUser), 2);

    let mut aside = path.as_os_str().to_owned();
    aside.push(".corrupt");
    assert!(PathBuf::from(aside).exists());

    booted.persistence.stop().await;
    cleanup(&path);
}

#[tokio::test]
async fn final_snapshot_after_stop_is_not_overwritten() {
    let path = temp_path();
    let mut cfg = config(path.clone());
    cfg.snapshot_period = Duration::from_millis(10);
    let booted = boot(&cfg).await.unwrap();
    booted.sessions.issue(1).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    booted.persistence.stop().await;
    let late = booted.sessions.issue(2).unwrap();
    save_snapshot(&booted.store, &booted.artifact).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let blob = booted.artifact.load().unwrap().expect("snapshot written");
    let restored = Store::new();
    restored.restore(&blob).unwrap();
    let sessions = hearth_db::SessionIndex::new(Arc::new(restored));
    assert_eq!(sessions.lookup(&late).unwrap(), Some(2));

    cleanup(&path);
}

#[tokio::test]
async fn zero_snapshot_period_is_clamped() {
    let path = temp_path();
    let mut cfg = config(path.clone());
    cfg.snapshot_period = Duration::ZERO;
    let booted = boot(&cfg).await.unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    booted.persistence.stop().await;
    assert!(booted.artifact.load().unwrap().is_some());

    cleanup(&path);
}

#[tokio::test]
async fn out_of_range_clock_skew_fails_boot() {
    let path = temp_path();
    let mut cfg = config(path.clone());
    cfg.clock_skew_secs = i64::MAX;
    assert!(boot(&cfg).await.is_err());
    cleanup(&path);
}
