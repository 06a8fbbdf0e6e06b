//! Snapshot artifact tests against real SQLite files.

use std::path::PathBuf;

use chrono::Utc;
use hearth_db::{SnapshotArtifact, Store, StoreState};
use hearth_types::models::{ChannelRecord, Kind, MessageRecord, Record};
use uuid::Uuid;

fn temp_path() -> PathBuf {
    std::env::temp_dir().join(format!("hearth-artifact-{}.db", Uuid::new_v4()))
}

fn seeded_store() -> Store {
    let store = Store::new();
    let ch = store.allocate_id(Kind::Channel).unwrap();
    store
        .append(Kind::Channel, Record::Channel(ChannelRecord::new(ch, "general", true, 0)))
        .unwrap();
    let msg = store.allocate_id(Kind::Message).unwrap();
    store
        .commit_message(MessageRecord::new(msg, 0, ch, "saved", Utc::now()))
        .unwrap();
    store
}

#[test]
fn fresh_artifact_has_no_snapshot() {
    let path = temp_path();
    let artifact = SnapshotArtifact::open(&path).unwrap();
    assert!(artifact.load().unwrap().is_none());
    assert!(artifact.saved_at().unwrap().is_none());
    let _ = std::fs::remove_file(&path);
}

#[test]
fn snapshot_survives_reopen() {
    let path = temp_path();
    let store = seeded_store();

    {
        let artifact = SnapshotArtifact::open(&path).unwrap();
        artifact.save(&store.snapshot().unwrap()).unwrap();
        assert!(artifact.saved_at().unwrap().is_some());
    }

    let artifact = SnapshotArtifact::open(&path).unwrap();
    let blob = artifact.load().unwrap().expect("snapshot present");
    let restored = Store::new();
    restored.restore(&blob).unwrap();

    assert_eq!(
        store.with_state(StoreState::clone).unwrap(),
        restored.with_state(StoreState::clone).unwrap()
    );
    let _ = std::fs::remove_file(&path);
}

#[test]
fn save_overwrites_previous_snapshot() {
    let path = temp_path();
    let artifact = SnapshotArtifact::open(&path).unwrap();
    artifact.save(b"first").unwrap();
    artifact.save(b"second").unwrap();
    assert_eq!(artifact.load().unwrap().as_deref(), Some(&b"second"[..]));
    let _ = std::fs::remove_file(&path);
}

#[test]
fn empty_blob_counts_as_no_snapshot() {
    let path = temp_path();
    let artifact = SnapshotArtifact::open(&path).unwrap();
    artifact.save(b"").unwrap();
    assert!(artifact.load().unwrap().is_none());
    let _ = std::fs::remove_file(&path);
}

#[test]
fn garbage_file_fails_to_open() {
    let path = temp_path();
    std::fs::write(&path, vec![b'x'; 4096]).unwrap();
    assert!(SnapshotArtifact::open(&path).is_err());
    let _ = std::fs::remove_file(&path);
}
