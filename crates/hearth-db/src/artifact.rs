use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::migrations;

/// The durable copy of the store: a SQLite file holding a single snapshot
/// row that every save overwrites.
pub struct SnapshotArtifact {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl SnapshotArtifact {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        migrations::run(&conn)?;

        info!("Snapshot artifact opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow!("Artifact lock poisoned: {}", e))?;
        f(&conn)
    }

    /// The stored snapshot, or `None` if nothing (or an empty blob) was
    /// ever saved.
    pub fn load(&self) -> Result<Option<Vec<u8>>> {
        let blob = self.with_conn(|conn| {
            Ok(conn
                .query_row("SELECT blob FROM snapshot WHERE id = 1", [], |row| {
                    row.get::<_, Vec<u8>>(0)
                })
                .optional()?)
        })?;
        Ok(blob.filter(|b| !b.is_empty()))
    }

    /// Overwrite the stored snapshot.
    pub fn save(&self, blob: &[u8]) -> Result<()> {
        let saved_at = Utc::now().to_rfc3339();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO snapshot (id, blob, saved_at) VALUES (1, ?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET blob = excluded.blob, saved_at = excluded.saved_at",
                rusqlite::params![blob, saved_at],
            )?;
            Ok(())
        })
    }

    /// When the stored snapshot was written.
    pub fn saved_at(&self) -> Result<Option<DateTime<Utc>>> {
        let raw: Option<String> = self.with_conn(|conn| {
            Ok(conn
                .query_row("SELECT saved_at FROM snapshot WHERE id = 1", [], |row| {
                    row.get(0)
                })
                .optional()?)
        })?;
        raw.map(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| anyhow!("Corrupt saved_at '{}': {}", s, e))
        })
        .transpose()
    }
}
