use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Snapshot artifact: running migration v1 (snapshot table)");
        conn.execute_batch(
            "
            -- Exactly one row: the latest whole-store snapshot.
            CREATE TABLE snapshot (
                id          INTEGER PRIMARY KEY CHECK (id = 1),
                blob        BLOB NOT NULL,
                saved_at    TEXT NOT NULL
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    Ok(())
}
