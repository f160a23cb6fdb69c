use rusqlite::Connection;

use crate::error::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS kv (
            key    TEXT PRIMARY KEY,
            value  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS triggers (
            id            TEXT PRIMARY KEY,
            fire_at       TEXT NOT NULL,
            fire_at_utc   INTEGER NOT NULL,
            repeat_daily  INTEGER NOT NULL DEFAULT 0,
            notification  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_triggers_fire ON triggers(fire_at_utc);

        CREATE TABLE IF NOT EXISTS displayed (
            id            TEXT PRIMARY KEY,
            notification  TEXT NOT NULL,
            displayed_at  TEXT NOT NULL
        );",
    )?;
    Ok(())
}
