//! Schema migrations for the key-value database.
//!
//! Migrations are versioned and applied automatically when opening the store.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Returns 0 if no version is set (initial database).
fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: the `kv` table.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS kv (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );",
    )?;
    set_schema_version(conn, 1)
}

/// Migration v2: fold the per-field settings keys written by older versions
/// into the single `nook_settings` slice.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    let legacy: Vec<(String, String)> = {
        let mut stmt = tx.prepare(
            "SELECT key, value FROM kv WHERE key IN (
                'nook_durations', 'nook_auto_start', 'nook_interval',
                'nook_deep_focus', 'nook_daily_goal', 'nook_breathing_duration',
                'nook_show_percentage', 'nook_allowed_domains'
            )",
        )?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<SqliteResult<_>>()?
    };

    let has_settings: bool = tx
        .query_row("SELECT COUNT(*) FROM kv WHERE key = 'nook_settings'", [], |row| {
            row.get::<_, i64>(0)
        })
        .map(|n| n > 0)?;

    if !legacy.is_empty() && !has_settings {
        let mut slice = serde_json::Map::new();
        for (key, raw) in &legacy {
            let field = match key.as_str() {
                "nook_durations" => "durations",
                "nook_auto_start" => "autoStartBreaks",
                "nook_interval" => "longBreakInterval",
                "nook_deep_focus" => "isDeepFocus",
                "nook_daily_goal" => "dailyGoal",
                "nook_breathing_duration" => "breathingDuration",
                "nook_show_percentage" => "showPercentage",
                "nook_allowed_domains" => "allowedDomains",
                _ => continue,
            };
            let value = serde_json::from_str(raw)
                .unwrap_or_else(|_| serde_json::Value::String(raw.clone()));
            slice.insert(field.to_string(), value);
        }
        tx.execute(
            "INSERT INTO kv (key, value) VALUES ('nook_settings', ?1)",
            [serde_json::Value::Object(slice).to_string()],
        )?;
    }

    tx.execute_batch(
        "DELETE FROM kv WHERE key IN (
            'nook_durations', 'nook_auto_start', 'nook_interval',
            'nook_deep_focus', 'nook_daily_goal', 'nook_breathing_duration',
            'nook_show_percentage', 'nook_allowed_domains'
        );",
    )?;
    set_schema_version(&tx, 2)?;
    tx.commit()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_database_reaches_current_version() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);
    }

    #[test]
    fn legacy_scalar_settings_are_folded() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema_version_table(&conn).unwrap();
        migrate_v1(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO kv (key, value) VALUES ('nook_auto_start', 'true');
             INSERT INTO kv (key, value) VALUES ('nook_daily_goal', '90');
             INSERT INTO kv (key, value) VALUES ('nook_durations', '{\"focus\":50,\"short\":10,\"long\":20}');",
        )
        .unwrap();

        migrate(&conn).unwrap();

        let raw: String = conn
            .query_row("SELECT value FROM kv WHERE key = 'nook_settings'", [], |r| r.get(0))
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["autoStartBreaks"], serde_json::json!(true));
        assert_eq!(value["dailyGoal"], serde_json::json!(90));
        assert_eq!(value["durations"]["focus"], serde_json::json!(50));

        let leftover: i64 = conn
            .query_row("SELECT COUNT(*) FROM kv WHERE key = 'nook_auto_start'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(leftover, 0);
    }
}
