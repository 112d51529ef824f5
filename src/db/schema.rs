use rusqlite::Connection;

use super::ConnectionPrepareError;

struct Migration {
    version: &'static str,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "001",
        name: "initial",
        sql: include_str!("migrations/001_initial.sql"),
    },
    Migration {
        version: "002",
        name: "accepted_status",
        sql: include_str!("migrations/002_accepted_status.sql"),
    },
    Migration {
        version: "003",
        name: "uniqueness",
        sql: include_str!("migrations/003_uniqueness.sql"),
    },
    Migration {
        version: "004",
        name: "query_indexes",
        sql: include_str!("migrations/004_query_indexes.sql"),
    },
];

/// Tables owned by the schema, children before parents so they can be dropped in order.
pub(crate) const TABLES: &[&str] = &[
    "entity_event",
    "gc_log_entry",
    "schedule_event",
    "time_plan_activity",
    "smart_list_item",
    "note",
    "journal",
    "inbox_task",
    "big_plan",
    "habit",
    "project",
    "schedule_stream",
    "time_plan",
    "smart_list",
    "gc_log",
    "schedule_domain",
    "time_plan_domain",
    "smart_list_collection",
    "note_collection",
    "journal_collection",
    "big_plan_collection",
    "inbox_task_collection",
    "habit_collection",
    "project_collection",
    "auth",
    "workspace",
    "user",
    "schema_migrations",
];

pub fn run_migrations(conn: &Connection) -> Result<(), ConnectionPrepareError> {
    ensure_tracking_table(conn)?;

    let applied = get_applied_migrations(conn)?;

    // A database written by a newer build cannot be driven by this one.
    if let Some(unknown) = applied
        .iter()
        .find(|version| !MIGRATIONS.iter().any(|m| m.version == version.as_str()))
    {
        return Err(ConnectionPrepareError::UnknownMigration {
            version: unknown.clone(),
        });
    }

    for migration in MIGRATIONS {
        if !applied.contains(&migration.version.to_string()) {
            apply_migration(conn, migration)?;
        }
    }

    Ok(())
}

fn ensure_tracking_table(conn: &Connection) -> Result<(), ConnectionPrepareError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
    )?;
    Ok(())
}

fn get_applied_migrations(conn: &Connection) -> Result<Vec<String>, ConnectionPrepareError> {
    let mut stmt = conn.prepare("SELECT version FROM schema_migrations ORDER BY version")?;
    let versions = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(versions)
}

fn apply_migration(conn: &Connection, migration: &Migration) -> Result<(), ConnectionPrepareError> {
    tracing::info!(
        "Applying migration {}: {}",
        migration.version,
        migration.name
    );

    let now = chrono::Utc::now().to_rfc3339();
    let sql = format!(
        "BEGIN TRANSACTION;
         {}
         INSERT INTO schema_migrations (version, name, applied_at) VALUES ('{}', '{}', '{}');
         COMMIT;",
        migration.sql, migration.version, migration.name, now
    );
    if let Err(source) = conn.execute_batch(&sql) {
        // execute_batch stops at the failing statement, leaving the transaction open.
        let _ = conn.execute_batch("ROLLBACK");
        return Err(ConnectionPrepareError::Migration {
            version: migration.version,
            name: migration.name,
            source,
        });
    }

    tracing::info!("Migration {} applied successfully", migration.version);
    Ok(())
}
