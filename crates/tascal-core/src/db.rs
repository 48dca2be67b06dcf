//! Database connection and schema bootstrap.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::error::CoreError;

pub type DbPool = sqlx::SqlitePool;

/// One flat table holds every task shape; nullable columns stay NULL for
/// the shapes that do not use them.
const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS tasks (
        id TEXT PRIMARY KEY NOT NULL,
        user_id TEXT NOT NULL,
        title TEXT NOT NULL,
        task_type TEXT NOT NULL,
        due_date TEXT,
        due_time TEXT,
        completed INTEGER NOT NULL DEFAULT 0,
        notes TEXT,
        is_template INTEGER NOT NULL DEFAULT 0,
        start_date TEXT,
        end_date TEXT,
        days_selected TEXT,
        recurrence_interval INTEGER,
        completed_dates TEXT,
        excluded_dates TEXT,
        parent_task_id TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )"#,
    "CREATE INDEX IF NOT EXISTS idx_tasks_user ON tasks(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_tasks_parent ON tasks(parent_task_id)",
    "CREATE INDEX IF NOT EXISTS idx_tasks_due ON tasks(due_date)",
];

/// Opens (creating if missing) the database at `database_url` and ensures
/// the schema exists.
pub async fn establish_connection(database_url: &str) -> Result<DbPool, CoreError> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;

    for statement in SCHEMA {
        sqlx::query(statement).execute(&pool).await?;
    }

    Ok(pool)
}
