//! SQLite-backed record store.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite};

use crate::db::DbPool;
use crate::error::CoreError;
use crate::models::{TaskRow, TaskType};
use crate::store::{RecordStore, RowFilter, RowPatch};

pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &RowFilter) {
    match filter {
        RowFilter::All { user_id } => {
            qb.push("user_id = ");
            qb.push_bind(*user_id);
        }
        RowFilter::ById(id) => {
            qb.push("id = ");
            qb.push_bind(*id);
        }
        RowFilter::OverridesOf(template) => {
            qb.push("parent_task_id = ");
            qb.push_bind(*template);
            qb.push(" AND is_template = 0 AND task_type != ");
            qb.push_bind(TaskType::Related);
        }
        RowFilter::RelatedTo(parent) => {
            qb.push("parent_task_id = ");
            qb.push_bind(*parent);
            qb.push(" AND task_type = ");
            qb.push_bind(TaskType::Related);
        }
        RowFilter::DueBetween {
            user_id,
            start,
            end,
        } => {
            qb.push("user_id = ");
            qb.push_bind(*user_id);
            qb.push(" AND is_template = 0 AND due_date BETWEEN ");
            qb.push_bind(*start);
            qb.push(" AND ");
            qb.push_bind(*end);
        }
        RowFilter::TemplatesOverlapping {
            user_id,
            start,
            end,
        } => {
            qb.push("user_id = ");
            qb.push_bind(*user_id);
            qb.push(" AND is_template = 1 AND start_date IS NOT NULL AND start_date <= ");
            qb.push_bind(*end);
            qb.push(" AND (end_date IS NULL OR end_date >= ");
            qb.push_bind(*start);
            qb.push(")");
        }
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn select(&self, filter: &RowFilter) -> Result<Vec<TaskRow>, CoreError> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM tasks WHERE ");
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY due_date, created_at");

        let rows: Vec<TaskRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn insert(&self, row: &TaskRow) -> Result<(), CoreError> {
        sqlx::query(
            r#"INSERT INTO tasks (
                id, user_id, title, task_type, due_date, due_time, completed, notes,
                is_template, start_date, end_date, days_selected, recurrence_interval,
                completed_dates, excluded_dates, parent_task_id, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(row.id)
        .bind(row.user_id)
        .bind(&row.title)
        .bind(row.task_type)
        .bind(row.due_date)
        .bind(row.due_time)
        .bind(row.completed)
        .bind(&row.notes)
        .bind(row.is_template)
        .bind(row.start_date)
        .bind(row.end_date)
        .bind(&row.days_selected)
        .bind(row.recurrence_interval)
        .bind(&row.completed_dates)
        .bind(&row.excluded_dates)
        .bind(row.parent_task_id)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, filter: &RowFilter, patch: &RowPatch) -> Result<u64, CoreError> {
        if patch.is_empty() {
            return Ok(0);
        }

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE tasks SET ");
        let mut updated = false;

        macro_rules! set_column {
            ($field:expr, $column:literal) => {
                if let Some(value) = &$field {
                    if updated {
                        qb.push(", ");
                    }
                    qb.push(concat!($column, " = "));
                    qb.push_bind(value.clone());
                    updated = true;
                }
            };
        }

        set_column!(patch.title, "title");
        set_column!(patch.notes, "notes");
        set_column!(patch.due_date, "due_date");
        set_column!(patch.due_time, "due_time");
        set_column!(patch.completed, "completed");
        set_column!(patch.start_date, "start_date");
        set_column!(patch.end_date, "end_date");
        set_column!(patch.days_selected, "days_selected");
        set_column!(patch.recurrence_interval, "recurrence_interval");
        set_column!(patch.completed_dates, "completed_dates");
        set_column!(patch.excluded_dates, "excluded_dates");
        set_column!(patch.parent_task_id, "parent_task_id");

        if updated {
            qb.push(", ");
        }
        qb.push("updated_at = ");
        qb.push_bind(Utc::now());
        qb.push(" WHERE ");
        push_filter(&mut qb, filter);

        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn delete(&self, filter: &RowFilter) -> Result<u64, CoreError> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("DELETE FROM tasks WHERE ");
        push_filter(&mut qb, filter);

        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
