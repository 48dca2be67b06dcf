//! The abstract record store the engine writes through.
//!
//! The store exposes row-level `select`/`insert`/`update`/`delete` over
//! the flat task-row schema; transport, auth and everything else about
//! the remote side stay behind this trait. Writes are issued
//! fire-and-forget by the coordinator, which patches the in-memory
//! working set optimistically before a write resolves.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use crate::error::CoreError;
use crate::ident::RecordId;
use crate::models::{DateSet, TaskPatch, TaskRow, WeekdaySet};

pub mod sqlite;

pub use sqlite::SqliteStore;

/// Row selections the engine needs. Every query the engine issues is one
/// of these shapes; there is no free-form filter language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowFilter {
    /// Every row belonging to a user.
    All { user_id: Uuid },
    /// A single row by primary key.
    ById(RecordId),
    /// Override rows of a template: `parent_task_id` set, not a template,
    /// not `related`.
    OverridesOf(RecordId),
    /// `related` children of a task.
    RelatedTo(RecordId),
    /// Non-template rows due inside an inclusive date range.
    DueBetween {
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    },
    /// Templates whose `[start_date, end_date]` overlaps an inclusive
    /// range; a null `end_date` is treated as open-ended.
    TemplatesOverlapping {
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    },
}

/// Column-level edits applied by `update`. Double options distinguish
/// "leave alone" from "set NULL".
#[derive(Debug, Clone, Default)]
pub struct RowPatch {
    pub title: Option<String>,
    pub notes: Option<Option<String>>,
    pub due_date: Option<Option<NaiveDate>>,
    pub due_time: Option<Option<NaiveTime>>,
    pub completed: Option<bool>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<Option<NaiveDate>>,
    pub days_selected: Option<Option<WeekdaySet>>,
    pub recurrence_interval: Option<Option<u32>>,
    pub completed_dates: Option<Option<DateSet>>,
    pub excluded_dates: Option<Option<DateSet>>,
    pub parent_task_id: Option<Option<RecordId>>,
}

impl RowPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.notes.is_none()
            && self.due_date.is_none()
            && self.due_time.is_none()
            && self.completed.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.days_selected.is_none()
            && self.recurrence_interval.is_none()
            && self.completed_dates.is_none()
            && self.excluded_dates.is_none()
            && self.parent_task_id.is_none()
    }

    /// The row-level projection of a user-facing field edit.
    pub fn from_task_patch(patch: &TaskPatch) -> Self {
        Self {
            title: patch.title.clone(),
            notes: patch.notes.clone(),
            due_date: patch.due_date,
            due_time: patch.due_time,
            start_date: patch.start_date,
            end_date: patch.end_date,
            days_selected: patch.days_selected,
            recurrence_interval: patch.recurrence_interval,
            ..Default::default()
        }
    }
}

/// Abstract record store. The engine holds one handle and routes every
/// write through it; implementations decide where rows actually live.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn select(&self, filter: &RowFilter) -> Result<Vec<TaskRow>, CoreError>;
    async fn insert(&self, row: &TaskRow) -> Result<(), CoreError>;
    async fn update(&self, filter: &RowFilter, patch: &RowPatch) -> Result<u64, CoreError>;
    async fn delete(&self, filter: &RowFilter) -> Result<u64, CoreError>;
}
