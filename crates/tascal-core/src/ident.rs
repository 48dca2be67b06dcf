//! Typed task identity.
//!
//! Persisted rows carry a [`RecordId`] (a UUID that is a stable foreign
//! key). Virtual instances are never persisted; they are addressed by an
//! [`InstanceRef`], which renders as the synthetic `"{uuid}_{YYYY-MM-DD}"`
//! form and is recomputed on every materialization. Keeping the two apart
//! at the type level stops a synthetic id from ever being stored or used
//! as a foreign key.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Canonical local-calendar date format used everywhere a date becomes a
/// string: synthetic ids, `completed_dates`, `excluded_dates`.
pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// Primary key of a persisted task row.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Generates a fresh id. UUIDv7 keeps ids time-ordered.
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identity of a virtual occurrence: the owning template plus the
/// occurrence date. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceRef {
    pub template_id: RecordId,
    pub date: NaiveDate,
}

impl InstanceRef {
    pub fn new(template_id: RecordId, date: NaiveDate) -> Self {
        Self { template_id, date }
    }
}

impl fmt::Display for InstanceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.template_id, self.date.format(DATE_KEY_FORMAT))
    }
}

/// Identity of any task in the unified in-memory collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaskId {
    Record(RecordId),
    Instance(InstanceRef),
}

impl TaskId {
    /// The persisted id, if this task has one.
    pub fn record(&self) -> Option<RecordId> {
        match self {
            TaskId::Record(id) => Some(*id),
            TaskId::Instance(_) => None,
        }
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self, TaskId::Instance(_))
    }
}

impl From<RecordId> for TaskId {
    fn from(id: RecordId) -> Self {
        TaskId::Record(id)
    }
}

impl From<InstanceRef> for TaskId {
    fn from(instance: InstanceRef) -> Self {
        TaskId::Instance(instance)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskId::Record(id) => id.fmt(f),
            TaskId::Instance(instance) => instance.fmt(f),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid task id: {0}")]
pub struct ParseTaskIdError(String);

impl FromStr for TaskId {
    type Err = ParseTaskIdError;

    /// Parses either a plain UUID (persisted id) or the synthetic
    /// `"{uuid}_{YYYY-MM-DD}"` instance form. Anything else, including a
    /// synthetic-looking id with a bad UUID or date part, is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(id) = Uuid::parse_str(s) {
            return Ok(TaskId::Record(RecordId(id)));
        }
        let (head, tail) = s
            .split_once('_')
            .ok_or_else(|| ParseTaskIdError(s.to_string()))?;
        let template = Uuid::parse_str(head).map_err(|_| ParseTaskIdError(s.to_string()))?;
        let date = NaiveDate::parse_from_str(tail, DATE_KEY_FORMAT)
            .map_err(|_| ParseTaskIdError(s.to_string()))?;
        Ok(TaskId::Instance(InstanceRef {
            template_id: RecordId(template),
            date,
        }))
    }
}
