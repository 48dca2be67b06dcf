use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::sqlite::{SqliteArgumentValue, SqliteTypeInfo, SqliteValueRef};
use sqlx::{FromRow, Sqlite};
use thiserror::Error;
use uuid::Uuid;

use crate::error::CoreError;
use crate::ident::{InstanceRef, RecordId, TaskId};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// One-off task with an independent lifecycle.
    Basic,
    /// Weekday-set recurring template (and its occurrences).
    Routine,
    /// One-off task linked to a parent task. Never an override.
    Related,
    /// Month-interval recurring template (and its occurrences).
    LongInterval,
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskType::Basic => write!(f, "basic"),
            TaskType::Routine => write!(f, "routine"),
            TaskType::Related => write!(f, "related"),
            TaskType::LongInterval => write!(f, "long_interval"),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid task type: {0}")]
pub struct ParseTaskTypeError(String);

impl FromStr for TaskType {
    type Err = ParseTaskTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "basic" => Ok(TaskType::Basic),
            "routine" => Ok(TaskType::Routine),
            "related" => Ok(TaskType::Related),
            "long_interval" => Ok(TaskType::LongInterval),
            _ => Err(ParseTaskTypeError(s.to_string())),
        }
    }
}

const ALL_DAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// A set of weekdays, stored in rows as a JSON array of day names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, day: Weekday) {
        self.0 |= 1 << day.num_days_from_monday();
    }

    pub fn remove(&mut self, day: Weekday) {
        self.0 &= !(1 << day.num_days_from_monday());
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_monday()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterates Monday-first regardless of insertion order.
    pub fn iter(&self) -> impl Iterator<Item = Weekday> + '_ {
        ALL_DAYS.iter().copied().filter(|day| self.contains(*day))
    }
}

impl FromIterator<Weekday> for WeekdaySet {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        let mut set = WeekdaySet::empty();
        for day in iter {
            set.insert(day);
        }
        set
    }
}

fn weekday_token(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "mon",
        Weekday::Tue => "tue",
        Weekday::Wed => "wed",
        Weekday::Thu => "thu",
        Weekday::Fri => "fri",
        Weekday::Sat => "sat",
        Weekday::Sun => "sun",
    }
}

impl Serialize for WeekdaySet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter().map(weekday_token))
    }
}

impl<'de> Deserialize<'de> for WeekdaySet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let names = Vec::<String>::deserialize(deserializer)?;
        names
            .iter()
            .map(|name| name.parse::<Weekday>().map_err(serde::de::Error::custom))
            .collect()
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid weekday set: {0}")]
pub struct ParseWeekdaySetError(String);

impl fmt::Display for WeekdaySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

impl FromStr for WeekdaySet {
    type Err = ParseWeekdaySetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s).map_err(|_| ParseWeekdaySetError(s.to_string()))
    }
}

/// An ordered set of calendar dates, stored in rows as a JSON array of
/// `YYYY-MM-DD` strings. The canonical string form keeps membership checks
/// immune to timezone-induced off-by-one-day drift.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DateSet(BTreeSet<NaiveDate>);

impl DateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.0.contains(&date)
    }

    pub fn insert(&mut self, date: NaiveDate) -> bool {
        self.0.insert(date)
    }

    pub fn remove(&mut self, date: NaiveDate) -> bool {
        self.0.remove(&date)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<NaiveDate> for DateSet {
    fn from_iter<I: IntoIterator<Item = NaiveDate>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid date set: {0}")]
pub struct ParseDateSetError(String);

impl fmt::Display for DateSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

impl FromStr for DateSet {
    type Err = ParseDateSetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s).map_err(|_| ParseDateSetError(s.to_string()))
    }
}

macro_rules! text_column {
    ($ty:ty) => {
        impl sqlx::Type<Sqlite> for $ty {
            fn type_info() -> SqliteTypeInfo {
                <String as sqlx::Type<Sqlite>>::type_info()
            }
        }

        impl<'q> sqlx::Encode<'q, Sqlite> for $ty {
            fn encode_by_ref(&self, args: &mut Vec<SqliteArgumentValue<'q>>) -> IsNull {
                args.push(SqliteArgumentValue::Text(std::borrow::Cow::Owned(
                    self.to_string(),
                )));
                IsNull::No
            }
        }

        impl<'r> sqlx::Decode<'r, Sqlite> for $ty {
            fn decode(value: SqliteValueRef<'r>) -> Result<Self, BoxDynError> {
                let text = <&str as sqlx::Decode<Sqlite>>::decode(value)?;
                text.parse().map_err(Into::into)
            }
        }
    };
}

text_column!(WeekdaySet);
text_column!(DateSet);

/// A persisted task row, exactly as the record store holds it. Plain
/// tasks, templates, overrides and `related` tasks all share this flat
/// shape; nullable columns stay `None` for the shapes that do not use
/// them.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TaskRow {
    pub id: RecordId,
    pub user_id: Uuid,
    pub title: String,
    pub task_type: TaskType,
    pub due_date: Option<NaiveDate>,
    pub due_time: Option<NaiveTime>,
    pub completed: bool,
    pub notes: Option<String>,
    pub is_template: bool,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub days_selected: Option<WeekdaySet>,
    pub recurrence_interval: Option<u32>,
    pub completed_dates: Option<DateSet>,
    pub excluded_dates: Option<DateSet>,
    pub parent_task_id: Option<RecordId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for TaskRow {
    fn default() -> Self {
        Self {
            id: RecordId::generate(),
            user_id: Uuid::nil(),
            title: String::new(),
            task_type: TaskType::Basic,
            due_date: None,
            due_time: None,
            completed: false,
            notes: None,
            is_template: false,
            start_date: None,
            end_date: None,
            days_selected: None,
            recurrence_interval: None,
            completed_dates: None,
            excluded_dates: None,
            parent_task_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

impl TaskRow {
    /// Whether a template's occurrence on `date` was marked done.
    pub fn completed_on(&self, date: NaiveDate) -> bool {
        self.completed_dates
            .as_ref()
            .is_some_and(|set| set.contains(date))
    }

    /// Whether a template's occurrence on `date` was deleted and must
    /// never regenerate.
    pub fn is_excluded(&self, date: NaiveDate) -> bool {
        self.excluded_dates
            .as_ref()
            .is_some_and(|set| set.contains(date))
    }

    /// Builds a row for a brand-new plain task or template.
    pub fn from_new(data: NewTaskData, user_id: Uuid) -> Result<Self, CoreError> {
        let is_template = data.start_date.is_some();
        if !is_template && (data.days_selected.is_some() || data.recurrence_interval.is_some()) {
            return Err(CoreError::InvalidInput(
                "A recurrence rule requires a start date".to_string(),
            ));
        }
        let task_type = data.task_type.unwrap_or(if is_template {
            match &data.days_selected {
                Some(days) if !days.is_empty() => TaskType::Routine,
                _ => TaskType::LongInterval,
            }
        } else if data.parent_task_id.is_some() {
            TaskType::Related
        } else {
            TaskType::Basic
        });

        let now = Utc::now();
        Ok(Self {
            id: RecordId::generate(),
            user_id,
            title: data.title,
            task_type,
            due_date: data.due_date.or(data.start_date),
            due_time: data.due_time,
            completed: false,
            notes: data.notes,
            is_template,
            start_date: data.start_date,
            end_date: data.end_date,
            days_selected: data.days_selected,
            recurrence_interval: data.recurrence_interval,
            completed_dates: if is_template { Some(DateSet::new()) } else { None },
            excluded_dates: if is_template { Some(DateSet::new()) } else { None },
            parent_task_id: data.parent_task_id,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Classification of a task in the unified collection, computed per record
/// by [`Task::kind`] rather than by inspecting id substrings at call
/// sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Plain,
    Template,
    PersistedOverride,
    VirtualInstance,
}

/// A task as held in the unified in-memory collection. Identical in shape
/// to [`TaskRow`] except for the id: virtual instances carry an
/// [`InstanceRef`] instead of a persisted [`RecordId`].
#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    pub user_id: Uuid,
    pub title: String,
    pub task_type: TaskType,
    pub due_date: Option<NaiveDate>,
    pub due_time: Option<NaiveTime>,
    pub completed: bool,
    pub notes: Option<String>,
    pub is_template: bool,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub days_selected: Option<WeekdaySet>,
    pub recurrence_interval: Option<u32>,
    pub completed_dates: Option<DateSet>,
    pub excluded_dates: Option<DateSet>,
    pub parent_task_id: Option<RecordId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        Self {
            id: TaskId::Record(row.id),
            user_id: row.user_id,
            title: row.title,
            task_type: row.task_type,
            due_date: row.due_date,
            due_time: row.due_time,
            completed: row.completed,
            notes: row.notes,
            is_template: row.is_template,
            start_date: row.start_date,
            end_date: row.end_date,
            days_selected: row.days_selected,
            recurrence_interval: row.recurrence_interval,
            completed_dates: row.completed_dates,
            excluded_dates: row.excluded_dates,
            parent_task_id: row.parent_task_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl Task {
    /// Pure classification. `related` tasks fall through to `Plain` even
    /// when they carry a `parent_task_id`; only the typed synthetic id
    /// makes something a virtual instance.
    pub fn kind(&self) -> TaskKind {
        if self.is_template {
            return TaskKind::Template;
        }
        match self.id {
            TaskId::Instance(_) => TaskKind::VirtualInstance,
            TaskId::Record(_) => {
                if self.parent_task_id.is_some() && self.task_type != TaskType::Related {
                    TaskKind::PersistedOverride
                } else {
                    TaskKind::Plain
                }
            }
        }
    }

    pub fn record_id(&self) -> Option<RecordId> {
        self.id.record()
    }

    pub fn instance_ref(&self) -> Option<InstanceRef> {
        match self.id {
            TaskId::Instance(instance) => Some(instance),
            TaskId::Record(_) => None,
        }
    }

    /// The row this task persists as, if it has a persisted identity.
    pub fn as_row(&self) -> Option<TaskRow> {
        let id = self.record_id()?;
        Some(self.clone().into_row_with_id(id))
    }

    /// Rebinds the task to a persisted id, producing a row. Used by
    /// promotion, where a virtual instance becomes a durable override
    /// under a freshly generated id.
    pub fn into_row_with_id(self, id: RecordId) -> TaskRow {
        TaskRow {
            id,
            user_id: self.user_id,
            title: self.title,
            task_type: self.task_type,
            due_date: self.due_date,
            due_time: self.due_time,
            completed: self.completed,
            notes: self.notes,
            is_template: self.is_template,
            start_date: self.start_date,
            end_date: self.end_date,
            days_selected: self.days_selected,
            recurrence_interval: self.recurrence_interval,
            completed_dates: self.completed_dates,
            excluded_dates: self.excluded_dates,
            parent_task_id: self.parent_task_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Data for creating a new plain task or template. A `start_date` makes
/// the task a template; the task type is derived when not given.
#[derive(Debug, Clone, Default)]
pub struct NewTaskData {
    pub title: String,
    pub task_type: Option<TaskType>,
    pub notes: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub due_time: Option<NaiveTime>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub days_selected: Option<WeekdaySet>,
    pub recurrence_interval: Option<u32>,
    pub parent_task_id: Option<RecordId>,
}

/// Field edits requested for an existing task. Double options distinguish
/// "leave alone" from "clear".
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub notes: Option<Option<String>>,
    pub due_date: Option<Option<NaiveDate>>,
    pub due_time: Option<Option<NaiveTime>>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<Option<NaiveDate>>,
    pub days_selected: Option<Option<WeekdaySet>>,
    pub recurrence_interval: Option<Option<u32>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.notes.is_none()
            && self.due_date.is_none()
            && self.due_time.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.days_selected.is_none()
            && self.recurrence_interval.is_none()
    }

    /// Whether the edit touches schedule-defining fields, which forces a
    /// template to re-materialize its virtual instances.
    pub fn touches_schedule(&self) -> bool {
        self.start_date.is_some()
            || self.end_date.is_some()
            || self.days_selected.is_some()
            || self.recurrence_interval.is_some()
    }

    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(notes) = &self.notes {
            task.notes = notes.clone();
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(due_time) = self.due_time {
            task.due_time = due_time;
        }
        if let Some(start_date) = self.start_date {
            task.start_date = Some(start_date);
        }
        if let Some(end_date) = self.end_date {
            task.end_date = end_date;
        }
        if let Some(days) = self.days_selected {
            task.days_selected = days;
        }
        if let Some(interval) = self.recurrence_interval {
            task.recurrence_interval = interval;
        }
        task.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn weekday_set_round_trips_through_json() {
        let set: WeekdaySet = [Weekday::Mon, Weekday::Wed].into_iter().collect();
        let json = set.to_string();
        assert_eq!(json, r#"["mon","wed"]"#);
        assert_eq!(json.parse::<WeekdaySet>().unwrap(), set);
    }

    #[test]
    fn weekday_set_accepts_long_names() {
        let set: WeekdaySet = r#"["Monday","friday"]"#.parse().unwrap();
        assert!(set.contains(Weekday::Mon));
        assert!(set.contains(Weekday::Fri));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn date_set_uses_canonical_date_strings() {
        let set: DateSet = [date(2026, 2, 4), date(2026, 2, 2)].into_iter().collect();
        assert_eq!(set.to_string(), r#"["2026-02-02","2026-02-04"]"#);
        assert_eq!(set.to_string().parse::<DateSet>().unwrap(), set);
    }

    #[test]
    fn classify_template() {
        let row = TaskRow {
            is_template: true,
            task_type: TaskType::Routine,
            start_date: Some(date(2026, 2, 1)),
            ..Default::default()
        };
        assert_eq!(Task::from(row).kind(), TaskKind::Template);
    }

    #[test]
    fn classify_override_requires_non_related_type() {
        let parent = RecordId::generate();
        let over = TaskRow {
            task_type: TaskType::Routine,
            parent_task_id: Some(parent),
            ..Default::default()
        };
        assert_eq!(Task::from(over).kind(), TaskKind::PersistedOverride);

        let related = TaskRow {
            task_type: TaskType::Related,
            parent_task_id: Some(parent),
            ..Default::default()
        };
        assert_eq!(Task::from(related).kind(), TaskKind::Plain);
    }

    #[test]
    fn classify_virtual_instance_by_typed_id() {
        let template = RecordId::generate();
        let mut task = Task::from(TaskRow {
            task_type: TaskType::Routine,
            parent_task_id: Some(template),
            ..Default::default()
        });
        task.id = TaskId::Instance(InstanceRef::new(template, date(2026, 2, 2)));
        assert_eq!(task.kind(), TaskKind::VirtualInstance);
    }

    #[test]
    fn new_template_derives_type_from_rule() {
        let routine = TaskRow::from_new(
            NewTaskData {
                title: "Gym".to_string(),
                start_date: Some(date(2026, 2, 1)),
                days_selected: Some([Weekday::Mon].into_iter().collect()),
                ..Default::default()
            },
            Uuid::nil(),
        )
        .unwrap();
        assert!(routine.is_template);
        assert_eq!(routine.task_type, TaskType::Routine);

        let interval = TaskRow::from_new(
            NewTaskData {
                title: "Rent".to_string(),
                start_date: Some(date(2026, 1, 15)),
                recurrence_interval: Some(1),
                ..Default::default()
            },
            Uuid::nil(),
        )
        .unwrap();
        assert_eq!(interval.task_type, TaskType::LongInterval);
    }

    #[test]
    fn new_rule_without_start_date_is_rejected() {
        let result = TaskRow::from_new(
            NewTaskData {
                title: "Broken".to_string(),
                recurrence_interval: Some(2),
                ..Default::default()
            },
            Uuid::nil(),
        );
        assert!(matches!(result, Err(CoreError::InvalidInput(_))));
    }
}
