//! Override reconciliation: merging persisted per-occurrence edits into
//! the materialized instance sequence.
//!
//! For each template and eligible date the unified collection ends up
//! with exactly one occurrence: the persisted override row when one
//! exists for that `(template, date)` pair, the freshly synthesized
//! virtual instance otherwise.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::expand::expand_template;
use crate::ident::RecordId;
use crate::materialize::materialize;
use crate::models::{Task, TaskRow, TaskType};

/// Persisted rows split by shape.
#[derive(Debug, Default)]
pub struct Partition {
    pub templates: Vec<TaskRow>,
    pub plain: Vec<TaskRow>,
    pub overrides: Vec<TaskRow>,
}

/// An override row points at a template and is not itself a template.
/// `related` rows share the `parent_task_id` column but are plain tasks;
/// the type check keeps them out of override treatment.
pub fn is_override_row(row: &TaskRow) -> bool {
    row.parent_task_id.is_some() && !row.is_template && row.task_type != TaskType::Related
}

pub fn partition(rows: Vec<TaskRow>) -> Partition {
    let mut split = Partition::default();
    for row in rows {
        if row.is_template {
            split.templates.push(row);
        } else if is_override_row(&row) {
            split.overrides.push(row);
        } else {
            split.plain.push(row);
        }
    }
    split
}

/// Override rows keyed by `(parent_task_id, date)` for O(1) lookup during
/// reconciliation.
#[derive(Debug, Default)]
pub struct OverrideIndex {
    by_occurrence: HashMap<(RecordId, NaiveDate), TaskRow>,
}

impl OverrideIndex {
    pub fn build(overrides: Vec<TaskRow>) -> Self {
        let mut by_occurrence = HashMap::with_capacity(overrides.len());
        for row in overrides {
            let (Some(parent), Some(date)) = (row.parent_task_id, row.due_date) else {
                // An override without a date has no occurrence slot to
                // claim; it can never be surfaced.
                continue;
            };
            by_occurrence.insert((parent, date), row);
        }
        Self { by_occurrence }
    }

    pub fn get(&self, template: RecordId, date: NaiveDate) -> Option<&TaskRow> {
        self.by_occurrence.get(&(template, date))
    }

    pub fn len(&self) -> usize {
        self.by_occurrence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_occurrence.is_empty()
    }
}

/// Expands and materializes one template, substituting the override row
/// wherever one exists for a candidate date.
pub fn reconcile_template(
    template: &TaskRow,
    dates: &[NaiveDate],
    overrides: &OverrideIndex,
) -> Vec<Task> {
    materialize(template, dates)
        .into_iter()
        .map(|instance| match instance.due_date {
            Some(date) => match overrides.get(template.id, date) {
                Some(row) => Task::from(row.clone()),
                None => instance,
            },
            None => instance,
        })
        .collect()
}

/// Builds the full unified collection from every persisted row of a user:
/// plain tasks and templates pass through; each template additionally
/// contributes its reconciled occurrence sequence.
pub fn unify(rows: Vec<TaskRow>) -> Vec<Task> {
    let Partition {
        templates,
        plain,
        overrides,
    } = partition(rows);
    let index = OverrideIndex::build(overrides);

    let mut tasks: Vec<Task> = plain.into_iter().map(Task::from).collect();
    for template in &templates {
        let dates = expand_template(template);
        tasks.extend(reconcile_template(template, &dates, &index));
    }
    tasks.extend(templates.into_iter().map(Task::from));
    tasks
}

/// Bounded variant for range queries. Templates still expand over their
/// own full range and reconcile first; only then are occurrences outside
/// `[start, end]` discarded. Filtering before reconciliation could let a
/// stray override leak through at the wrong date.
pub fn unify_bounded(rows: Vec<TaskRow>, start: NaiveDate, end: NaiveDate) -> Vec<Task> {
    let Partition {
        templates,
        plain,
        overrides,
    } = partition(rows);
    let index = OverrideIndex::build(overrides);

    let mut tasks: Vec<Task> = plain.into_iter().map(Task::from).collect();
    for template in &templates {
        let dates = expand_template(template);
        let mut occurrences = reconcile_template(template, &dates, &index);
        occurrences.retain(|task| {
            task.due_date
                .is_some_and(|date| date >= start && date <= end)
        });
        tasks.extend(occurrences);
    }
    tasks.extend(templates.into_iter().map(Task::from));
    tasks
}
