use anyhow::{anyhow, Result};
use tascal_core::coordinator::Coordinator;
use tascal_core::error::CoreError;
use tascal_core::ident::{RecordId, TaskId};
use tascal_core::store::RecordStore;

use crate::parser::parse_date;

/// Resolves user input to a task id against the loaded working set.
///
/// Accepts a full id (UUID or `uuid_YYYY-MM-DD`), a short prefix of a
/// persisted id, or `prefix_YYYY-MM-DD` for a virtual instance. Bare
/// prefixes only match persisted ids; a template and its instances share
/// a prefix, so instances must be addressed with their date.
pub fn resolve_task_id(planner: &Coordinator<impl RecordStore>, input: &str) -> Result<TaskId> {
    if let Ok(id) = input.parse::<TaskId>() {
        return Ok(id);
    }

    if let Some((head, tail)) = input.split_once('_') {
        let date = parse_date(tail)?;
        let matches = collect_matches(planner, |id| match id {
            TaskId::Instance(instance) => {
                instance.date == date && instance.template_id.to_string().starts_with(head)
            }
            TaskId::Record(_) => false,
        });
        return pick(matches, input);
    }

    if input.len() < 2 {
        return Err(anyhow!(CoreError::InvalidInput(
            "Short ID must be at least 2 characters long.".to_string()
        )));
    }
    let matches = collect_matches(planner, |id| match id {
        TaskId::Record(record) => record.to_string().starts_with(input),
        TaskId::Instance(_) => false,
    });
    pick(matches, input)
}

/// Resolves input that must name a persisted row (e.g. a parent link).
pub fn resolve_record_id(planner: &Coordinator<impl RecordStore>, input: &str) -> Result<RecordId> {
    match resolve_task_id(planner, input)? {
        TaskId::Record(id) => Ok(id),
        TaskId::Instance(_) => Err(anyhow!(CoreError::InvalidInput(
            "A virtual occurrence cannot be used here; use its template instead.".to_string()
        ))),
    }
}

fn collect_matches(
    planner: &Coordinator<impl RecordStore>,
    predicate: impl Fn(&TaskId) -> bool,
) -> Vec<(TaskId, String)> {
    planner
        .working_set()
        .iter()
        .filter(|task| predicate(&task.id))
        .map(|task| (task.id, task.title.clone()))
        .collect()
}

fn pick(mut matches: Vec<(TaskId, String)>, input: &str) -> Result<TaskId> {
    match matches.len() {
        1 => Ok(matches.remove(0).0),
        0 => Err(anyhow!(CoreError::NotFound(format!(
            "No task found with ID prefix '{input}'"
        )))),
        _ => Err(anyhow!(CoreError::AmbiguousId(
            matches
                .into_iter()
                .map(|(id, title)| (id.to_string(), title))
                .collect()
        ))),
    }
}
