use anyhow::Result;
use tascal_core::coordinator::{Coordinator, MutationOutcome};
use tascal_core::models::NewTaskData;
use tascal_core::store::RecordStore;

use crate::cli::AddCommand;
use crate::parser::{parse_date, parse_time, parse_weekdays};
use crate::util::resolve_record_id;

pub async fn add_task(
    planner: &mut Coordinator<impl RecordStore>,
    command: AddCommand,
) -> Result<()> {
    let parent_task_id = match &command.parent {
        Some(parent) => Some(resolve_record_id(planner, parent)?),
        None => None,
    };

    let data = NewTaskData {
        title: command.title,
        task_type: None,
        notes: command.notes,
        due_date: command.due.as_deref().map(parse_date).transpose()?,
        due_time: command.at.as_deref().map(parse_time).transpose()?,
        start_date: command.from.as_deref().map(parse_date).transpose()?,
        end_date: command.until.as_deref().map(parse_date).transpose()?,
        days_selected: command.on.as_deref().map(parse_weekdays).transpose()?,
        recurrence_interval: command.every_months,
        parent_task_id,
    };

    let (task, outcome) = planner.create(data).await?;
    match outcome {
        MutationOutcome::Committed => {
            if task.is_template {
                println!("Added recurring task '{}' with ID: {}", task.title, task.id);
            } else {
                println!("Added task '{}' with ID: {}", task.title, task.id);
            }
        }
        MutationOutcome::RolledBack => {
            println!("Could not save the new task; nothing was added.");
        }
        MutationOutcome::Ignored => {}
    }

    Ok(())
}
