use anyhow::Result;
use tascal_core::coordinator::{Coordinator, MutationOutcome};
use tascal_core::models::{TaskKind, TaskPatch};
use tascal_core::store::RecordStore;

use crate::cli::EditCommand;
use crate::parser::{parse_date, parse_time, parse_weekdays};
use crate::util::resolve_task_id;

pub async fn edit_task(
    planner: &mut Coordinator<impl RecordStore>,
    command: EditCommand,
) -> Result<()> {
    let task_id = resolve_task_id(planner, &command.id)?;
    let kind = planner.working_set().get(&task_id).map(|task| task.kind());

    let notes = if command.notes_clear {
        Some(None)
    } else {
        command.notes.map(Some)
    };

    let due_date = if command.due_clear {
        Some(None)
    } else if let Some(due) = &command.due {
        Some(Some(parse_date(due)?))
    } else {
        None
    };

    let due_time = if command.at_clear {
        Some(None)
    } else if let Some(at) = &command.at {
        Some(Some(parse_time(at)?))
    } else {
        None
    };

    let end_date = if command.until_clear {
        Some(None)
    } else if let Some(until) = &command.until {
        Some(Some(parse_date(until)?))
    } else {
        None
    };

    let days_selected = if command.on_clear {
        Some(None)
    } else if let Some(on) = &command.on {
        Some(Some(parse_weekdays(on)?))
    } else {
        None
    };

    let recurrence_interval = if command.every_months_clear {
        Some(None)
    } else {
        command.every_months.map(Some)
    };

    let patch = TaskPatch {
        title: command.title,
        notes,
        due_date,
        due_time,
        start_date: command.from.as_deref().map(parse_date).transpose()?,
        end_date,
        days_selected,
        recurrence_interval,
    };

    let outcome = planner.update(task_id, patch).await?;
    match outcome {
        MutationOutcome::Committed => match kind {
            Some(TaskKind::VirtualInstance) => {
                // The edited occurrence now lives in its own row.
                println!("Updated occurrence; it is now saved on its own.");
            }
            Some(TaskKind::Template) => {
                println!("Updated recurring task with ID: {task_id}");
            }
            _ => println!("Updated task with ID: {task_id}"),
        },
        MutationOutcome::RolledBack => {
            println!("Could not save the change; the task was left as it was.");
        }
        MutationOutcome::Ignored => {
            println!("Nothing to update.");
        }
    }

    Ok(())
}
