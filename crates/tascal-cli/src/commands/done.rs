use anyhow::Result;
use tascal_core::coordinator::{Coordinator, MutationOutcome};
use tascal_core::store::RecordStore;

use crate::cli::DoneCommand;
use crate::util::resolve_task_id;

pub async fn done_task(
    planner: &mut Coordinator<impl RecordStore>,
    command: DoneCommand,
) -> Result<()> {
    let task_id = resolve_task_id(planner, &command.id)?;

    let outcome = planner.toggle(task_id).await?;
    match outcome {
        MutationOutcome::Committed => {
            let completed = planner
                .working_set()
                .get(&task_id)
                .map(|task| task.completed)
                .unwrap_or(false);
            if completed {
                println!("Marked task as done: {task_id}");
            } else {
                println!("Marked task as not done: {task_id}");
            }
        }
        MutationOutcome::RolledBack => {
            println!("Could not save the change; the task was left as it was.");
        }
        MutationOutcome::Ignored => {
            println!("A recurring template has no done state; toggle one of its occurrences.");
        }
    }

    Ok(())
}
