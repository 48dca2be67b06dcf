use anyhow::Result;
use tascal_core::coordinator::{Coordinator, MutationOutcome};
use tascal_core::ident::TaskId;
use tascal_core::store::RecordStore;

pub async fn delete_task(
    planner: &mut Coordinator<impl RecordStore>,
    task_id: TaskId,
) -> Result<()> {
    let outcome = planner.delete(task_id).await?;
    match outcome {
        MutationOutcome::Committed => {
            if task_id.is_virtual() {
                println!("Deleted occurrence {task_id}; it will not come back.");
            } else {
                println!("Deleted task with ID: {task_id}");
            }
        }
        MutationOutcome::RolledBack => {
            println!("Could not save the deletion; the task was left as it was.");
        }
        MutationOutcome::Ignored => {}
    }
    Ok(())
}
