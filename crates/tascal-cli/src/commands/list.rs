use anyhow::Result;
use tascal_core::coordinator::Coordinator;
use tascal_core::expand::default_end;
use tascal_core::store::RecordStore;

use crate::cli::ListCommand;
use crate::parser::parse_date;
use crate::views::table::{display_tasks, ViewTask};

pub async fn list_tasks(
    planner: &mut Coordinator<impl RecordStore>,
    command: ListCommand,
) -> Result<()> {
    if let Some(from) = &command.from {
        let start = parse_date(from)?;
        let end = match &command.to {
            Some(to) => parse_date(to)?,
            None => default_end(start),
        };
        planner.load_range(start, end).await;
    }

    let view_tasks: Vec<ViewTask> = planner
        .working_set()
        .sorted()
        .into_iter()
        .map(ViewTask::from)
        .collect();

    display_tasks(&view_tasks);
    Ok(())
}
