use clap::{Parser, Subcommand};

/// A personal planner for one-off and recurring tasks
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Add a new task or recurring template
    Add(AddCommand),
    /// List tasks
    List(ListCommand),
    /// Toggle a task done or not done
    Done(DoneCommand),
    /// Edit a task
    Edit(EditCommand),
    /// Delete a task
    Delete(DeleteCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct AddCommand {
    /// The title of the task
    pub title: String,
    /// Notes for the task
    #[clap(short, long)]
    pub notes: Option<String>,
    /// The due date (e.g. '2026-02-09', 'today', 'tomorrow')
    #[clap(short, long)]
    pub due: Option<String>,
    /// Time of day (e.g. '09:30')
    #[clap(long)]
    pub at: Option<String>,
    /// Link this task under a parent task
    #[clap(long)]
    pub parent: Option<String>,
    /// Start date of a recurring template; makes the task recurring
    #[clap(long)]
    pub from: Option<String>,
    /// End date of a recurring template (defaults to three months after start)
    #[clap(long, requires = "from")]
    pub until: Option<String>,
    /// Days of week to repeat on (e.g. 'mon,wed,fri')
    #[clap(long, requires = "from", conflicts_with = "every_months")]
    pub on: Option<String>,
    /// Repeat every N whole months
    #[clap(long, requires = "from")]
    pub every_months: Option<u32>,
}

#[derive(Parser, Debug, Clone)]
pub struct ListCommand {
    /// Only show tasks due on or after this date
    #[clap(long)]
    pub from: Option<String>,
    /// Only show tasks due on or before this date
    #[clap(long, requires = "from")]
    pub to: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct DoneCommand {
    /// The ID of the task to toggle
    pub id: String,
}

#[derive(Parser, Debug, Clone)]
pub struct EditCommand {
    /// The ID of the task to edit
    pub id: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,
    #[arg(long, conflicts_with = "notes")]
    pub notes_clear: bool,

    #[arg(long)]
    pub due: Option<String>,
    #[arg(long, conflicts_with = "due")]
    pub due_clear: bool,

    /// Time of day (e.g. '09:30')
    #[arg(long)]
    pub at: Option<String>,
    #[arg(long, conflicts_with = "at")]
    pub at_clear: bool,

    /// Move a template's start date
    #[arg(long)]
    pub from: Option<String>,

    /// Move a template's end date
    #[arg(long)]
    pub until: Option<String>,
    #[arg(long, conflicts_with = "until")]
    pub until_clear: bool,

    /// Change a template's weekday rule (e.g. 'mon,wed')
    #[arg(long)]
    pub on: Option<String>,
    #[arg(long, conflicts_with = "on")]
    pub on_clear: bool,

    /// Change a template's month interval
    #[arg(long)]
    pub every_months: Option<u32>,
    #[arg(long, conflicts_with = "every_months")]
    pub every_months_clear: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct DeleteCommand {
    /// The ID of the task to delete
    pub id: String,
    /// Force deletion without confirmation
    #[clap(short, long)]
    pub force: bool,
}
