use chrono::{Local, NaiveDate, NaiveTime};
use comfy_table::{Attribute, Cell, Color, Row, Table};
use tascal_core::ident::TaskId;
use tascal_core::models::{Task, TaskKind};

#[derive(Debug, Clone)]
pub struct ViewTask {
    pub id: TaskId,
    pub title: String,
    pub kind: TaskKind,
    pub due_date: Option<NaiveDate>,
    pub due_time: Option<NaiveTime>,
    pub completed: bool,
}

impl From<&Task> for ViewTask {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            kind: task.kind(),
            due_date: task.due_date,
            due_time: task.due_time,
            completed: task.completed,
        }
    }
}

/// Short, typeable id: eight UUID characters, date-qualified for virtual
/// occurrences so they stay distinguishable from their template.
fn short_id(id: &TaskId) -> String {
    match id {
        TaskId::Record(record) => record.to_string()[..8].to_string(),
        TaskId::Instance(instance) => {
            format!(
                "{}_{}",
                &instance.template_id.to_string()[..8],
                instance.date.format("%Y-%m-%d")
            )
        }
    }
}

pub fn display_tasks(tasks: &[ViewTask]) {
    if tasks.is_empty() {
        println!("No tasks found.");
        return;
    }

    let today = Local::now().date_naive();
    let mut table = Table::new();
    table.set_header(vec!["ID", "Task", "Due", "Done"]);

    for task in tasks {
        let mut row = Row::new();
        row.add_cell(Cell::new(short_id(&task.id)));

        let mut display_title = String::new();
        match task.kind {
            TaskKind::VirtualInstance => {
                display_title.push('↻');
                display_title.push(' ');
            }
            TaskKind::PersistedOverride => {
                display_title.push('✱');
                display_title.push(' ');
            }
            TaskKind::Plain | TaskKind::Template => {}
        }
        display_title.push_str(&task.title);
        if task.kind == TaskKind::Template {
            display_title.push_str(" (template)");
        }

        let mut title_cell = Cell::new(display_title);
        if task.completed {
            title_cell = title_cell
                .add_attribute(Attribute::CrossedOut)
                .fg(Color::DarkGrey);
        }
        row.add_cell(title_cell);

        let due_cell = match task.due_date {
            Some(date) => {
                let text = match task.due_time {
                    Some(time) => format!("{} {}", date.format("%Y-%m-%d"), time.format("%H:%M")),
                    None => date.format("%Y-%m-%d").to_string(),
                };
                if !task.completed && task.kind != TaskKind::Template && date < today {
                    Cell::new(text).fg(Color::Red)
                } else if !task.completed && date == today {
                    Cell::new(text).fg(Color::Yellow)
                } else {
                    Cell::new(text)
                }
            }
            None => Cell::new("-"),
        };
        row.add_cell(due_cell);

        row.add_cell(Cell::new(if task.completed { "x" } else { " " }));
        table.add_row(row);
    }

    println!("{table}");
}
