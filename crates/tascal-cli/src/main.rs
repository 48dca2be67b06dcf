use clap::Parser;
use dialoguer::Confirm;
use owo_colors::{OwoColorize, Style};
use tascal_core::coordinator::Coordinator;
use tascal_core::db;
use tascal_core::error::CoreError;
use tascal_core::store::SqliteStore;
use tracing_subscriber::EnvFilter;
use util::resolve_task_id;

mod cli;
mod commands;
mod config;
mod parser;
mod util;
mod views;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = config::Config::new().unwrap_or_default();
    let db_pool = match db::establish_connection(&config.database_path).await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };
    let store = SqliteStore::new(db_pool);
    let mut planner = Coordinator::new(store, config.user_id);
    planner.load().await;

    let cli = cli::Cli::parse();

    let result = match cli.command {
        cli::Commands::Add(command) => commands::add::add_task(&mut planner, command).await,
        cli::Commands::List(command) => commands::list::list_tasks(&mut planner, command).await,
        cli::Commands::Done(command) => commands::done::done_task(&mut planner, command).await,
        cli::Commands::Edit(command) => commands::edit::edit_task(&mut planner, command).await,
        cli::Commands::Delete(command) => {
            let task_id = match resolve_task_id(&planner, &command.id) {
                Ok(id) => id,
                Err(e) => {
                    handle_error(e);
                    return;
                }
            };
            let task = match planner.working_set().get(&task_id) {
                Some(task) => task,
                None => {
                    let error_style = Style::new().red().bold();
                    eprintln!(
                        "{} Task with ID '{}' not found.",
                        "Error:".style(error_style),
                        task_id
                    );
                    return;
                }
            };

            if !command.force {
                let confirmation = Confirm::new()
                    .with_prompt(format!(
                        "Are you sure you want to delete task '{}'?",
                        task.title
                    ))
                    .default(false)
                    .interact()
                    .unwrap_or(false);

                if !confirmation {
                    println!("Deletion cancelled.");
                    return;
                }
            }
            commands::delete::delete_task(&mut planner, task_id).await
        }
    };

    if let Err(e) = result {
        handle_error(e);
    }
}

fn handle_error(err: anyhow::Error) {
    let error_style = Style::new().red().bold();

    if let Some(core_error) = err.downcast_ref::<CoreError>() {
        match core_error {
            CoreError::NotFound(s) => {
                eprintln!("{} {}", "Error:".style(error_style), s);
            }
            CoreError::AmbiguousId(tasks) => {
                eprintln!("{}", "Error: Ambiguous ID.".style(error_style));
                eprintln!("Did you mean one of these?");
                for (id, title) in tasks {
                    eprintln!("  {} ({})", id.yellow(), title);
                }
            }
            CoreError::InvalidInput(s) => {
                eprintln!("{} Invalid input: {}", "Error:".style(error_style), s);
            }
            CoreError::MalformedId(s) => {
                eprintln!("{} Malformed task id: {}", "Error:".style(error_style), s);
            }
            _ => eprintln!("{} {}", "Error:".style(error_style), err),
        }
    } else {
        eprintln!("{} {}", "Error:".style(error_style), err);
    }
}
