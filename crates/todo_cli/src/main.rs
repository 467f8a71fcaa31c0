//! Command-line front end for the todo store.
//!
//! # Responsibility
//! - Stand in for a view layer: collect input, validate titles, call store
//!   operations and render the resulting snapshot.
//! - Keep storage details behind `todo_core`.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::warn;
use std::path::PathBuf;
use todo_core::{
    default_log_level, init_logging, validate_title, NewTodo, Priority, StatusFilter, StoreConfig,
    Todo, TodoFilter, TodoId, TodoStore, DEFAULT_DB_FILE_NAME,
};
use uuid::Uuid;

/// Local-first todo list backed by an embedded SQLite database.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the todo database file
    #[arg(long, env = "TODO_DB", default_value = DEFAULT_DB_FILE_NAME, global = true)]
    db: PathBuf,

    /// Use a throwaway in-memory database instead of `--db`
    #[arg(long, global = true)]
    memory: bool,

    /// Absolute directory for rolling log files; logging is off when unset
    #[arg(long, env = "TODO_LOG_DIR", global = true)]
    log_dir: Option<String>,

    /// Log level: trace|debug|info|warn|error
    #[arg(long, env = "TODO_LOG_LEVEL", global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add a new todo
    Add(AddArgs),
    /// List todos, optionally filtered
    List(ListArgs),
    /// Show one todo as stored
    Show { id: String },
    /// Edit fields of an existing todo
    Edit(EditArgs),
    /// Flip the completed flag of a todo
    Toggle { id: String },
    /// Delete a todo
    Delete { id: String },
    /// Delete every completed todo
    ClearCompleted,
}

#[derive(Args, Debug)]
struct AddArgs {
    title: String,
    #[arg(long, short)]
    description: Option<String>,
    #[arg(long, short)]
    priority: Option<Priority>,
    #[arg(long)]
    completed: bool,
}

#[derive(Args, Debug)]
struct ListArgs {
    /// all|active|completed
    #[arg(long, short, default_value = "all")]
    status: StatusFilter,
    #[arg(long, short)]
    priority: Option<Priority>,
    /// Print the filtered list as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct EditArgs {
    id: String,
    #[arg(long, short)]
    title: Option<String>,
    #[arg(long, short, conflicts_with = "clear_description")]
    description: Option<String>,
    #[arg(long)]
    clear_description: bool,
    #[arg(long, short)]
    priority: Option<Priority>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        if let Err(err) = init_logging(level, log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    let config = if cli.memory {
        StoreConfig::in_memory()
    } else {
        StoreConfig::file(&cli.db)
    };
    let mut store = TodoStore::open(&config);
    if let Some(reason) = store.unavailable_reason() {
        warn!("event=cli_start module=cli status=degraded");
        eprintln!("warning: {reason}; changes will not be saved");
    }

    run(&mut store, cli.command)
}

fn run(store: &mut TodoStore, command: Command) -> Result<()> {
    match command {
        Command::Add(args) => {
            let mut request = NewTodo::new(args.title.trim());
            request.description = args.description;
            request.priority = args.priority;
            request.completed = Some(args.completed);
            request.validate()?;
            let todo = store.add(request)?;
            println!("added {}", todo.id);
        }
        Command::List(args) => {
            let filter = TodoFilter::new(args.status, args.priority);
            let todos = filter.apply(&store.list());
            if args.json {
                println!("{}", serde_json::to_string_pretty(&todos)?);
            } else {
                print_list(&todos, store.active_count());
            }
        }
        Command::Show { id } => {
            let id = parse_id(&id)?;
            match store.get(&id)? {
                Some(todo) => println!("{}", serde_json::to_string_pretty(&todo)?),
                None => bail!("todo not found: {id}"),
            }
        }
        Command::Edit(args) => {
            let id = parse_id(&args.id)?;
            // Edit buffer: a disposable copy merged back through `update`.
            let mut draft = store
                .find(&id)
                .cloned()
                .with_context(|| format!("todo not found: {id}"))?;
            if let Some(title) = args.title {
                validate_title(&title)?;
                draft.title = title.trim().to_string();
            }
            if args.clear_description {
                draft.description = None;
            } else if let Some(description) = args.description {
                draft.description = Some(description);
            }
            if let Some(priority) = args.priority {
                draft.priority = priority;
            }
            let todo = store.update(draft)?;
            println!("updated {}", todo.id);
        }
        Command::Toggle { id } => {
            let todo = store.toggle_completed(&parse_id(&id)?)?;
            let state = if todo.completed { "completed" } else { "active" };
            println!("{} is now {state}", todo.id);
        }
        Command::Delete { id } => {
            store.delete(&parse_id(&id)?)?;
            println!("deleted {id}");
        }
        Command::ClearCompleted => {
            let report = store.clear_completed();
            for (id, err) in &report.failed {
                eprintln!("failed to delete {id}: {err}");
            }
            println!("cleared {} completed todos", report.removed.len());
            if !report.is_complete() {
                bail!("{} completed todos could not be deleted", report.failed.len());
            }
        }
    }
    Ok(())
}

fn parse_id(value: &str) -> Result<TodoId> {
    Uuid::parse_str(value.trim()).with_context(|| format!("invalid todo id `{value}`"))
}

fn print_list(todos: &[Todo], active_count: usize) {
    if todos.is_empty() {
        println!("No todos found. Add a new one!");
    }
    for todo in todos {
        let mark = if todo.completed { 'x' } else { ' ' };
        println!("[{mark}] {} {:<6} {}", todo.id, todo.priority, todo.title);
        if let Some(description) = todo.description.as_deref() {
            println!("      {description}");
        }
    }
    println!("{active_count} items left");
}
