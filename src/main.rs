use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use colored::Colorize;
use eyre::{Result, eyre};
use std::path::PathBuf;
use std::process;
use todolist::calendar;
use todolist::transfer;
use todolist::{Category, CategoryFilter, Config, ListView, PageSize, Slot, Task, TaskDraft, TaskEdit, TaskStore};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "todolist")]
#[command(about = "To-do list manager with local storage and Excel import/export")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Path to a YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding task storage (overrides config)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a task
    Add {
        description: String,

        /// Start date, YYYY-MM-DD (default: today)
        #[arg(long, value_parser = parse_date)]
        start: Option<NaiveDate>,

        /// Due date, YYYY-MM-DD
        #[arg(long, value_parser = parse_date)]
        due: NaiveDate,

        #[arg(long, default_value = "Work")]
        category: Category,
    },

    /// Change a task's description, dates or category
    Edit {
        id: i64,

        #[arg(long)]
        description: Option<String>,

        #[arg(long, value_parser = parse_date)]
        start: Option<NaiveDate>,

        #[arg(long, value_parser = parse_date)]
        due: Option<NaiveDate>,

        #[arg(long)]
        category: Option<Category>,
    },

    /// Toggle a task's completion
    Done { id: i64 },

    /// Delete a task
    Rm { id: i64 },

    /// Show one task
    Show { id: i64 },

    /// List tasks
    List {
        /// Case-insensitive description search
        #[arg(short, long, default_value = "")]
        search: String,

        /// All, Work, Personal, Urgent, Completed, Incomplete or Expired
        #[arg(short = 'C', long, default_value = "All")]
        category: CategoryFilter,

        /// Sort by due date descending
        #[arg(long)]
        desc: bool,

        /// 5, 10, 15 or 20
        #[arg(long)]
        page_size: Option<PageSize>,

        #[arg(short, long, default_value_t = 1)]
        page: usize,
    },

    /// Export all tasks to an .xlsx file
    Export { path: Option<PathBuf> },

    /// Import tasks from an .xlsx file
    Import { path: PathBuf },

    /// Show tasks on a month calendar
    Calendar {
        /// Month as YYYY-MM (default: current month)
        #[arg(long, value_parser = parse_month)]
        month: Option<(i32, u32)>,
    },

    /// Move or resize a task's date range; END is exclusive
    Move {
        id: i64,

        #[arg(long, value_parser = parse_date)]
        start: NaiveDate,

        #[arg(long, value_parser = parse_date)]
        end: NaiveDate,
    },
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("invalid date '{}': {}", s, e))
}

fn parse_month(s: &str) -> Result<(i32, u32), String> {
    let date = NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d")
        .map_err(|_| format!("invalid month '{}', expected YYYY-MM", s))?;
    Ok(calendar::month_of(date))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.storage.data_dir = Some(dir);
    }

    let today = Local::now().date_naive();
    let mut store = TaskStore::open(config.open_slot()?, today)?;

    match cli.command {
        Commands::Add {
            description,
            start,
            due,
            category,
        } => {
            let draft = TaskDraft {
                description,
                start_date: start.unwrap_or(today),
                due_date: due,
                category,
            };
            let task = store.create(draft, today).map_err(|e| eyre!("{}", e))?;
            println!("Task added successfully! (ID {})", task.id);
        }
        Commands::Edit {
            id,
            description,
            start,
            due,
            category,
        } => {
            let current = store.get(id).ok_or_else(|| eyre!("No task with ID {}", id))?;
            let mut edit = TaskEdit::from_task(current);
            if let Some(description) = description {
                edit.description = description;
            }
            if let Some(start) = start {
                edit.start_date = start;
            }
            if let Some(due) = due {
                edit.due_date = due;
            }
            if let Some(category) = category {
                edit.category = category;
            }
            store.edit(id, edit).map_err(|e| eyre!("{}", e))?;
            println!("Task edited successfully!");
        }
        Commands::Done { id } => {
            if store.toggle_completed(id)? {
                let done = store.get(id).is_some_and(|t| t.is_completed);
                println!("Task {} marked {}.", id, if done { "complete" } else { "incomplete" });
            } else {
                println!("No task with ID {}.", id);
            }
        }
        Commands::Rm { id } => {
            if store.delete(id)? {
                println!("Task deleted successfully!");
            } else {
                println!("No task with ID {}.", id);
            }
        }
        Commands::Show { id } => {
            let task = store.get(id).ok_or_else(|| eyre!("No task with ID {}", id))?;
            print_task(task);
        }
        Commands::List {
            search,
            category,
            desc,
            page_size,
            page,
        } => {
            let mut view = ListView::new(page_size.unwrap_or(config.view.page_size), config.view.sort);
            if desc {
                view.set_sort(todolist::SortOrder::Desc);
            }
            view.set_search(search);
            view.set_selector(category);
            print_list(&store, &mut view, page)?;
        }
        Commands::Export { path } => {
            let path = path.unwrap_or_else(|| PathBuf::from(&config.export.file_name));
            transfer::export_xlsx(store.tasks(), &path)?;
            println!("Exported {} tasks to {}", store.len(), path.display());
        }
        Commands::Import { path } => match transfer::import_xlsx(&mut store, &path, today) {
            Ok(report) => println!("{}", report.message()),
            Err(e) => {
                warn!(file = ?path, error = %e, "Import failed");
                eprintln!("{}", e.user_message().red());
                process::exit(1);
            }
        },
        Commands::Calendar { month } => {
            let (year, month) = month.unwrap_or_else(|| calendar::month_of(today));
            let events = calendar::events_in_month(store.tasks(), year, month)
                .ok_or_else(|| eyre!("Invalid month {}-{:02}", year, month))?;
            println!("{}", format!("{}-{:02}", year, month).bold());
            if events.is_empty() {
                println!("No tasks this month.");
            }
            for event in events {
                let line = format!(
                    "{} .. {}  {} [{}] (ID {})",
                    event.start,
                    event.last_day(),
                    event.title,
                    event.category,
                    event.id
                );
                println!("{}", style(&line, event.is_completed, event.is_expired));
            }
        }
        Commands::Move { id, start, end } => {
            if store.reschedule(id, start, end).map_err(|e| eyre!("{}", e))? {
                println!("Task {} rescheduled.", id);
            } else {
                println!("No task with ID {}.", id);
            }
        }
    }

    Ok(())
}

fn print_list<S: Slot>(store: &TaskStore<S>, view: &mut ListView, page: usize) -> Result<()> {
    if store.is_empty() {
        println!("Add your task now to get started!");
        return Ok(());
    }

    let total = view.count_matching(store.tasks());
    if page != 1 {
        view.go_to(page, total)?;
    }

    let rendered = view.render(store.tasks());
    if !view.search().is_empty() || view.selector() != CategoryFilter::All {
        println!("{}", format!("Filter: {}, search: '{}'", view.selector(), view.search()).dimmed());
    }
    if rendered.items.is_empty() {
        println!("No tasks match your search criteria. Try changing the search keyword or adjusting your filters!");
    }
    for task in &rendered.items {
        print_row(task);
    }
    println!(
        "Page {} of {} ({} tasks, {} per page, due date {})",
        rendered.page,
        rendered.page_count,
        rendered.total,
        view.page_size(),
        match view.sort() {
            todolist::SortOrder::Asc => "ascending",
            todolist::SortOrder::Desc => "descending",
        }
    );
    Ok(())
}

fn print_row(task: &Task) {
    let mark = if task.is_completed { "[x]" } else { "[ ]" };
    let line = format!(
        "{} {:>14}  {}  {} .. {}  {}",
        mark, task.id, task.description, task.start_date, task.due_date, task.category
    );
    println!("{}", style(&line, task.is_completed, task.is_expired));
}

fn print_task(task: &Task) {
    println!("{}", task.description.bold());
    println!("  ID:        {}", task.id);
    println!("  Start:     {}", task.start_date);
    println!("  Due:       {}", task.due_date);
    println!("  Category:  {}", task.category);
    println!("  Completed: {}", task.is_completed);
    println!("  Expired:   {}", task.is_expired);
}

fn style(line: &str, completed: bool, expired: bool) -> colored::ColoredString {
    match (completed, expired) {
        (true, _) => line.green().strikethrough(),
        (false, true) => line.red(),
        (false, false) => line.normal(),
    }
}
