//! Command implementations for the CLI interface.
//!
//! Each handler works against an already-opened [`TaskStore`]. Validation
//! failures and unresolved ids are reported on stderr with exit status 1;
//! analysis failures are not errors and simply produce no suggestions.

use std::path::Path;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use clap::Subcommand;
use clap_complete::{generate, Shell};

use crate::config::{AiConfig, Config};
use crate::db::{JsonFileStorage, TaskStorage};
use crate::fields::*;
use crate::gemini::GeminiClient;
use crate::logging::log_file_path;
use crate::store::{short_id, TaskStore, TaskUpdate};
use crate::suggest::SuggestionEngine;
use crate::task::{AiSuggestion, Task};
use crate::tui::run::run_board;

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the interactive matrix board.
    #[command(alias = "ui")]
    Board,

    /// Add a new task.
    Add {
        /// Short name for the task.
        name: String,
        /// Quadrant: do-now | do-later | delegate | eliminate.
        #[arg(long, short, value_enum, default_value_t = QuadrantType::DoNow)]
        quadrant: QuadrantType,
        /// Optional longer description.
        #[arg(long)]
        desc: Option<String>,
        /// Comma-separated labels. May be repeated.
        #[arg(long = "label")]
        labels: Vec<String>,
        /// Due date: YYYY-MM-DD, "today", "tomorrow", "in Nd" or a weekday. Defaults to tomorrow.
        #[arg(long)]
        due: Option<String>,
    },

    /// List tasks grouped by quadrant.
    List {
        /// Only show this quadrant.
        #[arg(long, short, value_enum)]
        quadrant: Option<QuadrantType>,
        /// Hide completed tasks.
        #[arg(long)]
        pending: bool,
    },

    /// Show every detail of one task, including a Google Calendar link.
    Show {
        /// Task id, id fragment, or name
        id: String,
    },

    /// Flip a task between done and not done.
    Toggle {
        /// Task id, id fragment, or name
        id: String,
    },

    /// Move a task to another quadrant.
    Move {
        /// Task id, id fragment, or name
        id: String,
        /// Target quadrant.
        #[arg(value_enum)]
        quadrant: QuadrantType,
    },

    /// Delete a task.
    Delete {
        /// Task id, id fragment, or name
        id: String,
    },

    /// Edit task details.
    Edit {
        /// Task id, id fragment, or name
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        desc: Option<String>,
        #[arg(long)]
        due: Option<String>,
        /// Add labels. May be repeated and comma-separated.
        #[arg(long = "add-label")]
        add_labels: Vec<String>,
        /// Remove labels. May be repeated and comma-separated.
        #[arg(long = "rm-label")]
        rm_labels: Vec<String>,
        /// Remove all labels.
        #[arg(long)]
        clear_labels: bool,
    },

    /// Ask the AI for suggestions about the current board.
    Analyze {
        /// Print suggestions as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Launch the terminal board.
pub fn cmd_board(tasks_path: &Path, ai: &AiConfig) {
    if let Err(e) = run_board(tasks_path, ai) {
        eprintln!("UI error: {e}");
        std::process::exit(1);
    }
}

/// Add a new task, then apply any extra details given on the command line.
pub fn cmd_add<S: TaskStorage>(
    store: &mut TaskStore<S>,
    name: String,
    quadrant: QuadrantType,
    desc: Option<String>,
    labels: Vec<String>,
    due: Option<String>,
) {
    let due_date = due.map(|d| parse_due_or_exit(&d));

    let task = match store.add_task(&name, quadrant) {
        Ok(task) => task,
        Err(e) => {
            eprintln!("Cannot add task: {e}");
            std::process::exit(1);
        }
    };
    ensure_saved(store);

    if desc.is_some() || due_date.is_some() || !labels.is_empty() {
        let update = TaskUpdate {
            description: desc,
            due_date,
            add_labels: labels,
            ..TaskUpdate::default()
        };
        if let Err(e) = store.update_task(&task.id, update) {
            eprintln!("Cannot update task: {e}");
            std::process::exit(1);
        }
        ensure_saved(store);
    }

    println!("Added {} to {}: {}", short_id(&task.id), quadrant, task.name);
}

/// Print tasks grouped by quadrant.
pub fn cmd_list<S: TaskStorage>(store: &TaskStore<S>, quadrant: Option<QuadrantType>, pending: bool) {
    let today = Utc::now().date_naive();
    let quadrants: Vec<QuadrantType> = match quadrant {
        Some(q) => vec![q],
        None => QuadrantType::ALL.to_vec(),
    };

    for (i, q) in quadrants.into_iter().enumerate() {
        let tasks: Vec<&Task> = store
            .list_by_quadrant(q)
            .into_iter()
            .filter(|t| !pending || !t.completed)
            .collect();
        if i > 0 {
            println!();
        }
        let cfg = q.config();
        println!("{} ({}) [{}]", cfg.label, cfg.sublabel, tasks.len());
        print_table(&tasks, today);
    }
}

/// Print the full record of one task.
pub fn cmd_show<S: TaskStorage>(store: &TaskStore<S>, id: String) {
    let task_id = resolve_or_exit(store, &id);
    let Some(task) = store.get(&task_id) else {
        println!("Task {} not found.", short_id(&task_id));
        return;
    };
    println!("{}", task.name);
    for (field, value) in describe_task(task, Utc::now().date_naive()) {
        println!("  {:<12} {}", format!("{field}:"), value);
    }
}

/// Flip completion of a task.
pub fn cmd_toggle<S: TaskStorage>(store: &mut TaskStore<S>, id: String) {
    let task_id = resolve_or_exit(store, &id);
    let completed = store.toggle_task(&task_id).map(|t| t.completed);
    ensure_saved(store);
    match completed {
        Some(true) => println!("Completed {}", short_id(&task_id)),
        Some(false) => println!("Reopened {}", short_id(&task_id)),
        None => println!("Task {} not found.", short_id(&task_id)),
    }
}

/// Move a task to another quadrant.
pub fn cmd_move<S: TaskStorage>(store: &mut TaskStore<S>, id: String, quadrant: QuadrantType) {
    let task_id = resolve_or_exit(store, &id);
    let moved = store.move_task(&task_id, quadrant).is_some();
    ensure_saved(store);
    if moved {
        println!("Moved {} to {}", short_id(&task_id), quadrant);
    }
}

/// Delete a task.
pub fn cmd_delete<S: TaskStorage>(store: &mut TaskStore<S>, id: String) {
    let task_id = resolve_or_exit(store, &id);
    let removed = store.delete_task(&task_id);
    ensure_saved(store);
    if let Some(task) = removed {
        println!("Deleted {}: {}", short_id(&task.id), task.name);
    }
}

/// Edit task details.
pub fn cmd_edit<S: TaskStorage>(
    store: &mut TaskStore<S>,
    id: String,
    name: Option<String>,
    desc: Option<String>,
    due: Option<String>,
    add_labels: Vec<String>,
    rm_labels: Vec<String>,
    clear_labels: bool,
) {
    let task_id = resolve_or_exit(store, &id);
    let update = TaskUpdate {
        name,
        description: desc,
        due_date: due.map(|d| parse_due_or_exit(&d)),
        add_labels,
        remove_labels: rm_labels,
        clear_labels,
    };
    match store.update_task(&task_id, update) {
        Ok(Some(task)) => println!("Updated {}: {}", short_id(&task.id), task.name),
        Ok(None) => println!("Task {} not found.", short_id(&task_id)),
        Err(e) => {
            eprintln!("Cannot update task: {e}");
            std::process::exit(1);
        }
    }
    ensure_saved(store);
}

/// Run one analysis of the current board and print the suggestions.
pub fn cmd_analyze<S: TaskStorage>(store: &TaskStore<S>, ai: &AiConfig, json: bool) {
    if store.is_empty() {
        println!("No tasks to analyze.");
        return;
    }

    let client = match GeminiClient::new(ai) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start async runtime: {e}");
            std::process::exit(1);
        }
    };

    let engine = SuggestionEngine::new(client);
    let suggestions = runtime.block_on(engine.analyze(store.tasks()));

    if json {
        match serde_json::to_string_pretty(&suggestions) {
            Ok(out) => println!("{out}"),
            Err(e) => eprintln!("Failed to encode suggestions: {e}"),
        }
        return;
    }

    if suggestions.is_empty() {
        println!("No suggestions.");
        println!("Analysis failures are logged to {}", log_file_path().display());
        return;
    }
    for s in &suggestions {
        println!("{}", format_suggestion(s, store.tasks()));
    }
}

/// Print shell completions for `ehm`.
pub fn cmd_completions(shell: Shell) {
    use crate::cli::Cli;
    use clap::CommandFactory;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}

/// Open the JSON-backed store at the configured location.
pub fn open_store(config: &Config, db_override: Option<&Path>) -> TaskStore<JsonFileStorage> {
    TaskStore::open(JsonFileStorage::new(config.tasks_path(db_override)))
}

fn resolve_or_exit<S: TaskStorage>(store: &TaskStore<S>, identifier: &str) -> String {
    match store.resolve_task_identifier(identifier) {
        Ok(id) => id,
        Err(e) => {
            eprintln!("Error resolving task: {}", e);
            std::process::exit(1);
        }
    }
}

fn ensure_saved<S: TaskStorage>(store: &TaskStore<S>) {
    if let Some(e) = store.last_save_error() {
        eprintln!("Failed to save tasks: {e}");
        std::process::exit(1);
    }
}

fn parse_due_or_exit(input: &str) -> NaiveDate {
    match parse_due_input(input, Utc::now().date_naive()) {
        Some(d) => d,
        None => {
            eprintln!("Unrecognised due date '{}'", input);
            std::process::exit(1);
        }
    }
}

/// Parse human-readable due date input relative to `today`.
///
/// Supports:
/// - "today", "tomorrow"
/// - "in 3d", "in 2w"
/// - "monday".."sunday" (next occurrence, today counts)
/// - "next monday" etc. (occurrence in the following week)
/// - "YYYY-MM-DD" format
pub fn parse_due_input(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    let s = s.trim().to_lowercase();

    match s.as_str() {
        "today" => return Some(today),
        "tomorrow" => return Some(today + Duration::days(1)),
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("in ") {
        if let Some(nd) = rest.strip_suffix('d') {
            if let Ok(days) = nd.trim().parse::<i64>() {
                return Some(today + Duration::days(days));
            }
        }
        if let Some(nw) = rest.strip_suffix('w') {
            if let Ok(weeks) = nw.trim().parse::<i64>() {
                return Some(today + Duration::weeks(weeks));
            }
        }
    }

    let weekdays = [
        ("monday", 0), ("tuesday", 1), ("wednesday", 2), ("thursday", 3),
        ("friday", 4), ("saturday", 5), ("sunday", 6),
        ("mon", 0), ("tue", 1), ("wed", 2), ("thu", 3),
        ("fri", 4), ("sat", 5), ("sun", 6),
    ];
    let current_day = today.weekday().num_days_from_monday() as i64;
    for (day_name, target_day) in weekdays {
        let days_ahead = (target_day + 7 - current_day) % 7;
        if s == day_name {
            return Some(today + Duration::days(days_ahead));
        }
        if s == format!("next {}", day_name) {
            let days_to_add = if days_ahead == 0 { 7 } else { days_ahead + 7 };
            return Some(today + Duration::days(days_to_add));
        }
    }

    NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()
}

/// Format a due date relative to today ("today", "tomorrow", "in 3d", "2d late").
pub fn format_due_relative(due: NaiveDate, today: NaiveDate) -> String {
    let delta = (due - today).num_days();
    if delta == 0 {
        "today".into()
    } else if delta == 1 {
        "tomorrow".into()
    } else if delta > 1 {
        format!("in {}d", delta)
    } else {
        format!("{}d late", -delta)
    }
}

/// Print tasks in a formatted table.
pub fn print_table(tasks: &[&Task], today: NaiveDate) {
    if tasks.is_empty() {
        println!("  (empty)");
        return;
    }
    println!("  {:<9} {:<4} {:<10} {}", "ID", "Done", "Due", "Name [labels]");
    for t in tasks {
        let labels = if t.labels.is_empty() {
            String::new()
        } else {
            format!(" [{}]", t.labels.join(","))
        };
        println!(
            "  {:<9} {:<4} {:<10} {}{}",
            short_id(&t.id),
            if t.completed { "x" } else { "" },
            format_due_relative(t.due_date, today),
            truncate(&t.name, 60),
            labels
        );
    }
}

/// Labelled detail rows for a task, shared by `ehm show` and the board's detail popup.
pub fn describe_task(task: &Task, today: NaiveDate) -> Vec<(&'static str, String)> {
    let cfg = task.quadrant.config();
    let labels = if task.labels.is_empty() {
        "(none)".to_string()
    } else {
        task.labels
            .iter()
            .map(|l| format!("#{l}"))
            .collect::<Vec<_>>()
            .join(" ")
    };
    let description = if task.description.trim().is_empty() {
        "No description provided.".to_string()
    } else {
        task.description.clone()
    };
    let created = DateTime::from_timestamp_millis(task.created_at)
        .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "unknown".to_string());

    vec![
        ("Id", task.id.clone()),
        ("Quadrant", format!("{} ({})", cfg.label, cfg.sublabel)),
        ("Status", if task.completed { "done" } else { "open" }.to_string()),
        (
            "Due",
            format!("{} ({})", task.due_date, format_due_relative(task.due_date, today)),
        ),
        ("Labels", labels),
        ("Created", created),
        ("Description", description),
        ("Calendar", task.calendar_url()),
    ]
}

/// One-line rendering of a suggestion, resolving task references against `tasks`.
pub fn format_suggestion(s: &AiSuggestion, tasks: &[Task]) -> String {
    let mut line = format!("[{}] {}", s.kind.as_str(), s.message);
    if let Some(id) = s.task_id.as_deref() {
        match tasks.iter().find(|t| t.id == id) {
            Some(t) => line.push_str(&format!(" (task {}: {})", short_id(&t.id), t.name)),
            None => line.push_str(&format!(" (task {})", id)),
        }
    }
    if let Some(q) = s.target_quadrant {
        line.push_str(&format!(" -> {}", q));
    }
    line
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_due_input() {
        // 2026-10-17 is a Saturday.
        let today = date(2026, 10, 17);
        assert_eq!(parse_due_input("today", today), Some(today));
        assert_eq!(parse_due_input("Tomorrow", today), Some(date(2026, 10, 18)));
        assert_eq!(parse_due_input("in 3d", today), Some(date(2026, 10, 20)));
        assert_eq!(parse_due_input("in 2w", today), Some(date(2026, 10, 31)));
        assert_eq!(parse_due_input("monday", today), Some(date(2026, 10, 19)));
        assert_eq!(parse_due_input("sat", today), Some(today));
        assert_eq!(parse_due_input("next saturday", today), Some(date(2026, 10, 24)));
        assert_eq!(parse_due_input("2027-02-03", today), Some(date(2027, 2, 3)));
        assert_eq!(parse_due_input("someday", today), None);
    }

    #[test]
    fn test_format_due_relative() {
        let today = date(2026, 10, 17);
        assert_eq!(format_due_relative(today, today), "today");
        assert_eq!(format_due_relative(date(2026, 10, 18), today), "tomorrow");
        assert_eq!(format_due_relative(date(2026, 10, 22), today), "in 5d");
        assert_eq!(format_due_relative(date(2026, 10, 15), today), "2d late");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
    }

    #[test]
    fn test_format_suggestion_resolves_task() {
        let task = Task {
            id: "0192-aaaa-bbbbcccc".into(),
            name: "Pay rent".into(),
            description: String::new(),
            due_date: date(2026, 10, 18),
            labels: vec![],
            completed: false,
            quadrant: QuadrantType::DoLater,
            created_at: 0,
        };
        let s = AiSuggestion {
            kind: SuggestionKind::Urgent,
            message: "Due tomorrow".into(),
            task_id: Some(task.id.clone()),
            target_quadrant: Some(QuadrantType::DoNow),
        };
        assert_eq!(
            format_suggestion(&s, &[task]),
            "[URGENT] Due tomorrow (task bbbbcccc: Pay rent) -> Do Now"
        );
    }

    #[test]
    fn test_describe_task() {
        let mut task = Task {
            id: "0192-aaaa-bbbbcccc".into(),
            name: "Pay rent".into(),
            description: String::new(),
            due_date: date(2026, 10, 18),
            labels: vec!["home".into(), "money".into()],
            completed: true,
            quadrant: QuadrantType::DoLater,
            created_at: 1_700_000_000_000,
        };
        let rows = describe_task(&task, date(2026, 10, 17));
        let get = |field: &str| rows.iter().find(|(f, _)| *f == field).unwrap().1.clone();
        assert_eq!(get("Quadrant"), "Do Later (Urgent & Not Important)");
        assert_eq!(get("Status"), "done");
        assert_eq!(get("Due"), "2026-10-18 (tomorrow)");
        assert_eq!(get("Labels"), "#home #money");
        assert_eq!(get("Created"), "2023-11-14 22:13 UTC");
        assert_eq!(get("Description"), "No description provided.");
        assert!(get("Calendar").contains("&text=Pay%20rent"));

        task.description = "Transfer before the 1st".into();
        task.labels.clear();
        let rows = describe_task(&task, date(2026, 10, 17));
        assert!(rows.contains(&("Description", "Transfer before the 1st".to_string())));
        assert!(rows.contains(&("Labels", "(none)".to_string())));
    }

    #[test]
    fn test_show_command_parses() {
        use crate::cli::Cli;
        use clap::Parser;

        let cli = Cli::parse_from(["ehm", "show", "bbbbcccc"]);
        assert!(matches!(cli.command, Commands::Show { ref id } if id == "bbbbcccc"));
    }
}
