//! # ehm - Eisenhower Matrix task board
//!
//! A terminal task board that sorts work into the four Eisenhower quadrants
//! (Do Now, Do Later, Delegate, Eliminate), with an optional AI pass that
//! points out bloated quadrants, groupable tasks, missing labels and
//! deadlines that call for a quadrant change.
//!
//! ## Quick Start
//!
//! ```bash
//! # Launch the interactive board
//! ehm board
//!
//! # Add a task via CLI
//! ehm add "Renew passport" -q now --due tomorrow --label travel
//!
//! # List tasks, grouped by quadrant
//! ehm list
//!
//! # Ask Gemini for suggestions (needs GEMINI_API_KEY)
//! ehm analyze
//! ```
//!
//! ## Key Commands
//!
//! - `ehm board` - Interactive 2x2 board
//! - `ehm add <name>` - Create a task in a quadrant
//! - `ehm show <id>` - Full task details and a Google Calendar link
//! - `ehm toggle|move|delete|edit <id>` - Change one task
//! - `ehm analyze` - One-shot AI suggestions
//!
//! Tasks are stored as a single JSON document in `~/.local/share/eisenhower/tasks.json`;
//! configuration is read from `~/.config/eisenhower/config.toml` and logs are
//! written under `~/.local/state/eisenhower/`.

use clap::Parser;

pub mod cli;
pub mod cmd;
pub mod config;
pub mod db;
pub mod error;
pub mod fields;
pub mod gemini;
pub mod logging;
pub mod store;
pub mod suggest;
pub mod task;
pub mod tui {
    pub mod board;
    pub mod colors;
    pub mod enums;
    pub mod input;
    pub mod run;
}

use cli::Cli;
use cmd::*;
use config::Config;

fn main() {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    // The board owns the terminal, so it logs to the file only.
    let echo_to_stderr = !matches!(cli.command, Commands::Board);
    let _log_guard = match logging::init(&config.logging, echo_to_stderr) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Logging disabled: {e}");
            None
        }
    };

    match cli.command {
        Commands::Board => cmd_board(&config.tasks_path(cli.db.as_deref()), &config.ai),
        Commands::Completions { shell } => cmd_completions(shell),
        command => {
            let mut store = open_store(&config, cli.db.as_deref());
            match command {
                Commands::Add {
                    name,
                    quadrant,
                    desc,
                    labels,
                    due,
                } => cmd_add(&mut store, name, quadrant, desc, labels, due),
                Commands::List { quadrant, pending } => cmd_list(&store, quadrant, pending),
                Commands::Show { id } => cmd_show(&store, id),
                Commands::Toggle { id } => cmd_toggle(&mut store, id),
                Commands::Move { id, quadrant } => cmd_move(&mut store, id, quadrant),
                Commands::Delete { id } => cmd_delete(&mut store, id),
                Commands::Edit {
                    id,
                    name,
                    desc,
                    due,
                    add_labels,
                    rm_labels,
                    clear_labels,
                } => cmd_edit(
                    &mut store,
                    id,
                    name,
                    desc,
                    due,
                    add_labels,
                    rm_labels,
                    clear_labels,
                ),
                Commands::Analyze { json } => cmd_analyze(&store, &config.ai, json),
                Commands::Board | Commands::Completions { .. } => {
                    unreachable!("handled above")
                }
            }
        }
    }
}
