//! Board entry point and terminal setup.

use std::{io, path::Path};

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{prelude::CrosstermBackend, Terminal};
use tracing::{info, warn};

use crate::config::AiConfig;
use crate::db::JsonFileStorage;
use crate::gemini::GeminiClient;
use crate::store::TaskStore;
use crate::suggest::SuggestionEngine;
use crate::tui::board::BoardApp;

/// Initialise and run the board over the tasks file at `tasks_path`.
///
/// Analysis runs on a runtime owned by this call. Anything still in flight
/// when the board closes is abandoned.
pub fn run_board(tasks_path: &Path, ai: &AiConfig) -> io::Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;

    let engine = match GeminiClient::new(ai) {
        Ok(client) => {
            info!(model = client.model(), "AI analysis enabled");
            Some(SuggestionEngine::new(client))
        }
        Err(e) => {
            warn!(error = %e, "AI analysis disabled");
            None
        }
    };

    let store = TaskStore::open(JsonFileStorage::new(tasks_path));
    let mut app = BoardApp::new(store, engine, runtime.handle().clone());

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = app.run(&mut terminal);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    drop(app);
    runtime.shutdown_background();

    result
}
