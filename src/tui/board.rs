//! Eisenhower Matrix board interface.
//!
//! The four quadrants are laid out as a 2x2 grid. Tasks are toggled,
//! deleted, created and moved between quadrants from the keyboard, with
//! Shift+arrow standing in for drag-and-drop. Analysis runs in the
//! background on the board's Tokio runtime; its suggestions appear in a bar
//! above the grid and can be dismissed one at a time. A card expands into a
//! detail popup, and any quadrant can be maximized to fill the board.

use std::io;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::cmd::{describe_task, format_due_relative, format_suggestion, truncate};
use crate::db::TaskStorage;
use crate::fields::QuadrantType;
use crate::store::TaskStore;
use crate::suggest::{AnalysisBackend, SuggestionEngine, SuggestionTray};
use crate::task::AiSuggestion;
use crate::tui::colors::{accent, SUGGESTION_BLUE};
use crate::tui::enums::BoardMode;
use crate::tui::input::InputField;

/// Most suggestion rows shown at once.
const SUGGESTION_ROWS: usize = 4;

/// Board application state.
pub struct BoardApp<S: TaskStorage, B: AnalysisBackend + 'static> {
    store: TaskStore<S>,
    engine: Option<Arc<SuggestionEngine<B>>>,
    runtime: Handle,
    tray: SuggestionTray,
    selected_suggestion: usize,
    /// Set while an analysis is outstanding; blocks a second trigger.
    analyzing: bool,
    pending: Option<Receiver<Vec<AiSuggestion>>>,
    mode: BoardMode,
    selected_quadrant: usize,
    selected_card: [usize; 4],
    /// Show only the selected quadrant.
    maximized: bool,
    status_message: String,
}

impl<S: TaskStorage, B: AnalysisBackend + 'static> BoardApp<S, B> {
    /// Create a board over `store`. Without an engine, analysis is unavailable.
    pub fn new(store: TaskStore<S>, engine: Option<SuggestionEngine<B>>, runtime: Handle) -> Self {
        let status_message = if engine.is_none() {
            "AI analysis unavailable: no Gemini API key configured".to_string()
        } else {
            String::new()
        };
        BoardApp {
            store,
            engine: engine.map(Arc::new),
            runtime,
            tray: SuggestionTray::new(),
            selected_suggestion: 0,
            analyzing: false,
            pending: None,
            mode: BoardMode::Normal,
            selected_quadrant: 0,
            selected_card: [0; 4],
            maximized: false,
            status_message,
        }
    }

    pub fn store(&self) -> &TaskStore<S> {
        &self.store
    }

    fn current_quadrant(&self) -> QuadrantType {
        QuadrantType::ALL[self.selected_quadrant]
    }

    fn selected_task_id(&self) -> Option<String> {
        let q = self.current_quadrant();
        self.store
            .list_by_quadrant(q)
            .get(self.selected_card[q.index()])
            .map(|t| t.id.clone())
    }

    fn set_status_message(&mut self, msg: impl Into<String>) {
        self.status_message = msg.into();
    }

    /// Keep every card cursor inside its quadrant.
    fn clamp_selection(&mut self) {
        for q in QuadrantType::ALL {
            let len = self.store.list_by_quadrant(q).len();
            let card = &mut self.selected_card[q.index()];
            if len == 0 {
                *card = 0;
            } else if *card >= len {
                *card = len - 1;
            }
        }
        if self.selected_suggestion >= self.tray.len() {
            self.selected_suggestion = self.tray.len().saturating_sub(1);
        }
    }

    /// Point the cursor at `task_id`, wherever it now lives.
    fn select_task(&mut self, task_id: &str) {
        let Some(task) = self.store.get(task_id) else {
            return;
        };
        let q = task.quadrant;
        if let Some(pos) = self
            .store
            .list_by_quadrant(q)
            .iter()
            .position(|t| t.id == task_id)
        {
            self.selected_quadrant = q.index();
            self.selected_card[q.index()] = pos;
        }
    }

    /// Report a failed write, if the last mutation left one behind.
    fn check_saved(&mut self) {
        if let Some(e) = self.store.last_save_error() {
            let msg = format!("Error saving: {}", e);
            self.set_status_message(msg);
        }
    }

    fn toggle_selected(&mut self) {
        let Some(id) = self.selected_task_id() else {
            return;
        };
        let completed = self.store.toggle_task(&id).map(|t| t.completed);
        match completed {
            Some(true) => self.set_status_message("Task marked as completed"),
            Some(false) => self.set_status_message("Task marked as open"),
            None => {}
        }
        self.check_saved();
    }

    fn delete_selected(&mut self) {
        let Some(id) = self.selected_task_id() else {
            return;
        };
        if let Some(task) = self.store.delete_task(&id) {
            self.set_status_message(format!("Deleted '{}'", task.name));
        }
        self.clamp_selection();
        self.check_saved();
    }

    fn move_selected(&mut self, target: QuadrantType) {
        let Some(id) = self.selected_task_id() else {
            return;
        };
        if self.store.move_task(&id, target).is_some() {
            self.set_status_message(format!("Moved task to {}", target));
        }
        self.select_task(&id);
        self.clamp_selection();
        self.check_saved();
    }

    /// Move the selected card to the neighbouring quadrant in the grid.
    fn move_selected_by(&mut self, code: KeyCode) {
        if let Some(target) = grid_neighbour(self.selected_quadrant, code) {
            self.move_selected(QuadrantType::ALL[target]);
        }
    }

    fn submit_new_task(&mut self, quadrant: QuadrantType, name: &str) -> bool {
        match self.store.add_task(name, quadrant) {
            Ok(task) => {
                self.select_task(&task.id);
                self.set_status_message(format!("Added '{}' to {}", task.name, quadrant));
                self.check_saved();
                true
            }
            Err(e) => {
                self.set_status_message(e.to_string());
                false
            }
        }
    }

    /// Start an analysis of the current snapshot unless one is already running.
    fn start_analysis(&mut self) {
        if self.analyzing {
            self.set_status_message("Analysis already running");
            return;
        }
        let Some(engine) = self.engine.as_ref().map(Arc::clone) else {
            self.set_status_message("AI analysis unavailable: no Gemini API key configured");
            return;
        };
        if self.store.is_empty() {
            self.set_status_message("Nothing to analyze");
            return;
        }

        let snapshot = self.store.tasks().to_vec();
        let (tx, rx) = mpsc::channel();
        self.runtime.spawn(async move {
            let suggestions = engine.analyze(&snapshot).await;
            // The board may be gone by now; a stale result is simply dropped.
            let _ = tx.send(suggestions);
        });
        self.pending = Some(rx);
        self.analyzing = true;
        self.set_status_message("Analyzing matrix...");
        debug!(tasks = self.store.len(), "Analysis started");
    }

    /// Collect a finished analysis, if any.
    pub fn poll_analysis(&mut self) {
        let Some(rx) = self.pending.as_ref() else {
            return;
        };
        match rx.try_recv() {
            Ok(suggestions) => {
                let count = suggestions.len();
                self.tray.replace(suggestions);
                self.selected_suggestion = 0;
                self.finish_analysis();
                if count == 0 {
                    self.set_status_message("No suggestions");
                } else {
                    self.set_status_message(format!("{} suggestion(s)", count));
                }
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                warn!("Analysis task ended without a result");
                self.finish_analysis();
            }
        }
    }

    fn finish_analysis(&mut self) {
        self.pending = None;
        self.analyzing = false;
        if self.tray.is_empty() && matches!(self.mode, BoardMode::Suggestions) {
            self.mode = BoardMode::Normal;
        }
    }

    fn dismiss_selected_suggestion(&mut self) {
        if self.tray.dismiss(self.selected_suggestion).is_some() {
            self.set_status_message("Suggestion dismissed");
        }
        self.clamp_selection();
        if self.tray.is_empty() {
            self.mode = BoardMode::Normal;
        }
    }

    /// Apply the move a suggestion proposes, then dismiss it.
    fn apply_selected_suggestion(&mut self) {
        let Some(s) = self.tray.get(self.selected_suggestion) else {
            return;
        };
        let (Some(task_id), Some(target)) = (s.task_id.clone(), s.target_quadrant) else {
            self.set_status_message("This suggestion has no move to apply");
            return;
        };
        if self.store.get(&task_id).is_none() {
            self.set_status_message("Suggested task no longer exists");
            return;
        }
        self.store.move_task(&task_id, target);
        self.select_task(&task_id);
        self.tray.dismiss(self.selected_suggestion);
        self.clamp_selection();
        self.set_status_message(format!("Moved task to {}", target));
        self.check_saved();
        if self.tray.is_empty() {
            self.mode = BoardMode::Normal;
        }
    }

    fn navigate(&mut self, code: KeyCode) {
        let q = self.current_quadrant();
        let len = self.store.list_by_quadrant(q).len();
        let card = self.selected_card[q.index()];
        match code {
            KeyCode::Up if card > 0 => self.selected_card[q.index()] -= 1,
            KeyCode::Down if card + 1 < len => self.selected_card[q.index()] += 1,
            _ => {
                if let Some(target) = grid_neighbour(self.selected_quadrant, code) {
                    self.selected_quadrant = target;
                }
            }
        }
    }

    /// Handle one key press. Returns `true` when the board should close.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return true;
        }

        match std::mem::replace(&mut self.mode, BoardMode::Normal) {
            BoardMode::AddTask(quadrant, mut input) => {
                match key.code {
                    KeyCode::Esc => self.status_message.clear(),
                    KeyCode::Enter => {
                        if !self.submit_new_task(quadrant, &input.value) {
                            self.mode = BoardMode::AddTask(quadrant, input);
                        }
                    }
                    code => {
                        match code {
                            KeyCode::Char(c) => input.handle_char(c),
                            KeyCode::Backspace => input.handle_backspace(),
                            KeyCode::Delete => input.handle_delete(),
                            KeyCode::Left => input.move_cursor_left(),
                            KeyCode::Right => input.move_cursor_right(),
                            _ => {}
                        }
                        self.mode = BoardMode::AddTask(quadrant, input);
                    }
                }
                false
            }
            BoardMode::Move => {
                if let KeyCode::Char(c @ '1'..='4') = key.code {
                    let idx = c as usize - '1' as usize;
                    self.move_selected(QuadrantType::ALL[idx]);
                } else {
                    self.status_message.clear();
                }
                false
            }
            BoardMode::Help => false,
            BoardMode::Detail(task_id) => {
                if key.code == KeyCode::Char(' ') {
                    self.store.toggle_task(&task_id);
                    self.check_saved();
                    self.mode = BoardMode::Detail(task_id);
                }
                false
            }
            BoardMode::Suggestions => {
                self.mode = BoardMode::Suggestions;
                match key.code {
                    KeyCode::Esc | KeyCode::Tab | KeyCode::Char('s') => {
                        self.mode = BoardMode::Normal
                    }
                    KeyCode::Up | KeyCode::Left | KeyCode::Char('k') => {
                        self.selected_suggestion = self.selected_suggestion.saturating_sub(1);
                    }
                    KeyCode::Down | KeyCode::Right | KeyCode::Char('j') => {
                        if self.selected_suggestion + 1 < self.tray.len() {
                            self.selected_suggestion += 1;
                        }
                    }
                    KeyCode::Char('x') | KeyCode::Delete | KeyCode::Backspace => {
                        self.dismiss_selected_suggestion()
                    }
                    KeyCode::Enter => self.apply_selected_suggestion(),
                    KeyCode::Char('a') => self.start_analysis(),
                    _ => {}
                }
                false
            }
            BoardMode::Normal => self.handle_normal_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> bool {
        self.status_message.clear();
        let shift = key.modifiers.contains(KeyModifiers::SHIFT);

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Left | KeyCode::Right | KeyCode::Up | KeyCode::Down if shift => {
                self.move_selected_by(key.code);
            }
            KeyCode::Left | KeyCode::Char('h') => self.navigate(KeyCode::Left),
            KeyCode::Right | KeyCode::Char('l') => self.navigate(KeyCode::Right),
            KeyCode::Up | KeyCode::Char('k') => self.navigate(KeyCode::Up),
            KeyCode::Down | KeyCode::Char('j') => self.navigate(KeyCode::Down),
            KeyCode::Char(c @ '1'..='4') => {
                self.selected_quadrant = c as usize - '1' as usize;
            }
            KeyCode::Char(' ') | KeyCode::Enter => self.toggle_selected(),
            KeyCode::Char('d') | KeyCode::Delete => self.delete_selected(),
            KeyCode::Char('i') => {
                if let Some(id) = self.selected_task_id() {
                    self.mode = BoardMode::Detail(id);
                }
            }
            KeyCode::Char('z') => {
                self.maximized = !self.maximized;
            }
            KeyCode::Char('n') => {
                self.mode = BoardMode::AddTask(self.current_quadrant(), InputField::new());
            }
            KeyCode::Char('m') => {
                if self.selected_task_id().is_some() {
                    self.mode = BoardMode::Move;
                    self.set_status_message("Move to: 1 Do Now | 2 Do Later | 3 Delegate | 4 Eliminate");
                }
            }
            KeyCode::Char('a') => self.start_analysis(),
            KeyCode::Char('s') | KeyCode::Tab => {
                if self.tray.is_empty() {
                    self.set_status_message("No suggestions");
                } else {
                    self.mode = BoardMode::Suggestions;
                }
            }
            KeyCode::Char('?') => self.mode = BoardMode::Help,
            _ => {}
        }
        false
    }

    /// Draw-and-read loop.
    pub fn run<T: Backend>(&mut self, terminal: &mut Terminal<T>) -> io::Result<()> {
        loop {
            self.poll_analysis();
            terminal.draw(|f| self.render(f))?;

            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press && self.handle_key(key) {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    pub fn render(&self, f: &mut Frame) {
        let suggestion_height = if self.tray.is_empty() {
            0
        } else {
            self.tray.len().min(SUGGESTION_ROWS) as u16 + 2
        };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(suggestion_height),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(f.area());

        self.render_header(f, chunks[0]);
        if !self.tray.is_empty() {
            self.render_suggestions(f, chunks[1]);
        }
        self.render_board(f, chunks[2]);
        self.render_status_bar(f, chunks[3]);

        match &self.mode {
            BoardMode::AddTask(quadrant, input) => self.render_add_popup(f, *quadrant, input),
            BoardMode::Help => render_help_popup(f),
            BoardMode::Detail(task_id) => self.render_detail_popup(f, task_id),
            _ => {}
        }
    }

    fn render_header(&self, f: &mut Frame, area: Rect) {
        let mut spans = vec![
            Span::styled("EISENHOWER", Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(" AI", Style::default().fg(SUGGESTION_BLUE).add_modifier(Modifier::BOLD)),
            Span::raw("  "),
            Span::styled(
                format!("{} tasks", self.store.len()),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
            ),
        ];
        if self.analyzing {
            spans.push(Span::raw("  "));
            spans.push(Span::styled(
                "analyzing...",
                Style::default().fg(Color::Yellow),
            ));
        }
        let header = Paragraph::new(Line::from(spans))
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center);
        f.render_widget(header, area);
    }

    fn render_suggestions(&self, f: &mut Frame, area: Rect) {
        let focused = matches!(self.mode, BoardMode::Suggestions);
        let border_style = if focused {
            Style::default().fg(SUGGESTION_BLUE).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(SUGGESTION_BLUE)
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" AI Suggestions (s: focus, x: dismiss, Enter: apply move) ")
            .border_style(border_style);

        let offset = self
            .selected_suggestion
            .saturating_sub(SUGGESTION_ROWS.saturating_sub(1));
        let width = area.width.saturating_sub(4) as usize;
        let lines: Vec<Line> = self
            .tray
            .iter()
            .enumerate()
            .skip(offset)
            .take(SUGGESTION_ROWS)
            .map(|(i, s)| {
                let text = truncate(&format_suggestion(s, self.store.tasks()), width);
                if focused && i == self.selected_suggestion {
                    Line::styled(
                        text,
                        Style::default().bg(SUGGESTION_BLUE).fg(Color::White),
                    )
                } else {
                    Line::from(text)
                }
            })
            .collect();

        f.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn render_board(&self, f: &mut Frame, area: Rect) {
        if self.maximized {
            self.render_quadrant(f, area, self.current_quadrant());
            return;
        }
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);
        for (r, row) in rows.iter().enumerate() {
            let cols = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(*row);
            for (c, cell) in cols.iter().enumerate() {
                self.render_quadrant(f, *cell, QuadrantType::ALL[r * 2 + c]);
            }
        }
    }

    fn render_quadrant(&self, f: &mut Frame, area: Rect, quadrant: QuadrantType) {
        let cfg = quadrant.config();
        let color = accent(quadrant);
        let is_selected =
            quadrant.index() == self.selected_quadrant && !matches!(self.mode, BoardMode::Suggestions);
        let tasks = self.store.list_by_quadrant(quadrant);

        let border_style = if is_selected {
            Style::default().fg(color).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(color)
        };
        let title = Line::from(vec![
            Span::styled(
                format!(" {} {} ", quadrant.index() + 1, cfg.label),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("{} ({}) ", cfg.sublabel, tasks.len())),
        ]);
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(border_style);
        let inner = block.inner(area);
        f.render_widget(block, area);

        if tasks.is_empty() {
            let hint = Paragraph::new("No tasks yet (n: new)")
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center);
            f.render_widget(hint, inner);
            return;
        }

        let visible = inner.height.max(1) as usize;
        let card = self.selected_card[quadrant.index()];
        let offset = card.saturating_sub(visible - 1);
        let today = Utc::now().date_naive();
        let name_width = inner.width.saturating_sub(16) as usize;

        let lines: Vec<Line> = tasks
            .iter()
            .enumerate()
            .skip(offset)
            .take(visible)
            .map(|(i, t)| {
                let selected = is_selected && i == card;
                let marker = if t.completed { "[x]" } else { "[ ]" };
                let mut name_style = if t.completed {
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::CROSSED_OUT)
                } else {
                    Style::default()
                };
                let (chip_style, due_style) = if selected {
                    name_style = name_style.fg(Color::White).add_modifier(Modifier::BOLD);
                    (Style::default().fg(Color::White), Style::default().fg(Color::White))
                } else {
                    (Style::default().fg(Color::Cyan), Style::default().fg(Color::DarkGray))
                };

                let mut spans = vec![Span::styled(
                    format!("{} {}", marker, truncate(&t.name, name_width)),
                    name_style,
                )];
                for label in &t.labels {
                    spans.push(Span::styled(format!(" #{}", label), chip_style));
                }
                spans.push(Span::styled(
                    format!("  {}", format_due_relative(t.due_date, today)),
                    due_style,
                ));

                let line = Line::from(spans);
                if selected {
                    line.style(Style::default().bg(color))
                } else {
                    line
                }
            })
            .collect();
        f.render_widget(Paragraph::new(lines), inner);
    }

    fn render_status_bar(&self, f: &mut Frame, area: Rect) {
        let text = if !self.status_message.is_empty() {
            self.status_message.clone()
        } else {
            "n: New | Space: Done | i: Details | d: Delete | m/Shift+Arrows: Move | z: Zoom | a: Analyze | s: Suggestions | ?: Help | q: Quit"
                .to_string()
        };
        let color = accent(self.current_quadrant());
        let status = Paragraph::new(text)
            .style(Style::default().bg(color).fg(Color::White))
            .alignment(Alignment::Left);
        f.render_widget(status, area);
    }

    fn render_add_popup(&self, f: &mut Frame, quadrant: QuadrantType, input: &InputField) {
        let area = centered_rect(f.area(), 60, 5);
        f.render_widget(Clear, area);
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" New Task for {} ", quadrant))
            .border_style(Style::default().fg(accent(quadrant)));
        let inner = block.inner(area);
        let body = vec![
            Line::from(input.value.clone()),
            Line::styled(
                "Enter: Create | Esc: Cancel",
                Style::default().fg(Color::DarkGray),
            ),
        ];
        f.render_widget(Paragraph::new(body).block(block), area);
        let cursor_x = inner.x + (input.cursor as u16).min(inner.width.saturating_sub(1));
        f.set_cursor_position((cursor_x, inner.y));
    }

    fn render_detail_popup(&self, f: &mut Frame, task_id: &str) {
        let Some(task) = self.store.get(task_id) else {
            return;
        };
        let color = accent(task.quadrant);
        let area = centered_rect(f.area(), 70, 18);
        f.render_widget(Clear, area);

        let mut lines = vec![Line::styled(
            task.name.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )];
        lines.push(Line::from(""));
        for (field, value) in describe_task(task, Utc::now().date_naive()) {
            lines.push(Line::from(vec![
                Span::styled(format!("{:<13}", field), Style::default().fg(color)),
                Span::raw(value),
            ]));
        }
        lines.push(Line::from(""));
        lines.push(Line::styled(
            "Space: Toggle done | any other key: Close",
            Style::default().fg(Color::DarkGray),
        ));

        let detail = Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Task ")
                    .border_style(Style::default().fg(color)),
            )
            .wrap(Wrap { trim: false });
        f.render_widget(detail, area);
    }
}

fn render_help_popup(f: &mut Frame) {
    let area = centered_rect(f.area(), 60, 18);
    f.render_widget(Clear, area);
    let lines = vec![
        Line::from("Arrows / hjkl   Move the cursor"),
        Line::from("1-4             Jump to a quadrant"),
        Line::from("Space / Enter   Toggle done"),
        Line::from("i               Task details and calendar link"),
        Line::from("z               Maximize / restore the quadrant"),
        Line::from("n               New task in this quadrant"),
        Line::from("d / Delete      Delete task"),
        Line::from("Shift+Arrows    Move task to the neighbouring quadrant"),
        Line::from("m then 1-4      Move task to a quadrant"),
        Line::from("a               Analyze the matrix with AI"),
        Line::from("s / Tab         Focus suggestions (x dismiss, Enter apply)"),
        Line::from("q / Esc         Quit"),
        Line::from(""),
        Line::styled("Press any key to close", Style::default().fg(Color::DarkGray)),
    ];
    let help = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Help "))
        .wrap(Wrap { trim: false });
    f.render_widget(help, area);
}

/// Grid index reached from `from` by an arrow key, if any.
/// Layout: 0 1 / 2 3.
fn grid_neighbour(from: usize, code: KeyCode) -> Option<usize> {
    match code {
        KeyCode::Left if from % 2 == 1 => Some(from - 1),
        KeyCode::Right if from % 2 == 0 => Some(from + 1),
        KeyCode::Up if from >= 2 => Some(from - 2),
        KeyCode::Down if from < 2 => Some(from + 2),
        _ => None,
    }
}

fn centered_rect(area: Rect, percent_width: u16, height: u16) -> Rect {
    let width = (u32::from(area.width) * u32::from(percent_width.min(100)) / 100) as u16;
    let height = height.min(area.height);
    let x = area.x + (area.width - width) / 2;
    let y = area.y + (area.height - height) / 2;
    Rect::new(x, y, width, height)
}

#[cfg(test)]
mod tests {
    use ratatui::backend::TestBackend;
    use tokio::runtime::Runtime;

    use super::*;
    use crate::db::MemoryStorage;
    use crate::logging::init_test;
    use crate::store::TaskUpdate;
    use crate::suggest::tests::{Reply, StubBackend};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn shift(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::SHIFT)
    }

    fn board(rt: &Runtime, backend: Option<StubBackend>) -> BoardApp<MemoryStorage, StubBackend> {
        init_test();
        let store = TaskStore::open(MemoryStorage::new());
        BoardApp::new(store, backend.map(SuggestionEngine::new), rt.handle().clone())
    }

    fn type_text(app: &mut BoardApp<MemoryStorage, StubBackend>, text: &str) {
        for c in text.chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
    }

    fn wait_for_analysis(app: &mut BoardApp<MemoryStorage, StubBackend>) {
        for _ in 0..200 {
            app.poll_analysis();
            if !app.analyzing {
                return;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        panic!("analysis did not finish");
    }

    #[test]
    fn adds_task_in_selected_quadrant() {
        let rt = Runtime::new().unwrap();
        let mut app = board(&rt, None);
        app.handle_key(key(KeyCode::Char('3')));
        app.handle_key(key(KeyCode::Char('n')));
        type_text(&mut app, "Hire help");
        app.handle_key(key(KeyCode::Enter));

        let delegated = app.store().list_by_quadrant(QuadrantType::Delegate);
        assert_eq!(delegated.len(), 1);
        assert_eq!(delegated[0].name, "Hire help");
        assert!(matches!(app.mode, BoardMode::Normal));
        assert_eq!(app.store().storage().save_count(), 1);
    }

    #[test]
    fn empty_name_keeps_the_form_open() {
        let rt = Runtime::new().unwrap();
        let mut app = board(&rt, None);
        app.handle_key(key(KeyCode::Char('n')));
        type_text(&mut app, "  ");
        app.handle_key(key(KeyCode::Enter));

        assert!(app.store().is_empty());
        assert!(matches!(app.mode, BoardMode::AddTask(QuadrantType::DoNow, _)));
        assert!(app.status_message.contains("empty"));

        app.handle_key(key(KeyCode::Esc));
        assert!(matches!(app.mode, BoardMode::Normal));
    }

    #[test]
    fn shift_arrow_moves_card_between_quadrants() {
        let rt = Runtime::new().unwrap();
        let mut app = board(&rt, None);
        app.handle_key(key(KeyCode::Char('n')));
        type_text(&mut app, "Inbox zero");
        app.handle_key(key(KeyCode::Enter));

        app.handle_key(shift(KeyCode::Right));
        assert_eq!(app.store().tasks()[0].quadrant, QuadrantType::DoLater);
        assert_eq!(app.current_quadrant(), QuadrantType::DoLater);

        app.handle_key(shift(KeyCode::Down));
        assert_eq!(app.store().tasks()[0].quadrant, QuadrantType::Eliminate);

        app.handle_key(key(KeyCode::Char('m')));
        app.handle_key(key(KeyCode::Char('1')));
        assert_eq!(app.store().tasks()[0].quadrant, QuadrantType::DoNow);
    }

    #[test]
    fn toggle_and_delete_selected_card() {
        let rt = Runtime::new().unwrap();
        let mut app = board(&rt, None);
        for name in ["One", "Two"] {
            app.handle_key(key(KeyCode::Char('n')));
            type_text(&mut app, name);
            app.handle_key(key(KeyCode::Enter));
        }
        app.handle_key(key(KeyCode::Up));
        app.handle_key(key(KeyCode::Char(' ')));
        assert!(app.store().tasks()[0].completed);
        assert!(!app.store().tasks()[1].completed);

        app.handle_key(key(KeyCode::Char('d')));
        assert_eq!(app.store().len(), 1);
        assert_eq!(app.store().tasks()[0].name, "Two");
        assert_eq!(app.selected_task_id().as_deref(), Some(app.store().tasks()[0].id.as_str()));
    }

    #[test]
    fn analysis_is_not_reentrant() {
        let rt = Runtime::new().unwrap();
        let mut app = board(
            &rt,
            Some(StubBackend::text(r#"[{"type":"BLOAT","message":"Too much"}]"#)),
        );
        app.handle_key(key(KeyCode::Char('n')));
        type_text(&mut app, "Task");
        app.handle_key(key(KeyCode::Enter));

        app.handle_key(key(KeyCode::Char('a')));
        app.handle_key(key(KeyCode::Char('a')));
        assert!(app.analyzing);
        wait_for_analysis(&mut app);

        let engine = app.engine.as_ref().unwrap();
        assert_eq!(engine.backend().call_count(), 1);
        assert_eq!(app.tray.len(), 1);
    }

    #[test]
    fn empty_board_skips_analysis() {
        let rt = Runtime::new().unwrap();
        let mut app = board(&rt, Some(StubBackend::text("[]")));
        app.handle_key(key(KeyCode::Char('a')));
        assert!(!app.analyzing);
        assert_eq!(app.engine.as_ref().unwrap().backend().call_count(), 0);
    }

    #[test]
    fn failed_analysis_leaves_no_suggestions() {
        let rt = Runtime::new().unwrap();
        let mut app = board(&rt, Some(StubBackend::new(Reply::Fail)));
        app.handle_key(key(KeyCode::Char('n')));
        type_text(&mut app, "Task");
        app.handle_key(key(KeyCode::Enter));

        app.handle_key(key(KeyCode::Char('a')));
        wait_for_analysis(&mut app);
        assert!(app.tray.is_empty());
        assert_eq!(app.store().len(), 1);
    }

    #[test]
    fn suggestions_are_dismissed_and_applied() {
        let rt = Runtime::new().unwrap();
        let mut app = board(&rt, None);
        app.handle_key(key(KeyCode::Char('n')));
        type_text(&mut app, "Renew passport");
        app.handle_key(key(KeyCode::Enter));
        let id = app.store().tasks()[0].id.clone();

        app.tray.replace(vec![
            AiSuggestion {
                kind: crate::fields::SuggestionKind::Tag,
                message: "Add a travel label".into(),
                task_id: Some(id.clone()),
                target_quadrant: None,
            },
            AiSuggestion {
                kind: crate::fields::SuggestionKind::Urgent,
                message: "Due tomorrow".into(),
                task_id: Some(id.clone()),
                target_quadrant: Some(QuadrantType::Delegate),
            },
        ]);

        app.handle_key(key(KeyCode::Char('s')));
        assert!(matches!(app.mode, BoardMode::Suggestions));
        app.handle_key(key(KeyCode::Char('x')));
        assert_eq!(app.tray.len(), 1);

        app.handle_key(key(KeyCode::Enter));
        assert!(app.tray.is_empty());
        assert_eq!(app.store().get(&id).unwrap().quadrant, QuadrantType::Delegate);
        assert!(matches!(app.mode, BoardMode::Normal));
    }

    #[test]
    fn stale_result_after_close_is_ignored() {
        let rt = Runtime::new().unwrap();
        let mut app = board(&rt, Some(StubBackend::text("[]")));
        app.handle_key(key(KeyCode::Char('n')));
        type_text(&mut app, "Task");
        app.handle_key(key(KeyCode::Enter));
        app.handle_key(key(KeyCode::Char('a')));
        drop(app);
        rt.shutdown_timeout(Duration::from_secs(1));
    }

    #[test]
    fn renders_all_quadrants() {
        let rt = Runtime::new().unwrap();
        let mut app = board(&rt, None);
        app.handle_key(key(KeyCode::Char('n')));
        type_text(&mut app, "Write report");
        app.handle_key(key(KeyCode::Enter));
        app.tray.replace(vec![AiSuggestion {
            kind: crate::fields::SuggestionKind::Group,
            message: "Batch writing".into(),
            task_id: None,
            target_quadrant: None,
        }]);

        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|f| app.render(f)).unwrap();
        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        for cfg in crate::fields::QUADRANTS {
            assert!(text.contains(cfg.label), "missing {}", cfg.label);
        }
        assert!(text.contains("Write report"));
        assert!(text.contains("Batch writing"));
    }

    fn screen(app: &BoardApp<MemoryStorage, StubBackend>, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|f| app.render(f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    fn add_detailed_task(app: &mut BoardApp<MemoryStorage, StubBackend>) -> String {
        app.handle_key(key(KeyCode::Char('n')));
        type_text(app, "Renew passport");
        app.handle_key(key(KeyCode::Enter));
        let id = app.store().tasks()[0].id.clone();
        app.store
            .update_task(
                &id,
                TaskUpdate {
                    description: Some("Bring two photos".into()),
                    add_labels: vec!["travel".into()],
                    ..TaskUpdate::default()
                },
            )
            .unwrap();
        id
    }

    #[test]
    fn detail_popup_shows_description_labels_and_calendar_link() {
        let rt = Runtime::new().unwrap();
        let mut app = board(&rt, None);
        let id = add_detailed_task(&mut app);

        app.handle_key(key(KeyCode::Char('i')));
        assert!(matches!(app.mode, BoardMode::Detail(ref shown) if *shown == id));
        let text = screen(&app, 160, 40);
        assert!(text.contains("Bring two photos"));
        assert!(text.contains("#travel"));
        assert!(text.contains("calendar.google.com"));

        app.handle_key(key(KeyCode::Char(' ')));
        assert!(app.store().get(&id).unwrap().completed);
        assert!(matches!(app.mode, BoardMode::Detail(_)));

        app.handle_key(key(KeyCode::Esc));
        assert!(matches!(app.mode, BoardMode::Normal));
    }

    #[test]
    fn detail_popup_without_description_says_so() {
        let rt = Runtime::new().unwrap();
        let mut app = board(&rt, None);
        app.handle_key(key(KeyCode::Char('n')));
        type_text(&mut app, "Plain task");
        app.handle_key(key(KeyCode::Enter));

        app.handle_key(key(KeyCode::Char('i')));
        assert!(screen(&app, 160, 40).contains("No description provided."));
    }

    #[test]
    fn cards_show_label_chips() {
        let rt = Runtime::new().unwrap();
        let mut app = board(&rt, None);
        add_detailed_task(&mut app);
        assert!(screen(&app, 120, 30).contains("#travel"));
    }

    #[test]
    fn zoom_shows_only_the_selected_quadrant() {
        let rt = Runtime::new().unwrap();
        let mut app = board(&rt, None);
        app.handle_key(key(KeyCode::Char('3')));
        app.handle_key(key(KeyCode::Char('z')));
        let text = screen(&app, 120, 30);
        assert!(text.contains("Delegate"));
        assert!(!text.contains("Eliminate"));

        app.handle_key(key(KeyCode::Char('z')));
        assert!(screen(&app, 120, 30).contains("Eliminate"));
    }

    #[test]
    fn popups_fit_very_wide_terminals() {
        let area = Rect::new(0, 0, 2000, 50);
        let popup = centered_rect(area, 70, 18);
        assert_eq!(popup.width, 1400);
        assert_eq!(popup.x, 300);
        assert_eq!(popup.height, 18);
    }

    #[test]
    fn grid_neighbours() {
        assert_eq!(grid_neighbour(0, KeyCode::Right), Some(1));
        assert_eq!(grid_neighbour(1, KeyCode::Right), None);
        assert_eq!(grid_neighbour(3, KeyCode::Up), Some(1));
        assert_eq!(grid_neighbour(2, KeyCode::Down), None);
    }
}
