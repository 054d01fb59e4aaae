//! Main application logic for the schedule board.
//!
//! This module contains the `App` struct which keeps a site workbook in
//! memory, lists its tasks in schedule order, and applies schedule edits
//! (shift, resize, complete, reflow, sweep) through the same propagation
//! engine as the CLI. Every edit is transactional, so a rejected edit leaves
//! the board as it was. Changes are written to disk on `w`.

use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Local, NaiveDate};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};

use crate::config::Config;
use crate::dashboard::dashboard;
use crate::db::{build_children_map, depth_map, format_date, truncate, Database};
use crate::error::Result;
use crate::fields::{format_task_state, TaskState};
use crate::schedule::{close_overdue_tasks, PropagationReport, Scheduler, TaskChanges, WriteOrigin};
use crate::site::Site;
use crate::task::Task;
use crate::tui::{
    colors::{DARK_RED, OVERDUE, ROLLED_UP, SHIFTED, SITE_BLUE},
    enums::{AppState, PendingAction},
    utils::centered_rect,
};

/// Task ids in board order: projects by id, then each task followed by its
/// subtasks, siblings ordered by start date.
fn board_order(db: &Database, project: Option<u64>, show_closed: bool) -> Vec<u64> {
    let children = build_children_map(&db.tasks);
    let start_key = |id: &u64| {
        db.get(*id)
            .map(|t| (t.project, t.planned_date_begin.is_none(), t.planned_date_begin, t.id))
    };

    let mut roots: Vec<u64> = db
        .tasks
        .iter()
        .filter(|t| project.map_or(true, |p| t.project == p))
        .filter(|t| t.parent.map_or(true, |p| db.get(p).is_none()))
        .map(|t| t.id)
        .collect();
    roots.sort_by_key(start_key);

    let mut order = Vec::new();
    let mut seen = HashSet::new();
    let mut stack: Vec<u64> = roots.into_iter().rev().collect();
    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        let Some(task) = db.get(id) else { continue };
        if show_closed || !task.state.is_terminal() {
            order.push(id);
        }
        if let Some(kids) = children.get(&id) {
            let mut kids = kids.clone();
            kids.sort_by_key(start_key);
            stack.extend(kids.into_iter().rev());
        }
    }
    order
}

/// Main application state for the schedule board.
pub struct App {
    state: AppState,
    db: Database,
    db_path: PathBuf,
    scheduler: Scheduler,
    config: Config,
    table_state: TableState,
    visible: Vec<u64>,
    /// Project shown, `None` for every project.
    project: Option<u64>,
    show_closed: bool,
    dirty: bool,
    pending: Option<PendingAction>,
    last_report: PropagationReport,
    status_message: String,
    today: NaiveDate,
}

impl App {
    /// Create a new App, loading the workbook from `db_path`.
    pub fn new(db_path: &Path, config: &Config) -> io::Result<Self> {
        let db = Database::load(db_path).map_err(io::Error::other)?;
        Ok(Self::with_database(
            db,
            db_path.to_path_buf(),
            config.clone(),
            Local::now().date_naive(),
        ))
    }

    fn with_database(db: Database, db_path: PathBuf, config: Config, today: NaiveDate) -> Self {
        let mut app = App {
            state: AppState::Board,
            db,
            db_path,
            scheduler: Scheduler::new(config.max_propagation_steps),
            config,
            table_state: TableState::default(),
            visible: Vec::new(),
            project: None,
            show_closed: false,
            dirty: false,
            pending: None,
            last_report: PropagationReport::default(),
            status_message: String::new(),
            today,
        };
        app.refresh_visible();
        app
    }

    fn site_name(&self) -> String {
        Site::from_file(self.db_path.clone())
            .map(|s| s.display_name)
            .unwrap_or_else(|| self.db_path.display().to_string())
    }

    fn project_label(&self) -> String {
        match self.project.and_then(|p| self.db.project(p).ok()) {
            Some(p) => p.name.clone(),
            None => "All projects".to_string(),
        }
    }

    /// Rebuild the visible task list, keeping the selection on the same task when possible.
    fn refresh_visible(&mut self) {
        let old_selected = self.selected_id();
        self.visible = board_order(&self.db, self.project, self.show_closed);

        let idx = old_selected
            .and_then(|id| self.visible.iter().position(|&v| v == id))
            .or(if self.visible.is_empty() { None } else { Some(0) });
        self.table_state.select(idx);
    }

    fn selected_id(&self) -> Option<u64> {
        self.table_state
            .selected()
            .and_then(|idx| self.visible.get(idx))
            .copied()
    }

    fn selected_task(&self) -> Option<&Task> {
        self.selected_id().and_then(|id| self.db.get(id))
    }

    fn set_status_message(&mut self, msg: String) {
        self.status_message = msg;
    }

    fn move_selection(&mut self, delta: isize) {
        if self.visible.is_empty() {
            return;
        }
        let last = self.visible.len() - 1;
        let current = self.table_state.selected().unwrap_or(0);
        let next = current.saturating_add_signed(delta).min(last);
        self.table_state.select(Some(next));
    }

    fn cycle_project(&mut self) {
        let ids: Vec<u64> = self.db.projects.iter().filter(|p| p.active).map(|p| p.id).collect();
        self.project = match self.project {
            None => ids.first().copied(),
            Some(current) => ids.iter().skip_while(|&&p| p != current).nth(1).copied(),
        };
        self.refresh_visible();
    }

    /// Record the outcome of an engine operation in the status bar.
    fn apply(&mut self, label: &str, result: Result<PropagationReport>) {
        match result {
            Ok(report) => {
                self.dirty = true;
                let mut msg = format!(
                    "{label}: {} task(s) moved, {} parent(s) rolled up",
                    report.shifted.len(),
                    report.rolled_up.len()
                );
                if let Some((_, end)) = report.project_end {
                    msg.push_str(&format!(", project ends {end}"));
                }
                self.last_report = report;
                self.set_status_message(msg);
            }
            Err(e) => {
                self.last_report = PropagationReport::default();
                self.set_status_message(format!("{label} rejected: {e}"));
            }
        }
        self.refresh_visible();
    }

    fn shift_selected(&mut self, days: i64) {
        let Some(id) = self.selected_id() else { return };
        let result = self.scheduler.shift_task(&mut self.db, id, days);
        self.apply(&format!("Shift #{id} by {days:+}"), result);
    }

    fn resize_selected(&mut self, delta: i64) {
        let Some(task) = self.selected_task() else { return };
        let id = task.id;
        if task.planned_date_begin.is_none() {
            self.set_status_message(format!("Task #{id} has no start date"));
            return;
        }
        let changes = TaskChanges {
            task_duration: Some(task.task_duration.saturating_add(delta)),
            ..Default::default()
        };
        let result = self.scheduler.write_task(&mut self.db, id, changes, WriteOrigin::User);
        self.apply(&format!("Duration of #{id} {delta:+}"), result);
    }

    fn complete_selected(&mut self) {
        let Some(id) = self.selected_id() else { return };
        let changes = TaskChanges {
            state: Some(TaskState::Done),
            ..Default::default()
        };
        let result = self.scheduler.write_task(&mut self.db, id, changes, WriteOrigin::User);
        self.apply(&format!("Complete #{id}"), result);
    }

    fn reflow_selected(&mut self) {
        let Some(id) = self.selected_id() else { return };
        let result = self.scheduler.reflow(&mut self.db, id);
        self.apply(&format!("Reflow #{id}"), result);
    }

    fn sweep(&mut self) {
        let closed = close_overdue_tasks(&mut self.db, self.today);
        if closed.is_empty() {
            self.set_status_message("No overdue tasks".to_string());
        } else {
            self.dirty = true;
            self.set_status_message(format!("Closed {} overdue task(s)", closed.len()));
        }
        self.refresh_visible();
    }

    fn save(&mut self) {
        match self.db.save(&self.db_path) {
            Ok(()) => {
                self.dirty = false;
                self.set_status_message(format!("Saved {}", self.db_path.display()));
            }
            Err(e) => self.set_status_message(format!("Save failed: {e}")),
        }
    }

    fn handle_board_key(&mut self, key: KeyCode, modifiers: KeyModifiers) -> bool {
        match key {
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => return true,
            KeyCode::Char('q') | KeyCode::Esc => {
                if self.dirty {
                    self.pending = Some(PendingAction::QuitUnsaved);
                    self.state = AppState::Confirm;
                } else {
                    return true;
                }
            }
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
            KeyCode::PageUp => self.move_selection(-10),
            KeyCode::PageDown => self.move_selection(10),
            KeyCode::Enter | KeyCode::Char(' ') => {
                if self.selected_id().is_some() {
                    self.state = AppState::Detail;
                }
            }
            KeyCode::Tab => self.cycle_project(),
            KeyCode::Char('>') | KeyCode::Right => self.shift_selected(1),
            KeyCode::Char('<') | KeyCode::Left => self.shift_selected(-1),
            KeyCode::Char('+') | KeyCode::Char('=') => self.resize_selected(1),
            KeyCode::Char('-') => self.resize_selected(-1),
            KeyCode::Char('d') => self.complete_selected(),
            KeyCode::Char('r') => self.reflow_selected(),
            KeyCode::Char('s') => {
                self.pending = Some(PendingAction::Sweep);
                self.state = AppState::Confirm;
            }
            KeyCode::Char('t') => {
                self.show_closed = !self.show_closed;
                self.refresh_visible();
            }
            KeyCode::Char('w') => self.save(),
            KeyCode::Char('D') => self.state = AppState::Dashboard,
            KeyCode::Char('h') | KeyCode::F(1) => self.state = AppState::Help,
            _ => {}
        }
        false
    }

    fn handle_confirm_key(&mut self, key: KeyCode) -> bool {
        match key {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                self.state = AppState::Board;
                match self.pending.take() {
                    Some(PendingAction::Sweep) => self.sweep(),
                    Some(PendingAction::QuitUnsaved) => return true,
                    None => {}
                }
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.state = AppState::Board;
                self.pending = None;
            }
            _ => {}
        }
        false
    }

    /// Handle one key press. Returns true if the application should quit.
    fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) -> bool {
        self.status_message.clear();
        match self.state {
            AppState::Board => self.handle_board_key(key, modifiers),
            AppState::Confirm => self.handle_confirm_key(key),
            AppState::Detail | AppState::Dashboard | AppState::Help => {
                if matches!(key, KeyCode::Esc | KeyCode::Char('q') | KeyCode::Enter | KeyCode::Char('h')) {
                    self.state = AppState::Board;
                }
                false
            }
        }
    }

    /// Poll for and handle keyboard events.
    ///
    /// Returns true if the application should quit.
    fn handle_input(&mut self) -> io::Result<bool> {
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    return Ok(self.handle_key(key.code, key.modifiers));
                }
            }
        }
        Ok(false)
    }

    fn row_style(&self, task: &Task) -> Style {
        let shifted = self.last_report.shifted.iter().any(|s| s.task == task.id);
        let rolled = self.last_report.rolled_up.iter().any(|s| s.task == task.id);
        let overdue = !task.state.is_terminal() && task.date_deadline.is_some_and(|d| d < self.today);
        if task.state.is_terminal() {
            Style::default().fg(Color::DarkGray)
        } else if shifted {
            Style::default().fg(SHIFTED).add_modifier(Modifier::BOLD)
        } else if rolled {
            Style::default().fg(ROLLED_UP).add_modifier(Modifier::BOLD)
        } else if overdue {
            Style::default().fg(OVERDUE)
        } else if !task.is_schedulable() {
            Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC)
        } else {
            Style::default().fg(Color::White)
        }
    }

    fn render_header(&self, f: &mut Frame, area: Rect) {
        let header = Paragraph::new(Line::from(vec![
            Span::styled("SITE SCHEDULE", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("  "),
            Span::styled(
                format!("Site: {}  Project: {}", self.site_name(), self.project_label()),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
            ),
        ]))
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Center);
        f.render_widget(header, area);
    }

    fn render_board(&mut self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0)])
            .split(area);
        self.render_header(f, chunks[0]);

        let depths = depth_map(&self.db);
        let project_names: BTreeMap<u64, &str> =
            self.db.projects.iter().map(|p| (p.id, p.name.as_str())).collect();

        let header = Row::new(
            ["ID", "State", "Start", "Deadline", "Days", "Project", "Title"]
                .iter()
                .map(|h| Cell::from(*h).style(Style::default().add_modifier(Modifier::BOLD))),
        )
        .style(Style::default().bg(SITE_BLUE).fg(Color::White))
        .height(1);

        let rows: Vec<Row> = self
            .visible
            .iter()
            .filter_map(|&id| self.db.get(id))
            .map(|t| {
                let depth = depths.get(&t.id).copied().unwrap_or(0);
                Row::new(vec![
                    Cell::from(t.id.to_string()),
                    Cell::from(format_task_state(t.state)),
                    Cell::from(format_date(t.planned_date_begin)),
                    Cell::from(format_date(t.date_deadline)),
                    Cell::from(t.task_duration.to_string()),
                    Cell::from(truncate(project_names.get(&t.project).copied().unwrap_or("-"), 14)),
                    Cell::from(format!("{}{}", "  ".repeat(depth), t.title)),
                ])
                .style(self.row_style(t))
            })
            .collect();

        let widths = [
            Constraint::Length(5),
            Constraint::Length(13),
            Constraint::Length(11),
            Constraint::Length(11),
            Constraint::Length(5),
            Constraint::Length(15),
            Constraint::Min(25),
        ];
        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title(format!(
                "Tasks ({}/{}) - Press 'h' for help",
                self.visible.len(),
                self.db.tasks.len()
            )))
            .row_highlight_style(Style::default().bg(Color::Gray).fg(Color::Black))
            .highlight_symbol(">> ");

        f.render_stateful_widget(table, chunks[1], &mut self.table_state);
    }

    fn render_detail(&mut self, f: &mut Frame, area: Rect) {
        let Some(t) = self.selected_task() else {
            return;
        };
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let field = |label: &str, value: String| {
            Line::from(vec![Span::styled(format!("{label:<14}"), bold), Span::raw(value)])
        };
        let parent = t
            .parent
            .and_then(|p| self.db.get(p))
            .map(|p| format!("#{} {}", p.id, p.title))
            .unwrap_or_else(|| "-".into());
        let children = self.db.tasks.iter().filter(|c| c.parent == Some(t.id)).count();
        let project = self.db.project(t.project).map(|p| p.name.clone()).unwrap_or_default();

        let text = vec![
            Line::from(Span::styled(t.title.clone(), bold)),
            Line::from(""),
            field("ID", t.id.to_string()),
            field("Project", project),
            field("Parent", parent),
            field("Subtasks", children.to_string()),
            field("State", format_task_state(t.state).to_string()),
            field("Start", format_date(t.planned_date_begin)),
            field("Deadline", format_date(t.date_deadline)),
            field("Duration", format!("{} day(s)", t.task_duration)),
            field("Time spent", format!("{:.1} h", t.time_spent_hours)),
        ];
        let paragraph = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL).title("Task Details"))
            .wrap(Wrap { trim: true });
        f.render_widget(paragraph, area);
    }

    fn render_dashboard(&mut self, f: &mut Frame, area: Rect) {
        let header = Row::new(
            ["Project", "Tasks", "Completion", "SPI", "Cost spent"]
                .iter()
                .map(|h| Cell::from(*h).style(Style::default().add_modifier(Modifier::BOLD))),
        )
        .style(Style::default().bg(SITE_BLUE).fg(Color::White));

        let rows: Vec<Row> = dashboard(&self.db, &self.config, None)
            .into_iter()
            .map(|m| {
                Row::new(vec![
                    Cell::from(m.name),
                    Cell::from(format!("{}/{}", m.closed_tasks, m.total_tasks)),
                    Cell::from(format!("{:.1}%", m.completion.value))
                        .style(Style::default().fg(m.completion.health.color())),
                    Cell::from(format!("{:.2}", m.spi.value))
                        .style(Style::default().fg(m.spi.health.color())),
                    Cell::from(format!("{:.1}%", m.cost.value))
                        .style(Style::default().fg(m.cost.health.color())),
                ])
            })
            .collect();

        let widths = [
            Constraint::Min(24),
            Constraint::Length(9),
            Constraint::Length(11),
            Constraint::Length(7),
            Constraint::Length(11),
        ];
        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title("Dashboard - Esc to return"));
        f.render_widget(table, area);
    }

    fn render_help(&mut self, f: &mut Frame, area: Rect) {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let help_text = vec![
            Line::from(Span::styled("Schedule Board Help", bold)),
            Line::from(""),
            Line::from(Span::styled("Navigation:", bold)),
            Line::from("  ↑/k, ↓/j     Move selection"),
            Line::from("  PgUp/PgDn    Move ten rows"),
            Line::from("  Tab          Next project (then all projects)"),
            Line::from("  Enter/Space  Task details"),
            Line::from("  D            Project dashboard"),
            Line::from(""),
            Line::from(Span::styled("Schedule:", bold)),
            Line::from("  >/→, </←     Shift task one day later/earlier"),
            Line::from("  +, -         Lengthen/shorten task by one day"),
            Line::from("  r            Reflow from the selected task"),
            Line::from("  d            Mark task done"),
            Line::from("  s            Close overdue tasks"),
            Line::from(""),
            Line::from(Span::styled("Other:", bold)),
            Line::from("  t            Toggle done/cancelled tasks"),
            Line::from("  w            Save workbook"),
            Line::from("  h/F1         Show this help"),
            Line::from("  q/Esc        Quit"),
            Line::from(""),
            Line::from(Span::styled("Colours:", bold)),
            Line::from(Span::styled("  moved by the last edit", Style::default().fg(SHIFTED))),
            Line::from(Span::styled("  parent rolled up by the last edit", Style::default().fg(ROLLED_UP))),
            Line::from(Span::styled("  overdue", Style::default().fg(OVERDUE))),
            Line::from(Span::styled(
                "  not scheduled yet (missing a date)",
                Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
            )),
        ];
        let paragraph = Paragraph::new(help_text)
            .block(Block::default().borders(Borders::ALL).title("Help - Esc to return"))
            .wrap(Wrap { trim: false });
        f.render_widget(paragraph, area);
    }

    fn render_confirm(&mut self, f: &mut Frame, area: Rect) {
        let block = Block::default()
            .title("Confirm Action")
            .borders(Borders::ALL)
            .style(Style::default().bg(DARK_RED));
        let area = centered_rect(50, 20, area);
        f.render_widget(Clear, area);

        let text = vec![
            Line::from(""),
            Line::from(Span::styled(
                "Are you sure you want to:",
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(self.pending.map(PendingAction::prompt).unwrap_or("")),
            Line::from(""),
            Line::from("Press 'y' to confirm, 'n' to cancel"),
        ];
        let paragraph = Paragraph::new(text)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        f.render_widget(paragraph, area);
    }

    fn render_status_bar(&mut self, f: &mut Frame, area: Rect) {
        let text = if !self.status_message.is_empty() {
            self.status_message.clone()
        } else {
            let unsaved = if self.dirty { " | unsaved changes (w to save)" } else { "" };
            match self.state {
                AppState::Board => format!("Tasks: {} | Press 'h' for help{unsaved}", self.visible.len()),
                AppState::Detail => "Task Details".to_string(),
                AppState::Dashboard => "Dashboard".to_string(),
                AppState::Help => "Help".to_string(),
                AppState::Confirm => "Confirm Action".to_string(),
            }
        };
        let status = Paragraph::new(text)
            .style(Style::default().bg(SITE_BLUE).fg(Color::White))
            .alignment(Alignment::Left);
        f.render_widget(status, area);
    }

    /// Main render function that dispatches to the view renderers.
    fn render(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(f.area());

        match self.state {
            AppState::Board => self.render_board(f, chunks[0]),
            AppState::Detail => self.render_detail(f, chunks[0]),
            AppState::Dashboard => self.render_dashboard(f, chunks[0]),
            AppState::Help => self.render_help(f, chunks[0]),
            AppState::Confirm => {
                self.render_board(f, chunks[0]);
                self.render_confirm(f, chunks[0]);
            }
        }
        self.render_status_bar(f, chunks[1]);
    }

    /// Main event loop. Runs until the user quits.
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;
            if self.handle_input()? {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::Project;
    use rstest::{fixture, rstest};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn task(id: u64, project: u64, parent: Option<u64>, start: NaiveDate, days: i64) -> Task {
        let mut t = Task::new(id, format!("t{id}"), project, 0);
        t.parent = parent;
        t.set_dates(Some(start), Some(start + chrono::Duration::days(days - 1)));
        t
    }

    /// Project 1: tasks 1 (Mar 1-5) and 2 (Mar 6-10), task 1 has subtasks 3 and 4.
    /// Project 2: task 5.
    #[fixture]
    fn app() -> App {
        let mut db = Database::default();
        db.projects.push(Project::new(1, "Tower", 0));
        db.projects.push(Project::new(2, "Villas", 0));
        db.tasks = vec![
            task(2, 1, None, d(2025, 3, 6), 5),
            task(1, 1, None, d(2025, 3, 1), 5),
            task(4, 1, Some(1), d(2025, 3, 4), 2),
            task(3, 1, Some(1), d(2025, 3, 1), 3),
            task(5, 2, None, d(2025, 1, 1), 3),
        ];
        App::with_database(db, PathBuf::from("tower_site.json"), Config::default(), d(2025, 3, 8))
    }

    fn press(app: &mut App, key: KeyCode) -> bool {
        app.handle_key(key, KeyModifiers::NONE)
    }

    #[rstest]
    fn board_lists_subtasks_under_parents(app: App) {
        assert_eq!(app.visible, vec![1, 3, 4, 2, 5]);
        assert_eq!(app.selected_id(), Some(1));
    }

    #[rstest]
    fn shifting_first_task_moves_the_sequence(mut app: App) {
        press(&mut app, KeyCode::Char('>'));
        assert_eq!(app.db.get(1).unwrap().planned_date_begin, Some(d(2025, 3, 2)));
        assert_eq!(app.db.get(2).unwrap().planned_date_begin, Some(d(2025, 3, 7)));
        assert!(app.dirty);
        assert_eq!(app.last_report.shifted.len(), 1);
        assert_eq!(app.selected_id(), Some(1));
    }

    #[rstest]
    fn shortening_below_one_day_is_rejected(mut app: App) {
        // select task 4, which lasts two days
        press(&mut app, KeyCode::Char('j'));
        press(&mut app, KeyCode::Char('j'));
        assert_eq!(app.selected_id(), Some(4));
        press(&mut app, KeyCode::Char('-'));
        assert_eq!(app.db.get(4).unwrap().task_duration, 1);
        press(&mut app, KeyCode::Char('-'));
        assert_eq!(app.db.get(4).unwrap().task_duration, 1);
        assert!(app.status_message.contains("rejected"));
    }

    #[rstest]
    fn resizing_a_task_without_start_is_refused(mut app: App) {
        app.db.get_mut(2).unwrap().set_dates(None, Some(d(2025, 3, 10)));
        for _ in 0..3 {
            press(&mut app, KeyCode::Char('j'));
        }
        assert_eq!(app.selected_id(), Some(2));
        press(&mut app, KeyCode::Char('+'));
        assert!(app.status_message.contains("no start date"));
        assert_eq!(app.db.get(2).unwrap().date_deadline, Some(d(2025, 3, 10)));
        assert!(!app.dirty);
    }

    #[rstest]
    fn sweep_needs_confirmation(mut app: App) {
        press(&mut app, KeyCode::Char('s'));
        assert_eq!(app.state, AppState::Confirm);
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.db.get(1).unwrap().state, TaskState::InProgress);

        press(&mut app, KeyCode::Char('s'));
        press(&mut app, KeyCode::Char('y'));
        // tasks 1, 3, 4 and 5 ended before 2025-03-08
        assert_eq!(app.visible, vec![2]);
        assert_eq!(app.db.get(2).unwrap().state, TaskState::InProgress);
    }

    #[rstest]
    fn tab_cycles_through_projects(mut app: App) {
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.project, Some(1));
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.visible, vec![5]);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.project, None);
    }

    #[rstest]
    fn quitting_with_unsaved_changes_asks_first(mut app: App) {
        assert!(!press(&mut app, KeyCode::Char('>')));
        assert!(!press(&mut app, KeyCode::Char('q')));
        assert_eq!(app.pending, Some(PendingAction::QuitUnsaved));
        assert!(press(&mut app, KeyCode::Char('y')));
    }
}
