//! Workbook storage and shared utility functions.
//!
//! This module provides the `Database` struct holding every record of one
//! construction site, the queries the scheduling engine relies on, the
//! snapshot-based transaction used to roll back rejected operations, and
//! helpers for date parsing, formatting and hierarchy walks.

use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use chrono::{Datelike, Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::budget::{Budget, BudgetLine};
use crate::error::{AppError, Result};
use crate::fields::*;
use crate::project::Project;
use crate::requisition::{PurchaseOrder, Requisition};
use crate::task::{add_days, Task};
use crate::work_type::{WorkSubType, WorkType};

/// In-memory workbook for one site.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Database {
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub requisitions: Vec<Requisition>,
    #[serde(default)]
    pub purchase_orders: Vec<PurchaseOrder>,
    #[serde(default)]
    pub work_types: Vec<WorkType>,
    #[serde(default)]
    pub work_sub_types: Vec<WorkSubType>,
    #[serde(default)]
    pub budgets: Vec<Budget>,
    #[serde(default)]
    pub budget_lines: Vec<BudgetLine>,
    /// Last number handed out for requisition names.
    #[serde(default)]
    pub requisition_seq: u64,
}

/// Next id for a collection: one past the current maximum.
pub fn next_id<T>(items: &[T], id: impl Fn(&T) -> u64) -> u64 {
    items.iter().map(id).max().unwrap_or(0) + 1
}

impl Database {
    /// Load a workbook from JSON, or an empty one if the file doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("workbook {} not found, starting empty", path.display());
            return Ok(Database::default());
        }
        let buf = fs::read_to_string(path).map_err(|source| AppError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&buf).map_err(|source| AppError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Save the workbook to JSON using atomic write (temp file + rename).
    pub fn save(&self, path: &Path) -> Result<()> {
        let io_err = |source| AppError::Io {
            path: path.display().to_string(),
            source,
        };
        let data = serde_json::to_string_pretty(self).map_err(|source| AppError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        let tmp = path.with_extension("json.tmp");
        let mut f = File::create(&tmp).map_err(io_err)?;
        f.write_all(data.as_bytes()).map_err(io_err)?;
        f.flush().map_err(io_err)?;
        fs::rename(&tmp, path).map_err(io_err)?;
        log::debug!("saved workbook {}", path.display());
        Ok(())
    }

    /// Run `op` against the workbook; if it fails, restore the state from before the call.
    pub fn transaction<T>(&mut self, op: impl FnOnce(&mut Database) -> Result<T>) -> Result<T> {
        let snapshot = self.clone();
        match op(self) {
            Ok(value) => Ok(value),
            Err(e) => {
                log::debug!("rolling back: {e}");
                *self = snapshot;
                Err(e)
            }
        }
    }

    pub fn next_task_id(&self) -> u64 {
        next_id(&self.tasks, |t| t.id)
    }

    pub fn next_project_id(&self) -> u64 {
        next_id(&self.projects, |p| p.id)
    }

    /// Get a task by ID.
    pub fn get(&self, id: u64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Get a mutable reference to a task by ID.
    pub fn get_mut(&mut self, id: u64) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    pub fn task(&self, id: u64) -> Result<&Task> {
        self.get(id).ok_or_else(|| AppError::not_found("task", id))
    }

    pub fn task_mut(&mut self, id: u64) -> Result<&mut Task> {
        self.get_mut(id).ok_or_else(|| AppError::not_found("task", id))
    }

    pub fn project(&self, id: u64) -> Result<&Project> {
        self.projects
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| AppError::not_found("project", id))
    }

    pub fn project_mut(&mut self, id: u64) -> Result<&mut Project> {
        self.projects
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| AppError::not_found("project", id))
    }

    /// Open sibling tasks under `parent`, other than `exclude`, ordered by start date.
    pub fn siblings_by_start(&self, parent: u64, exclude: u64) -> Vec<u64> {
        let siblings = self
            .tasks
            .iter()
            .filter(|t| t.parent == Some(parent) && t.id != exclude && !t.state.is_terminal());
        ordered_by_start(siblings)
    }

    /// Open top-level tasks of `project`, ordered by start date.
    pub fn top_level_by_start(&self, project: u64) -> Vec<u64> {
        let tasks = self
            .tasks
            .iter()
            .filter(|t| t.project == project && t.parent.is_none() && !t.state.is_terminal());
        ordered_by_start(tasks)
    }

    /// Latest deadline among all tasks of `project`.
    pub fn latest_deadline(&self, project: u64) -> Option<NaiveDate> {
        self.tasks
            .iter()
            .filter(|t| t.project == project)
            .filter_map(|t| t.date_deadline)
            .max()
    }

    /// Remove tasks by IDs and clear parent references pointing to removed tasks.
    pub fn remove_ids(&mut self, ids: &HashSet<u64>) {
        self.tasks.retain(|t| !ids.contains(&t.id));
        for t in self.tasks.iter_mut() {
            if let Some(p) = t.parent {
                if ids.contains(&p) {
                    t.parent = None;
                }
            }
        }
    }
}

/// Stable sort by start date ascending; tasks without a start go last in source order.
fn ordered_by_start<'a>(tasks: impl Iterator<Item = &'a Task>) -> Vec<u64> {
    let mut tasks: Vec<&Task> = tasks.collect();
    tasks.sort_by_key(|t| (t.planned_date_begin.is_none(), t.planned_date_begin));
    tasks.into_iter().map(|t| t.id).collect()
}

/// Parse a date relative to the local calendar. See [`parse_date_relative`].
pub fn parse_date_input(s: &str) -> Option<NaiveDate> {
    parse_date_relative(s, Local::now().date_naive())
}

/// Parse human-readable date input relative to `today`.
///
/// Supports:
/// - "today", "tomorrow", "yesterday"
/// - "monday" .. "sunday", "next monday", "this friday"
/// - "end of week" / "eow", "end of month" / "eom"
/// - "in 3d", "in 2w", "in 1m"
/// - "YYYY-MM-DD" format
pub fn parse_date_relative(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    let s = s.trim().to_lowercase();

    match s.as_str() {
        "today" => return Some(today),
        "tomorrow" => return today.succ_opt(),
        "yesterday" => return today.pred_opt(),
        "end of week" | "eow" => {
            let (_, end) = start_end_of_week(today);
            return Some(end);
        }
        "end of month" | "eom" => {
            let (year, month) = if today.month() == 12 {
                (today.year() + 1, 1)
            } else {
                (today.year(), today.month() + 1)
            };
            let first_of_next = NaiveDate::from_ymd_opt(year, month, 1)?;
            return Some(first_of_next - Duration::days(1));
        }
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("in ") {
        let rest = rest.trim();
        let count = |unit: char| rest.strip_suffix(unit).and_then(|n| n.trim().parse::<i64>().ok());
        if let Some(n) = count('d') {
            return add_days(today, n);
        }
        if let Some(n) = count('w') {
            return n.checked_mul(7).and_then(|days| add_days(today, days));
        }
        if let Some(n) = count('m') {
            // Approximate: 30 days per month
            return n.checked_mul(30).and_then(|days| add_days(today, days));
        }
    }

    let weekdays = [
        ("monday", 0), ("tuesday", 1), ("wednesday", 2), ("thursday", 3),
        ("friday", 4), ("saturday", 5), ("sunday", 6),
        ("mon", 0), ("tue", 1), ("wed", 2), ("thu", 3),
        ("fri", 4), ("sat", 5), ("sun", 6),
    ];
    let current = today.weekday().num_days_from_monday() as i64;
    for (name, target) in weekdays {
        let days_ahead = (target + 7 - current) % 7;
        if s == name || s == format!("this {name}") {
            return add_days(today, days_ahead);
        }
        if s == format!("next {name}") {
            let add = if days_ahead == 0 { 7 } else { days_ahead + 7 };
            return add_days(today, add);
        }
    }

    NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()
}

/// Parse date input or fail with [`AppError::InvalidDate`].
pub fn require_date(s: &str) -> Result<NaiveDate> {
    parse_date_input(s).ok_or_else(|| AppError::InvalidDate(s.to_string()))
}

/// Calculate the start and end dates of the ISO week (Monday to Sunday) containing `today`.
pub fn start_end_of_week(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let weekday = today.weekday().num_days_from_monday() as i64;
    let start = today - Duration::days(weekday);
    (start, start + Duration::days(6))
}

/// Format an optional date, "-" when unset.
pub fn format_date(d: Option<NaiveDate>) -> String {
    d.map(|d| d.to_string()).unwrap_or_else(|| "-".into())
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

/// Print tasks as a table with optional tree indentation.
pub fn print_task_table(tasks: &[&Task], id_to_depth: Option<&BTreeMap<u64, usize>>) {
    println!(
        "{:<5} {:<13} {:<11} {:<11} {:>4} {:<6} {}",
        "ID", "State", "Start", "Deadline", "Days", "Parent", "Title"
    );
    for t in tasks {
        let indent = id_to_depth.and_then(|m| m.get(&t.id).copied()).unwrap_or(0);
        println!(
            "{:<5} {:<13} {:<11} {:<11} {:>4} {:<6} {}{}",
            t.id,
            format_task_state(t.state),
            format_date(t.planned_date_begin),
            format_date(t.date_deadline),
            t.task_duration,
            t.parent.map(|p| p.to_string()).unwrap_or_else(|| "-".into()),
            "  ".repeat(indent),
            truncate(&t.title, 48)
        );
    }
}

/// Build a map of parent task IDs to their children's IDs.
pub fn build_children_map(tasks: &[Task]) -> BTreeMap<u64, Vec<u64>> {
    let mut map: BTreeMap<u64, Vec<u64>> = BTreeMap::new();
    for t in tasks {
        if let Some(p) = t.parent {
            map.entry(p).or_default().push(t.id);
        }
    }
    for v in map.values_mut() {
        v.sort_unstable();
    }
    map
}

/// Recursively collect all descendant task IDs from a root task.
pub fn collect_descendants(root: u64, child_map: &BTreeMap<u64, Vec<u64>>, out: &mut HashSet<u64>) {
    if let Some(children) = child_map.get(&root) {
        for &c in children {
            if out.insert(c) {
                collect_descendants(c, child_map, out);
            }
        }
    }
}

/// Collect all ancestor task IDs by following parent references.
pub fn collect_ancestors(mut id: u64, db: &Database) -> Vec<u64> {
    let mut chain = Vec::new();
    while let Some(p) = db.get(id).and_then(|t| t.parent) {
        if chain.contains(&p) {
            break; // cycle guard
        }
        chain.push(p);
        id = p;
    }
    chain
}

/// Depth of every task in the parent hierarchy, used for tree rendering.
pub fn depth_map(db: &Database) -> BTreeMap<u64, usize> {
    db.tasks
        .iter()
        .map(|t| (t.id, collect_ancestors(t.id, db).len()))
        .collect()
}

/// Resolve a task identifier (either ID or title) to a task ID.
pub fn resolve_task_identifier(identifier: &str, db: &Database) -> Result<u64> {
    if let Ok(id) = identifier.parse::<u64>() {
        return db.task(id).map(|t| t.id);
    }
    let matches: Vec<&Task> = db
        .tasks
        .iter()
        .filter(|t| t.title.eq_ignore_ascii_case(identifier))
        .collect();
    match matches.as_slice() {
        [] => Err(AppError::not_found("task", format!("'{identifier}'"))),
        [only] => Ok(only.id),
        many => Err(AppError::Ambiguous {
            kind: "task",
            name: identifier.to_string(),
            candidates: many
                .iter()
                .map(|t| format!("#{} (project {})", t.id, t.project))
                .collect::<Vec<_>>()
                .join(", "),
        }),
    }
}

/// Resolve a project identifier (either ID or name) to a project ID.
pub fn resolve_project_identifier(identifier: &str, db: &Database) -> Result<u64> {
    if let Ok(id) = identifier.parse::<u64>() {
        return db.project(id).map(|p| p.id);
    }
    let matches: Vec<&Project> = db
        .projects
        .iter()
        .filter(|p| p.name.eq_ignore_ascii_case(identifier))
        .collect();
    match matches.as_slice() {
        [] => Err(AppError::not_found("project", format!("'{identifier}'"))),
        [only] => Ok(only.id),
        many => Err(AppError::Ambiguous {
            kind: "project",
            name: identifier.to_string(),
            candidates: many
                .iter()
                .map(|p| format!("#{}", p.id))
                .collect::<Vec<_>>()
                .join(", "),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn task(id: u64, parent: Option<u64>, start: Option<NaiveDate>, state: TaskState) -> Task {
        let mut t = Task::new(id, format!("t{id}"), 1, 0);
        t.parent = parent;
        t.set_dates(start, start);
        t.state = state;
        t
    }

    #[rstest]
    #[case("today", d(2025, 6, 11))]
    #[case("tomorrow", d(2025, 6, 12))]
    #[case("in 3d", d(2025, 6, 14))]
    #[case("in 2w", d(2025, 6, 25))]
    #[case("friday", d(2025, 6, 13))]
    #[case("next wednesday", d(2025, 6, 18))]
    #[case("eow", d(2025, 6, 15))]
    #[case("end of month", d(2025, 6, 30))]
    #[case("2025-09-01", d(2025, 9, 1))]
    fn parses_relative_dates(#[case] input: &str, #[case] expected: NaiveDate) {
        // 2025-06-11 is a Wednesday.
        assert_eq!(parse_date_relative(input, d(2025, 6, 11)), Some(expected));
    }

    #[test]
    fn rejects_garbage_dates() {
        assert_eq!(parse_date_relative("soonish", d(2025, 6, 11)), None);
        assert_eq!(parse_date_relative("in xd", d(2025, 6, 11)), None);
    }

    #[rstest]
    #[case("in 100000000d")]
    #[case("in -100000000d")]
    #[case("in 9223372036854775807w")]
    #[case("in 400000000m")]
    fn offsets_past_the_calendar_are_rejected(#[case] input: &str) {
        assert_eq!(parse_date_relative(input, d(2025, 6, 11)), None);
    }

    #[test]
    fn require_date_reports_out_of_range_input() {
        assert!(matches!(
            require_date("in 100000000d"),
            Err(AppError::InvalidDate(s)) if s == "in 100000000d"
        ));
    }

    #[test]
    fn siblings_are_sorted_stably_with_missing_starts_last() {
        let mut db = Database::default();
        db.tasks = vec![
            task(1, None, Some(d(2025, 1, 1)), TaskState::InProgress),
            task(2, Some(1), None, TaskState::InProgress),
            task(3, Some(1), Some(d(2025, 1, 9)), TaskState::InProgress),
            task(4, Some(1), Some(d(2025, 1, 3)), TaskState::InProgress),
            task(5, Some(1), Some(d(2025, 1, 3)), TaskState::InProgress),
            task(6, Some(1), Some(d(2025, 1, 2)), TaskState::Done),
            task(7, Some(1), Some(d(2025, 1, 2)), TaskState::Waiting),
        ];
        assert_eq!(db.siblings_by_start(1, 3), vec![7, 4, 5, 2]);
    }

    #[test]
    fn top_level_excludes_subtasks_and_terminal() {
        let mut db = Database::default();
        db.tasks = vec![
            task(1, None, Some(d(2025, 1, 5)), TaskState::InProgress),
            task(2, Some(1), Some(d(2025, 1, 1)), TaskState::InProgress),
            task(3, None, Some(d(2025, 1, 1)), TaskState::Cancelled),
            task(4, None, Some(d(2025, 1, 2)), TaskState::Approved),
        ];
        assert_eq!(db.top_level_by_start(1), vec![4, 1]);
    }

    #[test]
    fn transaction_rolls_back_on_error() {
        let mut db = Database::default();
        db.tasks.push(task(1, None, None, TaskState::InProgress));
        let res: Result<()> = db.transaction(|db| {
            db.task_mut(1)?.title = "changed".into();
            db.task_mut(99)?;
            Ok(())
        });
        assert!(matches!(res, Err(AppError::NotFound { .. })));
        assert_eq!(db.tasks[0].title, "t1");
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("north_site.json");
        let mut db = Database::default();
        db.projects.push(Project::new(1, "North", 0));
        db.tasks.push(task(1, None, Some(d(2025, 2, 1)), TaskState::InProgress));
        db.save(&path).unwrap();
        let loaded = Database::load(&path).unwrap();
        assert_eq!(loaded.tasks, db.tasks);
        assert_eq!(loaded.projects, db.projects);
    }

    #[test]
    fn resolve_task_by_title_reports_ambiguity() {
        let mut db = Database::default();
        db.tasks.push(task(1, None, None, TaskState::InProgress));
        db.tasks.push(task(2, None, None, TaskState::InProgress));
        db.tasks[1].title = "T1".into();
        assert!(matches!(
            resolve_task_identifier("t1", &db),
            Err(AppError::Ambiguous { .. })
        ));
        assert_eq!(resolve_task_identifier("2", &db).unwrap(), 2);
    }

    #[test]
    fn remove_ids_clears_dangling_parents() {
        let mut db = Database::default();
        db.tasks = vec![
            task(1, None, None, TaskState::InProgress),
            task(2, Some(1), None, TaskState::InProgress),
        ];
        db.remove_ids(&HashSet::from([1]));
        assert_eq!(db.tasks.len(), 1);
        assert_eq!(db.tasks[0].parent, None);
    }
}
