//! Task date propagation.
//!
//! A user edit to a task's start or deadline cascades to related tasks:
//!
//! - **Sibling propagation**: when the edited task has a parent, open siblings
//!   that start after it are re-laid back-to-back after it, keeping their
//!   durations, and the parent's dates are rolled up to the envelope of its
//!   children.
//! - **Project sequence propagation**: for a top-level task (or a parent whose
//!   children were just rolled up), the project's open top-level tasks that
//!   start after it are re-laid back-to-back, and the project end date is
//!   rolled up to the latest task deadline.
//!
//! Writes made by the engine carry [`WriteOrigin::Engine`] and never re-enter
//! propagation. Pending transitions go through a worklist bounded by
//! `max_steps`; a write that does not settle is rejected and rolled back.

use std::collections::VecDeque;

use chrono::{NaiveDate, Utc};

use crate::db::Database;
use crate::error::{AppError, Result};
use crate::fields::TaskState;
use crate::task::{apply_duration, compute_duration, offset_date};

/// Who is writing. Engine writes are not propagated further.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOrigin {
    User,
    Engine,
}

/// Field changes for a task write. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub planned_date_begin: Option<Option<NaiveDate>>,
    pub date_deadline: Option<Option<NaiveDate>>,
    /// Inverse edit: keep the start and move the deadline.
    pub task_duration: Option<i64>,
    pub state: Option<TaskState>,
}

impl TaskChanges {
    pub fn dates(start: NaiveDate, deadline: NaiveDate) -> Self {
        TaskChanges {
            planned_date_begin: Some(Some(start)),
            date_deadline: Some(Some(deadline)),
            ..Default::default()
        }
    }

    fn touches_dates(&self) -> bool {
        self.planned_date_begin.is_some()
            || self.date_deadline.is_some()
            || self.task_duration.is_some()
    }
}

/// A date move made by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Shift {
    pub task: u64,
    pub old_start: Option<NaiveDate>,
    pub old_deadline: Option<NaiveDate>,
    pub new_start: NaiveDate,
    pub new_deadline: NaiveDate,
}

/// Everything a propagation pass changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropagationReport {
    /// Siblings and sequence tasks that were moved.
    pub shifted: Vec<Shift>,
    /// Parents whose range was rolled up from their children.
    pub rolled_up: Vec<Shift>,
    /// Project whose end date changed, with the new date.
    pub project_end: Option<(u64, NaiveDate)>,
    pub steps: usize,
}

impl PropagationReport {
    pub fn is_empty(&self) -> bool {
        self.shifted.is_empty() && self.rolled_up.is_empty() && self.project_end.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Siblings(u64),
    Sequence(u64),
}

/// Propagation engine over a [`Database`].
#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    max_steps: usize,
}

impl Scheduler {
    pub fn new(max_steps: usize) -> Self {
        Scheduler { max_steps }
    }

    /// Write `changes` to task `id` and propagate date changes made by a user.
    ///
    /// The whole write is atomic: on error the workbook is left as it was.
    pub fn write_task(
        &self,
        db: &mut Database,
        id: u64,
        changes: TaskChanges,
        origin: WriteOrigin,
    ) -> Result<PropagationReport> {
        db.transaction(|db| {
            let dates_written = changes.touches_dates();
            apply_changes(db, id, changes, origin)?;
            if origin == WriteOrigin::Engine || !dates_written {
                return Ok(PropagationReport::default());
            }
            self.propagate(db, id)
        })
    }

    /// Move a task by `days`, keeping its duration.
    pub fn shift_task(&self, db: &mut Database, id: u64, days: i64) -> Result<PropagationReport> {
        let task = db.task(id)?;
        let (Some(start), Some(deadline)) = (task.planned_date_begin, task.date_deadline) else {
            return Err(AppError::rejected(format!(
                "task {id} needs both a start date and a deadline to be shifted"
            )));
        };
        let changes = TaskChanges::dates(offset_date(start, days)?, offset_date(deadline, days)?);
        self.write_task(db, id, changes, WriteOrigin::User)
    }

    /// Re-run propagation from task `id` without changing it.
    pub fn reflow(&self, db: &mut Database, id: u64) -> Result<PropagationReport> {
        db.task(id)?;
        db.transaction(|db| self.propagate(db, id))
    }

    fn propagate(&self, db: &mut Database, id: u64) -> Result<PropagationReport> {
        let mut report = PropagationReport::default();
        let mut queue = VecDeque::new();
        queue.push_back(if db.task(id)?.parent.is_some() {
            Step::Siblings(id)
        } else {
            Step::Sequence(id)
        });

        while let Some(step) = queue.pop_front() {
            report.steps += 1;
            if report.steps > self.max_steps {
                return Err(AppError::PropagationLimit(self.max_steps));
            }
            log::debug!("propagation step {}: {:?}", report.steps, step);
            match step {
                Step::Siblings(task) => {
                    // The parent's rollup never moves the parent's own siblings.
                    if let Some(parent) = propagate_siblings(db, task, &mut report)? {
                        queue.push_back(Step::Sequence(parent));
                    }
                }
                Step::Sequence(task) => propagate_sequence(db, task, &mut report)?,
            }
        }
        Ok(report)
    }
}

fn apply_changes(db: &mut Database, id: u64, changes: TaskChanges, origin: WriteOrigin) -> Result<()> {
    let task = db.task_mut(id)?;
    let mut start = task.planned_date_begin;
    let mut deadline = task.date_deadline;
    if let Some(s) = changes.planned_date_begin {
        start = s;
    }
    if let Some(d) = changes.date_deadline {
        deadline = d;
    }
    if let Some(duration) = changes.task_duration {
        if duration < 1 {
            return Err(AppError::InvalidDuration(duration));
        }
        if let Some(s) = start {
            deadline = Some(apply_duration(s, duration)?);
        }
    }
    if origin == WriteOrigin::User {
        if let (Some(start), Some(deadline)) = (start, deadline) {
            if deadline < start {
                return Err(AppError::InvalidDateRange { start, deadline });
            }
        }
    }

    task.set_dates(start, deadline);
    if let Some(title) = changes.title {
        task.title = title;
    }
    if let Some(state) = changes.state {
        task.state = state;
    }
    task.updated_at_utc = Utc::now().timestamp();
    Ok(())
}

/// Engine write of a task's range. Returns the shift if anything moved.
fn engine_write(db: &mut Database, id: u64, start: NaiveDate, deadline: NaiveDate) -> Result<Option<Shift>> {
    let task = db.task_mut(id)?;
    if task.planned_date_begin == Some(start) && task.date_deadline == Some(deadline) {
        return Ok(None);
    }
    let shift = Shift {
        task: id,
        old_start: task.planned_date_begin,
        old_deadline: task.date_deadline,
        new_start: start,
        new_deadline: deadline,
    };
    task.set_dates(Some(start), Some(deadline));
    task.updated_at_utc = Utc::now().timestamp();
    log::debug!("task {id} moved to {start}..{deadline}");
    Ok(Some(shift))
}

/// Re-lay the open siblings of `id` that start after it and roll the parent up.
///
/// Returns the parent, whose project sequence is propagated next.
fn propagate_siblings(db: &mut Database, id: u64, report: &mut PropagationReport) -> Result<Option<u64>> {
    let task = db.task(id)?;
    let Some(parent) = task.parent else {
        return Ok(None);
    };
    let (Some(anchor_start), Some(anchor_end)) = (task.planned_date_begin, task.date_deadline) else {
        log::trace!("task {id} is not schedulable, skipping siblings");
        return Ok(Some(parent));
    };

    let mut prev_end = anchor_end;
    let mut earliest = anchor_start;
    let mut latest = anchor_end;

    for sibling in db.siblings_by_start(parent, id) {
        let s = db.task(sibling)?;
        let (Some(start), Some(end)) = (s.planned_date_begin, s.date_deadline) else {
            log::trace!("sibling {sibling} is not schedulable, skipped");
            continue;
        };
        if start > anchor_start {
            let new_start = offset_date(prev_end, 1)?;
            let new_end = apply_duration(new_start, compute_duration(Some(start), Some(end)))?;
            if let Some(shift) = engine_write(db, sibling, new_start, new_end)? {
                report.shifted.push(shift);
            }
            prev_end = new_end;
            earliest = earliest.min(new_start);
            latest = latest.max(new_end);
        } else {
            earliest = earliest.min(start);
            latest = latest.max(end);
        }
    }

    if let Some(shift) = engine_write(db, parent, earliest, latest)? {
        report.rolled_up.push(shift);
    }
    Ok(Some(parent))
}

/// Re-lay the project's open top-level tasks after `id` and roll the project end date up.
fn propagate_sequence(db: &mut Database, id: u64, report: &mut PropagationReport) -> Result<()> {
    let task = db.task(id)?;
    let project = task.project;
    let anchor = task.planned_date_begin.zip(task.date_deadline);
    let order = db.top_level_by_start(project);
    let is_first = order.first() == Some(&id);

    match anchor {
        Some((anchor_start, anchor_end)) => {
            let mut prev_end = anchor_end;
            for other in order.into_iter().filter(|t| *t != id) {
                let t = db.task(other)?;
                let (Some(start), Some(end)) = (t.planned_date_begin, t.date_deadline) else {
                    log::trace!("task {other} is not schedulable, skipped");
                    continue;
                };
                if is_first || start > anchor_start {
                    let new_start = offset_date(prev_end, 1)?;
                    let new_end = apply_duration(new_start, compute_duration(Some(start), Some(end)))?;
                    if let Some(shift) = engine_write(db, other, new_start, new_end)? {
                        report.shifted.push(shift);
                    }
                    prev_end = new_end;
                }
            }
        }
        None => log::trace!("task {id} is not schedulable, skipping project sequence"),
    }

    roll_up_project_end(db, project, report)
}

/// Set the project end date to the latest deadline among its tasks.
fn roll_up_project_end(db: &mut Database, project: u64, report: &mut PropagationReport) -> Result<()> {
    let Some(latest) = db.latest_deadline(project) else {
        return Ok(());
    };
    let p = db.project_mut(project)?;
    if p.date != Some(latest) {
        log::debug!("project {project} end date {:?} -> {latest}", p.date);
        p.date = Some(latest);
        report.project_end = Some((project, latest));
    }
    Ok(())
}

/// Close every open task whose deadline is before `today`. Returns the closed ids.
pub fn close_overdue_tasks(db: &mut Database, today: NaiveDate) -> Vec<u64> {
    let now = Utc::now().timestamp();
    let mut closed = Vec::new();
    for task in db.tasks.iter_mut() {
        if task.state.is_terminal() {
            continue;
        }
        if task.date_deadline.is_some_and(|d| d < today) {
            task.state = TaskState::Done;
            task.updated_at_utc = now;
            closed.push(task.id);
        }
    }
    if !closed.is_empty() {
        log::info!("closed {} overdue task(s)", closed.len());
    }
    closed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::Project;
    use crate::task::Task;
    use chrono::Duration;
    use rstest::{fixture, rstest};

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, day).unwrap()
    }

    fn add(db: &mut Database, id: u64, parent: Option<u64>, start: NaiveDate, end: NaiveDate) {
        let mut t = Task::new(id, format!("task {id}"), 1, 0);
        t.parent = parent;
        t.set_dates(Some(start), Some(end));
        db.tasks.push(t);
    }

    fn range(db: &Database, id: u64) -> (NaiveDate, NaiveDate) {
        let t = db.get(id).unwrap();
        (t.planned_date_begin.unwrap(), t.date_deadline.unwrap())
    }

    fn scheduler() -> Scheduler {
        Scheduler::new(64)
    }

    /// Four top-level tasks laid back-to-back: 1-5, 6-10, 11-12, 13-20 March.
    #[fixture]
    fn chain() -> Database {
        let mut db = Database::default();
        db.projects.push(Project::new(1, "Villas", 0));
        add(&mut db, 1, None, d(3, 1), d(3, 5));
        add(&mut db, 2, None, d(3, 6), d(3, 10));
        add(&mut db, 3, None, d(3, 11), d(3, 12));
        add(&mut db, 4, None, d(3, 13), d(3, 20));
        db
    }

    /// Parent 10 (1-12 March) with children 11 (1-3), 12 (4-8), 13 (10-12),
    /// followed by top-level task 20 (13-15 March).
    #[fixture]
    fn family() -> Database {
        let mut db = Database::default();
        db.projects.push(Project::new(1, "Tower", 0));
        add(&mut db, 10, None, d(3, 1), d(3, 12));
        add(&mut db, 11, Some(10), d(3, 1), d(3, 3));
        add(&mut db, 12, Some(10), d(3, 4), d(3, 8));
        add(&mut db, 13, Some(10), d(3, 10), d(3, 12));
        add(&mut db, 20, None, d(3, 13), d(3, 15));
        db
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(3)]
    #[case(4)]
    fn reflow_of_consistent_chain_is_noop(mut chain: Database, #[case] id: u64) {
        let before = chain.tasks.clone();
        let report = scheduler().reflow(&mut chain, id).unwrap();
        assert!(report.shifted.is_empty());
        assert_eq!(chain.tasks, before);
        assert_eq!(chain.project(1).unwrap().date, Some(d(3, 20)));
    }

    #[rstest]
    #[case(1)]
    #[case(3)]
    #[case(5)]
    fn shifting_first_task_shifts_the_whole_chain(mut chain: Database, #[case] k: i64) {
        let before: Vec<_> = (1..=4).map(|id| range(&chain, id)).collect();
        let report = scheduler().shift_task(&mut chain, 1, k).unwrap();
        assert_eq!(report.shifted.len(), 3);
        for (i, id) in (1..=4).enumerate() {
            let (s, e) = range(&chain, id);
            assert_eq!(s, before[i].0 + Duration::days(k));
            assert_eq!(e, before[i].1 + Duration::days(k));
        }
        let project_end = chain.project(1).unwrap().date.unwrap();
        assert_eq!(project_end, d(3, 20) + Duration::days(k));
        assert_eq!(report.project_end, Some((1, project_end)));
    }

    #[rstest]
    fn first_task_pulls_later_tasks_back(mut chain: Database) {
        scheduler().shift_task(&mut chain, 1, -2).unwrap();
        assert_eq!(range(&chain, 2), (d(3, 4), d(3, 8)));
        assert_eq!(range(&chain, 4), (d(3, 11), d(3, 18)));
    }

    #[rstest]
    fn middle_edit_leaves_earlier_tasks_alone(mut chain: Database) {
        let changes = TaskChanges {
            date_deadline: Some(Some(d(3, 14))),
            ..Default::default()
        };
        scheduler().write_task(&mut chain, 2, changes, WriteOrigin::User).unwrap();
        assert_eq!(range(&chain, 1), (d(3, 1), d(3, 5)));
        assert_eq!(range(&chain, 2), (d(3, 6), d(3, 14)));
        assert_eq!(range(&chain, 3), (d(3, 15), d(3, 16)));
        assert_eq!(range(&chain, 4), (d(3, 17), d(3, 24)));
    }

    #[rstest]
    fn gaps_after_the_edited_task_are_closed(mut chain: Database) {
        chain.get_mut(4).unwrap().set_dates(Some(d(3, 25)), Some(d(3, 26)));
        scheduler().reflow(&mut chain, 2).unwrap();
        assert_eq!(range(&chain, 4), (d(3, 13), d(3, 14)));
    }

    #[rstest]
    fn sibling_edit_shifts_later_siblings_only(mut family: Database) {
        let changes = TaskChanges {
            date_deadline: Some(Some(d(3, 10))),
            ..Default::default()
        };
        let report = scheduler().write_task(&mut family, 12, changes, WriteOrigin::User).unwrap();

        assert_eq!(range(&family, 11), (d(3, 1), d(3, 3)));
        assert_eq!(range(&family, 12), (d(3, 4), d(3, 10)));
        assert_eq!(range(&family, 13), (d(3, 11), d(3, 13)));
        assert_eq!(range(&family, 10), (d(3, 1), d(3, 13)));
        assert_eq!(report.rolled_up.len(), 1);
        // the parent then pushes the next top-level task
        assert_eq!(range(&family, 20), (d(3, 14), d(3, 16)));
        assert_eq!(family.project(1).unwrap().date, Some(d(3, 16)));
        assert_eq!(report.steps, 2);
    }

    #[rstest]
    fn parent_envelope_includes_untouched_earlier_children(mut family: Database) {
        // Move the last child earlier; earlier children stay, the parent shrinks.
        let changes = TaskChanges::dates(d(3, 9), d(3, 9));
        scheduler().write_task(&mut family, 13, changes, WriteOrigin::User).unwrap();
        assert_eq!(range(&family, 11), (d(3, 1), d(3, 3)));
        assert_eq!(range(&family, 12), (d(3, 4), d(3, 8)));
        assert_eq!(range(&family, 10), (d(3, 1), d(3, 9)));
    }

    #[rstest]
    fn terminal_siblings_are_not_moved(mut family: Database) {
        family.get_mut(13).unwrap().state = TaskState::Done;
        let changes = TaskChanges {
            date_deadline: Some(Some(d(3, 10))),
            ..Default::default()
        };
        scheduler().write_task(&mut family, 12, changes, WriteOrigin::User).unwrap();
        assert_eq!(range(&family, 13), (d(3, 10), d(3, 12)));
    }

    #[rstest]
    fn unschedulable_siblings_are_skipped(mut family: Database) {
        family.get_mut(13).unwrap().set_dates(Some(d(3, 10)), None);
        let changes = TaskChanges {
            date_deadline: Some(Some(d(3, 10))),
            ..Default::default()
        };
        scheduler().write_task(&mut family, 12, changes, WriteOrigin::User).unwrap();
        let t = family.get(13).unwrap();
        assert_eq!(t.planned_date_begin, Some(d(3, 10)));
        assert_eq!(t.date_deadline, None);
    }

    #[rstest]
    fn engine_writes_do_not_propagate(mut chain: Database) {
        let report = scheduler()
            .write_task(&mut chain, 1, TaskChanges::dates(d(3, 2), d(3, 8)), WriteOrigin::Engine)
            .unwrap();
        assert!(report.is_empty());
        assert_eq!(range(&chain, 2), (d(3, 6), d(3, 10)));
    }

    #[rstest]
    fn non_date_writes_do_not_propagate(mut chain: Database) {
        chain.get_mut(4).unwrap().set_dates(Some(d(3, 25)), Some(d(3, 26)));
        let changes = TaskChanges {
            title: Some("Foundations".into()),
            ..Default::default()
        };
        let report = scheduler().write_task(&mut chain, 2, changes, WriteOrigin::User).unwrap();
        assert!(report.is_empty());
        assert_eq!(chain.get(2).unwrap().title, "Foundations");
        assert_eq!(range(&chain, 4), (d(3, 25), d(3, 26)));
    }

    #[rstest]
    #[case(1, d(3, 6))]
    #[case(4, d(3, 9))]
    #[case(14, d(3, 19))]
    fn duration_edit_moves_deadline(mut chain: Database, #[case] days: i64, #[case] end: NaiveDate) {
        let changes = TaskChanges {
            task_duration: Some(days),
            ..Default::default()
        };
        scheduler().write_task(&mut chain, 2, changes, WriteOrigin::User).unwrap();
        let t = chain.get(2).unwrap();
        assert_eq!(t.planned_date_begin, Some(d(3, 6)));
        assert_eq!(t.date_deadline, Some(end));
        assert_eq!(t.task_duration, days);
        // following task starts right after the new deadline
        assert_eq!(range(&chain, 3).0, end + Duration::days(1));
    }

    #[rstest]
    fn invalid_user_edits_are_rejected_without_changes(mut chain: Database) {
        let before = chain.tasks.clone();
        let err = scheduler()
            .write_task(&mut chain, 2, TaskChanges::dates(d(3, 9), d(3, 7)), WriteOrigin::User)
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidDateRange { .. }));
        let err = scheduler()
            .write_task(
                &mut chain,
                2,
                TaskChanges { task_duration: Some(0), ..Default::default() },
                WriteOrigin::User,
            )
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidDuration(0)));
        assert_eq!(chain.tasks, before);
    }

    #[rstest]
    fn step_bound_rolls_back_the_whole_write(mut family: Database) {
        let before = family.tasks.clone();
        let project_end = family.project(1).unwrap().date;
        let err = Scheduler::new(1)
            .write_task(&mut family, 12, TaskChanges::dates(d(3, 4), d(3, 10)), WriteOrigin::User)
            .unwrap_err();
        assert!(matches!(err, AppError::PropagationLimit(1)));
        assert_eq!(family.tasks, before);
        assert_eq!(family.project(1).unwrap().date, project_end);
    }

    #[rstest]
    fn nested_rollup_stops_at_the_direct_parent(mut family: Database) {
        add(&mut family, 30, Some(13), d(3, 10), d(3, 11));
        add(&mut family, 31, Some(13), d(3, 12), d(3, 12));
        let changes = TaskChanges::dates(d(3, 10), d(3, 14));
        let report = scheduler().write_task(&mut family, 30, changes, WriteOrigin::User).unwrap();
        assert_eq!(range(&family, 31), (d(3, 15), d(3, 15)));
        assert_eq!(range(&family, 13), (d(3, 10), d(3, 15)));
        // the grandparent and the parent's siblings keep their dates
        assert_eq!(range(&family, 10), (d(3, 1), d(3, 12)));
        assert_eq!(range(&family, 12), (d(3, 4), d(3, 8)));
        // top-level tasks starting after the parent follow its new end
        assert_eq!(range(&family, 20), (d(3, 16), d(3, 18)));
        assert_eq!(family.project(1).unwrap().date, Some(d(3, 18)));
        assert_eq!(report.rolled_up.len(), 1);
        assert_eq!(report.steps, 2);
    }

    #[rstest]
    fn grandchild_edit_leaves_parent_siblings_alone() {
        let mut db = Database::default();
        db.projects.push(Project::new(1, "Tower", 0));
        add(&mut db, 1, None, d(3, 1), d(3, 10));
        add(&mut db, 2, Some(1), d(3, 1), d(3, 5));
        add(&mut db, 3, Some(1), d(3, 6), d(3, 10));
        add(&mut db, 4, Some(2), d(3, 1), d(3, 5));
        let report = scheduler()
            .write_task(&mut db, 4, TaskChanges::dates(d(3, 1), d(3, 8)), WriteOrigin::User)
            .unwrap();
        assert_eq!(range(&db, 2), (d(3, 1), d(3, 8)));
        assert_eq!(range(&db, 3), (d(3, 6), d(3, 10)));
        assert_eq!(range(&db, 1), (d(3, 1), d(3, 10)));
        assert!(report.shifted.is_empty());
        assert_eq!(report.steps, 2);
    }

    #[rstest]
    fn shift_past_the_calendar_is_rejected(mut chain: Database) {
        let before = chain.tasks.clone();
        let err = scheduler().shift_task(&mut chain, 1, 100_000_000).unwrap_err();
        assert!(matches!(err, AppError::DateOutOfRange { days: 100_000_000, .. }));
        assert!(matches!(
            scheduler().shift_task(&mut chain, 1, i64::MIN),
            Err(AppError::DateOutOfRange { .. })
        ));
        assert_eq!(chain.tasks, before);
    }

    #[rstest]
    fn huge_duration_is_rejected_without_changes(mut chain: Database) {
        let before = chain.tasks.clone();
        let changes = TaskChanges {
            task_duration: Some(100_000_000),
            ..Default::default()
        };
        let err = scheduler().write_task(&mut chain, 2, changes, WriteOrigin::User).unwrap_err();
        assert!(matches!(err, AppError::DateOutOfRange { .. }));
        assert_eq!(chain.tasks, before);
    }

    #[rstest]
    fn cascade_past_the_calendar_rolls_back() {
        let mut db = Database::default();
        db.projects.push(Project::new(1, "Tower", 0));
        let last = NaiveDate::MAX;
        add(&mut db, 1, None, last - Duration::days(10), last - Duration::days(5));
        add(&mut db, 2, None, last - Duration::days(4), last);
        let before = db.tasks.clone();
        let err = scheduler().shift_task(&mut db, 1, 3).unwrap_err();
        assert!(matches!(err, AppError::DateOutOfRange { .. }));
        assert_eq!(db.tasks, before);
    }

    #[rstest]
    fn sweep_closes_overdue_open_tasks_only(mut chain: Database) {
        chain.get_mut(2).unwrap().state = TaskState::Cancelled;
        chain.get_mut(3).unwrap().state = TaskState::Waiting;
        let closed = close_overdue_tasks(&mut chain, d(3, 13));
        assert_eq!(closed, vec![1, 3]);
        assert_eq!(chain.get(1).unwrap().state, TaskState::Done);
        assert_eq!(chain.get(2).unwrap().state, TaskState::Cancelled);
        assert_eq!(chain.get(4).unwrap().state, TaskState::InProgress);
        // already closed tasks are left alone on the next sweep
        assert!(close_overdue_tasks(&mut chain, d(3, 13)).is_empty());
    }

    #[rstest]
    fn shift_requires_both_dates(mut chain: Database) {
        chain.get_mut(3).unwrap().set_dates(None, Some(d(3, 12)));
        assert!(matches!(
            scheduler().shift_task(&mut chain, 3, 2),
            Err(AppError::Rejected(_))
        ));
    }
}
