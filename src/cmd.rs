//! Command implementations for the CLI interface.
//!
//! This module contains the clap command tree and the handlers behind it:
//! project and task CRUD, schedule edits that run through the propagation
//! engine, the overdue sweep, the development financial model, requisitions,
//! work types, budgets, the KPI dashboard and site management.
//!
//! Handlers that change the workbook save it before returning.

use std::collections::HashSet;
use std::path::Path;

use chrono::{Local, NaiveDate, TimeZone, Utc};
use clap::Subcommand;
use clap_complete::{generate, Shell};

use crate::budget;
use crate::config::Config;
use crate::dashboard::dashboard;
use crate::db::*;
use crate::error::{AppError, Result};
use crate::fields::*;
use crate::finance::InputField;
use crate::project::Project;
use crate::requisition::{self, create_requisition, create_rfqs, requisition_mut};
use crate::schedule::{close_overdue_tasks, PropagationReport, Scheduler, TaskChanges, WriteOrigin};
use crate::site::{create_site, discover_sites};
use crate::task::{apply_duration, Task};
use crate::tui::run::run_tui;
use crate::work_type::{add_work_sub_type, add_work_type, sub_type_count};

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the schedule board.
    Ui,

    /// Manage projects.
    Project {
        #[command(subcommand)]
        action: ProjectAction,
    },

    /// Manage tasks and their schedule.
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },

    /// Close every open task whose deadline has passed.
    Sweep {
        /// Reference date instead of today.
        #[arg(long)]
        date: Option<String>,
    },

    /// Development financial model of a project.
    Finance {
        #[command(subcommand)]
        action: FinanceAction,
    },

    /// Material requisitions.
    Requisition {
        #[command(subcommand)]
        action: RequisitionAction,
    },

    /// Work types used to classify requisition lines.
    WorkType {
        #[command(subcommand)]
        action: WorkTypeAction,
    },

    /// Project budgets.
    Budget {
        #[command(subcommand)]
        action: BudgetAction,
    },

    /// KPI dashboard of active projects.
    Dashboard {
        /// Only projects whose name contains this text.
        #[arg(long)]
        filter: Option<String>,
    },

    /// List or create site workbooks.
    Sites {
        /// Create a new site with this name.
        #[arg(long)]
        new: Option<String>,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum ProjectAction {
    /// Add a new project.
    Add {
        name: String,
        /// Project manager notified about requisitions.
        #[arg(long)]
        manager: Option<String>,
        /// Start date: YYYY-MM-DD, "today", "next monday", "in 2w", ...
        #[arg(long)]
        start: Option<String>,
        /// Working days allocated to the project.
        #[arg(long)]
        allocated_days: Option<f64>,
    },
    /// List projects.
    List {
        /// Include archived projects.
        #[arg(long)]
        all: bool,
    },
    /// Show a project.
    View {
        /// Project ID or name
        id: String,
    },
    /// Update project fields.
    Update {
        /// Project ID or name
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        manager: Option<String>,
        #[arg(long)]
        start: Option<String>,
        /// End date. Rolled up again on the next schedule change.
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        allocated_days: Option<f64>,
        /// Archive the project (hidden from lists and the dashboard).
        #[arg(long, conflicts_with = "unarchive")]
        archive: bool,
        #[arg(long)]
        unarchive: bool,
    },
    /// Set the project status.
    Status {
        /// Project ID or name
        id: String,
        #[arg(value_enum)]
        status: ProjectStatus,
    },
}

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a task to a project.
    Add {
        title: String,
        /// Project ID or name. Defaults to the parent's project.
        #[arg(long)]
        project: Option<String>,
        /// Parent task ID or name.
        #[arg(long)]
        parent: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long, conflicts_with = "duration")]
        deadline: Option<String>,
        /// Length in days, counting the start day.
        #[arg(long)]
        duration: Option<i64>,
    },
    /// List tasks.
    List {
        /// Project ID or name.
        #[arg(long)]
        project: Option<String>,
        /// Include done and cancelled tasks.
        #[arg(long)]
        all: bool,
        /// Indent subtasks under their parents.
        #[arg(long)]
        tree: bool,
        #[arg(long, value_enum, default_value_t = SortKey::Start)]
        sort: SortKey,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show a task.
    View {
        /// Task ID or name
        id: String,
        /// Show child subtree.
        #[arg(long)]
        children: bool,
        /// Show ancestor chain.
        #[arg(long)]
        parents: bool,
    },
    /// Change a task. Date changes propagate to related tasks.
    Set {
        /// Task ID or name
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        deadline: Option<String>,
        /// Keep the start and move the deadline to cover this many days.
        #[arg(long)]
        duration: Option<i64>,
        #[arg(long, value_enum)]
        state: Option<TaskState>,
        #[arg(long, conflicts_with = "start")]
        clear_start: bool,
        #[arg(long, conflicts_with = "deadline")]
        clear_deadline: bool,
    },
    /// Move a task by a number of days, keeping its duration.
    Shift {
        /// Task ID or name
        id: String,
        #[arg(allow_hyphen_values = true)]
        days: i64,
    },
    /// Re-run propagation from a task without changing it.
    Reflow {
        /// Task ID or name
        id: String,
    },
    /// Record hours spent on a task.
    Log {
        /// Task ID or name
        id: String,
        hours: f64,
    },
    /// Delete a task.
    Delete {
        /// Task ID or name
        id: String,
        /// Also delete all descendants.
        #[arg(long)]
        cascade: bool,
    },
}

#[derive(Subcommand)]
pub enum FinanceAction {
    /// Print the financial model.
    Show {
        /// Project ID or name
        project: String,
        #[arg(long, value_enum, default_value_t = FinanceView::All)]
        view: FinanceView,
    },
    /// Change one input and recompute.
    Set {
        /// Project ID or name
        project: String,
        #[arg(value_enum)]
        field: InputField,
        #[arg(allow_hyphen_values = true)]
        value: f64,
    },
}

#[derive(Subcommand)]
pub enum RequisitionAction {
    /// Create a draft requisition.
    New {
        /// Project ID or name
        project: String,
        #[arg(long)]
        desc: Option<String>,
        #[arg(long)]
        work_type: Option<u64>,
        /// Sub project ID or name.
        #[arg(long)]
        sub_project: Option<String>,
    },
    /// List requisitions.
    List {
        /// Project ID or name.
        #[arg(long)]
        project: Option<String>,
    },
    /// Show a requisition with its lines and orders.
    View { id: u64 },
    /// Add a material line.
    Line {
        id: u64,
        product: String,
        #[arg(long, default_value_t = 1)]
        qty: u32,
        /// Unit cost.
        #[arg(long, default_value_t = 0.0)]
        cost: f64,
        #[arg(long)]
        vendor: Option<String>,
        #[arg(long)]
        sub_type: Option<u64>,
    },
    /// Submit for approval.
    Submit { id: u64 },
    Approve { id: u64 },
    Cancel { id: u64 },
    /// Back to draft.
    Reset { id: u64 },
    /// Create one request for quotation per vendor.
    Rfq { id: u64 },
    /// Record the received quantity of a line.
    Receive {
        id: u64,
        line: u64,
        qty: u32,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Mark the materials as arrived. Requires --user.
    Arrived { id: u64 },
}

#[derive(Subcommand)]
pub enum WorkTypeAction {
    /// Add a work type.
    Add {
        name: String,
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        desc: Option<String>,
    },
    /// Add a sub type to a work type.
    AddSub {
        work_type: u64,
        name: String,
        #[arg(long)]
        code: Option<String>,
    },
    /// List work types and sub types.
    List,
}

#[derive(Subcommand)]
pub enum BudgetAction {
    /// Create the budget of a project.
    Create {
        /// Project ID or name
        project: String,
    },
    /// Add a budget line.
    Line {
        budget: u64,
        #[arg(long, default_value_t = 0.0)]
        planned: f64,
    },
    /// Set the planned amount of a line.
    Plan {
        line: u64,
        #[arg(allow_hyphen_values = true)]
        amount: f64,
    },
    /// Add to the achieved amount of a line.
    Achieved {
        line: u64,
        #[arg(allow_hyphen_values = true)]
        amount: f64,
    },
    /// Show a project's budget.
    Show {
        /// Project ID or name
        project: String,
    },
}

/// Launch the schedule board.
pub fn cmd_ui(db_path: &Path, config: &Config) -> Result<()> {
    run_tui(db_path, config).map_err(|source| AppError::Io {
        path: db_path.display().to_string(),
        source,
    })
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn parse_opt_date(s: Option<String>) -> Result<Option<NaiveDate>> {
    s.as_deref().map(require_date).transpose()
}

fn format_timestamp(ts: i64) -> String {
    Utc.timestamp_opt(ts, 0)
        .single()
        .map(|d| d.to_rfc3339())
        .unwrap_or_else(|| "-".into())
}

fn print_report(report: &PropagationReport) {
    for s in &report.shifted {
        println!(
            "  moved  #{:<4} {} .. {}  ->  {} .. {}",
            s.task,
            format_date(s.old_start),
            format_date(s.old_deadline),
            s.new_start,
            s.new_deadline
        );
    }
    for s in &report.rolled_up {
        println!(
            "  parent #{:<4} {} .. {}  ->  {} .. {}",
            s.task,
            format_date(s.old_start),
            format_date(s.old_deadline),
            s.new_start,
            s.new_deadline
        );
    }
    if let Some((project, end)) = report.project_end {
        println!("  project #{project} end date -> {end}");
    }
}

/// Project commands.
pub fn cmd_project(db: &mut Database, db_path: &Path, action: ProjectAction) -> Result<()> {
    match action {
        ProjectAction::Add { name, manager, start, allocated_days } => {
            if name.trim().is_empty() {
                return Err(AppError::rejected("project name cannot be empty"));
            }
            let id = db.next_project_id();
            let mut project = Project::new(id, name.trim(), Utc::now().timestamp());
            project.manager = manager.filter(|m| !m.trim().is_empty());
            project.date_start = parse_opt_date(start)?;
            project.allocated_days = allocated_days.unwrap_or(0.0);
            db.projects.push(project);
            db.save(db_path)?;
            println!("Added project {id}");
        }
        ProjectAction::List { all } => {
            println!(
                "{:<5} {:<28} {:<12} {:<11} {:<11} {:>6}",
                "ID", "Name", "Status", "Start", "End", "Tasks"
            );
            for p in db.projects.iter().filter(|p| all || p.active) {
                let tasks = db.tasks.iter().filter(|t| t.project == p.id).count();
                println!(
                    "{:<5} {:<28} {:<12} {:<11} {:<11} {:>6}",
                    p.id,
                    truncate(&p.name, 28),
                    format_project_status(p.status),
                    format_date(p.date_start),
                    format_date(p.date),
                    tasks
                );
            }
        }
        ProjectAction::View { id } => {
            let p = db.project(resolve_project_identifier(&id, db)?)?;
            let (planned, achieved) = budget::totals(db, p.id);
            println!("ID:             {}", p.id);
            println!("Name:           {}", p.name);
            println!("Manager:        {}", p.manager.as_deref().unwrap_or("-"));
            println!("Status:         {}", format_project_status(p.status));
            println!("Active:         {}", if p.active { "yes" } else { "no" });
            println!("Start:          {}", format_date(p.date_start));
            println!("End:            {}", format_date(p.date));
            println!("Allocated days: {}", p.allocated_days);
            println!("Budget:         {planned:.2} planned, {achieved:.2} achieved");
            println!("Created UTC:    {}", format_timestamp(p.created_at_utc));
            let mut tasks: Vec<&Task> = db
                .tasks
                .iter()
                .filter(|t| t.project == p.id && t.parent.is_none())
                .collect();
            tasks.sort_by_key(|t| (t.planned_date_begin.is_none(), t.planned_date_begin, t.id));
            if !tasks.is_empty() {
                println!();
                print_task_table(&tasks, None);
            }
        }
        ProjectAction::Update { id, name, manager, start, end, allocated_days, archive, unarchive } => {
            let pid = resolve_project_identifier(&id, db)?;
            let start = parse_opt_date(start)?;
            let end = parse_opt_date(end)?;
            let p = db.project_mut(pid)?;
            if let Some(n) = name.filter(|n| !n.trim().is_empty()) {
                p.name = n.trim().to_string();
            }
            if let Some(m) = manager {
                p.manager = if m.trim().is_empty() { None } else { Some(m) };
            }
            if start.is_some() {
                p.date_start = start;
            }
            if end.is_some() {
                p.date = end;
            }
            if let Some(days) = allocated_days {
                p.allocated_days = days;
            }
            if archive {
                p.active = false;
            }
            if unarchive {
                p.active = true;
            }
            db.save(db_path)?;
            println!("Updated project {pid}");
        }
        ProjectAction::Status { id, status } => {
            let pid = resolve_project_identifier(&id, db)?;
            let previous = db.project_mut(pid)?.set_status(status);
            db.save(db_path)?;
            println!(
                "Project {pid}: {} -> {}",
                format_project_status(previous),
                format_project_status(status)
            );
        }
    }
    Ok(())
}

/// Task commands. Schedule edits go through the propagation engine.
pub fn cmd_task(db: &mut Database, db_path: &Path, config: &Config, action: TaskAction) -> Result<()> {
    let scheduler = Scheduler::new(config.max_propagation_steps);
    match action {
        TaskAction::Add { title, project, parent, start, deadline, duration } => {
            let parent_id = parent.map(|p| resolve_task_identifier(&p, db)).transpose()?;
            let parent_project = match parent_id {
                Some(pid) => Some(db.task(pid)?.project),
                None => None,
            };
            let project_id = match (project, parent_project) {
                (Some(p), Some(pp)) => {
                    let p = resolve_project_identifier(&p, db)?;
                    if p != pp {
                        return Err(AppError::InvalidHierarchy(format!(
                            "parent task belongs to project {pp}, not {p}"
                        )));
                    }
                    p
                }
                (Some(p), None) => resolve_project_identifier(&p, db)?,
                (None, Some(pp)) => pp,
                (None, None) => {
                    return Err(AppError::rejected("a task needs --project or --parent"));
                }
            };

            let start = parse_opt_date(start)?;
            let mut deadline = parse_opt_date(deadline)?;
            if let Some(d) = duration {
                if d < 1 {
                    return Err(AppError::InvalidDuration(d));
                }
                deadline = start.map(|s| apply_duration(s, d)).transpose()?;
            }
            if let (Some(s), Some(d)) = (start, deadline) {
                if d < s {
                    return Err(AppError::InvalidDateRange { start: s, deadline: d });
                }
            }

            let id = db.next_task_id();
            let mut task = Task::new(id, title, project_id, Utc::now().timestamp());
            task.parent = parent_id;
            task.set_dates(start, deadline);
            db.tasks.push(task);
            db.save(db_path)?;
            println!("Added task {id}");
        }
        TaskAction::List { project, all, tree, sort, limit } => {
            let project = project.map(|p| resolve_project_identifier(&p, db)).transpose()?;
            let mut tasks: Vec<&Task> = db
                .tasks
                .iter()
                .filter(|t| all || !t.state.is_terminal())
                .filter(|t| project.map_or(true, |p| t.project == p))
                .collect();
            match sort {
                SortKey::Start => {
                    tasks.sort_by_key(|t| (t.planned_date_begin.is_none(), t.planned_date_begin, t.id))
                }
                SortKey::Deadline => {
                    tasks.sort_by_key(|t| (t.date_deadline.is_none(), t.date_deadline, t.id))
                }
                SortKey::Id => tasks.sort_by_key(|t| t.id),
            }
            if let Some(n) = limit {
                tasks.truncate(n);
            }
            if tree {
                print_task_table(&tasks, Some(&depth_map(db)));
            } else {
                print_task_table(&tasks, None);
            }
        }
        TaskAction::View { id, children, parents } => {
            let task_id = resolve_task_identifier(&id, db)?;
            let t = db.task(task_id)?;
            let project = db.project(t.project).map(|p| p.name.as_str()).unwrap_or("-");
            println!("ID:           {}", t.id);
            println!("Title:        {}", t.title);
            println!("Project:      {} (#{})", project, t.project);
            println!("Parent:       {}", t.parent.map(|p| p.to_string()).unwrap_or_else(|| "-".into()));
            println!("State:        {}", format_task_state(t.state));
            println!("Start:        {}", format_date(t.planned_date_begin));
            println!("Deadline:     {}", format_date(t.date_deadline));
            println!("Duration:     {} day(s)", t.task_duration);
            println!("Time spent:   {:.1} h", t.time_spent_hours);
            println!("Created UTC:  {}", format_timestamp(t.created_at_utc));
            println!("Updated UTC:  {}", format_timestamp(t.updated_at_utc));

            if parents {
                let chain = collect_ancestors(task_id, db);
                if chain.is_empty() {
                    println!("Ancestors: -");
                } else {
                    println!(
                        "Ancestors (closest first): {}",
                        chain.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(" -> ")
                    );
                }
            }
            if children {
                let child_map = build_children_map(&db.tasks);
                let mut ids = HashSet::new();
                collect_descendants(task_id, &child_map, &mut ids);
                let depths = depth_map(db);
                let mut subtree: Vec<&Task> = db.tasks.iter().filter(|t| ids.contains(&t.id)).collect();
                subtree.sort_by_key(|t| (t.planned_date_begin.is_none(), t.planned_date_begin, t.id));
                println!("Children:");
                if subtree.is_empty() {
                    println!("  -");
                } else {
                    print_task_table(&subtree, Some(&depths));
                }
            }
        }
        TaskAction::Set { id, title, start, deadline, duration, state, clear_start, clear_deadline } => {
            let task_id = resolve_task_identifier(&id, db)?;
            let mut changes = TaskChanges {
                title,
                task_duration: duration,
                state,
                ..Default::default()
            };
            if clear_start {
                changes.planned_date_begin = Some(None);
            } else if let Some(s) = start {
                changes.planned_date_begin = Some(Some(require_date(&s)?));
            }
            if clear_deadline {
                changes.date_deadline = Some(None);
            } else if let Some(d) = deadline {
                changes.date_deadline = Some(Some(require_date(&d)?));
            }
            let report = scheduler.write_task(db, task_id, changes, WriteOrigin::User)?;
            db.save(db_path)?;
            println!("Updated task {task_id}");
            print_report(&report);
        }
        TaskAction::Shift { id, days } => {
            let task_id = resolve_task_identifier(&id, db)?;
            let report = scheduler.shift_task(db, task_id, days)?;
            db.save(db_path)?;
            println!("Shifted task {task_id} by {days} day(s)");
            print_report(&report);
        }
        TaskAction::Reflow { id } => {
            let task_id = resolve_task_identifier(&id, db)?;
            let report = scheduler.reflow(db, task_id)?;
            if report.is_empty() {
                println!("Schedule already consistent.");
            } else {
                db.save(db_path)?;
                print_report(&report);
            }
        }
        TaskAction::Log { id, hours } => {
            let task_id = resolve_task_identifier(&id, db)?;
            let t = db.task_mut(task_id)?;
            t.time_spent_hours += hours;
            t.updated_at_utc = Utc::now().timestamp();
            let total = t.time_spent_hours;
            db.save(db_path)?;
            println!("Task {task_id}: {total:.1} h spent");
        }
        TaskAction::Delete { id, cascade } => {
            let task_id = resolve_task_identifier(&id, db)?;
            let child_map = build_children_map(&db.tasks);
            let mut to_delete = HashSet::new();
            collect_descendants(task_id, &child_map, &mut to_delete);
            if !to_delete.is_empty() && !cascade {
                return Err(AppError::rejected(format!(
                    "task {task_id} has {} descendant(s). Use --cascade to delete all.",
                    to_delete.len()
                )));
            }
            to_delete.insert(task_id);
            db.remove_ids(&to_delete);
            db.save(db_path)?;
            println!("Deleted {} task(s).", to_delete.len());
        }
    }
    Ok(())
}

/// Close overdue tasks.
pub fn cmd_sweep(db: &mut Database, db_path: &Path, date: Option<String>) -> Result<()> {
    let reference = match date {
        Some(d) => require_date(&d)?,
        None => today(),
    };
    let closed = close_overdue_tasks(db, reference);
    if closed.is_empty() {
        println!("No overdue tasks before {reference}.");
        return Ok(());
    }
    db.save(db_path)?;
    println!("Closed {} overdue task(s):", closed.len());
    for id in closed {
        if let Some(t) = db.get(id) {
            println!("  {} - {} (deadline {})", id, t.title, format_date(t.date_deadline));
        }
    }
    Ok(())
}

fn print_rows(title: &str, rows: &[(&'static str, f64)]) {
    println!("{title}");
    for (label, value) in rows {
        println!("  {label:<42} {value:>18.2}");
    }
}

/// Development financial model commands.
pub fn cmd_finance(db: &mut Database, db_path: &Path, action: FinanceAction) -> Result<()> {
    match action {
        FinanceAction::Show { project, view } => {
            let p = db.project(resolve_project_identifier(&project, db)?)?;
            println!("{}: development model", p.name);
            let model = &p.finance;
            if matches!(view, FinanceView::Inputs | FinanceView::All) {
                print_rows("Inputs", &model.input_rows());
            }
            if matches!(view, FinanceView::Developer | FinanceView::All) {
                print_rows("Developer", &model.developer_rows());
            }
            if matches!(view, FinanceView::Investor | FinanceView::All) {
                print_rows("Investor", &model.investor_rows());
            }
        }
        FinanceAction::Set { project, field, value } => {
            let pid = resolve_project_identifier(&project, db)?;
            match db.project_mut(pid)?.finance.set(field, value) {
                Some(stage) => {
                    log::debug!("project {pid}: {field:?} = {value}, recomputed from {stage:?}");
                    db.save(db_path)?;
                    println!("Updated {field:?} on project {pid}");
                }
                None => println!("{field:?} unchanged"),
            }
        }
    }
    Ok(())
}

/// Material requisition commands.
pub fn cmd_requisition(
    db: &mut Database,
    db_path: &Path,
    config: &Config,
    user: Option<&str>,
    action: RequisitionAction,
) -> Result<()> {
    match action {
        RequisitionAction::New { project, desc, work_type, sub_project } => {
            let pid = resolve_project_identifier(&project, db)?;
            let sub = sub_project.map(|s| resolve_project_identifier(&s, db)).transpose()?;
            let id = create_requisition(db, pid, desc, work_type, sub)?;
            db.save(db_path)?;
            let r = requisition::requisition(db, id)?;
            println!("Created requisition {} ({})", r.name, r.id);
            for m in &r.messages {
                println!("  {m}");
            }
        }
        RequisitionAction::List { project } => {
            let project = project.map(|p| resolve_project_identifier(&p, db)).transpose()?;
            println!(
                "{:<5} {:<8} {:<22} {:<24} {:>6} {:>12}",
                "ID", "Name", "State", "Project", "Lines", "Total"
            );
            for r in db
                .requisitions
                .iter()
                .filter(|r| project.map_or(true, |p| r.project == p))
            {
                let name = db.project(r.project).map(|p| p.name.as_str()).unwrap_or("-");
                println!(
                    "{:<5} {:<8} {:<22} {:<24} {:>6} {:>12.2}",
                    r.id,
                    r.name,
                    format_requisition_state(r.state),
                    truncate(name, 24),
                    r.lines.len(),
                    r.total()
                );
            }
        }
        RequisitionAction::View { id } => {
            let r = requisition::requisition(db, id)?;
            println!("Requisition:  {} (#{})", r.name, r.id);
            println!("State:        {}", format_requisition_state(r.state));
            println!("Project:      #{}", r.project);
            if let Some(sub) = r.sub_project {
                println!("Sub project:  #{sub}");
            }
            println!("Description:  {}", r.description.as_deref().unwrap_or("-"));
            println!("Created UTC:  {}", format_timestamp(r.created_at_utc));
            if let Some(ts) = r.material_arrived_at_utc {
                println!("Arrived UTC:  {}", format_timestamp(ts));
            }
            println!();
            println!(
                "{:<4} {:<28} {:>6} {:>8} {:>10} {:>12} {}",
                "Line", "Product", "Qty", "Recv", "Cost", "Total", "Vendor"
            );
            for l in &r.lines {
                println!(
                    "{:<4} {:<28} {:>6} {:>8} {:>10.2} {:>12.2} {}",
                    l.id,
                    truncate(&l.product, 28),
                    l.quantity,
                    l.received_qty,
                    l.cost,
                    l.total_price(),
                    l.vendor.as_deref().unwrap_or("-")
                );
            }
            println!("{:>72.2}", r.total());
            for po in db.purchase_orders.iter().filter(|p| p.requisition == r.id) {
                println!("RFQ #{} to {} ({} line(s))", po.id, po.vendor, po.lines.len());
            }
            for m in &r.messages {
                println!("> {m}");
            }
        }
        RequisitionAction::Line { id, product, qty, cost, vendor, sub_type } => {
            let line = requisition::add_line(db, id, &product, qty, cost, vendor, sub_type)?;
            db.save(db_path)?;
            println!("Added line {line} to requisition {id}");
        }
        RequisitionAction::Submit { id } => {
            requisition_mut(db, id)?.submit();
            db.save(db_path)?;
        }
        RequisitionAction::Approve { id } => {
            requisition_mut(db, id)?.approve();
            db.save(db_path)?;
        }
        RequisitionAction::Cancel { id } => {
            requisition_mut(db, id)?.cancel();
            db.save(db_path)?;
        }
        RequisitionAction::Reset { id } => {
            requisition_mut(db, id)?.reset();
            db.save(db_path)?;
        }
        RequisitionAction::Rfq { id } => {
            let orders = create_rfqs(db, id)?;
            db.save(db_path)?;
            for po in db.purchase_orders.iter().filter(|p| orders.contains(&p.id)) {
                println!("Created RFQ #{} for {}", po.id, po.vendor);
            }
        }
        RequisitionAction::Receive { id, line, qty, notes } => {
            requisition_mut(db, id)?.receive(line, qty, notes)?;
            db.save(db_path)?;
            println!("Line {line}: received {qty}");
        }
        RequisitionAction::Arrived { id } => {
            let user = user.ok_or_else(|| {
                AppError::rejected("pass --user (or set SPM_USER) to mark materials as arrived")
            })?;
            requisition_mut(db, id)?.mark_arrived(user, config, Utc::now().timestamp())?;
            db.save(db_path)?;
            println!("Requisition {id}: materials arrived");
        }
    }
    Ok(())
}

/// Work type commands.
pub fn cmd_work_type(db: &mut Database, db_path: &Path, action: WorkTypeAction) -> Result<()> {
    match action {
        WorkTypeAction::Add { name, code, desc } => {
            let id = add_work_type(db, &name, code, desc)?;
            db.save(db_path)?;
            println!("Added work type {id}");
        }
        WorkTypeAction::AddSub { work_type, name, code } => {
            let id = add_work_sub_type(db, work_type, &name, code)?;
            db.save(db_path)?;
            println!("Added work sub type {id}");
        }
        WorkTypeAction::List => {
            println!("{:<5} {:<8} {:<28} {}", "ID", "Code", "Name", "Sub types");
            for w in &db.work_types {
                println!(
                    "{:<5} {:<8} {:<28} {}",
                    w.id,
                    w.code.as_deref().unwrap_or("-"),
                    truncate(&w.name, 28),
                    sub_type_count(db, w.id)
                );
                for s in db.work_sub_types.iter().filter(|s| s.work_type == w.id) {
                    println!("  {:<3} {:<8} {}", s.id, s.code.as_deref().unwrap_or("-"), s.name);
                }
            }
        }
    }
    Ok(())
}

/// Budget commands.
pub fn cmd_budget(db: &mut Database, db_path: &Path, action: BudgetAction) -> Result<()> {
    match action {
        BudgetAction::Create { project } => {
            let pid = resolve_project_identifier(&project, db)?;
            let id = budget::create_budget(db, pid)?;
            db.save(db_path)?;
            println!("Created budget {id}");
        }
        BudgetAction::Line { budget, planned } => {
            let id = budget::add_line(db, budget, planned)?;
            db.save(db_path)?;
            println!("Added budget line {id}");
        }
        BudgetAction::Plan { line, amount } => {
            budget::set_planned(db, line, amount)?;
            db.save(db_path)?;
        }
        BudgetAction::Achieved { line, amount } => {
            let total = budget::record_achieved(db, line, amount)?;
            db.save(db_path)?;
            println!("Line {line}: {total:.2} achieved");
        }
        BudgetAction::Show { project } => {
            let pid = resolve_project_identifier(&project, db)?;
            let Some(b) = db.budgets.iter().find(|b| b.project == pid) else {
                println!("Project {pid} has no budget.");
                return Ok(());
            };
            println!("{} (#{})  {} .. {}", b.name, b.id, format_date(b.date_from), format_date(b.date_to));
            println!("{:<5} {:>14} {:>14}", "Line", "Planned", "Achieved");
            for l in db.budget_lines.iter().filter(|l| l.budget == b.id) {
                println!("{:<5} {:>14.2} {:>14.2}", l.id, l.planned, l.achieved);
            }
            let (planned, achieved) = budget::totals(db, pid);
            println!("{:<5} {:>14.2} {:>14.2}", "Total", planned, achieved);
        }
    }
    Ok(())
}

/// Print the KPI dashboard.
pub fn cmd_dashboard(db: &Database, config: &Config, filter: Option<String>) {
    println!(
        "{:<5} {:<24} {:>9} {:>11} {:>14} {:>14}",
        "ID", "Project", "Tasks", "Completion", "SPI", "Cost spent"
    );
    for m in dashboard(db, config, filter.as_deref()) {
        println!(
            "{:<5} {:<24} {:>4}/{:<4} {:>10.1}% {:>6.2} {:<7} {:>6.1}% {:<7}",
            m.id,
            truncate(&m.name, 24),
            m.closed_tasks,
            m.total_tasks,
            m.completion.value,
            m.spi.value,
            m.spi.health.label(),
            m.cost.value,
            m.cost.health.label()
        );
    }
}

/// List site workbooks, or create one.
pub fn cmd_sites(data_dir: &Path, new: Option<String>) -> Result<()> {
    if let Some(name) = new {
        let site = create_site(&name, data_dir)?;
        println!("Created site '{}' at {}", site.display_name, site.file_path.display());
        return Ok(());
    }
    let sites = discover_sites(data_dir)?;
    if sites.is_empty() {
        println!("No sites in {}. Create one with `spm sites --new <name>`.", data_dir.display());
    }
    for s in sites {
        println!("{:<24} {}", s.display_name, s.file_path.display());
    }
    Ok(())
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    use clap::CommandFactory;
    let mut cmd = crate::cli::Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut std::io::stdout());
}
