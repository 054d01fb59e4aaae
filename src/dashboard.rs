//! Project KPI dashboard.
//!
//! Computes per-project completion, schedule performance (time spent against
//! allocated hours) and cost spent (achieved against budgeted), each with a
//! colour class for display.

use ratatui::style::Color;

use crate::budget;
use crate::config::Config;
use crate::db::Database;
use crate::project::Project;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    Completion,
    Good,
    Warning,
    Danger,
}

impl Health {
    /// Classify a ratio where 1.0 means on target.
    fn of_ratio(ratio: f64) -> Self {
        if ratio >= 1.0 {
            Health::Good
        } else if ratio >= 0.9 {
            Health::Warning
        } else {
            Health::Danger
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Health::Completion => "completion",
            Health::Good => "good",
            Health::Warning => "warning",
            Health::Danger => "danger",
        }
    }

    pub fn color(self) -> Color {
        match self {
            Health::Completion => Color::Blue,
            Health::Good => Color::Green,
            Health::Warning => Color::Yellow,
            Health::Danger => Color::Red,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metric {
    pub value: f64,
    pub health: Health,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectMetrics {
    pub id: u64,
    pub name: String,
    pub total_tasks: usize,
    pub closed_tasks: usize,
    pub open_tasks: usize,
    pub time_spent: f64,
    pub allocated_hours: f64,
    pub budgeted: f64,
    pub achieved: f64,
    pub completion: Metric,
    pub spi: Metric,
    pub cost: Metric,
}

fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

pub fn project_metrics(db: &Database, project: &Project, config: &Config) -> ProjectMetrics {
    let tasks: Vec<_> = db.tasks.iter().filter(|t| t.project == project.id).collect();
    let total_tasks = tasks.len();
    let closed_tasks = tasks.iter().filter(|t| t.state.is_terminal()).count();
    let time_spent: f64 = tasks.iter().map(|t| t.time_spent_hours).sum();
    let allocated_hours = project.allocated_days * config.hours_per_day;
    let (budgeted, achieved) = budget::totals(db, project.id);

    let completion = if total_tasks > 0 {
        closed_tasks as f64 / total_tasks as f64 * 100.0
    } else {
        0.0
    };

    let spi = if allocated_hours > 0.0 && time_spent > 0.0 {
        time_spent / allocated_hours
    } else if total_tasks > 0 && closed_tasks == total_tasks {
        1.0
    } else {
        0.0
    };

    let cost = if budgeted > 0.0 {
        achieved / budgeted * 100.0
    } else if achieved > 0.0 {
        100.0
    } else {
        0.0
    };

    ProjectMetrics {
        id: project.id,
        name: project.name.clone(),
        total_tasks,
        closed_tasks,
        open_tasks: total_tasks - closed_tasks,
        time_spent,
        allocated_hours,
        budgeted,
        achieved,
        completion: Metric {
            value: round_to(completion, 1),
            health: Health::Completion,
        },
        spi: Metric {
            value: round_to(spi, 2),
            health: Health::of_ratio(spi),
        },
        cost: Metric {
            value: round_to(cost, 1),
            health: Health::of_ratio(cost / 100.0),
        },
    }
}

/// Metrics for every active project whose name contains `filter` (case-insensitive).
pub fn dashboard(db: &Database, config: &Config, filter: Option<&str>) -> Vec<ProjectMetrics> {
    let needle = filter.map(str::to_lowercase);
    db.projects
        .iter()
        .filter(|p| p.active)
        .filter(|p| match &needle {
            Some(n) => p.name.to_lowercase().contains(n),
            None => true,
        })
        .map(|p| project_metrics(db, p, config))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::{create_budget, record_achieved, set_planned};
    use crate::fields::TaskState;
    use crate::task::Task;
    use rstest::rstest;

    fn db_with_tasks(states: &[(TaskState, f64)]) -> Database {
        let mut db = Database::default();
        let mut p = Project::new(1, "Harbour", 0);
        p.allocated_days = 10.0;
        db.projects.push(p);
        for (i, (state, hours)) in states.iter().enumerate() {
            let mut t = Task::new(i as u64 + 1, format!("t{i}"), 1, 0);
            t.state = *state;
            t.time_spent_hours = *hours;
            db.tasks.push(t);
        }
        db
    }

    #[test]
    fn completion_and_spi() {
        let db = db_with_tasks(&[
            (TaskState::Done, 30.0),
            (TaskState::Cancelled, 0.0),
            (TaskState::InProgress, 46.0),
        ]);
        let m = project_metrics(&db, &db.projects[0], &Config::default());
        assert_eq!(m.total_tasks, 3);
        assert_eq!(m.closed_tasks, 2);
        assert_eq!(m.open_tasks, 1);
        assert_eq!(m.allocated_hours, 80.0);
        assert_eq!(m.completion.value, 66.7);
        assert_eq!(m.completion.health, Health::Completion);
        assert_eq!(m.spi.value, 0.95);
        assert_eq!(m.spi.health, Health::Warning);
    }

    #[test]
    fn all_closed_without_time_is_on_schedule() {
        let mut db = db_with_tasks(&[(TaskState::Done, 0.0), (TaskState::Done, 0.0)]);
        db.projects[0].allocated_days = 0.0;
        let m = project_metrics(&db, &db.projects[0], &Config::default());
        assert_eq!(m.spi.value, 1.0);
        assert_eq!(m.spi.health, Health::Good);
    }

    #[test]
    fn empty_project_is_all_zero() {
        let db = db_with_tasks(&[]);
        let m = project_metrics(&db, &db.projects[0], &Config::default());
        assert_eq!(m.completion.value, 0.0);
        assert_eq!(m.spi.value, 0.0);
        assert_eq!(m.spi.health, Health::Danger);
        assert_eq!(m.cost.value, 0.0);
    }

    #[rstest]
    #[case(1000.0, 1000.0, 100.0, Health::Good)]
    #[case(1000.0, 925.0, 92.5, Health::Warning)]
    #[case(1000.0, 333.0, 33.3, Health::Danger)]
    #[case(0.0, 50.0, 100.0, Health::Good)]
    fn cost_spent(
        #[case] planned: f64,
        #[case] achieved: f64,
        #[case] expected: f64,
        #[case] health: Health,
    ) {
        let mut db = db_with_tasks(&[]);
        create_budget(&mut db, 1).unwrap();
        let line = db.budget_lines[0].id;
        set_planned(&mut db, line, planned).unwrap();
        record_achieved(&mut db, line, achieved).unwrap();
        let m = project_metrics(&db, &db.projects[0], &Config::default());
        assert_eq!(m.cost.value, expected);
        assert_eq!(m.cost.health, health);
    }

    #[test]
    fn hours_per_day_comes_from_config() {
        let db = db_with_tasks(&[(TaskState::InProgress, 75.0)]);
        let cfg = Config {
            hours_per_day: 7.5,
            ..Config::default()
        };
        let m = project_metrics(&db, &db.projects[0], &cfg);
        assert_eq!(m.allocated_hours, 75.0);
        assert_eq!(m.spi.value, 1.0);
    }

    #[test]
    fn dashboard_skips_inactive_and_filters_by_name() {
        let mut db = db_with_tasks(&[]);
        db.projects.push(Project::new(2, "Desert Mall", 0));
        let mut archived = Project::new(3, "Old Harbour", 0);
        archived.active = false;
        db.projects.push(archived);

        let all = dashboard(&db, &Config::default(), None);
        assert_eq!(all.iter().map(|m| m.id).collect::<Vec<_>>(), vec![1, 2]);
        let harbour = dashboard(&db, &Config::default(), Some("HARB"));
        assert_eq!(harbour.len(), 1);
        assert_eq!(harbour[0].name, "Harbour");
    }
}
