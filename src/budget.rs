//! Per-project budgets with planned and achieved amounts.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::{next_id, Database};
use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Budget {
    pub id: u64,
    pub name: String,
    pub project: u64,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BudgetLine {
    pub id: u64,
    pub budget: u64,
    pub project: u64,
    #[serde(default)]
    pub planned: f64,
    #[serde(default)]
    pub achieved: f64,
}

fn is_arabic(c: char) -> bool {
    matches!(c,
        '\u{0600}'..='\u{06FF}'
        | '\u{0750}'..='\u{077F}'
        | '\u{08A0}'..='\u{08FF}'
        | '\u{FB50}'..='\u{FDFF}'
        | '\u{FE70}'..='\u{FEFF}')
}

/// Budget label for a project, in Arabic when the project name is written in Arabic.
pub fn budget_label(project_name: &str) -> String {
    if project_name.chars().any(is_arabic) {
        format!("ميزانية {project_name}")
    } else {
        format!("Budget {project_name}")
    }
}

/// Create the budget of a project, spanning the project's dates, with one empty line.
pub fn create_budget(db: &mut Database, project: u64) -> Result<u64> {
    let p = db.project(project)?;
    if db.budgets.iter().any(|b| b.project == project) {
        return Err(AppError::rejected(format!(
            "project '{}' already has a budget",
            p.name
        )));
    }
    if let (Some(start), Some(end)) = (p.date_start, p.date) {
        if end < start {
            return Err(AppError::InvalidDateRange { start, deadline: end });
        }
    }

    let budget = Budget {
        id: next_id(&db.budgets, |b| b.id),
        name: budget_label(&p.name),
        project,
        date_from: p.date_start,
        date_to: p.date,
    };
    let id = budget.id;
    log::info!("created {} for project {}", budget.name, project);
    db.budgets.push(budget);
    db.budget_lines.push(BudgetLine {
        id: next_id(&db.budget_lines, |l| l.id),
        budget: id,
        project,
        planned: 0.0,
        achieved: 0.0,
    });
    Ok(id)
}

pub fn add_line(db: &mut Database, budget: u64, planned: f64) -> Result<u64> {
    let project = db
        .budgets
        .iter()
        .find(|b| b.id == budget)
        .map(|b| b.project)
        .ok_or_else(|| AppError::not_found("budget", budget))?;
    let id = next_id(&db.budget_lines, |l| l.id);
    db.budget_lines.push(BudgetLine {
        id,
        budget,
        project,
        planned,
        achieved: 0.0,
    });
    Ok(id)
}

/// Set the planned amount of a line.
pub fn set_planned(db: &mut Database, line: u64, amount: f64) -> Result<()> {
    line_mut(db, line)?.planned = amount;
    Ok(())
}

/// Add `amount` to the achieved total of a line.
pub fn record_achieved(db: &mut Database, line: u64, amount: f64) -> Result<f64> {
    let l = line_mut(db, line)?;
    l.achieved += amount;
    Ok(l.achieved)
}

fn line_mut(db: &mut Database, line: u64) -> Result<&mut BudgetLine> {
    db.budget_lines
        .iter_mut()
        .find(|l| l.id == line)
        .ok_or_else(|| AppError::not_found("budget line", line))
}

/// `(planned, achieved)` summed over all budget lines of a project.
pub fn totals(db: &Database, project: u64) -> (f64, f64) {
    db.budget_lines
        .iter()
        .filter(|l| l.project == project)
        .fold((0.0, 0.0), |(p, a), l| (p + l.planned, a + l.achieved))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::Project;
    use rstest::rstest;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn db_with(name: &str, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Database {
        let mut db = Database::default();
        let mut p = Project::new(1, name, 0);
        p.date_start = start;
        p.date = end;
        db.projects.push(p);
        db
    }

    #[rstest]
    #[case("Marina Heights", "Budget Marina Heights")]
    #[case("أبراج الخليج", "ميزانية أبراج الخليج")]
    #[case("Tower ﻻ", "ميزانية Tower ﻻ")]
    fn label_follows_project_script(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(budget_label(name), expected);
    }

    #[test]
    fn creates_budget_with_one_line() {
        let mut db = db_with("Marina", Some(d(2025, 1, 1)), Some(d(2025, 12, 31)));
        let id = create_budget(&mut db, 1).unwrap();
        let b = &db.budgets[0];
        assert_eq!(b.id, id);
        assert_eq!(b.date_from, Some(d(2025, 1, 1)));
        assert_eq!(b.date_to, Some(d(2025, 12, 31)));
        assert_eq!(db.budget_lines.len(), 1);
        assert_eq!(db.budget_lines[0].budget, id);
        assert_eq!(db.budget_lines[0].project, 1);
    }

    #[test]
    fn second_budget_is_rejected() {
        let mut db = db_with("Marina", None, None);
        create_budget(&mut db, 1).unwrap();
        assert!(matches!(create_budget(&mut db, 1), Err(AppError::Rejected(_))));
        assert_eq!(db.budgets.len(), 1);
    }

    #[test]
    fn inverted_project_dates_are_rejected() {
        let mut db = db_with("Marina", Some(d(2025, 6, 1)), Some(d(2025, 5, 1)));
        assert!(matches!(
            create_budget(&mut db, 1),
            Err(AppError::InvalidDateRange { .. })
        ));
        assert!(db.budget_lines.is_empty());
    }

    #[test]
    fn totals_sum_lines_of_the_project() {
        let mut db = db_with("Marina", None, None);
        let b = create_budget(&mut db, 1).unwrap();
        let first = db.budget_lines[0].id;
        set_planned(&mut db, first, 1000.0).unwrap();
        let second = add_line(&mut db, b, 500.0).unwrap();
        record_achieved(&mut db, first, 300.0).unwrap();
        assert_eq!(record_achieved(&mut db, second, 200.0).unwrap(), 200.0);
        assert_eq!(totals(&db, 1), (1500.0, 500.0));
        assert_eq!(totals(&db, 2), (0.0, 0.0));
    }
}
