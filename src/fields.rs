//! Enumerations and field types for sites, projects, tasks and requisitions.
//!
//! This module defines the structured values stored in the workbook and
//! accepted on the command line.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Task lifecycle state. `Done` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    #[default]
    InProgress,
    ChangesRequested,
    Approved,
    Waiting,
    Done,
    Cancelled,
}

impl TaskState {
    /// Terminal tasks are excluded from date propagation and from the overdue sweep.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Done | TaskState::Cancelled)
    }
}

/// Project lifecycle status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectStatus {
    #[default]
    New,
    InProgress,
    Completed,
    OnHold,
    Cancelled,
}

/// Material requisition workflow state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RequisitionState {
    #[default]
    Draft,
    Waiting,
    Approved,
    InProgress,
    MaterialArrived,
    Cancelled,
}

/// Which side of the development financial model to print.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum FinanceView {
    Developer,
    Investor,
    Inputs,
    All,
}

/// Available sorting options for task lists.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortKey {
    Start,
    Deadline,
    Id,
}

/// Format a task state for display.
pub fn format_task_state(s: TaskState) -> &'static str {
    match s {
        TaskState::InProgress => "In Progress",
        TaskState::ChangesRequested => "Changes Req.",
        TaskState::Approved => "Approved",
        TaskState::Waiting => "Waiting",
        TaskState::Done => "Done",
        TaskState::Cancelled => "Cancelled",
    }
}

/// Format a project status for display.
pub fn format_project_status(s: ProjectStatus) -> &'static str {
    match s {
        ProjectStatus::New => "New",
        ProjectStatus::InProgress => "In Progress",
        ProjectStatus::Completed => "Completed",
        ProjectStatus::OnHold => "On Hold",
        ProjectStatus::Cancelled => "Cancelled",
    }
}

/// Format a requisition state for display.
pub fn format_requisition_state(s: RequisitionState) -> &'static str {
    match s {
        RequisitionState::Draft => "Draft",
        RequisitionState::Waiting => "Waiting for Approval",
        RequisitionState::Approved => "Approved",
        RequisitionState::InProgress => "In Progress",
        RequisitionState::MaterialArrived => "Material Arrived",
        RequisitionState::Cancelled => "Cancelled",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_done_and_cancelled_are_terminal() {
        assert!(TaskState::Done.is_terminal());
        assert!(TaskState::Cancelled.is_terminal());
        assert!(!TaskState::InProgress.is_terminal());
        assert!(!TaskState::Waiting.is_terminal());
    }

    #[test]
    fn states_serialise_kebab_case() {
        let s = serde_json::to_string(&RequisitionState::MaterialArrived).unwrap();
        assert_eq!(s, "\"material-arrived\"");
        let t: TaskState = serde_json::from_str("\"changes-requested\"").unwrap();
        assert_eq!(t, TaskState::ChangesRequested);
    }
}
