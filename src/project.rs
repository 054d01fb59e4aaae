//! Construction project record.
//!
//! A project owns its top-level tasks, carries the development financial
//! model, and exposes an end date that the scheduling engine keeps rolled up
//! to the latest task deadline.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::fields::ProjectStatus;
use crate::finance::DevelopmentModel;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: u64,
    pub name: String,
    /// Project manager notified about new requisitions.
    pub manager: Option<String>,
    pub date_start: Option<NaiveDate>,
    /// End date; rolled up from task deadlines.
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub allocated_days: f64,
    #[serde(default)]
    pub finance: DevelopmentModel,
    pub created_at_utc: i64,
}

fn default_active() -> bool {
    true
}

impl Project {
    pub fn new(id: u64, name: impl Into<String>, now_utc: i64) -> Self {
        Project {
            id,
            name: name.into(),
            manager: None,
            date_start: None,
            date: None,
            status: ProjectStatus::New,
            active: true,
            allocated_days: 0.0,
            finance: DevelopmentModel::default(),
            created_at_utc: now_utc,
        }
    }

    /// Move the project to `status`. Returns the previous status.
    pub fn set_status(&mut self, status: ProjectStatus) -> ProjectStatus {
        let previous = self.status;
        self.status = status;
        if previous != status {
            log::info!("project {} status {:?} -> {:?}", self.id, previous, status);
        }
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_project_is_active_and_new() {
        let p = Project::new(3, "Al Nakheel Villas", 0);
        assert!(p.active);
        assert_eq!(p.status, ProjectStatus::New);
        assert!(p.date.is_none());
    }

    #[test]
    fn set_status_returns_previous() {
        let mut p = Project::new(1, "Tower", 0);
        assert_eq!(p.set_status(ProjectStatus::InProgress), ProjectStatus::New);
        assert_eq!(p.set_status(ProjectStatus::OnHold), ProjectStatus::InProgress);
        assert_eq!(p.status, ProjectStatus::OnHold);
    }

    #[test]
    fn missing_optional_fields_deserialise() {
        let json = r#"{"id":1,"name":"Tower","manager":null,"date_start":null,"date":null,"created_at_utc":0}"#;
        let p: Project = serde_json::from_str(json).unwrap();
        assert!(p.active);
        assert_eq!(p.finance, DevelopmentModel::default());
    }
}
