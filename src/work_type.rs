//! Work types and their sub types, used to classify requisition lines.

use serde::{Deserialize, Serialize};

use crate::db::{next_id, Database};
use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkType {
    pub id: u64,
    pub name: String,
    pub code: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkSubType {
    pub id: u64,
    pub name: String,
    pub code: Option<String>,
    pub work_type: u64,
}

pub fn add_work_type(db: &mut Database, name: &str, code: Option<String>, description: Option<String>) -> Result<u64> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::rejected("work type name cannot be empty"));
    }
    let id = next_id(&db.work_types, |w| w.id);
    db.work_types.push(WorkType {
        id,
        name: name.to_string(),
        code,
        description,
    });
    Ok(id)
}

pub fn add_work_sub_type(db: &mut Database, work_type: u64, name: &str, code: Option<String>) -> Result<u64> {
    if !db.work_types.iter().any(|w| w.id == work_type) {
        return Err(AppError::not_found("work type", work_type));
    }
    let id = next_id(&db.work_sub_types, |w| w.id);
    db.work_sub_types.push(WorkSubType {
        id,
        name: name.trim().to_string(),
        code,
        work_type,
    });
    Ok(id)
}

/// Sub types selectable on lines of a requisition with the given work type.
/// Nothing is selectable while the requisition has no work type.
pub fn allowed_sub_types(db: &Database, work_type: Option<u64>) -> Vec<u64> {
    match work_type {
        Some(wt) => db
            .work_sub_types
            .iter()
            .filter(|s| s.work_type == wt)
            .map(|s| s.id)
            .collect(),
        None => Vec::new(),
    }
}

pub fn sub_type_count(db: &Database, work_type: u64) -> usize {
    db.work_sub_types.iter().filter(|s| s.work_type == work_type).count()
}
