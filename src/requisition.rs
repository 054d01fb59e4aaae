//! Material requisitions.
//!
//! A requisition collects the materials a project needs. It moves through
//! draft → waiting → approved, spawns one request for quotation per vendor,
//! and is closed by marking the materials as arrived once something has been
//! received. Marking arrival is restricted to the users listed in the config.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::db::{next_id, Database};
use crate::error::{AppError, Result};
use crate::fields::RequisitionState;
use crate::work_type::allowed_sub_types;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Requisition {
    pub id: u64,
    /// `MR00001`, `MR00002`, ...
    pub name: String,
    pub description: Option<String>,
    pub project: u64,
    pub sub_project: Option<u64>,
    #[serde(default)]
    pub state: RequisitionState,
    pub work_type: Option<u64>,
    #[serde(default)]
    pub lines: Vec<RequisitionLine>,
    #[serde(default)]
    pub purchase_orders: Vec<u64>,
    pub material_arrived_at_utc: Option<i64>,
    /// Chatter: notifications and workflow notes, oldest first.
    #[serde(default)]
    pub messages: Vec<String>,
    pub created_at_utc: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequisitionLine {
    pub id: u64,
    pub product: String,
    pub work_sub_type: Option<u64>,
    pub quantity: u32,
    #[serde(default)]
    pub received_qty: u32,
    pub receiving_notes: Option<String>,
    /// Unit cost.
    pub cost: f64,
    pub vendor: Option<String>,
}

impl RequisitionLine {
    pub fn total_price(&self) -> f64 {
        self.quantity as f64 * self.cost
    }
}

/// Request for quotation sent to a single vendor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PurchaseOrder {
    pub id: u64,
    pub vendor: String,
    /// Name of the requisition it came from.
    pub origin: String,
    pub requisition: u64,
    pub project: u64,
    pub lines: Vec<OrderLine>,
    pub created_at_utc: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderLine {
    pub product: String,
    pub quantity: u32,
    pub price_unit: f64,
}

impl Requisition {
    pub fn total(&self) -> f64 {
        self.lines.iter().map(RequisitionLine::total_price).sum()
    }

    fn line_mut(&mut self, line: u64) -> Result<&mut RequisitionLine> {
        self.lines
            .iter_mut()
            .find(|l| l.id == line)
            .ok_or_else(|| AppError::not_found("requisition line", line))
    }

    fn transition(&mut self, to: RequisitionState) {
        log::info!("requisition {} {:?} -> {:?}", self.name, self.state, to);
        self.state = to;
    }

    pub fn submit(&mut self) {
        self.transition(RequisitionState::Waiting);
    }

    pub fn approve(&mut self) {
        self.transition(RequisitionState::Approved);
    }

    pub fn cancel(&mut self) {
        self.transition(RequisitionState::Cancelled);
    }

    pub fn reset(&mut self) {
        self.transition(RequisitionState::Draft);
    }

    /// Record a received quantity on a line. It may not exceed the requested quantity.
    pub fn receive(&mut self, line: u64, qty: u32, notes: Option<String>) -> Result<()> {
        let line = self.line_mut(line)?;
        if qty > line.quantity {
            return Err(AppError::rejected(
                "Received quantity cannot exceed the requested quantity.",
            ));
        }
        line.received_qty = qty;
        if notes.is_some() {
            line.receiving_notes = notes;
        }
        Ok(())
    }

    /// Close the requisition as delivered.
    pub fn mark_arrived(&mut self, user: &str, config: &Config, now_utc: i64) -> Result<()> {
        if !config.may_mark_arrival(user) {
            return Err(AppError::Unauthorized {
                user: user.to_string(),
                action: "mark materials as arrived",
            });
        }
        if !self.lines.iter().any(|l| l.received_qty > 0) {
            return Err(AppError::rejected(
                "At least one line must have Received Qty > 0 before marking as received.",
            ));
        }
        self.transition(RequisitionState::MaterialArrived);
        self.material_arrived_at_utc = Some(now_utc);
        Ok(())
    }
}

/// Create a draft requisition and notify the project manager.
pub fn create_requisition(
    db: &mut Database,
    project: u64,
    description: Option<String>,
    work_type: Option<u64>,
    sub_project: Option<u64>,
) -> Result<u64> {
    let manager = db.project(project)?.manager.clone();
    if let Some(sub) = sub_project {
        db.project(sub)?;
    }
    if let Some(wt) = work_type {
        if !db.work_types.iter().any(|w| w.id == wt) {
            return Err(AppError::not_found("work type", wt));
        }
    }

    db.requisition_seq += 1;
    let id = next_id(&db.requisitions, |r| r.id);
    let mut req = Requisition {
        id,
        name: format!("MR{:05}", db.requisition_seq),
        description,
        project,
        sub_project,
        state: RequisitionState::Draft,
        work_type,
        lines: Vec::new(),
        purchase_orders: Vec::new(),
        material_arrived_at_utc: None,
        messages: Vec::new(),
        created_at_utc: Utc::now().timestamp(),
    };
    let note = match manager.as_deref() {
        Some(m) if !m.trim().is_empty() => format!("Notification sent to project manager: {m}"),
        _ => "Notification not sent: no project manager assigned to this project.".to_string(),
    };
    log::info!("{}: {}", req.name, note);
    req.messages.push(note);
    db.requisitions.push(req);
    Ok(id)
}

pub fn requisition_mut(db: &mut Database, id: u64) -> Result<&mut Requisition> {
    db.requisitions
        .iter_mut()
        .find(|r| r.id == id)
        .ok_or_else(|| AppError::not_found("requisition", id))
}

pub fn requisition(db: &Database, id: u64) -> Result<&Requisition> {
    db.requisitions
        .iter()
        .find(|r| r.id == id)
        .ok_or_else(|| AppError::not_found("requisition", id))
}

/// Add a line. Its work sub type must belong to the requisition's work type.
pub fn add_line(
    db: &mut Database,
    req: u64,
    product: &str,
    quantity: u32,
    cost: f64,
    vendor: Option<String>,
    work_sub_type: Option<u64>,
) -> Result<u64> {
    let work_type = requisition(db, req)?.work_type;
    if let Some(sub) = work_sub_type {
        if !allowed_sub_types(db, work_type).contains(&sub) {
            return Err(AppError::rejected(format!(
                "work sub type {sub} is not allowed for this requisition's work type"
            )));
        }
    }
    let r = requisition_mut(db, req)?;
    let id = next_id(&r.lines, |l| l.id);
    r.lines.push(RequisitionLine {
        id,
        product: product.trim().to_string(),
        work_sub_type,
        quantity,
        received_qty: 0,
        receiving_notes: None,
        cost,
        vendor: vendor.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()),
    });
    Ok(id)
}

/// Create one request for quotation per vendor from the requisition's lines.
///
/// Lines without a vendor are ignored. A single resulting order moves the
/// requisition to in-progress.
pub fn create_rfqs(db: &mut Database, req: u64) -> Result<Vec<u64>> {
    let r = requisition(db, req)?;
    let mut by_vendor: BTreeMap<&str, Vec<&RequisitionLine>> = BTreeMap::new();
    for line in &r.lines {
        if let Some(vendor) = line.vendor.as_deref() {
            by_vendor.entry(vendor).or_default().push(line);
        }
    }
    if by_vendor.is_empty() {
        return Err(AppError::rejected("No valid lines with vendor found to create RFQ."));
    }

    let now = Utc::now().timestamp();
    let mut next = next_id(&db.purchase_orders, |p| p.id);
    let orders: Vec<PurchaseOrder> = by_vendor
        .into_iter()
        .map(|(vendor, lines)| {
            let po = PurchaseOrder {
                id: next,
                vendor: vendor.to_string(),
                origin: r.name.clone(),
                requisition: r.id,
                project: r.project,
                lines: lines
                    .iter()
                    .map(|l| OrderLine {
                        product: l.product.clone(),
                        quantity: l.quantity,
                        price_unit: l.cost,
                    })
                    .collect(),
                created_at_utc: now,
            };
            next += 1;
            po
        })
        .collect();

    let ids: Vec<u64> = orders.iter().map(|o| o.id).collect();
    db.purchase_orders.extend(orders);
    let r = requisition_mut(db, req)?;
    r.purchase_orders.extend(&ids);
    if ids.len() == 1 {
        r.transition(RequisitionState::InProgress);
    }
    log::info!("{}: created {} RFQ(s)", r.name, ids.len());
    Ok(ids)
}
