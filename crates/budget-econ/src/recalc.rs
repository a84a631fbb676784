//! Cascading recalculation triggered by edits to shared parameters.
//!
//! Every trigger takes the current tree and returns the next one. All of
//! them are total and idempotent: re-running with the same inputs yields
//! the same tree.

use crate::rates::RateTable;
use budget_core::{Allocation, DepartmentKind, PhaseKind, Project};
use tracing::{debug, info, warn};

/// Reprice every role in every phase under `card`.
///
/// Roles with an empty name price at zero.
pub fn apply_rate_card(project: &Project, rates: &RateTable, card: &str) -> Project {
    let mut next = project.clone();
    next.rate_card = card.to_string();
    let mut repriced = 0usize;
    let mut unresolved = 0usize;
    for role in next.roles_mut() {
        let lookup = rates.lookup(card, &role.name);
        if !lookup.is_resolved() && !role.name.trim().is_empty() {
            unresolved += 1;
        }
        role.recompute(lookup.rate());
        repriced += 1;
    }
    info!(project = %next.id, card, repriced, "rate card applied");
    if unresolved > 0 {
        warn!(project = %next.id, card, unresolved, "roles without a rate on this card");
    }
    next
}

/// Set a stage's duration and rewrite every role in it to that many weeks.
///
/// Shorter per-role durations are overwritten. Rates are kept as they are.
/// An unknown stage leaves the tree unchanged.
pub fn apply_stage_duration(
    project: &Project,
    phase: PhaseKind,
    stage_id: &str,
    duration: u32,
) -> Project {
    let mut next = project.clone();
    let Some(stage) = next.stage_mut(phase, stage_id) else {
        warn!(project = %project.id, %phase, stage_id, "duration change for unknown stage");
        return next;
    };
    stage.duration = duration;
    let mut rewritten = 0usize;
    for role in stage.departments.iter_mut().flat_map(|d| &mut d.roles) {
        role.weeks = duration;
        let rate = role.rate;
        role.recompute(rate);
        rewritten += 1;
    }
    info!(project = %project.id, %phase, stage_id, duration, rewritten, "stage duration cascaded to roles");
    next
}

/// Address of one role in the tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RolePath {
    pub phase: PhaseKind,
    pub stage_id: String,
    pub department: DepartmentKind,
    pub role_id: String,
}

/// Field changes for a single role; `None` leaves a field alone.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoleEdit {
    pub name: Option<String>,
    pub weeks: Option<u32>,
    pub allocation: Option<Allocation>,
}

/// Apply a manual role edit and rederive its numbers.
///
/// A rename re-resolves the rate under the project's rate card.
pub fn edit_role(project: &Project, rates: &RateTable, path: &RolePath, edit: &RoleEdit) -> Project {
    let mut next = project.clone();
    let card = next.rate_card.clone();
    let role = next
        .stage_mut(path.phase, &path.stage_id)
        .and_then(|s| s.departments.iter_mut().find(|d| d.name == path.department))
        .and_then(|d| d.roles.iter_mut().find(|r| r.id == path.role_id));
    let Some(role) = role else {
        warn!(project = %project.id, ?path, "edit for unknown role");
        return next;
    };
    let mut rate = role.rate;
    if let Some(name) = &edit.name {
        if *name != role.name {
            role.name = name.clone();
            rate = rates.resolve_rate(&card, name);
        }
    }
    if let Some(weeks) = edit.weeks {
        role.weeks = weeks;
    }
    if let Some(allocation) = edit.allocation {
        role.allocation = allocation;
    }
    role.recompute(rate);
    debug!(project = %project.id, role = %role.name, hours = %role.hours, dollars = %role.total_dollars, "role edited");
    next
}
