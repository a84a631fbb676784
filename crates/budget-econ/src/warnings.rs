//! Non-fatal plan checks surfaced to the caller for display.

use crate::rates::RateTable;
use budget_core::{DepartmentKind, PhaseKind, Project, MAX_STAGE_WEEKS};
use serde::Serialize;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanWarning {
    RoleExceedsStage {
        phase: PhaseKind,
        stage_id: String,
        department: DepartmentKind,
        role: String,
        weeks: u32,
        duration: u32,
    },
    StageDurationOutOfRange {
        phase: PhaseKind,
        stage_id: String,
        duration: u32,
    },
    UnresolvedRate {
        phase: PhaseKind,
        stage_id: String,
        role: String,
        rate_card: String,
    },
    DuplicateDepartment {
        phase: PhaseKind,
        stage_id: String,
        department: DepartmentKind,
    },
}

impl fmt::Display for PlanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanWarning::RoleExceedsStage {
                phase,
                stage_id,
                department,
                role,
                weeks,
                duration,
            } => write!(
                f,
                "{phase}/{stage_id}/{department}: {role} runs {weeks}w in a {duration}w stage"
            ),
            PlanWarning::StageDurationOutOfRange {
                phase,
                stage_id,
                duration,
            } => write!(
                f,
                "{phase}/{stage_id}: duration {duration}w outside 1..={MAX_STAGE_WEEKS}"
            ),
            PlanWarning::UnresolvedRate {
                phase,
                stage_id,
                role,
                rate_card,
            } => write!(f, "{phase}/{stage_id}: no {rate_card} rate for {role}"),
            PlanWarning::DuplicateDepartment {
                phase,
                stage_id,
                department,
            } => write!(f, "{phase}/{stage_id}: {department} listed twice"),
        }
    }
}

/// Collect every warning in the tree, in phase/stage order.
pub fn plan_warnings(project: &Project, rates: &RateTable) -> Vec<PlanWarning> {
    let mut out = Vec::new();
    for (&phase, data) in &project.phase_data {
        for stage in &data.stages {
            if !(1..=MAX_STAGE_WEEKS).contains(&stage.duration) {
                out.push(PlanWarning::StageDurationOutOfRange {
                    phase,
                    stage_id: stage.id.clone(),
                    duration: stage.duration,
                });
            }
            for (i, dept) in stage.departments.iter().enumerate() {
                if stage.departments[..i].iter().any(|d| d.name == dept.name) {
                    out.push(PlanWarning::DuplicateDepartment {
                        phase,
                        stage_id: stage.id.clone(),
                        department: dept.name.clone(),
                    });
                }
                for role in &dept.roles {
                    if role.weeks > stage.duration {
                        out.push(PlanWarning::RoleExceedsStage {
                            phase,
                            stage_id: stage.id.clone(),
                            department: dept.name.clone(),
                            role: role.name.clone(),
                            weeks: role.weeks,
                            duration: stage.duration,
                        });
                    }
                    if !role.name.trim().is_empty()
                        && !rates.lookup(&project.rate_card, &role.name).is_resolved()
                    {
                        out.push(PlanWarning::UnresolvedRate {
                            phase,
                            stage_id: stage.id.clone(),
                            role: role.name.clone(),
                            rate_card: project.rate_card.clone(),
                        });
                    }
                }
            }
        }
    }
    out
}
