//! Role cost math and bottom-up aggregation.
//!
//! Roll-up order is role -> department -> stage -> phase -> project. Phase
//! totals only count toward the project when the phase is active; the
//! resourcing fee is layered on top by the econ crate.

use crate::{Allocation, Department, DepartmentKind, Phase, PhaseKind, Project, Role, Stage, HOURS_PER_WEEK};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Hours and dollars rolled up from roles.
///
/// Addition saturates at `Decimal::MAX`, matching the clamp in
/// [`role_dollars`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub hours: Decimal,
    pub dollars: Decimal,
}

impl Totals {
    pub const ZERO: Totals = Totals {
        hours: Decimal::ZERO,
        dollars: Decimal::ZERO,
    };

    pub fn is_zero(&self) -> bool {
        self.hours.is_zero() && self.dollars.is_zero()
    }
}

impl Add for Totals {
    type Output = Totals;

    fn add(self, rhs: Totals) -> Totals {
        Totals {
            hours: self.hours.saturating_add(rhs.hours),
            dollars: self.dollars.saturating_add(rhs.dollars),
        }
    }
}

impl AddAssign for Totals {
    fn add_assign(&mut self, rhs: Totals) {
        *self = *self + rhs;
    }
}

impl Sum for Totals {
    fn sum<I: Iterator<Item = Totals>>(iter: I) -> Totals {
        iter.fold(Totals::ZERO, Add::add)
    }
}

/// `weeks * 40 * allocation / 100`. Exact for every allocation step.
pub fn role_hours(weeks: u32, allocation: Allocation) -> Decimal {
    let scaled = u64::from(weeks) * u64::from(HOURS_PER_WEEK) * u64::from(allocation.percent());
    Decimal::from(scaled) / Decimal::ONE_HUNDRED
}

/// `round(hours * rate)` to whole currency units, halves rounded up.
/// Saturates at `Decimal::MAX`.
pub fn role_dollars(hours: Decimal, rate: Decimal) -> Decimal {
    hours
        .checked_mul(rate)
        .unwrap_or(Decimal::MAX)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

impl Role {
    pub fn new(id: impl Into<String>, name: impl Into<String>, weeks: u32, allocation: Allocation) -> Self {
        let mut role = Role {
            id: id.into(),
            name: name.into(),
            weeks,
            allocation,
            ..Role::default()
        };
        role.recompute(Decimal::ZERO);
        role
    }

    /// Store `rate` and rederive `hours` and `total_dollars`.
    pub fn recompute(&mut self, rate: Decimal) {
        self.rate = rate;
        self.hours = role_hours(self.weeks, self.allocation);
        self.total_dollars = role_dollars(self.hours, self.rate);
    }

    pub fn totals(&self) -> Totals {
        Totals {
            hours: self.hours,
            dollars: self.total_dollars,
        }
    }
}

pub fn department_total(department: &Department) -> Totals {
    department.roles.iter().map(Role::totals).sum()
}

pub fn stage_total(stage: &Stage) -> Totals {
    stage.departments.iter().map(department_total).sum()
}

/// Sum of every stage in the phase, ignoring settings and activity.
pub fn phase_labor_total(phase: &Phase) -> Totals {
    phase.stages.iter().map(stage_total).sum()
}

pub fn production_costs_total(phase: &Phase) -> Decimal {
    phase
        .production_costs
        .iter()
        .fold(Decimal::ZERO, |acc, c| acc.saturating_add(c.amount))
}

/// What the phase contributes to the project total.
///
/// Zero for inactive phases even when data exists. Phase settings gate the
/// labor and production-cost parts independently.
pub fn phase_total(project: &Project, kind: PhaseKind) -> Totals {
    let Some(phase) = project.active_phase(kind) else {
        return Totals::ZERO;
    };
    let mut total = Totals::ZERO;
    if phase.settings.include_project_fees {
        total += phase_labor_total(phase);
    }
    if phase.settings.include_production_costs {
        total.dollars = total.dollars.saturating_add(production_costs_total(phase));
    }
    total
}

/// Sum of [`phase_total`] over the active phases, before any surcharge.
pub fn active_phases_total(project: &Project) -> Totals {
    PhaseKind::ALL
        .into_iter()
        .map(|kind| phase_total(project, kind))
        .sum()
}

/// One department's totals across every phase and stage of the project.
pub fn department_totals_across_project(project: &Project, name: &DepartmentKind) -> Totals {
    project
        .phase_data
        .values()
        .flat_map(|p| &p.stages)
        .flat_map(|s| &s.departments)
        .filter(|d| &d.name == name)
        .map(department_total)
        .sum()
}

/// Project-wide totals for one department.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DepartmentSummary {
    pub department: DepartmentKind,
    pub totals: Totals,
}

/// Every department that appears in the project, in first-seen order.
pub fn department_summaries(project: &Project) -> Vec<DepartmentSummary> {
    let mut out: Vec<DepartmentSummary> = Vec::new();
    for dept in project
        .phase_data
        .values()
        .flat_map(|p| &p.stages)
        .flat_map(|s| &s.departments)
    {
        let totals = department_total(dept);
        match out.iter_mut().find(|s| s.department == dept.name) {
            Some(summary) => summary.totals += totals,
            None => out.push(DepartmentSummary {
                department: dept.name.clone(),
                totals,
            }),
        }
    }
    out
}
