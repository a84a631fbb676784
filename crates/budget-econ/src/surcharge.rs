//! Resourcing fee and project totals.
//!
//! A flat 1.5% fee is charged on the project-wide Creative and Design
//! department totals. It is billed once, attributed to Planning, no matter
//! which phase booked the hours.

use budget_core::costing::{
    department_totals_across_project, phase_labor_total, phase_total, production_costs_total,
    Totals,
};
use budget_core::{DepartmentKind, PhaseKind, Project};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 0.015
pub const RESOURCING_FEE_RATE: Decimal = Decimal::from_parts(15, 0, 0, false, 3);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcingFee {
    pub creative_fee: Decimal,
    pub design_fee: Decimal,
}

impl ResourcingFee {
    pub fn total(&self) -> Decimal {
        self.creative_fee.saturating_add(self.design_fee)
    }

    pub fn is_zero(&self) -> bool {
        self.total().is_zero()
    }
}

fn fee_on(total: Decimal) -> Decimal {
    if total.is_zero() {
        Decimal::ZERO
    } else {
        total * RESOURCING_FEE_RATE
    }
}

/// Fee on the given project-wide Creative and Design totals.
pub fn resourcing_fee(creative: Totals, design: Totals) -> ResourcingFee {
    ResourcingFee {
        creative_fee: fee_on(creative.dollars),
        design_fee: fee_on(design.dollars),
    }
}

pub fn project_resourcing_fee(project: &Project) -> ResourcingFee {
    resourcing_fee(
        department_totals_across_project(project, &DepartmentKind::Creative),
        department_totals_across_project(project, &DepartmentKind::Design),
    )
}

/// Per-phase line of the totals report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseBreakdown {
    pub phase: PhaseKind,
    pub active: bool,
    /// Labor sum regardless of activity or settings.
    pub labor: Totals,
    pub production_costs: Decimal,
    /// Contribution to the grand total.
    pub total: Totals,
    /// `total.dollars` plus the resourcing fee when this is Planning.
    pub displayed_dollars: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectTotals {
    pub phases: Vec<PhaseBreakdown>,
    pub fee: ResourcingFee,
    pub grand_hours: Decimal,
    pub grand_total: Decimal,
}

impl ProjectTotals {
    pub fn phase(&self, kind: PhaseKind) -> Option<&PhaseBreakdown> {
        self.phases.iter().find(|p| p.phase == kind)
    }
}

/// Phase totals, fee and grand total for a project.
///
/// The grand total is the sum of active phase totals plus both fees.
pub fn project_totals(project: &Project) -> ProjectTotals {
    let fee = project_resourcing_fee(project);
    let mut phases = Vec::new();
    let mut grand = Totals::ZERO;
    for (&kind, phase) in &project.phase_data {
        let total = phase_total(project, kind);
        grand += total;
        let mut displayed_dollars = total.dollars;
        if kind == PhaseKind::Planning && !total.dollars.is_zero() {
            displayed_dollars = displayed_dollars.saturating_add(fee.total());
        }
        phases.push(PhaseBreakdown {
            phase: kind,
            active: project.is_active(kind),
            labor: phase_labor_total(phase),
            production_costs: production_costs_total(phase),
            total,
            displayed_dollars,
        });
    }
    ProjectTotals {
        phases,
        fee,
        grand_hours: grand.hours,
        grand_total: grand.dollars.saturating_add(fee.total()),
    }
}
