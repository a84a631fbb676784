#![deny(warnings)]

//! Pricing rules layered on the cost tree.
//!
//! This crate provides:
//! - Rate resolution by rate card with aliases and a legacy fallback sheet
//! - Cascading recalculation when the rate card or a stage duration changes
//! - The Creative/Design resourcing fee and project totals
//! - Non-fatal plan warnings for display

pub mod rates;
pub mod recalc;
pub mod surcharge;
pub mod warnings;

pub use rates::{RateLookup, RateTable, RateTableError};
pub use recalc::{apply_rate_card, apply_stage_duration, edit_role, RoleEdit, RolePath};
pub use surcharge::{
    project_resourcing_fee, project_totals, resourcing_fee, PhaseBreakdown, ProjectTotals,
    ResourcingFee, RESOURCING_FEE_RATE,
};
pub use warnings::{plan_warnings, PlanWarning};
