#![deny(warnings)]

//! Core domain model for staffing-plan budgets.
//!
//! A project is a tree `Project -> Phase -> Stage -> Department -> Role`.
//! Roles carry the leaf cost inputs (weeks, allocation, rate); everything
//! above them is an aggregate computed by [`costing`].

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

pub mod costing;
pub mod migrate;
pub mod staff;

/// Working hours in one full-time week.
pub const HOURS_PER_WEEK: u32 = 40;

/// Longest stage time box, in weeks.
pub const MAX_STAGE_WEEKS: u32 = 52;

/// Validation errors for domain invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Allocation outside the discrete set {10,20,40,60,80,100}.
    #[error("allocation {0}% is not one of 10/20/40/60/80/100")]
    InvalidAllocation(u8),
    /// Phase name that is neither canonical nor a known legacy alias.
    #[error("unknown phase name: {0}")]
    UnknownPhase(String),
}

/// Share of a working week a role is staffed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Allocation {
    P10,
    P20,
    P40,
    P60,
    P80,
    #[default]
    P100,
}

impl Allocation {
    /// Every selectable allocation, smallest first.
    pub const ALL: [Allocation; 6] = [
        Allocation::P10,
        Allocation::P20,
        Allocation::P40,
        Allocation::P60,
        Allocation::P80,
        Allocation::P100,
    ];

    /// Allocation as an integer percentage.
    pub fn percent(self) -> u8 {
        match self {
            Allocation::P10 => 10,
            Allocation::P20 => 20,
            Allocation::P40 => 40,
            Allocation::P60 => 60,
            Allocation::P80 => 80,
            Allocation::P100 => 100,
        }
    }
}

impl TryFrom<u8> for Allocation {
    type Error = ValidationError;

    fn try_from(pct: u8) -> Result<Self, Self::Error> {
        Allocation::ALL
            .into_iter()
            .find(|a| a.percent() == pct)
            .ok_or(ValidationError::InvalidAllocation(pct))
    }
}

impl From<Allocation> for u8 {
    fn from(a: Allocation) -> Self {
        a.percent()
    }
}

/// The three billing buckets of a project, in display order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PhaseKind {
    Planning,
    Production,
    PostProduction,
}

impl PhaseKind {
    pub const ALL: [PhaseKind; 3] = [
        PhaseKind::Planning,
        PhaseKind::Production,
        PhaseKind::PostProduction,
    ];

    /// Canonical display name, also used as the persisted key.
    pub fn as_str(self) -> &'static str {
        match self {
            PhaseKind::Planning => "Planning",
            PhaseKind::Production => "Production/Execution",
            PhaseKind::PostProduction => "Post Production/Wrap",
        }
    }
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts canonical names only; legacy spellings go through [`migrate`].
impl TryFrom<String> for PhaseKind {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        PhaseKind::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or(ValidationError::UnknownPhase(s))
    }
}

impl From<PhaseKind> for String {
    fn from(p: PhaseKind) -> Self {
        p.as_str().to_string()
    }
}

/// Department identity. Names outside the catalog are kept verbatim in
/// `Other` so that nothing is lost on load.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DepartmentKind {
    Account,
    Strategy,
    Creative,
    Design,
    Copy,
    Production,
    PostProduction,
    Technology,
    Social,
    Media,
    Other(String),
}

impl DepartmentKind {
    /// The fixed department catalog.
    pub const CATALOG: [DepartmentKind; 10] = [
        DepartmentKind::Account,
        DepartmentKind::Strategy,
        DepartmentKind::Creative,
        DepartmentKind::Design,
        DepartmentKind::Copy,
        DepartmentKind::Production,
        DepartmentKind::PostProduction,
        DepartmentKind::Technology,
        DepartmentKind::Social,
        DepartmentKind::Media,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            DepartmentKind::Account => "Account",
            DepartmentKind::Strategy => "Strategy",
            DepartmentKind::Creative => "Creative",
            DepartmentKind::Design => "Design",
            DepartmentKind::Copy => "Copy",
            DepartmentKind::Production => "Production",
            DepartmentKind::PostProduction => "Post Production",
            DepartmentKind::Technology => "Technology",
            DepartmentKind::Social => "Social",
            DepartmentKind::Media => "Media",
            DepartmentKind::Other(name) => name,
        }
    }

    pub fn is_catalog(&self) -> bool {
        !matches!(self, DepartmentKind::Other(_))
    }
}

impl fmt::Display for DepartmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for DepartmentKind {
    fn from(s: String) -> Self {
        match DepartmentKind::CATALOG.into_iter().find(|d| d.as_str() == s) {
            Some(known) => known,
            None => DepartmentKind::Other(s),
        }
    }
}

impl From<&str> for DepartmentKind {
    fn from(s: &str) -> Self {
        DepartmentKind::from(s.to_string())
    }
}

impl From<DepartmentKind> for String {
    fn from(d: DepartmentKind) -> Self {
        match d {
            DepartmentKind::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

/// Department-level assignment status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    #[default]
    Unassigned,
    Assigned,
    InProgress,
    Completed,
}

/// Leaf unit of work.
///
/// `hours` and `total_dollars` are derived; call [`Role::recompute`] after
/// changing any input.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    #[serde(default)]
    pub id: String,
    /// Display name, free text or picked from a department catalog.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub weeks: u32,
    #[serde(default)]
    pub allocation: Allocation,
    #[serde(default)]
    pub hours: Decimal,
    /// Resolved hourly rate; zero means "unknown, needs attention".
    #[serde(default)]
    pub rate: Decimal,
    #[serde(default)]
    pub total_dollars: Decimal,
}

/// Named group of roles within one stage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub name: DepartmentKind,
    /// Free-text output descriptor.
    #[serde(default)]
    pub output: String,
    /// Assignee email.
    #[serde(default)]
    pub assigned_to: String,
    #[serde(default)]
    pub assigned_name: String,
    #[serde(default)]
    pub status: AssignmentStatus,
    #[serde(default)]
    pub roles: Vec<Role>,
}

impl Department {
    pub fn new(name: impl Into<DepartmentKind>) -> Self {
        Self {
            name: name.into(),
            output: String::new(),
            assigned_to: String::new(),
            assigned_name: String::new(),
            status: AssignmentStatus::default(),
            roles: Vec::new(),
        }
    }
}

/// A time box inside a phase. `duration` is authoritative for its roles.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Weeks, expected within 1..=52.
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub departments: Vec<Department>,
}

impl Stage {
    pub fn department(&self, name: &DepartmentKind) -> Option<&Department> {
        self.departments.iter().find(|d| &d.name == name)
    }
}

/// Flags gating whether a phase's totals participate in the grand total.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PhaseSettings {
    pub include_project_fees: bool,
    pub include_production_costs: bool,
}

impl Default for PhaseSettings {
    fn default() -> Self {
        Self {
            include_project_fees: true,
            include_production_costs: true,
        }
    }
}

/// Non-labor line item billed within a phase.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductionCost {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub amount: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Phase {
    #[serde(default)]
    pub stages: Vec<Stage>,
    #[serde(default)]
    pub settings: PhaseSettings,
    #[serde(default)]
    pub production_costs: Vec<ProductionCost>,
}

/// Root aggregate: identity, date bounds, rate card and the cost tree.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub client: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub rate_card: String,
    #[serde(default)]
    pub currency: String,
    /// Active phases; data under an inactive phase is kept but not billed.
    #[serde(default)]
    pub phases: Vec<PhaseKind>,
    #[serde(default)]
    pub phase_data: BTreeMap<PhaseKind, Phase>,
}

impl Project {
    pub fn is_active(&self, kind: PhaseKind) -> bool {
        self.phases.contains(&kind)
    }

    /// Phase data for `kind`, active or not.
    pub fn phase(&self, kind: PhaseKind) -> Option<&Phase> {
        self.phase_data.get(&kind)
    }

    /// Phase data for `kind`, only when the phase is active.
    pub fn active_phase(&self, kind: PhaseKind) -> Option<&Phase> {
        if self.is_active(kind) {
            self.phase(kind)
        } else {
            None
        }
    }

    pub fn stage_mut(&mut self, kind: PhaseKind, stage_id: &str) -> Option<&mut Stage> {
        self.phase_data
            .get_mut(&kind)?
            .stages
            .iter_mut()
            .find(|s| s.id == stage_id)
    }

    /// Every role in the tree, in phase/stage/department order.
    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        self.phase_data
            .values()
            .flat_map(|p| &p.stages)
            .flat_map(|s| &s.departments)
            .flat_map(|d| &d.roles)
    }

    pub fn roles_mut(&mut self) -> impl Iterator<Item = &mut Role> {
        self.phase_data
            .values_mut()
            .flat_map(|p| &mut p.stages)
            .flat_map(|s| &mut s.departments)
            .flat_map(|d| &mut d.roles)
    }
}

/// Returns the first non-empty (after trimming) value, if any.
///
/// Department assignment is stored per stage but read phase-wide with this
/// reduction: the earliest stage that has a value wins.
pub fn first_non_empty<'a, I>(values: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    values.into_iter().map(str::trim).find(|v| !v.is_empty())
}
