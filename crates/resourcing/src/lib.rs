#![deny(warnings)]

//! Resource scheduling derived from the cost tree.
//!
//! Within each active phase the same department usually appears in several
//! stages, often with the same role in each. Derivation folds those
//! occurrences into one [`ResourceAssignment`] per (department, role) and
//! schedules it from the project start, capped at the project end.
//!
//! The derived plan is only a starting point. Once a plan exists for a
//! project it may carry manual edits, so [`derive_resource_assignments`]
//! hands it back untouched instead of recomputing.

use budget_core::{
    first_non_empty, Allocation, DepartmentKind, Phase, PhaseKind, Project, HOURS_PER_WEEK,
};
use chrono::{Days, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// One consolidated role to be staffed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceAssignment {
    pub department: DepartmentKind,
    pub role: String,
    /// Assignee email, inherited from the department.
    #[serde(default)]
    pub assigned_to: String,
    #[serde(default)]
    pub assigned_name: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    pub total_weeks: u32,
    #[serde(default)]
    pub total_hours: Decimal,
    #[serde(default)]
    pub total_dollars: Decimal,
    /// Allocation of the first occurrence of this role.
    #[serde(default)]
    pub allocation: Allocation,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentResources {
    pub department: DepartmentKind,
    #[serde(default)]
    pub assignments: Vec<ResourceAssignment>,
}

/// Phase -> department -> assignments, departments in first-seen order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcePlan {
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub phases: BTreeMap<PhaseKind, Vec<DepartmentResources>>,
}

impl ResourcePlan {
    pub fn is_empty(&self) -> bool {
        self.assignments().next().is_none()
    }

    pub fn assignments(&self) -> impl Iterator<Item = &ResourceAssignment> {
        self.phases
            .values()
            .flatten()
            .flat_map(|d| &d.assignments)
    }

    pub fn find(
        &self,
        phase: PhaseKind,
        department: &DepartmentKind,
        role: &str,
    ) -> Option<&ResourceAssignment> {
        self.phases
            .get(&phase)?
            .iter()
            .find(|d| &d.department == department)?
            .assignments
            .iter()
            .find(|a| a.role == role)
    }
}

/// Department assignee as read phase-wide.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Assignee {
    pub email: String,
    pub name: String,
}

/// First non-empty email and name for `department` across the phase's
/// stages, each chosen independently.
pub fn department_assignee(phase: &Phase, department: &DepartmentKind) -> Assignee {
    let copies: Vec<_> = phase
        .stages
        .iter()
        .filter_map(|s| s.department(department))
        .collect();
    Assignee {
        email: first_non_empty(copies.iter().map(|d| d.assigned_to.as_str()))
            .unwrap_or_default()
            .to_string(),
        name: first_non_empty(copies.iter().map(|d| d.assigned_name.as_str()))
            .unwrap_or_default()
            .to_string(),
    }
}

/// Sums for one (department, role) across a phase.
#[derive(Clone, Debug, PartialEq)]
pub struct ConsolidatedRole {
    pub department: DepartmentKind,
    pub role: String,
    pub weeks: u32,
    pub hours: Decimal,
    pub dollars: Decimal,
    pub allocation: Allocation,
}

impl ConsolidatedRole {
    /// Summed weeks, or whole weeks covering the summed hours when no
    /// occurrence carried weeks.
    pub fn total_weeks(&self) -> u32 {
        if self.weeks > 0 {
            return self.weeks;
        }
        (self.hours / Decimal::from(HOURS_PER_WEEK))
            .ceil()
            .to_u32()
            .unwrap_or(0)
    }
}

/// Group every named role in the phase by (department, role name), in
/// first-seen order.
pub fn consolidate(phase: &Phase) -> Vec<ConsolidatedRole> {
    let mut out: Vec<ConsolidatedRole> = Vec::new();
    for dept in phase.stages.iter().flat_map(|s| &s.departments) {
        for role in &dept.roles {
            let name = role.name.trim();
            if name.is_empty() {
                continue;
            }
            match out
                .iter_mut()
                .find(|c| c.department == dept.name && c.role == name)
            {
                Some(c) => {
                    c.weeks = c.weeks.saturating_add(role.weeks);
                    c.hours = c.hours.saturating_add(role.hours);
                    c.dollars = c.dollars.saturating_add(role.total_dollars);
                }
                None => out.push(ConsolidatedRole {
                    department: dept.name.clone(),
                    role: name.to_string(),
                    weeks: role.weeks,
                    hours: role.hours,
                    dollars: role.total_dollars,
                    allocation: role.allocation,
                }),
            }
        }
    }
    out
}

/// Start at the project start; end `weeks` later, never past `project_end`.
pub fn schedule(
    project_start: Option<NaiveDate>,
    project_end: Option<NaiveDate>,
    weeks: u32,
) -> (Option<NaiveDate>, Option<NaiveDate>) {
    let Some(start) = project_start else {
        return (None, None);
    };
    let end = start.checked_add_days(Days::new(u64::from(weeks) * 7));
    let end = match (end, project_end) {
        (Some(e), Some(cap)) => Some(e.min(cap)),
        (None, cap) => cap,
        (e, None) => e,
    };
    (Some(start), end)
}

fn derive_phase(project: &Project, phase: &Phase) -> Vec<DepartmentResources> {
    let mut departments: Vec<DepartmentResources> = Vec::new();
    for c in consolidate(phase) {
        let total_weeks = c.total_weeks();
        if total_weeks == 0 {
            continue;
        }
        let (start_date, end_date) = schedule(project.start_date, project.end_date, total_weeks);
        let idx = match departments.iter().position(|d| d.department == c.department) {
            Some(i) => i,
            None => {
                departments.push(DepartmentResources {
                    department: c.department.clone(),
                    assignments: Vec::new(),
                });
                departments.len() - 1
            }
        };
        let assignee = department_assignee(phase, &c.department);
        departments[idx].assignments.push(ResourceAssignment {
            department: c.department,
            role: c.role,
            assigned_to: assignee.email,
            assigned_name: assignee.name,
            start_date,
            end_date,
            total_weeks,
            total_hours: c.hours,
            total_dollars: c.dollars,
            allocation: c.allocation,
        });
    }
    departments
}

/// Resource plan for `project`.
///
/// When `existing` is a non-empty plan for this project it is returned
/// as-is. Otherwise each active phase is consolidated; phases with no data
/// yield nothing.
pub fn derive_resource_assignments(
    project: &Project,
    existing: Option<&ResourcePlan>,
) -> ResourcePlan {
    if let Some(plan) = existing {
        let same_project = plan.project_id.is_empty() || plan.project_id == project.id;
        if same_project && !plan.is_empty() {
            info!(project = %project.id, "keeping existing resource plan");
            return plan.clone();
        }
    }

    let mut phases = BTreeMap::new();
    for &kind in &project.phases {
        let Some(phase) = project.phase(kind) else {
            debug!(project = %project.id, phase = %kind, "no data for active phase");
            continue;
        };
        let departments = derive_phase(project, phase);
        if !departments.is_empty() {
            phases.insert(kind, departments);
        }
    }
    let plan = ResourcePlan {
        project_id: project.id.clone(),
        phases,
    };
    info!(
        project = %project.id,
        assignments = plan.assignments().count(),
        "derived resource plan"
    );
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use budget_core::{Department, Role, Stage};
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn priced(id: &str, name: &str, weeks: u32, rate: i64) -> Role {
        let mut r = Role::new(id, name, weeks, Allocation::P100);
        r.recompute(Decimal::from(rate));
        r
    }

    fn stage(id: &str, duration: u32, departments: Vec<Department>) -> Stage {
        Stage {
            id: id.into(),
            name: id.into(),
            duration,
            departments,
        }
    }

    fn design(roles: Vec<Role>) -> Department {
        let mut d = Department::new("Design");
        d.roles = roles;
        d
    }

    fn project(stages: Vec<Stage>) -> Project {
        let mut p = Project {
            id: "p1".into(),
            start_date: Some(date(2025, 1, 1)),
            end_date: Some(date(2025, 6, 30)),
            phases: vec![PhaseKind::Planning],
            ..Project::default()
        };
        p.phase_data.insert(
            PhaseKind::Planning,
            Phase {
                stages,
                ..Phase::default()
            },
        );
        p
    }

    #[test]
    fn designer_across_two_stages_is_consolidated() {
        let p = project(vec![
            stage("s1", 2, vec![design(vec![priced("a", "Designer", 2, 100)])]),
            stage("s2", 3, vec![design(vec![priced("b", "Designer", 3, 100)])]),
        ]);
        let plan = derive_resource_assignments(&p, None);
        let a = plan
            .find(PhaseKind::Planning, &DepartmentKind::Design, "Designer")
            .unwrap();
        assert_eq!(a.total_weeks, 5);
        assert_eq!(a.total_hours, Decimal::from(200));
        assert_eq!(a.total_dollars, Decimal::from(20_000));
        assert_eq!(a.start_date, Some(date(2025, 1, 1)));
        assert_eq!(a.end_date, Some(date(2025, 2, 5)));
        assert_eq!(plan.assignments().count(), 1);
    }

    #[test]
    fn end_date_is_capped_at_project_end() {
        let mut p = project(vec![stage("s1", 5, vec![design(vec![priced("a", "Designer", 5, 100)])])]);
        p.end_date = Some(date(2025, 1, 15));
        let plan = derive_resource_assignments(&p, None);
        let a = plan.assignments().next().unwrap();
        assert_eq!(a.end_date, Some(date(2025, 1, 15)));
    }

    #[test]
    fn existing_plan_is_authoritative() {
        let p = project(vec![stage("s1", 2, vec![design(vec![priced("a", "Designer", 2, 100)])])]);
        let mut edited = derive_resource_assignments(&p, None);
        let a = &mut edited.phases.get_mut(&PhaseKind::Planning).unwrap()[0].assignments[0];
        a.assigned_name = "Jane Doe".into();
        a.end_date = Some(date(2025, 3, 1));

        let again = derive_resource_assignments(&p, Some(&edited));
        assert_eq!(again, edited);
        assert_eq!(derive_resource_assignments(&p, Some(&again)), edited);
    }

    #[test]
    fn empty_or_foreign_plan_is_rederived() {
        let p = project(vec![stage("s1", 2, vec![design(vec![priced("a", "Designer", 2, 100)])])]);
        let empty = ResourcePlan::default();
        assert!(!derive_resource_assignments(&p, Some(&empty)).is_empty());

        let mut foreign = derive_resource_assignments(&p, None);
        foreign.project_id = "other".into();
        foreign.phases.get_mut(&PhaseKind::Planning).unwrap()[0].assignments[0].total_weeks = 99;
        let plan = derive_resource_assignments(&p, Some(&foreign));
        assert_eq!(plan.assignments().next().unwrap().total_weeks, 2);
    }

    #[test]
    fn assignee_comes_from_first_stage_that_has_one() {
        let mut first = design(vec![priced("a", "Designer", 1, 100)]);
        first.assigned_name = "  ".into();
        let mut second = design(vec![priced("b", "Art Director", 1, 100)]);
        second.assigned_name = "Jane Doe".into();
        second.assigned_to = "jane@agency.com".into();
        let mut third = design(vec![]);
        third.assigned_name = "Sam Lee".into();
        let p = project(vec![
            stage("s1", 1, vec![first]),
            stage("s2", 1, vec![second]),
            stage("s3", 1, vec![third]),
        ]);
        let plan = derive_resource_assignments(&p, None);
        for a in plan.assignments() {
            assert_eq!(a.assigned_name, "Jane Doe");
            assert_eq!(a.assigned_to, "jane@agency.com");
        }
        assert_eq!(plan.assignments().count(), 2);
    }

    #[test]
    fn weeks_fall_back_to_hours() {
        let mut r = priced("a", "Editor", 0, 100);
        r.hours = Decimal::from(50);
        r.total_dollars = Decimal::from(5000);
        let p = project(vec![stage("s1", 1, vec![design(vec![r, priced("z", "Intern", 0, 10)])])]);
        let plan = derive_resource_assignments(&p, None);
        let a = plan.assignments().next().unwrap();
        assert_eq!(a.total_weeks, 2);
        // zero-week, zero-hour roles are not emitted
        assert_eq!(plan.assignments().count(), 1);
    }

    #[test]
    fn first_allocation_wins_and_unnamed_roles_are_skipped() {
        let mut later = priced("b", "Designer", 1, 100);
        later.allocation = Allocation::P40;
        later.recompute(later.rate);
        let p = project(vec![
            stage("s1", 1, vec![design(vec![priced("a", "Designer", 1, 100), priced("x", " ", 1, 100)])]),
            stage("s2", 1, vec![design(vec![later])]),
        ]);
        let plan = derive_resource_assignments(&p, None);
        let a = plan.assignments().next().unwrap();
        assert_eq!(a.allocation, Allocation::P100);
        assert_eq!(a.total_hours, Decimal::from(56));
        assert_eq!(plan.assignments().count(), 1);
    }

    #[test]
    fn inactive_and_missing_phases_yield_nothing() {
        let mut p = project(vec![stage("s1", 1, vec![design(vec![priced("a", "Designer", 1, 100)])])]);
        p.phases = vec![PhaseKind::Production];
        let plan = derive_resource_assignments(&p, None);
        assert!(plan.is_empty());
        assert_eq!(plan.project_id, "p1");
    }

    #[test]
    fn missing_start_date_leaves_dates_open() {
        let mut p = project(vec![stage("s1", 1, vec![design(vec![priced("a", "Designer", 1, 100)])])]);
        p.start_date = None;
        let a = derive_resource_assignments(&p, None).assignments().next().cloned().unwrap();
        assert_eq!((a.start_date, a.end_date), (None, None));
        assert_eq!(a.total_weeks, 1);
    }

    #[test]
    fn plan_serializes_with_phase_keys() {
        let p = project(vec![stage("s1", 1, vec![design(vec![priced("a", "Designer", 1, 100)])])]);
        let plan = derive_resource_assignments(&p, None);
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["phases"]["Planning"][0]["department"], "Design");
        let back: ResourcePlan = serde_json::from_value(json).unwrap();
        assert_eq!(back, plan);
    }

    proptest! {
        #[test]
        fn end_never_passes_project_end(weeks in 1u32..=104, span in 0u64..400) {
            let start = date(2025, 1, 1);
            let end = start.checked_add_days(Days::new(span)).unwrap();
            let (s, e) = schedule(Some(start), Some(end), weeks);
            prop_assert_eq!(s, Some(start));
            let e = e.unwrap();
            prop_assert!(e <= end);
            prop_assert!(e <= start.checked_add_days(Days::new(u64::from(weeks) * 7)).unwrap());
        }
    }
}
