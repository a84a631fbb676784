//! Edit session over one project plan.

use crate::saver::{LatestSnapshot, SaveScheduler};
use budget_core::costing::{department_summaries, DepartmentSummary};
use budget_core::{PhaseKind, Project};
use budget_econ::{
    apply_rate_card, apply_stage_duration, edit_role, plan_warnings, project_totals, PlanWarning,
    ProjectTotals, RateTable, RoleEdit, RolePath,
};
use persistence::{KeyValueStore, PersistenceError, ProjectRepository};
use resourcing::{derive_resource_assignments, ResourcePlan};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("project {0} not found")]
    NotFound(String),
    #[error("unknown rate card {0}")]
    UnknownRateCard(String),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Holds the latest plan, applies edits through the recalculation
/// triggers, and schedules saves after each one when autosave is on.
pub struct Planner<S: KeyValueStore + 'static> {
    rates: RateTable,
    snapshot: LatestSnapshot,
    repo: Arc<ProjectRepository<S>>,
    autosave: Option<SaveScheduler<S>>,
}

impl<S: KeyValueStore + 'static> Planner<S> {
    pub fn new(project: Project, rates: RateTable, repo: Arc<ProjectRepository<S>>) -> Self {
        Self {
            rates,
            snapshot: LatestSnapshot::new(project),
            repo,
            autosave: None,
        }
    }

    /// Load and migrate a stored project.
    pub fn open(
        repo: Arc<ProjectRepository<S>>,
        rates: RateTable,
        project_id: &str,
    ) -> Result<Self, PlannerError> {
        let (project, report) = repo
            .load_project(project_id)?
            .ok_or_else(|| PlannerError::NotFound(project_id.to_string()))?;
        if !report.is_noop() {
            info!(
                project = project_id,
                phases = report.renamed_phases.len(),
                departments = report.renamed_departments.len(),
                "migrated legacy names"
            );
        }
        Ok(Self::new(project, rates, repo))
    }

    /// Schedule a debounced save after every edit. Needs a tokio runtime.
    pub fn with_autosave(mut self, debounce: Duration) -> Self {
        self.autosave = Some(SaveScheduler::new(
            self.snapshot.clone(),
            Arc::clone(&self.repo),
            debounce,
        ));
        self
    }

    pub fn snapshot(&self) -> &LatestSnapshot {
        &self.snapshot
    }

    pub fn scheduler(&self) -> Option<&SaveScheduler<S>> {
        self.autosave.as_ref()
    }

    pub fn rates(&self) -> &RateTable {
        &self.rates
    }

    pub fn project(&self) -> Project {
        self.snapshot.read()
    }

    fn commit<F>(&self, f: F)
    where
        F: FnOnce(&Project) -> Project,
    {
        self.snapshot.update(f);
        if let Some(saver) = &self.autosave {
            saver.request_save();
        }
    }

    /// Switch the project to `card` and reprice every role.
    pub fn set_rate_card(&self, card: &str) -> Result<(), PlannerError> {
        if !self.rates.has_card(card) {
            return Err(PlannerError::UnknownRateCard(card.to_string()));
        }
        self.commit(|p| apply_rate_card(p, &self.rates, card));
        Ok(())
    }

    /// Reprice under the project's current card.
    pub fn reprice(&self) {
        self.commit(|p| apply_rate_card(p, &self.rates, &p.rate_card));
    }

    pub fn set_stage_duration(&self, phase: PhaseKind, stage_id: &str, weeks: u32) {
        self.commit(|p| apply_stage_duration(p, phase, stage_id, weeks));
    }

    pub fn edit_role(&self, path: &RolePath, edit: &RoleEdit) {
        self.commit(|p| edit_role(p, &self.rates, path, edit));
    }

    pub fn totals(&self) -> ProjectTotals {
        project_totals(&self.snapshot.read())
    }

    pub fn warnings(&self) -> Vec<PlanWarning> {
        plan_warnings(&self.snapshot.read(), &self.rates)
    }

    pub fn department_summaries(&self) -> Vec<DepartmentSummary> {
        department_summaries(&self.snapshot.read())
    }

    /// Stored resource plan, or a freshly derived one which is then saved.
    pub fn resource_plan(&self) -> Result<ResourcePlan, PlannerError> {
        let project = self.snapshot.read();
        let existing = self.repo.load_resource_plan(&project.id)?;
        let plan = derive_resource_assignments(&project, existing.as_ref());
        if existing.as_ref() != Some(&plan) {
            self.repo.save_resource_plan(&plan)?;
        }
        Ok(plan)
    }

    /// Write the latest plan now, cancelling any pending debounced save.
    pub fn save(&self) -> Result<(), PlannerError> {
        match &self.autosave {
            Some(saver) => saver.flush()?,
            None => self.repo.save_project(&self.snapshot.read())?,
        }
        Ok(())
    }
}
