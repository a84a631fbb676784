//! One-time load-time migration from persisted records.
//!
//! Stored plans may use legacy phase keys ("planning", "execution", "wrap"),
//! legacy department spellings and the old date field names. Everything is
//! normalized here so the rest of the engine only sees [`PhaseKind`] and
//! catalog [`DepartmentKind`] values.

use crate::{DepartmentKind, Phase, PhaseKind, Project};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Project as persisted, before migration.
///
/// Phase bodies stay raw JSON so one damaged phase cannot sink the whole
/// record; [`migrate_record`] decodes them one at a time.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub client: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Legacy name of `start_date`, used when that is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_market_date: Option<NaiveDate>,
    /// Legacy name of `end_date`, used when that is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_completion_date: Option<NaiveDate>,
    #[serde(default)]
    pub rate_card: String,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub phases: Vec<String>,
    #[serde(default)]
    pub phase_data: BTreeMap<String, Value>,
}

/// What the migration changed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// `(from, to)` phase key renames.
    pub renamed_phases: Vec<(String, PhaseKind)>,
    /// `(from, to)` department renames.
    pub renamed_departments: Vec<(String, DepartmentKind)>,
    /// Phase keys that map to no known phase; their data is dropped.
    pub dropped_phases: Vec<String>,
    /// `(key, decode error)` for phase bodies that could not be read; each
    /// is replaced by an empty phase.
    pub malformed_phases: Vec<(String, String)>,
}

impl MigrationReport {
    pub fn is_noop(&self) -> bool {
        self.renamed_phases.is_empty()
            && self.renamed_departments.is_empty()
            && self.dropped_phases.is_empty()
            && self.malformed_phases.is_empty()
    }
}

/// Map a canonical or legacy phase name to its phase.
pub fn normalize_phase(name: &str) -> Option<PhaseKind> {
    let key = name.trim().to_lowercase();
    match key.as_str() {
        "planning" | "pre-production" | "preproduction" | "pre production" => {
            Some(PhaseKind::Planning)
        }
        "production" | "execution" | "production/execution" => Some(PhaseKind::Production),
        "post production" | "postproduction" | "post-production" | "wrap"
        | "post production/wrap" => Some(PhaseKind::PostProduction),
        _ => None,
    }
}

/// Map legacy department spellings onto the catalog.
///
/// Names that match nothing stay as `Other` with their original text.
pub fn normalize_department(name: &DepartmentKind) -> DepartmentKind {
    let DepartmentKind::Other(raw) = name else {
        return name.clone();
    };
    let key = raw.trim().to_lowercase();
    let key = key.strip_suffix(" team").unwrap_or(&key);
    let key = key.strip_suffix(" department").unwrap_or(key);
    let found = match key {
        "account" | "accounts" | "account management" | "client services" => {
            Some(DepartmentKind::Account)
        }
        "strategy" | "planning" => Some(DepartmentKind::Strategy),
        "creative" => Some(DepartmentKind::Creative),
        "design" => Some(DepartmentKind::Design),
        "copy" | "copywriting" => Some(DepartmentKind::Copy),
        "production" => Some(DepartmentKind::Production),
        "post production" | "post-production" | "postproduction" | "post" => {
            Some(DepartmentKind::PostProduction)
        }
        "technology" | "tech" | "development" => Some(DepartmentKind::Technology),
        "social" | "social media" => Some(DepartmentKind::Social),
        "media" => Some(DepartmentKind::Media),
        _ => None,
    };
    found.unwrap_or_else(|| name.clone())
}

/// Migrate a persisted record into a [`Project`].
///
/// Never fails: unknown phase keys are dropped and reported, a `null` phase
/// body counts as an empty phase and an unreadable one is replaced by an
/// empty phase and reported. When two
/// legacy keys land on the same phase their stages are concatenated in key
/// order and the first key's settings win.
pub fn migrate_record(record: ProjectRecord) -> (Project, MigrationReport) {
    let mut report = MigrationReport::default();

    let mut phases: Vec<PhaseKind> = Vec::new();
    for name in &record.phases {
        match normalize_phase(name) {
            Some(kind) => {
                if kind.as_str() != name {
                    report.renamed_phases.push((name.clone(), kind));
                }
                if !phases.contains(&kind) {
                    phases.push(kind);
                }
            }
            None => report.dropped_phases.push(name.clone()),
        }
    }

    let mut phase_data: BTreeMap<PhaseKind, Phase> = BTreeMap::new();
    for (key, body) in record.phase_data {
        let Some(kind) = normalize_phase(&key) else {
            warn!(project = %record.id, phase = %key, "dropping unknown phase key");
            report.dropped_phases.push(key);
            continue;
        };
        let mut phase = match body {
            Value::Null => Phase::default(),
            body => match serde_json::from_value::<Phase>(body) {
                Ok(phase) => phase,
                Err(e) => {
                    warn!(project = %record.id, phase = %key, error = %e, "unreadable phase data treated as empty");
                    report.malformed_phases.push((key.clone(), e.to_string()));
                    Phase::default()
                }
            },
        };
        if kind.as_str() != key {
            report.renamed_phases.push((key, kind));
        }
        for dept in phase.stages.iter_mut().flat_map(|s| &mut s.departments) {
            let normalized = normalize_department(&dept.name);
            if normalized != dept.name {
                report
                    .renamed_departments
                    .push((dept.name.to_string(), normalized.clone()));
                dept.name = normalized;
            }
        }
        match phase_data.get_mut(&kind) {
            Some(existing) => {
                existing.stages.append(&mut phase.stages);
                existing.production_costs.append(&mut phase.production_costs);
            }
            None => {
                phase_data.insert(kind, phase);
            }
        }
    }

    if !report.is_noop() {
        debug!(
            project = %record.id,
            renamed_phases = report.renamed_phases.len(),
            renamed_departments = report.renamed_departments.len(),
            dropped = report.dropped_phases.len(),
            malformed = report.malformed_phases.len(),
            "migrated legacy project record"
        );
    }

    let project = Project {
        id: record.id,
        name: record.name,
        client: record.client,
        start_date: record.start_date.or(record.in_market_date),
        end_date: record.end_date.or(record.project_completion_date),
        rate_card: record.rate_card,
        currency: record.currency,
        phases,
        phase_data,
    };
    (project, report)
}

impl From<&Project> for ProjectRecord {
    fn from(p: &Project) -> Self {
        ProjectRecord {
            id: p.id.clone(),
            name: p.name.clone(),
            client: p.client.clone(),
            start_date: p.start_date,
            end_date: p.end_date,
            in_market_date: None,
            project_completion_date: None,
            rate_card: p.rate_card.clone(),
            currency: p.currency.clone(),
            phases: p.phases.iter().map(|k| k.as_str().to_string()).collect(),
            phase_data: p
                .phase_data
                .iter()
                .filter_map(|(k, v)| {
                    let body = serde_json::to_value(v).ok()?;
                    Some((k.as_str().to_string(), body))
                })
                .collect(),
        }
    }
}
