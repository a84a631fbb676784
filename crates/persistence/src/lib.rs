#![deny(warnings)]

//! Persistence boundary: a key/value store of JSON documents plus a typed
//! repository for project plans and resource plans.
//!
//! Stores are last-write-wins with no merging or locking across processes.
//! Failures surface as a single [`PersistenceError`]; retrying is the
//! caller's concern.

use budget_core::migrate::{migrate_record, MigrationReport, ProjectRecord};
use budget_core::Project;
use resourcing::ResourcePlan;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("io error: {0}")]
    Io(String),
    #[error("invalid document at {key}: {message}")]
    Decode { key: String, message: String },
    #[error("store lock poisoned")]
    Poisoned,
}

impl From<std::io::Error> for PersistenceError {
    fn from(e: std::io::Error) -> Self {
        PersistenceError::Io(e.to_string())
    }
}

/// Opaque key/value store of JSON-like documents.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, PersistenceError>;
    fn set(&self, key: &str, value: Value) -> Result<(), PersistenceError>;
}

/// Process-local store, mostly for tests and the CLI dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, PersistenceError> {
        let docs = self.docs.read().map_err(|_| PersistenceError::Poisoned)?;
        Ok(docs.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), PersistenceError> {
        let mut docs = self.docs.write().map_err(|_| PersistenceError::Poisoned)?;
        docs.insert(key.to_string(), value);
        Ok(())
    }
}

/// One `<key>.json` file per key under a root directory.
///
/// File names keep ASCII letters, digits and `-`; every other byte is
/// written as `_xx` (lowercase hex), so distinct keys never share a file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    /// Opens (and creates if needed) the store directory.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, PersistenceError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", file_stem(key)))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, PersistenceError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)?;
        let value = serde_json::from_str(&text).map_err(|e| PersistenceError::Decode {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(Some(value))
    }

    fn set(&self, key: &str, value: Value) -> Result<(), PersistenceError> {
        let path = self.path_for(key);
        let text = serde_json::to_string_pretty(&value).map_err(|e| PersistenceError::Decode {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        // each writer gets its own temp file; the rename is the commit point
        let mut tmp = NamedTempFile::new_in(&self.root)?;
        tmp.write_all(text.as_bytes())?;
        tmp.persist(&path).map_err(|e| PersistenceError::from(e.error))?;
        debug!(key, path = %path.display(), "document written");
        Ok(())
    }
}

fn file_stem(key: &str) -> String {
    let mut stem = String::with_capacity(key.len());
    for b in key.bytes() {
        if b.is_ascii_alphanumeric() || b == b'-' {
            stem.push(char::from(b));
        } else {
            let _ = write!(stem, "_{b:02x}");
        }
    }
    stem
}

pub fn plan_key(project_id: &str) -> String {
    format!("project:{project_id}:plan")
}

pub fn resources_key(project_id: &str) -> String {
    format!("project:{project_id}:resources")
}

/// Typed access to project documents over any store.
#[derive(Debug)]
pub struct ProjectRepository<S> {
    store: S,
}

impl<S: KeyValueStore> ProjectRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Load and migrate a project. `None` when nothing is stored.
    pub fn load_project(
        &self,
        project_id: &str,
    ) -> Result<Option<(Project, MigrationReport)>, PersistenceError> {
        let key = plan_key(project_id);
        let Some(value) = self.store.get(&key)? else {
            return Ok(None);
        };
        let record: ProjectRecord =
            serde_json::from_value(value).map_err(|e| PersistenceError::Decode {
                key: key.clone(),
                message: e.to_string(),
            })?;
        let (project, report) = migrate_record(record);
        if !report.dropped_phases.is_empty() {
            warn!(project = project_id, dropped = ?report.dropped_phases, "unknown phases dropped on load");
        }
        Ok(Some((project, report)))
    }

    pub fn save_project(&self, project: &Project) -> Result<(), PersistenceError> {
        let key = plan_key(&project.id);
        let value = serde_json::to_value(project).map_err(|e| PersistenceError::Decode {
            key: key.clone(),
            message: e.to_string(),
        })?;
        self.store.set(&key, value)
    }

    /// Stored resource plan. An unreadable document counts as absent so
    /// that derivation can rebuild it.
    pub fn load_resource_plan(
        &self,
        project_id: &str,
    ) -> Result<Option<ResourcePlan>, PersistenceError> {
        let key = resources_key(project_id);
        let Some(value) = self.store.get(&key)? else {
            return Ok(None);
        };
        match serde_json::from_value(value) {
            Ok(plan) => Ok(Some(plan)),
            Err(e) => {
                warn!(key = %key, error = %e, "ignoring malformed resource plan");
                Ok(None)
            }
        }
    }

    pub fn save_resource_plan(&self, plan: &ResourcePlan) -> Result<(), PersistenceError> {
        let key = resources_key(&plan.project_id);
        let value = serde_json::to_value(plan).map_err(|e| PersistenceError::Decode {
            key: key.clone(),
            message: e.to_string(),
        })?;
        self.store.set(&key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use budget_core::{Allocation, Department, Phase, PhaseKind, Role, Stage};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use serde_json::json;
    use std::sync::Arc;
    use std::thread;

    fn sample() -> Project {
        let mut dept = Department::new("Design");
        let mut role = Role::new("r1", "Designer", 2, Allocation::P100);
        role.recompute(Decimal::from(100));
        dept.roles.push(role);
        let mut p = Project {
            id: "p-1".into(),
            name: "Launch".into(),
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1),
            end_date: NaiveDate::from_ymd_opt(2025, 3, 1),
            rate_card: "Standard".into(),
            currency: "USD".into(),
            phases: vec![PhaseKind::Planning],
            ..Project::default()
        };
        p.phase_data.insert(
            PhaseKind::Planning,
            Phase {
                stages: vec![Stage {
                    id: "s1".into(),
                    name: "Discovery".into(),
                    duration: 2,
                    departments: vec![dept],
                }],
                ..Phase::default()
            },
        );
        p
    }

    #[test]
    fn memory_store_is_last_write_wins() {
        let store = MemoryStore::new();
        assert!(store.get("k").unwrap().is_none());
        store.set("k", json!(1)).unwrap();
        store.set("k", json!(2)).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(json!(2)));
    }

    #[test]
    fn project_survives_a_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let repo = ProjectRepository::new(JsonFileStore::open(dir.path()).unwrap());
        let project = sample();
        repo.save_project(&project).unwrap();
        let (loaded, report) = repo.load_project("p-1").unwrap().unwrap();
        assert_eq!(loaded, project);
        assert!(report.is_noop());
        assert!(repo.load_project("missing").unwrap().is_none());
        assert!(dir.path().join("project_3ap-1_3aplan.json").exists());
    }

    #[test]
    fn similar_ids_get_separate_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        store.set(&plan_key("acme.q1"), json!({"id": "acme.q1"})).unwrap();
        store.set(&plan_key("acme_q1"), json!({"id": "acme_q1"})).unwrap();
        store.set(&plan_key("acme q1"), json!({"id": "acme q1"})).unwrap();
        assert_eq!(
            store.get(&plan_key("acme.q1")).unwrap(),
            Some(json!({"id": "acme.q1"}))
        );
        assert_eq!(
            store.get(&plan_key("acme_q1")).unwrap(),
            Some(json!({"id": "acme_q1"}))
        );
        assert_eq!(file_stem("a.b"), "a_2eb");
        assert_eq!(file_stem("a_2eb"), "a_5f2eb");
    }

    #[test]
    fn concurrent_writers_to_one_key_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileStore::open(dir.path()).unwrap());
        let body: Vec<String> = (0..5_000).map(|i| format!("line {i}")).collect();
        let writers: Vec<_> = (0..2)
            .map(|w| {
                let store = Arc::clone(&store);
                let body = body.clone();
                thread::spawn(move || {
                    (0..50)
                        .filter(|round| {
                            store
                                .set(&plan_key("p"), json!({"writer": w, "round": round, "body": body}))
                                .is_err()
                        })
                        .count()
                })
            })
            .collect();
        let failures: usize = writers.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(failures, 0);

        let last = store.get(&plan_key("p")).unwrap().unwrap();
        assert_eq!(last["body"].as_array().map(Vec::len), Some(5_000));
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn document_with_both_date_spellings_loads() {
        let store = MemoryStore::new();
        store
            .set(
                &plan_key("p"),
                json!({
                    "id": "p",
                    "startDate": "2025-01-01",
                    "inMarketDate": "2025-01-01",
                    "projectCompletionDate": "2025-02-01",
                    "phases": ["Planning", "Production/Execution"],
                    "phaseData": {
                        "Planning": null,
                        "Production/Execution": {"stages": [{"id": "s1", "duration": 1}]}
                    }
                }),
            )
            .unwrap();
        let repo = ProjectRepository::new(store);
        let (project, report) = repo.load_project("p").unwrap().unwrap();
        assert_eq!(project.start_date, NaiveDate::from_ymd_opt(2025, 1, 1));
        assert_eq!(project.end_date, NaiveDate::from_ymd_opt(2025, 2, 1));
        assert_eq!(project.phase_data[&PhaseKind::Production].stages.len(), 1);
        assert!(report.malformed_phases.is_empty());
    }

    #[test]
    fn legacy_documents_are_migrated_on_load() {
        let store = MemoryStore::new();
        store
            .set(
                &plan_key("old"),
                json!({
                    "id": "old",
                    "inMarketDate": "2024-05-01",
                    "phases": ["planning"],
                    "phaseData": {"planning": {"stages": []}, "misc": {}}
                }),
            )
            .unwrap();
        let repo = ProjectRepository::new(store);
        let (project, report) = repo.load_project("old").unwrap().unwrap();
        assert_eq!(project.phases, vec![PhaseKind::Planning]);
        assert_eq!(project.start_date, NaiveDate::from_ymd_opt(2024, 5, 1));
        assert_eq!(report.dropped_phases, vec!["misc".to_string()]);
    }

    #[test]
    fn undecodable_project_is_an_error() {
        let store = MemoryStore::new();
        store.set(&plan_key("bad"), json!({"id": 7})).unwrap();
        let repo = ProjectRepository::new(store);
        assert!(matches!(
            repo.load_project("bad"),
            Err(PersistenceError::Decode { .. })
        ));
    }

    #[test]
    fn resource_plan_roundtrip_and_malformed_is_absent() {
        let repo = ProjectRepository::new(MemoryStore::new());
        let plan = resourcing::derive_resource_assignments(&sample(), None);
        repo.save_resource_plan(&plan).unwrap();
        assert_eq!(repo.load_resource_plan("p-1").unwrap(), Some(plan));

        repo.store()
            .set(&resources_key("p-2"), json!({"phases": 3}))
            .unwrap();
        assert_eq!(repo.load_resource_plan("p-2").unwrap(), None);
    }
}
