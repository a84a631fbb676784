#![deny(warnings)]

//! Runtime around a project plan: the edit session, the shared latest
//! snapshot, and debounced plus periodic saving.

pub mod config;
pub mod planner;
pub mod saver;

pub use config::{ConfigError, PlannerConfig};
pub use planner::{Planner, PlannerError};
pub use saver::{LatestSnapshot, SaveScheduler};
