#![deny(warnings)]

//! Headless CLI: load a project plan, price it under a rate card, and print
//! totals, warnings and the derived resource plan.
//!
//! Edits go through the debounced autosave and a periodic save runs while
//! the report is produced; the final save flushes whatever is pending.

use anyhow::{bail, Context, Result};
use budget_core::migrate::{migrate_record, ProjectRecord};
use budget_core::staff::{find_staff, StaffMember};
use budget_runtime::{Planner, PlannerConfig};
use persistence::{JsonFileStore, ProjectRepository};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct Args {
    project: Option<PathBuf>,
    id: Option<String>,
    rates: Option<PathBuf>,
    rate_card: Option<String>,
    config: Option<PathBuf>,
    store: Option<PathBuf>,
    staff: Option<PathBuf>,
}

fn parse_args() -> Args {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--project" => args.project = it.next().map(PathBuf::from),
            "--id" => args.id = it.next(),
            "--rates" => args.rates = it.next().map(PathBuf::from),
            "--rate-card" => args.rate_card = it.next(),
            "--config" => args.config = it.next().map(PathBuf::from),
            "--store" => args.store = it.next().map(PathBuf::from),
            "--staff" => args.staff = it.next().map(PathBuf::from),
            other => warn!(arg = other, "ignoring unknown argument"),
        }
    }
    args
}

fn load_staff(path: Option<&PathBuf>) -> Result<Vec<StaffMember>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading staff directory {}", path.display()))?;
    Ok(serde_json::from_str(&text)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    let args = parse_args();
    let mut cfg = match &args.config {
        Some(path) => PlannerConfig::load(path)?,
        None => PlannerConfig::default(),
    };
    if args.rates.is_some() {
        cfg.rate_table = args.rates.clone();
    }
    if let Some(dir) = &args.store {
        cfg.store_dir = dir.clone();
    }
    info!(?cfg, "starting CLI");

    let rates = cfg.load_rate_table()?;
    let repo = Arc::new(ProjectRepository::new(JsonFileStore::open(&cfg.store_dir)?));
    let planner = match (&args.project, &args.id) {
        (Some(path), _) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading project {}", path.display()))?;
            let record: ProjectRecord = serde_json::from_str(&text)?;
            let (project, report) = migrate_record(record);
            if !report.is_noop() {
                info!(?report, "migrated legacy names");
            }
            Planner::new(project, rates, repo)
        }
        (None, Some(id)) => Planner::open(repo, rates, id)?,
        (None, None) => bail!("pass --project <file.json> or --id <project id>"),
    }
    .with_autosave(cfg.debounce());
    let periodic = planner
        .scheduler()
        .map(|saver| saver.spawn_periodic(cfg.save_interval()));
    match &args.rate_card {
        Some(card) => planner.set_rate_card(card)?,
        None => planner.reprice(),
    }

    let project = planner.project();
    let totals = planner.totals();
    println!(
        "Project {} | {} | card: {} | active phases: {}",
        project.id,
        project.name,
        project.rate_card,
        project.phases.len()
    );
    for phase in &totals.phases {
        println!(
            "  {:<22} {:>5} | hours: {} | labor: ${} | production: ${} | total: ${}",
            phase.phase.as_str(),
            if phase.active { "on" } else { "off" },
            phase.total.hours,
            phase.labor.dollars,
            phase.production_costs,
            phase.displayed_dollars
        );
    }
    println!(
        "Fee | creative: ${} | design: ${} | total: ${}",
        totals.fee.creative_fee.round_dp(2),
        totals.fee.design_fee.round_dp(2),
        totals.fee.total().round_dp(2)
    );
    println!(
        "Grand | hours: {} | dollars: ${}",
        totals.grand_hours,
        totals.grand_total.round_dp(2)
    );
    for summary in planner.department_summaries() {
        println!(
            "  {:<16} hours: {} | ${}",
            summary.department.as_str(),
            summary.totals.hours,
            summary.totals.dollars
        );
    }

    for warning in planner.warnings() {
        println!("warning: {warning}");
    }

    let staff = load_staff(args.staff.as_ref())?;
    let plan = planner.resource_plan()?;
    for (kind, departments) in &plan.phases {
        println!("Resources | {kind}");
        for dept in departments {
            for a in &dept.assignments {
                let title = find_staff(&staff, &a.assigned_to)
                    .map(|m| m.job_title.as_str())
                    .unwrap_or("");
                println!(
                    "  {} / {} | {} {} | {}w {}h ${} | {} -> {}",
                    dept.department,
                    a.role,
                    a.assigned_name,
                    title,
                    a.total_weeks,
                    a.total_hours,
                    a.total_dollars,
                    a.start_date.map(|d| d.to_string()).unwrap_or_default(),
                    a.end_date.map(|d| d.to_string()).unwrap_or_default()
                );
            }
        }
    }

    planner.save()?;
    if let Some(task) = periodic {
        task.abort();
    }
    info!(store = %cfg.store_dir.display(), "plan saved");
    Ok(())
}
