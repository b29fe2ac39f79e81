//! Dry-run mod planner
//!
//! Discovers and resolves the mods in a directory without loading anything,
//! then prints the load order and every recorded problem.
//!
//! Usage:
//!   mod-plan [--config <file>] [--mods-dir <dir>] [--json]

use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

use mod_loader::config::LoaderConfig;
use mod_loader::mods::{ModHandler, PackageKind, Problem};
use mod_loader::utils::init_logging_from_config;

#[derive(Parser, Debug)]
#[command(name = "mod-plan", about = "Print the load plan for a mods directory")]
struct Args {
    /// Loader configuration file (TOML or JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Mods directory, overriding the configuration
    #[arg(long)]
    mods_dir: Option<PathBuf>,

    /// Print the plan as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct PlannedMod {
    id: String,
    version: String,
    kind: PackageKind,
    source: PathBuf,
}

#[derive(Serialize)]
struct Plan {
    load_order: Vec<PlannedMod>,
    excluded: Vec<String>,
    rejected: Vec<String>,
    problems: Vec<Problem>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

/// Returns whether the plan is free of problems
fn run(args: Args) -> anyhow::Result<bool> {
    let mut config = match &args.config {
        Some(path) => LoaderConfig::from_file(path)?,
        None => LoaderConfig::default(),
    };
    if let Some(dir) = args.mods_dir {
        config.mods_dir = dir;
    }
    init_logging_from_config(config.logging.as_ref());
    info!("Planning mods in {:?}", config.mods_dir);

    let mut handler = ModHandler::new(config);
    handler.discover_mods()?;
    handler.check_dependencies()?;

    let plan = build_plan(&mut handler)?;
    let clean = plan.problems.is_empty();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print_plan(&plan);
    }
    Ok(clean)
}

fn build_plan(handler: &mut ModHandler) -> anyhow::Result<Plan> {
    let order = handler
        .load_order()
        .ok_or_else(|| anyhow::anyhow!("dependencies were not resolved"))?;

    let mut load_order = Vec::with_capacity(order.len());
    for id in order.ids() {
        let entry = handler.registry().get(id)?;
        load_order.push(PlannedMod {
            id: id.clone(),
            version: entry.info().version.to_string(),
            kind: entry.kind(),
            source: entry.source().to_path_buf(),
        });
    }
    let excluded = order.excluded().to_vec();
    let rejected = handler
        .registry()
        .rejected()
        .iter()
        .map(|entry| entry.source().display().to_string())
        .collect();

    Ok(Plan {
        load_order,
        excluded,
        rejected,
        problems: handler.drain_problems(),
    })
}

fn print_plan(plan: &Plan) {
    println!("Load order:");
    if plan.load_order.is_empty() {
        println!("  (nothing to load)");
    }
    for (i, m) in plan.load_order.iter().enumerate() {
        println!(
            "  {:>3}. {} {} [{}] {}",
            i + 1,
            m.id,
            m.version,
            m.kind,
            m.source.display()
        );
    }

    if !plan.excluded.is_empty() {
        println!("Excluded: {}", plan.excluded.join(", "));
    }
    if !plan.rejected.is_empty() {
        println!("Rejected: {}", plan.rejected.join(", "));
    }
    if !plan.problems.is_empty() {
        println!("Problems:");
        for problem in &plan.problems {
            println!("  {}", problem);
        }
    }
}
