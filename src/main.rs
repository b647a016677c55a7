//! yieldplan - Command Line Interface
//!
//! This is the main entry point for the production planner.
//! Run with `--help` to see all available options.

use anyhow::{bail, Context};
use clap::Parser;
use std::fs::File;
use std::path::PathBuf;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

use yieldplan::{
    config::{PlanRequest, PlannerConfig},
    data::load_catalog,
    display::{display_plan, sorted_lines, write_plan_csv, DisplayOptions, SortKey},
    models::{ObjectiveMode, PlayerContext},
    optimizer::plan_with,
};

/// Parses a `NAME=VALUE` argument.
fn parse_pair<T>(s: &str) -> Result<(String, T), String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let (name, value) = s
        .rsplit_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", s))?;
    let value = value
        .trim()
        .parse()
        .map_err(|e| format!("invalid value in '{}': {}", s, e))?;
    Ok((name.trim().to_string(), value))
}

/// Command-line arguments for yieldplan.
#[derive(Parser, Debug)]
#[command(name = "yieldplan")]
#[command(author, version, about = "Plan the most rewarding production for a time window", long_about = None)]
struct Args {
    /// Catalog CSV file
    #[arg(long, default_value = "data/goods.csv")]
    catalog: PathBuf,

    /// TOML request file (level, hours, stock, machines, planner settings)
    #[arg(short, long)]
    request: Option<PathBuf>,

    /// Player level (overrides the request file)
    #[arg(short, long)]
    level: Option<u32>,

    /// Planning window in hours (overrides the request file)
    #[arg(short = 'H', long)]
    hours: Option<f64>,

    /// Reward to maximize: xp or profit
    #[arg(short, long)]
    objective: Option<ObjectiveMode>,

    /// Machine units available, as NAME=COUNT (repeatable)
    #[arg(long = "machine", value_parser = parse_pair::<u32>)]
    machines: Vec<(String, u32)>,

    /// Units on hand, as ITEM=QTY (repeatable)
    #[arg(long = "stock", value_parser = parse_pair::<f64>)]
    stock: Vec<(String, f64)>,

    /// Give QTY units of every item made on MACHINE, as MACHINE=QTY (repeatable)
    #[arg(long = "seed-stock", value_parser = parse_pair::<f64>)]
    seed_stock: Vec<(String, f64)>,

    /// Allow fractional runs
    #[arg(long, default_value = "false")]
    continuous: bool,

    /// Ignore items whose single run is longer than the window
    #[arg(long, default_value = "false")]
    fit_window: bool,

    /// Cap runs of each zero-time item per machine unit
    #[arg(long)]
    free_run_cap: Option<u32>,

    /// Give up solving after this many seconds (default 30, 0 for no limit)
    #[arg(long)]
    time_limit: Option<f64>,

    // ========== Output ==========
    /// Table order: default, xp-total or time-total
    #[arg(long, default_value = "default")]
    sort: SortKey,

    /// Show only final products
    #[arg(long, default_value = "false")]
    finals_only: bool,

    /// Hide zero-time gathered inputs
    #[arg(long, default_value = "false")]
    hide_gathered: bool,

    /// Print the plan as JSON instead of a report
    #[arg(long, default_value = "false")]
    json: bool,

    /// Also write the shown plan lines to this CSV file
    #[arg(long)]
    export: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let catalog = load_catalog(&args.catalog)
        .with_context(|| format!("loading catalog {}", args.catalog.display()))?;

    let request = match &args.request {
        Some(path) => Some(
            PlanRequest::load(path)
                .with_context(|| format!("loading request {}", path.display()))?,
        ),
        None => None,
    };

    let mut ctx = match &request {
        Some(r) => r.to_context(&catalog)?,
        None => PlayerContext::new(0, 24.0 * 60.0),
    };
    match (args.level, &request) {
        (Some(level), _) => ctx.level = level,
        (None, Some(_)) => {}
        (None, None) => bail!("a player level is required: pass --level or --request"),
    }
    if let Some(hours) = args.hours {
        ctx.time_budget = hours * 60.0;
    }
    for (machine, units) in &args.machines {
        ctx.machine_inventory.insert(machine.clone(), *units);
    }
    for (item, qty) in &args.stock {
        ctx.initial_stock.insert(item.clone(), *qty);
    }
    let machines = catalog.machines();
    for (machine, qty) in &args.seed_stock {
        if !machines.contains(machine.as_str()) {
            bail!("--seed-stock names unknown machine '{}'", machine);
        }
        ctx.seed_machine_stock(&catalog, machine, *qty);
    }

    let objective = args
        .objective
        .or(request.as_ref().map(|r| r.objective))
        .unwrap_or_default();

    let mut config = request
        .as_ref()
        .map(|r| r.planner.clone())
        .unwrap_or_else(PlannerConfig::new);
    if args.continuous {
        config.integer = false;
    }
    if args.fit_window {
        config.fit_window = true;
    }
    if args.free_run_cap.is_some() {
        config.free_run_cap = args.free_run_cap;
    }
    match args.time_limit {
        Some(secs) if secs > 0.0 => config.time_limit_ms = Some((secs * 1000.0) as u64),
        Some(_) => config.time_limit_ms = None,
        None if config.time_limit_ms.is_none() => config.time_limit_ms = Some(30_000),
        None => {}
    }

    let plan = plan_with(&catalog, &ctx, objective, &config)?;

    let options = DisplayOptions {
        sort: args.sort,
        finals_only: args.finals_only,
        hide_free_inputs: args.hide_gathered,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        println!("yieldplan - Production Planner");
        println!("================================================================");
        println!();
        println!("Configuration:");
        println!("  Catalog:         {} ({} items)", args.catalog.display(), catalog.len());
        println!("  Level:           {}", ctx.level);
        println!("  Window:          {:.2} h", ctx.time_budget / 60.0);
        println!("  Objective:       {}", objective);
        println!(
            "  Mode:            {}",
            if config.integer { "Whole runs" } else { "Fractional runs" }
        );
        display_plan(&plan, &options);
    }

    if let Some(path) = &args.export {
        let file = File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        write_plan_csv(&sorted_lines(&plan, &options), file)?;
        eprintln!("Plan written to {}", path.display());
    }

    Ok(())
}
