//! Display and formatting utilities for yieldplan.
//!
//! This module provides functions for formatting plans, printing them to the
//! user in a readable format, and exporting plan tables as CSV.

use std::cmp::Ordering;
use std::io::Write;
use std::str::FromStr;

use serde::Serialize;

use crate::models::{
    LineRole, ObjectiveMode, PlanLine, PlanStatus, ProductionPlan, SolverFailure,
};

/// Formats a duration in minutes to a human-readable string.
///
/// # Arguments
///
/// * `minutes` - Duration in minutes
///
/// # Returns
///
/// A formatted string like "1h 30m 0s", "15m 30s", or "45s"
///
/// # Example
///
/// ```
/// use yieldplan::display::format_duration;
///
/// assert_eq!(format_duration(61.5), "1h 1m 30s");
/// assert_eq!(format_duration(2.5), "2m 30s");
/// assert_eq!(format_duration(0.75), "45s");
/// ```
pub fn format_duration(minutes: f64) -> String {
    let seconds = (minutes * 60.0).round();
    let hours = (seconds / 3600.0).floor();
    let mins = ((seconds % 3600.0) / 60.0).floor();
    let secs = seconds % 60.0;

    if hours > 0.0 {
        format!("{}h {}m {:.0}s", hours, mins, secs)
    } else if mins > 0.0 {
        format!("{}m {:.0}s", mins, secs)
    } else {
        format!("{:.0}s", secs)
    }
}

/// Ordering of the plan table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Final products first, then reward each (desc), then time each (asc)
    #[default]
    Default,
    /// Total experience, highest first
    XpTotal,
    /// Total machine time, longest first
    TimeTotal,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(SortKey::Default),
            "xp-total" => Ok(SortKey::XpTotal),
            "time-total" => Ok(SortKey::TimeTotal),
            other => Err(format!(
                "unknown sort '{}', expected default, xp-total or time-total",
                other
            )),
        }
    }
}

/// What the plan table shows.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisplayOptions {
    pub sort: SortKey,
    /// Show only items no other planned item consumes
    pub finals_only: bool,
    /// Hide zero-time gathered inputs
    pub hide_free_inputs: bool,
}

fn desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Plan lines filtered and ordered per `options`.
pub fn sorted_lines<'a>(plan: &'a ProductionPlan, options: &DisplayOptions) -> Vec<&'a PlanLine> {
    let mut lines: Vec<&PlanLine> = plan
        .lines
        .iter()
        .filter(|l| !options.finals_only || l.role == LineRole::Final)
        .filter(|l| !options.hide_free_inputs || l.role != LineRole::FreeInput)
        .collect();

    let reward_each = |l: &PlanLine| match plan.objective {
        ObjectiveMode::Xp => l.xp_each,
        ObjectiveMode::Profit => l.profit_each,
    };

    match options.sort {
        SortKey::Default => lines.sort_by(|a, b| {
            let a_final = a.role == LineRole::Final;
            let b_final = b.role == LineRole::Final;
            b_final
                .cmp(&a_final)
                .then_with(|| desc(reward_each(a), reward_each(b)))
                .then_with(|| {
                    a.time_each
                        .partial_cmp(&b.time_each)
                        .unwrap_or(Ordering::Equal)
                })
        }),
        SortKey::XpTotal => lines.sort_by(|a, b| desc(a.xp_total, b.xp_total)),
        SortKey::TimeTotal => lines.sort_by(|a, b| desc(a.time_total, b.time_total)),
    }
    lines
}

/// What to tell the user when a plan has no lines.
///
/// An infeasible request is a property of the inputs; a solver error is a
/// failure of the planner. The advice differs.
pub fn status_guidance(status: &PlanStatus) -> Option<String> {
    match status {
        PlanStatus::Optimal => None,
        PlanStatus::Infeasible => Some(
            "No plan is possible with these inputs. Try a higher level, a longer \
             time window, or more starting stock."
                .to_string(),
        ),
        PlanStatus::Unbounded => Some(
            "The model is unbounded, which means a free input is missing a limit. \
             Please report the catalog that triggered this."
                .to_string(),
        ),
        PlanStatus::SolverError(SolverFailure::Timeout { limit_ms }) => Some(format!(
            "Planning did not finish within {} ms. Retry with a larger --time-limit \
             or with --continuous.",
            limit_ms
        )),
        PlanStatus::SolverError(failure) => Some(format!(
            "Planning failed internally ({}). The inputs may be fine; retry or report it.",
            failure
        )),
    }
}

fn role_label(role: LineRole) -> &'static str {
    match role {
        LineRole::Final => "final",
        LineRole::Intermediate => "ingredient",
        LineRole::FreeInput => "gathered",
    }
}

fn format_quantity(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.2}", value)
    }
}

/// Displays the complete planning results to stdout.
///
/// This function prints:
/// - The status, with guidance when no plan was produced
/// - The production table
/// - Summary statistics (rewards, reward per hour)
/// - Machine usage against capacity
pub fn display_plan(plan: &ProductionPlan, options: &DisplayOptions) {
    println!();
    println!("+================================================================+");
    println!("|                 PRODUCTION PLAN RESULTS                        |");
    println!("+================================================================+");
    println!();
    println!("  Status:           {}", plan.status);

    if let Some(guidance) = status_guidance(&plan.status) {
        println!();
        println!("[WARNING] {}", guidance);
        return;
    }

    let lines = sorted_lines(plan, options);
    println!();
    println!("[PLAN]");
    println!("----------------------------------------------------------------");
    if lines.is_empty() {
        println!("  Nothing to produce. Try a longer window or a higher level.");
    } else {
        println!(
            "{:<20} {:>10} {:>8} {:>9} {:>12} {:>12}",
            "Item", "Role", "Units", "XP", "Profit", "Time"
        );
        println!("----------------------------------------------------------------");
        for line in &lines {
            println!(
                "{:<20} {:>10} {:>8} {:>9.0} {:>12.0} {:>12}",
                line.item,
                role_label(line.role),
                format_quantity(line.units),
                line.xp_total,
                line.profit_total,
                format_duration(line.time_total)
            );
        }
    }

    println!();
    println!("[SUMMARY]");
    println!("----------------------------------------------------------------");
    println!("  Objective:        {}", plan.objective);
    println!("  Total XP:         {:.0}", plan.total_xp);
    println!("  Total Profit:     {:.0}", plan.total_profit);
    if let Some(per_hour) = plan.reward_per_hour() {
        println!("  Per Hour:         {:.1} {}", per_hour, plan.objective);
    }
    println!("  Window:           {}", format_duration(plan.time_budget));

    if !plan.machines.is_empty() {
        println!();
        println!("[MACHINES]");
        println!("----------------------------------------------------------------");
        println!(
            "{:<20} {:>6} {:>14} {:>14} {:>6}",
            "Machine", "Units", "Used", "Capacity", "Use%"
        );
        for usage in &plan.machines {
            println!(
                "{:<20} {:>6} {:>14} {:>14} {:>5.0}%",
                usage.machine,
                usage.units,
                format_duration(usage.time_used),
                format_duration(usage.capacity),
                usage.utilization() * 100.0
            );
        }
    }
    println!();
}

#[derive(Serialize)]
struct PlanCsvRow<'a> {
    item: &'a str,
    machine: &'a str,
    is_final: bool,
    runs: f64,
    qty: f64,
    xp_each: f64,
    xp_total: f64,
    profit_each: f64,
    profit_total: f64,
    time_min_each: f64,
    time_min_total: f64,
}

/// Writes plan lines as CSV, one row per line, with a header.
pub fn write_plan_csv<W: Write>(lines: &[&PlanLine], writer: W) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    for line in lines {
        wtr.serialize(PlanCsvRow {
            item: &line.item,
            machine: &line.machine,
            is_final: line.role == LineRole::Final,
            runs: line.runs,
            qty: line.units,
            xp_each: line.xp_each,
            xp_total: line.xp_total,
            profit_each: line.profit_each,
            profit_total: line.profit_total,
            time_min_each: line.time_each,
            time_min_total: line.time_total,
        })?;
    }
    wtr.flush()?;
    Ok(())
}
