//! Reading a solver assignment back into a [`ProductionPlan`].

use tracing::warn;

use crate::model::ProductionModel;
use crate::models::{
    LineRole, MachineUsage, PlanLine, PlanStatus, ProductionPlan, SolverFailure,
};
use crate::solver::{SolveOutcome, SolveStatus};

/// Largest distance from a whole number accepted as integral.
const INTEGRALITY_TOLERANCE: f64 = 1e-6;
/// Slack allowed when re-checking constraints on the rounded plan.
const FEASIBILITY_TOLERANCE: f64 = 1e-6;

/// Converts a solve outcome into a plan.
///
/// Only an optimal outcome yields lines; every other status gives an empty
/// plan carrying that status. Never panics on a malformed assignment: an
/// assignment that breaks capacity or balance after rounding is reported as
/// [`SolverFailure::InvalidSolution`].
pub fn extract_plan(model: &ProductionModel<'_>, outcome: &SolveOutcome) -> ProductionPlan {
    let status = match &outcome.status {
        SolveStatus::Optimal => return optimal_plan(model, &outcome.values),
        SolveStatus::Infeasible => PlanStatus::Infeasible,
        SolveStatus::Unbounded => PlanStatus::Unbounded,
        SolveStatus::TimedOut(limit) => PlanStatus::SolverError(SolverFailure::Timeout {
            limit_ms: limit.as_millis() as u64,
        }),
        SolveStatus::Failed(msg) => PlanStatus::SolverError(SolverFailure::Backend(msg.clone())),
    };
    ProductionPlan::empty(status, model.objective, model.time_budget)
}

fn invalid(model: &ProductionModel<'_>, reason: String) -> ProductionPlan {
    warn!(%reason, "discarding solver assignment");
    ProductionPlan::empty(
        PlanStatus::SolverError(SolverFailure::InvalidSolution(reason)),
        model.objective,
        model.time_budget,
    )
}

fn optimal_plan(model: &ProductionModel<'_>, raw: &[f64]) -> ProductionPlan {
    if raw.len() != model.program.variables.len() {
        return invalid(
            model,
            format!(
                "expected {} values, got {}",
                model.program.variables.len(),
                raw.len()
            ),
        );
    }

    let mut values = raw.to_vec();
    for (value, spec) in values.iter_mut().zip(&model.program.variables) {
        if spec.integer {
            let rounded = value.round();
            if (*value - rounded).abs() > INTEGRALITY_TOLERANCE {
                warn!(variable = %spec.name, value = *value, "non-integral value for integer variable");
            }
            *value = rounded;
        }
        if *value < 0.0 {
            if *value < -FEASIBILITY_TOLERANCE {
                warn!(variable = %spec.name, value = *value, "negative value clamped to zero");
            }
            *value = 0.0;
        }
        if let Some(upper) = spec.upper {
            *value = value.min(upper);
        }
    }

    let mut machines = Vec::with_capacity(model.capacities().len());
    for capacity in model.capacities() {
        let time_used = capacity
            .usage
            .iter()
            .fold(0.0, |acc, &(var, minutes)| acc + minutes * values[var.0]);
        if time_used > capacity.minutes + FEASIBILITY_TOLERANCE * capacity.minutes.max(1.0) {
            return invalid(
                model,
                format!(
                    "{} uses {:.3} of {:.3} minutes",
                    capacity.machine, time_used, capacity.minutes
                ),
            );
        }
        machines.push(MachineUsage {
            machine: capacity.machine.clone(),
            units: capacity.units,
            time_used,
            capacity: capacity.minutes,
        });
    }

    for balance in model.balances() {
        let consumed = balance.consumption(&values);
        let available = balance.stock + balance.production(&values);
        if consumed > available + FEASIBILITY_TOLERANCE * available.max(1.0) {
            return invalid(
                model,
                format!(
                    "{} consumed {:.3} but only {:.3} available",
                    balance.ingredient, consumed, available
                ),
            );
        }
    }

    let mut lines = Vec::new();
    for m in model.items() {
        let runs = values[m.var.0];
        if runs <= 0.0 {
            continue;
        }
        let item = m.item;
        let units = runs * item.batch_yield as f64;
        let (xp_each, profit_each) = match m.role {
            LineRole::FreeInput => (0.0, 0.0),
            _ => (item.xp_yield, item.profit_yield),
        };
        lines.push(PlanLine {
            item: item.name.clone(),
            machine: item.machine.clone(),
            role: m.role,
            runs,
            units,
            xp_each,
            xp_total: xp_each * units,
            profit_each,
            profit_total: profit_each * units,
            time_each: item.production_time,
            time_total: item.production_time * runs,
        });
    }

    ProductionPlan {
        status: PlanStatus::Optimal,
        objective: model.objective,
        total_xp: lines.iter().fold(0.0, |acc, l| acc + l.xp_total),
        total_profit: lines.iter().fold(0.0, |acc, l| acc + l.profit_total),
        lines,
        machines,
        time_budget: model.time_budget,
    }
}
