//! Production planning entry points.
//!
//! [`plan`] runs the whole pipeline for one request: eligibility, model
//! building, solving and extraction. Solver outcomes come back inside the
//! plan's status; only malformed input is an `Err`.

use tracing::{debug, info, warn};

use crate::config::PlannerConfig;
use crate::eligibility::eligible_items;
use crate::error::ConfigError;
use crate::extract::extract_plan;
use crate::model::ModelBuilder;
use crate::models::{
    Catalog, ObjectiveMode, PlanStatus, PlayerContext, ProductionPlan, SolverFailure,
};
use crate::solver::{solve, SolveLimits, SolveStatus};

/// Plans with the default [`PlannerConfig`]: whole runs, no time limit.
///
/// # Example
///
/// ```
/// use yieldplan::models::{Catalog, Item, ObjectiveMode, PlayerContext};
/// use yieldplan::optimizer::plan;
///
/// let catalog = Catalog::new(vec![
///     Item::new("Wheat", "Field").unlock_at(1).rewards(1.0, 0.0),
///     Item::new("Bread", "Oven").unlock_at(1).takes(15.0).needs("Wheat", 3.0).rewards(10.0, 0.0),
/// ]).unwrap();
///
/// let result = plan(&catalog, &PlayerContext::new(1, 30.0), ObjectiveMode::Xp).unwrap();
/// assert!(result.is_optimal());
/// assert_eq!(result.quantity("Bread"), 2.0);
/// assert_eq!(result.total_xp, 20.0);
/// ```
pub fn plan(
    catalog: &Catalog,
    ctx: &PlayerContext,
    objective: ObjectiveMode,
) -> Result<ProductionPlan, ConfigError> {
    plan_with(catalog, ctx, objective, &PlannerConfig::default())
}

/// Plans one request.
///
/// # Returns
///
/// A plan whose status is `Optimal`, `Infeasible` or `SolverError`.
/// An empty eligible set is `Infeasible`; a zero time budget is an empty
/// `Optimal` plan. Neither reaches the solver.
///
/// # Errors
///
/// Returns a [`ConfigError`] when the context does not fit the catalog.
pub fn plan_with(
    catalog: &Catalog,
    ctx: &PlayerContext,
    objective: ObjectiveMode,
    config: &PlannerConfig,
) -> Result<ProductionPlan, ConfigError> {
    ctx.validate(catalog)?;
    info!(
        event = "plan_start",
        level = ctx.level,
        time_budget = ctx.time_budget,
        objective = %objective,
    );

    let unlocked = eligible_items(catalog, ctx.level);
    if unlocked.is_empty() {
        info!(event = "plan_end", status = "INFEASIBLE", reason = "no unlocked items");
        return Ok(ProductionPlan::empty(
            PlanStatus::Infeasible,
            objective,
            ctx.time_budget,
        ));
    }
    if ctx.time_budget == 0.0 {
        info!(event = "plan_end", status = "OPTIMAL", reason = "zero time budget");
        return Ok(ProductionPlan::empty(PlanStatus::Optimal, objective, 0.0));
    }

    let eligible = if config.fit_window {
        unlocked.fitting_window(ctx.time_budget)
    } else {
        unlocked
    };
    debug!(eligible = eligible.len(), of = catalog.len(), "eligibility filter applied");

    let limits = SolveLimits {
        time_limit: config.time_limit(),
    };

    let model = ModelBuilder::new(catalog, &eligible, ctx, objective)
        .with_config(config)
        .build();
    let mut outcome = solve(&model.program, &limits);

    let result = if outcome.status == SolveStatus::Unbounded {
        warn!("model unbounded, rebuilding with every balance pinned");
        let pinned = ModelBuilder::new(catalog, &eligible, ctx, objective)
            .with_config(config)
            .pin_all_balances()
            .build();
        outcome = solve(&pinned.program, &limits);
        if outcome.status == SolveStatus::Unbounded {
            ProductionPlan::empty(
                PlanStatus::SolverError(SolverFailure::Degenerate),
                objective,
                ctx.time_budget,
            )
        } else {
            extract_plan(&pinned, &outcome)
        }
    } else {
        extract_plan(&model, &outcome)
    };

    info!(
        event = "plan_end",
        status = %result.status,
        objective_value = result.objective_value(),
        lines = result.lines.len(),
    );
    Ok(result)
}
