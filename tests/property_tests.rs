//! Property tests over small generated catalogs.

use std::collections::BTreeMap;

use proptest::prelude::*;
use proptest::sample::Index;

use yieldplan::config::PlannerConfig;
use yieldplan::eligibility::eligible_items;
use yieldplan::models::{Catalog, Item, ObjectiveMode, PlanStatus, PlayerContext, ProductionPlan};
use yieldplan::optimizer::{plan, plan_with};

const MACHINES: [&str; 3] = ["Field", "Bakery", "Dairy"];
const EPS: f64 = 1e-6;

/// `b >= a` up to solver tolerance.
fn not_less(b: f64, a: f64) -> bool {
    b + EPS * (1.0 + a.abs()) >= a
}

fn with_units(ctx: PlayerContext, catalog: &Catalog, machine: &str, units: u32) -> PlayerContext {
    if catalog.machines().contains(machine) {
        ctx.with_machines(machine, units)
    } else {
        ctx
    }
}

type Row = (u32, usize, u32, u32, u32, Vec<(Index, u32)>);

fn row() -> impl Strategy<Value = Row> {
    (
        prop_oneof![1 => Just(0u32), 5 => 1u32..=30],
        0usize..MACHINES.len(),
        0u32..20,
        1u32..=3,
        1u32..=5,
        prop::collection::vec((any::<Index>(), 1u32..=3), 0..=2),
    )
}

/// Catalogs whose recipes only name earlier items, so they are acyclic.
fn arb_catalog() -> impl Strategy<Value = Catalog> {
    prop::collection::vec(row(), 1..=6).prop_map(|rows| {
        let items = rows
            .into_iter()
            .enumerate()
            .map(|(i, (time, machine, xp, batch, unlock, recipe))| {
                let mut item = Item::new(format!("item{}", i), MACHINES[machine])
                    .unlock_at(unlock)
                    .takes(time as f64)
                    .rewards(xp as f64, (xp * 2) as f64)
                    .yields(batch);
                if i > 0 {
                    for (index, qty) in recipe {
                        item = item.needs(format!("item{}", index.index(i)), qty as f64);
                    }
                }
                item
            })
            .collect::<Vec<_>>();
        Catalog::new(items).unwrap()
    })
}

fn check_plan(
    catalog: &Catalog,
    ctx: &PlayerContext,
    result: &ProductionPlan,
) -> Result<(), TestCaseError> {
    if eligible_items(catalog, ctx.level).is_empty() {
        prop_assert_eq!(&result.status, &PlanStatus::Infeasible);
        prop_assert!(result.lines.is_empty());
        return Ok(());
    }
    prop_assert_eq!(&result.status, &PlanStatus::Optimal);

    for usage in &result.machines {
        prop_assert!(usage.time_used <= usage.capacity + EPS);
    }

    let mut consumed: BTreeMap<&str, f64> = BTreeMap::new();
    for line in &result.lines {
        let item = catalog.get(&line.item).unwrap();
        prop_assert!(item.unlock_level <= ctx.level);
        prop_assert!(line.runs > 0.0);
        for (ingredient, qty) in &item.recipe {
            *consumed.entry(ingredient.as_str()).or_default() += qty * line.runs;
        }
    }
    for (ingredient, used) in consumed {
        prop_assert!(used <= ctx.stock(ingredient) + result.quantity(ingredient) + EPS);
    }
    Ok(())
}

/// Best reward from running a single timed item on its own machine, fed only
/// by raw free inputs gathered on demand. Any optimal plan earns at least this.
fn single_item_bound(catalog: &Catalog, ctx: &PlayerContext, objective: ObjectiveMode) -> f64 {
    let eligible = eligible_items(catalog, ctx.level);
    eligible
        .items()
        .iter()
        .filter(|item| !item.is_free())
        .filter(|item| {
            item.recipe.keys().all(|name| {
                eligible
                    .get(name)
                    .map_or(false, |input| input.is_free() && input.recipe.is_empty())
            })
        })
        .map(|item| {
            let capacity = ctx.machine_units(&item.machine) as f64 * ctx.time_budget;
            let runs = (capacity / item.production_time).floor();
            runs * item.batch_yield as f64 * item.reward(objective)
        })
        .fold(0.0, f64::max)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn plans_respect_constraints(
        catalog in arb_catalog(),
        level in 0u32..=5,
        hours in 0u32..=4,
        units in 1u32..=3,
        stock in 0u32..=10,
    ) {
        let ctx = PlayerContext::new(level, hours as f64 * 60.0)
            .with_stock("item0", stock as f64);
        let ctx = with_units(ctx, &catalog, "Bakery", units);
        let result = plan(&catalog, &ctx, ObjectiveMode::Xp).unwrap();
        check_plan(&catalog, &ctx, &result)?;
    }

    #[test]
    fn longer_window_never_earns_less(
        catalog in arb_catalog(),
        level in 1u32..=5,
        minutes in 0u32..=120,
        extra in 0u32..=120,
    ) {
        let config = PlannerConfig::new().continuous();
        let short = PlayerContext::new(level, minutes as f64);
        let long = PlayerContext::new(level, (minutes + extra) as f64);

        let a = plan_with(&catalog, &short, ObjectiveMode::Xp, &config).unwrap();
        let b = plan_with(&catalog, &long, ObjectiveMode::Xp, &config).unwrap();
        prop_assert!(not_less(b.objective_value(), a.objective_value()));
    }

    #[test]
    fn more_machines_never_earn_less(
        catalog in arb_catalog(),
        level in 1u32..=5,
        units in 1u32..=3,
        extra in 0u32..=2,
    ) {
        let fewer = with_units(PlayerContext::new(level, 60.0), &catalog, "Field", units);
        let more = with_units(PlayerContext::new(level, 60.0), &catalog, "Field", units + extra);

        let a = plan(&catalog, &fewer, ObjectiveMode::Profit).unwrap();
        let b = plan(&catalog, &more, ObjectiveMode::Profit).unwrap();
        prop_assert!(not_less(b.objective_value(), a.objective_value()));
    }

    #[test]
    fn continuous_bounds_integer(
        catalog in arb_catalog(),
        level in 1u32..=5,
        minutes in 1u32..=180,
    ) {
        let ctx = PlayerContext::new(level, minutes as f64);
        let whole = plan(&catalog, &ctx, ObjectiveMode::Xp).unwrap();
        let config = PlannerConfig::new().continuous();
        let relaxed = plan_with(&catalog, &ctx, ObjectiveMode::Xp, &config).unwrap();
        prop_assert!(not_less(relaxed.objective_value(), whole.objective_value()));
    }

    #[test]
    fn beats_any_single_item_plan(
        catalog in arb_catalog(),
        level in 1u32..=5,
        minutes in 1u32..=120,
    ) {
        let ctx = PlayerContext::new(level, minutes as f64);
        for objective in [ObjectiveMode::Xp, ObjectiveMode::Profit] {
            let result = plan(&catalog, &ctx, objective).unwrap();
            let bound = single_item_bound(&catalog, &ctx, objective);
            prop_assert!(
                not_less(result.objective_value(), bound),
                "{} earned {} but a single item earns {}",
                objective,
                result.objective_value(),
                bound
            );
        }
    }
}
