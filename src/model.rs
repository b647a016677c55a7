//! Translation of production rules into a mixed-integer linear program.
//!
//! The program is kept in a small solver-independent form
//! ([`LinearProgram`]) so it can be inspected, tested and shipped to the
//! solver adapter on another thread. Every variable is non-negative.
//!
//! Constraint families:
//!
//! - **Material balance**, one row per ingredient. The rule is a tagged
//!   [`BalanceRule`] chosen from the ingredient's production cost:
//!   timed ingredients are `Bounded` (consumption may not exceed stock plus
//!   production), zero-time ingredients are `Pinned` (their free output plus
//!   a stock draw must equal consumption exactly, less at most one unfinished
//!   batch of surplus).
//! - **Machine capacity**, one row per machine type: production minutes may
//!   not exceed `units * time_budget`.
//! - Bounds and integrality on the run variables.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::config::PlannerConfig;
use crate::eligibility::EligibleSet;
use crate::models::{Catalog, Item, LineRole, ObjectiveMode, PlayerContext};

/// Index of a variable in a [`LinearProgram`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub usize);

/// A non-negative decision variable.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableSpec {
    pub name: String,
    pub upper: Option<f64>,
    pub integer: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    LessOrEqual,
    Equal,
}

/// `sum(coef * var) <relation> rhs`
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub name: String,
    pub terms: Vec<(VarId, f64)>,
    pub relation: Relation,
    pub rhs: f64,
}

impl Row {
    /// Left-hand side evaluated at `values`.
    pub fn activity(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|&(var, coef)| coef * values.get(var.0).copied().unwrap_or(0.0))
            .sum()
    }

    /// Whether `values` satisfy the row within `tolerance`.
    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        let lhs = self.activity(values);
        match self.relation {
            Relation::LessOrEqual => lhs <= self.rhs + tolerance,
            Relation::Equal => (lhs - self.rhs).abs() <= tolerance,
        }
    }
}

/// A maximization program over non-negative variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearProgram {
    pub variables: Vec<VariableSpec>,
    pub objective: Vec<(VarId, f64)>,
    pub rows: Vec<Row>,
}

impl LinearProgram {
    pub fn add_variable(&mut self, spec: VariableSpec) -> VarId {
        self.variables.push(spec);
        VarId(self.variables.len() - 1)
    }

    pub fn add_row(&mut self, row: Row) -> usize {
        self.rows.push(row);
        self.rows.len() - 1
    }

    /// Objective evaluated at `values`.
    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.objective
            .iter()
            .map(|&(var, coef)| coef * values.get(var.0).copied().unwrap_or(0.0))
            .sum()
    }
}

/// How an ingredient's material balance is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceRule {
    /// `consumption <= stock + yield * runs`
    Bounded,
    /// `consumption + waste == draw + yield * runs`, `draw <= stock`,
    /// `waste <= yield - 1`
    Pinned,
}

impl BalanceRule {
    /// Timed ingredients are bounded; free ingredients are pinned.
    pub fn for_ingredient(item: &Item) -> Self {
        if item.production_time > 0.0 {
            BalanceRule::Bounded
        } else {
            BalanceRule::Pinned
        }
    }
}

/// Material balance of one ingredient.
#[derive(Debug, Clone, PartialEq)]
pub struct Balance {
    pub ingredient: String,
    pub rule: BalanceRule,
    /// Run variable of the ingredient, if it can be produced in this plan
    pub producer: Option<(VarId, f64)>,
    /// Stock-draw variable of a pinned ingredient with stock on hand
    pub draw: Option<VarId>,
    /// Surplus of the last batch of a pinned ingredient yielding more than one unit
    pub waste: Option<VarId>,
    pub stock: f64,
    /// Run variables of the recipes consuming the ingredient, with quantity per run
    pub consumers: Vec<(VarId, f64)>,
    pub row: usize,
}

impl Balance {
    /// Units consumed at `values`.
    pub fn consumption(&self, values: &[f64]) -> f64 {
        self.consumers
            .iter()
            .map(|&(var, qty)| qty * values[var.0])
            .sum()
    }

    /// Units produced at `values`.
    pub fn production(&self, values: &[f64]) -> f64 {
        self.producer
            .map(|(var, units)| units * values[var.0])
            .unwrap_or(0.0)
    }
}

/// Capacity of one machine type.
#[derive(Debug, Clone, PartialEq)]
pub struct Capacity {
    pub machine: String,
    pub units: u32,
    /// `units * time_budget` minutes
    pub minutes: f64,
    /// Timed items on this machine, with minutes per run
    pub usage: Vec<(VarId, f64)>,
    /// Row index; `None` when only free items use the machine
    pub row: Option<usize>,
}

/// An eligible item and its run variable.
#[derive(Debug, Clone)]
pub struct ModelItem<'a> {
    pub item: &'a Item,
    pub var: VarId,
    pub role: LineRole,
}

/// The built program plus the bookkeeping needed to read a solution back.
#[derive(Debug, Clone)]
pub struct ProductionModel<'a> {
    pub program: LinearProgram,
    pub objective: ObjectiveMode,
    pub time_budget: f64,
    pub integer: bool,
    items: Vec<ModelItem<'a>>,
    balances: Vec<Balance>,
    capacities: Vec<Capacity>,
}

impl<'a> ProductionModel<'a> {
    pub fn items(&self) -> &[ModelItem<'a>] {
        &self.items
    }

    pub fn balances(&self) -> &[Balance] {
        &self.balances
    }

    pub fn capacities(&self) -> &[Capacity] {
        &self.capacities
    }

    pub fn balance(&self, ingredient: &str) -> Option<&Balance> {
        self.balances.iter().find(|b| b.ingredient == ingredient)
    }

    pub fn capacity(&self, machine: &str) -> Option<&Capacity> {
        self.capacities.iter().find(|c| c.machine == machine)
    }

    pub fn var_of(&self, item: &str) -> Option<VarId> {
        self.items
            .iter()
            .find(|m| m.item.name == item)
            .map(|m| m.var)
    }
}

fn var_name(prefix: &str, name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{}{}", prefix, cleaned)
}

/// Builds a [`ProductionModel`] from the eligible items and the player context.
///
/// # Example
///
/// ```
/// use yieldplan::eligibility::eligible_items;
/// use yieldplan::model::{BalanceRule, ModelBuilder};
/// use yieldplan::models::{Catalog, Item, ObjectiveMode, PlayerContext};
///
/// let catalog = Catalog::new(vec![
///     Item::new("Wheat", "Field").unlock_at(1).rewards(1.0, 0.0),
///     Item::new("Bread", "Oven").unlock_at(1).takes(15.0).needs("Wheat", 3.0).rewards(10.0, 0.0),
/// ]).unwrap();
/// let ctx = PlayerContext::new(1, 30.0);
/// let eligible = eligible_items(&catalog, ctx.level);
///
/// let model = ModelBuilder::new(&catalog, &eligible, &ctx, ObjectiveMode::Xp).build();
/// assert_eq!(model.balance("Wheat").unwrap().rule, BalanceRule::Pinned);
/// assert_eq!(model.capacity("Oven").unwrap().minutes, 30.0);
/// ```
pub struct ModelBuilder<'a> {
    catalog: &'a Catalog,
    eligible: &'a EligibleSet<'a>,
    ctx: &'a PlayerContext,
    objective: ObjectiveMode,
    integer: bool,
    free_run_cap: Option<u32>,
    pin_all: bool,
}

impl<'a> ModelBuilder<'a> {
    pub fn new(
        catalog: &'a Catalog,
        eligible: &'a EligibleSet<'a>,
        ctx: &'a PlayerContext,
        objective: ObjectiveMode,
    ) -> Self {
        Self {
            catalog,
            eligible,
            ctx,
            objective,
            integer: true,
            free_run_cap: None,
            pin_all: false,
        }
    }

    /// Applies integrality and the free-run cap from `config`.
    pub fn with_config(mut self, config: &PlannerConfig) -> Self {
        self.integer = config.integer;
        self.free_run_cap = config.free_run_cap;
        self
    }

    /// Writes every balance row in the pinned form, whatever the
    /// ingredient's production cost.
    pub fn pin_all_balances(mut self) -> Self {
        self.pin_all = true;
        self
    }

    pub fn build(self) -> ProductionModel<'a> {
        let mut program = LinearProgram::default();
        let finals = self.eligible.finals();

        // Run variables and objective
        let mut items = Vec::with_capacity(self.eligible.len());
        for &item in self.eligible.items() {
            let units = self.ctx.machine_units(&item.machine);
            // A free item still needs at least one unit of its machine.
            let upper = if !item.is_free() {
                None
            } else if units == 0 {
                Some(0.0)
            } else {
                self.free_run_cap.map(|cap| cap as f64 * units as f64)
            };
            let var = program.add_variable(VariableSpec {
                name: var_name("run_", &item.name),
                upper,
                integer: self.integer,
            });

            // Free inputs earn nothing; their output only feeds recipes.
            if !item.is_free() {
                let coef = item.reward(self.objective) * item.batch_yield as f64;
                if coef != 0.0 {
                    program.objective.push((var, coef));
                }
            }

            let role = if item.is_free() {
                LineRole::FreeInput
            } else if finals.contains(item.name.as_str()) {
                LineRole::Final
            } else {
                LineRole::Intermediate
            };
            items.push(ModelItem { item, var, role });
        }

        let var_of: BTreeMap<&str, VarId> = items
            .iter()
            .map(|m| (m.item.name.as_str(), m.var))
            .collect();

        // Material balance
        let mut subjects: BTreeSet<&str> = self.eligible.ingredients();
        subjects.extend(
            self.eligible
                .items()
                .iter()
                .filter(|i| i.is_free())
                .map(|i| i.name.as_str()),
        );

        let mut balances = Vec::new();
        for name in subjects {
            let Some(ingredient) = self.catalog.get(name) else {
                continue;
            };
            let rule = if self.pin_all {
                BalanceRule::Pinned
            } else {
                BalanceRule::for_ingredient(ingredient)
            };
            let stock = self.ctx.stock(name);
            let consumers: Vec<(VarId, f64)> = items
                .iter()
                .filter_map(|m| m.item.recipe.get(name).map(|&qty| (m.var, qty)))
                .collect();
            let producer = var_of
                .get(name)
                .map(|&var| (var, ingredient.batch_yield as f64));

            let mut terms = consumers.clone();
            if let Some((var, units)) = producer {
                terms.push((var, -units));
            }

            let (draw, waste, relation, rhs) = match rule {
                BalanceRule::Bounded => (None, None, Relation::LessOrEqual, stock),
                BalanceRule::Pinned => {
                    let draw = (stock > 0.0).then(|| {
                        program.add_variable(VariableSpec {
                            name: var_name("draw_", name),
                            upper: Some(stock),
                            integer: false,
                        })
                    });
                    if let Some(var) = draw {
                        terms.push((var, -1.0));
                    }
                    let waste = producer.filter(|&(_, units)| units > 1.0).map(|(_, units)| {
                        program.add_variable(VariableSpec {
                            name: var_name("waste_", name),
                            upper: Some(units - 1.0),
                            integer: false,
                        })
                    });
                    if let Some(var) = waste {
                        terms.push((var, 1.0));
                    }
                    (draw, waste, Relation::Equal, 0.0)
                }
            };

            if terms.is_empty() {
                continue;
            }
            let row = program.add_row(Row {
                name: var_name("balance_", name),
                terms,
                relation,
                rhs,
            });
            balances.push(Balance {
                ingredient: name.to_string(),
                rule,
                producer,
                draw,
                waste,
                stock,
                consumers,
                row,
            });
        }

        // Machine capacity
        let mut by_machine: BTreeMap<&str, Vec<(VarId, f64)>> = BTreeMap::new();
        for m in &items {
            let usage = by_machine.entry(m.item.machine.as_str()).or_default();
            if !m.item.is_free() {
                usage.push((m.var, m.item.production_time));
            }
        }
        let mut capacities = Vec::with_capacity(by_machine.len());
        for (machine, usage) in by_machine {
            let units = self.ctx.machine_units(machine);
            let minutes = units as f64 * self.ctx.time_budget;
            let row = (!usage.is_empty()).then(|| {
                program.add_row(Row {
                    name: var_name("cap_", machine),
                    terms: usage.clone(),
                    relation: Relation::LessOrEqual,
                    rhs: minutes,
                })
            });
            capacities.push(Capacity {
                machine: machine.to_string(),
                units,
                minutes,
                usage,
                row,
            });
        }

        debug!(
            variables = program.variables.len(),
            rows = program.rows.len(),
            balances = balances.len(),
            machines = capacities.len(),
            pinned_all = self.pin_all,
            "model built"
        );

        ProductionModel {
            program,
            objective: self.objective,
            time_budget: self.ctx.time_budget,
            integer: self.integer,
            items,
            balances,
            capacities,
        }
    }
}
