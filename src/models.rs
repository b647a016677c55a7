//! Data models and structures for yieldplan.
//!
//! This module contains the catalog of producible items, the per-request
//! player context, and the production plan returned by the planner.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A single producible good.
///
/// Raw goods gathered instantly have a `production_time` of zero and an
/// empty recipe; processed goods name their ingredients in `recipe`.
///
/// # Example
///
/// ```
/// use yieldplan::models::Item;
///
/// let bread = Item::new("Bread", "Oven")
///     .unlock_at(1)
///     .takes(15.0)
///     .needs("Wheat", 3.0)
///     .rewards(10.0, 21.0);
///
/// assert_eq!(bread.recipe.get("Wheat"), Some(&3.0));
/// assert!(!bread.is_free());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Unique item name (e.g., "Bread")
    pub name: String,
    /// Lowest player level at which the item can be produced
    pub unlock_level: u32,
    /// Minutes one run occupies a machine unit
    pub production_time: f64,
    /// Facility type that produces the item (e.g., "Bakery")
    pub machine: String,
    /// Ingredient name -> quantity consumed per run
    pub recipe: BTreeMap<String, f64>,
    /// Experience earned per unit produced
    pub xp_yield: f64,
    /// Coins earned per unit produced
    pub profit_yield: f64,
    /// Units produced by one run
    pub batch_yield: u32,
}

impl Item {
    /// Creates an item unlocked at level 0 with no recipe, no rewards and
    /// instantaneous production.
    pub fn new(name: impl Into<String>, machine: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unlock_level: 0,
            production_time: 0.0,
            machine: machine.into(),
            recipe: BTreeMap::new(),
            xp_yield: 0.0,
            profit_yield: 0.0,
            batch_yield: 1,
        }
    }

    pub fn unlock_at(mut self, level: u32) -> Self {
        self.unlock_level = level;
        self
    }

    pub fn takes(mut self, minutes: f64) -> Self {
        self.production_time = minutes;
        self
    }

    pub fn needs(mut self, ingredient: impl Into<String>, quantity: f64) -> Self {
        self.recipe.insert(ingredient.into(), quantity);
        self
    }

    pub fn rewards(mut self, xp: f64, profit: f64) -> Self {
        self.xp_yield = xp;
        self.profit_yield = profit;
        self
    }

    pub fn yields(mut self, units_per_run: u32) -> Self {
        self.batch_yield = units_per_run;
        self
    }

    /// Whether the item is a free input: production costs no machine time.
    pub fn is_free(&self) -> bool {
        self.production_time == 0.0
    }

    /// Reward per unit under the given objective.
    pub fn reward(&self, mode: ObjectiveMode) -> f64 {
        match mode {
            ObjectiveMode::Xp => self.xp_yield,
            ObjectiveMode::Profit => self.profit_yield,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if self.machine.trim().is_empty() {
            return Err(ConfigError::MissingMachine(self.name.clone()));
        }
        let numbers = [
            ("production_time", self.production_time),
            ("xp_yield", self.xp_yield),
            ("profit_yield", self.profit_yield),
        ];
        for (field, value) in numbers {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidNumber {
                    item: self.name.clone(),
                    field,
                    value,
                });
            }
        }
        if self.batch_yield == 0 {
            return Err(ConfigError::ZeroYield(self.name.clone()));
        }
        for &quantity in self.recipe.values() {
            if !quantity.is_finite() || quantity <= 0.0 {
                return Err(ConfigError::InvalidNumber {
                    item: self.name.clone(),
                    field: "recipe quantity",
                    value: quantity,
                });
            }
        }
        Ok(())
    }
}

/// Immutable set of all producible items, keyed by name.
///
/// Construction validates every item, referential integrity of recipes and
/// the absence of recipe cycles, so a `Catalog` value is always safe to hand
/// to the model builder.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Catalog {
    items: BTreeMap<String, Item>,
}

impl Catalog {
    /// Validates `items` into a catalog.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for invalid numbers, duplicate names,
    /// ingredients that are not in the catalog, or recipe cycles.
    pub fn new(items: impl IntoIterator<Item = Item>) -> Result<Self, ConfigError> {
        let mut map = BTreeMap::new();
        for item in items {
            item.validate()?;
            if map.contains_key(&item.name) {
                return Err(ConfigError::DuplicateItem(item.name));
            }
            map.insert(item.name.clone(), item);
        }

        for item in map.values() {
            for ingredient in item.recipe.keys() {
                if !map.contains_key(ingredient) {
                    return Err(ConfigError::DanglingIngredient {
                        item: item.name.clone(),
                        ingredient: ingredient.clone(),
                    });
                }
            }
        }

        let catalog = Self { items: map };
        catalog.check_acyclic()?;
        Ok(catalog)
    }

    fn check_acyclic(&self) -> Result<(), ConfigError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        fn visit<'a>(
            catalog: &'a Catalog,
            name: &'a str,
            marks: &mut BTreeMap<&'a str, Mark>,
        ) -> Result<(), ConfigError> {
            match marks.get(name) {
                Some(Mark::Done) => return Ok(()),
                Some(Mark::Visiting) => return Err(ConfigError::RecipeCycle(name.to_string())),
                None => {}
            }
            marks.insert(name, Mark::Visiting);
            if let Some(item) = catalog.items.get(name) {
                for ingredient in item.recipe.keys() {
                    visit(catalog, ingredient, marks)?;
                }
            }
            marks.insert(name, Mark::Done);
            Ok(())
        }

        let mut marks = BTreeMap::new();
        for name in self.items.keys() {
            visit(self, name, &mut marks)?;
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Item> {
        self.items.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    /// Items in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// All machine types referenced by the catalog.
    pub fn machines(&self) -> BTreeSet<&str> {
        self.items.values().map(|i| i.machine.as_str()).collect()
    }

    /// Lowest unlock level of any item, if the catalog is non-empty.
    pub fn lowest_unlock_level(&self) -> Option<u32> {
        self.items.values().map(|i| i.unlock_level).min()
    }
}

/// Which reward the planner maximizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectiveMode {
    #[default]
    Xp,
    Profit,
}

impl fmt::Display for ObjectiveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectiveMode::Xp => write!(f, "xp"),
            ObjectiveMode::Profit => write!(f, "profit"),
        }
    }
}

impl FromStr for ObjectiveMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xp" | "experience" => Ok(ObjectiveMode::Xp),
            "profit" | "coins" => Ok(ObjectiveMode::Profit),
            other => Err(format!("unknown objective '{}', expected 'xp' or 'profit'", other)),
        }
    }
}

/// Everything the planner knows about the player for one request.
///
/// Machines missing from `machine_inventory` count as one unit; items missing
/// from `initial_stock` start at zero.
///
/// # Example
///
/// ```
/// use yieldplan::models::PlayerContext;
///
/// let ctx = PlayerContext::new(12, 24.0 * 60.0)
///     .with_stock("Wheat", 30.0)
///     .with_machines("Bakery", 2);
///
/// assert_eq!(ctx.machine_units("Bakery"), 2);
/// assert_eq!(ctx.machine_units("Dairy"), 1);
/// assert_eq!(ctx.stock("Corn"), 0.0);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayerContext {
    /// Current player level
    pub level: u32,
    /// Planning window in minutes
    pub time_budget: f64,
    /// Units on hand before the window starts
    #[serde(default)]
    pub initial_stock: BTreeMap<String, f64>,
    /// Available units per machine type
    #[serde(default)]
    pub machine_inventory: BTreeMap<String, u32>,
}

impl PlayerContext {
    pub fn new(level: u32, time_budget_minutes: f64) -> Self {
        Self {
            level,
            time_budget: time_budget_minutes,
            ..Self::default()
        }
    }

    pub fn with_stock(mut self, item: impl Into<String>, quantity: f64) -> Self {
        self.initial_stock.insert(item.into(), quantity);
        self
    }

    pub fn with_machines(mut self, machine: impl Into<String>, units: u32) -> Self {
        self.machine_inventory.insert(machine.into(), units);
        self
    }

    /// Gives `quantity` units of every item produced on `machine`, unless the
    /// item already has an explicit stock entry.
    pub fn seed_machine_stock(&mut self, catalog: &Catalog, machine: &str, quantity: f64) {
        for item in catalog.iter().filter(|i| i.machine == machine) {
            self.initial_stock
                .entry(item.name.clone())
                .or_insert(quantity);
        }
    }

    pub fn stock(&self, item: &str) -> f64 {
        self.initial_stock.get(item).copied().unwrap_or(0.0)
    }

    pub fn machine_units(&self, machine: &str) -> u32 {
        self.machine_inventory.get(machine).copied().unwrap_or(1)
    }

    /// Checks the context against the catalog it will be planned with.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for a negative or non-finite time budget,
    /// stock of an unknown item, invalid stock quantities, or machines the
    /// catalog never uses.
    pub fn validate(&self, catalog: &Catalog) -> Result<(), ConfigError> {
        if !self.time_budget.is_finite() || self.time_budget < 0.0 {
            return Err(ConfigError::InvalidTimeBudget(self.time_budget));
        }
        for (item, &quantity) in &self.initial_stock {
            if !catalog.contains(item) {
                return Err(ConfigError::UnknownStockItem(item.clone()));
            }
            if !quantity.is_finite() || quantity < 0.0 {
                return Err(ConfigError::InvalidStock {
                    item: item.clone(),
                    quantity,
                });
            }
        }
        let machines = catalog.machines();
        for machine in self.machine_inventory.keys() {
            if !machines.contains(machine.as_str()) {
                return Err(ConfigError::UnknownMachine(machine.clone()));
            }
        }
        Ok(())
    }
}

/// Why a solve produced no usable assignment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverFailure {
    /// The solve exceeded the configured wall-clock limit (milliseconds).
    Timeout { limit_ms: u64 },
    /// The backend reported an error unrelated to the model's feasibility.
    Backend(String),
    /// The model stayed unbounded after every balance row was pinned.
    Degenerate,
    /// The rounded assignment violates a capacity or balance constraint.
    InvalidSolution(String),
}

impl fmt::Display for SolverFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverFailure::Timeout { limit_ms } => write!(f, "solve exceeded {} ms", limit_ms),
            SolverFailure::Backend(msg) => write!(f, "solver backend failed: {}", msg),
            SolverFailure::Degenerate => write!(f, "model is unbounded even with pinned balances"),
            SolverFailure::InvalidSolution(msg) => write!(f, "solver returned an invalid plan: {}", msg),
        }
    }
}

/// Outcome of a planning request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Optimal,
    Infeasible,
    Unbounded,
    SolverError(SolverFailure),
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanStatus::Optimal => write!(f, "OPTIMAL"),
            PlanStatus::Infeasible => write!(f, "INFEASIBLE"),
            PlanStatus::Unbounded => write!(f, "UNBOUNDED"),
            PlanStatus::SolverError(_) => write!(f, "SOLVER_ERROR"),
        }
    }
}

/// Where a planned item sits in the production flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineRole {
    /// Not an ingredient of any other eligible item.
    Final,
    /// Consumed by at least one other eligible item.
    Intermediate,
    /// Zero production time; output only feeds recipes and earns nothing.
    FreeInput,
}

/// One item in a production plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanLine {
    pub item: String,
    pub machine: String,
    pub role: LineRole,
    /// Machine runs scheduled
    pub runs: f64,
    /// Units produced (`runs * batch_yield`)
    pub units: f64,
    pub xp_each: f64,
    pub xp_total: f64,
    pub profit_each: f64,
    pub profit_total: f64,
    /// Minutes per run
    pub time_each: f64,
    /// Minutes of machine time used by all runs
    pub time_total: f64,
}

/// Machine time used by a plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MachineUsage {
    pub machine: String,
    pub units: u32,
    /// Minutes of production scheduled on this machine type
    pub time_used: f64,
    /// `units * time_budget`
    pub capacity: f64,
}

impl MachineUsage {
    /// Fraction of capacity in use, 0 when the machine has no capacity.
    pub fn utilization(&self) -> f64 {
        if self.capacity > 0.0 {
            self.time_used / self.capacity
        } else {
            0.0
        }
    }
}

/// The recommended production plan for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductionPlan {
    pub status: PlanStatus,
    pub objective: ObjectiveMode,
    /// Items with a positive quantity, in name order
    pub lines: Vec<PlanLine>,
    pub total_xp: f64,
    pub total_profit: f64,
    /// Machine usage, in machine name order
    pub machines: Vec<MachineUsage>,
    /// Planning window in minutes
    pub time_budget: f64,
}

impl ProductionPlan {
    /// A plan with no lines and zero totals.
    pub fn empty(status: PlanStatus, objective: ObjectiveMode, time_budget: f64) -> Self {
        Self {
            status,
            objective,
            lines: Vec::new(),
            total_xp: 0.0,
            total_profit: 0.0,
            machines: Vec::new(),
            time_budget,
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.status == PlanStatus::Optimal
    }

    /// Units of `item` produced, zero if the item is not in the plan.
    pub fn quantity(&self, item: &str) -> f64 {
        self.lines
            .iter()
            .find(|l| l.item == item)
            .map(|l| l.units)
            .unwrap_or(0.0)
    }

    /// Item name -> units produced.
    pub fn quantities(&self) -> BTreeMap<&str, f64> {
        self.lines.iter().map(|l| (l.item.as_str(), l.units)).collect()
    }

    /// Value of the maximized objective.
    pub fn objective_value(&self) -> f64 {
        match self.objective {
            ObjectiveMode::Xp => self.total_xp,
            ObjectiveMode::Profit => self.total_profit,
        }
    }

    /// Minutes of production scheduled on `machine`.
    pub fn time_consumed(&self, machine: &str) -> f64 {
        self.machines
            .iter()
            .find(|m| m.machine == machine)
            .map(|m| m.time_used)
            .unwrap_or(0.0)
    }

    /// Sum of machine time across all machine types.
    pub fn total_time_used(&self) -> f64 {
        self.machines.iter().map(|m| m.time_used).sum()
    }

    /// Objective reward per hour of the planning window.
    pub fn reward_per_hour(&self) -> Option<f64> {
        if self.time_budget > 0.0 {
            Some(self.objective_value() / (self.time_budget / 60.0))
        } else {
            None
        }
    }
}

// ============================================================================
// CSV Row Structures
// ============================================================================

/// CSV row structure for the item catalog.
#[derive(Debug, Deserialize)]
pub struct CatalogRow {
    /// Item name
    pub name: String,
    /// Player level that unlocks the item
    pub unlock_level: u32,
    /// Minutes per run
    pub production_time: f64,
    /// Producing facility
    pub machine: String,
    /// Ingredients as `name:qty;name:qty` (may be empty)
    #[serde(default)]
    pub recipe: Option<String>,
    /// Experience per unit
    pub xp: f64,
    /// Coins per unit
    pub profit: f64,
    /// Units per run
    #[serde(rename = "yield", default)]
    pub batch_yield: Option<u32>,
}
