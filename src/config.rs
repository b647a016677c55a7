//! Planner settings and TOML request files.
//!
//! A request file describes one planning request without any command-line
//! flags:
//!
//! ```
//! use yieldplan::config::PlanRequest;
//! use yieldplan::models::ObjectiveMode;
//!
//! let request = PlanRequest::from_toml_str(r#"
//!     level = 12
//!     hours = 8.0
//!     objective = "profit"
//!
//!     [stock]
//!     Wheat = 30
//!
//!     [machines]
//!     Field = 6
//!
//!     [planner]
//!     time_limit_ms = 5000
//! "#).unwrap();
//!
//! assert_eq!(request.objective, ObjectiveMode::Profit);
//! assert_eq!(request.planner.time_limit_ms, Some(5000));
//! assert!(request.planner.integer);
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::models::{Catalog, ObjectiveMode, PlayerContext};

/// How the model is built and solved.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Whole runs only. Continuous runs relax the program to an LP.
    pub integer: bool,
    /// Drop items whose single run is longer than the time window.
    pub fit_window: bool,
    /// Upper bound on runs of each zero-time item, per machine unit.
    pub free_run_cap: Option<u32>,
    /// Wall-clock limit for one solve; exceeding it is a solver error.
    pub time_limit_ms: Option<u64>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            integer: true,
            fit_window: false,
            free_run_cap: None,
            time_limit_ms: None,
        }
    }
}

impl PlannerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_ms.map(Duration::from_millis)
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit_ms = Some(limit.as_millis() as u64);
        self
    }

    pub fn continuous(mut self) -> Self {
        self.integer = false;
        self
    }

    pub fn with_fit_window(mut self) -> Self {
        self.fit_window = true;
        self
    }

    pub fn with_free_run_cap(mut self, runs_per_unit: u32) -> Self {
        self.free_run_cap = Some(runs_per_unit);
        self
    }
}

fn default_hours() -> f64 {
    24.0
}

/// One planning request as read from a TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct PlanRequest {
    pub level: u32,
    /// Planning window in hours
    #[serde(default = "default_hours")]
    pub hours: f64,
    #[serde(default)]
    pub objective: ObjectiveMode,
    /// Item -> units on hand
    #[serde(default)]
    pub stock: BTreeMap<String, f64>,
    /// Machine -> units available
    #[serde(default)]
    pub machines: BTreeMap<String, u32>,
    /// Machine -> units of stock given to every item it produces
    #[serde(default)]
    pub seed_stock: BTreeMap<String, f64>,
    #[serde(default)]
    pub planner: PlannerConfig,
}

impl PlanRequest {
    /// Loads a request from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file can't be read or contains invalid TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses a request from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Builds the player context this request describes.
    ///
    /// Explicit `stock` entries win over `seed_stock`.
    pub fn to_context(&self, catalog: &Catalog) -> Result<PlayerContext, ConfigError> {
        if !self.hours.is_finite() || self.hours < 0.0 {
            return Err(ConfigError::InvalidTimeBudget(self.hours * 60.0));
        }
        let mut ctx = PlayerContext::new(self.level, self.hours * 60.0);
        ctx.initial_stock = self.stock.clone();
        ctx.machine_inventory = self.machines.clone();

        let machines = catalog.machines();
        for (machine, &quantity) in &self.seed_stock {
            if !machines.contains(machine.as_str()) {
                return Err(ConfigError::UnknownMachine(machine.clone()));
            }
            ctx.seed_machine_stock(catalog, machine, quantity);
        }
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Item;

    #[test]
    fn minimal_request_uses_defaults() {
        let request = PlanRequest::from_toml_str("level = 3").unwrap();
        assert_eq!(request.hours, 24.0);
        assert_eq!(request.objective, ObjectiveMode::Xp);
        assert_eq!(request.planner, PlannerConfig::default());
    }

    #[test]
    fn seed_stock_does_not_override_explicit_stock() {
        let catalog = Catalog::new(vec![
            Item::new("Wheat", "Field").takes(2.0),
            Item::new("Corn", "Field").takes(5.0),
        ])
        .unwrap();
        let request = PlanRequest::from_toml_str(
            r#"
            level = 1
            hours = 2.0
            [stock]
            Wheat = 5
            [seed_stock]
            Field = 30
            "#,
        )
        .unwrap();

        let ctx = request.to_context(&catalog).unwrap();
        assert_eq!(ctx.time_budget, 120.0);
        assert_eq!(ctx.stock("Wheat"), 5.0);
        assert_eq!(ctx.stock("Corn"), 30.0);
    }

    #[test]
    fn seed_stock_rejects_unknown_machine() {
        let catalog = Catalog::new(vec![Item::new("Wheat", "Field")]).unwrap();
        let request = PlanRequest::from_toml_str("level = 1\n[seed_stock]\nOrchard = 10").unwrap();
        assert!(matches!(
            request.to_context(&catalog),
            Err(ConfigError::UnknownMachine(_))
        ));
    }
}
