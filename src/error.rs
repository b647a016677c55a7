//! Configuration errors raised before any solve is attempted.
//!
//! Solver outcomes (infeasible, timed out, ...) are not errors: they travel
//! inside [`crate::models::PlanStatus`]. Everything here means the input
//! itself is malformed and planning cannot start.

use thiserror::Error;

/// Malformed catalog, player context or request file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("catalog row {line}: {reason}")]
    InvalidRow { line: u64, reason: String },

    #[error("item name must not be empty")]
    EmptyName,

    #[error("item '{0}' has no machine")]
    MissingMachine(String),

    #[error("item '{0}' appears more than once in the catalog")]
    DuplicateItem(String),

    #[error("item '{item}' has invalid {field}: {value}")]
    InvalidNumber {
        item: String,
        field: &'static str,
        value: f64,
    },

    #[error("item '{0}' must yield at least one unit per run")]
    ZeroYield(String),

    #[error("item '{item}' needs unknown ingredient '{ingredient}'")]
    DanglingIngredient { item: String, ingredient: String },

    #[error("recipe cycle through '{0}'")]
    RecipeCycle(String),

    #[error("initial stock names unknown item '{0}'")]
    UnknownStockItem(String),

    #[error("initial stock of '{item}' is invalid: {quantity}")]
    InvalidStock { item: String, quantity: f64 },

    #[error("machine inventory names unknown machine '{0}'")]
    UnknownMachine(String),

    #[error("time budget must be a finite, non-negative number of minutes, got {0}")]
    InvalidTimeBudget(f64),
}
