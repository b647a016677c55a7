//! # yieldplan
//!
//! A command-line tool and library that recommends production plans for
//! farming and crafting games.
//!
//! Given a catalog of producible items (recipe, production time, machine,
//! experience and coin rewards), a player's level, machines, starting stock
//! and a time window, the planner builds a mixed-integer linear program and
//! returns how many of each item to make so that total experience (or total
//! profit) is as large as possible without:
//!
//! - consuming more of an ingredient than is stocked or produced
//! - scheduling more machine time than the machines have in the window
//! - producing anything the player has not unlocked
//!
//! ## Modules
//!
//! - [`models`] - Catalog, player context and plan structures
//! - [`data`] - CSV catalog loading and row validation
//! - [`config`] - Planner settings and TOML request files
//! - [`eligibility`] - Level and time-window filtering
//! - [`model`] - MILP construction
//! - [`solver`] - Stateless solver adapter
//! - [`extract`] - Solver output to production plan
//! - [`optimizer`] - The [`plan`] entry point
//! - [`display`] - Output formatting and CSV export
//!
//! ## Example Usage
//!
//! ```no_run
//! use yieldplan::{
//!     data::load_catalog,
//!     display::{display_plan, DisplayOptions},
//!     models::{ObjectiveMode, PlayerContext},
//!     optimizer::plan,
//! };
//! use std::path::Path;
//!
//! let catalog = load_catalog(Path::new("data/goods.csv")).unwrap();
//!
//! // Level 12, an 8 hour window, two fields and 30 wheat on hand
//! let ctx = PlayerContext::new(12, 8.0 * 60.0)
//!     .with_machines("Field", 2)
//!     .with_stock("Wheat", 30.0);
//!
//! let result = plan(&catalog, &ctx, ObjectiveMode::Xp).unwrap();
//! display_plan(&result, &DisplayOptions::default());
//! ```
//!
//! ## Free inputs
//!
//! Items with a production time of zero are gathered instantly. Their output
//! is pinned to what recipes consume, and they earn no reward themselves.

pub mod config;
pub mod data;
pub mod display;
pub mod eligibility;
pub mod error;
pub mod extract;
pub mod model;
pub mod models;
pub mod optimizer;
pub mod solver;
pub mod wasm;

pub use error::ConfigError;
pub use models::{Catalog, Item, ObjectiveMode, PlanStatus, PlayerContext, ProductionPlan};
pub use optimizer::{plan, plan_with};
