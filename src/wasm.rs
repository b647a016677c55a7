//! WebAssembly bindings for yieldplan.
//!
//! This module provides JavaScript-accessible functions over the bundled
//! catalog. Inputs and outputs are JSON strings.

use std::sync::OnceLock;

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::config::PlanRequest;
use crate::data::bundled_catalog;
use crate::display::{format_duration, sorted_lines, status_guidance, DisplayOptions};
use crate::eligibility::eligible_items;
use crate::models::{Catalog, PlanLine, ProductionPlan};
use crate::optimizer::plan_with;

/// JavaScript-friendly planning result.
#[derive(Debug, Clone, Serialize)]
pub struct JsPlanResult {
    pub success: bool,
    pub error: Option<String>,
    pub guidance: Option<String>,
    pub status: String,
    /// Plan lines in display order
    pub lines: Vec<PlanLine>,
    pub plan: Option<ProductionPlan>,
    pub reward_per_hour: Option<f64>,
    pub window_formatted: String,
}

impl JsPlanResult {
    fn failure(error: String) -> Self {
        JsPlanResult {
            success: false,
            error: Some(error),
            guidance: None,
            status: String::new(),
            lines: vec![],
            plan: None,
            reward_per_hour: None,
            window_formatted: "0s".to_string(),
        }
    }
}

fn catalog() -> Result<&'static Catalog, String> {
    static CATALOG: OnceLock<Result<Catalog, String>> = OnceLock::new();
    CATALOG
        .get_or_init(|| bundled_catalog().map_err(|e| e.to_string()))
        .as_ref()
        .map_err(|e| e.clone())
}

#[cfg(target_arch = "wasm32")]
fn report_error(message: &str) {
    web_sys::console::error_1(&JsValue::from_str(message));
}

#[cfg(not(target_arch = "wasm32"))]
fn report_error(message: &str) {
    tracing::error!(%message, "wasm request failed");
}

fn run(input_json: &str) -> JsPlanResult {
    let request: PlanRequest = match serde_json::from_str(input_json) {
        Ok(r) => r,
        Err(e) => return JsPlanResult::failure(format!("Invalid input: {}", e)),
    };
    let catalog = match catalog() {
        Ok(c) => c,
        Err(e) => return JsPlanResult::failure(format!("Bundled catalog is invalid: {}", e)),
    };
    let ctx = match request.to_context(catalog) {
        Ok(c) => c,
        Err(e) => return JsPlanResult::failure(e.to_string()),
    };

    // No worker threads on wasm32: solve without a time limit.
    let mut config = request.planner.clone();
    config.time_limit_ms = None;

    match plan_with(catalog, &ctx, request.objective, &config) {
        Ok(plan) => JsPlanResult {
            success: plan.is_optimal(),
            error: None,
            guidance: status_guidance(&plan.status),
            status: plan.status.to_string(),
            lines: sorted_lines(&plan, &DisplayOptions::default())
                .into_iter()
                .cloned()
                .collect(),
            reward_per_hour: plan.reward_per_hour(),
            window_formatted: format_duration(plan.time_budget),
            plan: Some(plan),
        },
        Err(e) => JsPlanResult::failure(e.to_string()),
    }
}

/// Plans a request against the bundled catalog.
///
/// Takes a JSON request (the same fields as a TOML request file) and returns
/// a JSON [`JsPlanResult`].
#[wasm_bindgen]
pub fn optimize(input_json: &str) -> String {
    let result = run(input_json);
    if let Some(ref error) = result.error {
        report_error(error);
    }
    serde_json::to_string(&result).unwrap_or_default()
}

/// Get the version of the planner.
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Lists the bundled items unlocked at `level` as a JSON array.
#[wasm_bindgen]
pub fn get_available_items(level: u32) -> String {
    #[derive(Serialize)]
    struct ItemInfo<'a> {
        name: &'a str,
        machine: &'a str,
        unlock_level: u32,
        production_time: f64,
    }

    let Ok(catalog) = catalog() else {
        return "[]".to_string();
    };
    let eligible = eligible_items(catalog, level);
    let available: Vec<ItemInfo> = eligible
        .items()
        .iter()
        .map(|item| ItemInfo {
            name: &item.name,
            machine: &item.machine,
            unlock_level: item.unlock_level,
            production_time: item.production_time,
        })
        .collect();

    serde_json::to_string(&available).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optimize_returns_plan_json() {
        let out = optimize(r#"{"level": 5, "hours": 2.0, "objective": "xp"}"#);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["status"], "OPTIMAL");
        assert!(value["plan"]["total_xp"].as_f64().unwrap() > 0.0);
    }

    #[test]
    fn optimize_reports_bad_input() {
        let out = optimize(r#"{"hours": 2.0}"#);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["success"], false);
        assert!(value["error"].as_str().unwrap().starts_with("Invalid input"));
    }

    #[test]
    fn available_items_respect_level() {
        let out = get_available_items(1);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        let names: Vec<&str> = value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v["name"].as_str().unwrap())
            .collect();
        assert!(names.contains(&"Wheat"));
        assert!(!names.contains(&"Cheese"));
    }
}
