//! Tests for display and export functionality.

use yieldplan::display::{
    format_duration, sorted_lines, status_guidance, write_plan_csv, DisplayOptions, SortKey,
};
use yieldplan::models::{
    LineRole, ObjectiveMode, PlanLine, PlanStatus, ProductionPlan, SolverFailure,
};

fn line(item: &str, role: LineRole, units: f64, xp_each: f64, time_each: f64) -> PlanLine {
    let xp_each = if role == LineRole::FreeInput { 0.0 } else { xp_each };
    PlanLine {
        item: item.to_string(),
        machine: "Bakery".to_string(),
        role,
        runs: units,
        units,
        xp_each,
        xp_total: xp_each * units,
        profit_each: 0.0,
        profit_total: 0.0,
        time_each,
        time_total: time_each * units,
    }
}

fn sample_plan() -> ProductionPlan {
    let lines = vec![
        line("Bread", LineRole::Final, 2.0, 5.0, 5.0),
        line("Cookie", LineRole::Final, 1.0, 28.0, 60.0),
        line("Egg", LineRole::Intermediate, 4.0, 6.0, 20.0),
        line("Well water", LineRole::FreeInput, 3.0, 0.0, 0.0),
    ];
    ProductionPlan {
        status: PlanStatus::Optimal,
        objective: ObjectiveMode::Xp,
        total_xp: lines.iter().map(|l| l.xp_total).sum(),
        total_profit: 0.0,
        lines,
        machines: vec![],
        time_budget: 120.0,
    }
}

fn names(lines: &[&PlanLine]) -> Vec<String> {
    lines.iter().map(|l| l.item.clone()).collect()
}

#[test]
fn test_format_duration_seconds() {
    assert_eq!(format_duration(0.5), "30s");
    assert_eq!(format_duration(0.0), "0s");
}

#[test]
fn test_format_duration_minutes() {
    assert_eq!(format_duration(1.0), "1m 0s");
    assert_eq!(format_duration(2.5), "2m 30s");
    assert_eq!(format_duration(59.0), "59m 0s");
}

#[test]
fn test_format_duration_hours() {
    assert_eq!(format_duration(60.0), "1h 0m 0s");
    assert_eq!(format_duration(61.5), "1h 1m 30s");
    assert_eq!(format_duration(24.0 * 60.0), "24h 0m 0s");
}

#[test]
fn test_sort_key_parsing() {
    assert_eq!("default".parse::<SortKey>().unwrap(), SortKey::Default);
    assert_eq!("xp-total".parse::<SortKey>().unwrap(), SortKey::XpTotal);
    assert_eq!("time-total".parse::<SortKey>().unwrap(), SortKey::TimeTotal);
    assert!("alphabetical".parse::<SortKey>().is_err());
}

#[test]
fn test_default_order_puts_finals_first() {
    let plan = sample_plan();
    let lines = sorted_lines(&plan, &DisplayOptions::default());
    assert_eq!(names(&lines), vec!["Cookie", "Bread", "Egg", "Well water"]);
}

#[test]
fn test_sort_by_totals() {
    let plan = sample_plan();

    let by_xp = sorted_lines(
        &plan,
        &DisplayOptions {
            sort: SortKey::XpTotal,
            ..DisplayOptions::default()
        },
    );
    assert_eq!(by_xp[0].item, "Cookie");

    let by_time = sorted_lines(
        &plan,
        &DisplayOptions {
            sort: SortKey::TimeTotal,
            ..DisplayOptions::default()
        },
    );
    assert_eq!(by_time[0].item, "Egg");
}

#[test]
fn test_filters() {
    let plan = sample_plan();

    let finals = sorted_lines(
        &plan,
        &DisplayOptions {
            finals_only: true,
            ..DisplayOptions::default()
        },
    );
    assert_eq!(finals.len(), 2);
    assert!(finals.iter().all(|l| l.role == LineRole::Final));

    let no_free = sorted_lines(
        &plan,
        &DisplayOptions {
            hide_free_inputs: true,
            ..DisplayOptions::default()
        },
    );
    assert_eq!(no_free.len(), 3);
    assert!(no_free.iter().all(|l| l.item != "Well water"));
}

#[test]
fn test_csv_export() {
    let plan = sample_plan();
    let lines = sorted_lines(&plan, &DisplayOptions::default());

    let mut buffer = Vec::new();
    write_plan_csv(&lines, &mut buffer).unwrap();
    let text = String::from_utf8(buffer).unwrap();
    let mut rows = text.lines();

    assert_eq!(
        rows.next().unwrap(),
        "item,machine,is_final,runs,qty,xp_each,xp_total,profit_each,profit_total,time_min_each,time_min_total"
    );
    let first = rows.next().unwrap();
    assert!(first.starts_with("Cookie,Bakery,true,"));
    assert_eq!(rows.count(), 3);
}

#[test]
fn test_guidance_distinguishes_failures() {
    assert!(status_guidance(&PlanStatus::Optimal).is_none());

    let infeasible = status_guidance(&PlanStatus::Infeasible).unwrap();
    let timeout = status_guidance(&PlanStatus::SolverError(SolverFailure::Timeout {
        limit_ms: 500,
    }))
    .unwrap();
    let backend = status_guidance(&PlanStatus::SolverError(SolverFailure::Backend(
        "boom".to_string(),
    )))
    .unwrap();

    assert_ne!(infeasible, timeout);
    assert_ne!(infeasible, backend);
    assert!(timeout.contains("500"));
    assert!(backend.contains("boom"));
}

#[test]
fn test_reward_per_hour() {
    let plan = sample_plan();
    let per_hour = plan.reward_per_hour().unwrap();
    assert!((per_hour - plan.total_xp / 2.0).abs() < 1e-9);

    let empty = ProductionPlan::empty(PlanStatus::Optimal, ObjectiveMode::Xp, 0.0);
    assert!(empty.reward_per_hour().is_none());
}
