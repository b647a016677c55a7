//! Stateless adapter between [`LinearProgram`] and the MILP backend.
//!
//! Each call builds a fresh `good_lp` problem from the program it is given,
//! so no solver configuration survives between requests. When several
//! assignments reach the same optimum, the one returned is whatever the
//! backend's branch-and-bound finds first: plans are optimal, not unique.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use good_lp::{
    constraint, default_solver, variable, Expression, ProblemVariables, ResolutionError,
    Solution, SolverModel,
};
use tracing::{info, warn};

use crate::model::{LinearProgram, Relation};

/// Limits applied to one solve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolveLimits {
    /// Give up waiting after this long. `None` solves on the calling thread.
    pub time_limit: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SolveStatus {
    Optimal,
    Infeasible,
    Unbounded,
    TimedOut(Duration),
    Failed(String),
}

/// Status plus one value per program variable (empty unless optimal).
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutcome {
    pub status: SolveStatus,
    pub values: Vec<f64>,
}

impl SolveOutcome {
    fn without_values(status: SolveStatus) -> Self {
        Self {
            status,
            values: Vec::new(),
        }
    }
}

/// Solves `program` to optimality, honoring `limits`.
///
/// With a time limit the solve runs on a worker thread; if the limit passes
/// first the worker is left to finish on its own and its result is dropped.
pub fn solve(program: &LinearProgram, limits: &SolveLimits) -> SolveOutcome {
    let started = Instant::now();
    info!(
        event = "solve_start",
        variables = program.variables.len(),
        constraints = program.rows.len(),
    );

    let outcome = match limits.time_limit {
        None => solve_guarded(program),
        Some(limit) => solve_on_worker(program.clone(), limit),
    };

    info!(
        event = "solve_end",
        status = ?outcome.status,
        elapsed_ms = started.elapsed().as_millis() as u64,
    );
    outcome
}

fn solve_on_worker(program: LinearProgram, limit: Duration) -> SolveOutcome {
    let (tx, rx) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name("milp-solve".into())
        .spawn(move || {
            let _ = tx.send(solve_guarded(&program));
        });
    if let Err(e) = spawned {
        return SolveOutcome::without_values(SolveStatus::Failed(format!(
            "could not start solver thread: {}",
            e
        )));
    }

    match rx.recv_timeout(limit) {
        Ok(outcome) => outcome,
        Err(mpsc::RecvTimeoutError::Timeout) => {
            warn!(limit_ms = limit.as_millis() as u64, "solve abandoned after time limit");
            SolveOutcome::without_values(SolveStatus::TimedOut(limit))
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => SolveOutcome::without_values(
            SolveStatus::Failed("solver thread exited without a result".to_string()),
        ),
    }
}

fn solve_guarded(program: &LinearProgram) -> SolveOutcome {
    match catch_unwind(AssertUnwindSafe(|| solve_program(program))) {
        Ok(outcome) => outcome,
        Err(_) => SolveOutcome::without_values(SolveStatus::Failed(
            "solver backend panicked".to_string(),
        )),
    }
}

fn solve_program(program: &LinearProgram) -> SolveOutcome {
    let mut vars = ProblemVariables::new();
    let handles: Vec<_> = program
        .variables
        .iter()
        .map(|spec| {
            let mut def = variable().min(0.0).name(spec.name.clone());
            if let Some(upper) = spec.upper {
                def = def.max(upper);
            }
            if spec.integer {
                def = def.integer();
            }
            vars.add(def)
        })
        .collect();

    let objective = program
        .objective
        .iter()
        .fold(Expression::from(0.0), |acc, &(var, coef)| acc + coef * handles[var.0]);

    let mut problem = vars.maximise(objective).using(default_solver);
    for row in &program.rows {
        let lhs = row
            .terms
            .iter()
            .fold(Expression::from(0.0), |acc, &(var, coef)| acc + coef * handles[var.0]);
        let rhs = row.rhs;
        problem = match row.relation {
            Relation::LessOrEqual => problem.with(constraint!(lhs <= rhs)),
            Relation::Equal => problem.with(constraint!(lhs == rhs)),
        };
    }

    match problem.solve() {
        Ok(solution) => SolveOutcome {
            status: SolveStatus::Optimal,
            values: handles.iter().map(|&v| solution.value(v)).collect(),
        },
        Err(ResolutionError::Infeasible) => SolveOutcome::without_values(SolveStatus::Infeasible),
        Err(ResolutionError::Unbounded) => SolveOutcome::without_values(SolveStatus::Unbounded),
        Err(e) => SolveOutcome::without_values(SolveStatus::Failed(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Row, VariableSpec};

    fn int_var(name: &str) -> VariableSpec {
        VariableSpec {
            name: name.to_string(),
            upper: None,
            integer: true,
        }
    }

    #[test]
    fn solves_small_knapsack() {
        // max 3x + 2y  s.t.  2x + y <= 7, x <= 3
        let mut program = LinearProgram::default();
        let x = program.add_variable(VariableSpec {
            upper: Some(3.0),
            ..int_var("x")
        });
        let y = program.add_variable(int_var("y"));
        program.objective = vec![(x, 3.0), (y, 2.0)];
        program.add_row(Row {
            name: "cap".into(),
            terms: vec![(x, 2.0), (y, 1.0)],
            relation: Relation::LessOrEqual,
            rhs: 7.0,
        });

        let outcome = solve(&program, &SolveLimits::default());
        assert_eq!(outcome.status, SolveStatus::Optimal);
        assert!((program.objective_value(&outcome.values) - 14.0).abs() < 1e-6);
    }

    #[test]
    fn reports_unbounded() {
        let mut program = LinearProgram::default();
        let x = program.add_variable(VariableSpec {
            integer: false,
            ..int_var("x")
        });
        program.objective = vec![(x, 1.0)];

        let outcome = solve(&program, &SolveLimits::default());
        assert_eq!(outcome.status, SolveStatus::Unbounded);
        assert!(outcome.values.is_empty());
    }

    #[test]
    fn reports_infeasible() {
        let mut program = LinearProgram::default();
        let x = program.add_variable(VariableSpec {
            upper: Some(1.0),
            ..int_var("x")
        });
        program.add_row(Row {
            name: "need_two".into(),
            terms: vec![(x, 1.0)],
            relation: Relation::Equal,
            rhs: 2.0,
        });

        let outcome = solve(&program, &SolveLimits::default());
        assert_eq!(outcome.status, SolveStatus::Infeasible);
    }

    #[test]
    fn worker_thread_returns_same_result() {
        let mut program = LinearProgram::default();
        let x = program.add_variable(VariableSpec {
            upper: Some(4.0),
            ..int_var("x")
        });
        program.objective = vec![(x, 2.0)];

        let limits = SolveLimits {
            time_limit: Some(Duration::from_secs(30)),
        };
        let outcome = solve(&program, &limits);
        assert_eq!(outcome.status, SolveStatus::Optimal);
        assert!((outcome.values[0] - 4.0).abs() < 1e-6);
    }
}
