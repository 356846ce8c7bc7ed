use num_rational::Rational64;
use tracing::{debug, info, warn};

use crate::branch_bound::BranchAndBound;
use crate::config::{Arithmetic, SolverConfig, Strategy};
use crate::enumerate;
use crate::presolve::{self, Estimate};
use crate::problem::IlpProblem;
use crate::solution::{IntegerSolution, SolveError};
use crate::tolerance::Scalar;

/// Solves one instance with the strategy and arithmetic chosen by `config`.
///
/// Instances share nothing, so independent calls may run on separate threads.
pub fn solve(problem: &IlpProblem, config: &SolverConfig) -> Result<IntegerSolution, SolveError> {
    problem.validate()?;
    let result = match config.arithmetic {
        Arithmetic::Float => solve_with::<f64>(problem, config),
        Arithmetic::Exact => solve_with::<Rational64>(problem, config),
    };
    match &result {
        Ok(solution) => info!(
            objective = solution.objective,
            method = ?solution.method,
            relaxations = solution.stats.relaxations,
            "solved"
        ),
        Err(err) => info!(%err, "no solution"),
    }
    result
}

fn solve_with<T: Scalar>(problem: &IlpProblem, config: &SolverConfig) -> Result<IntegerSolution, SolveError> {
    let cutoff = if config.presolve {
        match presolve::estimate(problem) {
            Some(Estimate::Exact(solution)) => return Ok(solution),
            Some(Estimate::Range { lower, upper }) => {
                debug!(lower, upper, "presolve range");
                Some(upper)
            }
            None => None,
        }
    } else {
        None
    };

    match config.strategy {
        Strategy::BranchAndBound => BranchAndBound::new(problem, config).with_cutoff(cutoff).solve::<T>(),
        Strategy::Enumerate => enumerate::solve::<T>(problem, config),
        Strategy::Auto => match BranchAndBound::new(problem, config).with_cutoff(cutoff).solve::<T>() {
            Err(SolveError::BudgetExceeded) if problem.is_equality_system() => {
                warn!("branch-and-bound exceeded its budget, retrying with bounded enumeration");
                enumerate::solve::<T>(problem, config)
            }
            result => result,
        },
    }
}
