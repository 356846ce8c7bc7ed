use num_rational::Rational64;
use tracing::debug;

use crate::enumerate::{Echelon, integral_point};
use crate::problem::IlpProblem;
use crate::solution::{IntegerSolution, Method, SearchStats};

/// What elimination alone can tell about the optimum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Estimate {
    /// The system has a unique solution and it is a non-negative integer point.
    Exact(IntegerSolution),
    /// The optimum lies in `lower..=upper`.
    Range { lower: i64, upper: i64 },
}

/// Estimates an equality system before searching it.
///
/// Returns `None` when neither a unique solution nor a valid range follows
/// from the structure of the model.
pub fn estimate(problem: &IlpProblem) -> Option<Estimate> {
    if !problem.is_equality_system() || problem.validate().is_err() {
        return None;
    }

    let echelon: Echelon<Rational64> = Echelon::reduce(problem);
    if echelon.is_consistent() && echelon.free_columns().is_empty() {
        let point = echelon.back_substitute(&[]);
        if let Some(values) = integral_point(&point).filter(|v| problem.is_satisfied_by(v)) {
            let objective = problem.objective_value(&values);
            debug!(objective, "unique integer solution from elimination");
            return Some(Estimate::Exact(IntegerSolution::new(
                objective,
                values,
                SearchStats::default(),
                Method::Presolve,
            )));
        }
    }

    unit_range(problem)
}

/// For a unit-cost 0/1 model where every variable appears in some row, each
/// row gives `sum(x) >= rhs`, and `sum(x) <= sum(A x) = sum(b)`.
fn unit_range(problem: &IlpProblem) -> Option<Estimate> {
    if !problem.has_unit_costs() || !problem.is_binary_matrix() {
        return None;
    }
    let covered = (0..problem.num_variables())
        .all(|j| problem.constraints.iter().any(|c| c.coefficients[j] == 1));
    if !covered {
        return None;
    }
    let lower = problem.constraints.iter().map(|c| c.rhs).max().unwrap_or(0).max(0);
    let upper = problem.constraints.iter().try_fold(0i64, |acc, c| acc.checked_add(c.rhs))?;
    Some(Estimate::Range { lower, upper })
}
