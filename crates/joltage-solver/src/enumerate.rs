//! Bounded enumeration over the free variables of the reduced system.
//!
//! Cost is exponential in the number of free columns; this is a fallback for
//! small equality systems, not a substitute for branch-and-bound.

use tracing::debug;

use crate::config::{Budget, SolverConfig};
use crate::problem::IlpProblem;
use crate::solution::{IntegerSolution, Method, SearchStats, SolveError};
use crate::tolerance::Scalar;

/// How often the deadline is polled while enumerating.
const DEADLINE_POLL: usize = 4096;

/// Augmented system `[A | b]` in reduced row echelon form.
#[derive(Debug, Clone)]
pub struct Echelon<T> {
    /// Reduced rows with the right-hand side as the last entry
    rows: Vec<Vec<T>>,
    /// `(row, column)` of each leading one
    pivots: Vec<(usize, usize)>,
    /// Columns without a leading one
    free: Vec<usize>,
    n_vars: usize,
    consistent: bool,
}

impl<T: Scalar> Echelon<T> {
    /// Gauss–Jordan elimination of the equality system of `problem`.
    pub fn reduce(problem: &IlpProblem) -> Self {
        let n = problem.num_variables();
        let mut rows: Vec<Vec<T>> = problem
            .constraints
            .iter()
            .map(|c| {
                c.coefficients
                    .iter()
                    .chain(std::iter::once(&c.rhs))
                    .map(|&v| T::from_i64(v))
                    .collect()
            })
            .collect();
        let m = rows.len();

        let mut pivots = Vec::new();
        let mut rank = 0;
        for col in 0..n {
            if rank == m {
                break;
            }
            let Some(found) = (rank..m).find(|&i| !rows[i][col].is_near_zero()) else {
                continue;
            };
            rows.swap(rank, found);

            let lead = rows[rank][col].clone();
            for v in rows[rank].iter_mut() {
                *v = v.clone() / lead.clone();
            }

            let pivot_row = rows[rank].clone();
            for (i, row) in rows.iter_mut().enumerate() {
                if i == rank {
                    continue;
                }
                let factor = row[col].clone();
                if factor.is_zero() {
                    continue;
                }
                for (v, p) in row.iter_mut().zip(&pivot_row) {
                    *v = v.clone() - factor.clone() * p.clone();
                }
            }

            pivots.push((rank, col));
            rank += 1;
        }

        // Rows below the rank are all-zero on the left; a non-zero right-hand side there is 0 = b.
        let consistent = rows[rank..].iter().all(|row| row[n].is_near_zero());
        let free = (0..n).filter(|j| !pivots.iter().any(|&(_, c)| c == *j)).collect();

        Self {
            rows,
            pivots,
            free,
            n_vars: n,
            consistent,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.consistent
    }

    pub fn free_columns(&self) -> &[usize] {
        &self.free
    }

    pub fn rank(&self) -> usize {
        self.pivots.len()
    }

    /// Assigns the free variables and back-substitutes the pivot variables.
    pub fn back_substitute(&self, free_values: &[i64]) -> Vec<T> {
        let mut x = vec![T::zero(); self.n_vars];
        for (&j, &v) in self.free.iter().zip(free_values) {
            x[j] = T::from_i64(v);
        }
        for &(row, col) in &self.pivots {
            let r = &self.rows[row];
            let mut value = r[self.n_vars].clone();
            for &j in &self.free {
                value = value - r[j].clone() * x[j].clone();
            }
            x[col] = value;
        }
        x
    }
}

/// Converts a candidate to integers when every entry is a non-negative integer.
pub(crate) fn integral_point<T: Scalar>(x: &[T]) -> Option<Vec<i64>> {
    x.iter()
        .map(|v| {
            if v.is_below_zero() || !v.is_integral() {
                None
            } else {
                v.nearest_integer()
            }
        })
        .collect()
}

/// Minimal-objective integer point by enumerating the free variables in
/// `0..cap`, clipped by the implied variable bounds. Ties go to the smaller
/// sum of squares, then to the first found.
pub fn solve<T: Scalar>(problem: &IlpProblem, config: &SolverConfig) -> Result<IntegerSolution, SolveError> {
    problem.validate()?;
    if !problem.is_equality_system() {
        return Err(SolveError::InvalidModel(
            "bounded enumeration requires an equality system".to_string(),
        ));
    }

    let budget = Budget::start(config);
    let echelon: Echelon<T> = Echelon::reduce(problem);
    if !echelon.is_consistent() {
        return Err(SolveError::Infeasible);
    }

    let implied = problem.variable_upper_bounds();
    let cap = config.enumeration_cap.max(1);
    let limits: Vec<i64> = echelon
        .free_columns()
        .iter()
        .map(|&j| implied[j].map_or(cap, |b| b.saturating_add(1).clamp(1, cap)))
        .collect();
    let exhaustive = echelon
        .free_columns()
        .iter()
        .all(|&j| implied[j].is_some_and(|b| b < cap));
    debug!(
        rank = echelon.rank(),
        free = echelon.free_columns().len(),
        exhaustive,
        "enumerating free variables"
    );

    let mut stats = SearchStats::default();
    let mut best: Option<(i64, i64, Vec<i64>)> = None;
    let mut free_values = vec![0i64; limits.len()];

    loop {
        stats.candidates += 1;
        if stats.candidates % DEADLINE_POLL == 0 && budget.is_expired() {
            return Err(SolveError::BudgetExceeded);
        }

        let x = echelon.back_substitute(&free_values);
        if let Some(values) = integral_point(&x).filter(|v| problem.is_satisfied_by(v)) {
            let objective = problem.objective_value(&values);
            let squares = values.iter().map(|v| v.saturating_mul(*v)).fold(0i64, i64::saturating_add);
            let better = best
                .as_ref()
                .is_none_or(|(o, s, _)| objective < *o || (objective == *o && squares < *s));
            if better {
                stats.incumbent_updates += 1;
                best = Some((objective, squares, values));
            }
        }

        if !advance(&mut free_values, &limits) {
            break;
        }
    }

    match best {
        Some((objective, _, values)) => Ok(IntegerSolution::new(objective, values, stats, Method::Enumeration)),
        None if exhaustive => Err(SolveError::Infeasible),
        None => Err(SolveError::SearchExhausted),
    }
}

/// Odometer increment; false once every combination has been visited.
fn advance(values: &mut [i64], limits: &[i64]) -> bool {
    for (v, &limit) in values.iter_mut().zip(limits) {
        *v += 1;
        if *v < limit {
            return true;
        }
        *v = 0;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::ConstraintOp;
    use num_rational::Rational64;

    fn sample() -> IlpProblem {
        let mut problem = IlpProblem::new(6);
        problem.add_index_constraint("c0", &[4, 5], 3);
        problem.add_index_constraint("c1", &[1, 5], 5);
        problem.add_index_constraint("c2", &[2, 3, 4], 4);
        problem.add_index_constraint("c3", &[0, 1, 3], 7);
        problem
    }

    #[test]
    fn test_rref_identifies_free_columns() {
        let echelon: Echelon<Rational64> = Echelon::reduce(&sample());
        assert!(echelon.is_consistent());
        assert_eq!(echelon.rank(), 4);
        assert_eq!(echelon.free_columns().len(), 2);
    }

    #[test]
    fn test_enumeration_finds_minimum() {
        let problem = sample();
        let solution = solve::<f64>(&problem, &SolverConfig::new()).unwrap();
        assert_eq!(solution.objective, 10);
        assert!(problem.is_satisfied_by(&solution.values));
        assert_eq!(solution.method, Method::Enumeration);
    }

    #[test]
    fn test_inconsistent_system() {
        let mut problem = IlpProblem::new(1);
        problem.add_index_constraint("two", &[0], 2);
        problem.add_index_constraint("five", &[0], 5);
        assert_eq!(solve::<f64>(&problem, &SolverConfig::new()), Err(SolveError::Infeasible));
    }

    #[test]
    fn test_exhaustive_enumeration_proves_infeasible() {
        // 2x0 + 2x1 = 3: both variables capped at 1 by the row itself.
        let mut problem = IlpProblem::new(2);
        problem.add_constraint("odd", vec![2, 2], ConstraintOp::Eq, 3);
        assert_eq!(solve::<Rational64>(&problem, &SolverConfig::new()), Err(SolveError::Infeasible));
    }

    #[test]
    fn test_rejects_inequalities() {
        let mut problem = IlpProblem::new(1);
        problem.add_constraint("cap", vec![1], ConstraintOp::Le, 4);
        assert!(matches!(
            solve::<f64>(&problem, &SolverConfig::new()),
            Err(SolveError::InvalidModel(_))
        ));
    }

    #[test]
    fn test_ties_prefer_smaller_squares() {
        // x0 + x1 = 2: (1, 1) beats (2, 0) and (0, 2).
        let mut problem = IlpProblem::new(2);
        problem.add_index_constraint("pair", &[0, 1], 2);
        let solution = solve::<f64>(&problem, &SolverConfig::new()).unwrap();
        assert_eq!(solution.objective, 2);
        assert_eq!(solution.values, vec![1, 1]);
    }

    #[test]
    fn test_odometer() {
        let mut values = vec![0, 0];
        let limits = [2, 3];
        let mut seen = 1;
        while advance(&mut values, &limits) {
            seen += 1;
        }
        assert_eq!(seen, 6);
        assert_eq!(values, vec![0, 0]);
    }

    #[test]
    fn test_huge_targets_do_not_overflow() {
        let mut problem = IlpProblem::new(2);
        problem.add_index_constraint("pair", &[0, 1], i64::MAX);
        let config = SolverConfig::new().with_enumeration_cap(4);
        let solution = solve::<Rational64>(&problem, &config).unwrap();
        assert_eq!(solution.objective, i64::MAX);
        assert!(problem.is_satisfied_by(&solution.values));
        assert_eq!(solution.stats.candidates, 4);
    }
}
