//! Best-first branch-and-bound over LP relaxations.
//!
//! Every node owns its constraint rows (the parent's rows plus exactly one
//! bound on one variable) and its relaxed point. The relaxed objective of a
//! node is a lower bound for every integer point below it, so a node whose
//! bound cannot beat the incumbent is discarded without expanding it.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use tracing::{debug, trace, warn};

use crate::config::{Budget, SolverConfig};
use crate::problem::{IlpProblem, Row};
use crate::simplex::{LpFailure, Relaxation, Solver};
use crate::solution::{IntegerSolution, Method, SearchStats, SolveError};
use crate::tolerance::Scalar;

/// Hooks into the search tree. All methods default to no-ops.
pub trait SearchObserver {
    /// A child relaxation was solved below a parent node.
    fn on_branch<T: Scalar>(&mut self, _parent_bound: &T, _child_bound: &T) {}

    /// A new incumbent was accepted.
    fn on_incumbent(&mut self, _objective: i64, _values: &[i64]) {}

    /// A popped node was discarded by the incumbent bound.
    fn on_prune<T: Scalar>(&mut self, _bound: &T) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl SearchObserver for NoopObserver {}

struct Node<T> {
    rows: Vec<Row<T>>,
    bound: T,
    values: Vec<T>,
    depth: usize,
}

/// Heap entry ordered so the smallest bound pops first, then the oldest node.
struct Queued<T> {
    node: Node<T>,
    seq: usize,
}

impl<T: Scalar> PartialEq for Queued<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T: Scalar> Eq for Queued<T> {}

impl<T: Scalar> PartialOrd for Queued<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Scalar> Ord for Queued<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .node
            .bound
            .partial_cmp(&self.node.bound)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct Incumbent {
    objective: i64,
    values: Vec<i64>,
}

pub struct BranchAndBound<'a, O = NoopObserver> {
    problem: &'a IlpProblem,
    config: &'a SolverConfig,
    cutoff: Option<i64>,
    observer: O,
}

impl<'a> BranchAndBound<'a, NoopObserver> {
    pub fn new(problem: &'a IlpProblem, config: &'a SolverConfig) -> Self {
        Self {
            problem,
            config,
            cutoff: None,
            observer: NoopObserver,
        }
    }
}

impl<'a, O: SearchObserver> BranchAndBound<'a, O> {
    pub fn with_observer<P: SearchObserver>(self, observer: P) -> BranchAndBound<'a, P> {
        BranchAndBound {
            problem: self.problem,
            config: self.config,
            cutoff: self.cutoff,
            observer,
        }
    }

    /// A known upper bound on the optimum; nodes whose bound exceeds it are
    /// pruned before any incumbent exists.
    pub fn with_cutoff(mut self, cutoff: Option<i64>) -> Self {
        self.cutoff = cutoff;
        self
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn into_observer(self) -> O {
        self.observer
    }

    pub fn solve<T: Scalar>(&mut self) -> Result<IntegerSolution, SolveError> {
        self.problem.validate()?;

        let budget = Budget::start(self.config);
        let lp = Solver::new().with_max_iterations(self.config.max_iterations);
        let costs: Vec<T> = self.problem.objective_costs();
        let n = self.problem.num_variables();
        let mut stats = SearchStats::default();

        let mut root_rows: Vec<Row<T>> = self.problem.standard_rows();
        if self.config.derive_bounds {
            for (j, bound) in self.problem.variable_upper_bounds().into_iter().enumerate() {
                if let Some(b) = bound {
                    root_rows.push(Row::upper_bound(n, j, T::from_i64(b)));
                }
            }
        }

        let root = match lp.solve(&root_rows, &costs, &budget) {
            Ok(relaxation) => relaxation,
            Err(LpFailure::Infeasible) => {
                debug!("root relaxation infeasible");
                return Err(SolveError::Infeasible);
            }
            Err(LpFailure::Interrupted) => return Err(SolveError::BudgetExceeded),
        };
        stats.relaxations += 1;
        debug!(bound = root.objective.to_f64(), "root relaxation solved");

        // Objective values are integers, so `cutoff + 1` admits every point
        // with objective <= cutoff.
        let mut threshold: Option<T> = self.cutoff.map(|c| T::from_i64(c.saturating_add(1)));
        let mut incumbent: Option<Incumbent> = None;

        let mut heap = BinaryHeap::new();
        let mut seq = 0;
        heap.push(Queued {
            node: Node {
                rows: root_rows,
                bound: root.objective,
                values: root.values,
                depth: 0,
            },
            seq,
        });

        while let Some(Queued { node, .. }) = heap.pop() {
            if budget.is_expired() {
                return Err(SolveError::BudgetExceeded);
            }
            if !improves(&node.bound, threshold.as_ref()) {
                stats.pruned += 1;
                self.observer.on_prune(&node.bound);
                continue;
            }

            let Some(index) = node.values.iter().position(|v| !v.is_integral()) else {
                let Some(values) = self.round_witness(&node.values) else {
                    continue;
                };
                let objective = self.problem.objective_value(&values);
                if improves(&T::from_i64(objective), threshold.as_ref()) {
                    debug!(objective, depth = node.depth, "new incumbent");
                    threshold = Some(T::from_i64(objective));
                    stats.incumbent_updates += 1;
                    self.observer.on_incumbent(objective, &values);
                    incumbent = Some(Incumbent { objective, values });
                }
                continue;
            };

            stats.fractional_detections += 1;
            let value = node.values[index].clone();
            trace!(index, value = value.to_f64(), depth = node.depth, "branching");

            let children = [
                Row::upper_bound(n, index, value.round_down()),
                Row::lower_bound(n, index, value.round_up()),
            ];
            for extra in children {
                if !budget.allows_nodes(stats.relaxations) {
                    return Err(SolveError::BudgetExceeded);
                }
                stats.branches += 1;
                let mut rows = node.rows.clone();
                rows.push(extra);

                match lp.solve(&rows, &costs, &budget) {
                    Ok(Relaxation { objective, values }) => {
                        stats.relaxations += 1;
                        self.observer.on_branch(&node.bound, &objective);
                        if improves(&objective, threshold.as_ref()) {
                            seq += 1;
                            stats.max_depth = stats.max_depth.max(node.depth + 1);
                            heap.push(Queued {
                                node: Node {
                                    rows,
                                    bound: objective,
                                    values,
                                    depth: node.depth + 1,
                                },
                                seq,
                            });
                        } else {
                            stats.pruned += 1;
                        }
                    }
                    Err(LpFailure::Infeasible) => {
                        stats.relaxations += 1;
                        stats.infeasible_nodes += 1;
                    }
                    Err(LpFailure::Interrupted) => return Err(SolveError::BudgetExceeded),
                }
            }
        }

        match incumbent {
            Some(Incumbent { objective, values }) => {
                debug!(objective, relaxations = stats.relaxations, "search finished");
                Ok(IntegerSolution::new(objective, values, stats, Method::BranchAndBound))
            }
            None => Err(SolveError::SearchExhausted),
        }
    }

    /// Rounds an integral relaxed point and checks it exactly. A point that is
    /// integral within tolerance but fails the exact check is rejected.
    fn round_witness<T: Scalar>(&self, values: &[T]) -> Option<Vec<i64>> {
        let rounded: Option<Vec<i64>> = values.iter().map(|v| v.nearest_integer()).collect();
        match rounded {
            Some(values) if self.problem.is_satisfied_by(&values) => Some(values),
            _ => {
                warn!(?values, "integral relaxation fails exact verification, discarding");
                None
            }
        }
    }
}

/// True if a node bounded below by `bound` can still beat `threshold`.
fn improves<T: Scalar>(bound: &T, threshold: Option<&T>) -> bool {
    match threshold {
        None => true,
        Some(t) => (bound.integral_ceiling() - t.clone()).is_below_zero(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_rational::Rational64;

    fn sample() -> IlpProblem {
        let mut problem = IlpProblem::new(6);
        problem.add_index_constraint("c0", &[4, 5], 3);
        problem.add_index_constraint("c1", &[1, 5], 5);
        problem.add_index_constraint("c2", &[2, 3, 4], 4);
        problem.add_index_constraint("c3", &[0, 1, 3], 7);
        problem
    }

    #[derive(Default)]
    struct Recorder {
        branches: usize,
        decreasing: usize,
        incumbents: Vec<i64>,
    }

    impl SearchObserver for Recorder {
        fn on_branch<T: Scalar>(&mut self, parent: &T, child: &T) {
            self.branches += 1;
            if (child.clone() - parent.clone()).is_below_zero() {
                self.decreasing += 1;
            }
        }

        fn on_incumbent(&mut self, objective: i64, _values: &[i64]) {
            self.incumbents.push(objective);
        }
    }

    #[test]
    fn test_sample_machine() {
        let problem = sample();
        let config = SolverConfig::new();
        let solution = BranchAndBound::new(&problem, &config).solve::<f64>().unwrap();
        assert_eq!(solution.objective, 10);
        assert!(problem.is_satisfied_by(&solution.values));
        assert_eq!(solution.values.iter().sum::<i64>(), 10);
        assert_eq!(solution.method, Method::BranchAndBound);
    }

    #[test]
    fn test_exact_arithmetic_agrees() {
        let problem = sample();
        let config = SolverConfig::new();
        let solution = BranchAndBound::new(&problem, &config).solve::<Rational64>().unwrap();
        assert_eq!(solution.objective, 10);
        assert!(problem.is_satisfied_by(&solution.values));
    }

    #[test]
    fn test_child_bounds_never_decrease() {
        // Odd cycle: the relaxation sits at 1/2 everywhere and must branch.
        let mut problem = IlpProblem::new(5);
        problem.add_index_constraint("a", &[0, 1, 3], 3);
        problem.add_index_constraint("b", &[1, 2, 4], 3);
        problem.add_index_constraint("c", &[0, 2], 1);
        let config = SolverConfig::new().with_derived_bounds(false);
        let mut search = BranchAndBound::new(&problem, &config).with_observer(Recorder::default());
        let solution = search.solve::<Rational64>().unwrap();
        let recorder = search.into_observer();

        assert!(problem.is_satisfied_by(&solution.values));
        assert_eq!(recorder.decreasing, 0);
        assert!(recorder.incumbents.windows(2).all(|w| w[1] < w[0]));

        let stats = solution.stats;
        assert!(stats.branches > 0);
        assert_eq!(stats.branches, recorder.branches + stats.infeasible_nodes);
        assert_eq!(stats.relaxations, stats.branches + 1);
        assert_eq!(stats.branches, 2 * stats.fractional_detections);
    }

    #[test]
    fn test_contradictory_rows_are_infeasible() {
        let mut problem = IlpProblem::new(2);
        problem.add_index_constraint("two", &[0], 2);
        problem.add_index_constraint("five", &[0], 5);
        let config = SolverConfig::new();
        let result = BranchAndBound::new(&problem, &config).solve::<f64>();
        assert_eq!(result, Err(SolveError::Infeasible));
    }

    #[test]
    fn test_parity_gap_exhausts_search() {
        // 2x0 + 2x1 = 3 has a fractional relaxation but no integer point.
        let mut problem = IlpProblem::new(2);
        problem.add_constraint("odd", vec![2, 2], crate::ConstraintOp::Eq, 3);
        let config = SolverConfig::new();
        let result = BranchAndBound::new(&problem, &config).solve::<f64>();
        assert_eq!(result, Err(SolveError::SearchExhausted));
    }

    #[test]
    fn test_cutoff_below_optimum_exhausts() {
        let problem = sample();
        let config = SolverConfig::new();
        let result = BranchAndBound::new(&problem, &config).with_cutoff(Some(9)).solve::<f64>();
        assert_eq!(result, Err(SolveError::SearchExhausted));

        let loose = BranchAndBound::new(&problem, &config).with_cutoff(Some(i64::MAX)).solve::<f64>();
        assert_eq!(loose.map(|s| s.objective), Ok(10));
    }

    #[test]
    fn test_rounded_witness_is_verified_exactly() {
        // x0 + x1 = 2
        let mut problem = IlpProblem::new(2);
        problem.add_index_constraint("pair", &[0, 1], 2);
        let config = SolverConfig::new();
        let search = BranchAndBound::new(&problem, &config);

        assert_eq!(search.round_witness(&[1.0 + 1e-13, 1.0 - 1e-13]), Some(vec![1, 1]));
        // Integral within tolerance, but rounds to a point off the row.
        assert_eq!(search.round_witness(&[1.0 + 1e-13, 1e-13]), None);
        assert_eq!(search.round_witness(&[f64::NAN, 2.0]), None);
    }

    #[test]
    fn test_node_limit_exceeded() {
        let mut problem = IlpProblem::new(3);
        problem.add_index_constraint("a", &[0, 1], 1);
        problem.add_index_constraint("b", &[1, 2], 1);
        problem.add_index_constraint("c", &[0, 2], 1);
        let config = SolverConfig::new().with_node_limit(Some(1));
        let result = BranchAndBound::new(&problem, &config).solve::<f64>();
        assert_eq!(result, Err(SolveError::BudgetExceeded));
    }
}
