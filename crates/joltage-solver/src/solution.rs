use thiserror::Error;

/// An optimal non-negative integer assignment.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegerSolution {
    /// Minimal objective value
    pub objective: i64,
    /// Witness assignment, verified exactly against every constraint
    pub values: Vec<i64>,
    /// Search counters
    pub stats: SearchStats,
    /// Which path produced the solution
    pub method: Method,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Unique solution read off the reduced system
    Presolve,
    BranchAndBound,
    Enumeration,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// LP relaxations solved
    pub relaxations: usize,
    /// Nodes split on a fractional variable
    pub fractional_detections: usize,
    /// Child relaxations attempted, feasible or not
    pub branches: usize,
    /// Nodes discarded by the bound
    pub pruned: usize,
    /// Child relaxations without a feasible point
    pub infeasible_nodes: usize,
    pub incumbent_updates: usize,
    pub max_depth: usize,
    /// Free variable assignments tried by enumeration
    pub candidates: usize,
}

/// Whole-instance failures. Infeasible relaxations inside the search never
/// surface here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SolveError {
    #[error("Problem is infeasible")]
    Infeasible,
    #[error("Search exhausted without an integer solution")]
    SearchExhausted,
    #[error("Search budget exceeded")]
    BudgetExceeded,
    #[error("Invalid model: {0}")]
    InvalidModel(String),
}

impl IntegerSolution {
    pub fn new(objective: i64, values: Vec<i64>, stats: SearchStats, method: Method) -> Self {
        Self {
            objective,
            values,
            stats,
            method,
        }
    }
}
