use std::time::{Duration, Instant};

/// How an instance is searched.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Strategy {
    /// Branch-and-bound, retried with bounded enumeration when the budget runs out
    #[default]
    Auto,
    BranchAndBound,
    Enumerate,
}

/// The field the tableau is computed over.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Arithmetic {
    /// `f64` with epsilon comparisons
    #[default]
    Float,
    /// Exact `i64` rationals
    Exact,
}

/// Immutable solver settings, passed into every solve.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverConfig {
    pub strategy: Strategy,
    pub arithmetic: Arithmetic,
    /// Try the elimination estimate before searching
    pub presolve: bool,
    /// Add the implied per-variable upper bounds as rows of the root relaxation
    pub derive_bounds: bool,
    /// Pivot limit for a single relaxation
    pub max_iterations: usize,
    /// Relaxation limit for one branch-and-bound search
    pub node_limit: Option<usize>,
    /// Wall-clock limit for one solve, in milliseconds
    pub time_limit_ms: Option<u64>,
    /// Exclusive upper bound for each free variable during enumeration
    pub enumeration_cap: i64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Auto,
            arithmetic: Arithmetic::Float,
            presolve: true,
            derive_bounds: true,
            max_iterations: 10000,
            node_limit: None,
            time_limit_ms: None,
            enumeration_cap: 150,
        }
    }
}

impl SolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_arithmetic(mut self, arithmetic: Arithmetic) -> Self {
        self.arithmetic = arithmetic;
        self
    }

    pub fn with_presolve(mut self, presolve: bool) -> Self {
        self.presolve = presolve;
        self
    }

    pub fn with_derived_bounds(mut self, derive_bounds: bool) -> Self {
        self.derive_bounds = derive_bounds;
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_node_limit(mut self, limit: Option<usize>) -> Self {
        self.node_limit = limit;
        self
    }

    pub fn with_time_limit(mut self, limit: Option<Duration>) -> Self {
        self.time_limit_ms = limit.map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn with_enumeration_cap(mut self, cap: i64) -> Self {
        self.enumeration_cap = cap;
        self
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_ms.map(Duration::from_millis)
    }
}

/// Limits polled between pivots and branches of one solve.
#[derive(Debug, Clone, Copy)]
pub struct Budget {
    deadline: Option<Instant>,
    node_limit: Option<usize>,
}

impl Budget {
    pub fn unlimited() -> Self {
        Self {
            deadline: None,
            node_limit: None,
        }
    }

    /// Starts the clock for `config.time_limit_ms`. A limit past the end of
    /// the clock means no deadline.
    pub fn start(config: &SolverConfig) -> Self {
        Self {
            deadline: config.time_limit().and_then(|limit| Instant::now().checked_add(limit)),
            node_limit: config.node_limit,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    pub fn allows_nodes(&self, nodes: usize) -> bool {
        self.node_limit.is_none_or(|limit| nodes < limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides_defaults() {
        let config = SolverConfig::new()
            .with_strategy(Strategy::Enumerate)
            .with_arithmetic(Arithmetic::Exact)
            .with_time_limit(Some(Duration::from_secs(2)))
            .with_enumeration_cap(20);
        assert_eq!(config.strategy, Strategy::Enumerate);
        assert_eq!(config.arithmetic, Arithmetic::Exact);
        assert_eq!(config.time_limit_ms, Some(2000));
        assert_eq!(config.enumeration_cap, 20);
        assert!(config.presolve);
    }

    #[test]
    fn test_budget_limits() {
        assert!(!Budget::unlimited().is_expired());
        assert!(Budget::unlimited().allows_nodes(usize::MAX - 1));

        let config = SolverConfig::new()
            .with_time_limit(Some(Duration::ZERO))
            .with_node_limit(Some(3));
        let budget = Budget::start(&config);
        assert!(budget.is_expired());
        assert!(budget.allows_nodes(2));
        assert!(!budget.allows_nodes(3));
    }

    #[test]
    fn test_time_limit_saturates() {
        let config = SolverConfig::new().with_time_limit(Some(Duration::MAX));
        assert_eq!(config.time_limit_ms, Some(u64::MAX));
        assert!(!Budget::start(&config).is_expired());

        let config = SolverConfig::new().with_time_limit(Some(Duration::from_millis(250)));
        assert_eq!(config.time_limit(), Some(Duration::from_millis(250)));
    }
}
