use crate::solution::SolveError;
use crate::tolerance::Scalar;

/// An integer linear program over non-negative integer variables.
///
/// The objective is always minimized and defaults to the unweighted sum of
/// all variables.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IlpProblem {
    /// Number of decision variables
    pub num_variables: usize,
    /// Objective function coefficients (costs)
    pub objective: Objective,
    /// Constraints
    pub constraints: Vec<Constraint>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Objective {
    /// Coefficients for each variable
    pub coefficients: Vec<i64>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    /// Name/label for the constraint (for diagnostics)
    pub name: String,
    /// Coefficients for each variable
    pub coefficients: Vec<i64>,
    /// Comparison operator
    pub op: ConstraintOp,
    /// Right-hand side value
    pub rhs: i64,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintOp {
    /// Less than or equal (<=)
    Le,
    /// Greater than or equal (>=)
    Ge,
    /// Equal (=)
    Eq,
}

/// A single `coefficients · x <= rhs` row as fed to the tableau.
#[derive(Debug, Clone, PartialEq)]
pub struct Row<T> {
    pub coefficients: Vec<T>,
    pub rhs: T,
}

impl<T: Scalar> Row<T> {
    /// `x[index] <= value`
    pub fn upper_bound(num_variables: usize, index: usize, value: T) -> Self {
        let mut coefficients = vec![T::zero(); num_variables];
        coefficients[index] = T::one();
        Self { coefficients, rhs: value }
    }

    /// `x[index] >= value`, stored as `-x[index] <= -value`
    pub fn lower_bound(num_variables: usize, index: usize, value: T) -> Self {
        let mut coefficients = vec![T::zero(); num_variables];
        coefficients[index] = -T::one();
        Self { coefficients, rhs: -value }
    }

    fn from_integers(coefficients: &[i64], rhs: i64, sign: i64) -> Self {
        Self {
            coefficients: coefficients.iter().map(|&c| T::from_i64(sign * c)).collect(),
            rhs: T::from_i64(sign * rhs),
        }
    }
}

impl IlpProblem {
    pub fn new(num_variables: usize) -> Self {
        Self {
            num_variables,
            objective: Objective {
                coefficients: vec![1; num_variables],
            },
            constraints: Vec::new(),
        }
    }

    /// Unit-coefficient equality rows, one per `(indices, target)` pair,
    /// minimizing the plain sum of all variables.
    pub fn from_index_sets<I: AsRef<[usize]>>(num_variables: usize, rows: &[(I, i64)]) -> Self {
        let mut problem = Self::new(num_variables);
        for (i, (indices, target)) in rows.iter().enumerate() {
            problem.add_index_constraint(format!("c{}", i), indices.as_ref(), *target);
        }
        problem
    }

    pub fn set_objective(&mut self, coefficients: Vec<i64>) {
        self.objective = Objective { coefficients };
    }

    pub fn add_constraint(&mut self, name: impl Into<String>, coefficients: Vec<i64>, op: ConstraintOp, rhs: i64) {
        self.constraints.push(Constraint {
            name: name.into(),
            coefficients,
            op,
            rhs,
        });
    }

    /// Adds `sum(x[i] for i in indices) = rhs`.
    pub fn add_index_constraint(&mut self, name: impl Into<String>, indices: &[usize], rhs: i64) {
        let mut coefficients = vec![0; self.num_variables];
        for &i in indices {
            if let Some(c) = coefficients.get_mut(i) {
                *c = 1;
            }
        }
        self.add_constraint(name, coefficients, ConstraintOp::Eq, rhs);
    }

    pub fn num_variables(&self) -> usize {
        self.num_variables
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_equality_system(&self) -> bool {
        self.constraints.iter().all(|c| c.op == ConstraintOp::Eq)
    }

    /// True when every objective coefficient is 1.
    pub fn has_unit_costs(&self) -> bool {
        self.objective.coefficients.iter().all(|&c| c == 1)
    }

    /// True when every constraint coefficient is 0 or 1.
    pub fn is_binary_matrix(&self) -> bool {
        self.constraints
            .iter()
            .all(|c| c.coefficients.iter().all(|&a| a == 0 || a == 1))
    }

    pub fn validate(&self) -> Result<(), SolveError> {
        let n = self.num_variables;
        if self.objective.coefficients.len() != n {
            return Err(SolveError::InvalidModel(format!(
                "objective has {} coefficients for {} variables",
                self.objective.coefficients.len(),
                n
            )));
        }
        if let Some((j, c)) = self.objective.coefficients.iter().enumerate().find(|(_, c)| **c < 0) {
            return Err(SolveError::InvalidModel(format!(
                "objective coefficient {} of variable {} is negative",
                c, j
            )));
        }
        for c in &self.constraints {
            if c.coefficients.len() != n {
                return Err(SolveError::InvalidModel(format!(
                    "constraint {} has {} coefficients for {} variables",
                    c.name,
                    c.coefficients.len(),
                    n
                )));
            }
        }
        Ok(())
    }

    /// Lowers every constraint to `<=` rows: `Ge` rows are negated and `Eq`
    /// rows become a `<=` / `>=` pair.
    pub fn standard_rows<T: Scalar>(&self) -> Vec<Row<T>> {
        let mut rows = Vec::with_capacity(self.constraints.len() * 2);
        for c in &self.constraints {
            match c.op {
                ConstraintOp::Le => rows.push(Row::from_integers(&c.coefficients, c.rhs, 1)),
                ConstraintOp::Ge => rows.push(Row::from_integers(&c.coefficients, c.rhs, -1)),
                ConstraintOp::Eq => {
                    rows.push(Row::from_integers(&c.coefficients, c.rhs, 1));
                    rows.push(Row::from_integers(&c.coefficients, c.rhs, -1));
                }
            }
        }
        rows
    }

    pub fn objective_costs<T: Scalar>(&self) -> Vec<T> {
        self.objective.coefficients.iter().map(|&c| T::from_i64(c)).collect()
    }

    /// Upper bound per variable implied by the constraints.
    ///
    /// A `=` or `<=` row whose coefficients are all non-negative caps every
    /// variable it contains at `rhs / coefficient`.
    pub fn variable_upper_bounds(&self) -> Vec<Option<i64>> {
        let mut bounds: Vec<Option<i64>> = vec![None; self.num_variables];
        for c in &self.constraints {
            if c.op == ConstraintOp::Ge || c.rhs < 0 || c.coefficients.iter().any(|&a| a < 0) {
                continue;
            }
            for (j, &a) in c.coefficients.iter().enumerate() {
                if a > 0 {
                    let cap = c.rhs / a;
                    bounds[j] = Some(bounds[j].map_or(cap, |b| b.min(cap)));
                }
            }
        }
        bounds
    }

    /// Exact integer check of every constraint, including non-negativity.
    pub fn is_satisfied_by(&self, values: &[i64]) -> bool {
        if values.len() != self.num_variables || values.iter().any(|&v| v < 0) {
            return false;
        }
        self.constraints.iter().all(|c| {
            let lhs: i128 = c
                .coefficients
                .iter()
                .zip(values)
                .map(|(&a, &x)| a as i128 * x as i128)
                .sum();
            let rhs = c.rhs as i128;
            match c.op {
                ConstraintOp::Le => lhs <= rhs,
                ConstraintOp::Ge => lhs >= rhs,
                ConstraintOp::Eq => lhs == rhs,
            }
        })
    }

    pub fn objective_value(&self, values: &[i64]) -> i64 {
        self.objective
            .coefficients
            .iter()
            .zip(values)
            .map(|(&c, &x)| c.saturating_mul(x))
            .fold(0i64, i64::saturating_add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> IlpProblem {
        // x4+x5=3, x1+x5=5, x2+x3+x4=4, x0+x1+x3=7
        let mut problem = IlpProblem::new(6);
        problem.add_index_constraint("c0", &[4, 5], 3);
        problem.add_index_constraint("c1", &[1, 5], 5);
        problem.add_index_constraint("c2", &[2, 3, 4], 4);
        problem.add_index_constraint("c3", &[0, 1, 3], 7);
        problem
    }

    #[test]
    fn test_index_constraint_builds_unit_row() {
        let problem = sample();
        assert_eq!(problem.num_constraints(), 4);
        assert_eq!(problem.constraints[2].coefficients, vec![0, 0, 1, 1, 1, 0]);
        assert!(problem.is_equality_system());
        assert!(problem.has_unit_costs());
        assert!(problem.is_binary_matrix());
        assert!(problem.validate().is_ok());
    }

    #[test]
    fn test_from_index_sets_matches_builder() {
        let built = IlpProblem::from_index_sets(
            6,
            &[(vec![4, 5], 3), (vec![1, 5], 5), (vec![2, 3, 4], 4), (vec![0, 1, 3], 7)],
        );
        assert_eq!(built, sample());

        let empty = IlpProblem::from_index_sets::<[usize; 0]>(3, &[]);
        assert_eq!(empty.num_constraints(), 0);
        assert_eq!(empty.objective.coefficients, vec![1, 1, 1]);
    }

    #[test]
    fn test_standard_rows_split_equalities() {
        let rows: Vec<Row<f64>> = sample().standard_rows();
        assert_eq!(rows.len(), 8);
        assert_eq!(rows[0].rhs, 3.0);
        assert_eq!(rows[1].rhs, -3.0);
        assert_eq!(rows[1].coefficients[4], -1.0);
    }

    #[test]
    fn test_variable_upper_bounds() {
        let bounds = sample().variable_upper_bounds();
        assert_eq!(bounds, vec![Some(7), Some(5), Some(4), Some(4), Some(3), Some(3)]);
    }

    #[test]
    fn test_exact_verification() {
        let problem = sample();
        assert!(problem.is_satisfied_by(&[1, 3, 0, 3, 1, 2]));
        assert!(!problem.is_satisfied_by(&[1, 3, 0, 3, 1, 1]));
        assert!(!problem.is_satisfied_by(&[1, 3, 0, 3, 1]));
        assert_eq!(problem.objective_value(&[1, 3, 0, 3, 1, 2]), 10);
    }

    #[test]
    fn test_validate_rejects_negative_costs() {
        let mut problem = sample();
        problem.set_objective(vec![1, 1, -1, 1, 1, 1]);
        assert!(matches!(problem.validate(), Err(SolveError::InvalidModel(_))));
    }

    #[test]
    fn test_validate_rejects_ragged_rows() {
        let mut problem = IlpProblem::new(2);
        problem.add_constraint("short", vec![1], ConstraintOp::Le, 4);
        assert!(matches!(problem.validate(), Err(SolveError::InvalidModel(_))));
    }
}
