use thiserror::Error;

use crate::config::Budget;
use crate::problem::Row;
use crate::tolerance::Scalar;

/// Dual simplex solver for the LP relaxation
/// `minimize c·x subject to rows (<=), x >= 0`.
///
/// The slack basis is dual feasible for non-negative costs, so no phase 1 is
/// needed: pivots only restore primal feasibility. Unboundedness is not
/// detected; every relaxation built from a bounded model is bounded.
#[derive(Debug, Clone)]
pub struct Solver {
    /// Maximum pivots before giving up
    max_iterations: usize,
}

impl Default for Solver {
    fn default() -> Self {
        Self { max_iterations: 10000 }
    }
}

/// Optimal point of an LP relaxation.
#[derive(Debug, Clone, PartialEq)]
pub struct Relaxation<T> {
    pub objective: T,
    pub values: Vec<T>,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LpFailure {
    #[error("relaxation has no feasible point")]
    Infeasible,
    #[error("relaxation interrupted by the pivot or time budget")]
    Interrupted,
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn solve<T: Scalar>(&self, rows: &[Row<T>], costs: &[T], budget: &Budget) -> Result<Relaxation<T>, LpFailure> {
        let mut tableau = Tableau::new(rows, costs);

        for _ in 0..self.max_iterations {
            if budget.is_expired() {
                return Err(LpFailure::Interrupted);
            }
            let Some(pivot_row) = tableau.find_pivot_row() else {
                return Ok(tableau.extract(costs));
            };
            let Some(pivot_col) = tableau.find_pivot_column(pivot_row) else {
                return Err(LpFailure::Infeasible);
            };
            tableau.pivot(pivot_row, pivot_col);
        }
        Err(LpFailure::Interrupted)
    }
}

/// `[ A | I | b ]` over the constraint rows, `[ c | 0 | 0 ]` as the last row.
/// Owned by a single solve call.
struct Tableau<T> {
    data: Vec<Vec<T>>,
    basic_vars: Vec<usize>,
    n_vars: usize,
}

impl<T: Scalar> Tableau<T> {
    fn new(rows: &[Row<T>], costs: &[T]) -> Self {
        let m = rows.len();
        let n_vars = costs.len();
        let total_cols = n_vars + m + 1;

        let mut data = vec![vec![T::zero(); total_cols]; m + 1];
        let mut basic_vars = Vec::with_capacity(m);

        for (i, row) in rows.iter().enumerate() {
            for (j, coef) in row.coefficients.iter().enumerate() {
                data[i][j] = coef.clone();
            }
            data[i][n_vars + i] = T::one();
            data[i][total_cols - 1] = row.rhs.clone();
            basic_vars.push(n_vars + i);
        }
        for (j, cost) in costs.iter().enumerate() {
            data[m][j] = cost.clone();
        }

        Self {
            data,
            basic_vars,
            n_vars,
        }
    }

    fn rhs_col(&self) -> usize {
        self.data[0].len() - 1
    }

    fn obj_row(&self) -> usize {
        self.data.len() - 1
    }

    /// Row with the most negative right-hand side, first found on ties.
    fn find_pivot_row(&self) -> Option<usize> {
        let rhs_col = self.rhs_col();
        let mut min_row: Option<usize> = None;

        for i in 0..self.obj_row() {
            let rhs = &self.data[i][rhs_col];
            if rhs.is_below_zero() && min_row.is_none_or(|p| *rhs < self.data[p][rhs_col]) {
                min_row = Some(i);
            }
        }

        min_row
    }

    /// Ratio test over the negative entries of the pivot row, minimizing
    /// `reduced cost / -entry` so the objective row stays dual feasible.
    fn find_pivot_column(&self, row: usize) -> Option<usize> {
        let obj_row = self.obj_row();
        let mut min_ratio: Option<T> = None;
        let mut min_col = None;

        for j in 0..self.rhs_col() {
            let val = &self.data[row][j];
            if val.is_below_zero() {
                let ratio = self.data[obj_row][j].clone() / -val.clone();
                if min_ratio.as_ref().is_none_or(|best| ratio < *best) {
                    min_ratio = Some(ratio);
                    min_col = Some(j);
                }
            }
        }

        min_col
    }

    fn pivot(&mut self, row: usize, col: usize) {
        let n_rows = self.data.len();
        let n_cols = self.data[0].len();

        // Update basic variable
        self.basic_vars[row] = col;

        // Scale pivot row
        let pivot_val = self.data[row][col].clone();
        for j in 0..n_cols {
            self.data[row][j] = self.data[row][j].clone() / pivot_val.clone();
        }

        // Eliminate column in other rows
        let pivot_row = self.data[row].clone();
        for i in 0..n_rows {
            if i == row {
                continue;
            }
            let factor = self.data[i][col].clone();
            if factor.is_zero() {
                continue;
            }
            for (j, p) in pivot_row.iter().enumerate() {
                self.data[i][j] = self.data[i][j].clone() - factor.clone() * p.clone();
            }
        }
    }

    fn extract(&self, costs: &[T]) -> Relaxation<T> {
        let rhs_col = self.rhs_col();

        let mut values = vec![T::zero(); self.n_vars];
        for (i, &basic) in self.basic_vars.iter().enumerate() {
            if basic < self.n_vars {
                values[basic] = self.data[i][rhs_col].clone();
            }
        }

        let objective = costs
            .iter()
            .zip(&values)
            .fold(T::zero(), |acc, (c, x)| acc + c.clone() * x.clone());

        Relaxation { objective, values }
    }
}
