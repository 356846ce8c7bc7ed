mod branch_bound;
mod config;
mod engine;
mod enumerate;
mod lights;
mod presolve;
mod problem;
mod simplex;
mod solution;
pub mod tolerance;

pub use branch_bound::{BranchAndBound, NoopObserver, SearchObserver};
pub use config::{Arithmetic, Budget, SolverConfig, Strategy};
pub use engine::solve;
pub use enumerate::Echelon;
pub use lights::LightsPuzzle;
pub use presolve::{Estimate, estimate};
pub use problem::{Constraint, ConstraintOp, IlpProblem, Objective, Row};
pub use simplex::{LpFailure, Relaxation, Solver};
pub use solution::{IntegerSolution, Method, SearchStats, SolveError};
