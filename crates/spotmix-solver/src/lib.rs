mod model;
mod problem;
mod simplex;
mod solution;

pub use model::{Model, ModelError};
pub use problem::{Constraint, ConstraintOp, LpProblem, Objective, VarId, Variable};
pub use simplex::Solver;
pub use solution::{BasisStatus, ConstraintViolation, Solution, SolutionStatus};
