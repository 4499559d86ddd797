use thiserror::Error;
use tracing::debug;

use crate::problem::{ConstraintOp, LpProblem, VarId};
use crate::simplex::Solver;
use crate::solution::{BasisStatus, Solution, SolutionStatus};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Variable {name} has invalid bounds [{lower}, {upper}]")]
    InvalidBounds { name: String, lower: f64, upper: f64 },
    #[error("Unknown variable handle #{0}")]
    UnknownVariable(usize),
    #[error("Model has not been optimized since it was built or reset")]
    NoSolution,
    #[error("Last solve ended {0} and produced no point")]
    NoPoint(SolutionStatus),
}

/// A mutable LP model: variables, constraints, objective and solver parameters,
/// plus the result of the last [`Model::optimize`] call.
#[derive(Debug, Clone, Default)]
pub struct Model {
    problem: LpProblem,
    iteration_limit: Option<usize>,
    solution: Option<Solution>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a continuous variable. The lower bound must be finite.
    pub fn add_var(&mut self, lower: f64, upper: f64, obj: f64, name: impl Into<String>) -> Result<VarId, ModelError> {
        let name = name.into();
        if !lower.is_finite() || upper.is_nan() || lower > upper {
            return Err(ModelError::InvalidBounds { name, lower, upper });
        }
        self.solution = None;
        Ok(self.problem.add_variable(name, lower, upper, obj))
    }

    pub fn add_constr(
        &mut self,
        terms: Vec<(VarId, f64)>,
        op: ConstraintOp,
        rhs: f64,
        name: impl Into<String>,
    ) -> Result<usize, ModelError> {
        self.check_vars(&terms)?;
        self.solution = None;
        self.problem.add_constraint(name, terms, op, rhs);
        Ok(self.problem.num_constraints() - 1)
    }

    /// Replace the objective. Variables missing from `terms` get coefficient 0.
    pub fn set_objective(&mut self, terms: &[(VarId, f64)], minimize: bool) -> Result<(), ModelError> {
        self.check_vars(terms)?;
        self.solution = None;
        self.problem.set_objective(terms, minimize);
        Ok(())
    }

    pub fn set_iteration_limit(&mut self, limit: Option<usize>) {
        self.iteration_limit = limit;
    }

    /// Discard the last result so the next `optimize` starts from scratch
    pub fn reset(&mut self) {
        self.solution = None;
    }

    pub fn optimize(&mut self) -> SolutionStatus {
        let solution = Solver::new()
            .with_max_iterations(self.iteration_limit)
            .solve(&self.problem);
        debug!(
            vars = self.problem.num_variables(),
            constrs = self.problem.num_constraints(),
            status = %solution.status,
            iterations = solution.iterations,
            "model optimized"
        );
        let status = solution.status;
        self.solution = Some(solution);
        status
    }

    pub fn value(&self, var: VarId) -> Result<f64, ModelError> {
        Ok(self.point()?.values[self.index(var)?])
    }

    pub fn values(&self) -> Result<&[f64], ModelError> {
        Ok(&self.point()?.values)
    }

    pub fn basis_status(&self, var: VarId) -> Result<BasisStatus, ModelError> {
        Ok(self.point()?.basis[self.index(var)?])
    }

    pub fn reduced_cost(&self, var: VarId) -> Result<f64, ModelError> {
        Ok(self.point()?.reduced_costs[self.index(var)?])
    }

    pub fn objective_value(&self) -> Result<f64, ModelError> {
        Ok(self.point()?.objective_value)
    }

    pub fn is_primal_feasible(&self) -> Result<bool, ModelError> {
        Ok(self.point()?.primal_feasible)
    }

    /// Iterations consumed by the last solve, including unsuccessful ones
    pub fn iteration_count(&self) -> Result<usize, ModelError> {
        self.solution
            .as_ref()
            .map(|s| s.iterations)
            .ok_or(ModelError::NoSolution)
    }

    pub fn phase_one_iterations(&self) -> Result<usize, ModelError> {
        self.solution
            .as_ref()
            .map(|s| s.phase_one_iterations)
            .ok_or(ModelError::NoSolution)
    }

    pub fn num_vars(&self) -> usize {
        self.problem.num_variables()
    }

    pub fn num_constrs(&self) -> usize {
        self.problem.num_constraints()
    }

    pub fn var_name(&self, var: VarId) -> Result<&str, ModelError> {
        Ok(&self.problem.variables[self.index(var)?].name)
    }

    pub fn constr_name(&self, index: usize) -> Option<&str> {
        self.problem.constraints.get(index).map(|c| c.name.as_str())
    }

    pub fn problem(&self) -> &LpProblem {
        &self.problem
    }

    fn point(&self) -> Result<&Solution, ModelError> {
        let solution = self.solution.as_ref().ok_or(ModelError::NoSolution)?;
        if solution.status.has_point() {
            Ok(solution)
        } else {
            Err(ModelError::NoPoint(solution.status))
        }
    }

    fn index(&self, var: VarId) -> Result<usize, ModelError> {
        if var.0 < self.problem.num_variables() {
            Ok(var.0)
        } else {
            Err(ModelError::UnknownVariable(var.0))
        }
    }

    fn check_vars(&self, terms: &[(VarId, f64)]) -> Result<(), ModelError> {
        terms.iter().try_for_each(|&(var, _)| self.index(var).map(|_| ()))
    }
}
