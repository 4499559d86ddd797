/// The result of solving an LP problem
#[derive(Debug, Clone)]
pub struct Solution {
    /// Solution status
    pub status: SolutionStatus,
    /// Value of every variable at the returned point (empty when there is no point)
    pub values: Vec<f64>,
    /// Objective value at the returned point
    pub objective_value: f64,
    /// Basis membership of every variable
    pub basis: Vec<BasisStatus>,
    /// Reduced cost of every variable, in the problem's own objective sense.
    /// Basic variables always report 0.
    pub reduced_costs: Vec<f64>,
    /// Pivots plus bound flips over both phases
    pub iterations: usize,
    /// Iterations spent before the first feasible basis was reached
    pub phase_one_iterations: usize,
    /// Whether `values` satisfies every constraint
    pub primal_feasible: bool,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionStatus {
    /// An optimal solution was found
    Optimal,
    /// The problem is infeasible (no solution exists)
    Infeasible,
    /// The problem is unbounded
    Unbounded,
    /// The iteration limit stopped the solver before optimality was proven
    IterationLimit,
}

impl SolutionStatus {
    /// Returns true if the solve produced a point that can be read back
    pub fn has_point(&self) -> bool {
        matches!(self, SolutionStatus::Optimal | SolutionStatus::IterationLimit)
    }
}

impl std::fmt::Display for SolutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            SolutionStatus::Optimal => "optimal",
            SolutionStatus::Infeasible => "infeasible",
            SolutionStatus::Unbounded => "unbounded",
            SolutionStatus::IterationLimit => "iteration limit reached",
        };
        f.write_str(label)
    }
}

/// Position of a variable relative to the final simplex basis
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasisStatus {
    Basic,
    /// Nonbasic, held at its lower bound
    AtLower,
    /// Nonbasic, held at its upper bound
    AtUpper,
}

impl BasisStatus {
    pub fn is_basic(&self) -> bool {
        matches!(self, BasisStatus::Basic)
    }
}

/// Information about a violated bound or constraint
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct ConstraintViolation {
    /// Constraint (or variable) name
    pub constraint: String,
    /// Required value (from constraint RHS or the bound)
    pub required: f64,
    /// Actual value achieved
    pub actual: f64,
    /// How much the constraint is violated by
    pub violation_amount: f64,
    /// Human-readable description of what's wrong
    pub description: String,
}

impl Solution {
    pub fn infeasible(iterations: usize, phase_one_iterations: usize) -> Self {
        Self::without_point(SolutionStatus::Infeasible, f64::INFINITY, iterations, phase_one_iterations)
    }

    pub fn unbounded(iterations: usize, phase_one_iterations: usize) -> Self {
        Self::without_point(SolutionStatus::Unbounded, f64::NEG_INFINITY, iterations, phase_one_iterations)
    }

    fn without_point(
        status: SolutionStatus,
        objective_value: f64,
        iterations: usize,
        phase_one_iterations: usize,
    ) -> Self {
        Self {
            status,
            values: Vec::new(),
            objective_value,
            basis: Vec::new(),
            reduced_costs: Vec::new(),
            iterations,
            phase_one_iterations,
            primal_feasible: false,
        }
    }
}
