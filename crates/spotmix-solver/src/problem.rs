use crate::solution::ConstraintViolation;

/// Handle to a variable of an [`LpProblem`], valid only for the problem that issued it
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub(crate) usize);

impl VarId {
    /// Position of the variable in insertion order
    pub fn index(self) -> usize {
        self.0
    }
}

/// A continuous variable with box bounds
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    /// Lower bound, always finite
    pub lower: f64,
    /// Upper bound, may be `f64::INFINITY`
    pub upper: f64,
}

/// Represents a linear programming problem
#[derive(Debug, Clone)]
pub struct LpProblem {
    /// Variables in insertion order
    pub variables: Vec<Variable>,
    /// Objective function coefficients (costs)
    pub objective: Objective,
    /// Constraints
    pub constraints: Vec<Constraint>,
}

#[derive(Debug, Clone)]
pub struct Objective {
    /// Coefficients for each variable
    pub coefficients: Vec<f64>,
    /// Whether to minimize or maximize
    pub minimize: bool,
}

#[derive(Debug, Clone)]
pub struct Constraint {
    /// Name/label for the constraint (for diagnostics)
    pub name: String,
    /// Sparse left-hand side; a variable may appear more than once
    pub terms: Vec<(VarId, f64)>,
    /// Comparison operator
    pub op: ConstraintOp,
    /// Right-hand side value
    pub rhs: f64,
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

impl Constraint {
    /// Left-hand side evaluated at `values`
    pub fn activity(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|&(var, coef)| coef * values.get(var.0).copied().unwrap_or(0.0))
            .sum()
    }
}

impl Default for LpProblem {
    fn default() -> Self {
        Self::new()
    }
}

impl LpProblem {
    pub fn new() -> Self {
        Self {
            variables: Vec::new(),
            objective: Objective {
                coefficients: Vec::new(),
                minimize: true,
            },
            constraints: Vec::new(),
        }
    }

    pub fn add_variable(&mut self, name: impl Into<String>, lower: f64, upper: f64, cost: f64) -> VarId {
        let id = VarId(self.variables.len());
        self.variables.push(Variable {
            name: name.into(),
            lower,
            upper,
        });
        self.objective.coefficients.push(cost);
        id
    }

    /// Replace the whole objective; variables not named in `terms` get a zero coefficient
    pub fn set_objective(&mut self, terms: &[(VarId, f64)], minimize: bool) {
        let mut coefficients = vec![0.0; self.variables.len()];
        for &(var, coef) in terms {
            coefficients[var.0] += coef;
        }
        self.objective = Objective { coefficients, minimize };
    }

    pub fn add_constraint(&mut self, name: impl Into<String>, terms: Vec<(VarId, f64)>, op: ConstraintOp, rhs: f64) {
        self.constraints.push(Constraint {
            name: name.into(),
            terms,
            op,
            rhs,
        });
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Objective value of an arbitrary point
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.objective
            .coefficients
            .iter()
            .zip(values)
            .map(|(c, v)| c * v)
            .sum()
    }

    /// Bounds and constraints violated by `values`, worst first.
    ///
    /// `tolerance` is scaled by the magnitude of each bound or right-hand side, so
    /// large coverage floors are not held to an absolute 1e-9.
    pub fn violations(&self, values: &[f64], tolerance: f64) -> Vec<ConstraintViolation> {
        let mut violations = Vec::new();

        if values.len() != self.variables.len() {
            violations.push(ConstraintViolation {
                constraint: "dimension".to_string(),
                required: self.variables.len() as f64,
                actual: values.len() as f64,
                violation_amount: (self.variables.len() as f64 - values.len() as f64).abs(),
                description: format!(
                    "expected {} values but got {}",
                    self.variables.len(),
                    values.len()
                ),
            });
            return violations;
        }

        for (var, &value) in self.variables.iter().zip(values) {
            if value < var.lower - tolerance * var.lower.abs().max(1.0) {
                violations.push(ConstraintViolation {
                    constraint: var.name.clone(),
                    required: var.lower,
                    actual: value,
                    violation_amount: var.lower - value,
                    description: format!("{} is below its lower bound of {:.4}", var.name, var.lower),
                });
            } else if var.upper.is_finite() && value > var.upper + tolerance * var.upper.abs().max(1.0) {
                violations.push(ConstraintViolation {
                    constraint: var.name.clone(),
                    required: var.upper,
                    actual: value,
                    violation_amount: value - var.upper,
                    description: format!("{} exceeds its upper bound of {:.4}", var.name, var.upper),
                });
            }
        }

        for c in &self.constraints {
            let lhs = c.activity(values);
            let slack = tolerance * c.rhs.abs().max(1.0);

            let violation = match c.op {
                ConstraintOp::Le if lhs > c.rhs + slack => {
                    let amt = lhs - c.rhs;
                    Some((amt, format!("{} exceeds maximum of {:.2} by {:.4}", c.name, c.rhs, amt)))
                }
                ConstraintOp::Ge if lhs < c.rhs - slack => {
                    let amt = c.rhs - lhs;
                    Some((amt, format!("{} is below minimum of {:.2} by {:.4}", c.name, c.rhs, amt)))
                }
                ConstraintOp::Eq if (lhs - c.rhs).abs() > slack => {
                    let amt = (lhs - c.rhs).abs();
                    Some((amt, format!("{} requires exactly {:.2} but got {:.4}", c.name, c.rhs, lhs)))
                }
                _ => None,
            };

            if let Some((violation_amount, description)) = violation {
                violations.push(ConstraintViolation {
                    constraint: c.name.clone(),
                    required: c.rhs,
                    actual: lhs,
                    violation_amount,
                    description,
                });
            }
        }

        // Sort by violation amount (worst first)
        violations.sort_by(|a, b| {
            b.violation_amount
                .partial_cmp(&a.violation_amount)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_objective_replaces_costs() {
        let mut problem = LpProblem::new();
        let x = problem.add_variable("x", 0.0, f64::INFINITY, 3.0);
        let y = problem.add_variable("y", 0.0, f64::INFINITY, 2.0);
        problem.set_objective(&[(y, 1.0), (y, 0.5)], false);

        assert_eq!(problem.objective.coefficients, vec![0.0, 1.5]);
        assert!(!problem.objective.minimize);
        assert_eq!(x.index(), 0);
    }

    #[test]
    fn test_violations_sorted_worst_first() {
        let mut problem = LpProblem::new();
        let x = problem.add_variable("x", 0.0, 3.0, 1.0);
        let y = problem.add_variable("y", 0.0, f64::INFINITY, 1.0);
        problem.add_constraint("sum", vec![(x, 1.0), (y, 1.0)], ConstraintOp::Le, 4.0);
        problem.add_constraint("y_min", vec![(y, 1.0)], ConstraintOp::Ge, 1.0);

        let violations = problem.violations(&[5.0, 0.0], 1e-9);

        assert_eq!(violations.len(), 3);
        assert_eq!(violations[0].constraint, "x");
        assert!((violations[0].violation_amount - 2.0).abs() < 1e-9);
        assert_eq!(violations[1].constraint, "sum");
        assert_eq!(violations[2].constraint, "y_min");
    }

    #[test]
    fn test_violations_accepts_feasible_point() {
        let mut problem = LpProblem::new();
        let x = problem.add_variable("x", 0.0, 3.0, 1.0);
        problem.add_constraint("pin", vec![(x, 2.0)], ConstraintOp::Eq, 4.0);

        assert!(problem.violations(&[2.0], 1e-9).is_empty());
        assert_eq!(problem.violations(&[2.0, 1.0], 1e-9)[0].constraint, "dimension");
    }
}
