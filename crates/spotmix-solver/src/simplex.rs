use tracing::{debug, trace};

use crate::problem::{ConstraintOp, LpProblem};
use crate::solution::{BasisStatus, Solution, SolutionStatus};

/// Steps shorter than this count as degenerate pivots
const DEGENERATE_STEP: f64 = 1e-12;

/// Consecutive degenerate pivots tolerated before falling back to Bland's rule
const BLAND_AFTER: usize = 50;

/// Bounded-variable two-phase primal simplex
pub struct Solver {
    /// Iteration budget shared by both phases; `None` means unlimited
    max_iterations: Option<usize>,
    /// Tolerance for reduced costs and pivot elements
    tolerance: f64,
    /// Largest artificial sum accepted as feasible at the end of phase 1
    feasibility_tolerance: f64,
}

impl Default for Solver {
    fn default() -> Self {
        Self {
            max_iterations: None,
            tolerance: 1e-9,
            feasibility_tolerance: 1e-7,
        }
    }
}

enum PhaseOutcome {
    Optimal,
    Unbounded,
    IterationLimit,
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: Option<usize>) -> Self {
        self.max_iterations = max;
        self
    }

    /// Solve the LP problem using the two-phase simplex method
    pub fn solve(&self, problem: &LpProblem) -> Solution {
        let mut tableau = Tableau::new(problem);
        let mut iterations = 0;
        let mut phase_one_iterations = 0;
        let mut status = SolutionStatus::Optimal;
        let mut primal_feasible = true;

        // Phase 1: drive the artificials out of the starting basis
        if tableau.n_artificial > 0 {
            let costs = tableau.phase_one_costs();
            let outcome = self.run(&mut tableau, &costs, &mut iterations);
            phase_one_iterations = iterations;
            let infeasibility = tableau.artificial_infeasibility();
            debug!(
                iterations,
                infeasibility,
                artificials = tableau.n_artificial,
                "phase 1 finished"
            );

            match outcome {
                PhaseOutcome::IterationLimit => {
                    status = SolutionStatus::IterationLimit;
                    primal_feasible = infeasibility <= self.feasibility_tolerance;
                }
                // Unbounded in phase 1 cannot lower a sum of non-negative artificials
                // below zero, so it means the problem itself is infeasible
                PhaseOutcome::Unbounded => {
                    return Solution::infeasible(iterations, phase_one_iterations);
                }
                PhaseOutcome::Optimal if infeasibility > self.feasibility_tolerance => {
                    return Solution::infeasible(iterations, phase_one_iterations);
                }
                PhaseOutcome::Optimal => {}
            }

            tableau.fix_artificials();
        }

        // Phase 2: optimize the real objective
        if status == SolutionStatus::Optimal {
            let costs = tableau.costs.clone();
            match self.run(&mut tableau, &costs, &mut iterations) {
                PhaseOutcome::Optimal => {}
                PhaseOutcome::IterationLimit => status = SolutionStatus::IterationLimit,
                PhaseOutcome::Unbounded => {
                    debug!(iterations, "phase 2 found an unbounded ray");
                    return Solution::unbounded(iterations, phase_one_iterations);
                }
            }
            debug!(iterations, status = %status, "phase 2 finished");
        }

        tableau.extract(problem, status, primal_feasible, iterations, phase_one_iterations)
    }

    fn run(&self, tableau: &mut Tableau, costs: &[f64], iterations: &mut usize) -> PhaseOutcome {
        let mut reduced = tableau.reduced_costs(costs);
        let mut degenerate_streak = 0;

        loop {
            let Some((entering, direction)) =
                self.find_entering(tableau, &reduced, degenerate_streak > BLAND_AFTER)
            else {
                return PhaseOutcome::Optimal;
            };
            if self.max_iterations.is_some_and(|limit| *iterations >= limit) {
                return PhaseOutcome::IterationLimit;
            }

            let (step, leaving_row) = self.find_leaving_row(tableau, entering, direction);
            let span = tableau.upper[entering] - tableau.lower[entering];

            if span <= step {
                if span == f64::INFINITY {
                    return PhaseOutcome::Unbounded;
                }
                tableau.flip(entering, direction, span);
                *iterations += 1;
                degenerate_streak = 0;
                trace!(column = entering, "bound flip");
                continue;
            }

            let Some(row) = leaving_row else {
                return PhaseOutcome::Unbounded;
            };
            degenerate_streak = if step <= DEGENERATE_STEP {
                degenerate_streak + 1
            } else {
                0
            };
            trace!(column = entering, row, step, "pivot");
            tableau.pivot(row, entering, direction, step, &mut reduced);
            *iterations += 1;
        }
    }

    /// Pick the entering column and the direction it moves in (+1 up, -1 down).
    ///
    /// Dantzig's rule, lowest index on ties; with `bland` set, the first improving
    /// column wins.
    fn find_entering(&self, tableau: &Tableau, reduced: &[f64], bland: bool) -> Option<(usize, f64)> {
        let mut best = 0.0;
        let mut choice = None;

        for j in 0..tableau.n_structural {
            if tableau.is_basic[j] || tableau.lower[j] == tableau.upper[j] {
                continue;
            }
            let (score, direction) = if !tableau.at_upper[j] && reduced[j] < -self.tolerance {
                (-reduced[j], 1.0)
            } else if tableau.at_upper[j] && reduced[j] > self.tolerance {
                (reduced[j], -1.0)
            } else {
                continue;
            };

            if bland {
                return Some((j, direction));
            }
            if score > best {
                best = score;
                choice = Some((j, direction));
            }
        }

        choice
    }

    /// Ratio test: the longest step the entering column can take before a basic
    /// variable hits one of its bounds. Ties go to the lowest basic column.
    fn find_leaving_row(&self, tableau: &Tableau, col: usize, direction: f64) -> (f64, Option<usize>) {
        let mut min_ratio = f64::INFINITY;
        let mut min_row: Option<usize> = None;

        for (i, row) in tableau.rows.iter().enumerate() {
            let alpha = row[col] * direction;
            let basic = tableau.basis[i];
            let ratio = if alpha > self.tolerance {
                (tableau.beta[i] - tableau.lower[basic]) / alpha
            } else if alpha < -self.tolerance {
                if tableau.upper[basic] == f64::INFINITY {
                    continue;
                }
                (tableau.upper[basic] - tableau.beta[i]) / -alpha
            } else {
                continue;
            };
            let ratio = ratio.max(0.0);

            let better = ratio < min_ratio - DEGENERATE_STEP
                || ((ratio - min_ratio).abs() <= DEGENERATE_STEP
                    && min_row.is_some_and(|r| basic < tableau.basis[r]));
            if better {
                min_ratio = ratio;
                min_row = Some(i);
            }
        }

        (min_ratio, min_row)
    }
}

/// Dense tableau over structural columns (problem variables, then one internal
/// slack per inequality row) followed by artificial columns.
struct Tableau {
    /// B^-1 A, one row per constraint
    rows: Vec<Vec<f64>>,
    /// Current value of the basic variable of each row
    beta: Vec<f64>,
    basis: Vec<usize>,
    is_basic: Vec<bool>,
    at_upper: Vec<bool>,
    lower: Vec<f64>,
    upper: Vec<f64>,
    /// Phase 2 costs, already negated for maximization
    costs: Vec<f64>,
    n_vars: usize,
    n_structural: usize,
    n_artificial: usize,
    sense: f64,
}

impl Tableau {
    fn new(problem: &LpProblem) -> Self {
        let n_vars = problem.num_variables();
        let n_rows = problem.num_constraints();
        let sense = if problem.objective.minimize { 1.0 } else { -1.0 };

        let mut dense = vec![vec![0.0; n_vars]; n_rows];
        for (i, c) in problem.constraints.iter().enumerate() {
            for &(var, coef) in &c.terms {
                dense[i][var.index()] += coef;
            }
        }
        let mut nonzeros = vec![0usize; n_vars];
        for row in &dense {
            for (j, &v) in row.iter().enumerate() {
                if v != 0.0 {
                    nonzeros[j] += 1;
                }
            }
        }

        let n_slack = problem
            .constraints
            .iter()
            .filter(|c| c.op != ConstraintOp::Eq)
            .count();
        let n_structural = n_vars + n_slack;

        let mut lower: Vec<f64> = problem.variables.iter().map(|v| v.lower).collect();
        let mut upper: Vec<f64> = problem.variables.iter().map(|v| v.upper).collect();
        let mut costs: Vec<f64> = problem
            .objective
            .coefficients
            .iter()
            .map(|&c| sense * c)
            .collect();
        lower.resize(n_structural, 0.0);
        upper.resize(n_structural, f64::INFINITY);
        costs.resize(n_structural, 0.0);

        let mut rows = Vec::with_capacity(n_rows);
        let mut beta = Vec::with_capacity(n_rows);
        let mut basis = Vec::with_capacity(n_rows);
        let mut artificial_rows = Vec::new();
        let mut crashed = vec![false; n_vars];
        let mut slack_col = n_vars;

        for (i, c) in problem.constraints.iter().enumerate() {
            let mut row = dense[i].clone();
            row.resize(n_structural, 0.0);
            let mut residual = c.rhs - dense[i].iter().zip(&lower).map(|(a, l)| a * l).sum::<f64>();

            match c.op {
                ConstraintOp::Le | ConstraintOp::Ge => {
                    let col = slack_col;
                    slack_col += 1;
                    let is_le = c.op == ConstraintOp::Le;
                    row[col] = if is_le { 1.0 } else { -1.0 };
                    // The internal slack starts basic when it can absorb the residual
                    if (is_le && residual >= 0.0) || (!is_le && residual <= 0.0) {
                        if !is_le {
                            negate(&mut row);
                            residual = -residual;
                        }
                        rows.push(row);
                        beta.push(residual);
                        basis.push(col);
                        continue;
                    }
                }
                ConstraintOp::Eq => {
                    let crash = (0..n_vars).find(|&j| {
                        let a = dense[i][j];
                        if crashed[j] || nonzeros[j] != 1 || a == 0.0 {
                            return false;
                        }
                        let value = lower[j] + residual / a;
                        value >= lower[j] && value <= upper[j]
                    });
                    if let Some(j) = crash {
                        crashed[j] = true;
                        let a = dense[i][j];
                        for v in row.iter_mut() {
                            *v /= a;
                        }
                        rows.push(row);
                        beta.push(lower[j] + residual / a);
                        basis.push(j);
                        continue;
                    }
                }
            }

            // RHS (ensure non-negative)
            if residual < 0.0 {
                negate(&mut row);
                residual = -residual;
            }
            rows.push(row);
            beta.push(residual);
            basis.push(usize::MAX);
            artificial_rows.push(i);
        }

        let n_artificial = artificial_rows.len();
        let total = n_structural + n_artificial;
        for row in rows.iter_mut() {
            row.resize(total, 0.0);
        }
        for (k, &i) in artificial_rows.iter().enumerate() {
            rows[i][n_structural + k] = 1.0;
            basis[i] = n_structural + k;
        }
        lower.resize(total, 0.0);
        upper.resize(total, f64::INFINITY);
        costs.resize(total, 0.0);

        let mut is_basic = vec![false; total];
        for &b in &basis {
            is_basic[b] = true;
        }

        Tableau {
            rows,
            beta,
            basis,
            is_basic,
            at_upper: vec![false; total],
            lower,
            upper,
            costs,
            n_vars,
            n_structural,
            n_artificial,
            sense,
        }
    }

    fn total_cols(&self) -> usize {
        self.n_structural + self.n_artificial
    }

    fn phase_one_costs(&self) -> Vec<f64> {
        (0..self.total_cols())
            .map(|j| if j >= self.n_structural { 1.0 } else { 0.0 })
            .collect()
    }

    fn artificial_infeasibility(&self) -> f64 {
        self.basis
            .iter()
            .zip(&self.beta)
            .filter(|&(&b, _)| b >= self.n_structural)
            .map(|(_, &v)| v)
            .sum()
    }

    /// Pin artificials to zero so phase 2 can only push remaining basic ones out
    fn fix_artificials(&mut self) {
        for j in self.n_structural..self.total_cols() {
            self.upper[j] = 0.0;
        }
    }

    fn nonbasic_value(&self, col: usize) -> f64 {
        if self.at_upper[col] {
            self.upper[col]
        } else {
            self.lower[col]
        }
    }

    /// c_j - c_B B^-1 a_j for every column, exactly 0 on basic columns
    fn reduced_costs(&self, costs: &[f64]) -> Vec<f64> {
        let mut reduced: Vec<f64> = (0..self.total_cols())
            .map(|j| {
                costs[j]
                    - self
                        .rows
                        .iter()
                        .zip(&self.basis)
                        .map(|(row, &b)| costs[b] * row[j])
                        .sum::<f64>()
            })
            .collect();
        for &b in &self.basis {
            reduced[b] = 0.0;
        }
        reduced
    }

    fn flip(&mut self, col: usize, direction: f64, span: f64) {
        for (row, beta) in self.rows.iter().zip(self.beta.iter_mut()) {
            *beta -= row[col] * direction * span;
        }
        self.at_upper[col] = !self.at_upper[col];
    }

    fn pivot(&mut self, row: usize, col: usize, direction: f64, step: f64, reduced: &mut [f64]) {
        let entering_value = self.nonbasic_value(col) + direction * step;
        for (r, beta) in self.rows.iter().zip(self.beta.iter_mut()) {
            *beta -= r[col] * direction * step;
        }

        let leaving = self.basis[row];
        self.at_upper[leaving] = self.rows[row][col] * direction < 0.0;
        self.beta[row] = entering_value;

        // Scale pivot row
        let pivot_val = self.rows[row][col];
        for v in self.rows[row].iter_mut() {
            *v /= pivot_val;
        }

        // Eliminate column in other rows
        let pivot_row = self.rows[row].clone();
        for (i, r) in self.rows.iter_mut().enumerate() {
            if i != row && r[col] != 0.0 {
                let factor = r[col];
                for (v, p) in r.iter_mut().zip(&pivot_row) {
                    *v -= factor * p;
                }
            }
        }
        let factor = reduced[col];
        for (v, p) in reduced.iter_mut().zip(&pivot_row) {
            *v -= factor * p;
        }

        self.basis[row] = col;
        self.is_basic[leaving] = false;
        self.is_basic[col] = true;
        self.at_upper[col] = false;
    }

    fn extract(
        &self,
        problem: &LpProblem,
        status: SolutionStatus,
        primal_feasible: bool,
        iterations: usize,
        phase_one_iterations: usize,
    ) -> Solution {
        let mut values: Vec<f64> = (0..self.n_vars).map(|j| self.nonbasic_value(j)).collect();
        for (&b, &v) in self.basis.iter().zip(&self.beta) {
            if b < self.n_vars {
                values[b] = v;
            }
        }

        let reduced = self.reduced_costs(&self.costs);
        let basis = (0..self.n_vars)
            .map(|j| {
                if self.is_basic[j] {
                    BasisStatus::Basic
                } else if self.at_upper[j] {
                    BasisStatus::AtUpper
                } else {
                    BasisStatus::AtLower
                }
            })
            .collect();
        let reduced_costs = (0..self.n_vars)
            .map(|j| if self.is_basic[j] { 0.0 } else { self.sense * reduced[j] })
            .collect();

        Solution {
            status,
            objective_value: problem.evaluate(&values),
            values,
            basis,
            reduced_costs,
            iterations,
            phase_one_iterations,
            primal_feasible,
        }
    }
}

fn negate(row: &mut [f64]) {
    for v in row.iter_mut() {
        *v = -*v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::LpProblem;

    #[test]
    fn test_simple_maximization() {
        // Maximize: 3x + 2y
        // Subject to:
        //   x + y <= 4
        //   x <= 3
        //   y <= 3
        //   x, y >= 0
        // Optimal: x=3, y=1, obj=11
        let mut problem = LpProblem::new();
        let x = problem.add_variable("x", 0.0, f64::INFINITY, 3.0);
        let y = problem.add_variable("y", 0.0, f64::INFINITY, 2.0);
        problem.set_objective(&[(x, 3.0), (y, 2.0)], false); // maximize
        problem.add_constraint("sum", vec![(x, 1.0), (y, 1.0)], ConstraintOp::Le, 4.0);
        problem.add_constraint("x_max", vec![(x, 1.0)], ConstraintOp::Le, 3.0);
        problem.add_constraint("y_max", vec![(y, 1.0)], ConstraintOp::Le, 3.0);

        let solver = Solver::new();
        let solution = solver.solve(&problem);

        println!("Status: {:?}", solution.status);
        println!("Values: {:?}", solution.values);
        println!("Objective: {}", solution.objective_value);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.values[0] - 3.0).abs() < 1e-6, "x = {} (expected 3)", solution.values[0]);
        assert!((solution.values[1] - 1.0).abs() < 1e-6, "y = {} (expected 1)", solution.values[1]);
        assert!((solution.objective_value - 11.0).abs() < 1e-6, "obj = {} (expected 11)", solution.objective_value);
        assert_eq!(solution.iterations, 2);
        assert_eq!(solution.phase_one_iterations, 0);
        assert!(solution.primal_feasible);
    }

    #[test]
    fn test_minimization_with_ge() {
        // Minimize: 2x + 3y
        // Subject to:
        //   x + y >= 4
        //   x <= 3
        //   y <= 3
        //   x, y >= 0
        // Optimal: x=3, y=1, obj=9
        let mut problem = LpProblem::new();
        let x = problem.add_variable("x", 0.0, f64::INFINITY, 2.0);
        let y = problem.add_variable("y", 0.0, f64::INFINITY, 3.0);
        problem.add_constraint("sum", vec![(x, 1.0), (y, 1.0)], ConstraintOp::Ge, 4.0);
        problem.add_constraint("x_max", vec![(x, 1.0)], ConstraintOp::Le, 3.0);
        problem.add_constraint("y_max", vec![(y, 1.0)], ConstraintOp::Le, 3.0);

        let solver = Solver::new();
        let solution = solver.solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.values[0] - 3.0).abs() < 1e-6, "x = {} (expected 3)", solution.values[0]);
        assert!((solution.values[1] - 1.0).abs() < 1e-6, "y = {} (expected 1)", solution.values[1]);
        assert!((solution.objective_value - 9.0).abs() < 1e-6, "obj = {} (expected 9)", solution.objective_value);
        assert!(solution.phase_one_iterations > 0);
    }

    #[test]
    fn test_infeasible() {
        // x >= 5
        // x <= 3
        let mut problem = LpProblem::new();
        let x = problem.add_variable("x", 0.0, f64::INFINITY, 1.0);
        problem.add_constraint("lower", vec![(x, 1.0)], ConstraintOp::Ge, 5.0);
        problem.add_constraint("upper", vec![(x, 1.0)], ConstraintOp::Le, 3.0);

        let solver = Solver::new();
        let solution = solver.solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Infeasible);
        assert!(solution.values.is_empty());
    }

    #[test]
    fn test_unbounded() {
        // Maximize x subject to x - y <= 1
        let mut problem = LpProblem::new();
        let x = problem.add_variable("x", 0.0, f64::INFINITY, 1.0);
        let y = problem.add_variable("y", 0.0, f64::INFINITY, 0.0);
        problem.set_objective(&[(x, 1.0)], false);
        problem.add_constraint("ray", vec![(x, 1.0), (y, -1.0)], ConstraintOp::Le, 1.0);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Unbounded);
    }

    #[test]
    fn test_variable_held_at_upper_bound() {
        // Same optimum as test_simple_maximization, with the caps moved into bounds:
        // x finishes nonbasic at its upper bound and keeps a positive reduced cost
        let mut problem = LpProblem::new();
        let x = problem.add_variable("x", 0.0, 3.0, 3.0);
        let y = problem.add_variable("y", 0.0, 3.0, 2.0);
        problem.set_objective(&[(x, 3.0), (y, 2.0)], false);
        problem.add_constraint("sum", vec![(x, 1.0), (y, 1.0)], ConstraintOp::Le, 4.0);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.values[0] - 3.0).abs() < 1e-6);
        assert!((solution.values[1] - 1.0).abs() < 1e-6);
        assert_eq!(solution.basis[0], BasisStatus::AtUpper);
        assert_eq!(solution.basis[1], BasisStatus::Basic);
        assert!((solution.reduced_costs[0] - 1.0).abs() < 1e-6);
        assert_eq!(solution.reduced_costs[1], 0.0);
    }

    #[test]
    fn test_iteration_limit_returns_intermediate_vertex() {
        let mut problem = LpProblem::new();
        let x = problem.add_variable("x", 0.0, f64::INFINITY, 3.0);
        let y = problem.add_variable("y", 0.0, f64::INFINITY, 2.0);
        problem.set_objective(&[(x, 3.0), (y, 2.0)], false);
        problem.add_constraint("sum", vec![(x, 1.0), (y, 1.0)], ConstraintOp::Le, 4.0);
        problem.add_constraint("x_max", vec![(x, 1.0)], ConstraintOp::Le, 3.0);
        problem.add_constraint("y_max", vec![(y, 1.0)], ConstraintOp::Le, 3.0);

        let solution = Solver::new().with_max_iterations(Some(1)).solve(&problem);

        assert_eq!(solution.status, SolutionStatus::IterationLimit);
        assert_eq!(solution.iterations, 1);
        assert!(solution.primal_feasible);
        assert!((solution.values[0] - 3.0).abs() < 1e-6);
        assert!(solution.values[1].abs() < 1e-6);
        assert!((solution.objective_value - 9.0).abs() < 1e-6);
        assert!(problem.violations(&solution.values, 1e-9).is_empty());
    }

    #[test]
    fn test_zero_iteration_limit_keeps_starting_point() {
        let mut problem = LpProblem::new();
        let x = problem.add_variable("x", 0.0, 2.0, 1.0);
        problem.set_objective(&[(x, 1.0)], false);

        let solution = Solver::new().with_max_iterations(Some(0)).solve(&problem);

        assert_eq!(solution.status, SolutionStatus::IterationLimit);
        assert_eq!(solution.iterations, 0);
        assert_eq!(solution.values, vec![0.0]);
    }

    #[test]
    fn test_equality_row_uses_crash_column() {
        // Both columns are singletons; x is the first whose implied value fits its
        // bounds, so it starts basic and no phase 1 runs
        let mut problem = LpProblem::new();
        let x = problem.add_variable("x", 0.0, 4.0, -1.0);
        let s = problem.add_variable("s", 0.0, f64::INFINITY, 0.0);
        problem.add_constraint("cap", vec![(x, 2.0), (s, 1.0)], ConstraintOp::Eq, 6.0);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert_eq!(solution.phase_one_iterations, 0);
        assert!((solution.values[0] - 3.0).abs() < 1e-6);
        assert!(solution.values[1].abs() < 1e-6);
        assert!((solution.objective_value + 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_tied_objective_leaves_zero_reduced_cost() {
        // Maximize x + y subject to x + y <= 4: every point on the face is optimal
        let mut problem = LpProblem::new();
        let x = problem.add_variable("x", 0.0, f64::INFINITY, 1.0);
        let y = problem.add_variable("y", 0.0, f64::INFINITY, 1.0);
        problem.set_objective(&[(x, 1.0), (y, 1.0)], false);
        problem.add_constraint("sum", vec![(x, 1.0), (y, 1.0)], ConstraintOp::Le, 4.0);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.objective_value - 4.0).abs() < 1e-6);
        let nonbasic: Vec<usize> = (0..2).filter(|&j| !solution.basis[j].is_basic()).collect();
        assert_eq!(nonbasic.len(), 1);
        assert!(solution.reduced_costs[nonbasic[0]].abs() < 1e-9);
    }
}
