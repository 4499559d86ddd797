use spotmix_solver::{ConstraintOp, Model, VarId};
use tracing::debug;

use crate::error::{AnalysisError, Stage};
use crate::instance::ProblemDefinition;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelVariant {
    /// Minimise the coverage imbalance between the two halves of the day
    Primal,
    /// Minimise the penalties added to the slot and coverage rows
    Auxiliary,
}

/// An engine model built from a [`ProblemDefinition`], with handles to every
/// variable the analysis reads back.
#[derive(Debug)]
pub struct AllocationModel {
    pub model: Model,
    pub variant: ModelVariant,
    /// `x[i][j]`: units bought from outlet `i` in slot `j`
    pub x: Vec<Vec<VarId>>,
    /// One per budget row, then one per slot row, then the coverage row
    pub slack: Vec<VarId>,
    /// Epigraph variable of the minimax objective
    pub deviation: VarId,
    /// Auxiliary variant only, aligned with `slack`
    pub penalty: Option<Vec<VarId>>,
}

impl AllocationModel {
    /// Variables in layout order: `x` row-major, slacks, the deviation, then penalties
    pub fn tracked(&self) -> Vec<VarId> {
        self.x
            .iter()
            .flatten()
            .chain(&self.slack)
            .chain(std::iter::once(&self.deviation))
            .chain(self.penalty.iter().flatten())
            .copied()
            .collect()
    }

    /// `(outlets, slots)` of the instance the model was built from
    pub fn size(&self) -> (usize, usize) {
        (self.x.len(), self.x.first().map_or(0, Vec::len))
    }

    /// Length of the layout shared by both variants
    pub fn shared_len(&self) -> usize {
        self.x.iter().map(Vec::len).sum::<usize>() + self.slack.len() + 1
    }

    /// Each slack's position in [`AllocationModel::tracked`] paired with the name of
    /// its row. Slack `k` belongs to row `k`.
    pub fn slack_constraints(&self) -> Vec<(usize, String)> {
        let offset: usize = self.x.iter().map(Vec::len).sum();
        (0..self.slack.len())
            .filter_map(|k| {
                self.model
                    .constr_name(k)
                    .map(|name| (offset + k, name.to_string()))
            })
            .collect()
    }
}

pub fn budget_row_name(outlet: usize) -> String {
    format!("c_max_budget_{}", outlet + 1)
}

pub fn slot_row_name(slot: usize) -> String {
    format!("c_min_budget_{}", slot + 1)
}

pub const COVERAGE_ROW: &str = "c_coverage";
pub const DEVIATION_ROWS: [&str; 2] = ["c_aux1", "c_aux2"];

/// Build the allocation model for `problem`.
///
/// Both variants share the same variables and rows up to the deviation, so the
/// first [`AllocationModel::shared_len`] values of any two solutions line up.
pub fn build(problem: &ProblemDefinition, variant: ModelVariant) -> Result<AllocationModel, AnalysisError> {
    problem.validate()?;

    let m = problem.outlets();
    let k = problem.slots();
    let auxiliary = variant == ModelVariant::Auxiliary;
    let engine = AnalysisError::engine(Stage::ModelBuild, m, k);
    let mut model = Model::new();

    // Decision variables
    let mut x = Vec::with_capacity(m);
    for (i, caps) in problem.capacity.iter().enumerate() {
        let row = caps
            .iter()
            .enumerate()
            .map(|(j, &cap)| model.add_var(0.0, cap, 0.0, format!("x_{}_{}", i + 1, j + 1)))
            .collect::<Result<Vec<_>, _>>()
            .map_err(engine)?;
        x.push(row);
    }

    let slack = (0..problem.slack_count())
        .map(|s| model.add_var(0.0, f64::INFINITY, 0.0, format!("s_{s}")))
        .collect::<Result<Vec<_>, _>>()
        .map_err(engine)?;

    let deviation = model
        .add_var(0.0, f64::INFINITY, 0.0, "aux")
        .map_err(engine)?;

    let penalty = if auxiliary {
        let vars = (0..problem.slack_count())
            .map(|s| model.add_var(0.0, f64::INFINITY, 0.0, format!("a_{s}")))
            .collect::<Result<Vec<_>, _>>()
            .map_err(engine)?;
        Some(vars)
    } else {
        None
    };
    let penalty_term = |row: usize| penalty.as_ref().map(|p| (p[row], 1.0));

    // Budget rows: spend + slack = ceiling
    for i in 0..m {
        let mut terms: Vec<(VarId, f64)> = (0..k).map(|j| (x[i][j], problem.unit_cost[i][j])).collect();
        terms.push((slack[i], 1.0));
        model
            .add_constr(terms, ConstraintOp::Eq, problem.max_budget[i], budget_row_name(i))
            .map_err(engine)?;
    }

    // Slot rows: spend - surplus (+ penalty) = floor
    let floor = problem.slot_spend_floor();
    for j in 0..k {
        let mut terms: Vec<(VarId, f64)> = (0..m).map(|i| (x[i][j], problem.unit_cost[i][j])).collect();
        terms.push((slack[m + j], -1.0));
        terms.extend(penalty_term(m + j));
        model
            .add_constr(terms, ConstraintOp::Eq, floor, slot_row_name(j))
            .map_err(engine)?;
    }

    // Coverage row
    let mut terms: Vec<(VarId, f64)> = coverage_terms(problem, &x, |_| 1.0);
    terms.push((slack[m + k], -1.0));
    terms.extend(penalty_term(m + k));
    model
        .add_constr(terms, ConstraintOp::Eq, problem.min_coverage, COVERAGE_ROW)
        .map_err(engine)?;

    // Epigraph rows: aux >= imbalance and aux >= -imbalance
    for (row, direction) in DEVIATION_ROWS.iter().zip([-1.0, 1.0]) {
        let mut terms = vec![(deviation, 1.0)];
        terms.extend(coverage_terms(problem, &x, |j| direction * problem.slot_sign(j)));
        model
            .add_constr(terms, ConstraintOp::Ge, 0.0, *row)
            .map_err(engine)?;
    }

    let objective: Vec<(VarId, f64)> = match &penalty {
        Some(p) => p.iter().map(|&v| (v, 1.0)).collect(),
        None => vec![(deviation, 1.0)],
    };
    model
        .set_objective(&objective, true)
        .map_err(engine)?;

    debug!(
        ?variant,
        outlets = m,
        slots = k,
        vars = model.num_vars(),
        constrs = model.num_constrs(),
        "allocation model built"
    );

    Ok(AllocationModel {
        model,
        variant,
        x,
        slack,
        deviation,
        penalty,
    })
}

/// `weight(j) * coverage[i][j]` for every `x[i][j]`, row-major
fn coverage_terms(
    problem: &ProblemDefinition,
    x: &[Vec<VarId>],
    weight: impl Fn(usize) -> f64,
) -> Vec<(VarId, f64)> {
    x.iter()
        .enumerate()
        .flat_map(|(i, row)| {
            row.iter()
                .enumerate()
                .map(|(j, &var)| (var, weight(j) * problem.unit_coverage[i][j]))
                .collect::<Vec<_>>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::uniform;
    use spotmix_solver::SolutionStatus;

    #[test]
    fn test_primal_layout() {
        let problem = uniform();
        let built = build(&problem, ModelVariant::Primal).unwrap();
        let model = &built.model;

        // 4 x, 5 slacks, 1 deviation
        assert_eq!(model.num_vars(), 10);
        assert_eq!(model.num_constrs(), 2 + 2 + 3);
        assert!(built.penalty.is_none());
        assert_eq!(built.shared_len(), 10);

        let names: Vec<&str> = built
            .tracked()
            .iter()
            .map(|&v| model.var_name(v).unwrap())
            .collect();
        assert_eq!(
            names,
            vec!["x_1_1", "x_1_2", "x_2_1", "x_2_2", "s_0", "s_1", "s_2", "s_3", "s_4", "aux"]
        );

        let rows: Vec<&str> = (0..model.num_constrs())
            .map(|r| model.constr_name(r).unwrap())
            .collect();
        assert_eq!(
            rows,
            vec![
                "c_max_budget_1",
                "c_max_budget_2",
                "c_min_budget_1",
                "c_min_budget_2",
                "c_coverage",
                "c_aux1",
                "c_aux2"
            ]
        );

        let objective = &model.problem().objective.coefficients;
        assert_eq!(objective[built.deviation.index()], 1.0);
        assert_eq!(objective.iter().sum::<f64>(), 1.0);
    }

    #[test]
    fn test_auxiliary_layout() {
        let problem = uniform();
        let built = build(&problem, ModelVariant::Auxiliary).unwrap();
        let model = &built.model;
        let penalty = built.penalty.as_ref().unwrap();

        assert_eq!(penalty.len(), problem.slack_count());
        assert_eq!(model.num_vars(), 15);
        assert_eq!(model.num_constrs(), 7);
        assert_eq!(built.tracked().len(), 15);
        assert_eq!(built.shared_len(), 10);
        assert_eq!(model.var_name(penalty[0]).unwrap(), "a_0");

        // Penalties reach the slot and coverage rows only
        let constraints = &model.problem().constraints;
        for (row, constraint) in constraints.iter().enumerate() {
            let penalised: Vec<usize> = constraint
                .terms
                .iter()
                .filter(|(v, _)| penalty.contains(v))
                .map(|(v, _)| v.index())
                .collect();
            match row {
                0 | 1 | 5 | 6 => assert!(penalised.is_empty(), "{}", constraint.name),
                r => assert_eq!(penalised, vec![penalty[r].index()], "{}", constraint.name),
            }
        }

        let objective = &model.problem().objective.coefficients;
        assert_eq!(objective[built.deviation.index()], 0.0);
        assert!(penalty.iter().all(|p| objective[p.index()] == 1.0));
    }

    #[test]
    fn test_epigraph_signs() {
        let problem = uniform();
        let built = build(&problem, ModelVariant::Primal).unwrap();
        let constraints = &built.model.problem().constraints;

        let coefficient = |row: usize, var: VarId| {
            constraints[row]
                .terms
                .iter()
                .find(|(v, _)| *v == var)
                .map(|(_, c)| *c)
        };

        // slot 1 is in the first half, slot 2 in the second
        assert_eq!(coefficient(5, built.x[0][0]), Some(-5.0));
        assert_eq!(coefficient(5, built.x[0][1]), Some(5.0));
        assert_eq!(coefficient(6, built.x[1][0]), Some(5.0));
        assert_eq!(coefficient(6, built.x[1][1]), Some(-5.0));
        assert_eq!(coefficient(6, built.deviation), Some(1.0));
    }

    #[test]
    fn test_slack_constraints_pair_rows() {
        let built = build(&uniform(), ModelVariant::Primal).unwrap();
        let pairs = built.slack_constraints();

        assert_eq!(pairs.len(), 5);
        assert_eq!(pairs[0], (4, "c_max_budget_1".to_string()));
        assert_eq!(pairs[2], (6, "c_min_budget_1".to_string()));
        assert_eq!(pairs[4], (8, "c_coverage".to_string()));
    }

    #[test]
    fn test_budget_rows_hold_at_optimum() {
        let problem = uniform();
        let mut built = build(&problem, ModelVariant::Primal).unwrap();
        assert_eq!(built.model.optimize(), SolutionStatus::Optimal);

        for i in 0..problem.outlets() {
            let spend: f64 = (0..problem.slots())
                .map(|j| problem.unit_cost[i][j] * built.model.value(built.x[i][j]).unwrap())
                .sum();
            let slack = built.model.value(built.slack[i]).unwrap();
            assert!((spend + slack - problem.max_budget[i]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_invalid_definition_is_rejected() {
        let mut problem = uniform();
        problem.capacity.pop();

        let err = build(&problem, ModelVariant::Primal).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::InvalidProblem {
                stage: Stage::ModelBuild,
                outlets: 2,
                slots: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_definition_names_stage_and_size() {
        let mut problem = uniform();
        problem.unit_cost[1].pop();

        let err = build(&problem, ModelVariant::Auxiliary).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("model build"), "{message}");
        assert!(message.contains("2x2"), "{message}");
        assert!(message.contains("unit_cost row 1"), "{message}");
    }
}
