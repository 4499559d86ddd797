use spotmix_solver::SolutionStatus;
use tracing::{info, info_span};

use crate::alternate::{AlternatePoint, AuxiliaryOutcome, PointSource, auxiliary_point, bounded_resolve, read_point};
use crate::builder::{ModelVariant, build};
use crate::classify::{Classification, classify};
use crate::error::{AnalysisError, Stage};
use crate::instance::ProblemDefinition;
use crate::interpolate::DEFAULT_LAMBDA;
use crate::record::{SolutionVector, VariableRecord, round4};

/// Scalars derived from the optimal purchase plan
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DerivedTotals {
    /// Units bought over all outlets and slots
    pub quantity: f64,
    pub cost: f64,
    pub coverage: f64,
    /// Total budget minus total cost
    pub unused_budget: f64,
}

impl DerivedTotals {
    pub fn of(problem: &ProblemDefinition, x: &[f64]) -> Self {
        let k = problem.slots();
        let mut totals = DerivedTotals::default();
        for (idx, &units) in x.iter().enumerate() {
            let (i, j) = (idx / k, idx % k);
            totals.quantity += units;
            totals.cost += problem.unit_cost[i][j] * units;
            totals.coverage += problem.unit_coverage[i][j] * units;
        }
        totals.unused_budget = problem.total_budget() - totals.cost;
        totals
    }

    fn rounded(&self) -> Self {
        Self {
            quantity: round4(self.quantity),
            cost: round4(self.cost),
            coverage: round4(self.coverage),
            unused_budget: round4(self.unused_budget),
        }
    }
}

/// Everything the analysis produces for one instance
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct PrimalResult {
    pub outlets: usize,
    pub slots: usize,
    pub objective_value: f64,
    pub totals: DerivedTotals,
    pub iterations: usize,
    pub phase_one_iterations: usize,
    /// Every `x`, slack and deviation variable of the optimal vertex
    pub variables: Vec<VariableRecord>,
    pub classification: Classification,
    pub bounded_point: AlternatePoint,
    pub auxiliary_point: AuxiliaryOutcome,
    pub interpolated_point: AlternatePoint,
    /// Weight of the bounded point in the interpolation
    pub lambda: f64,
}

impl PrimalResult {
    pub fn optimum(&self) -> SolutionVector {
        SolutionVector::from_records(&self.variables)
    }

    /// A copy with every float rounded to 4 decimal places
    pub fn rounded(&self) -> Self {
        let round_point = |p: &AlternatePoint| AlternatePoint {
            point: p.point.rounded(),
            ..p.clone()
        };
        Self {
            objective_value: round4(self.objective_value),
            totals: self.totals.rounded(),
            variables: self
                .variables
                .iter()
                .map(|r| VariableRecord {
                    name: r.name.clone(),
                    value: round4(r.value),
                    is_basic: r.is_basic,
                    reduced_cost: round4(r.reduced_cost),
                })
                .collect(),
            bounded_point: round_point(&self.bounded_point),
            auxiliary_point: match &self.auxiliary_point {
                AuxiliaryOutcome::Found(p) => AuxiliaryOutcome::Found(round_point(p)),
                unavailable => unavailable.clone(),
            },
            interpolated_point: round_point(&self.interpolated_point),
            ..self.clone()
        }
    }
}

/// Runs the full analysis of one instance
#[derive(Debug, Clone)]
pub struct SolveDriver {
    iteration_divisor: usize,
    lambda: f64,
}

impl Default for SolveDriver {
    fn default() -> Self {
        Self {
            iteration_divisor: 2,
            lambda: DEFAULT_LAMBDA,
        }
    }
}

impl SolveDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// The bounded re-solve gets `iterations / divisor` iterations. A divisor of 0
    /// is treated as 1.
    pub fn with_iteration_divisor(mut self, divisor: usize) -> Self {
        self.iteration_divisor = divisor.max(1);
        self
    }

    /// Weight of the bounded point when interpolating towards the optimum
    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.lambda = lambda;
        self
    }

    pub fn solve(&self, problem: &ProblemDefinition) -> Result<PrimalResult, AnalysisError> {
        let (outlets, slots) = (problem.outlets(), problem.slots());
        let _span = info_span!("solve", outlets, slots).entered();

        // Optimal vertex
        let mut built = build(problem, ModelVariant::Primal)?;
        let status = built.model.optimize();
        match status {
            SolutionStatus::Optimal => {}
            SolutionStatus::Infeasible => {
                return Err(AnalysisError::Infeasible {
                    stage: Stage::PrimalSolve,
                    outlets,
                    slots,
                });
            }
            SolutionStatus::Unbounded => {
                return Err(AnalysisError::Unbounded {
                    stage: Stage::PrimalSolve,
                    outlets,
                    slots,
                });
            }
            SolutionStatus::IterationLimit => {
                return Err(AnalysisError::Unsolved {
                    stage: Stage::PrimalSolve,
                    status,
                    outlets,
                    slots,
                });
            }
        }

        let engine = AnalysisError::engine(Stage::PrimalSolve, outlets, slots);
        let objective_value = built.model.objective_value().map_err(engine)?;
        let iterations = built.model.iteration_count().map_err(engine)?;
        let phase_one_iterations = built
            .model
            .phase_one_iterations()
            .map_err(engine)?;

        let optimum = read_point(&built, Stage::PrimalSolve)?;
        let variables = built
            .tracked()
            .into_iter()
            .zip(optimum.iter())
            .map(|(var, (name, value))| {
                Ok(VariableRecord {
                    name: name.to_string(),
                    value,
                    is_basic: built
                        .model
                        .basis_status(var)
                        .map_err(engine)?
                        .is_basic(),
                    reduced_cost: built.model.reduced_cost(var).map_err(engine)?,
                })
            })
            .collect::<Result<Vec<_>, AnalysisError>>()?;

        let classification = classify(&variables, &built.slack_constraints());
        let totals = DerivedTotals::of(problem, &optimum.values[..outlets * slots]);
        let primal = built.model.problem().clone();
        drop(built);

        info!(
            objective = objective_value,
            iterations,
            phase_one_iterations,
            degenerate = classification.is_degenerate,
            multiple_optima = classification.is_multiple_optima,
            "primal solved"
        );

        // Alternate points
        let limit = iterations / self.iteration_divisor;
        let bounded_point = bounded_resolve(problem, limit, phase_one_iterations, &primal, &optimum)?;
        let auxiliary_point = auxiliary_point(problem, &primal, &optimum)?;

        let interpolated = bounded_point.point.combine(&optimum, self.lambda)?;
        let interpolated_point = AlternatePoint::new(PointSource::Interpolated, interpolated, &primal, &optimum);
        info!(
            lambda = self.lambda,
            feasible = interpolated_point.feasible,
            "interpolated point"
        );

        Ok(PrimalResult {
            outlets,
            slots,
            objective_value,
            totals,
            iterations,
            phase_one_iterations,
            variables,
            classification,
            bounded_point,
            auxiliary_point,
            interpolated_point,
            lambda: self.lambda,
        })
    }
}

/// Analyse `problem` with the default iteration divisor and interpolation weight
pub fn solve(problem: &ProblemDefinition) -> Result<PrimalResult, AnalysisError> {
    SolveDriver::new().solve(problem)
}
