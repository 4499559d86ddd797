//! Feasible points other than the optimum.
//!
//! Two techniques are used. The primal model is re-solved with a tight iteration
//! budget so the engine stops at an intermediate vertex. Separately, the auxiliary
//! model (minimise the penalties on the slot and coverage rows) is solved to
//! optimality; any of its zero-penalty points is feasible for the primal model but
//! not driven towards a balanced coverage.

use spotmix_solver::{LpProblem, SolutionStatus};
use tracing::{debug, info, warn};

use crate::builder::{AllocationModel, ModelVariant, build};
use crate::error::{AnalysisError, Stage};
use crate::instance::ProblemDefinition;
use crate::record::SolutionVector;

/// Tolerance used when checking a point against the primal rows and bounds
pub const FEASIBILITY_TOLERANCE: f64 = 1e-6;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointSource {
    /// Primal model stopped by an iteration limit
    BoundedResolve,
    /// Optimum of the auxiliary model
    Auxiliary,
    /// Convex combination of the bounded point and the optimum
    Interpolated,
}

impl std::fmt::Display for PointSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            PointSource::BoundedResolve => "bounded re-solve",
            PointSource::Auxiliary => "auxiliary model",
            PointSource::Interpolated => "interpolation",
        };
        f.write_str(label)
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct AlternatePoint {
    pub source: PointSource,
    /// Engine status behind the point; `None` for interpolated points
    pub status: Option<SolutionStatus>,
    /// Iteration budget of the solve that produced the point
    pub iteration_limit: Option<usize>,
    /// Iterations the engine actually spent
    pub iterations: usize,
    pub point: SolutionVector,
    /// Satisfies every bound and row of the primal model
    pub feasible: bool,
    /// Differs from the optimum after 4-digit rounding
    pub distinct_from_optimum: bool,
}

impl AlternatePoint {
    pub(crate) fn new(
        source: PointSource,
        point: SolutionVector,
        primal: &LpProblem,
        optimum: &SolutionVector,
    ) -> Self {
        let shared = point.prefix(optimum.len());
        let feasible = primal.violations(&shared.values, FEASIBILITY_TOLERANCE).is_empty();
        Self {
            source,
            status: None,
            iteration_limit: None,
            iterations: 0,
            distinct_from_optimum: !shared.same_point(optimum),
            feasible,
            point,
        }
    }

    fn solved_by(mut self, status: SolutionStatus, limit: Option<usize>, iterations: usize) -> Self {
        self.status = Some(status);
        self.iteration_limit = limit;
        self.iterations = iterations;
        self
    }
}

/// Result of the auxiliary solve. An infeasible auxiliary model does not stop the
/// analysis.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum AuxiliaryOutcome {
    Found(AlternatePoint),
    Unavailable { reason: String },
}

impl AuxiliaryOutcome {
    pub fn point(&self) -> Option<&AlternatePoint> {
        match self {
            AuxiliaryOutcome::Found(point) => Some(point),
            AuxiliaryOutcome::Unavailable { .. } => None,
        }
    }
}

/// Re-solve the primal model from scratch with at most `limit` iterations.
///
/// A limit that stops the engine while it is still looking for a feasible vertex
/// yields no usable point; the solve is then repeated once with `fallback`, which
/// should be the number of iterations the unbounded run spent reaching feasibility.
///
/// A limit of 0 never returns the raw starting point. The engine is not run with
/// it at all and the retry with `fallback` supplies the point instead.
pub fn bounded_resolve(
    problem: &ProblemDefinition,
    limit: usize,
    fallback: usize,
    primal: &LpProblem,
    optimum: &SolutionVector,
) -> Result<AlternatePoint, AnalysisError> {
    let first = if limit == 0 { None } else { limited_solve(problem, limit)? };
    let (status, iterations, point, used) = match first {
        Some((status, iterations, point)) => (status, iterations, point, limit),
        None => {
            warn!(limit, fallback, "iteration limit stopped before a feasible vertex, retrying");
            let retry = limited_solve(problem, fallback)?;
            match retry {
                Some((status, iterations, point)) => (status, iterations, point, fallback),
                None => {
                    return Err(AnalysisError::Unsolved {
                        stage: Stage::BoundedResolve,
                        status: SolutionStatus::IterationLimit,
                        outlets: problem.outlets(),
                        slots: problem.slots(),
                    });
                }
            }
        }
    };

    let alternate = AlternatePoint::new(PointSource::BoundedResolve, point, primal, optimum)
        .solved_by(status, Some(used), iterations);
    info!(
        limit = used,
        iterations,
        %status,
        distinct = alternate.distinct_from_optimum,
        "bounded re-solve finished"
    );
    Ok(alternate)
}

/// One limited solve. `None` when the engine stopped at a point that breaks a row.
fn limited_solve(
    problem: &ProblemDefinition,
    limit: usize,
) -> Result<Option<(SolutionStatus, usize, SolutionVector)>, AnalysisError> {
    let mut built = build(problem, ModelVariant::Primal)?;
    built.model.reset();
    built.model.set_iteration_limit(Some(limit));

    let status = built.model.optimize();
    let iterations = built
        .model
        .iteration_count()
        .map_err(AnalysisError::engine(Stage::BoundedResolve, problem.outlets(), problem.slots()))?;
    debug!(limit, iterations, %status, "limited solve");

    match status {
        SolutionStatus::Infeasible => Err(AnalysisError::Infeasible {
            stage: Stage::BoundedResolve,
            outlets: problem.outlets(),
            slots: problem.slots(),
        }),
        SolutionStatus::Unbounded => Err(AnalysisError::Unbounded {
            stage: Stage::BoundedResolve,
            outlets: problem.outlets(),
            slots: problem.slots(),
        }),
        SolutionStatus::Optimal | SolutionStatus::IterationLimit => {
            let feasible = built
                .model
                .is_primal_feasible()
                .map_err(AnalysisError::engine(Stage::BoundedResolve, problem.outlets(), problem.slots()))?;
            if !feasible {
                return Ok(None);
            }
            let point = read_point(&built, Stage::BoundedResolve)?;
            Ok(Some((status, iterations, point)))
        }
    }
}

/// Solve the auxiliary model to optimality and return its full point, penalties
/// included.
pub fn auxiliary_point(
    problem: &ProblemDefinition,
    primal: &LpProblem,
    optimum: &SolutionVector,
) -> Result<AuxiliaryOutcome, AnalysisError> {
    let mut built = build(problem, ModelVariant::Auxiliary)?;
    let status = built.model.optimize();

    match status {
        SolutionStatus::Optimal => {}
        SolutionStatus::Infeasible => {
            let reason = AnalysisError::AuxiliaryInfeasible {
                outlets: problem.outlets(),
                slots: problem.slots(),
            };
            warn!(%reason, "no auxiliary alternate point");
            return Ok(AuxiliaryOutcome::Unavailable {
                reason: reason.to_string(),
            });
        }
        SolutionStatus::Unbounded => {
            return Err(AnalysisError::Unbounded {
                stage: Stage::AuxiliarySolve,
                outlets: problem.outlets(),
                slots: problem.slots(),
            });
        }
        SolutionStatus::IterationLimit => {
            return Err(AnalysisError::Unsolved {
                stage: Stage::AuxiliarySolve,
                status,
                outlets: problem.outlets(),
                slots: problem.slots(),
            });
        }
    }

    let iterations = built
        .model
        .iteration_count()
        .map_err(AnalysisError::engine(Stage::AuxiliarySolve, problem.outlets(), problem.slots()))?;
    let point = read_point(&built, Stage::AuxiliarySolve)?;
    let alternate =
        AlternatePoint::new(PointSource::Auxiliary, point, primal, optimum).solved_by(status, None, iterations);
    info!(
        iterations,
        feasible = alternate.feasible,
        distinct = alternate.distinct_from_optimum,
        "auxiliary solve finished"
    );
    Ok(AuxiliaryOutcome::Found(alternate))
}

/// Every tracked variable of a solved model, by name
pub(crate) fn read_point(built: &AllocationModel, stage: Stage) -> Result<SolutionVector, AnalysisError> {
    let (outlets, slots) = built.size();
    let engine = AnalysisError::engine(stage, outlets, slots);
    let all = built.model.values().map_err(engine)?;

    let mut names = Vec::new();
    let mut values = Vec::new();
    for var in built.tracked() {
        names.push(built.model.var_name(var).map_err(engine)?.to_string());
        values.push(all[var.index()]);
    }
    Ok(SolutionVector::new(names, values))
}
