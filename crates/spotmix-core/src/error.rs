use spotmix_solver::{ModelError, SolutionStatus};
use thiserror::Error;

/// Pipeline step an error was raised in
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ModelBuild,
    PrimalSolve,
    BoundedResolve,
    AuxiliarySolve,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Stage::ModelBuild => "model build",
            Stage::PrimalSolve => "primal solve",
            Stage::BoundedResolve => "bounded re-solve",
            Stage::AuxiliarySolve => "auxiliary solve",
        };
        f.write_str(label)
    }
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("{stage} failed on a {outlets}x{slots} instance: invalid problem definition: {reason}")]
    InvalidProblem {
        stage: Stage,
        outlets: usize,
        slots: usize,
        reason: String,
    },
    #[error("{stage} failed on a {outlets}x{slots} instance: the model is infeasible")]
    Infeasible { stage: Stage, outlets: usize, slots: usize },
    #[error("{stage} failed on a {outlets}x{slots} instance: the model is unbounded")]
    Unbounded { stage: Stage, outlets: usize, slots: usize },
    #[error("auxiliary solve found no feasible point on a {outlets}x{slots} instance")]
    AuxiliaryInfeasible { outlets: usize, slots: usize },
    #[error("{stage} failed on a {outlets}x{slots} instance: solver stopped with status {status}")]
    Unsolved {
        stage: Stage,
        status: SolutionStatus,
        outlets: usize,
        slots: usize,
    },
    #[error("Cannot combine vectors of length {left} and {right}")]
    DimensionMismatch { left: usize, right: usize },
    #[error("Cannot combine vectors whose layouts differ at position {position}: {left} vs {right}")]
    LayoutMismatch {
        position: usize,
        left: String,
        right: String,
    },
    #[error("{stage} failed on a {outlets}x{slots} instance: {source}")]
    Engine {
        stage: Stage,
        outlets: usize,
        slots: usize,
        #[source]
        source: ModelError,
    },
}

impl AnalysisError {
    pub(crate) fn engine(stage: Stage, outlets: usize, slots: usize) -> impl Fn(ModelError) -> Self + Copy {
        move |source| AnalysisError::Engine {
            stage,
            outlets,
            slots,
            source,
        }
    }

    /// Whether the pipeline can continue past this error
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AnalysisError::AuxiliaryInfeasible { .. })
    }
}
