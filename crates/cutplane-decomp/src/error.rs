//! Decomposition error types.

use std::fmt;

use cutplane_model::ModelError;
use cutplane_solver::SolveError;

use crate::cut::CutKind;

/// Which side of a decomposition round failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Master,
    Sub,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Master => "master",
            Stage::Sub => "sub",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for decomposition and pricing operations.
#[derive(Debug, Clone)]
pub enum DecompError {
    /// A backend solve failed.
    Solve { stage: Stage, source: SolveError },
    /// A stage came back unbounded, which points at a modeling defect.
    Unbounded { stage: Stage },
    /// A derived model could not be built.
    Model(ModelError),
    /// A pipeline failed to contribute or refresh.
    Pipeline { pipeline: String, message: String },
    /// A keyed row lies outside the dual vector.
    DualMismatch { row: usize, len: usize },
    /// A subproblem produced a cut with bilinear cells, which a linear
    /// master cannot take.
    QuadraticCut { sub: String, kind: CutKind },
    /// Positional pairing found a different number of rows and keys.
    GroupSizeMismatch {
        group: String,
        rows: usize,
        keys: usize,
    },
}

impl DecompError {
    /// Returns a semantic error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            DecompError::Solve { source, .. } => source.code(),
            DecompError::Unbounded { .. } => "DECOMP_UNBOUNDED",
            DecompError::Model(err) => err.code(),
            DecompError::Pipeline { .. } => "DECOMP_PIPELINE",
            DecompError::DualMismatch { .. } => "DECOMP_DUAL_MISMATCH",
            DecompError::QuadraticCut { .. } => "DECOMP_QUADRATIC_CUT",
            DecompError::GroupSizeMismatch { .. } => "DECOMP_GROUP_SIZE_MISMATCH",
        }
    }

    /// Stage of a failed solve, if the error came from one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            DecompError::Solve { stage, .. } | DecompError::Unbounded { stage } => Some(*stage),
            _ => None,
        }
    }

    /// Wrap a backend error, surfacing unboundedness on its own.
    pub fn from_solve(stage: Stage, source: SolveError) -> Self {
        if source.is_unbounded() {
            DecompError::Unbounded { stage }
        } else {
            DecompError::Solve { stage, source }
        }
    }
}

impl fmt::Display for DecompError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecompError::Solve { stage, source } => {
                write!(f, "{} solve failed: {}", stage, source)
            }
            DecompError::Unbounded { stage } => write!(
                f,
                "[{}] {} problem is unbounded; check the master formulation",
                self.code(),
                stage
            ),
            DecompError::Model(err) => write!(f, "{err}"),
            DecompError::Pipeline { pipeline, message } => {
                write!(f, "[{}] Pipeline '{}' failed: {}", self.code(), pipeline, message)
            }
            DecompError::DualMismatch { row, len } => write!(
                f,
                "[{}] Row {} has no dual value (dual vector has {} entries)",
                self.code(),
                row,
                len
            ),
            DecompError::QuadraticCut { sub, kind } => write!(
                f,
                "[{}] Subproblem '{}' produced a quadratic {} cut; the master only takes linear cuts",
                self.code(),
                sub,
                kind
            ),
            DecompError::GroupSizeMismatch { group, rows, keys } => write!(
                f,
                "[{}] Group '{}' has {} rows but {} keys were supplied",
                self.code(),
                group,
                rows,
                keys
            ),
        }
    }
}

impl std::error::Error for DecompError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DecompError::Solve { source, .. } => Some(source),
            DecompError::Model(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ModelError> for DecompError {
    fn from(err: ModelError) -> Self {
        DecompError::Model(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solve_error_keeps_stage_and_code() {
        let err = DecompError::from_solve(Stage::Sub, SolveError::Solving("boom".to_string()));
        assert_eq!(err.stage(), Some(Stage::Sub));
        assert_eq!(err.code(), "SOLVER_EXCEPTION");
        let msg = err.to_string();
        assert!(msg.starts_with("sub solve failed"));
        assert!(msg.contains("boom"));
    }

    #[test]
    fn test_unbounded_is_surfaced_distinctly() {
        let err = DecompError::from_solve(Stage::Master, SolveError::Unbounded);
        assert!(matches!(err, DecompError::Unbounded { stage: Stage::Master }));
        assert!(err.to_string().contains("DECOMP_UNBOUNDED"));
    }

    #[test]
    fn test_quadratic_cut_display_names_the_subproblem() {
        let err = DecompError::QuadraticCut {
            sub: "pooling".to_string(),
            kind: CutKind::Feasibility,
        };
        assert_eq!(err.code(), "DECOMP_QUADRATIC_CUT");
        assert!(err.to_string().contains("'pooling' produced a quadratic feasibility cut"));
        assert_eq!(err.stage(), None);
    }

    #[test]
    fn test_group_size_mismatch_display() {
        let err = DecompError::GroupSizeMismatch {
            group: "capacity".to_string(),
            rows: 3,
            keys: 2,
        };
        assert_eq!(err.code(), "DECOMP_GROUP_SIZE_MISMATCH");
        assert!(err.to_string().contains("'capacity' has 3 rows"));
        assert_eq!(err.stage(), None);
    }
}
