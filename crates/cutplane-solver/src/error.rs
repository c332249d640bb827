//! Solver error types.

use cutplane_model::ModelError;

use crate::hooks::HookPoint;

/// Error type for solver backend operations.
#[derive(Debug, Clone)]
pub enum SolveError {
    /// The native solver environment could not be created or licensed.
    Environment(String),
    /// The model could not be translated into the native representation.
    Modeling(String),
    /// The model itself is invalid.
    Model(ModelError),
    /// The native solve failed.
    Solving(String),
    /// The problem is infeasible.
    Infeasible,
    /// The problem is unbounded.
    Unbounded,
    /// The solve was stopped before any incumbent was found.
    Interrupted(String),
    /// A hook returned an error.
    HookFailed {
        /// Point at which the failing hook ran.
        point: HookPoint,
        message: String,
    },
    /// Dual values were requested but the solve produced none.
    MissingDuals(String),
    /// No member of a combined backend produced a solution.
    NoSolver(String),
}

impl SolveError {
    /// Returns a semantic error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            SolveError::Environment(_) => "SOLVER_ENVIRONMENT",
            SolveError::Modeling(_) => "SOLVER_MODELING",
            SolveError::Model(err) => err.code(),
            SolveError::Solving(_) => "SOLVER_EXCEPTION",
            SolveError::Infeasible => "SOLVER_INFEASIBLE",
            SolveError::Unbounded => "SOLVER_UNBOUNDED",
            SolveError::Interrupted(_) => "SOLVER_INTERRUPTED",
            SolveError::HookFailed { .. } => "SOLVER_HOOK_FAILED",
            SolveError::MissingDuals(_) => "SOLVER_MISSING_DUALS",
            SolveError::NoSolver(_) => "SOLVER_NOT_FOUND",
        }
    }

    pub fn is_infeasible(&self) -> bool {
        matches!(self, SolveError::Infeasible)
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(self, SolveError::Unbounded)
    }
}

impl std::fmt::Display for SolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolveError::Environment(msg) => {
                write!(f, "[{}] Solver environment unavailable: {}", self.code(), msg)
            }
            SolveError::Modeling(msg) => {
                write!(f, "[{}] Failed to build native model: {}", self.code(), msg)
            }
            SolveError::Model(err) => write!(f, "{err}"),
            SolveError::Solving(msg) => write!(f, "[{}] Solver failed: {}", self.code(), msg),
            SolveError::Infeasible => write!(f, "[{}] Problem is infeasible", self.code()),
            SolveError::Unbounded => write!(f, "[{}] Problem is unbounded", self.code()),
            SolveError::Interrupted(reason) => write!(
                f,
                "[{}] Solve interrupted before an incumbent was found: {}",
                self.code(),
                reason
            ),
            SolveError::HookFailed { point, message } => {
                write!(f, "[{}] Hook at {} failed: {}", self.code(), point, message)
            }
            SolveError::MissingDuals(msg) => {
                write!(f, "[{}] No dual values available: {}", self.code(), msg)
            }
            SolveError::NoSolver(msg) => {
                write!(f, "[{}] No solver produced a solution: {}", self.code(), msg)
            }
        }
    }
}

impl std::error::Error for SolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SolveError::Model(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ModelError> for SolveError {
    fn from(err: ModelError) -> Self {
        SolveError::Model(err)
    }
}
