//! Model error types.

use crate::ids::{ConstraintId, VariableId};

/// Errors that can occur during model operations
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Model has no variables
    EmptyModel,
    /// Invalid variable ID
    InvalidVariableId(VariableId),
    /// Invalid variable bounds
    InvalidVariableBounds { lower: f64, upper: f64 },
    /// Invalid constraint ID
    InvalidConstraintId(ConstraintId),
    /// Coefficient is NaN or infinite
    InvalidCoefficient { coefficient: f64 },
    /// Right-hand side is NaN
    InvalidRhs { rhs: f64 },
    /// A fixed value is NaN or infinite
    InvalidFixedValue { variable: VariableId, value: f64 },
    /// Row would split an existing constraint group
    GroupNotContiguous { group: String, row: usize },
    /// Bilinear cell couples a fixed column with a free one
    UnsupportedQuadraticCoupling {
        fixed: VariableId,
        free: VariableId,
    },
    /// Model summary could not be serialized
    Serialization(String),
}

impl ModelError {
    /// Returns a semantic error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            ModelError::EmptyModel => "MODEL_EMPTY",
            ModelError::InvalidVariableId(_) => "VARIABLE_INVALID_ID",
            ModelError::InvalidVariableBounds { .. } => "VARIABLE_INVALID_BOUNDS",
            ModelError::InvalidConstraintId(_) => "CONSTRAINT_INVALID_ID",
            ModelError::InvalidCoefficient { .. } => "COEFFICIENT_INVALID",
            ModelError::InvalidRhs { .. } => "CONSTRAINT_INVALID_RHS",
            ModelError::InvalidFixedValue { .. } => "VARIABLE_INVALID_FIXED_VALUE",
            ModelError::GroupNotContiguous { .. } => "GROUP_NOT_CONTIGUOUS",
            ModelError::UnsupportedQuadraticCoupling { .. } => "QUADRATIC_UNSUPPORTED_COUPLING",
            ModelError::Serialization(_) => "MODEL_SERIALIZATION",
        }
    }
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::EmptyModel => write!(f, "[{}] Model has no variables", self.code()),
            ModelError::InvalidVariableId(id) => write!(
                f,
                "[{}] Variable ID {} does not exist",
                self.code(),
                id.inner()
            ),
            ModelError::InvalidVariableBounds { lower, upper } => write!(
                f,
                "[{}] Variable bounds invalid: lower ({}) > upper ({})",
                self.code(),
                lower,
                upper
            ),
            ModelError::InvalidConstraintId(id) => write!(
                f,
                "[{}] Constraint ID {} does not exist",
                self.code(),
                id.inner()
            ),
            ModelError::InvalidCoefficient { coefficient } => write!(
                f,
                "[{}] Coefficient must be finite (got {})",
                self.code(),
                coefficient
            ),
            ModelError::InvalidRhs { rhs } => {
                write!(f, "[{}] Right-hand side must not be NaN (got {})", self.code(), rhs)
            }
            ModelError::InvalidFixedValue { variable, value } => write!(
                f,
                "[{}] Variable {} cannot be fixed to {}",
                self.code(),
                variable.inner(),
                value
            ),
            ModelError::GroupNotContiguous { group, row } => write!(
                f,
                "[{}] Row {} would split constraint group '{}'",
                self.code(),
                row,
                group
            ),
            ModelError::UnsupportedQuadraticCoupling { fixed, free } => write!(
                f,
                "[{}] Bilinear cell couples fixed variable {} with free variable {}",
                self.code(),
                fixed.inner(),
                free.inner()
            ),
            ModelError::Serialization(msg) => {
                write!(f, "[{}] Failed to serialize model: {}", self.code(), msg)
            }
        }
    }
}

impl std::error::Error for ModelError {}
