//! Tabular optimization model for the cutplane solvers.
//!
//! A [`Model`] is the intermediate form handed to solver backends: a variable
//! table (one column per [`Variable`]), a constraint table (one row per
//! [`Constraint`], rows grouped by the pipeline that produced them) and an
//! [`Objective`]. Decomposition code derives relaxed, fixed and elastic copies
//! of a model through the transforms in [`model`].

pub mod ids;
pub mod model;
pub mod types;

pub use ids::{ConstraintId, VariableId};
pub use model::{
    FixedModel, GroupSummary, Model, ModelError, ModelSummary, PrettyPrintOptions,
    SubstitutedCell, format_lp_number,
};
pub use types::{
    Bounds, Constraint, Objective, QuadraticTerm, Sense, Sign, Term, Variable, VariableKind,
};
