//! Model module for building optimization models.
//!
//! # Module Organization
//!
//! - [`error`]: Model error types
//! - [`builder`]: Methods for adding variables, constraints, columns and objectives
//! - [`storage`]: Table access and constraint-group lookups
//! - [`transform`]: Relaxation, fixing and elastic (phase-one) copies
//! - [`pretty`]: LP-format text export
//! - [`summary`]: Serializable model summary

mod builder;
mod error;
mod pretty;
mod storage;
mod summary;
mod transform;

use std::collections::BTreeMap;
use std::ops::Range;

use crate::types::{Constraint, Objective, Variable};

pub use error::ModelError;
pub use pretty::{PrettyPrintOptions, format_lp_number};
pub use summary::{GroupSummary, ModelSummary};
pub use transform::{FixedModel, SubstitutedCell};

/// Tabular model for linear, mixed-integer and bilinear programs.
///
/// Column `i` of the solver matrix is `variables[i]` and row `j` is
/// `constraints[j]`. Rows that carry a group name are kept contiguous per
/// group; [`Model::constraint_group`] returns the row range of a group.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub(crate) name: String,
    pub(crate) variables: Vec<Variable>,
    pub(crate) constraints: Vec<Constraint>,
    pub(crate) objective: Objective,
    pub(crate) groups: BTreeMap<String, Range<usize>>,
}

impl Model {
    /// Create a new empty model.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: Vec::new(),
            constraints: Vec::new(),
            objective: Objective::default(),
            groups: BTreeMap::new(),
        }
    }

    /// Model name, used for diagnostics file names.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new("model")
    }
}
