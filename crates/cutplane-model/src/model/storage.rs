//! Table access methods for the model.

use std::ops::Range;

use crate::ids::{ConstraintId, VariableId};
use crate::types::{Constraint, Objective, Variable};

use super::Model;
use super::error::ModelError;

impl Model {
    /// Get the number of variables
    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    /// Get the number of constraints
    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Get the number of linear coefficients in the constraint matrix.
    pub fn num_coefficients(&self) -> usize {
        self.constraints.iter().map(|row| row.terms.len()).sum()
    }

    /// Variable table, indexed by column.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Constraint table, indexed by row.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    /// Get a variable by ID.
    pub fn variable(&self, id: VariableId) -> Result<&Variable, ModelError> {
        self.variables
            .get(id.index())
            .ok_or(ModelError::InvalidVariableId(id))
    }

    /// Get a constraint by ID.
    pub fn constraint(&self, id: ConstraintId) -> Result<&Constraint, ModelError> {
        self.constraints
            .get(id.index())
            .ok_or(ModelError::InvalidConstraintId(id))
    }

    /// Lookup a variable by name.
    pub fn variable_by_name(&self, name: &str) -> Option<VariableId> {
        self.variables
            .iter()
            .position(|var| var.name == name)
            .map(|idx| VariableId::new(idx as u32))
    }

    /// Lookup a constraint by name.
    pub fn constraint_by_name(&self, name: &str) -> Option<ConstraintId> {
        self.constraints
            .iter()
            .position(|row| row.name == name)
            .map(|idx| ConstraintId::new(idx as u32))
    }

    /// Row range of a constraint group.
    pub fn constraint_group(&self, name: &str) -> Option<Range<usize>> {
        self.groups.get(name).cloned()
    }

    /// Names of all constraint groups, in row order.
    pub fn group_names(&self) -> Vec<&str> {
        let mut groups: Vec<(&str, usize)> = self
            .groups
            .iter()
            .map(|(name, range)| (name.as_str(), range.start))
            .collect();
        groups.sort_by_key(|(_, start)| *start);
        groups.into_iter().map(|(name, _)| name).collect()
    }

    /// Rows whose name starts with `prefix`, in row order.
    ///
    /// Used when rows were contributed without group metadata.
    pub fn constraints_with_prefix(&self, prefix: &str) -> Vec<ConstraintId> {
        self.constraints
            .iter()
            .enumerate()
            .filter(|(_, row)| row.name.starts_with(prefix))
            .map(|(idx, _)| ConstraintId::new(idx as u32))
            .collect()
    }

    /// True when no row or objective carries bilinear cells.
    pub fn is_linear(&self) -> bool {
        self.objective.is_linear() && self.constraints.iter().all(Constraint::is_linear)
    }

    /// True when at least one column has an integral domain.
    pub fn has_integers(&self) -> bool {
        self.variables.iter().any(|var| var.kind.is_integral())
    }

    /// Objective value at a primal point.
    pub fn evaluate_objective(&self, values: &[f64]) -> f64 {
        self.objective.evaluate(values)
    }

    /// Left-hand side of a row at a primal point.
    pub fn row_activity(&self, row: ConstraintId, values: &[f64]) -> Result<f64, ModelError> {
        Ok(self.constraint(row)?.activity(values))
    }
}
