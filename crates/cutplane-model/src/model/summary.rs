//! Serializable description of a model's shape, written next to LP exports.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::Sense;

use super::Model;
use super::error::ModelError;

/// Row range occupied by one constraint group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupSummary {
    pub name: String,
    pub first_row: usize,
    pub rows: usize,
}

/// Counts and group layout of a model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSummary {
    pub name: String,
    pub sense: Sense,
    pub variables: usize,
    pub constraints: usize,
    pub coefficients: usize,
    pub quadratic_cells: usize,
    pub kinds: BTreeMap<&'static str, usize>,
    pub groups: Vec<GroupSummary>,
}

impl Model {
    /// Summarize the model's tables.
    pub fn summary(&self) -> ModelSummary {
        let mut kinds = BTreeMap::new();
        for var in &self.variables {
            *kinds.entry(var.kind.as_str()).or_insert(0) += 1;
        }

        let mut groups: Vec<GroupSummary> = self
            .groups
            .iter()
            .map(|(name, range)| GroupSummary {
                name: name.clone(),
                first_row: range.start,
                rows: range.len(),
            })
            .collect();
        groups.sort_by_key(|group| group.first_row);

        let quadratic_cells = self.objective.quadratic_terms.len()
            + self
                .constraints
                .iter()
                .map(|row| row.quadratic_terms.len())
                .sum::<usize>();

        ModelSummary {
            name: self.name.clone(),
            sense: self.objective.sense,
            variables: self.variables.len(),
            constraints: self.constraints.len(),
            coefficients: self.num_coefficients(),
            quadratic_cells,
            kinds,
            groups,
        }
    }

    /// Summary rendered as pretty-printed JSON.
    pub fn summary_json(&self) -> Result<String, ModelError> {
        serde_json::to_string_pretty(&self.summary())
            .map_err(|err| ModelError::Serialization(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::Model;
    use crate::types::{Bounds, Constraint, Sign, Term, Variable};

    #[test]
    fn summary_counts_kinds_and_groups() {
        let mut model = Model::new("summary");
        let x = model
            .add_variable(Variable::continuous("x", Bounds::non_negative()))
            .expect("x");
        let b = model.add_variable(Variable::binary("b")).expect("b");
        for name in ["cap_0", "cap_1"] {
            model
                .add_constraint(
                    Constraint::new(
                        name,
                        vec![Term::new(x, 1.0), Term::new(b, 1.0)],
                        Sign::LessEqual,
                        1.0,
                    )
                    .in_group("cap"),
                )
                .expect("row");
        }

        let summary = model.summary();
        assert_eq!(summary.variables, 2);
        assert_eq!(summary.coefficients, 4);
        assert_eq!(summary.kinds.get("binary"), Some(&1));
        assert_eq!(summary.groups.len(), 1);
        assert_eq!(summary.groups[0].rows, 2);

        let json = model.summary_json().expect("json");
        let value: serde_json::Value = serde_json::from_str(&json).expect("parse");
        assert_eq!(value["name"], "summary");
        assert_eq!(value["sense"], "minimize");
    }
}
