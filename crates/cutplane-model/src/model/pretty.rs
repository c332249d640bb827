//! Human-readable LP-format model export.

use std::fmt::Write as _;

use crate::types::{Bounds, QuadraticTerm, Sense, Term, VariableKind};

use crate::model::Model;

const FLOAT_EQ_EPSILON: f64 = 1e-12;
const PREVIEW_CONSTRAINTS: usize = 20;
const PREVIEW_TERMS: usize = 30;

/// Formatting controls for LP-format output.
#[derive(Debug, Clone, Copy)]
pub struct PrettyPrintOptions {
    /// Maximum number of constraints to render.
    pub constraints: Option<usize>,
    /// Maximum number of terms to render per expression.
    pub terms: Option<usize>,
}

impl PrettyPrintOptions {
    /// Preview mode used by log lines.
    pub fn preview() -> Self {
        Self {
            constraints: Some(PREVIEW_CONSTRAINTS),
            terms: Some(PREVIEW_TERMS),
        }
    }

    /// Full mode with no truncation, used for file export.
    pub fn full() -> Self {
        Self {
            constraints: None,
            terms: None,
        }
    }
}

impl Model {
    /// Render the complete model in LP format.
    pub fn to_lp_string(&self) -> String {
        self.format_lp(PrettyPrintOptions::full())
    }

    /// Render the model in LP format with optional truncation.
    pub fn format_lp(&self, options: PrettyPrintOptions) -> String {
        let mut lines = Vec::new();
        lines.push(format!("\\ Model: {}", self.name));

        lines.push(
            match self.objective.sense {
                Sense::Minimize => "Minimize",
                Sense::Maximize => "Maximize",
            }
            .to_string(),
        );
        let mut objective = self.format_expression(
            &self.objective.terms,
            &self.objective.quadratic_terms,
            options.terms,
            true,
        );
        if !float_approx_equal(self.objective.constant, 0.0) {
            objective = append_constant(objective, self.objective.constant);
        }
        lines.push(format!(" obj: {objective}"));

        lines.push("Subject To".to_string());
        let total = self.constraints.len();
        let limit = options.constraints.unwrap_or(total).min(total);
        for row in self.constraints.iter().take(limit) {
            let lhs =
                self.format_expression(&row.terms, &row.quadratic_terms, options.terms, false);
            lines.push(format!(
                " {}: {} {} {}",
                row.name,
                lhs,
                row.sign.as_str(),
                format_lp_number(row.rhs)
            ));
        }
        if limit < total {
            lines.push(format!(" \\ ... ({} more constraints)", total - limit));
        }

        let mut bounds = Vec::new();
        let mut binaries = Vec::new();
        let mut generals = Vec::new();
        let mut semi = Vec::new();
        for var in &self.variables {
            match var.kind {
                VariableKind::Binary => {
                    binaries.push(var.name.clone());
                    if var.bounds == Bounds::new(0.0, 1.0) {
                        continue;
                    }
                }
                VariableKind::Integer => generals.push(var.name.clone()),
                VariableKind::SemiContinuous => semi.push(var.name.clone()),
                VariableKind::SemiInteger => {
                    semi.push(var.name.clone());
                    generals.push(var.name.clone());
                }
                VariableKind::Continuous => {}
            }
            if let Some(line) = format_bounds_line(&var.name, var.bounds) {
                bounds.push(line);
            }
        }

        if !bounds.is_empty() {
            lines.push("Bounds".to_string());
            lines.extend(bounds.into_iter().map(|line| format!(" {line}")));
        }
        for (heading, names) in [
            ("Generals", generals),
            ("Binaries", binaries),
            ("Semi-Continuous", semi),
        ] {
            if names.is_empty() {
                continue;
            }
            lines.push(heading.to_string());
            lines.push(format!(" {}", names.join(" ")));
        }
        lines.push("End".to_string());
        lines.join("\n")
    }

    fn format_expression(
        &self,
        terms: &[Term],
        quadratic_terms: &[QuadraticTerm],
        max_terms: Option<usize>,
        is_objective: bool,
    ) -> String {
        let nonzero: Vec<&Term> = terms
            .iter()
            .filter(|term| !float_approx_equal(term.coefficient, 0.0))
            .collect();
        let limit = max_terms.unwrap_or(nonzero.len()).min(nonzero.len());

        let mut rendered = String::new();
        for term in nonzero.iter().take(limit) {
            let label = self.label(term.column.index());
            push_signed(&mut rendered, term.coefficient, &label);
        }
        if limit < nonzero.len() {
            let _ = write!(rendered, " + ... ({} more terms)", nonzero.len() - limit);
        }

        if !quadratic_terms.is_empty() {
            // LP format halves the bracketed objective block.
            let scale = if is_objective { 2.0 } else { 1.0 };
            let mut block = String::new();
            for term in quadratic_terms {
                let label = if term.first == term.second {
                    format!("{} ^ 2", self.label(term.first.index()))
                } else {
                    format!(
                        "{} * {}",
                        self.label(term.first.index()),
                        self.label(term.second.index())
                    )
                };
                push_signed(&mut block, term.coefficient * scale, &label);
            }
            if rendered.is_empty() {
                rendered.push('0');
            }
            let _ = write!(rendered, " + [ {block} ]");
            if is_objective {
                rendered.push_str(" / 2");
            }
        }

        if rendered.is_empty() {
            "0".to_string()
        } else {
            rendered
        }
    }

    fn label(&self, index: usize) -> String {
        self.variables
            .get(index)
            .filter(|var| !var.name.is_empty())
            .map_or_else(|| format!("x{}", index + 1), |var| var.name.clone())
    }
}

fn push_signed(rendered: &mut String, coefficient: f64, label: &str) {
    let negative = coefficient < 0.0;
    let magnitude = coefficient.abs();
    let body = if float_approx_equal(magnitude, 1.0) {
        label.to_string()
    } else {
        format!("{} {label}", format_lp_number(magnitude))
    };
    if rendered.is_empty() {
        if negative {
            rendered.push_str("- ");
        }
        rendered.push_str(&body);
    } else if negative {
        let _ = write!(rendered, " - {body}");
    } else {
        let _ = write!(rendered, " + {body}");
    }
}

fn append_constant(expression: String, constant: f64) -> String {
    if constant < 0.0 {
        format!("{expression} - {}", format_lp_number(-constant))
    } else {
        format!("{expression} + {}", format_lp_number(constant))
    }
}

/// Shared numeric formatter for LP-format output.
pub fn format_lp_number(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value.is_sign_negative() {
            "-inf".to_string()
        } else {
            "+inf".to_string()
        };
    }

    let mut rendered = format!("{value:.12}");
    while rendered.ends_with('0') {
        rendered.pop();
    }
    if rendered.ends_with('.') {
        rendered.pop();
    }
    if rendered == "-0" {
        "0".to_string()
    } else {
        rendered
    }
}

fn float_approx_equal(lhs: f64, rhs: f64) -> bool {
    if lhs.to_bits() == rhs.to_bits() {
        return true;
    }
    if !lhs.is_finite() || !rhs.is_finite() {
        return false;
    }
    let scale = lhs.abs().max(rhs.abs()).max(1.0);
    (lhs - rhs).abs() <= FLOAT_EQ_EPSILON * scale
}

fn format_bounds_line(label: &str, bounds: Bounds) -> Option<String> {
    let lower_finite = bounds.lower.is_finite();
    let upper_finite = bounds.upper.is_finite();
    if !lower_finite && !upper_finite {
        return Some(format!("{label} free"));
    }
    if lower_finite && upper_finite {
        if float_approx_equal(bounds.lower, bounds.upper) {
            return Some(format!("{label} = {}", format_lp_number(bounds.lower)));
        }
        return Some(format!(
            "{} <= {label} <= {}",
            format_lp_number(bounds.lower),
            format_lp_number(bounds.upper)
        ));
    }
    if lower_finite {
        // `x >= 0` is the LP-format default.
        if float_approx_equal(bounds.lower, 0.0) {
            return None;
        }
        return Some(format!("{label} >= {}", format_lp_number(bounds.lower)));
    }
    Some(format!("-inf <= {label} <= {}", format_lp_number(bounds.upper)))
}
