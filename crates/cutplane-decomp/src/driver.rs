//! Benders loop over a master and a set of linked subproblems.

use std::time::Instant;

use cutplane_model::{Model, VariableId};
use cutplane_solver::{Backend, Hooks, SolverOutput, relative_gap};
use tracing::{debug, info, warn};

use crate::benders::{BendersSolver, FixedVariable, SubOutcome, SubProblem};
use crate::cut::{Cut, LinearCut, partition_cuts};
use crate::error::{DecompError, Stage};
use crate::termination::{StopReason, TerminationPolicy, TerminationTracker};

/// Constraint group holding every appended cut.
pub const CUT_GROUP: &str = "benders";

const VIOLATION_TOLERANCE: f64 = 1e-6;

/// A subproblem and how it hangs off the master.
#[derive(Debug, Clone)]
pub struct LinkedSub {
    pub model: Model,
    /// Master column bounding this subproblem's objective.
    pub theta: Option<VariableId>,
    /// `(sub column, master column)` pairs pinned on every round.
    pub links: Vec<(VariableId, VariableId)>,
}

impl LinkedSub {
    pub fn new(model: Model, theta: Option<VariableId>, links: Vec<(VariableId, VariableId)>) -> Self {
        Self {
            model,
            theta,
            links,
        }
    }
}

/// Bounds after one round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundPoint {
    pub iteration: usize,
    /// Master objective, a relaxation bound.
    pub bound: f64,
    /// Objective of the assignment the round evaluated, when every
    /// subproblem was feasible.
    pub incumbent: Option<f64>,
    pub gap: f64,
    pub cuts: usize,
}

#[derive(Debug, Clone)]
pub struct BendersReport {
    /// Master output of the best incumbent round.
    pub best: Option<SolverOutput>,
    /// Objective value of `best` with the subproblem costs in place of the
    /// master estimates.
    pub best_objective: Option<f64>,
    pub iterations: usize,
    pub history: Vec<BoundPoint>,
    pub cuts_added: usize,
    pub stop: StopReason,
}

impl BendersReport {
    pub fn last_bound(&self) -> Option<f64> {
        self.history.last().map(|point| point.bound)
    }
}

/// Runs master, subproblems and cut rounds until the bounds meet or a
/// policy limit is hit.
#[derive(Debug)]
pub struct BendersDriver<B> {
    solver: BendersSolver<B>,
    policy: TerminationPolicy,
}

impl<B: Backend + Sync> BendersDriver<B> {
    pub fn new(solver: BendersSolver<B>, policy: TerminationPolicy) -> Self {
        Self { solver, policy }
    }

    pub fn solver(&self) -> &BendersSolver<B> {
        &self.solver
    }

    /// Iterate on `master`, appending cuts as rows named
    /// `benders_<kind>_<n>` in group [`CUT_GROUP`].
    pub fn run(&self, master: &mut Model, subs: &[LinkedSub]) -> Result<BendersReport, DecompError> {
        let started = Instant::now();
        let sense = master.objective().sense;
        let mut tracker = TerminationTracker::new(self.policy.clone(), sense);
        let mut history = Vec::new();
        let mut best: Option<(SolverOutput, f64)> = None;
        let mut cuts_added = 0;

        let stop = loop {
            let iteration = tracker.iterations();
            let output = self
                .solver
                .solve_master(master, Hooks::new(), None)
                .map_err(|err| DecompError::from_solve(Stage::Master, err))?;

            let problems: Vec<SubProblem<'_>> = subs
                .iter()
                .map(|sub| SubProblem {
                    model: &sub.model,
                    link: sub.theta,
                    fixed: FixedVariable::from_solution(&sub.links, &output.solution),
                })
                .collect();
            let mut outcomes = Vec::with_capacity(problems.len());
            for result in self.solver.solve_subs(&problems, |_| Hooks::new()) {
                outcomes.push(result.map_err(|err| DecompError::from_solve(Stage::Sub, err))?);
            }

            let incumbent = evaluate_round(&output, subs, &outcomes);
            let violated = linear_cuts(subs, outcomes)?
                .into_iter()
                .map(Cut::from)
                .filter(|cut| cut.violation(&output.solution) > VIOLATION_TOLERANCE)
                .collect::<Vec<_>>();

            let round_cuts = violated.len();
            for cut in violated {
                let name = format!("benders_{}_{cuts_added}", cut.kind());
                master.add_constraint(cut.to_constraint(name, Some(CUT_GROUP)))?;
                cuts_added += 1;
            }

            if let Some(value) = incumbent {
                let improved = best
                    .as_ref()
                    .is_none_or(|(_, known)| sense.is_better(value, *known));
                if improved {
                    best = Some((output.clone(), value));
                }
            }
            let best_value = best.as_ref().map(|(_, value)| *value);
            let gap = best_value.map_or(f64::INFINITY, |value| relative_gap(value, output.objective));
            history.push(BoundPoint {
                iteration,
                bound: output.objective,
                incumbent,
                gap,
                cuts: round_cuts,
            });
            debug!(
                component = "benders",
                operation = "iterate",
                status = "success",
                iteration,
                bound = output.objective,
                incumbent = ?incumbent,
                gap,
                cuts = round_cuts,
                "Benders round finished"
            );

            if round_cuts == 0 {
                break match incumbent {
                    Some(_) => StopReason::GapClosed,
                    None => StopReason::Stalled,
                };
            }
            if let Some(reason) = tracker.check_gap(gap) {
                break reason;
            }
            let reason = match best_value {
                Some(value) => tracker.record(value),
                None => tracker.record_iteration(),
            };
            if let Some(reason) = reason {
                break reason;
            }
        };

        info!(
            component = "benders",
            operation = "run",
            status = "success",
            stop = stop.as_str(),
            iterations = history.len(),
            cuts_added,
            best = ?best.as_ref().map(|(_, value)| *value),
            duration_ms = started.elapsed().as_secs_f64() * 1000.0,
            "Benders loop stopped"
        );

        let (best, best_objective) = match best {
            Some((output, value)) => (Some(output), Some(value)),
            None => (None, None),
        };
        Ok(BendersReport {
            best,
            best_objective,
            iterations: history.len(),
            history,
            cuts_added,
            stop,
        })
    }
}

/// Linear cuts of a round. The master is a linear model, so a subproblem
/// whose pinned bilinear cells produced a quadratic cut fails the round
/// before any row is appended.
fn linear_cuts(subs: &[LinkedSub], outcomes: Vec<SubOutcome>) -> Result<Vec<LinearCut>, DecompError> {
    let mut linear = Vec::new();
    for (sub, outcome) in subs.iter().zip(outcomes) {
        let (cuts, quadratic) = partition_cuts(outcome.into_cuts());
        if let Some(cut) = quadratic.first() {
            warn!(
                component = "benders",
                operation = "iterate",
                status = "error",
                subproblem = sub.model.name(),
                kind = cut.kind.as_str(),
                "Subproblem produced a quadratic cut"
            );
            return Err(DecompError::QuadraticCut {
                sub: sub.model.name().to_string(),
                kind: cut.kind,
            });
        }
        linear.extend(cuts);
    }
    Ok(linear)
}

/// True objective of the round's master assignment: the master objective
/// with every estimate column replaced by its subproblem's value. `None`
/// when a subproblem was infeasible.
fn evaluate_round(output: &SolverOutput, subs: &[LinkedSub], outcomes: &[SubOutcome]) -> Option<f64> {
    let mut value = output.objective;
    for (sub, outcome) in subs.iter().zip(outcomes) {
        let objective = outcome.objective()?;
        if let Some(theta) = sub.theta {
            let estimate = output.value(theta.index()).unwrap_or(0.0);
            value += objective - estimate;
        }
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use cutplane_model::{QuadraticTerm, Sign, Term};
    use cutplane_solver::SolverStatus;

    use super::*;
    use crate::cut::CutKind;

    fn master_output(objective: f64, solution: Vec<f64>) -> SolverOutput {
        SolverOutput {
            objective,
            solution,
            elapsed: Duration::ZERO,
            bound: objective,
            gap: 0.0,
            status: SolverStatus::Optimal,
        }
    }

    #[test]
    fn test_quadratic_cut_fails_the_round() {
        let x = VariableId::new(0);
        let y = VariableId::new(1);
        let linear = Cut::new(CutKind::Feasibility, vec![Term::new(x, 1.0)], Vec::new(), Sign::GreaterEqual, 1.0);
        let quadratic = Cut::new(
            CutKind::Optimality,
            vec![Term::new(x, 1.0)],
            vec![QuadraticTerm::new(x, y, 2.0)],
            Sign::GreaterEqual,
            3.0,
        );
        let subs = vec![
            LinkedSub::new(Model::new("plain"), None, Vec::new()),
            LinkedSub::new(Model::new("bilinear"), None, Vec::new()),
        ];
        let outcomes = |second: Cut| {
            vec![
                SubOutcome::Infeasible {
                    farkas: Vec::new().into(),
                    cuts: vec![linear.clone()],
                },
                SubOutcome::Infeasible {
                    farkas: Vec::new().into(),
                    cuts: vec![second],
                },
            ]
        };

        let kept = linear_cuts(&subs, outcomes(linear.clone())).unwrap();
        assert_eq!(kept.len(), 2);

        let err = linear_cuts(&subs, outcomes(quadratic)).unwrap_err();
        assert_eq!(err.code(), "DECOMP_QUADRATIC_CUT");
        match err {
            DecompError::QuadraticCut { sub, kind } => {
                assert_eq!(sub, "bilinear");
                assert_eq!(kind, CutKind::Optimality);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_evaluate_round_swaps_estimates_for_sub_values() {
        let theta = VariableId::new(1);
        let subs = vec![LinkedSub::new(Model::new("sub"), Some(theta), Vec::new())];
        let outcomes = vec![SubOutcome::Feasible {
            output: master_output(7.0, vec![]),
            dual: Vec::new().into(),
            cuts: Vec::new(),
        }];
        // master 3 = x (1) + theta (2); sub says theta should be 7.
        let value = evaluate_round(&master_output(3.0, vec![1.0, 2.0]), &subs, &outcomes);
        assert_eq!(value, Some(8.0));

        let infeasible = vec![SubOutcome::Infeasible {
            farkas: Vec::new().into(),
            cuts: Vec::new(),
        }];
        assert_eq!(evaluate_round(&master_output(3.0, vec![1.0, 2.0]), &subs, &infeasible), None);
    }
}
