#![allow(clippy::float_cmp)]

use std::cell::RefCell;
use std::ops::ControlFlow;

use cutplane_highs::{HighsBackend, HighsHandle};
use cutplane_model::{Bounds, Constraint, Model, Objective, Sign, Term, Variable, VariableId};
use cutplane_solver::{
    Backend, HookPoint, Hooks, SolveError, SolverConfig, SolverHandle, SolverStatus, SolvingStatus,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("cutplane_highs=debug")
        .try_init();
}

fn covering_model() -> (Model, VariableId, VariableId) {
    let mut model = Model::new("covering");
    let x = model
        .add_variable(Variable::continuous("x", Bounds::non_negative()))
        .unwrap();
    let y = model
        .add_variable(Variable::continuous("y", Bounds::non_negative()))
        .unwrap();
    model
        .add_constraint(Constraint::new(
            "cover",
            vec![Term::new(x, 1.0), Term::new(y, 1.0)],
            Sign::GreaterEqual,
            5.0,
        ))
        .unwrap();
    model
        .set_objective(Objective::minimize(vec![Term::new(x, 2.0), Term::new(y, 3.0)]))
        .unwrap();
    (model, x, y)
}

#[test]
fn test_lp_objective_matches_solution() {
    init_tracing();
    let (model, x, _) = covering_model();
    let backend = HighsBackend::default();
    let output = backend.solve(&model, &mut Hooks::new(), None).unwrap();

    assert_eq!(output.status, SolverStatus::Optimal);
    assert_eq!(output.solution.len(), model.num_variables());
    assert!((output.objective - 10.0).abs() < 1e-6);
    assert!((model.evaluate_objective(&output.solution) - output.objective).abs() < 1e-6);
    assert!((output.solution[x.index()] - 5.0).abs() < 1e-6);
    assert_eq!(output.gap, 0.0);
}

#[test]
fn test_objective_constant_is_reported() {
    let (mut model, x, y) = covering_model();
    model
        .set_objective(
            Objective::minimize(vec![Term::new(x, 2.0), Term::new(y, 3.0)]).with_constant(1.5),
        )
        .unwrap();
    let output = HighsBackend::default()
        .solve(&model, &mut Hooks::new(), None)
        .unwrap();
    assert!((output.objective - 11.5).abs() < 1e-6);
}

#[test]
fn test_row_duals_and_reduced_costs_from_hook() {
    let (model, _, _) = covering_model();
    let captured = RefCell::new(None);
    let mut hooks: Hooks<'_, HighsHandle> = Hooks::new();
    hooks.on(HookPoint::AnalyzingSolution, |handle, _| {
        *captured.borrow_mut() = Some((handle.row_duals()?, handle.reduced_costs()?));
        Ok(())
    });
    HighsBackend::default().solve(&model, &mut hooks, None).unwrap();
    drop(hooks);

    let (duals, reduced) = captured.into_inner().unwrap();
    assert_eq!(duals.len(), 1);
    assert!((duals.as_slice()[0] - 2.0).abs() < 1e-6);
    assert_eq!(reduced.len(), 2);
    assert!((reduced[1] - 1.0).abs() < 1e-6);
}

#[test]
fn test_folded_row_dual_matches_explicit_row() {
    let mut model = Model::new("fold");
    let x = model
        .add_variable(Variable::continuous("x", Bounds::non_negative()))
        .unwrap();
    model
        .add_constraint(Constraint::new(
            "floor",
            vec![Term::new(x, 2.0)],
            Sign::GreaterEqual,
            6.0,
        ))
        .unwrap();
    model
        .set_objective(Objective::minimize(vec![Term::new(x, 1.0)]))
        .unwrap();

    let mut duals = Vec::new();
    for fold in [false, true] {
        let backend =
            HighsBackend::new(SolverConfig::new().with_fold_singleton_rows(fold));
        let captured = RefCell::new(Vec::new());
        let mut hooks: Hooks<'_, HighsHandle> = Hooks::new();
        hooks.on(HookPoint::AnalyzingSolution, |handle, _| {
            assert_eq!(handle.num_folded_rows(), usize::from(fold));
            captured.borrow_mut().push(handle.row_duals()?.into_inner());
            Ok(())
        });
        let output = backend.solve(&model, &mut hooks, None).unwrap();
        drop(hooks);
        assert!((output.objective - 3.0).abs() < 1e-6);
        duals.extend(captured.into_inner());
    }
    assert!((duals[0][0] - 0.5).abs() < 1e-6);
    assert!((duals[1][0] - 0.5).abs() < 1e-6);
}

/// Row duals of `model` solved with explicit rows, then with singleton rows
/// folded into column bounds.
fn duals_with_and_without_folding(model: &Model, expected_folds: usize) -> [Vec<f64>; 2] {
    let mut solved = Vec::new();
    let mut objectives = Vec::new();
    for fold in [false, true] {
        let backend = HighsBackend::new(SolverConfig::new().with_fold_singleton_rows(fold));
        let captured = RefCell::new(None);
        let mut hooks: Hooks<'_, HighsHandle> = Hooks::new();
        hooks.on(HookPoint::AnalyzingSolution, |handle, _| {
            let folds = if fold { expected_folds } else { 0 };
            assert_eq!(handle.num_folded_rows(), folds);
            *captured.borrow_mut() = Some(handle.row_duals()?.into_inner());
            Ok(())
        });
        let output = backend.solve(model, &mut hooks, None).unwrap();
        drop(hooks);
        objectives.push(output.objective);
        solved.push(captured.into_inner().unwrap());
    }
    assert!((objectives[0] - objectives[1]).abs() < 1e-6);
    let folded = solved.pop().unwrap();
    let explicit = solved.pop().unwrap();
    [explicit, folded]
}

fn assert_duals(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len());
    for (got, want) in actual.iter().zip(expected) {
        assert!((got - want).abs() < 1e-6, "dual {got} != {want} in {actual:?}");
    }
}

#[test]
fn test_folded_dual_at_upper_bound() {
    // min -x, x <= 4: the folded row becomes the column's upper bound.
    let mut model = Model::new("fold_upper");
    let x = model
        .add_variable(Variable::continuous("x", Bounds::non_negative()))
        .unwrap();
    model
        .add_constraint(Constraint::new("cap", vec![Term::new(x, 1.0)], Sign::LessEqual, 4.0))
        .unwrap();
    model
        .set_objective(Objective::minimize(vec![Term::new(x, -1.0)]))
        .unwrap();

    let [explicit, folded] = duals_with_and_without_folding(&model, 1);
    assert_duals(&explicit, &[-1.0]);
    assert_duals(&folded, &explicit);
}

#[test]
fn test_folded_dual_with_negative_coefficient() {
    // -2x <= -6 is x >= 3 with the price scaled by the coefficient.
    let mut model = Model::new("fold_negative");
    let x = model
        .add_variable(Variable::continuous("x", Bounds::non_negative()))
        .unwrap();
    model
        .add_constraint(Constraint::new(
            "floor",
            vec![Term::new(x, -2.0)],
            Sign::LessEqual,
            -6.0,
        ))
        .unwrap();
    model
        .set_objective(Objective::minimize(vec![Term::new(x, 1.0)]))
        .unwrap();

    let [explicit, folded] = duals_with_and_without_folding(&model, 1);
    assert_duals(&explicit, &[-0.5]);
    assert_duals(&folded, &explicit);
}

#[test]
fn test_folded_dual_in_maximization() {
    // max 3x + 2y, x + y <= 4, x <= 3: optimum (3, 1) prices both rows.
    let mut model = Model::new("fold_max");
    let x = model
        .add_variable(Variable::continuous("x", Bounds::non_negative()))
        .unwrap();
    let y = model
        .add_variable(Variable::continuous("y", Bounds::non_negative()))
        .unwrap();
    model
        .add_constraint(Constraint::new(
            "budget",
            vec![Term::new(x, 1.0), Term::new(y, 1.0)],
            Sign::LessEqual,
            4.0,
        ))
        .unwrap();
    model
        .add_constraint(Constraint::new("x_cap", vec![Term::new(x, 1.0)], Sign::LessEqual, 3.0))
        .unwrap();
    model
        .set_objective(Objective::maximize(vec![
            Term::new(x, 3.0),
            Term::new(y, 2.0),
        ]))
        .unwrap();

    let [explicit, folded] = duals_with_and_without_folding(&model, 1);
    assert!(explicit.iter().all(|dual| dual.abs() > 1e-6));
    assert!((explicit[0].abs() - 2.0).abs() < 1e-6);
    assert!((explicit[1].abs() - 1.0).abs() < 1e-6);
    assert_duals(&folded, &explicit);
}

#[test]
fn test_two_folded_rows_on_one_column_price_the_binding_one() {
    // x >= 2 and 2x >= 6 both fold onto x; only the second is binding.
    let mut model = Model::new("fold_twice");
    let x = model
        .add_variable(Variable::continuous("x", Bounds::non_negative()))
        .unwrap();
    let y = model
        .add_variable(Variable::continuous("y", Bounds::non_negative()))
        .unwrap();
    model
        .add_constraint(Constraint::new("loose", vec![Term::new(x, 1.0)], Sign::GreaterEqual, 2.0))
        .unwrap();
    model
        .add_constraint(Constraint::new(
            "cover",
            vec![Term::new(x, 1.0), Term::new(y, 1.0)],
            Sign::GreaterEqual,
            5.0,
        ))
        .unwrap();
    model
        .add_constraint(Constraint::new("tight", vec![Term::new(x, 2.0)], Sign::GreaterEqual, 6.0))
        .unwrap();
    model
        .set_objective(Objective::minimize(vec![
            Term::new(x, 1.0),
            Term::new(y, 3.0),
        ]))
        .unwrap();

    // x = 5, y = 0: "cover" is binding at price 1 and both folded rows slack.
    let [explicit, folded] = duals_with_and_without_folding(&model, 2);
    assert_duals(&explicit, &[0.0, 1.0, 0.0]);
    assert_duals(&folded, &explicit);

    // Make y cheap: x = 3 pinned by "tight", y = 2 covers the rest.
    model
        .set_objective(Objective::minimize(vec![
            Term::new(x, 1.0),
            Term::new(y, 0.5),
        ]))
        .unwrap();
    let [explicit, folded] = duals_with_and_without_folding(&model, 2);
    assert_duals(&explicit, &[0.0, 0.5, 0.25]);
    assert_duals(&folded, &explicit);
}

#[test]
fn test_infeasible_runs_failure_hooks() {
    let mut model = Model::new("infeasible");
    let x = model
        .add_variable(Variable::continuous("x", Bounds::new(0.0, 1.0)))
        .unwrap();
    model
        .add_constraint(Constraint::new(
            "impossible",
            vec![Term::new(x, 1.0)],
            Sign::GreaterEqual,
            3.0,
        ))
        .unwrap();
    model
        .set_objective(Objective::minimize(vec![Term::new(x, 1.0)]))
        .unwrap();

    let seen = RefCell::new(None);
    let mut hooks: Hooks<'_, HighsHandle> = Hooks::new();
    hooks.on(HookPoint::AfterFailure, |_, context| {
        *seen.borrow_mut() = context.status();
        Ok(())
    });
    let err = HighsBackend::default()
        .solve(&model, &mut hooks, None)
        .unwrap_err();
    drop(hooks);
    assert!(matches!(err, SolveError::Infeasible));
    assert_eq!(seen.into_inner(), Some(SolverStatus::Infeasible));
}

#[test]
fn test_farkas_ray_on_infeasible_lp() {
    let mut model = Model::new("farkas");
    let x = model
        .add_variable(Variable::continuous("x", Bounds::new(0.0, 0.0)))
        .unwrap();
    let y = model
        .add_variable(Variable::continuous("y", Bounds::new(0.0, 0.0)))
        .unwrap();
    model
        .add_constraint(Constraint::new(
            "demand",
            vec![Term::new(x, 1.0), Term::new(y, 1.0)],
            Sign::GreaterEqual,
            5.0,
        ))
        .unwrap();
    model
        .set_objective(Objective::minimize(vec![Term::new(x, 1.0)]))
        .unwrap();

    let ray = RefCell::new(None);
    let mut hooks: Hooks<'_, HighsHandle> = Hooks::new();
    hooks.on(HookPoint::BeforeSolving, |handle, _| {
        assert!(handle.enable_farkas());
        Ok(())
    });
    hooks.on(HookPoint::AfterFailure, |handle, _| {
        *ray.borrow_mut() = handle.farkas_dual();
        Ok(())
    });
    let err = HighsBackend::default()
        .solve(&model, &mut hooks, None)
        .unwrap_err();
    drop(hooks);
    assert!(err.is_infeasible());
    if let Some(ray) = ray.into_inner() {
        assert_eq!(ray.len(), 1);
        assert!(ray.as_slice()[0] != 0.0);
    }
}

#[test]
fn test_hook_order_and_failure() {
    let (model, _, _) = covering_model();
    let order = RefCell::new(Vec::new());
    let mut hooks: Hooks<'_, HighsHandle> = Hooks::new();
    for point in [
        HookPoint::AnalyzingSolution,
        HookPoint::BeforeSolving,
        HookPoint::Configuration,
        HookPoint::AfterModeling,
        HookPoint::AfterFailure,
    ] {
        let order = &order;
        hooks.on(point, move |_, _| {
            order.borrow_mut().push(point);
            Ok(())
        });
    }
    HighsBackend::default().solve(&model, &mut hooks, None).unwrap();
    drop(hooks);
    assert_eq!(
        order.into_inner(),
        vec![
            HookPoint::AfterModeling,
            HookPoint::Configuration,
            HookPoint::BeforeSolving,
            HookPoint::AnalyzingSolution,
        ]
    );

    let mut failing: Hooks<'_, HighsHandle> = Hooks::new();
    failing.on(HookPoint::Configuration, |handle, _| {
        handle.set_parameter("time_limit", cutplane_solver::ParameterValue::Float(10.0))?;
        Err(SolveError::Solving("refused".to_string()))
    });
    let err = HighsBackend::default()
        .solve(&model, &mut failing, None)
        .unwrap_err();
    assert!(matches!(
        err,
        SolveError::HookFailed {
            point: HookPoint::Configuration,
            ..
        }
    ));
}

fn knapsack() -> Model {
    let mut model = Model::new("knapsack");
    let items: Vec<VariableId> = (0..4)
        .map(|idx| model.add_variable(Variable::binary(format!("take_{idx}"))).unwrap())
        .collect();
    let weights = [2.0, 3.0, 4.0, 5.0];
    let values = [3.0, 4.0, 5.0, 6.0];
    model
        .add_constraint(Constraint::new(
            "capacity",
            items
                .iter()
                .zip(weights)
                .map(|(item, weight)| Term::new(*item, weight))
                .collect(),
            Sign::LessEqual,
            5.0,
        ))
        .unwrap();
    model
        .set_objective(Objective::maximize(
            items
                .iter()
                .zip(values)
                .map(|(item, value)| Term::new(*item, value))
                .collect(),
        ))
        .unwrap();
    model
}

#[test]
fn test_mip_reports_bound_and_rejects_duals() {
    let model = knapsack();
    let rejected = RefCell::new(false);
    let mut hooks: Hooks<'_, HighsHandle> = Hooks::new();
    hooks.on(HookPoint::AnalyzingSolution, |handle, _| {
        *rejected.borrow_mut() = matches!(handle.row_duals(), Err(SolveError::MissingDuals(_)));
        Ok(())
    });
    let output = HighsBackend::default().solve(&model, &mut hooks, None).unwrap();
    drop(hooks);
    assert!((output.objective - 7.0).abs() < 1e-6);
    assert!(output.gap < 1e-6);
    assert!(rejected.into_inner());
}

#[test]
fn test_pool_starts_with_incumbent_and_is_distinct() {
    let model = knapsack();
    let (output, pool) = HighsBackend::default()
        .solve_pool(&model, 3, &mut Hooks::new(), None)
        .unwrap();
    assert!(!pool.is_empty() && pool.len() <= 3);
    assert_eq!(pool[0], output.solution);
    for (idx, first) in pool.iter().enumerate() {
        for second in &pool[idx + 1..] {
            assert_ne!(first, second);
        }
    }

    let (lp, _, _) = covering_model();
    let (_, single) = HighsBackend::default()
        .solve_pool(&lp, 5, &mut Hooks::new(), None)
        .unwrap();
    assert_eq!(single.len(), 1);
}

#[test]
fn test_monitored_mip_reports_progress() {
    let model = knapsack();
    let ticks = RefCell::new(0usize);
    let mut callback = |_: &SolvingStatus| {
        *ticks.borrow_mut() += 1;
        ControlFlow::Continue(())
    };
    let backend = HighsBackend::new(
        SolverConfig::new()
            .with_presolve(false)
            .with_progress_interval(0.5),
    );
    let output = backend
        .solve(&model, &mut Hooks::new(), Some(&mut callback))
        .unwrap();
    assert!((output.objective - 7.0).abs() < 1e-6);
    assert!(ticks.into_inner() >= 1);
}

#[test]
fn test_callback_break_interrupts_mip_before_incumbent() {
    init_tracing();
    let model = knapsack();
    let mut calls = 0usize;
    let mut callback = |_: &SolvingStatus| {
        calls += 1;
        ControlFlow::Break(())
    };
    let backend = HighsBackend::new(SolverConfig::new().with_presolve(false));
    let err = backend
        .solve(&model, &mut Hooks::new(), Some(&mut callback))
        .unwrap_err();
    assert_eq!(err.code(), "SOLVER_INTERRUPTED");
    assert_eq!(calls, 1);
}

/// Transportation LP: 6 plants with capacity 10 serving 6 markets that
/// each need 8.
fn transport_lp() -> Model {
    let size = 6;
    let mut model = Model::new("transport");
    let mut ship = Vec::new();
    for plant in 0..size {
        for market in 0..size {
            ship.push(
                model
                    .add_variable(Variable::continuous(
                        format!("ship_{plant}_{market}"),
                        Bounds::non_negative(),
                    ))
                    .unwrap(),
            );
        }
    }
    for plant in 0..size {
        model
            .add_constraint(Constraint::new(
                format!("capacity_{plant}"),
                (0..size).map(|market| Term::new(ship[plant * size + market], 1.0)).collect(),
                Sign::LessEqual,
                10.0,
            ))
            .unwrap();
    }
    for market in 0..size {
        model
            .add_constraint(Constraint::new(
                format!("demand_{market}"),
                (0..size).map(|plant| Term::new(ship[plant * size + market], 1.0)).collect(),
                Sign::GreaterEqual,
                8.0,
            ))
            .unwrap();
    }
    model
        .set_objective(Objective::minimize(
            ship.iter()
                .enumerate()
                .map(|(idx, var)| {
                    let (plant, market) = (idx / size, idx % size);
                    Term::new(*var, 1.0 + ((plant * 7 + market * 3) % 11) as f64)
                })
                .collect(),
        ))
        .unwrap();
    model
}

#[test]
fn test_lp_progress_reaches_callback() {
    init_tracing();
    let model = transport_lp();
    let seen = RefCell::new(Vec::new());
    let mut callback = |status: &SolvingStatus| {
        seen.borrow_mut().push(*status);
        ControlFlow::Continue(())
    };
    let backend = HighsBackend::new(SolverConfig::new().with_presolve(false));
    let output = backend
        .solve(&model, &mut Hooks::new(), Some(&mut callback))
        .unwrap();
    assert_eq!(output.status, SolverStatus::Optimal);
    let seen = seen.into_inner();
    assert!(!seen.is_empty());
    // Simplex interrupt points carry no objective.
    assert!(seen.iter().all(|status| status.gap.is_infinite()));
}

#[test]
fn test_callback_break_interrupts_lp() {
    init_tracing();
    let model = transport_lp();
    let mut calls = 0usize;
    let mut callback = |_: &SolvingStatus| {
        calls += 1;
        ControlFlow::Break(())
    };
    let backend = HighsBackend::new(SolverConfig::new().with_presolve(false));
    let result = backend.solve(&model, &mut Hooks::new(), Some(&mut callback));
    assert_eq!(calls, 1);
    match result {
        Err(err) => assert_eq!(err.code(), "SOLVER_INTERRUPTED"),
        Ok(output) => assert_eq!(output.status, SolverStatus::Feasible),
    }
}

#[test]
fn test_pool_rounds_report_progress() {
    let model = knapsack();
    let ticks = RefCell::new(0usize);
    let mut callback = |_: &SolvingStatus| {
        *ticks.borrow_mut() += 1;
        ControlFlow::Continue(())
    };
    let backend = HighsBackend::new(SolverConfig::new().with_presolve(false));
    let (_, pool) = backend
        .solve_pool(&model, 3, &mut Hooks::new(), Some(&mut callback))
        .unwrap();
    assert!(pool.len() >= 2);
    // One tick for the first solve and at least one per pool round.
    assert!(ticks.into_inner() >= pool.len());
}

#[test]
fn test_semi_continuous_column() {
    let mut model = Model::new("semi");
    let x = model
        .add_variable(Variable::semi_continuous("x", Bounds::new(2.0, 8.0)))
        .unwrap();
    model
        .add_constraint(Constraint::new(
            "need",
            vec![Term::new(x, 1.0)],
            Sign::GreaterEqual,
            1.0,
        ))
        .unwrap();
    model
        .set_objective(Objective::minimize(vec![Term::new(x, 1.0)]))
        .unwrap();

    let output = HighsBackend::default()
        .solve(&model, &mut Hooks::new(), None)
        .unwrap();
    assert_eq!(output.solution.len(), 1);
    assert!((output.solution[0] - 2.0).abs() < 1e-6);
}

#[test]
fn test_quadratic_model_is_rejected() {
    let (mut model, x, y) = covering_model();
    model
        .set_objective(
            Objective::minimize(vec![Term::new(x, 1.0)])
                .with_quadratic_terms(vec![cutplane_model::QuadraticTerm::new(x, y, 1.0)]),
        )
        .unwrap();
    let err = HighsBackend::default()
        .solve(&model, &mut Hooks::new(), None)
        .unwrap_err();
    assert_eq!(err.code(), "SOLVER_MODELING");
}
