//! Backends composed from several members of one backend type.
//!
//! [`SerialBackend`] tries its members in order and moves on when a member
//! fails for a reason another member might not share. [`ParallelBackend`]
//! races its members and keeps the first or the best answer.
//!
//! Members are usually the same native solver under different
//! configurations, for example HiGHS with presolve on and off.

use std::ops::ControlFlow;
use std::time::Instant;

use cutplane_model::{Model, Sense};
use tracing::{debug, warn};

use crate::backend::Backend;
use crate::config::SolverConfig;
use crate::error::SolveError;
use crate::hooks::Hooks;
use crate::output::SolverOutput;
use crate::progress::{SolvingStatus, StatusCallback};

/// Error codes that end a combined solve without trying further members.
pub const DEFAULT_STOP_CODES: &[&str] = &["SOLVER_INFEASIBLE", "SOLVER_UNBOUNDED"];

fn describe<B: Backend>(kind: &str, members: &[B]) -> String {
    let names: Vec<&str> = members.iter().map(|member| member.name()).collect();
    format!("{kind}({})", names.join(","))
}

fn no_solver(combined: &str, last: Option<SolveError>) -> SolveError {
    match last {
        Some(err) => SolveError::NoSolver(format!("{combined}: last failure was {err}")),
        None => SolveError::NoSolver(format!("{combined} has no members")),
    }
}

/// Tries each member in order and returns the first success.
///
/// A failure whose code is a stop code is returned at once. Any other
/// failure is logged and the next member is tried. Caller hooks run once
/// per attempted member.
#[derive(Debug)]
pub struct SerialBackend<B> {
    members: Vec<B>,
    stop_codes: Vec<&'static str>,
    config: SolverConfig,
}

impl<B: Backend> SerialBackend<B> {
    pub fn new(members: Vec<B>) -> Self {
        Self {
            members,
            stop_codes: DEFAULT_STOP_CODES.to_vec(),
            config: SolverConfig::new(),
        }
    }

    /// Replace the codes that end the solve without trying further members.
    pub fn with_stop_codes(mut self, codes: impl IntoIterator<Item = &'static str>) -> Self {
        self.stop_codes = codes.into_iter().collect();
        self
    }

    pub fn members(&self) -> &[B] {
        &self.members
    }

    /// Name with the member names, e.g. `serial(highs,highs)`.
    pub fn describe(&self) -> String {
        describe("serial", &self.members)
    }

    fn attempt<T>(
        &self,
        operation: &'static str,
        mut run: impl FnMut(&B) -> Result<T, SolveError>,
    ) -> Result<T, SolveError> {
        let started = Instant::now();
        let mut last = None;
        for (index, member) in self.members.iter().enumerate() {
            match run(member) {
                Ok(value) => {
                    debug!(
                        component = "solver",
                        operation,
                        status = "success",
                        backend = member.name(),
                        member = index,
                        duration_ms = started.elapsed().as_secs_f64() * 1000.0,
                        "Member found a solution"
                    );
                    return Ok(value);
                }
                Err(err) if self.stop_codes.contains(&err.code()) => {
                    debug!(
                        component = "solver",
                        operation,
                        status = "stop",
                        backend = member.name(),
                        member = index,
                        error_code = err.code(),
                        "Member failure ends the combined solve"
                    );
                    return Err(err);
                }
                Err(err) => {
                    warn!(
                        component = "solver",
                        operation,
                        status = "error",
                        backend = member.name(),
                        member = index,
                        error_code = err.code(),
                        "Member failed, trying the next one"
                    );
                    last = Some(err);
                }
            }
        }
        Err(no_solver(&self.describe(), last))
    }
}

impl<B: Backend> Backend for SerialBackend<B> {
    type Handle = B::Handle;

    fn name(&self) -> &'static str {
        "serial"
    }

    /// Members keep their own configuration; this one is empty.
    fn config(&self) -> &SolverConfig {
        &self.config
    }

    fn solve(
        &self,
        model: &Model,
        hooks: &mut Hooks<'_, Self::Handle>,
        mut callback: Option<&mut StatusCallback<'_>>,
    ) -> Result<SolverOutput, SolveError> {
        self.attempt("serial_solve", |member| {
            member.solve(model, hooks, callback.as_deref_mut())
        })
    }

    fn solve_pool(
        &self,
        model: &Model,
        pool_size: usize,
        hooks: &mut Hooks<'_, Self::Handle>,
        mut callback: Option<&mut StatusCallback<'_>>,
    ) -> Result<(SolverOutput, Vec<Vec<f64>>), SolveError> {
        self.attempt("serial_solve_pool", |member| {
            member.solve_pool(model, pool_size, hooks, callback.as_deref_mut())
        })
    }
}

/// Which answer a [`ParallelBackend`] keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParallelMode {
    /// The first member to succeed wins; the others are asked to stop.
    First,
    /// Every member runs to the end and the best objective wins.
    #[default]
    Best,
}

impl ParallelMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ParallelMode::First => "first",
            ParallelMode::Best => "best",
        }
    }
}

/// Races its members, concurrently when the `parallel` feature is enabled.
///
/// Members report progress to a relay; the caller's callback sees a merged
/// stream that only moves when the objective improves, and a `Break` from
/// it stops every member. Caller hooks need the live handle of the winning
/// solve, so when hooks are registered the winner is solved once more on
/// the calling thread with them.
#[derive(Debug)]
pub struct ParallelBackend<B> {
    members: Vec<B>,
    mode: ParallelMode,
    stop_codes: Vec<&'static str>,
    config: SolverConfig,
}

impl<B: Backend + Sync> ParallelBackend<B> {
    pub fn new(members: Vec<B>, mode: ParallelMode) -> Self {
        Self {
            members,
            mode,
            stop_codes: DEFAULT_STOP_CODES.to_vec(),
            config: SolverConfig::new(),
        }
    }

    /// Codes preferred over [`SolveError::NoSolver`] when every member fails.
    pub fn with_stop_codes(mut self, codes: impl IntoIterator<Item = &'static str>) -> Self {
        self.stop_codes = codes.into_iter().collect();
        self
    }

    pub fn members(&self) -> &[B] {
        &self.members
    }

    pub fn mode(&self) -> ParallelMode {
        self.mode
    }

    /// Name with the mode and member names, e.g. `parallel_best(highs,highs)`.
    pub fn describe(&self) -> String {
        describe(&format!("parallel_{}", self.mode.as_str()), &self.members)
    }

    /// Run every member and pick the winner by mode.
    fn race<T, F, O>(
        &self,
        operation: &'static str,
        model: &Model,
        callback: Option<&mut StatusCallback<'_>>,
        run: F,
        objective: O,
    ) -> Result<(usize, T), SolveError>
    where
        T: Send,
        F: Fn(&B, &mut StatusCallback<'_>) -> Result<T, SolveError> + Sync,
        O: Fn(&T) -> f64,
    {
        let started = Instant::now();
        let sense = model.objective().sense;
        let mut merger = StatusMerger::new(sense, callback);
        let mut results: Vec<Option<Result<T, SolveError>>> =
            self.members.iter().map(|_| None).collect();
        let mut finished = Vec::with_capacity(self.members.len());
        let mut record = |index: usize, result: Result<T, SolveError>| {
            let member = self.members[index].name();
            match &result {
                Ok(value) => debug!(
                    component = "solver",
                    operation,
                    status = "success",
                    backend = member,
                    member = index,
                    objective_value = objective(value),
                    "Member found a solution"
                ),
                Err(err) => warn!(
                    component = "solver",
                    operation,
                    status = "error",
                    backend = member,
                    member = index,
                    error_code = err.code(),
                    "Member failed"
                ),
            }
            let succeeded = result.is_ok();
            finished.push(index);
            results[index] = Some(result);
            succeeded
        };

        #[cfg(feature = "parallel")]
        self.race_concurrently(&mut merger, &run, &mut record);
        #[cfg(not(feature = "parallel"))]
        self.race_in_order(&mut merger, &run, &mut record);

        let winner = match self.mode {
            ParallelMode::First => finished
                .iter()
                .copied()
                .find(|&index| matches!(results[index], Some(Ok(_)))),
            ParallelMode::Best => {
                let mut best: Option<(usize, f64)> = None;
                for (index, result) in results.iter().enumerate() {
                    if let Some(Ok(value)) = result {
                        let value = objective(value);
                        if best.is_none_or(|(_, known)| sense.is_better(value, known)) {
                            best = Some((index, value));
                        }
                    }
                }
                best.map(|(index, _)| index)
            }
        };

        if let Some(index) = winner {
            if let Some(Some(Ok(value))) = results.get_mut(index).map(Option::take) {
                debug!(
                    component = "solver",
                    operation,
                    status = "success",
                    combined = %self.describe(),
                    member = index,
                    duration_ms = started.elapsed().as_secs_f64() * 1000.0,
                    "Combined solve finished"
                );
                return Ok((index, value));
            }
        }

        let mut last = None;
        for result in results.into_iter().flatten() {
            if let Err(err) = result {
                if self.stop_codes.contains(&err.code()) {
                    return Err(err);
                }
                last = Some(err);
            }
        }
        Err(no_solver(&self.describe(), last))
    }

    #[cfg(feature = "parallel")]
    fn race_concurrently<T, F>(
        &self,
        merger: &mut StatusMerger<'_, '_>,
        run: &F,
        record: &mut dyn FnMut(usize, Result<T, SolveError>) -> bool,
    ) where
        T: Send,
        F: Fn(&B, &mut StatusCallback<'_>) -> Result<T, SolveError> + Sync,
    {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::mpsc::{self, RecvTimeoutError};
        use std::time::Duration;

        enum Message<T> {
            Status(SolvingStatus),
            Finished(usize, Result<T, SolveError>),
        }

        const POLL: Duration = Duration::from_millis(5);

        let cancel = AtomicBool::new(false);
        let (sender, receiver) = mpsc::channel::<Message<T>>();
        rayon::in_place_scope(|scope| {
            for (index, member) in self.members.iter().enumerate() {
                let sender = sender.clone();
                let cancel = &cancel;
                scope.spawn(move |_| {
                    let mut relay = |status: &SolvingStatus| {
                        if cancel.load(Ordering::Relaxed) {
                            return ControlFlow::Break(());
                        }
                        // The receiver outlives every member.
                        let _ = sender.send(Message::Status(*status));
                        ControlFlow::Continue(())
                    };
                    let result = run(member, &mut relay);
                    let _ = sender.send(Message::Finished(index, result));
                });
            }
            drop(sender);

            // Waiting here keeps the caller's callback on this thread. Inside
            // the pool, waiting also runs queued members.
            loop {
                match receiver.recv_timeout(POLL) {
                    Ok(Message::Status(status)) => {
                        if merger.forward(&status).is_break() {
                            cancel.store(true, Ordering::Relaxed);
                        }
                    }
                    Ok(Message::Finished(index, result)) => {
                        if record(index, result) && self.mode == ParallelMode::First {
                            cancel.store(true, Ordering::Relaxed);
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => {
                        let _ = rayon::yield_now();
                    }
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        });
    }

    #[cfg(not(feature = "parallel"))]
    fn race_in_order<T, F>(
        &self,
        merger: &mut StatusMerger<'_, '_>,
        run: &F,
        record: &mut dyn FnMut(usize, Result<T, SolveError>) -> bool,
    ) where
        F: Fn(&B, &mut StatusCallback<'_>) -> Result<T, SolveError>,
    {
        for (index, member) in self.members.iter().enumerate() {
            let mut cancelled = false;
            let result = {
                let mut relay = |status: &SolvingStatus| {
                    let flow = merger.forward(status);
                    cancelled |= flow.is_break();
                    flow
                };
                run(member, &mut relay)
            };
            let succeeded = record(index, result);
            if cancelled || (succeeded && self.mode == ParallelMode::First) {
                break;
            }
        }
    }
}

impl<B: Backend + Sync> Backend for ParallelBackend<B> {
    type Handle = B::Handle;

    fn name(&self) -> &'static str {
        "parallel"
    }

    /// Members keep their own configuration; this one is empty.
    fn config(&self) -> &SolverConfig {
        &self.config
    }

    fn solve(
        &self,
        model: &Model,
        hooks: &mut Hooks<'_, Self::Handle>,
        mut callback: Option<&mut StatusCallback<'_>>,
    ) -> Result<SolverOutput, SolveError> {
        let (index, output) = self.race(
            "parallel_solve",
            model,
            callback.as_deref_mut(),
            |member: &B, relay: &mut StatusCallback<'_>| {
                member.solve(model, &mut Hooks::new(), Some(relay))
            },
            |output: &SolverOutput| output.objective,
        )?;
        if hooks.is_empty() {
            return Ok(output);
        }
        self.members[index].solve(model, hooks, callback)
    }

    fn solve_pool(
        &self,
        model: &Model,
        pool_size: usize,
        hooks: &mut Hooks<'_, Self::Handle>,
        mut callback: Option<&mut StatusCallback<'_>>,
    ) -> Result<(SolverOutput, Vec<Vec<f64>>), SolveError> {
        let (index, answer) = self.race(
            "parallel_solve_pool",
            model,
            callback.as_deref_mut(),
            |member: &B, relay: &mut StatusCallback<'_>| {
                member.solve_pool(model, pool_size, &mut Hooks::new(), Some(relay))
            },
            |(output, _): &(SolverOutput, Vec<Vec<f64>>)| output.objective,
        )?;
        if hooks.is_empty() {
            return Ok(answer);
        }
        self.members[index].solve_pool(model, pool_size, hooks, callback)
    }
}

/// Forwards member progress to the caller only when the objective improves.
struct StatusMerger<'a, 'b> {
    sense: Sense,
    best: Option<f64>,
    callback: Option<&'a mut StatusCallback<'b>>,
}

impl<'a, 'b> StatusMerger<'a, 'b> {
    fn new(sense: Sense, callback: Option<&'a mut StatusCallback<'b>>) -> Self {
        Self {
            sense,
            best: None,
            callback,
        }
    }

    fn forward(&mut self, status: &SolvingStatus) -> ControlFlow<()> {
        let improved = self
            .best
            .is_none_or(|best| self.sense.is_better(status.objective, best));
        if !improved {
            return ControlFlow::Continue(());
        }
        self.best = Some(status.objective);
        match self.callback.as_deref_mut() {
            Some(callback) => callback(status),
            None => ControlFlow::Continue(()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use cutplane_model::{Bounds, Objective, Term, Variable};

    use super::*;
    use crate::backend::SolverHandle;
    use crate::config::ParameterValue;
    use crate::hooks::{HookContext, HookPoint};
    use crate::output::DualSolution;
    use crate::status::SolverStatus;

    struct CannedHandle;

    impl SolverHandle for CannedHandle {
        fn row_duals(&self) -> Result<DualSolution, SolveError> {
            Ok(DualSolution::default())
        }

        fn reduced_costs(&self) -> Result<Vec<f64>, SolveError> {
            Ok(Vec::new())
        }

        fn set_parameter(&mut self, _: &str, _: ParameterValue) -> Result<(), SolveError> {
            Ok(())
        }
    }

    /// Reports `ticks` as progress, then answers with `answer`. A member
    /// with `wait_for_cancel` keeps ticking until its callback breaks.
    struct Canned {
        answer: Result<f64, SolveError>,
        ticks: Vec<f64>,
        wait_for_cancel: bool,
        calls: AtomicUsize,
        cancelled: AtomicBool,
        config: SolverConfig,
    }

    impl Canned {
        fn ok(objective: f64) -> Self {
            Self {
                answer: Ok(objective),
                ticks: Vec::new(),
                wait_for_cancel: false,
                calls: AtomicUsize::new(0),
                cancelled: AtomicBool::new(false),
                config: SolverConfig::new(),
            }
        }

        fn failing(err: SolveError) -> Self {
            Self {
                answer: Err(err),
                ..Self::ok(0.0)
            }
        }

        fn ticking(objective: f64, ticks: Vec<f64>) -> Self {
            Self {
                ticks,
                ..Self::ok(objective)
            }
        }

        fn waiting() -> Self {
            Self {
                wait_for_cancel: true,
                ..Self::ok(100.0)
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Backend for Canned {
        type Handle = CannedHandle;

        fn name(&self) -> &'static str {
            "canned"
        }

        fn config(&self) -> &SolverConfig {
            &self.config
        }

        fn solve(
            &self,
            model: &Model,
            hooks: &mut Hooks<'_, CannedHandle>,
            mut callback: Option<&mut StatusCallback<'_>>,
        ) -> Result<SolverOutput, SolveError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let context = HookContext::new(model);
            hooks.run(HookPoint::Configuration, &mut CannedHandle, &context)?;
            let mut report = |objective: f64| {
                let status = SolvingStatus {
                    objective,
                    bound: f64::NEG_INFINITY,
                    gap: f64::INFINITY,
                    elapsed: Duration::ZERO,
                };
                callback
                    .as_deref_mut()
                    .map_or(ControlFlow::Continue(()), |callback| callback(&status))
            };
            for &tick in &self.ticks {
                if report(tick).is_break() {
                    self.cancelled.store(true, Ordering::SeqCst);
                    return Err(SolveError::Interrupted("callback".to_string()));
                }
            }
            if self.wait_for_cancel {
                for _ in 0..5_000 {
                    if report(100.0).is_break() {
                        self.cancelled.store(true, Ordering::SeqCst);
                        return Err(SolveError::Interrupted("callback".to_string()));
                    }
                    std::thread::sleep(Duration::from_millis(1));
                }
                return Err(SolveError::Interrupted("never cancelled".to_string()));
            }
            let objective = self.answer.clone()?;
            let output = SolverOutput {
                objective,
                solution: vec![objective; model.num_variables()],
                elapsed: Duration::ZERO,
                bound: objective,
                gap: 0.0,
                status: SolverStatus::Optimal,
            };
            hooks.run(
                HookPoint::AnalyzingSolution,
                &mut CannedHandle,
                &context.with_status(output.status),
            )?;
            Ok(output)
        }
    }

    fn model(maximize: bool) -> Model {
        let mut model = Model::new("race");
        let x = model
            .add_variable(Variable::continuous("x", Bounds::non_negative()))
            .unwrap();
        let terms = vec![Term::new(x, 1.0)];
        let objective = if maximize {
            Objective::maximize(terms)
        } else {
            Objective::minimize(terms)
        };
        model.set_objective(objective).unwrap();
        model
    }

    #[test]
    fn test_serial_falls_through_ordinary_failures() {
        let backend = SerialBackend::new(vec![
            Canned::failing(SolveError::Solving("numerical trouble".to_string())),
            Canned::ok(4.0),
            Canned::ok(1.0),
        ]);
        let output = backend.solve(&model(false), &mut Hooks::new(), None).unwrap();
        assert_eq!(output.objective, 4.0);
        let calls: Vec<usize> = backend.members().iter().map(Canned::calls).collect();
        assert_eq!(calls, vec![1, 1, 0]);
        assert_eq!(backend.describe(), "serial(canned,canned,canned)");
    }

    #[test]
    fn test_serial_stop_code_short_circuits() {
        let backend = SerialBackend::new(vec![Canned::failing(SolveError::Infeasible), Canned::ok(2.0)]);
        let err = backend.solve(&model(false), &mut Hooks::new(), None).unwrap_err();
        assert!(err.is_infeasible());
        assert_eq!(backend.members()[1].calls(), 0);

        // Without the stop code the next member answers.
        let backend = SerialBackend::new(vec![Canned::failing(SolveError::Infeasible), Canned::ok(2.0)])
            .with_stop_codes(["SOLVER_UNBOUNDED"]);
        let output = backend.solve(&model(false), &mut Hooks::new(), None).unwrap();
        assert_eq!(output.objective, 2.0);
    }

    #[test]
    fn test_serial_without_success_reports_no_solver() {
        let backend = SerialBackend::new(vec![
            Canned::failing(SolveError::Solving("first".to_string())),
            Canned::failing(SolveError::Environment("second".to_string())),
        ]);
        let err = backend
            .solve_pool(&model(false), 3, &mut Hooks::new(), None)
            .unwrap_err();
        assert_eq!(err.code(), "SOLVER_NOT_FOUND");
        assert!(err.to_string().contains("second"));

        let empty: SerialBackend<Canned> = SerialBackend::new(Vec::new());
        let err = empty.solve(&model(false), &mut Hooks::new(), None).unwrap_err();
        assert_eq!(err.code(), "SOLVER_NOT_FOUND");
    }

    #[test]
    fn test_serial_runs_caller_hooks_on_the_answering_member() {
        let backend = SerialBackend::new(vec![
            Canned::failing(SolveError::Solving("boom".to_string())),
            Canned::ok(3.0),
        ]);
        let mut configured = 0;
        let mut analyzed = 0;
        {
            let mut hooks = Hooks::new();
            hooks
                .on(HookPoint::Configuration, |_: &mut CannedHandle, _| {
                    configured += 1;
                    Ok(())
                })
                .on(HookPoint::AnalyzingSolution, |_: &mut CannedHandle, _| {
                    analyzed += 1;
                    Ok(())
                });
            backend.solve(&model(false), &mut hooks, None).unwrap();
        }
        assert_eq!(configured, 2);
        assert_eq!(analyzed, 1);
    }

    #[test]
    fn test_parallel_best_picks_best_objective_by_sense() {
        let members = || {
            vec![
                Canned::ok(5.0),
                Canned::failing(SolveError::Solving("boom".to_string())),
                Canned::ok(3.0),
                Canned::ok(4.0),
            ]
        };
        let backend = ParallelBackend::new(members(), ParallelMode::Best);
        let output = backend.solve(&model(false), &mut Hooks::new(), None).unwrap();
        assert_eq!(output.objective, 3.0);
        assert!(backend.members().iter().all(|member| member.calls() == 1));

        let backend = ParallelBackend::new(members(), ParallelMode::Best);
        let (output, pool) = backend
            .solve_pool(&model(true), 2, &mut Hooks::new(), None)
            .unwrap();
        assert_eq!(output.objective, 5.0);
        assert_eq!(pool, vec![output.solution.clone()]);
        assert_eq!(backend.describe(), "parallel_best(canned,canned,canned,canned)");
    }

    #[test]
    fn test_parallel_first_takes_a_success_and_stops_the_rest() {
        let backend = ParallelBackend::new(
            vec![
                Canned::ok(7.0),
                Canned::failing(SolveError::Solving("boom".to_string())),
                Canned::waiting(),
            ],
            ParallelMode::First,
        );
        let output = backend.solve(&model(false), &mut Hooks::new(), None).unwrap();
        assert_eq!(output.objective, 7.0);

        let waiting = &backend.members()[2];
        #[cfg(feature = "parallel")]
        assert!(waiting.cancelled.load(Ordering::SeqCst));
        #[cfg(not(feature = "parallel"))]
        assert_eq!(waiting.calls(), 0);
    }

    #[test]
    fn test_parallel_failures_prefer_stop_codes() {
        let backend = ParallelBackend::new(
            vec![
                Canned::failing(SolveError::Solving("boom".to_string())),
                Canned::failing(SolveError::Infeasible),
            ],
            ParallelMode::First,
        );
        let err = backend.solve(&model(false), &mut Hooks::new(), None).unwrap_err();
        assert!(err.is_infeasible());

        let backend = ParallelBackend::new(
            vec![Canned::failing(SolveError::Solving("boom".to_string()))],
            ParallelMode::Best,
        );
        let err = backend.solve(&model(false), &mut Hooks::new(), None).unwrap_err();
        assert_eq!(err.code(), "SOLVER_NOT_FOUND");
    }

    #[test]
    fn test_parallel_merges_progress_and_honours_break() {
        let backend = ParallelBackend::new(
            vec![
                Canned::ticking(2.0, vec![9.0, 6.0, 2.0]),
                Canned::ticking(3.0, vec![8.0, 7.0, 3.0]),
            ],
            ParallelMode::Best,
        );
        let mut seen = Vec::new();
        {
            let mut callback = |status: &SolvingStatus| {
                seen.push(status.objective);
                ControlFlow::Continue(())
            };
            let output = backend
                .solve(&model(false), &mut Hooks::new(), Some(&mut callback))
                .unwrap();
            assert_eq!(output.objective, 2.0);
        }
        assert!(seen.windows(2).all(|pair| pair[1] < pair[0]));
        assert!(seen.contains(&2.0));

        let backend = ParallelBackend::new(vec![Canned::waiting()], ParallelMode::Best);
        let mut stop = |_: &SolvingStatus| ControlFlow::Break(());
        let err = backend
            .solve(&model(false), &mut Hooks::new(), Some(&mut stop))
            .unwrap_err();
        assert_eq!(err.code(), "SOLVER_NOT_FOUND");
        assert!(backend.members()[0].cancelled.load(Ordering::SeqCst));
    }

    #[test]
    fn test_parallel_replays_winner_for_caller_hooks() {
        let backend = ParallelBackend::new(vec![Canned::ok(6.0), Canned::ok(1.0)], ParallelMode::Best);
        let mut analyzed = Vec::new();
        {
            let mut hooks = Hooks::new();
            hooks.on(HookPoint::AnalyzingSolution, |_: &mut CannedHandle, context| {
                analyzed.push(context.status());
                Ok(())
            });
            let output = backend.solve(&model(false), &mut hooks, None).unwrap();
            assert_eq!(output.objective, 1.0);
        }
        assert_eq!(analyzed, vec![Some(SolverStatus::Optimal)]);
        assert_eq!(backend.members()[0].calls(), 1);
        assert_eq!(backend.members()[1].calls(), 2);
    }
}
