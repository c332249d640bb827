//! Status classification for HiGHS results.

use cutplane_solver::SolverStatus;

use crate::ffi::HighsStatus;

/// Map a native status onto the backend-independent classes.
///
/// "Unbounded or infeasible" is classified as infeasible so that callers
/// take their infeasibility path instead of skipping it. A limit status is
/// (including a callback interrupt) is only `Feasible` when HiGHS kept an
/// incumbent.
pub(crate) fn classify(status: HighsStatus, has_incumbent: bool) -> SolverStatus {
    match status {
        HighsStatus::Optimal => SolverStatus::Optimal,
        HighsStatus::Infeasible | HighsStatus::UnboundedOrInfeasible => SolverStatus::Infeasible,
        HighsStatus::Unbounded => SolverStatus::Unbounded,
        HighsStatus::ReachedTimeLimit
        | HighsStatus::ReachedIterationLimit
        | HighsStatus::Interrupted
            if has_incumbent =>
        {
            SolverStatus::Feasible
        }
        HighsStatus::ReachedTimeLimit
        | HighsStatus::ReachedIterationLimit
        | HighsStatus::Interrupted
        | HighsStatus::Unknown => SolverStatus::SolvingException,
    }
}
