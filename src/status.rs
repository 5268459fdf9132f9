//! Status codes returned by HiGHS, and their translation into [Status] and [Error].
use std::convert::TryFrom;
use std::fmt::{Debug, Formatter};
use std::os::raw::c_int;

use crate::error::{Error, Result};
use crate::solver::Status;

/// Outcome of the last `Highs_run`, as reported by HiGHS
#[derive(Clone, Copy, Debug, PartialOrd, PartialEq, Ord, Eq)]
pub enum HighsModelStatus {
    /// Nothing was solved yet
    NotSet = 0,
    /// The model could not be loaded
    LoadError = 1,
    /// The model is malformed
    ModelError = 2,
    /// Presolve failed
    PresolveError = 3,
    /// The solver failed
    SolveError = 4,
    /// Postsolve failed
    PostsolveError = 5,
    /// The model has no column
    ModelEmpty = 6,
    /// An optimal solution was found
    Optimal = 7,
    /// The model is infeasible
    Infeasible = 8,
    /// The model is unbounded or infeasible
    UnboundedOrInfeasible = 9,
    /// The model is unbounded
    Unbounded = 10,
    /// The objective bound was reached
    ObjectiveBound = 11,
    /// The objective target was reached
    ObjectiveTarget = 12,
    /// Stopped on the time limit
    ReachedTimeLimit = 13,
    /// Stopped on the iteration limit
    ReachedIterationLimit = 14,
    /// The outcome is unknown
    Unknown = 15,
}

/// A status code HiGHS is not expected to return
#[derive(PartialEq, Clone, Copy)]
pub struct InvalidStatus(pub c_int);

impl Debug for InvalidStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} is not a known HiGHS status", self.0)
    }
}

impl TryFrom<c_int> for HighsModelStatus {
    type Error = InvalidStatus;

    fn try_from(value: c_int) -> std::result::Result<Self, Self::Error> {
        use highs_sys::*;
        match value {
            MODEL_STATUS_NOTSET => Ok(Self::NotSet),
            MODEL_STATUS_LOAD_ERROR => Ok(Self::LoadError),
            MODEL_STATUS_MODEL_ERROR => Ok(Self::ModelError),
            MODEL_STATUS_PRESOLVE_ERROR => Ok(Self::PresolveError),
            MODEL_STATUS_SOLVE_ERROR => Ok(Self::SolveError),
            MODEL_STATUS_POSTSOLVE_ERROR => Ok(Self::PostsolveError),
            MODEL_STATUS_MODEL_EMPTY => Ok(Self::ModelEmpty),
            MODEL_STATUS_OPTIMAL => Ok(Self::Optimal),
            MODEL_STATUS_INFEASIBLE => Ok(Self::Infeasible),
            MODEL_STATUS_UNBOUNDED_OR_INFEASIBLE => Ok(Self::UnboundedOrInfeasible),
            MODEL_STATUS_UNBOUNDED => Ok(Self::Unbounded),
            MODEL_STATUS_OBJECTIVE_BOUND => Ok(Self::ObjectiveBound),
            MODEL_STATUS_OBJECTIVE_TARGET => Ok(Self::ObjectiveTarget),
            MODEL_STATUS_REACHED_TIME_LIMIT => Ok(Self::ReachedTimeLimit),
            MODEL_STATUS_REACHED_ITERATION_LIMIT => Ok(Self::ReachedIterationLimit),
            MODEL_STATUS_UNKNOWN => Ok(Self::Unknown),
            n => Err(InvalidStatus(n)),
        }
    }
}

impl HighsModelStatus {
    /// Whether HiGHS failed rather than reached a conclusion about the model
    pub fn is_error(self) -> bool {
        matches!(
            self,
            Self::LoadError
                | Self::ModelError
                | Self::PresolveError
                | Self::SolveError
                | Self::PostsolveError
        )
    }

    /// Translate into a model [Status]; failures become [Error::Solver]
    pub(crate) fn to_status(self) -> Result<Status> {
        Ok(match self {
            s if s.is_error() => {
                return Err(Error::solver(s as i32, format!("HiGHS model status {:?}", s)))
            }
            Self::NotSet => Status::Loaded,
            // nothing to optimize: the objective constant is optimal
            Self::ModelEmpty | Self::Optimal => Status::Optimal,
            Self::Infeasible => Status::Infeasible,
            Self::UnboundedOrInfeasible => Status::InfOrUnbd,
            Self::Unbounded => Status::Unbounded,
            Self::ReachedTimeLimit => Status::TimeLimit,
            Self::ReachedIterationLimit => Status::IterationLimit,
            s => Status::Other(s as i32),
        })
    }
}

/// Return code of every HiGHS C function
#[derive(Clone, Copy, Debug, PartialOrd, PartialEq, Ord, Eq)]
pub enum HighsStatus {
    /// Success
    OK = 0,
    /// Success, with a warning in the HiGHS log
    Warning = 1,
    /// Failure
    Error = 2,
}

impl TryFrom<c_int> for HighsStatus {
    type Error = InvalidStatus;

    fn try_from(value: c_int) -> std::result::Result<Self, InvalidStatus> {
        use highs_sys::*;
        match value {
            STATUS_OK => Ok(Self::OK),
            STATUS_WARNING => Ok(Self::Warning),
            STATUS_ERROR => Ok(Self::Error),
            n => Err(InvalidStatus(n)),
        }
    }
}

/// Turn the return code of the C function `msg` into a [Result]
pub(crate) fn try_handle_status(status: c_int, msg: &str) -> Result<HighsStatus> {
    match HighsStatus::try_from(status) {
        Ok(status @ HighsStatus::OK) => Ok(status),
        Ok(status @ HighsStatus::Warning) => {
            log::warn!("HiGHS emitted a warning: {}", msg);
            Ok(status)
        }
        Ok(HighsStatus::Error) | Err(_) => Err(Error::solver(status, msg)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_status_translation() {
        let optimal = HighsModelStatus::try_from(highs_sys::MODEL_STATUS_OPTIMAL).unwrap();
        assert_eq!(optimal.to_status().unwrap(), Status::Optimal);
        assert_eq!(
            HighsModelStatus::ModelEmpty.to_status().unwrap(),
            Status::Optimal
        );
        assert_eq!(
            HighsModelStatus::ReachedTimeLimit.to_status().unwrap(),
            Status::TimeLimit
        );
        assert_eq!(
            HighsModelStatus::ObjectiveBound.to_status().unwrap(),
            Status::Other(11)
        );
        let err = HighsModelStatus::SolveError.to_status().unwrap_err();
        assert!(matches!(err, Error::Solver { code: 4, .. }));
        assert!(HighsModelStatus::try_from(99).is_err());
    }

    #[test]
    fn return_codes() {
        assert_eq!(
            try_handle_status(highs_sys::STATUS_WARNING, "Highs_run").unwrap(),
            HighsStatus::Warning
        );
        let err = try_handle_status(highs_sys::STATUS_ERROR, "Highs_run").unwrap_err();
        assert_eq!(err, Error::solver(highs_sys::STATUS_ERROR, "Highs_run"));
        assert!(try_handle_status(42, "Highs_run").is_err());
    }
}
