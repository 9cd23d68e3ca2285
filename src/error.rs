use crate::store::StoreError;
use fixtures_api::client::ApiError;
use std::fmt;

pub type ScheduleResult<T> = Result<T, ScheduleError>;

/// Every failure leaves the event document untouched.
#[derive(Debug)]
pub enum ScheduleError {
    /// Detected before the oracle is called: bad roster size, no venues,
    /// missing bracket, unscheduled prerequisite round.
    Configuration(String),
    /// The oracle returned no placements. `reasoning` is its own diagnostic.
    Infeasible { reasoning: String },
    /// A booking would overlap another or fall outside operating hours.
    Conflict(String),
    /// A state change the bracket does not allow.
    IllegalTransition(String),
    Store(StoreError),
    Oracle(ApiError),
}

impl ScheduleError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        ScheduleError::Configuration(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        ScheduleError::Conflict(msg.into())
    }

    pub fn illegal(msg: impl Into<String>) -> Self {
        ScheduleError::IllegalTransition(msg.into())
    }
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleError::Configuration(msg) => write!(f, "Configuration error: {msg}"),
            ScheduleError::Infeasible { reasoning } if reasoning.trim().is_empty() => {
                write!(f, "Scheduler could not place any match")
            }
            ScheduleError::Infeasible { reasoning } => {
                write!(f, "Scheduler could not place any match: {reasoning}")
            }
            ScheduleError::Conflict(msg) => write!(f, "Scheduling conflict: {msg}"),
            ScheduleError::IllegalTransition(msg) => write!(f, "Not allowed: {msg}"),
            ScheduleError::Store(e) => write!(f, "{e}"),
            ScheduleError::Oracle(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ScheduleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScheduleError::Store(e) => Some(e),
            ScheduleError::Oracle(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for ScheduleError {
    fn from(e: StoreError) -> Self {
        ScheduleError::Store(e)
    }
}

impl From<ApiError> for ScheduleError {
    fn from(e: ApiError) -> Self {
        ScheduleError::Oracle(e)
    }
}
