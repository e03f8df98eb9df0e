//! Error handling strategy shared by hook dispatch and lifecycle batches.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// How failures inside a sequence of hooks (or plugin loads) are handled.
///
/// Stop-propagation is never subject to the strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStrategy {
    /// Log the failure, keep the previous payload, run the next hook.
    #[default]
    LogAndContinue,
    /// Abort the sequence at the first failure and surface it.
    FailFast,
    /// Keep going, then surface every failure together.
    CollectAll,
}

impl ErrorStrategy {
    /// Returns the configuration name of this strategy.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LogAndContinue => "log_and_continue",
            Self::FailFast => "fail_fast",
            Self::CollectAll => "collect_all",
        }
    }
}

impl fmt::Display for ErrorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ErrorStrategy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "log_and_continue" => Ok(Self::LogAndContinue),
            "fail_fast" => Ok(Self::FailFast),
            "collect_all" => Ok(Self::CollectAll),
            other => Err(AppError::validation(format!(
                "Invalid error strategy '{other}'. Must be one of log_and_continue, fail_fast, collect_all"
            ))),
        }
    }
}
