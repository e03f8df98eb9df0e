//! Convenience result type alias for Nitro Dispatch.

use crate::error::AppError;

/// A specialized `Result` type for engine operations.
pub type AppResult<T> = Result<T, AppError>;
