//! Convenience result type alias for the lending registry.

use crate::error::AppError;

/// A specialized `Result` type for registry operations.
///
/// Every registry operation either succeeds or yields an [`AppError`]
/// whose [`ErrorKind`](crate::error::ErrorKind) tells the caller why.
pub type AppResult<T> = Result<T, AppError>;
