//! Result alias used across all Conveyor crates.

use crate::error::ConveyorError;

/// A `Result` with [`ConveyorError`] as the error type.
pub type ConveyorResult<T> = Result<T, ConveyorError>;
