//! Engine error types.

use thiserror::Error;

/// Errors raised by the reconciliation engine.
///
/// Schema violations are fatal to the construction of the affected entity
/// only; the world logs them and keeps going.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("Entity type must have a net ID")]
    EmptyTypeId,

    #[error("Entity type ID '{0}' already registered")]
    DuplicateType(&'static str),

    #[error("Unknown entity type ID '{0}'")]
    UnknownType(String),

    #[error("Type '{type_id}' requires interpolated field '{field}' in its initial data")]
    MissingField {
        type_id: &'static str,
        field: &'static str,
    },

    #[error("Field '{field}' of type '{type_id}': expected {expected}")]
    Decode {
        type_id: &'static str,
        field: &'static str,
        expected: &'static str,
    },

    #[error("Field '{0}' is not interpolated")]
    NotLerped(String),

    #[error("Unknown field '{0}'")]
    UnknownField(String),

    #[error("Field '{0}' has no value yet")]
    UnsetField(&'static str),

    #[error("No snapshots available")]
    BufferUnderflow,
}
