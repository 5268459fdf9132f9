//! Error type shared by the expression algebra, the model and the solver backends.
use thiserror::Error;

use crate::attr::EntityKind;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while building, synchronizing or solving a model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The name is neither in the attribute table of the entity nor a set user field
    #[error("{kind} has no attribute `{name}`")]
    UnknownAttribute {
        /// Entity the lookup was made on
        kind: EntityKind,
        /// Name as given by the caller
        name: String,
    },

    /// The attribute exists but can only be read
    #[error("attribute `{name}` of {kind} is read-only")]
    ReadOnlyAttribute {
        /// Entity the assignment was made on
        kind: EntityKind,
        /// Canonical attribute name
        name: &'static str,
    },

    /// The attribute exists but has no value yet (typically: no optimization happened)
    #[error("attribute `{name}` of {kind} is not available")]
    AttributeNotAvailable {
        /// Entity the lookup was made on
        kind: EntityKind,
        /// Canonical attribute name
        name: &'static str,
    },

    /// A value of the wrong type was given to, or requested from, an attribute
    #[error("attribute `{name}` expects a {expected} value, got {found}")]
    AttributeType {
        /// Attribute name
        name: String,
        /// Type the attribute holds
        expected: &'static str,
        /// Type that was provided
        found: &'static str,
    },

    /// The entity was removed from its model
    #[error("{kind} #{ordinal} was removed from the model")]
    EntityInvalid {
        /// Variable or constraint
        kind: EntityKind,
        /// Creation ordinal of the entity
        ordinal: usize,
    },

    /// The handle was created by another model
    #[error("{kind} #{ordinal} belongs to another model")]
    ForeignEntity {
        /// Variable or constraint
        kind: EntityKind,
        /// Creation ordinal of the entity
        ordinal: usize,
    },

    /// Positional access past the end of an expression or a column
    #[error("index {index} out of range for {len} terms")]
    IndexOutOfRange {
        /// Requested position
        index: usize,
        /// Number of terms
        len: usize,
    },

    /// Malformed input to a model operation
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The solver reported a failure
    #[error("solver failure (code {code}): {message}")]
    Solver {
        /// Native status code
        code: i32,
        /// Native message or failing routine
        message: String,
    },

    /// After synchronization the solver does not hold the expected number of entities
    #[error("solver holds {solver} entities of kind {kind}, the model expects {model}")]
    SyncMismatch {
        /// Variable or constraint
        kind: EntityKind,
        /// Count in the model
        model: usize,
        /// Count in the solver
        solver: usize,
    },
}

impl Error {
    pub(crate) fn solver(code: i32, message: impl Into<String>) -> Self {
        Error::Solver {
            code,
            message: message.into(),
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }

    /// True for the "exists but not available yet" flavour of attribute errors
    pub fn is_not_available(&self) -> bool {
        matches!(self, Error::AttributeNotAvailable { .. })
    }
}
