use thiserror::Error;

use crate::MetadataObjectType;

/// Errors from building identifiers and metadata object references.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// An identifier needs at least one level.
    #[error("identifier must have at least one level")]
    Empty,

    /// A level was empty or whitespace only.
    #[error("identifier level {index} is blank")]
    BlankLevel {
        /// Zero-based position of the offending level
        index: usize,
    },

    /// The full name has the wrong depth for its object type.
    #[error("{object_type} name '{full_name}' must have {expected} level(s), got {actual}")]
    LevelMismatch {
        /// The declared object type
        object_type: MetadataObjectType,
        /// The offending full name
        full_name: String,
        /// Levels the type requires
        expected: usize,
        /// Levels actually present
        actual: usize,
    },
}
