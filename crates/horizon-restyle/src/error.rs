//! Error types for the patch engine.

use std::path::PathBuf;

use crate::host::HostError;

/// Result type alias for restyle operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading, probing or patching stylesheets.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Rule text has no matching pair of block delimiters.
    #[error("Malformed rule block '{text}': {message}")]
    MalformedBlock { text: String, message: String },

    /// Declaration text has no name/value separator.
    #[error("Malformed declaration '{text}'")]
    MalformedDeclaration { text: String },

    /// Logical rule index out of range.
    #[error("No rule at logical index {index} (stylesheet has {len})")]
    NotFound { index: usize, len: usize },

    /// The rule does not declare the property.
    #[error("Property '{property}' is not declared on this rule")]
    PropertyNotFound { property: String },

    /// The candidate value was refused before or during precheck.
    #[error("Invalid value '{value}' for property '{property}': {reason}")]
    InvalidValue {
        property: String,
        value: String,
        reason: String,
    },

    /// The live read-back did not parse as the expected declaration.
    #[error("Verification failed for '{property}': host stored '{read_back}'")]
    VerificationFailed { property: String, read_back: String },

    /// The live read-back parsed but differs from the precheck prediction.
    #[error("Value mismatch for '{property}': expected '{expected}', host stored '{actual}'")]
    ValueMismatch {
        property: String,
        expected: String,
        actual: String,
    },

    /// The host denied enumeration of the stylesheet.
    #[error("Stylesheet '{origin}' is not accessible")]
    Inaccessible { origin: String },

    /// The stylesheet id is not attached to the session.
    #[error("Unknown stylesheet")]
    UnknownStyleSheet,

    /// A previous verification failure locked the stylesheet.
    #[error("Stylesheet is locked after a verification failure")]
    StyleSheetLocked,

    /// `edit_focused` was called with nothing focused.
    #[error("No property is focused")]
    NoFocusedProperty,

    /// A host mutation primitive failed.
    #[error(transparent)]
    Host(#[from] HostError),

    /// Configuration could not be parsed.
    #[error("Invalid configuration: {message}")]
    Config { message: String },

    /// File I/O error.
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Create a malformed block error.
    pub fn malformed_block(text: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedBlock {
            text: text.into(),
            message: message.into(),
        }
    }

    /// Create a malformed declaration error.
    pub fn malformed_declaration(text: impl Into<String>) -> Self {
        Self::MalformedDeclaration { text: text.into() }
    }

    /// Create a missing property error.
    pub fn property_not_found(property: impl Into<String>) -> Self {
        Self::PropertyNotFound {
            property: property.into(),
        }
    }

    /// Create a value error.
    pub fn invalid_value(
        property: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            property: property.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a verification error.
    pub fn verification_failed(property: impl Into<String>, read_back: impl Into<String>) -> Self {
        Self::VerificationFailed {
            property: property.into(),
            read_back: read_back.into(),
        }
    }

    /// Create an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the error was caused by the caller rather than the host.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::PropertyNotFound { .. }
                | Self::UnknownStyleSheet
                | Self::NoFocusedProperty
        )
    }
}
