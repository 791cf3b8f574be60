//! Error types for facade operations.
//!
//! Every public operation validates its handles before touching the arena,
//! converting what would otherwise be a wild dereference into a typed,
//! recoverable error. Structural refusals reported by the engine (for
//! example a cross-document append) are surfaced unmodified, wrapped with
//! the name of the operation that triggered them.

use thiserror::Error;

/// The error type returned by facade operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    /// The node handle is zero (released) or does not refer to a live node.
    #[error("invalid node handle")]
    InvalidNode,

    /// The document handle is zero (released) or does not refer to a live
    /// document.
    #[error("invalid document handle")]
    InvalidDocument,

    /// An attribute operation was attempted on a handle that is not an
    /// element, or with an empty attribute name.
    #[error("invalid attribute")]
    InvalidAttribute,

    /// The namespace-declaration handle is zero or does not refer to a live
    /// declaration.
    #[error("invalid namespace declaration")]
    InvalidNamespace,

    /// An attribute lookup missed. This is a normal lookup outcome, not a
    /// structural fault.
    #[error("attribute not found: {name}")]
    AttributeNotFound {
        /// The attribute name that was looked up.
        name: String,
    },

    /// The engine refused a structural primitive (e.g., appending a child
    /// that belongs to a different document).
    #[error("{op}: {message}")]
    Structural {
        /// The facade operation that triggered the refusal.
        op: &'static str,
        /// The engine's refusal message, unmodified.
        message: String,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DomError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(DomError::InvalidNode.to_string(), "invalid node handle");
        assert_eq!(
            DomError::AttributeNotFound {
                name: "id".to_string()
            }
            .to_string(),
            "attribute not found: id"
        );
        assert_eq!(
            DomError::Structural {
                op: "add_child",
                message: "child belongs to a different document".to_string()
            }
            .to_string(),
            "add_child: child belongs to a different document"
        );
    }

    #[test]
    fn test_error_is_error_trait() {
        let err = DomError::InvalidDocument;
        let _: &dyn std::error::Error = &err;
    }
}
