//! Error types for consent resolution.
//!
//! ## Rules
//!
//! - `thiserror` for enum derivation, no manual `Display` impls.
//! - Malformed cookies are recovered by the resolver; `ConsentError` only
//!   escapes from the parsing/config helpers that callers invoke directly.
//! - Action failures never abort a sweep; they are reported per registration.

use thiserror::Error;

/// Errors surfaced by cookie parsing, configuration and environment lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsentError {
    /// Cookie value is not JSON, neither raw nor after percent-decoding.
    #[error("unable to parse cookie \"{name}\": {reason}")]
    MalformedCookie { name: String, reason: String },

    /// Resolver configuration could not be loaded or is inconsistent.
    #[error("invalid resolver config: {0}")]
    InvalidConfig(String),

    /// No host document is reachable (non-browser context).
    #[error("no document available in this environment")]
    NoDocument,
}

/// Failures of the document collaborator while injecting a script.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("document has no <body> element")]
    NoBody,

    #[error("failed to create <script> element: {0}")]
    CreateElement(String),

    #[error("failed to set script property `{name}`: {reason}")]
    SetProperty { name: String, reason: String },

    #[error("failed to append script to <body>: {0}")]
    Append(String),
}

/// Error returned by a fallible consent action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ActionError {
    message: String,
}

impl ActionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<DocumentError> for ActionError {
    fn from(error: DocumentError) -> Self {
        Self::new(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_cookie_message_names_cookie() {
        let err = ConsentError::MalformedCookie {
            name: "cc-settings".into(),
            reason: "expected value at line 1 column 1".into(),
        };
        assert!(err.to_string().contains("\"cc-settings\""));
    }

    #[test]
    fn test_document_error_converts_into_action_error() {
        let err: ActionError = DocumentError::NoBody.into();
        assert_eq!(err.message(), "document has no <body> element");
    }
}
