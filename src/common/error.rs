use crate::parser::span::Span;
use thiserror::Error;

/// Result type for jopac operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the jopac compiler
///
/// The set is closed: every failure the compiler can report falls into one
/// of these kinds. `Parse`, `NameResolution`, `Type` and `UnsupportedFeature`
/// carry a source span; `InvariantViolation` names the method being compiled
/// when the compiler's own state went wrong.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{span}: parse error: {message}")]
    Parse { span: Span, message: String },

    #[error("{span}: cannot resolve {kind} `{name}`{context}")]
    NameResolution {
        span: Span,
        /// "class", "field", "method" or "import"
        kind: &'static str,
        name: String,
        context: String,
    },

    #[error("{span}: type error: {message}")]
    Type { span: Span, message: String },

    #[error("{span}: unsupported feature: {feature}")]
    UnsupportedFeature { span: Span, feature: String },

    #[error("internal compiler error in {method}: {message}")]
    InvariantViolation { method: String, message: String },
}

impl Error {
    pub fn parse(span: Span, message: impl Into<String>) -> Self {
        Self::Parse { span, message: message.into() }
    }

    pub fn unresolved(span: Span, kind: &'static str, name: impl Into<String>) -> Self {
        Self::NameResolution { span, kind, name: name.into(), context: String::new() }
    }

    pub fn unresolved_with(
        span: Span,
        kind: &'static str,
        name: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        let context = context.into();
        let context = if context.is_empty() { context } else { format!(" ({})", context) };
        Self::NameResolution { span, kind, name: name.into(), context }
    }

    pub fn type_error(span: Span, message: impl Into<String>) -> Self {
        Self::Type { span, message: message.into() }
    }

    pub fn unsupported(span: Span, feature: impl Into<String>) -> Self {
        Self::UnsupportedFeature { span, feature: feature.into() }
    }

    pub fn invariant(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvariantViolation { method: method.into(), message: message.into() }
    }

    /// Invariant violations corrupt compiler state and must abort the unit
    /// immediately; everything else is collected at the unit boundary.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvariantViolation { .. } | Self::Io(_))
    }
}
