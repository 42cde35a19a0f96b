use thiserror::Error;

/// Errors produced by term and triple conversions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("empty string is not a valid RDF term")]
    EmptyTerm,

    #[error("invalid literal {0}: missing closing quote")]
    UnterminatedLiteral(String),

    #[error("invalid literal {literal}: unexpected suffix {suffix:?}")]
    InvalidLiteralSuffix { literal: String, suffix: String },

    #[error("invalid {position} term {term}: {reason}")]
    InvalidPosition {
        position: &'static str,
        term: String,
        reason: &'static str,
    },
}
