//! Structured error types shared across QTOM crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`QtomError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (dimensions, iteration counts, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the QTOM engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum QtomError {
    /// Measurement design validation failures (effects malformed, settings
    /// not summing to the identity).
    #[error("invalid design: {0}")]
    InvalidDesign(ErrorInfo),
    /// Constrained estimation did not converge within its iteration budget.
    #[error("estimation failure: {0}")]
    Estimation(ErrorInfo),
    /// An interval estimator was queried before `setup` was called.
    #[error("not ready: {0}")]
    NotReady(ErrorInfo),
    /// A confidence region turned out to be empty at the requested level.
    #[error("infeasible region: {0}")]
    InfeasibleRegion(ErrorInfo),
    /// Target, object and design dimensions disagree.
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(ErrorInfo),
    /// Numerical failures inside the algebra layer (decompositions, solves).
    #[error("numeric error: {0}")]
    Numeric(ErrorInfo),
    /// Serialization, schema and file handling errors in the I/O layer.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl QtomError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            QtomError::InvalidDesign(info)
            | QtomError::Estimation(info)
            | QtomError::NotReady(info)
            | QtomError::InfeasibleRegion(info)
            | QtomError::DimensionMismatch(info)
            | QtomError::Numeric(info)
            | QtomError::Serde(info) => info,
        }
    }

    /// Shorthand for a dimension mismatch between two named quantities.
    pub fn dimension_mismatch(what: &str, expected: usize, found: usize) -> Self {
        QtomError::DimensionMismatch(
            ErrorInfo::new("dimension-mismatch", format!("{what} has wrong dimension"))
                .with_context("expected", expected.to_string())
                .with_context("found", found.to_string()),
        )
    }

    /// Shorthand for the `estimate`-before-`setup` misuse of an interval
    /// estimator.
    pub fn not_ready(method: &str) -> Self {
        QtomError::NotReady(
            ErrorInfo::new("setup-required", "estimate called before setup")
                .with_context("method", method.to_string())
                .with_hint("call setup() once before requesting intervals"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_info_round_trips_through_json() {
        let err = QtomError::InvalidDesign(
            ErrorInfo::new("effects-incomplete", "effects do not sum to the identity")
                .with_context("setting", "2")
                .with_hint("normalize the POVM"),
        );
        let json = serde_json::to_string(&err).unwrap();
        let back: QtomError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, back);
    }

    #[test]
    fn display_includes_context_and_hint() {
        let err = QtomError::not_ready("polytope");
        let text = err.to_string();
        assert!(text.contains("setup-required"));
        assert!(text.contains("method=polytope"));
        assert!(text.contains("hint"));
    }
}
