//! Errors raised by intercepted calls and binding lifecycles.
//!
//! Every variant carries its final message. Downstream tooling matches on
//! these messages, so they are produced once and never wrapped.

use thiserror::Error;

/// Errors raised by the double engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DoubleError {
    /// No registered double matches the arguments of a call.
    #[error("{0}")]
    DoubleNotFound(String),

    /// A double was called more often than allowed, or verification found
    /// its call count unsatisfied.
    #[error("{0}")]
    TimesCalled(String),

    /// An ordered double was invoked out of sequence.
    #[error("{0}")]
    DoubleOrder(String),

    /// A binding was used outside its bind/reset lifecycle.
    #[error("{0}")]
    BindingState(String),

    /// The object does not respond to the method.
    #[error("undefined method `{method}' for {object}")]
    NoMethod { object: String, method: String },
}

/// Result type for double operations.
pub type DoubleResult<T> = Result<T, DoubleError>;

impl DoubleError {
    /// Check if this error is a test assertion failure rather than a
    /// usage error.
    pub fn is_expectation_failure(&self) -> bool {
        matches!(
            self,
            DoubleError::DoubleNotFound(_)
                | DoubleError::TimesCalled(_)
                | DoubleError::DoubleOrder(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expectation_failures() {
        let message = || "foobar()".to_string();
        assert!(DoubleError::DoubleNotFound(message()).is_expectation_failure());
        assert!(DoubleError::TimesCalled(message()).is_expectation_failure());
        assert!(DoubleError::DoubleOrder(message()).is_expectation_failure());
    }

    #[test]
    fn test_usage_errors() {
        assert!(!DoubleError::BindingState("already bound".to_string()).is_expectation_failure());
        let no_method = DoubleError::NoMethod {
            object: "#<Object:subject>".to_string(),
            method: "foobar".to_string(),
        };
        assert!(!no_method.is_expectation_failure());
        assert_eq!(
            no_method.to_string(),
            "undefined method `foobar' for #<Object:subject>"
        );
    }
}
