//! # Call-Count Expectations
//!
//! Tracks how often a double has been invoked against a quantifier.
//!
//! | Quantifier | may attempt again | satisfied at verify |
//! |------------|-------------------|---------------------|
//! | `Exactly(n)` | count < n | count == n |
//! | `AtLeast(n)` | always | count >= n |
//! | `AtMost(n)` | count < n | count <= n |
//! | `Between(n, m)` | count < m | n <= count <= m |
//! | `Any` | always | always |
//!
//! An expectation is **terminal** when one more attempt would close it. Only
//! bounded quantifiers can be terminal.

use std::cell::Cell;
use std::fmt;

use crate::error::{DoubleError, DoubleResult};

/// A call-count quantifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimesCalled {
    /// Exactly `n` calls.
    Exactly(usize),
    /// `n` or more calls.
    AtLeast(usize),
    /// At most `n` calls.
    AtMost(usize),
    /// Between `min` and `max` calls, inclusive.
    Between(usize, usize),
    /// Any number of calls, including none.
    Any,
}

impl TimesCalled {
    /// The largest acceptable call count, if bounded.
    pub fn upper_bound(&self) -> Option<usize> {
        match *self {
            TimesCalled::Exactly(n) | TimesCalled::AtMost(n) => Some(n),
            TimesCalled::Between(_, max) => Some(max),
            TimesCalled::AtLeast(_) | TimesCalled::Any => None,
        }
    }

    /// Check if the quantifier has an upper bound.
    pub fn is_bounded(&self) -> bool {
        self.upper_bound().is_some()
    }

    /// Check if another call is acceptable after `called` calls.
    pub fn allows_another(&self, called: usize) -> bool {
        self.upper_bound().map_or(true, |max| called < max)
    }

    /// Check if `called` calls could still end up satisfied.
    pub fn possible_match(&self, called: usize) -> bool {
        self.upper_bound().map_or(true, |max| called <= max)
    }

    /// Check if `called` calls satisfy the quantifier.
    pub fn matches(&self, called: usize) -> bool {
        match *self {
            TimesCalled::Exactly(n) => called == n,
            TimesCalled::AtLeast(n) => called >= n,
            TimesCalled::AtMost(n) => called <= n,
            TimesCalled::Between(min, max) => min <= called && called <= max,
            TimesCalled::Any => true,
        }
    }
}

fn times(n: usize) -> &'static str {
    if n == 1 {
        "time"
    } else {
        "times"
    }
}

impl fmt::Display for TimesCalled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            TimesCalled::Exactly(n) => write!(f, "exactly {} {}", n, times(n)),
            TimesCalled::AtLeast(n) => write!(f, "at least {} {}", n, times(n)),
            TimesCalled::AtMost(n) => write!(f, "at most {} {}", n, times(n)),
            TimesCalled::Between(min, max) => write!(f, "between {} and {} times", min, max),
            TimesCalled::Any => f.write_str("any number of times"),
        }
    }
}

/// A quantifier plus the number of calls seen so far.
#[derive(Debug, Clone)]
pub struct TimesCalledExpectation {
    quantifier: TimesCalled,
    times_called: Cell<usize>,
}

impl TimesCalledExpectation {
    /// Create an expectation that has seen no calls.
    pub fn new(quantifier: TimesCalled) -> Self {
        Self {
            quantifier,
            times_called: Cell::new(0),
        }
    }

    /// The quantifier.
    pub fn quantifier(&self) -> TimesCalled {
        self.quantifier
    }

    /// Calls seen so far.
    pub fn times_called(&self) -> usize {
        self.times_called.get()
    }

    /// Check if one more call would be acceptable. Does not count.
    pub fn is_attempt(&self) -> bool {
        self.quantifier.allows_another(self.times_called())
    }

    /// Check if the next call is the last acceptable one.
    pub fn is_terminal(&self) -> bool {
        self.is_attempt() && !self.quantifier.allows_another(self.times_called() + 1)
    }

    /// Count a call. Fails once the count exceeds the quantifier's bound;
    /// the failing call is still counted.
    pub fn attempt(&self, signature: &str) -> DoubleResult<()> {
        let called = self.times_called() + 1;
        self.times_called.set(called);
        if self.quantifier.possible_match(called) {
            Ok(())
        } else {
            Err(self.error(signature))
        }
    }

    /// Fail unless the final count satisfies the quantifier.
    pub fn verify(&self, signature: &str) -> DoubleResult<()> {
        if self.quantifier.matches(self.times_called()) {
            Ok(())
        } else {
            Err(self.error(signature))
        }
    }

    /// Forget all counted calls.
    pub fn reset(&self) {
        self.times_called.set(0);
    }

    fn error(&self, signature: &str) -> DoubleError {
        DoubleError::TimesCalled(format!(
            "{}\nCalled {} time(s).\nExpected {}.",
            signature,
            self.times_called(),
            self.quantifier
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_exactly_attempt_and_verify() {
        let expectation = TimesCalledExpectation::new(TimesCalled::Exactly(2));
        assert!(expectation.is_attempt());
        assert!(!expectation.is_terminal());
        assert!(expectation.verify("foo()").is_err());

        expectation.attempt("foo()").unwrap();
        assert!(expectation.is_terminal());

        expectation.attempt("foo()").unwrap();
        assert!(!expectation.is_attempt());
        assert!(!expectation.is_terminal());
        expectation.verify("foo()").unwrap();

        let err = expectation.attempt("foo()").unwrap_err();
        assert_eq!(
            err.to_string(),
            "foo()\nCalled 3 time(s).\nExpected exactly 2 times."
        );
        assert_eq!(expectation.times_called(), 3);
    }

    #[test]
    fn test_at_least() {
        let expectation = TimesCalledExpectation::new(TimesCalled::AtLeast(3));
        expectation.attempt("foobar()").unwrap();
        assert_eq!(
            expectation.verify("foobar()").unwrap_err().to_string(),
            "foobar()\nCalled 1 time(s).\nExpected at least 3 times."
        );

        for _ in 0..10 {
            assert!(expectation.is_attempt());
            assert!(!expectation.is_terminal());
            expectation.attempt("foobar()").unwrap();
        }
        expectation.verify("foobar()").unwrap();
    }

    #[test]
    fn test_at_most() {
        let expectation = TimesCalledExpectation::new(TimesCalled::AtMost(1));
        expectation.verify("foo()").unwrap();
        assert!(expectation.is_terminal());

        expectation.attempt("foo()").unwrap();
        expectation.verify("foo()").unwrap();
        assert!(!expectation.is_attempt());

        assert_eq!(
            expectation.attempt("foo()").unwrap_err().to_string(),
            "foo()\nCalled 2 time(s).\nExpected at most 1 time."
        );
    }

    #[test]
    fn test_between() {
        let expectation = TimesCalledExpectation::new(TimesCalled::Between(1, 2));
        assert!(expectation.verify("foo()").is_err());
        expectation.attempt("foo()").unwrap();
        assert!(expectation.is_terminal());
        expectation.verify("foo()").unwrap();
        expectation.attempt("foo()").unwrap();
        expectation.verify("foo()").unwrap();
        assert_eq!(
            expectation.attempt("foo()").unwrap_err().to_string(),
            "foo()\nCalled 3 time(s).\nExpected between 1 and 2 times."
        );
    }

    #[test]
    fn test_any_is_never_terminal() {
        let expectation = TimesCalledExpectation::new(TimesCalled::Any);
        expectation.verify("foo()").unwrap();
        for _ in 0..5 {
            assert!(!expectation.is_terminal());
            expectation.attempt("foo()").unwrap();
        }
        expectation.verify("foo()").unwrap();
    }

    #[test]
    fn test_exactly_zero_is_closed() {
        let expectation = TimesCalledExpectation::new(TimesCalled::Exactly(0));
        assert!(!expectation.is_attempt());
        assert!(!expectation.is_terminal());
        expectation.verify("foo()").unwrap();
    }

    #[test]
    fn test_reset() {
        let expectation = TimesCalledExpectation::new(TimesCalled::Exactly(1));
        expectation.attempt("foo()").unwrap();
        expectation.reset();
        assert_eq!(expectation.times_called(), 0);
        assert!(expectation.is_attempt());
    }

    #[test]
    fn test_descriptions() {
        assert_eq!(TimesCalled::Exactly(1).to_string(), "exactly 1 time");
        assert_eq!(TimesCalled::Exactly(0).to_string(), "exactly 0 times");
        assert_eq!(TimesCalled::AtLeast(3).to_string(), "at least 3 times");
        assert_eq!(TimesCalled::AtMost(2).to_string(), "at most 2 times");
        assert_eq!(TimesCalled::Between(1, 3).to_string(), "between 1 and 3 times");
        assert_eq!(TimesCalled::Any.to_string(), "any number of times");
    }
}
