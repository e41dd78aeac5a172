//! # Double Resolution
//!
//! Selects which registered double services an incoming call.
//!
//! ## Algorithm Overview
//!
//! 1. **Classify**: each double whose arguments match is an *exact* match
//!    (concrete values only) or a *wildcard* match. Every match is recorded,
//!    whatever its call count.
//! 2. **Bucket**: matches that may still be attempted are split into
//!    *terminal* (the next call is their last acceptable one) and
//!    *non-terminal*.
//! 3. **Select** by fixed precedence:
//!
//! | Bucket | Pick |
//! |--------|------|
//! | exact, terminal | first registered |
//! | exact, non-terminal | last registered |
//! | wildcard, terminal | first registered |
//! | wildcard, non-terminal | last registered |
//! | any exhausted match | first registered |
//!
//! Exact beats wildcard. Terminal doubles drain in declaration order, while
//! among open doubles the most recent declaration overrides earlier ones.
//! An exhausted match is still selected so its call fails with a times-called
//! violation rather than an unmatched-invocation error.

use std::fmt;
use std::rc::Rc;

use crate::arguments::MatchKind;
use crate::double::{formatted_name, list_message_part, Double};
use crate::error::DoubleError;
use crate::object::Call;

/// Which precedence bucket a double was selected from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    ExactTerminal,
    ExactNonTerminal,
    WildcardTerminal,
    WildcardNonTerminal,
    /// Matched, but its call count is already closed.
    Exhausted,
}

/// Matches for one call, split into precedence buckets.
#[derive(Debug, Default)]
pub struct DoubleMatches<'a> {
    /// Every double whose arguments match, in registration order.
    pub matching_doubles: Vec<&'a Rc<Double>>,
    pub exact_terminal_doubles_to_attempt: Vec<&'a Rc<Double>>,
    pub exact_non_terminal_doubles_to_attempt: Vec<&'a Rc<Double>>,
    pub wildcard_terminal_doubles_to_attempt: Vec<&'a Rc<Double>>,
    pub wildcard_non_terminal_doubles_to_attempt: Vec<&'a Rc<Double>>,
}

impl<'a> DoubleMatches<'a> {
    /// Classify every double against the call.
    pub fn find_all_matches(doubles: &'a [Rc<Double>], call: &Call) -> Self {
        let mut matches = Self::default();
        for double in doubles {
            let Some(kind) = double.classify(call) else {
                continue;
            };
            matches.matching_doubles.push(double);
            if !double.is_attempt() {
                continue;
            }
            let bucket = match (kind, double.is_terminal()) {
                (MatchKind::Exact, true) => &mut matches.exact_terminal_doubles_to_attempt,
                (MatchKind::Exact, false) => &mut matches.exact_non_terminal_doubles_to_attempt,
                (MatchKind::Wildcard, true) => &mut matches.wildcard_terminal_doubles_to_attempt,
                (MatchKind::Wildcard, false) => {
                    &mut matches.wildcard_non_terminal_doubles_to_attempt
                }
            };
            bucket.push(double);
        }
        matches
    }

    /// Pick the double to attempt, by bucket precedence.
    pub fn select(&self) -> Option<(&'a Rc<Double>, Bucket)> {
        if let Some(double) = self.exact_terminal_doubles_to_attempt.first().copied() {
            return Some((double, Bucket::ExactTerminal));
        }
        if let Some(double) = self.exact_non_terminal_doubles_to_attempt.last().copied() {
            return Some((double, Bucket::ExactNonTerminal));
        }
        if let Some(double) = self.wildcard_terminal_doubles_to_attempt.first().copied() {
            return Some((double, Bucket::WildcardTerminal));
        }
        if let Some(double) = self.wildcard_non_terminal_doubles_to_attempt.last().copied() {
            return Some((double, Bucket::WildcardNonTerminal));
        }
        self.matching_doubles
            .first()
            .map(|double| (*double, Bucket::Exhausted))
    }
}

/// Result of resolving a call.
#[derive(Debug)]
pub enum Resolution<'a> {
    /// A double was selected.
    Resolved {
        double: &'a Rc<Double>,
        bucket: Bucket,
    },
    /// No double's arguments match the call.
    NoMatch,
}

/// Resolve which double services the call.
pub fn resolve<'a>(doubles: &'a [Rc<Double>], call: &Call) -> Resolution<'a> {
    let matches = DoubleMatches::find_all_matches(doubles, call);
    match matches.select() {
        Some((double, bucket)) => {
            tracing::trace!(
                double = double.id().0,
                ?bucket,
                candidates = matches.matching_doubles.len(),
                "resolved call"
            );
            Resolution::Resolved { double, bucket }
        }
        None => Resolution::NoMatch,
    }
}

/// Error when no double matches a call.
#[derive(Debug)]
pub struct NoMatchError<'a> {
    /// Rendering of the receiver.
    pub object: String,
    /// The method that was called.
    pub method_name: &'a str,
    /// The call that failed to match.
    pub call: &'a Call,
    /// Every registered double.
    pub candidates: &'a [Rc<Double>],
}

impl fmt::Display for NoMatchError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "On object {},", self.object)?;
        writeln!(
            f,
            "unexpected method invocation in the next line followed by the expected invocations"
        )?;
        writeln!(f, "  {}", formatted_name(self.method_name, self.call))?;
        f.write_str(&list_message_part(self.candidates))
    }
}

impl From<NoMatchError<'_>> for DoubleError {
    fn from(err: NoMatchError<'_>) -> Self {
        DoubleError::DoubleNotFound(err.to_string())
    }
}
