//! # Argument Expectations
//!
//! Decides whether the arguments of a call satisfy a declared pattern.
//!
//! A pattern is a list of per-position [`Matcher`]s. Positions are compared
//! in order and the arity must agree, unless the expectation accepts any
//! arguments at all. A call is classified as an **exact** match when every
//! position is a concrete value equal to the argument, or a **wildcard**
//! match when at least one wildcard position was needed.

use std::fmt;
use std::rc::Rc;

use crate::object::Call;
use crate::value::{join_inspected, Value, ValueKind};

/// A predicate used by [`Matcher::Satisfy`].
pub type Predicate = Rc<dyn Fn(&Value) -> bool>;

/// A matcher for one argument position.
#[derive(Clone)]
pub enum Matcher {
    /// The argument must equal this value.
    Value(Value),
    /// Accepts any argument.
    Anything,
    /// Accepts arguments of the given kind.
    IsA(ValueKind),
    /// Accepts integers and floats.
    Numeric,
    /// Accepts `true` and `false`.
    Boolean,
    /// Accepts arguments for which the predicate holds.
    Satisfy(Predicate),
}

impl Matcher {
    /// Check if the argument satisfies this matcher.
    pub fn matches(&self, arg: &Value) -> bool {
        match self {
            Matcher::Value(expected) => expected == arg,
            Matcher::Anything => true,
            Matcher::IsA(kind) => arg.kind() == *kind,
            Matcher::Numeric => arg.is_numeric(),
            Matcher::Boolean => matches!(arg, Value::Bool(_)),
            Matcher::Satisfy(predicate) => predicate(arg),
        }
    }

    /// Check if this matcher accepts more than one concrete value.
    pub fn is_wildcard(&self) -> bool {
        !matches!(self, Matcher::Value(_))
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Value(value) => write!(f, "{}", value),
            Matcher::Anything => f.write_str("anything"),
            Matcher::IsA(kind) => write!(f, "is_a({})", kind),
            Matcher::Numeric => f.write_str("numeric"),
            Matcher::Boolean => f.write_str("boolean"),
            Matcher::Satisfy(_) => f.write_str("satisfy {block}"),
        }
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Matcher({})", self)
    }
}

impl From<Value> for Matcher {
    fn from(value: Value) -> Self {
        Matcher::Value(value)
    }
}

macro_rules! impl_value_matcher {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Matcher {
                fn from(value: $ty) -> Self {
                    Matcher::Value(Value::from(value))
                }
            }
        )*
    };
}

impl_value_matcher!(bool, i32, i64, f64, &str, String);

/// Accepts any argument.
pub fn anything() -> Matcher {
    Matcher::Anything
}

/// Accepts arguments of the given kind.
pub fn is_a(kind: ValueKind) -> Matcher {
    Matcher::IsA(kind)
}

/// Accepts integers and floats.
pub fn numeric() -> Matcher {
    Matcher::Numeric
}

/// Accepts booleans.
pub fn boolean() -> Matcher {
    Matcher::Boolean
}

/// Accepts arguments for which `predicate` returns true.
pub fn satisfy<F>(predicate: F) -> Matcher
where
    F: Fn(&Value) -> bool + 'static,
{
    Matcher::Satisfy(Rc::new(predicate))
}

/// Whether a call must or must not carry a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockExpectation {
    Given,
    NotGiven,
}

impl BlockExpectation {
    fn matches(self, call: &Call) -> bool {
        match self {
            BlockExpectation::Given => call.has_block(),
            BlockExpectation::NotGiven => !call.has_block(),
        }
    }
}

/// How a call matched an expectation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Every position matched a concrete value.
    Exact,
    /// At least one wildcard was needed.
    Wildcard,
}

#[derive(Debug, Clone)]
enum Pattern {
    Positional(Vec<Matcher>),
    Any,
}

/// The argument pattern a double expects.
#[derive(Debug, Clone)]
pub struct ArgumentExpectation {
    pattern: Pattern,
    block: Option<BlockExpectation>,
}

impl ArgumentExpectation {
    /// Expect exactly these positional matchers.
    pub fn new<I, M>(matchers: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<Matcher>,
    {
        Self {
            pattern: Pattern::Positional(matchers.into_iter().map(Into::into).collect()),
            block: None,
        }
    }

    /// Expect a call with no arguments.
    pub fn no_arguments() -> Self {
        Self {
            pattern: Pattern::Positional(Vec::new()),
            block: None,
        }
    }

    /// Accept any arguments of any arity.
    pub fn any_arguments() -> Self {
        Self {
            pattern: Pattern::Any,
            block: None,
        }
    }

    /// Additionally constrain the presence of a block.
    pub fn with_block(mut self, block: BlockExpectation) -> Self {
        self.block = Some(block);
        self
    }

    /// The positional matchers, or `None` when any arguments are accepted.
    pub fn matchers(&self) -> Option<&[Matcher]> {
        match &self.pattern {
            Pattern::Positional(matchers) => Some(matchers),
            Pattern::Any => None,
        }
    }

    /// Check if the call matches with concrete values only.
    pub fn exact_match(&self, call: &Call) -> bool {
        if !self.block_matches(call) {
            return false;
        }
        match &self.pattern {
            Pattern::Positional(matchers) => {
                matchers.len() == call.args.len()
                    && matchers.iter().zip(&call.args).all(|(matcher, arg)| {
                        matches!(matcher, Matcher::Value(expected) if expected == arg)
                    })
            }
            Pattern::Any => false,
        }
    }

    /// Check if the call matches, allowing wildcard positions.
    pub fn wildcard_match(&self, call: &Call) -> bool {
        if !self.block_matches(call) {
            return false;
        }
        match &self.pattern {
            Pattern::Positional(matchers) => {
                matchers.len() == call.args.len()
                    && matchers
                        .iter()
                        .zip(&call.args)
                        .all(|(matcher, arg)| matcher.matches(arg))
            }
            Pattern::Any => true,
        }
    }

    /// Classify how the call matches, if at all.
    pub fn classify(&self, call: &Call) -> Option<MatchKind> {
        if self.exact_match(call) {
            Some(MatchKind::Exact)
        } else if self.wildcard_match(call) {
            Some(MatchKind::Wildcard)
        } else {
            None
        }
    }

    /// Check if the call matches at all.
    pub fn matches(&self, call: &Call) -> bool {
        self.classify(call).is_some()
    }

    fn block_matches(&self, call: &Call) -> bool {
        self.block.map_or(true, |block| block.matches(call))
    }
}

impl fmt::Display for ArgumentExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.pattern {
            Pattern::Positional(matchers) => f.write_str(&join_inspected(matchers)),
            Pattern::Any => f.write_str("any arguments"),
        }
    }
}
