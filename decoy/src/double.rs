//! Doubles: one registered behavior for an intercepted method.
//!
//! A double couples an [`ArgumentExpectation`], a [`TimesCalledExpectation`]
//! and an [`Action`]. It is owned by its [`DoubleInjection`] and identified
//! by its position there.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::arguments::{ArgumentExpectation, MatchKind};
use crate::error::DoubleResult;
use crate::injection::DoubleInjection;
use crate::object::{Call, CallResult};
use crate::ordered::OrderedDoubles;
use crate::times::{TimesCalled, TimesCalledExpectation};
use crate::value::Value;

/// Position of a double within its injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DoubleId(pub usize);

/// A computed implementation.
pub type Implementation = Rc<dyn Fn(&Call) -> CallResult>;

/// Post-processing applied to the original method's result.
pub type AfterCall = Rc<dyn Fn(Value) -> CallResult>;

/// What a double does once it is selected.
#[derive(Clone)]
pub enum Action {
    /// Return a fixed value.
    Returns(Value),
    /// Compute the result from the call.
    Implementation(Implementation),
    /// Call the original method and return its result.
    Proxy,
    /// Call the original method and pass its result through a function.
    ProxyThen(AfterCall),
}

impl Action {
    /// Compute the result from the call.
    pub fn implementation<F>(f: F) -> Self
    where
        F: Fn(&Call) -> CallResult + 'static,
    {
        Action::Implementation(Rc::new(f))
    }

    /// Call the original method, then transform its result.
    pub fn proxy_then<F>(f: F) -> Self
    where
        F: Fn(Value) -> CallResult + 'static,
    {
        Action::ProxyThen(Rc::new(f))
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Returns(value) => f.debug_tuple("Returns").field(value).finish(),
            Action::Implementation(_) => f.write_str("Implementation"),
            Action::Proxy => f.write_str("Proxy"),
            Action::ProxyThen(_) => f.write_str("ProxyThen"),
        }
    }
}

/// One registered behavior.
pub struct Double {
    id: DoubleId,
    method_name: String,
    arguments: ArgumentExpectation,
    times: TimesCalledExpectation,
    action: Action,
    order: RefCell<Option<OrderedDoubles>>,
}

impl Double {
    /// Create a double for `method_name`.
    pub fn new(
        id: DoubleId,
        method_name: impl Into<String>,
        arguments: ArgumentExpectation,
        times: TimesCalled,
        action: Action,
    ) -> Self {
        Self {
            id,
            method_name: method_name.into(),
            arguments,
            times: TimesCalledExpectation::new(times),
            action,
            order: RefCell::new(None),
        }
    }

    /// Position within the owning injection.
    pub fn id(&self) -> DoubleId {
        self.id
    }

    /// The intercepted method.
    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    /// The call-count expectation.
    pub fn times(&self) -> &TimesCalledExpectation {
        &self.times
    }

    /// Calls counted so far.
    pub fn times_called(&self) -> usize {
        self.times.times_called()
    }

    /// Check if the call's arguments match.
    pub fn matches(&self, call: &Call) -> bool {
        self.arguments.matches(call)
    }

    /// Classify how the call's arguments match.
    pub fn classify(&self, call: &Call) -> Option<MatchKind> {
        self.arguments.classify(call)
    }

    /// Check if another call is acceptable.
    pub fn is_attempt(&self) -> bool {
        self.times.is_attempt()
    }

    /// Check if the next call is the last acceptable one.
    pub fn is_terminal(&self) -> bool {
        self.times.is_terminal()
    }

    /// Check if this double takes part in ordered verification.
    pub fn is_ordered(&self) -> bool {
        self.order.borrow().is_some()
    }

    pub(crate) fn set_order(&self, order: OrderedDoubles) {
        *self.order.borrow_mut() = Some(order);
    }

    /// The expected signature, e.g. `foo(1, 2)`.
    pub fn signature(&self) -> String {
        formatted_name(&self.method_name, &self.arguments)
    }

    /// Count the call and run the action.
    pub fn call(&self, injection: &DoubleInjection, call: &Call) -> CallResult {
        self.times.attempt(&self.signature())?;
        let order = self.order.borrow().clone();
        if let Some(order) = order {
            order.verify_ordered(self)?;
        }
        match &self.action {
            Action::Returns(value) => Ok(value.clone()),
            Action::Implementation(implementation) => implementation(call),
            Action::Proxy => injection.call_original(call),
            Action::ProxyThen(after_call) => after_call(injection.call_original(call)?),
        }
    }

    /// Fail unless the call count satisfies the quantifier.
    pub fn verify(&self) -> DoubleResult<()> {
        self.times.verify(&self.signature())
    }
}

impl fmt::Debug for Double {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Double")
            .field("id", &self.id)
            .field("signature", &self.signature())
            .field("times", &self.times.quantifier())
            .field("times_called", &self.times_called())
            .field("action", &self.action)
            .finish()
    }
}

/// Format a method name with its arguments, e.g. `foo(1, 2)`.
pub fn formatted_name(method_name: &str, args: &dyn fmt::Display) -> String {
    format!("{}({})", method_name, args)
}

/// One line per double, with its current call count.
pub fn list_message_part(doubles: &[Rc<Double>]) -> String {
    doubles
        .iter()
        .map(|double| {
            format!(
                "- {} (called {} time(s))",
                double.signature(),
                double.times_called()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use crate::arguments::anything;

    fn double(arguments: ArgumentExpectation, times: TimesCalled) -> Rc<Double> {
        Rc::new(Double::new(
            DoubleId(0),
            "foo",
            arguments,
            times,
            Action::Returns(Value::sym("baz")),
        ))
    }

    #[test]
    fn test_signature() {
        let exact = double(ArgumentExpectation::new([1, 2]), TimesCalled::Any);
        assert_eq!(exact.signature(), "foo(1, 2)");

        let wildcard = double(ArgumentExpectation::new(vec![anything()]), TimesCalled::Any);
        assert_eq!(wildcard.signature(), "foo(anything)");

        let any = double(ArgumentExpectation::any_arguments(), TimesCalled::Any);
        assert_eq!(any.signature(), "foo(any arguments)");
    }

    #[test]
    fn test_matches_delegates_to_arguments() {
        let exact = double(ArgumentExpectation::new([1, 2]), TimesCalled::Any);
        assert!(exact.matches(&Call::new(args![1, 2])));
        assert_eq!(exact.classify(&Call::new(args![1, 2])), Some(MatchKind::Exact));
        assert!(!exact.matches(&Call::new(args![1])));
    }

    #[test]
    fn test_list_message_part() {
        let doubles = vec![
            double(ArgumentExpectation::new([1, 2]), TimesCalled::Exactly(1)),
            double(ArgumentExpectation::no_arguments(), TimesCalled::Any),
        ];
        doubles[0].times().attempt("foo(1, 2)").unwrap();
        assert_eq!(
            list_message_part(&doubles),
            "- foo(1, 2) (called 1 time(s))\n- foo() (called 0 time(s))"
        );
    }

    #[test]
    fn test_verify_uses_signature() {
        let exact = double(ArgumentExpectation::new([1, 2]), TimesCalled::Exactly(1));
        assert_eq!(
            exact.verify().unwrap_err().to_string(),
            "foo(1, 2)\nCalled 0 time(s).\nExpected exactly 1 time."
        );
    }
}
