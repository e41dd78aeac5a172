//! Double Definitions
//!
//! A small builder that declares one double on an injection. Argument and
//! call-count methods refine the declaration; `returns`, `implemented_by`,
//! `proxy` and `proxy_then` register it.

use std::rc::Rc;

use decoy::{
    Action, ArgumentExpectation, BlockExpectation, Call, CallResult, Double, DoubleInjection,
    Matcher, OrderedDoubles, TimesCalled, Value,
};

/// A double being declared.
#[must_use = "a definition registers nothing until it is given an action"]
pub struct DoubleDefinition {
    injection: Rc<DoubleInjection>,
    arguments: ArgumentExpectation,
    block: Option<BlockExpectation>,
    times: TimesCalled,
    order: OrderedDoubles,
    ordered: bool,
}

impl DoubleDefinition {
    pub(crate) fn new(
        injection: Rc<DoubleInjection>,
        arguments: ArgumentExpectation,
        times: TimesCalled,
        order: OrderedDoubles,
    ) -> Self {
        Self {
            injection,
            arguments,
            block: None,
            times,
            order,
            ordered: false,
        }
    }

    /// Expect exactly these arguments.
    pub fn with<I, M>(mut self, matchers: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<Matcher>,
    {
        self.arguments = ArgumentExpectation::new(matchers);
        self
    }

    /// Expect a call without arguments.
    pub fn with_no_args(mut self) -> Self {
        self.arguments = ArgumentExpectation::no_arguments();
        self
    }

    /// Accept any arguments.
    pub fn with_any_args(mut self) -> Self {
        self.arguments = ArgumentExpectation::any_arguments();
        self
    }

    /// Require the call to carry a block, whatever arguments are expected.
    pub fn with_block(mut self) -> Self {
        self.block = Some(BlockExpectation::Given);
        self
    }

    /// Require the call to carry no block, whatever arguments are expected.
    pub fn without_block(mut self) -> Self {
        self.block = Some(BlockExpectation::NotGiven);
        self
    }

    /// Expect exactly `n` calls.
    pub fn times(mut self, n: usize) -> Self {
        self.times = TimesCalled::Exactly(n);
        self
    }

    pub fn once(self) -> Self {
        self.times(1)
    }

    pub fn twice(self) -> Self {
        self.times(2)
    }

    pub fn never(self) -> Self {
        self.times(0)
    }

    /// Expect `n` or more calls.
    pub fn at_least(mut self, n: usize) -> Self {
        self.times = TimesCalled::AtLeast(n);
        self
    }

    /// Expect at most `n` calls.
    pub fn at_most(mut self, n: usize) -> Self {
        self.times = TimesCalled::AtMost(n);
        self
    }

    /// Expect between `min` and `max` calls, inclusive.
    pub fn between(mut self, min: usize, max: usize) -> Self {
        self.times = TimesCalled::Between(min, max);
        self
    }

    /// Accept any number of calls.
    pub fn any_number_of_times(mut self) -> Self {
        self.times = TimesCalled::Any;
        self
    }

    /// Require this double to be called in declaration order relative to
    /// other ordered doubles of the same space.
    pub fn ordered(mut self) -> Self {
        self.ordered = true;
        self
    }

    /// Register the double returning a fixed value.
    pub fn returns(self, value: impl Into<Value>) -> Rc<Double> {
        self.register(Action::Returns(value.into()))
    }

    /// Register the double computing its result from the call.
    pub fn implemented_by<F>(self, implementation: F) -> Rc<Double>
    where
        F: Fn(&Call) -> CallResult + 'static,
    {
        self.register(Action::implementation(implementation))
    }

    /// Register the double delegating to the original method.
    pub fn proxy(self) -> Rc<Double> {
        self.register(Action::Proxy)
    }

    /// Register the double delegating to the original method and passing
    /// its result through `after_call`.
    pub fn proxy_then<F>(self, after_call: F) -> Rc<Double>
    where
        F: Fn(Value) -> CallResult + 'static,
    {
        self.register(Action::proxy_then(after_call))
    }

    fn register(self, action: Action) -> Rc<Double> {
        let arguments = match self.block {
            Some(block) => self.arguments.with_block(block),
            None => self.arguments,
        };
        let double = self.injection.register_double(arguments, self.times, action);
        if self.ordered {
            self.order.push(&double);
        }
        tracing::debug!(
            object = %self.injection.object(),
            signature = %double.signature(),
            times = %self.times,
            ordered = self.ordered,
            "registered double"
        );
        double
    }
}
