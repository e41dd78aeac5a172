//! Ordered doubles: calls that must happen in declaration order, across
//! methods and objects.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::double::Double;
use crate::error::{DoubleError, DoubleResult};

/// A queue of doubles that must be called in order.
///
/// Clones share the same queue. The head is popped once it can no longer be
/// attempted.
#[derive(Clone, Default)]
pub struct OrderedDoubles {
    queue: Rc<RefCell<VecDeque<Rc<Double>>>>,
}

impl OrderedDoubles {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a double and mark it as ordered.
    pub fn push(&self, double: &Rc<Double>) {
        double.set_order(self.clone());
        self.queue.borrow_mut().push_back(Rc::clone(double));
    }

    /// Number of doubles still waiting.
    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Check if no ordered doubles are waiting.
    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    /// Drop every queued double.
    pub fn clear(&self) {
        self.queue.borrow_mut().clear();
    }

    /// Check that `double` is the next ordered double to be called.
    ///
    /// Runs after the call was counted, so an exhausted head is popped here.
    pub fn verify_ordered(&self, double: &Double) -> DoubleResult<()> {
        if !double.times().quantifier().is_bounded() {
            return Err(DoubleError::DoubleOrder(
                "Ordered Doubles cannot have a NonTerminal TimesCalledExpectation".to_string(),
            ));
        }

        let mut queue = self.queue.borrow_mut();
        let is_head = queue
            .front()
            .is_some_and(|head| std::ptr::eq(Rc::as_ptr(head), double));
        if !is_head {
            let list = queue
                .iter()
                .map(|queued| format!("- {}", queued.signature()))
                .collect::<Vec<_>>()
                .join("\n");
            return Err(DoubleError::DoubleOrder(format!(
                "{} called out of order in list\n{}",
                double.signature(),
                list
            )));
        }

        if !double.is_attempt() {
            queue.pop_front();
        }
        Ok(())
    }
}

impl std::fmt::Debug for OrderedDoubles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderedDoubles")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arguments::ArgumentExpectation;
    use crate::double::{Action, DoubleId};
    use crate::times::TimesCalled;
    use crate::value::Value;

    fn double(id: usize, method: &str, times: TimesCalled) -> Rc<Double> {
        Rc::new(Double::new(
            DoubleId(id),
            method,
            ArgumentExpectation::no_arguments(),
            times,
            Action::Returns(Value::Nil),
        ))
    }

    #[test]
    fn test_in_order() {
        let order = OrderedDoubles::new();
        let first = double(0, "first", TimesCalled::Exactly(1));
        let second = double(0, "second", TimesCalled::Exactly(2));
        order.push(&first);
        order.push(&second);
        assert!(first.is_ordered());

        first.times().attempt("first()").unwrap();
        order.verify_ordered(&first).unwrap();
        assert_eq!(order.len(), 1);

        second.times().attempt("second()").unwrap();
        order.verify_ordered(&second).unwrap();
        assert_eq!(order.len(), 1);

        second.times().attempt("second()").unwrap();
        order.verify_ordered(&second).unwrap();
        assert!(order.is_empty());
    }

    #[test]
    fn test_out_of_order() {
        let order = OrderedDoubles::new();
        let first = double(0, "first", TimesCalled::Exactly(1));
        let second = double(0, "second", TimesCalled::Exactly(1));
        order.push(&first);
        order.push(&second);

        second.times().attempt("second()").unwrap();
        let err = order.verify_ordered(&second).unwrap_err();
        assert_eq!(
            err.to_string(),
            "second() called out of order in list\n- first()\n- second()"
        );
    }

    #[test]
    fn test_unbounded_double_rejected() {
        let order = OrderedDoubles::new();
        let stub = double(0, "stub", TimesCalled::Any);
        order.push(&stub);
        assert!(matches!(
            order.verify_ordered(&stub),
            Err(DoubleError::DoubleOrder(_))
        ));
    }
}
