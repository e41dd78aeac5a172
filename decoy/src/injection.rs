//! # Double Injection
//!
//! Binds one `(object, method)` pair to its doubles.
//!
//! ## Lifecycle
//!
//! ```text
//! new()  -> Unbound    original implementation preserved, if any
//! bind() -> Bound      dispatcher installed on the object itself
//! reset()-> Reset      dispatcher removed, original shape restored
//! ```
//!
//! The dispatcher lives in the object's singleton method table, so other
//! instances of the same class are never affected. It holds only a weak
//! reference back to the injection.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::arguments::ArgumentExpectation;
use crate::double::{Action, Double, DoubleId};
use crate::error::{DoubleError, DoubleResult};
use crate::object::{Call, CallResult, Method, MethodLookup, Object};
use crate::resolve::{resolve, NoMatchError, Resolution};
use crate::times::TimesCalled;

/// Binding state of an injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    /// Created but no dispatcher installed yet.
    Unbound,
    /// Dispatcher installed.
    Bound,
    /// Dispatcher removed and the object restored.
    Reset,
}

/// Where the preserved original came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginalOwner {
    /// Defined on the object itself; re-installed on reset.
    Singleton,
    /// Defined on the class; reachable again once the dispatcher is gone.
    Class,
}

struct OriginalMethod {
    method: Method,
    owner: OriginalOwner,
}

/// The binding of an object and a method to its doubles.
pub struct DoubleInjection {
    object: Object,
    method_name: String,
    original: Option<OriginalMethod>,
    doubles: RefCell<Vec<Rc<Double>>>,
    state: Cell<BindingState>,
    this: Weak<DoubleInjection>,
}

impl DoubleInjection {
    /// Create an injection, preserving the object's current implementation.
    ///
    /// A method the class only declares lazily is defined first so it can be
    /// preserved. Objects without the method are valid targets.
    pub fn new(object: &Object, method_name: impl Into<String>) -> Rc<Self> {
        let method_name = method_name.into();
        let original = Self::find_original(object, &method_name);
        debug!(
            object = %object,
            method = %method_name,
            has_original = original.is_some(),
            "created double injection"
        );
        Rc::new_cyclic(|this| Self {
            object: object.clone(),
            method_name,
            original,
            doubles: RefCell::new(Vec::new()),
            state: Cell::new(BindingState::Unbound),
            this: this.clone(),
        })
    }

    fn find_original(object: &Object, method_name: &str) -> Option<OriginalMethod> {
        let mut lookup = object.lookup(method_name);
        if let MethodLookup::Lazy = lookup {
            object.class().materialize(method_name);
            lookup = object.lookup(method_name);
        }
        match lookup {
            MethodLookup::Singleton(method) => Some(OriginalMethod {
                method,
                owner: OriginalOwner::Singleton,
            }),
            MethodLookup::Class(method) => Some(OriginalMethod {
                method,
                owner: OriginalOwner::Class,
            }),
            MethodLookup::Lazy | MethodLookup::Missing => None,
        }
    }

    /// The intercepted object.
    pub fn object(&self) -> &Object {
        &self.object
    }

    /// The intercepted method.
    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    /// Current binding state.
    pub fn state(&self) -> BindingState {
        self.state.get()
    }

    /// Check if the dispatcher is installed.
    pub fn is_bound(&self) -> bool {
        self.state() == BindingState::Bound
    }

    /// Check if an original implementation was preserved.
    pub fn has_original_method(&self) -> bool {
        self.original.is_some()
    }

    /// Where the original implementation came from, if there was one.
    pub fn original_owner(&self) -> Option<OriginalOwner> {
        self.original.as_ref().map(|original| original.owner)
    }

    /// The registered doubles, in registration order.
    pub fn doubles(&self) -> Vec<Rc<Double>> {
        self.doubles.borrow().clone()
    }

    /// Register a new double after the existing ones.
    pub fn register_double(
        &self,
        arguments: ArgumentExpectation,
        times: TimesCalled,
        action: Action,
    ) -> Rc<Double> {
        let mut doubles = self.doubles.borrow_mut();
        let double = Rc::new(Double::new(
            DoubleId(doubles.len()),
            self.method_name.clone(),
            arguments,
            times,
            action,
        ));
        doubles.push(Rc::clone(&double));
        double
    }

    /// Install the dispatcher on the object.
    pub fn bind(&self) -> DoubleResult<()> {
        if self.state() != BindingState::Unbound {
            return Err(self.state_error("is already bound"));
        }

        let this = self.this.clone();
        let method_name = self.method_name.clone();
        let dispatcher: Method = Rc::new(move |receiver: &Object, call: &Call| {
            let injection = this.upgrade().ok_or_else(|| {
                DoubleError::BindingState(format!(
                    "double injection for {} on {} was dropped while bound",
                    method_name, receiver
                ))
            })?;
            injection.dispatch(call)
        });
        self.object
            .install_singleton_method(self.method_name.clone(), dispatcher);
        self.state.set(BindingState::Bound);
        debug!(object = %self.object, method = %self.method_name, "bound double injection");
        Ok(())
    }

    /// Verify every double's call count, in registration order.
    ///
    /// Fails with the first unsatisfied double.
    pub fn verify(&self) -> DoubleResult<()> {
        self.ensure_bound("verify")?;
        for double in self.doubles() {
            double.verify()?;
        }
        Ok(())
    }

    /// Verify every double, collecting all failures.
    pub fn verification_failures(&self) -> DoubleResult<Vec<DoubleError>> {
        self.ensure_bound("verify")?;
        Ok(self
            .doubles()
            .iter()
            .filter_map(|double| double.verify().err())
            .collect())
    }

    /// Remove the dispatcher and restore the object's original shape.
    pub fn reset(&self) -> DoubleResult<()> {
        self.ensure_bound("reset")?;
        self.object.remove_singleton_method(&self.method_name);
        if let Some(OriginalMethod {
            method,
            owner: OriginalOwner::Singleton,
        }) = &self.original
        {
            self.object
                .install_singleton_method(self.method_name.clone(), Rc::clone(method));
        }
        self.state.set(BindingState::Reset);
        debug!(object = %self.object, method = %self.method_name, "reset double injection");
        Ok(())
    }

    /// Call the preserved original implementation, bypassing the doubles.
    pub fn call_original(&self, call: &Call) -> CallResult {
        match &self.original {
            Some(original) => (original.method)(&self.object, call),
            None => Err(self.object.no_method(&self.method_name)),
        }
    }

    /// Resolve the call to a double and run it.
    ///
    /// Resolution works on a snapshot of the doubles, so matchers and
    /// actions may register further doubles on this injection.
    fn dispatch(&self, call: &Call) -> CallResult {
        let doubles = self.doubles();
        let selected = match resolve(&doubles, call) {
            Resolution::Resolved { double, .. } => Rc::clone(double),
            Resolution::NoMatch => {
                return Err(DoubleError::from(NoMatchError {
                    object: self.object.to_string(),
                    method_name: &self.method_name,
                    call,
                    candidates: &doubles,
                }))
            }
        };
        selected.call(self, call)
    }

    fn ensure_bound(&self, operation: &str) -> DoubleResult<()> {
        match self.state() {
            BindingState::Bound => Ok(()),
            BindingState::Unbound => {
                Err(self.state_error(&format!("cannot {}: never bound", operation)))
            }
            BindingState::Reset => {
                Err(self.state_error(&format!("cannot {}: already reset", operation)))
            }
        }
    }

    fn state_error(&self, detail: &str) -> DoubleError {
        DoubleError::BindingState(format!(
            "double injection for {} on {} {}",
            self.method_name, self.object, detail
        ))
    }
}

impl std::fmt::Debug for DoubleInjection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DoubleInjection")
            .field("object", &self.object)
            .field("method_name", &self.method_name)
            .field("original", &self.original_owner())
            .field("state", &self.state())
            .field("doubles", &self.doubles.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use crate::object::Class;
    use crate::value::Value;

    fn subject() -> Object {
        let class = Class::new("Widget");
        class.define_method("size", |_, _| Ok(Value::from(3)));
        Object::named(&class, "subject")
    }

    #[test]
    fn test_preserves_class_original() {
        let obj = subject();
        let injection = DoubleInjection::new(&obj, "size");
        assert_eq!(injection.original_owner(), Some(OriginalOwner::Class));
        assert_eq!(injection.call_original(&Call::new(args![])), Ok(Value::from(3)));
    }

    #[test]
    fn test_preserves_singleton_original() {
        let obj = subject();
        obj.define_singleton_method("name", |_, _| Ok(Value::from("own")));
        let injection = DoubleInjection::new(&obj, "name");
        assert_eq!(injection.original_owner(), Some(OriginalOwner::Singleton));

        injection.bind().unwrap();
        injection.register_double(
            ArgumentExpectation::no_arguments(),
            TimesCalled::Any,
            Action::Returns(Value::from("stubbed")),
        );
        assert_eq!(obj.send("name", args![]), Ok(Value::from("stubbed")));

        injection.reset().unwrap();
        assert!(obj.has_singleton_method("name"));
        assert_eq!(obj.send("name", args![]), Ok(Value::from("own")));
    }

    #[test]
    fn test_missing_original() {
        let obj = subject();
        let injection = DoubleInjection::new(&obj, "colour");
        assert!(!injection.has_original_method());
        assert!(matches!(
            injection.call_original(&Call::new(args![])),
            Err(DoubleError::NoMethod { .. })
        ));
    }

    #[test]
    fn test_lazy_original_is_forced() {
        let class = Class::new("Record");
        class.define_lazy_method("title", |_, _| Ok(Value::from("lazy")));
        let obj = Object::new(&class);

        let injection = DoubleInjection::new(&obj, "title");
        assert_eq!(injection.original_owner(), Some(OriginalOwner::Class));
        assert!(!class.is_lazy("title"));
        assert_eq!(injection.call_original(&Call::new(args![])), Ok(Value::from("lazy")));
    }

    #[test]
    fn test_lifecycle_errors() {
        let obj = subject();
        let injection = DoubleInjection::new(&obj, "size");
        assert!(matches!(injection.verify(), Err(DoubleError::BindingState(_))));
        assert!(matches!(injection.reset(), Err(DoubleError::BindingState(_))));

        injection.bind().unwrap();
        let err = injection.bind().unwrap_err();
        assert_eq!(
            err.to_string(),
            "double injection for size on #<Widget:subject> is already bound"
        );

        injection.reset().unwrap();
        assert_eq!(injection.state(), BindingState::Reset);
        assert!(matches!(injection.reset(), Err(DoubleError::BindingState(_))));
        assert!(matches!(injection.bind(), Err(DoubleError::BindingState(_))));
    }

    #[test]
    fn test_double_ids_follow_registration() {
        let obj = subject();
        let injection = DoubleInjection::new(&obj, "size");
        let first = injection.register_double(
            ArgumentExpectation::any_arguments(),
            TimesCalled::Any,
            Action::Proxy,
        );
        let second = injection.register_double(
            ArgumentExpectation::no_arguments(),
            TimesCalled::Any,
            Action::Proxy,
        );
        assert_eq!(first.id(), DoubleId(0));
        assert_eq!(second.id(), DoubleId(1));
        assert_eq!(injection.doubles().len(), 2);
    }

    #[test]
    fn test_verification_failures_collects_all() {
        let obj = subject();
        let injection = DoubleInjection::new(&obj, "size");
        injection.bind().unwrap();
        for n in [1, 2] {
            injection.register_double(
                ArgumentExpectation::new([n]),
                TimesCalled::Exactly(1),
                Action::Returns(Value::Nil),
            );
        }
        let failures = injection.verification_failures().unwrap();
        assert_eq!(failures.len(), 2);
        assert_eq!(
            injection.verify().unwrap_err().to_string(),
            "size(1)\nCalled 0 time(s).\nExpected exactly 1 time."
        );
    }

    #[test]
    fn test_dropped_injection_reports_binding_error() {
        let obj = subject();
        let injection = DoubleInjection::new(&obj, "size");
        injection.bind().unwrap();
        drop(injection);
        assert!(matches!(
            obj.send("size", args![]),
            Err(DoubleError::BindingState(_))
        ));
    }

    #[test]
    fn test_matcher_may_register_doubles() {
        let obj = subject();
        let injection = DoubleInjection::new(&obj, "size");
        injection.bind().unwrap();
        let weak = Rc::downgrade(&injection);
        let registered = Cell::new(false);
        injection.register_double(
            ArgumentExpectation::new(vec![crate::arguments::satisfy(move |_| {
                if registered.replace(true) {
                    return true;
                }
                if let Some(injection) = weak.upgrade() {
                    injection.register_double(
                        ArgumentExpectation::no_arguments(),
                        TimesCalled::Any,
                        Action::Returns(Value::from("late")),
                    );
                }
                true
            })]),
            TimesCalled::Any,
            Action::Returns(Value::from("early")),
        );

        assert_eq!(obj.send("size", args![1]), Ok(Value::from("early")));
        assert_eq!(injection.doubles().len(), 2);
        assert_eq!(obj.send("size", args![]), Ok(Value::from("late")));
    }
}
