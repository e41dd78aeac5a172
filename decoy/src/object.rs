//! # Object Model
//!
//! A small dynamic object model whose methods can be replaced per instance.
//!
//! ## Method Lookup
//!
//! Calls are resolved in this order:
//!
//! 1. the object's own singleton method table;
//! 2. the class method table, shared by every instance of the class;
//! 3. methods the class declares lazily, which are materialized into the
//!    class table on first use;
//! 4. otherwise the call fails with [`DoubleError::NoMethod`].
//!
//! Interception only ever touches the singleton table, so sibling instances
//! of the same class keep their behavior.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use rustc_hash::FxHashMap;

use crate::error::{DoubleError, DoubleResult};
use crate::value::{join_inspected, Value};

/// Result of invoking a method.
pub type CallResult = DoubleResult<Value>;

/// A callable method body. Receives the receiver and the packaged call.
pub type Method = Rc<dyn Fn(&Object, &Call) -> CallResult>;

/// A block passed along with a call.
pub type Block = Rc<dyn Fn(&[Value]) -> Value>;

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// The arguments of one invocation: positional values plus an optional block.
#[derive(Clone, Default)]
pub struct Call {
    /// Positional arguments.
    pub args: Vec<Value>,
    /// Trailing block, if one was given.
    pub block: Option<Block>,
}

impl Call {
    /// Create a call without a block.
    pub fn new(args: Vec<Value>) -> Self {
        Self { args, block: None }
    }

    /// Create a call with a block.
    pub fn with_block<F>(args: Vec<Value>, block: F) -> Self
    where
        F: Fn(&[Value]) -> Value + 'static,
    {
        Self {
            args,
            block: Some(Rc::new(block)),
        }
    }

    /// Check if a block was given.
    pub fn has_block(&self) -> bool {
        self.block.is_some()
    }

    /// Invoke the block with the given values, if there is one.
    pub fn yield_block(&self, values: &[Value]) -> Option<Value> {
        self.block.as_ref().map(|block| block(values))
    }
}

impl fmt::Debug for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Call")
            .field("args", &self.args)
            .field("block", &self.block.is_some())
            .finish()
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&join_inspected(&self.args))
    }
}

/// A class: a named method table shared by its instances.
pub struct Class {
    name: String,
    methods: RefCell<FxHashMap<String, Method>>,
    /// Methods declared but not yet defined.
    lazy: RefCell<FxHashMap<String, Method>>,
}

impl Class {
    /// Create a new class with no methods.
    pub fn new(name: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            methods: RefCell::new(FxHashMap::default()),
            lazy: RefCell::new(FxHashMap::default()),
        })
    }

    /// The class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Define an instance method.
    pub fn define_method<F>(&self, name: impl Into<String>, body: F)
    where
        F: Fn(&Object, &Call) -> CallResult + 'static,
    {
        self.methods.borrow_mut().insert(name.into(), Rc::new(body));
    }

    /// Declare an instance method whose definition is deferred until the
    /// method is first needed.
    pub fn define_lazy_method<F>(&self, name: impl Into<String>, body: F)
    where
        F: Fn(&Object, &Call) -> CallResult + 'static,
    {
        self.lazy.borrow_mut().insert(name.into(), Rc::new(body));
    }

    /// Look up a defined instance method.
    pub fn instance_method(&self, name: &str) -> Option<Method> {
        self.methods.borrow().get(name).cloned()
    }

    /// Check if the method is declared but not yet defined.
    pub fn is_lazy(&self, name: &str) -> bool {
        self.lazy.borrow().contains_key(name)
    }

    /// Define a lazily declared method. Returns false if nothing was pending.
    pub fn materialize(&self, name: &str) -> bool {
        let Some(body) = self.lazy.borrow_mut().remove(name) else {
            return false;
        };
        tracing::trace!(class = %self.name, method = name, "materialized lazy method");
        self.methods.borrow_mut().insert(name.to_string(), body);
        true
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<_> = self.methods.borrow().keys().cloned().collect();
        methods.sort();
        f.debug_struct("Class")
            .field("name", &self.name)
            .field("methods", &methods)
            .finish()
    }
}

/// Unique identity of an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

impl ObjectId {
    fn fresh() -> Self {
        ObjectId(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Where a method was found.
pub enum MethodLookup {
    /// Defined on the object itself.
    Singleton(Method),
    /// Defined on the object's class.
    Class(Method),
    /// Declared lazily on the class and not yet defined.
    Lazy,
    /// The object does not respond to the method.
    Missing,
}

struct ObjectInner {
    id: ObjectId,
    class: Rc<Class>,
    label: Option<String>,
    singleton: RefCell<FxHashMap<String, Method>>,
}

/// A handle to a live object. Clones share the same identity.
#[derive(Clone)]
pub struct Object {
    inner: Rc<ObjectInner>,
}

impl Object {
    /// Create a new instance of a class.
    pub fn new(class: &Rc<Class>) -> Self {
        Self::build(class, None)
    }

    /// Create a new instance rendered with a fixed label instead of its id.
    pub fn named(class: &Rc<Class>, label: impl Into<String>) -> Self {
        Self::build(class, Some(label.into()))
    }

    fn build(class: &Rc<Class>, label: Option<String>) -> Self {
        Self {
            inner: Rc::new(ObjectInner {
                id: ObjectId::fresh(),
                class: Rc::clone(class),
                label,
                singleton: RefCell::new(FxHashMap::default()),
            }),
        }
    }

    /// The object's identity.
    pub fn id(&self) -> ObjectId {
        self.inner.id
    }

    /// The object's class.
    pub fn class(&self) -> &Rc<Class> {
        &self.inner.class
    }

    /// Define a method on this object only.
    pub fn define_singleton_method<F>(&self, name: impl Into<String>, body: F)
    where
        F: Fn(&Object, &Call) -> CallResult + 'static,
    {
        self.install_singleton_method(name, Rc::new(body));
    }

    /// Install a method body on this object only, returning any body it
    /// replaced.
    pub fn install_singleton_method(
        &self,
        name: impl Into<String>,
        body: Method,
    ) -> Option<Method> {
        self.inner.singleton.borrow_mut().insert(name.into(), body)
    }

    /// Remove a method from this object's own table.
    pub fn remove_singleton_method(&self, name: &str) -> Option<Method> {
        self.inner.singleton.borrow_mut().remove(name)
    }

    /// Check if the object itself defines the method.
    pub fn has_singleton_method(&self, name: &str) -> bool {
        self.inner.singleton.borrow().contains_key(name)
    }

    /// Find the implementation the object would run for `name`.
    pub fn lookup(&self, name: &str) -> MethodLookup {
        if let Some(method) = self.inner.singleton.borrow().get(name) {
            return MethodLookup::Singleton(Rc::clone(method));
        }
        if let Some(method) = self.inner.class.instance_method(name) {
            return MethodLookup::Class(method);
        }
        if self.inner.class.is_lazy(name) {
            return MethodLookup::Lazy;
        }
        MethodLookup::Missing
    }

    /// Check if the object responds to the method.
    pub fn responds_to(&self, name: &str) -> bool {
        !matches!(self.lookup(name), MethodLookup::Missing)
    }

    /// Call a method with positional arguments.
    pub fn send(&self, name: &str, args: Vec<Value>) -> CallResult {
        self.send_call(name, &Call::new(args))
    }

    /// Call a method with a fully packaged call.
    pub fn send_call(&self, name: &str, call: &Call) -> CallResult {
        let method = match self.lookup(name) {
            MethodLookup::Singleton(method) | MethodLookup::Class(method) => method,
            MethodLookup::Lazy => {
                self.inner.class.materialize(name);
                self.inner
                    .class
                    .instance_method(name)
                    .ok_or_else(|| self.no_method(name))?
            }
            MethodLookup::Missing => return Err(self.no_method(name)),
        };
        method(self, call)
    }

    /// Build the error for calling a method the object lacks.
    pub fn no_method(&self, name: &str) -> DoubleError {
        DoubleError::NoMethod {
            object: self.to_string(),
            method: name.to_string(),
        }
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Object {}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner.label {
            Some(label) => write!(f, "#<{}:{}>", self.inner.class.name, label),
            None => write!(f, "#<{}:{:#010x}>", self.inner.class.name, self.inner.id.0),
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;

    fn widget() -> Rc<Class> {
        let class = Class::new("Widget");
        class.define_method("size", |_, _| Ok(Value::from(3)));
        class
    }

    #[test]
    fn test_class_method_dispatch() {
        let class = widget();
        let obj = Object::new(&class);
        assert_eq!(obj.send("size", args![]), Ok(Value::from(3)));
    }

    #[test]
    fn test_singleton_shadows_class() {
        let class = widget();
        let obj = Object::new(&class);
        let sibling = Object::new(&class);

        obj.define_singleton_method("size", |_, _| Ok(Value::from(10)));
        assert_eq!(obj.send("size", args![]), Ok(Value::from(10)));
        assert_eq!(sibling.send("size", args![]), Ok(Value::from(3)));

        obj.remove_singleton_method("size");
        assert_eq!(obj.send("size", args![]), Ok(Value::from(3)));
    }

    #[test]
    fn test_missing_method() {
        let obj = Object::named(&widget(), "subject");
        let err = obj.send("colour", args![]).unwrap_err();
        assert_eq!(err.to_string(), "undefined method `colour' for #<Widget:subject>");
        assert!(!obj.responds_to("colour"));
    }

    #[test]
    fn test_lazy_method_materializes_on_first_call() {
        let class = widget();
        class.define_lazy_method("name", |_, _| Ok(Value::from("w")));
        let obj = Object::new(&class);

        assert!(matches!(obj.lookup("name"), MethodLookup::Lazy));
        assert!(obj.responds_to("name"));
        assert_eq!(obj.send("name", args![]), Ok(Value::from("w")));
        assert!(matches!(obj.lookup("name"), MethodLookup::Class(_)));
        assert!(!class.is_lazy("name"));
    }

    #[test]
    fn test_block_is_forwarded() {
        let class = Class::new("Widget");
        class.define_method("each", |_, call| {
            Ok(call.yield_block(&call.args).unwrap_or_default())
        });
        let obj = Object::new(&class);

        let call = Call::with_block(args![2], |values| match values {
            [Value::Int(i)] => Value::Int(i * 2),
            _ => Value::Nil,
        });
        assert_eq!(obj.send_call("each", &call), Ok(Value::from(4)));
        assert_eq!(obj.send("each", args![2]), Ok(Value::Nil));
    }

    #[test]
    fn test_identity() {
        let class = widget();
        let a = Object::new(&class);
        let b = Object::new(&class);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_ne!(a.id(), b.id());
    }
}
