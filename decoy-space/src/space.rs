//! Double Space
//!
//! The session-scoped registry of active injections. A space is created at
//! the start of a test and torn down at its end; it is passed explicitly to
//! whatever declares doubles, there is no global instance.

use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, warn};

use decoy::{
    ArgumentExpectation, DoubleError, DoubleInjection, DoubleResult, Object, ObjectId,
    OrderedDoubles, TimesCalled,
};

use crate::config::SpaceConfig;
use crate::definition::DoubleDefinition;

/// Injections of one object, by method name.
type MethodInjections = IndexMap<String, Rc<DoubleInjection>>;

/// Registry of double injections, indexed by object and method.
pub struct Space {
    config: SpaceConfig,
    injections: IndexMap<ObjectId, MethodInjections>,
    ordered_doubles: OrderedDoubles,
}

impl Space {
    /// Create a space with the default configuration.
    pub fn new() -> Self {
        Self::with_config(SpaceConfig::default())
    }

    /// Create a space with the given configuration.
    pub fn with_config(config: SpaceConfig) -> Self {
        Self {
            config,
            injections: IndexMap::new(),
            ordered_doubles: OrderedDoubles::new(),
        }
    }

    /// The space configuration.
    pub fn config(&self) -> &SpaceConfig {
        &self.config
    }

    /// The queue of ordered doubles not yet exhausted.
    pub fn ordered_doubles(&self) -> &OrderedDoubles {
        &self.ordered_doubles
    }

    /// Get the injection for `(object, method)`, creating and binding it on
    /// first use.
    pub fn double_injection(
        &mut self,
        object: &Object,
        method_name: &str,
    ) -> DoubleResult<Rc<DoubleInjection>> {
        if let Some(injection) = self.injection(object, method_name) {
            return Ok(injection);
        }
        let injection = DoubleInjection::new(object, method_name);
        injection.bind()?;
        self.injections
            .entry(object.id())
            .or_default()
            .insert(method_name.to_string(), Rc::clone(&injection));
        Ok(injection)
    }

    /// Look up an existing injection.
    pub fn injection(&self, object: &Object, method_name: &str) -> Option<Rc<DoubleInjection>> {
        self.injections
            .get(&object.id())
            .and_then(|methods| methods.get(method_name))
            .cloned()
    }

    /// Number of active injections.
    pub fn len(&self) -> usize {
        self.injections.values().map(IndexMap::len).sum()
    }

    /// Check if no injections are active.
    pub fn is_empty(&self) -> bool {
        self.injections.is_empty()
    }

    /// Declare a double expected `mock_times` times with the given
    /// arguments (none, until `with` is called).
    pub fn mock(&mut self, object: &Object, method_name: &str) -> DoubleResult<DoubleDefinition> {
        let times = TimesCalled::Exactly(self.config.mock_times);
        self.definition(object, method_name, ArgumentExpectation::no_arguments(), times)
    }

    /// Declare a double accepting any arguments any number of times.
    pub fn stub(&mut self, object: &Object, method_name: &str) -> DoubleResult<DoubleDefinition> {
        self.definition(
            object,
            method_name,
            ArgumentExpectation::any_arguments(),
            TimesCalled::Any,
        )
    }

    /// Declare a double that must never be called.
    pub fn dont_allow(
        &mut self,
        object: &Object,
        method_name: &str,
    ) -> DoubleResult<DoubleDefinition> {
        self.definition(
            object,
            method_name,
            ArgumentExpectation::any_arguments(),
            TimesCalled::Exactly(0),
        )
    }

    fn definition(
        &mut self,
        object: &Object,
        method_name: &str,
        arguments: ArgumentExpectation,
        times: TimesCalled,
    ) -> DoubleResult<DoubleDefinition> {
        let injection = self.double_injection(object, method_name)?;
        Ok(DoubleDefinition::new(
            injection,
            arguments,
            times,
            self.ordered_doubles.clone(),
        ))
    }

    /// Verify every injection, in declaration order.
    pub fn verify_doubles(&self) -> DoubleResult<()> {
        for methods in self.injections.values() {
            for injection in methods.values() {
                injection.verify()?;
            }
        }
        Ok(())
    }

    /// Verify one injection.
    pub fn verify_double(&self, object: &Object, method_name: &str) -> DoubleResult<()> {
        self.injection(object, method_name)
            .ok_or_else(|| not_registered(object, method_name))?
            .verify()
    }

    /// Reset every injection and forget ordered doubles.
    pub fn reset(&mut self) -> DoubleResult<()> {
        self.ordered_doubles.clear();
        let injections = std::mem::take(&mut self.injections);
        let mut first_error = None;
        for injection in injections.into_values().flat_map(IndexMap::into_values) {
            if let Err(err) = injection.reset() {
                first_error.get_or_insert(err);
            }
        }
        debug!("reset space");
        first_error.map_or(Ok(()), Err)
    }

    /// Reset one injection, dropping the object's entry once it has none.
    pub fn reset_double(&mut self, object: &Object, method_name: &str) -> DoubleResult<()> {
        let methods = self
            .injections
            .get_mut(&object.id())
            .ok_or_else(|| not_registered(object, method_name))?;
        let injection = methods
            .shift_remove(method_name)
            .ok_or_else(|| not_registered(object, method_name))?;
        if methods.is_empty() {
            self.injections.shift_remove(&object.id());
        }
        injection.reset()
    }

    /// Verify (when configured), then reset. The space is reset even when
    /// verification fails; the verification error is returned.
    pub fn teardown(&mut self) -> DoubleResult<()> {
        let verified = if self.config.verify_on_teardown {
            self.verify_doubles()
        } else {
            Ok(())
        };
        let reset = self.reset();
        verified.and(reset)
    }
}

impl Default for Space {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Space {
    fn drop(&mut self) {
        if !self.config.reset_on_drop || self.injections.is_empty() {
            return;
        }
        warn!(injections = self.len(), "space dropped without teardown, restoring objects");
        if let Err(err) = self.reset() {
            warn!(%err, "failed to restore objects");
        }
    }
}

fn not_registered(object: &Object, method_name: &str) -> DoubleError {
    DoubleError::BindingState(format!(
        "no double injection for {} on {}",
        method_name, object
    ))
}
