//! # Decoy
//!
//! Test doubles for live objects: replace one method on one instance with
//! programmable behavior, observe how it is called, verify call counts, and
//! restore the object afterwards.
//!
//! ## Module Structure
//!
//! - [`value`] - Dynamic argument and return values
//! - [`object`] - Objects with per-instance method tables
//! - [`arguments`] - Argument expectations and wildcard matchers
//! - [`times`] - Call-count expectations
//! - [`double`] - Doubles: arguments + call count + action
//! - [`resolve`] - Selecting the double that services a call
//! - [`injection`] - Installing and removing the dispatcher
//! - [`ordered`] - Doubles that must be called in sequence
//!
//! ## Example
//!
//! ```
//! use decoy::{
//!     args, Action, ArgumentExpectation, Class, DoubleInjection, Object, TimesCalled, Value,
//! };
//!
//! let class = Class::new("Widget");
//! let obj = Object::new(&class);
//!
//! let injection = DoubleInjection::new(&obj, "foo");
//! injection.bind().unwrap();
//! injection.register_double(
//!     ArgumentExpectation::new([1, 2]),
//!     TimesCalled::Exactly(1),
//!     Action::Returns(Value::sym("baz")),
//! );
//!
//! assert_eq!(obj.send("foo", args![1, 2]), Ok(Value::sym("baz")));
//! injection.verify().unwrap();
//! injection.reset().unwrap();
//! assert!(!obj.responds_to("foo"));
//! ```

pub mod arguments;
pub mod double;
pub mod error;
pub mod injection;
pub mod object;
pub mod ordered;
pub mod resolve;
pub mod times;
pub mod value;

pub use arguments::{
    anything, boolean, is_a, numeric, satisfy, ArgumentExpectation, BlockExpectation, MatchKind,
    Matcher,
};
pub use double::{Action, Double, DoubleId};
pub use error::{DoubleError, DoubleResult};
pub use injection::{BindingState, DoubleInjection, OriginalOwner};
pub use object::{Block, Call, CallResult, Class, Method, MethodLookup, Object, ObjectId};
pub use ordered::OrderedDoubles;
pub use resolve::{resolve, Bucket, DoubleMatches, Resolution};
pub use times::{TimesCalled, TimesCalledExpectation};
pub use value::{Value, ValueKind};
