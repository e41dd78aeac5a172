//! Decoy Space
//!
//! Session-scoped registry for decoy test doubles, plus the declaration
//! helpers used to register doubles on it.
//!
//! ```
//! use decoy::{args, Class, Object, Value};
//! use decoy_space::Space;
//!
//! let class = Class::new("Widget");
//! let subject = Object::new(&class);
//!
//! let mut space = Space::new();
//! space.mock(&subject, "foobar").unwrap().with([1, 2]).returns(Value::sym("baz"));
//! assert_eq!(subject.send("foobar", args![1, 2]), Ok(Value::sym("baz")));
//! space.teardown().unwrap();
//! ```

pub mod config;
pub mod definition;
pub mod space;

pub use config::{ConfigError, ConfigResult, SpaceConfig};
pub use definition::DoubleDefinition;
pub use space::Space;
