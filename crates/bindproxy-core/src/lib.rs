//! Bindproxy Core - Capability Composition
//!
//! This crate assembles a single object implementing the union of one or more
//! capability interfaces, where each operation is supplied either by an
//! explicit handler or by an existing delegate object.
//!
//! # Architecture
//!
//! - `signature` - Operation identity: name plus ordered parameter types
//! - `capability` - Capability descriptors and deduplicated capability sets
//! - `builder` - Binding state, single-signature binders, bulk delegation
//! - `composite` - The built, immutable dispatch object
//! - `macros` - `capability!` trait generator
//!
//! # Example
//!
//! ```ignore
//! capability! {
//!     pub trait Source {
//!         fn original(&self) -> String;
//!         fn this(&self) -> Composite;
//!     }
//! }
//!
//! let mut builder = BindingBuilder::for_capability::<dyn Source>();
//! builder.bind("this", params![])?.to(|this, _| Ok(Value::new(this.clone())))?;
//! builder.bind_all::<dyn Source>(delegate);
//! let composite = builder.build()?;
//! assert!(composite.this()?.ptr_eq(&composite));
//! ```
//!
//! # Design Principles
//!
//! - Every required signature has exactly one handler before `build` succeeds
//! - First registration wins when delegates overlap
//! - Handlers receive the composite itself, never the builder
//! - Handler failures reach the caller unchanged

#![forbid(unsafe_code)]

#[macro_use]
mod macros;

/// Operation identity
pub mod signature;

/// Capability descriptors and sets
pub mod capability;

/// Type-erased call values
pub mod value;

/// Binding state and binders
pub mod builder;

/// Built dispatch objects
pub mod composite;

/// Error types
pub mod error;

pub use builder::{Binder, BindingBuilder};
pub use capability::{Capability, CapabilitySet, Forwarder, Operation};
pub use composite::{Composite, CompositeId, Handler};
pub use error::{BindError, BindResult, BuildError, InvocationError, Outcome};
pub use signature::{ParamType, Signature};
pub use value::{Arguments, Value};
