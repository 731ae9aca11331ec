//! Composite objects
//!
//! A [`Composite`] is the frozen result of
//! [`BindingBuilder::build`](crate::BindingBuilder::build): an immutable
//! dispatch table from [`Signature`] to handler. Invoking an operation looks
//! up its handler and calls it with the composite itself plus the call
//! arguments, returning whatever the handler produces.
//!
//! Composites are cheap to clone; clones share the same table and compare
//! identical under [`Composite::ptr_eq`].

use indexmap::IndexMap;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::capability::Capability;
use crate::error::{InvocationError, Outcome};
use crate::signature::Signature;
use crate::value::{Arguments, Value};

/// Function bound to one signature.
///
/// Receives the composite it belongs to and the call arguments.
pub type Handler = Arc<dyn Fn(&Composite, Arguments) -> Outcome<Value> + Send + Sync>;

pub(crate) fn into_handler<F>(handler: F) -> Handler
where
    F: Fn(&Composite, Arguments) -> Outcome<Value> + Send + Sync + 'static,
{
    Arc::new(handler)
}

/// Unique identifier of a built composite, for logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompositeId(Uuid);

impl CompositeId {
    /// Fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Underlying UUID
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for CompositeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CompositeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "composite-{}", self.0)
    }
}

struct DispatchTable {
    id: CompositeId,
    capabilities: Vec<&'static str>,
    handlers: IndexMap<Signature, Handler>,
}

/// Immutable, fully-bound object dispatching invocations to handlers
#[derive(Clone)]
pub struct Composite {
    table: Arc<DispatchTable>,
}

impl Composite {
    pub(crate) fn new(
        capabilities: Vec<&'static str>,
        handlers: IndexMap<Signature, Handler>,
    ) -> Self {
        Self {
            table: Arc::new(DispatchTable {
                id: CompositeId::new(),
                capabilities,
                handlers,
            }),
        }
    }

    /// Invoke the operation identified by `signature`.
    ///
    /// Errors raised by the handler are returned unchanged.
    pub fn invoke(&self, signature: &Signature, args: Arguments) -> Outcome<Value> {
        let handler = self
            .table
            .handlers
            .get(signature)
            .ok_or_else(|| InvocationError::Unbound {
                signature: signature.clone(),
            })?;
        tracing::trace!(composite = %self.table.id, %signature, "dispatching");
        (**handler)(self, args)
    }

    /// Invoke and downcast the result to `R`
    pub fn call<R: Any>(&self, signature: &Signature, args: Arguments) -> Outcome<R> {
        self.invoke(signature, args)?
            .downcast::<R>()
            .map_err(|_| InvocationError::ReturnType {
                signature: signature.clone(),
                expected: std::any::type_name::<R>(),
            })
    }

    /// Identifier assigned at build time
    pub fn id(&self) -> CompositeId {
        self.table.id
    }

    /// Whether both handles refer to the same composite
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.table, &other.table)
    }

    /// Whether a handler is bound for `signature`
    pub fn supports(&self, signature: &Signature) -> bool {
        self.table.handlers.contains_key(signature)
    }

    /// Whether every operation of `C` has a handler
    pub fn implements<C: Capability + ?Sized>(&self) -> bool {
        C::signatures().iter().all(|s| self.supports(s))
    }

    /// Bound signatures, in binding order
    pub fn signatures(&self) -> impl Iterator<Item = &Signature> {
        self.table.handlers.keys()
    }

    /// Names of the capabilities the composite was built for
    pub fn capabilities(&self) -> &[&'static str] {
        &self.table.capabilities
    }

    /// Number of bound signatures
    pub fn len(&self) -> usize {
        self.table.handlers.len()
    }

    /// Whether the composite has no operations
    pub fn is_empty(&self) -> bool {
        self.table.handlers.is_empty()
    }
}

impl PartialEq for Composite {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Composite {}

impl fmt::Debug for Composite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composite")
            .field("id", &self.table.id)
            .field("capabilities", &self.table.capabilities)
            .field("operations", &self.table.handlers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::ParamType;
    use assert_matches::assert_matches;

    fn double() -> Signature {
        Signature::new("double", vec![ParamType::of::<i64>()])
    }

    fn composite() -> Composite {
        let mut handlers: IndexMap<Signature, Handler> = IndexMap::new();
        handlers.insert(
            double(),
            into_handler(|_, mut args| Ok(Value::new(args.take::<i64>()? * 2))),
        );
        handlers.insert(
            Signature::new("me", vec![]),
            into_handler(|this, _| Ok(Value::new(this.clone()))),
        );
        Composite::new(vec!["Test"], handlers)
    }

    #[test]
    fn test_dispatch_to_bound_handler() {
        let composite = composite();
        let out: i64 = composite
            .call(&double(), Arguments::new(vec![Value::new(21_i64)]))
            .unwrap();
        assert_eq!(out, 42);
        assert_eq!(composite.len(), 2);
        assert!(composite.supports(&double()));
    }

    #[test]
    fn test_handler_receives_self() {
        let composite = composite();
        let me: Composite = composite
            .call(&Signature::new("me", vec![]), Arguments::empty())
            .unwrap();
        assert!(me.ptr_eq(&composite));
        assert_eq!(me.id(), composite.id());
    }

    #[test]
    fn test_unbound_and_mistyped_calls() {
        let composite = composite();
        assert_matches!(
            composite.invoke(&Signature::new("missing", vec![]), Arguments::empty()),
            Err(InvocationError::Unbound { .. })
        );
        assert_matches!(
            composite.call::<String>(&double(), Arguments::new(vec![Value::new(1_i64)])),
            Err(InvocationError::ReturnType { .. })
        );
        assert_matches!(
            composite.invoke(&double(), Arguments::new(vec![Value::new(1_u8)])),
            Err(InvocationError::ArgumentType { index: 0, .. })
        );
    }

    #[test]
    fn test_distinct_builds_are_distinct_objects() {
        let a = composite();
        let b = composite();
        assert_ne!(a, b);
        assert_ne!(a.id(), b.id());
        assert_eq!(a, a.clone());
    }
}
