//! Binding builder
//!
//! [`BindingBuilder`] tracks which signatures of a [`CapabilitySet`] are still
//! unassigned and which already have a handler. Every signature is in exactly
//! one of the two partitions at all times; binding only moves signatures from
//! unassigned to assigned.
//!
//! Handlers come from two sources:
//! - [`BindingBuilder::bind`] followed by [`Binder::to`] binds one signature
//!   to an explicit handler.
//! - [`BindingBuilder::bind_all`] binds every still-unassigned signature a
//!   delegate's capability declares. Overlaps are resolved by call order:
//!   whichever source claims a signature first keeps it.
//!
//! [`BindingBuilder::build`] fails unless nothing is left unassigned.

use indexmap::{IndexMap, IndexSet};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::capability::{Capability, CapabilitySet};
use crate::composite::{into_handler, Composite, Handler};
use crate::error::{BindError, BindResult, BuildError, Outcome};
use crate::signature::{ParamType, Signature};
use crate::value::{Arguments, Value};

/// Mutable construction state for a [`Composite`]
pub struct BindingBuilder {
    capabilities: Vec<&'static str>,
    unassigned: IndexSet<Signature>,
    assigned: IndexMap<Signature, Handler>,
}

impl BindingBuilder {
    /// Start with every signature of `set` unassigned
    pub fn new(set: CapabilitySet) -> Self {
        let capabilities = set.capabilities().to_vec();
        Self {
            capabilities,
            unassigned: set.into_signatures(),
            assigned: IndexMap::new(),
        }
    }

    /// Builder for a single capability
    pub fn for_capability<C: Capability + ?Sized>() -> Self {
        Self::new(CapabilitySet::of::<C>())
    }

    /// Request a binder for `name(params...)`
    pub fn bind(
        &mut self,
        name: impl Into<Cow<'static, str>>,
        params: Vec<ParamType>,
    ) -> BindResult<Binder<'_>> {
        self.bind_signature(Signature::new(name, params))
    }

    /// Request a binder for an already-built signature
    pub fn bind_signature(&mut self, signature: Signature) -> BindResult<Binder<'_>> {
        if self.unassigned.contains(&signature) {
            return Ok(Binder {
                builder: self,
                signature,
            });
        }
        if self.assigned.contains_key(&signature) {
            Err(BindError::AlreadyBound { signature })
        } else {
            Err(BindError::Unknown { signature })
        }
    }

    /// Delegate every still-unassigned operation of `C` to `delegate`.
    ///
    /// Operations of `C` that are not required, or that are already bound,
    /// are skipped.
    pub fn bind_all<C>(&mut self, delegate: Arc<C>) -> &mut Self
    where
        C: Capability + Send + Sync + ?Sized,
    {
        self.bind_all_counted(delegate);
        self
    }

    /// Same as [`bind_all`](Self::bind_all), returning how many signatures
    /// the delegate claimed
    pub fn bind_all_counted<C>(&mut self, delegate: Arc<C>) -> usize
    where
        C: Capability + Send + Sync + ?Sized,
    {
        let mut claimed = 0;
        for operation in C::operations() {
            let (signature, forward) = operation.into_parts();
            if !self.unassigned.shift_remove(&signature) {
                trace!(capability = C::name(), %signature, "skipping delegated operation");
                continue;
            }
            let target = Arc::clone(&delegate);
            let handler = into_handler(move |_, args| forward(&*target, args));
            self.assigned.insert(signature, handler);
            claimed += 1;
        }
        debug!(
            capability = C::name(),
            claimed,
            remaining = self.unassigned.len(),
            "delegated capability"
        );
        claimed
    }

    /// Freeze the bindings into a [`Composite`].
    ///
    /// Fails with every unresolved signature if any remain.
    pub fn build(self) -> Result<Composite, BuildError> {
        if !self.unassigned.is_empty() {
            let missing: Vec<Signature> = self.unassigned.into_iter().collect();
            debug!(missing = missing.len(), "composite incomplete");
            return Err(BuildError::IncompleteBindings { missing });
        }
        let composite = Composite::new(self.capabilities, self.assigned);
        debug!(
            composite = %composite.id(),
            operations = composite.len(),
            "built composite"
        );
        Ok(composite)
    }

    /// Signatures still waiting for a handler
    pub fn unassigned(&self) -> impl Iterator<Item = &Signature> {
        self.unassigned.iter()
    }

    /// Signatures that already have a handler
    pub fn assigned(&self) -> impl Iterator<Item = &Signature> {
        self.assigned.keys()
    }

    /// Whether `signature` already has a handler
    pub fn is_bound(&self, signature: &Signature) -> bool {
        self.assigned.contains_key(signature)
    }

    /// Whether [`build`](Self::build) would succeed
    pub fn is_complete(&self) -> bool {
        self.unassigned.is_empty()
    }

    /// Names of the capabilities being assembled
    pub fn capabilities(&self) -> &[&'static str] {
        &self.capabilities
    }
}

impl fmt::Debug for BindingBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingBuilder")
            .field("capabilities", &self.capabilities)
            .field("unassigned", &self.unassigned)
            .field("assigned", &self.assigned.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Handle for binding one signature, returned by [`BindingBuilder::bind`]
#[must_use = "a binder does nothing until `to` is called"]
pub struct Binder<'a> {
    builder: &'a mut BindingBuilder,
    signature: Signature,
}

impl<'a> Binder<'a> {
    /// Signature this binder commits
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Commit `handler` for the signature
    pub fn to<F>(self, handler: F) -> BindResult<&'a mut BindingBuilder>
    where
        F: Fn(&Composite, Arguments) -> Outcome<Value> + Send + Sync + 'static,
    {
        let Self { builder, signature } = self;
        if !builder.unassigned.shift_remove(&signature) {
            return Err(BindError::AlreadyBound { signature });
        }
        trace!(%signature, "bound handler");
        builder.assigned.insert(signature, into_handler(handler));
        Ok(builder)
    }

    /// Commit a handler that always returns a clone of `value`
    pub fn to_value<T>(self, value: T) -> BindResult<&'a mut BindingBuilder>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.to(move |_, _| Ok(Value::new(value.clone())))
    }
}

impl fmt::Debug for Binder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binder")
            .field("signature", &self.signature)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Operation;
    use crate::error::InvocationError;
    use assert_matches::assert_matches;
    use std::sync::atomic::{AtomicUsize, Ordering};

    trait Doubler: Send + Sync {
        fn bar(&self, value: i32) -> i32;
        fn extra(&self) -> bool;
    }

    impl Capability for dyn Doubler {
        fn name() -> &'static str {
            "Doubler"
        }

        fn operations() -> Vec<Operation<Self>> {
            vec![
                Operation::new(bar(), |target, mut args| {
                    Ok(Value::new(target.bar(args.take::<i32>()?)))
                }),
                Operation::new(Signature::new("extra", vec![]), |target, _| {
                    Ok(Value::new(target.extra()))
                }),
            ]
        }
    }

    struct Twice {
        calls: AtomicUsize,
    }

    impl Doubler for Twice {
        fn bar(&self, value: i32) -> i32 {
            self.calls.fetch_add(1, Ordering::SeqCst);
            value * 2
        }

        fn extra(&self) -> bool {
            true
        }
    }

    fn foo() -> Signature {
        Signature::new("foo", vec![])
    }

    fn bar() -> Signature {
        Signature::new("bar", vec![ParamType::of::<i32>()])
    }

    fn required() -> CapabilitySet {
        CapabilitySet::new()
            .with_signature(foo())
            .with_signature(bar())
    }

    fn assert_partition(builder: &BindingBuilder) {
        let unassigned: Vec<_> = builder.unassigned().cloned().collect();
        let assigned: Vec<_> = builder.assigned().cloned().collect();
        assert!(unassigned.iter().all(|s| !assigned.contains(s)));
        assert_eq!(unassigned.len() + assigned.len(), required().len());
    }

    #[test]
    fn test_bind_and_delegate_then_build() {
        let mut builder = BindingBuilder::new(required());
        builder
            .bind("foo", vec![])
            .unwrap()
            .to(|_, _| Ok(Value::new("X")))
            .unwrap();
        assert_partition(&builder);
        builder.bind_all::<dyn Doubler>(Arc::new(Twice {
            calls: AtomicUsize::new(0),
        }));
        assert_partition(&builder);
        assert!(builder.is_complete());

        let composite = builder.build().unwrap();
        assert_eq!(
            composite.call::<&'static str>(&foo(), Arguments::empty()).unwrap(),
            "X"
        );
        assert_eq!(
            composite
                .call::<i32>(&bar(), Arguments::new(vec![Value::new(5_i32)]))
                .unwrap(),
            10
        );
        assert!(!composite.supports(&Signature::new("extra", vec![])));
    }

    #[test]
    fn test_build_names_the_missing_signature() {
        let mut builder = BindingBuilder::new(required());
        builder.bind("foo", vec![]).unwrap().to_value(1_u8).unwrap();

        let err = builder.build().unwrap_err();
        assert_eq!(err.missing(), &[bar()]);
        assert_eq!(err.to_string(), "Missing implementations for: bar(i32)");
    }

    #[test]
    fn test_rebinding_fails_and_keeps_first_handler() {
        let mut builder = BindingBuilder::new(required());
        builder.bind("foo", vec![]).unwrap().to_value("first").unwrap();

        assert_matches!(
            builder.bind("foo", vec![]),
            Err(BindError::AlreadyBound { .. })
        );
        builder.bind_all_counted::<dyn Doubler>(Arc::new(Twice {
            calls: AtomicUsize::new(0),
        }));

        let composite = builder.build().unwrap();
        assert_eq!(
            composite.call::<&'static str>(&foo(), Arguments::empty()).unwrap(),
            "first"
        );
    }

    #[test]
    fn test_unknown_signature_is_distinct_from_already_bound() {
        let mut builder = BindingBuilder::new(required());
        let err = builder
            .bind("bar", vec![ParamType::of::<i64>()])
            .unwrap_err();
        assert_matches!(err, BindError::Unknown { .. });
        assert_eq!(err.signature().to_string(), "bar(i64)");
        assert_partition(&builder);
    }

    #[test]
    fn test_overlapping_delegates_first_wins() {
        let first = Arc::new(Twice {
            calls: AtomicUsize::new(0),
        });
        let second = Arc::new(Twice {
            calls: AtomicUsize::new(0),
        });

        let mut builder = BindingBuilder::new(required());
        assert_eq!(builder.bind_all_counted::<dyn Doubler>(first.clone()), 1);
        assert_eq!(builder.bind_all_counted::<dyn Doubler>(second.clone()), 0);
        builder.bind("foo", vec![]).unwrap().to_value(()).unwrap();

        let composite = builder.build().unwrap();
        composite
            .call::<i32>(&bar(), Arguments::new(vec![Value::new(3_i32)]))
            .unwrap();
        assert_eq!(first.calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_delegate_errors_surface_as_argument_errors() {
        let mut builder = BindingBuilder::new(required());
        builder.bind_all::<dyn Doubler>(Arc::new(Twice {
            calls: AtomicUsize::new(0),
        }));
        builder.bind("foo", vec![]).unwrap().to_value(()).unwrap();
        let composite = builder.build().unwrap();

        assert_matches!(
            composite.invoke(&bar(), Arguments::empty()),
            Err(InvocationError::ArgumentCount { expected: 1, actual: 0 })
        );
    }
}
