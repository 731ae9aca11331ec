//! Capability descriptors and capability sets
//!
//! A capability is an abstract interface: a named list of operations. In Rust
//! it is a trait object type (`dyn Trait`) implementing [`Capability`], which
//! describes each declared operation as an [`Operation`] carrying its
//! [`Signature`] and a forwarder that invokes it on a concrete implementer.
//! The [`capability!`](crate::capability) macro generates these descriptors.
//!
//! A [`CapabilitySet`] is the deduplicated union of the signatures of one or
//! more capabilities. It is what a [`BindingBuilder`](crate::BindingBuilder)
//! must satisfy.

use indexmap::IndexSet;
use std::fmt;

use crate::error::Outcome;
use crate::signature::Signature;
use crate::value::{Arguments, Value};

/// Forwards an invocation to an implementer of a capability
pub type Forwarder<C> = fn(&C, Arguments) -> Outcome<Value>;

/// An abstract capability interface.
///
/// Implemented for trait object types, e.g. `impl Capability for dyn Console`.
pub trait Capability: 'static {
    /// Capability name, used in logs and introspection
    fn name() -> &'static str;

    /// Every operation the capability declares
    fn operations() -> Vec<Operation<Self>>;

    /// Signatures of every declared operation
    fn signatures() -> Vec<Signature> {
        Self::operations()
            .into_iter()
            .map(|operation| operation.signature)
            .collect()
    }
}

/// One declared operation of a capability
pub struct Operation<C: ?Sized> {
    signature: Signature,
    forward: Forwarder<C>,
}

impl<C: ?Sized> Operation<C> {
    /// Describe an operation and how to invoke it on an implementer
    pub fn new(signature: Signature, forward: Forwarder<C>) -> Self {
        Self { signature, forward }
    }

    /// Signature of the operation
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Invoke the operation on `target`
    pub fn forward(&self, target: &C, args: Arguments) -> Outcome<Value> {
        (self.forward)(target, args)
    }

    pub(crate) fn into_parts(self) -> (Signature, Forwarder<C>) {
        (self.signature, self.forward)
    }
}

impl<C: ?Sized> Clone for Operation<C> {
    fn clone(&self) -> Self {
        Self {
            signature: self.signature.clone(),
            forward: self.forward,
        }
    }
}

impl<C: ?Sized> fmt::Debug for Operation<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Operation").field(&self.signature).finish()
    }
}

/// Deduplicated set of signatures required by one or more capabilities
#[derive(Clone, Default)]
pub struct CapabilitySet {
    signatures: IndexSet<Signature>,
    capabilities: Vec<&'static str>,
}

impl CapabilitySet {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Set required by a single capability
    pub fn of<C: Capability + ?Sized>() -> Self {
        Self::new().with::<C>()
    }

    /// Add every signature declared by `C`
    pub fn with<C: Capability + ?Sized>(mut self) -> Self {
        self.add::<C>();
        self
    }

    /// Add every signature declared by `C` in place.
    ///
    /// Returns how many signatures were new to the set.
    pub fn add<C: Capability + ?Sized>(&mut self) -> usize {
        let before = self.signatures.len();
        self.signatures.extend(C::signatures());
        if !self.capabilities.contains(&C::name()) {
            self.capabilities.push(C::name());
        }
        self.signatures.len() - before
    }

    /// Add a single signature
    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signatures.insert(signature);
        self
    }

    /// Whether `signature` is required
    pub fn contains(&self, signature: &Signature) -> bool {
        self.signatures.contains(signature)
    }

    /// Number of distinct signatures
    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    /// Whether nothing is required
    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    /// Iterate in first-declared order
    pub fn iter(&self) -> impl Iterator<Item = &Signature> {
        self.signatures.iter()
    }

    /// Names of the capabilities that contributed to the set
    pub fn capabilities(&self) -> &[&'static str] {
        &self.capabilities
    }

    pub(crate) fn into_signatures(self) -> IndexSet<Signature> {
        self.signatures
    }
}

impl PartialEq for CapabilitySet {
    fn eq(&self, other: &Self) -> bool {
        self.signatures.len() == other.signatures.len()
            && self.signatures.iter().all(|s| other.signatures.contains(s))
    }
}

impl Eq for CapabilitySet {}

impl fmt::Debug for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilitySet")
            .field("capabilities", &self.capabilities)
            .field("signatures", &self.signatures)
            .finish()
    }
}

impl<'a> IntoIterator for &'a CapabilitySet {
    type Item = &'a Signature;
    type IntoIter = indexmap::set::Iter<'a, Signature>;

    fn into_iter(self) -> Self::IntoIter {
        self.signatures.iter()
    }
}
