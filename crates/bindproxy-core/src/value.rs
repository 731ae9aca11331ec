//! Type-erased call values
//!
//! Handlers see their arguments and produce their results as [`Value`]s so a
//! single dispatch table can hold operations of any signature.

use std::any::{Any, TypeId};
use std::collections::VecDeque;
use std::fmt;

use crate::error::{InvocationError, Outcome};

/// A type-erased argument or return value.
pub struct Value(Box<dyn Any + Send>);

impl Value {
    /// Wrap a concrete value
    pub fn new<T: Any + Send>(value: T) -> Self {
        Self(Box::new(value))
    }

    /// The unit value, returned by operations without a result
    pub fn unit() -> Self {
        Self::new(())
    }

    /// Check the concrete type
    pub fn is<T: Any>(&self) -> bool {
        self.0.is::<T>()
    }

    /// Borrow the concrete value
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Take the concrete value, handing `self` back on a type mismatch
    pub fn downcast<T: Any>(self) -> Result<T, Self> {
        match self.0.downcast::<T>() {
            Ok(boxed) => Ok(*boxed),
            Err(inner) => Err(Self(inner)),
        }
    }

    /// Type identity of the wrapped value
    pub fn value_type_id(&self) -> TypeId {
        (*self.0).type_id()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value").finish_non_exhaustive()
    }
}

/// Ordered argument list for one invocation.
///
/// Arguments are consumed front to back with [`Arguments::take`], which is
/// how generated forwarders unpack them.
#[derive(Debug, Default)]
pub struct Arguments {
    values: VecDeque<Value>,
    taken: usize,
}

impl Arguments {
    /// Build from values in parameter order
    pub fn new(values: Vec<Value>) -> Self {
        Self {
            values: values.into(),
            taken: 0,
        }
    }

    /// No arguments
    pub fn empty() -> Self {
        Self::default()
    }

    /// Remaining argument count
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether all arguments have been consumed
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Borrow the argument at `index` among the remaining ones
    pub fn get<T: Any>(&self, index: usize) -> Option<&T> {
        self.values.get(index).and_then(Value::downcast_ref)
    }

    /// Take the next argument as a `T`
    pub fn take<T: Any>(&mut self) -> Outcome<T> {
        let index = self.taken;
        let value = self
            .values
            .pop_front()
            .ok_or(InvocationError::ArgumentCount {
                expected: index + 1,
                actual: index,
            })?;
        self.taken += 1;
        value
            .downcast::<T>()
            .map_err(|_| InvocationError::ArgumentType {
                index,
                expected: std::any::type_name::<T>(),
            })
    }

    /// Check that every argument was consumed.
    ///
    /// Fails with [`InvocationError::ArgumentCount`] when the caller passed
    /// more arguments than the operation takes.
    pub fn finish(self) -> Outcome<()> {
        if self.values.is_empty() {
            return Ok(());
        }
        Err(InvocationError::ArgumentCount {
            expected: self.taken,
            actual: self.taken + self.values.len(),
        })
    }

    /// Take the next argument as a raw [`Value`]
    pub fn take_value(&mut self) -> Option<Value> {
        let value = self.values.pop_front()?;
        self.taken += 1;
        Some(value)
    }
}

impl FromIterator<Value> for Arguments {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_value_downcast() {
        let value = Value::new(5_i32);
        assert!(value.is::<i32>());
        assert_eq!(value.downcast_ref::<i32>(), Some(&5));

        let value = value.downcast::<String>().unwrap_err();
        assert_eq!(value.downcast::<i32>().ok(), Some(5));
    }

    #[test]
    fn test_arguments_take_in_order() {
        let mut args = Arguments::new(vec![Value::new(1_u8), Value::new(String::from("two"))]);
        assert_eq!(args.len(), 2);
        assert_eq!(args.get::<String>(1).map(String::as_str), Some("two"));

        assert_eq!(args.take::<u8>().unwrap(), 1);
        assert_eq!(args.take::<String>().unwrap(), "two");
        assert!(args.is_empty());
    }

    #[test]
    fn test_arguments_report_mismatches() {
        let mut args = Arguments::new(vec![Value::new(1_u8)]);
        assert_matches!(
            args.take::<i64>(),
            Err(InvocationError::ArgumentType { index: 0, .. })
        );
        assert_matches!(
            args.take::<i64>(),
            Err(InvocationError::ArgumentCount {
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_finish_rejects_leftovers() {
        let mut args = Arguments::new(vec![Value::new(1_u8), Value::new("junk")]);
        assert_eq!(args.take::<u8>().unwrap(), 1);
        assert_matches!(
            args.finish(),
            Err(InvocationError::ArgumentCount {
                expected: 1,
                actual: 2
            })
        );

        let mut args = Arguments::new(vec![Value::new(1_u8)]);
        args.take::<u8>().unwrap();
        assert!(args.finish().is_ok());
        assert!(Arguments::empty().finish().is_ok());
    }
}
