//! Declarative generators for capability traits

/// Build a parameter list: `params![i32, String]`.
#[macro_export]
macro_rules! params {
    ($($ty:ty),* $(,)?) => {
        ::std::vec![$($crate::ParamType::of::<$ty>()),*]
    };
}

/// Build a signature: `signature!(bar(i32))`.
#[macro_export]
macro_rules! signature {
    ($name:ident($($ty:ty),* $(,)?)) => {
        $crate::Signature::new(::core::stringify!($name), $crate::params![$($ty),*])
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __capability_return {
    () => { () };
    ($ret:ty) => { $ret };
}

/// Declare a capability trait.
///
/// ```ignore
/// capability! {
///     pub trait Console {
///         fn print(&self, line: String);
///         fn width(&self) -> u16;
///     }
/// }
/// ```
///
/// expands to:
/// - the trait itself, with `Send + Sync` supertraits and every method
///   returning [`Outcome`](crate::Outcome) of its declared return type,
/// - `impl Capability for dyn Console`, describing each method as an
///   [`Operation`](crate::Operation) that forwards to an implementer,
/// - `impl Console for Composite`, dispatching each method through the
///   composite's table.
///
/// Methods take `&self` and owned, `'static + Send` arguments. Generic
/// methods and default bodies are not supported. Forwarders reject calls
/// carrying more or fewer arguments than the method declares.
#[macro_export]
macro_rules! capability {
    (
        $(#[$meta:meta])*
        $vis:vis trait $name:ident {
            $(
                $(#[$method_meta:meta])*
                fn $method:ident(&self $(, $arg:ident : $ty:ty)* $(,)?) $(-> $ret:ty)?;
            )*
        }
    ) => {
        $(#[$meta])*
        $vis trait $name: ::core::marker::Send + ::core::marker::Sync {
            $(
                $(#[$method_meta])*
                fn $method(&self $(, $arg: $ty)*)
                    -> $crate::Outcome<$crate::__capability_return!($($ret)?)>;
            )*
        }

        impl $crate::Capability for dyn $name {
            fn name() -> &'static str {
                ::core::stringify!($name)
            }

            fn operations() -> ::std::vec::Vec<$crate::Operation<Self>> {
                ::std::vec![$(
                    $crate::Operation::new(
                        $crate::signature!($method($($ty),*)),
                        |target: &Self, args: $crate::Arguments| -> $crate::Outcome<$crate::Value> {
                            #[allow(unused_mut)]
                            let mut args = args;
                            $( let $arg = args.take::<$ty>()?; )*
                            args.finish()?;
                            target.$method($($arg),*).map($crate::Value::new)
                        },
                    ),
                )*]
            }
        }

        impl $name for $crate::Composite {
            $(
                fn $method(&self $(, $arg: $ty)*)
                    -> $crate::Outcome<$crate::__capability_return!($($ret)?)>
                {
                    $crate::Composite::call(
                        self,
                        &$crate::signature!($method($($ty),*)),
                        $crate::Arguments::new(::std::vec![$($crate::Value::new($arg)),*]),
                    )
                }
            )*
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::{BindingBuilder, Capability, CapabilitySet, InvocationError, Outcome};
    use std::sync::Arc;

    capability! {
        /// Counter used by the macro tests
        trait Counter {
            /// Add and return the new total
            fn add(&self, amount: u32, label: String) -> u32;
            fn reset(&self);
        }
    }

    struct Fixed;

    impl Counter for Fixed {
        fn add(&self, amount: u32, label: String) -> Outcome<u32> {
            Ok(amount + label.len() as u32)
        }

        fn reset(&self) -> Outcome<()> {
            Err(InvocationError::handler("reset refused"))
        }
    }

    #[test]
    fn test_descriptor_lists_declared_signatures() {
        let signatures = <dyn Counter as Capability>::signatures();
        assert_eq!(
            signatures,
            vec![signature!(add(u32, String)), signature!(reset())]
        );
        assert_eq!(<dyn Counter as Capability>::name(), "Counter");
        assert_eq!(params![u32, String].len(), 2);
    }

    #[test]
    fn test_composite_is_a_drop_in_implementer() {
        let mut builder = BindingBuilder::new(CapabilitySet::of::<dyn Counter>());
        builder.bind_all::<dyn Counter>(Arc::new(Fixed));
        let composite = builder.build().unwrap();

        let counter: &dyn Counter = &composite;
        assert_eq!(counter.add(1, "abc".into()).unwrap(), 4);
        assert_eq!(
            counter.reset().unwrap_err().to_string(),
            "reset refused"
        );
        assert!(composite.implements::<dyn Counter>());
    }
}
