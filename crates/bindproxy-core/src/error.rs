//! Error types for binding, building, and invoking composites

use thiserror::Error;

use crate::signature::{render_list, Signature};

/// Error raised while binding a single signature
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    /// The signature is not part of the capability set
    #[error("Method {signature} is not declared by any required capability")]
    Unknown { signature: Signature },

    /// The signature already has a handler
    #[error("Method {signature} is already bound")]
    AlreadyBound { signature: Signature },
}

impl BindError {
    /// The signature the error refers to
    pub fn signature(&self) -> &Signature {
        match self {
            Self::Unknown { signature } | Self::AlreadyBound { signature } => signature,
        }
    }
}

/// Error raised by [`BindingBuilder::build`](crate::BindingBuilder::build)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// Some required signatures were never bound
    #[error("Missing implementations for: {}", render_list(.missing))]
    IncompleteBindings { missing: Vec<Signature> },
}

impl BuildError {
    /// Every signature left without a handler
    pub fn missing(&self) -> &[Signature] {
        match self {
            Self::IncompleteBindings { missing } => missing,
        }
    }
}

/// Error surfaced by an invocation on a [`Composite`](crate::Composite)
#[derive(Debug, Error)]
pub enum InvocationError {
    /// No handler is bound for the signature
    #[error("No handler bound for {signature}")]
    Unbound { signature: Signature },

    /// The number of arguments does not match the operation's arity
    #[error("Expected {expected} arguments, got {actual}")]
    ArgumentCount { expected: usize, actual: usize },

    /// An argument had the wrong concrete type
    #[error("Argument {index} is not a {expected}")]
    ArgumentType { index: usize, expected: &'static str },

    /// The handler returned a value of the wrong concrete type
    #[error("{signature} returned a value that is not a {expected}")]
    ReturnType {
        signature: Signature,
        expected: &'static str,
    },

    /// Failure raised by a handler or delegate
    #[error(transparent)]
    Handler(Box<dyn std::error::Error + Send + Sync>),
}

impl InvocationError {
    /// Wrap a failure raised inside a handler or delegate
    pub fn handler(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Handler(source.into())
    }

    /// Borrow the handler failure, if this is one
    pub fn as_handler(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::Handler(source) => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Result of a single-signature bind
pub type BindResult<T> = std::result::Result<T, BindError>;

/// Result of an invocation or a handler
pub type Outcome<T> = std::result::Result<T, InvocationError>;
