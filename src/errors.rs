#![allow(missing_docs)]

use std::error::Error as StdError;

use thiserror::Error;

use crate::decl::OperationKind;

/// Boxed error coming out of a [`Runtime`](crate::runtime::Runtime).
pub type RuntimeError = Box<dyn StdError + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Class not found: {class}")]
    ClassNotFound {
        class: &'static str,
        #[source]
        source: RuntimeError,
    },
    #[error("Method not found: {class}.{name} {sig}")]
    MethodNotFound {
        class: &'static str,
        name: &'static str,
        sig: &'static str,
        #[source]
        source: RuntimeError,
    },
    #[error("Field not found: {class}.{name} {sig}")]
    FieldNotFound {
        class: &'static str,
        name: &'static str,
        sig: &'static str,
        #[source]
        source: RuntimeError,
    },
    #[error("Could not keep a reference to class {class}")]
    RetainClass {
        class: &'static str,
        #[source]
        source: RuntimeError,
    },
    #[error("Invalid signature for {class}.{op}: {reason}")]
    InvalidSignature {
        class: &'static str,
        op: &'static str,
        reason: String,
    },
    #[error("Invalid constructor return type (must be void) for {class}.{op}: {sig}")]
    InvalidConstructor {
        class: &'static str,
        op: &'static str,
        sig: &'static str,
    },
    #[error("Operation {op} declared more than once for {class}")]
    DuplicateOperation {
        class: &'static str,
        op: &'static str,
    },
    #[error("A different declaration is already registered for {class}")]
    ConflictingDeclaration { class: &'static str },
    #[error("No declaration registered for {0}")]
    UndeclaredClass(String),
    #[error("Unknown operation {op} on {class}")]
    UnknownOperation { class: &'static str, op: String },
    #[error("Operation {class}.{op} is a {actual}, not a {expected}")]
    WrongOperationKind {
        class: &'static str,
        op: &'static str,
        expected: OperationKind,
        actual: OperationKind,
    },
    #[error("Null instance passed to {class}.{op}")]
    NullInstance {
        class: &'static str,
        op: &'static str,
    },
    #[error("Object is not an instance of {class}")]
    WrongClass { class: &'static str },
    #[error("Invalid number of arguments for {class}.{op}: expected {expected}, got {actual}")]
    ArgumentCount {
        class: &'static str,
        op: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("Argument {index} of {class}.{op} is not a valid {expected}")]
    ArgumentType {
        class: &'static str,
        op: &'static str,
        index: usize,
        expected: String,
    },
    #[error("{0}")]
    Runtime(#[source] RuntimeError),
}

impl Error {
    /// Wraps an error raised by the runtime while invoking an operation.
    pub fn runtime<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Error::Runtime(Box::new(err))
    }

    /// The runtime error underneath this error, if it has one and it is an `E`.
    ///
    /// Resolution errors keep the runtime's error as their source, so this
    /// works for `ClassNotFound`, `MethodNotFound`, `FieldNotFound` and
    /// `RetainClass` as well as for `Runtime`.
    pub fn runtime_error<E: StdError + 'static>(&self) -> Option<&E> {
        match self {
            Error::Runtime(source)
            | Error::ClassNotFound { source, .. }
            | Error::MethodNotFound { source, .. }
            | Error::FieldNotFound { source, .. }
            | Error::RetainClass { source, .. } => source.downcast_ref::<E>(),
            _ => None,
        }
    }

    /// True for errors raised while building a binding.
    ///
    /// These mean the declared API surface is unavailable (or declared
    /// wrongly) and retrying will not help.
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            Error::ClassNotFound { .. }
                | Error::MethodNotFound { .. }
                | Error::FieldNotFound { .. }
                | Error::RetainClass { .. }
                | Error::InvalidSignature { .. }
                | Error::InvalidConstructor { .. }
                | Error::DuplicateOperation { .. }
                | Error::ConflictingDeclaration { .. }
                | Error::UndeclaredClass(_)
        )
    }

    /// True for errors raised at the call boundary, before the requested
    /// call was made.
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            Error::UnknownOperation { .. }
                | Error::WrongOperationKind { .. }
                | Error::NullInstance { .. }
                | Error::WrongClass { .. }
                | Error::ArgumentCount { .. }
                | Error::ArgumentType { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
