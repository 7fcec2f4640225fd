//! # Cached JNI class bindings
//!
//! Calling into Java from native code means looking up a class, then a
//! method or field ID, before every call. Those lookups are slow compared to
//! the call itself, and the IDs they return stay valid for as long as the
//! class is loaded. This crate resolves them once per class and keeps only
//! what is needed to call through them afterwards.
//!
//! A class is described by a [`ClassDecl`](decl::ClassDecl): its internal
//! name plus the constructors, methods and fields to bind, each under a
//! logical operation name. The first time a binding is requested it is
//! resolved into a [`ClassBinding`](binding::ClassBinding):
//!
//! 1. the class is looked up by name,
//! 2. every operation's ID is looked up against it,
//! 3. the class reference is released (or kept as a weak or global
//!    reference, depending on the declaration's
//!    [`Retention`](decl::Retention)).
//!
//! Resolution happens exactly once, even when many threads ask for the same
//! binding at the same time. If anything is missing the whole binding fails
//! with an error naming the member, and nothing is cached.
//!
//! ## Example
//!
//! ```rust,no_run
//! use jni::{objects::JValue, JNIEnv};
//! use jni_binding_cache::{bind_class, JavaClass};
//!
//! bind_class! {
//!     struct AtomicInteger("java/util/concurrent/atomic/AtomicInteger") {
//!         init: constructor "(I)V",
//!         addAndGet: method "addAndGet" "(I)I",
//!     }
//! }
//!
//! fn bump(env: &mut JNIEnv) -> jni_binding_cache::errors::Result<i32> {
//!     let binding = AtomicInteger::binding(env)?;
//!     let counter = binding.construct(env, AtomicInteger::init, &[JValue::Int(41)])?;
//!     let value = binding.invoke(env, AtomicInteger::addAndGet, &counter, &[JValue::Int(1)])?;
//!     value.i().map_err(jni_binding_cache::errors::Error::runtime)
//! }
//! ```
//!
//! ## Errors
//!
//! Errors fall in three groups, see [`errors::Error`]:
//!
//! - resolution errors (`ClassNotFound`, `MethodNotFound`, ...) mean the
//!   declared API isn't there and are not worth retrying,
//! - misuse errors (`NullInstance`, `WrongClass`, ...) are raised before
//!   the requested call is made,
//! - [`Error::Runtime`](errors::Error::Runtime) carries whatever the runtime
//!   reported for the call itself, such as a thrown Java exception, which
//!   is left pending for the caller to handle.
//!
//! ## Logging
//!
//! Resolution is logged through the [`log`] crate at `debug` level; repeat
//! class lookups on the static call paths are logged at `trace` level.

// errors. do you really need an explanation?
pub mod errors;

// parser for method and field descriptors
pub mod signature;

// what to resolve
pub mod decl;

// the primitives a binding needs from the VM
pub mod runtime;

// resolved handles for one class
pub mod binding;

// resolve-once ownership
pub mod registry;

// the JNI implementation of `Runtime`
pub mod jni_runtime;

// instance wrapper holding a global reference
pub mod instance;

mod macros;

#[cfg(test)]
mod test_runtime;

pub use binding::ClassBinding;
pub use decl::{ClassDecl, OperationDecl, OperationKind, Retention};
pub use errors::{Error, Result};
pub use instance::BoundObject;
pub use jni_runtime::{Jni, JniBinding, JniRegistry, LazyJniBinding};
pub use registry::{JavaClass, LazyBinding, Registry, RegistryBuilder};
pub use runtime::{HandleKind, Runtime, ScopedClass};

// Re-export the jni version the runtime implementation is written against.
pub use jni;
