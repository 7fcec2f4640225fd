//! The bridge between the binding cache and a foreign runtime.
//!
//! [`ClassBinding`](crate::binding::ClassBinding) never talks to JNI
//! directly; everything it needs from the virtual machine goes through
//! [`Runtime`]. The crate implements it for [`jni::JNIEnv`] (see
//! [`crate::jni_runtime`]).
//!
//! Handles are split in two families:
//!
//! - [`HandleKind`] names the types that outlive any one call into the
//!   runtime: method and field IDs and global/weak references. These are
//!   what a binding stores, so they must be `Send + Sync + 'static`.
//! - [`Runtime`] itself names the session-scoped types (local class and
//!   object references, values) that only live as long as the current call
//!   frame.

use std::error::Error as StdError;

use crate::signature::{FieldDescriptor, JavaType, MethodDescriptor};

/// Types that remain valid independently of the runtime session that
/// produced them.
pub trait HandleKind: Sized + 'static {
    /// Instance method or constructor ID.
    type MethodId: Copy + Send + Sync + 'static;
    /// Static method ID.
    type StaticMethodId: Copy + Send + Sync + 'static;
    /// Instance field ID.
    type FieldId: Copy + Send + Sync + 'static;
    /// Static field ID.
    type StaticFieldId: Copy + Send + Sync + 'static;
    /// A strong reference that keeps its referent alive.
    type Global: Send + Sync + 'static;
    /// A reference that does not keep its referent alive.
    type Weak: Send + Sync + 'static;
}

/// The primitives a binding consumes from the foreign runtime.
///
/// Implementations report failures through their own error type; the
/// binding layer decides whether a failure is a resolution error or an
/// invocation error and never inspects it beyond that.
pub trait Runtime {
    /// The family of long-lived handles this runtime hands out.
    type Kind: HandleKind;
    /// A class reference scoped to the current session.
    type Class;
    /// An object reference scoped to the current session.
    type Object;
    /// One call argument, possibly borrowing a session-scoped reference.
    type Arg<'a>: Copy
    where
        Self: 'a;
    /// The result of a call or field read.
    type Value;
    /// Errors raised by the runtime.
    type Error: StdError + Send + Sync + 'static;

    /// Looks a class up by internal name.
    fn resolve_class(&mut self, name: &str) -> Result<Self::Class, Self::Error>;

    fn resolve_method(
        &mut self,
        class: &Self::Class,
        name: &str,
        sig: &str,
    ) -> Result<<Self::Kind as HandleKind>::MethodId, Self::Error>;

    fn resolve_static_method(
        &mut self,
        class: &Self::Class,
        name: &str,
        sig: &str,
    ) -> Result<<Self::Kind as HandleKind>::StaticMethodId, Self::Error>;

    fn resolve_field(
        &mut self,
        class: &Self::Class,
        name: &str,
        sig: &str,
    ) -> Result<<Self::Kind as HandleKind>::FieldId, Self::Error>;

    fn resolve_static_field(
        &mut self,
        class: &Self::Class,
        name: &str,
        sig: &str,
    ) -> Result<<Self::Kind as HandleKind>::StaticFieldId, Self::Error>;

    /// Calls an instance method.
    ///
    /// # Safety
    ///
    /// `method` must have been resolved with the signature `sig` describes,
    /// on the class of `instance` or one of its superclasses, and `args` must
    /// match `sig` (see [`Runtime::arg_matches`]).
    unsafe fn invoke(
        &mut self,
        instance: &Self::Object,
        method: <Self::Kind as HandleKind>::MethodId,
        sig: &MethodDescriptor,
        args: &[Self::Arg<'_>],
    ) -> Result<Self::Value, Self::Error>;

    /// Calls a static method.
    ///
    /// # Safety
    ///
    /// `method` must have been resolved on `class` with the signature `sig`
    /// describes, and `args` must match `sig`.
    unsafe fn invoke_static(
        &mut self,
        class: &Self::Class,
        method: <Self::Kind as HandleKind>::StaticMethodId,
        sig: &MethodDescriptor,
        args: &[Self::Arg<'_>],
    ) -> Result<Self::Value, Self::Error>;

    /// Allocates a new instance through a constructor.
    ///
    /// # Safety
    ///
    /// `ctor` must be a constructor of `class` resolved with the signature
    /// `sig` describes, and `args` must match `sig`.
    unsafe fn new_instance(
        &mut self,
        class: &Self::Class,
        ctor: <Self::Kind as HandleKind>::MethodId,
        sig: &MethodDescriptor,
        args: &[Self::Arg<'_>],
    ) -> Result<Self::Object, Self::Error>;

    /// Reads an instance field.
    ///
    /// # Safety
    ///
    /// `field` must have been resolved with the type `sig` describes, on the
    /// class of `instance` or one of its superclasses.
    unsafe fn read_field(
        &mut self,
        instance: &Self::Object,
        field: <Self::Kind as HandleKind>::FieldId,
        sig: &FieldDescriptor,
    ) -> Result<Self::Value, Self::Error>;

    fn read_static_field(
        &mut self,
        class: &Self::Class,
        field: <Self::Kind as HandleKind>::StaticFieldId,
        sig: &FieldDescriptor,
    ) -> Result<Self::Value, Self::Error>;

    /// Releases a session-scoped class reference.
    fn release_class(&mut self, class: Self::Class);

    /// Creates a strong reference to `class` that outlives the session.
    fn pin_class(
        &mut self,
        class: &Self::Class,
    ) -> Result<<Self::Kind as HandleKind>::Global, Self::Error>;

    /// Creates a weak reference to `class` that outlives the session.
    fn downgrade_class(
        &mut self,
        class: &Self::Class,
    ) -> Result<<Self::Kind as HandleKind>::Weak, Self::Error>;

    /// A session-scoped class reference from a pinned one.
    fn class_from_pinned(
        &mut self,
        pinned: &<Self::Kind as HandleKind>::Global,
    ) -> Result<Self::Class, Self::Error>;

    /// A session-scoped class reference from a weak one, or `None` if the
    /// class has been unloaded.
    fn class_from_weak(
        &mut self,
        weak: &<Self::Kind as HandleKind>::Weak,
    ) -> Result<Option<Self::Class>, Self::Error>;

    fn is_null(&self, instance: &Self::Object) -> bool;

    /// True if `instance` is an instance of `class` or of a subclass.
    fn instance_of(
        &mut self,
        instance: &Self::Object,
        class: &Self::Class,
    ) -> Result<bool, Self::Error>;

    /// True if `arg` can be passed where a parameter of type `ty` is
    /// declared.
    fn arg_matches(&self, ty: &JavaType, arg: &Self::Arg<'_>) -> bool;
}

/// A class reference borrowed from the runtime for the length of a scope.
///
/// The reference is released when the guard is dropped, whether the scope
/// ends normally, through `?`, or by unwinding.
pub struct ScopedClass<'r, R: Runtime> {
    rt: &'r mut R,
    class: Option<R::Class>,
}

impl<'r, R: Runtime> ScopedClass<'r, R> {
    /// Takes ownership of `class`, to be released through `rt`.
    pub fn new(rt: &'r mut R, class: R::Class) -> Self {
        Self {
            rt,
            class: Some(class),
        }
    }

    /// Looks `name` up and scopes the result.
    pub fn resolve(rt: &'r mut R, name: &str) -> Result<Self, R::Error> {
        let class = rt.resolve_class(name)?;
        Ok(Self::new(rt, class))
    }

    /// The runtime and the class, borrowed together.
    pub fn parts(&mut self) -> (&mut R, &R::Class) {
        let class = self
            .class
            .as_ref()
            .expect("class is only taken when the scope is dropped");
        (&mut *self.rt, class)
    }
}

impl<R: Runtime> Drop for ScopedClass<'_, R> {
    fn drop(&mut self) {
        if let Some(class) = self.class.take() {
            self.rt.release_class(class);
        }
    }
}
