//! [`Runtime`] for [`jni::JNIEnv`].
//!
//! Lookups go through `FindClass`/`Get*ID`; calls use the `*_unchecked`
//! entry points with the return type taken from the declared signature.
//! Java exceptions thrown while resolving are cleared, so a failed binding
//! leaves nothing pending. Exceptions thrown by an invoked method are left
//! pending and reported as [`jni::errors::Error::JavaException`], exactly
//! as `jni` itself reports them.

use jni::{
    errors::Error as JniError,
    objects::{
        GlobalRef, JClass, JFieldID, JMethodID, JObject, JStaticFieldID, JStaticMethodID, JValue,
        JValueOwned, WeakRef,
    },
    signature::{JavaType as JniType, Primitive as JniPrimitive, ReturnType},
    sys::jvalue,
    JNIEnv,
};
use log::debug;

use crate::{
    binding::ClassBinding,
    registry::{LazyBinding, Registry},
    runtime::{HandleKind, Runtime},
    signature::{FieldDescriptor, JavaType, MethodDescriptor, Primitive},
};

/// Long-lived JNI handles: method/field IDs and global/weak references.
pub struct Jni;

impl HandleKind for Jni {
    type MethodId = JMethodID;
    type StaticMethodId = JStaticMethodID;
    type FieldId = JFieldID;
    type StaticFieldId = JStaticFieldID;
    type Global = GlobalRef;
    type Weak = WeakRef;
}

/// A binding of JNI handles.
pub type JniBinding = ClassBinding<Jni>;

/// A registry of JNI bindings.
pub type JniRegistry = Registry<Jni>;

/// A `static` JNI binding cell.
pub type LazyJniBinding = LazyBinding<Jni>;

impl<'local> Runtime for JNIEnv<'local> {
    type Kind = Jni;
    type Class = JClass<'local>;
    type Object = JObject<'local>;
    type Arg<'a>
        = JValue<'local, 'a>
    where
        Self: 'a;
    type Value = JValueOwned<'local>;
    type Error = JniError;

    fn resolve_class(&mut self, name: &str) -> Result<JClass<'local>, JniError> {
        let class = self.find_class(name);
        cleared(self, class, name, "")
    }

    fn resolve_method(
        &mut self,
        class: &JClass<'local>,
        name: &str,
        sig: &str,
    ) -> Result<JMethodID, JniError> {
        let id = self.get_method_id(class, name, sig);
        cleared(self, id, name, sig)
    }

    fn resolve_static_method(
        &mut self,
        class: &JClass<'local>,
        name: &str,
        sig: &str,
    ) -> Result<JStaticMethodID, JniError> {
        let id = self.get_static_method_id(class, name, sig);
        cleared(self, id, name, sig)
    }

    fn resolve_field(
        &mut self,
        class: &JClass<'local>,
        name: &str,
        sig: &str,
    ) -> Result<JFieldID, JniError> {
        let id = self.get_field_id(class, name, sig);
        cleared(self, id, name, sig)
    }

    fn resolve_static_field(
        &mut self,
        class: &JClass<'local>,
        name: &str,
        sig: &str,
    ) -> Result<JStaticFieldID, JniError> {
        let id = self.get_static_field_id(class, name, sig);
        cleared(self, id, name, sig)
    }

    unsafe fn invoke(
        &mut self,
        instance: &JObject<'local>,
        method: JMethodID,
        sig: &MethodDescriptor,
        args: &[Self::Arg<'_>],
    ) -> Result<JValueOwned<'local>, JniError> {
        let args = raw_args(args);
        // Safety: the caller guarantees `method` belongs to the class of
        // `instance` and was resolved with `sig`, and that `args` match it.
        unsafe { self.call_method_unchecked(instance, method, return_type(sig.ret()), &args) }
    }

    unsafe fn invoke_static(
        &mut self,
        class: &JClass<'local>,
        method: JStaticMethodID,
        sig: &MethodDescriptor,
        args: &[Self::Arg<'_>],
    ) -> Result<JValueOwned<'local>, JniError> {
        let args = raw_args(args);
        // Safety: the caller guarantees `method` was resolved on `class` with
        // `sig`, and that `args` match it.
        unsafe { self.call_static_method_unchecked(class, method, return_type(sig.ret()), &args) }
    }

    unsafe fn new_instance(
        &mut self,
        class: &JClass<'local>,
        ctor: JMethodID,
        _sig: &MethodDescriptor,
        args: &[Self::Arg<'_>],
    ) -> Result<JObject<'local>, JniError> {
        let args = raw_args(args);
        // Safety: the caller guarantees `ctor` is a `<init>` ID of `class` and
        // that `args` match its signature.
        unsafe { self.new_object_unchecked(class, ctor, &args) }
    }

    unsafe fn read_field(
        &mut self,
        instance: &JObject<'local>,
        field: JFieldID,
        sig: &FieldDescriptor,
    ) -> Result<JValueOwned<'local>, JniError> {
        // `jni` exposes this as a safe call.
        self.get_field_unchecked(instance, field, return_type(sig.ty()))
    }

    fn read_static_field(
        &mut self,
        class: &JClass<'local>,
        field: JStaticFieldID,
        sig: &FieldDescriptor,
    ) -> Result<JValueOwned<'local>, JniError> {
        self.get_static_field_unchecked(class, field, field_type(sig.ty()))
    }

    fn release_class(&mut self, class: JClass<'local>) {
        let _ = self.delete_local_ref(class);
    }

    fn pin_class(&mut self, class: &JClass<'local>) -> Result<GlobalRef, JniError> {
        self.new_global_ref(class)
    }

    fn downgrade_class(&mut self, class: &JClass<'local>) -> Result<WeakRef, JniError> {
        self.new_weak_ref(class)?
            .ok_or(JniError::NullPtr("downgrade_class class argument"))
    }

    fn class_from_pinned(&mut self, pinned: &GlobalRef) -> Result<JClass<'local>, JniError> {
        self.new_local_ref(pinned).map(JClass::from)
    }

    fn class_from_weak(&mut self, weak: &WeakRef) -> Result<Option<JClass<'local>>, JniError> {
        Ok(weak.upgrade_local(self)?.map(JClass::from))
    }

    fn is_null(&self, instance: &JObject<'local>) -> bool {
        instance.is_null()
    }

    fn instance_of(
        &mut self,
        instance: &JObject<'local>,
        class: &JClass<'local>,
    ) -> Result<bool, JniError> {
        self.is_instance_of(instance, class)
    }

    fn arg_matches(&self, ty: &JavaType, arg: &Self::Arg<'_>) -> bool {
        match ty {
            JavaType::Primitive(p) => matches!(
                (p, arg),
                (Primitive::Boolean, JValue::Bool(_))
                    | (Primitive::Byte, JValue::Byte(_))
                    | (Primitive::Char, JValue::Char(_))
                    | (Primitive::Short, JValue::Short(_))
                    | (Primitive::Int, JValue::Int(_))
                    | (Primitive::Long, JValue::Long(_))
                    | (Primitive::Float, JValue::Float(_))
                    | (Primitive::Double, JValue::Double(_))
            ),
            JavaType::Object(_) | JavaType::Array(_) => matches!(arg, JValue::Object(_)),
        }
    }
}

/// Clears any exception a failed lookup left pending.
fn cleared<T>(
    env: &JNIEnv<'_>,
    result: Result<T, JniError>,
    name: &str,
    sig: &str,
) -> Result<T, JniError> {
    if let Err(err) = &result {
        debug!("lookup of {name}{sig} failed: {err}");
        let _ = env.exception_clear();
    }
    result
}

fn raw_args(args: &[JValue<'_, '_>]) -> Vec<jvalue> {
    args.iter().map(|arg| arg.as_jni()).collect()
}

fn primitive(p: Primitive) -> JniPrimitive {
    match p {
        Primitive::Boolean => JniPrimitive::Boolean,
        Primitive::Byte => JniPrimitive::Byte,
        Primitive::Char => JniPrimitive::Char,
        Primitive::Double => JniPrimitive::Double,
        Primitive::Float => JniPrimitive::Float,
        Primitive::Int => JniPrimitive::Int,
        Primitive::Long => JniPrimitive::Long,
        Primitive::Short => JniPrimitive::Short,
        Primitive::Void => JniPrimitive::Void,
    }
}

pub(crate) fn return_type(ty: &JavaType) -> ReturnType {
    match ty {
        JavaType::Primitive(p) => ReturnType::Primitive(primitive(*p)),
        JavaType::Object(_) => ReturnType::Object,
        JavaType::Array(_) => ReturnType::Array,
    }
}

pub(crate) fn field_type(ty: &JavaType) -> JniType {
    match ty {
        JavaType::Primitive(p) => JniType::Primitive(primitive(*p)),
        JavaType::Object(name) => JniType::Object(name.clone()),
        JavaType::Array(elem) => JniType::Array(Box::new(field_type(elem))),
    }
}
