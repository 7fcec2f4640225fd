use jni::{
    objects::{GlobalRef, JObject, JValue, JValueOwned},
    JNIEnv,
};

use crate::{errors::*, jni_runtime::JniBinding};

/// A Java object together with the binding that describes its class.
///
/// The object is held through a [`GlobalRef`], so a `BoundObject` can be
/// kept across native calls and sent to other threads. The binding is only
/// borrowed; bindings normally live for the whole process in a
/// [`LazyBinding`](crate::registry::LazyBinding) or a
/// [`Registry`](crate::registry::Registry).
///
/// The object is checked to be an instance of the bound class when it is
/// wrapped, so calls through the wrapper go straight to the cached IDs
/// without looking the class up again.
#[derive(Clone, Debug)]
pub struct BoundObject<'b> {
    binding: &'b JniBinding,
    obj: GlobalRef,
}

impl<'b> BoundObject<'b> {
    /// Wraps `obj`, which must be a non-null instance of the bound class.
    pub fn new<'local, O>(env: &mut JNIEnv<'local>, binding: &'b JniBinding, obj: O) -> Result<Self>
    where
        O: AsRef<JObject<'local>>,
    {
        let obj = obj.as_ref();
        if obj.is_null() {
            return Err(Error::NullInstance {
                class: binding.class_name(),
                op: "new",
            });
        }

        binding.check_class(env, obj)?;
        Self::trusted(env, binding, obj)
    }

    /// Creates a new instance through constructor `op` and wraps it.
    pub fn construct<'local>(
        env: &mut JNIEnv<'local>,
        binding: &'b JniBinding,
        op: &str,
        args: &[JValue<'local, '_>],
    ) -> Result<Self> {
        let local = binding.construct(env, op, args)?;
        let this = Self::trusted(env, binding, &local);
        let _ = env.delete_local_ref(local);
        this
    }

    fn trusted<'local>(
        env: &JNIEnv<'local>,
        binding: &'b JniBinding,
        obj: &JObject<'local>,
    ) -> Result<Self> {
        let obj = env.new_global_ref(obj).map_err(Error::runtime)?;
        Ok(Self { binding, obj })
    }

    /// Calls instance method `op`.
    pub fn call<'local>(
        &self,
        env: &mut JNIEnv<'local>,
        op: &str,
        args: &[JValue<'local, '_>],
    ) -> Result<JValueOwned<'local>> {
        // Safety: the object was checked against the bound class when it was
        // wrapped.
        unsafe { self.binding.invoke_unchecked(env, op, self.obj.as_obj(), args) }
    }

    /// Reads instance field `op`.
    pub fn get_field<'local>(&self, env: &mut JNIEnv<'local>, op: &str) -> Result<JValueOwned<'local>> {
        // Safety: as for `call`.
        unsafe { self.binding.get_field_unchecked(env, op, self.obj.as_obj()) }
    }

    pub fn as_obj(&self) -> &JObject<'static> {
        self.obj.as_obj()
    }

    pub fn binding(&self) -> &'b JniBinding {
        self.binding
    }

    /// Unwraps the global reference.
    pub fn into_global(self) -> GlobalRef {
        self.obj
    }
}

impl AsRef<JObject<'static>> for BoundObject<'_> {
    fn as_ref(&self) -> &JObject<'static> {
        self.as_obj()
    }
}
