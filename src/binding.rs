use std::collections::HashMap;
use std::fmt;

use log::{debug, trace};

use crate::{
    decl::{ClassDecl, OperationDecl, OperationKind, Retention},
    errors::*,
    runtime::{HandleKind, Runtime, ScopedClass},
    signature::{FieldDescriptor, MethodDescriptor},
};

/// A resolved handle together with the parsed signature it was resolved with.
enum Bound<K: HandleKind> {
    Constructor(K::MethodId, MethodDescriptor),
    Method(K::MethodId, MethodDescriptor),
    StaticMethod(K::StaticMethodId, MethodDescriptor),
    Field(K::FieldId, FieldDescriptor),
    StaticField(K::StaticFieldId, FieldDescriptor),
}

impl<K: HandleKind> Bound<K> {
    fn kind(&self) -> OperationKind {
        match self {
            Bound::Constructor(..) => OperationKind::Constructor,
            Bound::Method(..) => OperationKind::Method,
            Bound::StaticMethod(..) => OperationKind::StaticMethod,
            Bound::Field(..) => OperationKind::Field,
            Bound::StaticField(..) => OperationKind::StaticField,
        }
    }
}

struct Operation<K: HandleKind> {
    decl: &'static OperationDecl,
    bound: Bound<K>,
}

/// What is left of the class reference after resolution.
enum ClassRef<K: HandleKind> {
    Dropped,
    Weak(K::Weak),
    Pinned(K::Global),
}

enum Parsed {
    Method(MethodDescriptor),
    Field(FieldDescriptor),
}

/// The resolved handles for one Java class.
///
/// A `ClassBinding` is built once by [`ClassBinding::resolve`], which looks
/// the class up, resolves every declared operation and then lets go of the
/// class reference (or keeps a weak/global one, per the declaration's
/// [`Retention`]). From then on it is immutable: all call paths are a hash
/// lookup of the logical operation name followed by a direct call through
/// the cached handle.
///
/// Bindings are normally obtained through a
/// [`Registry`](crate::registry::Registry) or a
/// [`LazyBinding`](crate::registry::LazyBinding), which make sure each
/// class is resolved only once.
pub struct ClassBinding<K: HandleKind> {
    decl: ClassDecl,
    operations: Vec<Operation<K>>,
    index: HashMap<&'static str, usize>,
    class: ClassRef<K>,
}

impl<K: HandleKind> ClassBinding<K> {
    /// Resolves the class and every operation in `decl`.
    ///
    /// Signatures are validated before the runtime is touched. If the class
    /// or any operation can't be resolved, nothing is kept and the error
    /// names the first missing member.
    pub fn resolve<R>(rt: &mut R, decl: &ClassDecl) -> Result<Self>
    where
        R: Runtime<Kind = K>,
    {
        let class_name = decl.name();
        let parsed = parse_operations(decl)?;

        let mut scope = ScopedClass::resolve(rt, class_name).map_err(|e| Error::ClassNotFound {
            class: class_name,
            source: Box::new(e),
        })?;
        let (rt, class) = scope.parts();
        debug!("resolved class {class_name}, looking up {} operations", parsed.len());

        let mut operations = Vec::with_capacity(parsed.len());
        let mut index = HashMap::with_capacity(parsed.len());
        for (op, parsed) in parsed {
            let bound = resolve_operation(rt, class, class_name, op, parsed)?;
            index.insert(op.op(), operations.len());
            operations.push(Operation { decl: op, bound });
        }

        let retain_failed = |e: R::Error| Error::RetainClass {
            class: class_name,
            source: Box::new(e),
        };
        let retained = match decl.retention() {
            Retention::Drop => ClassRef::Dropped,
            Retention::Weak => ClassRef::Weak(rt.downgrade_class(class).map_err(retain_failed)?),
            Retention::Global => ClassRef::Pinned(rt.pin_class(class).map_err(retain_failed)?),
        };
        drop(scope);
        debug!(
            "cached {} handles for {class_name}, class reference {:?}",
            operations.len(),
            decl.retention()
        );

        Ok(Self {
            decl: *decl,
            operations,
            index,
            class: retained,
        })
    }

    /// The declaration this binding was resolved from.
    pub fn decl(&self) -> &ClassDecl {
        &self.decl
    }

    pub fn class_name(&self) -> &'static str {
        self.decl.name()
    }

    pub fn retention(&self) -> Retention {
        self.decl.retention()
    }

    /// True if the binding still holds a (weak or global) class reference.
    pub fn retains_class(&self) -> bool {
        !matches!(self.class, ClassRef::Dropped)
    }

    /// Declarations of every resolved operation, in declaration order.
    pub fn operations(&self) -> impl Iterator<Item = &'static OperationDecl> + '_ {
        self.operations.iter().map(|operation| operation.decl)
    }

    /// True if an operation with logical name `op` was declared.
    pub fn contains(&self, op: &str) -> bool {
        self.index.contains_key(op)
    }

    /// Cached ID of an instance method or constructor.
    pub fn method_id(&self, op: &str) -> Result<K::MethodId> {
        let operation = self.operation(op)?;
        match operation.bound {
            Bound::Method(id, _) | Bound::Constructor(id, _) => Ok(id),
            ref other => Err(self.wrong_kind(operation.decl, OperationKind::Method, other)),
        }
    }

    /// Cached ID of a static method.
    pub fn static_method_id(&self, op: &str) -> Result<K::StaticMethodId> {
        let operation = self.operation(op)?;
        match operation.bound {
            Bound::StaticMethod(id, _) => Ok(id),
            ref other => Err(self.wrong_kind(operation.decl, OperationKind::StaticMethod, other)),
        }
    }

    /// Cached ID of an instance field.
    pub fn field_id(&self, op: &str) -> Result<K::FieldId> {
        let operation = self.operation(op)?;
        match operation.bound {
            Bound::Field(id, _) => Ok(id),
            ref other => Err(self.wrong_kind(operation.decl, OperationKind::Field, other)),
        }
    }

    /// Cached ID of a static field.
    pub fn static_field_id(&self, op: &str) -> Result<K::StaticFieldId> {
        let operation = self.operation(op)?;
        match operation.bound {
            Bound::StaticField(id, _) => Ok(id),
            ref other => Err(self.wrong_kind(operation.decl, OperationKind::StaticField, other)),
        }
    }

    /// Calls instance method `op` on `instance`.
    ///
    /// `instance` is checked to be an instance of the bound class first,
    /// which needs the class reference (looked up again unless it is
    /// retained). Errors raised by the call itself (a Java exception, for
    /// JNI) come back as [`Error::Runtime`] holding the runtime's own error.
    pub fn invoke<R>(
        &self,
        rt: &mut R,
        op: &str,
        instance: &R::Object,
        args: &[R::Arg<'_>],
    ) -> Result<R::Value>
    where
        R: Runtime<Kind = K>,
    {
        let (decl, id, sig) = self.instance_method(op)?;
        self.check_instance(rt, decl, instance)?;
        self.check_args(rt, decl, sig, args)?;
        self.check_class(rt, instance)?;
        // Safety: `id` was resolved on the bound class with `sig`, `instance`
        // is an instance of that class and `args` match `sig`.
        unsafe { rt.invoke(instance, id, sig, args) }.map_err(Error::runtime)
    }

    /// Like [`ClassBinding::invoke`], without the instance-of check.
    ///
    /// No class lookup happens on this path. Null instances and arguments
    /// are still checked.
    ///
    /// # Safety
    ///
    /// `instance` must be an instance of the bound class (or a subclass).
    pub unsafe fn invoke_unchecked<R>(
        &self,
        rt: &mut R,
        op: &str,
        instance: &R::Object,
        args: &[R::Arg<'_>],
    ) -> Result<R::Value>
    where
        R: Runtime<Kind = K>,
    {
        let (decl, id, sig) = self.instance_method(op)?;
        self.check_instance(rt, decl, instance)?;
        self.check_args(rt, decl, sig, args)?;
        // Safety: the caller guarantees the class of `instance`.
        unsafe { rt.invoke(instance, id, sig, args) }.map_err(Error::runtime)
    }

    /// Calls static method `op`.
    ///
    /// The class reference is re-acquired for the call (unless it is pinned)
    /// and released again before returning.
    pub fn invoke_static<R>(&self, rt: &mut R, op: &str, args: &[R::Arg<'_>]) -> Result<R::Value>
    where
        R: Runtime<Kind = K>,
    {
        let operation = self.operation(op)?;
        let Bound::StaticMethod(id, ref sig) = operation.bound else {
            return Err(self.wrong_kind(
                operation.decl,
                OperationKind::StaticMethod,
                &operation.bound,
            ));
        };
        self.check_args(rt, operation.decl, sig, args)?;
        let mut scope = self.acquire_class(rt)?;
        let (rt, class) = scope.parts();
        // Safety: `id` was resolved on `class` with `sig` and `args` match it.
        unsafe { rt.invoke_static(class, id, sig, args) }.map_err(Error::runtime)
    }

    /// Creates a new instance through constructor `op`.
    ///
    /// The caller owns the returned object reference.
    pub fn construct<R>(&self, rt: &mut R, op: &str, args: &[R::Arg<'_>]) -> Result<R::Object>
    where
        R: Runtime<Kind = K>,
    {
        let operation = self.operation(op)?;
        let Bound::Constructor(id, ref sig) = operation.bound else {
            return Err(self.wrong_kind(
                operation.decl,
                OperationKind::Constructor,
                &operation.bound,
            ));
        };
        self.check_args(rt, operation.decl, sig, args)?;
        let mut scope = self.acquire_class(rt)?;
        let (rt, class) = scope.parts();
        // Safety: `id` is a constructor of `class` and `args` match `sig`.
        unsafe { rt.new_instance(class, id, sig, args) }.map_err(Error::runtime)
    }

    /// Reads instance field `op` of `instance`.
    ///
    /// `instance` is checked the same way as for [`ClassBinding::invoke`].
    pub fn get_field<R>(&self, rt: &mut R, op: &str, instance: &R::Object) -> Result<R::Value>
    where
        R: Runtime<Kind = K>,
    {
        let (decl, id, sig) = self.instance_field(op)?;
        self.check_instance(rt, decl, instance)?;
        self.check_class(rt, instance)?;
        // Safety: `id` was resolved on the bound class with `sig` and
        // `instance` is an instance of that class.
        unsafe { rt.read_field(instance, id, sig) }.map_err(Error::runtime)
    }

    /// Like [`ClassBinding::get_field`], without the instance-of check.
    ///
    /// # Safety
    ///
    /// `instance` must be an instance of the bound class (or a subclass).
    pub unsafe fn get_field_unchecked<R>(
        &self,
        rt: &mut R,
        op: &str,
        instance: &R::Object,
    ) -> Result<R::Value>
    where
        R: Runtime<Kind = K>,
    {
        let (decl, id, sig) = self.instance_field(op)?;
        self.check_instance(rt, decl, instance)?;
        // Safety: the caller guarantees the class of `instance`.
        unsafe { rt.read_field(instance, id, sig) }.map_err(Error::runtime)
    }

    /// Reads static field `op`.
    pub fn get_static_field<R>(&self, rt: &mut R, op: &str) -> Result<R::Value>
    where
        R: Runtime<Kind = K>,
    {
        let operation = self.operation(op)?;
        let Bound::StaticField(id, ref sig) = operation.bound else {
            return Err(self.wrong_kind(
                operation.decl,
                OperationKind::StaticField,
                &operation.bound,
            ));
        };
        let mut scope = self.acquire_class(rt)?;
        let (rt, class) = scope.parts();
        rt.read_static_field(class, id, sig).map_err(Error::runtime)
    }

    /// Borrows a class reference for the length of the returned scope.
    ///
    /// A pinned class is turned into a session reference; a weak one is
    /// upgraded; otherwise (or if the weak reference was cleared) the class
    /// is looked up by name again.
    pub fn acquire_class<'r, R>(&self, rt: &'r mut R) -> Result<ScopedClass<'r, R>>
    where
        R: Runtime<Kind = K>,
    {
        let class = match &self.class {
            ClassRef::Pinned(pinned) => rt.class_from_pinned(pinned).map_err(Error::runtime)?,
            ClassRef::Weak(weak) => match rt.class_from_weak(weak).map_err(Error::runtime)? {
                Some(class) => class,
                None => {
                    trace!("weak reference to {} was cleared", self.class_name());
                    self.lookup_class(rt)?
                }
            },
            ClassRef::Dropped => self.lookup_class(rt)?,
        };
        Ok(ScopedClass::new(rt, class))
    }

    fn lookup_class<R>(&self, rt: &mut R) -> Result<R::Class>
    where
        R: Runtime<Kind = K>,
    {
        trace!("looking up {} again", self.class_name());
        rt.resolve_class(self.class_name())
            .map_err(|e| Error::ClassNotFound {
                class: self.class_name(),
                source: Box::new(e),
            })
    }

    fn operation(&self, op: &str) -> Result<&Operation<K>> {
        self.index
            .get(op)
            .map(|&i| &self.operations[i])
            .ok_or_else(|| Error::UnknownOperation {
                class: self.class_name(),
                op: op.to_owned(),
            })
    }

    fn instance_method(
        &self,
        op: &str,
    ) -> Result<(&'static OperationDecl, K::MethodId, &MethodDescriptor)> {
        let operation = self.operation(op)?;
        match operation.bound {
            Bound::Method(id, ref sig) => Ok((operation.decl, id, sig)),
            ref other => Err(self.wrong_kind(operation.decl, OperationKind::Method, other)),
        }
    }

    fn instance_field(
        &self,
        op: &str,
    ) -> Result<(&'static OperationDecl, K::FieldId, &FieldDescriptor)> {
        let operation = self.operation(op)?;
        match operation.bound {
            Bound::Field(id, ref sig) => Ok((operation.decl, id, sig)),
            ref other => Err(self.wrong_kind(operation.decl, OperationKind::Field, other)),
        }
    }

    fn wrong_kind(&self, decl: &OperationDecl, expected: OperationKind, actual: &Bound<K>) -> Error {
        Error::WrongOperationKind {
            class: self.class_name(),
            op: decl.op(),
            expected,
            actual: actual.kind(),
        }
    }

    fn check_instance<R>(&self, rt: &R, decl: &OperationDecl, instance: &R::Object) -> Result<()>
    where
        R: Runtime<Kind = K>,
    {
        if rt.is_null(instance) {
            return Err(Error::NullInstance {
                class: self.class_name(),
                op: decl.op(),
            });
        }
        Ok(())
    }

    /// Fails with [`Error::WrongClass`] unless `instance` is an instance of
    /// the bound class.
    pub(crate) fn check_class<R>(&self, rt: &mut R, instance: &R::Object) -> Result<()>
    where
        R: Runtime<Kind = K>,
    {
        let is_instance = {
            let mut scope = self.acquire_class(rt)?;
            let (rt, class) = scope.parts();
            rt.instance_of(instance, class).map_err(Error::runtime)?
        };
        if !is_instance {
            return Err(Error::WrongClass {
                class: self.class_name(),
            });
        }
        Ok(())
    }

    fn check_args<R>(
        &self,
        rt: &R,
        decl: &OperationDecl,
        sig: &MethodDescriptor,
        args: &[R::Arg<'_>],
    ) -> Result<()>
    where
        R: Runtime<Kind = K>,
    {
        if sig.args().len() != args.len() {
            return Err(Error::ArgumentCount {
                class: self.class_name(),
                op: decl.op(),
                expected: sig.args().len(),
                actual: args.len(),
            });
        }
        for (index, (ty, arg)) in sig.args().iter().zip(args).enumerate() {
            if !rt.arg_matches(ty, arg) {
                return Err(Error::ArgumentType {
                    class: self.class_name(),
                    op: decl.op(),
                    index,
                    expected: ty.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl<K: HandleKind> fmt::Debug for ClassBinding<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassBinding")
            .field("class", &self.class_name())
            .field("retention", &self.retention())
            .field("retains_class", &self.retains_class())
            .field(
                "operations",
                &self.operations().map(|decl| decl.op()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

fn parse_operations(decl: &ClassDecl) -> Result<Vec<(&'static OperationDecl, Parsed)>> {
    let class = decl.name();
    let mut seen = HashMap::with_capacity(decl.operations().len());
    let mut parsed = Vec::with_capacity(decl.operations().len());

    for op in decl.operations() {
        if seen.insert(op.op(), ()).is_some() {
            return Err(Error::DuplicateOperation { class, op: op.op() });
        }
        let invalid = |reason: String| Error::InvalidSignature {
            class,
            op: op.op(),
            reason,
        };
        let sig = if op.kind().is_callable() {
            let sig: MethodDescriptor = op.sig().parse().map_err(|e| invalid(format!("{e}")))?;
            if op.kind() == OperationKind::Constructor && !sig.ret().is_void() {
                return Err(Error::InvalidConstructor {
                    class,
                    op: op.op(),
                    sig: op.sig(),
                });
            }
            Parsed::Method(sig)
        } else {
            Parsed::Field(op.sig().parse().map_err(|e| invalid(format!("{e}")))?)
        };
        parsed.push((op, sig));
    }

    Ok(parsed)
}

fn resolve_operation<R: Runtime>(
    rt: &mut R,
    class: &R::Class,
    class_name: &'static str,
    op: &'static OperationDecl,
    parsed: Parsed,
) -> Result<Bound<R::Kind>> {
    let (name, sig) = (op.name(), op.sig());
    let method_not_found = move |e: R::Error| Error::MethodNotFound {
        class: class_name,
        name,
        sig,
        source: Box::new(e),
    };
    let field_not_found = move |e: R::Error| Error::FieldNotFound {
        class: class_name,
        name,
        sig,
        source: Box::new(e),
    };

    let bound = match (op.kind(), parsed) {
        (OperationKind::Constructor, Parsed::Method(desc)) => Bound::Constructor(
            rt.resolve_method(class, name, sig).map_err(method_not_found)?,
            desc,
        ),
        (OperationKind::Method, Parsed::Method(desc)) => Bound::Method(
            rt.resolve_method(class, name, sig).map_err(method_not_found)?,
            desc,
        ),
        (OperationKind::StaticMethod, Parsed::Method(desc)) => Bound::StaticMethod(
            rt.resolve_static_method(class, name, sig)
                .map_err(method_not_found)?,
            desc,
        ),
        (OperationKind::Field, Parsed::Field(desc)) => Bound::Field(
            rt.resolve_field(class, name, sig).map_err(field_not_found)?,
            desc,
        ),
        (OperationKind::StaticField, Parsed::Field(desc)) => Bound::StaticField(
            rt.resolve_static_field(class, name, sig)
                .map_err(field_not_found)?,
            desc,
        ),
        // parse_operations picks the descriptor form from the kind
        _ => unreachable!("descriptor form does not match operation kind"),
    };
    Ok(bound)
}
