//! Static declarations of the classes and operations a binding resolves.
//!
//! A [`ClassDecl`] is the metadata a code generator would emit for one Java
//! class: its internal name, which members to resolve and how to treat the
//! class reference afterwards. Declarations are `const`-constructible so they
//! can live in `static`s next to the wrapper types that use them.
//!
//! ```
//! use jni_binding_cache::decl::{ClassDecl, OperationDecl, Retention};
//!
//! static FILE: ClassDecl = ClassDecl::new(
//!     "java/io/File",
//!     &[
//!         OperationDecl::constructor("init", "(Ljava/lang/String;)V"),
//!         OperationDecl::constructor("init1", "(Ljava/lang/String;Ljava/lang/String;)V"),
//!         OperationDecl::method("exists", "exists", "()Z"),
//!         OperationDecl::method("mkdirs", "mkdirs", "()Z"),
//!     ],
//! );
//!
//! static COLOR: ClassDecl = ClassDecl::new(
//!     "android/graphics/Color",
//!     &[OperationDecl::static_field("BLACK", "BLACK", "I")],
//! )
//! .retain(Retention::Weak);
//!
//! assert_eq!(FILE.operations().len(), 4);
//! assert_eq!(COLOR.retention(), Retention::Weak);
//! ```

use std::fmt;

/// Name under which JNI exposes constructors.
pub const CONSTRUCTOR_NAME: &str = "<init>";

/// What kind of member an operation binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// `<init>` with a `(...)V` signature.
    Constructor,
    /// A virtual instance method.
    Method,
    /// A static method.
    StaticMethod,
    /// An instance field.
    Field,
    /// A static field.
    StaticField,
}

impl OperationKind {
    /// True if the operation's signature is a method descriptor.
    pub fn is_callable(self) -> bool {
        matches!(
            self,
            OperationKind::Constructor | OperationKind::Method | OperationKind::StaticMethod
        )
    }

    /// True if the operation needs the class (rather than an instance) at
    /// call time.
    pub fn needs_class(self) -> bool {
        matches!(
            self,
            OperationKind::Constructor | OperationKind::StaticMethod | OperationKind::StaticField
        )
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            OperationKind::Constructor => "constructor",
            OperationKind::Method => "method",
            OperationKind::StaticMethod => "static method",
            OperationKind::Field => "field",
            OperationKind::StaticField => "static field",
        })
    }
}

/// What a binding keeps of its class reference once every handle is resolved.
///
/// Method and field IDs stay valid without a class reference, so only
/// bindings that make static calls or construct instances ever need the
/// class again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Retention {
    /// Release the class reference; look the class up by name whenever a
    /// static operation or constructor needs it.
    #[default]
    Drop,
    /// Keep a weak global reference and upgrade it on demand, falling back
    /// to a lookup by name if the class was unloaded.
    Weak,
    /// Keep a global reference for as long as the binding lives.
    Global,
}

/// One member to resolve: logical name, Java name, JNI signature and kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperationDecl {
    op: &'static str,
    name: &'static str,
    sig: &'static str,
    kind: OperationKind,
}

impl OperationDecl {
    /// Declares an operation of any kind.
    ///
    /// `op` is the logical name callers use; it must be unique within the
    /// class, so overloads carry a suffix (`init`, `init1`, ...).
    pub const fn new(
        op: &'static str,
        name: &'static str,
        sig: &'static str,
        kind: OperationKind,
    ) -> Self {
        Self { op, name, sig, kind }
    }

    /// Declares a constructor overload.
    pub const fn constructor(op: &'static str, sig: &'static str) -> Self {
        Self::new(op, CONSTRUCTOR_NAME, sig, OperationKind::Constructor)
    }

    /// Declares an instance method.
    pub const fn method(op: &'static str, name: &'static str, sig: &'static str) -> Self {
        Self::new(op, name, sig, OperationKind::Method)
    }

    /// Declares a static method.
    pub const fn static_method(op: &'static str, name: &'static str, sig: &'static str) -> Self {
        Self::new(op, name, sig, OperationKind::StaticMethod)
    }

    /// Declares an instance field.
    pub const fn field(op: &'static str, name: &'static str, sig: &'static str) -> Self {
        Self::new(op, name, sig, OperationKind::Field)
    }

    /// Declares a static field.
    pub const fn static_field(op: &'static str, name: &'static str, sig: &'static str) -> Self {
        Self::new(op, name, sig, OperationKind::StaticField)
    }

    /// Logical name.
    pub fn op(&self) -> &'static str {
        self.op
    }

    /// Java member name (`<init>` for constructors).
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// JNI signature string.
    pub fn sig(&self) -> &'static str {
        self.sig
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }
}

/// Everything needed to build the binding for one Java class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassDecl {
    name: &'static str,
    retention: Retention,
    operations: &'static [OperationDecl],
}

impl ClassDecl {
    /// Declares a class by internal name (`java/io/File`, with `$` for
    /// nested classes) with [`Retention::Drop`].
    pub const fn new(name: &'static str, operations: &'static [OperationDecl]) -> Self {
        Self {
            name,
            retention: Retention::Drop,
            operations,
        }
    }

    /// Sets what the binding keeps of the class reference after resolution.
    pub const fn retain(mut self, retention: Retention) -> Self {
        self.retention = retention;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn retention(&self) -> Retention {
        self.retention
    }

    pub fn operations(&self) -> &'static [OperationDecl] {
        self.operations
    }

    /// The declared operation with logical name `op`.
    pub fn operation(&self, op: &str) -> Option<&'static OperationDecl> {
        self.operations.iter().find(|decl| decl.op == op)
    }

    /// True if any operation needs the class at call time.
    pub fn needs_class(&self) -> bool {
        self.operations.iter().any(|decl| decl.kind.needs_class())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    static BITMAP: ClassDecl = ClassDecl::new(
        "android/graphics/Bitmap",
        &[
            OperationDecl::static_method(
                "createBitmap",
                "createBitmap",
                "(Landroid/graphics/Bitmap;)Landroid/graphics/Bitmap;",
            ),
            OperationDecl::method("getWidth", "getWidth", "()I"),
        ],
    );

    static POINT: ClassDecl = ClassDecl::new(
        "android/graphics/Point",
        &[
            OperationDecl::field("x", "x", "I"),
            OperationDecl::field("y", "y", "I"),
        ],
    );

    #[test]
    fn lookup_by_logical_name() {
        let op = BITMAP.operation("getWidth").unwrap();
        assert_eq!(op.name(), "getWidth");
        assert_eq!(op.kind(), OperationKind::Method);
        assert!(BITMAP.operation("getHeight").is_none());
    }

    #[test]
    fn constructors_use_init() {
        let op = OperationDecl::constructor("init2", "(Ljava/io/File;)V");
        assert_eq!(op.name(), CONSTRUCTOR_NAME);
        assert!(op.kind().is_callable());
        assert!(op.kind().needs_class());
    }

    #[test]
    fn class_need_follows_operation_kinds() {
        assert!(BITMAP.needs_class());
        assert!(!POINT.needs_class());
        assert_eq!(POINT.retention(), Retention::Drop);
        assert_eq!(POINT.retain(Retention::Global).retention(), Retention::Global);
    }
}
