/// Declares a Rust marker type for a Java class, with a lazily resolved
/// JNI binding.
///
/// Each entry is `op: kind ...`, where `op` is the logical operation name
/// and `kind` is one of `constructor "sig"`, `method "name" "sig"`,
/// `static_method "name" "sig"`, `field "name" "sig"` or
/// `static_field "name" "sig"`. Overloads get distinct logical names
/// (`init`, `init1`, ...). An optional [`Retention`](crate::decl::Retention)
/// variant can follow the class name.
///
/// The generated type gets a `DECL` constant holding the
/// [`ClassDecl`](crate::decl::ClassDecl), one `&str` constant per operation
/// (named after, and holding, the logical name) and an implementation of
/// [`JavaClass`](crate::registry::JavaClass) backed by a `static`
/// [`LazyBinding`](crate::registry::LazyBinding).
///
/// ```
/// use jni_binding_cache::{bind_class, JavaClass};
///
/// bind_class! {
///     /// `java.lang.Integer`
///     pub struct Integer("java/lang/Integer", Global) {
///         init: constructor "(I)V",
///         intValue: method "intValue" "()I",
///         valueOf: static_method "valueOf" "(I)Ljava/lang/Integer;",
///         MAX_VALUE: static_field "MAX_VALUE" "I",
///     }
/// }
///
/// assert_eq!(Integer::class_name(), "java/lang/Integer");
/// assert_eq!(Integer::intValue, "intValue");
/// assert_eq!(Integer::DECL.operations().len(), 4);
/// ```
#[macro_export]
macro_rules! bind_class {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident($class:literal $(, $retention:ident)?) {
            $($op:ident: $kind:ident $($arg:literal)+),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        $vis struct $name;

        #[allow(dead_code)]
        impl $name {
            const OPERATIONS: &'static [$crate::decl::OperationDecl] = &[
                $($crate::__bind_operation!($op $kind $($arg)+)),*
            ];

            /// Declaration of every bound operation.
            pub const DECL: $crate::decl::ClassDecl =
                $crate::decl::ClassDecl::new($class, Self::OPERATIONS)
                    $(.retain($crate::decl::Retention::$retention))?;

            $(
                #[allow(non_upper_case_globals)]
                pub const $op: &'static str = stringify!($op);
            )*
        }

        impl $crate::registry::JavaClass for $name {
            type Kind = $crate::jni_runtime::Jni;

            fn lazy_binding() -> &'static $crate::registry::LazyBinding<$crate::jni_runtime::Jni> {
                static DECL: $crate::decl::ClassDecl = $name::DECL;
                static BINDING: $crate::registry::LazyBinding<$crate::jni_runtime::Jni> =
                    $crate::registry::LazyBinding::new(&DECL);
                &BINDING
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __bind_operation {
    ($op:ident constructor $sig:literal) => {
        $crate::decl::OperationDecl::constructor(stringify!($op), $sig)
    };
    ($op:ident $kind:ident $name:literal $sig:literal) => {
        $crate::decl::OperationDecl::$kind(stringify!($op), $name, $sig)
    };
}
