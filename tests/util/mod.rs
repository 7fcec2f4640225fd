use std::sync::Arc;

use jni::{
    errors::Result, objects::JValue, AttachGuard, InitArgsBuilder, JNIEnv, JNIVersion, JavaVM,
};
use jni_binding_cache::{ClassDecl, OperationDecl};
use lazy_static::lazy_static;

lazy_static! {
    static ref JVM: Arc<JavaVM> = {
        let jvm_args = InitArgsBuilder::new()
            .version(JNIVersion::V8)
            .option("-Xcheck:jni")
            .build()
            .unwrap_or_else(|e| panic!("{:#?}", e));

        Arc::new(JavaVM::new(jvm_args).unwrap_or_else(|e| panic!("{:#?}", e)))
    };
}

pub fn jvm() -> &'static Arc<JavaVM> {
    &JVM
}

#[allow(dead_code)]
pub static ATOMIC_INTEGER: ClassDecl = ClassDecl::new(
    "java/util/concurrent/atomic/AtomicInteger",
    &[
        OperationDecl::constructor("init", "()V"),
        OperationDecl::constructor("init1", "(I)V"),
        OperationDecl::method("get", "get", "()I"),
        OperationDecl::method("addAndGet", "addAndGet", "(I)I"),
        OperationDecl::method("incrementAndGet", "incrementAndGet", "()I"),
    ],
);

#[allow(dead_code)]
pub static MATH: ClassDecl = ClassDecl::new(
    "java/lang/Math",
    &[
        OperationDecl::static_method("abs", "abs", "(I)I"),
        OperationDecl::static_method("max", "max", "(JJ)J"),
        OperationDecl::static_field("PI", "PI", "D"),
    ],
);

#[allow(dead_code)]
pub static INTEGER: ClassDecl = ClassDecl::new(
    "java/lang/Integer",
    &[
        OperationDecl::constructor("init", "(I)V"),
        OperationDecl::method("intValue", "intValue", "()I"),
        OperationDecl::static_method("parseInt", "parseInt", "(Ljava/lang/String;)I"),
        OperationDecl::static_method("valueOf", "valueOf", "(I)Ljava/lang/Integer;"),
        OperationDecl::static_field("MAX_VALUE", "MAX_VALUE", "I"),
    ],
);

#[allow(dead_code)]
pub static POINT: ClassDecl = ClassDecl::new(
    "java/awt/Point",
    &[
        OperationDecl::constructor("init", "(II)V"),
        OperationDecl::field("x", "x", "I"),
        OperationDecl::field("y", "y", "I"),
        OperationDecl::method("translate", "translate", "(II)V"),
    ],
);

#[allow(dead_code)]
pub fn call_java_abs(env: &mut JNIEnv, value: i32) -> i32 {
    env.call_static_method("java/lang/Math", "abs", "(I)I", &[JValue::from(value)])
        .unwrap()
        .i()
        .unwrap()
}

#[allow(dead_code)]
pub fn attach_current_thread() -> AttachGuard<'static> {
    jvm()
        .attach_current_thread()
        .expect("failed to attach jvm thread")
}

pub fn print_exception(env: &JNIEnv) {
    let exception_occurred = env.exception_check().unwrap_or_else(|e| panic!("{:?}", e));
    if exception_occurred {
        env.exception_describe()
            .unwrap_or_else(|e| panic!("{:?}", e));
    }
}

#[allow(dead_code)]
pub fn unwrap<T>(res: Result<T>, env: &JNIEnv) -> T {
    res.unwrap_or_else(|e| {
        print_exception(env);
        panic!("{:#?}", e);
    })
}
