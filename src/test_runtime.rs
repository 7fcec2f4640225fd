//! A small in-process object model implementing [`Runtime`], used by the
//! unit tests to observe exactly which lookups and reference operations a
//! binding performs.

use std::sync::{
    atomic::{AtomicBool, AtomicIsize, AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::thread;
use std::time::Duration;

use thiserror::Error;

use crate::runtime::{HandleKind, Runtime};
use crate::signature::{FieldDescriptor, JavaType, MethodDescriptor, Primitive};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FakeError {
    #[error("java.lang.NoClassDefFoundError: {0}")]
    NoClass(String),
    #[error("java.lang.NoSuchMethodError: {0} {1}")]
    NoMethod(String, String),
    #[error("java.lang.NoSuchFieldError: {0} {1}")]
    NoField(String, String),
    #[error("java.lang.IllegalStateException: {0}")]
    Thrown(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberId {
    class: usize,
    member: usize,
}

/// What a member does when called or read.
#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    /// Constructor storing its first argument (or 0).
    Init,
    /// Instance method returning the stored value.
    Get,
    /// Instance method adding its argument and returning the new value.
    Add,
    /// Static method returning the largest argument.
    Max,
    /// Instance field holding the stored value.
    Value,
    /// Static field with a fixed value.
    Constant(i32),
    /// Any call raises an exception.
    Throw,
}

#[derive(Debug, Clone)]
pub struct Member {
    name: &'static str,
    sig: &'static str,
    is_static: bool,
    behavior: Behavior,
}

impl Member {
    pub fn new(name: &'static str, sig: &'static str, is_static: bool, behavior: Behavior) -> Self {
        Self {
            name,
            sig,
            is_static,
            behavior,
        }
    }
}

struct FakeClass {
    name: &'static str,
    members: Vec<Member>,
    unloaded: bool,
}

struct Heap {
    classes: Vec<FakeClass>,
    objects: Vec<(usize, i32)>,
}

/// Shared state of the model VM. Cloned sessions see the same classes,
/// objects and counters.
pub struct FakeVm {
    heap: Mutex<Heap>,
    lookup_delay: Option<Duration>,
    pub class_lookups: AtomicUsize,
    pub member_lookups: AtomicUsize,
    pub live_local_classes: AtomicIsize,
    pub live_pinned_classes: AtomicIsize,
    pub calls: AtomicUsize,
    /// Makes `pin_class` fail, as if the global reference table were full.
    pub fail_pins: AtomicBool,
}

impl FakeVm {
    pub fn new() -> Arc<Self> {
        Self::build(None)
    }

    /// A VM whose class lookups take a while, to widen first-use races.
    pub fn slow(delay: Duration) -> Arc<Self> {
        Self::build(Some(delay))
    }

    fn build(lookup_delay: Option<Duration>) -> Arc<Self> {
        let counter = vec![
            Member::new("<init>", "()V", false, Behavior::Init),
            Member::new("<init>", "(I)V", false, Behavior::Init),
            Member::new("get", "()I", false, Behavior::Get),
            Member::new("add", "(I)I", false, Behavior::Add),
            Member::new("fail", "()V", false, Behavior::Throw),
            Member::new("max", "(II)I", true, Behavior::Max),
            Member::new("value", "I", false, Behavior::Value),
            Member::new("ZERO", "I", true, Behavior::Constant(0)),
            Member::new("LIMIT", "I", true, Behavior::Constant(1000)),
        ];
        let point = vec![
            Member::new("<init>", "(I)V", false, Behavior::Init),
            Member::new("x", "I", false, Behavior::Value),
        ];
        Arc::new(Self {
            heap: Mutex::new(Heap {
                classes: vec![
                    FakeClass {
                        name: "test/Counter",
                        members: counter,
                        unloaded: false,
                    },
                    FakeClass {
                        name: "test/Point",
                        members: point,
                        unloaded: false,
                    },
                ],
                objects: Vec::new(),
            }),
            lookup_delay,
            class_lookups: AtomicUsize::new(0),
            member_lookups: AtomicUsize::new(0),
            live_local_classes: AtomicIsize::new(0),
            live_pinned_classes: AtomicIsize::new(0),
            calls: AtomicUsize::new(0),
            fail_pins: AtomicBool::new(false),
        })
    }

    pub fn session(self: &Arc<Self>) -> FakeEnv {
        FakeEnv { vm: self.clone() }
    }

    /// Simulates the class being unloaded, which clears weak references.
    pub fn unload(&self, name: &str) {
        let mut heap = self.heap.lock().unwrap();
        for class in heap.classes.iter_mut().filter(|c| c.name == name) {
            class.unloaded = true;
        }
    }

    pub fn class_lookups(&self) -> usize {
        self.class_lookups.load(Ordering::SeqCst)
    }

    pub fn member_lookups(&self) -> usize {
        self.member_lookups.load(Ordering::SeqCst)
    }

    pub fn live_local_classes(&self) -> isize {
        self.live_local_classes.load(Ordering::SeqCst)
    }

    pub fn live_pinned_classes(&self) -> isize {
        self.live_pinned_classes.load(Ordering::SeqCst)
    }
}

pub struct Fake;

impl HandleKind for Fake {
    type MethodId = MemberId;
    type StaticMethodId = MemberId;
    type FieldId = MemberId;
    type StaticFieldId = MemberId;
    type Global = PinnedClass;
    type Weak = WeakClass;
}

#[derive(Debug)]
pub struct ClassRef(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectRef(Option<usize>);

impl ObjectRef {
    pub fn null() -> Self {
        ObjectRef(None)
    }
}

pub struct PinnedClass {
    class: usize,
    vm: Arc<FakeVm>,
}

impl Drop for PinnedClass {
    fn drop(&mut self) {
        self.vm.live_pinned_classes.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct WeakClass(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeValue {
    Int(i32),
    Object(ObjectRef),
}

impl FakeValue {
    pub fn i(self) -> i32 {
        match self {
            FakeValue::Int(v) => v,
            other => panic!("expected an int, got {other:?}"),
        }
    }
}

/// One session (the analogue of an attached thread's `JNIEnv`).
pub struct FakeEnv {
    vm: Arc<FakeVm>,
}

impl FakeEnv {
    fn local_class(&self, class: usize) -> ClassRef {
        self.vm.live_local_classes.fetch_add(1, Ordering::SeqCst);
        ClassRef(class)
    }

    fn member(&self, id: MemberId) -> Member {
        let heap = self.vm.heap.lock().unwrap();
        heap.classes[id.class].members[id.member].clone()
    }

    fn find_member(
        &mut self,
        class: &ClassRef,
        name: &str,
        sig: &str,
        is_static: bool,
    ) -> Option<MemberId> {
        self.vm.member_lookups.fetch_add(1, Ordering::SeqCst);
        let heap = self.vm.heap.lock().unwrap();
        heap.classes[class.0]
            .members
            .iter()
            .position(|m| m.name == name && m.sig == sig && m.is_static == is_static)
            .map(|member| MemberId {
                class: class.0,
                member,
            })
    }

    fn call(&mut self, object: Option<usize>, id: MemberId, args: &[i32]) -> Result<FakeValue, FakeError> {
        self.vm.calls.fetch_add(1, Ordering::SeqCst);
        let member = self.member(id);
        let mut heap = self.vm.heap.lock().unwrap();
        match member.behavior {
            Behavior::Init => {
                heap.objects.push((id.class, args.first().copied().unwrap_or(0)));
                Ok(FakeValue::Object(ObjectRef(Some(heap.objects.len() - 1))))
            }
            Behavior::Get | Behavior::Value => {
                let slot = object.expect("instance member called without an instance");
                Ok(FakeValue::Int(heap.objects[slot].1))
            }
            Behavior::Add => {
                let slot = object.expect("instance member called without an instance");
                heap.objects[slot].1 += args[0];
                Ok(FakeValue::Int(heap.objects[slot].1))
            }
            Behavior::Max => Ok(FakeValue::Int(args.iter().copied().max().unwrap_or(0))),
            Behavior::Constant(v) => Ok(FakeValue::Int(v)),
            Behavior::Throw => Err(FakeError::Thrown(format!("{} failed", member.name))),
        }
    }
}

impl Runtime for FakeEnv {
    type Kind = Fake;
    type Class = ClassRef;
    type Object = ObjectRef;
    type Arg<'a> = i32;
    type Value = FakeValue;
    type Error = FakeError;

    fn resolve_class(&mut self, name: &str) -> Result<ClassRef, FakeError> {
        self.vm.class_lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.vm.lookup_delay {
            thread::sleep(delay);
        }
        let index = {
            let heap = self.vm.heap.lock().unwrap();
            heap.classes.iter().position(|c| c.name == name)
        };
        match index {
            Some(index) => Ok(self.local_class(index)),
            None => Err(FakeError::NoClass(name.to_owned())),
        }
    }

    fn resolve_method(&mut self, class: &ClassRef, name: &str, sig: &str) -> Result<MemberId, FakeError> {
        self.find_member(class, name, sig, false)
            .ok_or_else(|| FakeError::NoMethod(name.to_owned(), sig.to_owned()))
    }

    fn resolve_static_method(
        &mut self,
        class: &ClassRef,
        name: &str,
        sig: &str,
    ) -> Result<MemberId, FakeError> {
        self.find_member(class, name, sig, true)
            .ok_or_else(|| FakeError::NoMethod(name.to_owned(), sig.to_owned()))
    }

    fn resolve_field(&mut self, class: &ClassRef, name: &str, sig: &str) -> Result<MemberId, FakeError> {
        self.find_member(class, name, sig, false)
            .ok_or_else(|| FakeError::NoField(name.to_owned(), sig.to_owned()))
    }

    fn resolve_static_field(
        &mut self,
        class: &ClassRef,
        name: &str,
        sig: &str,
    ) -> Result<MemberId, FakeError> {
        self.find_member(class, name, sig, true)
            .ok_or_else(|| FakeError::NoField(name.to_owned(), sig.to_owned()))
    }

    unsafe fn invoke(
        &mut self,
        instance: &ObjectRef,
        method: MemberId,
        _sig: &MethodDescriptor,
        args: &[i32],
    ) -> Result<FakeValue, FakeError> {
        self.call(instance.0, method, args)
    }

    unsafe fn invoke_static(
        &mut self,
        _class: &ClassRef,
        method: MemberId,
        _sig: &MethodDescriptor,
        args: &[i32],
    ) -> Result<FakeValue, FakeError> {
        self.call(None, method, args)
    }

    unsafe fn new_instance(
        &mut self,
        _class: &ClassRef,
        ctor: MemberId,
        _sig: &MethodDescriptor,
        args: &[i32],
    ) -> Result<ObjectRef, FakeError> {
        match self.call(None, ctor, args)? {
            FakeValue::Object(obj) => Ok(obj),
            other => panic!("constructor produced {other:?}"),
        }
    }

    unsafe fn read_field(
        &mut self,
        instance: &ObjectRef,
        field: MemberId,
        _sig: &FieldDescriptor,
    ) -> Result<FakeValue, FakeError> {
        self.call(instance.0, field, &[])
    }

    fn read_static_field(
        &mut self,
        _class: &ClassRef,
        field: MemberId,
        _sig: &FieldDescriptor,
    ) -> Result<FakeValue, FakeError> {
        self.call(None, field, &[])
    }

    fn release_class(&mut self, _class: ClassRef) {
        self.vm.live_local_classes.fetch_sub(1, Ordering::SeqCst);
    }

    fn pin_class(&mut self, class: &ClassRef) -> Result<PinnedClass, FakeError> {
        if self.vm.fail_pins.load(Ordering::SeqCst) {
            return Err(FakeError::Thrown("global reference table is full".to_owned()));
        }
        self.vm.live_pinned_classes.fetch_add(1, Ordering::SeqCst);
        Ok(PinnedClass {
            class: class.0,
            vm: self.vm.clone(),
        })
    }

    fn downgrade_class(&mut self, class: &ClassRef) -> Result<WeakClass, FakeError> {
        Ok(WeakClass(class.0))
    }

    fn class_from_pinned(&mut self, pinned: &PinnedClass) -> Result<ClassRef, FakeError> {
        Ok(self.local_class(pinned.class))
    }

    fn class_from_weak(&mut self, weak: &WeakClass) -> Result<Option<ClassRef>, FakeError> {
        let unloaded = self.vm.heap.lock().unwrap().classes[weak.0].unloaded;
        Ok((!unloaded).then(|| self.local_class(weak.0)))
    }

    fn is_null(&self, instance: &ObjectRef) -> bool {
        instance.0.is_none()
    }

    fn instance_of(
        &mut self,
        instance: &ObjectRef,
        class: &ClassRef,
    ) -> Result<bool, FakeError> {
        let heap = self.vm.heap.lock().unwrap();
        Ok(instance.0.is_some_and(|slot| heap.objects[slot].0 == class.0))
    }

    fn arg_matches(&self, ty: &JavaType, _arg: &i32) -> bool {
        *ty == JavaType::Primitive(Primitive::Int)
    }
}
