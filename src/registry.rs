//! Process-wide ownership of bindings.
//!
//! A binding is resolved the first time it is needed and then shared by every
//! caller on every thread. Two ways of holding them are offered:
//!
//! - [`Registry`] keys bindings by class name. It is an ordinary value, so
//!   tests and libraries can own one without touching global state.
//! - [`LazyBinding`] is a single-class cell meant to live in a `static`
//!   next to a wrapper type (see [`bind_class!`](crate::bind_class)).
//!
//! Both use [`once_cell::sync::OnceCell`]: concurrent first callers block
//! until one of them has finished resolving, and a failed resolution leaves
//! the cell empty so that a later call tries again.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex, MutexGuard, PoisonError,
};

use log::{debug, trace};
use once_cell::sync::OnceCell;

use crate::{
    binding::ClassBinding,
    decl::ClassDecl,
    errors::*,
    runtime::{HandleKind, Runtime},
};

type Cell<K> = Arc<OnceCell<Arc<ClassBinding<K>>>>;

struct Slot<K: HandleKind> {
    decl: &'static ClassDecl,
    cell: Cell<K>,
    /// Added by [`RegistryBuilder`] rather than by a first `get_binding`.
    declared: bool,
}

impl<K: HandleKind> Slot<K> {
    fn new(decl: &'static ClassDecl, declared: bool) -> Self {
        Self {
            decl,
            cell: Arc::new(OnceCell::new()),
            declared,
        }
    }
}

/// Bindings keyed by class name, each resolved at most once.
pub struct Registry<K: HandleKind> {
    slots: Mutex<HashMap<&'static str, Slot<K>>>,
    resolutions: AtomicUsize,
}

impl<K: HandleKind> Default for Registry<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: HandleKind> Registry<K> {
    /// An empty registry. Classes are added by [`Registry::get_binding`].
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            resolutions: AtomicUsize::new(0),
        }
    }

    /// A registry with a fixed set of pre-declared classes.
    pub fn builder() -> RegistryBuilder<K> {
        RegistryBuilder {
            decls: Vec::new(),
            kind: PhantomData,
        }
    }

    /// The binding for `decl`, resolving it on first use.
    ///
    /// Every call with the same class name returns the same binding. Passing
    /// a declaration that differs from the one the class was first seen with
    /// is an [`Error::ConflictingDeclaration`]. A class first seen here whose
    /// resolution fails is forgotten again, so a different declaration may
    /// be tried next; pre-declared classes keep their declaration.
    pub fn get_binding<R>(&self, rt: &mut R, decl: &'static ClassDecl) -> Result<Arc<ClassBinding<K>>>
    where
        R: Runtime<Kind = K>,
    {
        let (cell, declared) = {
            let mut slots = self.lock();
            let slot = slots
                .entry(decl.name())
                .or_insert_with(|| Slot::new(decl, false));
            if *slot.decl != *decl {
                return Err(Error::ConflictingDeclaration { class: decl.name() });
            }
            (slot.cell.clone(), slot.declared)
        };
        let result = self.resolve_cell(rt, &cell, decl);
        if result.is_err() && !declared {
            self.forget(decl.name(), &cell);
        }
        result
    }

    /// The binding for a pre-declared class, resolving it on first use.
    pub fn binding<R>(&self, rt: &mut R, name: &str) -> Result<Arc<ClassBinding<K>>>
    where
        R: Runtime<Kind = K>,
    {
        let (decl, cell) = {
            let slots = self.lock();
            let slot = slots
                .get(name)
                .ok_or_else(|| Error::UndeclaredClass(name.to_owned()))?;
            (slot.decl, slot.cell.clone())
        };
        self.resolve_cell(rt, &cell, decl)
    }

    /// Resolves every known class that isn't resolved yet.
    ///
    /// Stops at the first failure; bindings resolved before it stay cached.
    pub fn preload<R>(&self, rt: &mut R) -> Result<()>
    where
        R: Runtime<Kind = K>,
    {
        let pending: Vec<_> = self
            .lock()
            .values()
            .filter(|slot| slot.cell.get().is_none())
            .map(|slot| (slot.decl, slot.cell.clone()))
            .collect();
        debug!("preloading {} bindings", pending.len());
        for (decl, cell) in pending {
            self.resolve_cell(rt, &cell, decl)?;
        }
        Ok(())
    }

    /// The binding for `name` if it has already been resolved.
    pub fn get(&self, name: &str) -> Option<Arc<ClassBinding<K>>> {
        self.lock().get(name).and_then(|slot| slot.cell.get().cloned())
    }

    /// Names of every class this registry knows about.
    pub fn class_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.lock().keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// How many successful resolutions this registry has run.
    pub fn resolutions(&self) -> usize {
        self.resolutions.load(Ordering::SeqCst)
    }

    fn resolve_cell<R>(
        &self,
        rt: &mut R,
        cell: &Cell<K>,
        decl: &'static ClassDecl,
    ) -> Result<Arc<ClassBinding<K>>>
    where
        R: Runtime<Kind = K>,
    {
        if let Some(binding) = cell.get() {
            trace!("binding for {} already resolved", decl.name());
            return Ok(binding.clone());
        }
        // The map lock is not held here, so unrelated classes resolve in
        // parallel while callers for this one wait on the cell.
        cell.get_or_try_init(|| -> Result<_> {
            let binding = ClassBinding::resolve(rt, decl)?;
            self.resolutions.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(binding))
        })
        .cloned()
    }

    /// Removes the slot holding `cell` if nothing was ever resolved into it.
    fn forget(&self, name: &'static str, cell: &Cell<K>) {
        let mut slots = self.lock();
        let unresolved = slots
            .get(name)
            .is_some_and(|slot| Arc::ptr_eq(&slot.cell, cell) && slot.cell.get().is_none());
        if unresolved {
            trace!("forgetting unresolved declaration of {name}");
            slots.remove(name);
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<&'static str, Slot<K>>> {
        // Slots are inserted and removed whole, never left half-written.
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K: HandleKind> fmt::Debug for Registry<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("classes", &self.class_names())
            .field("resolutions", &self.resolutions())
            .finish()
    }
}

/// Collects the declarations a [`Registry`] starts out with.
pub struct RegistryBuilder<K: HandleKind> {
    decls: Vec<&'static ClassDecl>,
    kind: PhantomData<fn() -> K>,
}

impl<K: HandleKind> RegistryBuilder<K> {
    pub fn declare(mut self, decl: &'static ClassDecl) -> Self {
        self.decls.push(decl);
        self
    }

    /// Builds the registry without resolving anything.
    ///
    /// Declaring the same class twice is fine as long as the declarations are
    /// equal.
    pub fn build(self) -> Result<Registry<K>> {
        let mut slots = HashMap::with_capacity(self.decls.len());
        for decl in self.decls {
            let slot = slots
                .entry(decl.name())
                .or_insert_with(|| Slot::new(decl, true));
            if *slot.decl != *decl {
                return Err(Error::ConflictingDeclaration { class: decl.name() });
            }
        }
        Ok(Registry {
            slots: Mutex::new(slots),
            resolutions: AtomicUsize::new(0),
        })
    }
}

impl<K: HandleKind> fmt::Debug for RegistryBuilder<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryBuilder")
            .field(
                "classes",
                &self.decls.iter().map(|decl| decl.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// A binding for one class, resolved on first use.
///
/// ```ignore
/// static FILE_DECL: ClassDecl = ClassDecl::new("java/io/File", &[/* ... */]);
/// static FILE: LazyBinding<Jni> = LazyBinding::new(&FILE_DECL);
///
/// let file = FILE.get(&mut env)?;
/// ```
pub struct LazyBinding<K: HandleKind> {
    decl: &'static ClassDecl,
    cell: OnceCell<ClassBinding<K>>,
}

impl<K: HandleKind> LazyBinding<K> {
    pub const fn new(decl: &'static ClassDecl) -> Self {
        Self {
            decl,
            cell: OnceCell::new(),
        }
    }

    pub fn decl(&self) -> &'static ClassDecl {
        self.decl
    }

    /// The binding, resolving it if this is the first successful call.
    pub fn get<R>(&self, rt: &mut R) -> Result<&ClassBinding<K>>
    where
        R: Runtime<Kind = K>,
    {
        self.cell
            .get_or_try_init(|| ClassBinding::resolve(rt, self.decl))
    }

    /// The binding if it has already been resolved.
    pub fn get_resolved(&self) -> Option<&ClassBinding<K>> {
        self.cell.get()
    }
}

impl<K: HandleKind> fmt::Debug for LazyBinding<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyBinding")
            .field("class", &self.decl.name())
            .field("resolved", &self.cell.get().is_some())
            .finish()
    }
}

/// A Rust type standing for one Java class.
///
/// Implemented by the marker types [`bind_class!`](crate::bind_class)
/// generates.
pub trait JavaClass {
    type Kind: HandleKind;

    /// The cell holding this class's binding.
    fn lazy_binding() -> &'static LazyBinding<Self::Kind>;

    /// Internal name of the class.
    fn class_name() -> &'static str {
        Self::lazy_binding().decl().name()
    }

    /// The class's binding, resolving it on first use.
    fn binding<R>(rt: &mut R) -> Result<&'static ClassBinding<Self::Kind>>
    where
        R: Runtime<Kind = Self::Kind>,
    {
        Self::lazy_binding().get(rt)
    }
}
