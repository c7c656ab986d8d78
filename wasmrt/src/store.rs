//! The store (spec component C10): the process-wide owner of every
//! externally observable runtime object. Destroying a `Store` destroys
//! everything it owns; a `Handle<T>` is only ever valid for the `Store`
//! (and specifically the `Arena<T>`) that produced it.

use std::rc::Rc;

use wasmrt_abi::Handle;

use crate::function::FuncData;
use crate::global::Global;
use crate::instance::Instance;
use crate::memory::Memory;
use crate::module::Module;
use crate::table::Table;
use crate::tag::Tag;
use crate::types::TypeStore;

/// A generation-checked, free-list-backed arena. This is the Rust rendering
/// of the "arena on the Store, indices instead of pointers" redesign note:
/// raw `Object*`/back-pointers become `Handle<T>` lookups here.
#[derive(Debug)]
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
}

#[derive(Debug)]
enum Slot<T> {
    Occupied { value: T, generation: u32 },
    Vacant { generation: u32 },
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, value: T) -> Handle<T> {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            let generation = match *slot {
                Slot::Vacant { generation } => generation,
                Slot::Occupied { .. } => unreachable!("free list pointed at occupied slot"),
            };
            *slot = Slot::Occupied { value, generation };
            Handle::new(index, generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot::Occupied {
                value,
                generation: 0,
            });
            Handle::new(index, 0)
        }
    }

    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        match self.slots.get(handle.index() as usize)? {
            Slot::Occupied { value, generation } if *generation == handle.generation() => {
                Some(value)
            }
            _ => None,
        }
    }

    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        match self.slots.get_mut(handle.index() as usize)? {
            Slot::Occupied { value, generation } if *generation == handle.generation() => {
                Some(value)
            }
            _ => None,
        }
    }

    pub fn remove(&mut self, handle: Handle<T>) -> Option<T> {
        let slot = self.slots.get_mut(handle.index() as usize)?;
        if matches!(slot, Slot::Occupied { generation, .. } if *generation == handle.generation())
        {
            let Slot::Occupied { value, generation } =
                std::mem::replace(slot, Slot::Vacant { generation: 0 })
            else {
                unreachable!()
            };
            *slot = Slot::Vacant {
                generation: generation.wrapping_add(1),
            };
            self.free.push(handle.index());
            Some(value)
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mutable access to two distinct slots at once, for ops like
    /// `table.copy`/`memory.copy` that straddle two different objects in
    /// the same arena -- a plain `get_mut` twice won't borrow-check since
    /// both calls take `&mut self`.
    pub fn get_disjoint_mut(&mut self, a: Handle<T>, b: Handle<T>) -> (&mut T, &mut T) {
        assert_ne!(
            a.index(),
            b.index(),
            "get_disjoint_mut requires distinct handles"
        );
        let (lo, hi) = if a.index() < b.index() { (a, b) } else { (b, a) };
        let (left, right) = self.slots.split_at_mut(hi.index() as usize);
        let lo_value = match &mut left[lo.index() as usize] {
            Slot::Occupied { value, generation } if *generation == lo.generation() => value,
            _ => panic!("dangling handle in get_disjoint_mut"),
        };
        let hi_value = match &mut right[0] {
            Slot::Occupied { value, generation } if *generation == hi.generation() => value,
            _ => panic!("dangling handle in get_disjoint_mut"),
        };
        if a.index() < b.index() {
            (lo_value, hi_value)
        } else {
            (hi_value, lo_value)
        }
    }
}

/// A host-supplied opaque value behind an `externref`. The core engine never
/// interprets the payload -- it only moves the handle around -- so a u64
/// host-chosen token is enough; a host embedding that needs richer data
/// keeps its own side table keyed by that token.
#[derive(Debug, Clone, Copy)]
pub struct ExternObjData(pub u64);

/// The process-wide owner of every `Module`, `Instance`-local object, and
/// the canonical function-type table. A `Store` is `!Sync`: no locking is
/// used anywhere in the core (spec §5), all mutation happens on the single
/// executing thread.
#[derive(Debug, Default)]
pub struct Store {
    pub(crate) modules: Arena<Rc<Module>>,
    pub(crate) instances: Arena<Instance>,
    pub(crate) memories: Arena<Memory>,
    pub(crate) tables: Arena<Table>,
    pub(crate) globals: Arena<Global>,
    pub(crate) tags: Arena<Tag>,
    pub(crate) funcs: Arena<FuncData>,
    pub(crate) externs: Arena<ExternObjData>,
    pub(crate) types: TypeStore,
    stack_limit: std::cell::Cell<usize>,
    call_depth: std::cell::Cell<usize>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn types(&mut self) -> &mut TypeStore {
        &mut self.types
    }

    /// `Module`s are reference-counted rather than stored by value: the
    /// executor needs to hold a module's code and type table alive while it
    /// independently borrows `store.memories`/`store.tables`/etc. across a
    /// recursive call, which a borrow straight out of `self.modules` cannot
    /// do without tying that borrow's lifetime to all of `Store`.
    pub fn register_module(&mut self, module: Module) -> Handle<Module> {
        let inner = self.modules.insert(Rc::new(module));
        Handle::new(inner.index(), inner.generation())
    }

    pub fn module(&self, handle: Handle<Module>) -> Rc<Module> {
        let inner: Handle<Rc<Module>> = Handle::new(handle.index(), handle.generation());
        Rc::clone(self.modules.get(inner).expect("dangling Module handle"))
    }

    pub fn register_instance(&mut self, instance: Instance) -> Handle<Instance> {
        self.instances.insert(instance)
    }

    pub fn instance(&self, handle: Handle<Instance>) -> &Instance {
        self.instances.get(handle).expect("dangling Instance handle")
    }

    pub fn instance_mut(&mut self, handle: Handle<Instance>) -> &mut Instance {
        self.instances
            .get_mut(handle)
            .expect("dangling Instance handle")
    }

    pub fn create_extern(&mut self, token: u64) -> Handle<wasmrt_abi::ExternObj> {
        let inner = self.externs.insert(ExternObjData(token));
        Handle::new(inner.index(), inner.generation())
    }

    pub fn extern_token(&self, handle: Handle<wasmrt_abi::ExternObj>) -> u64 {
        let inner: Handle<ExternObjData> = Handle::new(handle.index(), handle.generation());
        self.externs
            .get(inner)
            .expect("dangling ExternObj handle")
            .0
    }

    /// Native-stack exhaustion threshold, established once per host thread
    /// at the outermost `Trap::run` (spec §5, "Stack"). Measured in call
    /// frames rather than bytes, since Rust frames are heap-backed here
    /// (see `crate::frame`).
    pub fn set_stack_limit(&self, frames: usize) {
        self.stack_limit.set(frames);
    }

    pub fn stack_limit(&self) -> usize {
        let limit = self.stack_limit.get();
        if limit == 0 {
            4096
        } else {
            limit
        }
    }

    /// Enters one call frame, tripping `CallStackExhausted` instead of
    /// overflowing the host's own native stack. Returns a guard that
    /// restores the depth counter on drop, including on the unwind path
    /// (a `?`-propagated trap still runs destructors).
    pub(crate) fn enter_call(&self) -> Result<CallDepthGuard<'_>, wasmrt_abi::Trap> {
        let depth = self.call_depth.get();
        if depth >= self.stack_limit() {
            return Err(wasmrt_abi::Trap::new(wasmrt_abi::TrapKind::CallStackExhausted));
        }
        self.call_depth.set(depth + 1);
        Ok(CallDepthGuard { store: self })
    }
}

pub(crate) struct CallDepthGuard<'a> {
    store: &'a Store,
}

impl Drop for CallDepthGuard<'_> {
    fn drop(&mut self) {
        let depth = self.store.call_depth.get();
        self.store.call_depth.set(depth - 1);
    }
}
