//! Functions (spec component C6): either wasm bytecode belonging to some
//! instance, or a host callback supplied at instantiation time.

use std::fmt;
use std::rc::Rc;

use wasmrt_abi::{Handle, Value};

use crate::exception::Unwind;
use crate::instance::Instance;
use crate::store::Store;
use crate::types::FuncTypeHandle;

/// A host function is `Rc<dyn Fn>` rather than `Box<dyn Fn>` so the
/// dispatch loop can clone the callback out of the `funcs` arena, drop the
/// borrow on `store.funcs`, and only then invoke it with `&mut Store` --
/// the same clone-before-reenter discipline used for imported closures
/// throughout this engine to sidestep re-borrowing `Store` while it is
/// already mutably borrowed.
pub type HostFunc = Rc<dyn Fn(&mut Store, &[Value]) -> Result<Vec<Value>, Unwind>>;

#[derive(Clone)]
pub enum FuncData {
    /// A function defined by a wasm module, scoped to one instance of it.
    /// `local_index` indexes `instance.module().funcs`, i.e. it excludes
    /// imported functions -- the combined import+defined index space only
    /// exists at the `Instance::funcs` resolution layer.
    Defined {
        instance: Handle<Instance>,
        local_index: u32,
    },
    Imported { ty: FuncTypeHandle, callback: HostFunc },
}

/// `Value::FuncRef` carries a `Handle<wasmrt_abi::FuncObj>` (an ABI-level
/// marker type so `wasmrt-abi` doesn't need to know about `FuncData`).
/// Handles only compare index/generation, so the conversion is a relabel.
pub fn handle_to_funcref(h: Handle<FuncData>) -> Handle<wasmrt_abi::FuncObj> {
    Handle::new(h.index(), h.generation())
}

pub fn funcref_to_handle(h: Handle<wasmrt_abi::FuncObj>) -> Handle<FuncData> {
    Handle::new(h.index(), h.generation())
}

impl fmt::Debug for FuncData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FuncData::Defined {
                instance,
                local_index,
            } => f
                .debug_struct("FuncData::Defined")
                .field("instance", instance)
                .field("local_index", local_index)
                .finish(),
            FuncData::Imported { ty, .. } => f
                .debug_struct("FuncData::Imported")
                .field("ty", ty)
                .finish(),
        }
    }
}
