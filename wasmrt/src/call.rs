//! Call protocol glue (spec component C12): the single place a caller, host
//! or bytecode alike, invokes a `Handle<FuncData>` with a slice of
//! argument values and gets back results or an `Unwind`.
//!
//! Every recursive call -- direct, indirect, or re-entrant host-to-wasm --
//! funnels through `call_function`, so the stack-depth guard and the
//! defined/imported dispatch only need to live in one place.

use wasmrt_abi::{Handle, Value};

use crate::exception::Unwind;
use crate::function::FuncData;
use crate::store::Store;

pub fn call_function(
    store: &mut Store,
    func: Handle<FuncData>,
    args: &[Value],
) -> Result<Vec<Value>, Unwind> {
    let _guard = store.enter_call()?;

    // Clone just enough out of the `funcs` arena to drop its borrow before
    // re-entering `store` mutably -- an `Rc` clone for the module (cheap,
    // no lifetime tie) and a callback `Rc` clone for host imports.
    enum Resolved {
        Defined {
            instance: Handle<crate::instance::Instance>,
            local_index: u32,
        },
        Imported(crate::function::HostFunc),
    }

    let resolved = match store.funcs.get(func).expect("dangling func handle") {
        FuncData::Defined {
            instance,
            local_index,
        } => Resolved::Defined {
            instance: *instance,
            local_index: *local_index,
        },
        FuncData::Imported { callback, .. } => Resolved::Imported(callback.clone()),
    };

    match resolved {
        Resolved::Imported(callback) => callback(store, args),
        Resolved::Defined {
            instance,
            local_index,
        } => {
            let module = store.instance(instance).module.clone();
            match module.funcs[local_index as usize].jit.clone() {
                Some(entry) => entry.call(store, args),
                None => crate::exec::run_function(store, instance, &module, local_index, args),
            }
        }
    }
}

/// Resolves and invokes an indirect call: `table[index]` must hold a live
/// `funcref` whose type matches `expected_ty` exactly (by canonicalized
/// handle, not structurally), per spec's `call_indirect` contract.
pub fn call_indirect(
    store: &mut Store,
    table: Handle<crate::table::Table>,
    index: u32,
    expected_ty: crate::types::FuncTypeHandle,
) -> Result<Handle<FuncData>, Unwind> {
    use crate::function::funcref_to_handle;
    use wasmrt_abi::{Trap, TrapKind};

    let value = store
        .tables
        .get(table)
        .expect("dangling table handle")
        .get(index)
        .map_err(|_| Trap::new(TrapKind::UndefinedElement(index)))?;

    let func_ref = value.unwrap_func_ref().ok_or_else(|| {
        Unwind::from(Trap::new(TrapKind::UninitializedElement(index)))
    })?;
    let func = funcref_to_handle(func_ref);

    let actual_ty = match store.funcs.get(func).expect("dangling func handle") {
        FuncData::Defined {
            instance,
            local_index,
        } => store.instance(*instance).module.funcs[*local_index as usize].ty,
        FuncData::Imported { ty, .. } => *ty,
    };

    if actual_ty != expected_ty {
        return Err(Trap::new(TrapKind::IndirectCallTypeMismatch).into());
    }

    Ok(func)
}
