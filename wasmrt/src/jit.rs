//! JIT interface shim (spec component C13): the boundary between the call
//! protocol (C12) and an ahead-of-instantiation code generator.
//!
//! The code generator itself is an external collaborator (the same
//! relationship `subset_julia_vm_runtime` has with the AoT compiler that
//! targets it) -- this module only fixes the contract a compiled entry
//! point must honor to be callable exactly like the interpreter: same
//! argument/result shape, same trap taxonomy, same `Store` borrow
//! discipline. There is no code generator behind `JitCode` here, only the
//! shim a future one would plug into.

use std::fmt;
use std::rc::Rc;

use wasmrt_abi::{Trap, TrapKind, Value};

use crate::exception::Unwind;
use crate::store::Store;

/// A compiled entry point for one `ModuleFunction`. Implementors receive the
/// same `(&mut Store, args)` shape `call_function` gives the interpreter and
/// must return the same `Result<Vec<Value>, Unwind>` -- from the call
/// protocol's point of view a `JitCode` and the interpreter are
/// interchangeable.
///
/// `JitCode: fmt::Debug` so `Rc<dyn JitCode>` can sit in `ModuleFunction`
/// without a hand-written `Debug` impl for the whole struct.
pub trait JitCode: fmt::Debug {
    fn call(&self, store: &mut Store, args: &[Value]) -> Result<Vec<Value>, Unwind>;
}

/// `Rc`, not `Box`: the same clone-out-of-the-arena-before-reentering
/// discipline `HostFunc` uses applies here too, since a `ModuleFunction` is
/// reached through a `Handle<Instance>` borrow of `store` that must be
/// dropped before the compiled entry point gets its own `&mut Store`.
pub type JitEntry = Rc<dyn JitCode>;

/// Reason a compiled entry point could not run. Translated into the C8 trap
/// taxonomy at the call site so callers never need to know whether a
/// function ran interpreted or compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JitError {
    /// The backend produced no usable code for this function (e.g. an
    /// opcode it doesn't support yet). A `ModuleFunction` with no working
    /// compiled entry should simply leave `jit` as `None` rather than
    /// return this at call time -- unlike the interpreter, there is no
    /// per-call fallback path, since re-running a function that may have
    /// already had side effects is not safe.
    Unsupported,
    /// The compiled code signaled an internal fault that doesn't map to any
    /// other trap kind.
    CodegenFault,
}

impl From<JitError> for Unwind {
    fn from(err: JitError) -> Self {
        let kind = match err {
            JitError::Unsupported => TrapKind::UnreachableExecuted,
            JitError::CodegenFault => TrapKind::UnreachableExecuted,
        };
        Unwind::Trap(Trap::new(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct AlwaysUnsupported;

    impl JitCode for AlwaysUnsupported {
        fn call(&self, _store: &mut Store, _args: &[Value]) -> Result<Vec<Value>, Unwind> {
            Err(JitError::Unsupported.into())
        }
    }

    #[test]
    fn jit_error_maps_into_a_trap() {
        let entry: JitEntry = Rc::new(AlwaysUnsupported);
        let mut store = Store::new();
        let err = entry.call(&mut store, &[]).unwrap_err();
        assert!(matches!(err, Unwind::Trap(_)));
    }
}
