//! Function-type canonicalization (spec component C14).
//!
//! Two `FunctionType`s are equal iff their param and result sequences are
//! elementwise equal. The `TypeStore` interns them once per `Store` so that
//! the equality check `call_indirect` needs at every indirect call site
//! becomes a `Handle` compare (index + generation) instead of a sequence
//! compare.

use std::collections::HashMap;
use wasmrt_abi::ValueKind;

use crate::store::Arena;
use wasmrt_abi::Handle;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionType {
    pub params: Vec<ValueKind>,
    pub results: Vec<ValueKind>,
}

impl FunctionType {
    pub fn new(params: Vec<ValueKind>, results: Vec<ValueKind>) -> Self {
        Self { params, results }
    }

    /// Sum of parameter slot widths; precomputed once by the `TypeStore` and
    /// cached on the interned entry so call sites never recompute it.
    pub fn param_stack_size(&self) -> usize {
        self.params.iter().map(|k| k.slot_width()).sum()
    }

    pub fn result_stack_size(&self) -> usize {
        self.results.iter().map(|k| k.slot_width()).sum()
    }
}

/// Tag type used only to parameterize `Handle<FunctionType>`; the store
/// arena holds the real `FunctionType` values.
pub type FuncTypeHandle = Handle<FunctionType>;

#[derive(Debug, Default)]
pub struct TypeStore {
    arena: Arena<FunctionType>,
    interned: HashMap<FunctionType, FuncTypeHandle>,
}

impl TypeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `ty`, returning the canonical handle. Calling this twice with
    /// structurally-equal types returns the same handle, making
    /// `call_indirect`'s type check an O(1) `Handle` compare.
    pub fn intern(&mut self, ty: FunctionType) -> FuncTypeHandle {
        if let Some(&handle) = self.interned.get(&ty) {
            return handle;
        }
        let handle = self.arena.insert(ty.clone());
        self.interned.insert(ty, handle);
        handle
    }

    pub fn get(&self, handle: FuncTypeHandle) -> &FunctionType {
        self.arena.get(handle).expect("dangling FuncTypeHandle")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structurally_equal_types_canonicalize() {
        let mut store = TypeStore::new();
        let a = store.intern(FunctionType::new(vec![ValueKind::I32], vec![ValueKind::I32]));
        let b = store.intern(FunctionType::new(vec![ValueKind::I32], vec![ValueKind::I32]));
        assert_eq!(a, b);
        let c = store.intern(FunctionType::new(vec![ValueKind::I64], vec![ValueKind::I32]));
        assert_ne!(a, c);
    }
}
