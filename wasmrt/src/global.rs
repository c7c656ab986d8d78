//! Globals (spec component C4): a single mutable or immutable value cell.

use wasmrt_abi::{Trap, TrapKind, Value, ValueKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutableType {
    pub kind: ValueKind,
    pub mutable: bool,
}

#[derive(Debug)]
pub struct Global {
    ty: MutableType,
    value: Value,
}

impl Global {
    pub fn new(ty: MutableType, value: Value) -> Self {
        debug_assert_eq!(value.kind(), ty.kind);
        Self { ty, value }
    }

    pub fn ty(&self) -> MutableType {
        self.ty
    }

    pub fn get(&self) -> Value {
        self.value.clone()
    }

    /// Permitted only if the cell is mutable and `value`'s kind matches the
    /// declared kind; otherwise a `type mismatch` trap, matching the
    /// engine's "strictly forbids mixing kinds" rule.
    pub fn set(&mut self, value: Value) -> Result<(), Trap> {
        if !self.ty.mutable || value.kind() != self.ty.kind {
            return Err(Trap::new(TrapKind::TypeMismatch));
        }
        self.value = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immutable_set_traps() {
        let mut g = Global::new(
            MutableType {
                kind: ValueKind::I32,
                mutable: false,
            },
            Value::I32(1),
        );
        assert!(g.set(Value::I32(2)).is_err());
    }

    #[test]
    fn kind_mismatch_traps() {
        let mut g = Global::new(
            MutableType {
                kind: ValueKind::I32,
                mutable: true,
            },
            Value::I32(1),
        );
        assert!(g.set(Value::F32(2.0)).is_err());
        assert!(g.set(Value::I32(2)).is_ok());
        assert_eq!(g.get(), Value::I32(2));
    }
}
