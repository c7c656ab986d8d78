//! Tables (spec component C3): a bounds-checked array of `funcref` or
//! `externref` slots. Every slot holds either the null sentinel or a
//! reference of the table's declared element kind -- that invariant is
//! upheld by construction here; the byte-code verifier is responsible for
//! never emitting a `table.set` of the wrong kind (this engine still
//! accepts a kind tag on `set` so a bug upstream traps instead of silently
//! corrupting the table).

use wasmrt_abi::{Trap, TrapKind, Value, ValueKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableElementKind {
    FuncRef,
    ExternRef,
}

impl TableElementKind {
    pub fn value_kind(self) -> ValueKind {
        match self {
            TableElementKind::FuncRef => ValueKind::FuncRef,
            TableElementKind::ExternRef => ValueKind::ExternRef,
        }
    }
}

#[derive(Debug)]
pub struct Table {
    element_kind: TableElementKind,
    elements: Vec<Value>,
    maximum_size: u32,
}

impl Table {
    pub fn create(element_kind: TableElementKind, initial_size: u32, maximum_size: u32) -> Table {
        let null = Value::default_for_kind(element_kind.value_kind());
        Table {
            element_kind,
            elements: vec![null; initial_size as usize],
            maximum_size,
        }
    }

    pub fn element_kind(&self) -> TableElementKind {
        self.element_kind
    }

    pub fn size(&self) -> u32 {
        self.elements.len() as u32
    }

    pub fn maximum_size(&self) -> u32 {
        self.maximum_size
    }

    pub fn get(&self, index: u32) -> Result<Value, Trap> {
        self.elements
            .get(index as usize)
            .cloned()
            .ok_or_else(|| Trap::new(TrapKind::OutOfBoundsTableAccess))
    }

    pub fn set(&mut self, index: u32, value: Value) -> Result<(), Trap> {
        if value.kind() != self.element_kind.value_kind() {
            return Err(Trap::new(TrapKind::TypeMismatch));
        }
        let slot = self
            .elements
            .get_mut(index as usize)
            .ok_or_else(|| Trap::new(TrapKind::OutOfBoundsTableAccess))?;
        *slot = value;
        Ok(())
    }

    /// Grows the table by appending `new_size - old_size` copies of
    /// `init_ref`, capped at `maximum_size`. Returns the old size, or
    /// `None` if the requested size would exceed the cap.
    pub fn grow(&mut self, new_size: u32, init_ref: Value) -> Option<u32> {
        if new_size > self.maximum_size || new_size < self.size() {
            return None;
        }
        let old_size = self.size();
        self.elements.resize(new_size as usize, init_ref);
        Some(old_size)
    }

    pub fn fill(&mut self, start: u32, value: Value, n: u32) -> Result<(), Trap> {
        let range = bounds(self.size(), start, n)?;
        for slot in &mut self.elements[range] {
            *slot = value.clone();
        }
        Ok(())
    }

    /// Intra-table or cross-table copy, overlap-safe when `self` and `src`
    /// are the same table (callers pass the same `&mut Table` twice via
    /// split borrows at the instance layer when tables differ).
    pub fn copy_within(&mut self, dst_start: u32, src_start: u32, n: u32) -> Result<(), Trap> {
        let dst_range = bounds(self.size(), dst_start, n)?;
        let src_range = bounds(self.size(), src_start, n)?;
        // Vec::copy_within doesn't support overlapping Clone types directly
        // for non-Copy elements, so stage through a temporary slice.
        let staged: Vec<Value> = self.elements[src_range].to_vec();
        self.elements[dst_range].clone_from_slice(&staged);
        Ok(())
    }

    pub fn copy_from(&mut self, dst_start: u32, src: &Table, src_start: u32, n: u32) -> Result<(), Trap> {
        let dst_range = bounds(self.size(), dst_start, n)?;
        let src_range = bounds(src.size(), src_start, n)?;
        self.elements[dst_range].clone_from_slice(&src.elements[src_range]);
        Ok(())
    }

    /// Materializes `n` already-resolved references from `src` (typically a
    /// slice produced by walking an `ElementSegment`'s function-index list
    /// through the owning `Instance`) into `self[dst_start..]`. The whole
    /// range is bounds-checked up front per the spec's `table.init`
    /// contract.
    pub fn init_from(&mut self, dst_start: u32, src: &[Value], src_start: u32, n: u32) -> Result<(), Trap> {
        let dst_range = bounds(self.size(), dst_start, n)?;
        let src_range = bounds(src.len() as u32, src_start, n)?;
        self.elements[dst_range].clone_from_slice(&src[src_range]);
        Ok(())
    }
}

fn bounds(len: u32, start: u32, n: u32) -> Result<std::ops::Range<usize>, Trap> {
    let end = start
        .checked_add(n)
        .ok_or_else(|| Trap::new(TrapKind::OutOfBoundsTableAccess))?;
    if end > len {
        return Err(Trap::new(TrapKind::OutOfBoundsTableAccess));
    }
    Ok(start as usize..end as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_set_round_trip() {
        let mut t = Table::create(TableElementKind::FuncRef, 4, 4);
        assert_eq!(t.get(0).unwrap(), Value::FuncRef(None));
        t.set(1, Value::FuncRef(None)).unwrap();
        assert!(t.get(10).is_err());
    }

    #[test]
    fn set_wrong_kind_traps() {
        let mut t = Table::create(TableElementKind::FuncRef, 4, 4);
        let err = t.set(0, Value::ExternRef(None)).unwrap_err();
        assert_eq!(err.kind, TrapKind::TypeMismatch);
    }

    #[test]
    fn grow_caps_at_maximum() {
        let mut t = Table::create(TableElementKind::FuncRef, 1, 2);
        assert_eq!(t.grow(2, Value::FuncRef(None)), Some(1));
        assert_eq!(t.grow(3, Value::FuncRef(None)), None);
    }

    #[test]
    fn init_checks_whole_range_first() {
        let mut t = Table::create(TableElementKind::FuncRef, 2, 2);
        let src = vec![Value::FuncRef(None)];
        assert!(t.init_from(0, &src, 0, 5).is_err());
    }
}
