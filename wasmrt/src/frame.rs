//! Per-call stack frames (spec component C11's slot layout).
//!
//! There is no value stack: each function's bytecode addresses a flat byte
//! buffer by offset, and `required_stack_size` (computed once, at module
//! load) is fixed for the lifetime of the call. A `Frame` is exactly that
//! buffer plus the active exception-handler stack used by `try_table`, and
//! -- unlike the teacher's name-keyed `Frame` with its per-type `HashMap`
//! locals -- it is never store-owned: it lives purely on the executor's own
//! Rust call stack/heap, so holding `&mut Frame` across a recursive call
//! never competes with a borrow of `Store`.
//!
//! Most wasm functions need only a few dozen bytes of scratch space, so the
//! buffer is a `SmallVec` that stays inline until a frame's computed size
//! exceeds the inline threshold, at which point it spills to the heap --
//! the same inline-then-heap-spill shape used for call argument buffers in
//! the JIT-adjacent host-embedding crates in this corpus.

use smallvec::SmallVec;

use wasmrt_abi::{Value, ValueKind};

/// Frames up to this many bytes live inline in the `Frame` itself; larger
/// ones spill onto the heap automatically via `SmallVec`'s own growth.
pub const INLINE_FRAME_BYTES: usize = 64;

#[derive(Debug)]
pub struct Frame {
    bytes: SmallVec<[u8; INLINE_FRAME_BYTES]>,
    handlers: Vec<ActiveHandler>,
}

/// One live `try_table` region: which catch clauses apply while control is
/// inside this region, keyed by instruction index so the dispatch loop can
/// binary-search-free linear scan the (small) active list on `Unwind`.
#[derive(Debug, Clone, Copy)]
pub struct ActiveHandler {
    pub handler_index: u32,
}

impl Frame {
    pub fn new(size_in_bytes: u32) -> Self {
        Self {
            bytes: smallvec::smallvec![0u8; size_in_bytes as usize],
            handlers: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn push_handler(&mut self, handler_index: u32) {
        self.handlers.push(ActiveHandler { handler_index });
    }

    pub fn pop_handler(&mut self) {
        self.handlers.pop();
    }

    pub fn active_handlers(&self) -> &[ActiveHandler] {
        &self.handlers
    }

    pub fn read(&self, kind: ValueKind, offset: u32) -> Value {
        let offset = offset as usize;
        let width = kind.slot_width();
        Value::read_from_slot(kind, &self.bytes[offset..offset + width])
    }

    pub fn write(&mut self, offset: u32, value: &Value) {
        let offset = offset as usize;
        let width = value.kind().slot_width();
        value.write_to_slot(&mut self.bytes[offset..offset + width]);
    }

    /// Raw byte access, used to copy payload bytes for `throw`/`catch`
    /// without knowing their value kinds (the tag's parameter types give
    /// the kinds on the catching side, not the throwing side's frame).
    pub fn raw(&self, offset: u32, width: usize) -> &[u8] {
        let offset = offset as usize;
        &self.bytes[offset..offset + width]
    }

    pub fn raw_mut(&mut self, offset: u32, width: usize) -> &mut [u8] {
        let offset = offset as usize;
        &mut self.bytes[offset..offset + width]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_write_round_trip() {
        let mut f = Frame::new(16);
        f.write(0, &Value::I32(42));
        f.write(4, &Value::F64(1.5));
        assert_eq!(f.read(ValueKind::I32, 0), Value::I32(42));
        assert_eq!(f.read(ValueKind::F64, 4), Value::F64(1.5));
    }

    #[test]
    fn large_frame_spills_past_inline_capacity() {
        let f = Frame::new(4096);
        assert_eq!(f.len(), 4096);
    }

    #[test]
    fn handler_stack_is_lifo() {
        let mut f = Frame::new(0);
        f.push_handler(1);
        f.push_handler(2);
        assert_eq!(f.active_handlers().len(), 2);
        f.pop_handler();
        assert_eq!(f.active_handlers()[0].handler_index, 1);
    }
}
