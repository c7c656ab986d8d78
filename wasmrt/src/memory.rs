//! Linear memory (spec component C2).
//!
//! One contiguous, zero-initialized byte buffer per `memory` declaration.
//! Every accessor takes an effective address as `addr + offset` and traps
//! `out_of_bounds_memory_access` rather than panicking: validation is
//! assumed to have checked opcode shapes, but bounds are a runtime property
//! of `addr`, which is never known until the whole function has run.

use wasmrt_abi::{Trap, TrapKind};

pub const PAGE_SIZE: u64 = 65536;

#[derive(Debug)]
pub struct Memory {
    buffer: Vec<u8>,
    maximum_bytes: u64,
    is_shared: bool,
}

impl Memory {
    /// Allocates a zero-filled buffer of `initial_bytes`. `initial_bytes`
    /// and `maximum_bytes` are assumed to already be page-aligned (the
    /// validator's job upstream of this engine).
    pub fn create(initial_bytes: u64, maximum_bytes: u64, is_shared: bool) -> Result<Memory, Trap> {
        let len = usize::try_from(initial_bytes).map_err(|_| Trap::new(TrapKind::OutOfMemory))?;
        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(len)
            .map_err(|_| Trap::new(TrapKind::OutOfMemory))?;
        buffer.resize(len, 0);
        Ok(Memory {
            buffer,
            maximum_bytes,
            is_shared,
        })
    }

    pub fn size_in_bytes(&self) -> u64 {
        self.buffer.len() as u64
    }

    pub fn size_in_pages(&self) -> u64 {
        self.size_in_bytes() / PAGE_SIZE
    }

    pub fn maximum_bytes(&self) -> u64 {
        self.maximum_bytes
    }

    pub fn is_shared(&self) -> bool {
        self.is_shared
    }

    pub fn data(&self) -> &[u8] {
        &self.buffer
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.buffer
    }

    fn effective_range(&self, addr: u64, offset: u64, width: u64) -> Result<std::ops::Range<usize>, Trap> {
        let start = addr
            .checked_add(offset)
            .ok_or_else(|| Trap::new(TrapKind::OutOfBoundsMemoryAccess))?;
        let end = start
            .checked_add(width)
            .ok_or_else(|| Trap::new(TrapKind::OutOfBoundsMemoryAccess))?;
        if end > self.size_in_bytes() {
            return Err(Trap::new(TrapKind::OutOfBoundsMemoryAccess));
        }
        Ok(start as usize..end as usize)
    }

    /// Reads `out.len()` bytes starting at `addr + offset`, little-endian
    /// on the wire regardless of host endianness (the caller is expected to
    /// interpret `out` accordingly; on a big-endian host the bytes would be
    /// swapped here, but this crate only targets little-endian hosts).
    pub fn load(&self, addr: u64, offset: u64, out: &mut [u8]) -> Result<(), Trap> {
        let range = self.effective_range(addr, offset, out.len() as u64)?;
        out.copy_from_slice(&self.buffer[range]);
        Ok(())
    }

    pub fn store(&mut self, addr: u64, offset: u64, data: &[u8]) -> Result<(), Trap> {
        let range = self.effective_range(addr, offset, data.len() as u64)?;
        self.buffer[range].copy_from_slice(data);
        Ok(())
    }

    /// `delta_bytes` must be a multiple of `PAGE_SIZE`. Returns the old size
    /// in pages on success, `None` if growth would exceed `maximum_bytes` or
    /// reallocation fails -- the caller maps `None` to the `-1` sentinel.
    pub fn grow(&mut self, delta_bytes: u64) -> Option<u64> {
        debug_assert_eq!(delta_bytes % PAGE_SIZE, 0);
        let old_size = self.size_in_bytes();
        let new_size = old_size.checked_add(delta_bytes)?;
        if new_size > self.maximum_bytes {
            return None;
        }
        let new_len = usize::try_from(new_size).ok()?;
        if self.buffer.try_reserve_exact(new_len - self.buffer.len()).is_err() {
            return None;
        }
        self.buffer.resize(new_len, 0);
        Some(old_size / PAGE_SIZE)
    }

    /// Copies `n` bytes from `data[src_offset..]` into `self[dst_offset..]`.
    /// The whole range is bounds-checked before any byte is copied, so a
    /// trap never leaves a partial write behind.
    pub fn init(&mut self, data: &[u8], dst_offset: u64, src_offset: u64, n: u64) -> Result<(), Trap> {
        let src_end = src_offset
            .checked_add(n)
            .ok_or_else(|| Trap::new(TrapKind::OutOfBoundsMemoryAccess))?;
        if src_end > data.len() as u64 {
            return Err(Trap::new(TrapKind::OutOfBoundsMemoryAccess));
        }
        let dst_range = self.effective_range(dst_offset, 0, n)?;
        let src_range = src_offset as usize..src_end as usize;
        self.buffer[dst_range].copy_from_slice(&data[src_range]);
        Ok(())
    }

    /// Intra-memory `memmove`, overlap-safe.
    pub fn copy(&mut self, dst: u64, src: u64, n: u64) -> Result<(), Trap> {
        let dst_range = self.effective_range(dst, 0, n)?;
        let src_range = self.effective_range(src, 0, n)?;
        self.buffer.copy_within(src_range, dst_range.start);
        Ok(())
    }

    pub fn fill(&mut self, dst: u64, byte: u8, n: u64) -> Result<(), Trap> {
        let range = self.effective_range(dst, 0, n)?;
        self.buffer[range].fill(byte);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grow_preserves_contents_and_zeroes_new_bytes() {
        let mut m = Memory::create(PAGE_SIZE, PAGE_SIZE * 10, false).unwrap();
        m.store(0, 0, &[1, 2, 3, 4]).unwrap();
        let old_pages = m.grow(PAGE_SIZE * 3).unwrap();
        assert_eq!(old_pages, 1);
        assert_eq!(m.size_in_pages(), 4);
        let mut buf = [0u8; 4];
        m.load(0, 0, &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3, 4]);
        let mut tail = [0xffu8; 4];
        m.load(PAGE_SIZE, 0, &mut tail).unwrap();
        assert_eq!(tail, [0, 0, 0, 0]);
    }

    #[test]
    fn grow_beyond_maximum_fails_without_mutating() {
        let mut m = Memory::create(PAGE_SIZE, PAGE_SIZE * 2, false).unwrap();
        assert!(m.grow(PAGE_SIZE * 5).is_none());
        assert_eq!(m.size_in_pages(), 1);
    }

    #[test]
    fn fill_then_load_boundary() {
        let mut m = Memory::create(PAGE_SIZE * 3, PAGE_SIZE * 10, false).unwrap();
        m.fill(PAGE_SIZE, 0xab, PAGE_SIZE * 2).unwrap();
        let mut b = [0u8; 1];
        m.load(PAGE_SIZE, 0, &mut b).unwrap();
        assert_eq!(b[0], 0xab);
        m.load(PAGE_SIZE + PAGE_SIZE * 2 - 1, 0, &mut b).unwrap();
        assert_eq!(b[0], 0xab);
        let err = m.load(PAGE_SIZE + PAGE_SIZE * 2, 0, &mut b).unwrap_err();
        assert_eq!(err.kind, TrapKind::OutOfBoundsMemoryAccess);
    }

    #[test]
    fn copy_handles_overlap() {
        let mut m = Memory::create(PAGE_SIZE, PAGE_SIZE, false).unwrap();
        m.store(0, 0, &[1, 2, 3, 4, 5]).unwrap();
        m.copy(2, 0, 5).unwrap();
        let mut buf = [0u8; 5];
        m.load(2, 0, &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3, 4, 5]);
    }

    #[test]
    fn init_checks_whole_range_before_copying() {
        let mut m = Memory::create(PAGE_SIZE, PAGE_SIZE, false).unwrap();
        m.store(0, 0, &[9, 9, 9, 9]).unwrap();
        let data = [1u8, 2, 3];
        let err = m.init(&data, 0, 0, 10).unwrap_err();
        assert_eq!(err.kind, TrapKind::OutOfBoundsMemoryAccess);
        let mut buf = [0u8; 4];
        m.load(0, 0, &mut buf).unwrap();
        assert_eq!(buf, [9, 9, 9, 9], "failed init must not mutate memory");
    }
}
