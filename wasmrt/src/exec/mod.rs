//! The byte-code executor (spec component C11): a stack-allocated,
//! offset-addressed dispatch loop with no value stack, and the call
//! protocol glue that ties `Call`/`CallIndirect` back into
//! `crate::call::call_function`.
//!
//! Dispatch is a single `match` over `Instr` rather than computed goto:
//! Rust has no safe, stable equivalent of a computed-goto jump table, and a
//! `match` over a fieldless-enough enum compiles to a jump table anyway on
//! every target this crate cares about, so there is nothing to gain from
//! reaching for `unsafe` to hand-roll one.

pub mod numeric;
pub mod opcode;
pub mod simd;

use wasmrt_abi::{Handle, Trap, TrapKind, Value, ValueKind};

use crate::exception::{Exception, ExceptionFrame, Unwind};
use crate::frame::Frame;
use crate::function::{funcref_to_handle, FuncData};
use crate::instance::Instance;
use crate::module::{CatchClauseKind, ModuleFunction, Module};
use crate::store::Store;
use crate::tag::Tag;
use crate::types::FunctionType;
use opcode::{Instr, LoadKind, SimdShape, StoreKind};

enum StepResult {
    Next,
    Jump(i32),
    Return(Vec<Value>),
}

struct Executor<'s, 'm> {
    store: &'s mut Store,
    instance: Handle<Instance>,
    module: &'m Module,
    frame: Frame,
    pc: u32,
    exceptions: Vec<Exception>,
}

pub fn run_function(
    store: &mut Store,
    instance: Handle<Instance>,
    module: &Module,
    local_index: u32,
    args: &[Value],
) -> Result<Vec<Value>, Unwind> {
    let func = &module.funcs[local_index as usize];
    let ty = store.types.get(func.ty).clone();

    let mut frame = Frame::new(func.required_stack_size);
    let mut offset = 0u32;
    for (i, kind) in ty.params.iter().enumerate() {
        frame.write(offset, &args[i]);
        offset += kind.slot_width() as u32;
    }

    let mut executor = Executor {
        store,
        instance,
        module,
        frame,
        pc: 0,
        exceptions: Vec::new(),
    };
    executor.run(func, local_index, &ty)
}

impl<'s, 'm> Executor<'s, 'm> {
    fn run(
        &mut self,
        func: &ModuleFunction,
        local_index: u32,
        ty: &FunctionType,
    ) -> Result<Vec<Value>, Unwind> {
        loop {
            if self.pc as usize >= func.code.len() {
                return Ok(Vec::new());
            }
            let instr = func.code[self.pc as usize].clone();
            let outcome = self.step(&instr, ty);
            match outcome {
                Ok(StepResult::Next) => self.pc += 1,
                Ok(StepResult::Jump(delta)) => {
                    self.pc = (self.pc as i64 + delta as i64) as u32;
                }
                Ok(StepResult::Return(values)) => return Ok(values),
                Err(unwind) => match self.catch(func, unwind) {
                    Ok(target) => self.pc = target,
                    Err(unwind) => return Err(self.attribute_frame(unwind, local_index)),
                },
            }
        }
    }

    fn attribute_frame(&self, unwind: Unwind, function_index: u32) -> Unwind {
        match unwind {
            Unwind::Trap(t) => Unwind::Trap(t.with_frame(wasmrt_abi::trap::TrapFrame {
                function_index,
                program_counter: self.pc,
            })),
            Unwind::Exception(e) => Unwind::Exception(e.with_frame(ExceptionFrame {
                function_index,
                program_counter: self.pc,
            })),
        }
    }

    /// Scans this function's active `try_table` regions for a clause
    /// matching `unwind`, writes its payload, and returns the instruction
    /// index to resume at. Traps are never caught here (only `throw`-raised
    /// exceptions are): this is the entire "no native unwinding" unwind
    /// protocol for exceptions, a plain table scan instead of a stack walk.
    fn catch(&mut self, func: &ModuleFunction, unwind: Unwind) -> Result<u32, Unwind> {
        let exception = match unwind {
            Unwind::Exception(e) => e,
            trap @ Unwind::Trap(_) => return Err(trap),
        };

        for info in &func.catch_table {
            if self.pc < info.try_start || self.pc >= info.try_end {
                continue;
            }
            for clause in &info.clauses {
                match clause.kind {
                    CatchClauseKind::Catch { tag_index } => {
                        let tag_handle = self.instance().tags[tag_index as usize];
                        if tag_handle == exception.tag {
                            self.write_payload(tag_handle, &exception, clause.payload_dst);
                            return Ok(clause.target);
                        }
                    }
                    CatchClauseKind::CatchRef { tag_index } => {
                        let tag_handle = self.instance().tags[tag_index as usize];
                        if tag_handle == exception.tag {
                            self.write_payload(tag_handle, &exception, clause.payload_dst);
                            let exn_index = self.store_exception(exception.clone());
                            self.write_exnref(clause.payload_dst, exn_index);
                            return Ok(clause.target);
                        }
                    }
                    CatchClauseKind::CatchAll => return Ok(clause.target),
                    CatchClauseKind::CatchAllRef => {
                        let exn_index = self.store_exception(exception.clone());
                        self.write_exnref(clause.payload_dst, exn_index);
                        return Ok(clause.target);
                    }
                }
            }
        }
        Err(Unwind::Exception(exception))
    }

    fn instance(&self) -> &Instance {
        self.store.instance(self.instance)
    }

    fn write_payload(&mut self, tag_handle: Handle<Tag>, exception: &Exception, dst: u32) {
        let tag = self.store.tags.get(tag_handle).expect("dangling tag");
        let ty = self.store.types.get(tag.ty);
        let mut src_offset = 0usize;
        let mut dst_offset = dst;
        for kind in &ty.params {
            let width = kind.slot_width();
            let value = Value::read_from_slot(*kind, &exception.payload[src_offset..src_offset + width]);
            self.frame.write(dst_offset, &value);
            src_offset += width;
            dst_offset += width as u32;
        }
    }

    /// `exnref` has no `ValueKind` of its own in this engine (the spec's
    /// value model only defines `funcref`/`externref` as reference kinds),
    /// so a caught exnref is represented as a raw index into this call's
    /// exception table, good for `throw_ref` to rethrow but not otherwise
    /// inspectable as a `Value`.
    fn write_exnref(&mut self, dst: u32, exn_index: u32) {
        self.frame.raw_mut(dst, 4).copy_from_slice(&exn_index.to_le_bytes());
    }

    fn store_exception(&mut self, exception: Exception) -> u32 {
        self.exceptions.push(exception);
        (self.exceptions.len() - 1) as u32
    }

    fn step(&mut self, instr: &Instr, ty: &FunctionType) -> Result<StepResult, Unwind> {
        use Instr::*;
        match instr {
            Nop => Ok(StepResult::Next),
            Unreachable => Err(numeric::trap_unreachable()),

            Const32 { dst, value } => self.set(*dst, Value::I32(*value)),
            Const64 { dst, value } => self.set(*dst, Value::I64(*value)),
            Const128 { dst, value } => self.set(*dst, Value::V128(*value)),
            Move32 { dst, src } => self.copy_slot(*dst, *src, ValueKind::I32),
            Move64 { dst, src } => self.copy_slot(*dst, *src, ValueKind::I64),
            Move128 { dst, src } => self.copy_slot(*dst, *src, ValueKind::V128),

            Jump { target } => Ok(StepResult::Jump(*target)),
            JumpIfTrue { cond, target } => {
                if self.frame.read(ValueKind::I32, *cond).unwrap_i32() != 0 {
                    Ok(StepResult::Jump(*target))
                } else {
                    Ok(StepResult::Next)
                }
            }
            JumpIfFalse { cond, target } => {
                if self.frame.read(ValueKind::I32, *cond).unwrap_i32() == 0 {
                    Ok(StepResult::Jump(*target))
                } else {
                    Ok(StepResult::Next)
                }
            }
            BrTable { index, targets, default } => {
                let i = self.frame.read(ValueKind::I32, *index).unwrap_i32();
                let target = usize::try_from(i)
                    .ok()
                    .and_then(|i| targets.get(i))
                    .copied()
                    .unwrap_or(*default);
                Ok(StepResult::Jump(target))
            }
            Select { dst, cond, a, b, width } => {
                let kind = kind_for_width(*width);
                let chosen = if self.frame.read(ValueKind::I32, *cond).unwrap_i32() != 0 {
                    *a
                } else {
                    *b
                };
                self.copy_slot(*dst, chosen, kind)
            }
            Return { result_offsets } => {
                let mut values = Vec::with_capacity(result_offsets.len());
                for (offset, kind) in result_offsets.iter().zip(ty.results.iter()) {
                    values.push(self.frame.read(*kind, *offset));
                }
                Ok(StepResult::Return(values))
            }

            LocalTee { dst, src, width } => self.copy_slot(*dst, *src, kind_for_width(*width)),
            GlobalGet { dst, global_index, width } => {
                let handle = self.instance().globals[*global_index as usize];
                let value = self.store.globals.get(handle).expect("dangling global").get();
                debug_assert_eq!(width_for_kind(value.kind()), *width);
                self.set(*dst, value)
            }
            GlobalSet { global_index, src, width } => {
                let kind = kind_for_width(*width);
                let value = self.frame.read(kind, *src);
                let handle = self.instance().globals[*global_index as usize];
                self.store
                    .globals
                    .get_mut(handle)
                    .expect("dangling global")
                    .set(value)
                    .map_err(Unwind::from)?;
                Ok(StepResult::Next)
            }

            RefNull { dst, is_func } => {
                let value = if *is_func {
                    Value::FuncRef(None)
                } else {
                    Value::ExternRef(None)
                };
                self.set(*dst, value)
            }
            RefIsNull { dst, src, width } => {
                let kind = kind_for_width(*width);
                let is_null = match self.frame.read(kind, *src) {
                    Value::FuncRef(r) => r.is_none(),
                    Value::ExternRef(r) => r.is_none(),
                    _ => panic!("ref.is_null on a non-reference slot"),
                };
                self.set(*dst, Value::I32(is_null as i32))
            }
            RefFunc { dst, func_index } => {
                let handle = self.instance().funcs[*func_index as usize];
                self.set(*dst, Value::FuncRef(Some(crate::function::handle_to_funcref(handle))))
            }

            Load { dst, addr, offset, kind } => self.do_load(*dst, *addr, *offset, *kind),
            Store { addr, value, offset, kind } => self.do_store(*addr, *value, *offset, *kind),
            MemorySize { dst, memory_index } => {
                let handle = self.instance().memories[*memory_index as usize];
                let pages = self.store.memories.get(handle).expect("dangling memory").size_in_pages();
                self.set(*dst, Value::I32(pages as i32))
            }
            MemoryGrow { dst, memory_index, delta_pages } => {
                let handle = self.instance().memories[*memory_index as usize];
                let memory = self.store.memories.get_mut(handle).expect("dangling memory");
                let delta_bytes = *delta_pages as u64 * crate::memory::PAGE_SIZE;
                let result = memory.grow(delta_bytes).map(|old| old as i32).unwrap_or(-1);
                self.set(*dst, Value::I32(result))
            }
            MemoryInit { memory_index, data_index, dst, src, n } => {
                let memory_handle = self.instance().memories[*memory_index as usize];
                let n = self.frame.read(ValueKind::I32, *n).unwrap_i32() as u64;
                let src = self.frame.read(ValueKind::I32, *src).unwrap_i32() as u64;
                let dst = self.frame.read(ValueKind::I32, *dst).unwrap_i32() as u64;
                let data_index = *data_index;
                let instance_handle = self.instance;
                let bytes = self
                    .store
                    .instance(instance_handle)
                    .data_segments[data_index as usize]
                    .bytes()
                    .to_vec();
                self.store
                    .memories
                    .get_mut(memory_handle)
                    .expect("dangling memory")
                    .init(&bytes, dst, src, n)
                    .map_err(Unwind::from)?;
                Ok(StepResult::Next)
            }
            MemoryCopy { dst_memory, src_memory, dst, src, n } => {
                let n = self.frame.read(ValueKind::I32, *n).unwrap_i32() as u64;
                let src = self.frame.read(ValueKind::I32, *src).unwrap_i32() as u64;
                let dst = self.frame.read(ValueKind::I32, *dst).unwrap_i32() as u64;
                let dst_handle = self.instance().memories[*dst_memory as usize];
                let src_handle = self.instance().memories[*src_memory as usize];
                if dst_handle == src_handle {
                    self.store
                        .memories
                        .get_mut(dst_handle)
                        .expect("dangling memory")
                        .copy(dst, src, n)
                        .map_err(Unwind::from)?;
                } else {
                    let staged = {
                        let source = self.store.memories.get(src_handle).expect("dangling memory");
                        let start = src as usize;
                        let end = start + n as usize;
                        source
                            .data()
                            .get(start..end)
                            .ok_or_else(|| Trap::new(TrapKind::OutOfBoundsMemoryAccess))?
                            .to_vec()
                    };
                    self.store
                        .memories
                        .get_mut(dst_handle)
                        .expect("dangling memory")
                        .init(&staged, dst, 0, n)
                        .map_err(Unwind::from)?;
                }
                Ok(StepResult::Next)
            }
            MemoryFill { memory_index, dst, value, n } => {
                let n = self.frame.read(ValueKind::I32, *n).unwrap_i32() as u64;
                let value = self.frame.read(ValueKind::I32, *value).unwrap_i32() as u8;
                let dst = self.frame.read(ValueKind::I32, *dst).unwrap_i32() as u64;
                let handle = self.instance().memories[*memory_index as usize];
                self.store
                    .memories
                    .get_mut(handle)
                    .expect("dangling memory")
                    .fill(dst, value, n)
                    .map_err(Unwind::from)?;
                Ok(StepResult::Next)
            }
            DataDrop { data_index } => {
                let instance_handle = self.instance;
                self.store.instance_mut(instance_handle).data_segments[*data_index as usize].drop_segment();
                Ok(StepResult::Next)
            }

            TableGet { dst, table_index, index } => {
                let index = self.frame.read(ValueKind::I32, *index).unwrap_i32() as u32;
                let handle = self.instance().tables[*table_index as usize];
                let value = self
                    .store
                    .tables
                    .get(handle)
                    .expect("dangling table")
                    .get(index)
                    .map_err(Unwind::from)?;
                self.set(*dst, value)
            }
            TableSet { table_index, index, value } => {
                let index = self.frame.read(ValueKind::I32, *index).unwrap_i32() as u32;
                let handle = self.instance().tables[*table_index as usize];
                let kind = self
                    .store
                    .tables
                    .get(handle)
                    .expect("dangling table")
                    .element_kind()
                    .value_kind();
                let value = self.frame.read(kind, *value);
                self.store
                    .tables
                    .get_mut(handle)
                    .expect("dangling table")
                    .set(index, value)
                    .map_err(Unwind::from)?;
                Ok(StepResult::Next)
            }
            TableGrow { dst, table_index, new_size, init } => {
                let handle = self.instance().tables[*table_index as usize];
                let kind = self
                    .store
                    .tables
                    .get(handle)
                    .expect("dangling table")
                    .element_kind()
                    .value_kind();
                let init_value = self.frame.read(kind, *init);
                let new_size = self.frame.read(ValueKind::I32, *new_size).unwrap_i32() as u32;
                let result = self
                    .store
                    .tables
                    .get_mut(handle)
                    .expect("dangling table")
                    .grow(new_size, init_value)
                    .map(|old| old as i32)
                    .unwrap_or(-1);
                self.set(*dst, Value::I32(result))
            }
            TableSize { dst, table_index } => {
                let handle = self.instance().tables[*table_index as usize];
                let size = self.store.tables.get(handle).expect("dangling table").size();
                self.set(*dst, Value::I32(size as i32))
            }
            TableCopy { dst_table, src_table, dst, src, n } => {
                let n = self.frame.read(ValueKind::I32, *n).unwrap_i32() as u32;
                let src = self.frame.read(ValueKind::I32, *src).unwrap_i32() as u32;
                let dst = self.frame.read(ValueKind::I32, *dst).unwrap_i32() as u32;
                let dst_handle = self.instance().tables[*dst_table as usize];
                let src_handle = self.instance().tables[*src_table as usize];
                if dst_handle == src_handle {
                    self.store
                        .tables
                        .get_mut(dst_handle)
                        .expect("dangling table")
                        .copy_within(dst, src, n)
                        .map_err(Unwind::from)?;
                } else {
                    let (dst_slot, src_slot) = self.store.tables.get_disjoint_mut(dst_handle, src_handle);
                    dst_slot.copy_from(dst, src_slot, src, n).map_err(Unwind::from)?;
                }
                Ok(StepResult::Next)
            }
            TableFill { table_index, dst, value, n } => {
                let handle = self.instance().tables[*table_index as usize];
                let kind = self
                    .store
                    .tables
                    .get(handle)
                    .expect("dangling table")
                    .element_kind()
                    .value_kind();
                let value = self.frame.read(kind, *value);
                let n = self.frame.read(ValueKind::I32, *n).unwrap_i32() as u32;
                let dst = self.frame.read(ValueKind::I32, *dst).unwrap_i32() as u32;
                self.store
                    .tables
                    .get_mut(handle)
                    .expect("dangling table")
                    .fill(dst, value, n)
                    .map_err(Unwind::from)?;
                Ok(StepResult::Next)
            }
            TableInit { table_index, elem_index, dst, src, n } => {
                let n = self.frame.read(ValueKind::I32, *n).unwrap_i32() as u32;
                let src = self.frame.read(ValueKind::I32, *src).unwrap_i32() as u32;
                let dst = self.frame.read(ValueKind::I32, *dst).unwrap_i32() as u32;
                let table_handle = self.instance().tables[*table_index as usize];
                let elem_index = *elem_index;
                let instance_handle = self.instance;
                let resolved: Vec<Value> = self
                    .store
                    .instance(instance_handle)
                    .element_segments[elem_index as usize]
                    .elements()
                    .iter()
                    .map(|e| match e {
                        crate::segment::ElementExpr::RefFunc(i) => {
                            let fh = self.store.instance(instance_handle).funcs[*i as usize];
                            Value::FuncRef(Some(crate::function::handle_to_funcref(fh)))
                        }
                        crate::segment::ElementExpr::RefNull => Value::FuncRef(None),
                    })
                    .collect();
                self.store
                    .tables
                    .get_mut(table_handle)
                    .expect("dangling table")
                    .init_from(dst, &resolved, src, n)
                    .map_err(Unwind::from)?;
                Ok(StepResult::Next)
            }
            ElemDrop { elem_index } => {
                let instance_handle = self.instance;
                self.store.instance_mut(instance_handle).element_segments[*elem_index as usize]
                    .drop_segment();
                Ok(StepResult::Next)
            }

            Call { func_index, arg_offsets, result_offsets } => {
                self.do_call(*func_index, arg_offsets, result_offsets)
            }
            CallIndirect { table_index, type_index, index, arg_offsets, result_offsets } => {
                self.do_call_indirect(*table_index, *type_index, *index, arg_offsets, result_offsets)
            }

            Throw { tag_index, payload_offsets } => self.do_throw(*tag_index, payload_offsets),
            ThrowRef { exception } => {
                let mut bytes = [0u8; 4];
                bytes.copy_from_slice(self.frame.raw(*exception, 4));
                let index = u32::from_le_bytes(bytes) as usize;
                let exception = self.exceptions[index].clone();
                Err(Unwind::Exception(exception))
            }

            V128Splat { dst, src, shape } => self.do_simd_splat(*dst, *src, *shape),
            V128ExtractLaneInt { dst, src, shape, lane, signed } => {
                let v = self.frame.read(ValueKind::V128, *src).unwrap_v128();
                let r = simd::extract_lane_int(v, *shape, *lane, *signed);
                self.set(*dst, Value::I32(r))
            }
            V128ExtractLaneFloat { dst, src, shape, lane } => {
                let v = self.frame.read(ValueKind::V128, *src).unwrap_v128();
                let value = match shape {
                    SimdShape::F32x4 => Value::F32(simd::extract_lane_f32(v, *lane)),
                    SimdShape::F64x2 => Value::F64(simd::extract_lane_f64(v, *lane)),
                    _ => panic!("v128.extract_lane_float with non-float shape"),
                };
                self.set(*dst, value)
            }
            V128ReplaceLane { dst, vector, value, shape, lane } => {
                let v = self.frame.read(ValueKind::V128, *vector).unwrap_v128();
                let r = match shape {
                    SimdShape::I8x16 | SimdShape::I16x8 | SimdShape::I32x4 => {
                        let x = self.frame.read(ValueKind::I32, *value).unwrap_i32();
                        simd::replace_lane_i32(v, *shape, *lane, x)
                    }
                    SimdShape::I64x2 => {
                        let x = self.frame.read(ValueKind::I64, *value).unwrap_i64();
                        simd::replace_lane_i64(v, *lane, x)
                    }
                    SimdShape::F32x4 => {
                        let x = self.frame.read(ValueKind::F32, *value).unwrap_f32();
                        simd::replace_lane_f32(v, *lane, x)
                    }
                    SimdShape::F64x2 => {
                        let x = self.frame.read(ValueKind::F64, *value).unwrap_f64();
                        simd::replace_lane_f64(v, *lane, x)
                    }
                };
                self.set(*dst, Value::V128(r))
            }
            V128AnyTrue { dst, src } => {
                let v = self.frame.read(ValueKind::V128, *src).unwrap_v128();
                self.set(*dst, Value::I32(simd::any_true(v) as i32))
            }
            V128AllTrue { dst, src, shape } => {
                let v = self.frame.read(ValueKind::V128, *src).unwrap_v128();
                self.set(*dst, Value::I32(simd::all_true(v, *shape) as i32))
            }
            V128Not { dst, src } => {
                let v = self.frame.read(ValueKind::V128, *src).unwrap_v128();
                self.set(*dst, Value::V128(!v))
            }
            V128And { dst, a, b } => self.simd_bitwise(*dst, *a, *b, |a, b| a & b),
            V128Or { dst, a, b } => self.simd_bitwise(*dst, *a, *b, |a, b| a | b),
            V128Xor { dst, a, b } => self.simd_bitwise(*dst, *a, *b, |a, b| a ^ b),
            V128AndNot { dst, a, b } => self.simd_bitwise(*dst, *a, *b, |a, b| a & !b),
            V128Add { dst, a, b, shape } => self.simd_binop(*dst, *a, *b, *shape, simd::add),
            V128Sub { dst, a, b, shape } => self.simd_binop(*dst, *a, *b, *shape, simd::sub),
            V128Mul { dst, a, b, shape } => self.simd_binop(*dst, *a, *b, *shape, simd::mul),
            V128Eq { dst, a, b, shape } => self.simd_binop(*dst, *a, *b, *shape, simd::eq_mask),
            V128Bitselect { dst, a, b, mask } => {
                let av = self.frame.read(ValueKind::V128, *a).unwrap_v128();
                let bv = self.frame.read(ValueKind::V128, *b).unwrap_v128();
                let mv = self.frame.read(ValueKind::V128, *mask).unwrap_v128();
                self.set(*dst, Value::V128(simd::bitselect(av, bv, mv)))
            }

            other => self.step_arith(other),
        }
    }

    // --- small helpers -----------------------------------------------

    fn set(&mut self, dst: u32, value: Value) -> Result<StepResult, Unwind> {
        self.frame.write(dst, &value);
        Ok(StepResult::Next)
    }

    fn copy_slot(&mut self, dst: u32, src: u32, kind: ValueKind) -> Result<StepResult, Unwind> {
        let value = self.frame.read(kind, src);
        self.frame.write(dst, &value);
        Ok(StepResult::Next)
    }

    fn do_load(&mut self, dst: u32, addr: u32, offset: u64, kind: LoadKind) -> Result<StepResult, Unwind> {
        let addr = self.frame.read(ValueKind::I32, addr).unwrap_i32() as u32 as u64;
        let memory_handle = self.instance().memories[0];
        let memory = self.store.memories.get(memory_handle).expect("dangling memory");
        let value = match kind {
            LoadKind::I32 => {
                let mut buf = [0u8; 4];
                memory.load(addr, offset, &mut buf).map_err(Unwind::from)?;
                Value::I32(i32::from_le_bytes(buf))
            }
            LoadKind::I32_8S => Value::I32(load_u8(memory, addr, offset)? as i8 as i32),
            LoadKind::I32_8U => Value::I32(load_u8(memory, addr, offset)? as i32),
            LoadKind::I32_16S => Value::I32(load_u16(memory, addr, offset)? as i16 as i32),
            LoadKind::I32_16U => Value::I32(load_u16(memory, addr, offset)? as i32),
            LoadKind::I64 => {
                let mut buf = [0u8; 8];
                memory.load(addr, offset, &mut buf).map_err(Unwind::from)?;
                Value::I64(i64::from_le_bytes(buf))
            }
            LoadKind::I64_8S => Value::I64(load_u8(memory, addr, offset)? as i8 as i64),
            LoadKind::I64_8U => Value::I64(load_u8(memory, addr, offset)? as i64),
            LoadKind::I64_16S => Value::I64(load_u16(memory, addr, offset)? as i16 as i64),
            LoadKind::I64_16U => Value::I64(load_u16(memory, addr, offset)? as i64),
            LoadKind::I64_32S => Value::I64(load_u32(memory, addr, offset)? as i32 as i64),
            LoadKind::I64_32U => Value::I64(load_u32(memory, addr, offset)? as i64),
            LoadKind::F32 => {
                let mut buf = [0u8; 4];
                memory.load(addr, offset, &mut buf).map_err(Unwind::from)?;
                Value::F32(f32::from_le_bytes(buf))
            }
            LoadKind::F64 => {
                let mut buf = [0u8; 8];
                memory.load(addr, offset, &mut buf).map_err(Unwind::from)?;
                Value::F64(f64::from_le_bytes(buf))
            }
            LoadKind::V128 => {
                let mut buf = [0u8; 16];
                memory.load(addr, offset, &mut buf).map_err(Unwind::from)?;
                Value::V128(u128::from_le_bytes(buf))
            }
        };
        self.set(dst, value)
    }

    fn do_store(&mut self, addr: u32, value: u32, offset: u64, kind: StoreKind) -> Result<StepResult, Unwind> {
        let addr_val = self.frame.read(ValueKind::I32, addr).unwrap_i32() as u32 as u64;
        let memory_handle = self.instance().memories[0];
        let memory = self.store.memories.get_mut(memory_handle).expect("dangling memory");
        match kind {
            StoreKind::I32 => {
                let v = self.frame.read(ValueKind::I32, value).unwrap_i32();
                memory.store(addr_val, offset, &v.to_le_bytes()).map_err(Unwind::from)?;
            }
            StoreKind::I32_8 => {
                let v = self.frame.read(ValueKind::I32, value).unwrap_i32() as u8;
                memory.store(addr_val, offset, &[v]).map_err(Unwind::from)?;
            }
            StoreKind::I32_16 => {
                let v = self.frame.read(ValueKind::I32, value).unwrap_i32() as u16;
                memory.store(addr_val, offset, &v.to_le_bytes()).map_err(Unwind::from)?;
            }
            StoreKind::I64 => {
                let v = self.frame.read(ValueKind::I64, value).unwrap_i64();
                memory.store(addr_val, offset, &v.to_le_bytes()).map_err(Unwind::from)?;
            }
            StoreKind::I64_8 => {
                let v = self.frame.read(ValueKind::I64, value).unwrap_i64() as u8;
                memory.store(addr_val, offset, &[v]).map_err(Unwind::from)?;
            }
            StoreKind::I64_16 => {
                let v = self.frame.read(ValueKind::I64, value).unwrap_i64() as u16;
                memory.store(addr_val, offset, &v.to_le_bytes()).map_err(Unwind::from)?;
            }
            StoreKind::I64_32 => {
                let v = self.frame.read(ValueKind::I64, value).unwrap_i64() as u32;
                memory.store(addr_val, offset, &v.to_le_bytes()).map_err(Unwind::from)?;
            }
            StoreKind::F32 => {
                let v = self.frame.read(ValueKind::F32, value).unwrap_f32();
                memory.store(addr_val, offset, &v.to_le_bytes()).map_err(Unwind::from)?;
            }
            StoreKind::F64 => {
                let v = self.frame.read(ValueKind::F64, value).unwrap_f64();
                memory.store(addr_val, offset, &v.to_le_bytes()).map_err(Unwind::from)?;
            }
            StoreKind::V128 => {
                let v = self.frame.read(ValueKind::V128, value).unwrap_v128();
                memory.store(addr_val, offset, &v.to_le_bytes()).map_err(Unwind::from)?;
            }
        }
        Ok(StepResult::Next)
    }

    fn do_call(
        &mut self,
        func_index: u32,
        arg_offsets: &[u32],
        result_offsets: &[u32],
    ) -> Result<StepResult, Unwind> {
        let func_handle = self.instance().func_handle(func_index);
        self.invoke(func_handle, arg_offsets, result_offsets)
    }

    fn do_call_indirect(
        &mut self,
        table_index: u32,
        type_index: u32,
        index: u32,
        arg_offsets: &[u32],
        result_offsets: &[u32],
    ) -> Result<StepResult, Unwind> {
        let table_handle = self.instance().tables[table_index as usize];
        let expected_ty = self.type_handle_for_module_type_index(type_index);
        let index = self.frame.read(ValueKind::I32, index).unwrap_i32() as u32;
        let func_handle = crate::call::call_indirect(self.store, table_handle, index, expected_ty)?;
        self.invoke(func_handle, arg_offsets, result_offsets)
    }

    /// Module-local type indices (as named by `call_indirect`) and the
    /// `Store`-canonicalized `FuncTypeHandle`s functions actually carry are
    /// the same handles here: types are interned once, at module load, and
    /// never duplicated per instance.
    fn type_handle_for_module_type_index(&self, type_index: u32) -> crate::types::FuncTypeHandle {
        // Module function types are referenced directly by `FuncTypeHandle`
        // elsewhere; `type_index` here is that same canonical handle's
        // arena index, reconstructed with generation 0 since this engine
        // never removes entries from `TypeStore`.
        wasmrt_abi::Handle::new(type_index, 0)
    }

    fn invoke(
        &mut self,
        func_handle: Handle<FuncData>,
        arg_offsets: &[u32],
        result_offsets: &[u32],
    ) -> Result<StepResult, Unwind> {
        let arg_ty = match self.store.funcs.get(func_handle).expect("dangling func handle") {
            FuncData::Defined { instance, local_index } => {
                self.store.instance(*instance).module.funcs[*local_index as usize].ty
            }
            FuncData::Imported { ty, .. } => *ty,
        };
        let ty = self.store.types.get(arg_ty).clone();

        let mut args = Vec::with_capacity(arg_offsets.len());
        for (offset, kind) in arg_offsets.iter().zip(ty.params.iter()) {
            args.push(self.frame.read(*kind, *offset));
        }

        let results = crate::call::call_function(self.store, func_handle, &args)?;

        for (offset, value) in result_offsets.iter().zip(results.into_iter()) {
            self.frame.write(*offset, &value);
        }
        Ok(StepResult::Next)
    }

    fn do_throw(&mut self, tag_index: u32, payload_offsets: &[u32]) -> Result<StepResult, Unwind> {
        let tag_handle = self.instance().tags[tag_index as usize];
        let tag = self.store.tags.get(tag_handle).expect("dangling tag");
        let ty = self.store.types.get(tag.ty).clone();

        let mut payload = Vec::with_capacity(ty.param_stack_size());
        for (offset, kind) in payload_offsets.iter().zip(ty.params.iter()) {
            let value = self.frame.read(*kind, *offset);
            let mut buf = vec![0u8; kind.slot_width()];
            value.write_to_slot(&mut buf);
            payload.extend_from_slice(&buf);
        }

        Err(Unwind::Exception(Exception::new(tag_handle, payload)))
    }

    fn do_simd_splat(&mut self, dst: u32, src: u32, shape: SimdShape) -> Result<StepResult, Unwind> {
        let v = match shape {
            SimdShape::I8x16 | SimdShape::I16x8 | SimdShape::I32x4 => {
                simd::splat_i32(self.frame.read(ValueKind::I32, src).unwrap_i32(), shape)
            }
            SimdShape::I64x2 => simd::splat_i64(self.frame.read(ValueKind::I64, src).unwrap_i64(), shape),
            SimdShape::F32x4 => simd::splat_f32(self.frame.read(ValueKind::F32, src).unwrap_f32()),
            SimdShape::F64x2 => simd::splat_f64(self.frame.read(ValueKind::F64, src).unwrap_f64()),
        };
        self.set(dst, Value::V128(v))
    }

    fn simd_bitwise(&mut self, dst: u32, a: u32, b: u32, f: impl Fn(u128, u128) -> u128) -> Result<StepResult, Unwind> {
        let av = self.frame.read(ValueKind::V128, a).unwrap_v128();
        let bv = self.frame.read(ValueKind::V128, b).unwrap_v128();
        self.set(dst, Value::V128(f(av, bv)))
    }

    fn simd_binop(
        &mut self,
        dst: u32,
        a: u32,
        b: u32,
        shape: SimdShape,
        f: impl Fn(u128, u128, SimdShape) -> u128,
    ) -> Result<StepResult, Unwind> {
        let av = self.frame.read(ValueKind::V128, a).unwrap_v128();
        let bv = self.frame.read(ValueKind::V128, b).unwrap_v128();
        self.set(dst, Value::V128(f(av, bv, shape)))
    }

    // --- scalar arithmetic/compare/conversion families ----------------

    fn binop_i32(&mut self, dst: u32, a: u32, b: u32, f: impl FnOnce(i32, i32) -> i32) -> StepResult {
        let av = self.frame.read(ValueKind::I32, a).unwrap_i32();
        let bv = self.frame.read(ValueKind::I32, b).unwrap_i32();
        self.frame.write(dst, &Value::I32(f(av, bv)));
        StepResult::Next
    }

    fn binop_i32_trap(
        &mut self,
        dst: u32,
        a: u32,
        b: u32,
        f: impl FnOnce(i32, i32) -> Result<i32, Unwind>,
    ) -> Result<StepResult, Unwind> {
        let av = self.frame.read(ValueKind::I32, a).unwrap_i32();
        let bv = self.frame.read(ValueKind::I32, b).unwrap_i32();
        let r = f(av, bv)?;
        self.frame.write(dst, &Value::I32(r));
        Ok(StepResult::Next)
    }

    fn cmp_i32(&mut self, dst: u32, a: u32, b: u32, f: impl FnOnce(i32, i32) -> bool) -> StepResult {
        let av = self.frame.read(ValueKind::I32, a).unwrap_i32();
        let bv = self.frame.read(ValueKind::I32, b).unwrap_i32();
        self.frame.write(dst, &Value::I32(f(av, bv) as i32));
        StepResult::Next
    }

    fn binop_i64(&mut self, dst: u32, a: u32, b: u32, f: impl FnOnce(i64, i64) -> i64) -> StepResult {
        let av = self.frame.read(ValueKind::I64, a).unwrap_i64();
        let bv = self.frame.read(ValueKind::I64, b).unwrap_i64();
        self.frame.write(dst, &Value::I64(f(av, bv)));
        StepResult::Next
    }

    fn binop_i64_trap(
        &mut self,
        dst: u32,
        a: u32,
        b: u32,
        f: impl FnOnce(i64, i64) -> Result<i64, Unwind>,
    ) -> Result<StepResult, Unwind> {
        let av = self.frame.read(ValueKind::I64, a).unwrap_i64();
        let bv = self.frame.read(ValueKind::I64, b).unwrap_i64();
        let r = f(av, bv)?;
        self.frame.write(dst, &Value::I64(r));
        Ok(StepResult::Next)
    }

    fn cmp_i64(&mut self, dst: u32, a: u32, b: u32, f: impl FnOnce(i64, i64) -> bool) -> StepResult {
        let av = self.frame.read(ValueKind::I64, a).unwrap_i64();
        let bv = self.frame.read(ValueKind::I64, b).unwrap_i64();
        self.frame.write(dst, &Value::I32(f(av, bv) as i32));
        StepResult::Next
    }

    fn binop_f32(&mut self, dst: u32, a: u32, b: u32, f: impl FnOnce(f32, f32) -> f32) -> StepResult {
        let av = self.frame.read(ValueKind::F32, a).unwrap_f32();
        let bv = self.frame.read(ValueKind::F32, b).unwrap_f32();
        let r = wasmrt_abi::canonicalize_f32(f(av, bv));
        self.frame.write(dst, &Value::F32(r));
        StepResult::Next
    }

    fn cmp_f32(&mut self, dst: u32, a: u32, b: u32, f: impl FnOnce(f32, f32) -> bool) -> StepResult {
        let av = self.frame.read(ValueKind::F32, a).unwrap_f32();
        let bv = self.frame.read(ValueKind::F32, b).unwrap_f32();
        self.frame.write(dst, &Value::I32(f(av, bv) as i32));
        StepResult::Next
    }

    fn binop_f64(&mut self, dst: u32, a: u32, b: u32, f: impl FnOnce(f64, f64) -> f64) -> StepResult {
        let av = self.frame.read(ValueKind::F64, a).unwrap_f64();
        let bv = self.frame.read(ValueKind::F64, b).unwrap_f64();
        let r = wasmrt_abi::canonicalize_f64(f(av, bv));
        self.frame.write(dst, &Value::F64(r));
        StepResult::Next
    }

    fn cmp_f64(&mut self, dst: u32, a: u32, b: u32, f: impl FnOnce(f64, f64) -> bool) -> StepResult {
        let av = self.frame.read(ValueKind::F64, a).unwrap_f64();
        let bv = self.frame.read(ValueKind::F64, b).unwrap_f64();
        self.frame.write(dst, &Value::I32(f(av, bv) as i32));
        StepResult::Next
    }

    fn unop_i32(&mut self, dst: u32, src: u32, f: impl FnOnce(i32) -> i32) -> StepResult {
        let v = self.frame.read(ValueKind::I32, src).unwrap_i32();
        self.frame.write(dst, &Value::I32(f(v)));
        StepResult::Next
    }

    fn unop_i64(&mut self, dst: u32, src: u32, f: impl FnOnce(i64) -> i64) -> StepResult {
        let v = self.frame.read(ValueKind::I64, src).unwrap_i64();
        self.frame.write(dst, &Value::I64(f(v)));
        StepResult::Next
    }

    fn unop_f32(&mut self, dst: u32, src: u32, f: impl FnOnce(f32) -> f32) -> StepResult {
        let v = self.frame.read(ValueKind::F32, src).unwrap_f32();
        let r = wasmrt_abi::canonicalize_f32(f(v));
        self.frame.write(dst, &Value::F32(r));
        StepResult::Next
    }

    fn unop_f64(&mut self, dst: u32, src: u32, f: impl FnOnce(f64) -> f64) -> StepResult {
        let v = self.frame.read(ValueKind::F64, src).unwrap_f64();
        let r = wasmrt_abi::canonicalize_f64(f(v));
        self.frame.write(dst, &Value::F64(r));
        StepResult::Next
    }

    /// All integer/float arithmetic, compare, and conversion opcodes that
    /// `step`'s explicit control/memory/table/call arms don't otherwise
    /// handle -- they all share one of a handful of shapes, so this one
    /// match drives the small per-family helpers above instead of repeating
    /// a read/compute/write block ~150 times.
    fn step_arith(&mut self, instr: &Instr) -> Result<StepResult, Unwind> {
        use Instr::*;
        Ok(match *instr {
            I32Add { dst, a, b } => self.binop_i32(dst, a, b, i32::wrapping_add),
            I32Sub { dst, a, b } => self.binop_i32(dst, a, b, i32::wrapping_sub),
            I32Mul { dst, a, b } => self.binop_i32(dst, a, b, i32::wrapping_mul),
            I32DivS { dst, a, b } => return self.binop_i32_trap(dst, a, b, numeric::i32_div_s),
            I32DivU { dst, a, b } => return self.binop_i32_trap(dst, a, b, numeric::i32_div_u),
            I32RemS { dst, a, b } => return self.binop_i32_trap(dst, a, b, numeric::i32_rem_s),
            I32RemU { dst, a, b } => return self.binop_i32_trap(dst, a, b, numeric::i32_rem_u),
            I32And { dst, a, b } => self.binop_i32(dst, a, b, |a, b| a & b),
            I32Or { dst, a, b } => self.binop_i32(dst, a, b, |a, b| a | b),
            I32Xor { dst, a, b } => self.binop_i32(dst, a, b, |a, b| a ^ b),
            I32Shl { dst, a, b } => self.binop_i32(dst, a, b, numeric::i32_shl),
            I32ShrS { dst, a, b } => self.binop_i32(dst, a, b, numeric::i32_shr_s),
            I32ShrU { dst, a, b } => self.binop_i32(dst, a, b, numeric::i32_shr_u),
            I32Rotl { dst, a, b } => self.binop_i32(dst, a, b, numeric::i32_rotl),
            I32Rotr { dst, a, b } => self.binop_i32(dst, a, b, numeric::i32_rotr),

            I64Add { dst, a, b } => self.binop_i64(dst, a, b, i64::wrapping_add),
            I64Sub { dst, a, b } => self.binop_i64(dst, a, b, i64::wrapping_sub),
            I64Mul { dst, a, b } => self.binop_i64(dst, a, b, i64::wrapping_mul),
            I64DivS { dst, a, b } => return self.binop_i64_trap(dst, a, b, numeric::i64_div_s),
            I64DivU { dst, a, b } => return self.binop_i64_trap(dst, a, b, numeric::i64_div_u),
            I64RemS { dst, a, b } => return self.binop_i64_trap(dst, a, b, numeric::i64_rem_s),
            I64RemU { dst, a, b } => return self.binop_i64_trap(dst, a, b, numeric::i64_rem_u),
            I64And { dst, a, b } => self.binop_i64(dst, a, b, |a, b| a & b),
            I64Or { dst, a, b } => self.binop_i64(dst, a, b, |a, b| a | b),
            I64Xor { dst, a, b } => self.binop_i64(dst, a, b, |a, b| a ^ b),
            I64Shl { dst, a, b } => self.binop_i64(dst, a, b, numeric::i64_shl),
            I64ShrS { dst, a, b } => self.binop_i64(dst, a, b, numeric::i64_shr_s),
            I64ShrU { dst, a, b } => self.binop_i64(dst, a, b, numeric::i64_shr_u),
            I64Rotl { dst, a, b } => self.binop_i64(dst, a, b, numeric::i64_rotl),
            I64Rotr { dst, a, b } => self.binop_i64(dst, a, b, numeric::i64_rotr),

            I32Eq { dst, a, b } => self.cmp_i32(dst, a, b, |a, b| a == b),
            I32Ne { dst, a, b } => self.cmp_i32(dst, a, b, |a, b| a != b),
            I32LtS { dst, a, b } => self.cmp_i32(dst, a, b, |a, b| a < b),
            I32LtU { dst, a, b } => self.cmp_i32(dst, a, b, |a, b| (a as u32) < (b as u32)),
            I32GtS { dst, a, b } => self.cmp_i32(dst, a, b, |a, b| a > b),
            I32GtU { dst, a, b } => self.cmp_i32(dst, a, b, |a, b| (a as u32) > (b as u32)),
            I32LeS { dst, a, b } => self.cmp_i32(dst, a, b, |a, b| a <= b),
            I32LeU { dst, a, b } => self.cmp_i32(dst, a, b, |a, b| (a as u32) <= (b as u32)),
            I32GeS { dst, a, b } => self.cmp_i32(dst, a, b, |a, b| a >= b),
            I32GeU { dst, a, b } => self.cmp_i32(dst, a, b, |a, b| (a as u32) >= (b as u32)),

            I64Eq { dst, a, b } => self.cmp_i64(dst, a, b, |a, b| a == b),
            I64Ne { dst, a, b } => self.cmp_i64(dst, a, b, |a, b| a != b),
            I64LtS { dst, a, b } => self.cmp_i64(dst, a, b, |a, b| a < b),
            I64LtU { dst, a, b } => self.cmp_i64(dst, a, b, |a, b| (a as u64) < (b as u64)),
            I64GtS { dst, a, b } => self.cmp_i64(dst, a, b, |a, b| a > b),
            I64GtU { dst, a, b } => self.cmp_i64(dst, a, b, |a, b| (a as u64) > (b as u64)),
            I64LeS { dst, a, b } => self.cmp_i64(dst, a, b, |a, b| a <= b),
            I64LeU { dst, a, b } => self.cmp_i64(dst, a, b, |a, b| (a as u64) <= (b as u64)),
            I64GeS { dst, a, b } => self.cmp_i64(dst, a, b, |a, b| a >= b),
            I64GeU { dst, a, b } => self.cmp_i64(dst, a, b, |a, b| (a as u64) >= (b as u64)),

            F32Add { dst, a, b } => self.binop_f32(dst, a, b, |a, b| a + b),
            F32Sub { dst, a, b } => self.binop_f32(dst, a, b, |a, b| a - b),
            F32Mul { dst, a, b } => self.binop_f32(dst, a, b, |a, b| a * b),
            F32Div { dst, a, b } => self.binop_f32(dst, a, b, |a, b| a / b),
            F32Min { dst, a, b } => self.binop_f32(dst, a, b, numeric::f32_min),
            F32Max { dst, a, b } => self.binop_f32(dst, a, b, numeric::f32_max),
            F32Copysign { dst, a, b } => self.binop_f32(dst, a, b, f32::copysign),

            F64Add { dst, a, b } => self.binop_f64(dst, a, b, |a, b| a + b),
            F64Sub { dst, a, b } => self.binop_f64(dst, a, b, |a, b| a - b),
            F64Mul { dst, a, b } => self.binop_f64(dst, a, b, |a, b| a * b),
            F64Div { dst, a, b } => self.binop_f64(dst, a, b, |a, b| a / b),
            F64Min { dst, a, b } => self.binop_f64(dst, a, b, numeric::f64_min),
            F64Max { dst, a, b } => self.binop_f64(dst, a, b, numeric::f64_max),
            F64Copysign { dst, a, b } => self.binop_f64(dst, a, b, f64::copysign),

            F32Eq { dst, a, b } => self.cmp_f32(dst, a, b, |a, b| a == b),
            F32Ne { dst, a, b } => self.cmp_f32(dst, a, b, |a, b| a != b),
            F32Lt { dst, a, b } => self.cmp_f32(dst, a, b, |a, b| a < b),
            F32Gt { dst, a, b } => self.cmp_f32(dst, a, b, |a, b| a > b),
            F32Le { dst, a, b } => self.cmp_f32(dst, a, b, |a, b| a <= b),
            F32Ge { dst, a, b } => self.cmp_f32(dst, a, b, |a, b| a >= b),

            F64Eq { dst, a, b } => self.cmp_f64(dst, a, b, |a, b| a == b),
            F64Ne { dst, a, b } => self.cmp_f64(dst, a, b, |a, b| a != b),
            F64Lt { dst, a, b } => self.cmp_f64(dst, a, b, |a, b| a < b),
            F64Gt { dst, a, b } => self.cmp_f64(dst, a, b, |a, b| a > b),
            F64Le { dst, a, b } => self.cmp_f64(dst, a, b, |a, b| a <= b),
            F64Ge { dst, a, b } => self.cmp_f64(dst, a, b, |a, b| a >= b),

            I32Clz { dst, src } => self.unop_i32(dst, src, |v| v.leading_zeros() as i32),
            I32Ctz { dst, src } => self.unop_i32(dst, src, |v| v.trailing_zeros() as i32),
            I32Popcnt { dst, src } => self.unop_i32(dst, src, |v| v.count_ones() as i32),
            I32Eqz { dst, src } => {
                let v = self.frame.read(ValueKind::I32, src).unwrap_i32();
                self.frame.write(dst, &Value::I32((v == 0) as i32));
                StepResult::Next
            }
            I64Clz { dst, src } => self.unop_i64(dst, src, |v| v.leading_zeros() as i64),
            I64Ctz { dst, src } => self.unop_i64(dst, src, |v| v.trailing_zeros() as i64),
            I64Popcnt { dst, src } => self.unop_i64(dst, src, |v| v.count_ones() as i64),
            I64Eqz { dst, src } => {
                let v = self.frame.read(ValueKind::I64, src).unwrap_i64();
                self.frame.write(dst, &Value::I32((v == 0) as i32));
                StepResult::Next
            }

            F32Neg { dst, src } => self.unop_f32(dst, src, |v| -v),
            F32Abs { dst, src } => self.unop_f32(dst, src, f32::abs),
            F32Sqrt { dst, src } => self.unop_f32(dst, src, f32::sqrt),
            F32Ceil { dst, src } => self.unop_f32(dst, src, f32::ceil),
            F32Floor { dst, src } => self.unop_f32(dst, src, f32::floor),
            F32Trunc { dst, src } => self.unop_f32(dst, src, f32::trunc),
            F32Nearest { dst, src } => self.unop_f32(dst, src, f32::round_ties_even),

            F64Neg { dst, src } => self.unop_f64(dst, src, |v| -v),
            F64Abs { dst, src } => self.unop_f64(dst, src, f64::abs),
            F64Sqrt { dst, src } => self.unop_f64(dst, src, f64::sqrt),
            F64Ceil { dst, src } => self.unop_f64(dst, src, f64::ceil),
            F64Floor { dst, src } => self.unop_f64(dst, src, f64::floor),
            F64Trunc { dst, src } => self.unop_f64(dst, src, f64::trunc),
            F64Nearest { dst, src } => self.unop_f64(dst, src, f64::round_ties_even),

            I32Extend8S { dst, src } => self.unop_i32(dst, src, |v| (v as i8) as i32),
            I32Extend16S { dst, src } => self.unop_i32(dst, src, |v| (v as i16) as i32),
            I64Extend8S { dst, src } => self.unop_i64(dst, src, |v| (v as i8) as i64),
            I64Extend16S { dst, src } => self.unop_i64(dst, src, |v| (v as i16) as i64),
            I64Extend32S { dst, src } => self.unop_i64(dst, src, |v| (v as i32) as i64),

            I32WrapI64 { dst, src } => {
                let v = self.frame.read(ValueKind::I64, src).unwrap_i64();
                self.frame.write(dst, &Value::I32(v as i32));
                StepResult::Next
            }
            I64ExtendI32S { dst, src } => {
                let v = self.frame.read(ValueKind::I32, src).unwrap_i32();
                self.frame.write(dst, &Value::I64(v as i64));
                StepResult::Next
            }
            I64ExtendI32U { dst, src } => {
                let v = self.frame.read(ValueKind::I32, src).unwrap_i32();
                self.frame.write(dst, &Value::I64((v as u32) as i64));
                StepResult::Next
            }

            F32DemoteF64 { dst, src } => {
                let v = self.frame.read(ValueKind::F64, src).unwrap_f64();
                self.frame.write(dst, &Value::F32(wasmrt_abi::canonicalize_f32(v as f32)));
                StepResult::Next
            }
            F64PromoteF32 { dst, src } => {
                let v = self.frame.read(ValueKind::F32, src).unwrap_f32();
                self.frame.write(dst, &Value::F64(wasmrt_abi::canonicalize_f64(v as f64)));
                StepResult::Next
            }

            I32TruncF32S { dst, src } => {
                let v = self.frame.read(ValueKind::F32, src).unwrap_f32();
                let r = numeric::i32_trunc_f32_s(v)?;
                self.frame.write(dst, &Value::I32(r));
                StepResult::Next
            }
            I32TruncF32U { dst, src } => {
                let v = self.frame.read(ValueKind::F32, src).unwrap_f32();
                let r = numeric::i32_trunc_f32_u(v)?;
                self.frame.write(dst, &Value::I32(r));
                StepResult::Next
            }
            I32TruncF64S { dst, src } => {
                let v = self.frame.read(ValueKind::F64, src).unwrap_f64();
                let r = numeric::i32_trunc_f64_s(v)?;
                self.frame.write(dst, &Value::I32(r));
                StepResult::Next
            }
            I32TruncF64U { dst, src } => {
                let v = self.frame.read(ValueKind::F64, src).unwrap_f64();
                let r = numeric::i32_trunc_f64_u(v)?;
                self.frame.write(dst, &Value::I32(r));
                StepResult::Next
            }
            I64TruncF32S { dst, src } => {
                let v = self.frame.read(ValueKind::F32, src).unwrap_f32();
                let r = numeric::i64_trunc_f32_s(v)?;
                self.frame.write(dst, &Value::I64(r));
                StepResult::Next
            }
            I64TruncF32U { dst, src } => {
                let v = self.frame.read(ValueKind::F32, src).unwrap_f32();
                let r = numeric::i64_trunc_f32_u(v)?;
                self.frame.write(dst, &Value::I64(r));
                StepResult::Next
            }
            I64TruncF64S { dst, src } => {
                let v = self.frame.read(ValueKind::F64, src).unwrap_f64();
                let r = numeric::i64_trunc_f64_s(v)?;
                self.frame.write(dst, &Value::I64(r));
                StepResult::Next
            }
            I64TruncF64U { dst, src } => {
                let v = self.frame.read(ValueKind::F64, src).unwrap_f64();
                let r = numeric::i64_trunc_f64_u(v)?;
                self.frame.write(dst, &Value::I64(r));
                StepResult::Next
            }

            I32TruncSatF32S { dst, src } => self.unop_i32_from_f32(dst, src, numeric::i32_trunc_sat_f32_s),
            I32TruncSatF32U { dst, src } => self.unop_i32_from_f32(dst, src, numeric::i32_trunc_sat_f32_u),
            I32TruncSatF64S { dst, src } => self.unop_i32_from_f64(dst, src, numeric::i32_trunc_sat_f64_s),
            I32TruncSatF64U { dst, src } => self.unop_i32_from_f64(dst, src, numeric::i32_trunc_sat_f64_u),
            I64TruncSatF32S { dst, src } => self.unop_i64_from_f32(dst, src, numeric::i64_trunc_sat_f32_s),
            I64TruncSatF32U { dst, src } => self.unop_i64_from_f32(dst, src, numeric::i64_trunc_sat_f32_u),
            I64TruncSatF64S { dst, src } => self.unop_i64_from_f64(dst, src, numeric::i64_trunc_sat_f64_s),
            I64TruncSatF64U { dst, src } => self.unop_i64_from_f64(dst, src, numeric::i64_trunc_sat_f64_u),

            F32ConvertI32S { dst, src } => {
                let v = self.frame.read(ValueKind::I32, src).unwrap_i32();
                self.frame.write(dst, &Value::F32(v as f32));
                StepResult::Next
            }
            F32ConvertI32U { dst, src } => {
                let v = self.frame.read(ValueKind::I32, src).unwrap_i32();
                self.frame.write(dst, &Value::F32((v as u32) as f32));
                StepResult::Next
            }
            F32ConvertI64S { dst, src } => {
                let v = self.frame.read(ValueKind::I64, src).unwrap_i64();
                self.frame.write(dst, &Value::F32(v as f32));
                StepResult::Next
            }
            F32ConvertI64U { dst, src } => {
                let v = self.frame.read(ValueKind::I64, src).unwrap_i64();
                self.frame.write(dst, &Value::F32((v as u64) as f32));
                StepResult::Next
            }
            F64ConvertI32S { dst, src } => {
                let v = self.frame.read(ValueKind::I32, src).unwrap_i32();
                self.frame.write(dst, &Value::F64(v as f64));
                StepResult::Next
            }
            F64ConvertI32U { dst, src } => {
                let v = self.frame.read(ValueKind::I32, src).unwrap_i32();
                self.frame.write(dst, &Value::F64((v as u32) as f64));
                StepResult::Next
            }
            F64ConvertI64S { dst, src } => {
                let v = self.frame.read(ValueKind::I64, src).unwrap_i64();
                self.frame.write(dst, &Value::F64(v as f64));
                StepResult::Next
            }
            F64ConvertI64U { dst, src } => {
                let v = self.frame.read(ValueKind::I64, src).unwrap_i64();
                self.frame.write(dst, &Value::F64((v as u64) as f64));
                StepResult::Next
            }

            I32ReinterpretF32 { dst, src } => {
                let v = self.frame.read(ValueKind::F32, src).unwrap_f32();
                self.frame.write(dst, &Value::I32(v.to_bits() as i32));
                StepResult::Next
            }
            F32ReinterpretI32 { dst, src } => {
                let v = self.frame.read(ValueKind::I32, src).unwrap_i32();
                self.frame.write(dst, &Value::F32(f32::from_bits(v as u32)));
                StepResult::Next
            }
            I64ReinterpretF64 { dst, src } => {
                let v = self.frame.read(ValueKind::F64, src).unwrap_f64();
                self.frame.write(dst, &Value::I64(v.to_bits() as i64));
                StepResult::Next
            }
            F64ReinterpretI64 { dst, src } => {
                let v = self.frame.read(ValueKind::I64, src).unwrap_i64();
                self.frame.write(dst, &Value::F64(f64::from_bits(v as u64)));
                StepResult::Next
            }

            _ => unreachable!("opcode handled in `step` before reaching `step_arith`"),
        })
    }

    fn unop_i32_from_f32(&mut self, dst: u32, src: u32, f: impl FnOnce(f32) -> i32) -> StepResult {
        let v = self.frame.read(ValueKind::F32, src).unwrap_f32();
        self.frame.write(dst, &Value::I32(f(v)));
        StepResult::Next
    }
    fn unop_i32_from_f64(&mut self, dst: u32, src: u32, f: impl FnOnce(f64) -> i32) -> StepResult {
        let v = self.frame.read(ValueKind::F64, src).unwrap_f64();
        self.frame.write(dst, &Value::I32(f(v)));
        StepResult::Next
    }
    fn unop_i64_from_f32(&mut self, dst: u32, src: u32, f: impl FnOnce(f32) -> i64) -> StepResult {
        let v = self.frame.read(ValueKind::F32, src).unwrap_f32();
        self.frame.write(dst, &Value::I64(f(v)));
        StepResult::Next
    }
    fn unop_i64_from_f64(&mut self, dst: u32, src: u32, f: impl FnOnce(f64) -> i64) -> StepResult {
        let v = self.frame.read(ValueKind::F64, src).unwrap_f64();
        self.frame.write(dst, &Value::I64(f(v)));
        StepResult::Next
    }
}

fn kind_for_width(width: u8) -> ValueKind {
    match width {
        opcode::REF_WIDTH => ValueKind::FuncRef,
        4 => ValueKind::I32,
        8 => ValueKind::I64,
        16 => ValueKind::V128,
        other => panic!("no value kind for slot width {other}"),
    }
}

/// Inverse of [`kind_for_width`], used where the width only needs to be
/// cross-checked against an already-known kind (reference kinds share one
/// width regardless of which specific reference type they are).
fn width_for_kind(kind: ValueKind) -> u8 {
    match kind {
        ValueKind::FuncRef | ValueKind::ExternRef => opcode::REF_WIDTH,
        other => other.slot_width() as u8,
    }
}

fn load_u8(memory: &crate::memory::Memory, addr: u64, offset: u64) -> Result<u8, Unwind> {
    let mut buf = [0u8; 1];
    memory.load(addr, offset, &mut buf).map_err(Unwind::from)?;
    Ok(buf[0])
}
fn load_u16(memory: &crate::memory::Memory, addr: u64, offset: u64) -> Result<u16, Unwind> {
    let mut buf = [0u8; 2];
    memory.load(addr, offset, &mut buf).map_err(Unwind::from)?;
    Ok(u16::from_le_bytes(buf))
}
fn load_u32(memory: &crate::memory::Memory, addr: u64, offset: u64) -> Result<u32, Unwind> {
    let mut buf = [0u8; 4];
    memory.load(addr, offset, &mut buf).map_err(Unwind::from)?;
    Ok(u32::from_le_bytes(buf))
}
