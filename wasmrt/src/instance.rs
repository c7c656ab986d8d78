//! Instances (spec component C9): one concrete instantiation of a `Module`,
//! with all its imports resolved and all its own tables/memories/globals/
//! functions allocated into the `Store`'s arenas.

use std::collections::HashMap;
use std::rc::Rc;

use wasmrt_abi::{Handle, InstantiateError, LinkError, Value};

use crate::exception::Unwind;
use crate::function::{handle_to_funcref, FuncData};
use crate::global::{Global, MutableType};
use crate::memory::Memory;
use crate::module::{
    ConstExpr, DataSegmentKind, ElementSegmentKind, ExportDesc, ImportDesc, Module,
};
use crate::segment::{DataSegment, ElementExpr, ElementSegment};
use crate::store::Store;
use crate::table::Table;
use crate::tag::Tag;
use crate::types::FuncTypeHandle;

/// One resolved import value, supplied by the host at instantiation time.
/// Kept as an enum over store handles rather than raw `Value`s: functions,
/// tables, memories and globals are all store-owned objects, not values.
#[derive(Debug, Clone, Copy)]
pub enum ExternVal {
    Func(Handle<FuncData>),
    Table(Handle<Table>),
    Memory(Handle<Memory>),
    Global(Handle<Global>),
    Tag(Handle<Tag>),
}

pub type ImportMap = HashMap<(String, String), ExternVal>;

#[derive(Debug)]
pub struct Instance {
    pub module: Rc<Module>,
    /// Combined import+defined index spaces, resolved once at
    /// instantiation so every later lookup is a direct array index.
    pub funcs: Vec<Handle<FuncData>>,
    pub tables: Vec<Handle<Table>>,
    pub memories: Vec<Handle<Memory>>,
    pub globals: Vec<Handle<Global>>,
    pub tags: Vec<Handle<Tag>>,
    pub data_segments: Vec<DataSegment>,
    pub element_segments: Vec<ElementSegment>,
}

impl Instance {
    pub fn get_export(&self, name: &str) -> Option<ExportDesc> {
        self.module
            .exports
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.desc)
    }

    pub fn func_handle(&self, index: u32) -> Handle<FuncData> {
        self.funcs[index as usize]
    }

    pub fn func_type(&self, store: &Store, index: u32) -> FuncTypeHandle {
        match store
            .funcs
            .get(self.funcs[index as usize])
            .expect("dangling func handle")
        {
            FuncData::Defined { local_index, .. } => self.module.funcs[*local_index as usize].ty,
            FuncData::Imported { ty, .. } => *ty,
        }
    }

    /// Instantiation, spec §4.5: resolve imports, allocate this instance's
    /// own tables/memories/globals/functions, initialize globals, copy
    /// active element and data segments in, then run the start function if
    /// any. Any failure during linking or during the active-segment/start
    /// phases leaves the instance partially initialized but already
    /// store-registered, matching the reference semantics where a failed
    /// instantiation may have observable partial side effects.
    pub fn instantiate(
        store: &mut Store,
        module_handle: Handle<Module>,
        imports: &ImportMap,
    ) -> Result<Handle<Instance>, InstantiateError> {
        let module = store.module(module_handle);

        let mut imported_funcs = Vec::new();
        let mut imported_tables = Vec::new();
        let mut imported_memories = Vec::new();
        let mut imported_globals = Vec::new();
        let mut imported_tags = Vec::new();

        for import in &module.imports {
            let key = (import.module.clone(), import.name.clone());
            let found = imports.get(&key).ok_or_else(|| LinkError::UnknownImport {
                module: import.module.clone(),
                name: import.name.clone(),
            })?;
            match (import.desc, found) {
                (ImportDesc::Func(expected_ty), ExternVal::Func(h)) => {
                    let got_ty = match store.funcs.get(*h).expect("dangling import") {
                        FuncData::Defined { instance, local_index } => {
                            store.instance(*instance).module.funcs[*local_index as usize].ty
                        }
                        FuncData::Imported { ty, .. } => *ty,
                    };
                    if got_ty != expected_ty {
                        return Err(LinkError::TypeMismatch {
                            module: import.module.clone(),
                            name: import.name.clone(),
                        }
                        .into());
                    }
                    imported_funcs.push(*h);
                }
                (ImportDesc::Table(def), ExternVal::Table(h)) => {
                    let table = store.tables.get(*h).expect("dangling import");
                    let max_ok = def
                        .maximum
                        .map(|max| table.maximum_size() <= max)
                        .unwrap_or(true);
                    if table.element_kind() != def.element_kind || table.size() < def.minimum || !max_ok
                    {
                        return Err(LinkError::LimitsMismatch.into());
                    }
                    imported_tables.push(*h);
                }
                (ImportDesc::Memory(def), ExternVal::Memory(h)) => {
                    let memory = store.memories.get(*h).expect("dangling import");
                    let max_ok = def
                        .maximum_pages
                        .map(|max| memory.maximum_bytes() <= max as u64 * crate::memory::PAGE_SIZE)
                        .unwrap_or(true);
                    if memory.size_in_pages() < def.minimum_pages as u64 || !max_ok {
                        return Err(LinkError::LimitsMismatch.into());
                    }
                    imported_memories.push(*h);
                }
                (ImportDesc::Global { kind, mutable }, ExternVal::Global(h)) => {
                    let global = store.globals.get(*h).expect("dangling import");
                    if global.ty().kind != kind || global.ty().mutable != mutable {
                        return Err(LinkError::TypeMismatch {
                            module: import.module.clone(),
                            name: import.name.clone(),
                        }
                        .into());
                    }
                    imported_globals.push(*h);
                }
                (ImportDesc::Tag(expected_ty), ExternVal::Tag(h)) => {
                    let tag = store.tags.get(*h).expect("dangling import");
                    if tag.ty != expected_ty {
                        return Err(LinkError::TypeMismatch {
                            module: import.module.clone(),
                            name: import.name.clone(),
                        }
                        .into());
                    }
                    imported_tags.push(*h);
                }
                _ => {
                    return Err(LinkError::KindMismatch {
                        module: import.module.clone(),
                        name: import.name.clone(),
                        expected: "import kind",
                        got: "different kind",
                    }
                    .into())
                }
            }
        }

        // Register a placeholder so defined functions can record their
        // owning instance handle before the instance is fully populated.
        let instance_handle = store.register_instance(Instance {
            module: Rc::clone(&module),
            funcs: Vec::new(),
            tables: Vec::new(),
            memories: Vec::new(),
            globals: Vec::new(),
            tags: Vec::new(),
            data_segments: Vec::new(),
            element_segments: Vec::new(),
        });

        let mut funcs = imported_funcs;
        for local_index in 0..module.funcs.len() as u32 {
            funcs.push(store.funcs.insert(FuncData::Defined {
                instance: instance_handle,
                local_index,
            }));
        }

        let mut tables = imported_tables;
        for def in &module.tables {
            let table = Table::create(def.element_kind, def.minimum, def.maximum.unwrap_or(u32::MAX));
            tables.push(store.tables.insert(table));
        }

        let mut memories = imported_memories;
        for def in &module.memories {
            let memory = Memory::create(
                def.minimum_pages as u64 * crate::memory::PAGE_SIZE,
                def.maximum_pages
                    .map(|p| p as u64 * crate::memory::PAGE_SIZE)
                    .unwrap_or(u64::MAX),
                def.is_shared,
            )
            .map_err(|t| InstantiateError::Trapped(t))?;
            memories.push(store.memories.insert(memory));
        }

        let mut globals = imported_globals;
        for def in &module.globals {
            let value = eval_const_expr(def.init, &globals, &funcs, store);
            globals.push(
                store
                    .globals
                    .insert(Global::new(MutableType { kind: def.kind, mutable: def.mutable }, value)),
            );
        }

        let mut tags = imported_tags;
        for ty in &module.tags {
            tags.push(store.tags.insert(Tag::new(*ty)));
        }

        {
            let instance = store.instance_mut(instance_handle);
            instance.funcs = funcs.clone();
            instance.tables = tables.clone();
            instance.memories = memories.clone();
            instance.globals = globals.clone();
            instance.tags = tags.clone();
        }

        let mut element_segments = Vec::with_capacity(module.elements.len());
        for def in &module.elements {
            element_segments.push(ElementSegment::new(def.elements.clone()));
        }

        let mut data_segments = Vec::with_capacity(module.data.len());
        for def in &module.data {
            data_segments.push(DataSegment::new(def.bytes.clone()));
        }

        {
            let instance = store.instance_mut(instance_handle);
            instance.element_segments = element_segments;
            instance.data_segments = data_segments;
        }

        // Active element segments copy funcref/externref values into their
        // target table, then behave as if `elem.drop` ran immediately after.
        for (seg_index, def) in module.elements.iter().enumerate() {
            if let ElementSegmentKind::Active { table_index, offset } = def.kind {
                let offset = eval_const_expr(offset, &globals, &funcs, store)
                    .unwrap_i32() as u32;
                let resolved: Vec<Value> = def
                    .elements
                    .iter()
                    .map(|e| element_expr_to_value(*e, &funcs))
                    .collect();
                let table_handle = tables[table_index as usize];
                let table = store.tables.get_mut(table_handle).expect("missing table");
                table
                    .init_from(offset, &resolved, 0, resolved.len() as u32)
                    .map_err(InstantiateError::Trapped)?;
                store.instance_mut(instance_handle).element_segments[seg_index].drop_segment();
            } else if matches!(def.kind, ElementSegmentKind::Declared) {
                store.instance_mut(instance_handle).element_segments[seg_index].drop_segment();
            }
        }

        // Active data segments copy bytes into their target memory, then
        // behave as if `data.drop` ran immediately after.
        for (seg_index, def) in module.data.iter().enumerate() {
            if let DataSegmentKind::Active { memory_index, offset } = def.kind {
                let offset = eval_const_expr(offset, &globals, &funcs, store)
                    .unwrap_i32() as u64;
                let memory_handle = memories[memory_index as usize];
                let memory = store.memories.get_mut(memory_handle).expect("missing memory");
                let bytes = def.bytes.clone();
                memory
                    .init(&bytes, offset, 0, bytes.len() as u64)
                    .map_err(InstantiateError::Trapped)?;
                store.instance_mut(instance_handle).data_segments[seg_index].drop_segment();
            }
        }

        if let Some(start_index) = module.start {
            let func_handle = funcs[start_index as usize];
            crate::call::call_function(store, func_handle, &[]).map_err(unwind_to_instantiate_error)?;
        }

        Ok(instance_handle)
    }
}

/// The start function is only ever called by `instantiate`, where there is
/// no catching context above it: a trap aborts instantiation directly, and
/// an escaping user exception -- legal, if unusual -- does too, reported as
/// a trap since `InstantiateError` has no separate "uncaught exception"
/// shape.
fn unwind_to_instantiate_error(unwind: Unwind) -> InstantiateError {
    match unwind {
        Unwind::Trap(t) => InstantiateError::Trapped(t),
        Unwind::Exception(_) => {
            InstantiateError::Trapped(wasmrt_abi::Trap::new(wasmrt_abi::TrapKind::TypeMismatch))
        }
    }
}

fn element_expr_to_value(expr: ElementExpr, funcs: &[Handle<FuncData>]) -> Value {
    match expr {
        ElementExpr::RefFunc(index) => Value::FuncRef(Some(handle_to_funcref(funcs[index as usize]))),
        ElementExpr::RefNull => Value::FuncRef(None),
    }
}

fn eval_const_expr(
    expr: ConstExpr,
    globals: &[Handle<Global>],
    funcs: &[Handle<FuncData>],
    store: &Store,
) -> Value {
    match expr {
        ConstExpr::I32(v) => Value::I32(v),
        ConstExpr::I64(v) => Value::I64(v),
        ConstExpr::F32(v) => Value::F32(v),
        ConstExpr::F64(v) => Value::F64(v),
        ConstExpr::V128(v) => Value::V128(v),
        ConstExpr::RefNull { is_func: true } => Value::FuncRef(None),
        ConstExpr::RefNull { is_func: false } => Value::ExternRef(None),
        ConstExpr::RefFunc(index) => Value::FuncRef(Some(handle_to_funcref(funcs[index as usize]))),
        ConstExpr::GlobalGet(index) => store
            .globals
            .get(globals[index as usize])
            .expect("dangling global")
            .get(),
    }
}

