//! Linear memory growth and bulk-memory `fill` (spec component C2).

mod common;

use wasmrt::exec::opcode::{Instr, LoadKind};
use wasmrt::module::{Export, ExportDesc, MemoryDef, Module, ModuleFunction};
use wasmrt::store::Store;
use wasmrt::{Value, ValueKind};

fn memory_module(store: &mut Store) -> Module {
    let grow_ty = common::intern(store, &[], &[ValueKind::I32]);
    let fill_ty = common::intern(store, &[], &[ValueKind::I32]);

    let grow_code = vec![
        Instr::MemoryGrow {
            dst: 0,
            memory_index: 0,
            delta_pages: 1,
        },
        Instr::Return { result_offsets: vec![0] },
    ];

    // dst addr = 0, fill value = 'A' (0x41), n = 4 bytes, then read them
    // back as one little-endian i32 (0x41414141).
    let fill_code = vec![
        Instr::Const32 { dst: 0, value: 0 },
        Instr::Const32 { dst: 4, value: 0x41 },
        Instr::Const32 { dst: 8, value: 4 },
        Instr::MemoryFill {
            memory_index: 0,
            dst: 0,
            value: 4,
            n: 8,
        },
        Instr::Load {
            dst: 12,
            addr: 0,
            offset: 0,
            kind: LoadKind::I32,
        },
        Instr::Return { result_offsets: vec![12] },
    ];

    let mut module = Module::new();
    module.memories.push(MemoryDef {
        minimum_pages: 1,
        maximum_pages: Some(2),
        is_shared: false,
    });
    module.funcs.push(ModuleFunction {
        ty: grow_ty,
        code: grow_code,
        required_stack_size: 4,
        catch_table: vec![],
        jit: None,
    });
    module.funcs.push(ModuleFunction {
        ty: fill_ty,
        code: fill_code,
        required_stack_size: 16,
        catch_table: vec![],
        jit: None,
    });
    module.exports.push(Export {
        name: "grow".to_string(),
        desc: ExportDesc::Func(0),
    });
    module.exports.push(Export {
        name: "fill_and_read".to_string(),
        desc: ExportDesc::Func(1),
    });
    module
}

#[test]
fn grow_reports_old_size_in_pages() {
    let mut store = Store::new();
    let module = memory_module(&mut store);
    let instance = common::instantiate(&mut store, module);

    let results = common::call_export(&mut store, instance, "grow", &[]).expect("grow traps");
    assert_eq!(results, vec![Value::I32(1)]);
}

#[test]
fn fill_then_load_round_trips_bytes() {
    let mut store = Store::new();
    let module = memory_module(&mut store);
    let instance = common::instantiate(&mut store, module);

    let results = common::call_export(&mut store, instance, "fill_and_read", &[])
        .expect("fill_and_read traps");
    assert_eq!(results, vec![Value::I32(0x41414141u32 as i32)]);
}
