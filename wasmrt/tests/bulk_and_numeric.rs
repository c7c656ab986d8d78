//! Bulk-memory/table copy across distinct objects (spec component C2/C5,
//! exercising `Arena::get_disjoint_mut`), shift-amount masking, and
//! trunc/trunc_sat agreement on in-range operands.

mod common;

use wasmrt::exec::opcode::{Instr, LoadKind};
use wasmrt::module::{
    ConstExpr, ElementSegmentDef, ElementSegmentKind, Export, ExportDesc, MemoryDef, Module,
    ModuleFunction, TableDef,
};
use wasmrt::segment::ElementExpr;
use wasmrt::store::Store;
use wasmrt::table::TableElementKind;
use wasmrt::{Value, ValueKind};

#[test]
fn memory_copy_across_two_distinct_memories_moves_bytes() {
    let mut store = Store::new();

    // memory 0: fill 4 bytes with 'A' at address 0.
    // memory 1: copy those 4 bytes in from memory 0, then load them back.
    let fn_ty = common::intern(&mut store, &[], &[ValueKind::I32]);
    let code = vec![
        Instr::Const32 { dst: 0, value: 0 },
        Instr::Const32 { dst: 4, value: 0x41 },
        Instr::Const32 { dst: 8, value: 4 },
        Instr::MemoryFill {
            memory_index: 0,
            dst: 0,
            value: 4,
            n: 8,
        },
        Instr::Const32 { dst: 0, value: 0 },
        Instr::Const32 { dst: 4, value: 0 },
        Instr::Const32 { dst: 8, value: 4 },
        Instr::MemoryCopy {
            dst_memory: 1,
            src_memory: 0,
            dst: 0,
            src: 4,
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
        maximum_pages: Some(1),
        is_shared: false,
    });
    module.memories.push(MemoryDef {
        minimum_pages: 1,
        maximum_pages: Some(1),
        is_shared: false,
    });
    module.funcs.push(ModuleFunction {
        ty: fn_ty,
        code,
        required_stack_size: 16,
        catch_table: vec![],
        jit: None,
    });
    module.exports.push(Export {
        name: "run".to_string(),
        desc: ExportDesc::Func(0),
    });

    let instance = common::instantiate(&mut store, module);
    let results = common::call_export(&mut store, instance, "run", &[]).expect("should not trap");
    assert_eq!(results, vec![Value::I32(0x41414141u32 as i32)]);
}

#[test]
fn table_copy_across_two_distinct_tables_moves_funcrefs() {
    let mut store = Store::new();
    let fn_ty = common::intern(&mut store, &[], &[ValueKind::I32]);
    let runner_ty = common::intern(&mut store, &[], &[ValueKind::I32]);

    let mut module = Module::new();
    module.tables.push(TableDef {
        element_kind: TableElementKind::FuncRef,
        minimum: 1,
        maximum: Some(1),
    });
    module.tables.push(TableDef {
        element_kind: TableElementKind::FuncRef,
        minimum: 1,
        maximum: Some(1),
    });

    module.funcs.push(ModuleFunction {
        ty: fn_ty,
        code: vec![
            Instr::Const32 { dst: 0, value: 42 },
            Instr::Return { result_offsets: vec![0] },
        ],
        required_stack_size: 4,
        catch_table: vec![],
        jit: None,
    });

    module.funcs.push(ModuleFunction {
        ty: runner_ty,
        code: vec![
            Instr::Const32 { dst: 0, value: 0 },
            Instr::Const32 { dst: 4, value: 0 },
            Instr::Const32 { dst: 8, value: 1 },
            Instr::TableCopy {
                dst_table: 1,
                src_table: 0,
                dst: 0,
                src: 4,
                n: 8,
            },
            Instr::Const32 { dst: 0, value: 0 },
            Instr::CallIndirect {
                table_index: 1,
                type_index: fn_ty.index(),
                index: 0,
                arg_offsets: vec![],
                result_offsets: vec![4],
            },
            Instr::Return { result_offsets: vec![4] },
        ],
        required_stack_size: 12,
        catch_table: vec![],
        jit: None,
    });

    module.elements.push(ElementSegmentDef {
        kind: ElementSegmentKind::Active {
            table_index: 0,
            offset: ConstExpr::I32(0),
        },
        element_kind: TableElementKind::FuncRef,
        elements: vec![ElementExpr::RefFunc(0)],
    });

    module.exports.push(Export {
        name: "run".to_string(),
        desc: ExportDesc::Func(1),
    });

    let instance = common::instantiate(&mut store, module);
    let results = common::call_export(&mut store, instance, "run", &[]).expect("should not trap");
    assert_eq!(results, vec![Value::I32(42)]);
}

fn shl_module(store: &mut Store, amount: i32) -> Module {
    let ty = common::intern(store, &[], &[ValueKind::I32]);
    let code = vec![
        Instr::Const32 { dst: 0, value: 1 },
        Instr::Const32 { dst: 4, value: amount },
        Instr::I32Shl { dst: 8, a: 0, b: 4 },
        Instr::Return { result_offsets: vec![8] },
    ];
    let mut module = Module::new();
    module.funcs.push(ModuleFunction {
        ty,
        code,
        required_stack_size: 12,
        catch_table: vec![],
        jit: None,
    });
    module.exports.push(Export {
        name: "shl".to_string(),
        desc: ExportDesc::Func(0),
    });
    module
}

#[test]
fn shift_amount_is_masked_to_operand_width() {
    // i32.shl masks the shift amount to 5 bits, so a shift of 32 behaves
    // like a shift of 0.
    let mut store = Store::new();
    let module = shl_module(&mut store, 32);
    let instance = common::instantiate(&mut store, module);
    let results = common::call_export(&mut store, instance, "shl", &[]).expect("should not trap");
    assert_eq!(results, vec![Value::I32(1)]);
}

#[test]
fn ordinary_shift_is_unaffected_by_masking() {
    let mut store = Store::new();
    let module = shl_module(&mut store, 4);
    let instance = common::instantiate(&mut store, module);
    let results = common::call_export(&mut store, instance, "shl", &[]).expect("should not trap");
    assert_eq!(results, vec![Value::I32(16)]);
}

fn trunc_pair_module(store: &mut Store, value: f32) -> Module {
    let ty = common::intern(store, &[], &[ValueKind::I32, ValueKind::I32]);
    let code = vec![
        Instr::Const32 { dst: 0, value: value.to_bits() as i32 },
        Instr::I32TruncF32S { dst: 4, src: 0 },
        Instr::I32TruncSatF32S { dst: 8, src: 0 },
        Instr::Return { result_offsets: vec![4, 8] },
    ];
    let mut module = Module::new();
    module.funcs.push(ModuleFunction {
        ty,
        code,
        required_stack_size: 12,
        catch_table: vec![],
        jit: None,
    });
    module.exports.push(Export {
        name: "trunc_pair".to_string(),
        desc: ExportDesc::Func(0),
    });
    module
}

#[test]
fn checked_and_saturating_trunc_agree_on_an_in_range_value() {
    let mut store = Store::new();
    let module = trunc_pair_module(&mut store, 41.9);
    let instance = common::instantiate(&mut store, module);
    let results =
        common::call_export(&mut store, instance, "trunc_pair", &[]).expect("in-range trunc should not trap");
    assert_eq!(results, vec![Value::I32(41), Value::I32(41)]);
}
