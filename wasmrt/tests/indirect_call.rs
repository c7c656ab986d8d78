//! `call_indirect` type-checking (spec component C12's indirect-call path):
//! a mismatched callee type, a null/uninitialized table slot, and an
//! out-of-bounds table index must each trap with their own distinct
//! `TrapKind`, never silently misinterpret the frame.

mod common;

use wasmrt::exception::Unwind;
use wasmrt::exec::opcode::Instr;
use wasmrt::module::{
    ConstExpr, ElementSegmentDef, ElementSegmentKind, Export, ExportDesc, Module, ModuleFunction,
    TableDef,
};
use wasmrt::segment::ElementExpr;
use wasmrt::store::Store;
use wasmrt::table::TableElementKind;
use wasmrt::{Trap, TrapKind, ValueKind};

/// Builds a module with a 2-slot funcref table and a `caller` export that
/// does `call_indirect` against `call_index` expecting `identity_ty`. Slot 0
/// is seeded (via an active element segment) with a function of a different
/// type than `identity_ty`; slot 1 is left uninitialized (null).
fn module_with_table(store: &mut Store, call_index: u32) -> Module {
    let identity_ty = common::intern(store, &[ValueKind::I32], &[ValueKind::I32]);
    let const_i64_ty = common::intern(store, &[], &[ValueKind::I64]);
    let caller_ty = common::intern(store, &[], &[ValueKind::I32]);

    let mut module = Module::new();
    module.tables.push(TableDef {
        element_kind: TableElementKind::FuncRef,
        minimum: 2,
        maximum: Some(2),
    });

    module.funcs.push(ModuleFunction {
        ty: identity_ty,
        code: vec![Instr::Return { result_offsets: vec![0] }],
        required_stack_size: 4,
        catch_table: vec![],
        jit: None,
    });
    module.funcs.push(ModuleFunction {
        ty: const_i64_ty,
        code: vec![
            Instr::Const64 { dst: 0, value: 99 },
            Instr::Return { result_offsets: vec![0] },
        ],
        required_stack_size: 8,
        catch_table: vec![],
        jit: None,
    });
    module.funcs.push(ModuleFunction {
        ty: caller_ty,
        code: vec![
            Instr::Const32 { dst: 0, value: 0 },
            Instr::CallIndirect {
                table_index: 0,
                type_index: identity_ty.index(),
                index: call_index,
                arg_offsets: vec![],
                result_offsets: vec![4],
            },
            Instr::Return { result_offsets: vec![4] },
        ],
        required_stack_size: 8,
        catch_table: vec![],
        jit: None,
    });

    module.elements.push(ElementSegmentDef {
        kind: ElementSegmentKind::Active {
            table_index: 0,
            offset: ConstExpr::I32(0),
        },
        element_kind: TableElementKind::FuncRef,
        // Table slot 0 holds the *wrong* function (const_i64, func index 1)
        // relative to `identity_ty`, the type the call site declares. Slot 1
        // is left uninitialized by this segment.
        elements: vec![ElementExpr::RefFunc(1)],
    });

    module.exports.push(Export {
        name: "caller".to_string(),
        desc: ExportDesc::Func(2),
    });
    module
}

fn expect_trap(store: &mut Store, module: Module) -> TrapKind {
    let instance = common::instantiate(store, module);
    match common::call_export(store, instance, "caller", &[])
        .expect_err("call_indirect should trap")
    {
        Unwind::Trap(Trap { kind, .. }) => kind,
        Unwind::Exception(e) => panic!("expected a trap, got an exception: {e:?}"),
    }
}

#[test]
fn mismatched_indirect_call_traps() {
    let mut store = Store::new();
    let module = module_with_table(&mut store, 0);
    assert_eq!(
        expect_trap(&mut store, module),
        TrapKind::IndirectCallTypeMismatch
    );
}

#[test]
fn indirect_call_through_a_null_slot_traps_uninitialized_element() {
    let mut store = Store::new();
    let module = module_with_table(&mut store, 1);
    assert_eq!(
        expect_trap(&mut store, module),
        TrapKind::UninitializedElement(1)
    );
}

#[test]
fn indirect_call_past_the_table_size_traps_undefined_element() {
    let mut store = Store::new();
    let module = module_with_table(&mut store, 2);
    assert_eq!(expect_trap(&mut store, module), TrapKind::UndefinedElement(2));
}
