//! User exceptions raised by `throw` and caught by a `try_table`/`catch`
//! region in the same function (spec components C7/C8), exercising the
//! catch-table scan in `Executor::catch` rather than native unwinding.

mod common;

use wasmrt::exception::Unwind;
use wasmrt::exec::opcode::Instr;
use wasmrt::module::{
    CatchClause, CatchClauseKind, CatchInfo, Export, ExportDesc, Module, ModuleFunction,
};
use wasmrt::store::Store;
use wasmrt::{Trap, TrapKind, Value, ValueKind};

fn round_trip_module(store: &mut Store) -> Module {
    let tag_ty = common::intern(store, &[ValueKind::I32], &[]);
    let fn_ty = common::intern(store, &[], &[ValueKind::I32]);

    // 0 = thrown payload, 4 = caught payload, 8 = const 1, 12 = sum.
    let code = vec![
        Instr::Const32 { dst: 0, value: 7 },
        Instr::Throw {
            tag_index: 0,
            payload_offsets: vec![0],
        },
        Instr::Const32 { dst: 8, value: 1 },
        Instr::I32Add { dst: 12, a: 4, b: 8 },
        Instr::Return { result_offsets: vec![12] },
    ];

    let catch_table = vec![CatchInfo {
        try_start: 1,
        try_end: 2,
        clauses: vec![CatchClause {
            kind: CatchClauseKind::Catch { tag_index: 0 },
            target: 2,
            payload_dst: 4,
        }],
    }];

    let mut module = Module::new();
    module.tags.push(tag_ty);
    module.funcs.push(ModuleFunction {
        ty: fn_ty,
        code,
        required_stack_size: 16,
        catch_table,
        jit: None,
    });
    module.exports.push(Export {
        name: "round_trip".to_string(),
        desc: ExportDesc::Func(0),
    });
    module
}

/// Same shape as `round_trip_module` but with no catch clause for the tag
/// the function throws, so the exception must escape as an `Unwind`.
fn uncaught_module(store: &mut Store) -> Module {
    let tag_ty = common::intern(store, &[ValueKind::I32], &[]);
    let fn_ty = common::intern(store, &[], &[]);

    let code = vec![
        Instr::Const32 { dst: 0, value: 7 },
        Instr::Throw {
            tag_index: 0,
            payload_offsets: vec![0],
        },
    ];

    let mut module = Module::new();
    module.tags.push(tag_ty);
    module.funcs.push(ModuleFunction {
        ty: fn_ty,
        code,
        required_stack_size: 4,
        catch_table: vec![],
        jit: None,
    });
    module.exports.push(Export {
        name: "thrower".to_string(),
        desc: ExportDesc::Func(0),
    });
    module
}

#[test]
fn thrown_exception_is_caught_and_payload_recovered() {
    let mut store = Store::new();
    let module = round_trip_module(&mut store);
    let instance = common::instantiate(&mut store, module);

    let results = common::call_export(&mut store, instance, "round_trip", &[])
        .expect("the try_table region should catch its own throw");
    assert_eq!(results, vec![Value::I32(8)]);
}

#[test]
fn uncaught_exception_escapes_as_an_unwind() {
    let mut store = Store::new();
    let module = uncaught_module(&mut store);
    let instance = common::instantiate(&mut store, module);

    let err = common::call_export(&mut store, instance, "thrower", &[])
        .expect_err("an exception with no matching clause must propagate");
    match err {
        Unwind::Exception(e) => {
            let tag = store.instance(instance).tags[0];
            assert_eq!(e.tag, tag);
            assert_eq!(e.payload.len(), 4);
        }
        Unwind::Trap(Trap { kind, .. }) => panic!("expected an exception, got trap {kind:?}"),
    }
}
