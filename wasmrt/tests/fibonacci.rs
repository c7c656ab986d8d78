//! End-to-end recursion test: a self-recursive `fib` function built
//! directly out of `Instr`s, exercising the call protocol (C12) across
//! many nested frames.

mod common;

use wasmrt::exec::opcode::Instr;
use wasmrt::module::{Export, ExportDesc, Module, ModuleFunction};
use wasmrt::store::Store;
use wasmrt::{Value, ValueKind};

fn fib_module(store: &mut Store) -> Module {
    let ty = common::intern(store, &[ValueKind::I32], &[ValueKind::I32]);

    // Frame layout: 0 = param n, 4 = (n<2), 8 = n-1, 12 = fib(n-1),
    // 16 = n-2, 20 = fib(n-2), 24/28 = scratch constants, 36 = sum.
    let code = vec![
        Instr::Const32 { dst: 24, value: 2 },
        Instr::I32LtS { dst: 4, a: 0, b: 24 },
        Instr::JumpIfFalse { cond: 4, target: 2 }, // -> idx4 (recursive case)
        Instr::Return { result_offsets: vec![0] },
        Instr::Const32 { dst: 28, value: 1 },
        Instr::I32Sub { dst: 8, a: 0, b: 28 },
        Instr::Call {
            func_index: 0,
            arg_offsets: vec![8],
            result_offsets: vec![12],
        },
        Instr::Const32 { dst: 24, value: 2 },
        Instr::I32Sub { dst: 16, a: 0, b: 24 },
        Instr::Call {
            func_index: 0,
            arg_offsets: vec![16],
            result_offsets: vec![20],
        },
        Instr::I32Add { dst: 36, a: 12, b: 20 },
        Instr::Return { result_offsets: vec![36] },
    ];

    let mut module = Module::new();
    module.funcs.push(ModuleFunction {
        ty,
        code,
        required_stack_size: 40,
        catch_table: vec![],
        jit: None,
    });
    module.exports.push(Export {
        name: "fib".to_string(),
        desc: ExportDesc::Func(0),
    });
    module
}

#[test]
fn fib_of_ten_is_fifty_five() {
    let mut store = Store::new();
    let module = fib_module(&mut store);
    let instance = common::instantiate(&mut store, module);

    let results = common::call_export(&mut store, instance, "fib", &[Value::I32(10)])
        .expect("fib(10) should not trap");
    assert_eq!(results, vec![Value::I32(55)]);
}

#[test]
fn fib_base_cases() {
    let mut store = Store::new();
    let module = fib_module(&mut store);
    let instance = common::instantiate(&mut store, module);

    for (n, expected) in [(0, 0), (1, 1), (2, 1), (7, 13)] {
        let results = common::call_export(&mut store, instance, "fib", &[Value::I32(n)])
            .unwrap_or_else(|e| panic!("fib({n}) should not trap: {e:?}"));
        assert_eq!(results, vec![Value::I32(expected)], "fib({n})");
    }
}
