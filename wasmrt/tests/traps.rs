//! Built-in trap conditions (spec component C8): signed integer overflow and
//! plain integer division by zero, exercised end to end through the
//! dispatch loop rather than unit-testing `exec::numeric` directly.

mod common;

use wasmrt::exception::Unwind;
use wasmrt::exec::opcode::Instr;
use wasmrt::module::{Export, ExportDesc, Module, ModuleFunction};
use wasmrt::store::Store;
use wasmrt::{Trap, TrapKind, ValueKind};

fn div_module(store: &mut Store, dividend: i32, divisor: i32) -> Module {
    let ty = common::intern(store, &[], &[ValueKind::I32]);
    let code = vec![
        Instr::Const32 { dst: 0, value: dividend },
        Instr::Const32 { dst: 4, value: divisor },
        Instr::I32DivS { dst: 8, a: 0, b: 4 },
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
        name: "div".to_string(),
        desc: ExportDesc::Func(0),
    });
    module
}

fn expect_trap(store: &mut Store, module: Module) -> TrapKind {
    let instance = common::instantiate(store, module);
    match common::call_export(store, instance, "div", &[])
        .expect_err("division should trap")
    {
        Unwind::Trap(Trap { kind, .. }) => kind,
        Unwind::Exception(e) => panic!("expected a trap, got an exception: {e:?}"),
    }
}

#[test]
fn min_divided_by_minus_one_overflows() {
    let mut store = Store::new();
    let module = div_module(&mut store, i32::MIN, -1);
    assert_eq!(expect_trap(&mut store, module), TrapKind::IntegerOverflow);
}

#[test]
fn division_by_zero_traps() {
    let mut store = Store::new();
    let module = div_module(&mut store, 10, 0);
    assert_eq!(expect_trap(&mut store, module), TrapKind::IntegerDivideByZero);
}

#[test]
fn ordinary_division_does_not_trap() {
    let mut store = Store::new();
    let module = div_module(&mut store, 10, 3);
    let instance = common::instantiate(&mut store, module);
    let results = common::call_export(&mut store, instance, "div", &[]).expect("should not trap");
    assert_eq!(results, vec![wasmrt::Value::I32(3)]);
}
