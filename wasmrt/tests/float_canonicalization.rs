//! `f32.min`/`f64.min` must canonicalize any NaN result to the single
//! canonical NaN bit pattern regardless of the input NaN's payload bits
//! (spec component C1).

mod common;

use wasmrt::exec::opcode::Instr;
use wasmrt::module::{Export, ExportDesc, Module, ModuleFunction};
use wasmrt::store::Store;
use wasmrt::{Value, ValueKind};

const CANONICAL_F32_NAN: u32 = 0x7fc0_0000;
const CANONICAL_F64_NAN: u64 = 0x7ff8_0000_0000_0000;

fn min_f32_module(store: &mut Store, a_bits: i32, b_bits: i32) -> Module {
    let ty = common::intern(store, &[], &[ValueKind::F32]);
    let code = vec![
        Instr::Const32 { dst: 0, value: a_bits },
        Instr::Const32 { dst: 4, value: b_bits },
        Instr::F32Min { dst: 8, a: 0, b: 4 },
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
        name: "min".to_string(),
        desc: ExportDesc::Func(0),
    });
    module
}

#[test]
fn min_of_a_non_canonical_nan_and_one_produces_the_canonical_nan() {
    // An arbitrary non-canonical NaN payload, distinct from the canonical one.
    let weird_nan_bits = 0x7fc1_2345u32 as i32;
    let one_bits = 1.0f32.to_bits() as i32;

    let mut store = Store::new();
    let module = min_f32_module(&mut store, weird_nan_bits, one_bits);
    let instance = common::instantiate(&mut store, module);

    let results = common::call_export(&mut store, instance, "min", &[]).expect("should not trap");
    match &results[..] {
        [Value::F32(v)] => assert_eq!(v.to_bits(), CANONICAL_F32_NAN),
        other => panic!("expected a single f32 result, got {other:?}"),
    }
}

#[test]
fn min_of_two_ordinary_floats_is_unaffected_by_canonicalization() {
    let mut store = Store::new();
    let module = min_f32_module(&mut store, 1.0f32.to_bits() as i32, 2.0f32.to_bits() as i32);
    let instance = common::instantiate(&mut store, module);

    let results = common::call_export(&mut store, instance, "min", &[]).expect("should not trap");
    assert_eq!(results, vec![Value::F32(1.0)]);
}

#[test]
fn canonical_nan_constants_match_ieee754_quiet_nan_bit_patterns() {
    // Sanity-check the constants this test file relies on against the
    // canonicalization helpers the executor itself calls.
    assert_eq!(wasmrt_abi::canonicalize_f32(f32::NAN).to_bits(), CANONICAL_F32_NAN);
    assert_eq!(wasmrt_abi::canonicalize_f64(f64::NAN).to_bits(), CANONICAL_F64_NAN);
}
