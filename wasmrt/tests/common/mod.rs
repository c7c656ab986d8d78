//! Shared helpers for hand-assembling `Module`s in integration tests.
//!
//! The binary parser is out of scope for this engine, so every test here
//! builds the `Module` data model directly instead of decoding a `.wasm`
//! blob -- these helpers just remove the boilerplate of registering a
//! module and instantiating it with no host imports.
#![allow(dead_code)]

use wasmrt::exception::Unwind;
use wasmrt::instance::Instance;
use wasmrt::module::Module;
use wasmrt::store::Store;
use wasmrt::types::{FuncTypeHandle, FunctionType};
use wasmrt::{Handle, Value, ValueKind};

pub fn intern(store: &mut Store, params: &[ValueKind], results: &[ValueKind]) -> FuncTypeHandle {
    store
        .types()
        .intern(FunctionType::new(params.to_vec(), results.to_vec()))
}

/// Registers `module` and instantiates it with no imports, panicking on any
/// link/instantiation failure -- every module built in these tests is
/// self-contained.
pub fn instantiate(store: &mut Store, module: Module) -> Handle<Instance> {
    let handle = store.register_module(module);
    Instance::instantiate(store, handle, &std::collections::HashMap::new())
        .expect("instantiation of a self-contained test module should not fail")
}

/// Looks up `name` among `instance`'s exports and invokes it through the
/// same `call_function` entry point indirect calls and the host embedding
/// surface both use.
pub fn call_export(
    store: &mut Store,
    instance: Handle<Instance>,
    name: &str,
    args: &[Value],
) -> Result<Vec<Value>, Unwind> {
    let func_index = match store.instance(instance).get_export(name) {
        Some(wasmrt::module::ExportDesc::Func(index)) => index,
        other => panic!("export {name:?} is not a function: {other:?}"),
    };
    let func_handle = store.instance(instance).func_handle(func_index);
    wasmrt::call::call_function(store, func_handle, args)
}
