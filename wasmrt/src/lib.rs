//! wasmrt: the core execution engine of a standalone WebAssembly runtime.
//!
//! This crate owns everything from the `Store` down: linear memory and
//! table runtimes, the instance model, the stack-allocated byte-code
//! executor, the call protocol, and the trap/exception unwinding protocol.
//! Parsing a `.wasm` binary into the `Module` data model this crate
//! consumes, and generating real machine code behind the [`jit`] shim, are
//! both out of scope -- see `wasmrt-abi` for the small vocabulary those
//! external collaborators would share with this engine.

pub mod call;
pub mod exception;
pub mod exec;
pub mod frame;
pub mod function;
pub mod global;
pub mod instance;
pub mod jit;
pub mod memory;
pub mod module;
pub mod segment;
pub mod store;
pub mod table;
pub mod tag;
pub mod types;

pub mod prelude {
    pub use super::exception::{run, Exception, RunOutcome, Unwind};
    pub use super::function::FuncData;
    pub use super::instance::{ExternVal, Instance};
    pub use super::module::Module;
    pub use super::store::Store;
    pub use wasmrt_abi::{Handle, Trap, TrapKind, Value, ValueKind};
}

pub use prelude::*;
