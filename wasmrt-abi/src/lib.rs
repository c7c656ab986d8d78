//! Host/JIT-facing ABI types for the `wasmrt` WebAssembly engine.
//!
//! This crate is deliberately small and dependency-light: it defines the
//! vocabulary that crosses the boundary between the interpreter core, host
//! embedder callbacks, and (eventually) ahead-of-instantiation JIT-compiled
//! entry points, so that none of those three need to depend on the whole
//! engine crate to speak a common `Value`/`Trap` language.

pub mod handle;
pub mod trap;
pub mod value;

pub mod prelude {
    pub use super::handle::Handle;
    pub use super::trap::{InstantiateError, LinkError, Trap, TrapKind};
    pub use super::value::{Value, ValueKind};
}

pub use prelude::*;
