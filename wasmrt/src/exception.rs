//! Exceptions (spec component C7 continued) and the trap/unwind runtime
//! (spec component C8).
//!
//! Rust has no cheap analogue of a C++ `throw` that unwinds arbitrary
//! native frames, so -- per the redesign note in the spec's design section
//! -- every opcode and call boundary returns `Result<T, Unwind>` instead of
//! performing a native non-local exit. `Trap::run` is therefore just an
//! ordinary function boundary that turns an `Err` into the structured
//! `{results, exception}` outcome the host sees; no native unwinding ever
//! happens.

use wasmrt_abi::{Trap, TrapKind, Value};

use crate::tag::Tag;
use wasmrt_abi::Handle;

/// A user exception raised by `throw`: a tag plus a packed payload snapshot
/// taken from the current frame, in the same stack-slot layout values use
/// everywhere else. `catch_all` handlers never inspect `tag`/`payload`.
#[derive(Debug, Clone)]
pub struct Exception {
    pub tag: Handle<Tag>,
    pub payload: Vec<u8>,
    pub trace: Vec<ExceptionFrame>,
}

#[derive(Debug, Clone, Copy)]
pub struct ExceptionFrame {
    pub function_index: u32,
    pub program_counter: u32,
}

impl Exception {
    pub fn new(tag: Handle<Tag>, payload: Vec<u8>) -> Self {
        Self {
            tag,
            payload,
            trace: Vec::new(),
        }
    }

    pub fn with_frame(mut self, frame: ExceptionFrame) -> Self {
        self.trace.push(frame);
        self
    }

    /// Finds the program counter this exception was at when it passed
    /// through `function_index`, by walking the captured trail -- this is
    /// how the interpreter recovers "the PC at throw time" for a frame
    /// that's still live on catch.
    pub fn pc_in_frame(&self, function_index: u32) -> Option<u32> {
        self.trace
            .iter()
            .find(|f| f.function_index == function_index)
            .map(|f| f.program_counter)
    }
}

/// Either a trap (runtime-raised, carries a message/reason) or a user
/// exception (wasm-raised via `throw`). This is the payload `Trap::run`
/// converts into the host-visible structured result.
#[derive(Debug, Clone)]
pub enum Unwind {
    Trap(Trap),
    Exception(Exception),
}

impl From<Trap> for Unwind {
    fn from(t: Trap) -> Self {
        Unwind::Trap(t)
    }
}
impl From<TrapKind> for Unwind {
    fn from(k: TrapKind) -> Self {
        Unwind::Trap(Trap::new(k))
    }
}
impl From<Exception> for Unwind {
    fn from(e: Exception) -> Self {
        Unwind::Exception(e)
    }
}

/// The host-visible result of a `Trap::run` region: a call either returns
/// results or produces an escaped exception (trap or uncaught user
/// exception), never both.
pub struct RunOutcome {
    pub results: Option<Vec<Value>>,
    pub exception: Option<Unwind>,
}

impl RunOutcome {
    pub fn ok(results: Vec<Value>) -> Self {
        Self {
            results: Some(results),
            exception: None,
        }
    }

    pub fn trapped(unwind: Unwind) -> Self {
        Self {
            results: None,
            exception: Some(unwind),
        }
    }
}

/// Runs `body`, converting any propagated `Unwind` into the structured
/// `{results, exception}` shape described in spec §7/§8. This is the single
/// point a host embedding ever needs to call `Trap::run` at: the outermost
/// call from the host into the module.
pub fn run(body: impl FnOnce() -> Result<Vec<Value>, Unwind>) -> RunOutcome {
    match body() {
        Ok(results) => RunOutcome::ok(results),
        Err(unwind) => RunOutcome::trapped(unwind),
    }
}
