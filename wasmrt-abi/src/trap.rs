//! Trap taxonomy and link/instantiate error types.
//!
//! `TrapKind` enumerates the fixed set of built-in trap reasons a running
//! module can raise; the `Display` strings are part of the wire contract
//! (conformance suites compare them verbatim), so they must not be
//! reworded.

use thiserror::Error;

/// A built-in trap reason, raised by the runtime itself (as opposed to a
/// user exception raised by `throw`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TrapKind {
    #[error("unreachable executed")]
    UnreachableExecuted,

    #[error("integer divide by zero")]
    IntegerDivideByZero,

    #[error("integer overflow")]
    IntegerOverflow,

    #[error("invalid conversion to integer")]
    InvalidConversionToInteger,

    #[error("out of bounds memory access")]
    OutOfBoundsMemoryAccess,

    #[error("out of bounds table access")]
    OutOfBoundsTableAccess,

    #[error("undefined element {0}")]
    UndefinedElement(u32),

    #[error("uninitialized element {0}")]
    UninitializedElement(u32),

    #[error("indirect call type mismatch")]
    IndirectCallTypeMismatch,

    #[error("call stack exhausted")]
    CallStackExhausted,

    #[error("type mismatch")]
    TypeMismatch,

    #[error("out of memory")]
    OutOfMemory,
}

/// A trap together with the diagnostic frame/pc trail captured at the
/// throw site (mirrors the `(frame, program-counter)` list the original
/// engine attaches to every exception).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct Trap {
    pub kind: TrapKind,
    pub trace: Vec<TrapFrame>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrapFrame {
    pub function_index: u32,
    pub program_counter: u32,
}

impl Trap {
    pub fn new(kind: TrapKind) -> Self {
        Self {
            kind,
            trace: Vec::new(),
        }
    }

    pub fn with_frame(mut self, frame: TrapFrame) -> Self {
        self.trace.push(frame);
        self
    }
}

impl From<TrapKind> for Trap {
    fn from(kind: TrapKind) -> Self {
        Trap::new(kind)
    }
}

/// Failure while resolving a module's imports against host-supplied
/// capabilities. Surfaced to the host as a plain `Result`, never as a trap.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("unknown import: {module}.{name}")]
    UnknownImport { module: String, name: String },

    #[error("import kind mismatch for {module}.{name}: expected {expected}, got {got}")]
    KindMismatch {
        module: String,
        name: String,
        expected: &'static str,
        got: &'static str,
    },

    #[error("import type mismatch for {module}.{name}")]
    TypeMismatch { module: String, name: String },

    #[error("imported memory/table limits do not subsume the declared import")]
    LimitsMismatch,
}

/// Failure during the instantiation algorithm itself (§4.5): active segment
/// or start-function traps, or malformed global init expressions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstantiateError {
    #[error(transparent)]
    Link(#[from] LinkError),

    #[error("instantiation trapped: {0}")]
    Trapped(#[from] Trap),
}
