//! The module data model: the immutable, validated definition an `Instance`
//! is created from (spec component C9's input). Parsing/validating the
//! binary format is out of scope; a `Module` here is the already-resolved
//! shape a decoder would hand to the engine.

use crate::exec::opcode::Instr;
use crate::table::TableElementKind;
use crate::types::FuncTypeHandle;
use wasmrt_abi::ValueKind;

#[derive(Debug, Clone, Copy)]
pub enum ConstExpr {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    V128(u128),
    RefNull { is_func: bool },
    RefFunc(u32),
    GlobalGet(u32),
}

#[derive(Debug, Clone, Copy)]
pub struct MemoryDef {
    pub minimum_pages: u32,
    pub maximum_pages: Option<u32>,
    pub is_shared: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct TableDef {
    pub element_kind: TableElementKind,
    pub minimum: u32,
    pub maximum: Option<u32>,
}

#[derive(Debug, Clone, Copy)]
pub struct GlobalDef {
    pub kind: ValueKind,
    pub mutable: bool,
    pub init: ConstExpr,
}

#[derive(Debug, Clone, Copy)]
pub enum ImportDesc {
    Func(FuncTypeHandle),
    Table(TableDef),
    Memory(MemoryDef),
    Global { kind: ValueKind, mutable: bool },
    Tag(FuncTypeHandle),
}

#[derive(Debug, Clone)]
pub struct Import {
    pub module: String,
    pub name: String,
    pub desc: ImportDesc,
}

#[derive(Debug, Clone, Copy)]
pub enum ExportDesc {
    Func(u32),
    Table(u32),
    Memory(u32),
    Global(u32),
    Tag(u32),
}

#[derive(Debug, Clone)]
pub struct Export {
    pub name: String,
    pub desc: ExportDesc,
}

#[derive(Debug, Clone, Copy)]
pub enum DataSegmentKind {
    Active { memory_index: u32, offset: ConstExpr },
    Passive,
}

#[derive(Debug, Clone)]
pub struct DataSegmentDef {
    pub kind: DataSegmentKind,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy)]
pub enum ElementSegmentKind {
    Active { table_index: u32, offset: ConstExpr },
    Passive,
    Declared,
}

#[derive(Debug, Clone)]
pub struct ElementSegmentDef {
    pub kind: ElementSegmentKind,
    pub element_kind: TableElementKind,
    pub elements: Vec<crate::segment::ElementExpr>,
}

/// One clause of a `try_table` region: which unwind it matches and which
/// instruction index to resume at when it does.
#[derive(Debug, Clone, Copy)]
pub enum CatchClauseKind {
    Catch { tag_index: u32 },
    CatchRef { tag_index: u32 },
    CatchAll,
    CatchAllRef,
}

#[derive(Debug, Clone, Copy)]
pub struct CatchClause {
    pub kind: CatchClauseKind,
    pub target: u32,
    /// Frame offset the caught exception's payload (or exnref, for the
    /// `_ref` clause kinds) is written to on entry to `target`.
    pub payload_dst: u32,
}

/// A contiguous instruction-index range covered by one `try_table`, plus the
/// catch clauses active while the program counter is inside it. The
/// dispatch loop scans the (typically tiny) list of `CatchInfo`s whose range
/// contains the current PC whenever an `Unwind` propagates past an opcode,
/// rather than unwinding the native Rust stack.
#[derive(Debug, Clone)]
pub struct CatchInfo {
    pub try_start: u32,
    pub try_end: u32,
    pub clauses: Vec<CatchClause>,
}

#[derive(Debug, Clone)]
pub struct ModuleFunction {
    pub ty: FuncTypeHandle,
    pub code: Vec<Instr>,
    pub required_stack_size: u32,
    pub catch_table: Vec<CatchInfo>,
    /// Present only when an external code generator compiled this function
    /// ahead of instantiation; absent functions always run interpreted.
    pub jit: Option<crate::jit::JitEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct Module {
    pub imports: Vec<Import>,
    pub funcs: Vec<ModuleFunction>,
    pub tables: Vec<TableDef>,
    pub memories: Vec<MemoryDef>,
    pub globals: Vec<GlobalDef>,
    pub tags: Vec<FuncTypeHandle>,
    pub exports: Vec<Export>,
    pub start: Option<u32>,
    pub elements: Vec<ElementSegmentDef>,
    pub data: Vec<DataSegmentDef>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of imported functions, i.e. where module-local function
    /// indices in `funcs` start counting from. The combined (imports ++
    /// defined) index space is what every `func_index` in `Instr` and
    /// `Export`/`ElementExpr` refers to.
    pub fn imported_func_count(&self) -> u32 {
        self.imports
            .iter()
            .filter(|i| matches!(i.desc, ImportDesc::Func(_)))
            .count() as u32
    }

    pub fn imported_table_count(&self) -> u32 {
        self.imports
            .iter()
            .filter(|i| matches!(i.desc, ImportDesc::Table(_)))
            .count() as u32
    }

    pub fn imported_memory_count(&self) -> u32 {
        self.imports
            .iter()
            .filter(|i| matches!(i.desc, ImportDesc::Memory(_)))
            .count() as u32
    }

    pub fn imported_global_count(&self) -> u32 {
        self.imports
            .iter()
            .filter(|i| matches!(i.desc, ImportDesc::Global { .. }))
            .count() as u32
    }

    pub fn imported_tag_count(&self) -> u32 {
        self.imports
            .iter()
            .filter(|i| matches!(i.desc, ImportDesc::Tag(_)))
            .count() as u32
    }
}
