//! The IR value model (spec §3): operands, nodes, basic blocks and the CFG
//! container.
//!
//! Identifiers (`Value`, `MultiValue`, `UpvalueSlot`, `Label`) are dense,
//! opaque `u32` newtypes assigned only by the translator's builder state,
//! in the style of the teacher's `GcId` (`crates/luars/src/gc/gc_id.rs`):
//! `Copy`, compared only by identity, never reused across functions.
//!
//! IR nodes, blocks and `Code`s are produced once by the translator and
//! never mutated afterwards; downstream passes (liveness, register
//! allocation, code emission -- all external collaborators) consume them
//! read-only.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use ahash::AHashMap;
use smol_str::SmolStr;

macro_rules! dense_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        pub struct $name(u32);

        impl $name {
            pub fn from_index(index: u32) -> Self {
                Self(index)
            }

            pub fn index(self) -> u32 {
                self.0
            }
        }
    };
}

dense_id!(Value);
dense_id!(MultiValue);
dense_id!(UpvalueSlot);
dense_id!(Label);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    IDiv,
    Mod,
    Pow,
    BAnd,
    BOr,
    BXor,
    Shl,
    Shr,
    Eq,
    Neq,
    Lt,
    Le,
    Concat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum UnOp {
    Unm,
    BNot,
    Len,
    Not,
}

/// A constant load's payload. Lua 5.3 distinguishes integer from float at
/// the value-representation level, so the IR preserves that distinction
/// rather than collapsing both into a single numeric variant.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Constant {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(SmolStr),
}

/// Where a closure's upvalue comes from, expressed purely in terms of the
/// enclosing function's own storage (mirrors `UpvalueSource` in
/// [`crate::attrs`], but in IR terms).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CaptureSource {
    ParentLocal(Value),
    ParentUpvalue(UpvalueSlot),
}

/// One non-terminator unit of work inside a basic block. Every node falls
/// through to the next node in its block; only a block's [`Terminator`]
/// transfers control.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum IrNode {
    LoadConst {
        dst: Value,
        value: Constant,
    },
    Binary {
        dst: Value,
        op: BinOp,
        lhs: Value,
        rhs: Value,
    },
    /// Covers both the unary operator table (`-`, `~`, `not`) and length
    /// (`#`) -- `#4.2` maps `#` to `UnOp::Len` in the same total function as
    /// the others, so it needs no separate node kind.
    Unary {
        dst: Value,
        op: UnOp,
        operand: Value,
    },
    NewTable {
        dst: Value,
    },
    TableGet {
        dst: Value,
        table: Value,
        key: Value,
    },
    TableSet {
        table: Value,
        key: Value,
        value: Value,
    },
    /// Appends every value of a multi-value result to a table constructor's
    /// array part, starting at `start_index` (1-based, Lua array
    /// convention). Used only for a table constructor's trailing
    /// array-part entry when it is a call/vararg expansion -- the
    /// resulting length isn't known until runtime, so unlike an ordinary
    /// `TableSet` this can't be decomposed into a fixed number of them.
    TableAppendMulti {
        table: Value,
        start_index: i64,
        src: MultiValue,
    },
    LoadLocal {
        dst: Value,
        local: Value,
    },
    StoreLocal {
        local: Value,
        value: Value,
    },
    LoadUpvalue {
        dst: Value,
        slot: UpvalueSlot,
    },
    StoreUpvalue {
        slot: UpvalueSlot,
        value: Value,
    },
    /// Global access: indexed load/store on the environment table by name.
    LoadGlobal {
        dst: Value,
        name: SmolStr,
    },
    StoreGlobal {
        name: SmolStr,
        value: Value,
    },
    Call {
        dst: MultiValue,
        callee: Value,
        args: Vec<Value>,
        /// When set, the final argument is expanded from a multi-value
        /// producer rather than passed as a single value.
        trailing_multi: Option<MultiValue>,
    },
    /// Expands a multi-value into a single value: the first element, or
    /// nil if empty. Used whenever a call/vararg result is consumed in
    /// single-value context.
    AdjustToOne {
        dst: Value,
        src: MultiValue,
    },
    /// Expands a multi-value into exactly `dsts.len()` discrete values,
    /// padding with nil if `src` holds fewer. Used for the fixed-arity tail
    /// of a multi-assignment, local declaration, or generic-for explist
    /// when the last expression is a call/vararg.
    AdjustMulti {
        dsts: Vec<Value>,
        src: MultiValue,
    },
    /// A plain register copy, named after the teacher's own `OpCode::Move`
    /// (`R(A) := R(B)`). Used to unify two independently-computed values
    /// into one shared register, most notably short-circuit `and`/`or`
    /// result collection (spec §9): the IR is not SSA, so there is no φ
    /// node -- both branches `Move` into the same pre-allocated register.
    Move {
        dst: Value,
        src: Value,
    },
    Vararg {
        dst: MultiValue,
    },
    Closure {
        dst: Value,
        function: usize,
        captures: Vec<CaptureSource>,
    },
    /// A runtime error detected structurally by the translator rather than
    /// reported by a value operation (e.g. a numeric-for whose `step`
    /// evaluates to zero). Always immediately followed by
    /// `Terminator::Unreachable` in the same block.
    RuntimeError { message: SmolStr },
}

/// The final node of a basic block: the only kind that transfers control.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Terminator {
    Jump {
        target: Label,
    },
    Branch {
        cond: Value,
        on_true: Label,
        on_false: Label,
    },
    Return {
        values: Vec<Value>,
        trailing_multi: Option<MultiValue>,
    },
    /// A tail call: a `Call` whose result is the function's result. Kept
    /// distinct from `Return` so an external code emitter can recognise the
    /// tail-call opportunity without pattern-matching a `Call` node
    /// followed by a `Return` of its own result.
    TailCall {
        callee: Value,
        args: Vec<Value>,
        trailing_multi: Option<MultiValue>,
    },
    /// Closes a block that always ends in a `RuntimeError`. Reachable only
    /// when that runtime error actually fires (e.g. a numeric-for whose
    /// `step` evaluates to zero); exists so every block still ends in
    /// exactly one terminator.
    Unreachable,
}

impl Terminator {
    /// The labels this terminator transfers control to, in the terminator's
    /// own declared order (used by breadth-first label ordering to make
    /// successor visitation deterministic).
    pub fn successors(&self) -> Vec<Label> {
        match self {
            Terminator::Jump { target } => vec![*target],
            Terminator::Branch {
                on_true, on_false, ..
            } => vec![*on_true, *on_false],
            Terminator::Return { .. }
            | Terminator::TailCall { .. }
            | Terminator::Unreachable => Vec::new(),
        }
    }
}

/// An ordered sequence of non-terminator nodes followed by exactly one
/// terminator.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BasicBlock {
    pub nodes: Vec<IrNode>,
    pub terminator: Terminator,
}

/// A function's control-flow graph: a label → block mapping, a
/// distinguished entry label, and the insertion order blocks were created
/// in (used as the default order for linear iteration -- deterministic
/// because translation itself is deterministic).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Code {
    entry: Label,
    order: Vec<Label>,
    blocks: AHashMap<Label, BasicBlock>,
}

impl Code {
    pub(crate) fn new(entry: Label) -> Self {
        Code {
            entry,
            order: Vec::new(),
            blocks: AHashMap::new(),
        }
    }

    pub(crate) fn insert_block(&mut self, label: Label, block: BasicBlock) {
        debug_assert!(
            !self.blocks.contains_key(&label),
            "label inserted into its Code twice"
        );
        self.order.push(label);
        self.blocks.insert(label, block);
    }

    pub fn entry(&self) -> Label {
        self.entry
    }

    pub fn get(&self, label: Label) -> Option<&BasicBlock> {
        self.blocks.get(&label)
    }

    pub fn contains(&self, label: Label) -> bool {
        self.blocks.contains_key(&label)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Blocks in the order they were created by the translator.
    pub fn blocks_in_order(&self) -> impl Iterator<Item = (Label, &BasicBlock)> {
        self.order.iter().map(move |label| (*label, &self.blocks[label]))
    }
}

/// A function's parameter arity: a fixed count plus whether it also accepts
/// a trailing `...`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Arity {
    pub fixed_params: u32,
    pub is_vararg: bool,
}

/// An ordered description of one upvalue a function captures: whether it
/// comes from a parent local or a parent upvalue, and that source's index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CaptureDesc {
    pub source: CaptureSource,
}

/// One function's complete compiled form: its CFG, arity and capture list.
///
/// Registers are per-function and dense: the first `arity.fixed_params`
/// `Value`s ever allocated for this function are its incoming parameters, in
/// declaration order, each bound to a fresh "home" register up front (spec
/// §5's register-window convention). Every other `Value` is allocated lazily
/// as the translator reaches the expression or local declaration that needs
/// it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FunctionIr {
    pub code: Code,
    pub arity: Arity,
    pub captures: Vec<CaptureDesc>,
}

/// The complete output of translation: the top-level chunk's `FunctionIr`
/// plus every nested function literal's `FunctionIr`, in the order their
/// function bodies were translated. `Closure::function` indexes into
/// `functions`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Module {
    pub chunk: FunctionIr,
    pub functions: Vec<FunctionIr>,
    pub options: crate::translate::TranslatorOptions,
}
