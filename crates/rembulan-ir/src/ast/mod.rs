//! Resolved Lua AST node shapes.
//!
//! This is the translator's input contract (spec §6): the real lexer,
//! parser and semantic analyzer are external collaborators and are not
//! implemented here. What *is* defined here is the shape every node takes
//! and the [`NodeId`] every node carries, since the attribute side-tables in
//! [`crate::attrs`] are keyed by node identity (spec §9's "parallel side
//! tables" realization for a language without runtime reflection).
//!
//! Every node also carries a [`Position`] (a byte range), matching the
//! teacher's use of `rowan::TextRange` for diagnostics
//! (`crates/luars/src/compiler/mod.rs`).

#[cfg(test)]
pub(crate) mod build;

use smol_str::SmolStr;

/// A byte-range source position. Line/column derivation is a lexer concern
/// (out of scope here); the translator only needs a stable, orderable span
/// to attach to errors.
pub type Position = rowan::TextRange;

/// Dense identity assigned to every AST node by the producing pipeline
/// stage (parser + resolver, external to this crate). Two nodes are equal
/// only if identical -- `NodeId`s are never reused across a single
/// compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> u32 {
        self.0
    }
}

/// Generates the dense, monotonically increasing `NodeId`s a resolved-AST
/// builder assigns while constructing the tree.
#[derive(Debug, Default)]
pub struct NodeIdGen(u32);

impl NodeIdGen {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn next(&mut self) -> NodeId {
        let id = NodeId(self.0);
        self.0 += 1;
        id
    }
}

/// Identity of a local binding (a `local` declaration, a function
/// parameter, a numeric/generic-for control variable), unique within the
/// function that introduces it. This is what `ResolvedVariable::Local` and
/// `FunctionVarInfo` refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(pub u32);

/// The top-level chunk: an anonymous vararg function body.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: NodeId,
    pub pos: Position,
    pub body: Block,
}

#[derive(Debug, Clone, Default)]
pub struct Block {
    pub stats: Vec<Stat>,
}

#[derive(Debug, Clone)]
pub enum Stat {
    Assign(Assign),
    LocalDecl(LocalDecl),
    Do(DoBlock),
    If(If),
    While(While),
    Repeat(Repeat),
    NumericFor(NumericFor),
    GenericFor(GenericFor),
    Return(Return),
    Break(Break),
    Label(LabelDef),
    Goto(Goto),
    Call(CallStat),
}

impl Stat {
    pub fn id(&self) -> NodeId {
        match self {
            Stat::Assign(s) => s.id,
            Stat::LocalDecl(s) => s.id,
            Stat::Do(s) => s.id,
            Stat::If(s) => s.id,
            Stat::While(s) => s.id,
            Stat::Repeat(s) => s.id,
            Stat::NumericFor(s) => s.id,
            Stat::GenericFor(s) => s.id,
            Stat::Return(s) => s.id,
            Stat::Break(s) => s.id,
            Stat::Label(s) => s.id,
            Stat::Goto(s) => s.id,
            Stat::Call(s) => s.id,
        }
    }

    pub fn pos(&self) -> Position {
        match self {
            Stat::Assign(s) => s.pos,
            Stat::LocalDecl(s) => s.pos,
            Stat::Do(s) => s.pos,
            Stat::If(s) => s.pos,
            Stat::While(s) => s.pos,
            Stat::Repeat(s) => s.pos,
            Stat::NumericFor(s) => s.pos,
            Stat::GenericFor(s) => s.pos,
            Stat::Return(s) => s.pos,
            Stat::Break(s) => s.pos,
            Stat::Label(s) => s.pos,
            Stat::Goto(s) => s.pos,
            Stat::Call(s) => s.pos,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Assign {
    pub id: NodeId,
    pub pos: Position,
    pub targets: Vec<Expr>,
    pub values: Vec<Expr>,
}

/// `local a, b, c = ...`. The `VarMapping` attribute on `id` maps each of
/// `names` to the `BindingId` the analyzer assigned it.
#[derive(Debug, Clone)]
pub struct LocalDecl {
    pub id: NodeId,
    pub pos: Position,
    pub names: Vec<SmolStr>,
    pub values: Vec<Expr>,
}

#[derive(Debug, Clone)]
pub struct DoBlock {
    pub id: NodeId,
    pub pos: Position,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub struct If {
    pub id: NodeId,
    pub pos: Position,
    pub cond: Expr,
    pub then_block: Block,
    /// `elseif` chains are represented as a single nested `If` statement
    /// inside `else_block` -- pure sugar, no separate node kind needed.
    pub else_block: Option<Block>,
}

#[derive(Debug, Clone)]
pub struct While {
    pub id: NodeId,
    pub pos: Position,
    pub cond: Expr,
    pub body: Block,
}

/// `repeat body until cond` -- `cond` is translated in a scope that still
/// sees locals declared in `body` (Lua's scoping rule for repeat-until).
#[derive(Debug, Clone)]
pub struct Repeat {
    pub id: NodeId,
    pub pos: Position,
    pub body: Block,
    pub cond: Expr,
}

/// `for name = start, stop[, step] do body end`. `VarMapping` on `id` maps
/// `var_name` to its `BindingId`.
#[derive(Debug, Clone)]
pub struct NumericFor {
    pub id: NodeId,
    pub pos: Position,
    pub var_name: SmolStr,
    pub start: Expr,
    pub stop: Expr,
    pub step: Option<Expr>,
    pub body: Block,
}

/// `for names in exprs do body end`. `VarMapping` on `id` maps each of
/// `var_names` to its `BindingId`.
#[derive(Debug, Clone)]
pub struct GenericFor {
    pub id: NodeId,
    pub pos: Position,
    pub var_names: Vec<SmolStr>,
    pub exprs: Vec<Expr>,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub struct Return {
    pub id: NodeId,
    pub pos: Position,
    pub values: Vec<Expr>,
}

#[derive(Debug, Clone)]
pub struct Break {
    pub id: NodeId,
    pub pos: Position,
}

#[derive(Debug, Clone)]
pub struct LabelDef {
    pub id: NodeId,
    pub pos: Position,
    pub name: SmolStr,
}

#[derive(Debug, Clone)]
pub struct Goto {
    pub id: NodeId,
    pub pos: Position,
    pub name: SmolStr,
}

#[derive(Debug, Clone)]
pub struct CallStat {
    pub id: NodeId,
    pub pos: Position,
    pub call: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
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
    Gt,
    Ge,
    Concat,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    BNot,
    Len,
    Not,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Nil(NodeId, Position),
    True(NodeId, Position),
    False(NodeId, Position),
    Int(NodeId, Position, i64),
    Float(NodeId, Position, f64),
    Str(NodeId, Position, SmolStr),
    Vararg(NodeId, Position),
    /// A bare name reference; resolved via `ResolvedVariable` keyed on `id`.
    Var(NodeId, Position, SmolStr),
    Paren(NodeId, Position, Box<Expr>),
    Binary(Box<BinaryExpr>),
    Unary(Box<UnaryExpr>),
    Index(Box<IndexExpr>),
    Call(Box<Call>),
    MethodCall(Box<MethodCall>),
    TableCtor(Box<TableCtor>),
    /// A function literal. `FunctionVarInfo` and a `VarMapping` (for
    /// parameters) are keyed on `FunctionBody::id`.
    FunctionBody(Box<FunctionBody>),
}

impl Expr {
    pub fn id(&self) -> NodeId {
        match self {
            Expr::Nil(id, _)
            | Expr::True(id, _)
            | Expr::False(id, _)
            | Expr::Int(id, _, _)
            | Expr::Float(id, _, _)
            | Expr::Str(id, _, _)
            | Expr::Vararg(id, _)
            | Expr::Var(id, _, _)
            | Expr::Paren(id, _, _) => *id,
            Expr::Binary(e) => e.id,
            Expr::Unary(e) => e.id,
            Expr::Index(e) => e.id,
            Expr::Call(e) => e.id,
            Expr::MethodCall(e) => e.id,
            Expr::TableCtor(e) => e.id,
            Expr::FunctionBody(e) => e.id,
        }
    }

    pub fn pos(&self) -> Position {
        match self {
            Expr::Nil(_, p)
            | Expr::True(_, p)
            | Expr::False(_, p)
            | Expr::Int(_, p, _)
            | Expr::Float(_, p, _)
            | Expr::Str(_, p, _)
            | Expr::Vararg(_, p)
            | Expr::Var(_, p, _)
            | Expr::Paren(_, p, _) => *p,
            Expr::Binary(e) => e.pos,
            Expr::Unary(e) => e.pos,
            Expr::Index(e) => e.pos,
            Expr::Call(e) => e.pos,
            Expr::MethodCall(e) => e.pos,
            Expr::TableCtor(e) => e.pos,
            Expr::FunctionBody(e) => e.pos,
        }
    }

    /// True for the two expression forms that produce a multi-value list
    /// when they appear in tail position (call results, `...`).
    pub fn is_multi_value_producer(&self) -> bool {
        matches!(self, Expr::Call(_) | Expr::MethodCall(_) | Expr::Vararg(_, _))
    }
}

#[derive(Debug, Clone)]
pub struct BinaryExpr {
    pub id: NodeId,
    pub pos: Position,
    pub op: BinOp,
    pub lhs: Expr,
    pub rhs: Expr,
}

#[derive(Debug, Clone)]
pub struct UnaryExpr {
    pub id: NodeId,
    pub pos: Position,
    pub op: UnOp,
    pub operand: Expr,
}

/// `table[key]` or (desugared by the parser) `table.key`.
#[derive(Debug, Clone)]
pub struct IndexExpr {
    pub id: NodeId,
    pub pos: Position,
    pub table: Expr,
    pub key: Expr,
}

#[derive(Debug, Clone)]
pub struct Call {
    pub id: NodeId,
    pub pos: Position,
    pub callee: Expr,
    pub args: Vec<Expr>,
}

/// `obj:method(args)`, lowered by the translator to a call with `obj`
/// prepended to the arguments and `method` looked up on `obj`.
#[derive(Debug, Clone)]
pub struct MethodCall {
    pub id: NodeId,
    pub pos: Position,
    pub object: Expr,
    pub method: SmolStr,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone)]
pub struct TableCtor {
    pub id: NodeId,
    pub pos: Position,
    /// Positional (array-part) entries. If the last entry is a multi-value
    /// producer used in tail position it expands to fill the array.
    pub array_items: Vec<Expr>,
    /// Explicit `[key] = value` / `name = value` entries.
    pub fields: Vec<(Expr, Expr)>,
}

#[derive(Debug, Clone)]
pub struct FunctionBody {
    pub id: NodeId,
    pub pos: Position,
    pub params: Vec<SmolStr>,
    pub is_vararg: bool,
    pub body: Block,
}
