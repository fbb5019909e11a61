//! Test-only fixture helpers standing in for the external parser/resolver:
//! enough to hand-assemble a small resolved AST plus its attributes, the
//! way the teacher's own unit tests hand-assemble a `FuncState`
//! (`compiler/func_state.rs`) instead of running the full parser.

use rowan::{TextRange, TextSize};

use super::{NodeId, NodeIdGen, Position};

pub(crate) struct IdGen(NodeIdGen);

impl IdGen {
    pub(crate) fn new() -> Self {
        IdGen(NodeIdGen::new())
    }

    pub(crate) fn next(&mut self) -> NodeId {
        self.0.next()
    }
}

/// A distinct, orderable dummy position. Tests only ever care that two
/// nodes have *different* positions, never about line/column content.
pub(crate) fn pos(n: u32) -> Position {
    TextRange::new(TextSize::from(n), TextSize::from(n + 1))
}
