//! Compiler invariant errors.
//!
//! Everything raised here is a bug in the caller pipeline (the analyzer
//! failed to attach a required attribute, or the translator itself built an
//! inconsistent construct) -- never a user-facing Lua diagnostic. Those are
//! produced upstream by the parser/resolver and never re-raised here.
//! Shaped the way the teacher's `beautify_compiler_error` in
//! `compiler/mod.rs` shapes its own errors: a structured (position,
//! message) pair with a `Display` impl, no `thiserror`/`anyhow` -- the
//! teacher uses neither anywhere in its dependency graph.

use std::fmt;

use crate::ast::Position;
use crate::attrs::AttributeCategory;

/// A compiler-invariant violation: something the translation pipeline
/// assumes is always true but found false.
#[derive(Debug, Clone)]
pub enum CompilerError {
    /// A required attribute was absent on an AST node.
    MissingAttribute {
        category: AttributeCategory,
        pos: Position,
        node_description: String,
    },
    /// `break` appeared with no enclosing loop on the break-target stack.
    BreakOutsideLoop { pos: Position },
    /// A `goto` target was never defined by the end of the function.
    UndefinedLabel { pos: Position, name: String },
    /// An operator-mapping function returned "none" for an operator the
    /// caller believed was valid (i.e. not one of the structurally-lowered
    /// operators `and`/`or`/`>`/`>=`).
    UnmappedOperator { pos: Position, operator: String },
}

impl CompilerError {
    pub fn missing_attribute(
        category: AttributeCategory,
        pos: Position,
        node_description: impl Into<String>,
    ) -> Self {
        CompilerError::MissingAttribute {
            category,
            pos,
            node_description: node_description.into(),
        }
    }

    /// The source position of the offending node, for caller-side reporting.
    pub fn position(&self) -> Position {
        match self {
            CompilerError::MissingAttribute { pos, .. } => *pos,
            CompilerError::BreakOutsideLoop { pos } => *pos,
            CompilerError::UndefinedLabel { pos, .. } => *pos,
            CompilerError::UnmappedOperator { pos, .. } => *pos,
        }
    }
}

impl fmt::Display for CompilerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompilerError::MissingAttribute {
                category,
                pos,
                node_description,
            } => write!(
                f,
                "internal compiler error: missing {category} attribute on {node_description} at {pos:?}"
            ),
            CompilerError::BreakOutsideLoop { pos } => write!(
                f,
                "internal compiler error: `break` outside any loop at {pos:?}"
            ),
            CompilerError::UndefinedLabel { pos, name } => write!(
                f,
                "internal compiler error: goto target `{name}` never defined (goto at {pos:?})"
            ),
            CompilerError::UnmappedOperator { pos, operator } => write!(
                f,
                "internal compiler error: operator `{operator}` has no IR mapping at {pos:?}"
            ),
        }
    }
}

impl std::error::Error for CompilerError {}
