//! Typed attribute lookup (spec §4.1).
//!
//! The semantic analyzer (external to this crate) attaches four categories
//! of attribute to specific AST nodes before translation begins. Rather
//! than model this as a heterogeneous map keyed per node -- Rust has no
//! runtime reflection to make that ergonomic -- each category gets its own
//! parallel side table keyed by [`NodeId`], per spec §9's guidance. This
//! mirrors the teacher's own preference for flat side-tables over nested
//! ownership (`Compiler::labels`/`Compiler::gotos` in
//! `crates/luars/src/compiler/mod.rs` rather than attributes threaded
//! through the tree itself).

use std::fmt;

use ahash::AHashMap;
use smol_str::SmolStr;

use crate::ast::{BindingId, NodeId, Position};
use crate::error::CompilerError;

/// Which attribute category a lookup failure concerns; carried on
/// [`CompilerError::MissingAttribute`] so the report names both the missing
/// category and the offending node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeCategory {
    ResolvedVariable,
    ResolvedLabel,
    FunctionVarInfo,
    VarMapping,
}

impl fmt::Display for AttributeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttributeCategory::ResolvedVariable => "ResolvedVariable",
            AttributeCategory::ResolvedLabel => "ResolvedLabel",
            AttributeCategory::FunctionVarInfo => "FunctionVarInfo",
            AttributeCategory::VarMapping => "VarMapping",
        };
        f.write_str(name)
    }
}

/// How a variable reference resolved: to a local binding, to an upvalue, or
/// to a global (indexed off the environment table by name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedVariable {
    Local(BindingId),
    Upvalue(CapturePath),
    Global,
}

/// A resolved upvalue reference: the index into the *referencing*
/// function's own `FunctionVarInfo::captured_upvalues` / IR capture list
/// this reference uses. Threading a deeply-nested capture through
/// intervening functions' upvalue lists is resolution work the analyzer has
/// already done by the time this attribute is attached -- by the time the
/// translator sees a reference it only ever needs "my slot N", never a
/// chain of enclosing-function hops to re-derive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapturePath {
    pub slot: u32,
}

/// The unique label-defining statement a `goto` resolves to (or that a
/// label-defining statement trivially resolves to itself).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedLabel {
    pub target: NodeId,
}

/// Where a captured upvalue's value comes from, from the capturing
/// function's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpvalueSource {
    /// Sourced from a local register of the immediately enclosing function.
    ParentLocal(BindingId),
    /// Sourced from upvalue slot `index` of the immediately enclosing
    /// function (the enclosing function is itself only capturing it on
    /// behalf of a function nested deeper).
    ParentUpvalue(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpvalueInfo {
    pub name: SmolStr,
    pub source: UpvalueSource,
}

/// A function's (or the chunk's) locals and captured upvalues, as computed
/// by the analyzer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionVarInfo {
    pub locals: Vec<BindingId>,
    pub captured_upvalues: Vec<UpvalueInfo>,
}

/// Maps the textual names a local-introducing statement declares to the
/// `BindingId`s the analyzer assigned them, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VarMapping(pub AHashMap<SmolStr, BindingId>);

impl VarMapping {
    pub fn get(&self, name: &str) -> Option<BindingId> {
        self.0.get(name).copied()
    }
}

/// The full set of attribute side-tables produced by the (external)
/// analyzer and consumed read-only by the translator.
#[derive(Debug, Default)]
pub struct AttributeTable {
    resolved_variables: AHashMap<NodeId, ResolvedVariable>,
    resolved_labels: AHashMap<NodeId, ResolvedLabel>,
    function_var_infos: AHashMap<NodeId, FunctionVarInfo>,
    var_mappings: AHashMap<NodeId, VarMapping>,
}

impl AttributeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_resolved_variable(&mut self, node: NodeId, attr: ResolvedVariable) {
        self.resolved_variables.insert(node, attr);
    }

    pub fn set_resolved_label(&mut self, node: NodeId, attr: ResolvedLabel) {
        self.resolved_labels.insert(node, attr);
    }

    pub fn set_function_var_info(&mut self, node: NodeId, attr: FunctionVarInfo) {
        self.function_var_infos.insert(node, attr);
    }

    pub fn set_var_mapping(&mut self, node: NodeId, attr: VarMapping) {
        self.var_mappings.insert(node, attr);
    }
}

/// Required-lookup operations (spec §4.1): return the attached attribute or
/// a structured [`CompilerError`] naming both the category and the node's
/// position. Absence here is always a bug in the preceding analysis pass,
/// never a condition this crate recovers from.
pub mod required {
    use super::*;

    pub fn resolved_variable<'a>(
        attrs: &'a AttributeTable,
        node: NodeId,
        pos: Position,
    ) -> Result<&'a ResolvedVariable, CompilerError> {
        attrs.resolved_variables.get(&node).ok_or_else(|| {
            CompilerError::missing_attribute(
                AttributeCategory::ResolvedVariable,
                pos,
                "variable reference",
            )
        })
    }

    pub fn resolved_label<'a>(
        attrs: &'a AttributeTable,
        node: NodeId,
        pos: Position,
    ) -> Result<&'a ResolvedLabel, CompilerError> {
        attrs.resolved_labels.get(&node).ok_or_else(|| {
            CompilerError::missing_attribute(
                AttributeCategory::ResolvedLabel,
                pos,
                "label or goto statement",
            )
        })
    }

    pub fn function_var_info<'a>(
        attrs: &'a AttributeTable,
        node: NodeId,
        pos: Position,
    ) -> Result<&'a FunctionVarInfo, CompilerError> {
        attrs.function_var_infos.get(&node).ok_or_else(|| {
            CompilerError::missing_attribute(
                AttributeCategory::FunctionVarInfo,
                pos,
                "function literal or chunk",
            )
        })
    }

    pub fn var_mapping<'a>(
        attrs: &'a AttributeTable,
        node: NodeId,
        pos: Position,
    ) -> Result<&'a VarMapping, CompilerError> {
        attrs.var_mappings.get(&node).ok_or_else(|| {
            CompilerError::missing_attribute(
                AttributeCategory::VarMapping,
                pos,
                "local-introducing statement",
            )
        })
    }
}

/// Optional-lookup operations: return the sentinel "absent" (`None`) rather
/// than erroring when an attribute is legitimately optional. No attribute
/// category in the present core is ever legitimately absent, but the shape
/// exists so a future category can use it without changing the lookup
/// protocol (spec §4.1).
pub mod optional {
    use super::*;

    pub fn resolved_variable<'a>(
        attrs: &'a AttributeTable,
        node: NodeId,
    ) -> Option<&'a ResolvedVariable> {
        attrs.resolved_variables.get(&node)
    }
}
