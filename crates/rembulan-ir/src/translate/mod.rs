//! AST-to-IR translation (spec §4.3): the single entry point,
//! [`translate_chunk`], plus the builder state and per-node lowering it's
//! built from.

mod builder;
mod expr;
mod scope;
mod stmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::ast;
use crate::attrs::AttributeTable;
use crate::error::CompilerError;
use crate::ir::{FunctionIr, Module};

use builder::{Builder, TranslationCtx};

/// How the translator should account for CPU usage in the emitted IR.
/// `None` emits no accounting at all; `EveryBasicBlock` is a hint an
/// external code generator reads off [`Module::options`] to insert a step
/// counter at the head of every block -- the translator itself stays
/// agnostic to the host's accounting mechanism and just carries the choice
/// through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CpuAccountingMode {
    #[default]
    None,
    EveryBasicBlock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TranslatorOptions {
    pub cpu_accounting: CpuAccountingMode,
}

/// Translates a fully resolved chunk into its IR [`Module`]: the chunk's own
/// `FunctionIr` plus every nested function literal's, discovered in
/// translation order.
pub fn translate_chunk(
    chunk: &ast::Chunk,
    attrs: &AttributeTable,
    options: TranslatorOptions,
) -> Result<Module, CompilerError> {
    let mut ctx = TranslationCtx::new(attrs);
    let (code, arity) =
        Builder::translate_function_body(&mut ctx, chunk.id, chunk.pos, &[], true, &chunk.body)?;
    let chunk_ir = FunctionIr {
        code,
        arity,
        captures: Vec::new(),
    };
    Ok(Module {
        chunk: chunk_ir,
        functions: ctx.functions,
        options,
    })
}
