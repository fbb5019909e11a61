//! AST-to-IR translation and control-flow-graph traversal for a Lua 5.3
//! compiler.
//!
//! This crate owns two things: the IR itself (value model, nodes, basic
//! blocks, [`ir::Module`]) and the translator that lowers a fully resolved
//! AST into it ([`translate::translate_chunk`]). It does not lex, parse, or
//! perform semantic analysis -- those stages, and everything downstream of
//! the IR (liveness, register allocation, bytecode emission), are external
//! collaborators. [`attrs::AttributeTable`] is the seam: the analyzer fills
//! it in, the translator only ever reads it.

pub mod ast;
pub mod attrs;
pub mod cfg;
pub mod error;
pub mod ir;
pub mod ops;
pub mod translate;

pub use error::CompilerError;
pub use ir::Module;
pub use translate::{translate_chunk, CpuAccountingMode, TranslatorOptions};

#[cfg(test)]
mod tests;
