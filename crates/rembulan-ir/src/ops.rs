//! Operator translation (spec §4.2).
//!
//! Two total mapping functions from the Lua surface operator set to IR
//! opcodes. `and`/`or`/`>`/`>=` have no IR opcode -- they're lowered
//! structurally by the translator (short-circuit control flow, operand
//! swap) -- so the mappings return `None` for them, and for any operator
//! the caller mistakenly thinks is mappable.

use crate::ast::{BinOp as AstBinOp, UnOp as AstUnOp};
use crate::ir::{BinOp as IrBinOp, UnOp as IrUnOp};

/// Maps a Lua surface binary operator to its IR opcode, or `None` if the
/// operator has no direct IR representative (`and`, `or`, `>`, `>=`).
pub fn translate_binop(op: AstBinOp) -> Option<IrBinOp> {
    match op {
        AstBinOp::Add => Some(IrBinOp::Add),
        AstBinOp::Sub => Some(IrBinOp::Sub),
        AstBinOp::Mul => Some(IrBinOp::Mul),
        AstBinOp::Div => Some(IrBinOp::Div),
        AstBinOp::IDiv => Some(IrBinOp::IDiv),
        AstBinOp::Mod => Some(IrBinOp::Mod),
        AstBinOp::Pow => Some(IrBinOp::Pow),
        AstBinOp::BAnd => Some(IrBinOp::BAnd),
        AstBinOp::BOr => Some(IrBinOp::BOr),
        AstBinOp::BXor => Some(IrBinOp::BXor),
        AstBinOp::Shl => Some(IrBinOp::Shl),
        AstBinOp::Shr => Some(IrBinOp::Shr),
        AstBinOp::Eq => Some(IrBinOp::Eq),
        AstBinOp::Neq => Some(IrBinOp::Neq),
        AstBinOp::Lt => Some(IrBinOp::Lt),
        AstBinOp::Le => Some(IrBinOp::Le),
        AstBinOp::Concat => Some(IrBinOp::Concat),
        // Lowered structurally: `>`/`>=` swap operands onto LT/LE, `and`/`or`
        // become short-circuiting control flow. No IR opcode exists for them.
        AstBinOp::Gt | AstBinOp::Ge | AstBinOp::And | AstBinOp::Or => None,
    }
}

/// Maps a Lua surface unary operator to its IR opcode. Total over the unary
/// operator set -- there is no unary operator lowered structurally.
pub fn translate_unop(op: AstUnOp) -> Option<IrUnOp> {
    match op {
        AstUnOp::Neg => Some(IrUnOp::Unm),
        AstUnOp::BNot => Some(IrUnOp::BNot),
        AstUnOp::Len => Some(IrUnOp::Len),
        AstUnOp::Not => Some(IrUnOp::Not),
    }
}
