//! Expression lowering (spec §4.3).
//!
//! Two entry points: [`translate_expr`] evaluates an expression in
//! single-value context (truncating/padding a multi-value producer with
//! [`crate::ir::IrNode::AdjustToOne`]), [`translate_expr_multi`] evaluates
//! one in its natural multi-value form and is only ever called on a
//! producer (`f(...)`, `obj:m(...)`, `...`) -- checked by
//! [`ast::Expr::is_multi_value_producer`] before every call site.

use smol_str::SmolStr;

use crate::ast::{self, Expr};
use crate::attrs::{self, ResolvedVariable, UpvalueSource};
use crate::error::CompilerError;
use crate::ir::{CaptureDesc, CaptureSource, Constant, FunctionIr, IrNode, UpvalueSlot, Value, MultiValue};
use crate::ops;

use super::builder::Builder;

pub(super) fn translate_expr(builder: &mut Builder<'_, '_>, expr: &Expr) -> Result<Value, CompilerError> {
    match expr {
        Expr::Nil(..) => Ok(builder.load_const(Constant::Nil)),
        Expr::True(..) => Ok(builder.load_const(Constant::Bool(true))),
        Expr::False(..) => Ok(builder.load_const(Constant::Bool(false))),
        Expr::Int(_, _, n) => Ok(builder.load_const(Constant::Int(*n))),
        Expr::Float(_, _, n) => Ok(builder.load_const(Constant::Float(*n))),
        Expr::Str(_, _, s) => Ok(builder.load_const(Constant::Str(s.clone()))),
        Expr::Vararg(..) => {
            let multi = translate_expr_multi(builder, expr)?;
            let dst = builder.fresh_value();
            builder.emit(IrNode::AdjustToOne { dst, src: multi });
            Ok(dst)
        }
        Expr::Var(id, pos, name) => translate_var(builder, *id, *pos, name),
        Expr::Paren(_, _, inner) => translate_expr(builder, inner),
        Expr::Binary(b) => translate_binary(builder, b),
        Expr::Unary(u) => translate_unary(builder, u),
        Expr::Index(ix) => {
            let table = translate_expr(builder, &ix.table)?;
            let key = translate_expr(builder, &ix.key)?;
            let dst = builder.fresh_value();
            builder.emit(IrNode::TableGet { dst, table, key });
            Ok(dst)
        }
        Expr::Call(_) | Expr::MethodCall(_) => {
            let multi = translate_expr_multi(builder, expr)?;
            let dst = builder.fresh_value();
            builder.emit(IrNode::AdjustToOne { dst, src: multi });
            Ok(dst)
        }
        Expr::TableCtor(t) => translate_table_ctor(builder, t),
        Expr::FunctionBody(fb) => translate_function_literal(builder, fb),
    }
}

pub(super) fn translate_expr_multi(
    builder: &mut Builder<'_, '_>,
    expr: &Expr,
) -> Result<MultiValue, CompilerError> {
    match expr {
        Expr::Call(c) => translate_call(builder, c),
        Expr::MethodCall(m) => translate_method_call(builder, m),
        Expr::Vararg(..) => {
            let dst = builder.fresh_multi();
            builder.emit(IrNode::Vararg { dst });
            Ok(dst)
        }
        _ => unreachable!("translate_expr_multi called on a non multi-value-producing expression"),
    }
}

fn translate_var(
    builder: &mut Builder<'_, '_>,
    id: ast::NodeId,
    pos: ast::Position,
    name: &str,
) -> Result<Value, CompilerError> {
    let resolved = attrs::required::resolved_variable(builder.attrs(), id, pos)?.clone();
    let dst = builder.fresh_value();
    match resolved {
        ResolvedVariable::Local(binding) => {
            let local = builder
                .lookup_local(binding)
                .expect("resolved local has no bound register in the enclosing scope");
            builder.emit(IrNode::LoadLocal { dst, local });
        }
        ResolvedVariable::Upvalue(path) => {
            builder.emit(IrNode::LoadUpvalue {
                dst,
                slot: UpvalueSlot::from_index(path.slot),
            });
        }
        ResolvedVariable::Global => {
            builder.emit(IrNode::LoadGlobal {
                dst,
                name: SmolStr::new(name),
            });
        }
    }
    Ok(dst)
}

pub(super) fn translate_assign_target(
    builder: &mut Builder<'_, '_>,
    target: &Expr,
    value: Value,
) -> Result<(), CompilerError> {
    match target {
        Expr::Var(id, pos, name) => {
            let resolved = attrs::required::resolved_variable(builder.attrs(), *id, *pos)?.clone();
            match resolved {
                ResolvedVariable::Local(binding) => {
                    let local = builder
                        .lookup_local(binding)
                        .expect("resolved local has no bound register in the enclosing scope");
                    builder.emit(IrNode::StoreLocal { local, value });
                }
                ResolvedVariable::Upvalue(path) => {
                    builder.emit(IrNode::StoreUpvalue {
                        slot: UpvalueSlot::from_index(path.slot),
                        value,
                    });
                }
                ResolvedVariable::Global => {
                    builder.emit(IrNode::StoreGlobal {
                        name: SmolStr::new(name.as_str()),
                        value,
                    });
                }
            }
            Ok(())
        }
        Expr::Index(ix) => {
            let table = translate_expr(builder, &ix.table)?;
            let key = translate_expr(builder, &ix.key)?;
            builder.emit(IrNode::TableSet { table, key, value });
            Ok(())
        }
        _ => unreachable!("assignment target must be a variable or index expression"),
    }
}

fn translate_binary(builder: &mut Builder<'_, '_>, b: &ast::BinaryExpr) -> Result<Value, CompilerError> {
    match b.op {
        ast::BinOp::And => translate_and(builder, &b.lhs, &b.rhs),
        ast::BinOp::Or => translate_or(builder, &b.lhs, &b.rhs),
        ast::BinOp::Gt | ast::BinOp::Ge => {
            // `a > b`/`a >= b` evaluate `a` then `b`, in that order, but
            // compare with the operands swapped onto LT/LE -- there is no
            // dedicated GT/GE opcode.
            let lhs = translate_expr(builder, &b.lhs)?;
            let rhs = translate_expr(builder, &b.rhs)?;
            let op = if b.op == ast::BinOp::Gt {
                crate::ir::BinOp::Lt
            } else {
                crate::ir::BinOp::Le
            };
            let dst = builder.fresh_value();
            builder.emit(IrNode::Binary {
                dst,
                op,
                lhs: rhs,
                rhs: lhs,
            });
            Ok(dst)
        }
        _ => {
            let lhs = translate_expr(builder, &b.lhs)?;
            let rhs = translate_expr(builder, &b.rhs)?;
            let op = ops::translate_binop(b.op).ok_or_else(|| CompilerError::UnmappedOperator {
                pos: b.pos,
                operator: format!("{:?}", b.op),
            })?;
            let dst = builder.fresh_value();
            builder.emit(IrNode::Binary { dst, op, lhs, rhs });
            Ok(dst)
        }
    }
}

/// `a and b`: if `a` is falsy, the result is `a` without evaluating `b`;
/// otherwise the result is `b`. Both arms `Move` into one pre-allocated
/// register since the IR has no SSA φ node (spec §9).
fn translate_and(builder: &mut Builder<'_, '_>, lhs: &Expr, rhs: &Expr) -> Result<Value, CompilerError> {
    let lhs_v = translate_expr(builder, lhs)?;
    let result = builder.fresh_value();
    let rhs_label = builder.fresh_label();
    let short_circuit = builder.fresh_label();
    let join = builder.fresh_label();

    builder.terminate(crate::ir::Terminator::Branch {
        cond: lhs_v,
        on_true: rhs_label,
        on_false: short_circuit,
    });

    builder.open_block(short_circuit);
    builder.emit(IrNode::Move { dst: result, src: lhs_v });
    builder.terminate(crate::ir::Terminator::Jump { target: join });

    builder.open_block(rhs_label);
    let rhs_v = translate_expr(builder, rhs)?;
    builder.emit(IrNode::Move { dst: result, src: rhs_v });
    builder.terminate(crate::ir::Terminator::Jump { target: join });

    builder.open_block(join);
    Ok(result)
}

/// `a or b`: if `a` is truthy, the result is `a` without evaluating `b`;
/// otherwise the result is `b`.
fn translate_or(builder: &mut Builder<'_, '_>, lhs: &Expr, rhs: &Expr) -> Result<Value, CompilerError> {
    let lhs_v = translate_expr(builder, lhs)?;
    let result = builder.fresh_value();
    let short_circuit = builder.fresh_label();
    let rhs_label = builder.fresh_label();
    let join = builder.fresh_label();

    builder.terminate(crate::ir::Terminator::Branch {
        cond: lhs_v,
        on_true: short_circuit,
        on_false: rhs_label,
    });

    builder.open_block(short_circuit);
    builder.emit(IrNode::Move { dst: result, src: lhs_v });
    builder.terminate(crate::ir::Terminator::Jump { target: join });

    builder.open_block(rhs_label);
    let rhs_v = translate_expr(builder, rhs)?;
    builder.emit(IrNode::Move { dst: result, src: rhs_v });
    builder.terminate(crate::ir::Terminator::Jump { target: join });

    builder.open_block(join);
    Ok(result)
}

fn translate_unary(builder: &mut Builder<'_, '_>, u: &ast::UnaryExpr) -> Result<Value, CompilerError> {
    let operand = translate_expr(builder, &u.operand)?;
    let op = ops::translate_unop(u.op).ok_or_else(|| CompilerError::UnmappedOperator {
        pos: u.pos,
        operator: format!("{:?}", u.op),
    })?;
    let dst = builder.fresh_value();
    builder.emit(IrNode::Unary { dst, op, operand });
    Ok(dst)
}

fn translate_table_ctor(builder: &mut Builder<'_, '_>, t: &ast::TableCtor) -> Result<Value, CompilerError> {
    let table = builder.fresh_value();
    builder.emit(IrNode::NewTable { dst: table });

    if !t.array_items.is_empty() {
        let (values, trailing) = builder.translate_arglist(&t.array_items)?;
        for (i, value) in values.iter().enumerate() {
            let key = builder.load_int_const((i + 1) as i64);
            builder.emit(IrNode::TableSet {
                table,
                key,
                value: *value,
            });
        }
        if let Some(multi) = trailing {
            builder.emit(IrNode::TableAppendMulti {
                table,
                start_index: (values.len() + 1) as i64,
                src: multi,
            });
        }
    }

    for (key_expr, value_expr) in &t.fields {
        let key = translate_expr(builder, key_expr)?;
        let value = translate_expr(builder, value_expr)?;
        builder.emit(IrNode::TableSet { table, key, value });
    }

    Ok(table)
}

fn translate_function_literal(builder: &mut Builder<'_, '_>, fb: &ast::FunctionBody) -> Result<Value, CompilerError> {
    let (code, arity) = {
        let ctx = builder.ctx_mut();
        Builder::translate_function_body(ctx, fb.id, fb.pos, &fb.params, fb.is_vararg, &fb.body)?
    };

    let var_info = attrs::required::function_var_info(builder.attrs(), fb.id, fb.pos)?;
    let mut sources = Vec::with_capacity(var_info.captured_upvalues.len());
    for info in &var_info.captured_upvalues {
        let source = match info.source {
            UpvalueSource::ParentLocal(binding) => {
                let v = builder
                    .lookup_local(binding)
                    .expect("captured local not bound in the enclosing function's scope");
                CaptureSource::ParentLocal(v)
            }
            UpvalueSource::ParentUpvalue(slot) => {
                CaptureSource::ParentUpvalue(UpvalueSlot::from_index(slot))
            }
        };
        sources.push(source);
    }
    let descs: Vec<CaptureDesc> = sources.iter().map(|s| CaptureDesc { source: *s }).collect();

    let function_index = builder.ctx_mut().functions.len();
    builder.ctx_mut().functions.push(FunctionIr {
        code,
        arity,
        captures: descs,
    });

    let dst = builder.fresh_value();
    builder.emit(IrNode::Closure {
        dst,
        function: function_index,
        captures: sources,
    });
    Ok(dst)
}

fn translate_call(builder: &mut Builder<'_, '_>, c: &ast::Call) -> Result<MultiValue, CompilerError> {
    let (callee, args, trailing_multi) = translate_call_parts(builder, c)?;
    let dst = builder.fresh_multi();
    builder.emit(IrNode::Call {
        dst,
        callee,
        args,
        trailing_multi,
    });
    Ok(dst)
}

fn translate_method_call(builder: &mut Builder<'_, '_>, m: &ast::MethodCall) -> Result<MultiValue, CompilerError> {
    let (callee, args, trailing_multi) = translate_method_call_parts(builder, m)?;
    let dst = builder.fresh_multi();
    builder.emit(IrNode::Call {
        dst,
        callee,
        args,
        trailing_multi,
    });
    Ok(dst)
}

fn translate_call_parts(
    builder: &mut Builder<'_, '_>,
    c: &ast::Call,
) -> Result<(Value, Vec<Value>, Option<MultiValue>), CompilerError> {
    let callee = translate_expr(builder, &c.callee)?;
    let (args, trailing_multi) = builder.translate_arglist(&c.args)?;
    Ok((callee, args, trailing_multi))
}

fn translate_method_call_parts(
    builder: &mut Builder<'_, '_>,
    m: &ast::MethodCall,
) -> Result<(Value, Vec<Value>, Option<MultiValue>), CompilerError> {
    let object = translate_expr(builder, &m.object)?;
    let key = builder.load_const(Constant::Str(m.method.clone()));
    let callee = builder.fresh_value();
    builder.emit(IrNode::TableGet {
        dst: callee,
        table: object,
        key,
    });
    let (mut args, trailing_multi) = builder.translate_arglist(&m.args)?;
    args.insert(0, object);
    Ok((callee, args, trailing_multi))
}

/// Extracts `(callee, args, trailing_multi)` from `expr` if it is a direct
/// call or method call -- the shape a tail call needs -- without evaluating
/// anything twice. Returns `None` for every other expression, including a
/// parenthesized call (`(f())`), which Lua truncates to one value and so
/// never tail-calls.
pub(super) fn try_call_parts(
    builder: &mut Builder<'_, '_>,
    expr: &Expr,
) -> Result<Option<(Value, Vec<Value>, Option<MultiValue>)>, CompilerError> {
    match expr {
        Expr::Call(c) => Ok(Some(translate_call_parts(builder, c)?)),
        Expr::MethodCall(m) => Ok(Some(translate_method_call_parts(builder, m)?)),
        _ => Ok(None),
    }
}
