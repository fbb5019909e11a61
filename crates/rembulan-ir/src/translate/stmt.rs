//! Statement lowering (spec §4.3).
//!
//! `translate_block` walks a block's statements in order. Once a statement
//! closes the current block (`return`, `break`, `goto`) every following
//! statement in the same list is unreachable and is skipped outright --
//! except a label definition a `goto` elsewhere in the function actually
//! targets, which reopens a fresh block and resumes live translation.

use ahash::AHashSet;
use smol_str::SmolStr;

use crate::ast::{self, Stat};
use crate::attrs;
use crate::error::CompilerError;
use crate::ir::{Constant, IrNode, Terminator};

use super::builder::Builder;
use super::expr;

pub(super) fn translate_block(
    builder: &mut Builder<'_, '_>,
    block: &ast::Block,
) -> Result<(), CompilerError> {
    for stat in &block.stats {
        translate_stat(builder, stat)?;
    }
    Ok(())
}

fn translate_stat(builder: &mut Builder<'_, '_>, stat: &Stat) -> Result<(), CompilerError> {
    // Label definitions can resume a dead block, so they run the dead-code
    // check themselves instead of being filtered out below.
    if let Stat::Label(l) = stat {
        return translate_label(builder, l);
    }
    if !builder.is_block_open() {
        return Ok(());
    }
    match stat {
        Stat::Assign(a) => translate_assign(builder, a),
        Stat::LocalDecl(d) => translate_local_decl(builder, d),
        Stat::Do(d) => translate_do(builder, d),
        Stat::If(i) => translate_if(builder, i),
        Stat::While(w) => translate_while(builder, w),
        Stat::Repeat(r) => translate_repeat(builder, r),
        Stat::NumericFor(f) => translate_numeric_for(builder, f),
        Stat::GenericFor(g) => translate_generic_for(builder, g),
        Stat::Return(r) => translate_return(builder, r),
        Stat::Break(b) => translate_break(builder, b),
        Stat::Goto(g) => translate_goto(builder, g),
        Stat::Call(c) => translate_call_stat(builder, c),
        Stat::Label(_) => unreachable!("handled above"),
    }
}

fn translate_label(builder: &mut Builder<'_, '_>, l: &ast::LabelDef) -> Result<(), CompilerError> {
    if builder.is_goto_target(l.id) {
        let label = builder.label_for_target(l.id, l.pos, &l.name);
        if builder.is_block_open() {
            builder.terminate(Terminator::Jump { target: label });
        }
        builder.open_block(label);
    }
    builder.mark_label_defined(l.id);
    Ok(())
}

fn translate_goto(builder: &mut Builder<'_, '_>, g: &ast::Goto) -> Result<(), CompilerError> {
    let resolved = attrs::required::resolved_label(builder.attrs(), g.id, g.pos)?;
    let label = builder.label_for_target(resolved.target, g.pos, &g.name);
    builder.terminate(Terminator::Jump { target: label });
    Ok(())
}

fn translate_break(builder: &mut Builder<'_, '_>, b: &ast::Break) -> Result<(), CompilerError> {
    let target = builder.break_target(b.pos)?;
    builder.terminate(Terminator::Jump { target });
    Ok(())
}

fn translate_return(builder: &mut Builder<'_, '_>, r: &ast::Return) -> Result<(), CompilerError> {
    if let [single] = r.values.as_slice() {
        if let Some((callee, args, trailing_multi)) = expr::try_call_parts(builder, single)? {
            builder.terminate(Terminator::TailCall {
                callee,
                args,
                trailing_multi,
            });
            return Ok(());
        }
    }
    let (values, trailing_multi) = builder.translate_arglist(&r.values)?;
    builder.terminate(Terminator::Return {
        values,
        trailing_multi,
    });
    Ok(())
}

fn translate_call_stat(builder: &mut Builder<'_, '_>, c: &ast::CallStat) -> Result<(), CompilerError> {
    expr::translate_expr_multi(builder, &c.call)?;
    Ok(())
}

fn translate_assign(builder: &mut Builder<'_, '_>, a: &ast::Assign) -> Result<(), CompilerError> {
    let values = builder.eval_adjusted(&a.values, a.targets.len())?;
    for (target, value) in a.targets.iter().zip(values) {
        expr::translate_assign_target(builder, target, value)?;
    }
    Ok(())
}

fn translate_local_decl(builder: &mut Builder<'_, '_>, d: &ast::LocalDecl) -> Result<(), CompilerError> {
    let values = builder.eval_adjusted(&d.values, d.names.len())?;
    let mapping = attrs::required::var_mapping(builder.attrs(), d.id, d.pos)?;
    for (name, value) in d.names.iter().zip(values) {
        let binding = mapping
            .get(name)
            .expect("VarMapping missing a declared local name");
        builder.bind_local(binding, value);
    }
    Ok(())
}

fn translate_do(builder: &mut Builder<'_, '_>, d: &ast::DoBlock) -> Result<(), CompilerError> {
    builder.push_scope();
    translate_block(builder, &d.body)?;
    builder.pop_scope();
    Ok(())
}

fn translate_if(builder: &mut Builder<'_, '_>, i: &ast::If) -> Result<(), CompilerError> {
    let cond = expr::translate_expr(builder, &i.cond)?;
    let then_label = builder.fresh_label();
    let else_label = builder.fresh_label();
    let join = builder.fresh_label();
    builder.terminate(Terminator::Branch {
        cond,
        on_true: then_label,
        on_false: else_label,
    });

    let mut join_used = false;

    builder.open_block(then_label);
    builder.push_scope();
    translate_block(builder, &i.then_block)?;
    builder.pop_scope();
    if builder.is_block_open() {
        builder.terminate(Terminator::Jump { target: join });
        join_used = true;
    }

    builder.open_block(else_label);
    builder.push_scope();
    if let Some(else_block) = &i.else_block {
        translate_block(builder, else_block)?;
    }
    builder.pop_scope();
    if builder.is_block_open() {
        builder.terminate(Terminator::Jump { target: join });
        join_used = true;
    }

    if join_used {
        builder.open_block(join);
    }
    Ok(())
}

fn translate_while(builder: &mut Builder<'_, '_>, w: &ast::While) -> Result<(), CompilerError> {
    let header = builder.fresh_label();
    let body_label = builder.fresh_label();
    let exit = builder.fresh_label();

    builder.terminate(Terminator::Jump { target: header });

    builder.open_block(header);
    let cond = expr::translate_expr(builder, &w.cond)?;
    builder.terminate(Terminator::Branch {
        cond,
        on_true: body_label,
        on_false: exit,
    });

    builder.open_block(body_label);
    builder.push_scope();
    builder.push_break_target(exit);
    translate_block(builder, &w.body)?;
    builder.pop_break_target();
    builder.pop_scope();
    if builder.is_block_open() {
        builder.terminate(Terminator::Jump { target: header });
    }

    // `exit` is always reachable through the header's own branch.
    builder.open_block(exit);
    Ok(())
}

fn translate_repeat(builder: &mut Builder<'_, '_>, r: &ast::Repeat) -> Result<(), CompilerError> {
    let body_label = builder.fresh_label();
    let exit = builder.fresh_label();

    builder.terminate(Terminator::Jump { target: body_label });

    builder.open_block(body_label);
    builder.push_scope();
    builder.push_break_target(exit);
    translate_block(builder, &r.body)?;
    builder.pop_break_target();

    let mut exit_reachable = false;
    if builder.is_block_open() {
        // `cond` still sees locals declared in `body` (Lua's repeat-until
        // scoping rule), so it's translated before the scope is popped.
        let cond = expr::translate_expr(builder, &r.cond)?;
        builder.terminate(Terminator::Branch {
            cond,
            on_true: exit,
            on_false: body_label,
        });
        exit_reachable = true;
    }
    builder.pop_scope();

    if builder.was_reached_by_break(exit) {
        exit_reachable = true;
    }
    if exit_reachable {
        builder.open_block(exit);
    }
    Ok(())
}

fn translate_numeric_for(builder: &mut Builder<'_, '_>, f: &ast::NumericFor) -> Result<(), CompilerError> {
    let start_v = expr::translate_expr(builder, &f.start)?;
    let stop_v = expr::translate_expr(builder, &f.stop)?;
    let step_v = match &f.step {
        Some(e) => expr::translate_expr(builder, e)?,
        None => builder.load_int_const(1),
    };

    let mapping = attrs::required::var_mapping(builder.attrs(), f.id, f.pos)?;
    let binding = mapping
        .get(&f.var_name)
        .expect("VarMapping missing numeric-for control variable");

    let var_reg = builder.fresh_value();
    builder.emit(IrNode::Move {
        dst: var_reg,
        src: start_v,
    });

    let dispatch = builder.fresh_label();
    let step_err = builder.fresh_label();
    let sign_check = builder.fresh_label();
    let asc_test = builder.fresh_label();
    let desc_test = builder.fresh_label();
    let body_label = builder.fresh_label();
    let exit = builder.fresh_label();

    builder.terminate(Terminator::Jump { target: dispatch });

    // Re-checked every iteration (the "redispatch" design also used for the
    // ascending/descending split below): `step_v` never changes once
    // evaluated, so this is redundant after the first pass, but it keeps the
    // loop to a single, simple entry point rather than special-casing the
    // first iteration.
    builder.open_block(dispatch);
    let zero_v = builder.load_int_const(0);
    let is_zero = builder.fresh_value();
    builder.emit(IrNode::Binary {
        dst: is_zero,
        op: crate::ir::BinOp::Eq,
        lhs: step_v,
        rhs: zero_v,
    });
    builder.terminate(Terminator::Branch {
        cond: is_zero,
        on_true: step_err,
        on_false: sign_check,
    });

    builder.open_block(step_err);
    builder.emit(IrNode::RuntimeError {
        message: SmolStr::new("'for' step is zero"),
    });
    builder.terminate(Terminator::Unreachable);

    builder.open_block(sign_check);
    let is_desc = builder.fresh_value();
    builder.emit(IrNode::Binary {
        dst: is_desc,
        op: crate::ir::BinOp::Lt,
        lhs: step_v,
        rhs: zero_v,
    });
    builder.terminate(Terminator::Branch {
        cond: is_desc,
        on_true: desc_test,
        on_false: asc_test,
    });

    builder.open_block(asc_test);
    let cur = builder.fresh_value();
    builder.emit(IrNode::LoadLocal {
        dst: cur,
        local: var_reg,
    });
    let cond = builder.fresh_value();
    builder.emit(IrNode::Binary {
        dst: cond,
        op: crate::ir::BinOp::Le,
        lhs: cur,
        rhs: stop_v,
    });
    builder.terminate(Terminator::Branch {
        cond,
        on_true: body_label,
        on_false: exit,
    });

    builder.open_block(desc_test);
    let cur = builder.fresh_value();
    builder.emit(IrNode::LoadLocal {
        dst: cur,
        local: var_reg,
    });
    let cond = builder.fresh_value();
    builder.emit(IrNode::Binary {
        dst: cond,
        op: crate::ir::BinOp::Le,
        lhs: stop_v,
        rhs: cur,
    });
    builder.terminate(Terminator::Branch {
        cond,
        on_true: body_label,
        on_false: exit,
    });

    builder.open_block(body_label);
    let iter_v = builder.fresh_value();
    builder.emit(IrNode::LoadLocal {
        dst: iter_v,
        local: var_reg,
    });
    builder.push_scope();
    builder.bind_local(binding, iter_v);
    builder.push_break_target(exit);
    translate_block(builder, &f.body)?;
    builder.pop_break_target();
    builder.pop_scope();
    if builder.is_block_open() {
        let cur = builder.fresh_value();
        builder.emit(IrNode::LoadLocal {
            dst: cur,
            local: var_reg,
        });
        let next = builder.fresh_value();
        builder.emit(IrNode::Binary {
            dst: next,
            op: crate::ir::BinOp::Add,
            lhs: cur,
            rhs: step_v,
        });
        builder.emit(IrNode::StoreLocal {
            local: var_reg,
            value: next,
        });
        builder.terminate(Terminator::Jump { target: dispatch });
    }

    // `exit` is always reachable through both test blocks' branches.
    builder.open_block(exit);
    Ok(())
}

fn translate_generic_for(builder: &mut Builder<'_, '_>, g: &ast::GenericFor) -> Result<(), CompilerError> {
    let initial = builder.eval_adjusted(&g.exprs, 3)?;
    let iter_fn = initial[0];
    let state = initial[1];
    let ctrl_home = builder.fresh_value();
    builder.emit(IrNode::Move {
        dst: ctrl_home,
        src: initial[2],
    });

    let header = builder.fresh_label();
    let body_label = builder.fresh_label();
    let exit = builder.fresh_label();

    builder.terminate(Terminator::Jump { target: header });

    builder.open_block(header);
    let ctrl_v = builder.fresh_value();
    builder.emit(IrNode::LoadLocal {
        dst: ctrl_v,
        local: ctrl_home,
    });
    let results = builder.fresh_multi();
    builder.emit(IrNode::Call {
        dst: results,
        callee: iter_fn,
        args: vec![state, ctrl_v],
        trailing_multi: None,
    });
    let first = builder.fresh_value();
    builder.emit(IrNode::AdjustToOne {
        dst: first,
        src: results,
    });
    let nil_v = builder.load_const(Constant::Nil);
    let is_nil = builder.fresh_value();
    builder.emit(IrNode::Binary {
        dst: is_nil,
        op: crate::ir::BinOp::Eq,
        lhs: first,
        rhs: nil_v,
    });
    builder.terminate(Terminator::Branch {
        cond: is_nil,
        on_true: exit,
        on_false: body_label,
    });

    builder.open_block(body_label);
    builder.emit(IrNode::StoreLocal {
        local: ctrl_home,
        value: first,
    });
    builder.push_scope();
    let mapping = attrs::required::var_mapping(builder.attrs(), g.id, g.pos)?;
    let dsts: Vec<_> = g
        .var_names
        .iter()
        .map(|_| builder.fresh_value())
        .collect();
    builder.emit(IrNode::AdjustMulti {
        dsts: dsts.clone(),
        src: results,
    });
    for (name, value) in g.var_names.iter().zip(dsts) {
        let binding = mapping
            .get(name)
            .expect("VarMapping missing generic-for control variable");
        builder.bind_local(binding, value);
    }
    builder.push_break_target(exit);
    translate_block(builder, &g.body)?;
    builder.pop_break_target();
    builder.pop_scope();
    if builder.is_block_open() {
        builder.terminate(Terminator::Jump { target: header });
    }

    // `exit` is always reachable through the header's own branch.
    builder.open_block(exit);
    Ok(())
}

/// Every label-defining statement's `NodeId` some `goto` in `block` resolves
/// to, computed once before translation starts. Does not recurse into
/// nested function literals -- `goto`/label scope never crosses a function
/// boundary.
pub(super) fn collect_goto_targets(
    block: &ast::Block,
    attrs: &attrs::AttributeTable,
) -> Result<AHashSet<ast::NodeId>, CompilerError> {
    let mut targets = AHashSet::new();
    collect_goto_targets_block(block, attrs, &mut targets)?;
    Ok(targets)
}

fn collect_goto_targets_block(
    block: &ast::Block,
    attrs: &attrs::AttributeTable,
    out: &mut AHashSet<ast::NodeId>,
) -> Result<(), CompilerError> {
    for stat in &block.stats {
        collect_goto_targets_stat(stat, attrs, out)?;
    }
    Ok(())
}

fn collect_goto_targets_stat(
    stat: &Stat,
    attrs: &attrs::AttributeTable,
    out: &mut AHashSet<ast::NodeId>,
) -> Result<(), CompilerError> {
    match stat {
        Stat::Goto(g) => {
            let resolved = attrs::required::resolved_label(attrs, g.id, g.pos)?;
            out.insert(resolved.target);
        }
        Stat::Do(d) => collect_goto_targets_block(&d.body, attrs, out)?,
        Stat::If(i) => {
            collect_goto_targets_block(&i.then_block, attrs, out)?;
            if let Some(else_block) = &i.else_block {
                collect_goto_targets_block(else_block, attrs, out)?;
            }
        }
        Stat::While(w) => collect_goto_targets_block(&w.body, attrs, out)?,
        Stat::Repeat(r) => collect_goto_targets_block(&r.body, attrs, out)?,
        Stat::NumericFor(f) => collect_goto_targets_block(&f.body, attrs, out)?,
        Stat::GenericFor(g) => collect_goto_targets_block(&g.body, attrs, out)?,
        Stat::Assign(_)
        | Stat::LocalDecl(_)
        | Stat::Return(_)
        | Stat::Break(_)
        | Stat::Label(_)
        | Stat::Call(_) => {}
    }
    Ok(())
}
