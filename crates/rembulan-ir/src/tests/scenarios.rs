use smol_str::SmolStr;

use crate::ast::build::{pos, IdGen};
use crate::ast::{
    Assign, BinOp, BinaryExpr, BindingId, Block, Break, Chunk, DoBlock, Expr, FunctionBody,
    GenericFor, Goto, If, LabelDef, LocalDecl, NumericFor, Return, Stat, While,
};
use crate::attrs::{
    AttributeTable, CapturePath, FunctionVarInfo, ResolvedLabel, ResolvedVariable, UpvalueInfo,
    UpvalueSource, VarMapping,
};
use crate::cfg;
use crate::ir::{CaptureSource, Constant, IrNode, Terminator};
use crate::translate::{translate_chunk, TranslatorOptions};

fn name(s: &str) -> SmolStr {
    SmolStr::new(s)
}

/// 1. Identity chunk: an empty body lowers to one block holding only a
/// return-zero terminator.
#[test]
fn identity_chunk_is_one_block_returning_nothing() {
    let mut ids = IdGen::new();
    let chunk = Chunk {
        id: ids.next(),
        pos: pos(0),
        body: Block { stats: vec![] },
    };
    let attrs = AttributeTable::new();

    let module = translate_chunk(&chunk, &attrs, TranslatorOptions::default()).unwrap();

    assert_eq!(module.chunk.code.len(), 1);
    assert!(module.functions.is_empty());
    let entry = module.chunk.code.get(module.chunk.code.entry()).unwrap();
    assert!(entry.nodes.is_empty());
    assert_eq!(
        entry.terminator,
        Terminator::Return {
            values: vec![],
            trailing_multi: None
        }
    );
    assert_eq!(module.chunk.arity.fixed_params, 0);
    assert!(module.chunk.arity.is_vararg);
}

/// 2. `x = 1 + 2` with `x` global: a linear block of const-loads, an ADD,
/// and a global store.
#[test]
fn simple_global_assignment_lowers_to_a_linear_block() {
    let mut ids = IdGen::new();
    let x_ref = ids.next();
    let assign_id = ids.next();
    let binop_id = ids.next();
    let lit1 = ids.next();
    let lit2 = ids.next();

    let chunk = Chunk {
        id: ids.next(),
        pos: pos(0),
        body: Block {
            stats: vec![Stat::Assign(Assign {
                id: assign_id,
                pos: pos(1),
                targets: vec![Expr::Var(x_ref, pos(2), name("x"))],
                values: vec![Expr::Binary(Box::new(BinaryExpr {
                    id: binop_id,
                    pos: pos(3),
                    op: BinOp::Add,
                    lhs: Expr::Int(lit1, pos(4), 1),
                    rhs: Expr::Int(lit2, pos(5), 2),
                }))],
            })],
        },
    };

    let mut attrs = AttributeTable::new();
    attrs.set_resolved_variable(x_ref, ResolvedVariable::Global);

    let module = translate_chunk(&chunk, &attrs, TranslatorOptions::default()).unwrap();

    assert_eq!(module.chunk.code.len(), 1);
    let entry = module.chunk.code.get(module.chunk.code.entry()).unwrap();
    assert_eq!(entry.nodes.len(), 4);
    assert!(matches!(entry.nodes[0], IrNode::LoadConst { value: Constant::Int(1), .. }));
    assert!(matches!(entry.nodes[1], IrNode::LoadConst { value: Constant::Int(2), .. }));
    assert!(matches!(
        entry.nodes[2],
        IrNode::Binary { op: crate::ir::BinOp::Add, .. }
    ));
    assert!(matches!(entry.nodes[3], IrNode::StoreGlobal { .. }));
    if let IrNode::StoreGlobal { name: stored, .. } = &entry.nodes[3] {
        assert_eq!(stored.as_str(), "x");
    }
    assert_eq!(
        entry.terminator,
        Terminator::Return {
            values: vec![],
            trailing_multi: None
        }
    );
}

/// 3. `if a then x=1 else x=2 end`: both arms jump to a shared join block
/// that holds the implicit return.
#[test]
fn if_else_arms_join_before_the_implicit_return() {
    let mut ids = IdGen::new();
    let a_ref = ids.next();
    let x_then = ids.next();
    let x_else = ids.next();

    let chunk = Chunk {
        id: ids.next(),
        pos: pos(0),
        body: Block {
            stats: vec![Stat::If(If {
                id: ids.next(),
                pos: pos(1),
                cond: Expr::Var(a_ref, pos(2), name("a")),
                then_block: Block {
                    stats: vec![Stat::Assign(Assign {
                        id: ids.next(),
                        pos: pos(3),
                        targets: vec![Expr::Var(x_then, pos(4), name("x"))],
                        values: vec![Expr::Int(ids.next(), pos(5), 1)],
                    })],
                },
                else_block: Some(Block {
                    stats: vec![Stat::Assign(Assign {
                        id: ids.next(),
                        pos: pos(6),
                        targets: vec![Expr::Var(x_else, pos(7), name("x"))],
                        values: vec![Expr::Int(ids.next(), pos(8), 2)],
                    })],
                }),
            })],
        },
    };

    let mut attrs = AttributeTable::new();
    attrs.set_resolved_variable(a_ref, ResolvedVariable::Global);
    attrs.set_resolved_variable(x_then, ResolvedVariable::Global);
    attrs.set_resolved_variable(x_else, ResolvedVariable::Global);

    let module = translate_chunk(&chunk, &attrs, TranslatorOptions::default()).unwrap();
    let code = &module.chunk.code;

    let entry = code.get(code.entry()).unwrap();
    let (then_label, else_label) = match entry.terminator {
        Terminator::Branch { on_true, on_false, .. } => (on_true, on_false),
        ref other => panic!("expected a branch terminator, got {other:?}"),
    };

    let then_block = code.get(then_label).unwrap();
    let else_block = code.get(else_label).unwrap();
    let join_from_then = match then_block.terminator {
        Terminator::Jump { target } => target,
        ref other => panic!("then-arm should end with a jump, got {other:?}"),
    };
    let join_from_else = match else_block.terminator {
        Terminator::Jump { target } => target,
        ref other => panic!("else-arm should end with a jump, got {other:?}"),
    };
    assert_eq!(join_from_then, join_from_else, "both arms must jump to the same join block");

    let join = code.get(join_from_then).unwrap();
    assert_eq!(
        join.terminator,
        Terminator::Return {
            values: vec![],
            trailing_multi: None
        }
    );

    let reachable = cfg::bfs_label_order(code);
    assert_eq!(reachable.len(), 4, "entry, then, else, join");
}

/// 4. `while c do if d then break end end`: break must route to a block
/// whose only content is the function's final return.
#[test]
fn while_loop_break_reaches_the_loop_exit() {
    let mut ids = IdGen::new();
    let c_ref = ids.next();
    let d_ref = ids.next();

    let chunk = Chunk {
        id: ids.next(),
        pos: pos(0),
        body: Block {
            stats: vec![Stat::While(While {
                id: ids.next(),
                pos: pos(1),
                cond: Expr::Var(c_ref, pos(2), name("c")),
                body: Block {
                    stats: vec![Stat::If(If {
                        id: ids.next(),
                        pos: pos(3),
                        cond: Expr::Var(d_ref, pos(4), name("d")),
                        then_block: Block {
                            stats: vec![Stat::Break(Break {
                                id: ids.next(),
                                pos: pos(5),
                            })],
                        },
                        else_block: None,
                    })],
                },
            })],
        },
    };

    let mut attrs = AttributeTable::new();
    attrs.set_resolved_variable(c_ref, ResolvedVariable::Global);
    attrs.set_resolved_variable(d_ref, ResolvedVariable::Global);

    let module = translate_chunk(&chunk, &attrs, TranslatorOptions::default()).unwrap();
    let code = &module.chunk.code;

    let reachable = cfg::bfs_label_order(code);
    let return_blocks: Vec<_> = reachable
        .iter()
        .filter(|l| {
            matches!(
                code.get(**l).unwrap().terminator,
                Terminator::Return { .. }
            )
        })
        .collect();
    assert_eq!(return_blocks.len(), 1, "exactly one block returns: the loop exit");

    // Every reachable block's own terminator successors must themselves be
    // reachable and present in the block map (well-formedness).
    for label in &reachable {
        for succ in code.get(*label).unwrap().terminator.successors() {
            assert!(code.contains(succ));
            assert!(reachable.contains(&succ));
        }
    }
}

/// 5. `do goto L; ::L:: end`: the goto's block jumps straight to L's block
/// with no intervening nodes.
#[test]
fn forward_goto_jumps_directly_to_its_label() {
    let mut ids = IdGen::new();
    let label_def_id = ids.next();
    let goto_id = ids.next();

    let chunk = Chunk {
        id: ids.next(),
        pos: pos(0),
        body: Block {
            stats: vec![Stat::Do(DoBlock {
                id: ids.next(),
                pos: pos(1),
                body: Block {
                    stats: vec![
                        Stat::Goto(Goto {
                            id: goto_id,
                            pos: pos(2),
                            name: name("L"),
                        }),
                        Stat::Label(LabelDef {
                            id: label_def_id,
                            pos: pos(3),
                            name: name("L"),
                        }),
                    ],
                },
            })],
        },
    };

    let mut attrs = AttributeTable::new();
    attrs.set_resolved_label(
        goto_id,
        ResolvedLabel {
            target: label_def_id,
        },
    );

    let module = translate_chunk(&chunk, &attrs, TranslatorOptions::default()).unwrap();
    let code = &module.chunk.code;

    let entry = code.get(code.entry()).unwrap();
    assert!(entry.nodes.is_empty());
    let target = match entry.terminator {
        Terminator::Jump { target } => target,
        ref other => panic!("expected a jump to the label, got {other:?}"),
    };

    let labelled = code.get(target).unwrap();
    assert!(labelled.nodes.is_empty(), "no dead code between goto and label");
    assert_eq!(
        labelled.terminator,
        Terminator::Return {
            values: vec![],
            trailing_multi: None
        }
    );
}

/// 6. `local x = 1; return function() return x end`: the outer chunk binds
/// `x` to a register, the closure captures it by that register, and the
/// inner function reads it back through upvalue slot 0.
#[test]
fn nested_function_captures_outer_local_by_register() {
    let mut ids = IdGen::new();
    let decl_id = ids.next();
    let fb_id = ids.next();
    let x_upvalue_ref = ids.next();

    let chunk = Chunk {
        id: ids.next(),
        pos: pos(0),
        body: Block {
            stats: vec![
                Stat::LocalDecl(LocalDecl {
                    id: decl_id,
                    pos: pos(1),
                    names: vec![name("x")],
                    values: vec![Expr::Int(ids.next(), pos(2), 1)],
                }),
                Stat::Return(Return {
                    id: ids.next(),
                    pos: pos(3),
                    values: vec![Expr::FunctionBody(Box::new(FunctionBody {
                        id: fb_id,
                        pos: pos(4),
                        params: vec![],
                        is_vararg: false,
                        body: Block {
                            stats: vec![Stat::Return(Return {
                                id: ids.next(),
                                pos: pos(5),
                                values: vec![Expr::Var(x_upvalue_ref, pos(6), name("x"))],
                            })],
                        },
                    }))],
                }),
            ],
        },
    };

    let x_binding = BindingId(0);
    let mut attrs = AttributeTable::new();
    let mut var_mapping = VarMapping::default();
    var_mapping.0.insert(name("x"), x_binding);
    attrs.set_var_mapping(decl_id, var_mapping);
    attrs.set_function_var_info(
        fb_id,
        FunctionVarInfo {
            locals: vec![],
            captured_upvalues: vec![UpvalueInfo {
                name: name("x"),
                source: UpvalueSource::ParentLocal(x_binding),
            }],
        },
    );
    attrs.set_resolved_variable(
        x_upvalue_ref,
        ResolvedVariable::Upvalue(CapturePath { slot: 0 }),
    );

    let module = translate_chunk(&chunk, &attrs, TranslatorOptions::default()).unwrap();

    assert_eq!(module.functions.len(), 1);
    let inner = &module.functions[0];
    assert_eq!(inner.captures.len(), 1);
    assert!(matches!(inner.captures[0].source, CaptureSource::ParentLocal(_)));

    let inner_entry = inner.code.get(inner.code.entry()).unwrap();
    assert!(inner_entry
        .nodes
        .iter()
        .any(|n| matches!(n, IrNode::LoadUpvalue { slot, .. } if slot.index() == 0)));

    let outer_entry = module.chunk.code.get(module.chunk.code.entry()).unwrap();
    let closure_capture = outer_entry.nodes.iter().find_map(|n| match n {
        IrNode::Closure { function, captures, .. } if *function == 0 => Some(captures.clone()),
        _ => None,
    });
    assert_eq!(closure_capture.as_deref(), Some(&[inner.captures[0].source][..]));
}

fn numeric_for_chunk(start: i64, stop: i64, step: Option<i64>) -> (Chunk, AttributeTable) {
    let mut ids = IdGen::new();
    let for_id = ids.next();
    let x_ref = ids.next();
    let i_ref = ids.next();

    let chunk = Chunk {
        id: ids.next(),
        pos: pos(0),
        body: Block {
            stats: vec![Stat::NumericFor(NumericFor {
                id: for_id,
                pos: pos(1),
                var_name: name("i"),
                start: Expr::Int(ids.next(), pos(2), start),
                stop: Expr::Int(ids.next(), pos(3), stop),
                step: step.map(|s| Expr::Int(ids.next(), pos(4), s)),
                body: Block {
                    stats: vec![Stat::Assign(Assign {
                        id: ids.next(),
                        pos: pos(5),
                        targets: vec![Expr::Var(x_ref, pos(6), name("x"))],
                        values: vec![Expr::Var(i_ref, pos(7), name("i"))],
                    })],
                },
            })],
        },
    };

    let i_binding = BindingId(0);
    let mut attrs = AttributeTable::new();
    attrs.set_resolved_variable(x_ref, ResolvedVariable::Global);
    attrs.set_resolved_variable(i_ref, ResolvedVariable::Local(i_binding));
    let mut mapping = VarMapping::default();
    mapping.0.insert(name("i"), i_binding);
    attrs.set_var_mapping(for_id, mapping);

    (chunk, attrs)
}

/// 7. `for i=1,3 do x=i end`: the header always checks `step == 0` at
/// runtime (not just when `step` is a literal zero) before dispatching to
/// the ascending/descending comparison.
#[test]
fn numeric_for_ascending_checks_step_for_zero_at_runtime() {
    let (chunk, attrs) = numeric_for_chunk(1, 3, None);
    let module = translate_chunk(&chunk, &attrs, TranslatorOptions::default()).unwrap();
    let code = &module.chunk.code;

    let reachable = cfg::bfs_label_order(code);
    let error_blocks: Vec<_> = reachable
        .iter()
        .filter(|l| {
            let block = code.get(**l).unwrap();
            block.nodes.iter().any(|n| matches!(n, IrNode::RuntimeError { .. }))
        })
        .collect();
    assert_eq!(error_blocks.len(), 1, "exactly one reachable step-is-zero check");
    assert_eq!(code.get(*error_blocks[0]).unwrap().terminator, Terminator::Unreachable);

    for label in &reachable {
        for succ in code.get(*label).unwrap().terminator.successors() {
            assert!(code.contains(succ));
            assert!(reachable.contains(&succ));
        }
    }
}

/// 8. `for i=3,1,-1 do x=i end`: a literal negative step still goes through
/// the same runtime dispatch, not a compile-time ascending/descending
/// decision.
#[test]
fn numeric_for_descending_checks_step_for_zero_at_runtime() {
    let (chunk, attrs) = numeric_for_chunk(3, 1, Some(-1));
    let module = translate_chunk(&chunk, &attrs, TranslatorOptions::default()).unwrap();
    let code = &module.chunk.code;

    let reachable = cfg::bfs_label_order(code);
    let error_blocks: Vec<_> = reachable
        .iter()
        .filter(|l| {
            code.get(**l)
                .unwrap()
                .nodes
                .iter()
                .any(|n| matches!(n, IrNode::RuntimeError { .. }))
        })
        .collect();
    assert_eq!(error_blocks.len(), 1);
}

/// 9. `for i=1,10,0 do x=i end`: a literal zero step still goes through the
/// runtime `step == 0` branch rather than being special-cased away at
/// translation time -- there is exactly one reachable `RuntimeError` block
/// and the loop body is still translated (and reachable only through the
/// runtime check finding the step non-zero, which it never does here, so
/// the body itself is dead code reachable by construction but never at
/// runtime).
#[test]
fn numeric_for_with_literal_zero_step_raises_runtime_error() {
    let (chunk, attrs) = numeric_for_chunk(1, 10, Some(0));
    let module = translate_chunk(&chunk, &attrs, TranslatorOptions::default()).unwrap();
    let code = &module.chunk.code;

    let reachable = cfg::bfs_label_order(code);
    let error_blocks: Vec<_> = reachable
        .iter()
        .filter(|l| {
            code.get(**l)
                .unwrap()
                .nodes
                .iter()
                .any(|n| matches!(n, IrNode::RuntimeError { .. }))
        })
        .collect();
    assert_eq!(error_blocks.len(), 1);
    assert_eq!(code.get(*error_blocks[0]).unwrap().terminator, Terminator::Unreachable);

    for label in &reachable {
        for succ in code.get(*label).unwrap().terminator.successors() {
            assert!(code.contains(succ));
            assert!(reachable.contains(&succ));
        }
    }
}

/// 10. A non-literal zero step (`local s = 0; for i=1,3,s do x=i end`) must
/// still raise the runtime step-is-zero error: the check is a genuine
/// `Binary`/`Branch` pair over the evaluated `step` value, not an
/// AST-literal match that only catches `for i=1,3,0 do ... end` verbatim.
#[test]
fn numeric_for_with_non_literal_zero_step_still_checks_at_runtime() {
    let mut ids = IdGen::new();
    let decl_id = ids.next();
    let for_id = ids.next();
    let s_ref = ids.next();
    let x_ref = ids.next();
    let i_ref = ids.next();

    let chunk = Chunk {
        id: ids.next(),
        pos: pos(0),
        body: Block {
            stats: vec![
                Stat::LocalDecl(LocalDecl {
                    id: decl_id,
                    pos: pos(1),
                    names: vec![name("s")],
                    values: vec![Expr::Int(ids.next(), pos(2), 0)],
                }),
                Stat::NumericFor(NumericFor {
                    id: for_id,
                    pos: pos(3),
                    var_name: name("i"),
                    start: Expr::Int(ids.next(), pos(4), 1),
                    stop: Expr::Int(ids.next(), pos(5), 3),
                    step: Some(Expr::Var(s_ref, pos(6), name("s"))),
                    body: Block {
                        stats: vec![Stat::Assign(Assign {
                            id: ids.next(),
                            pos: pos(7),
                            targets: vec![Expr::Var(x_ref, pos(8), name("x"))],
                            values: vec![Expr::Var(i_ref, pos(9), name("i"))],
                        })],
                    },
                }),
            ],
        },
    };

    let s_binding = BindingId(0);
    let i_binding = BindingId(1);
    let mut attrs = AttributeTable::new();
    let mut decl_mapping = VarMapping::default();
    decl_mapping.0.insert(name("s"), s_binding);
    attrs.set_var_mapping(decl_id, decl_mapping);
    attrs.set_resolved_variable(s_ref, ResolvedVariable::Local(s_binding));
    attrs.set_resolved_variable(x_ref, ResolvedVariable::Global);
    attrs.set_resolved_variable(i_ref, ResolvedVariable::Local(i_binding));
    let mut for_mapping = VarMapping::default();
    for_mapping.0.insert(name("i"), i_binding);
    attrs.set_var_mapping(for_id, for_mapping);

    let module = translate_chunk(&chunk, &attrs, TranslatorOptions::default()).unwrap();
    let code = &module.chunk.code;

    let reachable = cfg::bfs_label_order(code);
    let error_blocks: Vec<_> = reachable
        .iter()
        .filter(|l| {
            code.get(**l)
                .unwrap()
                .nodes
                .iter()
                .any(|n| matches!(n, IrNode::RuntimeError { .. }))
        })
        .collect();
    assert_eq!(
        error_blocks.len(),
        1,
        "a non-literal step must still be checked against zero at runtime"
    );
}

/// 11. `while c do for i=1,10,0 do break end end`: `break` inside a
/// numeric-for must bind to that for-loop's own exit, not the enclosing
/// while's -- including the literal-zero-step case, whose body still
/// translates on the for's normal body path with its own break target
/// pushed.
#[test]
fn numeric_for_break_binds_to_its_own_exit_not_the_enclosing_loops() {
    let mut ids = IdGen::new();
    let c_ref = ids.next();
    let for_id = ids.next();

    let chunk = Chunk {
        id: ids.next(),
        pos: pos(0),
        body: Block {
            stats: vec![Stat::While(While {
                id: ids.next(),
                pos: pos(1),
                cond: Expr::Var(c_ref, pos(2), name("c")),
                body: Block {
                    stats: vec![Stat::NumericFor(NumericFor {
                        id: for_id,
                        pos: pos(3),
                        var_name: name("i"),
                        start: Expr::Int(ids.next(), pos(4), 1),
                        stop: Expr::Int(ids.next(), pos(5), 10),
                        step: Some(Expr::Int(ids.next(), pos(6), 0)),
                        body: Block {
                            stats: vec![Stat::Break(Break {
                                id: ids.next(),
                                pos: pos(7),
                            })],
                        },
                    })],
                },
            })],
        },
    };

    let i_binding = BindingId(0);
    let mut attrs = AttributeTable::new();
    attrs.set_resolved_variable(c_ref, ResolvedVariable::Global);
    let mut mapping = VarMapping::default();
    mapping.0.insert(name("i"), i_binding);
    attrs.set_var_mapping(for_id, mapping);

    // Before the fix this would either panic with `BreakOutsideLoop`-style
    // misbinding or, depending on nesting, route `break` into the while's
    // exit. It must translate cleanly here.
    let module = translate_chunk(&chunk, &attrs, TranslatorOptions::default()).unwrap();
    let code = &module.chunk.code;

    // The for-loop's body is exactly one `LoadLocal` (loading the control
    // variable into scope) followed by `break`'s `Jump` -- find it and
    // follow the jump to the for-loop's own exit block.
    let body_block = code
        .blocks_in_order()
        .map(|(_, b)| b)
        .find(|b| {
            b.nodes.len() == 1
                && matches!(b.nodes[0], IrNode::LoadLocal { .. })
                && matches!(b.terminator, Terminator::Jump { .. })
        })
        .expect("for-loop body block not found");
    let for_exit = match body_block.terminator {
        Terminator::Jump { target } => target,
        _ => unreachable!(),
    };

    // The for-loop's own exit falls through into the while's header (there
    // is nothing else in the for-loop), so it must NOT be a `Return` --
    // that would mean `break` incorrectly escaped all the way out to the
    // while's own exit (the function's implicit final return).
    assert!(!matches!(code.get(for_exit).unwrap().terminator, Terminator::Return { .. }));

    let return_blocks: usize = code
        .blocks_in_order()
        .filter(|(_, b)| matches!(b.terminator, Terminator::Return { .. }))
        .count();
    assert_eq!(return_blocks, 1, "only the while's own exit returns");
}

/// 12. `for k, v in iter, state, ctrl do x = v end`: the explist is adjusted
/// to exactly three values, the header calls the iterator and terminates on
/// exactly-nil, and the body binds both loop variables before running.
#[test]
fn generic_for_iterates_and_binds_loop_variables() {
    let mut ids = IdGen::new();
    let for_id = ids.next();
    let iter_ref = ids.next();
    let state_ref = ids.next();
    let ctrl_ref = ids.next();
    let x_ref = ids.next();
    let v_ref = ids.next();

    let chunk = Chunk {
        id: ids.next(),
        pos: pos(0),
        body: Block {
            stats: vec![Stat::GenericFor(GenericFor {
                id: for_id,
                pos: pos(1),
                var_names: vec![name("k"), name("v")],
                exprs: vec![
                    Expr::Var(iter_ref, pos(2), name("iter")),
                    Expr::Var(state_ref, pos(3), name("state")),
                    Expr::Var(ctrl_ref, pos(4), name("ctrl")),
                ],
                body: Block {
                    stats: vec![Stat::Assign(Assign {
                        id: ids.next(),
                        pos: pos(5),
                        targets: vec![Expr::Var(x_ref, pos(6), name("x"))],
                        values: vec![Expr::Var(v_ref, pos(7), name("v"))],
                    })],
                },
            })],
        },
    };

    let k_binding = BindingId(0);
    let v_binding = BindingId(1);
    let mut attrs = AttributeTable::new();
    attrs.set_resolved_variable(iter_ref, ResolvedVariable::Global);
    attrs.set_resolved_variable(state_ref, ResolvedVariable::Global);
    attrs.set_resolved_variable(ctrl_ref, ResolvedVariable::Global);
    attrs.set_resolved_variable(x_ref, ResolvedVariable::Global);
    attrs.set_resolved_variable(v_ref, ResolvedVariable::Local(v_binding));
    let mut mapping = VarMapping::default();
    mapping.0.insert(name("k"), k_binding);
    mapping.0.insert(name("v"), v_binding);
    attrs.set_var_mapping(for_id, mapping);

    let module = translate_chunk(&chunk, &attrs, TranslatorOptions::default()).unwrap();
    let code = &module.chunk.code;

    let header = code
        .blocks_in_order()
        .map(|(_, b)| b)
        .find(|b| b.nodes.iter().any(|n| matches!(n, IrNode::Call { .. })))
        .expect("generic-for header block not found");
    assert!(header.nodes.iter().any(|n| matches!(n, IrNode::AdjustToOne { .. })));
    assert!(matches!(
        header.terminator,
        Terminator::Branch { .. }
    ));

    let body = code
        .blocks_in_order()
        .map(|(_, b)| b)
        .find(|b| b.nodes.iter().any(|n| matches!(n, IrNode::AdjustMulti { dsts, .. } if dsts.len() == 2)))
        .expect("generic-for body block not found");
    assert!(body.nodes.iter().any(|n| matches!(n, IrNode::StoreLocal { .. })));

    let reachable = cfg::bfs_label_order(code);
    for label in &reachable {
        for succ in code.get(*label).unwrap().terminator.successors() {
            assert!(code.contains(succ));
            assert!(reachable.contains(&succ));
        }
    }
}
