//! Per-function translator builder state (spec §4.3, §9): the currently
//! active basic block, the fresh-identifier generators, the scope and
//! break-target stacks, and forward-`goto` bookkeeping.
//!
//! One [`Builder`] exists per function translated (including the chunk);
//! it is discarded the moment that function's [`Code`] is assembled, per
//! spec §9's "one context per function" guidance -- there is no ambient or
//! global builder state.

use ahash::{AHashMap, AHashSet};
use smol_str::SmolStr;

use crate::ast::{self, BindingId, Expr, NodeId, Position};
use crate::attrs::{self, AttributeTable};
use crate::error::CompilerError;
use crate::ir::{
    Arity, BasicBlock, Code, Constant, IrNode, Label, MultiValue, Terminator, Value,
};

use super::scope::ScopeStack;

/// Shared, module-wide translation state: the attribute tables (read-only,
/// borrowed for the whole translation) and the growing list of nested
/// functions discovered so far. One `TranslationCtx` is threaded through
/// every `Builder` in a single `translate_chunk` call; `Builder`s for
/// sibling or nested functions borrow it in turn, never concurrently.
pub(crate) struct TranslationCtx<'attrs> {
    attrs: &'attrs AttributeTable,
    pub(crate) functions: Vec<crate::ir::FunctionIr>,
}

impl<'attrs> TranslationCtx<'attrs> {
    pub(crate) fn new(attrs: &'attrs AttributeTable) -> Self {
        TranslationCtx {
            attrs,
            functions: Vec::new(),
        }
    }
}

pub(super) struct Builder<'ctx, 'attrs> {
    ctx: &'ctx mut TranslationCtx<'attrs>,

    value_counter: u32,
    multi_counter: u32,
    label_counter: u32,

    entry: Label,
    current_label: Label,
    current_nodes: Vec<IrNode>,
    /// Whether `current_label`/`current_nodes` still accept more nodes.
    /// Cleared by `terminate`, set by `open_block`. While clear, statements
    /// that would otherwise emit into the current block are dead code
    /// (spec §8: a `return`'s trailing statements are discarded) and are
    /// skipped by `stmt::translate_block` instead.
    block_open: bool,
    finished_blocks: Vec<(Label, BasicBlock)>,

    scopes: ScopeStack,
    break_targets: Vec<Label>,
    used_as_break_target: AHashSet<Label>,

    /// Target `NodeId` (a label-defining statement) -> the `Label` assigned
    /// to it, the position of whichever `goto` first forward-referenced it
    /// (for error reporting), and its source name.
    pending_labels: AHashMap<NodeId, (Label, Position, SmolStr)>,
    defined_labels: AHashSet<NodeId>,
    /// Every label-defining statement's `NodeId` that some `goto` in this
    /// function resolves to, computed once up front (spec §4.3's "pending
    /// labels" map, precomputed rather than threaded live, so a label
    /// definition reached while the current block is dead -- e.g.
    /// immediately after a `break` -- still knows whether it must be
    /// materialized for a later backward `goto`).
    goto_targets: AHashSet<NodeId>,
}

impl<'ctx, 'attrs> Builder<'ctx, 'attrs> {
    fn new(ctx: &'ctx mut TranslationCtx<'attrs>) -> Self {
        let entry = Label::from_index(0);
        Builder {
            ctx,
            value_counter: 0,
            multi_counter: 0,
            label_counter: 1,
            entry,
            current_label: entry,
            current_nodes: Vec::new(),
            block_open: true,
            finished_blocks: Vec::new(),
            scopes: ScopeStack::new(),
            break_targets: Vec::new(),
            used_as_break_target: AHashSet::new(),
            pending_labels: AHashMap::new(),
            defined_labels: AHashSet::new(),
            goto_targets: AHashSet::new(),
        }
    }

    pub(super) fn attrs(&self) -> &'attrs AttributeTable {
        self.ctx.attrs
    }

    pub(super) fn is_block_open(&self) -> bool {
        self.block_open
    }

    pub(super) fn fresh_value(&mut self) -> Value {
        let v = Value::from_index(self.value_counter);
        self.value_counter += 1;
        v
    }

    pub(super) fn fresh_multi(&mut self) -> MultiValue {
        let m = MultiValue::from_index(self.multi_counter);
        self.multi_counter += 1;
        m
    }

    pub(super) fn fresh_label(&mut self) -> Label {
        let l = Label::from_index(self.label_counter);
        self.label_counter += 1;
        l
    }

    pub(super) fn emit(&mut self, node: IrNode) {
        debug_assert!(self.block_open, "emitted a node into an already-terminated block");
        self.current_nodes.push(node);
    }

    pub(super) fn load_const(&mut self, value: Constant) -> Value {
        let dst = self.fresh_value();
        self.emit(IrNode::LoadConst { dst, value });
        dst
    }

    pub(super) fn load_int_const(&mut self, n: i64) -> Value {
        self.load_const(Constant::Int(n))
    }

    /// Closes the current block with `terminator`. The current label/node
    /// buffer is not reopened -- callers that need to keep translating into
    /// a fresh block call [`Builder::open_block`] themselves.
    pub(super) fn terminate(&mut self, terminator: Terminator) {
        debug_assert!(self.block_open, "terminated an already-closed block");
        let nodes = std::mem::take(&mut self.current_nodes);
        self.finished_blocks.push((self.current_label, BasicBlock { nodes, terminator }));
        self.block_open = false;
    }

    pub(super) fn open_block(&mut self, label: Label) {
        self.current_label = label;
        self.current_nodes.clear();
        self.block_open = true;
    }

    pub(super) fn push_scope(&mut self) {
        self.scopes.push();
    }

    pub(super) fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    pub(super) fn bind_local(&mut self, binding: BindingId, value: Value) {
        self.scopes.bind(binding, value);
    }

    pub(super) fn lookup_local(&self, binding: BindingId) -> Option<Value> {
        self.scopes.lookup(binding)
    }

    pub(super) fn push_break_target(&mut self, label: Label) {
        self.break_targets.push(label);
    }

    pub(super) fn pop_break_target(&mut self) {
        self.break_targets.pop();
    }

    pub(super) fn break_target(&mut self, pos: Position) -> Result<Label, CompilerError> {
        let target = self
            .break_targets
            .last()
            .copied()
            .ok_or(CompilerError::BreakOutsideLoop { pos })?;
        self.used_as_break_target.insert(target);
        Ok(target)
    }

    pub(super) fn was_reached_by_break(&self, label: Label) -> bool {
        self.used_as_break_target.contains(&label)
    }

    /// Resolves the `Label` a label-defining statement or `goto` targeting
    /// `target` should use, allocating a fresh one the first time either
    /// side asks (spec §4.3's forward-`goto` placeholder).
    pub(super) fn label_for_target(&mut self, target: NodeId, pos: Position, name: &str) -> Label {
        if let Some((label, _, _)) = self.pending_labels.get(&target) {
            *label
        } else {
            let label = self.fresh_label();
            self.pending_labels.insert(target, (label, pos, SmolStr::new(name)));
            label
        }
    }

    pub(super) fn mark_label_defined(&mut self, target: NodeId) {
        self.defined_labels.insert(target);
    }

    pub(super) fn is_goto_target(&self, target: NodeId) -> bool {
        self.goto_targets.contains(&target)
    }

    fn check_labels_defined(&self) -> Result<(), CompilerError> {
        for (target, (_, pos, name)) in &self.pending_labels {
            if !self.defined_labels.contains(target) {
                return Err(CompilerError::UndefinedLabel {
                    pos: *pos,
                    name: name.to_string(),
                });
            }
        }
        Ok(())
    }

    fn into_code(self) -> Code {
        let mut code = Code::new(self.entry);
        for (label, block) in self.finished_blocks {
            code.insert_block(label, block);
        }
        code
    }

    /// Evaluates `exprs` as a call/return/constructor argument list: every
    /// element but the last in single-value context, the last expanded to
    /// a trailing multi-value if it is a producer (spec §4.3's "final RHS
    /// expanded if it is a multi-value producer").
    pub(super) fn translate_arglist(
        &mut self,
        exprs: &[Expr],
    ) -> Result<(Vec<Value>, Option<MultiValue>), CompilerError> {
        let Some((last, head)) = exprs.split_last() else {
            return Ok((Vec::new(), None));
        };
        let mut values = Vec::with_capacity(head.len());
        for e in head {
            values.push(super::expr::translate_expr(self, e)?);
        }
        if last.is_multi_value_producer() {
            let multi = super::expr::translate_expr_multi(self, last)?;
            Ok((values, Some(multi)))
        } else {
            values.push(super::expr::translate_expr(self, last)?);
            Ok((values, None))
        }
    }

    /// Evaluates `exprs` and adjusts the result to exactly `target_count`
    /// values: missing slots filled with nil, extras discarded (spec
    /// §4.3's multi-assignment/local-declaration/generic-for adjustment
    /// rule).
    pub(super) fn eval_adjusted(
        &mut self,
        exprs: &[Expr],
        target_count: usize,
    ) -> Result<Vec<Value>, CompilerError> {
        let (mut values, trailing) = self.translate_arglist(exprs)?;
        if let Some(multi) = trailing {
            let remaining = target_count.saturating_sub(values.len());
            let dsts: Vec<Value> = (0..remaining).map(|_| self.fresh_value()).collect();
            if !dsts.is_empty() {
                self.emit(IrNode::AdjustMulti { dsts: dsts.clone(), src: multi });
                values.extend(dsts);
            }
        }
        while values.len() < target_count {
            values.push(self.load_const(Constant::Nil));
        }
        values.truncate(target_count);
        Ok(values)
    }

    /// Translates one function body (a function literal's, or the chunk's)
    /// from scratch: binds its parameters, translates its statements, adds
    /// the implicit `return` a fall-through end-of-body gets, and checks
    /// every forward `goto` was eventually defined.
    pub(super) fn translate_function_body(
        ctx: &'ctx mut TranslationCtx<'attrs>,
        node_id: NodeId,
        pos: Position,
        params: &[SmolStr],
        is_vararg: bool,
        body: &ast::Block,
    ) -> Result<(Code, Arity), CompilerError> {
        let mut builder = Builder::new(ctx);
        builder.goto_targets = super::stmt::collect_goto_targets(body, builder.attrs())?;

        if !params.is_empty() {
            let mapping = attrs::required::var_mapping(builder.attrs(), node_id, pos)?;
            for name in params {
                let home = builder.fresh_value();
                let binding = mapping
                    .get(name)
                    .expect("VarMapping missing a declared parameter name");
                builder.bind_local(binding, home);
            }
        }

        super::stmt::translate_block(&mut builder, body)?;

        if builder.block_open {
            builder.terminate(Terminator::Return {
                values: Vec::new(),
                trailing_multi: None,
            });
        }
        builder.check_labels_defined()?;

        let arity = Arity {
            fixed_params: params.len() as u32,
            is_vararg,
        };
        Ok((builder.into_code(), arity))
    }

    /// Reborrows the shared context so a nested function literal can build
    /// its own, independent `Builder` while this one is still in progress.
    pub(super) fn ctx_mut(&mut self) -> &mut TranslationCtx<'attrs> {
        self.ctx
    }
}
