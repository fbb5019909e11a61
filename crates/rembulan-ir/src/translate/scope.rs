//! Per-function lexical scope tracking (spec §4.3 builder state): a stack
//! of frames mapping a binding's identity to the virtual register it lives
//! in.
//!
//! A `BindingId` is unique within its function even across shadowing (the
//! analyzer never reuses one for two distinct declarations), so a flat map
//! would answer every query this stack answers. The stack is kept anyway
//! because it mirrors how the statements actually nest -- entering a `do`
//! block, an `if` arm, or a loop body pushes a frame; leaving it pops one --
//! which is the shape spec §4.3 describes ("a stack of lexical scopes").

use ahash::AHashMap;

use crate::ast::BindingId;
use crate::ir::Value;

#[derive(Debug)]
pub(super) struct ScopeStack {
    frames: Vec<AHashMap<BindingId, Value>>,
}

impl ScopeStack {
    pub(super) fn new() -> Self {
        ScopeStack {
            frames: vec![AHashMap::new()],
        }
    }

    pub(super) fn push(&mut self) {
        self.frames.push(AHashMap::new());
    }

    pub(super) fn pop(&mut self) {
        self.frames.pop();
        debug_assert!(!self.frames.is_empty(), "popped a function's outermost scope");
    }

    pub(super) fn bind(&mut self, binding: BindingId, value: Value) {
        self.frames
            .last_mut()
            .expect("at least one scope frame is always live")
            .insert(binding, value);
    }

    pub(super) fn lookup(&self, binding: BindingId) -> Option<Value> {
        self.frames.iter().rev().find_map(|frame| frame.get(&binding).copied())
    }
}
