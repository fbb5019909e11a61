//! CFG traversal primitives (spec §4.4): linear node iteration,
//! breadth-first label ordering, and the in-label (reverse-edge) map.
//!
//! All three are read-only, single-pass, O(V+E) over a [`Code`]'s blocks.
//! None of them borrow or construct new IR; they exist purely so later
//! passes (liveness, register allocation, code emission -- all external to
//! this crate) have a common, deterministic way to walk a finished CFG.

use std::collections::VecDeque;

use ahash::{AHashMap, AHashSet};

use crate::ir::{BasicBlock, Code, IrNode, Label, Terminator};

/// One yielded unit of [`linear_nodes`]: either a non-terminator node or the
/// block's terminator. Consumers that only care about "touch every node
/// once" can ignore which arm they received; consumers building a
/// per-block view can match on it.
#[derive(Debug, Clone, Copy)]
pub enum LinearItem<'a> {
    Node(&'a IrNode),
    Terminator(&'a Terminator),
}

/// Yields every non-terminator node of every block followed by that block's
/// terminator, in the order [`Code::blocks_in_order`] presents blocks.
/// Forward-only and read-only -- there is no way to remove an item through
/// this iterator, by construction (it borrows `code` immutably).
pub fn linear_nodes(code: &Code) -> impl Iterator<Item = LinearItem<'_>> {
    code.blocks_in_order().flat_map(|(_, block): (Label, &BasicBlock)| {
        block
            .nodes
            .iter()
            .map(LinearItem::Node)
            .chain(std::iter::once(LinearItem::Terminator(&block.terminator)))
    })
}

/// Visits every label reachable from `code`'s entry exactly once,
/// breadth-first, discovering successors via each block's terminator. Ties
/// among a terminator's successors are broken by
/// [`Terminator::successors`]'s declared order, so the result is
/// deterministic for a given `Code`.
///
/// A successor label absent from the block map (a malformed `Code`) is
/// silently skipped rather than panicking; `Code`'s own invariant is that
/// this never happens for IR the translator produced.
pub fn bfs_label_order(code: &Code) -> Vec<Label> {
    let mut order = Vec::with_capacity(code.len());
    let mut seen = AHashSet::with_capacity(code.len());
    let mut queue = VecDeque::new();

    seen.insert(code.entry());
    queue.push_back(code.entry());

    while let Some(label) = queue.pop_front() {
        order.push(label);
        let Some(block) = code.get(label) else {
            continue;
        };
        for succ in block.terminator.successors() {
            if seen.insert(succ) {
                queue.push_back(succ);
            }
        }
    }

    order
}

/// For every label in `code`'s block map, the set of labels whose
/// terminator names it as a successor. A label with no such predecessor
/// (including one that slipped through unreachable) maps to an empty set
/// rather than being absent from the map.
pub fn in_label_map(code: &Code) -> AHashMap<Label, Vec<Label>> {
    let mut preds: AHashMap<Label, Vec<Label>> = AHashMap::with_capacity(code.len());
    for (label, _) in code.blocks_in_order() {
        preds.entry(label).or_default();
    }
    for (label, block) in code.blocks_in_order() {
        for succ in block.terminator.successors() {
            preds.entry(succ).or_default().push(label);
        }
    }
    preds
}
