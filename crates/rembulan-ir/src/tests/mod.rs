//! Integration tests driving the whole pipeline (`translate_chunk` +
//! `cfg::*`) against hand-built fixtures, covering the six concrete
//! scenarios plus the CFG well-formedness invariants.

mod scenarios;
