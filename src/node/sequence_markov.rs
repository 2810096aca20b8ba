//! §4.4 `SequenceNode` and `MarkovNode`: the two pure control-flow branch
//! shapes (no grid change of their own — everything happens in a leaf
//! descendant).

use crate::node::{self, Arena, Context, NodeId};

/// Runs child `n` until it reports exhaustion, then advances to the next
/// child; once every child is exhausted, resets and reports exhaustion
/// itself.
pub struct SequenceNode {
    pub children: Vec<NodeId>,
    n: usize,
}

impl SequenceNode {
    pub fn new(children: Vec<NodeId>) -> Self {
        Self { children, n: 0 }
    }

    pub fn reset(&mut self) {
        self.n = 0;
    }

    pub fn go(&mut self, arena: &mut Arena, children: &[NodeId], ctx: &mut Context) -> bool {
        while self.n < children.len() {
            if node::go(arena, children[self.n], ctx) {
                return true;
            }
            node::reset(arena, children[self.n]);
            self.n += 1;
        }
        self.reset();
        false
    }
}

/// Resets the cursor to the first child on every call and runs the first
/// child that reports success — Markov's leftmost-matching semantics
/// lifted to the node level.
pub struct MarkovNode {
    pub children: Vec<NodeId>,
    n: usize,
}

impl MarkovNode {
    pub fn new(children: Vec<NodeId>) -> Self {
        Self { children, n: 0 }
    }

    pub fn reset(&mut self) {
        self.n = 0;
        // children reset lazily when visited; matches SequenceNode's idiom.
    }

    pub fn go(&mut self, arena: &mut Arena, children: &[NodeId], ctx: &mut Context) -> bool {
        self.n = 0;
        while self.n < children.len() {
            if node::go(arena, children[self.n], ctx) {
                return true;
            }
            self.n += 1;
        }
        false
    }
}
