//! The node arena and the shared `go`/`reset` dispatch (§3 "AST", §9's
//! "object polymorphism" and "parent back-pointers" design notes).
//!
//! Rather than dynamic dispatch over a `Node` trait object, every node
//! shape is one variant of [`NodeShape`], stored in a flat
//! [`petgraph::graph::DiGraph`] arena (grounded on the teacher crate's
//! `cfr::tree::Tree`, which stores its own game tree the same way: a
//! `DiGraph<Node, Edge>` plus integer `NodeIndex`s instead of owned
//! parent/child pointers). Branch variants keep their children as an
//! explicit `Vec<NodeId>` rather than relying on edge iteration order,
//! since §4.4's `Sequence`/`Markov` semantics depend on a specific child
//! order.
//!
//! `go`/`reset` are free functions over `(arena, id, ctx)` rather than
//! inherent methods, because a branch's `go` must recursively call `go`
//! on a child living in the very same arena; the node's own payload is
//! swapped out to a placeholder for the duration of the call so the
//! arena is never mutably borrowed twice at once (`take it out, recurse,
//! put it back` — the standard shape for a `Vec`/graph-backed tree in
//! safe Rust).

pub mod all;
pub mod convchain;
pub mod convolution;
pub mod core;
pub mod map;
pub mod matcher;
pub mod one;
pub mod path;
pub mod prl;
pub mod sequence_markov;
pub mod wfc;

use crate::changelog::ChangeLog;
use crate::grid::Grid;
use crate::resources::ResourceLoader;
use crate::rng::Prng;

pub type NodeId = petgraph::graph::NodeIndex;
pub type Arena = petgraph::graph::DiGraph<NodeShape, ()>;

/// Mutable state every node's `go` needs, passed explicitly rather than
/// reached through global/back-pointer access (§9's "Global-flavored
/// Interpreter state" design note).
pub struct Context<'a> {
    pub grid: &'a mut Grid,
    pub rng: &'a mut Prng,
    pub log: &'a mut ChangeLog,
    /// `ip.counter`: the index of the step currently executing.
    pub counter: usize,
    /// Set by [`map::MapNode`] when it replaces the grid; the interpreter
    /// swaps this into `self.grid` after the step completes, since a node
    /// can only borrow the grid, not own a new one into the caller's slot.
    pub pending_grid: &'a mut Option<Grid>,
    pub resources: Option<&'a dyn ResourceLoader>,
    /// Mirrors `ip.current` (§3): the node id actively executing, kept for
    /// external introspection (e.g. GUI/log display), not for control flow.
    pub current: &'a mut NodeId,
}

/// One shape of AST node. Leaf variants hold all their own state; branch
/// variants additionally hold an ordered `Vec<NodeId>` of children and a
/// cursor.
pub enum NodeShape {
    One(one::OneNode),
    All(all::AllNode),
    Prl(prl::ParallelNode),
    Sequence(sequence_markov::SequenceNode),
    Markov(sequence_markov::MarkovNode),
    Map(map::MapNode),
    Path(path::PathNode),
    Convolution(convolution::ConvolutionNode),
    ConvChain(convchain::ConvChainNode),
    Wfc(wfc::WfcNode),
    /// Placeholder occupying a slot mid-recursion; never observed outside
    /// [`go`]/[`reset`].
    Empty,
}

/// Runs one `go` call on `id`, recursing into children through `arena` as
/// needed. Returns `true` iff the node rewrote the grid or still
/// considers itself alive (§4.3's contract, generalized to every node
/// shape).
pub fn go(arena: &mut Arena, id: NodeId, ctx: &mut Context) -> bool {
    *ctx.current = id;
    let mut node = std::mem::replace(
        arena.node_weight_mut(id).expect("valid node id"),
        NodeShape::Empty,
    );
    let alive = match &mut node {
        NodeShape::One(n) => n.go(ctx),
        NodeShape::All(n) => n.go(ctx),
        NodeShape::Prl(n) => n.go(ctx),
        NodeShape::Sequence(n) => {
            let children = n.children.clone();
            n.go(arena, &children, ctx)
        }
        NodeShape::Markov(n) => {
            let children = n.children.clone();
            n.go(arena, &children, ctx)
        }
        NodeShape::Map(n) => {
            let children = n.children.clone();
            n.go(arena, &children, ctx)
        }
        NodeShape::Path(n) => n.go(ctx),
        NodeShape::Convolution(n) => n.go(ctx),
        NodeShape::ConvChain(n) => n.go(ctx),
        NodeShape::Wfc(n) => n.go(ctx),
        NodeShape::Empty => false,
    };
    *arena.node_weight_mut(id).expect("valid node id") = node;
    alive
}

/// Resets a node (and, for branches, its cursor only — children reset
/// themselves lazily the next time they're entered, matching the
/// teacher-grade pattern of cheap, idempotent resets).
pub fn reset(arena: &mut Arena, id: NodeId) {
    let mut node = std::mem::replace(
        arena.node_weight_mut(id).expect("valid node id"),
        NodeShape::Empty,
    );
    match &mut node {
        NodeShape::One(n) => n.reset(),
        NodeShape::All(n) => n.reset(),
        NodeShape::Prl(n) => n.reset(),
        NodeShape::Sequence(n) => n.reset(),
        NodeShape::Markov(n) => n.reset(),
        NodeShape::Map(n) => n.reset(),
        NodeShape::Path(n) => n.reset(),
        NodeShape::Convolution(n) => n.reset(),
        NodeShape::ConvChain(n) => n.reset(),
        NodeShape::Wfc(n) => n.reset(),
        NodeShape::Empty => {}
    }
    *arena.node_weight_mut(id).expect("valid node id") = node;
}
