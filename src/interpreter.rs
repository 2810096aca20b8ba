//! §4.12 `Interpreter`: the AST root plus the step driver that turns
//! `node::go` calls into a snapshot stream.

use crate::changelog::ChangeLog;
use crate::config::RunConfig;
use crate::grid::Grid;
use crate::node::{self, Arena, Context, NodeId};
use crate::rng::Prng;
use crate::snapshot::{Snapshot, SnapshotIter};

/// The compiled program: a node arena, the id of its root, and the grid
/// it rewrites. Built by [`crate::model::Interpreter::compile`]; `run`
/// is this type's only way to make progress.
pub struct Interpreter {
    pub(crate) arena: Arena,
    pub(crate) root: NodeId,
    pub(crate) grid: Grid,
    /// `ip.counter`: the step index handed to the matcher as
    /// `current_turn` so incremental rescans line up with
    /// [`ChangeLog::first`]'s chronology.
    pub(crate) counter: usize,
}

impl Interpreter {
    /// Runs to completion (the root exhausts itself) or `max_steps`,
    /// whichever comes first, and returns every snapshot the run
    /// produced. Per §6: streaming runs get one snapshot per step;
    /// non-streaming runs get only the initial and final snapshots.
    pub fn run(&mut self, config: RunConfig) -> SnapshotIter {
        let mut rng = Prng::from_seed(config.seed);
        let mut log = ChangeLog::new();
        let mut pending_grid: Option<Grid> = None;
        let mut current = self.root;
        let mut snapshots = Vec::new();

        if config.streaming {
            snapshots.push(Snapshot::capture(&self.grid));
        }

        let mut steps = 0usize;
        loop {
            if config.max_steps.is_some_and(|max| steps >= max) {
                break;
            }

            self.counter = log.first.len();
            let root = self.root;
            let arena = &mut self.arena;
            let grid = &mut self.grid;
            let alive = {
                let mut ctx = Context {
                    grid,
                    rng: &mut rng,
                    log: &mut log,
                    counter: self.counter,
                    pending_grid: &mut pending_grid,
                    resources: None,
                    current: &mut current,
                };
                node::go(arena, root, &mut ctx)
            };
            if let Some(newgrid) = pending_grid.take() {
                self.grid = newgrid;
            }
            steps += 1;
            if config.streaming {
                snapshots.push(Snapshot::capture(&self.grid));
            }
            if !alive {
                break;
            }
        }

        if !config.streaming {
            snapshots.push(Snapshot::capture(&self.grid));
        }
        SnapshotIter::new(snapshots)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldSet;
    use crate::grid::Wave;
    use crate::node::one::OneNode;
    use crate::node::NodeShape;
    use crate::rule::Rule;

    fn flip_rule() -> Rule {
        Rule::new(1, 1, 1, vec![Wave::one_hot(0)], 1, 1, 1, vec![1], 1.0, 2).unwrap()
    }

    #[test]
    fn non_streaming_run_yields_only_initial_and_final_snapshots() {
        let grid = Grid::new(3, 1, 1, vec!['B', 'W']).unwrap();
        let mut arena: Arena = Arena::new();
        let root = arena.add_node(NodeShape::One(OneNode::new(vec![flip_rule()], FieldSet::default(), Vec::new(), 0)));
        let mut interp = Interpreter { arena, root, grid, counter: 0 };

        let snapshots: Vec<_> = interp.run(RunConfig::new(1).with_max_steps(10)).collect();
        assert_eq!(snapshots.len(), 1);
        assert!(snapshots.last().unwrap().state.iter().all(|&c| c == 1));
    }

    #[test]
    fn streaming_run_yields_a_snapshot_per_step() {
        let grid = Grid::new(3, 1, 1, vec!['B', 'W']).unwrap();
        let mut arena: Arena = Arena::new();
        let root = arena.add_node(NodeShape::One(OneNode::new(vec![flip_rule()], FieldSet::default(), Vec::new(), 0)));
        let mut interp = Interpreter { arena, root, grid, counter: 0 };

        let snapshots: Vec<_> = interp.run(RunConfig::new(1).with_max_steps(10).streaming()).collect();
        // Initial snapshot, then one per successful step (3 flips), then the
        // final failing step also yields a snapshot before breaking.
        assert!(snapshots.len() >= 4);
        assert!(snapshots.last().unwrap().state.iter().all(|&c| c == 1));
    }

    #[test]
    fn max_steps_caps_progress_even_if_the_root_is_still_alive() {
        let grid = Grid::new(5, 1, 1, vec!['B', 'W']).unwrap();
        let mut arena: Arena = Arena::new();
        let root = arena.add_node(NodeShape::One(OneNode::new(vec![flip_rule()], FieldSet::default(), Vec::new(), 0)));
        let mut interp = Interpreter { arena, root, grid, counter: 0 };

        let snapshots: Vec<_> = interp.run(RunConfig::new(1).with_max_steps(2)).collect();
        let last = snapshots.last().unwrap();
        assert_eq!(last.state.iter().filter(|&&c| c == 1).count(), 2);
    }
}
