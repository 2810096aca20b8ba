//! §4.3.3 `ParallelNode`: like [`crate::node::all::AllNode`] but resolves
//! overlaps by last-writer-wins over a double-buffered state, rather than
//! refusing overlapping candidates outright.

use crate::field::FieldSet;
use crate::grid::WILDCARD;
use crate::node::core::{Prepared, RuleNodeCore};
use crate::node::Context;
use crate::observation::Observation;
use crate::rule::Rule;

pub struct ParallelNode {
    core: RuleNodeCore,
}

impl ParallelNode {
    pub fn new(rules: Vec<Rule>, fields: FieldSet, observations: Vec<(u8, Observation)>, steps: usize) -> Self {
        Self {
            core: RuleNodeCore::new(rules, fields, observations, steps),
        }
    }

    pub fn reset(&mut self) {
        self.core.reset();
    }

    pub fn go(&mut self, ctx: &mut Context) -> bool {
        match self.core.prepare(ctx) {
            Prepared::Aborted | Prepared::GoalReached => return false,
            Prepared::Continue => {}
        }
        if self.core.steps != 0 && self.core.own_steps >= self.core.steps {
            return false;
        }

        ctx.log.begin_step();
        let count = self.core.matcher.refresh(ctx.grid, ctx.log, ctx.counter);
        if count == 0 {
            return false;
        }

        let mut newstate = ctx.grid.state.clone();
        for idx in 0..self.core.matcher.matches.len() {
            if self.core.matcher.is_stale(ctx.grid, idx) {
                continue;
            }
            let (r, x, y, z) = self.core.matcher.matches[idx];
            let rule = &self.core.matcher.rules[r];
            if !ctx.rng.next_bool(rule.p) {
                continue;
            }
            for dz in 0..rule.omz {
                for dy in 0..rule.omy {
                    for dx in 0..rule.omx {
                        let ri = dx + dy * rule.omx + dz * rule.omx * rule.omy;
                        let color = rule.output[ri];
                        if color == WILDCARD {
                            continue;
                        }
                        let gi = ctx.grid.index(x + dx, y + dy, z + dz);
                        newstate[gi] = color;
                    }
                }
            }
        }

        for i in 0..newstate.len() {
            if ctx.grid.state[i] != newstate[i] {
                let (x, y, z) = (i % ctx.grid.mx, (i / ctx.grid.mx) % ctx.grid.my, i / (ctx.grid.mx * ctx.grid.my));
                ctx.log.push(x, y, z);
            }
        }
        ctx.grid.state = newstate;
        self.core.matcher.clear_matches();
        self.core.own_steps += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changelog::ChangeLog;
    use crate::grid::{Grid, Wave};
    use crate::rng::Prng;

    fn flip_rule() -> Rule {
        Rule::new(1, 1, 1, vec![Wave::one_hot(0)], 1, 1, 1, vec![1], 1.0, 2).unwrap()
    }

    #[test]
    fn parallel_node_applies_every_rule_in_one_pass() {
        let mut grid = Grid::new(5, 1, 1, vec!['B', 'W']).unwrap();
        let mut rng = Prng::from_seed(9);
        let mut log = ChangeLog::new();
        let mut pending_grid = None;
        let mut current = crate::node::NodeId::new(0);
        let mut node = ParallelNode::new(vec![flip_rule()], FieldSet::default(), Vec::new(), 0);
        let mut ctx = Context {
            grid: &mut grid,
            rng: &mut rng,
            log: &mut log,
            counter: 0,
            pending_grid: &mut pending_grid,
            resources: None,
            current: &mut current,
        };
        assert!(node.go(&mut ctx));
        assert!(grid.state.iter().all(|&c| c == 1));
    }
}
