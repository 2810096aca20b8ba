//! §4.3.1 `OneNode`: applies exactly one `(rule, position)` candidate per step.

use crate::field::FieldSet;
use crate::node::core::{self, Prepared, RuleNodeCore};
use crate::node::Context;
use crate::observation::Observation;
use crate::rule::Rule;

pub struct OneNode {
    core: RuleNodeCore,
}

impl OneNode {
    pub fn new(rules: Vec<Rule>, fields: FieldSet, observations: Vec<(u8, Observation)>, steps: usize) -> Self {
        Self {
            core: RuleNodeCore::new(rules, fields, observations, steps),
        }
    }

    pub fn with_search(mut self, search: bool, temperature: f64, depth_coefficient: f64, search_limit: i64) -> Self {
        self.core.search = search;
        self.core.temperature = temperature;
        self.core.depth_coefficient = depth_coefficient;
        self.core.search_limit = search_limit;
        self
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

        if self.core.has_cached_trajectory() {
            return self.apply_trajectory_step(ctx);
        }

        ctx.log.begin_step();
        let count = self.core.matcher.refresh(ctx.grid, ctx.log, ctx.counter);
        if count == 0 {
            return false;
        }

        let applied = if self.core.has_fields() {
            self.apply_scored(ctx)
        } else {
            self.apply_uniform(ctx)
        };
        if applied {
            self.core.own_steps += 1;
        }
        applied
    }

    fn apply_trajectory_step(&mut self, ctx: &mut Context) -> bool {
        ctx.log.begin_step();
        match self.core.next_trajectory_state() {
            Some(next) => {
                for i in 0..ctx.grid.state.len() {
                    if ctx.grid.state[i] != next[i] {
                        let (x, y, z) = (i % ctx.grid.mx, (i / ctx.grid.mx) % ctx.grid.my, i / (ctx.grid.mx * ctx.grid.my));
                        ctx.grid.state[i] = next[i];
                        ctx.log.push(x, y, z);
                    }
                }
                self.core.own_steps += 1;
                true
            }
            None => false,
        }
    }

    fn apply_scored(&mut self, ctx: &mut Context) -> bool {
        let mut best: Option<(usize, f64)> = None;
        let mut first_score: Option<f64> = None;
        let mut i = 0;
        while i < self.core.matcher.matches.len() {
            if self.core.matcher.is_stale(ctx.grid, i) {
                self.core.matcher.remove(ctx.grid, i);
                continue;
            }
            let (r, x, y, z) = self.core.matcher.matches[i];
            let rule = &self.core.matcher.rules[r];
            if let Some(score) = self.core.fields.delta_pointwise(ctx.grid, rule, x, y, z) {
                let first = *first_score.get_or_insert(score);
                let key = RuleNodeCore::selection_key(score, first, self.core.temperature, ctx.rng);
                if best.is_none_or(|(_, best_key)| key > best_key) {
                    best = Some((i, key));
                }
            }
            i += 1;
        }
        let Some((idx, _)) = best else { return false };
        let (r, x, y, z) = self.core.matcher.matches[idx];
        if !ctx.rng.next_bool(self.core.matcher.rules[r].p) {
            return false;
        }
        let applied = core::apply_rule(ctx.grid, ctx.log, &self.core.matcher.rules[r], x, y, z);
        self.core.matcher.remove(ctx.grid, idx);
        applied
    }

    fn apply_uniform(&mut self, ctx: &mut Context) -> bool {
        while !self.core.matcher.matches.is_empty() {
            let idx = ctx.rng.next_index(self.core.matcher.matches.len());
            if self.core.matcher.is_stale(ctx.grid, idx) {
                self.core.matcher.remove(ctx.grid, idx);
                continue;
            }
            let (r, x, y, z) = self.core.matcher.matches[idx];
            if !ctx.rng.next_bool(self.core.matcher.rules[r].p) {
                self.core.matcher.remove(ctx.grid, idx);
                continue;
            }
            let applied = core::apply_rule(ctx.grid, ctx.log, &self.core.matcher.rules[r], x, y, z);
            self.core.matcher.remove(ctx.grid, idx);
            return applied;
        }
        false
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
    fn basic_scenario_turns_every_cell_white_within_nine_steps() {
        let mut grid = Grid::new(3, 3, 1, vec!['B', 'W']).unwrap();
        let mut rng = Prng::from_seed(7);
        let mut log = ChangeLog::new();
        let mut pending_grid = None;
        let mut current = crate::node::NodeId::new(0);
        let mut node = OneNode::new(vec![flip_rule()], FieldSet::default(), Vec::new(), 0);

        for _ in 0..9 {
            let mut ctx = Context {
                grid: &mut grid,
                rng: &mut rng,
                log: &mut log,
                counter: 0,
                pending_grid: &mut pending_grid,
                resources: None,
                current: &mut current,
            };
            if !node.go(&mut ctx) {
                break;
            }
        }
        assert!(grid.state.iter().all(|&c| c == 1));
    }
}
