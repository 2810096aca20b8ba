//! §4.3.2 `AllNode`: applies every current candidate in one step, using
//! the grid's `mask[]` scratch buffer to forbid within-step write
//! collisions.

use crate::field::FieldSet;
use crate::grid::WILDCARD;
use crate::node::core::{Prepared, RuleNodeCore};
use crate::node::Context;
use crate::observation::Observation;
use crate::rule::Rule;

pub struct AllNode {
    core: RuleNodeCore,
}

impl AllNode {
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

        let mut order: Vec<usize> = (0..self.core.matcher.matches.len()).collect();
        if self.core.has_fields() {
            // Highest score first; candidates with no applicable score sink
            // to the back and are skipped when applied (stale-equivalent).
            let mut with_scores: Vec<(usize, f64)> = order
                .iter()
                .map(|&i| {
                    let (r, x, y, z) = self.core.matcher.matches[i];
                    let rule = &self.core.matcher.rules[r];
                    (i, self.core.fields.delta_pointwise(ctx.grid, rule, x, y, z).unwrap_or(f64::MIN))
                })
                .collect();
            with_scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
            order = with_scores.into_iter().map(|(i, _)| i).collect();
        } else {
            ctx.rng.shuffle(&mut order);
        }

        let mut marked: Vec<usize> = Vec::new();
        let mut applied_any = false;
        for idx in order {
            if self.core.matcher.is_stale(ctx.grid, idx) {
                continue;
            }
            let (r, x, y, z) = self.core.matcher.matches[idx];
            let rule = self.core.matcher.rules[r].clone();
            if !ctx.rng.next_bool(rule.p) {
                continue;
            }
            if let Some(changed) = try_apply(ctx.grid, ctx.log, &rule, x, y, z, &mut marked) {
                applied_any |= changed;
            }
        }
        for idx in &marked {
            ctx.grid.mask[*idx] = false;
        }
        self.core.matcher.clear_matches();
        if applied_any {
            self.core.own_steps += 1;
        }
        applied_any
    }
}

/// Claims every non-wildcard output cell in `grid.mask`, refusing (and
/// leaving the grid untouched) if any cell was already claimed this step.
fn try_apply(
    grid: &mut crate::grid::Grid,
    log: &mut crate::changelog::ChangeLog,
    rule: &Rule,
    x: usize,
    y: usize,
    z: usize,
    marked: &mut Vec<usize>,
) -> Option<bool> {
    for dz in 0..rule.omz {
        for dy in 0..rule.omy {
            for dx in 0..rule.omx {
                let ri = dx + dy * rule.omx + dz * rule.omx * rule.omy;
                if rule.output[ri] == WILDCARD {
                    continue;
                }
                let gi = grid.index(x + dx, y + dy, z + dz);
                if grid.mask[gi] {
                    return None;
                }
            }
        }
    }
    let mut changed = false;
    for dz in 0..rule.omz {
        for dy in 0..rule.omy {
            for dx in 0..rule.omx {
                let ri = dx + dy * rule.omx + dz * rule.omx * rule.omy;
                let color = rule.output[ri];
                if color == WILDCARD {
                    continue;
                }
                let (gx, gy, gz) = (x + dx, y + dy, z + dz);
                let gi = grid.index(gx, gy, gz);
                grid.mask[gi] = true;
                marked.push(gi);
                if grid.state[gi] != color {
                    grid.state[gi] = color;
                    log.push(gx, gy, gz);
                    changed = true;
                }
            }
        }
    }
    Some(changed)
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
    fn all_node_rewrites_every_matching_cell_in_one_step() {
        let mut grid = Grid::new(5, 1, 1, vec!['B', 'W']).unwrap();
        let mut rng = Prng::from_seed(3);
        let mut log = ChangeLog::new();
        let mut pending_grid = None;
        let mut current = crate::node::NodeId::new(0);
        let mut node = AllNode::new(vec![flip_rule()], FieldSet::default(), Vec::new(), 0);
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
        assert!(grid.mask.iter().all(|&m| !m));
    }
}
