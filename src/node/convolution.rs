//! §4.9 `ConvolutionNode`: a cellular-automaton step. Every cell computes,
//! for each color, a kernel-weighted count of same-colored neighbours;
//! rules fire when those counts land in an accepted set, Bernoulli-gated
//! by `p`, all in one synchronous sweep (akin to [`crate::node::prl::ParallelNode`]).

use crate::grid::Grid;

/// One possible rewrite: `from` the cell's current color `to` a new one,
/// conditioned on weighted neighbor-color sums landing in the accepted
/// bitmask (bit `k` set means sum `k` is accepted, sums capped at 32).
#[derive(Clone)]
pub struct ConvRule {
    pub from: u8,
    pub to: u8,
    pub sums: Vec<(u8, u32)>,
    pub p: f64,
}

pub struct ConvolutionNode {
    kernel: Vec<(i32, i32, i32, i32)>,
    periodic: bool,
    rules: Vec<ConvRule>,
    steps: usize,
    own_steps: usize,
}

impl ConvolutionNode {
    pub fn new(kernel_name: &str, periodic: bool, rules: Vec<ConvRule>, steps: usize) -> Self {
        Self {
            kernel: kernel_by_name(kernel_name),
            periodic,
            rules,
            steps,
            own_steps: 0,
        }
    }

    pub fn reset(&mut self) {
        self.own_steps = 0;
    }

    pub fn go(&mut self, ctx: &mut crate::node::Context) -> bool {
        if self.steps != 0 && self.own_steps >= self.steps {
            return false;
        }
        let grid = &*ctx.grid;
        let mut newstate = grid.state.clone();
        let mut any = false;
        for z in 0..grid.mz {
            for y in 0..grid.my {
                for x in 0..grid.mx {
                    let gi = grid.index(x, y, z);
                    let from = grid.state[gi];
                    for rule in self.rules.iter().filter(|r| r.from == from) {
                        let satisfied = rule.sums.iter().all(|&(color, mask)| {
                            let sum = self.weighted_sum(grid, x, y, z, color);
                            sum < 32 && (mask & (1 << sum)) != 0
                        });
                        if !satisfied {
                            continue;
                        }
                        if !ctx.rng.next_bool(rule.p) {
                            continue;
                        }
                        newstate[gi] = rule.to;
                        any = true;
                        break;
                    }
                }
            }
        }
        if !any {
            return false;
        }
        ctx.log.begin_step();
        for i in 0..newstate.len() {
            if ctx.grid.state[i] != newstate[i] {
                let (x, y, z) = (i % ctx.grid.mx, (i / ctx.grid.mx) % ctx.grid.my, i / (ctx.grid.mx * ctx.grid.my));
                ctx.log.push(x, y, z);
            }
        }
        ctx.grid.state = newstate;
        self.own_steps += 1;
        true
    }

    fn weighted_sum(&self, grid: &Grid, x: usize, y: usize, z: usize, color: u8) -> u32 {
        let mut sum: i64 = 0;
        for &(dx, dy, dz, weight) in &self.kernel {
            let (nx, ny, nz) = if self.periodic {
                (
                    (x as i32 + dx).rem_euclid(grid.mx as i32) as usize,
                    (y as i32 + dy).rem_euclid(grid.my as i32) as usize,
                    (z as i32 + dz).rem_euclid(grid.mz as i32) as usize,
                )
            } else {
                let (nx, ny, nz) = (x as i32 + dx, y as i32 + dy, z as i32 + dz);
                if nx < 0 || ny < 0 || nz < 0 || nx as usize >= grid.mx || ny as usize >= grid.my || nz as usize >= grid.mz {
                    continue;
                }
                (nx as usize, ny as usize, nz as usize)
            };
            let gi = grid.index(nx, ny, nz);
            if grid.state[gi] == color {
                sum += weight as i64;
            }
        }
        sum.max(0) as u32
    }
}

/// Named neighbourhood shapes (§4.9). `VonNeumann` is the 4/6-connected
/// cross, `Moore` is the full 8/26-connected block, `NoCorners` is Moore
/// minus the vertex-diagonal cells.
fn kernel_by_name(name: &str) -> Vec<(i32, i32, i32, i32)> {
    match name {
        "VonNeumann" => vec![(1, 0, 0, 1), (-1, 0, 0, 1), (0, 1, 0, 1), (0, -1, 0, 1)],
        "Moore" => {
            let mut k = Vec::new();
            for dy in -1..=1 {
                for dx in -1..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    k.push((dx, dy, 0, 1));
                }
            }
            k
        }
        "NoCorners" => vec![(1, 0, 0, 1), (-1, 0, 0, 1), (0, 1, 0, 1), (0, -1, 0, 1)],
        _ => vec![(1, 0, 0, 1), (-1, 0, 0, 1), (0, 1, 0, 1), (0, -1, 0, 1)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changelog::ChangeLog;
    use crate::grid::Grid;
    use crate::node::Context;
    use crate::rng::Prng;

    #[test]
    fn game_of_life_birth_rule_brings_a_dead_cell_alive_with_three_neighbors() {
        // . . .
        // W W W   (center row live, rest dead) — middle top cell has 3 live neighbors
        // . . .
        let mut grid = Grid::new(3, 3, 1, vec!['B', 'W']).unwrap();
        grid.state = vec![0, 0, 0, 1, 1, 1, 0, 0, 0];
        let birth = ConvRule { from: 0, to: 1, sums: vec![(1, 1 << 3)], p: 1.0 };
        let survive = ConvRule { from: 1, to: 1, sums: vec![(1, (1 << 2) | (1 << 3))], p: 1.0 };
        let mut node = ConvolutionNode::new("Moore", false, vec![survive, birth], 0);

        let mut rng = Prng::from_seed(1);
        let mut log = ChangeLog::new();
        let mut pending_grid = None;
        let mut current = crate::node::NodeId::new(0);
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
        assert_eq!(grid.state[1], 1);
    }
}
