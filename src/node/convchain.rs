//! §4.10 `ConvChainNode`: Metropolis-Hastings texture synthesis over an
//! on/off substrate, biased by an NxN pattern weight table built from a
//! sample bitmap (the sample itself is supplied pre-decoded; loading it
//! from a resource is an interface-boundary concern, §6).

use std::collections::HashMap;

use crate::grid::Wave;
use crate::node::Context;

pub struct ConvChainNode {
    substrate: Wave,
    n: usize,
    temperature: f64,
    c0: u8,
    c1: u8,
    weights: HashMap<u64, f64>,
    steps: usize,
    own_steps: usize,
    initialized: bool,
}

impl ConvChainNode {
    pub fn new(substrate: Wave, n: usize, temperature: f64, c0: u8, c1: u8, weights: HashMap<u64, f64>, steps: usize) -> Self {
        Self {
            substrate,
            n,
            temperature,
            c0,
            c1,
            weights,
            steps,
            own_steps: 0,
            initialized: false,
        }
    }

    pub fn reset(&mut self) {
        self.own_steps = 0;
        self.initialized = false;
    }

    pub fn go(&mut self, ctx: &mut Context) -> bool {
        if self.steps != 0 && self.own_steps >= self.steps {
            return false;
        }
        let grid = &mut *ctx.grid;
        let cells: Vec<usize> = (0..grid.len()).filter(|&i| self.substrate.contains(grid.state[i])).collect();
        if cells.is_empty() {
            return false;
        }

        if !self.initialized {
            self.initialized = true;
            for &i in &cells {
                let color = if ctx.rng.next_bool(0.5) { self.c1 } else { self.c0 };
                if grid.state[i] != color {
                    grid.state[i] = color;
                    let (x, y, z) = (i % grid.mx, (i / grid.mx) % grid.my, i / (grid.mx * grid.my));
                    ctx.log.push(x, y, z);
                }
            }
            self.own_steps += 1;
            return true;
        }

        let mut order: Vec<usize> = cells;
        ctx.rng.shuffle(&mut order);
        let mut changed = false;
        for i in order {
            let grid = &mut *ctx.grid;
            let (x, y, _z) = (i % grid.mx, (i / grid.mx) % grid.my, i / (grid.mx * grid.my));
            let old = grid.state[i];
            let candidate = if old == self.c1 { self.c0 } else { self.c1 };
            let q = acceptance_ratio(grid, &self.weights, self.n, x, y, candidate, self.c1);
            let accept = q >= 1.0 || ctx.rng.next_f64() < q.powf(1.0 / self.temperature);
            if accept && old != candidate {
                let grid = &mut *ctx.grid;
                grid.state[i] = candidate;
                ctx.log.push(x, y, 0);
                changed = true;
            }
        }
        self.own_steps += 1;
        changed
    }
}

fn acceptance_ratio(grid: &crate::grid::Grid, weights: &HashMap<u64, f64>, n: usize, x: usize, y: usize, candidate: u8, c1: u8) -> f64 {
    let mut q = 1.0;
    for wy in 0..n as i32 {
        for wx in 0..n as i32 {
            let ox = x as i32 - wx;
            let oy = y as i32 - wy;
            let old_bits = window_bits(grid, n, ox, oy, c1, None);
            let new_bits = window_bits(grid, n, ox, oy, c1, Some((x, y, candidate == c1)));
            let old_w = *weights.get(&old_bits).unwrap_or(&0.1);
            let new_w = *weights.get(&new_bits).unwrap_or(&0.1);
            q *= new_w / old_w;
        }
    }
    q
}

fn window_bits(grid: &crate::grid::Grid, n: usize, ox: i32, oy: i32, c1: u8, flip: Option<(usize, usize, bool)>) -> u64 {
    let mut bits = 0u64;
    let mut k = 0;
    for dy in 0..n as i32 {
        for dx in 0..n as i32 {
            let gx = (ox + dx).rem_euclid(grid.mx as i32) as usize;
            let gy = (oy + dy).rem_euclid(grid.my as i32) as usize;
            let on = if let Some((fx, fy, v)) = flip {
                if fx == gx && fy == gy {
                    v
                } else {
                    grid.state[grid.index(gx, gy, 0)] == c1
                }
            } else {
                grid.state[grid.index(gx, gy, 0)] == c1
            };
            if on {
                bits |= 1 << k;
            }
            k += 1;
        }
    }
    bits
}

/// Tabulates every NxN window of `sample` (periodic wrap, true = "on")
/// under its 8 dihedral symmetries, grounded on [`crate::symmetry`]'s
/// group-closure idiom.
pub fn build_weights(sample: &[Vec<bool>], n: usize) -> HashMap<u64, f64> {
    let mut weights = HashMap::new();
    let sh = sample.len();
    if sh == 0 {
        return weights;
    }
    let sw = sample[0].len();
    for y in 0..sh {
        for x in 0..sw {
            let base = sample_pattern(sample, sw, sh, x, y, n);
            for variant in pattern_symmetries(base, n) {
                *weights.entry(variant).or_insert(0.0) += 1.0;
            }
        }
    }
    weights
}

fn sample_pattern(sample: &[Vec<bool>], sw: usize, sh: usize, x: usize, y: usize, n: usize) -> u64 {
    let mut bits = 0u64;
    let mut k = 0;
    for dy in 0..n {
        for dx in 0..n {
            let sx = (x + dx) % sw;
            let sy = (y + dy) % sh;
            if sample[sy][sx] {
                bits |= 1 << k;
            }
            k += 1;
        }
    }
    bits
}

fn pattern_symmetries(bits: u64, n: usize) -> Vec<u64> {
    let mut variants = Vec::new();
    let mut cur = bits;
    for _ in 0..4 {
        variants.push(cur);
        variants.push(reflect_pattern(cur, n));
        cur = rotate_pattern(cur, n);
    }
    variants.sort_unstable();
    variants.dedup();
    variants
}

fn rotate_pattern(bits: u64, n: usize) -> u64 {
    let mut out = 0u64;
    for y in 0..n {
        for x in 0..n {
            if bits & (1 << (y * n + x)) != 0 {
                let (nx, ny) = (n - 1 - y, x);
                out |= 1 << (ny * n + nx);
            }
        }
    }
    out
}

fn reflect_pattern(bits: u64, n: usize) -> u64 {
    let mut out = 0u64;
    for y in 0..n {
        for x in 0..n {
            if bits & (1 << (y * n + x)) != 0 {
                let nx = n - 1 - x;
                out |= 1 << (y * n + nx);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changelog::ChangeLog;
    use crate::grid::Grid;
    use crate::rng::Prng;

    #[test]
    fn first_activation_randomizes_every_substrate_cell() {
        let mut grid = Grid::new(4, 4, 1, vec!['B', 'W']).unwrap();
        let weights = HashMap::new();
        let mut node = ConvChainNode::new(Wave::full(2), 3, 1.0, 0, 1, weights, 0);
        let mut rng = Prng::from_seed(5);
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
        assert!(grid.state.iter().all(|&c| c == 0 || c == 1));
    }

    #[test]
    fn pattern_symmetries_include_identity_and_are_closed_under_rotation() {
        let bits = 0b101_010_101u64;
        let variants = pattern_symmetries(bits, 3);
        assert!(variants.contains(&bits));
        assert!(variants.len() <= 8);
    }
}
