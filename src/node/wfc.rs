//! §4.11 `WfcNode`: Wave Function Collapse, in its `Overlap` and `Tile`
//! flavours. The spec treats the solver itself as a well-known
//! sub-algorithm and only pins the interface, so this is a from-scratch,
//! reasonably compact implementation of the textbook arc-consistency
//! loop (observe lowest-entropy cell, propagate bans, backtrack on
//! contradiction by aborting the node).

use crate::node::Context;
use crate::rng::Prng;

const DIRS: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

pub struct WfcNode {
    out_mx: usize,
    out_my: usize,
    patterns: Vec<Vec<u8>>,
    n: usize,
    weights: Vec<f64>,
    propagator: Vec<[Vec<usize>; 4]>,
    periodic: bool,
    wave: Vec<Vec<bool>>,
    done: bool,
}

enum Observed {
    FullyCollapsed,
    Contradiction,
    Banned(usize),
}

impl WfcNode {
    /// `Overlap` variant: `patterns` are `n*n`-flattened color samples cut
    /// from a source bitmap; adjacency is derived by direct overlap
    /// agreement between offset patterns.
    pub fn new_overlap(out_mx: usize, out_my: usize, patterns: Vec<Vec<u8>>, n: usize, weights: Vec<f64>, periodic: bool) -> Self {
        let propagator = build_overlap_propagator(&patterns, n);
        let count = patterns.len();
        Self {
            out_mx,
            out_my,
            patterns,
            n,
            weights,
            propagator,
            periodic,
            wave: vec![vec![true; count]; out_mx * out_my],
            done: false,
        }
    }

    /// `Tile` variant: one color per tile, with an explicit per-direction
    /// adjacency table supplied by the caller (built from the tileset's
    /// declared edge-compatibility, §6).
    pub fn new_tile(out_mx: usize, out_my: usize, tile_colors: Vec<u8>, weights: Vec<f64>, propagator: Vec<[Vec<usize>; 4]>, periodic: bool) -> Self {
        let patterns = tile_colors.into_iter().map(|c| vec![c]).collect();
        let count = weights.len();
        Self {
            out_mx,
            out_my,
            patterns,
            n: 1,
            weights,
            propagator,
            periodic,
            wave: vec![vec![true; count]; out_mx * out_my],
            done: false,
        }
    }

    pub fn reset(&mut self) {
        self.done = false;
        for cell in &mut self.wave {
            cell.iter_mut().for_each(|b| *b = true);
        }
    }

    pub fn go(&mut self, ctx: &mut Context) -> bool {
        if self.done {
            return false;
        }
        self.done = true;
        if !self.solve(ctx.rng) {
            return false;
        }
        self.write(ctx);
        true
    }

    fn solve(&mut self, rng: &mut Prng) -> bool {
        loop {
            match self.observe(rng) {
                Observed::FullyCollapsed => return true,
                Observed::Contradiction => return false,
                Observed::Banned(cell) => {
                    if !self.propagate_from(cell) {
                        return false;
                    }
                }
            }
        }
    }

    fn observe(&mut self, rng: &mut Prng) -> Observed {
        let mut best: Option<(usize, usize)> = None;
        for (cell, possibilities) in self.wave.iter().enumerate() {
            let count = possibilities.iter().filter(|&&b| b).count();
            if count == 0 {
                return Observed::Contradiction;
            }
            if count == 1 {
                continue;
            }
            if best.is_none_or(|(_, best_count)| count < best_count) {
                best = Some((cell, count));
            }
        }
        let Some((cell, _)) = best else {
            return Observed::FullyCollapsed;
        };
        let remaining: Vec<usize> = (0..self.patterns.len()).filter(|&p| self.wave[cell][p]).collect();
        let total: f64 = remaining.iter().map(|&p| self.weights[p]).sum();
        let mut r = rng.next_f64() * total;
        let mut chosen = remaining[remaining.len() - 1];
        for &p in &remaining {
            if r < self.weights[p] {
                chosen = p;
                break;
            }
            r -= self.weights[p];
        }
        for &p in &remaining {
            if p != chosen {
                self.wave[cell][p] = false;
            }
        }
        Observed::Banned(cell)
    }

    fn propagate_from(&mut self, start: usize) -> bool {
        let mut stack = vec![start];
        while let Some(cell) = stack.pop() {
            let (x, y) = (cell % self.out_mx, cell / self.out_mx);
            for (d, &(dx, dy)) in DIRS.iter().enumerate() {
                let Some(ncell) = self.neighbor(x, y, dx, dy) else { continue };
                let mut changed = false;
                for q in 0..self.patterns.len() {
                    if !self.wave[ncell][q] {
                        continue;
                    }
                    let compatible = (0..self.patterns.len()).any(|p| self.wave[cell][p] && self.propagator[p][d].contains(&q));
                    if !compatible {
                        self.wave[ncell][q] = false;
                        changed = true;
                    }
                }
                if changed {
                    if self.wave[ncell].iter().all(|&b| !b) {
                        return false;
                    }
                    stack.push(ncell);
                }
            }
        }
        true
    }

    fn neighbor(&self, x: usize, y: usize, dx: i32, dy: i32) -> Option<usize> {
        if self.periodic {
            let nx = (x as i32 + dx).rem_euclid(self.out_mx as i32) as usize;
            let ny = (y as i32 + dy).rem_euclid(self.out_my as i32) as usize;
            Some(ny * self.out_mx + nx)
        } else {
            let nx = x as i32 + dx;
            let ny = y as i32 + dy;
            if nx < 0 || ny < 0 || nx as usize >= self.out_mx || ny as usize >= self.out_my {
                None
            } else {
                Some(ny as usize * self.out_mx + nx as usize)
            }
        }
    }

    fn write(&self, ctx: &mut Context) {
        for cell in 0..self.wave.len() {
            let pattern = (0..self.patterns.len()).find(|&p| self.wave[cell][p]);
            let Some(pattern) = pattern else { continue };
            let color = self.patterns[pattern][0];
            if ctx.grid.state[cell] != color {
                ctx.grid.state[cell] = color;
                let (x, y) = (cell % self.out_mx, cell / self.out_mx);
                ctx.log.push(x, y, 0);
            }
        }
    }
}

/// For each pattern and direction, the set of patterns whose `n-1`-wide
/// overlap agrees with it when placed one cell over in that direction.
fn build_overlap_propagator(patterns: &[Vec<u8>], n: usize) -> Vec<[Vec<usize>; 4]> {
    patterns
        .iter()
        .map(|p| {
            let mut table: [Vec<usize>; 4] = [Vec::new(), Vec::new(), Vec::new(), Vec::new()];
            for (d, &(dx, dy)) in DIRS.iter().enumerate() {
                for (qi, q) in patterns.iter().enumerate() {
                    if agrees(p, q, n, dx, dy) {
                        table[d].push(qi);
                    }
                }
            }
            table
        })
        .collect()
}

fn agrees(p: &[u8], q: &[u8], n: usize, dx: i32, dy: i32) -> bool {
    let xmin = dx.max(0) as usize;
    let xmax = (n as i32 + dx.min(0)) as usize;
    let ymin = dy.max(0) as usize;
    let ymax = (n as i32 + dy.min(0)) as usize;
    for y in ymin..ymax {
        for x in xmin..xmax {
            let px = (x as i32 - dx) as usize;
            let py = (y as i32 - dy) as usize;
            if p[py * n + px] != q[y * n + x] {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changelog::ChangeLog;
    use crate::grid::Grid;
    use crate::rng::Prng;

    #[test]
    fn single_pattern_solves_trivially_and_paints_its_color() {
        let mut grid = Grid::new(2, 2, 1, vec!['B', 'W']).unwrap();
        let patterns = vec![vec![1u8]];
        let mut node = WfcNode::new_overlap(2, 2, patterns, 1, vec![1.0], true);
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
        assert!(grid.state.iter().all(|&c| c == 1));
    }
}
