//! §4.8 `PathNode`: Dijkstra/BFS-flavoured path drawing between "start"
//! and "finish" color sets, painted over a "substrate".

use std::collections::VecDeque;

use crate::grid::Wave;
use crate::node::Context;

pub struct PathNode {
    pub start: Wave,
    pub finish: Wave,
    pub substrate: Wave,
    pub value: u8,
    pub longest: bool,
    pub edges: bool,
    pub vertices: bool,
    pub inertia: bool,
    done: bool,
}

impl PathNode {
    pub fn new(start: Wave, finish: Wave, substrate: Wave, value: u8, longest: bool, edges: bool, vertices: bool, inertia: bool) -> Self {
        Self {
            start,
            finish,
            substrate,
            value,
            longest,
            edges,
            vertices,
            inertia,
            done: false,
        }
    }

    pub fn reset(&mut self) {
        self.done = false;
    }

    pub fn go(&mut self, ctx: &mut Context) -> bool {
        if self.done {
            return false;
        }
        self.done = true;

        let grid = &*ctx.grid;
        let n = grid.len();
        let offsets = neighbor_offsets(self.edges, self.vertices);
        let mut generation = vec![-1i32; n];
        let mut queue: VecDeque<usize> = VecDeque::new();
        for i in 0..n {
            if self.finish.contains(grid.state[i]) {
                generation[i] = 0;
                queue.push_back(i);
            }
        }
        while let Some(i) = queue.pop_front() {
            let d = generation[i];
            let (x, y, z) = (i % grid.mx, (i / grid.mx) % grid.my, i / (grid.mx * grid.my));
            for &(dx, dy, dz) in &offsets {
                let Some((nx, ny, nz)) = offset_in_bounds(grid, x, y, z, dx, dy, dz) else { continue };
                let ni = grid.index(nx, ny, nz);
                if generation[ni] != -1 {
                    continue;
                }
                let color = grid.state[ni];
                if self.start.contains(color) || self.substrate.contains(color) {
                    generation[ni] = d + 1;
                    queue.push_back(ni);
                }
            }
        }

        let chosen = (0..n)
            .filter(|&i| self.start.contains(grid.state[i]) && generation[i] >= 0)
            .map(|i| (i, generation[i]))
            .reduce(|a, b| if self.longest { if b.1 > a.1 { b } else { a } } else if b.1 < a.1 { b } else { a });
        let Some((mut current, _)) = chosen else {
            return false;
        };

        let mut painted = Vec::new();
        let mut prev_dir: Option<(i32, i32, i32)> = None;
        loop {
            painted.push(current);
            if generation[current] == 0 {
                break;
            }
            let (x, y, z) = (current % grid.mx, (current / grid.mx) % grid.my, current / (grid.mx * grid.my));
            let target = generation[current] - 1;
            let mut candidates: Vec<(usize, (i32, i32, i32))> = Vec::new();
            for &(dx, dy, dz) in &offsets {
                let Some((nx, ny, nz)) = offset_in_bounds(grid, x, y, z, dx, dy, dz) else { continue };
                let ni = grid.index(nx, ny, nz);
                if generation[ni] == target {
                    candidates.push((ni, (dx, dy, dz)));
                }
            }
            let Some(&(next, dir)) = pick_next(&candidates, prev_dir, self.inertia) else {
                break;
            };
            current = next;
            prev_dir = Some(dir);
        }

        let grid = &mut *ctx.grid;
        for i in painted {
            if grid.state[i] != self.value {
                grid.state[i] = self.value;
                let (x, y, z) = (i % grid.mx, (i / grid.mx) % grid.my, i / (grid.mx * grid.my));
                ctx.log.push(x, y, z);
            }
        }
        true
    }
}

fn offset_in_bounds(grid: &crate::grid::Grid, x: usize, y: usize, z: usize, dx: i32, dy: i32, dz: i32) -> Option<(usize, usize, usize)> {
    let nx = x as i32 + dx;
    let ny = y as i32 + dy;
    let nz = z as i32 + dz;
    if nx < 0 || ny < 0 || nz < 0 || nx as usize >= grid.mx || ny as usize >= grid.my || nz as usize >= grid.mz {
        None
    } else {
        Some((nx as usize, ny as usize, nz as usize))
    }
}

/// Orthogonal neighbours always; edge-diagonals (exactly two nonzero
/// axes) when `edges`; vertex-diagonals (all three nonzero, 3D only) when
/// `vertices` (§4.8).
fn neighbor_offsets(edges: bool, vertices: bool) -> Vec<(i32, i32, i32)> {
    let mut offsets = vec![(1, 0, 0), (-1, 0, 0), (0, 1, 0), (0, -1, 0), (0, 0, 1), (0, 0, -1)];
    if edges || vertices {
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let nonzero = [dx, dy, dz].iter().filter(|&&v| v != 0).count();
                    if nonzero == 2 && edges {
                        offsets.push((dx, dy, dz));
                    }
                    if nonzero == 3 && vertices {
                        offsets.push((dx, dy, dz));
                    }
                }
            }
        }
    }
    offsets
}

/// Prefers the candidate matching the previous step's direction exactly;
/// failing that, under `inertia`, the candidate whose direction has the
/// highest cosine similarity to the previous one; otherwise the first.
fn pick_next(
    candidates: &[(usize, (i32, i32, i32))],
    prev_dir: Option<(i32, i32, i32)>,
    inertia: bool,
) -> Option<&(usize, (i32, i32, i32))> {
    if candidates.is_empty() {
        return None;
    }
    if inertia {
        if let Some(pd) = prev_dir {
            if let Some(exact) = candidates.iter().find(|(_, d)| *d == pd) {
                return Some(exact);
            }
            return candidates
                .iter()
                .max_by(|a, b| cosine(a.1, pd).partial_cmp(&cosine(b.1, pd)).unwrap_or(std::cmp::Ordering::Equal));
        }
    }
    candidates.first()
}

fn cosine(d: (i32, i32, i32), p: (i32, i32, i32)) -> f64 {
    let dot = (d.0 * p.0 + d.1 * p.1 + d.2 * p.2) as f64;
    let nd = ((d.0 * d.0 + d.1 * d.1 + d.2 * d.2) as f64).sqrt();
    let np = ((p.0 * p.0 + p.1 * p.1 + p.2 * p.2) as f64).sqrt();
    if nd == 0.0 || np == 0.0 {
        -1.0
    } else {
        dot / (nd * np)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changelog::ChangeLog;
    use crate::grid::Grid;
    use crate::rng::Prng;

    #[test]
    fn path_connects_start_to_finish_over_substrate() {
        // S . . . F  (values B=substrate, R=start, G=finish)
        let mut grid = Grid::new(5, 1, 1, vec!['B', 'R', 'G']).unwrap();
        grid.state = vec![1, 0, 0, 0, 2];
        let mut node = PathNode::new(Wave::one_hot(1), Wave::one_hot(2), Wave::one_hot(0), 1, false, false, false, false);

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
        assert!(grid.state[1..4].iter().all(|&c| c == 1));
        assert!(!node.go(&mut ctx));
    }
}
