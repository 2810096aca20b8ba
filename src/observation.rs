//! Future states, observations, and the rule-application BFS that scores
//! how many rewrite steps separate a grid from a goal (§3 Observation/
//! Future/Potentials, §4.6).
//!
//! Distinct from [`crate::field::Field`]: a `Field` is a plain
//! distance-over-the-grid BFS through neighbouring cells. The potentials
//! computed here are a BFS over *rule applications* — each edge is "this
//! rule, placed here, turns an input configuration into an output
//! configuration" — so the unit of distance is rewrite steps, not cells.

use std::collections::VecDeque;

use crate::grid::{Grid, Wave, WILDCARD};
use crate::rule::Rule;

/// Pairs a present color with the rewrite it should undergo before
/// inference begins (`from`) and the bitmask of colors that satisfy the
/// goal at that cell (`to`).
#[derive(Debug, Clone, Copy)]
pub struct Observation {
    pub from: u8,
    pub to: Wave,
}

/// §4.6 `computeFutureSetPresent`: for every cell whose current color has
/// a declared observation, pins `future[i]` to the observation's goal mask
/// and rewrites `state[i]` to the observation's `from` color; every other
/// cell gets a one-hot future equal to its own present color (so the goal
/// is already "satisfied" there, trivially). Returns `false` iff some
/// observation's color is never present in the grid.
pub fn compute_future_set_present(grid: &mut Grid, observations: &[(u8, Observation)]) -> Option<Vec<Wave>> {
    let n = grid.len();
    let mut future = vec![Wave::empty(); n];
    let mut seen = vec![false; observations.len()];
    for i in 0..n {
        let color = grid.state[i];
        if let Some((idx, (_, obs))) = observations.iter().enumerate().find(|(_, (c, _))| *c == color) {
            future[i] = obs.to;
            grid.state[i] = obs.from;
            seen[idx] = true;
        } else {
            future[i] = Wave::one_hot(color);
        }
    }
    if seen.iter().all(|&s| s) {
        Some(future)
    } else {
        None
    }
}

/// Direction of a potential BFS (§4.6): forward walks input -> output,
/// backward walks output -> input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Runs the shared rule-application BFS described in §4.6. `seeds` gives
/// every `(color, cell)` pair with potential zero at the start (present
/// colors for forward, future-acceptable colors for backward). Returns a
/// dense `potentials[color][cell]` table, `-1` where unreached.
pub fn compute_potentials(grid: &Grid, rules: &[Rule], seeds: &[(u8, usize)], direction: Direction) -> Vec<Vec<i32>> {
    let c = grid.alphabet_size();
    let n = grid.len();
    let mut potentials: Vec<Vec<i32>> = vec![vec![-1; n]; c];
    let mut queue: VecDeque<(u8, usize, i32)> = VecDeque::new();
    for &(color, i) in seeds {
        if potentials[color as usize][i] == -1 {
            potentials[color as usize][i] = 0;
            queue.push_back((color, i, 0));
        }
    }

    while let Some((color, i, t)) = queue.pop_front() {
        let (x, y, z) = (i % grid.mx, (i / grid.mx) % grid.my, i / (grid.mx * grid.my));
        for rule in rules {
            let shifts = match direction {
                Direction::Forward => rule.ishifts.get(color as usize),
                Direction::Backward => rule.oshifts.as_ref().and_then(|t| t.get(color as usize)),
            };
            let Some(shifts) = shifts else { continue };
            for &(dx, dy, dz) in shifts {
                let (Some(ox), Some(oy), Some(oz)) = (
                    (x as i32 - dx).try_into().ok(),
                    (y as i32 - dy).try_into().ok(),
                    (z as i32 - dz).try_into().ok(),
                ) else {
                    continue;
                };
                let (ox, oy, oz): (usize, usize, usize) = (ox, oy, oz);
                if !grid.in_bounds(ox, oy, oz, rule.imx, rule.imy, rule.imz) {
                    continue;
                }
                if !match_side_known(grid, rule, ox, oy, oz, &potentials, direction) {
                    continue;
                }
                apply_side(grid, rule, ox, oy, oz, &mut potentials, &mut queue, direction, t);
            }
        }
    }
    potentials
}

/// Forward: every non-wildcard `binput` cell must already have a known
/// (hence `<= t`, by FIFO BFS order) potential for its required color.
/// Backward: every non-wildcard `output` cell must already have a known
/// potential for its written color.
fn match_side_known(
    grid: &Grid,
    rule: &Rule,
    ox: usize,
    oy: usize,
    oz: usize,
    potentials: &[Vec<i32>],
    direction: Direction,
) -> bool {
    match direction {
        Direction::Forward => {
            for dz in 0..rule.imz {
                for dy in 0..rule.imy {
                    for dx in 0..rule.imx {
                        let ri = dx + dy * rule.imx + dz * rule.imx * rule.imy;
                        let color = rule.binput[ri];
                        if color == WILDCARD {
                            continue;
                        }
                        let gi = grid.index(ox + dx, oy + dy, oz + dz);
                        if potentials[color as usize][gi] == -1 {
                            return false;
                        }
                    }
                }
            }
            true
        }
        Direction::Backward => {
            for dz in 0..rule.omz {
                for dy in 0..rule.omy {
                    for dx in 0..rule.omx {
                        let ri = dx + dy * rule.omx + dz * rule.omx * rule.omy;
                        let color = rule.output[ri];
                        if color == WILDCARD {
                            continue;
                        }
                        let gi = grid.index(ox + dx, oy + dy, oz + dz);
                        if potentials[color as usize][gi] == -1 {
                            return false;
                        }
                    }
                }
            }
            true
        }
    }
}

/// Propagates `t+1` onto every still-unknown potential of the "apply
/// side": forward writes the rule's output colors, backward writes every
/// color accepted by the rule's input bitmasks.
fn apply_side(
    grid: &Grid,
    rule: &Rule,
    ox: usize,
    oy: usize,
    oz: usize,
    potentials: &mut [Vec<i32>],
    queue: &mut VecDeque<(u8, usize, i32)>,
    direction: Direction,
    t: i32,
) {
    match direction {
        Direction::Forward => {
            for dz in 0..rule.omz {
                for dy in 0..rule.omy {
                    for dx in 0..rule.omx {
                        let ri = dx + dy * rule.omx + dz * rule.omx * rule.omy;
                        let color = rule.output[ri];
                        if color == WILDCARD {
                            continue;
                        }
                        let gi = grid.index(ox + dx, oy + dy, oz + dz);
                        if potentials[color as usize][gi] == -1 {
                            potentials[color as usize][gi] = t + 1;
                            queue.push_back((color, gi, t + 1));
                        }
                    }
                }
            }
        }
        Direction::Backward => {
            for dz in 0..rule.imz {
                for dy in 0..rule.imy {
                    for dx in 0..rule.imx {
                        let ri = dx + dy * rule.imx + dz * rule.imx * rule.imy;
                        let mask = rule.input[ri];
                        let gi = grid.index(ox + dx, oy + dy, oz + dz);
                        for color in 0..grid.alphabet_size() as u8 {
                            if mask.contains(color) && potentials[color as usize][gi] == -1 {
                                potentials[color as usize][gi] = t + 1;
                                queue.push_back((color, gi, t + 1));
                            }
                        }
                    }
                }
            }
        }
    }
}

/// §4.6 `forwardPointwise`: for each cell, the minimum potential among
/// colors admissible in `future[i]`; `-1` (as a whole) if any cell has no
/// reachable admissible color.
pub fn forward_pointwise(potentials: &[Vec<i32>], future: &[Wave]) -> Option<i64> {
    let mut total: i64 = 0;
    for (i, &mask) in future.iter().enumerate() {
        let mut best: Option<i32> = None;
        for (c, table) in potentials.iter().enumerate() {
            if mask.contains(c as u8) {
                let p = table[i];
                if p >= 0 {
                    best = Some(best.map_or(p, |b| b.min(p)));
                }
            }
        }
        total += best? as i64;
    }
    Some(total)
}

/// §4.6 `backwardPointwise`: sums `potentials[present[i]][i]`, `None` if
/// any cell's present color is unreachable.
pub fn backward_pointwise(potentials: &[Vec<i32>], present: &[u8]) -> Option<i64> {
    let mut total: i64 = 0;
    for (i, &color) in present.iter().enumerate() {
        let p = potentials[color as usize][i];
        if p < 0 {
            return None;
        }
        total += p as i64;
    }
    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;

    #[test]
    fn future_pins_observed_cells_and_rewrites_present() {
        let mut g = Grid::new(3, 1, 1, vec!['B', 'W', 'R']).unwrap();
        g.state = vec![2, 0, 0]; // R B B
        let obs = [(2u8, Observation { from: 0, to: Wave::one_hot(1).union(Wave::one_hot(2)) })];
        let future = compute_future_set_present(&mut g, &obs).unwrap();
        assert_eq!(g.state[0], 0); // rewritten R -> B (from)
        assert!(future[0].contains(1) && future[0].contains(2));
        assert_eq!(future[1], Wave::one_hot(0));
    }

    #[test]
    fn future_fails_when_observed_color_absent() {
        let mut g = Grid::new(2, 1, 1, vec!['B', 'W']).unwrap();
        g.state = vec![0, 0];
        let obs = [(1u8, Observation { from: 0, to: Wave::one_hot(0) })];
        assert!(compute_future_set_present(&mut g, &obs).is_none());
    }

    #[test]
    fn forward_potentials_zero_at_seed_and_grow_along_a_rule_chain() {
        // B=W over a single cell: from color 0 (B), one step reaches W.
        let g = Grid::new(1, 1, 1, vec!['B', 'W']).unwrap();
        let rule = Rule::new(1, 1, 1, vec![Wave::one_hot(0)], 1, 1, 1, vec![1], 1.0, 2).unwrap();
        let seeds = [(0u8, 0usize)];
        let potentials = compute_potentials(&g, &[rule], &seeds, Direction::Forward);
        assert_eq!(potentials[0][0], 0);
        assert_eq!(potentials[1][0], 1);
    }

    #[test]
    fn backward_pointwise_sums_present_color_potentials() {
        let potentials = vec![vec![3], vec![0]];
        assert_eq!(backward_pointwise(&potentials, &[1]), Some(0));
        assert_eq!(backward_pointwise(&potentials, &[0]), Some(3));
    }

    #[test]
    fn forward_pointwise_is_none_when_unreachable() {
        let potentials = vec![vec![-1], vec![-1]];
        let future = [Wave::one_hot(0)];
        assert_eq!(forward_pointwise(&potentials, &future), None);
    }
}
