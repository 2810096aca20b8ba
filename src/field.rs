//! Distance fields (§3 "Field", §4.5): per-declared-color BFS potentials
//! used by [`crate::node::one::OneNode`] and [`crate::node::all::AllNode`]
//! to bias candidate selection toward a configured goal color.
//!
//! Grounded on the same "precompute a cheap table once, consult it on the
//! hot path" shape as [`crate::rule::Rule`]'s `ishifts`/`oshifts`, applied
//! here to a multi-source BFS distance array instead of a shift list.

use std::collections::VecDeque;

use crate::grid::{Grid, Wave};
use crate::rule::Rule;

/// One declared field: "grow a distance-to-`zero` map through `substrate`
/// cells, registered under color `for_color`".
#[derive(Debug, Clone)]
pub struct Field {
    pub for_color: u8,
    pub zero: Wave,
    pub substrate: Wave,
    /// Redo the BFS every step rather than only on first activation.
    pub recompute: bool,
    /// Absence of any `zero` cell aborts the owning node (§7 RuntimeAbort).
    pub essential: bool,
    /// Flip the sign of this field's contribution to `deltaPointwise`.
    pub inversed: bool,
    /// Flat per-cell distance, `-1` when unreachable. Empty until the
    /// first [`Field::recompute_into`] call.
    pub potential: Vec<i32>,
}

impl Field {
    pub fn new(for_color: u8, zero: Wave, substrate: Wave, recompute: bool, essential: bool, inversed: bool) -> Self {
        Self {
            for_color,
            zero,
            substrate,
            recompute,
            essential,
            inversed,
            potential: Vec::new(),
        }
    }

    /// Multi-source BFS (§4.5): every cell whose color is in `zero` seeds
    /// the frontier at distance 0; relaxation only steps through cells
    /// whose color is in `substrate`. Returns `false` iff this field is
    /// `essential` and no zero cell exists (§7 RuntimeAbort condition).
    pub fn recompute_into(&mut self, grid: &Grid) -> bool {
        let n = grid.len();
        self.potential.clear();
        self.potential.resize(n, -1);
        let mut queue: VecDeque<usize> = VecDeque::new();
        let mut any_zero = false;
        for i in 0..n {
            if self.zero.contains(grid.state[i]) {
                self.potential[i] = 0;
                queue.push_back(i);
                any_zero = true;
            }
        }
        if self.essential && !any_zero {
            return false;
        }
        while let Some(i) = queue.pop_front() {
            let d = self.potential[i];
            let (x, y, z) = (i % grid.mx, (i / grid.mx) % grid.my, i / (grid.mx * grid.my));
            for (nx, ny, nz) in neighbors6(x, y, z, grid.mx, grid.my, grid.mz) {
                let ni = grid.index(nx, ny, nz);
                if self.potential[ni] == -1 && self.substrate.contains(grid.state[ni]) {
                    self.potential[ni] = d + 1;
                    queue.push_back(ni);
                }
            }
        }
        true
    }
}

/// Orthogonal (6-connected, or 4 in the `mz==1` 2D case) neighbours of a
/// cell, bounds-checked.
fn neighbors6(x: usize, y: usize, z: usize, mx: usize, my: usize, mz: usize) -> Vec<(usize, usize, usize)> {
    let mut out = Vec::with_capacity(6);
    if x + 1 < mx {
        out.push((x + 1, y, z));
    }
    if x > 0 {
        out.push((x - 1, y, z));
    }
    if y + 1 < my {
        out.push((x, y + 1, z));
    }
    if y > 0 {
        out.push((x, y - 1, z));
    }
    if mz > 1 {
        if z + 1 < mz {
            out.push((x, y, z + 1));
        }
        if z > 0 {
            out.push((x, y, z - 1));
        }
    }
    out
}

/// The fields declared on a single [`crate::node::matcher::Matcher`]-owning
/// node, keyed by the color they were registered for — the key `deltaPointwise`
/// looks an output color up by.
#[derive(Debug, Clone, Default)]
pub struct FieldSet {
    pub fields: Vec<Field>,
}

impl FieldSet {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn get(&self, color: u8) -> Option<&Field> {
        self.fields.iter().find(|f| f.for_color == color)
    }

    /// Refreshes every field flagged `recompute` (plus, via `force`, every
    /// field on first activation). Returns `false` the moment an essential
    /// field fails, short-circuiting the remaining recomputes exactly as
    /// the node would abort on the first missing zero set.
    pub fn recompute_all(&mut self, grid: &Grid, force: bool) -> bool {
        for field in &mut self.fields {
            if force || field.recompute {
                if !field.recompute_into(grid) {
                    return false;
                }
            }
        }
        true
    }

    /// §4.5: the hypothetical score change of applying `rule` at
    /// `(x, y, z)`. `None` means "do not apply" (a newly written color has
    /// no registered, reachable potential). Otherwise sums `newPot -
    /// oldPot` per changed cell, sign-flipped for inverted fields.
    pub fn delta_pointwise(&self, grid: &Grid, rule: &Rule, x: usize, y: usize, z: usize) -> Option<f64> {
        if self.fields.is_empty() {
            return Some(0.0);
        }
        let mut score = 0.0;
        for dz in 0..rule.imz {
            for dy in 0..rule.imy {
                for dx in 0..rule.imx {
                    let ri = dx + dy * rule.imx + dz * rule.imx * rule.imy;
                    let new_color = rule.output[ri];
                    if new_color == crate::grid::WILDCARD {
                        continue;
                    }
                    let gi = grid.index(x + dx, y + dy, z + dz);
                    let old_color = grid.state[gi];
                    if old_color == new_color {
                        continue;
                    }
                    let field = self.get(new_color)?;
                    let new_pot = field.potential.get(gi).copied().unwrap_or(-1);
                    if new_pot < 0 {
                        return None;
                    }
                    let old_pot = self
                        .get(old_color)
                        .and_then(|f| f.potential.get(gi).copied())
                        .unwrap_or(0);
                    let delta = (new_pot - old_pot) as f64;
                    score += if field.inversed { -delta } else { delta };
                }
            }
        }
        Some(score)
    }

    /// `true` iff every `essential` field currently has at least one zero
    /// cell recorded (used after a forced recompute to decide node failure).
    pub fn essential_ok(&self) -> bool {
        self.fields.iter().filter(|f| f.essential).all(|f| f.potential.iter().any(|&p| p == 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;

    fn strip_grid() -> Grid {
        // B W B W B ; zero = W, substrate = B
        let mut g = Grid::new(5, 1, 1, vec!['B', 'W']).unwrap();
        g.state = vec![0, 1, 0, 1, 0];
        g
    }

    #[test]
    fn bfs_distance_grows_from_zero_cells() {
        let g = strip_grid();
        let mut field = Field::new(0, Wave::one_hot(1), Wave::one_hot(0), false, false, false);
        assert!(field.recompute_into(&g));
        assert_eq!(field.potential, vec![1, 0, 1, 0, 1]);
    }

    #[test]
    fn unreachable_cells_are_negative_one() {
        // B B B W B: substrate excludes the rightmost B from the zero W at index 3.
        let mut g = Grid::new(5, 1, 1, vec!['B', 'W']).unwrap();
        g.state = vec![0, 0, 0, 1, 0];
        let mut field = Field::new(0, Wave::one_hot(1), Wave::empty(), false, false, false);
        assert!(field.recompute_into(&g));
        assert_eq!(field.potential[3], 0);
        assert_eq!(field.potential[0], -1);
        assert_eq!(field.potential[4], -1);
    }

    #[test]
    fn essential_field_with_no_zeros_fails() {
        let mut g = Grid::new(3, 1, 1, vec!['B', 'W']).unwrap();
        g.state = vec![0, 0, 0];
        let mut field = Field::new(0, Wave::one_hot(1), Wave::one_hot(0), false, true, false);
        assert!(!field.recompute_into(&g));
    }
}
