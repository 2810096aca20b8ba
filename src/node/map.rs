//! §4.4 `MapNode`: the one branch variant that replaces the grid itself.
//! On first activation it builds a rescaled grid from every rule match in
//! the source grid (with periodic wrap-around), installs it via
//! `ctx.pending_grid`, and thereafter behaves like a
//! [`crate::node::sequence_markov::SequenceNode`] over its children.

use crate::grid::{Grid, WILDCARD};
use crate::node::{self, Arena, Context, NodeId};
use crate::rule::Rule;

/// Rational per-axis scale factor `n/d`, as declared on the `<map>` element.
#[derive(Debug, Clone, Copy)]
pub struct Scale {
    pub nx: usize,
    pub dx: usize,
    pub ny: usize,
    pub dy: usize,
    pub nz: usize,
    pub dz: usize,
}

pub struct MapNode {
    rules: Vec<Rule>,
    scale: Scale,
    characters: Vec<char>,
    pub children: Vec<NodeId>,
    mapped: bool,
    cursor: usize,
}

impl MapNode {
    pub fn new(rules: Vec<Rule>, scale: Scale, characters: Vec<char>, children: Vec<NodeId>) -> Self {
        Self {
            rules,
            scale,
            characters,
            children,
            mapped: false,
            cursor: 0,
        }
    }

    pub fn reset(&mut self) {
        self.mapped = false;
        self.cursor = 0;
    }

    pub fn go(&mut self, arena: &mut Arena, children: &[NodeId], ctx: &mut Context) -> bool {
        if !self.mapped {
            self.mapped = true;
            self.apply_mapping(ctx);
            return true;
        }
        while self.cursor < children.len() {
            if node::go(arena, children[self.cursor], ctx) {
                return true;
            }
            node::reset(arena, children[self.cursor]);
            self.cursor += 1;
        }
        false
    }

    fn apply_mapping(&self, ctx: &mut Context) {
        let src = &*ctx.grid;
        let new_mx = src.mx * self.scale.nx / self.scale.dx;
        let new_my = src.my * self.scale.ny / self.scale.dy;
        let new_mz = src.mz * self.scale.nz / self.scale.dz;
        let mut newgrid = Grid::new(new_mx.max(1), new_my.max(1), new_mz.max(1), self.characters.clone())
            .expect("map target alphabet within limits");
        newgrid.clear();

        for rule in &self.rules {
            for z in 0..src.mz {
                for y in 0..src.my {
                    for x in 0..src.mx {
                        if matches_periodic(src, rule, x, y, z) {
                            let ox = x * self.scale.nx / self.scale.dx;
                            let oy = y * self.scale.ny / self.scale.dy;
                            let oz = z * self.scale.nz / self.scale.dz;
                            write_periodic(&mut newgrid, rule, ox, oy, oz);
                        }
                    }
                }
            }
        }
        *ctx.pending_grid = Some(newgrid);
    }
}

/// Like [`Grid::matches`] but wraps input-box offsets around the source
/// grid's dimensions instead of requiring them to fit in bounds.
fn matches_periodic(grid: &Grid, rule: &Rule, x: usize, y: usize, z: usize) -> bool {
    for dz in 0..rule.imz {
        for dy in 0..rule.imy {
            for dx in 0..rule.imx {
                let gx = (x + dx) % grid.mx;
                let gy = (y + dy) % grid.my;
                let gz = (z + dz) % grid.mz.max(1);
                let gi = grid.index(gx, gy, gz);
                let ri = dx + dy * rule.imx + dz * rule.imx * rule.imy;
                if !rule.input[ri].contains(grid.state[gi]) {
                    return false;
                }
            }
        }
    }
    true
}

/// Writes `rule`'s output box into `grid` with the origin wrapped
/// periodically on every axis.
fn write_periodic(grid: &mut Grid, rule: &Rule, x: usize, y: usize, z: usize) {
    for dz in 0..rule.omz {
        for dy in 0..rule.omy {
            for dx in 0..rule.omx {
                let ri = dx + dy * rule.omx + dz * rule.omx * rule.omy;
                let color = rule.output[ri];
                if color == WILDCARD {
                    continue;
                }
                let gx = (x + dx) % grid.mx;
                let gy = (y + dy) % grid.my;
                let gz = (z + dz) % grid.mz.max(1);
                let gi = grid.index(gx, gy, gz);
                grid.state[gi] = color;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changelog::ChangeLog;
    use crate::grid::Wave;
    use crate::rng::Prng;

    #[test]
    fn map_doubles_grid_dimensions_and_writes_scaled_output() {
        let mut grid = Grid::new(2, 1, 1, vec!['B', 'W']).unwrap();
        grid.state = vec![0, 1];
        let rule = Rule::new(1, 1, 1, vec![Wave::one_hot(0)], 2, 1, 1, vec![1, 1], 1.0, 2).unwrap();
        let scale = Scale { nx: 2, dx: 1, ny: 1, dy: 1, nz: 1, dz: 1 };
        let node = MapNode::new(vec![rule], scale, vec!['B', 'W'], Vec::new());

        let mut rng = Prng::from_seed(1);
        let mut log = ChangeLog::new();
        let mut pending_grid = None;
        let mut current = crate::node::NodeId::new(0);
        {
            let mut ctx = Context {
                grid: &mut grid,
                rng: &mut rng,
                log: &mut log,
                counter: 0,
                pending_grid: &mut pending_grid,
                resources: None,
                current: &mut current,
            };
            node.apply_mapping(&mut ctx);
        }
        let newgrid = pending_grid.unwrap();
        assert_eq!(newgrid.mx, 4);
        assert_eq!(&newgrid.state[0..2], &[1, 1]);
    }
}
