//! A single input/output pattern pair and its precomputed shift tables.
//!
//! The packed `binput` byte and the `ishifts`/`oshifts` tables are the
//! same trick the teacher crate leans on throughout `src/cards`: keep a
//! cheap, coarse representation (`Hand(u64)`, here `binput: Vec<u8>`)
//! alongside the precise one so the hot path (the matcher) never has to
//! recompute it.

use crate::error::Error;
use crate::grid::{Wave, WILDCARD};
use crate::symmetry::{self, Transform};

/// An offset into a rule's input or output box, in `(dx, dy, dz)` form.
pub type Shift = (i32, i32, i32);

/// An input/output pattern pair, plus the tables the matcher needs to
/// stay incremental.
#[derive(Debug, Clone)]
pub struct Rule {
    pub imx: usize,
    pub imy: usize,
    pub imz: usize,
    /// Acceptable-color bitmask per input cell, row-major (`dx + dy*imx + dz*imx*imy`).
    pub input: Vec<Wave>,
    /// Coarse packed form of `input`: the single accepted color, or
    /// [`WILDCARD`] when more than one color (including the full `*`
    /// wildcard) is accepted.
    pub binput: Vec<u8>,

    pub omx: usize,
    pub omy: usize,
    pub omz: usize,
    /// Output color per output cell, or [`WILDCARD`] for "do not modify".
    pub output: Vec<u8>,

    /// `ishifts[c]` lists every input-box offset whose bitmask admits color `c`.
    pub ishifts: Vec<Vec<Shift>>,
    /// `oshifts[c]`, same idea over the output box. Only populated when
    /// the input and output boxes share dimensions (§3's invariant for
    /// `oshifts` existing at all).
    pub oshifts: Option<Vec<Vec<Shift>>>,

    pub p: f64,
    /// False for rules generated as part of another rule's symmetry orbit.
    pub original: bool,
}

impl Rule {
    /// Direct box constructor, used once patterns have already been
    /// turned into bitmasks/bytes (by [`crate::grid::Grid::wave`] and
    /// alphabet lookups upstream).
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        imx: usize,
        imy: usize,
        imz: usize,
        input: Vec<Wave>,
        omx: usize,
        omy: usize,
        omz: usize,
        output: Vec<u8>,
        p: f64,
        alphabet_size: usize,
    ) -> Result<Self, Error> {
        debug_assert_eq!(input.len(), imx * imy * imz);
        debug_assert_eq!(output.len(), omx * omy * omz);
        if imx == omx && imy == omy && imz == omz {
            for (i, &color) in output.iter().enumerate() {
                if color != WILDCARD && color as usize >= alphabet_size {
                    let mz = i / (omx * omy);
                    let rem = i % (omx * omy);
                    let my = rem / omx;
                    let mx = rem % omx;
                    return Err(Error::OutputColorNotInInputMask { mx, my, mz, color });
                }
            }
        }
        Ok(Self::build(imx, imy, imz, input, omx, omy, omz, output, p, true))
    }

    /// Glued-box constructor for `file`/`fin`+`fout` rules: a single box
    /// of concrete resolved colors, double-width, left half input, right
    /// half output (§4.2, §7's `OddGluedWidth`).
    pub fn from_glued(width: usize, height: usize, depth: usize, colors: Vec<u8>) -> Result<Self, Error> {
        if width % 2 != 0 {
            return Err(Error::OddGluedWidth(width));
        }
        debug_assert_eq!(colors.len(), width * height * depth);
        let half = width / 2;
        let mut input = vec![Wave::empty(); half * height * depth];
        let mut output = vec![0u8; half * height * depth];
        for z in 0..depth {
            for y in 0..height {
                for x in 0..half {
                    let left = colors[x + y * width + z * width * height];
                    let right = colors[(x + half) + y * width + z * width * height];
                    let dst = x + y * half + z * half * height;
                    input[dst] = Wave::one_hot(left);
                    output[dst] = right;
                }
            }
        }
        Ok(Self::build(half, height, depth, input, half, height, depth, output, 1.0, true))
    }

    fn build(
        imx: usize,
        imy: usize,
        imz: usize,
        input: Vec<Wave>,
        omx: usize,
        omy: usize,
        omz: usize,
        output: Vec<u8>,
        p: f64,
        original: bool,
    ) -> Self {
        let binput: Vec<u8> = input
            .iter()
            .map(|w| if w.popcount() == 1 { w.0.trailing_zeros() as u8 } else { WILDCARD })
            .collect();
        let ishifts = shift_table(&input, imx, imy, imz);
        let oshifts = if imx == omx && imy == omy && imz == omz {
            let output_waves: Vec<Wave> = output
                .iter()
                .map(|&b| if b == WILDCARD { Wave::empty() } else { Wave::one_hot(b) })
                .collect();
            Some(shift_table(&output_waves, omx, omy, omz))
        } else {
            None
        };
        Self {
            imx,
            imy,
            imz,
            input,
            binput,
            omx,
            omy,
            omz,
            output,
            ishifts,
            oshifts,
            p,
            original,
        }
    }

    /// Rotates the rule's pattern 90 degrees about the z axis.
    pub fn z_rotated(&self) -> Self {
        self.transformed(&Transform::rotate_z())
    }

    /// Rotates the rule's pattern 90 degrees about the y axis.
    pub fn y_rotated(&self) -> Self {
        self.transformed(&Transform::rotate_y())
    }

    /// Mirrors the rule's pattern across the x axis.
    pub fn reflected(&self) -> Self {
        self.transformed(&Transform::reflect_x())
    }

    /// Enumerates this rule's orbit under the named subgroup, deduplicated
    /// by pattern equality (§3, §8's closure invariant).
    pub fn symmetries(&self, group: &str, is_2d: bool) -> Result<Vec<Self>, Error> {
        let transforms = symmetry::subgroup(group, is_2d)?;
        let mut orbit: Vec<Self> = Vec::with_capacity(transforms.len());
        for t in &transforms {
            let mut candidate = self.transformed(t);
            candidate.original = *t == Transform::identity() && self.original;
            if !orbit.iter().any(|existing| existing.same_pattern(&candidate)) {
                orbit.push(candidate);
            }
        }
        Ok(orbit)
    }

    fn same_pattern(&self, other: &Self) -> bool {
        self.imx == other.imx
            && self.imy == other.imy
            && self.imz == other.imz
            && self.omx == other.omx
            && self.omy == other.omy
            && self.omz == other.omz
            && self.input == other.input
            && self.output == other.output
    }

    fn transformed(&self, t: &Transform) -> Self {
        let (nimx, nimy, nimz) = t.apply_dims((self.imx, self.imy, self.imz));
        let mut input = vec![Wave::empty(); nimx * nimy * nimz];
        for z in 0..self.imz {
            for y in 0..self.imy {
                for x in 0..self.imx {
                    let (nx, ny, nz) = t.apply((x, y, z), (self.imx, self.imy, self.imz));
                    let src = x + y * self.imx + z * self.imx * self.imy;
                    let dst = nx + ny * nimx + nz * nimx * nimy;
                    input[dst] = self.input[src];
                }
            }
        }
        let (nomx, nomy, nomz) = t.apply_dims((self.omx, self.omy, self.omz));
        let mut output = vec![WILDCARD; nomx * nomy * nomz];
        for z in 0..self.omz {
            for y in 0..self.omy {
                for x in 0..self.omx {
                    let (nx, ny, nz) = t.apply((x, y, z), (self.omx, self.omy, self.omz));
                    let src = x + y * self.omx + z * self.omx * self.omy;
                    let dst = nx + ny * nomx + nz * nomx * nomy;
                    output[dst] = self.output[src];
                }
            }
        }
        Self::build(nimx, nimy, nimz, input, nomx, nomy, nomz, output, self.p, self.original)
    }
}

/// Builds `shifts[c]` = every cell offset in a `dims`-shaped box whose
/// bitmask admits color `c`, for every color that appears in `waves`.
fn shift_table(waves: &[Wave], mx: usize, my: usize, mz: usize) -> Vec<Vec<Shift>> {
    let max_color = waves
        .iter()
        .map(|w| if w.0 == 0 { 0 } else { 63 - w.0.leading_zeros() })
        .max()
        .unwrap_or(0);
    let mut table = vec![Vec::new(); (max_color + 1) as usize];
    for z in 0..mz {
        for y in 0..my {
            for x in 0..mx {
                let i = x + y * mx + z * mx * my;
                for (c, shifts) in table.iter_mut().enumerate() {
                    if waves[i].contains(c as u8) {
                        shifts.push((x as i32, y as i32, z as i32));
                    }
                }
            }
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flip_rule() -> Rule {
        // B=W over a single cell, on a 2-color alphabet.
        Rule::new(1, 1, 1, vec![Wave::one_hot(0)], 1, 1, 1, vec![1], 1.0, 2).unwrap()
    }

    #[test]
    fn binput_packs_single_color_cells() {
        let r = flip_rule();
        assert_eq!(r.binput, vec![0]);
    }

    #[test]
    fn binput_packs_union_cells_as_wildcard() {
        let r = Rule::new(1, 1, 1, vec![Wave::one_hot(0).union(Wave::one_hot(1))], 1, 1, 1, vec![1], 1.0, 2).unwrap();
        assert_eq!(r.binput, vec![WILDCARD]);
    }

    #[test]
    fn oshifts_present_only_when_boxes_match() {
        let same = flip_rule();
        assert!(same.oshifts.is_some());

        let mismatched = Rule::new(1, 1, 1, vec![Wave::one_hot(0)], 2, 1, 1, vec![1, 1], 1.0, 2).unwrap();
        assert!(mismatched.oshifts.is_none());
    }

    #[test]
    fn output_color_out_of_alphabet_errors() {
        let err = Rule::new(1, 1, 1, vec![Wave::one_hot(0)], 1, 1, 1, vec![5], 1.0, 2);
        assert!(err.is_err());
    }

    #[test]
    fn reflected_twice_is_identity() {
        let r = Rule::new(
            2,
            1,
            1,
            vec![Wave::one_hot(0), Wave::one_hot(1)],
            2,
            1,
            1,
            vec![1, 0],
            1.0,
            2,
        )
        .unwrap();
        let twice = r.reflected().reflected();
        assert!(r.same_pattern(&twice));
    }

    #[test]
    fn z_rotated_four_times_is_identity_in_2d() {
        let r = Rule::new(
            2,
            1,
            1,
            vec![Wave::one_hot(0), Wave::one_hot(1)],
            2,
            1,
            1,
            vec![1, 0],
            1.0,
            2,
        )
        .unwrap();
        let four = r.z_rotated().z_rotated().z_rotated().z_rotated();
        assert!(r.same_pattern(&four));
    }

    #[test]
    fn symmetries_orbit_has_no_duplicate_patterns() {
        let r = flip_rule();
        let orbit = r.symmetries("(xy)", true).unwrap();
        for (i, a) in orbit.iter().enumerate() {
            for b in orbit.iter().skip(i + 1) {
                assert!(!a.same_pattern(b));
            }
        }
    }

    #[test]
    fn odd_glued_width_errors() {
        let err = Rule::from_glued(3, 1, 1, vec![0, 1, 0]);
        assert!(matches!(err, Err(Error::OddGluedWidth(3))));
    }

    #[test]
    fn glued_box_splits_into_input_and_output() {
        let r = Rule::from_glued(2, 1, 1, vec![0, 1]).unwrap();
        assert_eq!(r.imx, 1);
        assert_eq!(r.omx, 1);
        assert!(r.input[0].contains(0));
        assert_eq!(r.output[0], 1);
    }
}
