//! Enumeration of the square (order 8) and cube (order 48) symmetry
//! groups, and named subgroups thereof.
//!
//! Grounded on the teacher crate's `Permutation` (`src/cards/permutation.rs`):
//! there, a `[Suit; 4]` axis relabeling stands for one of the 24 elements
//! of the suit-permutation group, `identity()` seeds it, and `exhaust()`
//! generates the full group by brute-force enumeration of permutations.
//! Here the same idea — "a small struct names one group element; a
//! generator-closure routine enumerates the group it spans" — is adapted
//! to *signed* axis permutations (reflections flip a sign, rotations swap
//! axes), since board symmetries move cells by reflecting and rotating
//! coordinate axes rather than by relabeling an unordered label set.

use std::collections::HashSet;

/// One element of the signed-axis-permutation group: output axis `i`
/// reads source axis `axis[i]` with sign `sign[i]`. Composition is
/// abstract (axis/sign only); concrete coordinates are only touched in
/// [`Transform::apply`], against the *original* box's dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Transform {
    axis: [u8; 3],
    sign: [i8; 3],
}

impl Transform {
    pub const fn identity() -> Self {
        Self {
            axis: [0, 1, 2],
            sign: [1, 1, 1],
        }
    }

    pub const fn reflect_x() -> Self {
        Self {
            axis: [0, 1, 2],
            sign: [-1, 1, 1],
        }
    }

    pub const fn reflect_y() -> Self {
        Self {
            axis: [0, 1, 2],
            sign: [1, -1, 1],
        }
    }

    pub const fn reflect_z() -> Self {
        Self {
            axis: [0, 1, 2],
            sign: [1, 1, -1],
        }
    }

    /// 90-degree rotation about the z axis: x' = y, y' = -x.
    pub const fn rotate_z() -> Self {
        Self {
            axis: [1, 0, 2],
            sign: [1, -1, 1],
        }
    }

    /// 90-degree rotation about the y axis: x' = z, z' = -x.
    pub const fn rotate_y() -> Self {
        Self {
            axis: [2, 1, 0],
            sign: [1, 1, -1],
        }
    }

    /// `self` applied after `inner`: `result(p) = self(inner(p))`.
    pub fn compose(&self, inner: &Self) -> Self {
        let mut axis = [0u8; 3];
        let mut sign = [1i8; 3];
        for i in 0..3 {
            let j = self.axis[i] as usize;
            axis[i] = inner.axis[j];
            sign[i] = inner.sign[j] * self.sign[i];
        }
        Self { axis, sign }
    }

    /// The determinant of the underlying signed permutation matrix: +1 for
    /// proper rotations, -1 for orientation-reversing (reflective) ones.
    pub fn det(&self) -> i32 {
        // sign of the permutation times the product of axis signs
        let parity = if self.axis == [0, 1, 2] || self.axis == [1, 2, 0] || self.axis == [2, 0, 1] {
            1
        } else {
            -1
        };
        parity * self.sign[0] as i32 * self.sign[1] as i32 * self.sign[2] as i32
    }

    /// Dimensions of the box after applying this transform to a box of
    /// dimensions `(imx, imy, imz)`.
    pub fn apply_dims(&self, dims: (usize, usize, usize)) -> (usize, usize, usize) {
        let d = [dims.0, dims.1, dims.2];
        (d[self.axis[0] as usize], d[self.axis[1] as usize], d[self.axis[2] as usize])
    }

    /// Maps a coordinate within the original box (of `src_dims`) to its
    /// coordinate in the transformed box.
    pub fn apply(&self, p: (usize, usize, usize), src_dims: (usize, usize, usize)) -> (usize, usize, usize) {
        let sd = [src_dims.0 as i64, src_dims.1 as i64, src_dims.2 as i64];
        let pp = [p.0 as i64, p.1 as i64, p.2 as i64];
        let mut out = [0i64; 3];
        for i in 0..3 {
            let a = self.axis[i] as usize;
            out[i] = if self.sign[i] > 0 { pp[a] } else { sd[a] - 1 - pp[a] };
        }
        (out[0] as usize, out[1] as usize, out[2] as usize)
    }
}

/// Named subgroup selector from §6's grammar: `{(), (x), (y), (x)(y),
/// (xy+), (xy)}` for 2D grids (`depth == 1`) and `{(), (x), (z), (xy),
/// (xyz+), (xyz)}` for 3D grids.
///
/// The exact generator-to-name mapping is an implementation decision not
/// pinned down by the retrieved spec (no C# original was available to
/// check against); see `DESIGN.md` for the convention fixed here: each
/// name lists its *generating* reflections/rotations, `+` suffix means
/// "rotations only" (no reflections), and the bare group with the most
/// letters is the full dihedral/octahedral group.
pub fn subgroup(name: &str, is_2d: bool) -> Result<Vec<Transform>, crate::error::Error> {
    use Transform as T;
    let generators: Vec<T> = if is_2d {
        match name {
            "()" => vec![],
            "(x)" => vec![T::reflect_x()],
            "(y)" => vec![T::reflect_y()],
            "(x)(y)" => vec![T::reflect_x(), T::reflect_y()],
            "(xy+)" => vec![T::rotate_z()],
            "(xy)" => vec![T::rotate_z(), T::reflect_x()],
            other => return Err(crate::error::Error::UnknownSymmetry(other.to_string())),
        }
    } else {
        match name {
            "()" => vec![],
            "(x)" => vec![T::reflect_x()],
            "(z)" => vec![T::reflect_z()],
            "(xy)" => vec![T::reflect_x(), T::reflect_y()],
            "(xyz+)" => vec![T::rotate_z(), T::rotate_y()],
            "(xyz)" => vec![T::rotate_z(), T::rotate_y(), T::reflect_x()],
            other => return Err(crate::error::Error::UnknownSymmetry(other.to_string())),
        }
    };
    Ok(close(&generators))
}

/// Closure of `identity` under repeated composition with `generators`
/// (breadth-first, deduplicated). This is the "weighted enumeration of
/// symmetry orbits" helper called out in §9's design notes.
fn close(generators: &[Transform]) -> Vec<Transform> {
    let mut seen: HashSet<Transform> = HashSet::new();
    let mut frontier = vec![Transform::identity()];
    seen.insert(Transform::identity());
    while let Some(next_frontier) = {
        let mut grown = Vec::new();
        for t in &frontier {
            for g in generators {
                let composed = g.compose(t);
                if seen.insert(composed) {
                    grown.push(composed);
                }
            }
        }
        if grown.is_empty() { None } else { Some(grown) }
    } {
        frontier = next_frontier;
    }
    seen.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_full_group_has_eight_elements() {
        let g = subgroup("(xy)", true).unwrap();
        assert_eq!(g.len(), 8);
    }

    #[test]
    fn square_rotation_only_group_has_four_elements() {
        let g = subgroup("(xy+)", true).unwrap();
        assert_eq!(g.len(), 4);
        assert!(g.iter().all(|t| t.det() == 1));
    }

    #[test]
    fn cube_full_group_has_forty_eight_elements() {
        let g = subgroup("(xyz)", false).unwrap();
        assert_eq!(g.len(), 48);
    }

    #[test]
    fn cube_proper_rotation_group_has_twenty_four_elements() {
        let g = subgroup("(xyz+)", false).unwrap();
        assert_eq!(g.len(), 24);
        assert!(g.iter().all(|t| t.det() == 1));
    }

    #[test]
    fn trivial_group_is_identity_only() {
        let g = subgroup("()", true).unwrap();
        assert_eq!(g, vec![Transform::identity()]);
    }

    #[test]
    fn unknown_group_name_errors() {
        assert!(subgroup("(bogus)", true).is_err());
    }

    #[test]
    fn rotate_z_four_times_is_identity() {
        let r = Transform::rotate_z();
        let r2 = r.compose(&r);
        let r3 = r2.compose(&r);
        let r4 = r3.compose(&r);
        assert_eq!(r4, Transform::identity());
    }

    #[test]
    fn reflect_x_twice_is_identity() {
        let r = Transform::reflect_x();
        assert_eq!(r.compose(&r), Transform::identity());
    }

    #[test]
    fn apply_rotate_z_on_2x3_box_transposes_dims() {
        let dims = (2usize, 3usize, 1usize);
        let t = Transform::rotate_z();
        assert_eq!(t.apply_dims(dims), (3, 2, 1));
    }
}
