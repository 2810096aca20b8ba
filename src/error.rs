//! Structured error kinds for model loading.
//!
//! Runtime failures (an essential field finding no zero cells, an
//! observation naming an absent color, a search exhausting its limit) are
//! *not* represented here: per the error-handling design, those are local
//! to a node and surface only as that node's `go()` returning `false` plus
//! a logged line. Only load-time failures propagate as `Result`.

/// Everything that can go wrong while compiling a [`crate::model::NodeSpec`]
/// into a runnable interpreter, or while constructing a [`crate::grid::Grid`]
/// or [`crate::rule::Rule`] from parsed pieces.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown node name `{0}`")]
    UnknownNode(String),

    #[error("node `{node}` is missing required attribute `{attribute}`")]
    MissingAttribute { node: String, attribute: String },

    #[error("unknown symmetry group `{0}`")]
    UnknownSymmetry(String),

    #[error("referenced resource `{0}` could not be found")]
    MissingResource(String),

    #[error("inline pattern is not rectangular: row {row} has {found} cells, expected {expected}")]
    RaggedPattern {
        row: usize,
        found: usize,
        expected: usize,
    },

    #[error("glued rule box has odd width {0}, cannot split into input/output halves")]
    OddGluedWidth(usize),

    #[error(
        "rule input/output boxes are the same size ({mx}x{my}x{mz}) but output color {color} is not in the alphabet of any admitted input color"
    )]
    OutputColorNotInInputMask { mx: usize, my: usize, mz: usize, color: u8 },

    #[error("alphabet has {0} symbols, exceeding the 64-symbol limit")]
    AlphabetTooLarge(usize),

    #[error("character `{0}` is not declared in the grid alphabet")]
    UnknownCharacter(char),

    #[error("grid state byte {value} at index {index} is not below alphabet size {size}")]
    StateOutOfRange {
        index: usize,
        value: u8,
        size: usize,
    },
}
