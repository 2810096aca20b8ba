//! §6's model grammar, narrowed to a `serde`-deserializable AST (an XML
//! reader, or any other `Deserialize` front-end, builds this tree; this
//! crate only turns it into a runnable [`crate::interpreter::Interpreter`]).

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::Error;
use crate::field::{Field, FieldSet};
use crate::grid::{Grid, Wave, WILDCARD};
use crate::interpreter::Interpreter;
use crate::node::all::AllNode;
use crate::node::convchain::{self, ConvChainNode};
use crate::node::convolution::{ConvRule, ConvolutionNode};
use crate::node::map::{MapNode, Scale};
use crate::node::one::OneNode;
use crate::node::path::PathNode;
use crate::node::prl::ParallelNode;
use crate::node::sequence_markov::{MarkovNode, SequenceNode};
use crate::node::wfc::WfcNode;
use crate::node::{Arena, NodeId, NodeShape};
use crate::observation::Observation;
use crate::resources::ResourceLoader;
use crate::rule::Rule;

fn default_p() -> f64 {
    1.0
}
fn default_temperature() -> f64 {
    0.0
}
fn default_depth_coefficient() -> f64 {
    1.0
}
fn default_search_limit() -> i64 {
    -1
}
fn default_scale_one() -> usize {
    1
}
fn default_kernel() -> String {
    "VonNeumann".to_string()
}
fn default_n() -> usize {
    3
}

/// A `<union symbol="X" values="AB"/>` declaration (§6).
#[derive(Debug, Clone, Deserialize)]
pub struct UnionSpec {
    pub symbol: char,
    pub values: String,
}

/// The grid the model runs over. Sizes live at the batch level per §6,
/// so they're supplied separately to [`Interpreter::compile`].
#[derive(Debug, Clone, Deserialize)]
pub struct GridSpec {
    pub values: String,
    #[serde(default)]
    pub origin: bool,
    #[serde(default)]
    pub symmetry: Option<String>,
    #[serde(default)]
    pub unions: Vec<UnionSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelSpec {
    pub grid: GridSpec,
    pub root: NodeSpec,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuleSpec {
    #[serde(rename = "in")]
    pub in_pattern: String,
    #[serde(rename = "out")]
    pub out_pattern: String,
    #[serde(default = "default_p")]
    pub p: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldSpec {
    pub for_color: char,
    pub zero: String,
    #[serde(default)]
    pub on: Option<String>,
    #[serde(default)]
    pub recompute: bool,
    #[serde(default)]
    pub essential: bool,
    #[serde(default)]
    pub inversed: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservationSpec {
    pub from: char,
    pub to: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuleNodeSpec {
    pub rules: Vec<RuleSpec>,
    #[serde(default)]
    pub symmetry: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
    #[serde(default)]
    pub observations: Vec<ObservationSpec>,
    #[serde(default)]
    pub steps: usize,
    #[serde(default)]
    pub search: bool,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_depth_coefficient")]
    pub depth_coefficient: f64,
    #[serde(default = "default_search_limit")]
    pub search_limit: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BranchSpec {
    pub children: Vec<NodeSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MapSpec {
    pub rules: Vec<RuleSpec>,
    #[serde(default)]
    pub new_values: Option<String>,
    #[serde(default = "default_scale_one")]
    pub nx: usize,
    #[serde(default = "default_scale_one")]
    pub dx: usize,
    #[serde(default = "default_scale_one")]
    pub ny: usize,
    #[serde(default = "default_scale_one")]
    pub dy: usize,
    #[serde(default = "default_scale_one")]
    pub nz: usize,
    #[serde(default = "default_scale_one")]
    pub dz: usize,
    #[serde(default)]
    pub children: Vec<NodeSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathSpec {
    pub start: String,
    pub finish: String,
    #[serde(default)]
    pub on: Option<String>,
    pub value: char,
    #[serde(default)]
    pub longest: bool,
    #[serde(default)]
    pub edges: bool,
    #[serde(default)]
    pub vertices: bool,
    #[serde(default)]
    pub inertia: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SumSpec {
    pub color: char,
    pub values: Vec<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConvRuleSpec {
    pub from: char,
    pub to: char,
    pub sums: Vec<SumSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConvolutionSpec {
    #[serde(default = "default_kernel")]
    pub kernel: String,
    #[serde(default)]
    pub periodic: bool,
    pub rules: Vec<ConvRuleSpec>,
    #[serde(default)]
    pub steps: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConvChainSpec {
    pub sample: String,
    #[serde(default = "default_n")]
    pub n: usize,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    pub substrate: String,
    pub black: char,
    pub white: char,
    #[serde(default)]
    pub steps: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WfcSpec {
    Overlap {
        sample: String,
        #[serde(default = "default_n")]
        n: usize,
        #[serde(default)]
        periodic: bool,
        out_mx: usize,
        out_my: usize,
    },
    Tile {
        tileset: String,
        #[serde(default)]
        periodic: bool,
        out_mx: usize,
        out_my: usize,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodeSpec {
    One(RuleNodeSpec),
    All(RuleNodeSpec),
    Prl(RuleNodeSpec),
    Markov(BranchSpec),
    Sequence(BranchSpec),
    Map(MapSpec),
    Path(PathSpec),
    Convolution(ConvolutionSpec),
    Convchain(ConvChainSpec),
    Wfc(WfcSpec),
}

/// Shared build context threaded through `compile_node`: the grid's
/// alphabet (dims are irrelevant to rule/pattern parsing), its symbol
/// unions, and whether the grid is 2D (governs which symmetry names are
/// legal, §6).
struct Builder<'a> {
    grid: &'a Grid,
    unions: HashMap<char, Wave>,
    is_2d: bool,
    resources: Option<&'a dyn ResourceLoader>,
}

impl Interpreter {
    /// Builds a grid from `spec.grid` at the given dimensions, then
    /// compiles `spec.root` into a node arena over that grid's alphabet.
    /// `origin=true` plants the alphabet's second symbol at the grid's
    /// center cell instead of leaving every cell at symbol 0 (§8 scenario
    /// 2's "origin=true (red at (5,5))").
    pub fn compile(spec: ModelSpec, mx: usize, my: usize, mz: usize, resources: Option<&dyn ResourceLoader>) -> Result<Self, Error> {
        let characters: Vec<char> = spec.grid.values.chars().collect();
        let mut grid = Grid::new(mx, my, mz, characters)?;
        if spec.grid.origin && grid.alphabet_size() > 1 {
            let center = grid.index(mx / 2, my / 2, mz / 2);
            grid.state[center] = 1;
        }

        let mut unions = HashMap::new();
        for u in &spec.grid.unions {
            let mut w = Wave::empty();
            for c in u.values.chars() {
                let color = grid.index_of(c).ok_or(Error::UnknownCharacter(c))?;
                w = w.union(Wave::one_hot(color));
            }
            unions.insert(u.symbol, w);
        }

        let builder = Builder {
            grid: &grid,
            unions,
            is_2d: mz == 1,
            resources,
        };

        let mut arena: Arena = Arena::new();
        let root = compile_node(&spec.root, &builder, &mut arena)?;

        Ok(Interpreter {
            arena,
            root,
            grid,
            counter: 0,
        })
    }
}

fn parse_dims(pattern: &str) -> Result<(usize, usize, usize, Vec<Vec<&str>>), Error> {
    let layers: Vec<Vec<&str>> = pattern.split(' ').map(|layer| layer.split('/').collect()).collect();
    let mz = layers.len();
    let my = layers[0].len();
    for (li, layer) in layers.iter().enumerate() {
        if layer.len() != my {
            return Err(Error::RaggedPattern { row: li, found: layer.len(), expected: my });
        }
    }
    let mx = layers[0][0].chars().count();
    for layer in &layers {
        for row in layer {
            if row.chars().count() != mx {
                return Err(Error::RaggedPattern { row: 0, found: row.chars().count(), expected: mx });
            }
        }
    }
    Ok((mx, my, mz, layers))
}

fn parse_input_pattern(pattern: &str, builder: &Builder) -> Result<(usize, usize, usize, Vec<Wave>), Error> {
    let (mx, my, mz, layers) = parse_dims(pattern)?;
    let mut cells = vec![Wave::empty(); mx * my * mz];
    for (z, layer) in layers.iter().enumerate() {
        for (y, row) in layer.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                let w = if ch == '*' {
                    Wave::full(builder.grid.alphabet_size())
                } else if let Some(&u) = builder.unions.get(&ch) {
                    u
                } else {
                    Wave::one_hot(builder.grid.index_of(ch).ok_or(Error::UnknownCharacter(ch))?)
                };
                cells[x + y * mx + z * mx * my] = w;
            }
        }
    }
    Ok((mx, my, mz, cells))
}

fn parse_output_pattern(pattern: &str, builder: &Builder) -> Result<(usize, usize, usize, Vec<u8>), Error> {
    let (mx, my, mz, layers) = parse_dims(pattern)?;
    let mut cells = vec![WILDCARD; mx * my * mz];
    for (z, layer) in layers.iter().enumerate() {
        for (y, row) in layer.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                let color = if ch == '*' {
                    WILDCARD
                } else {
                    builder.grid.index_of(ch).ok_or(Error::UnknownCharacter(ch))?
                };
                cells[x + y * mx + z * mx * my] = color;
            }
        }
    }
    Ok((mx, my, mz, cells))
}

fn compile_rule(spec: &RuleSpec, builder: &Builder) -> Result<Rule, Error> {
    let (imx, imy, imz, input) = parse_input_pattern(&spec.in_pattern, builder)?;
    let (omx, omy, omz, output) = parse_output_pattern(&spec.out_pattern, builder)?;
    Rule::new(imx, imy, imz, input, omx, omy, omz, output, spec.p, builder.grid.alphabet_size())
}

fn compile_rules(specs: &[RuleSpec], symmetry: Option<&str>, builder: &Builder) -> Result<Vec<Rule>, Error> {
    let mut rules = Vec::new();
    for spec in specs {
        let base = compile_rule(spec, builder)?;
        match symmetry {
            Some(group) => rules.extend(base.symmetries(group, builder.is_2d)?),
            None => rules.push(base),
        }
    }
    Ok(rules)
}

fn compile_fields(specs: &[FieldSpec], builder: &Builder) -> Result<FieldSet, Error> {
    let mut fields = Vec::new();
    for spec in specs {
        let for_color = builder.grid.index_of(spec.for_color).ok_or(Error::UnknownCharacter(spec.for_color))?;
        let zero = builder.grid.wave(&spec.zero)?;
        let substrate = match &spec.on {
            Some(s) => builder.grid.wave(s)?,
            None => Wave::full(builder.grid.alphabet_size()),
        };
        fields.push(Field::new(for_color, zero, substrate, spec.recompute, spec.essential, spec.inversed));
    }
    Ok(FieldSet { fields })
}

fn compile_observations(specs: &[ObservationSpec], builder: &Builder) -> Result<Vec<(u8, Observation)>, Error> {
    let mut out = Vec::new();
    for spec in specs {
        let from_symbol = builder.grid.index_of(spec.from).ok_or(Error::UnknownCharacter(spec.from))?;
        let to = builder.grid.wave(&spec.to)?;
        out.push((from_symbol, Observation { from: from_symbol, to }));
    }
    Ok(out)
}

fn compile_node(spec: &NodeSpec, builder: &Builder, arena: &mut Arena) -> Result<NodeId, Error> {
    let shape = match spec {
        NodeSpec::One(s) => {
            let rules = compile_rules(&s.rules, s.symmetry.as_deref(), builder)?;
            let fields = compile_fields(&s.fields, builder)?;
            let observations = compile_observations(&s.observations, builder)?;
            let node = OneNode::new(rules, fields, observations, s.steps).with_search(s.search, s.temperature, s.depth_coefficient, s.search_limit);
            NodeShape::One(node)
        }
        NodeSpec::All(s) => {
            let rules = compile_rules(&s.rules, s.symmetry.as_deref(), builder)?;
            let fields = compile_fields(&s.fields, builder)?;
            let observations = compile_observations(&s.observations, builder)?;
            NodeShape::All(AllNode::new(rules, fields, observations, s.steps))
        }
        NodeSpec::Prl(s) => {
            let rules = compile_rules(&s.rules, s.symmetry.as_deref(), builder)?;
            let fields = compile_fields(&s.fields, builder)?;
            let observations = compile_observations(&s.observations, builder)?;
            NodeShape::Prl(ParallelNode::new(rules, fields, observations, s.steps))
        }
        NodeSpec::Sequence(s) => {
            let children = s.children.iter().map(|c| compile_node(c, builder, arena)).collect::<Result<Vec<_>, _>>()?;
            NodeShape::Sequence(SequenceNode::new(children))
        }
        NodeSpec::Markov(s) => {
            let children = s.children.iter().map(|c| compile_node(c, builder, arena)).collect::<Result<Vec<_>, _>>()?;
            NodeShape::Markov(MarkovNode::new(children))
        }
        NodeSpec::Map(s) => {
            let rules = compile_rules(&s.rules, None, builder)?;
            let characters = match &s.new_values {
                Some(v) => v.chars().collect(),
                None => builder.grid.characters.clone(),
            };
            let scale = Scale { nx: s.nx, dx: s.dx, ny: s.ny, dy: s.dy, nz: s.nz, dz: s.dz };
            let children = s.children.iter().map(|c| compile_node(c, builder, arena)).collect::<Result<Vec<_>, _>>()?;
            NodeShape::Map(MapNode::new(rules, scale, characters, children))
        }
        NodeSpec::Path(s) => {
            let start = builder.grid.wave(&s.start)?;
            let finish = builder.grid.wave(&s.finish)?;
            let substrate = match &s.on {
                Some(v) => builder.grid.wave(v)?,
                None => Wave::empty(),
            };
            let value = builder.grid.index_of(s.value).ok_or(Error::UnknownCharacter(s.value))?;
            NodeShape::Path(PathNode::new(start, finish, substrate, value, s.longest, s.edges, s.vertices, s.inertia))
        }
        NodeSpec::Convolution(s) => {
            let mut rules = Vec::new();
            for r in &s.rules {
                let from = builder.grid.index_of(r.from).ok_or(Error::UnknownCharacter(r.from))?;
                let to = builder.grid.index_of(r.to).ok_or(Error::UnknownCharacter(r.to))?;
                let mut sums = Vec::new();
                for sum in &r.sums {
                    let color = builder.grid.index_of(sum.color).ok_or(Error::UnknownCharacter(sum.color))?;
                    let mask = sum.values.iter().fold(0u32, |acc, &v| acc | (1 << v));
                    sums.push((color, mask));
                }
                rules.push(ConvRule { from, to, sums, p: 1.0 });
            }
            NodeShape::Convolution(ConvolutionNode::new(&s.kernel, s.periodic, rules, s.steps))
        }
        NodeSpec::Convchain(s) => {
            let resources = builder.resources.ok_or_else(|| Error::MissingResource(s.sample.clone()))?;
            let sample = resources.load_sample(&s.sample)?;
            let black = builder.grid.index_of(s.black).ok_or(Error::UnknownCharacter(s.black))?;
            let white = builder.grid.index_of(s.white).ok_or(Error::UnknownCharacter(s.white))?;
            let bool_sample: Vec<Vec<bool>> = (0..sample.height)
                .map(|y| (0..sample.width).map(|x| sample.colors[y * sample.width + x] != 0).collect())
                .collect();
            let weights = convchain::build_weights(&bool_sample, s.n);
            let substrate = builder.grid.wave(&s.substrate)?;
            NodeShape::ConvChain(ConvChainNode::new(substrate, s.n, s.temperature, black, white, weights, s.steps))
        }
        NodeSpec::Wfc(s) => match s {
            WfcSpec::Overlap { sample, n, periodic, out_mx, out_my } => {
                let resources = builder.resources.ok_or_else(|| Error::MissingResource(sample.clone()))?;
                let image = resources.load_sample(sample)?;
                let (patterns, weights) = extract_overlap_patterns(&image, *n);
                NodeShape::Wfc(WfcNode::new_overlap(*out_mx, *out_my, patterns, *n, weights, *periodic))
            }
            WfcSpec::Tile { tileset, periodic, out_mx, out_my } => {
                let resources = builder.resources.ok_or_else(|| Error::MissingResource(tileset.clone()))?;
                let set = resources.load_tileset(tileset)?;
                let colors: Vec<u8> = set.tiles.iter().map(|(_, pixels)| pixels[0]).collect();
                let weights = vec![1.0; colors.len()];
                NodeShape::Wfc(WfcNode::new_tile(*out_mx, *out_my, colors, weights, set.propagator, *periodic))
            }
        },
    };
    Ok(arena.add_node(shape))
}

/// Slides an `n x n` window (periodic wrap) across `image`, tabulating
/// each distinct window (plus its 8 dihedral variants) as a weighted
/// pattern (grounded on the same extraction idiom as
/// [`crate::node::convchain::build_weights`], generalized from booleans
/// to arbitrary colors).
fn extract_overlap_patterns(image: &crate::resources::SampleImage, n: usize) -> (Vec<Vec<u8>>, Vec<f64>) {
    let mut counts: Vec<(Vec<u8>, f64)> = Vec::new();
    for y in 0..image.height {
        for x in 0..image.width {
            let base = window_at(image, x, y, n);
            for variant in pattern_symmetries_u8(&base, n) {
                if let Some(entry) = counts.iter_mut().find(|(p, _)| *p == variant) {
                    entry.1 += 1.0;
                } else {
                    counts.push((variant, 1.0));
                }
            }
        }
    }
    counts.into_iter().unzip()
}

fn window_at(image: &crate::resources::SampleImage, x: usize, y: usize, n: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(n * n);
    for dy in 0..n {
        for dx in 0..n {
            let sx = (x + dx) % image.width;
            let sy = (y + dy) % image.height;
            out.push(image.colors[sy * image.width + sx]);
        }
    }
    out
}

fn rotate_u8(p: &[u8], n: usize) -> Vec<u8> {
    let mut out = vec![0u8; n * n];
    for y in 0..n {
        for x in 0..n {
            out[x * n + (n - 1 - y)] = p[y * n + x];
        }
    }
    out
}

fn reflect_u8(p: &[u8], n: usize) -> Vec<u8> {
    let mut out = vec![0u8; n * n];
    for y in 0..n {
        for x in 0..n {
            out[y * n + (n - 1 - x)] = p[y * n + x];
        }
    }
    out
}

fn pattern_symmetries_u8(base: &[u8], n: usize) -> Vec<Vec<u8>> {
    let mut variants = Vec::new();
    let mut cur = base.to_vec();
    for _ in 0..4 {
        variants.push(cur.clone());
        variants.push(reflect_u8(&cur, n));
        cur = rotate_u8(&cur, n);
    }
    variants.sort();
    variants.dedup();
    variants
}

/// Exercises [`Interpreter::compile`] + [`Interpreter::run`] end-to-end
/// with an inline JSON model, avoiding any XML/PNG dependency.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;

    #[test]
    fn compiles_and_runs_a_basic_flip_model() {
        let json = r#"{
            "grid": { "values": "BW" },
            "root": { "kind": "one", "rules": [ { "in": "B", "out": "W", "p": 1.0 } ] }
        }"#;
        let model: ModelSpec = serde_json::from_str(json).unwrap();
        let mut interp = Interpreter::compile(model, 3, 3, 1, None).unwrap();
        let snapshots: Vec<_> = interp.run(RunConfig::new(1).with_max_steps(50)).collect();
        let last = snapshots.last().unwrap();
        assert!(last.state.iter().all(|&c| c == 1));
    }

    #[test]
    fn unknown_character_in_pattern_errors() {
        let json = r#"{
            "grid": { "values": "BW" },
            "root": { "kind": "one", "rules": [ { "in": "Z", "out": "W", "p": 1.0 } ] }
        }"#;
        let model: ModelSpec = serde_json::from_str(json).unwrap();
        let err = Interpreter::compile(model, 3, 3, 1, None);
        assert!(matches!(err, Err(Error::UnknownCharacter('Z'))));
    }

    #[test]
    fn ragged_pattern_rows_error() {
        let json = r#"{
            "grid": { "values": "BW" },
            "root": { "kind": "one", "rules": [ { "in": "BW/B", "out": "WW/W", "p": 1.0 } ] }
        }"#;
        let model: ModelSpec = serde_json::from_str(json).unwrap();
        let err = Interpreter::compile(model, 3, 3, 1, None);
        assert!(matches!(err, Err(Error::RaggedPattern { .. })));
    }
}
