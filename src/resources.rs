//! §6's resource-loading boundary: `WfcNode` and `ConvChainNode` need
//! decoded sample bitmaps and tilesets, but decoding PNG/VOX files is out
//! of scope (§1 Non-goals). This module pins the trait those nodes depend
//! on and ships only an in-memory test double.

use crate::error::Error;

/// A decoded bitmap sample, row-major, `height` rows of `width` colors.
#[derive(Debug, Clone)]
pub struct SampleImage {
    pub width: usize,
    pub height: usize,
    pub colors: Vec<u8>,
}

/// A decoded tileset: one flattened color bitmap per named tile, plus
/// per-direction adjacency (built from the tileset's declared edge
/// compatibility — the concrete grammar for that is a resource-format
/// concern, out of scope here).
#[derive(Debug, Clone)]
pub struct TileSet {
    pub tile_size: usize,
    pub tiles: Vec<(String, Vec<u8>)>,
    pub propagator: Vec<[Vec<usize>; 4]>,
}

/// What [`crate::node::wfc::WfcNode`] and [`crate::node::convchain::ConvChainNode`]
/// depend on to resolve a `sample="..."`/`tileset="..."` attribute into
/// decoded pixels, without this crate knowing anything about file
/// formats.
pub trait ResourceLoader {
    fn load_sample(&self, name: &str) -> Result<SampleImage, Error>;
    fn load_tileset(&self, name: &str) -> Result<TileSet, Error>;
}

/// An in-memory `ResourceLoader`, used by tests and by callers that have
/// already decoded their resources through some other means.
#[derive(Debug, Clone, Default)]
pub struct MemoryResources {
    samples: std::collections::HashMap<String, SampleImage>,
    tilesets: std::collections::HashMap<String, TileSet>,
}

impl MemoryResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sample(mut self, name: impl Into<String>, sample: SampleImage) -> Self {
        self.samples.insert(name.into(), sample);
        self
    }

    pub fn with_tileset(mut self, name: impl Into<String>, tileset: TileSet) -> Self {
        self.tilesets.insert(name.into(), tileset);
        self
    }
}

impl ResourceLoader for MemoryResources {
    fn load_sample(&self, name: &str) -> Result<SampleImage, Error> {
        self.samples.get(name).cloned().ok_or_else(|| Error::MissingResource(name.to_string()))
    }

    fn load_tileset(&self, name: &str) -> Result<TileSet, Error> {
        self.tilesets.get(name).cloned().ok_or_else(|| Error::MissingResource(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sample_reports_its_name() {
        let res = MemoryResources::new();
        let err = res.load_sample("rooms").unwrap_err();
        assert!(matches!(err, Error::MissingResource(name) if name == "rooms"));
    }

    #[test]
    fn registered_sample_round_trips() {
        let sample = SampleImage { width: 2, height: 1, colors: vec![0, 1] };
        let res = MemoryResources::new().with_sample("stripe", sample);
        let loaded = res.load_sample("stripe").unwrap();
        assert_eq!(loaded.colors, vec![0, 1]);
    }
}
