//! Typed run parameters handed to [`crate::interpreter::Interpreter::run`].
//!
//! `spec.md` keeps batch sizing and the CLI driver out of scope; this is
//! the boundary a driver populates before calling into the library, not a
//! file-format loader.

/// dimensional-analysis-style alias, matching the teacher crate's
/// `Chips`/`Epoch` convention of naming `usize`/`u64` slots by what they
/// count rather than leaving them anonymous.
pub type Seed = u64;
pub type StepCount = usize;

/// Parameters for a single interpreter run.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RunConfig {
    /// Seed handed to [`crate::rng::Prng::from_seed`].
    pub seed: Seed,
    /// Hard cap on the number of steps `run` will advance; `None` means
    /// run until the root branch is exhausted.
    pub max_steps: Option<StepCount>,
    /// When `true`, `run` yields a snapshot after every step (used by a
    /// GIF producer); when `false`, only the initial and final snapshots
    /// are yielded, per §6.
    pub streaming: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            max_steps: None,
            streaming: false,
        }
    }
}

impl RunConfig {
    pub fn new(seed: Seed) -> Self {
        Self {
            seed,
            ..Default::default()
        }
    }

    pub fn with_max_steps(mut self, max_steps: StepCount) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    pub fn streaming(mut self) -> Self {
        self.streaming = true;
        self
    }
}
