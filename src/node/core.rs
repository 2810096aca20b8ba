//! The state and pre-step bookkeeping shared by every `Rule`-driven leaf
//! (§4.3): the matcher, the declared fields, and the observation/search
//! machinery that turns a "future" declaration into either a cached
//! trajectory or a biasing potential field.

use crate::changelog::ChangeLog;
use crate::field::{Field, FieldSet};
use crate::grid::{Grid, Wave, WILDCARD};
use crate::node::matcher::Matcher;
use crate::node::Context;
use crate::observation::{self, Direction, Observation};
use crate::rng::Prng;
use crate::rule::Rule;
use crate::search::{self, SearchMode};

/// Writes every non-wildcard output cell of `rule` applied at `(x, y, z)`
/// that differs from the grid's current color, logging each write (§4.3.1
/// "Application writes only cells whose new color differs..."). Returns
/// whether any cell actually changed.
pub fn apply_rule(grid: &mut Grid, log: &mut ChangeLog, rule: &Rule, x: usize, y: usize, z: usize) -> bool {
    let mut changed = false;
    for dz in 0..rule.omz {
        for dy in 0..rule.omy {
            for dx in 0..rule.omx {
                let ri = dx + dy * rule.omx + dz * rule.omx * rule.omy;
                let color = rule.output[ri];
                if color == WILDCARD {
                    continue;
                }
                let (gx, gy, gz) = (x + dx, y + dy, z + dz);
                let gi = grid.index(gx, gy, gz);
                if grid.state[gi] != color {
                    grid.state[gi] = color;
                    log.push(gx, gy, gz);
                    changed = true;
                }
            }
        }
    }
    changed
}

/// Outcome of [`RuleNodeCore::prepare`], consumed by the owning node to
/// decide whether to keep stepping (§7's locally-handled `RuntimeAbort`/
/// `InferenceFailure`).
pub enum Prepared {
    Continue,
    /// An essential field had no zero cells, or an observation named a
    /// color absent from the grid.
    Aborted,
    /// The future is already satisfied everywhere; the node is done.
    GoalReached,
}

pub struct RuleNodeCore {
    pub matcher: Matcher,
    pub fields: FieldSet,
    pub observations: Vec<(u8, Observation)>,
    pub search: bool,
    pub temperature: f64,
    pub depth_coefficient: f64,
    pub search_limit: i64,
    pub steps: usize,
    pub own_steps: usize,
    future: Option<Vec<Wave>>,
    trajectory: Option<Vec<Vec<u8>>>,
    trajectory_index: usize,
    first_activation: bool,
}

impl RuleNodeCore {
    pub fn new(rules: Vec<Rule>, fields: FieldSet, observations: Vec<(u8, Observation)>, steps: usize) -> Self {
        Self {
            matcher: Matcher::new(rules),
            fields,
            observations,
            search: false,
            temperature: 0.0,
            depth_coefficient: 1.0,
            search_limit: -1,
            steps,
            own_steps: 0,
            future: None,
            trajectory: None,
            trajectory_index: 0,
            first_activation: true,
        }
    }

    pub fn reset(&mut self) {
        self.matcher.reset();
        self.own_steps = 0;
        self.future = None;
        self.trajectory = None;
        self.trajectory_index = 0;
        self.first_activation = true;
        for field in &mut self.fields.fields {
            field.potential.clear();
        }
    }

    pub fn has_fields(&self) -> bool {
        !self.fields.is_empty()
    }

    pub fn next_trajectory_state(&mut self) -> Option<Vec<u8>> {
        let trajectory = self.trajectory.as_ref()?;
        let state = trajectory.get(self.trajectory_index + 1)?.clone();
        self.trajectory_index += 1;
        Some(state)
    }

    pub fn has_cached_trajectory(&self) -> bool {
        self.trajectory.is_some()
    }

    /// §4.3 "Field computation" + "Observation / inference engagement":
    /// refreshes declared fields, and on first activation computes the
    /// future and either a cached trajectory or synthetic backward-potential
    /// fields. Returns whether the caller should keep going this step.
    pub fn prepare(&mut self, ctx: &mut Context) -> Prepared {
        if !self.fields.recompute_all(ctx.grid, self.first_activation) {
            return Prepared::Aborted;
        }

        if self.first_activation && !self.observations.is_empty() {
            let Some(future) = observation::compute_future_set_present(ctx.grid, &self.observations) else {
                return Prepared::Aborted;
            };
            let present_seeds: Vec<(u8, usize)> = ctx.grid.state.iter().enumerate().map(|(i, &c)| (c, i)).collect();
            let future_seeds: Vec<(u8, usize)> = future
                .iter()
                .enumerate()
                .flat_map(|(i, &mask)| (0..ctx.grid.alphabet_size() as u8).filter(move |&c| mask.contains(c)).map(move |c| (c, i)))
                .collect();
            let forward = observation::compute_potentials(ctx.grid, &self.matcher.rules, &present_seeds, Direction::Forward);
            let backward = observation::compute_potentials(ctx.grid, &self.matcher.rules, &future_seeds, Direction::Backward);

            if self.search {
                if let Some(traj) = search::search(
                    ctx.grid,
                    &self.matcher.rules,
                    &future,
                    &forward,
                    &backward,
                    SearchMode::One,
                    self.depth_coefficient,
                    self.search_limit,
                    ctx.rng,
                ) {
                    self.trajectory = Some(traj.states);
                    self.trajectory_index = 0;
                }
            } else {
                for (color, table) in backward.into_iter().enumerate() {
                    self.fields.fields.push(Field {
                        for_color: color as u8,
                        zero: Wave::empty(),
                        substrate: Wave::empty(),
                        recompute: false,
                        essential: false,
                        inversed: false,
                        potential: table,
                    });
                }
            }
            self.future = Some(future);
        }
        self.first_activation = false;

        if let Some(future) = &self.future {
            if future.iter().zip(ctx.grid.state.iter()).all(|(f, &c)| f.contains(c)) {
                return Prepared::GoalReached;
            }
        }
        Prepared::Continue
    }

    /// §4.3.1's selection key, shared by One/All's potential-biased path:
    /// deterministic max-score when `temperature == 0`, else a
    /// Metropolis-flavoured random key that still favors higher score.
    pub fn selection_key(score: f64, first_score: f64, temperature: f64, rng: &mut Prng) -> f64 {
        let u = rng.next_f64();
        if temperature == 0.0 {
            -score + 0.001 * u
        } else {
            u.powf(((score - first_score) / temperature).exp())
        }
    }
}
