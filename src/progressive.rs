//! Progressive pattern state
//!
//! Each key (the literal UPI, or a scene slot) owns at most one
//! `ProgressiveState`, created on its first trigger and kept in a bounded
//! LRU. Resolving never advances; only `trigger` does.

use crate::error_diagnostics::UpiError;
use crate::generators::Algorithm;
use crate::nom_parser::ProgressiveSuffix;
use crate::pattern::{StepPattern, MAX_STEPS};
use crate::upi::ParsedPattern;
use lru::LruCache;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use tracing::{debug, warn};

/// Default bound on live progressive states
pub const DEFAULT_MAX_STATES: usize = 100;

/// What owns a progressive state
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProgressiveKey {
    /// A pattern entered on its own
    Global(String),
    /// One slot of a scene list
    SceneSlot { scene: String, slot: usize },
}

impl ProgressiveKey {
    pub fn global(upi: &str) -> Self {
        ProgressiveKey::Global(upi.to_string())
    }

    pub fn scene_slot(scene: &str, slot: usize) -> Self {
        ProgressiveKey::SceneSlot {
            scene: scene.to_string(),
            slot,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProgressiveState {
    Offset {
        step: i64,
        current: i64,
        trigger_count: u64,
    },
    Lengthening {
        step: usize,
        current: StepPattern,
        trigger_count: u64,
    },
    Transformation {
        algorithm: Algorithm,
        target_onsets: usize,
        steps_advanced: usize,
    },
}

impl ProgressiveState {
    fn initial(suffix: &ProgressiveSuffix, base: &StepPattern) -> Self {
        match *suffix {
            ProgressiveSuffix::Offset(step) => ProgressiveState::Offset {
                step,
                current: 0,
                trigger_count: 0,
            },
            ProgressiveSuffix::Lengthening(step) => ProgressiveState::Lengthening {
                step,
                current: *base,
                trigger_count: 0,
            },
            ProgressiveSuffix::Transformation { algorithm, target } => {
                ProgressiveState::Transformation {
                    algorithm,
                    target_onsets: target,
                    steps_advanced: 0,
                }
            }
        }
    }

    /// Running offset, or 0 for the other behaviours
    pub fn offset(&self) -> i64 {
        match self {
            ProgressiveState::Offset { current, .. } => *current,
            _ => 0,
        }
    }

    pub fn trigger_count(&self) -> u64 {
        match self {
            ProgressiveState::Offset { trigger_count, .. }
            | ProgressiveState::Lengthening { trigger_count, .. } => *trigger_count,
            ProgressiveState::Transformation { steps_advanced, .. } => *steps_advanced as u64,
        }
    }
}

/// How steps appended by lengthening are filled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengtheningFill {
    Silence,
    Alternating,
    #[default]
    SeededRandom,
}

impl LengtheningFill {
    /// Steps appended on trigger number `trigger` (1-based)
    pub fn fill(&self, count: usize, trigger: u64, seed: u64) -> Vec<bool> {
        match self {
            LengtheningFill::Silence => vec![false; count],
            LengtheningFill::Alternating => (0..count).map(|i| i % 2 == 0).collect(),
            LengtheningFill::SeededRandom => {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(trigger));
                (0..count).map(|_| rng.gen_bool(0.5)).collect()
            }
        }
    }
}

pub struct ProgressiveManager {
    states: LruCache<ProgressiveKey, ProgressiveState>,
    fill: LengtheningFill,
    seed: u64,
}

impl ProgressiveManager {
    pub fn new(capacity: usize, fill: LengtheningFill, seed: u64) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            states: LruCache::new(capacity),
            fill,
            seed,
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn state(&self, key: &ProgressiveKey) -> Option<&ProgressiveState> {
        self.states.peek(key)
    }

    /// Advance the state for `key` once and return the resolved pattern
    ///
    /// Patterns without a progressive suffix resolve unchanged.
    pub fn trigger(
        &mut self,
        key: &ProgressiveKey,
        parsed: &ParsedPattern,
    ) -> Result<StepPattern, UpiError> {
        let Some(suffix) = parsed.progressive else {
            return Ok(parsed.pattern);
        };

        let mut state = match self.states.get(key) {
            Some(existing) => *existing,
            None => {
                debug!(?key, %suffix, "creating progressive state");
                ProgressiveState::initial(&suffix, &parsed.base)
            }
        };
        self.advance(&mut state, parsed)?;

        if let Some((evicted, _)) = self.states.push(key.clone(), state) {
            if &evicted != key {
                debug!(?evicted, "evicted progressive state");
            }
        }
        let resolved = resolve_state(&state, parsed)?;
        Ok(parsed.finish(resolved))
    }

    /// Current pattern for `key` without advancing it
    pub fn resolve(
        &self,
        key: &ProgressiveKey,
        parsed: &ParsedPattern,
    ) -> Result<StepPattern, UpiError> {
        match self.states.peek(key) {
            Some(state) if parsed.progressive.is_some() => {
                Ok(parsed.finish(resolve_state(state, parsed)?))
            }
            _ => Ok(parsed.pattern),
        }
    }

    pub fn remove(&mut self, key: &ProgressiveKey) -> Option<ProgressiveState> {
        self.states.pop(key)
    }

    /// Drop every slot state belonging to `scene`
    pub fn remove_scene(&mut self, scene: &str) {
        let keys: Vec<ProgressiveKey> = self
            .states
            .iter()
            .filter_map(|(key, _)| match key {
                ProgressiveKey::SceneSlot { scene: s, .. } if s == scene => Some(key.clone()),
                _ => None,
            })
            .collect();
        for key in keys {
            self.states.pop(&key);
        }
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }

    fn advance(
        &self,
        state: &mut ProgressiveState,
        parsed: &ParsedPattern,
    ) -> Result<(), UpiError> {
        match state {
            ProgressiveState::Offset {
                step,
                current,
                trigger_count,
            } => {
                *current = current.wrapping_add(*step);
                *trigger_count += 1;
            }
            ProgressiveState::Lengthening {
                step,
                current,
                trigger_count,
            } => {
                *trigger_count += 1;
                let room = MAX_STEPS - current.len();
                if room == 0 {
                    warn!(
                        upi = %parsed.display_name,
                        "pattern is already 128 steps; not lengthening"
                    );
                    return Ok(());
                }
                let count = (*step).min(room);
                if count < *step {
                    warn!(upi = %parsed.display_name, "lengthening capped at 128 steps");
                }
                let fill = self.fill.fill(count, *trigger_count, self.seed);
                let extra = StepPattern::from_bools(&fill)?;
                *current = current.concat(&extra)?;
            }
            ProgressiveState::Transformation {
                target_onsets,
                steps_advanced,
                ..
            } => {
                let distance = parsed.base.onset_count().abs_diff(*target_onsets);
                if *steps_advanced < distance {
                    *steps_advanced += 1;
                }
            }
        }
        Ok(())
    }
}

/// Pattern for a state, before quantization
pub fn resolve_state(
    state: &ProgressiveState,
    parsed: &ParsedPattern,
) -> Result<StepPattern, UpiError> {
    let base = parsed.base;
    match *state {
        ProgressiveState::Offset { current, .. } => Ok(base.rotate(current)),
        ProgressiveState::Lengthening { current, .. } => Ok(current),
        ProgressiveState::Transformation {
            algorithm,
            target_onsets,
            steps_advanced,
        } => {
            let start = base.onset_count();
            let distance = start.abs_diff(target_onsets);
            let moved = steps_advanced.min(distance);
            if moved == 0 {
                return Ok(base);
            }
            let onsets = if target_onsets > start {
                start + moved
            } else {
                start - moved
            };
            algorithm.generate(onsets, base.len())
        }
    }
}
