//! Live pattern controller with a lock-free playback view
//!
//! `LiveEngine` is the single owner of progressive, scene and accent state.
//! Every control action (new text, trigger, accent toggle) resolves the
//! concrete pattern on the control side and publishes an immutable
//! `PlaybackFrame` through `ArcSwap`. `PlaybackView::tick` reads the frame
//! and the shared accent counters without locking or allocating.

use crate::accent::{AccentCounters, AccentEngine, AccentMode, AccentOverlay, ToggleAction};
use crate::config::EngineConfig;
use crate::error_diagnostics::UpiError;
use crate::pattern::StepPattern;
use crate::pattern_display::DisplayStrings;
use crate::progressive::{ProgressiveKey, ProgressiveManager, ProgressiveState};
use crate::scene::SceneManager;
use crate::upi::{is_scene_list, normalize, ParsedPattern, UpiParser};
use arc_swap::ArcSwap;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Pattern and accents as seen by playback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackFrame {
    pub pattern: StepPattern,
    pub accent: AccentOverlay,
    pub epoch: u64,
}

/// What playback should do on one step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StepEvent {
    pub onset: bool,
    pub accent: bool,
}

impl StepEvent {
    pub const REST: StepEvent = StepEvent {
        onset: false,
        accent: false,
    };
}

/// Realtime handle; cheap to clone and safe to move to another thread
#[derive(Clone)]
pub struct PlaybackView {
    frame: Arc<ArcSwap<Option<PlaybackFrame>>>,
    counters: Arc<AccentCounters>,
}

impl PlaybackView {
    /// Evaluate `step` of the current frame
    ///
    /// No frame or a step past the pattern plays nothing.
    pub fn tick(&self, step: usize) -> StepEvent {
        let guard = self.frame.load();
        let Some(frame) = &**guard else {
            return StepEvent::REST;
        };
        if step >= frame.pattern.len() {
            return StepEvent::REST;
        }
        match self.counters.advance(&frame.pattern, step) {
            Some(index) => StepEvent {
                onset: true,
                accent: frame.accent.accent(step, index),
            },
            None => StepEvent::REST,
        }
    }

    pub fn epoch(&self) -> Option<u64> {
        let guard = self.frame.load();
        (**guard).map(|frame| frame.epoch)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccentModeKind {
    Cycling,
    Suspended,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneView {
    pub active_slot: usize,
    pub slots: usize,
    pub last_triggered_offset: i64,
}

/// Everything a UI needs to draw the current state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UiSnapshot {
    pub upi: String,
    pub display_name: String,
    pub pattern: StepPattern,
    pub accent_map: StepPattern,
    pub accent_mode: AccentModeKind,
    pub displays: DisplayStrings,
    pub steps: usize,
    pub onsets: usize,
    pub progressive: Option<ProgressiveState>,
    pub scene: Option<SceneView>,
    pub epoch: u64,
}

enum Loaded {
    Single {
        key: String,
        parsed: ParsedPattern,
    },
    Scene {
        key: String,
        display_name: String,
        last_triggered_offset: i64,
    },
}

impl Loaded {
    fn key(&self) -> &str {
        match self {
            Loaded::Single { key, .. } | Loaded::Scene { key, .. } => key,
        }
    }
}

pub struct LiveEngine {
    config: EngineConfig,
    parser: UpiParser,
    progressive: ProgressiveManager,
    scenes: SceneManager,
    accent: AccentEngine,
    loaded: Option<Loaded>,
    current: Option<StepPattern>,
    /// Onsets added by accent toggles, kept across triggers of the same key
    created: u128,
    frame: Arc<ArcSwap<Option<PlaybackFrame>>>,
    epoch: u64,
}

impl LiveEngine {
    pub fn new(config: EngineConfig) -> Self {
        let seed = config.random_seed.unwrap_or_else(rand::random);
        let parser = UpiParser::with_seed(seed);
        let progressive = ProgressiveManager::new(
            config.max_progressive_states,
            config.lengthening_fill,
            seed,
        );
        let scenes = SceneManager::new(
            config.max_scene_states,
            config.max_progressive_states,
            config.lengthening_fill,
            seed,
        );
        let accent = AccentEngine::new(config.accent_toggle_policy);
        info!(seed, "live engine ready");
        Self {
            config,
            parser,
            progressive,
            scenes,
            accent,
            loaded: None,
            current: None,
            created: 0,
            frame: Arc::new(ArcSwap::from_pointee(None::<PlaybackFrame>)),
            epoch: 0,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn parser(&self) -> &UpiParser {
        &self.parser
    }

    pub fn playback_view(&self) -> PlaybackView {
        PlaybackView {
            frame: Arc::clone(&self.frame),
            counters: self.accent.counters(),
        }
    }

    /// Load new text; on error the previous pattern stays in effect
    pub fn set_upi(&mut self, text: &str) -> Result<UiSnapshot, UpiError> {
        let key = normalize(text);
        if key.is_empty() {
            return Err(UpiError::Empty);
        }
        if self.loaded.as_ref().map(Loaded::key) == Some(key.as_str()) {
            return self.snapshot();
        }

        let (loaded, pattern, cycle) = if is_scene_list(&key) {
            let scene = self.scenes.load(&key, &self.parser).map_err(|e| {
                warn!(upi = %key, error = %e, "rejected scene list");
                e
            })?;
            let active = scene.active();
            let display_name = scene
                .slots
                .iter()
                .map(|slot| slot.display_name.as_str())
                .collect::<Vec<_>>()
                .join("|");
            let cycle = active.accent;
            let pattern = self.scenes.active_pattern(&key)?;
            (
                Loaded::Scene {
                    key: key.clone(),
                    display_name,
                    last_triggered_offset: 0,
                },
                pattern,
                cycle,
            )
        } else {
            let parsed = self.parser.try_parse(&key).map_err(|e| {
                warn!(upi = %key, error = %e, "rejected pattern");
                e
            })?;
            let pattern = self
                .progressive
                .resolve(&ProgressiveKey::global(&key), &parsed)?;
            let cycle = parsed.accent;
            (
                Loaded::Single {
                    key: key.clone(),
                    parsed,
                },
                pattern,
                cycle,
            )
        };

        if let Some(previous) = self.loaded.take() {
            self.evict(&previous);
        }
        info!(upi = %key, pattern = %pattern, "pattern loaded");
        self.loaded = Some(loaded);
        self.current = Some(pattern);
        self.created = 0;
        self.accent.reset(cycle);
        self.publish();
        self.snapshot()
    }

    fn evict(&mut self, previous: &Loaded) {
        debug!(upi = %previous.key(), "evicting previous pattern state");
        match previous {
            Loaded::Single { key, .. } => {
                self.progressive.remove(&ProgressiveKey::global(key));
            }
            Loaded::Scene { key, .. } => self.scenes.remove(key),
        }
    }

    /// Re-apply onsets created by accent toggles
    fn with_created(&self, pattern: StepPattern) -> Result<StepPattern, UpiError> {
        StepPattern::from_bits(pattern.bits() | self.created, pattern.len())
    }

    /// One user trigger: advances the scene, or else the pattern's own
    /// progressive state, never both
    pub fn trigger(&mut self) -> Result<UiSnapshot, UpiError> {
        let pattern = match self.loaded.as_mut() {
            None => return Err(UpiError::NoPattern),
            Some(Loaded::Scene {
                key,
                last_triggered_offset,
                ..
            }) => {
                let advance = self.scenes.advance(key)?;
                *last_triggered_offset = advance.triggered_offset;
                self.accent.set_cycle(advance.accent);
                advance.pattern
            }
            Some(Loaded::Single { key, parsed }) => self
                .progressive
                .trigger(&ProgressiveKey::global(key), parsed)?,
        };
        let pattern = self.with_created(pattern)?;
        self.accent.align(&pattern);
        self.current = Some(pattern);
        self.publish();
        self.snapshot()
    }

    /// Manual accent edit at `step` of the current pattern
    pub fn toggle_accent(&mut self, step: usize) -> Result<UiSnapshot, UpiError> {
        let mut pattern = self.current.ok_or(UpiError::NoPattern)?;
        let action = self.accent.toggle(&pattern, step)?;
        match action {
            ToggleAction::Rejected => return self.snapshot(),
            ToggleAction::CreateAccentedOnset => {
                pattern.set(step, true);
                self.created |= 1u128 << step;
                self.current = Some(pattern);
            }
            ToggleAction::FlipAccent => {}
        }
        self.publish();
        self.snapshot()
    }

    /// Back to the unadvanced pattern with cycling accents
    pub fn reset(&mut self) -> Result<UiSnapshot, UpiError> {
        self.progressive.clear();
        self.scenes.reset();
        let pattern = match self.loaded.as_mut() {
            None => return Err(UpiError::NoPattern),
            Some(Loaded::Single { parsed, .. }) => parsed.pattern,
            Some(Loaded::Scene {
                key,
                last_triggered_offset,
                ..
            }) => {
                *last_triggered_offset = 0;
                self.scenes.active_pattern(key)?
            }
        };
        let cycle = match self.loaded.as_ref() {
            Some(Loaded::Single { parsed, .. }) => parsed.accent,
            Some(Loaded::Scene { key, .. }) => {
                self.scenes.scene(key).and_then(|scene| scene.active().accent)
            }
            None => None,
        };
        info!("engine reset");
        self.current = Some(pattern);
        self.created = 0;
        self.accent.reset(cycle);
        self.publish();
        self.snapshot()
    }

    fn publish(&mut self) {
        let Some(pattern) = self.current else {
            return;
        };
        self.epoch += 1;
        self.frame.store(Arc::new(Some(PlaybackFrame {
            pattern,
            accent: self.accent.overlay(),
            epoch: self.epoch,
        })));
    }

    pub fn snapshot(&self) -> Result<UiSnapshot, UpiError> {
        let (loaded, pattern) = match (&self.loaded, self.current) {
            (Some(loaded), Some(pattern)) => (loaded, pattern),
            _ => return Err(UpiError::NoPattern),
        };

        let (display_name, progressive, scene) = match loaded {
            Loaded::Single { key, parsed } => (
                parsed.display_name.clone(),
                self.progressive
                    .state(&ProgressiveKey::global(key))
                    .copied(),
                None,
            ),
            Loaded::Scene {
                key,
                display_name,
                last_triggered_offset,
            } => {
                let scene = self.scenes.scene(key).map(|scene| SceneView {
                    active_slot: scene.cursor,
                    slots: scene.len(),
                    last_triggered_offset: *last_triggered_offset,
                });
                (display_name.clone(), None, scene)
            }
        };

        let accent_mode = match self.accent.mode() {
            AccentMode::Cycling => AccentModeKind::Cycling,
            AccentMode::Suspended { .. } => AccentModeKind::Suspended,
        };

        Ok(UiSnapshot {
            upi: loaded.key().to_string(),
            display_name,
            pattern,
            accent_map: self.accent.accent_map(&pattern),
            accent_mode,
            displays: DisplayStrings::of(&pattern),
            steps: pattern.len(),
            onsets: pattern.onset_count(),
            progressive,
            scene,
            epoch: self.epoch,
        })
    }
}
