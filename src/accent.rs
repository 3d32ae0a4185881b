//! Accent overlay
//!
//! In `Cycling` mode the j-th played onset takes `cycle[j mod M]`, counted by
//! a running onset counter that only moves when an onset is played. A manual
//! toggle switches to `Suspended`: the accent map shown at that moment is
//! pinned per step and stops advancing until the pattern key changes.
//!
//! The counters are atomics shared by the control side and the playback
//! side so both derive accents from the same count.

use crate::error_diagnostics::UpiError;
use crate::pattern::StepPattern;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AccentMode {
    Cycling,
    Suspended { snapshot: StepPattern },
}

/// What a toggle on a rest does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccentTogglePolicy {
    #[default]
    RejectRest,
    CreateOnset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ToggleAction {
    /// Step has no onset and the policy forbids creating one
    Rejected,
    FlipAccent,
    /// Step becomes an accented onset
    CreateAccentedOnset,
}

/// Decide what toggling `step` does under `policy`
pub fn toggle_action(
    policy: AccentTogglePolicy,
    pattern: &StepPattern,
    step: usize,
) -> ToggleAction {
    match (pattern.get(step), policy) {
        (true, _) => ToggleAction::FlipAccent,
        (false, AccentTogglePolicy::RejectRest) => ToggleAction::Rejected,
        (false, AccentTogglePolicy::CreateOnset) => ToggleAction::CreateAccentedOnset,
    }
}

/// Accent of the onset with running index `onset_index`
pub fn cycling_accent(cycle: &StepPattern, onset_index: u64) -> bool {
    cycle.get((onset_index % cycle.len() as u64) as usize)
}

/// Per-step accents for one pass of `pattern`, starting at `start_counter`
pub fn cycling_map(pattern: &StepPattern, cycle: &StepPattern, start_counter: u64) -> StepPattern {
    let mut map = *pattern;
    let mut counter = start_counter;
    for step in 0..pattern.len() {
        if pattern.get(step) {
            map.set(step, cycling_accent(cycle, counter));
            counter += 1;
        }
    }
    map
}

/// Fit a pinned accent map onto `pattern`
///
/// Overlapping steps are kept, then the map is masked to the onsets of
/// `pattern`. Maps that already match the length are returned unchanged.
pub fn fit_snapshot(snapshot: &StepPattern, pattern: &StepPattern) -> StepPattern {
    if snapshot.len() == pattern.len() {
        return *snapshot;
    }
    StepPattern::from_bits(snapshot.bits() & pattern.bits(), pattern.len()).unwrap_or(*pattern)
}

/// Onset counters shared between control and playback
#[derive(Debug, Default)]
pub struct AccentCounters {
    onset_counter: AtomicU64,
    cycle_start: AtomicU64,
}

impl AccentCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn onset_counter(&self) -> u64 {
        self.onset_counter.load(Ordering::Acquire)
    }

    /// Onset counter value when the current pass began
    pub fn cycle_start(&self) -> u64 {
        self.cycle_start.load(Ordering::Acquire)
    }

    /// Record that `step` of `pattern` is playing
    ///
    /// Returns the running index of the onset, if there is one.
    pub fn advance(&self, pattern: &StepPattern, step: usize) -> Option<u64> {
        if step == 0 {
            self.cycle_start
                .store(self.onset_counter.load(Ordering::Acquire), Ordering::Release);
        }
        if pattern.get(step) {
            Some(self.onset_counter.fetch_add(1, Ordering::AcqRel))
        } else {
            None
        }
    }

    pub fn reset(&self) {
        self.onset_counter.store(0, Ordering::Release);
        self.cycle_start.store(0, Ordering::Release);
    }
}

/// Immutable accent state handed to playback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccentOverlay {
    pub cycle: Option<StepPattern>,
    pub mode: AccentMode,
}

impl AccentOverlay {
    pub const NONE: AccentOverlay = AccentOverlay {
        cycle: None,
        mode: AccentMode::Cycling,
    };

    /// Accent for `step`, given the running index of the onset there
    pub fn accent(&self, step: usize, onset_index: u64) -> bool {
        match &self.mode {
            AccentMode::Suspended { snapshot } => snapshot.get(step),
            AccentMode::Cycling => self
                .cycle
                .as_ref()
                .map_or(false, |cycle| cycling_accent(cycle, onset_index)),
        }
    }
}

pub struct AccentEngine {
    cycle: Option<StepPattern>,
    mode: AccentMode,
    policy: AccentTogglePolicy,
    counters: Arc<AccentCounters>,
}

impl AccentEngine {
    pub fn new(policy: AccentTogglePolicy) -> Self {
        Self {
            cycle: None,
            mode: AccentMode::Cycling,
            policy,
            counters: Arc::new(AccentCounters::new()),
        }
    }

    pub fn counters(&self) -> Arc<AccentCounters> {
        Arc::clone(&self.counters)
    }

    pub fn mode(&self) -> &AccentMode {
        &self.mode
    }

    pub fn cycle(&self) -> Option<&StepPattern> {
        self.cycle.as_ref()
    }

    pub fn policy(&self) -> AccentTogglePolicy {
        self.policy
    }

    pub fn overlay(&self) -> AccentOverlay {
        AccentOverlay {
            cycle: self.cycle,
            mode: self.mode,
        }
    }

    /// New key: back to Cycling with a fresh onset counter
    pub fn reset(&mut self, cycle: Option<StepPattern>) {
        if matches!(self.mode, AccentMode::Suspended { .. }) {
            info!("accent suspension cleared");
        }
        self.cycle = cycle;
        self.mode = AccentMode::Cycling;
        self.counters.reset();
    }

    /// Swap the cycle without touching mode or counters
    pub fn set_cycle(&mut self, cycle: Option<StepPattern>) {
        self.cycle = cycle;
    }

    /// Accent map as currently displayed for `pattern`
    pub fn accent_map(&self, pattern: &StepPattern) -> StepPattern {
        match &self.mode {
            AccentMode::Suspended { snapshot } => fit_snapshot(snapshot, pattern),
            AccentMode::Cycling => match &self.cycle {
                Some(cycle) => cycling_map(pattern, cycle, self.counters.cycle_start()),
                None => StepPattern::from_bits(0, pattern.len()).unwrap_or(*pattern),
            },
        }
    }

    /// Manual toggle of the accent at `step`
    ///
    /// The first toggle pins the displayed map; later toggles edit the pin.
    pub fn toggle(&mut self, pattern: &StepPattern, step: usize) -> Result<ToggleAction, UpiError> {
        if step >= pattern.len() {
            return Err(UpiError::StepOutOfRange {
                step,
                len: pattern.len(),
            });
        }
        let action = toggle_action(self.policy, pattern, step);
        let mut snapshot = match (&self.mode, action) {
            (_, ToggleAction::Rejected) => {
                debug!(step, "accent toggle on a rest rejected");
                return Ok(action);
            }
            _ => self.accent_map(pattern),
        };
        match action {
            ToggleAction::FlipAccent => snapshot.toggle(step),
            ToggleAction::CreateAccentedOnset => snapshot.set(step, true),
            ToggleAction::Rejected => {}
        }
        if matches!(self.mode, AccentMode::Cycling) {
            info!(step, "accent suspended");
        }
        self.mode = AccentMode::Suspended { snapshot };
        Ok(action)
    }

    /// Re-fit a pinned map after the pattern changed length
    pub fn align(&mut self, pattern: &StepPattern) {
        if let AccentMode::Suspended { snapshot } = &mut self.mode {
            if snapshot.len() != pattern.len() {
                debug!(from = snapshot.len(), to = pattern.len(), "resizing pinned accents");
                *snapshot = fit_snapshot(snapshot, pattern);
            }
        }
    }

    /// Play `step` and report its accent, advancing the onset counter
    pub fn play_step(&self, pattern: &StepPattern, step: usize) -> Option<bool> {
        self.counters
            .advance(pattern, step)
            .map(|index| self.overlay().accent(step, index))
    }
}
