//! Scene lists
//!
//! A scene is a `|`-separated list of patterns with a cursor. Each slot has
//! its own progressive state, separate from the same text used on its own.

use crate::error_diagnostics::UpiError;
use crate::pattern::StepPattern;
use crate::progressive::{LengtheningFill, ProgressiveKey, ProgressiveManager};
use crate::upi::{split_scenes, ParsedPattern, UpiParser};
use lru::LruCache;
use serde::Serialize;
use std::num::NonZeroUsize;
use tracing::{debug, info};

/// Default bound on live scenes
pub const DEFAULT_MAX_SCENES: usize = 32;

#[derive(Debug, Clone)]
pub struct Scene {
    pub key: String,
    pub slots: Vec<ParsedPattern>,
    pub cursor: usize,
}

impl Scene {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn active(&self) -> &ParsedPattern {
        &self.slots[self.cursor]
    }
}

/// Result of one `advance`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneAdvance {
    /// Slot whose progressive state was triggered
    pub triggered_slot: usize,
    /// Running offset of that slot after the trigger
    pub triggered_offset: i64,
    pub active_slot: usize,
    pub pattern: StepPattern,
    pub display_name: String,
    pub accent: Option<StepPattern>,
}

pub struct SceneManager {
    scenes: LruCache<String, Scene>,
    progressive: ProgressiveManager,
}

impl SceneManager {
    pub fn new(
        max_scenes: usize,
        max_progressive: usize,
        fill: LengtheningFill,
        seed: u64,
    ) -> Self {
        let capacity = NonZeroUsize::new(max_scenes).unwrap_or(NonZeroUsize::MIN);
        Self {
            scenes: LruCache::new(capacity),
            progressive: ProgressiveManager::new(max_progressive, fill, seed),
        }
    }

    /// Parse and register `key` if it is not loaded yet
    ///
    /// Every slot must parse; a bad slot rejects the whole list.
    pub fn load(&mut self, key: &str, parser: &UpiParser) -> Result<&Scene, UpiError> {
        if !self.scenes.contains(key) {
            let slots = split_scenes(key)?
                .iter()
                .map(|slot| parser.try_parse(slot))
                .collect::<Result<Vec<_>, _>>()?;
            info!(scene = %key, slots = slots.len(), "loaded scene");
            if let Some((evicted, _)) = self.scenes.push(
                key.to_string(),
                Scene {
                    key: key.to_string(),
                    slots,
                    cursor: 0,
                },
            ) {
                debug!(scene = %evicted, "evicted scene");
                self.progressive.remove_scene(&evicted);
            }
        }
        self.scenes
            .get(key)
            .ok_or_else(|| UpiError::InvalidArgument(format!("scene '{}' is not loaded", key)))
    }

    pub fn scene(&self, key: &str) -> Option<&Scene> {
        self.scenes.peek(key)
    }

    /// Resolved pattern of the active slot, unadvanced
    pub fn active_pattern(&self, key: &str) -> Result<StepPattern, UpiError> {
        let scene = self
            .scenes
            .peek(key)
            .ok_or_else(|| UpiError::InvalidArgument(format!("scene '{}' is not loaded", key)))?;
        self.progressive.resolve(
            &ProgressiveKey::scene_slot(key, scene.cursor),
            scene.active(),
        )
    }

    /// Trigger the active slot, then move the cursor to the next slot
    pub fn advance(&mut self, key: &str) -> Result<SceneAdvance, UpiError> {
        let scene = self
            .scenes
            .get_mut(key)
            .ok_or_else(|| UpiError::InvalidArgument(format!("scene '{}' is not loaded", key)))?;

        let triggered_slot = scene.cursor;
        let slot_key = ProgressiveKey::scene_slot(key, triggered_slot);
        self.progressive
            .trigger(&slot_key, &scene.slots[triggered_slot])?;
        let triggered_offset = self
            .progressive
            .state(&slot_key)
            .map_or(0, |state| state.offset());

        scene.cursor = (scene.cursor + 1) % scene.slots.len();
        let active_slot = scene.cursor;
        let active = &scene.slots[active_slot];
        let pattern = self
            .progressive
            .resolve(&ProgressiveKey::scene_slot(key, active_slot), active)?;

        debug!(scene = %key, triggered_slot, triggered_offset, active_slot, "scene advanced");
        Ok(SceneAdvance {
            triggered_slot,
            triggered_offset,
            active_slot,
            pattern,
            display_name: active.display_name.clone(),
            accent: active.accent,
        })
    }

    /// Forget a scene and its slot states
    pub fn remove(&mut self, key: &str) {
        self.scenes.pop(key);
        self.progressive.remove_scene(key);
    }

    /// Cursor back to 0 and slot states cleared, keeping loaded scenes
    pub fn reset(&mut self) {
        for (_, scene) in self.scenes.iter_mut() {
            scene.cursor = 0;
        }
        self.progressive.clear();
    }

    pub fn clear(&mut self) {
        self.scenes.clear();
        self.progressive.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> SceneManager {
        SceneManager::new(4, 16, LengtheningFill::Silence, 0)
    }

    #[test]
    fn test_cursor_wraps() {
        let parser = UpiParser::with_seed(0);
        let mut scenes = manager();
        scenes.load("100|010|001", &parser).unwrap();
        let slots: Vec<usize> = (0..4)
            .map(|_| scenes.advance("100|010|001").unwrap().active_slot)
            .collect();
        assert_eq!(slots, vec![1, 2, 0, 1]);
    }

    #[test]
    fn test_bad_slot_rejects_scene() {
        let parser = UpiParser::with_seed(0);
        let mut scenes = manager();
        assert!(scenes.load("e(3,8)|x(1,2)", &parser).is_err());
        assert!(scenes.scene("e(3,8)|x(1,2)").is_none());
    }

    #[test]
    fn test_eviction_bounded() {
        let parser = UpiParser::with_seed(0);
        let mut scenes = SceneManager::new(2, 16, LengtheningFill::Silence, 0);
        for key in ["1|0", "10|01", "110|011"] {
            scenes.load(key, &parser).unwrap();
        }
        assert!(scenes.scene("1|0").is_none());
        assert!(scenes.scene("110|011").is_some());
    }
}
