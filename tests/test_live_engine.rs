//! Live controller: loading, triggering, accents and the playback view
use rhythm_explorer::accent::AccentTogglePolicy;
use rhythm_explorer::config::EngineConfig;
use rhythm_explorer::live_engine::{AccentModeKind, LiveEngine, StepEvent};
use rhythm_explorer::progressive::LengtheningFill;
use rhythm_explorer::{StepPattern, UpiError};
use std::thread;

fn engine() -> LiveEngine {
    LiveEngine::new(EngineConfig::default().with_seed(5))
}

fn p(s: &str) -> StepPattern {
    StepPattern::from_binary_str(s).unwrap()
}

#[test]
fn test_nothing_loaded() {
    let mut engine = engine();
    assert!(matches!(engine.trigger(), Err(UpiError::NoPattern)));
    assert!(matches!(engine.snapshot(), Err(UpiError::NoPattern)));
    assert_eq!(engine.playback_view().tick(0), StepEvent::REST);
}

#[test]
fn test_set_upi_publishes_snapshot_and_frame() {
    let mut engine = engine();
    let view = engine.playback_view();
    let snapshot = engine.set_upi("E(3,8)").unwrap();
    assert_eq!(snapshot.upi, "e(3,8)");
    assert_eq!(snapshot.display_name, "E(3,8)");
    assert_eq!(snapshot.pattern, p("10010010"));
    assert_eq!(snapshot.displays.hex, "0x94");
    assert_eq!(snapshot.displays.decimal, "d73");
    assert_eq!(snapshot.steps, 8);
    assert_eq!(snapshot.onsets, 3);
    assert_eq!(view.epoch(), Some(snapshot.epoch));
    assert!(view.tick(0).onset);
    assert!(!view.tick(1).onset);
}

#[test]
fn test_failed_set_upi_keeps_previous_pattern() {
    let mut engine = engine();
    let view = engine.playback_view();
    let before = engine.set_upi("e(3,8)").unwrap();

    assert!(engine.set_upi("e(3,").is_err());
    assert!(engine.set_upi("").is_err());
    assert!(engine.set_upi("e(3,8)|e(9,").is_err());

    let after = engine.snapshot().unwrap();
    assert_eq!(after.pattern, before.pattern);
    assert_eq!(after.upi, "e(3,8)");
    assert_eq!(view.epoch(), Some(before.epoch), "no frame published on failure");
}

#[test]
fn test_progressive_offset_triggers() {
    let mut engine = engine();
    let loaded = engine.set_upi("E(5,8)+2").unwrap();
    let base = loaded.pattern;
    for offset in [2, 4, 6] {
        let snapshot = engine.trigger().unwrap();
        assert_eq!(snapshot.pattern, base.rotate(offset));
        assert_eq!(snapshot.onsets, 5);
        assert_eq!(snapshot.progressive.unwrap().offset(), offset);
    }
}

#[test]
fn test_reentering_same_text_keeps_state() {
    let mut engine = engine();
    engine.set_upi("e(5,8)+2").unwrap();
    engine.trigger().unwrap();
    let again = engine.set_upi("  E(5,8)+2 ").unwrap();
    assert_eq!(again.progressive.unwrap().offset(), 2);
}

#[test]
fn test_switching_text_evicts_old_state() {
    let mut engine = engine();
    engine.set_upi("e(5,8)+2").unwrap();
    engine.trigger().unwrap();
    engine.set_upi("e(3,8)").unwrap();
    let back = engine.set_upi("e(5,8)+2").unwrap();
    assert!(back.progressive.is_none(), "progress starts over");
    assert_eq!(engine.trigger().unwrap().progressive.unwrap().offset(), 2);
}

#[test]
fn test_scene_trigger_reports_offsets() {
    let mut engine = engine();
    let loaded = engine.set_upi("E(3,8)+2|100").unwrap();
    assert_eq!(loaded.scene.as_ref().unwrap().slots, 2);
    assert_eq!(loaded.display_name, "E(3,8)+2|100");

    let offsets: Vec<i64> = (0..6)
        .map(|_| engine.trigger().unwrap().scene.unwrap().last_triggered_offset)
        .collect();
    assert_eq!(offsets, vec![2, 0, 4, 0, 6, 0]);
}

#[test]
fn test_scene_shows_active_slot_pattern() {
    let mut engine = engine();
    engine.set_upi("1000|1100").unwrap();
    let snapshot = engine.trigger().unwrap();
    assert_eq!(snapshot.pattern, p("1100"));
    assert_eq!(snapshot.scene.unwrap().active_slot, 1);
    assert!(snapshot.progressive.is_none());
}

#[test]
fn test_accent_suspension_through_playback() {
    let mut engine = engine();
    let view = engine.playback_view();
    engine.set_upi("{10}e(3,8)").unwrap();
    let snapshot = engine.toggle_accent(3).unwrap();
    assert_eq!(snapshot.accent_mode, AccentModeKind::Suspended);
    assert_eq!(snapshot.accent_map, p("10010010"));

    let pass = |view: &rhythm_explorer::live_engine::PlaybackView| -> Vec<StepEvent> {
        (0..8).map(|step| view.tick(step)).collect()
    };
    let first = pass(&view);
    for _ in 0..3 {
        assert_eq!(pass(&view), first);
    }
    assert!(first[0].accent && first[3].accent && first[6].accent);
}

#[test]
fn test_cycling_accents_through_playback() {
    let mut engine = engine();
    let view = engine.playback_view();
    engine.set_upi("{10}e(3,8)").unwrap();
    let accents = |view: &rhythm_explorer::live_engine::PlaybackView| -> Vec<usize> {
        (0..8).filter(|&step| view.tick(step).accent).collect()
    };
    assert_eq!(accents(&view), vec![0, 6]);
    assert_eq!(accents(&view), vec![3]);
}

#[test]
fn test_toggle_on_rest_follows_policy() {
    let mut rejecting = engine();
    rejecting.set_upi("1000").unwrap();
    let snapshot = rejecting.toggle_accent(1).unwrap();
    assert_eq!(snapshot.pattern, p("1000"));
    assert_eq!(snapshot.accent_mode, AccentModeKind::Cycling);

    let config = EngineConfig {
        accent_toggle_policy: AccentTogglePolicy::CreateOnset,
        ..EngineConfig::default().with_seed(5)
    };
    let mut creating = LiveEngine::new(config);
    creating.set_upi("1000").unwrap();
    let snapshot = creating.toggle_accent(1).unwrap();
    assert_eq!(snapshot.pattern, p("1100"));
    assert!(snapshot.accent_map.get(1));
}

#[test]
fn test_pinned_accents_follow_lengthening() {
    let config = EngineConfig {
        lengthening_fill: LengtheningFill::Alternating,
        ..EngineConfig::default().with_seed(5)
    };
    let mut engine = LiveEngine::new(config);
    engine.set_upi("{1}1000*4").unwrap();
    engine.trigger().unwrap();
    engine.toggle_accent(0).unwrap();

    let grown = engine.trigger().unwrap();
    assert_eq!(grown.pattern, p("100010101010"));
    assert_eq!(grown.accent_map.len(), grown.pattern.len());
    assert_eq!(grown.accent_map, p("000010100000"));

    let edited = engine.toggle_accent(8).unwrap();
    assert!(edited.accent_map.get(8), "steps past the old length are editable");
}

#[test]
fn test_pinned_accents_follow_scene_slot_length() {
    let mut engine = engine();
    engine.set_upi("{1}10010010|{1}101").unwrap();
    engine.toggle_accent(0).unwrap();
    let snapshot = engine.trigger().unwrap();
    assert_eq!(snapshot.pattern, p("101"));
    assert_eq!(snapshot.accent_map.len(), 3);
    assert_eq!(snapshot.accent_mode, AccentModeKind::Suspended);
}

#[test]
fn test_created_onset_survives_trigger() {
    let config = EngineConfig {
        accent_toggle_policy: AccentTogglePolicy::CreateOnset,
        ..EngineConfig::default().with_seed(5)
    };
    let mut engine = LiveEngine::new(config);
    engine.set_upi("e(1,8)+2").unwrap();
    let created = engine.toggle_accent(1).unwrap();
    assert_eq!(created.pattern, p("11000000"));

    let triggered = engine.trigger().unwrap();
    assert_eq!(triggered.pattern, p("01100000"));
    assert!(triggered.pattern.get(1));
    assert!(triggered.accent_map.get(1));

    // a new key drops the created onsets
    engine.set_upi("e(1,8)").unwrap();
    let back = engine.set_upi("e(1,8)+2").unwrap();
    assert_eq!(back.pattern, p("10000000"));
}

#[test]
fn test_reset_rewinds_progress_and_accents() {
    let mut engine = engine();
    let loaded = engine.set_upi("{1}e(5,8)+2").unwrap();
    engine.trigger().unwrap();
    let suspended = engine.toggle_accent(1).unwrap();
    assert_eq!(suspended.accent_mode, AccentModeKind::Suspended);
    let reset = engine.reset().unwrap();
    assert_eq!(reset.pattern, loaded.pattern);
    assert_eq!(reset.accent_mode, AccentModeKind::Cycling);
    assert!(reset.progressive.is_none());
}

#[test]
fn test_playback_view_from_another_thread() {
    let mut engine = engine();
    let view = engine.playback_view();
    engine.set_upi("1111").unwrap();
    let handle = thread::spawn(move || (0..4).filter(|&s| view.tick(s).onset).count());
    assert_eq!(handle.join().unwrap(), 4);
}

#[test]
fn test_snapshot_serializes_to_json() {
    let mut engine = engine();
    let snapshot = engine.set_upi("e(3,8)+1").unwrap();
    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["pattern"], "10010010");
    assert_eq!(json["steps"], 8);
}
