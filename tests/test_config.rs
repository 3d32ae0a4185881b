//! Loading engine configuration from TOML files
use rhythm_explorer::accent::AccentTogglePolicy;
use rhythm_explorer::config::{ConfigError, EngineConfig};
use rhythm_explorer::live_engine::LiveEngine;
use rhythm_explorer::progressive::LengtheningFill;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_load_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
max_progressive_states = 4
max_scene_states = 2
random_seed = 99
lengthening_fill = "silence"
accent_toggle_policy = "create_onset"
"#
    )
    .unwrap();

    let config = EngineConfig::load(file.path()).unwrap();
    assert_eq!(config.max_progressive_states, 4);
    assert_eq!(config.max_scene_states, 2);
    assert_eq!(config.random_seed, Some(99));
    assert_eq!(config.lengthening_fill, LengtheningFill::Silence);
    assert_eq!(config.accent_toggle_policy, AccentTogglePolicy::CreateOnset);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = EngineConfig::load(dir.path().join("absent.toml"));
    assert!(matches!(result, Err(ConfigError::Io(_))));
}

#[test]
fn test_bad_toml_is_reported() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "max_progressive_states = \"many\"").unwrap();
    assert!(matches!(
        EngineConfig::load(file.path()),
        Err(ConfigError::Toml(_))
    ));
}

#[test]
fn test_fixed_seed_makes_random_patterns_repeatable() {
    let config = EngineConfig::default().with_seed(1234);
    let mut a = LiveEngine::new(config.clone());
    let mut b = LiveEngine::new(config);
    let left = a.set_upi("R(5,16)").unwrap();
    let right = b.set_upi("R(5,16)").unwrap();
    assert_eq!(left.pattern, right.pattern);
    assert_eq!(left.onsets, 5);
}

#[test]
fn test_lengthening_fill_from_config_reaches_engine() {
    let config = EngineConfig {
        lengthening_fill: LengtheningFill::Alternating,
        ..EngineConfig::default().with_seed(3)
    };
    let mut engine = LiveEngine::new(config);
    engine.set_upi("1000*4").unwrap();
    assert_eq!(engine.trigger().unwrap().pattern.to_binary_string(), "10001010");
}
