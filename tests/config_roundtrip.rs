//! RenderConfig persistence.

use wavefront::prelude::*;

#[test]
fn test_save_load_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("render.json");

    let config = RenderConfig {
        width: 640,
        height: 360,
        samples: 64,
        seed: 42,
        num_queues: 3,
        path_states_per_queue: 4096,
        failure_policy: FailurePolicy::FailFast,
        cancel_policy: CancelPolicy::WritePartial,
        ..Default::default()
    };
    config.save(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("\"fail_fast\""));
    assert!(text.contains("\"write_partial\""));

    assert_eq!(RenderConfig::load(&path).unwrap(), config);
}

#[test]
fn test_load_rejects_invalid_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, r#"{ "samples": 0 }"#).unwrap();

    let err = RenderConfig::load(&path).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)), "{err}");
}

#[test]
fn test_load_malformed_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ \"width\": ").unwrap();

    assert!(matches!(RenderConfig::load(&path), Err(Error::Json(_))));
}

#[test]
fn test_load_unknown_policy() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("policy.json");
    std::fs::write(&path, r#"{ "failure_policy": "retry" }"#).unwrap();

    assert!(matches!(RenderConfig::load(&path), Err(Error::Json(_))));
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = RenderConfig::load(dir.path().join("missing.json")).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}
