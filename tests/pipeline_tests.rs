// tests/pipeline_tests.rs
use anyhow::Result;
use sightline_core::{ClassCatalog, RawTensor, SpawnState, TensorShape, FALLBACK_LABEL};
use sightline_cv::detection::DetectionConfig;
use sightline_cv::engine::ReplayEngine;
use sightline_cv::source::SourceConfig;
use sightline_cv::{FrameDetector, FrameProvider, RecordingSink};
use std::fs;
use std::path::Path;

const NUM_CLASSES: usize = 20;
const FEATURES: usize = NUM_CLASSES + 4;

fn class_names() -> Vec<String> {
    let mut names: Vec<String> = (0..NUM_CLASSES).map(|i| format!("class_{i}")).collect();
    names[5] = "hat".to_string();
    names
}

fn row(center: (f32, f32), size: (f32, f32), scores: &[(usize, f32)]) -> Vec<f32> {
    let mut values = vec![0.0; FEATURES];
    values[..4].copy_from_slice(&[center.0, center.1, size.0, size.1]);
    for &(class, score) in scores {
        values[4 + class] = score;
    }
    values
}

fn tensor(rows: Vec<Vec<f32>>) -> RawTensor {
    RawTensor::new(
        TensorShape::new(rows.len(), FEATURES),
        rows.into_iter().flatten().collect(),
    )
}

fn hat_present() -> RawTensor {
    tensor(vec![row((320.0, 320.0), (80.0, 60.0), &[(5, 0.9)])])
}

fn nothing() -> RawTensor {
    tensor(vec![row((320.0, 320.0), (80.0, 60.0), &[(5, 0.05)])])
}

fn write_config(dir: &Path, recording: &[RawTensor]) -> Result<std::path::PathBuf> {
    let recording_path = dir.join("recording.json");
    fs::write(&recording_path, serde_json::to_string(recording)?)?;

    let config = serde_json::json!({
        "confidence_threshold": 0.1,
        "model": { "num_classes": NUM_CLASSES, "input_width": 640, "input_height": 640 },
        "catalog": { "kind": "inline", "names": class_names() },
        "engine": { "kind": "replay", "path": recording_path },
        "triggers": [
            { "name": "hat_label", "class": "hat",
              "reaction": { "kind": "visibility", "message": "Hat Detected!" } },
            { "name": "hat_model", "class": "hat",
              "reaction": { "kind": "spawn", "entity": "hat" } }
        ]
    });
    let config_path = dir.join("config.json");
    fs::write(&config_path, serde_json::to_string_pretty(&config)?)?;
    Ok(config_path)
}

fn detector_for(recording: &[RawTensor]) -> Result<(tempfile::TempDir, FrameDetector)> {
    let dir = tempfile::tempdir()?;
    let config_path = write_config(dir.path(), recording)?;
    let detector = FrameDetector::from_config(DetectionConfig::load(config_path)?)?;
    Ok((dir, detector))
}

#[test]
fn test_tie_break_and_clamp_through_pipeline() -> Result<()> {
    let recording = vec![tensor(vec![row(
        (10.0, 10.0),
        (40.0, 40.0),
        &[(0, 0.5), (1, 0.5), (2, 0.3)],
    )])];
    let (_dir, mut detector) = detector_for(&recording)?;

    let (_, report) = detector.run_cycle(&mut RecordingSink::new())?;
    assert_eq!(report.detections.len(), 1);

    let detection = report.detections.as_slice()[0];
    assert_eq!(detection.class_index, 0);
    assert_eq!(detection.score, 0.5);
    assert_eq!(detection.rect.x, 0.0);
    assert_eq!(detection.rect.y, 0.0);
    assert_eq!(detection.rect.x_max(), 30.0);
    assert_eq!(detection.rect.y_max(), 30.0);
    assert_eq!(report.overlay[0].label, "class_0");
    assert_eq!(report.overlay[0].outline_width, 5);
    Ok(())
}

#[test]
fn test_spawn_fires_once_across_presence_changes() -> Result<()> {
    let recording = vec![hat_present(), hat_present(), nothing(), hat_present()];
    let (_dir, mut detector) = detector_for(&recording)?;
    let mut sink = RecordingSink::new();

    let mut visible = Vec::new();
    for _ in 0..recording.len() {
        detector.run_cycle(&mut sink)?;
        visible.push(sink.last_visibility("hat_label"));
    }

    assert_eq!(sink.spawns().count(), 1);
    assert_eq!(visible, vec![Some(true), Some(true), Some(false), Some(true)]);
    assert_eq!(
        detector.state().spawn_state("hat_model"),
        Some(SpawnState::Spawned)
    );

    detector.reset_triggers();
    detector.run_cycle(&mut sink)?;
    assert_eq!(sink.spawns().count(), 2);
    Ok(())
}

#[test]
fn test_malformed_tensor_recovers_next_cycle() -> Result<()> {
    let recording = vec![RawTensor::from_flat(vec![0.2; 100], 24), hat_present()];
    let (_dir, mut detector) = detector_for(&recording)?;
    let mut sink = RecordingSink::new();

    let (_, failed) = detector.run_cycle(&mut sink)?;
    assert!(failed.decode_error.is_some());
    assert!(failed.detections.is_empty());
    assert_eq!(sink.last_visibility("hat_label"), Some(false));

    let (_, recovered) = detector.run_cycle(&mut sink)?;
    assert!(recovered.decode_error.is_none());
    assert_eq!(recovered.detections.len(), 1);
    assert_eq!(sink.spawns().count(), 1);
    Ok(())
}

#[test]
fn test_threshold_change_applies_from_next_cycle() -> Result<()> {
    let recording = vec![tensor(vec![
        row((100.0, 100.0), (20.0, 20.0), &[(5, 0.4)]),
        row((200.0, 200.0), (20.0, 20.0), &[(3, 0.8)]),
    ])];
    let (_dir, mut detector) = detector_for(&recording)?;
    let mut sink = RecordingSink::new();
    let control = detector.threshold().clone();

    let (_, before) = detector.run_cycle(&mut sink)?;
    assert_eq!(before.detections.len(), 2);

    control.set(0.4)?;
    let (_, after) = detector.run_cycle(&mut sink)?;
    assert_eq!(after.threshold, 0.4);
    let classes: Vec<usize> = after.detections.iter().map(|d| d.class_index).collect();
    assert_eq!(classes, vec![3]);
    Ok(())
}

#[test]
fn test_synthetic_run_stays_in_bounds() -> Result<()> {
    let mut config = DetectionConfig::alert_for("person");
    config.model.input_width = 320;
    config.model.input_height = 240;
    let mut detector = FrameDetector::from_config(config)?;
    let mut sink = RecordingSink::new();

    for _ in 0..20 {
        let (frame, report) = detector.run_cycle(&mut sink)?;
        assert_eq!(frame.image.dimensions(), (320, 240));
        assert!(report.decode_error.is_none());
        assert!(report
            .detections
            .iter()
            .all(|d| d.rect.is_within(320.0, 240.0) && d.class_index < 80));
    }
    assert!(sink.spawns().count() <= 1);
    Ok(())
}

#[test]
fn test_replay_with_custom_source() -> Result<()> {
    let config = DetectionConfig {
        catalog: sightline_cv::detection::config::CatalogConfig::Inline {
            names: class_names(),
        },
        model: sightline_cv::detection::config::ModelConfig {
            num_classes: NUM_CLASSES,
            input_width: 640,
            input_height: 640,
        },
        ..DetectionConfig::default()
    };
    let source = FrameProvider::from_config(&SourceConfig::Blank, 640, 640)?;
    let engine = ReplayEngine::from_tensors(vec![hat_present()])?;
    let mut detector = FrameDetector::new(config, source, engine)?;

    let (mut frame, report) = detector.run_cycle(&mut RecordingSink::new())?;
    detector.render(&mut frame, &report);
    // Box spans x 280..360, y 290..350.
    assert_ne!(frame.image.get_pixel(280, 290).0, [0, 0, 0]);
    assert_eq!(frame.image.get_pixel(320, 320).0, [0, 0, 0]);
    Ok(())
}

#[test]
fn test_low_threshold_reports_exact_outline_width() -> Result<()> {
    let recording = vec![hat_present()];
    let (_dir, mut detector) = detector_for(&recording)?;
    detector.threshold().set(0.05)?;

    let (mut frame, report) = detector.run_cycle(&mut RecordingSink::new())?;
    assert_eq!(report.overlay[0].outline_width, 18);

    // Drawn width stops at the configured maximum of 16.
    detector.render(&mut frame, &report);
    assert_ne!(frame.image.get_pixel(295, 305).0, [0, 0, 0]);
    assert_eq!(frame.image.get_pixel(297, 307).0, [0, 0, 0]);
    Ok(())
}

#[test]
fn test_unknown_class_label_falls_back() {
    let catalog = ClassCatalog::new(class_names());
    assert_eq!(catalog.resolve(999), FALLBACK_LABEL);
}

#[test]
fn test_demo_config_runs() -> Result<()> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("configs/hat_demo.json");
    let mut detector = FrameDetector::from_config(DetectionConfig::load(path)?)?;
    let mut sink = RecordingSink::new();

    for _ in 0..10 {
        detector.run_cycle(&mut sink)?;
    }
    assert_eq!(detector.cycles(), 10);
    assert!(sink.spawns().all(|request| request.spec.scale == 2.0));
    Ok(())
}
