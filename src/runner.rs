//! Cycle loop driven from the command line

use crate::Args;
use anyhow::{Context, Result};
use log::{info, warn};
use sightline_cv::detection::{export_json, DetectionConfig};
use sightline_cv::utils::ImageUtils;
use sightline_cv::{FrameDetector, LogSink};

#[derive(Debug, Default)]
pub struct RunSummary {
    pub cycles: u64,
    pub failed_cycles: u64,
    pub decode_failures: u64,
    pub total_detections: usize,
    pub spawns: usize,
}

fn load_config(args: &Args) -> Result<DetectionConfig> {
    let mut config = match &args.config {
        Some(path) => DetectionConfig::load(path)?,
        None => {
            info!("No config file given, alerting on '{}'", args.alert);
            DetectionConfig::alert_for(&args.alert)
        }
    };

    if let Some(threshold) = args.threshold {
        config.confidence_threshold = threshold;
    }
    Ok(config)
}

pub fn run(args: &Args) -> Result<RunSummary> {
    let config = load_config(args)?;
    let mut detector = FrameDetector::from_config(config)?;
    let mut sink = LogSink;

    let mut summary = RunSummary::default();
    let mut reports = Vec::new();

    for cycle in 0..args.cycles {
        summary.cycles += 1;

        // A failed cycle never stops the loop.
        let (mut frame, report) = match detector.run_cycle(&mut sink) {
            Ok(output) => output,
            Err(e) => {
                warn!("Cycle {} failed: {:#}", cycle, e);
                summary.failed_cycles += 1;
                continue;
            }
        };

        if report.decode_error.is_some() {
            summary.decode_failures += 1;
        }
        summary.total_detections += report.detections.len();
        summary.spawns += report.outcome.spawns.len();

        if let Some(dir) = &args.overlay_dir {
            detector.render(&mut frame, &report);
            let path = dir.join(format!("frame_{:05}.png", frame.index));
            ImageUtils::save_rgb(&frame.image, &path)
                .with_context(|| format!("Failed to save overlay for frame {}", frame.index))?;
        }

        reports.push(report);
    }

    if let Some(path) = &args.output {
        export_json(&reports, path)?;
        info!("Cycle reports saved: {:?}", path);
    }

    Ok(summary)
}
