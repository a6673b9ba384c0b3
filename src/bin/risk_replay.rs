//! risk_replay - offline risk analysis of a recorded detection dump
//!
//! Replays a JSON-lines detection dump through a fresh, independently
//! calibrated engine. Frames scoring above the threshold are written to stdout
//! as one JSON alert per line, followed by a JSON summary.

use anyhow::{anyhow, Result};
use clap::Parser;
use serde::Serialize;
use std::collections::BTreeSet;
use std::io::Write;

use sentinel_risk::{
    alert::significant_risk_markers, Alert, Detector, EngineConfig, JsonLinesDetector,
    LocationType, RiskEngine, ScoringContext,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON-lines detection dump, one frame per line.
    #[arg(long)]
    input: String,
    /// Minimum smoothed score (0-100) that produces an alert line.
    #[arg(long, default_value_t = 35.0)]
    alert_threshold: f64,
    /// Score every Nth frame.
    #[arg(long, default_value_t = 1)]
    stride: usize,
    /// Skip the calibration window.
    #[arg(long, env = "RISK_BYPASS_CALIBRATION")]
    bypass_calibration: bool,
    /// Local hour of day (0-23) the recording was made at.
    #[arg(long)]
    hour: Option<u8>,
    /// public, transit, retail, secure_facility or other.
    #[arg(long)]
    location_type: Option<String>,
    /// Multiplier on the fused score (0-2).
    #[arg(long)]
    sensitivity: Option<f64>,
}

#[derive(Serialize)]
struct FrameAlert {
    frame_index: u64,
    timestamp_seconds: f64,
    #[serde(flatten)]
    alert: Alert,
}

#[derive(Serialize)]
struct Summary {
    source: String,
    frames_read: u64,
    frames_processed: u64,
    alerts: u64,
    peak_score: f64,
    significant_risk: Vec<String>,
    peak_persons: usize,
    crowd_limit: usize,
    motion_patterns: Vec<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if args.stride == 0 {
        return Err(anyhow!("--stride must be >= 1"));
    }
    if let Some(hour) = args.hour {
        if hour > 23 {
            return Err(anyhow!("--hour must be within 0..=23"));
        }
    }
    let location_type = args
        .location_type
        .as_deref()
        .map(str::parse::<LocationType>)
        .transpose()?;

    let mut config = EngineConfig::load()?;
    if args.bypass_calibration {
        config.calibration.bypass = true;
    }
    let fps = f64::from(config.fps);
    let min_iou = config.tracking.pose_match_iou;
    let mut engine = RiskEngine::new(config);

    let mut detector = JsonLinesDetector::open(&args.input)?;
    detector.warm_up()?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let mut frame_index: u64 = 0;
    let mut processed: u64 = 0;
    let mut alerts: u64 = 0;
    let mut peak_score: f64 = 0.0;
    let mut peak_persons = 0;
    let mut motion_patterns = BTreeSet::new();
    let mut alert_marks = Vec::new();

    while let Some(mut frame) = detector.next_frame()? {
        let index = frame_index;
        frame_index += 1;
        if index % args.stride as u64 != 0 {
            continue;
        }

        let timestamp = frame.timestamp.unwrap_or(index as f64 / fps);
        frame.timestamp = Some(timestamp);
        frame.assign_pose_tracks(min_iou);
        peak_persons = peak_persons.max(frame.poses.len());
        let poses = frame.poses.clone();

        let context = ScoringContext {
            hour: args.hour,
            timestamp: Some(timestamp),
            location_type,
            sensitivity: args.sensitivity,
        };
        let assessment = engine.calculate_risk(frame, Some(&context))?;
        processed += 1;
        if assessment.calibrating {
            continue;
        }

        motion_patterns.extend(engine.detect_motion_patterns(&poses));
        peak_score = peak_score.max(assessment.score);
        if assessment.score > args.alert_threshold {
            alerts += 1;
            alert_marks.push((assessment.timestamp, assessment.score));
            let record = FrameAlert {
                frame_index: index,
                timestamp_seconds: assessment.timestamp,
                alert: engine.generate_alert(assessment.score, &assessment.factors),
            };
            serde_json::to_writer(&mut out, &record)?;
            writeln!(out)?;
        }
    }

    let stats = detector.stats();
    log::info!(
        "{} replayed {} frames from {} ({} scored, {} alerts)",
        detector.name(),
        stats.frames_read,
        stats.source,
        processed,
        alerts
    );

    let summary = Summary {
        source: stats.source.clone(),
        frames_read: stats.frames_read,
        frames_processed: processed,
        alerts,
        peak_score,
        significant_risk: significant_risk_markers(alert_marks),
        peak_persons,
        crowd_limit: engine.crowd_limit(),
        motion_patterns: motion_patterns.iter().map(ToString::to_string).collect(),
    };
    serde_json::to_writer(&mut out, &summary)?;
    writeln!(out)?;
    Ok(())
}
