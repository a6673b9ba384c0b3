use std::io::Cursor;

use anyhow::Result;

use sentinel_risk::{
    generate_alert, AlertLevel, BBox, DetectionFrame, Detector, EngineConfig, JsonLinesDetector,
    LocationType, ObjectDetection, PoseDetection, RiskEngine, RiskFactor, RiskFactors,
    ScoringContext, ScriptedDetector, WeaponDetection,
};

const FRAME_SECS: f64 = 1.0 / 30.0;

fn pose(bbox: BBox, track_id: Option<i64>) -> PoseDetection {
    PoseDetection {
        bbox,
        track_id,
        ..PoseDetection::default()
    }
}

fn knife_frame(timestamp: f64) -> DetectionFrame {
    let mut frame = DetectionFrame::at(timestamp);
    frame
        .objects
        .push(ObjectDetection::new("knife", 0.9, BBox::new(200.0, 200.0, 240.0, 300.0)));
    frame
}

fn assert_in_bounds(score: f64, factors: &RiskFactors) {
    assert!((0.0..=100.0).contains(&score), "score {} out of range", score);
    for (factor, value) in factors.iter() {
        assert!((0.0..=1.0).contains(&value), "{} = {} out of range", factor, value);
    }
}

#[test]
fn calibration_window_reports_nothing() -> Result<()> {
    let mut engine = RiskEngine::new(EngineConfig::default());
    for i in 0..30 {
        let mut frame = knife_frame(i as f64);
        frame.poses.push(pose(BBox::new(0.0, 0.0, 50.0, 150.0), Some(1)));
        let assessment = engine.calculate_risk(frame, None)?;
        assert!(assessment.calibrating);
        assert_eq!(assessment.score, 0.0);
        assert!(assessment.factors.is_zero());
    }
    assert!(!engine.is_calibrated());

    let first_scored = engine.calculate_risk(knife_frame(30.0), None)?;
    assert!(!first_scored.calibrating);
    assert!(first_scored.score >= 80.0);
    Ok(())
}

#[test]
fn knife_escalates_with_calibration_bypassed() -> Result<()> {
    let mut engine = RiskEngine::new(EngineConfig::bypassed());
    let assessment = engine.calculate_risk(knife_frame(0.0), None)?;
    assert!(assessment.weapon_escalated);
    assert_eq!(assessment.factors.get(RiskFactor::WeaponDetection), 0.9);
    assert!(assessment.score >= 80.0, "score {}", assessment.score);
    Ok(())
}

#[test]
fn weapon_model_detections_escalate_too() -> Result<()> {
    let mut engine = RiskEngine::new(EngineConfig::bypassed());
    let mut frame = DetectionFrame::at(0.0);
    frame.weapons.push(WeaponDetection {
        confidence: 0.35,
        bbox: BBox::default(),
    });
    assert!(engine.calculate_risk(frame, None)?.score >= 80.0);
    Ok(())
}

#[test]
fn weapon_alert_holds_for_smoothing_window() -> Result<()> {
    let mut engine = RiskEngine::new(EngineConfig::bypassed());
    let window = engine.config().smoothing_window;
    for i in 0..10 {
        engine.calculate_risk(DetectionFrame::at(i as f64 * FRAME_SECS), None)?;
    }
    let armed = engine.calculate_risk(knife_frame(10.0 * FRAME_SECS), None)?;
    assert!(armed.score >= 80.0);

    for i in 0..window {
        let t = (11 + i) as f64 * FRAME_SECS;
        let assessment = engine.calculate_risk(DetectionFrame::at(t), None)?;
        assert!(assessment.score >= 80.0, "frame {} after weapon: {}", i, assessment.score);
    }
    Ok(())
}

#[test]
fn stationary_tracked_person_loiters() -> Result<()> {
    let mut engine = RiskEngine::new(EngineConfig::bypassed());
    let bbox = BBox::new(300.0, 200.0, 400.0, 600.0);
    let mut last = None;
    for i in 0..=180 {
        let mut frame = DetectionFrame::at(i as f64 * FRAME_SECS);
        frame
            .objects
            .push(ObjectDetection::new("person", 0.9, bbox).with_track(4));
        frame.poses.push(pose(bbox, None));
        last = Some(engine.calculate_risk(frame, None)?);
    }
    let last = last.expect("frames scored");
    assert!(last.factors.get(RiskFactor::Loitering) > 0.8);
    assert_eq!(engine.tracked_count(), 1);
    Ok(())
}

#[test]
fn distant_backpack_is_unattended() -> Result<()> {
    let mut engine = RiskEngine::new(EngineConfig::bypassed());
    let mut frame = DetectionFrame::at(0.0);
    frame.poses.push(pose(BBox::new(80.0, 80.0, 180.0, 400.0), None));
    frame
        .objects
        .push(ObjectDetection::new("backpack", 0.8, BBox::new(500.0, 300.0, 550.0, 350.0)));
    let assessment = engine.calculate_risk(frame, None)?;
    assert!(assessment.factors.get(RiskFactor::UnattendedObject) > 0.8);
    Ok(())
}

#[test]
fn crowd_density_uses_calibrated_limit() -> Result<()> {
    let mut engine = RiskEngine::new(EngineConfig::default());
    let crowd = |n: usize, t: f64| {
        let mut frame = DetectionFrame::at(t);
        frame.poses = (0..n)
            .map(|i| pose(BBox::new(i as f64 * 60.0, 0.0, i as f64 * 60.0 + 40.0, 120.0), None))
            .collect();
        frame
    };
    for t in 0..30 {
        engine.calculate_risk(crowd(5, t as f64), None)?;
    }
    let assessment = engine.calculate_risk(crowd(20, 30.0), None)?;
    assert!(engine.is_calibrated());
    assert_eq!(engine.crowd_limit(), 10);
    assert_eq!(engine.baseline().crowd_limit, Some(10));
    assert!(assessment.factors.get(RiskFactor::CrowdDensity) > 0.8);
    Ok(())
}

#[test]
fn scores_and_factors_stay_in_bounds() -> Result<()> {
    let mut engine = RiskEngine::new(EngineConfig::bypassed());
    let ctx = ScoringContext {
        hour: Some(23),
        location_type: Some(LocationType::SecureFacility),
        sensitivity: Some(5.0),
        ..ScoringContext::default()
    };
    for i in 0..60 {
        let mut frame = DetectionFrame::at(i as f64 * FRAME_SECS);
        for k in 0..(i % 7) {
            let x = k as f64 * 30.0;
            frame.poses.push(pose(BBox::new(x, 0.0, x + 40.0, 200.0), Some(k as i64)));
        }
        frame
            .objects
            .push(ObjectDetection::new("suitcase", 0.7, BBox::new(900.0, 0.0, 960.0, 60.0)));
        if i % 11 == 0 {
            frame.weapons.push(WeaponDetection {
                confidence: 1.5,
                bbox: BBox::default(),
            });
        }
        let assessment = engine.calculate_risk(frame, Some(&ctx))?;
        assert_in_bounds(assessment.score, &assessment.factors);
    }
    Ok(())
}

#[test]
fn night_never_lowers_contextual_risk() -> Result<()> {
    let contextual = |hour: u8| -> Result<f64> {
        let mut engine = RiskEngine::new(EngineConfig::bypassed());
        let assessment =
            engine.calculate_risk(DetectionFrame::at(0.0), Some(&ScoringContext::at_hour(hour)))?;
        Ok(assessment.factors.get(RiskFactor::Contextual))
    };
    let noon = contextual(12)?;
    let night = contextual(1)?;
    assert!(night >= noon);
    assert_eq!(night, 0.4);
    Ok(())
}

#[test]
fn alerts_are_pure_and_match_level_table() {
    let factors = RiskFactors::zeroed()
        .with(RiskFactor::AggressivePosture, 0.8)
        .with(RiskFactor::ProximityViolation, 0.6);
    let engine = RiskEngine::new(EngineConfig::bypassed());
    assert_eq!(engine.generate_alert(62.0, &factors), engine.generate_alert(62.0, &factors));

    for (score, level) in [
        (24.9, AlertLevel::Low),
        (25.0, AlertLevel::Medium),
        (50.0, AlertLevel::High),
        (75.0, AlertLevel::Critical),
    ] {
        let alert = generate_alert(score, &factors);
        assert_eq!(alert.level, level);
        assert_eq!(AlertLevel::from_score(alert.score), alert.level);
    }
}

#[test]
fn replayed_dump_drives_engine() -> Result<()> {
    let dump = concat!(
        r#"{"timestamp": 0.0, "objects": [{"class": "handbag", "bbox": [10, 10, 30, 30]}]}"#,
        "\n\n",
        r#"{"timestamp": 0.1, "objects": [{"class": "knife", "confidence": 0.95, "#,
        r#""bbox": [0, 0, 5, 20]}]}"#,
        "\n",
    );
    let mut detector =
        JsonLinesDetector::from_reader(Cursor::new(dump.as_bytes().to_vec()), "dump");
    let mut engine = RiskEngine::new(EngineConfig::bypassed());

    let mut scores = Vec::new();
    while let Some(frame) = detector.next_frame()? {
        scores.push(engine.calculate_risk(frame, None)?.score);
    }
    assert_eq!(scores.len(), 2);
    assert!(scores[0] < 25.0);
    assert!(scores[1] >= 80.0);
    assert_eq!(detector.stats().frames_read, 2);
    Ok(())
}

#[test]
fn malformed_detections_do_not_sink_the_frame() -> Result<()> {
    let frame = DetectionFrame::from_json(
        r#"{
            "timestamp": 0.0,
            "objects": [{"class": "knife", "confidence": 0.9, "bbox": [0, 0, 5, 20]},
                        {"class": "person"},
                        {"class": "suitcase", "confidence": 0.8, "bbox": [10, 10, 40]}],
            "weapons": [{"bbox": [0, 0, 5, 5]}],
            "poses": [{"keypoints": [[3, 4], [5]], "bbox": [0, 0, 50, 150]}]
        }"#,
    )?;
    let mut engine = RiskEngine::new(EngineConfig::bypassed());
    let assessment = engine.calculate_risk(frame, None)?;
    assert!(assessment.score >= 80.0, "score {}", assessment.score);
    assert_eq!(assessment.factors.get(RiskFactor::WeaponDetection), 0.9);
    assert_eq!(assessment.factors.iter().count(), 7);
    assert_in_bounds(assessment.score, &assessment.factors);

    assert!(DetectionFrame::from_json("[1, 2, 3]").is_err());
    assert!(DetectionFrame::from_json("\"frame\"").is_err());
    Ok(())
}

#[test]
fn replay_keeps_going_past_a_broken_detection() -> Result<()> {
    let dump = concat!(
        r#"{"timestamp": 0.0, "objects": [{"class": "person"}]}"#,
        "\n",
        r#"{"timestamp": 0.1, "weapons": [{"confidence": 0.8}]}"#,
        "\n",
    );
    let mut detector =
        JsonLinesDetector::from_reader(Cursor::new(dump.as_bytes().to_vec()), "dump");
    let mut engine = RiskEngine::new(EngineConfig::bypassed());

    let first = detector.next_frame()?.expect("first frame");
    assert!(first.objects.is_empty());
    assert_eq!(engine.calculate_risk(first, None)?.score, 0.0);

    let second = detector.next_frame()?.expect("second frame");
    assert!(engine.calculate_risk(second, None)?.score >= 80.0);
    assert!(detector.next_frame()?.is_none());
    Ok(())
}

#[test]
fn scripted_frames_track_motion() -> Result<()> {
    let frames = (0..15).map(|i| {
        let mut frame = DetectionFrame::at(i as f64 * 0.1);
        let x = if i % 2 == 0 { 100.0 } else { 140.0 };
        frame
            .poses
            .push(pose(BBox::new(x, 0.0, x + 50.0, 100.0), Some(9)));
        frame
    });
    let mut detector = ScriptedDetector::new(frames);
    let mut engine = RiskEngine::new(EngineConfig::bypassed());
    let mut last_poses = Vec::new();
    while let Some(frame) = detector.next_frame()? {
        last_poses = frame.poses.clone();
        engine.calculate_risk(frame, None)?;
    }
    let labels: Vec<String> = engine
        .detect_motion_patterns(&last_poses)
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(labels, ["Erratic movement pattern (Track 9)"]);
    Ok(())
}
