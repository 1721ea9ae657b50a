/// Integration tests for the complete gait analysis pipeline.
/// Feeds realistic landmark sequences end to end and checks the phase,
/// classification and aggregate guarantees.

#[cfg(test)]
mod integration_tests {
    use crate::aggregate::calculate_stride_frequency;
    use crate::classifier::FootStrikeClassifier;
    use crate::config::GaitConfig;
    use crate::pipeline::*;
    use crate::types::*;
    use crate::velocity::VelocityTracker;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;
    use std::f64::consts::PI;

    const W: u32 = 1280;
    const H: u32 = 720;
    const FPS: f64 = 30.0;

    /// Helper: normalized point from pixel coordinates
    fn px(x: f64, y: f64, visibility: f64) -> LandmarkPoint {
        LandmarkPoint::new(x / W as f64, y / H as f64, 0.0, visibility)
    }

    /// Helper: frame holding the four foot-strike landmarks of the right side
    fn strike_frame(heel: (f64, f64), toe: (f64, f64), ankle: (f64, f64), knee: (f64, f64)) -> LandmarkFrame {
        LandmarkFrame::new(0, W, H)
            .with(Landmark::RightHeel, px(heel.0, heel.1, 0.9))
            .with(Landmark::RightFootIndex, px(toe.0, toe.1, 0.9))
            .with(Landmark::RightAnkle, px(ankle.0, ankle.1, 0.9))
            .with(Landmark::RightKnee, px(knee.0, knee.1, 0.9))
    }

    /// Helper: normalized ankle height of a runner with a 20-frame stride:
    /// 10 frames planted at 0.8, then a half-sine swing 0.1 high
    fn ankle_height(n: u64) -> f64 {
        let k = n % 20;
        if k < 10 {
            0.8
        } else {
            0.8 - 0.1 * (PI * (k - 10) as f64 / 10.0).sin()
        }
    }

    /// Helper: one side of a heel-striking runner at frame `n`
    fn add_leg(frame: LandmarkFrame, side: Side, x: f64, ankle_y: f64) -> LandmarkFrame {
        let ay = ankle_y * H as f64;
        frame
            .with(side.landmark(Joint::Shoulder), px(x - 5.0, 200.0, 0.95))
            .with(side.landmark(Joint::Hip), px(x, 380.0, 0.95))
            .with(side.landmark(Joint::Knee), px(x + 3.0, ay - 40.0, 0.9))
            .with(side.landmark(Joint::Ankle), px(x, ay, 0.9))
            .with(side.landmark(Joint::Heel), px(x - 5.0, ay + 40.0, 0.9))
            .with(side.landmark(Joint::Toe), px(x + 5.0, ay + 20.0, 0.9))
    }

    /// Helper: right-side running sequence
    fn running_sequence(frames: u64) -> Vec<LandmarkFrame> {
        (0..frames)
            .map(|n| add_leg(LandmarkFrame::new(n, W, H), Side::Right, 505.0, ankle_height(n)))
            .collect()
    }

    /// Helper: Run analyzer over frames and collect all outputs
    fn run_analyzer(analyzer: &mut GaitAnalyzer, frames: &[LandmarkFrame]) -> Vec<FrameAnalysis> {
        frames.iter().map(|f| analyzer.process_frame(f)).collect()
    }

    fn contact_frames(analyses: &[FrameAnalysis], side: Side) -> Vec<u64> {
        analyses
            .iter()
            .flat_map(|a| a.updates.iter())
            .filter(|u| u.side == side && u.classification.is_some())
            .map(|u| u.frame_number)
            .collect()
    }

    // ============================================================================
    // FOOT STRIKE CLASSIFICATION
    // ============================================================================

    #[test]
    fn test_heel_strike_contact() {
        let frame = strike_frame((100.0, 190.0), (110.0, 180.0), (105.0, 160.0), (108.0, 120.0));
        let result = FootStrikeClassifier::default().classify_frame(&frame, Side::Right);

        assert_eq!(result.gait_type, GaitType::HeelStrike);
        assert!(result.confidence >= 70.0);
        assert_abs_diff_eq!(result.confidence, 77.5, epsilon = 1e-9);

        let m = result.measurements.unwrap();
        assert_abs_diff_eq!(m.vertical_ratio.unwrap(), 190.0 / 180.0, epsilon = 1e-9);
        assert_abs_diff_eq!(m.horizontal_offset_px, 2.0, epsilon = 1e-9);
        assert_eq!(result.biomechanical_scores[&Criterion::HorizontalOffset], 0.0);
        assert_eq!(result.biomechanical_scores[&Criterion::VerticalRatio], 1.0);
    }

    #[test]
    fn test_raised_heel_scores_forefoot_ratio() {
        // Same foot with the heel lifted: the ratio criterion flips to the
        // forefoot side, while the open ankle angle still points to the heel,
        // so the overall call is midfoot.
        let frame = strike_frame((100.0, 150.0), (110.0, 185.0), (105.0, 160.0), (108.0, 120.0));
        let result = FootStrikeClassifier::default().classify_frame(&frame, Side::Right);

        let m = result.measurements.unwrap();
        assert!(m.vertical_ratio.unwrap() <= 0.95);
        assert_eq!(result.biomechanical_scores[&Criterion::VerticalRatio], -1.0);
        assert_eq!(result.gait_type, GaitType::MidfootStrike);
        assert_abs_diff_eq!(result.confidence, 60.0, epsilon = 1e-9);
    }

    #[test]
    fn test_low_visibility_heel_unknown() {
        let mut frame = strike_frame((100.0, 190.0), (110.0, 180.0), (105.0, 160.0), (108.0, 120.0));
        frame.set(Landmark::RightHeel, px(100.0, 190.0, 0.3));

        let result = FootStrikeClassifier::default().classify_frame(&frame, Side::Right);
        assert_eq!(result.gait_type, GaitType::Unknown);
        assert_eq!(result.confidence, 0.0);
        assert!(result.reasoning.contains("low visibility"), "{}", result.reasoning);
        assert!(result.reasoning.contains("right_heel"));
    }

    #[test]
    fn test_zero_dt_velocity() {
        let mut tracker = VelocityTracker::default();
        tracker.update(PixelPoint::new(100.0, 400.0), 2.0);
        let v = tracker.update(PixelPoint::new(140.0, 460.0), 2.0).unwrap();
        assert_eq!(v.velocity_x, 0.0);
        assert_eq!(v.velocity_y, 0.0);
    }

    #[test]
    fn test_cadence_180_spm() {
        // 180 steps/min at 30 fps = one ankle minimum every 10 frames
        let series: Vec<f64> = (0..300)
            .map(|i| 0.75 + 0.05 * (2.0 * PI * i as f64 / 10.0).sin())
            .collect();
        let spm = calculate_stride_frequency(&series, FPS).unwrap();
        assert!((spm - 180.0).abs() <= 5.0, "got {spm}");
    }

    // ============================================================================
    // END-TO-END SEQUENCES
    // ============================================================================

    #[test]
    fn test_running_sequence_contacts_and_cycles() {
        let mut analyzer = GaitAnalyzer::new(GaitConfig::default()).unwrap();
        let analyses = run_analyzer(&mut analyzer, &running_sequence(300));

        // first contact as soon as velocity exists, then one per stride
        let contacts = contact_frames(&analyses, Side::Right);
        assert_eq!(contacts.len(), 15);
        assert_eq!(contacts[0], 1);
        for pair in contacts[1..].windows(2) {
            assert_eq!(pair[1] - pair[0], 20, "contacts {contacts:?}");
        }

        let report = analyzer.report();
        let stats = report.sides[0].statistics;
        assert_eq!(stats.total_contacts, 15);
        assert_eq!(stats.total_cycles, 15);
        assert_eq!(stats.success_rate, 100.0);
        assert_abs_diff_eq!(stats.average_confidence, 77.5, epsilon = 1e-9);
        assert_eq!(report.dominant_gait_type, GaitType::HeelStrike);
        assert_eq!(report.detection_rate, 100.0);
        assert!(report.meets_detection_target);
        assert_eq!(report.outliers_rejected, 0);
    }

    #[test]
    fn test_running_sequence_cadence() {
        let mut analyzer = GaitAnalyzer::new(GaitConfig::default()).unwrap();
        run_analyzer(&mut analyzer, &running_sequence(300));

        // one swing every 20 frames at 30 fps
        let cadence = analyzer.report().cadence_spm.unwrap();
        assert!((cadence - 90.0).abs() <= 5.0, "got {cadence}");
    }

    #[test]
    fn test_running_sequence_angles() {
        let mut analyzer = GaitAnalyzer::new(GaitConfig::default()).unwrap();
        run_analyzer(&mut analyzer, &running_sequence(60));
        let angles = analyzer.report().average_angles;

        assert!(angles.knee_right.is_some());
        assert!(angles.ankle_right.is_some());
        assert!(angles.hip_right.is_some());
        assert!(angles.knee_left.is_none());
        let trunk = angles.trunk.unwrap();
        assert!((0.0..10.0).contains(&trunk), "trunk lean {trunk}");
    }

    #[test]
    fn test_phase_order_on_running_sequence() {
        let mut analyzer = GaitAnalyzer::new(GaitConfig::default()).unwrap();
        let analyses = run_analyzer(&mut analyzer, &running_sequence(300));

        let mut seen = Vec::new();
        for update in analyses.iter().flat_map(|a| a.updates.iter()) {
            if update.transitioned() {
                assert_eq!(update.phase, update.previous_phase.next());
                seen.push(update.phase);
            }
        }
        assert_eq!(
            &seen[..4],
            &[GaitPhase::Contact, GaitPhase::Stance, GaitPhase::ToeOff, GaitPhase::Swing]
        );
    }

    #[test]
    fn test_both_sides_alternating() {
        let config = GaitConfig {
            sides: Side::BOTH.to_vec(),
            ..GaitConfig::default()
        };
        let mut analyzer = GaitAnalyzer::new(config).unwrap();

        // left foot half a stride behind the right
        let frames: Vec<LandmarkFrame> = (0..300)
            .map(|n| {
                let frame = LandmarkFrame::new(n, W, H);
                let frame = add_leg(frame, Side::Right, 505.0, ankle_height(n));
                add_leg(frame, Side::Left, 705.0, ankle_height(n + 10))
            })
            .collect();
        let analyses = run_analyzer(&mut analyzer, &frames);

        assert_eq!(contact_frames(&analyses, Side::Right).len(), 15);
        assert_eq!(contact_frames(&analyses, Side::Left).len(), 15);

        let report = analyzer.report();
        assert_eq!(report.sides.len(), 2);
        assert_eq!(report.sides[0].side, Side::Left);
        assert_eq!(report.dominant_gait_type, GaitType::HeelStrike);
        for side in &report.sides {
            let cadence = side.cadence_spm.unwrap();
            assert!((cadence - 90.0).abs() <= 5.0, "{}: {cadence}", side.side);
        }
    }

    #[test]
    fn test_tracking_glitch_is_rejected() {
        let clean = running_sequence(120);
        let mut glitched = clean.clone();
        // ankle jumps to the top of the frame mid-stance
        let ankle = *glitched[48].get(Landmark::RightAnkle).unwrap();
        glitched[48].set(Landmark::RightAnkle, LandmarkPoint { y: 0.2, ..ankle });

        let mut analyzer = GaitAnalyzer::new(GaitConfig::default()).unwrap();
        let expected = contact_frames(&run_analyzer(&mut analyzer, &clean), Side::Right);

        let mut analyzer = GaitAnalyzer::new(GaitConfig::default()).unwrap();
        let actual = contact_frames(&run_analyzer(&mut analyzer, &glitched), Side::Right);

        assert_eq!(actual, expected);
        assert_eq!(analyzer.outliers_rejected(), 1);
    }

    #[test]
    fn test_dropouts_lower_detection_rate() {
        let mut frames = running_sequence(100);
        for frame in frames.iter_mut().skip(5).step_by(10) {
            frame.remove(Landmark::RightHeel);
        }
        let mut analyzer = GaitAnalyzer::new(GaitConfig::default()).unwrap();
        let analyses = run_analyzer(&mut analyzer, &frames);

        let skipped = analyses.iter().filter(|a| a.updates[0].skipped).count();
        assert_eq!(skipped, 10);
        assert_abs_diff_eq!(analyzer.detection_rate(), 90.0, epsilon = 1e-9);
    }

    #[test]
    fn test_adaptive_smoothing_sequence() {
        let config = GaitConfig::from_toml_str("[smoothing]\nadaptive = true").unwrap();
        let mut analyzer = GaitAnalyzer::new(config).unwrap();
        let analyses = run_analyzer(&mut analyzer, &running_sequence(300));

        let contacts = contact_frames(&analyses, Side::Right);
        assert!(contacts.len() >= 10, "contacts {contacts:?}");
        assert_eq!(analyzer.report().dominant_gait_type, GaitType::HeelStrike);
    }

    // ============================================================================
    // DETERMINISM & RESET
    // ============================================================================

    #[test]
    fn test_deterministic_output() {
        let frames = running_sequence(200);
        let mut a = GaitAnalyzer::new(GaitConfig::default()).unwrap();
        let mut b = GaitAnalyzer::new(GaitConfig::default()).unwrap();
        assert_eq!(run_analyzer(&mut a, &frames), run_analyzer(&mut b, &frames));
    }

    #[test]
    fn test_reset_replays_identically() {
        let frames = running_sequence(200);
        let mut analyzer = GaitAnalyzer::new(GaitConfig::default()).unwrap();
        let first = run_analyzer(&mut analyzer, &frames);
        let first_stats = analyzer.statistics(Side::Right);

        analyzer.reset();
        let second = run_analyzer(&mut analyzer, &frames);
        assert_eq!(first, second);
        assert_eq!(analyzer.statistics(Side::Right), first_stats);
    }

    // ============================================================================
    // PROPERTIES
    // ============================================================================

    fn arb_frame() -> impl Strategy<Value = (f64, f64, bool)> {
        (0.0..1.0f64, 0.0..1.0f64, any::<bool>())
    }

    proptest! {
        #[test]
        fn prop_phases_follow_cycle(steps in prop::collection::vec(arb_frame(), 1..250)) {
            let mut analyzer = GaitAnalyzer::new(GaitConfig::default()).unwrap();
            for (n, (ankle_y, visibility, drop_heel)) in steps.into_iter().enumerate() {
                let mut frame = add_leg(LandmarkFrame::new(n as u64, W, H), Side::Right, 505.0, ankle_y);
                if drop_heel {
                    frame.remove(Landmark::RightHeel);
                }
                let mut ankle = *frame.get(Landmark::RightAnkle).unwrap();
                ankle.visibility = visibility;
                frame.set(Landmark::RightAnkle, ankle);

                let analysis = analyzer.process_frame(&frame);
                let update = &analysis.updates[0];
                prop_assert!(
                    update.phase == update.previous_phase || update.phase == update.previous_phase.next()
                );
                let entered_contact =
                    update.previous_phase == GaitPhase::Swing && update.phase == GaitPhase::Contact;
                prop_assert_eq!(update.classification.is_some(), entered_contact);
                if update.skipped {
                    prop_assert!(!update.transitioned());
                }
            }
            let stats = analyzer.statistics(Side::Right).unwrap();
            prop_assert!(stats.successful_classifications <= stats.total_contacts);
            prop_assert!((0.0..=100.0).contains(&stats.success_rate));
        }

        #[test]
        fn prop_confidence_bounded(
            coords in prop::array::uniform8(0.0..1000.0f64),
            visibility in 0.0..1.0f64,
        ) {
            let [hx, hy, tx, ty, ax, ay, kx, ky] = coords;
            let mut frame = strike_frame((hx, hy), (tx, ty), (ax, ay), (kx, ky));
            frame.set(Landmark::RightHeel, px(hx, hy, visibility));

            let result = FootStrikeClassifier::default().classify_frame(&frame, Side::Right);
            prop_assert!((0.0..=100.0).contains(&result.confidence));
            if result.gait_type == GaitType::Unknown {
                prop_assert_eq!(result.confidence, 0.0);
            } else {
                prop_assert!(result.confidence >= 60.0);
            }
        }
    }
}
