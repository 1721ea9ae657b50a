/// Basic usage example: feed landmark frames, get phases and foot strikes
use std::f64::consts::PI;

use gait_core::types::Joint;
use gait_core::{GaitAnalyzer, GaitConfig, LandmarkFrame, LandmarkPoint, SessionReport, Side};

const WIDTH: u32 = 1280;
const HEIGHT: u32 = 720;

fn main() -> Result<(), gait_core::ConfigError> {
    println!("=== Gait Analysis Core: Basic Example ===\n");

    // Default config: 30 fps, right side, fixed smoothing
    let mut analyzer = GaitAnalyzer::new(GaitConfig::default())?;

    // Simulate 4 seconds of a runner filmed from the right
    let frames: Vec<LandmarkFrame> = (0..120).map(runner_frame).collect();
    println!("Processing {} frames...\n", frames.len());

    for frame in &frames {
        let analysis = analyzer.process_frame(frame);

        for update in analysis.updates.iter().filter(|u| u.transitioned()) {
            println!(
                "frame {:>3} ({:.2}s) {:>5}: {} -> {}",
                update.frame_number, analysis.timestamp_s, update.side, update.previous_phase, update.phase
            );
            if let Some(classification) = &update.classification {
                println!(
                    "          {} at {:.1}% confidence\n          {}",
                    classification.gait_type, classification.confidence, classification.reasoning
                );
            }
        }
    }

    print_report(&analyzer.report());
    Ok(())
}

/// Right leg of a runner with a 20-frame stride: 10 frames planted, then a
/// half-sine swing.
fn runner_frame(n: u64) -> LandmarkFrame {
    let k = n % 20;
    let ankle_y = if k < 10 {
        576.0
    } else {
        576.0 - 72.0 * (PI * (k - 10) as f64 / 10.0).sin()
    };
    let px = |x: f64, y: f64| LandmarkPoint::new(x / WIDTH as f64, y / HEIGHT as f64, 0.0, 0.9);

    let side = Side::Right;
    LandmarkFrame::new(n, WIDTH, HEIGHT)
        .with(side.landmark(Joint::Shoulder), px(500.0, 200.0))
        .with(side.landmark(Joint::Hip), px(505.0, 380.0))
        .with(side.landmark(Joint::Knee), px(508.0, ankle_y - 40.0))
        .with(side.landmark(Joint::Ankle), px(505.0, ankle_y))
        .with(side.landmark(Joint::Heel), px(500.0, ankle_y + 40.0))
        .with(side.landmark(Joint::Toe), px(510.0, ankle_y + 20.0))
}

fn print_report(report: &SessionReport) {
    println!("\n=== Summary ===");
    println!("Frames processed: {}", report.frames_processed);
    println!("Detection rate:   {:.1}%", report.detection_rate);
    println!("Dominant strike:  {}", report.dominant_gait_type);
    match report.cadence_spm {
        Some(spm) => println!("Cadence:          {:.0} steps/min", spm),
        None => println!("Cadence:          not enough data"),
    }
    if let Some(knee) = report.average_angles.knee_right {
        println!("Mean knee angle:  {:.1}°", knee);
    }
    for side in &report.sides {
        let stats = side.statistics;
        println!(
            "{}: {} contacts, {} cycles, {:.0}% classified, avg confidence {:.1}",
            side.side, stats.total_contacts, stats.total_cycles, stats.success_rate, stats.average_confidence
        );
    }
}
