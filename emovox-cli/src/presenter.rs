//! Terminal rendering of prediction results.

use emovox_core::{PredictionHistory, PredictionResult};

const BAR_WIDTH: usize = 30;

/// Print one prediction: winning label, confidence when available, and a
/// bar chart of the three most probable emotions.
pub fn print_result(result: &PredictionResult) {
    match result.confidence {
        Some(c) => println!("predicted: {} ({:.1}%)", result.emotion, c * 100.0),
        None => println!("predicted: {}", result.emotion),
    }

    for (emotion, p) in result.top(3) {
        let filled = (p * BAR_WIDTH as f64).round() as usize;
        println!(
            "  {:<9} {:>5.1}%  {}",
            emotion.as_str(),
            p * 100.0,
            "█".repeat(filled.min(BAR_WIDTH))
        );
    }
}

/// Print the recent prediction window and its dominant emotion.
pub fn print_history(history: &PredictionHistory) {
    if history.is_empty() {
        return;
    }
    let recent: Vec<&str> = history.iter().map(|r| r.emotion.as_str()).collect();
    match history.dominant() {
        Some(dominant) => println!("recent: {} (dominant: {dominant})", recent.join(", ")),
        None => println!("recent: {}", recent.join(", ")),
    }
}
