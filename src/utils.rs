use crate::error::{CriticError, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use std::time::Duration;

/// Random delay drawn uniformly from `[floor, ceiling]` seconds.
pub fn random_delay<R: Rng + ?Sized>(rng: &mut R, floor: f64, ceiling: f64) -> Result<Duration> {
    if !(floor >= 0.0 && floor <= ceiling && ceiling.is_finite()) {
        return Err(CriticError::Other(format!(
            "Expected 0 <= floor <= ceiling, got floor: {floor}, ceiling: {ceiling}"
        )));
    }

    Ok(Duration::from_secs_f64(rng.gen_range(floor..=ceiling)))
}

/// Renders `numerator / denominator` as a percentage string, e.g. `12.50 %`.
pub fn percentage(numerator: usize, denominator: usize, precision: usize) -> String {
    let percent = if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64 * 100.0
    };
    format!("{percent:.precision$} %")
}

/// Shows a per-second countdown on the terminal while waiting.
pub async fn countdown(duration: Duration) {
    let seconds = duration.as_secs();
    if seconds == 0 {
        tokio::time::sleep(duration).await;
        return;
    }

    let bar = ProgressBar::new(seconds);
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );

    for remaining in (1..=seconds).rev() {
        let unit = if remaining == 1 { "second" } else { "seconds" };
        bar.set_message(format!("{remaining:4} {unit} remaining"));
        bar.inc(1);
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    bar.finish_with_message("Complete!");
}
