//! Progress bars for instrument loops.

use indicatif::{ProgressBar, ProgressStyle};
use pbval::InstrumentOutcome;
use std::time::Duration;

/// Bar for `len` instruments in the house style.
pub(crate) fn instrument_bar(len: u64, message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .map_or_else(|_| ProgressStyle::default_bar(), |s| s.progress_chars("█▓░"));
    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(message);
    pb
}

/// Advance `pb` for one finished instrument.
pub(crate) fn record(pb: &ProgressBar, code: &str, outcome: &InstrumentOutcome) {
    let status = match outcome {
        InstrumentOutcome::Succeeded(series) if series.source.used_network() => "fetched",
        InstrumentOutcome::Succeeded(_) => "cached",
        InstrumentOutcome::Failed(_) | InstrumentOutcome::Invalid(_) => "failed",
    };
    pb.set_message(format!("{} {}", code, status));
    pb.inc(1);
}
