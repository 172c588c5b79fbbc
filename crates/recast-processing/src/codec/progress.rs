//! Parsing of FFmpeg `-progress` key/value output.

/// One meaningful line of `-progress` output
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressLine {
    /// Output timestamp in seconds
    OutTime(f64),
    /// `progress=end`
    End,
}

/// Parse a `-progress` line. Unknown keys and `N/A` values yield `None`.
pub fn parse_progress_line(line: &str) -> Option<ProgressLine> {
    let line = line.trim();

    // out_time_ms is also in microseconds.
    if let Some(value) = line
        .strip_prefix("out_time_us=")
        .or_else(|| line.strip_prefix("out_time_ms="))
    {
        let micros: i64 = value.parse().ok()?;
        return Some(ProgressLine::OutTime(micros.max(0) as f64 / 1_000_000.0));
    }

    if line == "progress=end" {
        return Some(ProgressLine::End);
    }

    None
}

/// Fraction complete for an output timestamp against the input duration.
pub fn fraction(out_time_secs: f64, duration_secs: Option<f64>) -> Option<f64> {
    match duration_secs {
        Some(duration) if duration > 0.0 => Some((out_time_secs / duration).clamp(0.0, 1.0)),
        _ => None,
    }
}

/// Whether an FFmpeg error line points at the input rather than the encoder.
pub fn is_input_error(line: &str) -> bool {
    const INPUT_MARKERS: [&str; 7] = [
        "Invalid data found when processing input",
        "could not find codec parameters",
        "moov atom not found",
        "Error opening input",
        "Error while decoding",
        "does not contain any stream",
        "Invalid NAL unit",
    ];
    INPUT_MARKERS.iter().any(|m| line.contains(m))
}
