//! Load-cell conversions used when characterising a thruster on the bench.

/// Lever arm between the thruster axis and the load cell, in metres.
pub const MOMENT_ARM: f64 = 0.464;

/// Thrust implied by a load-cell force reading taken through the lever arm.
pub fn thrust_from_force(force: f64) -> f64 {
    force * MOMENT_ARM
}

/// Parses a raw load-cell line such as `"= 1.234\r\n"`.
///
/// The cell prefixes each reading with two framing bytes and terminates it
/// with CR LF. Unparseable lines read as zero force, matching how the bench
/// treats a dropped sample.
pub fn parse_force_line(line: &str) -> f64 {
    line.get(2..line.len().saturating_sub(2))
        .and_then(|v| v.trim().parse::<f64>().ok())
        .unwrap_or(0.0)
}
