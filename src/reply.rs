//! Thruster reply decoding.
//!
//! A reply is interpreted at fixed offsets; nothing past byte 18 is read and
//! no checksum is carried. Multi-byte fields are sent low byte first, so the
//! higher offset supplies the more significant byte.

use crate::command::Direction;
use arrayvec::ArrayString;
use core::fmt::{self, Write};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Replies of this length or shorter carry no usable telemetry.
pub const NO_DATA_MAX_LEN: usize = 19;
pub const STATUS_OFFSET: usize = 18;

const ADDRESS_MASK: u8 = 0x1F;
const FIELD_MASK: u16 = 0x3FF;

pub const CURRENT_DIVISOR: f64 = 59.0;
pub const TEMPERATURE_SLOPE: f64 = 146.9 / 200.0;
pub const TEMPERATURE_INTERCEPT: f64 = -245.8415;

const STATUS_REVERSE: u8 = 0x01;
const STATUS_OVER_CURRENT: u8 = 0x02;
const STATUS_OVER_TEMPERATURE: u8 = 0x04;
const STATUS_SPEED_ERROR: u8 = 0x08;
const STATUS_LEAK: u8 = 0x10;

pub const CONDENSED_CAPACITY: usize = 64;

/// How a masked status bit is turned into a fault flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultBitPolicy {
    /// Flag is asserted when the bit is set.
    #[default]
    Nonzero,
    /// Flag is asserted only when `status & mask == 1`. None of the fault
    /// masks include bit 0, so under this policy no fault is ever reported.
    /// Kept for byte-for-byte agreement with logs from older bench tooling.
    LiteralEqualsOne,
}

impl FaultBitPolicy {
    pub fn test(self, status: u8, mask: u8) -> bool {
        match self {
            FaultBitPolicy::Nonzero => status & mask != 0,
            FaultBitPolicy::LiteralEqualsOne => status & mask == 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FaultFlags {
    pub leak: bool,
    pub speed_error: bool,
    pub over_temperature: bool,
    pub over_current: bool,
}

impl FaultFlags {
    pub fn from_status(status: u8, policy: FaultBitPolicy) -> Self {
        Self {
            leak: policy.test(status, STATUS_LEAK),
            speed_error: policy.test(status, STATUS_SPEED_ERROR),
            over_temperature: policy.test(status, STATUS_OVER_TEMPERATURE),
            over_current: policy.test(status, STATUS_OVER_CURRENT),
        }
    }

    pub fn any(&self) -> bool {
        self.leak || self.speed_error || self.over_temperature || self.over_current
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    pub address: u8,
    pub speed: u16,
    pub direction: Direction,
    pub current_amps: f64,
    pub temperature_c: f64,
    #[serde(flatten)]
    pub faults: FaultFlags,
}

impl Telemetry {
    /// `address,speed,direction,current,temperature,leak,speed error,over-temperature,over-current`
    /// with two decimals for current and temperature and `Yes`/`No` flags.
    pub fn condensed(&self) -> CondensedReply {
        let mut buf = ArrayString::new();
        // Every field comes from a bounded bit-field, so the record always fits.
        let written = write!(
            buf,
            "{},{},{},{:.2},{:.2},{},{},{},{}",
            self.address,
            self.speed,
            self.direction,
            self.current_amps,
            self.temperature_c,
            yes_no(self.faults.leak),
            yes_no(self.faults.speed_error),
            yes_no(self.faults.over_temperature),
            yes_no(self.faults.over_current),
        );
        debug_assert!(written.is_ok(), "condensed reply overflowed");
        CondensedReply(buf)
    }

    /// Multi-line operator rendering.
    pub fn report(&self) -> String {
        format!(
            "Thruster Address: {}\n\
             Thruster Speed: {}, in the {} direction\n\
             Motor Current: {:.2}\n\
             Motor Temperature: {:.2}\n\
             Leak: {} | Speed error: {} | Over-temperature: {} | Over-current: {}",
            self.address,
            self.speed,
            self.direction,
            self.current_amps,
            self.temperature_c,
            yes_no(self.faults.leak),
            yes_no(self.faults.speed_error),
            yes_no(self.faults.over_temperature),
            yes_no(self.faults.over_current),
        )
    }

    /// Electrical input power at the given supply voltage.
    pub fn power_watts(&self, supply_voltage: f64) -> f64 {
        supply_voltage * self.current_amps
    }
}

impl fmt::Display for Telemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.report())
    }
}

/// Single-line, comma separated telemetry record for compact logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CondensedReply(ArrayString<CONDENSED_CAPACITY>);

impl CondensedReply {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.split(',')
    }
}

impl fmt::Display for CondensedReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyFormat {
    #[default]
    Structured,
    Condensed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reply {
    /// The buffer is too short to hold a reply; poll again.
    NoData,
    Telemetry(Telemetry),
    Condensed(CondensedReply),
}

impl Reply {
    pub fn is_no_data(&self) -> bool {
        matches!(self, Reply::NoData)
    }
}

/// Stateless reply decoder. The only setting is how fault bits are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplyDecoder {
    policy: FaultBitPolicy,
}

impl ReplyDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: FaultBitPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> FaultBitPolicy {
        self.policy
    }

    pub fn decode(&self, frame: &[u8], format: ReplyFormat) -> Reply {
        match (self.decode_telemetry(frame), format) {
            (None, _) => Reply::NoData,
            (Some(telemetry), ReplyFormat::Structured) => Reply::Telemetry(telemetry),
            (Some(telemetry), ReplyFormat::Condensed) => Reply::Condensed(telemetry.condensed()),
        }
    }

    /// All fields or nothing: `None` when the frame is 19 bytes or shorter.
    pub fn decode_telemetry(&self, frame: &[u8]) -> Option<Telemetry> {
        if frame.len() <= NO_DATA_MAX_LEN {
            debug!(len = frame.len(), "no data in reply");
            return None;
        }

        let status = frame[STATUS_OFFSET];
        let current_raw = u16::from_be_bytes([frame[4], frame[3]]) & FIELD_MASK;
        let temperature_raw = u16::from_be_bytes([frame[6], frame[5]]) & FIELD_MASK;

        let telemetry = Telemetry {
            address: frame[0] & ADDRESS_MASK,
            speed: u16::from_be_bytes([frame[2], frame[1]]),
            direction: Direction::from_bit(status & STATUS_REVERSE),
            current_amps: f64::from(current_raw) / CURRENT_DIVISOR,
            temperature_c: TEMPERATURE_SLOPE * f64::from(temperature_raw) + TEMPERATURE_INTERCEPT,
            faults: FaultFlags::from_status(status, self.policy),
        };
        debug!(
            address = telemetry.address,
            speed = telemetry.speed,
            status,
            "decoded reply"
        );
        Some(telemetry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(status: u8) -> [u8; 20] {
        let mut f = [0u8; 20];
        f[0] = 0x83;
        f[1] = 0x64; // speed 100
        f[3] = 0x32; // current 50
        f[5] = 0xC8; // temperature 200
        f[STATUS_OFFSET] = status;
        f
    }

    #[test]
    fn decodes_fields_low_byte_first() {
        let t = ReplyDecoder::new().decode_telemetry(&frame(0)).unwrap();
        assert_eq!(t.address, 3);
        assert_eq!(t.speed, 100);
        assert_eq!(t.direction, Direction::Forward);
        assert!((t.current_amps - 50.0 / 59.0).abs() < 1e-12);
        assert!((t.temperature_c - (-98.9415)).abs() < 1e-9);
        assert!(!t.faults.any());
    }

    #[test]
    fn ten_bit_fields_are_masked() {
        let mut f = frame(0);
        f[4] = 0xFC; // upper six bits must be dropped
        f[6] = 0xFC;
        let t = ReplyDecoder::new().decode_telemetry(&f).unwrap();
        assert!((t.current_amps - 50.0 / 59.0).abs() < 1e-12);
        assert!((t.temperature_c - (-98.9415)).abs() < 1e-9);
    }

    #[test]
    fn fault_policies() {
        let status = STATUS_LEAK | STATUS_OVER_CURRENT | STATUS_REVERSE;

        let t = ReplyDecoder::new().decode_telemetry(&frame(status)).unwrap();
        assert_eq!(t.direction, Direction::Reverse);
        assert!(t.faults.leak && t.faults.over_current);
        assert!(!t.faults.speed_error && !t.faults.over_temperature);

        let literal = ReplyDecoder::with_policy(FaultBitPolicy::LiteralEqualsOne);
        let t = literal.decode_telemetry(&frame(0xFF)).unwrap();
        assert_eq!(t.faults, FaultFlags::default());
    }

    #[test]
    fn short_frames_are_no_data() {
        let decoder = ReplyDecoder::new();
        assert!(decoder.decode(&[], ReplyFormat::Structured).is_no_data());
        assert!(decoder.decode(&frame(0)[..19], ReplyFormat::Condensed).is_no_data());
    }

    #[test]
    fn condensed_record() {
        let decoder = ReplyDecoder::new();
        match decoder.decode(&frame(STATUS_SPEED_ERROR), ReplyFormat::Condensed) {
            Reply::Condensed(c) => {
                assert_eq!(c.as_str(), "3,100,forward,0.85,-98.94,No,Yes,No,No");
                assert_eq!(c.fields().count(), 9);
            }
            other => panic!("expected condensed reply, got {:?}", other),
        }
    }

    #[test]
    fn worst_case_condensed_fits() {
        let mut f = [0xFFu8; 20];
        f[6] = 0x03;
        let t = ReplyDecoder::new().decode_telemetry(&f).unwrap();
        assert!(t.condensed().as_str().len() < CONDENSED_CAPACITY);
    }

    #[test]
    fn report_lines() {
        let t = ReplyDecoder::new().decode_telemetry(&frame(STATUS_REVERSE)).unwrap();
        let report = t.report();
        assert_eq!(report.lines().count(), 5);
        assert!(report.contains("Thruster Speed: 100, in the reverse direction"));
        assert!((t.power_watts(320.0) - 320.0 * 50.0 / 59.0).abs() < 1e-9);
    }
}
