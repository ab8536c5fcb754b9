use crate::error::{CodecError, Result};
use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

/// Demand ceiling applied to every command before scaling.
pub const MAX_RPM: u16 = 2200;
/// Full-scale rpm of the bus demand word. Deliberately above [`MAX_RPM`], so
/// the demand never reaches the top of the 16-bit range.
pub const FULL_SCALE_RPM: u32 = 2800;

/// Address of a thruster the encoder can drive.
///
/// The bus has 16 channels, but direction/mode/enable bits are only ever
/// written for the first bank and addressing is single-digit, so only ids
/// 1 through 7 are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct ThrusterId(u8);

impl ThrusterId {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 7;

    pub fn new(id: i64) -> Result<Self> {
        if id < i64::from(Self::MIN) || id > i64::from(Self::MAX) {
            return Err(CodecError::InvalidConfiguration { id });
        }
        Ok(Self(id as u8))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Zero-based channel slot this thruster occupies in the demand table.
    pub fn channel_index(self) -> usize {
        usize::from(self.0 - 1)
    }
}

impl Default for ThrusterId {
    fn default() -> Self {
        Self(Self::MIN)
    }
}

impl TryFrom<i64> for ThrusterId {
    type Error = CodecError;

    fn try_from(id: i64) -> Result<Self> {
        Self::new(id)
    }
}

impl From<ThrusterId> for i64 {
    fn from(id: ThrusterId) -> Self {
        i64::from(id.0)
    }
}

impl fmt::Display for ThrusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

impl Direction {
    /// Bit value used in the direction bank of a command packet and in bit 0
    /// of the reply status byte.
    pub fn bit(self) -> u8 {
        match self {
            Direction::Forward => 0,
            Direction::Reverse => 1,
        }
    }

    pub fn from_bit(bit: u8) -> Self {
        if bit & 0x01 == 0 {
            Direction::Forward
        } else {
            Direction::Reverse
        }
    }
}

impl FromStr for Direction {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "f" => Ok(Direction::Forward),
            "r" => Ok(Direction::Reverse),
            other => Err(CodecError::InvalidCommand(format!(
                "direction must be 'f' or 'r', got '{other}'"
            ))),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => f.write_str("forward"),
            Direction::Reverse => f.write_str("reverse"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    #[default]
    OpenLoop,
    /// Thruster regulates to the commanded rpm.
    ClosedLoop,
}

impl ControlMode {
    pub fn bit(self) -> u8 {
        match self {
            ControlMode::OpenLoop => 0,
            ControlMode::ClosedLoop => 1,
        }
    }
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlMode::OpenLoop => f.write_str("open loop"),
            ControlMode::ClosedLoop => f.write_str("closed loop"),
        }
    }
}

/// Requested rotational speed as given by the caller, before clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rpm(i64);

impl Rpm {
    pub const STOP: Rpm = Rpm(0);

    pub fn new(rpm: i64) -> Self {
        Self(rpm)
    }

    pub fn raw(self) -> i64 {
        self.0
    }

    /// Silently clamps to `[0, MAX_RPM]`.
    pub fn clamped(self) -> u16 {
        self.0.clamp(0, i64::from(MAX_RPM)) as u16
    }

    pub fn is_clamped(self) -> bool {
        i64::from(self.clamped()) != self.0
    }

    /// Demand word for this rpm after clamping.
    pub fn demand(self) -> u16 {
        demand_from_rpm(self.clamped())
    }
}

macro_rules! rpm_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Rpm {
                fn from(rpm: $t) -> Self {
                    Rpm(i64::from(rpm))
                }
            }
        )*
    };
}

rpm_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl FromStr for Rpm {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<i64>()
            .map(Rpm)
            .map_err(|_| CodecError::InvalidCommand(format!("'{s}' is not a valid rpm")))
    }
}

impl fmt::Display for Rpm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scales an rpm against the 2800 rpm full-scale reference:
/// `floor(rpm / 2800 * 65536)`. Integer arithmetic gives the exact floor.
pub fn demand_from_rpm(rpm: u16) -> u16 {
    let rpm = u32::from(rpm.min(MAX_RPM));
    ((rpm << 16) / FULL_SCALE_RPM) as u16
}

/// Converts a demand word back to the rpm it represents, rounded down.
pub fn rpm_from_demand(demand: u16) -> u16 {
    ((u32::from(demand) * FULL_SCALE_RPM) >> 16) as u16
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrusterCommand {
    pub rpm: Rpm,
    pub direction: Direction,
    pub mode: ControlMode,
}

impl ThrusterCommand {
    pub fn new(rpm: impl Into<Rpm>, direction: Direction, mode: ControlMode) -> Self {
        Self {
            rpm: rpm.into(),
            direction,
            mode,
        }
    }

    /// Zero demand, forward, in the given mode.
    pub fn stop(mode: ControlMode) -> Self {
        Self::new(Rpm::STOP, Direction::Forward, mode)
    }

    /// Reverse at half the requested rpm, used to get water flowing the other
    /// way before a forward run.
    pub fn half_speed_reverse(rpm: impl Into<Rpm>, mode: ControlMode) -> Self {
        let rpm: Rpm = rpm.into();
        Self::new(rpm.raw() / 2, Direction::Reverse, mode)
    }

    /// Parses textual rpm and direction. Either failing is an `InvalidCommand`.
    pub fn parse(rpm: &str, direction: &str, mode: ControlMode) -> Result<Self> {
        let rpm = rpm.parse::<Rpm>()?;
        let direction = direction.parse::<Direction>()?;
        Ok(Self::new(rpm, direction, mode))
    }
}
