//! Fast packet assembly.
//!
//! Wire layout of the 44-byte command frame:
//!
//! | offset | meaning |
//! |---|---|
//! | 0 | address of the thruster that should report status |
//! | 1..=32 | 16 demand slots, (LSB, MSB) |
//! | 33, 34 | direction bits, channels 1-8 then 9-16 |
//! | 35, 36 | mode bits, channels 1-8 then 9-16 |
//! | 37, 38 | enable bits, channels 1-8 then 9-16 |
//! | 39..=42 | spare |
//! | 43 | checksum |

use crate::checksum::checksum;
use crate::command::{ControlMode, Direction, Rpm, ThrusterCommand, ThrusterId};
use crate::error::Result;
use core::fmt;
use tracing::{debug, trace, warn};

pub const PACKET_LEN: usize = 44;
pub const CHANNEL_COUNT: usize = 16;

pub const ADDRESS_OFFSET: usize = 0;
pub const DEMAND_OFFSET: usize = 1;
pub const DIRECTION_OFFSET: usize = DEMAND_OFFSET + CHANNEL_COUNT * 2;
pub const MODE_OFFSET: usize = DIRECTION_OFFSET + 2;
pub const ENABLE_OFFSET: usize = MODE_OFFSET + 2;
pub const SPARE_OFFSET: usize = ENABLE_OFFSET + 2;
pub const SPARE_LEN: usize = 4;
pub const CHECKSUM_OFFSET: usize = SPARE_OFFSET + SPARE_LEN;

/// Channels 1-8 are always enabled; channels 9-16 are never driven.
const ENABLE_LOW_BANK: u8 = 0x01;

static_assertions::const_assert_eq!(CHECKSUM_OFFSET + 1, PACKET_LEN);
static_assertions::const_assert_eq!(DIRECTION_OFFSET, 33);

/// One complete, checksummed command frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandPacket([u8; PACKET_LEN]);

impl CommandPacket {
    pub fn as_bytes(&self) -> &[u8; PACKET_LEN] {
        &self.0
    }

    pub fn into_bytes(self) -> [u8; PACKET_LEN] {
        self.0
    }

    pub fn address(&self) -> u8 {
        self.0[ADDRESS_OFFSET]
    }

    /// Demand word held in the slot of `id`.
    pub fn demand(&self, id: ThrusterId) -> u16 {
        let slot = DEMAND_OFFSET + id.channel_index() * 2;
        u16::from_le_bytes([self.0[slot], self.0[slot + 1]])
    }

    pub fn direction(&self) -> Direction {
        Direction::from_bit(self.0[DIRECTION_OFFSET])
    }

    pub fn checksum(&self) -> u8 {
        self.0[CHECKSUM_OFFSET]
    }
}

impl AsRef<[u8]> for CommandPacket {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for CommandPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Builds fast packets for a single thruster.
///
/// The id is bound at construction and never changes, so an encoder can be
/// shared freely between threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketEncoder {
    id: ThrusterId,
}

impl PacketEncoder {
    /// Fails with `InvalidConfiguration` unless `1 <= id <= 7`.
    pub fn new(id: i64) -> Result<Self> {
        Ok(Self::for_thruster(ThrusterId::new(id)?))
    }

    pub fn for_thruster(id: ThrusterId) -> Self {
        Self { id }
    }

    pub fn thruster_id(&self) -> ThrusterId {
        self.id
    }

    pub fn encode(&self, rpm: impl Into<Rpm>, direction: Direction, mode: ControlMode) -> CommandPacket {
        self.encode_command(&ThrusterCommand::new(rpm, direction, mode))
    }

    pub fn encode_command(&self, command: &ThrusterCommand) -> CommandPacket {
        if command.rpm.is_clamped() {
            trace!(requested = command.rpm.raw(), applied = command.rpm.clamped(), "rpm clamped");
        }
        let demand = command.rpm.demand().to_le_bytes();

        let mut pkt = [0u8; PACKET_LEN];
        // Echoing the address makes this thruster answer with its status.
        pkt[ADDRESS_OFFSET] = self.id.get();

        let slot = DEMAND_OFFSET + self.id.channel_index() * 2;
        pkt[slot..slot + 2].copy_from_slice(&demand);

        pkt[DIRECTION_OFFSET] = command.direction.bit();
        pkt[MODE_OFFSET] = command.mode.bit();
        pkt[ENABLE_OFFSET] = ENABLE_LOW_BANK;

        let mut body = [0u8; CHECKSUM_OFFSET];
        body.copy_from_slice(&pkt[..CHECKSUM_OFFSET]);
        pkt[CHECKSUM_OFFSET] = checksum(&body);

        debug!(
            thruster = %self.id,
            rpm = command.rpm.clamped(),
            direction = %command.direction,
            mode = %command.mode,
            "encoded fast packet"
        );
        CommandPacket(pkt)
    }

    /// Parses textual rpm and direction before encoding. Nothing is
    /// assembled when either is rejected.
    pub fn encode_str(&self, rpm: &str, direction: &str, mode: ControlMode) -> Result<CommandPacket> {
        let command = ThrusterCommand::parse(rpm, direction, mode)?;
        Ok(self.encode_command(&command))
    }

    /// Lenient form of [`encode_str`](Self::encode_str): a rejected command
    /// is logged and yields an empty buffer, which a writer can send as a
    /// no-op.
    pub fn encode_or_empty(&self, rpm: &str, direction: &str, mode: ControlMode) -> Vec<u8> {
        match self.encode_str(rpm, direction, mode) {
            Ok(packet) => packet.as_bytes().to_vec(),
            Err(e) => {
                warn!(thruster = %self.id, "dropping command: {}", e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::verify_packet;
    use crate::error::CodecError;

    #[test]
    fn layout_offsets() {
        assert_eq!(MODE_OFFSET, 35);
        assert_eq!(ENABLE_OFFSET, 37);
        assert_eq!(SPARE_OFFSET, 39);
        assert_eq!(CHECKSUM_OFFSET, 43);
    }

    #[test]
    fn stop_packet_for_thruster_one() {
        let encoder = PacketEncoder::new(1).unwrap();
        let packet = encoder.encode(0, Direction::Forward, ControlMode::OpenLoop);
        let bytes = packet.as_bytes();

        assert_eq!(bytes[0], 1);
        assert!(bytes[1..=36].iter().all(|b| *b == 0));
        assert_eq!(bytes[37], 1);
        assert!(bytes[38..=42].iter().all(|b| *b == 0));
        // 0xA5 + address 1 + enable 1
        assert_eq!(bytes[43], 0xA7);
    }

    #[test]
    fn full_packet_at_rpm_cap() {
        let encoder = PacketEncoder::new(2).unwrap();
        let packet = encoder.encode(2200, Direction::Reverse, ControlMode::ClosedLoop);
        let bytes = packet.as_bytes();

        // 51492 = 0xC924, slot 1 holds LSB then MSB
        assert_eq!(&bytes[3..5], &[0x24, 0xC9]);
        assert_eq!(bytes[33], 1);
        assert_eq!(bytes[35], 1);
        assert_eq!(packet.demand(encoder.thruster_id()), 51492);
        assert_eq!(packet.direction(), Direction::Reverse);
        assert!(verify_packet(bytes));
    }

    #[test]
    fn textual_commands() {
        let encoder = PacketEncoder::new(1).unwrap();
        let parsed = encoder.encode_str("1200", "f", ControlMode::OpenLoop).unwrap();
        let typed = encoder.encode(1200, Direction::Forward, ControlMode::OpenLoop);
        assert_eq!(parsed, typed);

        assert!(matches!(
            encoder.encode_str("abc", "f", ControlMode::OpenLoop),
            Err(CodecError::InvalidCommand(_))
        ));
        assert!(matches!(
            encoder.encode_str("100", "x", ControlMode::OpenLoop),
            Err(CodecError::InvalidCommand(_))
        ));
        assert!(encoder.encode_or_empty("abc", "f", ControlMode::OpenLoop).is_empty());
        assert_eq!(encoder.encode_or_empty("100", "r", ControlMode::OpenLoop).len(), PACKET_LEN);
    }

    #[test]
    fn display_is_hex() {
        let packet = PacketEncoder::new(1).unwrap().encode(0, Direction::Forward, ControlMode::OpenLoop);
        let text = packet.to_string();
        assert_eq!(text.len(), PACKET_LEN * 2);
        assert!(text.starts_with("01"));
        assert!(text.ends_with("a7"));
    }
}
