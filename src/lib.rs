//! # Thruster Bus Codec
//!
//! Encoder and decoder for the fixed-size "fast packet" protocol spoken by
//! electric thrusters sharing a serial bus.
//!
//! ## Features
//!
//! - **Command encoding**: 44-byte fast packets addressing one of the 16 bus channels
//! - **Telemetry decoding**: speed, current, temperature and fault bits from a reply frame
//! - **Additive checksum**: the 0xA5-seeded byte sum shared by every outbound packet
//! - **Bench configuration**: an immutable, JSON-loadable description of a test bench
//!
//! ## Quick Start
//!
//! ```rust
//! use thrustbus::{ControlMode, Direction, PacketEncoder, Reply, ReplyDecoder, ReplyFormat};
//!
//! let encoder = PacketEncoder::new(1).expect("id 1 is on the bus");
//! let packet = encoder.encode(1200, Direction::Forward, ControlMode::OpenLoop);
//! assert_eq!(packet.as_bytes().len(), 44);
//!
//! // Replies shorter than 20 bytes mean the thruster has not answered yet.
//! let decoder = ReplyDecoder::new();
//! assert!(matches!(decoder.decode(&[0x81; 4], ReplyFormat::Structured), Reply::NoData));
//! ```
//!
//! ## Architecture
//!
//! - [`checksum`] - Packet checksum computation and verification
//! - [`command`] - Thruster addressing, direction, mode and rpm handling
//! - [`packet`] - Fast packet assembly
//! - [`reply`] - Reply frame decoding
//! - [`config`] - Bench configuration
//! - [`thrust`] - Load-cell force and electrical power conversions
//!
//! The codec performs no I/O. Opening the serial port, pacing writes and
//! aligning reply buffers is left to the caller.

#![deny(warnings)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

pub mod checksum;
pub mod command;
pub mod config;
pub mod error;
pub mod packet;
pub mod reply;
pub mod thrust;

// Re-export main public types for convenience
pub use command::{ControlMode, Direction, Rpm, ThrusterCommand, ThrusterId};
pub use config::BenchConfig;
pub use error::CodecError;
pub use packet::{CommandPacket, PacketEncoder};
pub use reply::{CondensedReply, FaultBitPolicy, FaultFlags, Reply, ReplyDecoder, ReplyFormat, Telemetry};

static_assertions::assert_impl_all!(PacketEncoder: Send, Sync, Copy);
static_assertions::assert_impl_all!(ReplyDecoder: Send, Sync, Copy);
static_assertions::assert_impl_all!(Telemetry: Send, Sync);
