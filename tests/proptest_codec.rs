//! Property-based tests for the fast packet codec.
//!
//! Covers packet length, clamping, demand monotonicity, the checksum
//! relation, channel isolation and the short-reply rule.

use proptest::prelude::*;
use thrustbus::packet::{CHECKSUM_OFFSET, DEMAND_OFFSET, DIRECTION_OFFSET, PACKET_LEN};
use thrustbus::*;

fn direction() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::Forward), Just(Direction::Reverse)]
}

fn mode() -> impl Strategy<Value = ControlMode> {
    prop_oneof![Just(ControlMode::OpenLoop), Just(ControlMode::ClosedLoop)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_construction_matches_id_range(id in -1000i64..1000) {
        prop_assert_eq!(PacketEncoder::new(id).is_ok(), (1..=7).contains(&id));
    }

    #[test]
    fn prop_packet_is_always_44_bytes(id in 1i64..=7, rpm in any::<i64>(), dir in direction(), m in mode()) {
        let packet = PacketEncoder::new(id).unwrap().encode(rpm, dir, m);
        prop_assert_eq!(packet.as_bytes().len(), PACKET_LEN);
    }

    #[test]
    fn prop_out_of_range_rpm_clamps(id in 1i64..=7, low in i64::MIN..=0, high in 2200i64..=i64::MAX) {
        let encoder = PacketEncoder::new(id).unwrap();
        let thruster = encoder.thruster_id();
        let f = Direction::Forward;
        let m = ControlMode::OpenLoop;
        prop_assert_eq!(encoder.encode(low, f, m).demand(thruster), encoder.encode(0, f, m).demand(thruster));
        prop_assert_eq!(encoder.encode(high, f, m).demand(thruster), encoder.encode(2200, f, m).demand(thruster));
    }

    #[test]
    fn prop_demand_is_monotonic(a in 0i64..=2200, b in 0i64..=2200) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let encoder = PacketEncoder::new(1).unwrap();
        let thruster = encoder.thruster_id();
        let lo = encoder.encode(lo, Direction::Forward, ControlMode::OpenLoop).demand(thruster);
        let hi = encoder.encode(hi, Direction::Forward, ControlMode::OpenLoop).demand(thruster);
        prop_assert!(lo <= hi);
    }

    #[test]
    fn prop_checksum_relation(id in 1i64..=7, rpm in -100i64..3000, dir in direction(), m in mode()) {
        let packet = PacketEncoder::new(id).unwrap().encode(rpm, dir, m);
        let bytes = packet.as_bytes();
        let sum = bytes[..CHECKSUM_OFFSET].iter().fold(165u32, |acc, b| acc + u32::from(*b));
        prop_assert_eq!((sum % 256) as u8, bytes[CHECKSUM_OFFSET]);
        prop_assert!(thrustbus::checksum::verify_packet(bytes));
    }

    #[test]
    fn prop_only_bound_slot_is_populated(id in 1i64..=7, rpm in 0i64..=2200, dir in direction(), m in mode()) {
        let packet = PacketEncoder::new(id).unwrap().encode(rpm, dir, m);
        let own = 2 * (id as usize - 1);
        for (i, byte) in packet.as_bytes()[DEMAND_OFFSET..DIRECTION_OFFSET].iter().enumerate() {
            if i != own && i != own + 1 {
                prop_assert_eq!(*byte, 0);
            }
        }
    }

    #[test]
    fn prop_short_replies_are_no_data(frame in proptest::collection::vec(any::<u8>(), 0..=19)) {
        prop_assert!(ReplyDecoder::new().decode(&frame, ReplyFormat::Structured).is_no_data());
    }

    #[test]
    fn prop_long_replies_decode_deterministically(frame in proptest::collection::vec(any::<u8>(), 20..64)) {
        let decoder = ReplyDecoder::new();
        let first = decoder.decode_telemetry(&frame);
        prop_assert!(first.is_some());
        prop_assert_eq!(first, decoder.decode_telemetry(&frame));
        let t = first.unwrap();
        prop_assert!(t.address < 32);
        prop_assert!(t.current_amps >= 0.0 && t.current_amps <= 1023.0 / 59.0);
    }
}
