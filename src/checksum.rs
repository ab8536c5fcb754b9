//! Fast packet checksum.
//!
//! The last byte of every command packet is the 8-bit sum of the preceding
//! 43 bytes, seeded with 0xA5.

use crate::packet::{CHECKSUM_OFFSET, PACKET_LEN};

pub const CHECKSUM_SEED: u8 = 0xA5;

/// `(0xA5 + sum(body)) mod 256` over bytes 0..=42 of a packet.
pub fn checksum(body: &[u8; CHECKSUM_OFFSET]) -> u8 {
    body.iter().fold(CHECKSUM_SEED, |acc, b| acc.wrapping_add(*b))
}

/// True when `packet` is exactly one fast packet and its trailing byte
/// matches the checksum of its body.
pub fn verify_packet(packet: &[u8]) -> bool {
    if packet.len() != PACKET_LEN {
        return false;
    }
    let (body, tail) = packet.split_at(CHECKSUM_OFFSET);
    match <&[u8; CHECKSUM_OFFSET]>::try_from(body) {
        Ok(body) => checksum(body) == tail[0],
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_only_for_zero_body() {
        assert_eq!(checksum(&[0; CHECKSUM_OFFSET]), 0xA5);
    }

    #[test]
    fn sum_wraps() {
        let mut body = [0u8; CHECKSUM_OFFSET];
        body[0] = 0x5B; // 0xA5 + 0x5B = 0x100
        assert_eq!(checksum(&body), 0x00);
        body[1] = 0xFF;
        assert_eq!(checksum(&body), 0xFF);
    }

    #[test]
    fn verify_rejects_bad_length_and_sum() {
        let mut packet = [0u8; PACKET_LEN];
        packet[CHECKSUM_OFFSET] = 0xA5;
        assert!(verify_packet(&packet));

        packet[CHECKSUM_OFFSET] = 0xA4;
        assert!(!verify_packet(&packet));

        assert!(!verify_packet(&packet[..PACKET_LEN - 1]));
        assert!(!verify_packet(&[]));
    }
}
