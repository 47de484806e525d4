//! CRC-16/CCITT-FALSE frame checksum.
//!
//! Polynomial 0x1021, initial register 0xFFFF, MSB first, no reflection,
//! no final XOR. The checksum covers every byte before the 2-byte trailer,
//! reserved bytes included, and is stored little-endian.

/// Generator polynomial.
pub const POLYNOMIAL: u16 = 0x1021;

/// Initial register value.
pub const INITIAL: u16 = 0xFFFF;

/// Trailer size in bytes.
pub const CHECKSUM_LEN: usize = 2;

/// Compute the checksum of `bytes`.
pub fn checksum(bytes: &[u8]) -> u16 {
    update(INITIAL, bytes)
}

/// Continue a checksum computation over more bytes.
pub fn update(mut crc: u16, bytes: &[u8]) -> u16 {
    for &b in bytes {
        crc ^= u16::from(b) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ POLYNOMIAL;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

/// The little-endian checksum stored in the last two bytes of `frame`.
pub fn stored(frame: &[u8]) -> Option<u16> {
    let split = frame.len().checked_sub(CHECKSUM_LEN)?;
    Some(u16::from_le_bytes([frame[split], frame[split + 1]]))
}

/// Check the trailer of a complete wire buffer against its content.
pub fn verify(frame: &[u8]) -> bool {
    match stored(frame) {
        Some(expected) => checksum(&frame[..frame.len() - CHECKSUM_LEN]) == expected,
        None => false,
    }
}
