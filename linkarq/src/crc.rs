//! CRC-16/CCITT-FALSE engine used to protect frames.
//!
//! Polynomial 0x1021, initial value 0xFFFF, no reflection, no output XOR.
//! Applied to `header || payload` when generating a frame's CRC, and to
//! `header || payload || crc` when verifying one: a verification result of
//! zero indicates the frame survived the channel intact.

use crc_all::CrcAlgo;

const CRC16_INIT: u16 = 0xFFFF;

const CRC16: CrcAlgo<u16> = CrcAlgo::<u16>::new(
    0x1021,     // polynomial (CCITT-FALSE)
    16,         // width
    CRC16_INIT, // init
    0,          // xorout
    false,      // reflect
);

/// Computes the CRC-16/CCITT-FALSE checksum of `data`.
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc = CRC16_INIT;
    CRC16.update_crc(&mut crc, data);
    CRC16.finish_crc(&crc)
}

/// Verifies `data` (body followed by its big-endian CRC) via the
/// remainder-equals-zero check.
pub fn crc16_is_valid(data: &[u8]) -> bool {
    crc16(data) == 0
}
