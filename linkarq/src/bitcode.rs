//! HDLC bit-stuffing, flag-delimiting, and byte-packing codec.
//!
//! A standalone bit-level library: it is not wired under the byte-level
//! [`crate::frame`] codec in the live Go-Back-N path. Bit strings are
//! represented as `bitvec::BitVec<u8, Msb0>` rather than a string of
//! `'0'`/`'1'` characters.

use bitvec::prelude::*;

use crate::error::BitCodecError;

/// A sequence of bits, MSB-first within each backing byte.
pub type Bits = BitVec<u8, Msb0>;
/// A borrowed view over [`Bits`].
pub type BitView = BitSlice<u8, Msb0>;

/// The HDLC flag pattern `01111110`.
pub fn flag() -> Bits {
    bitvec![u8, Msb0; 0, 1, 1, 1, 1, 1, 1, 0]
}

/// Inserts a `0` after every run of five consecutive `1` bits.
///
/// Guarantees the output never contains six consecutive `1` bits, so it
/// cannot be mistaken for (or collide with) a FLAG once delimited.
pub fn stuff(bits: &BitView) -> Bits {
    let mut out = Bits::with_capacity(bits.len());
    let mut ones = 0u8;

    for bit in bits.iter().by_vals() {
        out.push(bit);
        if bit {
            ones += 1;
            if ones == 5 {
                out.push(false);
                ones = 0;
            }
        } else {
            ones = 0;
        }
    }

    out
}

/// Removes the `0` bits inserted by [`stuff`], restoring the original
/// sequence exactly.
pub fn destuff(bits: &BitView) -> Bits {
    let mut out = Bits::with_capacity(bits.len());
    let mut ones = 0u8;
    let mut i = 0;

    while i < bits.len() {
        let bit = bits[i];
        out.push(bit);

        if bit {
            ones += 1;
            if ones == 5 {
                // Skip the stuffed 0 that construction guarantees follows.
                i += 1;
                ones = 0;
            }
        } else {
            ones = 0;
        }

        i += 1;
    }

    out
}

/// Wraps already-stuffed bits with opening and closing FLAGs.
pub fn frame_bits(stuffed: &BitView) -> Bits {
    let mut out = flag();
    out.extend_from_bitslice(stuffed);
    out.extend_from_bitslice(&flag());
    out
}

/// Extracts the bits between the first FLAG and the next FLAG strictly
/// after it. Fails if either flag is missing.
pub fn extract_bits(framed: &BitView) -> Result<Bits, BitCodecError> {
    let flag_bits = flag();

    let start = find_subslice(framed, &flag_bits).ok_or(BitCodecError::NotFramed)?;
    let after_start = start + flag_bits.len();

    let tail = &framed[after_start..];
    let end_in_tail = find_subslice(tail, &flag_bits).ok_or(BitCodecError::NotFramed)?;

    Ok(tail[..end_in_tail].to_bitvec())
}

fn find_subslice(haystack: &BitView, needle: &BitView) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    (0..=haystack.len() - needle.len()).find(|&i| haystack[i..i + needle.len()] == *needle)
}

/// Packs bits into bytes, MSB-first, zero-padding the final byte if the
/// bit count isn't a multiple of 8.
pub fn bits_to_bytes(bits: &BitView) -> Vec<u8> {
    let mut padded = bits.to_bitvec();
    let remainder = padded.len() % 8;
    if remainder != 0 {
        padded.resize(padded.len() + (8 - remainder), false);
    }

    padded
        .chunks(8)
        .map(|chunk| {
            let mut byte = 0u8;
            for bit in chunk.iter().by_vals() {
                byte = (byte << 1) | (bit as u8);
            }
            byte
        })
        .collect()
}

/// Unpacks bytes into their constituent bits, MSB-first.
pub fn bytes_to_bits(bytes: &[u8]) -> Bits {
    let mut bits = Bits::with_capacity(bytes.len() * 8);
    for &byte in bytes {
        for i in (0..8).rev() {
            bits.push((byte >> i) & 1 == 1);
        }
    }
    bits
}

/// Parses a string of `'0'`/`'1'` characters into [`Bits`]. Convenience
/// for tests and the dissector tool; the wire path never deals in text.
pub fn bits_from_str(s: &str) -> Bits {
    let mut bits = Bits::with_capacity(s.len());
    for c in s.chars() {
        bits.push(c == '1');
    }
    bits
}

/// Renders [`Bits`] back to a string of `'0'`/`'1'` characters.
pub fn bits_to_string(bits: &BitView) -> String {
    bits.iter().map(|b| if *b { '1' } else { '0' }).collect()
}
