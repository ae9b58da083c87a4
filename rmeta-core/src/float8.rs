//! Compressed 2-byte `f32` encoding ("float8": the exponent fits in 3 bits
//! and the mantissa in 4, for 8 significant bits total alongside the sign).
//!
//! Eligibility and bit layout are grounded on the original C++
//! implementation's `FloatComponentsCompressed`/`FloatComponents` pair
//! (`metafast_simple_types.hpp`): the two-byte compressed form is read as a
//! little-endian `u16` whose bits, from the low end, are `exponent(3) |
//! mantissa(4) | discriminator(8) | sign(1)`. The discriminator occupies
//! exactly the bit positions that the *uncompressed* 4-byte form's leading
//! two bytes use for the raw IEEE-754 exponent (see `write_raw`/`read_raw`
//! below, which transmit the float's high 16 bits before its low 16 bits
//! for this reason) — so a discriminator of all-ones can only ever be
//! produced by a raw encoding whose exponent field is `0xFF`, i.e. NaN or
//! infinity. Those two values are therefore the one documented gap in this
//! scheme: with the `float8-nan-inf` feature off (the default) they are
//! always written via the raw path, and reading them back is not
//! guaranteed to round-trip. Enabling `float8-nan-inf` closes the gap by
//! routing them through the compressed form instead, using reserved
//! `(exponent=0, mantissa=1..3)` codes the same way the original did.

use crate::error::Result;
use crate::reader::BinaryReader;
use crate::writer::BinaryWriter;

const EXPONENT_BIAS: i32 = 123;
const MANTISSA_DROP_BITS: u32 = 19; // 23 total mantissa bits - 4 kept bits

const SPECIAL_ZERO: u32 = 0;
const SPECIAL_INFINITY: u32 = 1;
const SPECIAL_SIGNALING_NAN: u32 = 2;
const SPECIAL_QUIET_NAN: u32 = 3;

pub fn write_f32(out: &mut BinaryWriter, value: f32) {
    let bits = value.to_bits();
    let sign = bits >> 31;
    let exp8 = ((bits >> 23) & 0xFF) as i32;
    let mantissa = bits & 0x007f_ffff;

    if let Some((exp3, mantissa4)) = try_compress(exp8, mantissa) {
        write_compact(out, sign, exp3, mantissa4);
        return;
    }
    write_raw(out, bits);
}

pub fn read_f32(input: &mut BinaryReader) -> Result<f32> {
    let lo = input.read_u8("f32")? as u16;
    let hi = input.read_u8("f32")? as u16;
    let head = lo | (hi << 8);
    let discriminator = (head >> 7) & 0xFF;

    if discriminator == 0xFF {
        let sign = ((head >> 15) & 1) as u32;
        let exp3 = (head & 0x7) as i32;
        let mantissa4 = ((head >> 3) & 0xF) as u32;
        return Ok(decode_compact(sign, exp3, mantissa4));
    }

    let low16 = input.read_array::<2>("f32")?;
    let low = u16::from_le_bytes(low16);
    let bits = ((head as u32) << 16) | (low as u32);
    Ok(f32::from_bits(bits))
}

/// Returns `(exponent_field, mantissa_field)` if `value` can be compressed,
/// given its decomposed raw exponent (`0..=255`) and mantissa (`0..=0x7fffff`).
fn try_compress(exp8: i32, mantissa: u32) -> Option<(i32, u32)> {
    if !cfg!(feature = "float8") {
        return None;
    }
    if exp8 == 0 {
        // Zero is always compressible; other denormals are not (their
        // exponent field can't be distinguished from the zero sentinel).
        return (mantissa == 0).then_some((0, SPECIAL_ZERO));
    }
    if exp8 == 0xFF {
        if cfg!(feature = "float8-nan-inf") {
            let code = if mantissa == 0 {
                SPECIAL_INFINITY
            } else if mantissa & (1 << 22) != 0 {
                SPECIAL_QUIET_NAN
            } else {
                SPECIAL_SIGNALING_NAN
            };
            return Some((0, code));
        }
        return None;
    }
    let field = exp8 - EXPONENT_BIAS;
    if !(1..=7).contains(&field) {
        return None;
    }
    if mantissa & ((1 << MANTISSA_DROP_BITS) - 1) != 0 {
        return None;
    }
    Some((field, mantissa >> MANTISSA_DROP_BITS))
}

fn write_compact(out: &mut BinaryWriter, sign: u32, exp3: i32, mantissa4: u32) {
    let low_byte = (exp3 as u8 & 0x7) | ((mantissa4 as u8 & 0xF) << 3) | 0x80;
    let high_byte = 0x7F | ((sign as u8 & 1) << 7);
    out.write_u8(low_byte);
    out.write_u8(high_byte);
}

fn write_raw(out: &mut BinaryWriter, bits: u32) {
    let high = (bits >> 16) as u16;
    let low = (bits & 0xFFFF) as u16;
    out.write(&high.to_le_bytes());
    out.write(&low.to_le_bytes());
}

fn decode_compact(sign: u32, exp3: i32, mantissa4: u32) -> f32 {
    if exp3 == 0 {
        return match mantissa4 {
            SPECIAL_INFINITY => {
                if sign == 1 {
                    f32::NEG_INFINITY
                } else {
                    f32::INFINITY
                }
            }
            SPECIAL_SIGNALING_NAN => f32::from_bits((sign << 31) | (0xFF << 23) | 1),
            SPECIAL_QUIET_NAN => f32::from_bits((sign << 31) | (0xFF << 23) | (1 << 22)),
            _ => {
                if sign == 1 {
                    -0.0
                } else {
                    0.0
                }
            }
        };
    }
    let exp8 = (exp3 + EXPONENT_BIAS) as u32;
    let mantissa = mantissa4 << MANTISSA_DROP_BITS;
    f32::from_bits((sign << 31) | (exp8 << 23) | mantissa)
}

/// `true` if `write_f32` would emit the 2-byte compact form for `value`.
pub fn is_compressible(value: f32) -> bool {
    let bits = value.to_bits();
    let exp8 = ((bits >> 23) & 0xFF) as i32;
    let mantissa = bits & 0x007f_ffff;
    try_compress(exp8, mantissa).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn roundtrip(v: f32) -> Vec<u8> {
        let mut w = BinaryWriter::new();
        write_f32(&mut w, v);
        let bytes = w.into_vec();
        let mut r = BinaryReader::new(&bytes);
        let got = read_f32(&mut r).unwrap();
        assert_eq!(got.to_bits(), v.to_bits());
        bytes
    }

    #[test]
    fn s6_half_compresses_to_two_bytes() {
        assert!(is_compressible(0.5));
        let bytes = roundtrip(0.5);
        assert_eq!(bytes.len(), 2);
        let head = bytes[0] as u16 | ((bytes[1] as u16) << 8);
        assert_eq!((head >> 7) & 0xFF, 0xFF, "discriminator spans bits 7..14");
    }

    #[test]
    fn s6_arbitrary_value_is_uncompressed() {
        assert!(!is_compressible(0.765521));
        assert_eq!(roundtrip(0.765521).len(), 4);
    }

    #[test]
    fn zero_round_trips_compressed() {
        assert_eq!(roundtrip(0.0).len(), 2);
        assert_eq!(roundtrip(-0.0).len(), 2);
    }

    #[test]
    fn large_exponent_values_round_trip_uncompressed() {
        roundtrip(1.0e30);
        roundtrip(-1.0e30);
        roundtrip(f32::MIN_POSITIVE);
    }

    #[test]
    fn property_compressed_values_round_trip_bitwise() {
        for exp in -3i32..=3 {
            for mantissa4 in 0u32..16 {
                let bits = ((exp + EXPONENT_BIAS) as u32) << 23 | (mantissa4 << MANTISSA_DROP_BITS);
                let v = f32::from_bits(bits);
                assert!(is_compressible(v));
                roundtrip(v);
            }
        }
    }
}
