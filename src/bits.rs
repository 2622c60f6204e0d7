//! Bit-manipulation helpers shared by the instruction word, decoder and
//! execute handlers.
//!
//! Every function here is pure and total: no allocation, no panics, no
//! traps. Arithmetic overflow is defined to wrap modulo 2^32 (or 2^64,
//! see [`Xlen`](crate::registers::Xlen)), never to panic.

/// Make an n-bit-wide mask (all ones in the low n bits).
///
/// `n` must be <= 32; `n == 32` yields `u32::MAX`.
pub fn mask(n: u32) -> u32 {
    if n >= 32 {
        u32::MAX
    } else {
        (1u32 << n) - 1
    }
}

/// Keep only the lowest `n` bits of `x`, as unsigned.
pub fn trim(x: u32, n: u32) -> u32 {
    x & mask(n)
}

/// `trim(x, 32)`, i.e. the identity on a 32-bit value.
pub fn trim_32(x: u32) -> u32 {
    trim(x, 32)
}

/// Interpret the lowest `n` bits of `x` as a signed n-bit two's
/// complement integer, and sign-extend the result to 64 bits.
///
/// `n` must be in `1..=32`.
pub fn sext(x: u32, n: u32) -> u64 {
    let trimmed = trim(x, n);
    let sign_bit = 1 & (trimmed >> (n - 1));
    if sign_bit == 1 {
        let extension = !0u64 << n;
        extension | u64::from(trimmed)
    } else {
        u64::from(trimmed)
    }
}

/// `sext(x, 32)`.
pub fn sext_32(x: u32) -> u64 {
    sext(x, 32)
}

/// Sign-extend the lowest `xlen` bits of `x` to `xlen` bits, returned
/// as a `u32`. For `xlen == 32` this is `trim_32` followed by a
/// no-op sign extension (the value already occupies all 32 bits).
pub fn sext_xlen(x: u32, xlen: u32) -> u32 {
    sext(x, xlen) as u32
}

/// Reinterpret the low `width` bits of `x` as a mathematical signed
/// integer (two's complement), for use in comparisons and arithmetic
/// shifts. `width` must be the *architectural* XLEN the caller is
/// modelling, not a value hardcoded independently of it — passing the
/// wrong width silently corrupts signed comparisons whenever the sign
/// bit at that width is set.
pub fn signed(x: u32, width: u32) -> i64 {
    let unsigned = sext(x, width);
    unsigned as i64
}

/// Extract `value[end:start]` (Verilog bit-range notation, inclusive).
pub fn extract_field(value: u32, end: u32, start: u32) -> u32 {
    mask(end - start + 1) & (value >> start)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_basic() {
        assert_eq!(mask(0), 0);
        assert_eq!(mask(1), 1);
        assert_eq!(mask(8), 0xff);
        assert_eq!(mask(32), 0xffff_ffff);
    }

    #[test]
    fn trim_keeps_low_bits() {
        assert_eq!(trim(0xdead_beef, 16), 0xbeef);
        assert_eq!(trim_32(0xdead_beef), 0xdead_beef);
    }

    #[test]
    fn sext_positive_is_identity() {
        assert_eq!(sext(0x7f, 8), 0x7f);
        assert_eq!(sext_32(0x7fff_ffff), 0x7fff_ffff);
    }

    #[test]
    fn sext_negative_fills_high_bits() {
        // -1 as an 8-bit two's complement value
        assert_eq!(sext(0xff, 8), 0xffff_ffff_ffff_ffff);
        // -1 as a 32-bit value
        assert_eq!(sext_32(0xffff_ffff), 0xffff_ffff_ffff_ffff);
    }

    #[test]
    fn sext_xlen_roundtrip_for_32() {
        assert_eq!(sext_xlen(0xffff_ffff, 32), 0xffff_ffff);
        assert_eq!(sext_xlen(0x1, 32), 1);
    }

    #[test]
    fn sext_round_trip_law() {
        // sext(trim(x, n), n) matches the signed reinterpretation of
        // x mod 2^n, for a handful of widths and values.
        for n in [1u32, 4, 8, 12, 13, 16, 20, 21, 32] {
            for x in [0u32, 1, 0x7fff_ffff, 0x8000_0000, 0xffff_ffff, 12345] {
                let trimmed = trim(x, n);
                assert_eq!(sext(trimmed, n), signed(trimmed, n) as u64);
            }
        }
    }

    #[test]
    fn extract_field_matches_verilog_slice() {
        // opcode field [6:0] of an all-ones word is 0x7f
        assert_eq!(extract_field(0xffff_ffff, 6, 0), 0x7f);
        // funct7 field [31:25]
        assert_eq!(extract_field(0xfe00_0000, 31, 25), 0x7f);
    }

    #[test]
    fn signed_respects_requested_width() {
        // 0xff interpreted as an 8-bit value is -1, but as a wider
        // value (no sign bit set) it stays positive.
        assert_eq!(signed(0xff, 8), -1);
        assert_eq!(signed(0xff, 32), 0xff);
    }
}
