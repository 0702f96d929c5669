//! Helper functions for BBL parsing
//!
//! Sign extension for the fixed-width values packed by the group codecs, and
//! the lenient numeric parsing applied to header values.

/// Sign-extend a 2-bit value to i32
pub fn sign_extend_2bit(value: u8) -> i32 {
    let val = value as i32;
    if (val & 0x02) != 0 {
        val | !0x03
    } else {
        val & 0x03
    }
}

/// Sign-extend a 4-bit value to i32
pub fn sign_extend_4bit(value: u8) -> i32 {
    let val = value as i32;
    if (val & 0x08) != 0 {
        val | !0x0f
    } else {
        val & 0x0f
    }
}

/// Sign-extend a 6-bit value to i32
pub fn sign_extend_6bit(value: u8) -> i32 {
    let val = value as i32;
    if (val & 0x20) != 0 {
        val | !0x3f
    } else {
        val & 0x3f
    }
}

/// Sign-extend an 8-bit value to i32
pub fn sign_extend_8bit(value: u8) -> i32 {
    value as i8 as i32
}

/// Sign-extend a 14-bit two's complement value to i32. Bits above 13 are ignored.
pub fn sign_extend_14bit(value: u32) -> i32 {
    (((value & 0x3fff) << 18) as i32) >> 18
}

/// Sign-extend a 16-bit value to i32
pub fn sign_extend_16bit(value: u16) -> i32 {
    value as i16 as i32
}

/// Sign-extend a 24-bit value to i32
pub fn sign_extend_24bit(value: u32) -> i32 {
    if (value & 0x800000) != 0 {
        (value | 0xff000000) as i32
    } else {
        (value & 0x7fffff) as i32
    }
}

/// Parse the leading decimal integer of `text`, C `atoi` style.
///
/// Leading whitespace and a sign are accepted; parsing stops at the first
/// non-digit. Text without a leading number yields 0, overflow wraps.
pub fn parse_leading_int(text: &str) -> i32 {
    let trimmed = text.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let magnitude = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i32, |acc, digit| {
            acc.wrapping_mul(10).wrapping_add((digit - b'0') as i32)
        });

    if negative {
        magnitude.wrapping_neg()
    } else {
        magnitude
    }
}

/// Parse up to `max_count` comma separated integers with [`parse_leading_int`]
pub fn parse_comma_separated(text: &str, max_count: usize) -> Vec<i32> {
    if text.is_empty() {
        return Vec::new();
    }
    text.split(',')
        .take(max_count)
        .map(parse_leading_int)
        .collect()
}

/// Parse a hexadecimal number with optional `0x` prefix, stopping at the first non-hex digit
pub fn parse_hex_u32(text: &str) -> u32 {
    let trimmed = text.trim_start();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    digits
        .chars()
        .map_while(|c| c.to_digit(16))
        .fold(0u32, |acc, digit| acc.wrapping_shl(4) | digit)
}
