//! Field codecs layered on [`BitReader`].
//!
//! None of these fail: running out of input yields zeros and leaves the
//! reader's EOF flag set for the frame loop to notice.

use crate::parser::helpers::*;
use crate::parser::stream::{BitReader, ByteSource};

/// Map an unsigned zigzag value back to the signed value it encodes
pub fn zigzag_decode(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

/// Map a signed value onto the unsigned zigzag space
pub fn zigzag_encode(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

impl<S: ByteSource> BitReader<S> {
    fn byte_or_zero(&mut self) -> u8 {
        self.read_byte().unwrap_or(0)
    }

    /// Read unsigned variable byte: little-endian groups of seven bits
    pub fn read_unsigned_vb(&mut self) -> u32 {
        let mut result = 0u32;
        let mut shift = 0;

        // 5 bytes is enough to encode 32-bit unsigned quantities
        for _ in 0..5 {
            let b = match self.read_byte() {
                Some(byte) => byte,
                None => return 0,
            };

            result |= ((b & !0x80) as u32).wrapping_shl(shift);

            // Final byte?
            if b < 128 {
                return result;
            }

            shift += 7;
        }

        // This VB-encoded int is too long!
        0
    }

    /// Read signed variable byte
    pub fn read_signed_vb(&mut self) -> i32 {
        zigzag_decode(self.read_unsigned_vb())
    }

    /// Unsigned variable byte whose low 14 bits are a negated two's complement value
    pub fn read_neg_14bit(&mut self) -> i32 {
        sign_extend_14bit(self.read_unsigned_vb()).wrapping_neg()
    }

    /// Two bytes, little-endian
    pub fn read_s16(&mut self) -> i16 {
        let low = self.byte_or_zero() as u16;
        let high = self.byte_or_zero() as u16;
        (low | (high << 8)) as i16
    }

    /// IEEE-754 single, little-endian
    pub fn read_raw_float(&mut self) -> f32 {
        let mut bytes = [0u8; 4];
        for byte in bytes.iter_mut() {
            *byte = self.byte_or_zero();
        }
        f32::from_le_bytes(bytes)
    }

    /// Elias gamma code for values >= 1. A prefix longer than 31 zero bits is
    /// corruption and decodes as 0, as does running out of input.
    pub fn read_elias_gamma_u32(&mut self) -> u32 {
        let mut leading_zeros = 0;
        loop {
            match self.read_bit() {
                Some(0) => {
                    leading_zeros += 1;
                    if leading_zeros > 31 {
                        return 0;
                    }
                }
                Some(_) => break,
                None => return 0,
            }
        }

        match self.read_bits(leading_zeros) {
            Some(remainder) => (1u32 << leading_zeros) | remainder,
            None => 0,
        }
    }

    /// Elias gamma carrying `zigzag(value)`; zero is not representable
    pub fn read_elias_gamma_s32(&mut self) -> i32 {
        zigzag_decode(self.read_elias_gamma_u32())
    }

    /// Elias delta code for values >= 1: a gamma-coded bit length followed by
    /// the value without its leading one.
    pub fn read_elias_delta_u32(&mut self) -> u32 {
        let length = self.read_elias_gamma_u32();
        if length == 0 || length > 32 {
            return 0;
        }

        match self.read_bits(length - 1) {
            Some(remainder) => (1u32 << (length - 1)) | remainder,
            None => 0,
        }
    }

    /// Elias delta carrying `zigzag(value)`
    pub fn read_elias_delta_s32(&mut self) -> i32 {
        zigzag_decode(self.read_elias_delta_u32())
    }

    /// Read Tag8_4S16 as written by data version 1 loggers.
    ///
    /// Selectors are read two bits at a time from the low end; a 4-bit selector
    /// packs this field and the next into one byte, low nibble first.
    pub fn read_tag8_4s16_v1(&mut self, values: &mut [i32; 4]) {
        let mut selector = self.byte_or_zero();

        let mut i = 0;
        while i < 4 {
            match selector & 0x03 {
                0 => values[i] = 0, // FIELD_ZERO
                1 => {
                    // FIELD_4BIT
                    let combined = self.byte_or_zero();
                    values[i] = sign_extend_4bit(combined & 0x0f);

                    i += 1;
                    selector >>= 2;

                    if i < 4 {
                        values[i] = sign_extend_4bit(combined >> 4);
                    }
                }
                2 => values[i] = sign_extend_8bit(self.byte_or_zero()), // FIELD_8BIT
                _ => {
                    // FIELD_16BIT
                    let byte1 = self.byte_or_zero() as u16;
                    let byte2 = self.byte_or_zero() as u16;
                    values[i] = sign_extend_16bit(byte1 | (byte2 << 8));
                }
            }

            selector >>= 2;
            i += 1;
        }
    }

    /// Read Tag8_4S16 as written by data version 2 loggers (nibble stream, high nibble first)
    pub fn read_tag8_4s16_v2(&mut self, values: &mut [i32; 4]) {
        let selector = self.byte_or_zero();
        let mut nibble_index = 0;
        let mut buffer = 0u8;

        for (i, value) in values.iter_mut().enumerate() {
            let field_type = (selector >> (i * 2)) & 0x03;

            match field_type {
                0 => *value = 0, // FIELD_ZERO
                1 => {
                    // FIELD_4BIT
                    if nibble_index == 0 {
                        buffer = self.byte_or_zero();
                        *value = sign_extend_4bit(buffer >> 4);
                        nibble_index = 1;
                    } else {
                        *value = sign_extend_4bit(buffer & 0x0f);
                        nibble_index = 0;
                    }
                }
                2 => {
                    // FIELD_8BIT
                    if nibble_index == 0 {
                        *value = sign_extend_8bit(self.byte_or_zero());
                    } else {
                        let mut char1 = (buffer & 0x0f) << 4;
                        buffer = self.byte_or_zero();
                        char1 |= buffer >> 4;
                        *value = sign_extend_8bit(char1);
                    }
                }
                _ => {
                    // FIELD_16BIT
                    let char1 = self.byte_or_zero();
                    let char2 = self.byte_or_zero();
                    if nibble_index == 0 {
                        *value = sign_extend_16bit(((char1 as u16) << 8) | (char2 as u16));
                    } else {
                        // Low nibble of the buffer, one whole byte, then the high nibble of the next
                        *value = sign_extend_16bit(
                            (((buffer & 0x0f) as u16) << 12)
                                | ((char1 as u16) << 4)
                                | ((char2 as u16) >> 4),
                        );
                        buffer = char2;
                    }
                }
            }
        }
    }

    /// Read Tag2_3S32: three signed values whose width is chosen by the top two bits
    pub fn read_tag2_3s32(&mut self, values: &mut [i32; 3]) {
        let lead_byte = self.byte_or_zero();

        match lead_byte >> 6 {
            0 => {
                // 2-bit fields
                values[0] = sign_extend_2bit((lead_byte >> 4) & 0x03);
                values[1] = sign_extend_2bit((lead_byte >> 2) & 0x03);
                values[2] = sign_extend_2bit(lead_byte & 0x03);
            }
            1 => {
                // 4-bit fields
                values[0] = sign_extend_4bit(lead_byte & 0x0f);
                let second_byte = self.byte_or_zero();
                values[1] = sign_extend_4bit(second_byte >> 4);
                values[2] = sign_extend_4bit(second_byte & 0x0f);
            }
            2 => {
                // 6-bit fields
                values[0] = sign_extend_6bit(lead_byte & 0x3f);
                values[1] = sign_extend_6bit(self.byte_or_zero() & 0x3f);
                values[2] = sign_extend_6bit(self.byte_or_zero() & 0x3f);
            }
            _ => {
                // 8, 16, 24 or 32 bit fields, widths in the low six bits
                let mut selector = lead_byte;
                for value in values.iter_mut() {
                    *value = match selector & 0x03 {
                        0 => sign_extend_8bit(self.byte_or_zero()),
                        1 => {
                            let byte1 = self.byte_or_zero() as u16;
                            let byte2 = self.byte_or_zero() as u16;
                            sign_extend_16bit(byte1 | (byte2 << 8))
                        }
                        2 => {
                            let byte1 = self.byte_or_zero() as u32;
                            let byte2 = self.byte_or_zero() as u32;
                            let byte3 = self.byte_or_zero() as u32;
                            sign_extend_24bit(byte1 | (byte2 << 8) | (byte3 << 16))
                        }
                        _ => {
                            let mut bytes = [0u8; 4];
                            for byte in bytes.iter_mut() {
                                *byte = self.byte_or_zero();
                            }
                            i32::from_le_bytes(bytes)
                        }
                    };
                    selector >>= 2;
                }
            }
        }
    }

    /// Read Tag8_8SVB for a group of `values.len()` fields (1 to 8).
    ///
    /// A single-field group has no presence byte and is a plain signed VB.
    pub fn read_tag8_8svb(&mut self, values: &mut [i32]) {
        let count = values.len().min(8);

        if count == 1 {
            values[0] = self.read_signed_vb();
            return;
        }

        let header = self.byte_or_zero();
        for (i, value) in values.iter_mut().take(count).enumerate() {
            *value = if header & (1 << i) != 0 {
                self.read_signed_vb()
            } else {
                0
            };
        }
    }
}
