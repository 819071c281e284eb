//! Bit-order reversal helpers
//!
//! Used when the caller asks for LSB-first framing on a transport that
//! only shifts MSB-first. Every byte is reflected on its own; there is
//! never any carry between bytes.

/// Reflect the bits of a single byte (bit 0 <-> bit 7, bit 1 <-> bit 6, ...)
#[inline]
pub const fn reverse_bits(byte: u8) -> u8 {
    byte.reverse_bits()
}

/// Reflect every byte of `buf` in place
pub fn reverse_bits_in_place(buf: &mut [u8]) {
    for byte in buf.iter_mut() {
        *byte = reverse_bits(*byte);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reverse_is_involution() {
        for b in 0..=u8::MAX {
            assert_eq!(reverse_bits(reverse_bits(b)), b, "byte 0x{:02X}", b);
        }
    }

    #[test]
    fn test_reverse_known_values() {
        assert_eq!(reverse_bits(0b0000_0001), 0b1000_0000);
        assert_eq!(reverse_bits(0b1100_0000), 0b0000_0011);
        assert_eq!(reverse_bits(0xA5), 0xA5);
        assert_eq!(reverse_bits(0x0F), 0xF0);
        assert_eq!(reverse_bits(0x00), 0x00);
        assert_eq!(reverse_bits(0xFF), 0xFF);
    }

    #[test]
    fn test_reverse_in_place_is_per_byte() {
        let mut buf = [0x01, 0x80, 0x12, 0x00];
        reverse_bits_in_place(&mut buf);
        assert_eq!(buf, [0x80, 0x01, 0x48, 0x00]);
    }

    #[test]
    fn test_reverse_in_place_empty() {
        let mut buf: [u8; 0] = [];
        reverse_bits_in_place(&mut buf);
    }
}
