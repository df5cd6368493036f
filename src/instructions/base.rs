//! Shared helpers for instruction handlers: little-endian value packing and width masks.

/// Encode value as little-endian bytes (size 1..=8).
#[must_use]
pub fn value_to_bytes_le(value: u64, size: usize) -> Vec<u8> {
    let size = size.clamp(1, 8);
    (0..size).map(|i| (value >> (i * 8)) as u8).collect()
}

/// Decode little-endian bytes to u64 (no sign extension).
#[must_use]
pub fn bytes_to_value_le(bytes: &[u8]) -> u64 {
    let mut value: u64 = 0;
    for (i, &b) in bytes.iter().take(8).enumerate() {
        value |= u64::from(b) << (i * 8);
    }
    value
}

/// All-ones mask covering `width` bytes.
#[must_use]
pub const fn width_mask(width: usize) -> u64 {
    if width >= 8 {
        u64::MAX
    } else {
        (1u64 << (width * 8)) - 1
    }
}

/// High bit of a `width`-byte value.
#[must_use]
pub const fn sign_bit(value: u64, width: usize) -> bool {
    let bit = (width * 8).saturating_sub(1);
    (value >> bit) & 1 != 0
}

/// Effective address of an indexed access; wraps within the 16-bit address space.
#[must_use]
pub const fn offset_address(base: u16, offset: i16) -> u16 {
    base.wrapping_add_signed(offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_cover_each_width() {
        assert_eq!(width_mask(1), 0xff);
        assert_eq!(width_mask(2), 0xffff);
        assert_eq!(width_mask(4), 0xffff_ffff);
        assert_eq!(width_mask(8), u64::MAX);
    }

    #[test]
    fn sign_bit_tracks_width() {
        assert!(sign_bit(0x80, 1));
        assert!(!sign_bit(0x80, 2));
        assert!(sign_bit(0x8000_0000_0000_0000, 8));
    }

    #[test]
    fn le_packing() {
        assert_eq!(value_to_bytes_le(0x0102_0304, 4), vec![4, 3, 2, 1]);
        assert_eq!(bytes_to_value_le(&[0x34, 0x12]), 0x1234);
    }

    #[test]
    fn indexed_addresses_wrap() {
        assert_eq!(offset_address(0x0010, -0x11), 0xffff);
        assert_eq!(offset_address(0xfff0, 0x20), 0x0010);
    }
}
