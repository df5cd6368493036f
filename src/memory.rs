//! Flat byte-addressable memory shared by code, data and the stack.
//! Every access is bounds-checked; nothing outside the buffer is ever touched.

use crate::config::MAX_MEMORY_SIZE;
use crate::error::VmError;

/// Single contiguous buffer, sized once by the host.
#[derive(Clone, Debug)]
pub struct Memory {
    bytes: Vec<u8>,
}

impl Memory {
    /// Zeroed buffer of `size` bytes (1..=64KB).
    pub fn new(size: usize) -> Result<Self, VmError> {
        if size == 0 || size > MAX_MEMORY_SIZE {
            return Err(VmError::InvalidConfig(format!(
                "memory size must be 1..={MAX_MEMORY_SIZE} bytes, got {size}"
            )));
        }
        Ok(Self {
            bytes: vec![0u8; size],
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    fn check_range(&self, address: usize, length: usize) -> Result<std::ops::Range<usize>, VmError> {
        let end = address
            .checked_add(length)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(VmError::BoundsViolation { address, length })?;
        Ok(address..end)
    }

    /// `length` bytes starting at `address`.
    pub fn read(&self, address: usize, length: usize) -> Result<&[u8], VmError> {
        let range = self.check_range(address, length)?;
        Ok(&self.bytes[range])
    }

    pub fn read_u8(&self, address: usize) -> Result<u8, VmError> {
        Ok(self.read(address, 1)?[0])
    }

    /// Writes all of `values` or nothing.
    pub fn write(&mut self, address: usize, values: &[u8]) -> Result<(), VmError> {
        let range = self.check_range(address, values.len())?;
        self.bytes[range].copy_from_slice(values);
        Ok(())
    }

    /// Host-side image placement; reports `ImageTooLarge` instead of a bounds fault.
    pub fn load_image(&mut self, base: usize, image: &[u8]) -> Result<(), VmError> {
        self.write(base, image).map_err(|_| VmError::ImageTooLarge {
            base,
            length: image.len(),
        })
    }
}
