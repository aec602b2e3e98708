//! Word-addressed data memory for the VM.

use crate::error::VmError;

/// A bounds-checked array of signed 32-bit words.
pub trait Storage {
    fn capacity(&self) -> usize;

    fn read(&self, address: i32) -> Result<i32, VmError>;

    fn write(&mut self, address: i32, value: i32) -> Result<(), VmError>;

    fn check_range(&self, address: i32) -> Result<usize, VmError> {
        if address < 0 || address as usize >= self.capacity() {
            return Err(VmError::AddressOutOfRange(address));
        }
        Ok(address as usize)
    }
}

/// The VM's data-memory array: the translator's initial image, padded out to
/// `capacity` words.
#[derive(Clone, Debug)]
pub struct DataMemory {
    words: Vec<i32>,
}

impl DataMemory {
    pub fn new(capacity: usize) -> Self {
        Self {
            words: vec![0; capacity],
        }
    }

    /// Build memory from a translator-provided image, zero-padded to
    /// `capacity` words.
    pub fn with_image(image: &[i32], capacity: usize) -> Self {
        let mut words = image.to_vec();
        words.resize(capacity.max(words.len()), 0);
        Self { words }
    }

    pub fn words(&self) -> &[i32] {
        &self.words
    }
}

impl Storage for DataMemory {
    fn capacity(&self) -> usize {
        self.words.len()
    }

    fn read(&self, address: i32) -> Result<i32, VmError> {
        let index = self.check_range(address)?;
        Ok(self.words[index])
    }

    fn write(&mut self, address: i32, value: i32) -> Result<(), VmError> {
        let index = self.check_range(address)?;
        self.words[index] = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_write_round_trips() {
        let mut mem = DataMemory::new(4);
        mem.write(2, 99).unwrap();
        assert_eq!(mem.read(2), Ok(99));
    }

    #[test]
    fn out_of_range_is_rejected() {
        let mem = DataMemory::new(4);
        assert_eq!(mem.read(4), Err(VmError::AddressOutOfRange(4)));
        assert_eq!(mem.read(-1), Err(VmError::AddressOutOfRange(-1)));
    }

    #[test]
    fn image_is_padded_not_truncated() {
        let mem = DataMemory::with_image(&[1, 2, 3], 5);
        assert_eq!(mem.words(), &[1, 2, 3, 0, 0]);
    }
}
