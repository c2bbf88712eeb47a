//! Fixed-size in-memory storage, for disk-image tooling and tests.

use alloc::vec;
use alloc::vec::Vec;

use thiserror::Error;

use super::{SeekWhence, Storage};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum RamDiskError {
    #[error("seek resolves outside the device")]
    SeekOutOfBounds,
}

#[derive(Debug)]
pub struct RamDisk {
    bytes: Vec<u8>,
    cursor: u64,
}

impl RamDisk {
    pub fn new(size: usize) -> Self {
        Self { bytes: vec![0u8; size], cursor: 0 }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes, cursor: 0 }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl Storage for RamDisk {
    type ReadError = RamDiskError;
    type WriteError = RamDiskError;
    type SeekError = RamDiskError;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, RamDiskError> {
        let remain = self.bytes.len().saturating_sub(self.cursor as usize);
        let count = buf.len().min(remain);
        let start = self.cursor as usize;
        buf[..count].copy_from_slice(&self.bytes[start..start + count]);
        self.cursor += count as u64;
        Ok(count)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<usize, RamDiskError> {
        let remain = self.bytes.len().saturating_sub(self.cursor as usize);
        let count = bytes.len().min(remain);
        let start = self.cursor as usize;
        self.bytes[start..start + count].copy_from_slice(&bytes[..count]);
        self.cursor += count as u64;
        Ok(count)
    }

    fn seek(&mut self, whence: Option<SeekWhence>) -> Result<u64, RamDiskError> {
        let length = self.bytes.len() as u64;
        let position = match whence {
            None => return Ok(self.cursor),
            Some(SeekWhence::Beginning(offset)) => offset,
            Some(SeekWhence::Relative(offset)) => {
                let position = (self.cursor as i64).checked_add(offset);
                match position {
                    Some(position) if position >= 0 => position as u64,
                    _ => return Err(RamDiskError::SeekOutOfBounds),
                }
            }
            Some(SeekWhence::Ending(offset)) => {
                length.checked_sub(offset).ok_or(RamDiskError::SeekOutOfBounds)?
            }
        };
        if position > length {
            return Err(RamDiskError::SeekOutOfBounds);
        }
        self.cursor = position;
        Ok(position)
    }
}

#[cfg(test)]
mod test {
    use super::{RamDisk, RamDiskError, SeekWhence, Storage};

    #[test]
    fn test_ending_seek_reports_length() {
        let mut disk = RamDisk::new(4096);
        assert_eq!(disk.seek(Some(SeekWhence::Ending(0))), Ok(4096));
        assert_eq!(disk.seek(None), Ok(4096));
    }

    #[test]
    fn test_relative_zero_is_idempotent() {
        let mut disk = RamDisk::new(4096);
        disk.seek(Some(SeekWhence::Beginning(123))).unwrap();
        assert_eq!(disk.seek(Some(SeekWhence::Relative(0))), Ok(123));
        assert_eq!(disk.seek(Some(SeekWhence::Relative(0))), Ok(123));
    }

    #[test]
    fn test_negative_resolution_rejected() {
        let mut disk = RamDisk::new(64);
        let result = disk.seek(Some(SeekWhence::Ending(65)));
        assert_eq!(result, Err(RamDiskError::SeekOutOfBounds));
        disk.seek(Some(SeekWhence::Beginning(1))).unwrap();
        assert_eq!(disk.seek(Some(SeekWhence::Relative(-2))), Err(RamDiskError::SeekOutOfBounds));
    }

    #[test]
    fn test_short_read_at_end() {
        let mut disk = RamDisk::new(10);
        disk.seek(Some(SeekWhence::Beginning(8))).unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(disk.read(&mut buf), Ok(2));
        assert_eq!(disk.read(&mut buf), Ok(0));
    }
}
