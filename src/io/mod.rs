pub mod mem;
#[cfg(feature = "std")]
pub mod std;

use core::fmt::Debug;

use crate::error::{DataError, Error, StorageError};

/// Reference point of a seek, always resolved against the whole device.
///
/// `Beginning(n)` is absolute byte `n` from the start of the medium, not of
/// a partition. Callers addressing a volume inside a partition pre-add
/// `number_of_hidden_sectors * bytes_per_sector`. `Ending(n)` resolves to
/// `device_length - n` and must not go negative.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SeekWhence {
    Beginning(u64),
    Relative(i64),
    Ending(u64),
}

/// The storage capability the driver is bound to.
///
/// Supplied by the caller at facade construction, never allocated or freed
/// by the driver. `read` and `write` may return short counts; `seek(None)`
/// performs no movement and reports the current absolute position.
pub trait Storage {
    type ReadError: Debug;
    type WriteError: Debug;
    type SeekError: Debug;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::ReadError>;
    fn write(&mut self, bytes: &[u8]) -> Result<usize, Self::WriteError>;
    fn seek(&mut self, whence: Option<SeekWhence>) -> Result<u64, Self::SeekError>;
}

/// Maps backend errors into [`StorageError`] and turns the short-count
/// primitives into exact positioned reads and writes.
pub(crate) struct Wrapper<S>(S);

impl<S: Storage> Wrapper<S> {
    pub fn new(storage: S) -> Self {
        Wrapper(storage)
    }

    pub fn unwrap(self) -> S {
        self.0
    }

    pub fn seek(&mut self, whence: SeekWhence) -> Result<u64, StorageError<S>> {
        self.0.seek(Some(whence)).map_err(Error::Seek)
    }

    pub fn read_exact(&mut self, mut buf: &mut [u8]) -> Result<(), StorageError<S>> {
        while !buf.is_empty() {
            let count = self.0.read(buf).map_err(Error::Read)?;
            if count == 0 {
                return Err(DataError::UnexpectedEof.into());
            }
            buf = &mut buf[count..];
        }
        Ok(())
    }

    pub fn write_all(&mut self, mut bytes: &[u8]) -> Result<(), StorageError<S>> {
        while !bytes.is_empty() {
            let count = self.0.write(bytes).map_err(Error::Write)?;
            if count == 0 {
                return Err(DataError::UnexpectedEof.into());
            }
            bytes = &bytes[count..];
        }
        Ok(())
    }

    pub fn read_exact_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), StorageError<S>> {
        self.seek(SeekWhence::Beginning(offset))?;
        self.read_exact(buf)
    }

    pub fn write_all_at(&mut self, offset: u64, bytes: &[u8]) -> Result<(), StorageError<S>> {
        self.seek(SeekWhence::Beginning(offset))?;
        self.write_all(bytes)
    }
}
