use std::fs;
use std::io::{prelude::*, SeekFrom};
use std::path::Path;

use super::{SeekWhence, Storage};

/// Storage capability over a disk-image file.
#[derive(Debug)]
pub struct FileIO {
    file: fs::File,
}

impl FileIO {
    pub fn open<P: AsRef<Path>>(filepath: P) -> std::io::Result<Self> {
        let file = fs::File::options().read(true).write(true).open(filepath)?;
        Ok(Self { file })
    }
}

fn end_offset(offset: u64) -> std::io::Result<i64> {
    let offset = i64::try_from(offset)
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "offset too large"))?;
    Ok(-offset)
}

impl Storage for FileIO {
    type ReadError = std::io::Error;
    type WriteError = std::io::Error;
    type SeekError = std::io::Error;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::ReadError> {
        self.file.read(buf)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<usize, Self::WriteError> {
        self.file.write(bytes)
    }

    fn seek(&mut self, whence: Option<SeekWhence>) -> Result<u64, Self::SeekError> {
        let seek = match whence {
            None => return self.file.stream_position(),
            Some(SeekWhence::Beginning(offset)) => SeekFrom::Start(offset),
            Some(SeekWhence::Relative(offset)) => SeekFrom::Current(offset),
            Some(SeekWhence::Ending(offset)) => SeekFrom::End(end_offset(offset)?),
        };
        self.file.seek(seek)
    }
}
