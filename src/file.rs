use crate::dir::DirEntry;
use crate::error::{DataError, OperationError, StorageError};
use crate::fat::Fat;
use crate::fs::Layout;
use crate::io::{SeekWhence, Storage, Wrapper};
use crate::region::dir::{DIRENT_CLUSTER_HIGH_OFFSET, DIRENT_CLUSTER_LOW_OFFSET, DIRENT_FILE_SIZE_OFFSET};
use crate::sync::{acquire, Shared};
use crate::types::ClusterID;

/// An open regular file. Writes go through to the device immediately,
/// including the in-place directory-entry update when the size or first
/// cluster changes.
pub struct File<S: Storage> {
    io: Shared<Wrapper<S>>,
    layout: Layout,
    fat: Fat,
    dirent_location: u64,
    first_cluster: ClusterID,
    last_cluster: ClusterID,
    /// Bytes covered by the allocated chain.
    capacity: u64,
    size: u32,
    cursor: u32,
    /// Chain position cache, cluster at the given chain index.
    cached: Option<(ClusterID, u32)>,
}

impl<S: Storage> File<S> {
    pub(crate) fn open(
        io: Shared<Wrapper<S>>,
        layout: Layout,
        fat: Fat,
        entry: &DirEntry,
    ) -> Result<Self, StorageError<S>> {
        let mut file = Self {
            io,
            layout,
            fat,
            dirent_location: entry.location,
            first_cluster: entry.first_cluster,
            last_cluster: ClusterID::default(),
            capacity: 0,
            size: entry.size,
            cursor: 0,
            cached: None,
        };
        if entry.first_cluster.valid() {
            if !layout.cluster_valid(entry.first_cluster) {
                return Err(DataError::DirectoryEntry.into());
            }
            let shared = file.io.clone();
            let mut io = acquire!(shared);
            let (count, last) = fat.chain_end(&mut io, entry.first_cluster)?;
            file.capacity = count as u64 * layout.cluster_bytes();
            file.last_cluster = last;
        }
        if entry.size as u64 > file.capacity {
            return Err(DataError::DirectoryEntry.into());
        }
        Ok(file)
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Fills `buf` up to end of file. Reading at end of file is an error.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, StorageError<S>> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.cursor >= self.size {
            return Err(OperationError::EOF.into());
        }
        let length = buf.len().min((self.size - self.cursor) as usize);
        let cluster_bytes = self.layout.cluster_bytes();
        let shared = self.io.clone();
        let mut io = acquire!(shared);
        let mut filled = 0;
        while filled < length {
            let cursor = self.cursor as u64;
            let offset = cursor % cluster_bytes;
            let cluster = self.cluster_at(&mut io, (cursor / cluster_bytes) as u32)?;
            let chunk = (length - filled).min((cluster_bytes - offset) as usize);
            let start = self.layout.cluster_start(cluster) + offset;
            io.read_exact_at(start, &mut buf[filled..filled + chunk])?;
            filled += chunk;
            self.cursor += chunk as u32;
        }
        Ok(length)
    }

    /// Writes all of `bytes` at the cursor, extending the cluster chain and
    /// the recorded file size as needed.
    pub fn write(&mut self, bytes: &[u8]) -> Result<usize, StorageError<S>> {
        if bytes.is_empty() {
            return Ok(0);
        }
        // File sizes are 32-bit on disk
        if self.cursor as u64 + bytes.len() as u64 > u32::MAX as u64 {
            return Err(OperationError::FileSizeLimit.into());
        }
        let cluster_bytes = self.layout.cluster_bytes();
        let shared = self.io.clone();
        let mut io = acquire!(shared);
        let mut written = 0;
        while written < bytes.len() {
            if self.cursor as u64 == self.capacity {
                let previous = (self.capacity > 0).then_some(self.last_cluster);
                let cluster = self.fat.allocate(&mut io, previous)?;
                if self.capacity == 0 {
                    self.first_cluster = cluster;
                    self.sync_dirent_cluster(&mut io)?;
                }
                self.last_cluster = cluster;
                self.capacity += cluster_bytes;
            }
            let cursor = self.cursor as u64;
            let offset = cursor % cluster_bytes;
            let cluster = self.cluster_at(&mut io, (cursor / cluster_bytes) as u32)?;
            let chunk = (bytes.len() - written).min((cluster_bytes - offset) as usize);
            let start = self.layout.cluster_start(cluster) + offset;
            io.write_all_at(start, &bytes[written..written + chunk])?;
            written += chunk;
            self.cursor += chunk as u32;
        }
        if self.cursor > self.size {
            self.size = self.cursor;
            let size = self.size;
            io.write_all_at(self.dirent_location + DIRENT_FILE_SIZE_OFFSET, &size.to_le_bytes())?;
        }
        Ok(bytes.len())
    }

    pub fn write_all(&mut self, bytes: &[u8]) -> Result<(), StorageError<S>> {
        self.write(bytes).map(|_| ())
    }

    /// Repositions the cursor within `0..=size`; the position just past the
    /// last byte is valid and appends.
    pub fn seek(&mut self, whence: SeekWhence) -> Result<u64, StorageError<S>> {
        let target = match whence {
            SeekWhence::Beginning(offset) => i64::try_from(offset).ok(),
            SeekWhence::Relative(offset) => (self.cursor as i64).checked_add(offset),
            SeekWhence::Ending(offset) => {
                i64::try_from(offset).ok().map(|offset| self.size as i64 - offset)
            }
        };
        let target = target.ok_or(OperationError::SeekPosition)?;
        if target < 0 || target > self.size as i64 {
            return Err(OperationError::SeekPosition.into());
        }
        self.cursor = target as u32;
        Ok(target as u64)
    }

    /// Current cursor position.
    pub fn tell(&self) -> u64 {
        self.cursor as u64
    }

    fn cluster_at(
        &mut self,
        io: &mut Wrapper<S>,
        index: u32,
    ) -> Result<ClusterID, StorageError<S>> {
        let (mut cluster, mut at) = match self.cached {
            Some((cluster, at)) if at <= index => (cluster, at),
            _ => (self.first_cluster, 0),
        };
        while at < index {
            cluster = match self.fat.next(io, cluster)? {
                Some(next) => next,
                None => return Err(DataError::BadClusterChain.into()),
            };
            at += 1;
        }
        self.cached = Some((cluster, at));
        Ok(cluster)
    }

    fn sync_dirent_cluster(&self, io: &mut Wrapper<S>) -> Result<(), StorageError<S>> {
        let cluster = u32::from(self.first_cluster);
        let high = ((cluster >> 16) as u16).to_le_bytes();
        let low = (cluster as u16).to_le_bytes();
        io.write_all_at(self.dirent_location + DIRENT_CLUSTER_HIGH_OFFSET, &high)?;
        io.write_all_at(self.dirent_location + DIRENT_CLUSTER_LOW_OFFSET, &low)
    }
}
