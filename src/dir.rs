use crate::error::{DataError, Error, OperationError, StorageError};
use crate::fat::Fat;
use crate::file::File;
use crate::fs::Layout;
use crate::io::{Storage, Wrapper};
use crate::region::dir::{encode_name, Attributes, RawDirEntry, Timestamp, DIRENT_SIZE};
use crate::sync::{acquire, Shared};
use crate::types::ClusterID;

/// One live directory entry, short name decoded to `NAME.EXT` form.
#[derive(Clone, Debug)]
pub struct DirEntry {
    pub name: heapless::String<12>,
    pub attributes: Attributes,
    pub size: u32,
    pub modification: Timestamp,
    pub(crate) first_cluster: ClusterID,
    /// Absolute byte offset of the raw entry, for in-place metadata updates.
    pub(crate) location: u64,
}

impl DirEntry {
    pub fn is_directory(&self) -> bool {
        self.attributes.directory() != 0
    }

    fn new(raw: &RawDirEntry, location: u64) -> Self {
        Self {
            name: raw.decoded_name(),
            attributes: raw.attributes,
            size: raw.size,
            modification: raw.modification,
            first_cluster: raw.first_cluster.into(),
            location,
        }
    }
}

/// FAT12/16 root directories live in a fixed region between the FAT area
/// and the data area; everything else is a cluster chain.
pub(crate) enum DirLocation {
    Region { start: u64, count: u16 },
    Chain(ClusterID),
}

pub struct Directory<S: Storage> {
    pub(crate) io: Shared<Wrapper<S>>,
    pub(crate) layout: Layout,
    pub(crate) fat: Fat,
    pub(crate) location: DirLocation,
}

pub enum FileOrDirectory<S: Storage> {
    File(File<S>),
    Directory(Directory<S>),
}

impl<S: Storage> Directory<S> {
    /// Calls `f` for every live entry, skipping erased, long-name and
    /// volume-label entries.
    pub fn walk(&mut self, mut f: impl FnMut(&DirEntry)) -> Result<(), StorageError<S>> {
        self.walk_until(|entry| {
            f(entry);
            false
        })
        .map(|_| ())
    }

    pub fn find(&mut self, name: &str) -> Result<DirEntry, StorageError<S>> {
        let encoded = encode_name(name).map_err(Error::Operation)?;
        let found = self.walk_raw(|raw, location| {
            (raw.name == encoded).then(|| DirEntry::new(raw, location))
        })?;
        found.ok_or(OperationError::NoSuchFileOrDirectory.into())
    }

    pub fn open(&mut self, name: &str) -> Result<FileOrDirectory<S>, StorageError<S>> {
        let entry = self.find(name)?;
        if entry.is_directory() {
            if !self.layout.cluster_valid(entry.first_cluster) {
                return Err(DataError::DirectoryEntry.into());
            }
            return Ok(FileOrDirectory::Directory(Directory {
                io: self.io.clone(),
                layout: self.layout,
                fat: self.fat,
                location: DirLocation::Chain(entry.first_cluster),
            }));
        }
        Ok(FileOrDirectory::File(File::open(self.io.clone(), self.layout, self.fat, &entry)?))
    }

    pub fn open_file(&mut self, name: &str) -> Result<File<S>, StorageError<S>> {
        match self.open(name)? {
            FileOrDirectory::File(file) => Ok(file),
            FileOrDirectory::Directory(_) => Err(OperationError::NotAFile.into()),
        }
    }

    pub fn open_directory(&mut self, name: &str) -> Result<Directory<S>, StorageError<S>> {
        match self.open(name)? {
            FileOrDirectory::Directory(directory) => Ok(directory),
            FileOrDirectory::File(_) => Err(OperationError::NotADirectory.into()),
        }
    }

    fn walk_until(
        &mut self,
        mut f: impl FnMut(&DirEntry) -> bool,
    ) -> Result<Option<DirEntry>, StorageError<S>> {
        self.walk_raw(|raw, location| {
            let entry = DirEntry::new(raw, location);
            f(&entry).then_some(entry)
        })
    }

    /// Drives the sequential scan, yielding each live raw entry and its
    /// absolute location until `f` produces a result or the end marker.
    fn walk_raw<R>(
        &mut self,
        mut f: impl FnMut(&RawDirEntry, u64) -> Option<R>,
    ) -> Result<Option<R>, StorageError<S>> {
        let shared = self.io.clone();
        let mut io = acquire!(shared);
        match self.location {
            DirLocation::Region { start, count } => {
                match scan_entries(&mut io, start, count as u64, &mut f)? {
                    Scan::Found(result) => Ok(Some(result)),
                    Scan::End | Scan::Exhausted => Ok(None),
                }
            }
            DirLocation::Chain(first) => {
                let entries_per_cluster = self.layout.cluster_bytes() / DIRENT_SIZE as u64;
                let mut cluster = Some(first);
                let mut visited: u32 = 0;
                while let Some(current) = cluster {
                    let start = self.layout.cluster_start(current);
                    match scan_entries(&mut io, start, entries_per_cluster, &mut f)? {
                        Scan::Found(result) => return Ok(Some(result)),
                        // The end marker terminates the whole directory
                        Scan::End => return Ok(None),
                        Scan::Exhausted => (),
                    }
                    visited += 1;
                    if visited > self.layout.total_clusters {
                        return Err(DataError::BadClusterChain.into());
                    }
                    cluster = self.fat.next(&mut io, current)?;
                }
                Ok(None)
            }
        }
    }
}

enum Scan<R> {
    Found(R),
    End,
    Exhausted,
}

fn scan_entries<S: Storage, R>(
    io: &mut Wrapper<S>,
    start: u64,
    count: u64,
    f: &mut impl FnMut(&RawDirEntry, u64) -> Option<R>,
) -> Result<Scan<R>, StorageError<S>> {
    let mut bytes = [0u8; DIRENT_SIZE];
    for index in 0..count {
        let location = start + index * DIRENT_SIZE as u64;
        io.read_exact_at(location, &mut bytes)?;
        if RawDirEntry::is_end(&bytes) {
            return Ok(Scan::End);
        }
        if RawDirEntry::is_erased(&bytes) {
            continue;
        }
        let raw = RawDirEntry::parse(&bytes);
        if raw.attributes.long_name() || raw.attributes.volume_label() != 0 {
            continue;
        }
        if let Some(result) = f(&raw, location) {
            return Ok(Scan::Found(result));
        }
    }
    Ok(Scan::Exhausted)
}
