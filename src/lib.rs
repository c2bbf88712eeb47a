#![doc = include_str!("../README.md")]
#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

#[macro_use]
extern crate hex_literal;
extern crate heapless;
#[macro_use]
extern crate log;

mod dir;
pub mod error;
mod fat;
mod file;
pub mod format;
pub(crate) mod fs;
pub mod io;
pub mod region;
pub(crate) mod sync;
pub mod types;

pub use dir::{DirEntry, Directory, FileOrDirectory};
use error::StorageError;
pub use file::File;
pub use format::FatFormatConfig;
use fs::Layout;
pub use io::{SeekWhence, Storage};
use io::Wrapper;
pub use region::fat::{FatVariant, MAX_TOTAL_CLUSTERS};
use sync::{shared, Shared};

/// The facade binding one storage capability to the filesystem core.
pub struct FatFs<S: Storage> {
    io: Shared<Wrapper<S>>,
}

impl<S: Storage> FatFs<S> {
    pub fn new(storage: S) -> Self {
        Self { io: shared(Wrapper::new(storage)) }
    }

    /// Formats the device as FAT12, FAT16 or FAT32, selected by the
    /// configured cluster count. Validation runs before any write; a
    /// failure mid-format may leave the device partially written.
    pub fn format_with_config(&mut self, config: &FatFormatConfig) -> Result<(), StorageError<S>> {
        let shared = self.io.clone();
        let mut io = acquire!(shared);
        format::format_volume(&mut io, config)
    }

    /// Reads and validates the boot sector at device offset 0. A volume
    /// inside a partition is mounted through a capability windowed at the
    /// partition start.
    pub fn mount(&mut self) -> Result<Volume<S>, StorageError<S>> {
        let info = {
            let shared = self.io.clone();
            let mut io = acquire!(shared);
            let mut sector = [0u8; 512];
            io.read_exact_at(0, &mut sector)?;
            fs::parse_boot_sector(&sector)?
        };
        info!(
            "mounted FAT{} volume, {} clusters of {}B",
            info.layout.variant.entry_bits(),
            info.layout.total_clusters,
            info.layout.cluster_bytes()
        );
        let fat = fat::Fat::new(&info.layout);
        Ok(Volume {
            io: self.io.clone(),
            layout: info.layout,
            fat,
            serial_number: info.serial_number,
            label: info.label,
        })
    }

    /// Releases the storage capability if no directory or file still
    /// shares it.
    pub fn try_free(self) -> Result<S, Self> {
        let FatFs { io } = self;
        let io = match () {
            #[cfg(all(feature = "sync", feature = "std"))]
            () => alloc::sync::Arc::try_unwrap(io).map(|mutex| mutex.into_inner().unwrap()),
            #[cfg(all(feature = "sync", not(feature = "std")))]
            () => alloc::sync::Arc::try_unwrap(io).map(|mutex| mutex.into_inner()),
            #[cfg(not(feature = "sync"))]
            () => alloc::rc::Rc::try_unwrap(io).map(|cell| cell.into_inner()),
        };
        match io {
            Ok(io) => Ok(io.unwrap()),
            Err(io) => Err(Self { io }),
        }
    }
}

/// A mounted volume.
pub struct Volume<S: Storage> {
    io: Shared<Wrapper<S>>,
    layout: Layout,
    fat: fat::Fat,
    serial_number: u32,
    label: [u8; 11],
}

impl<S: Storage> Volume<S> {
    pub fn variant(&self) -> FatVariant {
        self.layout.variant
    }

    pub fn serial_number(&self) -> u32 {
        self.serial_number
    }

    /// Space-padded label from the extended boot record.
    pub fn label(&self) -> [u8; 11] {
        self.label
    }

    pub fn total_clusters(&self) -> u32 {
        self.layout.total_clusters
    }

    pub fn root_directory(&self) -> Directory<S> {
        let location = match self.layout.variant {
            FatVariant::Fat32 => dir::DirLocation::Chain(self.layout.root_cluster),
            _ => dir::DirLocation::Region {
                start: self.layout.root_start,
                count: self.layout.root_dirent_count,
            },
        };
        Directory { io: self.io.clone(), layout: self.layout, fat: self.fat, location }
    }
}
