use crate::error::{DataError, OperationError, StorageError};
use crate::fs::Layout;
use crate::io::{Storage, Wrapper};
use crate::region::fat::{Entry, FatVariant};
use crate::types::ClusterID;

/// File allocation table access over the storage capability. Entry updates
/// are mirrored into every FAT copy.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Fat {
    variant: FatVariant,
    start: u64,
    table_bytes: u64,
    copies: u8,
    total_clusters: u32,
}

impl Fat {
    pub fn new(layout: &Layout) -> Self {
        Self {
            variant: layout.variant,
            start: layout.fat_start,
            table_bytes: layout.fat_bytes,
            copies: layout.number_of_fats,
            total_clusters: layout.total_clusters,
        }
    }

    fn in_range(&self, cluster: ClusterID) -> bool {
        cluster.valid() && u32::from(cluster) < self.total_clusters + u32::from(ClusterID::FIRST)
    }

    fn window_offset(&self, cluster: ClusterID) -> u64 {
        self.start + self.variant.entry_offset(cluster)
    }

    pub fn entry<S: Storage>(
        &self,
        io: &mut Wrapper<S>,
        cluster: ClusterID,
    ) -> Result<Entry, StorageError<S>> {
        let width = self.variant.entry_window();
        let mut window = [0u8; 4];
        io.read_exact_at(self.window_offset(cluster), &mut window[..width])?;
        let raw = self.variant.decode_entry(cluster, &window[..width]);
        Ok(Entry::decode(self.variant, raw))
    }

    pub fn set_entry<S: Storage>(
        &self,
        io: &mut Wrapper<S>,
        cluster: ClusterID,
        entry: Entry,
    ) -> Result<(), StorageError<S>> {
        let value = entry.encode(self.variant);
        let width = self.variant.entry_window();
        for copy in 0..self.copies {
            let offset = copy as u64 * self.table_bytes + self.window_offset(cluster);
            let mut window = [0u8; 4];
            // Read-modify-write keeps the neighbouring FAT12 half-entry and
            // the reserved FAT32 top bits intact
            io.read_exact_at(offset, &mut window[..width])?;
            self.variant.encode_entry(cluster, &mut window[..width], value);
            io.write_all_at(offset, &window[..width])?;
        }
        Ok(())
    }

    /// Next cluster of a chain, `None` at end-of-chain.
    pub fn next<S: Storage>(
        &self,
        io: &mut Wrapper<S>,
        cluster: ClusterID,
    ) -> Result<Option<ClusterID>, StorageError<S>> {
        if !self.in_range(cluster) {
            return Err(DataError::BadClusterChain.into());
        }
        match self.entry(io, cluster)? {
            Entry::Next(next) if self.in_range(next) => Ok(Some(next)),
            Entry::Last => Ok(None),
            _ => Err(DataError::BadClusterChain.into()),
        }
    }

    /// Walks a whole chain, returning its length and last cluster.
    pub fn chain_end<S: Storage>(
        &self,
        io: &mut Wrapper<S>,
        first: ClusterID,
    ) -> Result<(u32, ClusterID), StorageError<S>> {
        let mut cluster = first;
        let mut count: u32 = 1;
        while let Some(next) = self.next(io, cluster)? {
            cluster = next;
            count += 1;
            // A chain longer than the cluster count is a cycle
            if count > self.total_clusters {
                return Err(DataError::BadClusterChain.into());
            }
        }
        Ok((count, cluster))
    }

    /// First-fit allocation. The new cluster terminates the chain and is
    /// linked after `previous` when given.
    pub fn allocate<S: Storage>(
        &self,
        io: &mut Wrapper<S>,
        previous: Option<ClusterID>,
    ) -> Result<ClusterID, StorageError<S>> {
        for index in 0..self.total_clusters {
            let cluster = ClusterID::FIRST + index;
            if let Entry::Free = self.entry(io, cluster)? {
                self.set_entry(io, cluster, Entry::Last)?;
                if let Some(previous) = previous {
                    self.set_entry(io, previous, Entry::Next(cluster))?;
                }
                return Ok(cluster);
            }
        }
        Err(OperationError::OutOfSpace.into())
    }
}
