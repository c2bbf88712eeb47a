use crate::error::DataError;
use crate::region::boot::{
    BootRecord, ExtendedBootRecord, Fat32ExtendedBootRecord, BOOT_SIGNATURE, BOOT_SIGNATURE_OFFSET,
};
use crate::region::dir::DIRENT_SIZE;
use crate::region::fat::FatVariant;
use crate::types::ClusterID;

/// Region offsets of a mounted volume, in bytes from where the boot sector
/// was read. A volume inside a partition is addressed through a capability
/// windowed at the partition start; the hidden-sector field is not used for
/// positioning.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Layout {
    pub variant: FatVariant,
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub number_of_fats: u8,
    pub fat_start: u64,
    pub fat_bytes: u64,
    pub root_start: u64,
    pub root_dirent_count: u16,
    pub data_start: u64,
    pub total_clusters: u32,
    pub root_cluster: ClusterID,
}

impl Layout {
    pub fn cluster_bytes(&self) -> u64 {
        self.sectors_per_cluster as u64 * self.bytes_per_sector as u64
    }

    /// Absolute byte offset of a data cluster.
    pub fn cluster_start(&self, cluster: ClusterID) -> u64 {
        self.data_start + cluster.offset() as u64 * self.cluster_bytes()
    }

    pub fn cluster_valid(&self, cluster: ClusterID) -> bool {
        cluster.valid() && u32::from(cluster) < self.total_clusters + u32::from(ClusterID::FIRST)
    }
}

#[derive(Debug)]
pub(crate) struct VolumeInfo {
    pub layout: Layout,
    pub serial_number: u32,
    pub label: [u8; 11],
}

/// Parses and validates the boot sector, deriving the region layout. The
/// variant is re-derived from the real cluster count, never taken from the
/// informational filesystem-type string.
pub(crate) fn parse_boot_sector(sector: &[u8]) -> Result<VolumeInfo, DataError> {
    if sector[BOOT_SIGNATURE_OFFSET..BOOT_SIGNATURE_OFFSET + 2] != BOOT_SIGNATURE {
        return Err(DataError::BootSignature);
    }
    let record = BootRecord::parse(sector);
    if !record.has_valid_jump() {
        return Err(DataError::NotFAT);
    }
    if record.bytes_per_sector < 512 || !record.bytes_per_sector.is_power_of_two() {
        return Err(DataError::NotFAT);
    }
    if record.sectors_per_cluster == 0 {
        return Err(DataError::NotFAT);
    }
    if record.number_of_fats == 0 || record.reserved_sectors == 0 {
        return Err(DataError::NotFAT);
    }

    let bytes_per_sector = record.bytes_per_sector as u64;
    let root_sectors = (record.root_dirent_count as u64 * DIRENT_SIZE as u64)
        .div_ceil(bytes_per_sector);
    let fat32 = Fat32ExtendedBootRecord::parse(sector);
    let sectors_per_fat = match record.sectors_per_fat_small {
        0 => fat32.sectors_per_fat_large as u64,
        small => small as u64,
    };
    if sectors_per_fat == 0 {
        return Err(DataError::NotFAT);
    }
    let metadata_sectors = record.reserved_sectors as u64
        + record.number_of_fats as u64 * sectors_per_fat
        + root_sectors;
    let total_sectors = record.total_sectors() as u64;
    if total_sectors <= metadata_sectors {
        return Err(DataError::NotFAT);
    }
    let total_clusters = ((total_sectors - metadata_sectors)
        / record.sectors_per_cluster as u64) as u32;
    if total_clusters == 0 {
        return Err(DataError::NotFAT);
    }
    let variant = FatVariant::from_cluster_count(total_clusters);

    let fat_start = record.reserved_sectors as u64 * bytes_per_sector;
    let fat_bytes = sectors_per_fat * bytes_per_sector;
    let root_start = fat_start + record.number_of_fats as u64 * fat_bytes;
    let data_start = root_start + root_sectors * bytes_per_sector;
    let (serial_number, label, root_cluster) = match variant {
        FatVariant::Fat32 => {
            (fat32.volume_serial, fat32.volume_label, ClusterID::from(fat32.root_cluster))
        }
        _ => {
            let extended = ExtendedBootRecord::parse(sector);
            (extended.volume_serial, extended.volume_label, ClusterID::default())
        }
    };
    let layout = Layout {
        variant,
        bytes_per_sector: record.bytes_per_sector,
        sectors_per_cluster: record.sectors_per_cluster,
        number_of_fats: record.number_of_fats,
        fat_start,
        fat_bytes,
        root_start,
        root_dirent_count: record.root_dirent_count,
        data_start,
        total_clusters,
        root_cluster,
    };
    if variant == FatVariant::Fat32 && !layout.cluster_valid(layout.root_cluster) {
        return Err(DataError::NotFAT);
    }
    debug!("volume layout: {:?}", layout);
    Ok(VolumeInfo { layout, serial_number, label })
}
