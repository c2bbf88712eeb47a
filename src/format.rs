use alloc::vec;

use crate::error::{FormatError, StorageError};
use crate::io::{SeekWhence, Storage, Wrapper};
use crate::region::boot::{
    BootRecord, ExtendedBootRecord, Fat32ExtendedBootRecord, FsInfoSector, BOOT_CODE_OFFSET,
    BOOT_CODE_OFFSET_FAT32, BOOT_CODE_SIZE, BOOT_CODE_SIZE_FAT32, BOOT_SIGNATURE,
    BOOT_SIGNATURE_OFFSET, DEFAULT_VOLUME_LABEL, JUMP_CODE_BOOTABLE, JUMP_CODE_BOOTABLE_FAT32,
    JUMP_CODE_STUB, OEM_IDENTIFIER,
};
use crate::region::dir::DIRENT_SIZE;
use crate::region::fat::{FatVariant, MAX_TOTAL_CLUSTERS};
use crate::types::ClusterID;

pub(crate) const NUMBER_OF_FATS: u8 = 2;
pub(crate) const MEDIA_DESCRIPTOR: u8 = 0xF8;
const SECTORS_PER_TRACK: u16 = 63;
const NUMBER_OF_HEADS: u16 = 255;
/// Conventional FAT32 minimum, leaves room for FSInfo and the backup boot
/// sector.
const FAT32_RESERVED_SECTORS: u16 = 32;

/// Volume parameters supplied by the caller. [`check`](Self::check) must
/// pass before any derived geometry is computed.
#[derive(Copy, Clone, Debug)]
pub struct FatFormatConfig<'a> {
    /// Drives variant selection, must be in `[1, 268435445]`.
    pub total_clusters: u32,
    /// LBA offset of the volume start on the device.
    pub number_of_hidden_sectors: u32,
    /// Power of two, at least 512.
    pub bytes_per_sector: u16,
    /// At least 1; conventional volumes use a power of two.
    pub sectors_per_cluster: u8,
    /// When present the volume is bootable and the code is embedded in the
    /// reserved sectors.
    pub boot_code: Option<&'a [u8]>,
    pub volume_label: [u8; 11],
    pub volume_serial: u32,
}

impl Default for FatFormatConfig<'_> {
    fn default() -> Self {
        Self {
            total_clusters: 0,
            number_of_hidden_sectors: 0,
            bytes_per_sector: 512,
            sectors_per_cluster: 1,
            boot_code: None,
            volume_label: DEFAULT_VOLUME_LABEL,
            volume_serial: 0,
        }
    }
}

impl FatFormatConfig<'_> {
    /// Pure validation, no I/O. Always the first action of a format call.
    pub fn check(&self) -> Result<(), FormatError> {
        Geometry::derive(self).map(|_| ())
    }

    pub fn variant(&self) -> FatVariant {
        FatVariant::from_cluster_count(self.total_clusters)
    }
}

/// Geometry derived from a validated config.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct Geometry {
    pub variant: FatVariant,
    pub reserved_sectors: u16,
    pub root_dirent_count: u16,
    pub sectors_per_fat: u32,
    pub total_sectors: u32,
}

impl Geometry {
    pub fn derive(config: &FatFormatConfig) -> Result<Self, FormatError> {
        if config.total_clusters == 0 || config.total_clusters > MAX_TOTAL_CLUSTERS {
            return Err(FormatError::InvalidTotalClustersCount);
        }
        if config.bytes_per_sector < 512 || !config.bytes_per_sector.is_power_of_two() {
            return Err(FormatError::InvalidBytesPerSector);
        }
        if config.sectors_per_cluster < 1 {
            return Err(FormatError::InvalidSectorsPerCluster);
        }
        let variant = FatVariant::from_cluster_count(config.total_clusters);
        let reserved_sectors = reserved_sector_count(config, variant)?;
        let root_dirent_count = match variant {
            FatVariant::Fat32 => 0,
            _ => root_dirent_count(config.bytes_per_sector),
        };
        let table_bytes = variant.table_bytes(config.total_clusters + 2);
        let bytes_per_sector = config.bytes_per_sector as u64;
        let sectors_per_fat = (table_bytes + bytes_per_sector - 1) / bytes_per_sector;
        let root_sectors = root_dirent_count as u64 * DIRENT_SIZE as u64 / bytes_per_sector;
        let total_sectors = reserved_sectors as u64
            + NUMBER_OF_FATS as u64 * sectors_per_fat
            + root_sectors
            + config.total_clusters as u64 * config.sectors_per_cluster as u64;
        if total_sectors > u32::MAX as u64 {
            return Err(FormatError::InvalidTotalClustersCount);
        }
        Ok(Self {
            variant,
            reserved_sectors,
            root_dirent_count,
            sectors_per_fat: sectors_per_fat as u32,
            total_sectors: total_sectors as u32,
        })
    }
}

/// Minimal reserved-sector count that fits the configured boot code.
///
/// Starts from one sector and a 450-byte capacity, growing a sector at a
/// time. The first sector only stores 448 boot code bytes ahead of the
/// signature, so the count is raised once more when the loop lands exactly
/// in the two-byte gap.
fn reserved_sector_count(config: &FatFormatConfig, variant: FatVariant) -> Result<u16, FormatError> {
    let code = match config.boot_code {
        None if variant == FatVariant::Fat32 => return Ok(FAT32_RESERVED_SECTORS),
        None => return Ok(1),
        Some(code) => code,
    };
    if variant == FatVariant::Fat32 {
        // FSInfo and the backup boot sector occupy the following reserved
        // sectors, so FAT32 boot code cannot spill past its own field.
        if code.len() > BOOT_CODE_SIZE_FAT32 {
            return Err(FormatError::InvalidBootCodeSize);
        }
        return Ok(FAT32_RESERVED_SECTORS);
    }
    let bytes_per_sector = config.bytes_per_sector as u64;
    let length = code.len() as u64;
    let mut reserved: u32 = 1;
    let mut capacity: u64 = 450;
    while capacity < length {
        reserved += 1;
        capacity += bytes_per_sector;
        if reserved > u16::MAX as u32 {
            return Err(FormatError::InvalidBootCodeSize);
        }
    }
    while BOOT_CODE_SIZE as u64 + (reserved as u64 - 1) * bytes_per_sector < length {
        reserved += 1;
        if reserved > u16::MAX as u32 {
            return Err(FormatError::InvalidBootCodeSize);
        }
    }
    Ok(reserved as u16)
}

/// Smallest conventional count whose 32-byte entries exactly fill sectors,
/// so the root directory starts and ends on a sector boundary.
fn root_dirent_count(bytes_per_sector: u16) -> u16 {
    core::cmp::max(512, bytes_per_sector / DIRENT_SIZE as u16)
}

fn set_fat_entry(variant: FatVariant, table: &mut [u8], cluster: u32, value: u32) {
    let cluster = ClusterID::from(cluster);
    let offset = variant.entry_offset(cluster) as usize;
    let window = &mut table[offset..offset + variant.entry_window()];
    variant.encode_entry(cluster, window, value);
}

pub(crate) fn format_volume<S: Storage>(
    io: &mut Wrapper<S>,
    config: &FatFormatConfig,
) -> Result<(), StorageError<S>> {
    let geometry = Geometry::derive(config)?;
    let variant = geometry.variant;
    let bytes_per_sector = config.bytes_per_sector as u64;
    let base = bytes_per_sector * config.number_of_hidden_sectors as u64;
    info!(
        "formatting FAT{} volume: {} clusters, {} total sectors",
        variant.entry_bits(),
        config.total_clusters,
        geometry.total_sectors
    );
    debug!("derived geometry: {:?}", geometry);

    let jump_code = match (config.boot_code, variant) {
        (None, _) => JUMP_CODE_STUB,
        (Some(_), FatVariant::Fat32) => JUMP_CODE_BOOTABLE_FAT32,
        (Some(_), _) => JUMP_CODE_BOOTABLE,
    };
    let record = BootRecord {
        jump_code,
        oem_identifier: OEM_IDENTIFIER,
        bytes_per_sector: config.bytes_per_sector,
        sectors_per_cluster: config.sectors_per_cluster,
        reserved_sectors: geometry.reserved_sectors,
        number_of_fats: NUMBER_OF_FATS,
        root_dirent_count: geometry.root_dirent_count,
        total_sectors_small: match geometry.total_sectors {
            total if total < 65536 => total as u16,
            _ => 0,
        },
        media_descriptor: MEDIA_DESCRIPTOR,
        sectors_per_fat_small: match variant {
            FatVariant::Fat32 => 0,
            _ => geometry.sectors_per_fat as u16,
        },
        sectors_per_track: SECTORS_PER_TRACK,
        number_of_heads: NUMBER_OF_HEADS,
        hidden_sectors: config.number_of_hidden_sectors,
        total_sectors_large: match geometry.total_sectors {
            total if total < 65536 => 0,
            total => total,
        },
    };

    let mut sector = vec![0u8; config.bytes_per_sector as usize];
    record.write_to(&mut sector);
    match variant {
        FatVariant::Fat32 => Fat32ExtendedBootRecord {
            sectors_per_fat_large: geometry.sectors_per_fat,
            volume_serial: config.volume_serial,
            volume_label: config.volume_label,
            ..Default::default()
        }
        .write_to(&mut sector),
        _ => ExtendedBootRecord {
            volume_serial: config.volume_serial,
            volume_label: config.volume_label,
            ..Default::default()
        }
        .write_to(&mut sector),
    }
    let (code_offset, code_size) = match variant {
        FatVariant::Fat32 => (BOOT_CODE_OFFSET_FAT32, BOOT_CODE_SIZE_FAT32),
        _ => (BOOT_CODE_OFFSET, BOOT_CODE_SIZE),
    };
    if let Some(code) = config.boot_code {
        let chunk = &code[..code.len().min(code_size)];
        sector[code_offset..code_offset + chunk.len()].copy_from_slice(chunk);
    }
    sector[BOOT_SIGNATURE_OFFSET..BOOT_SIGNATURE_OFFSET + 2].copy_from_slice(&BOOT_SIGNATURE);

    // The boot sector is not assumed to live at device offset 0
    io.seek(SeekWhence::Beginning(base))?;
    io.write_all(&sector)?;

    if variant == FatVariant::Fat32 {
        let mut fsinfo = vec![0u8; config.bytes_per_sector as usize];
        FsInfoSector {
            free_clusters: config.total_clusters - 1,
            next_free_cluster: u32::from(ClusterID::FIRST) + 1,
        }
        .write_to(&mut fsinfo);
        io.write_all_at(base + bytes_per_sector, &fsinfo)?;
        io.write_all_at(base + 6 * bytes_per_sector, &sector)?;
    } else if let Some(code) = config.boot_code {
        if code.len() > code_size {
            io.write_all_at(base + bytes_per_sector, &code[code_size..])?;
        }
    }

    // FAT area: first two entries reserved, the media descriptor echoed
    // into the low byte of FAT[0]; FAT32 additionally ends the root
    // directory chain at cluster 2. Both copies are written in full.
    let fat_start = base + geometry.reserved_sectors as u64 * bytes_per_sector;
    let fat_bytes = geometry.sectors_per_fat as u64 * bytes_per_sector;
    let mut first = vec![0u8; config.bytes_per_sector as usize];
    set_fat_entry(variant, &mut first, 0, variant.media_entry(MEDIA_DESCRIPTOR));
    set_fat_entry(variant, &mut first, 1, variant.end_of_chain());
    if variant == FatVariant::Fat32 {
        set_fat_entry(variant, &mut first, ClusterID::FIRST.into(), variant.end_of_chain());
    }
    let zero = vec![0u8; config.bytes_per_sector as usize];
    for copy in 0..NUMBER_OF_FATS {
        io.write_all_at(fat_start + copy as u64 * fat_bytes, &first)?;
        for _ in 1..geometry.sectors_per_fat {
            io.write_all(&zero)?;
        }
    }

    // Root directory: the fixed region after the FAT area, or the root
    // cluster for FAT32. Initialized to end-of-directory markers.
    let root_start = fat_start + NUMBER_OF_FATS as u64 * fat_bytes;
    let root_bytes = match variant {
        FatVariant::Fat32 => config.sectors_per_cluster as u64 * bytes_per_sector,
        _ => geometry.root_dirent_count as u64 * DIRENT_SIZE as u64,
    };
    io.seek(SeekWhence::Beginning(root_start))?;
    for _ in 0..root_bytes / bytes_per_sector {
        io.write_all(&zero)?;
    }
    Ok(())
}
