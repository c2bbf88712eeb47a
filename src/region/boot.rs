// Boot region: BPB, the FAT12/16 and FAT32 extended records, FSInfo.
//
// All records are serialized and parsed explicitly at the offsets below
// rather than transmuted from packed structs, so the on-disk layout never
// depends on in-memory representation.

/// Jump target 0x3C lands on the FAT12/16 boot code field at offset 62.
pub const JUMP_CODE_BOOTABLE: [u8; 3] = hex!("EB 3C 90");
/// Jump target 0x58 lands on the FAT32 boot code field at offset 90.
pub const JUMP_CODE_BOOTABLE_FAT32: [u8; 3] = hex!("EB 58 90");
/// Infinite-loop stub for non-bootable volumes.
pub const JUMP_CODE_STUB: [u8; 3] = hex!("EB FE 90");

pub const OEM_IDENTIFIER: [u8; 8] = *b"MSWIN4.1";
pub const DEFAULT_VOLUME_LABEL: [u8; 11] = *b"NO NAME    ";
/// Informational only, never used to determine the actual variant.
pub const FILESYSTEM_TYPE_FAT: [u8; 8] = *b"FAT     ";
pub const FILESYSTEM_TYPE_FAT32: [u8; 8] = *b"FAT32   ";

pub const EXTENDED_BOOT_SIGNATURE: u8 = 0x29;
/// `0xAA55` little-endian, at offset 510 of the boot sector.
pub const BOOT_SIGNATURE: [u8; 2] = hex!("55 AA");
pub const BOOT_SIGNATURE_OFFSET: usize = 510;

pub const BOOT_CODE_OFFSET: usize = 62;
pub const BOOT_CODE_SIZE: usize = 448;
pub const BOOT_CODE_OFFSET_FAT32: usize = 90;
pub const BOOT_CODE_SIZE_FAT32: usize = 420;

fn get_u16(sector: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([sector[offset], sector[offset + 1]])
}

fn get_u32(sector: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([sector[offset], sector[offset + 1], sector[offset + 2], sector[offset + 3]])
}

fn put_u16(sector: &mut [u8], offset: usize, value: u16) {
    sector[offset..offset + 2].copy_from_slice(&value.to_le_bytes())
}

fn put_u32(sector: &mut [u8], offset: usize, value: u32) {
    sector[offset..offset + 4].copy_from_slice(&value.to_le_bytes())
}

/// The BIOS parameter block, bytes 0..36 of the boot sector.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct BootRecord {
    pub jump_code: [u8; 3],
    pub oem_identifier: [u8; 8],
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub reserved_sectors: u16,
    pub number_of_fats: u8,
    pub root_dirent_count: u16,
    pub total_sectors_small: u16,
    pub media_descriptor: u8,
    pub sectors_per_fat_small: u16,
    pub sectors_per_track: u16,
    pub number_of_heads: u16,
    pub hidden_sectors: u32,
    pub total_sectors_large: u32,
}

impl BootRecord {
    pub fn write_to(&self, sector: &mut [u8]) {
        sector[0..3].copy_from_slice(&self.jump_code);
        sector[3..11].copy_from_slice(&self.oem_identifier);
        put_u16(sector, 11, self.bytes_per_sector);
        sector[13] = self.sectors_per_cluster;
        put_u16(sector, 14, self.reserved_sectors);
        sector[16] = self.number_of_fats;
        put_u16(sector, 17, self.root_dirent_count);
        put_u16(sector, 19, self.total_sectors_small);
        sector[21] = self.media_descriptor;
        put_u16(sector, 22, self.sectors_per_fat_small);
        put_u16(sector, 24, self.sectors_per_track);
        put_u16(sector, 26, self.number_of_heads);
        put_u32(sector, 28, self.hidden_sectors);
        put_u32(sector, 32, self.total_sectors_large);
    }

    pub fn parse(sector: &[u8]) -> Self {
        Self {
            jump_code: [sector[0], sector[1], sector[2]],
            oem_identifier: sector[3..11].try_into().unwrap_or_default(),
            bytes_per_sector: get_u16(sector, 11),
            sectors_per_cluster: sector[13],
            reserved_sectors: get_u16(sector, 14),
            number_of_fats: sector[16],
            root_dirent_count: get_u16(sector, 17),
            total_sectors_small: get_u16(sector, 19),
            media_descriptor: sector[21],
            sectors_per_fat_small: get_u16(sector, 22),
            sectors_per_track: get_u16(sector, 24),
            number_of_heads: get_u16(sector, 26),
            hidden_sectors: get_u32(sector, 28),
            total_sectors_large: get_u32(sector, 32),
        }
    }

    /// First byte is what other systems inspect to confirm a boot sector.
    pub fn has_valid_jump(&self) -> bool {
        self.jump_code[0] == 0xEB || self.jump_code[0] == 0xE9
    }

    pub fn total_sectors(&self) -> u32 {
        match self.total_sectors_small {
            0 => self.total_sectors_large,
            small => small as u32,
        }
    }
}

/// FAT12/16 extension, bytes 36..62 of the boot sector. The 448-byte boot
/// code field and the trailing signature are handled by the formatter.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ExtendedBootRecord {
    pub drive_number: u8,
    pub extended_signature: u8,
    pub volume_serial: u32,
    pub volume_label: [u8; 11],
    pub filesystem_type: [u8; 8],
}

impl Default for ExtendedBootRecord {
    fn default() -> Self {
        Self {
            drive_number: 0x80,
            extended_signature: EXTENDED_BOOT_SIGNATURE,
            volume_serial: 0,
            volume_label: DEFAULT_VOLUME_LABEL,
            filesystem_type: FILESYSTEM_TYPE_FAT,
        }
    }
}

impl ExtendedBootRecord {
    pub fn write_to(&self, sector: &mut [u8]) {
        sector[36] = self.drive_number;
        sector[37] = 0;
        sector[38] = self.extended_signature;
        put_u32(sector, 39, self.volume_serial);
        sector[43..54].copy_from_slice(&self.volume_label);
        sector[54..62].copy_from_slice(&self.filesystem_type);
    }

    pub fn parse(sector: &[u8]) -> Self {
        Self {
            drive_number: sector[36],
            extended_signature: sector[38],
            volume_serial: get_u32(sector, 39),
            volume_label: sector[43..54].try_into().unwrap_or_default(),
            filesystem_type: sector[54..62].try_into().unwrap_or_default(),
        }
    }
}

/// FAT32 extension, bytes 36..90 of the boot sector.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Fat32ExtendedBootRecord {
    pub sectors_per_fat_large: u32,
    pub extension_flags: u16,
    pub filesystem_version: u16,
    pub root_cluster: u32,
    pub fsinfo_sector: u16,
    pub backup_boot_sector: u16,
    pub drive_number: u8,
    pub extended_signature: u8,
    pub volume_serial: u32,
    pub volume_label: [u8; 11],
    pub filesystem_type: [u8; 8],
}

impl Default for Fat32ExtendedBootRecord {
    fn default() -> Self {
        Self {
            sectors_per_fat_large: 0,
            extension_flags: 0,
            filesystem_version: 0,
            root_cluster: 2,
            fsinfo_sector: 1,
            backup_boot_sector: 6,
            drive_number: 0x80,
            extended_signature: EXTENDED_BOOT_SIGNATURE,
            volume_serial: 0,
            volume_label: DEFAULT_VOLUME_LABEL,
            filesystem_type: FILESYSTEM_TYPE_FAT32,
        }
    }
}

impl Fat32ExtendedBootRecord {
    pub fn write_to(&self, sector: &mut [u8]) {
        put_u32(sector, 36, self.sectors_per_fat_large);
        put_u16(sector, 40, self.extension_flags);
        put_u16(sector, 42, self.filesystem_version);
        put_u32(sector, 44, self.root_cluster);
        put_u16(sector, 48, self.fsinfo_sector);
        put_u16(sector, 50, self.backup_boot_sector);
        sector[52..64].fill(0);
        sector[64] = self.drive_number;
        sector[65] = 0;
        sector[66] = self.extended_signature;
        put_u32(sector, 67, self.volume_serial);
        sector[71..82].copy_from_slice(&self.volume_label);
        sector[82..90].copy_from_slice(&self.filesystem_type);
    }

    pub fn parse(sector: &[u8]) -> Self {
        Self {
            sectors_per_fat_large: get_u32(sector, 36),
            extension_flags: get_u16(sector, 40),
            filesystem_version: get_u16(sector, 42),
            root_cluster: get_u32(sector, 44),
            fsinfo_sector: get_u16(sector, 48),
            backup_boot_sector: get_u16(sector, 50),
            drive_number: sector[64],
            extended_signature: sector[66],
            volume_serial: get_u32(sector, 67),
            volume_label: sector[71..82].try_into().unwrap_or_default(),
            filesystem_type: sector[82..90].try_into().unwrap_or_default(),
        }
    }
}

pub const FSINFO_LEAD_SIGNATURE: u32 = 0x41615252;
pub const FSINFO_STRUCT_SIGNATURE: u32 = 0x61417272;
pub const FSINFO_TRAIL_SIGNATURE: u32 = 0xAA550000;

/// FAT32 FSInfo sector, free-space hints only.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FsInfoSector {
    pub free_clusters: u32,
    pub next_free_cluster: u32,
}

impl FsInfoSector {
    pub fn write_to(&self, sector: &mut [u8]) {
        put_u32(sector, 0, FSINFO_LEAD_SIGNATURE);
        put_u32(sector, 484, FSINFO_STRUCT_SIGNATURE);
        put_u32(sector, 488, self.free_clusters);
        put_u32(sector, 492, self.next_free_cluster);
        put_u32(sector, 508, FSINFO_TRAIL_SIGNATURE);
    }

    pub fn parse(sector: &[u8]) -> Option<Self> {
        if get_u32(sector, 0) != FSINFO_LEAD_SIGNATURE
            || get_u32(sector, 484) != FSINFO_STRUCT_SIGNATURE
        {
            return None;
        }
        Some(Self { free_clusters: get_u32(sector, 488), next_free_cluster: get_u32(sector, 492) })
    }
}
