use fat::io::mem::RamDisk;
use fat::region::boot::{BootRecord, ExtendedBootRecord, Fat32ExtendedBootRecord, FsInfoSector};
use fat::{FatFormatConfig, FatFs, FatVariant};

fn format(disk_size: usize, config: &FatFormatConfig) -> Vec<u8> {
    let mut fs = FatFs::new(RamDisk::new(disk_size));
    fs.format_with_config(config).unwrap();
    fs.try_free().ok().unwrap().into_bytes()
}

fn floppy_config() -> FatFormatConfig<'static> {
    FatFormatConfig { total_clusters: 2880, ..Default::default() }
}

#[test]
fn formats_non_bootable_fat12_floppy() {
    let config = floppy_config();
    assert_eq!(config.variant(), FatVariant::Fat12);
    let image = format(2 << 20, &config);

    assert_eq!(&image[0..3], &[0xEB, 0xFE, 0x90]);
    assert_eq!(&image[3..11], b"MSWIN4.1");
    assert_eq!(&image[510..512], &[0x55, 0xAA]);

    let record = BootRecord::parse(&image);
    assert_eq!(record.bytes_per_sector, 512);
    assert_eq!(record.sectors_per_cluster, 1);
    assert_eq!(record.reserved_sectors, 1);
    assert_eq!(record.number_of_fats, 2);
    assert_eq!(record.root_dirent_count, 512);
    assert_eq!(record.media_descriptor, 0xF8);
    assert_eq!(record.total_sectors(), 1 + 2 * 9 + 32 + 2880);
}

#[test]
fn boot_sector_round_trips_config_values() {
    let config = FatFormatConfig {
        total_clusters: 20000,
        bytes_per_sector: 512,
        sectors_per_cluster: 4,
        volume_serial: 0xC0FFEE,
        volume_label: *b"DATA       ",
        ..Default::default()
    };
    let image = format(42 << 20, &config);
    let record = BootRecord::parse(&image);
    assert_eq!(record.bytes_per_sector, 512);
    assert_eq!(record.sectors_per_cluster, 4);
    assert_eq!(record.number_of_fats, 2);
    let extended = ExtendedBootRecord::parse(&image);
    assert_eq!(extended.extended_signature, 0x29);
    assert_eq!(extended.volume_serial, 0xC0FFEE);
    assert_eq!(extended.volume_label, *b"DATA       ");
    assert_eq!(extended.filesystem_type, *b"FAT     ");
}

#[test]
fn fat12_tables_start_with_reserved_entries() {
    let image = format(2 << 20, &floppy_config());
    // FAT[0] echoes the media descriptor, FAT[1] is end-of-chain
    assert_eq!(&image[512..515], &[0xF8, 0xFF, 0xFF]);
    // Mirrored into the second copy after 9 sectors
    let second = 512 + 9 * 512;
    assert_eq!(&image[second..second + 3], &[0xF8, 0xFF, 0xFF]);
}

#[test]
fn embeds_boot_code_across_reserved_sectors() {
    let code: Vec<u8> = (0..900u32).map(|i| (i % 251) as u8).collect();
    let config = FatFormatConfig { boot_code: Some(&code), ..floppy_config() };
    let image = format(2 << 20, &config);

    assert_eq!(&image[0..3], &[0xEB, 0x3C, 0x90]);
    let record = BootRecord::parse(&image);
    assert_eq!(record.reserved_sectors, 2);
    // First 448 bytes ahead of the signature, remainder in the next sector
    assert_eq!(&image[62..510], &code[..448]);
    assert_eq!(&image[510..512], &[0x55, 0xAA]);
    assert_eq!(&image[512..512 + 452], &code[448..]);
    // FAT area moved behind the extra reserved sector
    assert_eq!(&image[1024..1027], &[0xF8, 0xFF, 0xFF]);
}

#[test]
fn honors_hidden_sector_offset() {
    let config = FatFormatConfig { number_of_hidden_sectors: 4, ..floppy_config() };
    let image = format(2 << 20, &config);
    assert_eq!(&image[..512], &[0u8; 512][..]);
    assert_eq!(&image[2048..2051], &[0xEB, 0xFE, 0x90]);
    assert_eq!(&image[2048 + 510..2048 + 512], &[0x55, 0xAA]);
    assert_eq!(BootRecord::parse(&image[2048..]).hidden_sectors, 4);
}

#[test]
fn formats_fat32_with_fsinfo_and_backup() {
    let config = FatFormatConfig { total_clusters: 70000, ..Default::default() };
    assert_eq!(config.variant(), FatVariant::Fat32);
    let image = format(37 << 20, &config);

    let record = BootRecord::parse(&image);
    assert_eq!(record.reserved_sectors, 32);
    assert_eq!(record.root_dirent_count, 0);
    assert_eq!(record.sectors_per_fat_small, 0);

    let extended = Fat32ExtendedBootRecord::parse(&image);
    // 70002 four-byte entries rounded up to sectors
    assert_eq!(extended.sectors_per_fat_large, 547);
    assert_eq!(extended.root_cluster, 2);
    assert_eq!(extended.fsinfo_sector, 1);
    assert_eq!(extended.backup_boot_sector, 6);
    assert_eq!(extended.filesystem_type, *b"FAT32   ");

    let fsinfo = FsInfoSector::parse(&image[512..1024]).unwrap();
    assert_eq!(fsinfo.free_clusters, 69999);
    assert_eq!(fsinfo.next_free_cluster, 3);

    let backup = 6 * 512;
    assert_eq!(&image[backup..backup + 512], &image[..512]);

    // FAT[2] terminates the root directory chain
    let fat_start = 32 * 512;
    assert_eq!(&image[fat_start..fat_start + 4], &[0xF8, 0xFF, 0xFF, 0x0F]);
    let entry2 = u32::from_le_bytes(image[fat_start + 8..fat_start + 12].try_into().unwrap());
    assert_eq!(entry2, 0x0FFF_FFFF);
}

#[test]
fn rejects_invalid_configs_before_touching_the_device() {
    let mut fs = FatFs::new(RamDisk::new(4096));
    let config = FatFormatConfig { total_clusters: 0, ..Default::default() };
    assert!(fs.format_with_config(&config).is_err());
    let config = FatFormatConfig { total_clusters: 268_435_446, ..Default::default() };
    assert!(fs.format_with_config(&config).is_err());
    let config = FatFormatConfig { bytes_per_sector: 300, ..floppy_config() };
    assert!(fs.format_with_config(&config).is_err());
    let disk = fs.try_free().ok().unwrap();
    assert_eq!(disk.as_bytes(), &[0u8; 4096][..]);
}
