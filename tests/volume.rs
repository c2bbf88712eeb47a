use fat::error::{Error, OperationError};
use fat::io::mem::RamDisk;
use fat::{FatFormatConfig, FatFs, FatVariant, SeekWhence};

fn build_image(disk_size: usize, config: &FatFormatConfig) -> Vec<u8> {
    let mut fs = FatFs::new(RamDisk::new(disk_size));
    fs.format_with_config(config).unwrap();
    fs.try_free().ok().unwrap().into_bytes()
}

fn mount(image: Vec<u8>) -> fat::Volume<RamDisk> {
    FatFs::new(RamDisk::from_bytes(image)).mount().unwrap()
}

fn dirent(name: &[u8; 11], attributes: u8, first_cluster: u32, size: u32) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    bytes[..11].copy_from_slice(name);
    bytes[11] = attributes;
    bytes[20..22].copy_from_slice(&((first_cluster >> 16) as u16).to_le_bytes());
    bytes[26..28].copy_from_slice(&(first_cluster as u16).to_le_bytes());
    bytes[28..32].copy_from_slice(&size.to_le_bytes());
    bytes
}

fn patch(image: &mut [u8], offset: usize, bytes: &[u8]) {
    image[offset..offset + bytes.len()].copy_from_slice(bytes);
}

// FAT12 floppy geometry: FAT area at sector 1, two 9-sector copies,
// 32 root sectors, data from byte 26112.
const FLOPPY_ROOT: usize = 9728;
const FLOPPY_DATA: usize = 26112;

fn floppy_image() -> Vec<u8> {
    let config = FatFormatConfig {
        total_clusters: 2880,
        volume_serial: 7,
        volume_label: *b"TESTDISK   ",
        ..Default::default()
    };
    build_image(2 << 20, &config)
}

// FAT16 geometry for 20000 single-sector clusters: 79-sector FAT copies,
// root region at byte 81408, data from byte 97792.
const FAT16_FAT: usize = 512;
const FAT16_ROOT: usize = 81408;
const FAT16_DATA: usize = 97792;

fn fat16_image() -> Vec<u8> {
    let config = FatFormatConfig { total_clusters: 20000, ..Default::default() };
    build_image(11 << 20, &config)
}

/// A 600-byte file on clusters 2 and 3.
fn inject_fat16_file(image: &mut [u8], content: &[u8]) {
    assert_eq!(content.len(), 600);
    patch(image, FAT16_ROOT, &dirent(b"HELLO   TXT", 0x20, 2, 600));
    patch(image, FAT16_FAT + 4, &3u16.to_le_bytes());
    patch(image, FAT16_FAT + 6, &0xFFFFu16.to_le_bytes());
    patch(image, FAT16_DATA, content);
}

fn content(length: usize) -> Vec<u8> {
    (0..length).map(|i| (i % 251) as u8).collect()
}

#[test]
fn mount_reports_volume_identity() {
    let volume = mount(floppy_image());
    assert_eq!(volume.variant(), FatVariant::Fat12);
    assert_eq!(volume.serial_number(), 7);
    assert_eq!(volume.label(), *b"TESTDISK   ");
    assert_eq!(volume.total_clusters(), 2880);
}

#[test]
fn fresh_volume_has_empty_root() {
    let volume = mount(floppy_image());
    let mut names = Vec::new();
    volume.root_directory().walk(|entry| names.push(entry.name.clone())).unwrap();
    assert!(names.is_empty());
}

#[test]
fn missing_file_is_reported() {
    let volume = mount(floppy_image());
    let result = volume.root_directory().find("NOPE.TXT");
    assert!(matches!(result, Err(Error::Operation(OperationError::NoSuchFileOrDirectory))));
}

#[test]
fn reads_file_through_fat12_chain() {
    let mut image = floppy_image();
    let data = content(600);
    // Clusters 2 and 3: one packed entry pair at FAT byte 3
    patch(&mut image, FLOPPY_ROOT, &dirent(b"HELLO   TXT", 0x20, 2, 600));
    patch(&mut image, 512 + 3, &[0x03, 0xF0, 0xFF]);
    patch(&mut image, FLOPPY_DATA, &data);

    let volume = mount(image);
    let mut root = volume.root_directory();
    let entry = root.find("hello.txt").unwrap();
    assert_eq!(entry.name.as_str(), "HELLO.TXT");
    assert_eq!(entry.size, 600);

    let mut file = root.open_file("HELLO.TXT").unwrap();
    assert_eq!(file.size(), 600);
    let mut buf = vec![0u8; 1024];
    assert_eq!(file.read(&mut buf).unwrap(), 600);
    assert_eq!(&buf[..600], &data[..]);
    let result = file.read(&mut buf);
    assert!(matches!(result, Err(Error::Operation(OperationError::EOF))));
}

#[test]
fn file_seek_follows_whence_semantics() {
    let mut image = fat16_image();
    let data = content(600);
    inject_fat16_file(&mut image, &data);

    let volume = mount(image);
    let mut file = volume.root_directory().open_file("HELLO.TXT").unwrap();
    assert_eq!(file.seek(SeekWhence::Ending(0)).unwrap(), 600);
    assert_eq!(file.seek(SeekWhence::Relative(-100)).unwrap(), 500);
    assert_eq!(file.seek(SeekWhence::Relative(0)).unwrap(), 500);
    assert_eq!(file.tell(), 500);
    let mut buf = [0u8; 100];
    assert_eq!(file.read(&mut buf).unwrap(), 100);
    assert_eq!(&buf[..], &data[500..]);

    assert!(matches!(
        file.seek(SeekWhence::Beginning(601)),
        Err(Error::Operation(OperationError::SeekPosition))
    ));
    assert!(matches!(
        file.seek(SeekWhence::Relative(-601)),
        Err(Error::Operation(OperationError::SeekPosition))
    ));
}

#[test]
fn write_extends_file_and_updates_directory_entry() {
    let mut image = fat16_image();
    let initial = content(600);
    inject_fat16_file(&mut image, &initial);

    let mut fs = FatFs::new(RamDisk::from_bytes(image));
    let volume = fs.mount().unwrap();
    let mut root = volume.root_directory();
    let appended = vec![0xABu8; 1000];
    {
        let mut file = root.open_file("HELLO.TXT").unwrap();
        file.seek(SeekWhence::Ending(0)).unwrap();
        file.write_all(&appended).unwrap();
        assert_eq!(file.size(), 1600);
    }
    assert_eq!(root.find("HELLO.TXT").unwrap().size, 1600);

    let mut file = root.open_file("HELLO.TXT").unwrap();
    let mut buf = vec![0u8; 1600];
    assert_eq!(file.read(&mut buf).unwrap(), 1600);
    assert_eq!(&buf[..600], &initial[..]);
    assert_eq!(&buf[600..], &appended[..]);
    drop(file);
    drop(root);
    drop(volume);

    // Chain grew 2 -> 3 -> 4 -> 5, mirrored into both FAT copies
    let image = fs.try_free().ok().unwrap().into_bytes();
    for fat_start in [FAT16_FAT, FAT16_FAT + 79 * 512] {
        assert_eq!(&image[fat_start + 6..fat_start + 8], &4u16.to_le_bytes());
        assert_eq!(&image[fat_start + 8..fat_start + 10], &5u16.to_le_bytes());
        assert_eq!(&image[fat_start + 10..fat_start + 12], &0xFFFFu16.to_le_bytes());
    }
}

#[test]
fn write_populates_an_empty_file() {
    let mut image = fat16_image();
    patch(&mut image, FAT16_ROOT, &dirent(b"EMPTY   BIN", 0x20, 0, 0));

    let volume = mount(image);
    let mut root = volume.root_directory();
    {
        let mut file = root.open_file("EMPTY.BIN").unwrap();
        assert_eq!(file.size(), 0);
        file.write_all(b"hello world").unwrap();
    }
    assert_eq!(root.find("EMPTY.BIN").unwrap().size, 11);

    let mut file = root.open_file("EMPTY.BIN").unwrap();
    let mut buf = [0u8; 11];
    assert_eq!(file.read(&mut buf).unwrap(), 11);
    assert_eq!(&buf[..], b"hello world");
}

#[test]
fn opens_subdirectory_by_name() {
    let mut image = fat16_image();
    patch(&mut image, FAT16_ROOT, &dirent(b"SUBDIR     ", 0x10, 5, 0));
    patch(&mut image, FAT16_FAT + 10, &0xFFFFu16.to_le_bytes());
    // Cluster 5 holds the subdirectory, cluster 6 the file body
    let cluster5 = FAT16_DATA + 3 * 512;
    patch(&mut image, cluster5, &dirent(b"NOTES   TXT", 0x20, 6, 5));
    patch(&mut image, FAT16_FAT + 12, &0xFFFFu16.to_le_bytes());
    patch(&mut image, FAT16_DATA + 4 * 512, b"notes");

    let volume = mount(image);
    let mut root = volume.root_directory();
    let entry = root.find("SUBDIR").unwrap();
    assert!(entry.is_directory());

    let mut subdir = root.open_directory("SUBDIR").unwrap();
    let mut file = subdir.open_file("NOTES.TXT").unwrap();
    let mut buf = [0u8; 5];
    assert_eq!(file.read(&mut buf).unwrap(), 5);
    assert_eq!(&buf[..], b"notes");

    assert!(matches!(
        subdir.open_file("MISSING.TXT"),
        Err(Error::Operation(OperationError::NoSuchFileOrDirectory))
    ));
}

#[test]
fn fat32_root_directory_lives_in_a_cluster_chain() {
    let config = FatFormatConfig { total_clusters: 70000, ..Default::default() };
    let mut image = build_image(37 << 20, &config);
    // 32 reserved sectors, two 547-sector FAT copies, then cluster 2
    let fat_start = 32 * 512;
    let data_start = fat_start + 2 * 547 * 512;
    patch(&mut image, data_start, &dirent(b"LOG     TXT", 0x20, 3, 4));
    patch(&mut image, fat_start + 12, &0x0FFF_FFFFu32.to_le_bytes());
    patch(&mut image, data_start + 512, b"boot");

    let volume = mount(image);
    assert_eq!(volume.variant(), FatVariant::Fat32);
    let mut root = volume.root_directory();
    let mut names = Vec::new();
    root.walk(|entry| names.push(entry.name.clone())).unwrap();
    assert_eq!(names.len(), 1);
    assert_eq!(names[0].as_str(), "LOG.TXT");

    let mut file = root.open_file("LOG.TXT").unwrap();
    let mut buf = [0u8; 4];
    assert_eq!(file.read(&mut buf).unwrap(), 4);
    assert_eq!(&buf[..], b"boot");
}
