// 32-byte directory entries, short (8.3) names only. Long-name entry sets
// are recognized and skipped, never decoded.

use bitfield::bitfield;
#[cfg(feature = "chrono")]
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use derive_more::Into;

use crate::error::OperationError;

pub const DIRENT_SIZE: usize = 32;

/// First name byte of the terminating entry.
pub(crate) const ENTRY_END: u8 = 0x00;
/// First name byte of an erased entry.
pub(crate) const ENTRY_ERASED: u8 = 0xE5;
/// Escapes a real leading 0xE5 in a name.
pub(crate) const ENTRY_ESCAPED_E5: u8 = 0x05;

/// Offsets of the fields a file rewrite patches in place.
pub(crate) const DIRENT_CLUSTER_HIGH_OFFSET: u64 = 20;
pub(crate) const DIRENT_CLUSTER_LOW_OFFSET: u64 = 26;
pub(crate) const DIRENT_FILE_SIZE_OFFSET: u64 = 28;

bitfield! {
    #[derive(Copy, Clone, Debug, Default, Into, Eq, PartialEq)]
    pub struct Attributes(u8);
    pub read_only, set_read_only: 0, 0;
    pub hidden, set_hidden: 1, 1;
    pub system, set_system: 2, 2;
    pub volume_label, set_volume_label: 3, 3;
    pub directory, set_directory: 4, 4;
    pub archive, set_archive: 5, 5;
}

impl Attributes {
    /// Long-name entries set all four low attribute bits at once.
    pub fn long_name(&self) -> bool {
        u8::from(*self) & 0x0F == 0x0F
    }
}

bitfield! {
    #[derive(Copy, Clone, Debug, Default, Into, Eq, PartialEq)]
    pub struct Date(u16);
    year_offset, set_year_offset: 15, 9;
    pub month, set_month: 8, 5;
    pub day, set_day: 4, 0;
}

impl Date {
    pub fn year(&self) -> u16 {
        self.year_offset() + 1980
    }

    pub fn set_year(&mut self, year: u16) {
        self.set_year_offset(year.saturating_sub(1980))
    }
}

bitfield! {
    #[derive(Copy, Clone, Debug, Default, Into, Eq, PartialEq)]
    pub struct Time(u16);
    pub hour, set_hour: 15, 11;
    pub minute, set_minute: 10, 5;
    double_second, set_double_second: 4, 0;
}

impl Time {
    pub fn second(&self) -> u16 {
        self.double_second() * 2
    }

    pub fn set_second(&mut self, second: u16) {
        self.set_double_second(second / 2)
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Timestamp {
    pub date: Date,
    pub time: Time,
}

#[cfg(feature = "chrono")]
impl Into<NaiveDateTime> for Timestamp {
    fn into(self) -> NaiveDateTime {
        let (date, time) = (self.date, self.time);
        let date = NaiveDate::from_ymd_opt(date.year() as i32, date.month() as u32, date.day() as u32);
        let time =
            NaiveTime::from_hms_opt(time.hour() as u32, time.minute() as u32, time.second() as u32);
        NaiveDateTime::new(date.unwrap_or_default(), time.unwrap_or_default())
    }
}

#[cfg(feature = "chrono")]
impl From<NaiveDateTime> for Timestamp {
    fn from(datetime: NaiveDateTime) -> Self {
        use chrono::{Datelike, Timelike};
        let mut date = Date::default();
        date.set_year(datetime.year() as u16);
        date.set_month(datetime.month() as u16);
        date.set_day(datetime.day() as u16);
        let mut time = Time::default();
        time.set_hour(datetime.hour() as u16);
        time.set_minute(datetime.minute() as u16);
        time.set_second(datetime.second() as u16);
        Self { date, time }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct RawDirEntry {
    pub name: [u8; 11],
    pub attributes: Attributes,
    pub creation: Timestamp,
    pub access_date: Date,
    pub modification: Timestamp,
    pub first_cluster: u32,
    pub size: u32,
}

fn get_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

impl RawDirEntry {
    pub fn parse(bytes: &[u8; DIRENT_SIZE]) -> Self {
        let high = get_u16(bytes, 20) as u32;
        let low = get_u16(bytes, 26) as u32;
        Self {
            name: bytes[0..11].try_into().unwrap_or_default(),
            attributes: Attributes(bytes[11]),
            creation: Timestamp { time: Time(get_u16(bytes, 14)), date: Date(get_u16(bytes, 16)) },
            access_date: Date(get_u16(bytes, 18)),
            modification: Timestamp {
                time: Time(get_u16(bytes, 22)),
                date: Date(get_u16(bytes, 24)),
            },
            first_cluster: high << 16 | low,
            size: u32::from_le_bytes([bytes[28], bytes[29], bytes[30], bytes[31]]),
        }
    }

    pub fn write_to(&self, bytes: &mut [u8; DIRENT_SIZE]) {
        bytes.fill(0);
        bytes[0..11].copy_from_slice(&self.name);
        bytes[11] = self.attributes.into();
        bytes[14..16].copy_from_slice(&u16::from(self.creation.time).to_le_bytes());
        bytes[16..18].copy_from_slice(&u16::from(self.creation.date).to_le_bytes());
        bytes[18..20].copy_from_slice(&u16::from(self.access_date).to_le_bytes());
        bytes[20..22].copy_from_slice(&((self.first_cluster >> 16) as u16).to_le_bytes());
        bytes[22..24].copy_from_slice(&u16::from(self.modification.time).to_le_bytes());
        bytes[24..26].copy_from_slice(&u16::from(self.modification.date).to_le_bytes());
        bytes[26..28].copy_from_slice(&(self.first_cluster as u16).to_le_bytes());
        bytes[28..32].copy_from_slice(&self.size.to_le_bytes());
    }

    pub fn is_end(bytes: &[u8; DIRENT_SIZE]) -> bool {
        bytes[0] == ENTRY_END
    }

    pub fn is_erased(bytes: &[u8; DIRENT_SIZE]) -> bool {
        bytes[0] == ENTRY_ERASED
    }

    /// `NAME.EXT` form, trailing space padding stripped.
    pub fn decoded_name(&self) -> heapless::String<12> {
        let mut decoded = heapless::String::new();
        let mut base = self.name;
        if base[0] == ENTRY_ESCAPED_E5 {
            base[0] = ENTRY_ERASED;
        }
        let stem = trim_padding(&base[..8]);
        let extension = trim_padding(&base[8..]);
        for &byte in stem {
            let _ = decoded.push(byte as char);
        }
        if !extension.is_empty() {
            let _ = decoded.push('.');
            for &byte in extension {
                let _ = decoded.push(byte as char);
            }
        }
        decoded
    }
}

fn trim_padding(field: &[u8]) -> &[u8] {
    let length = field.iter().rposition(|&b| b != b' ').map_or(0, |p| p + 1);
    &field[..length]
}

/// Encodes `NAME.EXT` into the padded 11-byte on-disk form, uppercasing
/// lowercase ASCII the way short names are stored.
pub(crate) fn encode_name(name: &str) -> Result<[u8; 11], OperationError> {
    let (stem, extension) = match name.rfind('.') {
        Some(position) => (&name[..position], &name[position + 1..]),
        None => (name, ""),
    };
    if stem.is_empty() || stem.len() > 8 || extension.len() > 3 {
        return Err(OperationError::FileName);
    }
    let mut encoded = [b' '; 11];
    encode_part(&mut encoded[..8], stem)?;
    encode_part(&mut encoded[8..], extension)?;
    if encoded[0] == ENTRY_ERASED {
        encoded[0] = ENTRY_ESCAPED_E5;
    }
    Ok(encoded)
}

fn encode_part(field: &mut [u8], part: &str) -> Result<(), OperationError> {
    for (index, byte) in part.bytes().enumerate() {
        match byte {
            b' ' | b'.' | 0x00..=0x1F => return Err(OperationError::FileName),
            b'a'..=b'z' => field[index] = byte - b'a' + b'A',
            _ => field[index] = byte,
        }
    }
    Ok(())
}
