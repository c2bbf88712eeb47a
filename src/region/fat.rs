use crate::types::ClusterID;

/// Exact historical boundaries, by total cluster count.
pub const FAT12_MAX_CLUSTERS: u32 = 4085;
pub const FAT16_MAX_CLUSTERS: u32 = 65525;
/// 28-bit FAT32 ceiling accounting for reserved entries.
pub const MAX_TOTAL_CLUSTERS: u32 = 268_435_445;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FatVariant {
    Fat12,
    Fat16,
    Fat32,
}

impl FatVariant {
    /// Variant selection is a pure function of the cluster count; no other
    /// geometry affects it. Caller guarantees `total_clusters >= 1`.
    pub fn from_cluster_count(total_clusters: u32) -> Self {
        match total_clusters {
            0..=FAT12_MAX_CLUSTERS => Self::Fat12,
            ..=FAT16_MAX_CLUSTERS => Self::Fat16,
            _ => Self::Fat32,
        }
    }

    pub(crate) fn entry_bits(self) -> u64 {
        match self {
            Self::Fat12 => 12,
            Self::Fat16 => 16,
            Self::Fat32 => 32,
        }
    }

    /// Bytes one FAT copy occupies for `entries` table entries.
    pub(crate) fn table_bytes(self, entries: u32) -> u64 {
        (entries as u64 * self.entry_bits() + 7) / 8
    }

    /// Byte offset of a table entry within the FAT region.
    pub(crate) fn entry_offset(self, cluster: ClusterID) -> u64 {
        let index = u32::from(cluster) as u64;
        match self {
            Self::Fat12 => index * 3 / 2,
            Self::Fat16 => index * 2,
            Self::Fat32 => index * 4,
        }
    }

    /// Width of the window an entry access touches. FAT12 entries span
    /// one-and-a-half bytes, so the window is always two.
    pub(crate) fn entry_window(self) -> usize {
        match self {
            Self::Fat12 | Self::Fat16 => 2,
            Self::Fat32 => 4,
        }
    }

    pub(crate) fn end_of_chain(self) -> u32 {
        match self {
            Self::Fat12 => 0xFFF,
            Self::Fat16 => 0xFFFF,
            Self::Fat32 => 0x0FFF_FFFF,
        }
    }

    pub(crate) fn bad_cluster(self) -> u32 {
        match self {
            Self::Fat12 => 0xFF7,
            Self::Fat16 => 0xFFF7,
            Self::Fat32 => 0x0FFF_FFF7,
        }
    }

    /// FAT[0]: media descriptor echoed into the low byte, remaining bits set.
    pub(crate) fn media_entry(self, media_descriptor: u8) -> u32 {
        match self {
            Self::Fat12 => 0xF00 | media_descriptor as u32,
            Self::Fat16 => 0xFF00 | media_descriptor as u32,
            Self::Fat32 => 0x0FFF_FF00 | media_descriptor as u32,
        }
    }

    /// Decodes an entry from its two- or four-byte window.
    pub(crate) fn decode_entry(self, cluster: ClusterID, window: &[u8]) -> u32 {
        let index = u32::from(cluster);
        match self {
            Self::Fat12 => {
                let raw = u16::from_le_bytes([window[0], window[1]]);
                match index % 2 {
                    0 => (raw & 0x0FFF) as u32,
                    _ => (raw >> 4) as u32,
                }
            }
            Self::Fat16 => u16::from_le_bytes([window[0], window[1]]) as u32,
            // Top four bits are reserved and ignored
            Self::Fat32 => {
                u32::from_le_bytes([window[0], window[1], window[2], window[3]]) & 0x0FFF_FFFF
            }
        }
    }

    /// Encodes an entry into its window, preserving the neighbouring
    /// half-entry (FAT12) or the reserved top bits (FAT32).
    pub(crate) fn encode_entry(self, cluster: ClusterID, window: &mut [u8], value: u32) {
        let index = u32::from(cluster);
        match self {
            Self::Fat12 => {
                let raw = u16::from_le_bytes([window[0], window[1]]);
                let raw = match index % 2 {
                    0 => (raw & 0xF000) | (value as u16 & 0x0FFF),
                    _ => (raw & 0x000F) | ((value as u16 & 0x0FFF) << 4),
                };
                window[..2].copy_from_slice(&raw.to_le_bytes());
            }
            Self::Fat16 => window[..2].copy_from_slice(&(value as u16).to_le_bytes()),
            Self::Fat32 => {
                let reserved = u32::from_le_bytes([window[0], window[1], window[2], window[3]])
                    & 0xF000_0000;
                let raw = reserved | (value & 0x0FFF_FFFF);
                window[..4].copy_from_slice(&raw.to_le_bytes());
            }
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Entry {
    Free,
    Next(ClusterID),
    BadCluster,
    Last,
    Reserved,
}

impl Entry {
    pub fn decode(variant: FatVariant, value: u32) -> Self {
        let bad = variant.bad_cluster();
        match value {
            0 => Self::Free,
            1 => Self::Reserved,
            v if v < bad => Self::Next(v.into()),
            v if v == bad => Self::BadCluster,
            _ => Self::Last,
        }
    }

    pub fn encode(self, variant: FatVariant) -> u32 {
        match self {
            Self::Free => 0,
            Self::Reserved => 1,
            Self::Next(cluster) => cluster.into(),
            Self::BadCluster => variant.bad_cluster(),
            Self::Last => variant.end_of_chain(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Entry, FatVariant};

    #[test]
    fn test_variant_boundaries() {
        assert_eq!(FatVariant::from_cluster_count(1), FatVariant::Fat12);
        assert_eq!(FatVariant::from_cluster_count(4085), FatVariant::Fat12);
        assert_eq!(FatVariant::from_cluster_count(4086), FatVariant::Fat16);
        assert_eq!(FatVariant::from_cluster_count(65525), FatVariant::Fat16);
        assert_eq!(FatVariant::from_cluster_count(65526), FatVariant::Fat32);
        assert_eq!(FatVariant::from_cluster_count(u32::MAX), FatVariant::Fat32);
    }

    #[test]
    fn test_fat12_split_entries() {
        // Clusters 0 and 1 share the first three bytes
        let mut region = [0u8; 6];
        FatVariant::Fat12.encode_entry(0u32.into(), &mut region[0..2], 0xF78);
        let offset = FatVariant::Fat12.entry_offset(1u32.into()) as usize;
        assert_eq!(offset, 1);
        FatVariant::Fat12.encode_entry(1u32.into(), &mut region[offset..offset + 2], 0xFFF);
        assert_eq!(region[..3], [0x78, 0xFF, 0xFF]);
        assert_eq!(FatVariant::Fat12.decode_entry(0u32.into(), &region[0..2]), 0xF78);
        assert_eq!(FatVariant::Fat12.decode_entry(1u32.into(), &region[1..3]), 0xFFF);
    }

    #[test]
    fn test_fat12_neighbour_preserved() {
        let mut region = [0xFFu8; 3];
        FatVariant::Fat12.encode_entry(0u32.into(), &mut region[0..2], 0x123);
        assert_eq!(FatVariant::Fat12.decode_entry(1u32.into(), &region[1..3]), 0xFFF);
        assert_eq!(FatVariant::Fat12.decode_entry(0u32.into(), &region[0..2]), 0x123);
    }

    #[test]
    fn test_fat32_reserved_bits_preserved() {
        let mut window = [0xFF, 0xFF, 0xFF, 0xFF];
        FatVariant::Fat32.encode_entry(2u32.into(), &mut window, 7);
        assert_eq!(u32::from_le_bytes(window), 0xF000_0007);
        assert_eq!(FatVariant::Fat32.decode_entry(2u32.into(), &window), 7);
    }

    #[test]
    fn test_entry_markers() {
        for variant in [FatVariant::Fat12, FatVariant::Fat16, FatVariant::Fat32] {
            assert_eq!(Entry::decode(variant, 0), Entry::Free);
            assert_eq!(Entry::decode(variant, variant.bad_cluster()), Entry::BadCluster);
            assert_eq!(Entry::decode(variant, variant.end_of_chain()), Entry::Last);
            assert_eq!(Entry::decode(variant, 5), Entry::Next(5u32.into()));
        }
    }

    #[test]
    fn test_table_bytes() {
        assert_eq!(FatVariant::Fat12.table_bytes(3), 5);
        assert_eq!(FatVariant::Fat12.table_bytes(4), 6);
        assert_eq!(FatVariant::Fat16.table_bytes(10), 20);
        assert_eq!(FatVariant::Fat32.table_bytes(10), 40);
    }
}
