//! The 16-bit file allocation table.

use std::io::{Read, Seek, SeekFrom, Write};

use tracing::trace;

use crate::geometry::Geometry;
use crate::structures::zero_fill;
use crate::Fat16Error;

pub mod constants {
    /// A free cluster
    pub const CLUSTER_FREE: u16 = 0x0000;
    /// End-of-chain marker
    pub const CLUSTER_LAST: u16 = 0xFFFF;
    /// First cluster of the data region; indices 0 and 1 are reserved
    pub const FIRST_DATA_CLUSTER: u16 = 2;
    /// Last usable cluster index; 0xFFF0..=0xFFFF are reserved values
    pub const MAX_DATA_CLUSTER: u16 = 0xFFEF;
    /// Reserved entries 0 and 1 for a hard-disk image: the media descriptor
    /// 0xF8 with the high byte filled, then an all-ones entry
    pub const RESERVED_ENTRIES: [u8; 4] = [0xF8, 0xFF, 0xFF, 0xFF];
}

/// The FAT region of an image: `copies` identical tables of 16-bit
/// little-endian entries, back to back.
///
/// Chains written through this type land in every copy. The boot loader only
/// reads the first, but a reset initializes all of them, and the copies
/// stay consistent that way.
#[derive(Debug)]
pub struct Fat16Table {
    offset: u64,
    size_bytes: u64,
    copies: u8,
}

impl Fat16Table {
    pub fn new(geometry: &Geometry) -> Self {
        Self {
            offset: geometry.fat_offset(),
            size_bytes: geometry.fat_size_bytes(),
            copies: geometry.fat_count,
        }
    }

    fn copy_offset(&self, copy: u8) -> u64 {
        self.offset + copy as u64 * self.size_bytes
    }

    fn entry_offset(&self, copy: u8, cluster: u16) -> u64 {
        self.copy_offset(copy) + cluster as u64 * 2
    }

    /// Writes the reserved first entries and zero-fills the remainder of
    /// every copy, leaving each entry above the reserved pair reading as
    /// [`constants::CLUSTER_FREE`].
    pub fn init<W: Write + Seek>(&self, writer: &mut W) -> Result<(), Fat16Error> {
        let reserved = constants::RESERVED_ENTRIES;
        for copy in 0..self.copies {
            let offset = self.copy_offset(copy);
            writer.seek(SeekFrom::Start(offset))?;
            writer.write_all(&reserved)?;
            zero_fill(writer, offset + reserved.len() as u64, self.size_bytes - reserved.len() as u64)?;
        }
        trace!(copies = self.copies, "initialized FAT region");
        Ok(())
    }

    /// Writes the chain for `count` contiguous clusters starting at
    /// `start`: each entry points at the next cluster and the final one
    /// holds the end-of-chain marker. A single-cluster chain is just the
    /// marker; `count == 0` writes nothing, since a zero-cluster file has
    /// no chain.
    pub fn write_chain<W: Write + Seek>(
        &self,
        writer: &mut W,
        start: u16,
        count: u32,
    ) -> Result<(), Fat16Error> {
        if count == 0 {
            return Ok(());
        }
        let mut chain = Vec::with_capacity(count as usize * 2);
        for i in 1..count {
            chain.extend_from_slice(&((start as u32 + i) as u16).to_le_bytes());
        }
        chain.extend_from_slice(&constants::CLUSTER_LAST.to_le_bytes());
        for copy in 0..self.copies {
            writer.seek(SeekFrom::Start(self.entry_offset(copy, start)))?;
            writer.write_all(&chain)?;
        }
        trace!(start, count, "wrote cluster chain");
        Ok(())
    }

    /// Reads one entry from the first copy.
    pub fn read_entry<R: Read + Seek>(
        &self,
        reader: &mut R,
        cluster: u16,
    ) -> Result<u16, Fat16Error> {
        let mut buf = [0u8; 2];
        reader.seek(SeekFrom::Start(self.entry_offset(0, cluster)))?;
        reader.read_exact(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }
}

#[cfg(test)]
mod tests {
    use super::constants::*;
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn table() -> (Fat16Table, Cursor<Vec<u8>>) {
        // Two copies of a 16-sector FAT right at the start of the buffer.
        let geometry = Geometry {
            bytes_per_sector: 512,
            reserved_sectors: 0,
            fat_count: 2,
            sectors_per_fat: 16,
            root_entries: 16,
        };
        let image = Cursor::new(vec![0xAAu8; 2 * 16 * 512]);
        (Fat16Table::new(&geometry), image)
    }

    #[test]
    fn init_marks_reserved_entries_and_frees_the_rest() {
        let (fat, mut image) = table();
        fat.init(&mut image).unwrap();

        let bytes = image.into_inner();
        let copy_len = 16 * 512;
        for copy in [&bytes[..copy_len], &bytes[copy_len..]] {
            assert_eq!(&copy[..4], &RESERVED_ENTRIES);
            assert!(copy[4..].iter().all(|b| *b == 0));
        }
    }

    #[test]
    fn chain_links_forward_and_terminates() {
        let (fat, mut image) = table();
        fat.init(&mut image).unwrap();
        fat.write_chain(&mut image, 2, 3).unwrap();

        assert_eq!(fat.read_entry(&mut image, 2).unwrap(), 3);
        assert_eq!(fat.read_entry(&mut image, 3).unwrap(), 4);
        assert_eq!(fat.read_entry(&mut image, 4).unwrap(), CLUSTER_LAST);
        assert_eq!(fat.read_entry(&mut image, 5).unwrap(), CLUSTER_FREE);
    }

    #[test]
    fn single_cluster_chain_is_only_the_marker() {
        let (fat, mut image) = table();
        fat.init(&mut image).unwrap();
        fat.write_chain(&mut image, 7, 1).unwrap();

        assert_eq!(fat.read_entry(&mut image, 6).unwrap(), CLUSTER_FREE);
        assert_eq!(fat.read_entry(&mut image, 7).unwrap(), CLUSTER_LAST);
        assert_eq!(fat.read_entry(&mut image, 8).unwrap(), CLUSTER_FREE);
    }

    #[test]
    fn chains_are_mirrored_into_every_copy() {
        let (fat, mut image) = table();
        fat.init(&mut image).unwrap();
        fat.write_chain(&mut image, 2, 2).unwrap();

        let bytes = image.into_inner();
        let copy_len = 16 * 512;
        assert_eq!(&bytes[..copy_len], &bytes[copy_len..]);
    }

    #[test]
    fn empty_chain_writes_nothing() {
        let (fat, mut image) = table();
        fat.init(&mut image).unwrap();
        let before = image.get_ref().clone();
        fat.write_chain(&mut image, 2, 0).unwrap();
        assert_eq!(image.into_inner(), before);
    }
}
