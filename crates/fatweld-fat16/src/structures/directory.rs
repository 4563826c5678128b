//! The root directory region and its 32-byte entries.

use std::io::{Read, Seek, SeekFrom, Write};

use crate::geometry::Geometry;
use crate::structures::raw::directory::{RawFileEntry, DIR_ENTRY_SIZE, ENTRY_FREE};
use crate::structures::{zero_fill, ShortName};
use crate::Fat16Error;

bitflags::bitflags! {
    /// File attributes
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FileAttributes: u8 {
        const READ_ONLY = 0x01;
        const HIDDEN = 0x02;
        const SYSTEM = 0x04;
        const VOLUME_LABEL = 0x08;
        const DIRECTORY = 0x10;
        const ARCHIVE = 0x20;
    }
}

/// A typed view over one directory entry.
///
/// Injected entries carry no timestamps: the reserved and time/date fields
/// stay zero, matching the image the boot loader expects. On FAT16 the high
/// cluster word is always zero.
#[repr(transparent)]
#[derive(Clone, Copy, bytemuck::NoUninit, bytemuck::AnyBitPattern)]
pub struct FileEntry {
    data: RawFileEntry,
}

impl FileEntry {
    pub fn new(name: &ShortName, attributes: FileAttributes, cluster: u16, size: u32) -> Self {
        Self {
            data: RawFileEntry {
                name: *name.as_bytes(),
                attributes: attributes.bits(),
                reserved: 0,
                creation_time_tenth: 0,
                creation_time: [0; 2],
                creation_date: [0; 2],
                last_access_date: [0; 2],
                first_cluster_high: [0; 2],
                last_write_time: [0; 2],
                last_write_date: [0; 2],
                first_cluster_low: cluster.to_le_bytes(),
                size: size.to_le_bytes(),
            },
        }
    }

    pub fn from_bytes(bytes: [u8; DIR_ENTRY_SIZE]) -> Self {
        bytemuck::cast(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    pub fn name(&self) -> ShortName {
        ShortName::from_raw(self.data.name)
    }

    pub fn attributes(&self) -> FileAttributes {
        FileAttributes::from_bits_truncate(self.data.attributes)
    }

    /// Starting cluster of the file's chain.
    pub fn cluster(&self) -> u16 {
        u16::from_le_bytes(self.data.first_cluster_low)
    }

    /// File size in bytes.
    pub fn size(&self) -> u32 {
        u32::from_le_bytes(self.data.size)
    }
}

/// The root directory: a fixed run of 32-byte slots at a geometry-derived
/// offset.
///
/// This is the only place that scans for insertion points, and the scan
/// accepts never-used slots only (leading byte `0x00`). A deleted entry
/// (`0xE5`) is not an insertion point: the builder never reclaims, it
/// resets the whole region and appends.
#[derive(Debug)]
pub struct RootDirectory {
    offset: u64,
    size_bytes: u64,
    capacity: usize,
}

impl RootDirectory {
    pub fn new(geometry: &Geometry) -> Self {
        Self {
            offset: geometry.root_dir_offset(),
            size_bytes: geometry.root_dir_size_bytes(),
            capacity: geometry.root_entries as usize,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn slot_offset(&self, index: usize) -> u64 {
        self.offset + (index * DIR_ENTRY_SIZE) as u64
    }

    /// Zero-fills the whole region, so every slot reads as never used.
    pub fn clear<W: Write + Seek>(&self, writer: &mut W) -> Result<(), Fat16Error> {
        zero_fill(writer, self.offset, self.size_bytes)?;
        Ok(())
    }

    /// Index of the first never-used slot, scanning from the region start.
    pub fn first_free_slot<R: Read + Seek>(
        &self,
        reader: &mut R,
    ) -> Result<Option<usize>, Fat16Error> {
        let mut lead = [0u8; 1];
        for index in 0..self.capacity {
            reader.seek(SeekFrom::Start(self.slot_offset(index)))?;
            reader.read_exact(&mut lead)?;
            if lead[0] == ENTRY_FREE {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    /// Writes `entry` into the first free slot and returns its index.
    pub fn append<T: Read + Write + Seek>(
        &self,
        io: &mut T,
        entry: &FileEntry,
    ) -> Result<usize, Fat16Error> {
        let index = self
            .first_free_slot(io)?
            .ok_or(Fat16Error::RootDirectoryFull {
                capacity: self.capacity,
            })?;
        io.seek(SeekFrom::Start(self.slot_offset(index)))?;
        io.write_all(entry.as_bytes())?;
        Ok(index)
    }

    /// Reads the entry at `index`.
    pub fn entry_at<R: Read + Seek>(
        &self,
        reader: &mut R,
        index: usize,
    ) -> Result<FileEntry, Fat16Error> {
        let mut buf = [0u8; DIR_ENTRY_SIZE];
        reader.seek(SeekFrom::Start(self.slot_offset(index)))?;
        reader.read_exact(&mut buf)?;
        Ok(FileEntry::from_bytes(buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structures::raw::directory::ENTRY_DELETED;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn root() -> (RootDirectory, Cursor<Vec<u8>>) {
        let geometry = Geometry {
            bytes_per_sector: 512,
            reserved_sectors: 0,
            fat_count: 0,
            sectors_per_fat: 0,
            root_entries: 16,
        };
        (RootDirectory::new(&geometry), Cursor::new(vec![0u8; 512]))
    }

    fn entry(name: &str, cluster: u16, size: u32) -> FileEntry {
        FileEntry::new(
            &ShortName::parse(name).unwrap(),
            FileAttributes::ARCHIVE,
            cluster,
            size,
        )
    }

    #[test]
    fn entry_fields_round_trip() {
        let e = entry("INIT.ELF", 9, 4_100);
        assert_eq!(e.name().to_string(), "INIT.ELF");
        assert_eq!(e.attributes(), FileAttributes::ARCHIVE);
        assert_eq!(e.cluster(), 9);
        assert_eq!(e.size(), 4_100);
        assert_eq!(e.as_bytes().len(), DIR_ENTRY_SIZE);

        let bytes: [u8; DIR_ENTRY_SIZE] = e.as_bytes().try_into().unwrap();
        assert_eq!(FileEntry::from_bytes(bytes).as_bytes(), e.as_bytes());
    }

    #[test]
    fn append_fills_slots_in_order() {
        let (dir, mut image) = root();
        assert_eq!(dir.append(&mut image, &entry("A.BIN", 2, 1)).unwrap(), 0);
        assert_eq!(dir.append(&mut image, &entry("B.BIN", 3, 1)).unwrap(), 1);

        assert_eq!(dir.entry_at(&mut image, 0).unwrap().name().to_string(), "A.BIN");
        assert_eq!(dir.entry_at(&mut image, 1).unwrap().name().to_string(), "B.BIN");
    }

    #[test]
    fn deleted_slots_are_not_reused() {
        let (dir, mut image) = root();
        image.get_mut()[0] = ENTRY_DELETED;
        assert_eq!(dir.append(&mut image, &entry("A.BIN", 2, 1)).unwrap(), 1);
    }

    #[test]
    fn full_directory_is_an_error() {
        let (dir, mut image) = root();
        for i in 0..dir.capacity() {
            dir.append(&mut image, &entry("A.BIN", 2 + i as u16, 1))
                .unwrap();
        }
        let err = dir.append(&mut image, &entry("B.BIN", 40, 1)).unwrap_err();
        assert!(matches!(
            err,
            Fat16Error::RootDirectoryFull { capacity: 16 }
        ));
    }

    #[test]
    fn clear_resets_every_slot() {
        let (dir, mut image) = root();
        dir.append(&mut image, &entry("A.BIN", 2, 1)).unwrap();
        dir.clear(&mut image).unwrap();
        assert!(image.get_ref().iter().all(|b| *b == 0));
        assert_eq!(dir.first_free_slot(&mut image).unwrap(), Some(0));
    }
}
