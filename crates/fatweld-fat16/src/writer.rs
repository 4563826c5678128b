//! The stateful image writer: reset and per-file injection.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::debug;

use crate::geometry::Geometry;
use crate::structures::directory::{FileAttributes, FileEntry, RootDirectory};
use crate::structures::fat::Fat16Table;
use crate::structures::ShortName;
use crate::Fat16Error;

/// What one injection consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Injection {
    /// Sectors (equivalently clusters) the payload occupies
    pub sectors: u32,
    /// Where the next payload must start for gap-free allocation
    pub next_cluster: u16,
}

/// Owns the open image handle for the duration of one build run.
///
/// The writer holds no allocation state: callers thread the cluster cursor
/// through successive [`inject`](Self::inject) calls, starting at
/// [`FIRST_DATA_CLUSTER`](crate::structures::fat::constants::FIRST_DATA_CLUSTER)
/// after a [`reset`](Self::reset). Allocation is strictly sequential, so
/// cluster ranges of successive payloads are contiguous and never overlap.
#[derive(Debug)]
pub struct ImageWriter<T> {
    inner: T,
    geometry: Geometry,
    fat: Fat16Table,
    root: RootDirectory,
    image_len: u64,
}

impl ImageWriter<std::fs::File> {
    /// Opens an existing image read/write.
    ///
    /// A missing image is fatal and nothing has been written at that point;
    /// there is no partial-build recovery path once writes begin.
    pub fn open_file<P: AsRef<Path>>(path: P, geometry: Geometry) -> Result<Self, Fat16Error> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Self::new(file, geometry)
    }
}

impl<T: Read + Write + Seek> ImageWriter<T> {
    pub fn new(mut inner: T, geometry: Geometry) -> Result<Self, Fat16Error> {
        let image_len = inner.seek(SeekFrom::End(0))?;
        Ok(Self {
            fat: Fat16Table::new(&geometry),
            root: RootDirectory::new(&geometry),
            inner,
            geometry,
            image_len,
        })
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Clears the root directory and re-initializes every FAT copy, so the
    /// first-empty-slot scan and the sequential free-cluster assumption
    /// hold for the injections that follow.
    pub fn reset(&mut self) -> Result<(), Fat16Error> {
        self.root.clear(&mut self.inner)?;
        self.fat.init(&mut self.inner)?;
        debug!("reset FAT and root directory regions");
        Ok(())
    }

    /// Injects one payload at `start_cluster`: data bytes into the data
    /// region, the cluster chain into the FAT, and a directory entry into
    /// the first free root slot.
    ///
    /// A zero-length payload writes no data and no FAT entry; it still gets
    /// a size-0 directory entry, and the returned cursor is unchanged.
    pub fn inject(
        &mut self,
        name: &ShortName,
        data: &[u8],
        start_cluster: u16,
    ) -> Result<Injection, Fat16Error> {
        let sector_size = self.geometry.bytes_per_sector as usize;
        let sectors = data.len().div_ceil(sector_size) as u32;

        if sectors > 0 {
            let end = start_cluster as u32 + sectors - 1;
            let max = self.geometry.max_cluster();
            if end > max as u32 {
                return Err(Fat16Error::ClusterOverflow {
                    start: start_cluster,
                    end,
                    max,
                });
            }
            let offset = self.geometry.cluster_offset(start_cluster);
            if offset + data.len() as u64 > self.image_len {
                return Err(Fat16Error::DataOverflow {
                    offset,
                    len: data.len() as u64,
                    image_len: self.image_len,
                });
            }

            // No padding past the payload: the trailing partial sector
            // reads as zero only if the surrounding data region already was.
            self.inner.seek(SeekFrom::Start(offset))?;
            self.inner.write_all(data)?;
            self.fat.write_chain(&mut self.inner, start_cluster, sectors)?;
        }

        let entry = FileEntry::new(name, FileAttributes::ARCHIVE, start_cluster, data.len() as u32);
        let slot = self.root.append(&mut self.inner, &entry)?;
        debug!(%name, sectors, start_cluster, slot, "injected payload");

        Ok(Injection {
            sectors,
            next_cluster: start_cluster + sectors as u16,
        })
    }

    /// Reads `source` and injects it; a missing source is a skip, not an
    /// error: `Ok(None)` with the image and cursor untouched.
    pub fn inject_path(
        &mut self,
        name: &ShortName,
        source: &Path,
        start_cluster: u16,
    ) -> Result<Option<Injection>, Fat16Error> {
        let data = match std::fs::read(source) {
            Ok(data) => data,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        self.inject(name, &data, start_cluster).map(Some)
    }

    /// Flushes and returns the underlying handle.
    pub fn into_inner(mut self) -> Result<T, Fat16Error> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}
