//! A library for building bootable FAT16 disk images by direct payload
//! injection.
//!
//! The crate does not format images and it is not a FAT16 driver: it takes a
//! pre-formatted image whose geometry is fixed by a companion boot loader,
//! clears the FAT and root-directory regions, and then writes payload files
//! into strictly sequential clusters: data bytes, a 16-bit cluster chain,
//! and an 8.3 root-directory entry per file.
//!
//! The two layers are [`Geometry`] (pure offset math, no I/O) and
//! [`ImageWriter`] (owns the open image handle). The caller threads the
//! allocation cursor through successive [`ImageWriter::inject`] calls:
//!
//! ```no_run
//! use fatweld_fat16::{Geometry, ImageWriter, ShortName};
//! use fatweld_fat16::structures::fat::constants::FIRST_DATA_CLUSTER;
//!
//! let geometry = Geometry {
//!     bytes_per_sector: 512,
//!     reserved_sectors: 4096,
//!     fat_count: 2,
//!     sectors_per_fat: 256,
//!     root_entries: 512,
//! };
//! let mut writer = ImageWriter::open_file("os.img", geometry)?;
//! writer.reset()?;
//! let name = ShortName::parse("WALL.BMP")?;
//! let injection = writer.inject(&name, &std::fs::read("wallpaper.bmp")?, FIRST_DATA_CLUSTER)?;
//! // The next payload starts exactly where this one ended.
//! let next = injection.next_cluster;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod geometry;
pub mod structures;
pub mod writer;

pub use geometry::Geometry;
pub use structures::ShortName;
pub use writer::{ImageWriter, Injection};

/// Errors that can occur while resetting or injecting into an image.
///
/// Everything except [`Fat16Error::Io`] with a not-found kind is structural:
/// the build has no partial-recovery path and callers are expected to abort
/// the run. Missing *source* files are not an error at all, see
/// [`ImageWriter::inject_path`].
#[derive(Debug, thiserror::Error)]
pub enum Fat16Error {
    /// An IO error on the image handle
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A name that does not fit the FAT 8.3 short-name format
    #[error("{0:?} is not a valid 8.3 short name")]
    InvalidName(String),

    /// The cluster chain would run past the last addressable cluster
    #[error("cluster chain {start}..={end} exceeds the last addressable cluster {max}")]
    ClusterOverflow { start: u16, end: u32, max: u16 },

    /// The data write would run past the end of the image
    #[error("write of {len} bytes at offset {offset} runs past the image end ({image_len} bytes)")]
    DataOverflow { offset: u64, len: u64, image_len: u64 },

    /// No never-used slot left in the root directory
    #[error("no empty slot left in the root directory ({capacity} entries)")]
    RootDirectoryFull { capacity: usize },
}
