/// Size of one directory entry in bytes.
pub const DIR_ENTRY_SIZE: usize = core::mem::size_of::<RawFileEntry>();

/// First-byte sentinel of a never-used directory slot. Every slot after it
/// is unused as well.
pub const ENTRY_FREE: u8 = 0x00;

/// First-byte sentinel of a deleted entry. Deleted slots are never reused
/// here: injection always runs against a freshly cleared root directory.
pub const ENTRY_DELETED: u8 = 0xE5;

/// A 32-byte FAT short-name directory entry.
///
/// Multi-byte fields are kept as byte arrays so the struct has no alignment
/// requirement and can be cast straight to and from the image bytes; the
/// typed accessors live on `FileEntry`.
#[repr(C, packed)]
#[derive(Clone, Copy, bytemuck::NoUninit, bytemuck::AnyBitPattern)]
pub struct RawFileEntry {
    /// DIR_Name: 8 name bytes then 3 extension bytes, space padded
    pub name: [u8; 11],
    /// DIR_Attr
    pub attributes: u8,
    /// DIR_NTRes, reserved
    pub reserved: u8,
    /// DIR_CrtTimeTenth
    pub creation_time_tenth: u8,
    /// DIR_CrtTime
    pub creation_time: [u8; 2],
    /// DIR_CrtDate
    pub creation_date: [u8; 2],
    /// DIR_LstAccDate
    pub last_access_date: [u8; 2],
    /// DIR_FstClusHI: always zero on FAT16
    pub first_cluster_high: [u8; 2],
    /// DIR_WrtTime
    pub last_write_time: [u8; 2],
    /// DIR_WrtDate
    pub last_write_date: [u8; 2],
    /// DIR_FstClusLO
    pub first_cluster_low: [u8; 2],
    /// DIR_FileSize, little endian
    pub size: [u8; 4],
}
