//! WTA — wavelet texture archive.
//!
//! A single-file archive of fixed-size, lossily-compressed 3D voxel blocks
//! ("textures") addressed through a fixed-width lookup table, plus a
//! distributed write mode where independent processes append into one shared
//! file through a lock-protected shared offset counter.
//!
//! The compression codec itself is external: archives move opaque payloads
//! through the [`CompressionAdapter`] trait (see the `wta_codecs` crate for
//! bundled implementations).

pub mod adapter;
pub mod distributed;
pub mod format;
pub mod geometry;
pub mod reader;
pub mod texture;
pub mod writer;

pub use adapter::CompressionAdapter;
pub use distributed::{DistributedWriter, OffsetCounter};
pub use format::{ArchiveHeader, ArchiveLayout, LutEntry, LUT_ENTRY_SIZE, VOXELS, VOXEL_COUNT};
pub use geometry::Geometry;
pub use reader::Reader;
pub use texture::{TextureBlock, VoxelCube};
pub use writer::Writer;
