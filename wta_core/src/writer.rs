use std::fs::File;
use std::io::{Seek, SeekFrom, Write as _};
use std::path::Path;

use anyhow::Context;

use crate::adapter::CompressionAdapter;
use crate::format::{ArchiveHeader, ArchiveLayout, LutEntry, DATA_TITLE, VOXEL_COUNT};
use crate::texture::TextureBlock;

/// Single-process write mode of an archive.
///
/// # Write contract
/// Blocks may arrive in any slot order; payloads are appended in call order
/// at a monotonically advancing cursor, independent of the slot's grid
/// position. Each `write` persists the slot's fixed-position LUT entry and
/// the payload. Writing a slot twice repoints its LUT entry and permanently
/// orphans the earlier payload bytes — accepted, never compacted.
///
/// # Layout written
/// ```text
/// [header]           ← at create
/// [LUT, zero-filled] ← reserved at create; entries land as blocks arrive
/// [data-title]       ← at create
/// [payload payload …]← append-only
/// ```
///
/// Not safe for concurrent use: one stateful file cursor is mutated by every
/// operation.
pub struct Writer {
    file: File,
    header: ArchiveHeader,
    layout: ArchiveLayout,
    adapter: Box<dyn CompressionAdapter>,
    /// Next free byte in the data region.
    cursor: u64,
}

impl Writer {
    /// Create a fresh archive at `path`, overwriting any existing file.
    ///
    /// The header and data-title sentinel are persisted immediately; the LUT
    /// region is reserved zero-filled, so every slot starts as "unwritten".
    pub fn create(
        path: impl AsRef<Path>,
        xtextures: usize,
        ytextures: usize,
        ztextures: usize,
        threshold: f32,
        halffloat: bool,
        adapter: Box<dyn CompressionAdapter>,
    ) -> anyhow::Result<Self> {
        let header = ArchiveHeader {
            xtextures,
            ytextures,
            ztextures,
            threshold,
            halffloat,
            wavelet: adapter.wavelet_name().to_string(),
            encoder: adapter.encoder_name().to_string(),
        };
        let layout = ArchiveLayout::new(&header);

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("creating archive {:?}", path.as_ref()))?;
        file.write_all(header.render().as_bytes())?;
        file.seek(SeekFrom::Start(layout.data_title_start))?;
        file.write_all(DATA_TITLE.as_bytes())?;

        tracing::debug!(
            xtextures,
            ytextures,
            ztextures,
            data_start = layout.data_start,
            "archive created"
        );

        Ok(Self {
            file,
            header,
            layout,
            adapter,
            cursor: layout.data_start,
        })
    }

    /// Compress `block` and persist it into slot `(ix, iy, iz)`.
    ///
    /// Panics if the slot is outside the configured grid.
    pub fn write(
        &mut self,
        ix: usize,
        iy: usize,
        iz: usize,
        block: &TextureBlock,
    ) -> anyhow::Result<()> {
        assert!(ix < self.header.xtextures, "texture index ix={ix} out of range");
        assert!(iy < self.header.ytextures, "texture index iy={iy} out of range");
        assert!(iz < self.header.ztextures, "texture index iz={iz} out of range");

        let nbytes = self
            .adapter
            .compress(self.header.threshold, self.header.halffloat, &block.cube)?;
        anyhow::ensure!(nbytes > 0, "adapter produced an empty payload");
        anyhow::ensure!(
            nbytes <= u32::MAX as usize,
            "payload of {nbytes} bytes exceeds the LUT length field"
        );

        // allocate at the current end of the data region
        let offset = self.cursor;
        self.cursor += nbytes as u64;

        let entry = LutEntry {
            geometry: block.geometry,
            offset,
            nbytes: nbytes as u32,
        };
        self.file
            .seek(SeekFrom::Start(self.layout.lut_entry_offset(ix, iy, iz)))?;
        self.file.write_all(&entry.to_bytes())?;

        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(self.adapter.payload())?;

        tracing::debug!(
            ix,
            iy,
            iz,
            offset,
            nbytes,
            ratio = (VOXEL_COUNT * 4) as f64 / nbytes as f64,
            "texture written"
        );
        Ok(())
    }

    pub fn xtextures(&self) -> usize {
        self.header.xtextures
    }

    pub fn ytextures(&self) -> usize {
        self.header.ytextures
    }

    pub fn ztextures(&self) -> usize {
        self.header.ztextures
    }

    /// Flush and close the archive.
    pub fn close(self) -> anyhow::Result<()> {
        self.file.sync_all()?;
        tracing::debug!(bytes = self.cursor, "archive closed");
        Ok(())
    }
}
