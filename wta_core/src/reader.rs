use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use anyhow::{bail, ensure, Context};

use crate::adapter::CompressionAdapter;
use crate::format::{ArchiveHeader, ArchiveLayout, LutEntry, LUT_ENTRY_SIZE};
use crate::texture::TextureBlock;

/// Single-process read mode of an archive.
///
/// # Open sequence
/// 1. Parse the ASCII header token by token, validating every field against
///    this build's compiled constants and the supplied adapter. Any mismatch
///    is fatal — writer and reader must share identical build parameters.
/// 2. Load the entire LUT into memory (60 bytes × X*Y*Z).
///
/// `read` then seeks straight to a slot's payload. Threshold, half-float
/// flag, and grid dimensions are adopted from the file.
///
/// Readers must only run after every writer has finished; the format offers
/// no read-write concurrency.
pub struct Reader {
    file: File,
    header: ArchiveHeader,
    layout: ArchiveLayout,
    lut: Vec<LutEntry>,
    adapter: Box<dyn CompressionAdapter>,
}

impl std::fmt::Debug for Reader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reader")
            .field("file", &self.file)
            .field("header", &self.header)
            .field("layout", &self.layout)
            .field("lut", &self.lut)
            .finish_non_exhaustive()
    }
}

impl Reader {
    /// Open an existing archive, validating its header against the compiled
    /// constants and `adapter`'s wavelet/encoder identifiers.
    pub fn open(
        path: impl AsRef<Path>,
        adapter: Box<dyn CompressionAdapter>,
    ) -> anyhow::Result<Self> {
        let file = File::open(path.as_ref())
            .with_context(|| format!("opening archive {:?}", path.as_ref()))?;
        let mut r = BufReader::new(file);

        let header = ArchiveHeader::parse(&mut r)?;
        if header.wavelet != adapter.wavelet_name() {
            bail!(
                "wavelet mismatch: file was written with {:?}, this adapter is {:?}",
                header.wavelet,
                adapter.wavelet_name()
            );
        }
        if header.encoder != adapter.encoder_name() {
            bail!(
                "encoder mismatch: file was written with {:?}, this adapter is {:?}",
                header.encoder,
                adapter.encoder_name()
            );
        }

        // the layout recomputed from the parsed fields must agree with the
        // bytes actually consumed, or the file was not written by this format
        let layout = ArchiveLayout::new(&header);
        let pos = r.stream_position()?;
        ensure!(
            pos == layout.lut_start,
            "header length {pos} disagrees with recomputed layout {}",
            layout.lut_start
        );

        let mut lut = Vec::with_capacity(layout.entry_count());
        let mut buf = [0u8; LUT_ENTRY_SIZE as usize];
        for _ in 0..layout.entry_count() {
            r.read_exact(&mut buf)?;
            lut.push(LutEntry::from_bytes(&buf)?);
        }

        tracing::debug!(
            xtextures = header.xtextures,
            ytextures = header.ytextures,
            ztextures = header.ztextures,
            threshold = header.threshold,
            halffloat = header.halffloat,
            wavelet = %header.wavelet,
            encoder = %header.encoder,
            "archive opened"
        );

        Ok(Self {
            file: r.into_inner(),
            header,
            layout,
            lut,
            adapter,
        })
    }

    /// Decompress slot `(ix, iy, iz)` into `block`, restoring both the voxel
    /// cube and the geometry stored in the LUT.
    ///
    /// Panics if the slot is outside the grid; fails if the slot was never
    /// written.
    pub fn read(
        &mut self,
        ix: usize,
        iy: usize,
        iz: usize,
        block: &mut TextureBlock,
    ) -> anyhow::Result<()> {
        assert!(ix < self.header.xtextures, "texture index ix={ix} out of range");
        assert!(iy < self.header.ytextures, "texture index iy={iy} out of range");
        assert!(iz < self.header.ztextures, "texture index iz={iz} out of range");

        let entry = self.lut[self.layout.slot_index(ix, iy, iz)];
        ensure!(
            !entry.is_unwritten(),
            "slot ({ix}, {iy}, {iz}) was never written"
        );

        let nbytes = entry.nbytes as usize;
        self.file.seek(SeekFrom::Start(entry.offset))?;
        self.file.read_exact(self.adapter.stage(nbytes))?;
        self.adapter
            .decompress(self.header.halffloat, nbytes, &mut block.cube)?;
        block.geometry = entry.geometry;

        tracing::debug!(ix, iy, iz, offset = entry.offset, nbytes, "texture read");
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

    pub fn header(&self) -> &ArchiveHeader {
        &self.header
    }

    /// The in-memory LUT, for inspection tooling.
    pub fn entries(&self) -> &[LutEntry] {
        &self.lut
    }

    /// The LUT entry for one slot.
    pub fn entry(&self, ix: usize, iy: usize, iz: usize) -> &LutEntry {
        &self.lut[self.layout.slot_index(ix, iy, iz)]
    }
}
