//! Multi-process write-only extension.
//!
//! N independent processes append compressed payloads into one shared
//! archive file. The only coordinated resource is a shared 8-byte offset
//! counter in a sidecar file next to the archive; everything else is
//! unsynchronized I/O on provably disjoint byte ranges.
//!
//! # Protocol, per write
//! 1. compress the block
//! 2. take the exclusive lock on the counter
//! 3. read the current value — that is this write's offset
//! 4. add the payload length and write the counter back
//! 5. release the lock
//! 6. persist the LUT entry at the slot's fixed position
//! 7. persist the payload at the reserved offset
//!
//! Steps 2–5 are the only blocking region: short, bounded, globally
//! serializing. Steps 6–7 need no locking — slots are disjoint by problem
//! partitioning and payload ranges are disjoint by construction. A process
//! that crashes after reserving but before step 7 leaves a permanent hole;
//! there is no log, rollback, or retry.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, Read, Seek, SeekFrom, Write as _};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};

use crate::adapter::CompressionAdapter;
use crate::format::{ArchiveHeader, ArchiveLayout, LutEntry, DATA_TITLE, VOXEL_COUNT};
use crate::texture::TextureBlock;

// ── Shared offset counter ──────────────────────────────────────────────────

/// The shared "next free data offset" cell: one u64 LE in a sidecar file,
/// mutated only under an exclusive advisory lock.
///
/// The counter is only ever read-then-incremented under the lock, never
/// decremented or reset, so reserved ranges can never overlap. Every handle
/// — across threads and across processes — contends for the same lock; a
/// holder that stalls blocks all other writers indefinitely.
pub struct OffsetCounter {
    file: File,
}

impl OffsetCounter {
    /// Path of the counter sidecar for an archive: `<archive>.offset`.
    pub fn sidecar_path(archive: &Path) -> PathBuf {
        let mut name = archive.as_os_str().to_os_string();
        name.push(".offset");
        PathBuf::from(name)
    }

    /// Create the sidecar, initialized to `initial` (the archive's data
    /// region start). Coordinator only.
    pub fn create(archive: &Path, initial: u64) -> anyhow::Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(Self::sidecar_path(archive))
            .with_context(|| format!("creating offset counter for {archive:?}"))?;
        file.write_all(&initial.to_le_bytes())?;
        file.sync_all()?;
        Ok(Self { file })
    }

    /// Open an existing sidecar. Fails if the coordinator has not created it.
    pub fn open(archive: &Path) -> anyhow::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(Self::sidecar_path(archive))
            .with_context(|| {
                format!("opening offset counter for {archive:?} (archive not initialized?)")
            })?;
        Ok(Self { file })
    }

    /// Atomically reserve `[returned, returned + nbytes)` for this caller.
    ///
    /// Blocks until the exclusive lock is available.
    pub fn reserve(&mut self, nbytes: u64) -> anyhow::Result<u64> {
        fs2::FileExt::lock_exclusive(&self.file)?;
        let result = self.fetch_add_locked(nbytes);
        let _ = fs2::FileExt::unlock(&self.file);
        result
    }

    fn fetch_add_locked(&mut self, nbytes: u64) -> anyhow::Result<u64> {
        let mut buf = [0u8; 8];
        self.file.seek(SeekFrom::Start(0))?;
        self.file.read_exact(&mut buf)?;
        let current = u64::from_le_bytes(buf);

        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&(current + nbytes).to_le_bytes())?;
        self.file.sync_data()?;

        tracing::trace!(offset = current, nbytes, "range reserved");
        Ok(current)
    }

    /// Current counter value (for diagnostics; racy by nature).
    pub fn value(&mut self) -> anyhow::Result<u64> {
        let mut buf = [0u8; 8];
        self.file.seek(SeekFrom::Start(0))?;
        self.file.read_exact(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    /// Remove the sidecar. Coordinator only, after the external completion
    /// barrier.
    pub fn remove(archive: &Path) -> anyhow::Result<()> {
        std::fs::remove_file(Self::sidecar_path(archive))
            .with_context(|| format!("removing offset counter for {archive:?}"))
    }
}

// ── Distributed writer ─────────────────────────────────────────────────────

/// One participant's write handle on a shared archive.
///
/// Exactly one process calls [`initialize`](Self::initialize); every other
/// process calls [`join`](Self::join) — but only after an external barrier
/// guarantees initialization has completed. `join` re-validates the on-disk
/// header, so joining an uninitialized archive fails loudly instead of
/// racing. Slot assignment across processes is the caller's partitioning
/// responsibility and is not enforced here.
///
/// Consumers must not open the archive for reading until all writers have
/// closed and the coordinator has called [`finalize`](Self::finalize) — this
/// type exposes no fence primitive beyond that.
pub struct DistributedWriter {
    file: File,
    header: ArchiveHeader,
    layout: ArchiveLayout,
    adapter: Box<dyn CompressionAdapter>,
    counter: OffsetCounter,
}

impl DistributedWriter {
    /// Coordinator entry point: create the shared file, persist header and
    /// data-title durably, and create the offset counter at the data region
    /// start. When this returns, the archive is ready for `join`.
    pub fn initialize(
        path: impl AsRef<Path>,
        xtextures: usize,
        ytextures: usize,
        ztextures: usize,
        threshold: f32,
        halffloat: bool,
        adapter: Box<dyn CompressionAdapter>,
    ) -> anyhow::Result<Self> {
        let path = path.as_ref();
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

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .with_context(|| format!("creating shared archive {path:?}"))?;
        file.write_all(header.render().as_bytes())?;
        file.seek(SeekFrom::Start(layout.data_title_start))?;
        file.write_all(DATA_TITLE.as_bytes())?;
        // header and title must be visible to joiners before we return
        file.sync_all()?;

        let counter = OffsetCounter::create(path, layout.data_start)?;

        tracing::debug!(
            xtextures,
            ytextures,
            ztextures,
            data_start = layout.data_start,
            "shared archive initialized"
        );

        Ok(Self {
            file,
            header,
            layout,
            adapter,
            counter,
        })
    }

    /// Participant entry point: attach to an archive another process has
    /// initialized.
    ///
    /// Validates the on-disk header against this build and `adapter`, adopts
    /// the grid dimensions, threshold, and half-float flag from the file, and
    /// opens this process's own write handle plus the shared counter.
    pub fn join(
        path: impl AsRef<Path>,
        adapter: Box<dyn CompressionAdapter>,
    ) -> anyhow::Result<Self> {
        let path = path.as_ref();

        let probe = File::open(path)
            .with_context(|| format!("joining shared archive {path:?} (not initialized?)"))?;
        let header = ArchiveHeader::parse(&mut BufReader::new(probe))?;
        if header.wavelet != adapter.wavelet_name() {
            bail!(
                "wavelet mismatch: shared archive uses {:?}, this adapter is {:?}",
                header.wavelet,
                adapter.wavelet_name()
            );
        }
        if header.encoder != adapter.encoder_name() {
            bail!(
                "encoder mismatch: shared archive uses {:?}, this adapter is {:?}",
                header.encoder,
                adapter.encoder_name()
            );
        }
        let layout = ArchiveLayout::new(&header);

        let file = OpenOptions::new()
            .write(true)
            .open(path)
            .with_context(|| format!("opening write handle on {path:?}"))?;
        let counter = OffsetCounter::open(path)?;

        tracing::debug!(
            xtextures = header.xtextures,
            ytextures = header.ytextures,
            ztextures = header.ztextures,
            "joined shared archive"
        );

        Ok(Self {
            file,
            header,
            layout,
            adapter,
            counter,
        })
    }

    /// Compress `block`, reserve a disjoint byte range from the shared
    /// counter, and persist LUT entry and payload.
    ///
    /// Panics if the slot is outside the grid. The slot must belong to this
    /// process under the callers' partitioning.
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

        // steps 2-5: the only cross-process critical section
        let my_offset = self.counter.reserve(nbytes as u64)?;

        // steps 6-7: unsynchronized, disjoint ranges
        let entry = LutEntry {
            geometry: block.geometry,
            offset: my_offset,
            nbytes: nbytes as u32,
        };
        self.file
            .seek(SeekFrom::Start(self.layout.lut_entry_offset(ix, iy, iz)))?;
        self.file.write_all(&entry.to_bytes())?;

        self.file.seek(SeekFrom::Start(my_offset))?;
        self.file.write_all(self.adapter.payload())?;

        tracing::debug!(
            ix,
            iy,
            iz,
            offset = my_offset,
            nbytes,
            ratio = (VOXEL_COUNT * 4) as f64 / nbytes as f64,
            "texture written (shared)"
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

    /// Flush this participant's writes and release its counter handle.
    pub fn close(self) -> anyhow::Result<()> {
        self.file.sync_all()?;
        tracing::debug!("shared archive handle closed");
        Ok(())
    }

    /// Remove the counter sidecar. Coordinator only, strictly after every
    /// participant has closed (an external barrier the callers own).
    pub fn finalize(path: impl AsRef<Path>) -> anyhow::Result<()> {
        OffsetCounter::remove(path.as_ref())
    }
}
