//! On-disk layout of a WTA archive.
//!
//! ```text
//! [header: ASCII, line-oriented "Key: value", fixed field order]
//! [LUT: X*Y*Z × 60-byte packed entries]
//! [data-title: fixed sentinel line]
//! [data region: concatenated variable-length compressed payloads]
//! ```
//!
//! The header is self-describing but deliberately strict: every field is
//! parsed in order on open and compared against this build's compiled
//! constants. Writer and reader must share identical build parameters;
//! there is no partial-compatibility path.

use std::io::BufRead;
use std::path::Path;

use anyhow::{bail, Context};

use crate::geometry::Geometry;

/// Voxels per cube edge. A compile-time constant: every block in every
/// archive produced by this build is a `VOXELS³` cube, and archives written
/// with a different value are rejected on open.
pub const VOXELS: usize = 8;

/// Samples per cube.
pub const VOXEL_COUNT: usize = VOXELS * VOXELS * VOXELS;

/// Serialized size of [`Geometry`]: 12 × f32, packed.
pub const GEOMETRY_SIZE: u64 = 48;

/// Serialized size of one LUT entry: Geometry + offset:u64 + nbytes:u32,
/// packed field-by-field with no padding. Stored in the header and
/// validated on open.
pub const LUT_ENTRY_SIZE: u64 = GEOMETRY_SIZE + 8 + 4;

pub const HEADER_BEGIN: &str = "==============START-ASCI-HEADER==============";
pub const LUT_BEGIN: &str = "==============START-BINARY-LUT==============";

/// Sentinel line separating the LUT from the data region.
pub const DATA_TITLE: &str = "==============START-BINARY-DATA==============\n";

// ── LUT entry ──────────────────────────────────────────────────────────────

/// One fixed-width LUT record: where a slot's compressed payload lives.
///
/// `offset == 0` marks a slot that was never written — a real payload can
/// never start at 0 because the data region begins after header and LUT.
#[derive(Debug, Clone, Copy, Default)]
pub struct LutEntry {
    pub geometry: Geometry,
    /// Absolute byte offset of the payload in the file.
    pub offset: u64,
    /// Payload length in bytes.
    pub nbytes: u32,
}

impl LutEntry {
    /// Serialize to exactly `LUT_ENTRY_SIZE` bytes.
    pub fn to_bytes(&self) -> [u8; LUT_ENTRY_SIZE as usize] {
        let mut buf = [0u8; LUT_ENTRY_SIZE as usize];
        buf[..48].copy_from_slice(&self.geometry.to_bytes());
        buf[48..56].copy_from_slice(&self.offset.to_le_bytes());
        buf[56..60].copy_from_slice(&self.nbytes.to_le_bytes());
        buf
    }

    /// Deserialize from `LUT_ENTRY_SIZE` bytes.
    pub fn from_bytes(buf: &[u8; LUT_ENTRY_SIZE as usize]) -> anyhow::Result<Self> {
        Ok(Self {
            geometry: Geometry::from_bytes(buf[..48].try_into()?)?,
            offset: u64::from_le_bytes(buf[48..56].try_into()?),
            nbytes: u32::from_le_bytes(buf[56..60].try_into()?),
        })
    }

    /// True if this slot was never written.
    pub fn is_unwritten(&self) -> bool {
        self.offset == 0
    }
}

// ── Header ─────────────────────────────────────────────────────────────────

/// Decoded representation of the ASCII archive header.
///
/// Grid dimensions, threshold, and the half-float flag are per-archive
/// parameters adopted from the file on open; voxel count, entry size, and
/// endianness are compiled expectations, and the wavelet/encoder names must
/// match the adapter the archive is opened with.
#[derive(Debug, Clone)]
pub struct ArchiveHeader {
    pub xtextures: usize,
    pub ytextures: usize,
    pub ztextures: usize,
    pub threshold: f32,
    pub halffloat: bool,
    pub wavelet: String,
    pub encoder: String,
}

impl ArchiveHeader {
    /// Total number of LUT slots.
    pub fn ntextures(&self) -> usize {
        self.xtextures * self.ytextures * self.ztextures
    }

    /// Render the exact header text written at the start of the file.
    ///
    /// Fields are always serialized little-endian regardless of host, so the
    /// endianness line is a constant.
    pub fn render(&self) -> String {
        let mut s = String::new();
        s.push('\n');
        s.push_str(HEADER_BEGIN);
        s.push('\n');
        s.push_str("Endianess: little\n");
        s.push_str(&format!("Voxelsperdimension: {}\n", VOXELS));
        s.push_str(&format!(
            "Textures: {} x {} x {}\n",
            self.xtextures, self.ytextures, self.ztextures
        ));
        s.push_str(&format!(
            "HalfFloat: {}\n",
            if self.halffloat { "yes" } else { "no" }
        ));
        s.push_str(&format!("Wavelets: {}\n", self.wavelet));
        s.push_str(&format!("Threshold: {}\n", self.threshold));
        s.push_str(&format!("Encoder: {}\n", self.encoder));
        s.push_str(&format!("SizeofCompressedTexData: {}\n", LUT_ENTRY_SIZE));
        s.push_str(LUT_BEGIN);
        s.push('\n');
        s
    }

    /// Parse and validate the header, field by field in fixed order.
    ///
    /// Any disagreement with this build's compiled constants is fatal: the
    /// error names the expected and actual values and callers propagate it
    /// without fallback. On success the stream is positioned exactly at the
    /// first LUT byte.
    pub fn parse<R: BufRead>(r: &mut R) -> anyhow::Result<Self> {
        expect_line(r, "")?;
        expect_line(r, HEADER_BEGIN)?;

        let endianess = read_field(r, "Endianess")?;
        if endianess != "little" {
            bail!("endianness mismatch: file is {endianess:?}, this build reads \"little\" only");
        }

        let voxels: usize = read_field(r, "Voxelsperdimension")?
            .parse()
            .context("parsing Voxelsperdimension")?;
        if voxels != VOXELS {
            bail!("voxel count mismatch: file has {voxels} voxels per dimension, this build is compiled for {VOXELS}");
        }

        let dims = read_field(r, "Textures")?;
        let parts: Vec<&str> = dims.split(" x ").collect();
        if parts.len() != 3 {
            bail!("malformed Textures field {dims:?}, expected \"X x Y x Z\"");
        }
        let xtextures: usize = parts[0].parse().context("parsing texture grid X")?;
        let ytextures: usize = parts[1].parse().context("parsing texture grid Y")?;
        let ztextures: usize = parts[2].parse().context("parsing texture grid Z")?;

        let halffloat = match read_field(r, "HalfFloat")?.as_str() {
            "yes" => true,
            "no" => false,
            other => bail!("malformed HalfFloat field {other:?}, expected yes or no"),
        };

        let wavelet = read_field(r, "Wavelets")?;
        let threshold: f32 = read_field(r, "Threshold")?
            .parse()
            .context("parsing Threshold")?;
        let encoder = read_field(r, "Encoder")?;

        let entry_size: u64 = read_field(r, "SizeofCompressedTexData")?
            .parse()
            .context("parsing SizeofCompressedTexData")?;
        if entry_size != LUT_ENTRY_SIZE {
            bail!("LUT entry size mismatch: file uses {entry_size}-byte entries, this build uses {LUT_ENTRY_SIZE}");
        }

        expect_line(r, LUT_BEGIN)?;

        Ok(Self {
            xtextures,
            ytextures,
            ztextures,
            threshold,
            halffloat,
            wavelet,
            encoder,
        })
    }

    /// Read just the header of an archive file.
    ///
    /// Used by tooling to discover the encoder before choosing an adapter.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let file = std::fs::File::open(path.as_ref())
            .with_context(|| format!("opening archive {:?}", path.as_ref()))?;
        let mut r = std::io::BufReader::new(file);
        Self::parse(&mut r)
    }
}

fn expect_line<R: BufRead>(r: &mut R, expected: &str) -> anyhow::Result<()> {
    let mut line = String::new();
    r.read_line(&mut line)?;
    if line.trim_end_matches('\n') != expected {
        bail!("malformed header: expected line {expected:?}, found {line:?}");
    }
    Ok(())
}

fn read_field<R: BufRead>(r: &mut R, key: &str) -> anyhow::Result<String> {
    let mut line = String::new();
    r.read_line(&mut line)?;
    let line = line.trim_end_matches('\n');
    match line.strip_prefix(key).and_then(|rest| rest.strip_prefix(": ")) {
        Some(value) => Ok(value.to_string()),
        None => bail!("malformed header line {line:?}, expected \"{key}: <value>\""),
    }
}

// ── Layout ─────────────────────────────────────────────────────────────────

/// Byte offsets of the archive regions, derived once from the header.
///
/// `lut_start < data_title_start < data_start`, strictly increasing and
/// non-overlapping; nothing is ever resized after creation.
#[derive(Debug, Clone, Copy)]
pub struct ArchiveLayout {
    xtextures: usize,
    ytextures: usize,
    /// End of the header text, start of the LUT.
    pub lut_start: u64,
    /// Start of the data-title sentinel line.
    pub data_title_start: u64,
    /// Start of the data region.
    pub data_start: u64,
    entry_count: usize,
}

impl ArchiveLayout {
    pub fn new(header: &ArchiveHeader) -> Self {
        let lut_start = header.render().len() as u64;
        let data_title_start = lut_start + header.ntextures() as u64 * LUT_ENTRY_SIZE;
        let data_start = data_title_start + DATA_TITLE.len() as u64;
        Self {
            xtextures: header.xtextures,
            ytextures: header.ytextures,
            lut_start,
            data_title_start,
            data_start,
            entry_count: header.ntextures(),
        }
    }

    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    /// Linear LUT slot for a grid coordinate: `ix + X*(iy + Y*iz)`.
    ///
    /// A bijection from valid coordinates onto `[0, X*Y*Z)`.
    pub fn slot_index(&self, ix: usize, iy: usize, iz: usize) -> usize {
        ix + self.xtextures * (iy + self.ytextures * iz)
    }

    /// Absolute byte offset of the LUT entry for a grid coordinate.
    pub fn lut_entry_offset(&self, ix: usize, iy: usize, iz: usize) -> u64 {
        self.lut_start + LUT_ENTRY_SIZE * self.slot_index(ix, iy, iz) as u64
    }
}
