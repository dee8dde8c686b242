use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use wta_core::adapter::CompressionAdapter;
use wta_core::texture::VoxelCube;

use crate::samples;

/// Reference zlib adapter, matching the format's `Encoder: zlib` identifier.
///
/// The pipeline is dead-zone thresholding, optional half-float storage, then
/// a zlib stream over the packed sample plane. There is no transform stage
/// (`Wavelets: identity`); a real wavelet codec slots in behind the same
/// trait without touching the archive core. Exact at threshold 0 with full
/// floats; per-sample error is bounded by the threshold otherwise.
pub struct DeflateAdapter {
    /// zlib level (0-9).
    pub level: u32,
    /// Reusable payload buffer, valid until the next adapter call.
    buf: Vec<u8>,
    /// Scratch for the packed sample plane.
    plane: Vec<u8>,
}

impl DeflateAdapter {
    pub fn new(level: u32) -> Self {
        Self {
            level,
            buf: Vec::new(),
            plane: Vec::new(),
        }
    }
}

impl Default for DeflateAdapter {
    fn default() -> Self {
        Self::new(6)
    }
}

impl CompressionAdapter for DeflateAdapter {
    fn wavelet_name(&self) -> &'static str {
        "identity"
    }

    fn encoder_name(&self) -> &'static str {
        "zlib"
    }

    fn compress(
        &mut self,
        threshold: f32,
        halffloat: bool,
        cube: &VoxelCube,
    ) -> anyhow::Result<usize> {
        samples::encode(threshold, halffloat, cube, &mut self.plane);

        let mut enc = ZlibEncoder::new(Vec::new(), Compression::new(self.level));
        enc.write_all(&self.plane)?;
        self.buf = enc.finish()?;
        Ok(self.buf.len())
    }

    fn payload(&self) -> &[u8] {
        &self.buf
    }

    fn stage(&mut self, nbytes: usize) -> &mut [u8] {
        self.buf.clear();
        self.buf.resize(nbytes, 0);
        &mut self.buf
    }

    fn decompress(
        &mut self,
        halffloat: bool,
        nbytes: usize,
        cube: &mut VoxelCube,
    ) -> anyhow::Result<()> {
        self.plane.clear();
        ZlibDecoder::new(&self.buf[..nbytes]).read_to_end(&mut self.plane)?;
        samples::decode(halffloat, &self.plane, cube)
    }
}
