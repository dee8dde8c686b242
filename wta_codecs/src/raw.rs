use wta_core::adapter::CompressionAdapter;
use wta_core::texture::VoxelCube;

use crate::samples;

/// No-op encoder: stores the packed sample plane verbatim.
///
/// Useful for verifying the archive round-trip independently of any byte
/// compressor, and for measuring codec gain against an uncompressed
/// baseline. Thresholding and half-float storage still apply.
#[derive(Default)]
pub struct RawAdapter {
    buf: Vec<u8>,
}

impl CompressionAdapter for RawAdapter {
    fn wavelet_name(&self) -> &'static str {
        "identity"
    }

    fn encoder_name(&self) -> &'static str {
        "raw"
    }

    fn compress(
        &mut self,
        threshold: f32,
        halffloat: bool,
        cube: &VoxelCube,
    ) -> anyhow::Result<usize> {
        samples::encode(threshold, halffloat, cube, &mut self.buf);
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
        samples::decode(halffloat, &self.buf[..nbytes], cube)
    }
}
