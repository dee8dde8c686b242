//! Sample-plane serialization shared by the bundled adapters.
//!
//! Applies the dead-zone threshold (samples with magnitude below the
//! threshold become exact zeros, bounding per-sample error by the threshold)
//! and packs the cube little-endian: 4 bytes per sample, or 2 with the
//! half-float storage mode.

use anyhow::ensure;
use half::f16;

use wta_core::texture::VoxelCube;
use wta_core::VOXEL_COUNT;

pub(crate) fn sample_width(halffloat: bool) -> usize {
    if halffloat {
        2
    } else {
        4
    }
}

/// Threshold and pack the cube into `out` (cleared first).
pub(crate) fn encode(threshold: f32, halffloat: bool, cube: &VoxelCube, out: &mut Vec<u8>) {
    out.clear();
    out.reserve(VOXEL_COUNT * sample_width(halffloat));
    for &v in cube.as_slice() {
        let v = if threshold > 0.0 && v.abs() < threshold {
            0.0
        } else {
            v
        };
        if halffloat {
            out.extend_from_slice(&f16::from_f32(v).to_bits().to_le_bytes());
        } else {
            out.extend_from_slice(&v.to_le_bytes());
        }
    }
}

/// Unpack a sample plane produced by [`encode`] back into `cube`.
pub(crate) fn decode(halffloat: bool, bytes: &[u8], cube: &mut VoxelCube) -> anyhow::Result<()> {
    let width = sample_width(halffloat);
    ensure!(
        bytes.len() == VOXEL_COUNT * width,
        "sample plane is {} bytes, expected {} ({} samples × {} bytes)",
        bytes.len(),
        VOXEL_COUNT * width,
        VOXEL_COUNT,
        width
    );
    for (chunk, sample) in bytes.chunks_exact(width).zip(cube.as_mut_slice()) {
        *sample = if halffloat {
            f16::from_bits(u16::from_le_bytes([chunk[0], chunk[1]])).to_f32()
        } else {
            f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])
        };
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_zeroes_small_samples_only() {
        let mut cube = VoxelCube::new();
        cube.set(0, 0, 0, 0.004);
        cube.set(1, 0, 0, -0.004);
        cube.set(2, 0, 0, 0.5);

        let mut bytes = Vec::new();
        encode(0.01, false, &cube, &mut bytes);

        let mut restored = VoxelCube::new();
        decode(false, &bytes, &mut restored).unwrap();
        assert_eq!(restored.get(0, 0, 0), 0.0);
        assert_eq!(restored.get(1, 0, 0), 0.0);
        assert_eq!(restored.get(2, 0, 0), 0.5);
    }

    #[test]
    fn halffloat_plane_is_two_bytes_per_sample() {
        let cube = VoxelCube::new();
        let mut bytes = Vec::new();
        encode(0.0, true, &cube, &mut bytes);
        assert_eq!(bytes.len(), VOXEL_COUNT * 2);
    }
}
