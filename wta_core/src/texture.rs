use crate::format::{VOXELS, VOXEL_COUNT};
use crate::geometry::Geometry;

/// A `VOXELS³` cube of scalar samples, the atomic unit of storage.
///
/// Samples are stored x-fastest: `cube[(i, j, k)] = samples[i + V*(j + V*k)]`.
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelCube {
    samples: Box<[f32]>,
}

impl VoxelCube {
    pub fn new() -> Self {
        Self {
            samples: vec![0.0; VOXEL_COUNT].into_boxed_slice(),
        }
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize, k: usize) -> f32 {
        self.samples[i + VOXELS * (j + VOXELS * k)]
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, k: usize, value: f32) {
        self.samples[i + VOXELS * (j + VOXELS * k)] = value;
    }

    /// Set every sample to `value`.
    pub fn fill(&mut self, value: f32) {
        self.samples.fill(value);
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.samples
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    /// Arithmetic mean of all samples.
    pub fn mean(&self) -> f32 {
        self.samples.iter().sum::<f32>() / VOXEL_COUNT as f32
    }
}

impl Default for VoxelCube {
    fn default() -> Self {
        Self::new()
    }
}

/// One texture block: a voxel cube plus its spatial placement.
///
/// The compressed representation never lives here — it stays in the buffer
/// owned by the [`CompressionAdapter`](crate::adapter::CompressionAdapter)
/// of the archive handling the block.
#[derive(Debug, Clone, Default)]
pub struct TextureBlock {
    pub geometry: Geometry,
    pub cube: VoxelCube,
}

impl TextureBlock {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexing_is_x_fastest() {
        let mut cube = VoxelCube::new();
        cube.set(1, 0, 0, 1.0);
        cube.set(0, 1, 0, 2.0);
        cube.set(0, 0, 1, 3.0);

        assert_eq!(cube.as_slice()[1], 1.0);
        assert_eq!(cube.as_slice()[VOXELS], 2.0);
        assert_eq!(cube.as_slice()[VOXELS * VOXELS], 3.0);
    }

    #[test]
    fn fill_and_mean() {
        let mut cube = VoxelCube::new();
        cube.fill(2.5);
        assert_eq!(cube.mean(), 2.5);
    }
}
