use crate::format::{GEOMETRY_SIZE, VOXELS};

/// Spatial placement of one texture block, carried in its LUT entry.
///
/// Each axis holds the block's world-space position and extent plus the
/// valid texture-coordinate sub-range. The texcoord range excludes the
/// ghost (halo) voxels on both sides, so samplers never interpolate into
/// a neighbour's territory.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Geometry {
    pub pos: [f32; 3],
    pub size: [f32; 3],
    pub texcoord_start: [f32; 3],
    pub texcoord_end: [f32; 3],
}

impl Geometry {
    /// Configure one axis from the grid-point range `[gstart, gend)` of the
    /// source block, the one-sided ghost width, and the grid spacing.
    ///
    /// The texcoord range narrows by exactly `ghost` voxels on each side:
    /// `[ghost/V, (gend-gstart-ghost)/V]`.
    pub fn set_axis(&mut self, axis: usize, gstart: i32, gend: i32, ghost: i32, spacing: f64) {
        self.pos[axis] = (gstart as f64 * spacing) as f32;
        self.size[axis] = ((gend - gstart) as f64 * spacing) as f32;

        let voxel = 1.0 / VOXELS as f32;
        self.texcoord_start[axis] = ghost as f32 * voxel;
        self.texcoord_end[axis] = (gend - gstart - ghost) as f32 * voxel;
    }

    /// Serialize to exactly `GEOMETRY_SIZE` bytes: 12 × f32 LE, no padding.
    pub fn to_bytes(&self) -> [u8; GEOMETRY_SIZE as usize] {
        let mut buf = [0u8; GEOMETRY_SIZE as usize];
        let mut at = 0;
        for group in [&self.pos, &self.size, &self.texcoord_start, &self.texcoord_end] {
            for v in group {
                buf[at..at + 4].copy_from_slice(&v.to_le_bytes());
                at += 4;
            }
        }
        buf
    }

    /// Deserialize from `GEOMETRY_SIZE` bytes.
    pub fn from_bytes(buf: &[u8; GEOMETRY_SIZE as usize]) -> anyhow::Result<Self> {
        let mut fields = [0f32; 12];
        for (i, field) in fields.iter_mut().enumerate() {
            *field = f32::from_le_bytes(buf[i * 4..i * 4 + 4].try_into()?);
        }
        Ok(Self {
            pos: [fields[0], fields[1], fields[2]],
            size: [fields[3], fields[4], fields[5]],
            texcoord_start: [fields[6], fields[7], fields[8]],
            texcoord_end: [fields[9], fields[10], fields[11]],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_setup_scales_by_spacing() {
        let mut g = Geometry::default();
        g.set_axis(0, 16, 24, 1, 0.25);

        assert_eq!(g.pos[0], 4.0);
        assert_eq!(g.size[0], 2.0);
    }

    #[test]
    fn texcoord_range_narrows_by_ghost_on_both_sides() {
        let mut g = Geometry::default();
        let (gstart, gend, ghost) = (0, VOXELS as i32, 1);
        g.set_axis(2, gstart, gend, ghost, 1.0);

        let voxel = 1.0 / VOXELS as f32;
        assert_eq!(g.texcoord_start[2], voxel);
        assert_eq!(g.texcoord_end[2], 1.0 - voxel);
        // the span shrinks by one ghost margin per side
        let span = g.texcoord_end[2] - g.texcoord_start[2];
        assert_eq!(span, (gend - gstart - 2 * ghost) as f32 * voxel);
    }

    #[test]
    fn axes_are_independent() {
        let mut g = Geometry::default();
        g.set_axis(0, 0, 8, 1, 1.0);
        g.set_axis(1, 8, 16, 2, 0.5);

        assert_eq!(g.pos[0], 0.0);
        assert_eq!(g.pos[1], 4.0);
        assert_eq!(g.pos[2], 0.0); // untouched
        assert_eq!(g.texcoord_start[1], 2.0 / VOXELS as f32);
    }

    #[test]
    fn byte_roundtrip() {
        let mut g = Geometry::default();
        g.set_axis(0, 3, 11, 1, 0.125);
        g.set_axis(1, 0, 8, 1, 0.125);
        g.set_axis(2, 8, 16, 1, 0.125);

        let restored = Geometry::from_bytes(&g.to_bytes()).unwrap();
        assert_eq!(g, restored);
    }
}
