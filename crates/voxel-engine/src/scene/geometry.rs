use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::error::SceneError;

/// Vertex shared by every OIT program.
///
/// `weight` scales the actor's alpha per vertex: voxel intensity for dense
/// volumes, `1.0` for meshes and the composite triangle.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub weight: f32,
}

impl Vertex {
    #[inline]
    pub const fn new(position: [f32; 3], weight: f32) -> Self {
        Self { position, weight }
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x3, // position
        1 => Float32    // weight
    ];

    pub(crate) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// CPU-side indexed triangle list.
///
/// Built off the render thread by loaders; uploaded by `Actor::init` on the
/// render thread.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
}

const CUBE_CORNERS: [[f32; 3]; 8] = [
    [0.0, 0.0, 0.0],
    [1.0, 0.0, 0.0],
    [1.0, 1.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, 0.0, 1.0],
    [1.0, 0.0, 1.0],
    [1.0, 1.0, 1.0],
    [0.0, 1.0, 1.0],
];

const CUBE_INDICES: [u32; 36] = [
    0, 2, 1, 0, 3, 2, // -z
    4, 5, 6, 4, 6, 7, // +z
    0, 1, 5, 0, 5, 4, // -y
    3, 6, 2, 3, 7, 6, // +y
    0, 4, 7, 0, 7, 3, // -x
    1, 2, 6, 1, 6, 5, // +x
];

impl Geometry {
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    #[inline]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    #[inline]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Checks that the index list forms whole triangles inside the vertex list.
    pub fn validate(&self) -> Result<(), String> {
        if self.indices.len() % 3 != 0 {
            return Err(format!("{} indices do not form whole triangles", self.indices.len()));
        }
        let count = self.vertices.len();
        if let Some(bad) = self.indices.iter().find(|&&i| i as usize >= count) {
            return Err(format!("index {bad} out of range for {count} vertices"));
        }
        if self.vertices.iter().any(|v| !v.position().is_finite() || !v.weight.is_finite()) {
            return Err("non-finite vertex".to_string());
        }
        Ok(())
    }

    /// Iterates triangles as vertex triples.
    pub fn triangles(&self) -> impl Iterator<Item = [Vertex; 3]> + '_ {
        self.indices.chunks_exact(3).filter_map(|tri| {
            Some([
                *self.vertices.get(tri[0] as usize)?,
                *self.vertices.get(tri[1] as usize)?,
                *self.vertices.get(tri[2] as usize)?,
            ])
        })
    }

    /// Appends `other`, rebasing its indices.
    ///
    /// Fails without modifying `self` when the merged vertex list would not
    /// be addressable by `u32` indices.
    pub fn append(&mut self, other: &Geometry) -> Result<(), SceneError> {
        let count = self.vertices.len().saturating_add(other.vertices.len());
        let base = u32::try_from(self.vertices.len())
            .ok()
            .filter(|_| u32::try_from(count).is_ok())
            .ok_or(SceneError::TooManyVertices { count })?;

        self.vertices.extend_from_slice(&other.vertices);
        self.indices.extend(other.indices.iter().map(|i| i.saturating_add(base)));
        Ok(())
    }

    /// Axis-aligned quad in the XY plane at `z`.
    pub fn quad(center: Vec3, half_extent: f32) -> Self {
        let (x, y, z, h) = (center.x, center.y, center.z, half_extent);
        Self::new(
            vec![
                Vertex::new([x - h, y - h, z], 1.0),
                Vertex::new([x + h, y - h, z], 1.0),
                Vertex::new([x + h, y + h, z], 1.0),
                Vertex::new([x - h, y + h, z], 1.0),
            ],
            vec![0, 1, 2, 0, 2, 3],
        )
    }

    /// Axis-aligned box spanning `min..max` with a uniform vertex weight.
    pub fn cuboid(min: Vec3, max: Vec3, weight: f32) -> Self {
        let size = max - min;
        let vertices = CUBE_CORNERS
            .iter()
            .map(|c| {
                let p = min + Vec3::from_array(*c) * size;
                Vertex::new(p.to_array(), weight)
            })
            .collect();
        Self::new(vertices, CUBE_INDICES.to_vec())
    }

    /// Dense volume as one cube per voxel above `threshold`, spanning the unit cube.
    ///
    /// `intensities` is x-fastest, then y, then z, and must hold exactly one
    /// value per voxel. Each cube's weight is the voxel intensity, so the
    /// write pass scales alpha by it.
    pub fn voxel_cubes(dims: [u32; 3], intensities: &[f32], threshold: f32) -> Result<Self, SceneError> {
        let [nx, ny, nz] = dims.map(|n| n as usize);
        let expected = nx
            .checked_mul(ny)
            .and_then(|n| n.checked_mul(nz))
            .ok_or(SceneError::VolumeTooLarge { dims })?;
        if intensities.len() != expected {
            return Err(SceneError::IntensityCount {
                dims,
                expected,
                actual: intensities.len(),
            });
        }

        let mut out = Self::default();
        if expected == 0 {
            return Ok(out);
        }
        let cell = Vec3::new(1.0 / nx as f32, 1.0 / ny as f32, 1.0 / nz as f32);

        for (i, &value) in intensities.iter().enumerate() {
            if !(value > threshold) {
                continue;
            }
            let (x, y, z) = (i % nx, (i / nx) % ny, i / (nx * ny));
            let min = Vec3::new(x as f32, y as f32, z as f32) * cell;
            out.append(&Self::cuboid(min, min + cell, value.clamp(0.0, 1.0)))?;
        }
        Ok(out)
    }

    /// Latitude/longitude sphere.
    pub fn uv_sphere(center: Vec3, radius: f32, segments: u32, rings: u32) -> Self {
        let segments = segments.max(3);
        let rings = rings.max(2);
        let mut vertices = Vec::with_capacity(((segments + 1) * (rings + 1)) as usize);
        for r in 0..=rings {
            let phi = std::f32::consts::PI * r as f32 / rings as f32;
            for s in 0..=segments {
                let theta = std::f32::consts::TAU * s as f32 / segments as f32;
                let dir = Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin());
                vertices.push(Vertex::new((center + dir * radius).to_array(), 1.0));
            }
        }

        let stride = segments + 1;
        let mut indices = Vec::with_capacity((segments * rings * 6) as usize);
        for r in 0..rings {
            for s in 0..segments {
                let a = r * stride + s;
                let b = a + stride;
                indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
            }
        }
        Self::new(vertices, indices)
    }

    /// Single clip-space triangle covering the whole viewport.
    pub fn fullscreen_triangle() -> Self {
        Self::new(
            vec![
                Vertex::new([-1.0, -1.0, 0.0], 1.0),
                Vertex::new([3.0, -1.0, 0.0], 1.0),
                Vertex::new([-1.0, 3.0, 0.0], 1.0),
            ],
            vec![0, 1, 2],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cuboid_is_valid_with_twelve_triangles() {
        let g = Geometry::cuboid(Vec3::ZERO, Vec3::ONE, 0.5);
        assert!(g.validate().is_ok());
        assert_eq!(g.triangle_count(), 12);
        assert!(g.vertices().iter().all(|v| v.weight == 0.5));
    }

    #[test]
    fn voxel_cubes_skips_voxels_at_or_below_threshold() {
        let g = Geometry::voxel_cubes([2, 1, 1], &[0.1, 0.8], 0.1).unwrap();
        assert_eq!(g.triangle_count(), 12);
        assert!(g.vertices().iter().all(|v| v.position[0] >= 0.5));
        assert!(g.validate().is_ok());
    }

    #[test]
    fn voxel_cubes_places_voxels_x_fastest() {
        let g = Geometry::voxel_cubes([2, 2, 2], &[0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0], 0.5).unwrap();
        assert_eq!(g.triangle_count(), 12);
        assert!(g.vertices().iter().all(|v| v.position.iter().all(|&c| c >= 0.5)));
    }

    #[test]
    fn voxel_cubes_rejects_mismatched_intensity_count() {
        assert_eq!(
            Geometry::voxel_cubes([2, 2, 1], &[1.0], 0.0),
            Err(SceneError::IntensityCount {
                dims: [2, 2, 1],
                expected: 4,
                actual: 1
            })
        );
        assert!(Geometry::voxel_cubes([2, 2, 1], &[1.0; 5], 0.0).is_err());
    }

    #[test]
    fn voxel_cubes_rejects_unaddressable_volume() {
        assert_eq!(
            Geometry::voxel_cubes([u32::MAX; 3], &[], 0.0),
            Err(SceneError::VolumeTooLarge { dims: [u32::MAX; 3] })
        );
    }

    #[test]
    fn empty_volume_yields_empty_geometry() {
        let g = Geometry::voxel_cubes([0, 4, 4], &[], 0.0).unwrap();
        assert!(g.is_empty());
    }

    #[test]
    fn append_rebases_indices() {
        let mut g = Geometry::quad(Vec3::ZERO, 1.0);
        g.append(&Geometry::quad(Vec3::Z, 1.0)).unwrap();
        assert_eq!(g.indices()[6..], [4, 5, 6, 4, 6, 7]);
        assert!(g.validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range_index() {
        let g = Geometry::new(vec![Vertex::new([0.0; 3], 1.0)], vec![0, 0, 1]);
        assert!(g.validate().is_err());
    }

    #[test]
    fn validate_rejects_partial_triangle() {
        let g = Geometry::new(vec![Vertex::new([0.0; 3], 1.0)], vec![0, 0]);
        assert!(g.validate().is_err());
    }

    #[test]
    fn sphere_indices_in_range() {
        let g = Geometry::uv_sphere(Vec3::ZERO, 1.0, 8, 4);
        assert!(g.validate().is_ok());
        assert_eq!(g.triangle_count(), 8 * 4 * 2);
    }
}
