use glam::Vec3;

/// The fundamental geometry container for extruded solids.
///
/// All buffers are contiguous `Vec<f32>` / `Vec<u32>` so the combined model
/// can be handed to an exporter without copies.
#[derive(Debug, Clone, Default)]
pub struct TriangleMesh {
    /// Interleaved positions: [x, y, z, x, y, z, ...]
    pub positions: Vec<f32>,
    /// Interleaved normals: [nx, ny, nz, ...] or empty
    pub normals: Vec<f32>,
    /// Triangle indices into the vertex buffers
    pub indices: Vec<u32>,
}

impl TriangleMesh {
    /// Number of vertices (positions / 3).
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Number of triangles (indices / 3).
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Whether the mesh contains no geometry.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Raise or lower the whole solid along the vertical axis.
    pub fn translate_z(&mut self, dz: f64) {
        for pos in self.positions.chunks_exact_mut(3) {
            pos[2] = ((pos[2] as f64) + dz) as f32;
        }
    }

    /// Append another solid, rebasing its indices.
    pub fn append(&mut self, other: &TriangleMesh) {
        let base = self.vertex_count() as u32;
        self.positions.extend_from_slice(&other.positions);
        self.indices.extend(other.indices.iter().map(|i| i + base));
        // Normals are recomputed on the combined model, not carried over
        self.normals.clear();
    }

    /// Recompute smooth per-vertex normals from triangle windings.
    ///
    /// Face normals are accumulated area-weighted per vertex, so winding
    /// order determines which way the surface faces.
    pub fn recompute_normals(&mut self) {
        let mut accum = vec![Vec3::ZERO; self.vertex_count()];

        for tri in self.indices.chunks_exact(3) {
            let a = self.vertex(tri[0] as usize);
            let b = self.vertex(tri[1] as usize);
            let c = self.vertex(tri[2] as usize);
            // Cross product magnitude carries the area weighting
            let n = (b - a).cross(c - a);
            accum[tri[0] as usize] += n;
            accum[tri[1] as usize] += n;
            accum[tri[2] as usize] += n;
        }

        self.normals.clear();
        self.normals.reserve(accum.len() * 3);
        for n in accum {
            let n = n.normalize_or_zero();
            self.normals.extend_from_slice(&[n.x, n.y, n.z]);
        }
    }

    fn vertex(&self, i: usize) -> Vec3 {
        Vec3::new(
            self.positions[i * 3],
            self.positions[i * 3 + 1],
            self.positions[i * 3 + 2],
        )
    }

    /// Axis-aligned bounds as ([min_x, min_y, min_z], [max_x, max_y, max_z]).
    pub fn bounds(&self) -> ([f32; 3], [f32; 3]) {
        let mut min = [f32::INFINITY; 3];
        let mut max = [f32::NEG_INFINITY; 3];
        for pos in self.positions.chunks_exact(3) {
            for k in 0..3 {
                min[k] = min[k].min(pos[k]);
                max[k] = max[k].max(pos[k]);
            }
        }
        if min[0] == f32::INFINITY {
            return ([0.0; 3], [0.0; 3]);
        }
        (min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_triangle() -> TriangleMesh {
        TriangleMesh {
            positions: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            normals: vec![],
            indices: vec![0, 1, 2],
        }
    }

    #[test]
    fn empty_mesh() {
        let mesh = TriangleMesh::default();
        assert!(mesh.is_empty());
        assert_eq!(mesh.vertex_count(), 0);
        assert_eq!(mesh.triangle_count(), 0);
    }

    #[test]
    fn translate_z_moves_all_vertices() {
        let mut mesh = unit_triangle();
        mesh.translate_z(5.0);
        for pos in mesh.positions.chunks_exact(3) {
            assert!((pos[2] - 5.0).abs() < 1e-6);
        }
    }

    #[test]
    fn append_rebases_indices() {
        let mut a = unit_triangle();
        let b = unit_triangle();
        a.append(&b);
        assert_eq!(a.vertex_count(), 6);
        assert_eq!(a.triangle_count(), 2);
        assert_eq!(&a.indices[3..], &[3, 4, 5]);
    }

    #[test]
    fn recompute_normals_ccw_triangle_faces_up() {
        let mut mesh = unit_triangle();
        mesh.recompute_normals();
        assert_eq!(mesh.normals.len(), 9);
        for n in mesh.normals.chunks_exact(3) {
            assert!(n[0].abs() < 1e-6);
            assert!(n[1].abs() < 1e-6);
            assert!((n[2] - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn recompute_normals_cw_triangle_faces_down() {
        let mut mesh = unit_triangle();
        mesh.indices = vec![0, 2, 1];
        mesh.recompute_normals();
        for n in mesh.normals.chunks_exact(3) {
            assert!((n[2] + 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn bounds_of_two_triangles() {
        let mut a = unit_triangle();
        let mut b = unit_triangle();
        b.translate_z(3.0);
        a.append(&b);
        let (min, max) = a.bounds();
        assert_eq!(min, [0.0, 0.0, 0.0]);
        assert_eq!(max, [1.0, 1.0, 3.0]);
    }
}
