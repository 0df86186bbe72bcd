//! Quads emitted by the greedy mesher and their expansion into vertices.

use crate::engine_state::{
    rendering::vertex::Vertex,
    voxels::material::{atlas_origin, MaterialId},
};

/// Which side of a slice plane the solid voxel sits on.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FaceDirection {
    /// Solid below the plane; the face looks toward +axis.
    Positive,
    /// Solid above the plane; the face looks toward -axis.
    Negative,
}

/// A merged rectangle of identical exposed faces lying on one slice plane.
///
/// `u` is axis `(axis + 1) % 3` and `v` is axis `(axis + 2) % 3`. All
/// coordinates are in cells of the (possibly downsampled) grid that was meshed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Quad {
    /// Axis the face is perpendicular to (0 = x, 1 = y, 2 = z)
    pub axis: usize,
    /// Facing
    pub direction: FaceDirection,
    /// Position of the slice plane along `axis`
    pub slice: usize,
    /// Start along `u`
    pub u0: usize,
    /// Start along `v`
    pub v0: usize,
    /// Extent along `u`
    pub width: usize,
    /// Extent along `v`
    pub height: usize,
    /// Material of the solid voxel behind the face
    pub material: MaterialId,
}

impl Quad {
    /// `(u, v)` axes for this quad.
    pub fn tangent_axes(&self) -> (usize, usize) {
        ((self.axis + 1) % 3, (self.axis + 2) % 3)
    }

    /// Number of unit faces merged into this quad.
    pub fn face_count(&self) -> usize {
        self.width * self.height
    }

    /// Corner positions scaled by `scale`, in counter-clockwise order seen from +axis.
    pub fn corners(&self, scale: f32) -> [[f32; 3]; 4] {
        let (u, v) = self.tangent_axes();
        let mut origin = [0.0f32; 3];
        origin[self.axis] = self.slice as f32 * scale;
        origin[u] = self.u0 as f32 * scale;
        origin[v] = self.v0 as f32 * scale;

        let mut du = [0.0f32; 3];
        du[u] = self.width as f32 * scale;
        let mut dv = [0.0f32; 3];
        dv[v] = self.height as f32 * scale;

        let add = |a: [f32; 3], b: [f32; 3]| [a[0] + b[0], a[1] + b[1], a[2] + b[2]];
        [origin, add(origin, du), add(add(origin, du), dv), add(origin, dv)]
    }

    /// Appends four vertices and six indices for this quad.
    ///
    /// Positive faces wind `0,1,2 / 0,2,3`; negative faces use the reverse so the
    /// front side always faces away from the solid voxel.
    pub fn emit(&self, scale: f32, vertices: &mut Vec<Vertex>, indices: &mut Vec<u32>) {
        let base = vertices.len() as u32;
        let width = self.width as f32 * scale;
        let height = self.height as f32 * scale;
        let uvs = [[0.0, 0.0], [width, 0.0], [width, height], [0.0, height]];
        let atlas = atlas_origin(self.material);

        for (corner, uv) in self.corners(scale).into_iter().zip(uvs) {
            vertices.push(Vertex::new(corner, uv, atlas));
        }

        let order: [u32; 6] = match self.direction {
            FaceDirection::Positive => [0, 1, 2, 0, 2, 3],
            FaceDirection::Negative => [0, 2, 1, 0, 3, 2],
        };
        indices.extend(order.iter().map(|i| base + i));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(axis: usize, direction: FaceDirection) -> Quad {
        Quad {
            axis,
            direction,
            slice: 1,
            u0: 0,
            v0: 0,
            width: 2,
            height: 3,
            material: 3,
        }
    }

    #[test]
    fn corners_span_width_along_u_and_height_along_v() {
        // axis y: u = z, v = x
        let corners = unit(1, FaceDirection::Positive).corners(2.0);
        assert_eq!(corners[0], [0.0, 2.0, 0.0]);
        assert_eq!(corners[1], [0.0, 2.0, 4.0]);
        assert_eq!(corners[2], [6.0, 2.0, 4.0]);
        assert_eq!(corners[3], [6.0, 2.0, 0.0]);
    }

    #[test]
    fn winding_flips_with_direction() {
        let mut vertices = Vec::new();
        let mut indices = Vec::new();
        unit(0, FaceDirection::Positive).emit(1.0, &mut vertices, &mut indices);
        unit(0, FaceDirection::Negative).emit(1.0, &mut vertices, &mut indices);
        assert_eq!(indices, vec![0, 1, 2, 0, 2, 3, 4, 6, 5, 4, 7, 6]);
        assert_eq!(vertices[2].uv, [2.0, 3.0]);
        assert_eq!(vertices[0].atlas_origin, [3.0 / 16.0, 0.0]);
    }

    #[test]
    fn positive_winding_faces_plus_axis() {
        for axis in 0..3 {
            let [a, b, c, _] = unit(axis, FaceDirection::Positive).corners(1.0);
            let e1 = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
            let e2 = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
            let normal = [
                e1[1] * e2[2] - e1[2] * e2[1],
                e1[2] * e2[0] - e1[0] * e2[2],
                e1[0] * e2[1] - e1[1] * e2[0],
            ];
            assert!(normal[axis] > 0.0);
        }
    }
}
