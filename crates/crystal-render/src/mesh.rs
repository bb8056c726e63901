//! Procedural geometry for the crystal rods and the tunnel.

use glam::{Vec2, Vec3};

use crystal_core::scene::{TUNNEL_LENGTH, TUNNEL_RADIUS, TUNNEL_SLICES};

use crate::buffer::VertexPositionNormalUv;

/// Half-length of a crystal rod along its local Y axis.
pub const ROD_HALF_LENGTH: f32 = 4.0;
/// Radius of the rod's hexagonal body.
pub const ROD_RADIUS: f32 = 0.6;
/// Length of each pointed tip.
pub const ROD_TIP_LENGTH: f32 = 1.0;
const ROD_SIDES: u32 = 6;
const TUNNEL_STACKS: u32 = 10;

/// CPU-side indexed mesh.
#[derive(Clone, Debug, Default)]
pub struct MeshData {
    pub vertices: Vec<VertexPositionNormalUv>,
    pub indices: Vec<u32>,
}

impl MeshData {
    fn push_vertex(&mut self, position: Vec3, normal: Vec3, uv: Vec2) -> u32 {
        let index = self.vertices.len() as u32;
        self.vertices.push(VertexPositionNormalUv {
            position: position.into(),
            normal: normal.into(),
            uv: uv.into(),
        });
        index
    }

    /// Flat-shaded triangle. Degenerate triangles are dropped.
    fn push_flat_triangle(&mut self, corners: [(Vec3, Vec2); 3]) {
        let [(a, ua), (b, ub), (c, uc)] = corners;
        let normal = (b - a).cross(c - a);
        if normal.length_squared() < 1e-10 {
            return;
        }
        let normal = normal.normalize();
        let i0 = self.push_vertex(a, normal, ua);
        let i1 = self.push_vertex(b, normal, ub);
        let i2 = self.push_vertex(c, normal, uc);
        self.indices.extend_from_slice(&[i0, i1, i2]);
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Axis-aligned bounds as (min, max).
    pub fn bounds(&self) -> (Vec3, Vec3) {
        self.vertices.iter().fold(
            (Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)),
            |(lo, hi), v| {
                let p = Vec3::from(v.position);
                (lo.min(p), hi.max(p))
            },
        )
    }
}

/// Point on a ring around the Y axis. Increasing `angle` winds
/// counter-clockwise seen from outside, so `(a0,y0), (a0,y1), (a1,y0)`
/// faces outward.
fn ring_point(angle: f32, y: f32, radius: f32) -> Vec3 {
    Vec3::new(radius * angle.cos(), y, radius * angle.sin())
}

/// Hexagonal crystal with pointed tips, centred on the origin along Y.
pub fn crystal_rod() -> MeshData {
    let body = ROD_HALF_LENGTH - ROD_TIP_LENGTH;
    let rings = [
        (-ROD_HALF_LENGTH, 0.0),
        (-body, ROD_RADIUS),
        (body, ROD_RADIUS),
        (ROD_HALF_LENGTH, 0.0),
    ];

    let mut mesh = MeshData::default();
    for pair in rings.windows(2) {
        let (y0, r0) = pair[0];
        let (y1, r1) = pair[1];
        let v0 = (y0 + ROD_HALF_LENGTH) / (2.0 * ROD_HALF_LENGTH);
        let v1 = (y1 + ROD_HALF_LENGTH) / (2.0 * ROD_HALF_LENGTH);
        for side in 0..ROD_SIDES {
            let u0 = side as f32 / ROD_SIDES as f32;
            let u1 = (side + 1) as f32 / ROD_SIDES as f32;
            let a0 = u0 * std::f32::consts::TAU;
            let a1 = u1 * std::f32::consts::TAU;

            let p00 = (ring_point(a0, y0, r0), Vec2::new(u0, v0));
            let p01 = (ring_point(a0, y1, r1), Vec2::new(u0, v1));
            let p10 = (ring_point(a1, y0, r0), Vec2::new(u1, v0));
            let p11 = (ring_point(a1, y1, r1), Vec2::new(u1, v1));
            mesh.push_flat_triangle([p00, p01, p10]);
            mesh.push_flat_triangle([p10, p01, p11]);
        }
    }
    mesh
}

/// Open cylinder along +Y from the origin, smooth normals facing the axis.
///
/// Seen from inside: render it with front faces culled.
pub fn tunnel() -> MeshData {
    let mut mesh = MeshData::default();
    let columns = TUNNEL_SLICES + 1;

    for stack in 0..=TUNNEL_STACKS {
        let v = stack as f32 / TUNNEL_STACKS as f32;
        let y = v * TUNNEL_LENGTH;
        for slice in 0..columns {
            let u = slice as f32 / TUNNEL_SLICES as f32;
            let angle = u * std::f32::consts::TAU;
            let position = ring_point(angle, y, TUNNEL_RADIUS);
            let inward = -Vec3::new(angle.cos(), 0.0, angle.sin());
            mesh.push_vertex(position, inward, Vec2::new(u, v));
        }
    }

    for stack in 0..TUNNEL_STACKS {
        for slice in 0..TUNNEL_SLICES {
            let a0y0 = stack * columns + slice;
            let a1y0 = a0y0 + 1;
            let a0y1 = a0y0 + columns;
            let a1y1 = a0y1 + 1;
            mesh.indices
                .extend_from_slice(&[a0y0, a0y1, a1y0, a1y0, a0y1, a1y1]);
        }
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle(mesh: &MeshData, t: usize) -> [Vec3; 3] {
        let idx = &mesh.indices[t * 3..t * 3 + 3];
        [0, 1, 2].map(|k| Vec3::from(mesh.vertices[idx[k] as usize].position))
    }

    #[test]
    fn test_rod_bounds() {
        let (lo, hi) = crystal_rod().bounds();
        assert!((lo.y + ROD_HALF_LENGTH).abs() < 1e-5);
        assert!((hi.y - ROD_HALF_LENGTH).abs() < 1e-5);
        assert!(hi.x <= ROD_RADIUS + 1e-5 && lo.x >= -ROD_RADIUS - 1e-5);
    }

    #[test]
    fn test_rod_faces_point_outward() {
        let mesh = crystal_rod();
        // Each tip keeps one triangle per side, the body two.
        assert_eq!(mesh.triangle_count(), 6 + 12 + 6);
        for t in 0..mesh.triangle_count() {
            let [a, b, c] = triangle(&mesh, t);
            let normal = Vec3::from(mesh.vertices[mesh.indices[t * 3] as usize].normal);
            let centroid = (a + b + c) / 3.0;
            let radial = Vec3::new(centroid.x, 0.0, centroid.z);
            assert!(normal.dot(radial) > 0.0, "triangle {t} faces inward");
            assert!((normal.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_tunnel_shape() {
        let mesh = tunnel();
        assert_eq!(
            mesh.vertices.len() as u32,
            (TUNNEL_STACKS + 1) * (TUNNEL_SLICES + 1)
        );
        assert_eq!(mesh.triangle_count() as u32, TUNNEL_STACKS * TUNNEL_SLICES * 2);
        let (lo, hi) = mesh.bounds();
        assert!(lo.y.abs() < 1e-5);
        assert!((hi.y - TUNNEL_LENGTH).abs() < 1e-3);
        assert!((hi.x - TUNNEL_RADIUS).abs() < 1e-3);
    }

    #[test]
    fn test_tunnel_winding_faces_out_normals_face_in() {
        let mesh = tunnel();
        for t in 0..mesh.triangle_count() {
            let [a, b, c] = triangle(&mesh, t);
            let geometric = (b - a).cross(c - a);
            let centroid = (a + b + c) / 3.0;
            let radial = Vec3::new(centroid.x, 0.0, centroid.z);
            assert!(geometric.dot(radial) > 0.0);
            let normal = Vec3::from(mesh.vertices[mesh.indices[t * 3] as usize].normal);
            assert!(normal.dot(radial) < 0.0);
        }
    }
}
