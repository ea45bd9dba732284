//! # Primitive Shape Generation
//!
//! Procedural shapes available from the editor without an asset file.

use super::GeometryData;

/// Generate a unit cube centered at the origin
///
/// Returns 24 face corners (4 per face) and 36 indices, extending from -0.5
/// to 0.5 on all axes. Every triangle winds clockwise when seen from outside
/// the cube in the engine's left-handed frame, so winding alone identifies
/// the outward side; no normals are stored.
pub fn generate_cube() -> GeometryData {
    let mut data = GeometryData::new();

    #[rustfmt::skip]
    let positions = [
        // Front face (+Z)
        [-0.5, -0.5,  0.5], [ 0.5, -0.5,  0.5], [ 0.5,  0.5,  0.5], [-0.5,  0.5,  0.5],
        // Back face (-Z)
        [-0.5, -0.5, -0.5], [-0.5,  0.5, -0.5], [ 0.5,  0.5, -0.5], [ 0.5, -0.5, -0.5],
        // Left face (-X)
        [-0.5, -0.5, -0.5], [-0.5, -0.5,  0.5], [-0.5,  0.5,  0.5], [-0.5,  0.5, -0.5],
        // Right face (+X)
        [ 0.5, -0.5,  0.5], [ 0.5, -0.5, -0.5], [ 0.5,  0.5, -0.5], [ 0.5,  0.5,  0.5],
        // Top face (+Y)
        [-0.5,  0.5,  0.5], [ 0.5,  0.5,  0.5], [ 0.5,  0.5, -0.5], [-0.5,  0.5, -0.5],
        // Bottom face (-Y)
        [-0.5, -0.5, -0.5], [ 0.5, -0.5, -0.5], [ 0.5, -0.5,  0.5], [-0.5, -0.5,  0.5],
    ];

    data.vertices = positions.to_vec();

    // Two triangles per face, same corner order on every face
    data.indices = (0..6u32)
        .flat_map(|face| {
            let base = face * 4;
            [base, base + 1, base + 2, base + 2, base + 3, base]
        })
        .collect();

    data
}

/// Non-indexed cube vertex stream, ready for upload
pub fn cube_vertices() -> Vec<[f32; 3]> {
    generate_cube().expand()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
        [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
    }

    fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
        [
            a[1] * b[2] - a[2] * b[1],
            a[2] * b[0] - a[0] * b[2],
            a[0] * b[1] - a[1] * b[0],
        ]
    }

    #[test]
    fn test_cube_generation() {
        let cube = generate_cube();
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.indices.len(), 36);
        assert_eq!(cube.triangle_count(), 12);
    }

    #[test]
    fn test_cube_stream_is_36_vertices() {
        assert_eq!(cube_vertices().len(), 36);
    }

    #[test]
    fn test_cube_winding_faces_outward() {
        let stream = cube_vertices();
        for tri in stream.chunks_exact(3) {
            let n = cross(sub(tri[1], tri[0]), sub(tri[2], tri[0]));
            let centroid = [
                (tri[0][0] + tri[1][0] + tri[2][0]) / 3.0,
                (tri[0][1] + tri[1][1] + tri[2][1]) / 3.0,
                (tri[0][2] + tri[1][2] + tri[2][2]) / 3.0,
            ];
            let facing = n[0] * centroid[0] + n[1] * centroid[1] + n[2] * centroid[2];
            assert!(facing > 0.0, "triangle {:?} winds inward", tri);
        }
    }
}
