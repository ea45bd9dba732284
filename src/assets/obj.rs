//! Minimal Wavefront OBJ reader: positions and faces only
//!
//! Everything except `v` and `f` records is ignored. Malformed records are
//! skipped rather than failing the whole file.

use std::path::Path;

use log::debug;

use crate::{error::AssetError, gfx::geometry::GeometryData};

/// Faces with more corners than this keep only their first four
pub const MAX_FACE_VERTICES: usize = 4;

/// Parses OBJ text into positions and 0-based triangle indices
///
/// Quads are fan-triangulated into `(v0, v1, v2)` and `(v0, v2, v3)`, which is
/// only correct for convex quads.
pub fn parse_obj(source: &str) -> GeometryData {
    let mut data = GeometryData::new();
    let mut skipped = 0usize;

    for line in source.lines() {
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("v") => match parse_vertex(tokens) {
                Some(position) => data.vertices.push(position),
                None => skipped += 1,
            },
            Some("f") => match parse_face(tokens) {
                Some(face) => triangulate(&face, &mut data.indices),
                None => skipped += 1,
            },
            _ => {}
        }
    }

    if skipped > 0 {
        debug!("Skipped {} malformed OBJ records", skipped);
    }
    data
}

/// Reads and parses an OBJ file, returning its non-indexed vertex stream
///
/// A file that yields no complete triangle is an error.
pub fn load_obj_positions(path: &Path) -> Result<Vec<[f32; 3]>, AssetError> {
    let source = std::fs::read_to_string(path).map_err(|source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let positions = parse_obj(&source).expand();
    if positions.is_empty() {
        return Err(AssetError::NoGeometry(path.to_path_buf()));
    }
    Ok(positions)
}

fn parse_vertex<'a>(mut tokens: impl Iterator<Item = &'a str>) -> Option<[f32; 3]> {
    let mut next = || tokens.next()?.parse::<f32>().ok();
    Some([next()?, next()?, next()?])
}

/// Position indices of one face, converted to 0-based
///
/// Tokens may be `v`, `v/vt`, `v//vn` or `v/vt/vn`; only `v` is used. Tokens
/// without a leading index are skipped. Index 0 invalidates the face.
fn parse_face<'a>(tokens: impl Iterator<Item = &'a str>) -> Option<Vec<u32>> {
    let mut face = Vec::with_capacity(MAX_FACE_VERTICES);
    for token in tokens {
        if face.len() == MAX_FACE_VERTICES {
            break;
        }
        let Some(position) = token.split('/').next() else {
            continue;
        };
        let Ok(index) = position.parse::<u32>() else {
            continue;
        };
        face.push(index.checked_sub(1)?);
    }
    (face.len() >= 3).then_some(face)
}

fn triangulate(face: &[u32], indices: &mut Vec<u32>) {
    indices.extend_from_slice(&[face[0], face[1], face[2]]);
    if let [v0, _, v2, v3] = *face {
        indices.extend_from_slice(&[v0, v2, v3]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quad_fan_triangulation() {
        let data = parse_obj("v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n");

        assert_eq!(data.vertices.len(), 4);
        assert_eq!(data.indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn test_slash_forms_use_position_index() {
        let data = parse_obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1/4/7 2//8 3/6\n");
        assert_eq!(data.indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_malformed_vertex_is_skipped() {
        let data = parse_obj("v 0 0 0\nv 1 nope 0\nv 1 2\nv 3 4 5 1.0\n");
        assert_eq!(data.vertices, vec![[0.0, 0.0, 0.0], [3.0, 4.0, 5.0]]);
    }

    #[test]
    fn test_short_and_zero_index_faces_are_skipped() {
        let data = parse_obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2\nf 0 1 2\nf 1 x 2 3\n");
        // Only the last face survives, with the bad token dropped
        assert_eq!(data.indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_extra_face_vertices_are_ignored() {
        let data = parse_obj("f 1 2 3 4 5 6\n");
        assert_eq!(data.indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn test_other_records_ignored() {
        let source = "# comment\no thing\nvn 0 0 1\nvt 0 0\nv 0 0 0\nusemtl red\ns off\n";
        let data = parse_obj(source);
        assert_eq!(data.vertices.len(), 1);
        assert!(data.indices.is_empty());
    }

    #[test]
    fn test_expand_drops_faces_past_vertex_list() {
        let data = parse_obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\nf 1 2 9\n");
        assert_eq!(data.expand().len(), 3);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let path = std::env::temp_dir().join("ggine-definitely-missing.obj");
        assert!(matches!(
            load_obj_positions(&path),
            Err(AssetError::Io { .. })
        ));
    }
}
