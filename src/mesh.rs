//! Triangle meshes: Wavefront OBJ import and the built-in primitives.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use bytemuck::{Pod, Zeroable};
use glam::Vec3;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex {
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
        }
    }
}

/// Indexed triangle list ready for upload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Unit cube centred on the origin with per-face normals.
    pub fn cube() -> Self {
        let faces = [
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
            (Vec3::X, Vec3::NEG_Z, Vec3::Y),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        ];
        let mut mesh = Self::default();
        for (normal, u, v) in faces {
            mesh.push_quad(normal * 0.5, u * 0.5, v * 0.5, normal);
        }
        mesh
    }

    /// Unit square in the XZ plane facing +Y.
    pub fn plane() -> Self {
        let mut mesh = Self::default();
        mesh.push_quad(Vec3::ZERO, Vec3::X * 0.5, Vec3::NEG_Z * 0.5, Vec3::Y);
        mesh
    }

    /// Counter-clockwise quad around `center` spanned by half-extents `u`, `v`.
    fn push_quad(&mut self, center: Vec3, u: Vec3, v: Vec3, normal: Vec3) {
        let base = self.vertices.len() as u32;
        for corner in [-u - v, u - v, u + v, -u + v] {
            self.vertices.push(Vertex::new(center + corner, normal));
        }
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read {}", path.display()))?;
        Self::from_obj_str(&contents).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Parses positions, normals and faces; texture coordinates are ignored.
    /// Polygons are fan-triangulated and missing normals are generated.
    pub fn from_obj_str(data: &str) -> Result<Self> {
        let mut positions = Vec::new();
        let mut normals = Vec::new();
        let mut triangles: Vec<[Corner; 3]> = Vec::new();

        for (line_no, line) in data.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.split_whitespace();
            match parts.next() {
                Some("v") => positions.push(
                    parse_vec3(parts).with_context(|| format!("bad vertex on line {}", line_no + 1))?,
                ),
                Some("vn") => normals.push(
                    parse_vec3(parts).with_context(|| format!("bad normal on line {}", line_no + 1))?,
                ),
                Some("f") => {
                    let polygon = parts
                        .map(parse_corner)
                        .collect::<Result<Vec<_>>>()
                        .with_context(|| format!("bad face on line {}", line_no + 1))?;
                    if polygon.len() < 3 {
                        bail!("face on line {} has fewer than 3 corners", line_no + 1);
                    }
                    for i in 1..polygon.len() - 1 {
                        triangles.push([polygon[0], polygon[i], polygon[i + 1]]);
                    }
                }
                _ => {}
            }
        }

        if positions.is_empty() {
            bail!("OBJ data does not define any vertices");
        }
        let mut mesh = weld(&positions, &normals, &triangles)?;
        mesh.fill_missing_normals();
        Ok(mesh)
    }

    /// Gives every vertex without a normal the area-weighted average of its
    /// adjacent face normals. Authored normals are left untouched.
    fn fill_missing_normals(&mut self) {
        if !self
            .vertices
            .iter()
            .any(|vertex| Vec3::from(vertex.normal) == Vec3::ZERO)
        {
            return;
        }
        let mut sums = vec![Vec3::ZERO; self.vertices.len()];
        for triangle in self.indices.chunks_exact(3) {
            let [a, b, c] = [triangle[0], triangle[1], triangle[2]].map(|i| i as usize);
            let p = |i: usize| Vec3::from(self.vertices[i].position);
            let face = (p(b) - p(a)).cross(p(c) - p(a));
            for i in [a, b, c] {
                sums[i] += face;
            }
        }
        for (vertex, sum) in self.vertices.iter_mut().zip(sums) {
            if Vec3::from(vertex.normal) == Vec3::ZERO {
                vertex.normal = sum.normalize_or_zero().to_array();
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Corner {
    position: i64,
    normal: Option<i64>,
}

fn parse_vec3<'a>(mut parts: impl Iterator<Item = &'a str>) -> Result<Vec3> {
    let mut next = || -> Result<f32> {
        let text = parts.next().ok_or_else(|| anyhow!("missing component"))?;
        Ok(text.parse::<f32>()?)
    };
    Ok(Vec3::new(next()?, next()?, next()?))
}

/// `v`, `v/vt`, `v//vn` or `v/vt/vn`.
fn parse_corner(token: &str) -> Result<Corner> {
    let mut fields = token.split('/');
    let position = fields
        .next()
        .filter(|text| !text.is_empty())
        .ok_or_else(|| anyhow!("missing vertex index in `{token}`"))?
        .parse::<i64>()?;
    let normal = match fields.nth(1) {
        Some(text) if !text.is_empty() => Some(text.parse::<i64>()?),
        _ => None,
    };
    Ok(Corner { position, normal })
}

/// Resolves a 1-based (or negative, relative) OBJ index.
fn resolve(index: i64, len: usize) -> Option<usize> {
    match index {
        i if i > 0 && (i as usize) <= len => Some(i as usize - 1),
        i if i < 0 && (i.unsigned_abs() as usize) <= len => Some(len - i.unsigned_abs() as usize),
        _ => None,
    }
}

fn weld(positions: &[Vec3], normals: &[Vec3], triangles: &[[Corner; 3]]) -> Result<MeshData> {
    let mut mesh = MeshData::default();
    let mut seen: HashMap<(usize, Option<usize>), u32> = HashMap::new();

    for corner in triangles.iter().flatten() {
        let position = resolve(corner.position, positions.len())
            .ok_or_else(|| anyhow!("vertex index {} out of range", corner.position))?;
        let normal = match corner.normal {
            Some(index) => Some(
                resolve(index, normals.len())
                    .ok_or_else(|| anyhow!("normal index {index} out of range"))?,
            ),
            None => None,
        };
        let next = mesh.vertices.len() as u32;
        let index = *seen.entry((position, normal)).or_insert_with(|| {
            let n = normal.map(|i| normals[i]).unwrap_or(Vec3::ZERO);
            mesh.vertices.push(Vertex::new(positions[position], n));
            next
        });
        mesh.indices.push(index);
    }
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_triangle() {
        let mesh = MeshData::from_obj_str("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(mesh.vertices.len(), 3);
        for vertex in &mesh.vertices {
            assert!((Vec3::from(vertex.normal) - Vec3::Z).length() < 1e-5);
        }
    }

    #[test]
    fn quads_are_fan_triangulated_and_welded() {
        let obj = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nvn 0 0 1\nf 1//1 2//1 3//1 4//1\n";
        let mesh = MeshData::from_obj_str(obj).unwrap();
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(mesh.vertices.len(), 4);
    }

    #[test]
    fn authored_normals_survive_next_to_generated_ones() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 0 0 1\nv 1 0 1\nv 0 1 1\nvn 1 0 0\n\
                   f 1//1 2//1 3//1\nf 4 5 6\n";
        let mesh = MeshData::from_obj_str(obj).unwrap();
        assert_eq!(mesh.vertices.len(), 6);
        for vertex in &mesh.vertices[..3] {
            assert_eq!(vertex.normal, [1.0, 0.0, 0.0]);
        }
        for vertex in &mesh.vertices[3..] {
            assert!(Vec3::from(vertex.normal).abs_diff_eq(Vec3::Z, 1e-5));
        }
    }

    #[test]
    fn negative_indices_count_from_the_end() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3/1 -2/2 -1/3\n";
        let mesh = MeshData::from_obj_str(obj).unwrap();
        assert_eq!(mesh.vertices[2].position, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn out_of_range_index_is_an_error() {
        assert!(MeshData::from_obj_str("v 0 0 0\nf 1 2 3\n").is_err());
        assert!(MeshData::from_obj_str("# nothing\n").is_err());
    }

    #[test]
    fn cube_normals_point_outward() {
        let cube = MeshData::cube();
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.indices.len(), 36);
        for triangle in cube.indices.chunks_exact(3) {
            let [a, b, c] = [triangle[0], triangle[1], triangle[2]]
                .map(|i| Vec3::from(cube.vertices[i as usize].position));
            let winding = (b - a).cross(c - a).normalize();
            let normal = Vec3::from(cube.vertices[triangle[0] as usize].normal);
            assert!((winding - normal).length() < 1e-5);
            assert!(normal.dot(a) > 0.0);
        }
    }

    #[test]
    fn plane_faces_up() {
        let plane = MeshData::plane();
        let [a, b, c] = [0, 1, 2].map(|i| Vec3::from(plane.vertices[i].position));
        assert!((b - a).cross(c - a).normalize().abs_diff_eq(Vec3::Y, 1e-6));
    }
}
