//! Triangle mesh loading and mass properties.
//!
//! Supports STL (ASCII and binary) and Wavefront OBJ, detected from the file
//! extension. Only geometry is read: normals, texture coordinates and
//! materials are ignored.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use nalgebra::{Matrix3, Point3, Vector3};
use thiserror::Error;

/// STL binary header size in bytes.
const STL_HEADER_SIZE: usize = 80;

/// Size of one triangle record in binary STL.
const STL_TRIANGLE_SIZE: usize = 50;

/// Errors from mesh loading.
#[derive(Debug, Error)]
pub enum MeshError {
    /// File not found.
    #[error("file not found: {}", path.display())]
    FileNotFound {
        /// Path that was not found.
        path: PathBuf,
    },

    /// Unrecognized extension.
    #[error("unknown mesh format: .{extension}")]
    UnknownFormat {
        /// The unrecognized extension.
        extension: String,
    },

    /// Content could not be parsed.
    #[error("invalid mesh content: {0}")]
    InvalidContent(String),

    /// The file holds no triangles.
    #[error("mesh has no faces")]
    Empty,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Indexed triangle mesh.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TriangleMesh {
    /// Vertex positions.
    pub vertices: Vec<Point3<f64>>,
    /// Triangles as vertex indices.
    pub faces: Vec<[usize; 3]>,
}

/// Mass properties of a solid at unit density.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshProps {
    /// Enclosed volume.
    pub volume: f64,
    /// Centre of mass, in mesh coordinates.
    pub center_of_mass: Vector3<f64>,
    /// Inertia tensor about the centre of mass, unit density.
    pub inertia: Matrix3<f64>,
}

impl TriangleMesh {
    /// Uniformly scale all vertices.
    #[must_use]
    pub fn scaled(mut self, scale: f64) -> Self {
        for v in &mut self.vertices {
            v.coords *= scale;
        }
        self
    }

    /// Axis-aligned bounding box, `None` for an empty mesh.
    pub fn aabb(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = *self.vertices.first()?;
        Some(self.vertices.iter().fold((first, first), |(lo, hi), v| {
            (lo.inf(v), hi.sup(v))
        }))
    }

    /// Exact mass properties by signed tetrahedron decomposition
    /// (Mirtich 1996), at unit density.
    ///
    /// A mesh that encloses no volume falls back to its bounding box.
    #[allow(clippy::suspicious_operation_groupings)]
    pub fn mass_properties(&self) -> MeshProps {
        let mut volume = 0.0;
        let mut com_accum = Vector3::zeros();
        let (mut xx, mut yy, mut zz) = (0.0, 0.0, 0.0);
        let (mut xy, mut xz, mut yz) = (0.0, 0.0, 0.0);

        for face in &self.faces {
            let a = self.vertices[face[0]].coords;
            let b = self.vertices[face[1]].coords;
            let c = self.vertices[face[2]].coords;

            // Signed volume of the tetrahedron (origin, a, b, c) is det/6.
            let det = a.cross(&b).dot(&c);
            let vol = det / 6.0;
            volume += vol;
            com_accum += vol * (a + b + c) / 4.0;

            let f60 = det / 60.0;
            let f120 = det / 120.0;
            xx += f60 * (a.x * a.x + b.x * b.x + c.x * c.x + a.x * b.x + a.x * c.x + b.x * c.x);
            yy += f60 * (a.y * a.y + b.y * b.y + c.y * c.y + a.y * b.y + a.y * c.y + b.y * c.y);
            zz += f60 * (a.z * a.z + b.z * b.z + c.z * c.z + a.z * b.z + a.z * c.z + b.z * c.z);
            xy += f120 * product_sum(a.x, a.y, b.x, b.y, c.x, c.y);
            xz += f120 * product_sum(a.x, a.z, b.x, b.z, c.x, c.z);
            yz += f120 * product_sum(a.y, a.z, b.y, b.z, c.y, c.z);
        }

        if volume.abs() < 1e-12 {
            return self.bounding_box_props();
        }

        let com = com_accum / volume;
        let i_origin = Matrix3::new(
            yy + zz, -xy, -xz, //
            -xy, xx + zz, -yz, //
            -xz, -yz, xx + yy,
        );
        // Parallel axis shift from the origin to the centre of mass.
        let shift = volume * (Matrix3::identity() * com.dot(&com) - com * com.transpose());

        // Inward-facing winding gives a negative volume; flip it as a whole.
        let sign = volume.signum();
        MeshProps {
            volume: volume.abs(),
            center_of_mass: com,
            inertia: (i_origin - shift) * sign,
        }
    }

    fn bounding_box_props(&self) -> MeshProps {
        let Some((lo, hi)) = self.aabb() else {
            return MeshProps {
                volume: 0.0,
                center_of_mass: Vector3::zeros(),
                inertia: Matrix3::zeros(),
            };
        };
        let e = hi - lo;
        let volume = e.x * e.y * e.z;
        let c = volume / 12.0;
        MeshProps {
            volume,
            center_of_mass: nalgebra::center(&lo, &hi).coords,
            inertia: Matrix3::from_diagonal(&Vector3::new(
                c * (e.y * e.y + e.z * e.z),
                c * (e.x * e.x + e.z * e.z),
                c * (e.x * e.x + e.y * e.y),
            )),
        }
    }
}

/// `2·a0·a1 + 2·b0·b1 + 2·c0·c1 + a0·b1 + a1·b0 + a0·c1 + a1·c0 + b0·c1 + b1·c0`
fn product_sum(a0: f64, a1: f64, b0: f64, b1: f64, c0: f64, c1: f64) -> f64 {
    2.0 * a0 * a1
        + 2.0 * b0 * b1
        + 2.0 * c0 * c1
        + a0 * b1
        + a1 * b0
        + a0 * c1
        + a1 * c0
        + b0 * c1
        + b1 * c0
}

/// Load a mesh, choosing the format from the extension.
///
/// # Errors
///
/// Returns an error if the file is missing, unreadable, of an unknown
/// format, or contains no faces.
pub fn load_mesh(path: &Path) -> Result<TriangleMesh, MeshError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let mesh = match extension.as_str() {
        "stl" => load_stl(path)?,
        "obj" => load_obj(path)?,
        _ => return Err(MeshError::UnknownFormat { extension }),
    };
    if mesh.faces.is_empty() {
        return Err(MeshError::Empty);
    }
    Ok(mesh)
}

fn open(path: &Path) -> Result<File, MeshError> {
    File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            MeshError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            MeshError::Io(e)
        }
    })
}

/// Load an STL file, ASCII or binary.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid STL.
pub fn load_stl(path: &Path) -> Result<TriangleMesh, MeshError> {
    let mut bytes = Vec::new();
    open(path)?.read_to_end(&mut bytes)?;
    parse_stl(&bytes)
}

/// Parse STL content from memory.
///
/// # Errors
///
/// Returns an error if the content is not valid STL.
pub fn parse_stl(bytes: &[u8]) -> Result<TriangleMesh, MeshError> {
    if bytes.len() < 6 {
        return Err(MeshError::InvalidContent("too small to be STL".into()));
    }
    let header_len = bytes.len().min(STL_HEADER_SIZE);
    let looks_ascii = String::from_utf8_lossy(&bytes[..header_len])
        .trim_start()
        .starts_with("solid")
        && !bytes[..header_len].contains(&0);

    if looks_ascii {
        parse_stl_ascii(BufReader::new(bytes))
    } else {
        parse_stl_binary(bytes)
    }
}

fn parse_stl_binary(bytes: &[u8]) -> Result<TriangleMesh, MeshError> {
    if bytes.len() < STL_HEADER_SIZE + 4 {
        return Err(MeshError::InvalidContent(format!(
            "binary STL header needs {} bytes, got {}",
            STL_HEADER_SIZE + 4,
            bytes.len()
        )));
    }
    let count = u32::from_le_bytes([
        bytes[STL_HEADER_SIZE],
        bytes[STL_HEADER_SIZE + 1],
        bytes[STL_HEADER_SIZE + 2],
        bytes[STL_HEADER_SIZE + 3],
    ]) as usize;

    let body = &bytes[STL_HEADER_SIZE + 4..];
    if body.len() < count * STL_TRIANGLE_SIZE {
        return Err(MeshError::InvalidContent(format!(
            "binary STL declares {count} triangles but holds {}",
            body.len() / STL_TRIANGLE_SIZE
        )));
    }

    let mut mesh = TriangleMesh::default();
    for record in body.chunks_exact(STL_TRIANGLE_SIZE).take(count) {
        // Skip the 12-byte normal.
        let base = mesh.vertices.len();
        for i in 0..3 {
            let start = 12 + i * 12;
            mesh.vertices.push(read_stl_vertex(&record[start..start + 12]));
        }
        mesh.faces.push([base, base + 1, base + 2]);
    }
    Ok(mesh)
}

fn read_stl_vertex(buf: &[u8]) -> Point3<f64> {
    let read = |o: usize| {
        f64::from(f32::from_le_bytes([
            buf[o],
            buf[o + 1],
            buf[o + 2],
            buf[o + 3],
        ]))
    };
    Point3::new(read(0), read(4), read(8))
}

fn parse_stl_ascii<R: BufRead>(reader: R) -> Result<TriangleMesh, MeshError> {
    let mut mesh = TriangleMesh::default();
    let mut pending: Vec<Point3<f64>> = Vec::with_capacity(3);

    for line in reader.lines() {
        let line = line?;
        let mut parts = line.split_whitespace();
        match parts.next().map(str::to_ascii_lowercase).as_deref() {
            Some("outer") => pending.clear(),
            Some("vertex") => pending.push(parse_point(parts, &line)?),
            Some("endloop") => {
                if pending.len() != 3 {
                    return Err(MeshError::InvalidContent(format!(
                        "facet with {} vertices",
                        pending.len()
                    )));
                }
                let base = mesh.vertices.len();
                mesh.vertices.append(&mut pending);
                mesh.faces.push([base, base + 1, base + 2]);
            }
            _ => {}
        }
    }
    Ok(mesh)
}

/// Load a Wavefront OBJ file.
///
/// Polygons are fan-triangulated. Negative (relative) indices are supported.
///
/// # Errors
///
/// Returns an error if the file cannot be read or an index is out of range.
pub fn load_obj(path: &Path) -> Result<TriangleMesh, MeshError> {
    parse_obj(BufReader::new(open(path)?))
}

/// Parse OBJ content from a reader.
///
/// # Errors
///
/// Returns an error on malformed vertices or out-of-range face indices.
pub fn parse_obj<R: BufRead>(reader: R) -> Result<TriangleMesh, MeshError> {
    let mut mesh = TriangleMesh::default();

    for line in reader.lines() {
        let line = line?;
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("v") => mesh.vertices.push(parse_point(parts, &line)?),
            Some("f") => {
                let indices = parts
                    .map(|token| obj_index(token, mesh.vertices.len()))
                    .collect::<Result<Vec<_>, _>>()?;
                if indices.len() < 3 {
                    return Err(MeshError::InvalidContent(format!("degenerate face: {line}")));
                }
                for i in 1..indices.len() - 1 {
                    mesh.faces.push([indices[0], indices[i], indices[i + 1]]);
                }
            }
            _ => {}
        }
    }
    Ok(mesh)
}

/// Resolve one `v`, `v/vt` or `v/vt/vn` face token to a 0-based index.
fn obj_index(token: &str, vertex_count: usize) -> Result<usize, MeshError> {
    let raw = token.split('/').next().unwrap_or_default();
    let index: i64 = raw
        .parse()
        .map_err(|_| MeshError::InvalidContent(format!("bad face index '{token}'")))?;
    let count = i64::try_from(vertex_count)
        .map_err(|_| MeshError::InvalidContent("too many vertices".into()))?;
    let resolved = match index {
        i if i > 0 => i - 1,
        i if i < 0 => count + i,
        _ => -1,
    };
    usize::try_from(resolved)
        .ok()
        .filter(|&i| i < vertex_count)
        .ok_or_else(|| MeshError::InvalidContent(format!("face index {index} out of range")))
}

fn parse_point<'a>(
    mut parts: impl Iterator<Item = &'a str>,
    line: &str,
) -> Result<Point3<f64>, MeshError> {
    let mut coord = || -> Result<f64, MeshError> {
        parts
            .next()
            .and_then(|t| t.parse::<f64>().ok())
            .ok_or_else(|| MeshError::InvalidContent(format!("bad vertex: {line}")))
    };
    Ok(Point3::new(coord()?, coord()?, coord()?))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Cursor;
    use std::io::Write;

    /// Axis-aligned box `[0, x] × [0, y] × [0, z]` as OBJ text.
    pub(crate) fn box_obj(x: f64, y: f64, z: f64) -> String {
        format!(
            "v 0 0 0\nv {x} 0 0\nv {x} {y} 0\nv 0 {y} 0\n\
             v 0 0 {z}\nv {x} 0 {z}\nv {x} {y} {z}\nv 0 {y} {z}\n\
             f 1 4 3 2\nf 5 6 7 8\nf 1 2 6 5\nf 2 3 7 6\nf 3 4 8 7\nf 4 1 5 8\n"
        )
    }

    #[test]
    fn test_unit_cube_mass_properties() {
        let mesh = parse_obj(Cursor::new(box_obj(1.0, 1.0, 1.0))).unwrap();
        assert_eq!(mesh.vertices.len(), 8);
        assert_eq!(mesh.faces.len(), 12);

        let props = mesh.mass_properties();
        assert_relative_eq!(props.volume, 1.0, epsilon = 1e-12);
        assert_relative_eq!(props.center_of_mass, Vector3::new(0.5, 0.5, 0.5), epsilon = 1e-12);
        // Solid cube: I = m (a² + a²) / 12 = 1/6.
        assert_relative_eq!(props.inertia[(0, 0)], 1.0 / 6.0, epsilon = 1e-12);
        assert_relative_eq!(props.inertia[(1, 1)], 1.0 / 6.0, epsilon = 1e-12);
        assert_relative_eq!(props.inertia[(2, 2)], 1.0 / 6.0, epsilon = 1e-12);
        assert_relative_eq!(props.inertia[(0, 1)], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_box_inertia_and_scaling() {
        let mesh = parse_obj(Cursor::new(box_obj(2.0, 1.0, 0.5)))
            .unwrap()
            .scaled(0.5);
        let props = mesh.mass_properties();
        let (a, b, c) = (1.0, 0.5, 0.25);
        let v = a * b * c;
        assert_relative_eq!(props.volume, v, epsilon = 1e-12);
        assert_relative_eq!(props.inertia[(0, 0)], v * (b * b + c * c) / 12.0, epsilon = 1e-12);
        assert_relative_eq!(props.inertia[(1, 1)], v * (a * a + c * c) / 12.0, epsilon = 1e-12);
        assert_relative_eq!(props.inertia[(2, 2)], v * (a * a + b * b) / 12.0, epsilon = 1e-12);
    }

    #[test]
    fn test_inverted_winding_is_positive() {
        let obj = box_obj(1.0, 1.0, 1.0)
            .lines()
            .map(|l| {
                if let Some(rest) = l.strip_prefix("f ") {
                    let mut idx: Vec<&str> = rest.split_whitespace().collect();
                    idx.reverse();
                    format!("f {}", idx.join(" "))
                } else {
                    l.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("\n");
        let props = parse_obj(Cursor::new(obj)).unwrap().mass_properties();
        assert_relative_eq!(props.volume, 1.0, epsilon = 1e-12);
        assert_relative_eq!(props.inertia[(0, 0)], 1.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_flat_mesh_uses_bounding_box() {
        let obj = "v 0 0 0\nv 2 0 0\nv 2 1 0\nf 1 2 3\n";
        let props = parse_obj(Cursor::new(obj)).unwrap().mass_properties();
        assert_relative_eq!(props.volume, 0.0);
        assert_relative_eq!(props.center_of_mass, Vector3::new(1.0, 0.5, 0.0));
    }

    #[test]
    fn test_obj_slash_and_negative_indices() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1/1/1 2//2 -1\n";
        let mesh = parse_obj(Cursor::new(obj)).unwrap();
        assert_eq!(mesh.faces, vec![[0, 1, 2]]);
    }

    #[test]
    fn test_obj_out_of_range_index() {
        let obj = "v 0 0 0\nv 1 0 0\nf 1 2 3\n";
        assert!(matches!(
            parse_obj(Cursor::new(obj)),
            Err(MeshError::InvalidContent(_))
        ));
    }

    #[test]
    fn test_ascii_stl() {
        let stl = "solid t\n\
            facet normal 0 0 1\n outer loop\n\
            vertex 0 0 0\n vertex 1 0 0\n vertex 0 1 0\n\
            endloop\nendfacet\n\
            endsolid t\n";
        let mesh = parse_stl(stl.as_bytes()).unwrap();
        assert_eq!(mesh.faces.len(), 1);
        assert_eq!(mesh.vertices[1], Point3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_binary_stl() {
        let mut bytes = vec![0u8; STL_HEADER_SIZE];
        bytes.extend_from_slice(&1u32.to_le_bytes());
        for v in [[0.0f32; 3], [0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
            for c in v {
                bytes.extend_from_slice(&c.to_le_bytes());
            }
        }
        bytes.extend_from_slice(&0u16.to_le_bytes());

        let mesh = parse_stl(&bytes).unwrap();
        assert_eq!(mesh.faces.len(), 1);
        assert_eq!(mesh.vertices[2], Point3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_truncated_binary_stl() {
        let mut bytes = vec![0u8; STL_HEADER_SIZE];
        bytes.extend_from_slice(&5u32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 10]);
        assert!(parse_stl(&bytes).is_err());
    }

    #[test]
    fn test_load_mesh_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cube.OBJ");
        File::create(&path)
            .unwrap()
            .write_all(box_obj(1.0, 1.0, 1.0).as_bytes())
            .unwrap();
        assert_eq!(load_mesh(&path).unwrap().faces.len(), 12);

        let missing = dir.path().join("missing.stl");
        assert!(matches!(
            load_mesh(&missing),
            Err(MeshError::FileNotFound { .. })
        ));

        let unknown = dir.path().join("cube.ply");
        assert!(matches!(
            load_mesh(&unknown),
            Err(MeshError::UnknownFormat { .. })
        ));
    }
}
