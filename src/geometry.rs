//! Model file loading.
//!
//! Models are read into [`RawGeometry`] parts on the CPU, then uploaded as
//! [`Mesh`]es. The format is picked from the file extension.
//!
//! # Supported Formats
//!
//! | Format | Extensions | Notes |
//! |--------|------------|-------|
//! | OBJ    | `.obj`     | Triangulated on load; diffuse texture from the MTL file |
//! | STL    | `.stl`     | Binary and ASCII, no UV coordinates |

use std::path::{Path, PathBuf};

use glam::Vec3;

use crate::error::AssetError;
use crate::gpu::GpuContext;
use crate::mesh::{Mesh, Vertex3d};

/// Raw geometry data before GPU upload.
#[derive(Clone, Debug, Default)]
pub struct RawGeometry {
    /// Vertex positions, normals, and UVs.
    pub vertices: Vec<Vertex3d>,
    /// Triangle indices.
    pub indices: Vec<u32>,
}

impl RawGeometry {
    pub fn new(vertices: Vec<Vertex3d>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Axis-aligned bounding box as `(min, max)`.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        self.vertices.iter().fold(
            (Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY)),
            |(min, max), v| {
                let p = Vec3::from(v.position);
                (min.min(p), max.max(p))
            },
        )
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Rebuild smooth vertex normals from the triangles.
    ///
    /// Face normals are accumulated unnormalized, so larger faces weigh more.
    pub fn recalculate_normals(&mut self) {
        let mut sums = vec![Vec3::ZERO; self.vertices.len()];

        for tri in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let p0 = Vec3::from(self.vertices[i0].position);
            let p1 = Vec3::from(self.vertices[i1].position);
            let p2 = Vec3::from(self.vertices[i2].position);
            let face_normal = (p1 - p0).cross(p2 - p0);
            for i in [i0, i1, i2] {
                sums[i] += face_normal;
            }
        }

        for (v, n) in self.vertices.iter_mut().zip(sums) {
            v.normal = n.normalize_or_zero().into();
        }
    }

    pub fn upload(&self, gpu: &GpuContext) -> Mesh {
        Mesh::new(gpu, &self.vertices, &self.indices)
    }
}

/// One mesh from a model file with the diffuse texture its material names.
#[derive(Clone, Debug, Default)]
pub struct ModelData {
    pub geometry: RawGeometry,
    /// Resolved against the model file's directory.
    pub diffuse_texture: Option<PathBuf>,
}

/// Load every part of a model file, picking the parser by extension.
pub fn load_model(path: &Path) -> Result<Vec<ModelData>, AssetError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "obj" => load_obj(path),
        "stl" => load_stl(path),
        _ => Err(AssetError::UnknownFormat(ext)),
    }
}

fn obj_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        single_index: true,
        triangulate: true,
        ignore_points: true,
        ignore_lines: true,
        ..Default::default()
    }
}

fn load_obj(path: &Path) -> Result<Vec<ModelData>, AssetError> {
    let (models, materials) =
        tobj::load_obj(path, &obj_options()).map_err(|source| AssetError::Obj {
            path: path.to_path_buf(),
            source,
        })?;

    let materials = materials.unwrap_or_else(|e| {
        log::warn!("No materials for {}: {e}", path.display());
        Vec::new()
    });
    let base_dir = path.parent().unwrap_or(Path::new("."));

    Ok(obj_parts(&models, &materials, base_dir))
}

/// Convert parsed OBJ meshes into upload-ready parts.
///
/// V is flipped since OBJ puts the texture origin at the bottom left.
pub(crate) fn obj_parts(
    models: &[tobj::Model],
    materials: &[tobj::Material],
    base_dir: &Path,
) -> Vec<ModelData> {
    models
        .iter()
        .filter(|model| !model.mesh.indices.is_empty())
        .map(|model| {
            let mesh = &model.mesh;
            let vertex_count = mesh.positions.len() / 3;
            let has_normals = mesh.normals.len() == mesh.positions.len();
            let has_uvs = mesh.texcoords.len() / 2 == vertex_count;

            let vertices = (0..vertex_count)
                .map(|i| {
                    let position = [
                        mesh.positions[3 * i],
                        mesh.positions[3 * i + 1],
                        mesh.positions[3 * i + 2],
                    ];
                    let normal = if has_normals {
                        [
                            mesh.normals[3 * i],
                            mesh.normals[3 * i + 1],
                            mesh.normals[3 * i + 2],
                        ]
                    } else {
                        [0.0; 3]
                    };
                    let uv = if has_uvs {
                        [mesh.texcoords[2 * i], 1.0 - mesh.texcoords[2 * i + 1]]
                    } else {
                        [0.0; 2]
                    };
                    Vertex3d::new(position, normal, uv)
                })
                .collect();

            let mut geometry = RawGeometry::new(vertices, mesh.indices.clone());
            if !has_normals {
                geometry.recalculate_normals();
            }

            let diffuse_texture = mesh
                .material_id
                .and_then(|id| materials.get(id))
                .and_then(|material| material.diffuse_texture.as_deref())
                .filter(|name| !name.is_empty())
                .map(|name| base_dir.join(name.replace('\\', "/")));

            ModelData {
                geometry,
                diffuse_texture,
            }
        })
        .collect()
}

fn load_stl(path: &Path) -> Result<Vec<ModelData>, AssetError> {
    let file = std::fs::File::open(path).map_err(|source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = std::io::BufReader::new(file);
    let geometry = parse_stl(&mut reader).map_err(|message| AssetError::Stl {
        path: path.to_path_buf(),
        message,
    })?;
    Ok(vec![ModelData {
        geometry,
        diffuse_texture: None,
    }])
}

fn parse_stl<R: std::io::Read + std::io::Seek>(reader: &mut R) -> Result<RawGeometry, String> {
    let stl = stl_io::read_stl(reader).map_err(|e| e.to_string())?;

    let mut vertices = Vec::with_capacity(stl.faces.len() * 3);
    let mut indices = Vec::with_capacity(stl.faces.len() * 3);

    // Flat shading: every face gets its own three vertices.
    for (i, face) in stl.faces.iter().enumerate() {
        let normal: [f32; 3] = face.normal.into();
        for &vertex_idx in &face.vertices {
            let position: [f32; 3] = stl.vertices[vertex_idx].into();
            vertices.push(Vertex3d::new(position, normal, [0.0, 0.0]));
        }
        let base = (i * 3) as u32;
        indices.extend_from_slice(&[base, base + 1, base + 2]);
    }

    Ok(RawGeometry::new(vertices, indices))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_obj(source: &str) -> Vec<ModelData> {
        let mut reader = std::io::BufReader::new(source.as_bytes());
        let (models, _) = tobj::load_obj_buf(&mut reader, &obj_options(), |_| {
            Err(tobj::LoadError::OpenFileFailed)
        })
        .unwrap();
        obj_parts(&models, &[], Path::new("assets/models"))
    }

    const QUAD: &str = "\
o quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
f 1/1 2/2 3/3 4/4
";

    #[test]
    fn obj_quads_are_triangulated() {
        let parts = parse_obj(QUAD);
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].geometry.triangle_count(), 2);
        assert!(parts[0].diffuse_texture.is_none());
    }

    #[test]
    fn obj_without_normals_gets_computed_normals() {
        let parts = parse_obj(QUAD);
        for v in &parts[0].geometry.vertices {
            assert_eq!(v.normal, [0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn obj_texture_v_is_flipped() {
        let parts = parse_obj(QUAD);
        let origin = parts[0]
            .geometry
            .vertices
            .iter()
            .find(|v| v.position == [0.0, 0.0, 0.0])
            .unwrap();
        assert_eq!(origin.uv, [0.0, 1.0]);
    }

    #[test]
    fn ascii_stl_is_flat_shaded() {
        let stl = "\
solid tri
facet normal 0 0 1
outer loop
vertex 0 0 0
vertex 1 0 0
vertex 0 1 0
endloop
endfacet
endsolid tri
";
        let mut cursor = std::io::Cursor::new(stl.as_bytes());
        let geometry = parse_stl(&mut cursor).unwrap();
        assert_eq!(geometry.vertices.len(), 3);
        assert_eq!(geometry.indices, vec![0, 1, 2]);
        assert!(geometry.vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = load_model(Path::new("tree.fbx")).unwrap_err();
        assert!(matches!(err, AssetError::UnknownFormat(ext) if ext == "fbx"));
    }

    #[test]
    fn bounds_cover_all_vertices() {
        let geometry = RawGeometry::new(
            vec![
                Vertex3d::new([-1.0, 2.0, 0.5], [0.0; 3], [0.0; 2]),
                Vertex3d::new([3.0, -4.0, 0.0], [0.0; 3], [0.0; 2]),
            ],
            vec![],
        );
        assert_eq!(
            geometry.bounds(),
            (Vec3::new(-1.0, -4.0, 0.0), Vec3::new(3.0, 2.0, 0.5))
        );
    }
}
