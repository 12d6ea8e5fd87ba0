use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use eyre::{eyre, Result, WrapErr};
use flate2::read::GzDecoder;
use glam::{Vec2, Vec3};
use ply_rs::ply;
use smallvec::SmallVec;
use tracing::{debug, warn};

use super::scene_description::Mesh;

pub struct PlyFace {
    pub indices: SmallVec<[i64; 4]>,
}

impl PlyFace {
    fn push_all<T: Into<i64>>(&mut self, vec: Vec<T>) {
        self.indices.extend(vec.into_iter().map(Into::into));
    }
}

impl ply::PropertyAccess for PlyFace {
    fn new() -> Self {
        PlyFace {
            indices: SmallVec::new(),
        }
    }

    fn set_property(&mut self, key: String, property: ply::Property) {
        match (key.as_ref(), property) {
            ("vertex_indices" | "vertex_index", ply::Property::ListInt(vec)) => self.push_all(vec),
            ("vertex_indices" | "vertex_index", ply::Property::ListUInt(vec)) => {
                self.push_all(vec)
            }
            ("vertex_indices" | "vertex_index", ply::Property::ListShort(vec)) => {
                self.push_all(vec)
            }
            ("vertex_indices" | "vertex_index", ply::Property::ListUShort(vec)) => {
                self.push_all(vec)
            }
            ("vertex_indices" | "vertex_index", ply::Property::ListUChar(vec)) => {
                self.push_all(vec)
            }
            (k, _) => debug!("PLY face: ignoring property '{}'", k),
        }
    }
}

#[derive(Default)]
pub struct PlyVertex {
    pub pos: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
    pub has_normal: bool,
    pub has_uv: bool,
}

impl ply::PropertyAccess for PlyVertex {
    fn new() -> Self {
        Self::default()
    }

    fn set_property(&mut self, key: String, property: ply::Property) {
        let v = match property {
            ply::Property::Float(v) => v,
            ply::Property::Double(v) => v as f32,
            _ => {
                debug!("PLY vertex: ignoring non-float property '{}'", key);
                return;
            }
        };

        match key.as_ref() {
            "x" => self.pos.x = v,
            "y" => self.pos.y = v,
            "z" => self.pos.z = v,
            "nx" => {
                self.has_normal = true;
                self.normal.x = v
            }
            "ny" => {
                self.has_normal = true;
                self.normal.y = v
            }
            "nz" => {
                self.has_normal = true;
                self.normal.z = v
            }
            "u" | "s" | "texture_u" | "texture_s" => {
                self.has_uv = true;
                self.uv.x = v
            }
            "v" | "t" | "texture_v" | "texture_t" => {
                self.has_uv = true;
                self.uv.y = v
            }
            k => debug!("PLY vertex: ignoring property '{}'", k),
        }
    }
}

/// Reads a (possibly gzipped) PLY file into a mesh of triangles and quads.
///
/// Normals are left empty when the file doesn't provide them.
pub(super) fn load_plymesh(path: &Path) -> Result<Mesh> {
    let ply = read_file(path).wrap_err_with(|| format!("Couldn't read '{}'", path.display()))?;

    let header_parser = ply_rs::parser::Parser::<ply::DefaultElement>::new();
    let mut reader = ply.as_slice();
    let ply_header = header_parser.read_header(&mut reader)?;

    let vertex_parser = ply_rs::parser::Parser::<PlyVertex>::new();
    let face_parser = ply_rs::parser::Parser::<PlyFace>::new();

    let mut mesh = Mesh::default();

    for (_ignore_key, element) in &ply_header.elements {
        match element.name.as_ref() {
            "vertex" => {
                let vertices =
                    vertex_parser.read_payload_for_element(&mut reader, element, &ply_header)?;

                mesh.positions = vertices.iter().map(|v| v.pos).collect();
                if vertices.first().is_some_and(|v| v.has_normal) {
                    mesh.normals = vertices.iter().map(|v| v.normal).collect();
                }
                if vertices.first().is_some_and(|v| v.has_uv) {
                    mesh.uvs = vertices.iter().map(|v| v.uv).collect();
                }
            }
            "face" => {
                let faces =
                    face_parser.read_payload_for_element(&mut reader, element, &ply_header)?;

                for face in faces {
                    let indices = face
                        .indices
                        .iter()
                        .map(|&i| u32::try_from(i))
                        .collect::<Result<SmallVec<[u32; 4]>, _>>()
                        .map_err(|_| eyre!("PLY face has a negative index"))?;

                    match indices.as_slice() {
                        &[a, b, c] => mesh.triangles.push([a, b, c]),
                        &[a, b, c, d] => mesh.quads.push([a, b, c, d]),
                        other => warn!("Skipping PLY face with {} vertices", other.len()),
                    }
                }
            }
            e => {
                warn!("Skipping unknown PLY element '{}'", e);
                header_parser.read_payload_for_element(&mut reader, element, &ply_header)?;
            }
        }
    }

    let vertex_count = mesh.positions.len() as u32;
    let in_range = mesh
        .triangles
        .iter()
        .flatten()
        .chain(mesh.quads.iter().flatten())
        .all(|&i| i < vertex_count);

    if !in_range {
        return Err(eyre!("PLY face index is out of range"));
    }
    if mesh.triangles.is_empty() && mesh.quads.is_empty() {
        return Err(eyre!("PLY mesh has no faces"));
    }

    Ok(mesh)
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    let ply_file = File::open(path)?;
    let mut reader = BufReader::new(ply_file);
    let mut ply = Vec::new();

    if let Some(Some("gz")) = &path.extension().map(|ext| ext.to_str()) {
        let mut decoder = GzDecoder::new(reader);
        decoder.read_to_end(&mut ply)?;
    } else {
        reader.read_to_end(&mut ply)?;
    }

    Ok(ply)
}
