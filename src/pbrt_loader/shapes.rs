use eyre::{Result, WrapErr};
use tracing::{debug, warn};

use super::{
    lexer::Lexeme,
    params::{parse_param_list, ParamList},
    ply_mesh,
    scene_description::{Mesh, Shape, ShapeGroup},
    Counter, DeclaredObject, ParseError, SceneLoader,
};
use crate::geometry::{self, mesh_factory};

impl SceneLoader {
    pub(super) fn parse_shape(&mut self) -> Result<()> {
        let class = self.expect_string("shape type")?;
        let directory = self.current_directory();
        let params = parse_param_list(&mut self.src)?;

        let mut mesh = match class.as_str() {
            "trianglemesh" => parse_trianglemesh(&params)?,
            "plymesh" => {
                let file = params
                    .get("filename")
                    .ok_or(ParseError::MissingParam {
                        directive: "Shape \"plymesh\"",
                        param: "filename",
                    })?
                    .first_string()?;
                let path = directory.join(file);
                ply_mesh::load_plymesh(&path)
                    .wrap_err_with(|| format!("Couldn't load PLY mesh '{}'", path.display()))?
            }
            "sphere" => {
                let radius = match params.get("radius") {
                    Some(p) => p.first_float()?,
                    None => 1.,
                };
                mesh_factory::make_sphere(radius)
            }
            "cube" => mesh_factory::make_cube(),
            "disk" => {
                warn!("Disk shapes are approximated by a fixed quad");
                mesh_factory::make_disk_placeholder()
            }
            c => {
                warn!("Ignoring unsupported shape '{}'", c);
                return Ok(());
            }
        };

        if !mesh.triangles.is_empty()
            && (mesh.normals.is_empty() || self.options.always_recompute_normals)
        {
            mesh.normals = geometry::compute_normals(&mesh.triangles, &mesh.positions);
        }

        self.add_shape(mesh);
        Ok(())
    }

    /// Binds the current material and emits the shape, or captures it inside an object block.
    fn add_shape(&mut self, mut mesh: Mesh) {
        for uv in &mut mesh.uvs {
            uv.x *= self.gstate.uscale;
            uv.y *= self.gstate.vscale;
        }

        let name = self.counters.next_name(Counter::Shape);
        let material = self.bind_material();
        let group = ShapeGroup {
            name: self.counters.next_name(Counter::ShapeGroup),
            shapes: vec![Shape {
                name,
                material,
                mesh,
            }],
        };

        match &mut self.object_shapes {
            Some(captured) => captured.push(group),
            None => {
                let id = self.scene.add_shape_group(group);
                self.add_instance(id, self.gstate.ctm);
            }
        }
    }

    pub(super) fn parse_object_block(&mut self) -> Result<()> {
        let name = self.expect_string("object name")?;
        if self.object_shapes.is_some() {
            return Err(ParseError::NestedObject(name).into());
        }

        debug!("Capturing object '{}'", name);
        self.attribute_begin();
        self.object_shapes = Some(Vec::new());

        loop {
            let at_end = match self.src.peek()? {
                Lexeme::Eof => return Err(ParseError::UnexpectedEof.into()),
                Lexeme::Ident(dir) => dir == "ObjectEnd",
                _ => false,
            };

            if at_end {
                self.src.next()?;
                break;
            }

            self.parse_world_directive()?;
        }

        let groups = self.object_shapes.take().unwrap_or_default();
        if self.objects.contains_key(&name) {
            warn!("Object '{}' redefined", name);
        }
        self.objects.insert(
            name,
            DeclaredObject {
                groups,
                scene_ids: None,
                ctm: self.gstate.ctm,
            },
        );

        self.attribute_end()
    }

    pub(super) fn parse_object_instance(&mut self) -> Result<()> {
        let name = self.expect_string("object name")?;
        let scene = &mut self.scene;

        let object = self
            .objects
            .get_mut(&name)
            .ok_or_else(|| ParseError::UnknownName {
                kind: "object",
                name: name.clone(),
            })?;

        let frame = self.gstate.ctm * object.ctm;
        let ids = match &object.scene_ids {
            Some(ids) => ids.clone(),
            None => {
                let ids: Vec<_> = object
                    .groups
                    .drain(..)
                    .map(|g| scene.add_shape_group(g))
                    .collect();
                object.scene_ids = Some(ids.clone());
                ids
            }
        };

        for id in ids {
            self.add_instance(id, frame);
        }

        Ok(())
    }
}

fn parse_trianglemesh(params: &ParamList) -> Result<Mesh> {
    let (Some(positions), Some(indices)) = (params.get("P"), params.get("indices")) else {
        return Err(ParseError::InvalidDirective {
            directive: "Shape",
            reason: "trianglemesh needs both 'P' and 'indices'".to_string(),
        }
        .into());
    };

    let positions = positions.vec3s()?.to_vec();
    let triangles = geometry::triangles_from_indices(indices.ints()?, positions.len()).map_err(
        |reason| ParseError::BadParamValue {
            name: "indices".to_string(),
            reason,
        },
    )?;

    let normals = match params.get("N") {
        Some(p) => {
            let normals = p.vec3s()?.to_vec();
            if normals.len() != positions.len() {
                return Err(ParseError::BadParamValue {
                    name: "N".to_string(),
                    reason: format!(
                        "{} normals for {} positions",
                        normals.len(),
                        positions.len()
                    ),
                }
                .into());
            }
            normals
        }
        None => Vec::new(),
    };

    let uvs = match params.get("uv").or_else(|| params.get("st")) {
        Some(p) => p.uvs()?,
        None => Vec::new(),
    };

    Ok(Mesh {
        positions,
        normals,
        uvs,
        triangles,
        ..Default::default()
    })
}
