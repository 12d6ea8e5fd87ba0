use eyre::{Result, WrapErr};
use glam::{Mat4, Vec3};
use tracing::warn;

use super::{
    params::{parse_param_list, ParamList},
    scene_description::{Environment, Material, Mesh, Shape, ShapeGroup, Texture},
    AreaLight, Counter, SceneLoader,
};
use crate::texture;

impl SceneLoader {
    pub(super) fn parse_light_source(&mut self) -> Result<()> {
        let typ = self.expect_string("light source type")?;
        let directory = self.current_directory();
        let params = parse_param_list(&mut self.src)?;

        match typ.as_str() {
            "infinite" => self.add_environment(&params, &directory),
            "distant" => {
                warn!("Distant lights are approximated by an infinite light");
                self.add_environment(&params, &directory)
            }
            "point" => self.add_point_light(&params),
            t => {
                warn!("Ignoring unsupported light source '{}'", t);
                Ok(())
            }
        }
    }

    pub(super) fn parse_area_light_source(&mut self) -> Result<()> {
        let typ = self.expect_string("area light type")?;
        if typ != "diffuse" {
            warn!("Area light '{}' is treated as 'diffuse'", typ);
        }

        let params = parse_param_list(&mut self.src)?;
        let l = color_param(&params, "L")?;
        let scale = color_param(&params, "scale")?;
        let two_sided = match params.get("twosided") {
            Some(p) => p.first_bool()?,
            None => false,
        };

        self.gstate.area_light = Some(AreaLight {
            radiance: l * scale,
            two_sided,
        });

        Ok(())
    }

    fn add_environment(&mut self, params: &ParamList, directory: &std::path::Path) -> Result<()> {
        let l = color_param(params, "L")?;
        let scale = color_param(params, "scale")?;

        let ke_txt = match params.get("mapname") {
            Some(p) => {
                let path = directory.join(p.first_string()?);
                let image = texture::load_image(&path, false)
                    .wrap_err_with(|| format!("Couldn't load environment map '{}'", path.display()))?;
                Some(self.scene.add_texture(Texture {
                    name: self.counters.next_name(Counter::Texture),
                    image,
                    filename: Some(path),
                }))
            }
            None => None,
        };

        // pbrt's environment maps are z-up
        let rotation =
            Mat4::from_rotation_x(90f32.to_radians()) * Mat4::from_rotation_y(180f32.to_radians());
        let mut frame = self.gstate.ctm * rotation;
        frame.z_axis = -frame.z_axis;

        let env = Environment {
            name: self.counters.next_name(Counter::Environment),
            frame,
            ke: l * scale,
            ke_txt,
        };
        self.scene.environments.push(env);

        Ok(())
    }

    /// A point light becomes an emissive point primitive with its own material.
    fn add_point_light(&mut self, params: &ParamList) -> Result<()> {
        let i = color_param(params, "I")?;
        let scale = color_param(params, "scale")?;
        let from = match params.get("from") {
            Some(p) => p.first_vec3()?,
            None => Vec3::ZERO,
        };

        let material = self.scene.add_material(Material {
            ke: i * scale,
            ..Material::new(self.counters.next_name(Counter::Material))
        });

        let mesh = Mesh {
            positions: vec![from],
            points: vec![0],
            radius: vec![1.],
            ..Default::default()
        };

        let group = ShapeGroup {
            name: self.counters.next_name(Counter::ShapeGroup),
            shapes: vec![Shape {
                name: self.counters.next_name(Counter::Shape),
                material,
                mesh,
            }],
        };

        let id = self.scene.add_shape_group(group);
        self.add_instance(id, self.gstate.ctm);

        Ok(())
    }
}

/// Defaults to white.
fn color_param(params: &ParamList, name: &str) -> Result<Vec3> {
    match params.get(name) {
        Some(p) => p.first_color(),
        None => Ok(Vec3::ONE),
    }
}
