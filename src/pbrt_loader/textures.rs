use eyre::{Result, WrapErr};
use glam::Vec3;
use image::Rgba32FImage;

use super::{
    params::{canonical_type_name, parse_param_list, ParamList, ParamType},
    scene_description::Texture,
    Counter, DeclaredTexture, ParseError, SceneLoader,
};
use crate::texture;

const CHECKER_SIZE: u32 = 128;
const CHECKER_TILE: u32 = 64;

impl SceneLoader {
    /// Textures are inserted into the scene right away, materials only reference them.
    pub(super) fn parse_texture(&mut self) -> Result<()> {
        let name = self.expect_string("texture name")?;
        let base = self.expect_string("texture type")?;
        let class = self.expect_string("texture class")?;

        if !matches!(canonical_type_name(&base), "spectrum" | "rgb" | "float") {
            return Err(ParseError::InvalidDirective {
                directive: "Texture",
                reason: format!("unsupported texture type '{base}'"),
            }
            .into());
        }

        let directory = self.current_directory();
        let params = parse_param_list(&mut self.src)?;

        let mut uscale = 1.;
        let mut vscale = 1.;
        let mut filename = None;

        let image = match class.as_str() {
            "imagemap" => {
                let file = params
                    .get("filename")
                    .ok_or(ParseError::MissingParam {
                        directive: "Texture \"imagemap\"",
                        param: "filename",
                    })?
                    .first_string()?;
                let path = directory.join(file);

                uscale = scale_param(&params, "uscale")?.max(1.);
                vscale = scale_param(&params, "vscale")?.max(1.);

                let image = texture::load_image(&path, true)
                    .wrap_err_with(|| format!("Couldn't load texture '{name}'"))?;
                filename = Some(path);
                image
            }
            "constant" => {
                let value = color_param(&params, "value", Vec3::ONE)?;
                texture::constant_image(value)
            }
            "checkerboard" => {
                let tex1 = color_param(&params, "tex1", Vec3::ZERO)?;
                let tex2 = color_param(&params, "tex2", Vec3::ONE)?;

                uscale = scale_param(&params, "uscale")?;
                vscale = scale_param(&params, "vscale")?;
                if uscale < 0. {
                    uscale = 1.;
                }
                if vscale < 0. {
                    vscale = 1.;
                }

                texture::checker_image(CHECKER_SIZE, CHECKER_TILE, tex1, tex2)
            }
            "scale" => {
                let tex1 = self.texture_operand(&params, "tex1")?;
                let tex2 = self.texture_operand(&params, "tex2")?;

                uscale = scale_param(&params, "uscale")?;
                vscale = scale_param(&params, "vscale")?;

                texture::multiply_images(&tex1, &tex2)
            }
            c => {
                return Err(ParseError::InvalidDirective {
                    directive: "Texture",
                    reason: format!("texture class '{c}' is not supported"),
                }
                .into())
            }
        };

        let texture = self.scene.add_texture(Texture {
            name: self.counters.next_name(Counter::Texture),
            image,
            filename,
        });

        self.gstate.named_textures.insert(
            name,
            DeclaredTexture {
                texture,
                uscale,
                vscale,
            },
        );

        Ok(())
    }

    /// A declared texture or a constant color.
    fn texture_operand(&self, params: &ParamList, param: &'static str) -> Result<Rgba32FImage> {
        let p = params.get(param).ok_or(ParseError::MissingParam {
            directive: "Texture \"scale\"",
            param,
        })?;

        if p.typ == ParamType::Texture {
            let declared = self.lookup_texture(p.first_string()?)?;
            Ok(self.scene.texture(declared.texture).image.clone())
        } else {
            Ok(texture::constant_image(p.first_color()?))
        }
    }
}

fn scale_param(params: &ParamList, name: &str) -> Result<f32> {
    match params.get(name) {
        Some(p) => p.first_float(),
        None => Ok(1.),
    }
}

fn color_param(params: &ParamList, name: &str, default: Vec3) -> Result<Vec3> {
    match params.get(name) {
        Some(p) => p.first_color(),
        None => Ok(default),
    }
}
