use eyre::Result;
use glam::Vec3;
use tracing::warn;

use super::{
    params::{parse_param_list, ParamList, ParamType},
    scene_description::{Material, MaterialId, Texture, TextureId},
    Counter, DeclaredMaterial, DeclaredMaterialId, DeclaredTexture, ParseError, SceneLoader,
};
use crate::{math::lerp, texture, vecmath};

#[derive(Clone, Copy)]
enum Slot {
    Kd,
    Ks,
    Kr,
    Kt,
    Roughness,
}

/// Defaults and consulted parameters of a material class that maps directly onto color slots.
struct MaterialClass {
    kd: f32,
    ks: f32,
    kr: f32,
    kt: f32,
    rs: f32,
    slots: &'static [Slot],
}

const MATTE: MaterialClass = MaterialClass {
    kd: 0.5,
    ks: 0.,
    kr: 0.,
    kt: 0.,
    rs: 1.,
    slots: &[Slot::Kd],
};

const UBER: MaterialClass = MaterialClass {
    kd: 0.25,
    ks: 0.25,
    kr: 0.,
    kt: 0.,
    rs: 0.01,
    slots: &[Slot::Kd, Slot::Ks, Slot::Kr, Slot::Roughness],
};

const TRANSLUCENT: MaterialClass = MaterialClass {
    kd: 0.25,
    ks: 0.25,
    kr: 0.5,
    kt: 0.5,
    rs: 0.1,
    slots: &[Slot::Kd, Slot::Ks, Slot::Kr, Slot::Kt, Slot::Roughness],
};

const MIRROR: MaterialClass = MaterialClass {
    kd: 0.,
    ks: 0.,
    kr: 0.9,
    kt: 0.,
    rs: 0.,
    slots: &[Slot::Kr],
};

const PLASTIC: MaterialClass = MaterialClass {
    kd: 0.25,
    ks: 0.25,
    kr: 0.,
    kt: 0.,
    rs: 0.1,
    slots: &[Slot::Kd, Slot::Ks, Slot::Roughness],
};

const SUBSTRATE: MaterialClass = MaterialClass {
    kd: 0.5,
    ks: 0.5,
    kr: 0.,
    kt: 0.,
    rs: 0.,
    slots: &[Slot::Kd, Slot::Ks, Slot::Roughness],
};

const GLASS: MaterialClass = MaterialClass {
    kd: 0.,
    ks: 0.04,
    kr: 0.,
    kt: 1.,
    rs: 0.1,
    slots: &[Slot::Ks, Slot::Kt],
};

impl SceneLoader {
    /// Handles both `Material` and `MakeNamedMaterial`.
    pub(super) fn parse_material(&mut self, named: bool) -> Result<()> {
        let (name, class) = if named {
            (Some(self.expect_string("material name")?), None)
        } else {
            (None, Some(self.expect_string("material type")?))
        };

        let params = parse_param_list(&mut self.src)?;
        let class = match class {
            Some(c) => c,
            None => params
                .get("type")
                .ok_or(ParseError::MissingParam {
                    directive: "MakeNamedMaterial",
                    param: "type",
                })?
                .first_string()?
                .to_string(),
        };

        let mut material = Material::new(self.counters.next_name(Counter::Material));

        if let Some(p) = params.get("bumpmap").or_else(|| params.get("bump")) {
            let declared = self.lookup_texture(p.first_string()?)?;
            material.bump_txt = Some(declared.texture);
            self.adopt_texture_scale(declared);
        }

        match class.as_str() {
            "matte" => self.translate_class(&MATTE, &mut material, &params)?,
            "uber" => self.translate_class(&UBER, &mut material, &params)?,
            "translucent" => self.translate_class(&TRANSLUCENT, &mut material, &params)?,
            "mirror" => self.translate_class(&MIRROR, &mut material, &params)?,
            "plastic" => self.translate_class(&PLASTIC, &mut material, &params)?,
            "substrate" => self.translate_class(&SUBSTRATE, &mut material, &params)?,
            "glass" => self.translate_class(&GLASS, &mut material, &params)?,
            "metal" => self.translate_metal(&mut material, &params)?,
            "mix" => self.translate_mix(&mut material, &params)?,
            c => {
                warn!("Material '{}' is not supported, using 'matte'", c);
                self.translate_class(&MATTE, &mut material, &params)?
            }
        }

        let id = DeclaredMaterialId(self.declared_materials.len());
        self.declared_materials.push(DeclaredMaterial {
            material,
            scene_id: None,
        });

        match name {
            Some(name) => {
                if self.gstate.named_materials.contains_key(&name) {
                    warn!("Named material '{}' redefined", name);
                }
                self.gstate.named_materials.insert(name, id);
            }
            None => self.gstate.material = Some(id),
        }

        Ok(())
    }

    pub(super) fn parse_named_material(&mut self) -> Result<()> {
        let name = self.expect_string("material name")?;
        let id = self.lookup_material(&name)?;
        self.gstate.material = Some(id);
        Ok(())
    }

    fn translate_class(
        &mut self,
        class: &MaterialClass,
        m: &mut Material,
        params: &ParamList,
    ) -> Result<()> {
        m.kd = Vec3::splat(class.kd);
        m.ks = Vec3::splat(class.ks);
        m.kr = Vec3::splat(class.kr);
        m.kt = Vec3::splat(class.kt);
        m.rs = class.rs;

        for slot in class.slots {
            match slot {
                Slot::Kd => self.set_color_or_texture(params, "Kd", &mut m.kd, &mut m.kd_txt)?,
                Slot::Ks => self.set_color_or_texture(params, "Ks", &mut m.ks, &mut m.ks_txt)?,
                Slot::Kr => self.set_color_or_texture(params, "Kr", &mut m.kr, &mut m.kr_txt)?,
                Slot::Kt => self.set_color_or_texture(params, "Kt", &mut m.kt, &mut m.kt_txt)?,
                Slot::Roughness => self.set_roughness(params, m)?,
            }
        }

        Ok(())
    }

    fn translate_metal(&mut self, m: &mut Material, params: &ParamList) -> Result<()> {
        m.rs = 0.01;

        let mut eta = Vec3::splat(0.5);
        let mut eta_txt = None;
        let mut k = Vec3::splat(0.5);
        let mut k_txt = None;
        self.set_color_or_texture(params, "eta", &mut eta, &mut eta_txt)?;
        self.set_color_or_texture(params, "k", &mut k, &mut k_txt)?;
        self.set_roughness(params, m)?;

        m.ks = vecmath::fresnel_conductor(1., eta, k);
        Ok(())
    }

    /// Blends two named materials, `amount` weighs the first one.
    fn translate_mix(&mut self, m: &mut Material, params: &ParamList) -> Result<()> {
        let amount = match params.get("amount") {
            Some(p) if p.typ == ParamType::Float => p.first_float()?,
            Some(p) => p.first_vec3()?.x,
            None => 0.5,
        };

        let operand = |param: &'static str| -> Result<Material> {
            let name = params
                .get(param)
                .ok_or(ParseError::MissingParam {
                    directive: "Material \"mix\"",
                    param,
                })?
                .first_string()?;
            let id = self.lookup_material(name)?;
            Ok(self.declared_materials[id.0].material.clone())
        };

        let m1 = operand("namedmaterial1")?;
        let m2 = operand("namedmaterial2")?;

        m.ke = lerp(amount, m2.ke, m1.ke);
        m.kd = lerp(amount, m2.kd, m1.kd);
        m.ks = lerp(amount, m2.ks, m1.ks);
        m.kr = lerp(amount, m2.kr, m1.kr);
        m.kt = lerp(amount, m2.kt, m1.kt);
        m.rs = lerp(amount, m2.rs, m1.rs);
        m.op = lerp(amount, m2.op, m1.op);

        m.ke_txt = self.blend_textures(m1.ke_txt, m2.ke_txt, amount);
        m.kd_txt = self.blend_textures(m1.kd_txt, m2.kd_txt, amount);
        m.ks_txt = self.blend_textures(m1.ks_txt, m2.ks_txt, amount);
        m.kr_txt = self.blend_textures(m1.kr_txt, m2.kr_txt, amount);
        m.kt_txt = self.blend_textures(m1.kt_txt, m2.kt_txt, amount);
        m.rs_txt = self.blend_textures(m1.rs_txt, m2.rs_txt, amount);
        m.bump_txt = self.blend_textures(m1.bump_txt, m2.bump_txt, amount);

        Ok(())
    }

    /// A texture missing on one side counts as black.
    fn blend_textures(
        &mut self,
        t1: Option<TextureId>,
        t2: Option<TextureId>,
        amount: f32,
    ) -> Option<TextureId> {
        let image = match (t1, t2) {
            (None, None) => return None,
            (Some(t1), None) => texture::scale_image(&self.scene.texture(t1).image, amount),
            (None, Some(t2)) => texture::scale_image(&self.scene.texture(t2).image, 1. - amount),
            (Some(t1), Some(t2)) => texture::blend_images(
                &self.scene.texture(t1).image,
                &self.scene.texture(t2).image,
                amount,
            ),
        };

        let name = self.counters.next_name(Counter::Texture);
        Some(self.scene.add_texture(Texture {
            name,
            image,
            filename: None,
        }))
    }

    /// A texture-typed parameter binds the texture and leaves the color white.
    fn set_color_or_texture(
        &mut self,
        params: &ParamList,
        name: &str,
        color: &mut Vec3,
        txt: &mut Option<TextureId>,
    ) -> Result<()> {
        let Some(p) = params.get(name) else {
            return Ok(());
        };

        if p.typ == ParamType::Texture {
            let declared = self.lookup_texture(p.first_string()?)?;
            *txt = Some(declared.texture);
            *color = Vec3::ONE;
            self.adopt_texture_scale(declared);
        } else {
            *color = p.first_color()?;
        }

        Ok(())
    }

    fn set_roughness(&mut self, params: &ParamList, m: &mut Material) -> Result<()> {
        let Some(p) = params.get("roughness") else {
            return Ok(());
        };

        if p.typ == ParamType::Texture {
            let declared = self.lookup_texture(p.first_string()?)?;
            m.rs_txt = Some(declared.texture);
            m.rs = 1.;
        } else {
            m.rs = p.first_float()?;
        }

        Ok(())
    }

    pub(super) fn lookup_texture(&self, name: &str) -> Result<DeclaredTexture> {
        self.gstate
            .named_textures
            .get(name)
            .copied()
            .ok_or_else(|| {
                ParseError::UnknownName {
                    kind: "texture",
                    name: name.to_string(),
                }
                .into()
            })
    }

    fn lookup_material(&self, name: &str) -> Result<DeclaredMaterialId> {
        self.gstate
            .named_materials
            .get(name)
            .copied()
            .ok_or_else(|| {
                ParseError::UnknownName {
                    kind: "material",
                    name: name.to_string(),
                }
                .into()
            })
    }

    fn adopt_texture_scale(&mut self, declared: DeclaredTexture) {
        self.gstate.uscale = declared.uscale;
        self.gstate.vscale = declared.vscale;
    }

    /// Resolves the material of the next shape, inserting it into the scene on first use.
    pub(super) fn bind_material(&mut self) -> MaterialId {
        if let Some(light) = self.gstate.area_light {
            let mut emissive = match self.gstate.material {
                Some(id) => self.declared_materials[id.0].material.clone(),
                None => Material::new_default(String::new()),
            };
            emissive.name = self.counters.next_name(Counter::Material);
            emissive.ke = light.radiance;
            emissive.double_sided = light.two_sided;
            return self.scene.add_material(emissive);
        }

        match self.gstate.material {
            Some(id) => {
                let declared = &mut self.declared_materials[id.0];
                match declared.scene_id {
                    Some(scene_id) => scene_id,
                    None => {
                        let scene_id = self.scene.add_material(declared.material.clone());
                        declared.scene_id = Some(scene_id);
                        scene_id
                    }
                }
            }
            None => {
                warn!("Shape has no material bound, using a default one");
                let name = self.counters.next_name(Counter::Material);
                let scene_id = self.scene.add_material(Material::new_default(name));
                let id = DeclaredMaterialId(self.declared_materials.len());
                self.declared_materials.push(DeclaredMaterial {
                    material: self.scene.material(scene_id).clone(),
                    scene_id: Some(scene_id),
                });
                self.gstate.material = Some(id);
                scene_id
            }
        }
    }
}
