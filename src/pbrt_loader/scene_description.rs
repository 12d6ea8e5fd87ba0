use std::path::PathBuf;

use glam::{Mat4, Vec2, Vec3};
use image::Rgba32FImage;

/// Index of a shape group in [`SceneDescription::shape_groups`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShapeGroupId(pub usize);

/// Index of a material in [`SceneDescription::materials`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialId(pub usize);

/// Index of a texture in [`SceneDescription::textures`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub usize);

/// The scene graph produced by the loader.
///
/// Entities are only ever appended, each one exactly once.
#[derive(Debug, Default)]
pub struct SceneDescription {
    pub film: Option<Film>,
    pub cameras: Vec<Camera>,
    pub shape_groups: Vec<ShapeGroup>,
    pub instances: Vec<Instance>,
    pub materials: Vec<Material>,
    pub textures: Vec<Texture>,
    pub environments: Vec<Environment>,
}

impl SceneDescription {
    pub fn shape_group(&self, id: ShapeGroupId) -> &ShapeGroup {
        &self.shape_groups[id.0]
    }

    pub fn material(&self, id: MaterialId) -> &Material {
        &self.materials[id.0]
    }

    pub fn texture(&self, id: TextureId) -> &Texture {
        &self.textures[id.0]
    }

    pub fn add_shape_group(&mut self, group: ShapeGroup) -> ShapeGroupId {
        self.shape_groups.push(group);
        ShapeGroupId(self.shape_groups.len() - 1)
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() - 1)
    }

    pub fn add_texture(&mut self, texture: Texture) -> TextureId {
        self.textures.push(texture);
        TextureId(self.textures.len() - 1)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Film {
    pub xresolution: i32,
    pub yresolution: i32,
    pub filename: String,
}

impl Default for Film {
    fn default() -> Self {
        Self {
            xresolution: 1280,
            yresolution: 720,
            filename: String::from("pbrt.exr"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub name: String,
    /// Camera-to-world frame, the camera looks down its -z axis
    pub frame: Mat4,
    /// Vertical field of view in radians
    pub yfov: f32,
    pub aspect: f32,
    pub focus: f32,
    pub aperture: f32,
}

#[derive(Debug, Clone)]
pub struct Instance {
    pub name: String,
    pub frame: Mat4,
    pub shape_group: ShapeGroupId,
}

/// One or more shapes referenced as a unit by instances.
#[derive(Debug, Clone)]
pub struct ShapeGroup {
    pub name: String,
    pub shapes: Vec<Shape>,
}

#[derive(Debug, Clone)]
pub struct Shape {
    pub name: String,
    pub material: MaterialId,
    pub mesh: Mesh,
}

/// Indexed geometry. Any of the element lists may be empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub triangles: Vec<[u32; 3]>,
    pub quads: Vec<[u32; 4]>,
    pub points: Vec<u32>,
    pub radius: Vec<f32>,
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    /// Emission
    pub ke: Vec3,
    /// Diffuse albedo
    pub kd: Vec3,
    /// Specular reflectance
    pub ks: Vec3,
    /// Mirror reflectance
    pub kr: Vec3,
    /// Transmittance
    pub kt: Vec3,
    /// Roughness
    pub rs: f32,
    /// Opacity
    pub op: f32,
    pub double_sided: bool,

    pub ke_txt: Option<TextureId>,
    pub kd_txt: Option<TextureId>,
    pub ks_txt: Option<TextureId>,
    pub kr_txt: Option<TextureId>,
    pub kt_txt: Option<TextureId>,
    pub rs_txt: Option<TextureId>,
    pub bump_txt: Option<TextureId>,
}

impl Material {
    pub fn new(name: String) -> Self {
        Self {
            name,
            ke: Vec3::ZERO,
            kd: Vec3::ZERO,
            ks: Vec3::ZERO,
            kr: Vec3::ZERO,
            kt: Vec3::ZERO,
            rs: 1.,
            op: 1.,
            double_sided: false,
            ke_txt: None,
            kd_txt: None,
            ks_txt: None,
            kr_txt: None,
            kt_txt: None,
            rs_txt: None,
            bump_txt: None,
        }
    }

    /// Grey diffuse material used for shapes without a bound material.
    pub fn new_default(name: String) -> Self {
        Self {
            kd: Vec3::splat(0.5),
            ..Self::new(name)
        }
    }
}

#[derive(Debug, Clone)]
pub struct Texture {
    pub name: String,
    pub image: Rgba32FImage,
    /// Source image file, `None` for procedural and blended textures
    pub filename: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Environment {
    pub name: String,
    pub frame: Mat4,
    pub ke: Vec3,
    pub ke_txt: Option<TextureId>,
}
