use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use eyre::{Result, WrapErr};
use glam::{Mat4, Vec3};
use thiserror::Error;
use tracing::{error, info, warn};

use self::{
    lexer::Lexeme,
    params::parse_number_run,
    scene_description::{
        Camera, Film, Instance, Material, MaterialId, SceneDescription, ShapeGroup, ShapeGroupId,
        TextureId,
    },
    source_stack::SourceStack,
};
use crate::vecmath;

mod lexer;
mod lights;
mod materials;
mod params;
mod ply_mesh;
pub mod scene_description;
mod shapes;
mod source_stack;
mod textures;

#[cfg(test)]
mod test_util;

/// Fatal conditions that abort loading a scene.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Input ended unexpectedly")]
    UnexpectedEof,
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },
    #[error("Expected {expected}, got '{got}'")]
    UnexpectedToken { expected: &'static str, got: String },
    #[error("Directive '{directive}' is invalid {phase}")]
    MisplacedDirective {
        directive: String,
        phase: &'static str,
    },
    #[error("{end} without a matching {begin}")]
    UnmatchedScope {
        begin: &'static str,
        end: &'static str,
    },
    #[error("Parameter '{name}' expects a {expected} type, got '{got}'")]
    ParamTypeMismatch {
        name: String,
        expected: String,
        got: String,
    },
    #[error("Parameter type '{0}' is not supported")]
    UnsupportedParamType(String),
    #[error("Malformed parameter declaration '{0}'")]
    MalformedParamHeader(String),
    #[error("Parameter '{name}': {reason}")]
    BadParamValue { name: String, reason: String },
    #[error("{directive} is missing the '{param}' parameter")]
    MissingParam {
        directive: &'static str,
        param: &'static str,
    },
    #[error("No {kind} named '{name}'")]
    UnknownName { kind: &'static str, name: String },
    #[error("{directive}: {reason}")]
    InvalidDirective {
        directive: &'static str,
        reason: String,
    },
    #[error("Object '{0}' can't be defined inside another object")]
    NestedObject(String),
    #[error("Includes are nested deeper than {0} files")]
    IncludeTooDeep(usize),
}

fn unexpected(expected: &'static str, got: Lexeme) -> eyre::Report {
    match got {
        Lexeme::Eof => ParseError::UnexpectedEof.into(),
        got => ParseError::UnexpectedToken {
            expected,
            got: got.to_string(),
        }
        .into(),
    }
}

#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Recompute vertex normals of triangle meshes even when the file provides them
    pub always_recompute_normals: bool,
    pub max_include_depth: usize,
    /// Accept input that ends inside the world block (pbrt-v4 files have no `WorldEnd`)
    pub allow_missing_world_end: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            always_recompute_normals: false,
            max_include_depth: 32,
            allow_missing_world_end: false,
        }
    }
}

/// Emission applied to the shapes declared after `AreaLightSource`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct AreaLight {
    radiance: Vec3,
    two_sided: bool,
}

/// Index into [`SceneLoader::declared_materials`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DeclaredMaterialId(usize);

struct DeclaredMaterial {
    material: Material,
    /// Set once a shape has used the material
    scene_id: Option<MaterialId>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct DeclaredTexture {
    texture: TextureId,
    uscale: f32,
    vscale: f32,
}

struct DeclaredObject {
    /// Groups not yet added to the scene
    groups: Vec<ShapeGroup>,
    /// Set by the first instance of the object
    scene_ids: Option<Vec<ShapeGroupId>>,
    ctm: Mat4,
}

#[derive(Debug, Clone, PartialEq)]
struct GraphicsState {
    ctm: Mat4,
    material: Option<DeclaredMaterialId>,
    named_materials: HashMap<String, DeclaredMaterialId>,
    named_textures: HashMap<String, DeclaredTexture>,
    area_light: Option<AreaLight>,
    uscale: f32,
    vscale: f32,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: Mat4::IDENTITY,
            material: None,
            named_materials: HashMap::new(),
            named_textures: HashMap::new(),
            area_light: None,
            uscale: 1.,
            vscale: 1.,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Counter {
    Shape,
    ShapeGroup,
    Instance,
    Material,
    Environment,
    Texture,
}

/// Mints the unique names of scene entities.
#[derive(Debug, Default)]
struct Counters {
    shape: u32,
    shape_group: u32,
    instance: u32,
    material: u32,
    environment: u32,
    texture: u32,
}

impl Counters {
    fn next_name(&mut self, counter: Counter) -> String {
        let (prefix, value) = match counter {
            Counter::Shape => ("s", &mut self.shape),
            Counter::ShapeGroup => ("sg", &mut self.shape_group),
            Counter::Instance => ("i", &mut self.instance),
            Counter::Material => ("m", &mut self.material),
            Counter::Environment => ("e", &mut self.environment),
            Counter::Texture => ("t", &mut self.texture),
        };

        let name = format!("{prefix}_{value}");
        *value += 1;
        name
    }
}

const DEFAULT_ASPECT: f32 = 16. / 9.;

pub struct SceneLoader {
    src: SourceStack,
    options: LoaderOptions,
    gstate: GraphicsState,
    saved_gstates: Vec<GraphicsState>,
    saved_ctms: Vec<Mat4>,
    declared_materials: Vec<DeclaredMaterial>,
    objects: HashMap<String, DeclaredObject>,
    /// `Some` while inside an `ObjectBegin` / `ObjectEnd` block
    object_shapes: Option<Vec<ShapeGroup>>,
    counters: Counters,
    default_aspect: f32,
    default_focus: f32,
    scene: SceneDescription,
}

impl SceneLoader {
    pub fn load_from_path<T: AsRef<Path>>(file: T) -> Result<SceneDescription> {
        Self::open(file, LoaderOptions::default())?.load()
    }

    /// Loads a scene from text, includes are resolved against `directory`.
    pub fn load_from_str(txt: &str, directory: PathBuf) -> Result<SceneDescription> {
        Self::from_text(txt, directory, LoaderOptions::default()).load()
    }

    pub fn open<T: AsRef<Path>>(file: T, options: LoaderOptions) -> Result<Self> {
        let src = SourceStack::open(file.as_ref(), options.max_include_depth)?;
        Ok(Self::with_source(src, options))
    }

    pub fn from_text(txt: &str, directory: PathBuf, options: LoaderOptions) -> Self {
        let src = SourceStack::from_text(txt, directory, options.max_include_depth);
        Self::with_source(src, options)
    }

    fn with_source(src: SourceStack, options: LoaderOptions) -> Self {
        Self {
            src,
            options,
            gstate: GraphicsState::default(),
            saved_gstates: Vec::new(),
            saved_ctms: Vec::new(),
            declared_materials: Vec::new(),
            objects: HashMap::new(),
            object_shapes: None,
            counters: Counters::default(),
            default_aspect: DEFAULT_ASPECT,
            default_focus: 1.,
            scene: SceneDescription::default(),
        }
    }

    pub fn load(mut self) -> Result<SceneDescription> {
        let res = self.parse_scene();
        let location = self.src.location();
        res.wrap_err_with(|| format!("Scene loading failed at {location}"))
            .inspect_err(|e| self.report_error(e))?;

        let s = &self.scene;
        info!(
            "Loaded {} cameras, {} shape groups, {} instances, {} materials, {} textures, {} environments",
            s.cameras.len(),
            s.shape_groups.len(),
            s.instances.len(),
            s.materials.len(),
            s.textures.len(),
            s.environments.len()
        );

        Ok(self.scene)
    }

    fn report_error(&self, report: &eyre::Report) {
        error!("Scene loading error: '{report:#}'");
    }

    fn parse_scene(&mut self) -> Result<()> {
        self.parse_preworld_directives()?;
        self.parse_world_directives()
    }

    //
    // Scene-wide options
    //

    fn parse_preworld_directives(&mut self) -> Result<()> {
        loop {
            let dir = self.expect_directive()?;
            match dir.as_str() {
                "Camera" => self.parse_camera()?,
                "Film" => self.parse_film()?,
                "Include" => self.parse_include()?,
                "WorldBegin" => break,
                // Transformations
                "Translate" => self.parse_translate()?,
                "Scale" => self.parse_scale()?,
                "Rotate" => self.parse_rotate()?,
                "LookAt" => self.parse_look_at()?,
                "Transform" => self.parse_transform()?,
                "ConcatTransform" => self.parse_concat_transform()?,
                // Invalid before WorldBegin
                "AttributeBegin" | "AttributeEnd" | "TransformBegin" | "TransformEnd" | "Shape"
                | "ObjectBegin" | "ObjectEnd" | "ObjectInstance" | "LightSource"
                | "AreaLightSource" | "Material" | "MakeNamedMaterial" | "NamedMaterial"
                | "Texture" | "WorldEnd" => {
                    return Err(ParseError::MisplacedDirective {
                        directive: dir,
                        phase: "before WorldBegin",
                    }
                    .into())
                }
                _ => self.skip_directive(&dir)?,
            }
        }

        Ok(())
    }

    fn parse_camera(&mut self) -> Result<()> {
        let typ = self.expect_string("camera type")?;
        if typ != "perspective" {
            return Err(ParseError::InvalidDirective {
                directive: "Camera",
                reason: format!("only perspective cameras are supported, got '{typ}'"),
            }
            .into());
        }

        let params = params::parse_param_list(&mut self.src)?;

        // The CTM is the world-to-camera transform
        if self.gstate.ctm.determinant() == 0. {
            return Err(ParseError::InvalidDirective {
                directive: "Camera",
                reason: "the current transform is not invertible".to_string(),
            }
            .into());
        }
        let mut frame = self.gstate.ctm.inverse();
        frame.z_axis = -frame.z_axis;

        let mut cam = Camera {
            name: format!("c{}", self.scene.cameras.len()),
            frame,
            yfov: 90f32.to_radians(),
            aspect: self.default_aspect,
            focus: self.default_focus,
            aperture: 0.,
        };

        if let Some(p) = params.get("frameaspectratio") {
            cam.aspect = p.first_float()?;
        }
        if let Some(p) = params.get("fov") {
            cam.yfov = p.first_float()?.to_radians();
        }

        self.scene.cameras.push(cam);
        Ok(())
    }

    fn parse_film(&mut self) -> Result<()> {
        let typ = self.expect_string("film type")?;
        if typ != "image" && typ != "rgb" {
            return Err(ParseError::InvalidDirective {
                directive: "Film",
                reason: format!("only image films are supported, got '{typ}'"),
            }
            .into());
        }

        let params = params::parse_param_list(&mut self.src)?;
        let mut film = Film::default();

        let xres = params.get("xresolution").map(|p| p.first_int()).transpose()?;
        let yres = params.get("yresolution").map(|p| p.first_int()).transpose()?;
        if let Some(p) = params.get("filename") {
            film.filename = p.first_string()?.to_string();
        }

        if let (Some(x), Some(y)) = (xres, yres) {
            if x > 0 && y > 0 {
                // TODO: keep the aspect of portrait images once cameras carry a horizontal fov
                self.default_aspect = f32::max(x as f32 / y as f32, 1.);
                for cam in &mut self.scene.cameras {
                    cam.aspect = self.default_aspect;
                }
            }
        }

        film.xresolution = xres.unwrap_or(film.xresolution);
        film.yresolution = yres.unwrap_or(film.yresolution);
        self.scene.film = Some(film);
        Ok(())
    }

    fn parse_include(&mut self) -> Result<()> {
        let file = self.expect_string("name of the file to include")?;
        self.src.include(&file)
    }

    //
    // World block
    //

    fn parse_world_directives(&mut self) -> Result<()> {
        self.gstate.ctm = Mat4::IDENTITY;

        loop {
            let at_end = match self.src.peek()? {
                Lexeme::Eof if self.options.allow_missing_world_end => {
                    warn!("Scene ended without WorldEnd");
                    return Ok(());
                }
                Lexeme::Eof => return Err(ParseError::UnexpectedEof.into()),
                Lexeme::Ident(dir) => dir == "WorldEnd",
                _ => false,
            };

            if at_end {
                self.src.next()?;
                return Ok(());
            }

            self.parse_world_directive()?;
        }
    }

    /// Executes one directive of the world block, also used inside object blocks.
    fn parse_world_directive(&mut self) -> Result<()> {
        let dir = self.expect_directive()?;
        match dir.as_str() {
            "Include" => self.parse_include()?,
            // Attributes
            "AttributeBegin" => self.attribute_begin(),
            "AttributeEnd" => self.attribute_end()?,
            "TransformBegin" => self.transform_begin(),
            "TransformEnd" => self.transform_end()?,
            // Shapes
            "Shape" => self.parse_shape()?,
            "ObjectBegin" => self.parse_object_block()?,
            "ObjectInstance" => self.parse_object_instance()?,
            "ObjectEnd" => {
                return Err(ParseError::UnmatchedScope {
                    begin: "ObjectBegin",
                    end: "ObjectEnd",
                }
                .into())
            }
            // Lights
            "LightSource" => self.parse_light_source()?,
            "AreaLightSource" => self.parse_area_light_source()?,
            // Materials
            "Material" => self.parse_material(false)?,
            "MakeNamedMaterial" => self.parse_material(true)?,
            "NamedMaterial" => self.parse_named_material()?,
            "Texture" => self.parse_texture()?,
            // Transformations
            "Translate" => self.parse_translate()?,
            "Scale" => self.parse_scale()?,
            "Rotate" => self.parse_rotate()?,
            "LookAt" => self.parse_look_at()?,
            "Transform" => self.parse_transform()?,
            "ConcatTransform" => self.parse_concat_transform()?,
            // Only reachable inside an object block
            "WorldEnd" => {
                return Err(ParseError::MisplacedDirective {
                    directive: dir,
                    phase: "inside an object block",
                }
                .into())
            }
            _ => self.skip_directive(&dir)?,
        }

        Ok(())
    }

    fn attribute_begin(&mut self) {
        self.saved_gstates.push(self.gstate.clone());
    }

    fn attribute_end(&mut self) -> Result<()> {
        match self.saved_gstates.pop() {
            Some(gstate) => self.gstate = gstate,
            None => {
                return Err(ParseError::UnmatchedScope {
                    begin: "AttributeBegin",
                    end: "AttributeEnd",
                }
                .into())
            }
        }

        Ok(())
    }

    fn transform_begin(&mut self) {
        self.saved_ctms.push(self.gstate.ctm);
    }

    fn transform_end(&mut self) -> Result<()> {
        match self.saved_ctms.pop() {
            Some(ctm) => self.gstate.ctm = ctm,
            None => {
                return Err(ParseError::UnmatchedScope {
                    begin: "TransformBegin",
                    end: "TransformEnd",
                }
                .into())
            }
        }

        Ok(())
    }

    fn add_instance(&mut self, shape_group: ShapeGroupId, frame: Mat4) {
        let name = self.counters.next_name(Counter::Instance);
        self.scene.instances.push(Instance {
            name,
            frame,
            shape_group,
        });
    }

    //
    // Transformations
    //

    fn parse_translate(&mut self) -> Result<()> {
        let t = self.parse_vec3()?;
        self.modify_ctm(Mat4::from_translation(t));
        Ok(())
    }

    fn parse_scale(&mut self) -> Result<()> {
        let s = self.parse_vec3()?;
        self.modify_ctm(Mat4::from_scale(s));
        Ok(())
    }

    fn parse_rotate(&mut self) -> Result<()> {
        let angle = self.parse_float()?;
        let axis = self.parse_vec3()?;

        let trans = vecmath::rotate(angle, axis).ok_or_else(|| ParseError::InvalidDirective {
            directive: "Rotate",
            reason: "the rotation axis is a zero vector".to_string(),
        })?;
        self.modify_ctm(trans);

        Ok(())
    }

    fn parse_look_at(&mut self) -> Result<()> {
        let eye = self.parse_vec3()?;
        let look = self.parse_vec3()?;
        let up = self.parse_vec3()?;

        let trans = vecmath::look_at(eye, look, up).ok_or_else(|| ParseError::InvalidDirective {
            directive: "LookAt",
            reason: "the eye, target and up vector don't form a frame".to_string(),
        })?;

        self.default_focus = (eye - look).length();
        self.modify_ctm(trans);

        Ok(())
    }

    /// Transform resets the CTM to the specified matrix.
    fn parse_transform(&mut self) -> Result<()> {
        self.gstate.ctm = self.parse_matrix("Transform")?;
        Ok(())
    }

    fn parse_concat_transform(&mut self) -> Result<()> {
        let trans = self.parse_matrix("ConcatTransform")?;
        self.modify_ctm(trans);
        Ok(())
    }

    /// Reads 16 numbers in column-major order.
    fn parse_matrix(&mut self, directive: &'static str) -> Result<Mat4> {
        let vals = parse_number_run(&mut self.src, directive)?;
        let cols = <[f32; 16]>::try_from(vals.as_slice()).map_err(|_| {
            ParseError::InvalidDirective {
                directive,
                reason: format!("expected a 4x4 matrix, got {} values", vals.len()),
            }
        })?;

        Ok(Mat4::from_cols_array(&cols))
    }

    fn modify_ctm(&mut self, next_trans: Mat4) {
        let ctm = &mut self.gstate.ctm;
        *ctm = *ctm * next_trans;
    }

    //
    // Lexeme helpers
    //

    fn expect_directive(&mut self) -> Result<String> {
        match self.src.next()? {
            Lexeme::Ident(dir) => Ok(dir),
            l => Err(unexpected("a directive", l)),
        }
    }

    fn expect_string(&mut self, what: &'static str) -> Result<String> {
        match self.src.next()? {
            Lexeme::Str(s) => Ok(s),
            l => Err(unexpected(what, l)),
        }
    }

    fn parse_float(&mut self) -> Result<f32> {
        match self.src.next()? {
            l @ Lexeme::Num(_) => params::parse_float(&l, "number"),
            l => Err(unexpected("a number", l)),
        }
    }

    fn parse_vec3(&mut self) -> Result<Vec3> {
        let x = self.parse_float()?;
        let y = self.parse_float()?;
        let z = self.parse_float()?;
        Ok(Vec3::new(x, y, z))
    }

    /// Discards lexemes up to the next directive.
    fn skip_directive(&mut self, what: &str) -> Result<()> {
        warn!("Ignoring '{}' directive", what);

        while !matches!(self.src.peek()?, Lexeme::Ident(_) | Lexeme::Eof) {
            self.src.next()?;
        }

        Ok(())
    }

    fn current_directory(&self) -> PathBuf {
        self.src.current_directory().to_path_buf()
    }
}

#[cfg(test)]
mod test_super {
    use glam::{vec3, Mat4};

    use super::{test_util::*, *};
    use crate::vecmath::mat4_cmp_assert;

    fn loader(txt: &str) -> SceneLoader {
        SceneLoader::from_text(txt, PathBuf::new(), LoaderOptions::default())
    }

    /// Runs world-block directives until the end of input.
    fn run_world(loader: &mut SceneLoader) -> Result<()> {
        while loader.src.peek()? != &Lexeme::Eof {
            loader.parse_world_directive()?;
        }
        Ok(())
    }

    #[test]
    fn test_minimal_scene() {
        let scene = load(
            "Camera \"perspective\" \"float fov\" [60]
            WorldBegin
            Material \"matte\" \"rgb Kd\" [0.5 0.5 0.5]
            Shape \"trianglemesh\" \"point3 P\" [0 0 0  1 0 0  0 1 0] \"integer indices\" [0 1 2]
            WorldEnd",
        )
        .unwrap();

        assert_eq!(scene.cameras.len(), 1);
        assert!((scene.cameras[0].yfov - 60f32.to_radians()).abs() < 1e-6);
        assert_eq!(scene.materials.len(), 1);
        assert_eq!(scene.shape_groups.len(), 1);
        assert_eq!(scene.shape_groups[0].shapes.len(), 1);

        let mesh = &scene.shape_groups[0].shapes[0].mesh;
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangles, vec![[0, 1, 2]]);

        assert_eq!(scene.instances.len(), 1);
        assert_eq!(scene.instances[0].frame, Mat4::IDENTITY);
        assert_eq!(scene.instances[0].shape_group, ShapeGroupId(0));
    }

    #[test]
    fn test_attribute_end_restores_state() {
        let mut l = loader(
            "Material \"plastic\"
            AttributeBegin
                Translate 1 2 3
                Material \"matte\"
                MakeNamedMaterial \"inner\" \"string type\" \"mirror\"
                Texture \"t\" \"rgb\" \"constant\" \"rgb value\" [1 0 0]
                AreaLightSource \"diffuse\" \"rgb L\" [4 4 4]
                Rotate 30 0 1 0
            AttributeEnd",
        );

        // Material "plastic"
        l.parse_world_directive().unwrap();
        let before = l.gstate.clone();

        run_world(&mut l).unwrap();
        assert_eq!(l.gstate, before);
        assert!(l.gstate.named_materials.is_empty());
        assert!(l.gstate.named_textures.is_empty());
        assert!(l.gstate.area_light.is_none());
    }

    #[test]
    fn test_transform_end_keeps_attributes() {
        let mut l = loader(
            "TransformBegin
                Translate 1 0 0
                Material \"matte\"
            TransformEnd",
        );

        run_world(&mut l).unwrap();
        assert_eq!(l.gstate.ctm, Mat4::IDENTITY);
        assert!(l.gstate.material.is_some());
    }

    #[test]
    fn test_independent_scope_stacks() {
        let mut l = loader("AttributeBegin TransformBegin Translate 0 1 0 AttributeEnd TransformEnd");
        run_world(&mut l).unwrap();
        assert_eq!(l.gstate.ctm, Mat4::IDENTITY);
        assert!(l.saved_ctms.is_empty());
        assert!(l.saved_gstates.is_empty());
    }

    #[test]
    fn test_unmatched_scope_end() {
        assert_eq!(
            load_err(&world("AttributeEnd")),
            ParseError::UnmatchedScope {
                begin: "AttributeBegin",
                end: "AttributeEnd"
            }
        );
        assert_eq!(
            load_err(&world("AttributeBegin TransformEnd AttributeEnd")),
            ParseError::UnmatchedScope {
                begin: "TransformBegin",
                end: "TransformEnd"
            }
        );
    }

    #[test]
    fn test_translate_round_trip() {
        let mut l = loader("Translate 1 0 0 Translate -1 0 0");
        run_world(&mut l).unwrap();
        mat4_cmp_assert(l.gstate.ctm, Mat4::IDENTITY);
    }

    #[test]
    fn test_transform_replaces_and_concat_composes() {
        let mut l = loader(
            "Scale 2 2 2
            Transform [1 0 0 0  0 1 0 0  0 0 1 0  5 6 7 1]
            ConcatTransform [1 0 0 0  0 1 0 0  0 0 1 0  1 0 0 1]",
        );
        run_world(&mut l).unwrap();
        mat4_cmp_assert(l.gstate.ctm, Mat4::from_translation(vec3(6., 6., 7.)));
    }

    #[test]
    fn test_transform_needs_16_values() {
        assert!(matches!(
            load_err(&world("Transform [1 0 0 1]")),
            ParseError::InvalidDirective {
                directive: "Transform",
                ..
            }
        ));
    }

    #[test]
    fn test_look_at_camera_frame() {
        let scene = load(
            "LookAt 0 0 5  0 0 0  0 1 0
            Camera \"perspective\"
            WorldBegin WorldEnd",
        )
        .unwrap();

        let cam = &scene.cameras[0];
        // The camera sits at the eye and looks down its -z axis towards the target
        let eye = cam.frame.transform_point3(glam::Vec3::ZERO);
        crate::vecmath::vec3_cmp_assert(eye, vec3(0., 0., 5.));
        let forward = cam.frame.transform_vector3(vec3(0., 0., -1.));
        crate::vecmath::vec3_cmp_assert(forward, vec3(0., 0., -1.));
        assert!((cam.focus - 5.).abs() < 1e-5);
    }

    #[test]
    fn test_world_begin_resets_ctm() {
        let mut l = loader("Translate 1 2 3 WorldBegin");
        l.parse_preworld_directives().unwrap();
        assert_ne!(l.gstate.ctm, Mat4::IDENTITY);
        l.parse_world_directives().unwrap();
        assert_eq!(l.gstate.ctm, Mat4::IDENTITY);
    }

    #[test]
    fn test_film_sets_aspect() {
        let scene = load(
            "Camera \"perspective\"
            Film \"image\" \"integer xresolution\" [400] \"integer yresolution\" [200]
                \"string filename\" \"out.exr\"
            WorldBegin WorldEnd",
        )
        .unwrap();

        assert_eq!(scene.cameras[0].aspect, 2.);
        let film = scene.film.unwrap();
        assert_eq!((film.xresolution, film.yresolution), (400, 200));
        assert_eq!(film.filename, "out.exr");
    }

    #[test]
    fn test_unknown_directives_are_skipped() {
        let scene = load(
            "Sampler \"halton\" \"integer pixelsamples\" [16]
            Integrator \"path\"
            WorldBegin
            ReverseOrientation
            MakeNamedMedium \"fog\" \"string type\" \"homogeneous\"
            Shape \"sphere\"
            WorldEnd",
        )
        .unwrap();

        assert_eq!(scene.shape_groups.len(), 1);
    }

    #[test]
    fn test_misplaced_directives() {
        assert!(matches!(
            load_err("Shape \"sphere\" WorldBegin WorldEnd"),
            ParseError::MisplacedDirective { .. }
        ));
        assert!(matches!(
            load_err("WorldBegin ObjectBegin \"o\" WorldEnd"),
            ParseError::MisplacedDirective { .. }
        ));
    }

    #[test]
    fn test_scene_wide_directives_are_skipped_in_world() {
        let scene = load(&world(
            "Camera \"perspective\" \"float fov\" 30
            Film \"image\" \"integer xresolution\" 10 \"integer yresolution\" 10
            WorldBegin
            Shape \"sphere\"",
        ))
        .unwrap();

        assert!(scene.cameras.is_empty());
        assert!(scene.film.is_none());
        assert_eq!(scene.instances.len(), 1);
    }

    #[test]
    fn test_non_identifier_where_directive_expected() {
        assert!(matches!(
            load_err("\"Camera\" WorldBegin WorldEnd"),
            ParseError::UnexpectedToken { .. }
        ));
    }

    #[test]
    fn test_input_ended_unexpectedly() {
        assert_eq!(
            load_err("Camera \"perspective\""),
            ParseError::UnexpectedEof
        );
        assert_eq!(load_err("WorldBegin Translate 1 2"), ParseError::UnexpectedEof);
    }

    #[test]
    fn test_input_ended_inside_include() {
        let dir = TempDir::new("loader_include_eof");
        dir.write("partial.pbrt", "Translate 1 2");

        let err = SceneLoader::load_from_str(
            "WorldBegin Include \"partial.pbrt\"",
            dir.path(),
        )
        .unwrap_err();
        assert_eq!(
            err.root_cause().downcast_ref::<ParseError>(),
            Some(&ParseError::UnexpectedEof)
        );
    }

    #[test]
    fn test_missing_world_end() {
        assert_eq!(load_err("WorldBegin Shape \"sphere\""), ParseError::UnexpectedEof);

        let options = LoaderOptions {
            allow_missing_world_end: true,
            ..Default::default()
        };
        let scene = SceneLoader::from_text("WorldBegin Shape \"sphere\"", PathBuf::new(), options)
            .load()
            .unwrap();
        assert_eq!(scene.instances.len(), 1);
    }

    #[test]
    fn test_counters_mint_unique_names() {
        let mut counters = Counters::default();
        assert_eq!(counters.next_name(Counter::Shape), "s_0");
        assert_eq!(counters.next_name(Counter::Shape), "s_1");
        assert_eq!(counters.next_name(Counter::ShapeGroup), "sg_0");
        assert_eq!(counters.next_name(Counter::Instance), "i_0");
        assert_eq!(counters.next_name(Counter::Material), "m_0");
        assert_eq!(counters.next_name(Counter::Environment), "e_0");
        assert_eq!(counters.next_name(Counter::Texture), "t_0");
    }

    #[test]
    fn test_include_relative_to_including_file() {
        let dir = TempDir::new("loader_include");
        dir.write(
            "scene.pbrt",
            "Camera \"perspective\" WorldBegin Include \"geometry/objects.pbrt\" WorldEnd",
        );
        dir.write(
            "geometry/objects.pbrt",
            "Shape \"sphere\"\nInclude \"more/cube.pbrt\"\nShape \"sphere\"",
        );
        dir.write("geometry/more/cube.pbrt", "Shape \"cube\"");

        let scene = SceneLoader::load_from_path(dir.path().join("scene.pbrt")).unwrap();
        assert_eq!(scene.shape_groups.len(), 3);
        assert_eq!(scene.instances.len(), 3);
    }

    #[test]
    fn test_include_in_preworld() {
        let dir = TempDir::new("loader_include_preworld");
        dir.write("camera.pbrt", "LookAt 0 0 1  0 0 0  0 1 0 Camera \"perspective\"");

        let scene = SceneLoader::load_from_str(
            "Include \"camera.pbrt\" WorldBegin WorldEnd",
            dir.path(),
        )
        .unwrap();
        assert_eq!(scene.cameras.len(), 1);
    }

    #[test]
    fn test_error_reports_location() {
        let err = SceneLoader::load_from_str(
            "WorldBegin\n\nAttributeEnd\n",
            PathBuf::new(),
        )
        .unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("<string>:3"));
    }
}
