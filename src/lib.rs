//! Translates PBRT scene descriptions into a renderer-agnostic scene graph.
//!
//! The entry point is [`SceneLoader`], which interprets the directives of a
//! `.pbrt` file (following `Include`s) and produces a [`SceneDescription`].

pub mod color;
pub mod geometry;
pub mod math;
pub mod pbrt_loader;
pub mod texture;
pub mod util;
pub mod vecmath;

pub use pbrt_loader::{
    scene_description::SceneDescription, LoaderOptions, ParseError, SceneLoader,
};
