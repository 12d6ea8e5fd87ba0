use eyre::{eyre, Result};
use lexopt::{
    Arg::{Long, Short, Value},
    ValueExt,
};
use pbrt_scene::{util, LoaderOptions, SceneDescription, SceneLoader};
use tracing::Level;

#[derive(Debug, Default)]
pub struct CmdArgs {
    scene_path: Option<String>,
    recompute_normals: bool,
    allow_missing_world_end: bool,
    verbose: bool,
}

fn parse_cmdargs() -> Result<CmdArgs> {
    let mut cmdargs = CmdArgs::default();

    let mut parser = lexopt::Parser::from_env();
    while let Some(arg) = parser.next()? {
        match arg {
            Short('s') | Long("scene") => {
                cmdargs.scene_path = Some(parser.value()?.parse()?);
            }
            Value(path) if cmdargs.scene_path.is_none() => {
                cmdargs.scene_path = Some(path.parse()?);
            }
            Short('n') | Long("recompute-normals") => {
                cmdargs.recompute_normals = true;
            }
            Short('w') | Long("allow-missing-world-end") => {
                cmdargs.allow_missing_world_end = true;
            }
            Short('v') | Long("verbose") => {
                cmdargs.verbose = true;
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    Ok(cmdargs)
}

fn print_summary(scene: &SceneDescription) {
    if let Some(film) = &scene.film {
        println!(
            "Film: {}x{} -> {}",
            film.xresolution, film.yresolution, film.filename
        );
    }

    for cam in &scene.cameras {
        println!(
            "Camera {}: yfov {:.1}°, aspect {:.3}, focus {:.3}",
            cam.name,
            cam.yfov.to_degrees(),
            cam.aspect,
            cam.focus
        );
    }

    let (triangles, quads, vertices) =
        scene
            .shape_groups
            .iter()
            .flat_map(|g| &g.shapes)
            .fold((0, 0, 0), |(t, q, v), s| {
                (
                    t + s.mesh.triangles.len(),
                    q + s.mesh.quads.len(),
                    v + s.mesh.vertex_count(),
                )
            });

    println!(
        "Shape groups: {} ({} triangles, {} quads, {} vertices)",
        scene.shape_groups.len(),
        triangles,
        quads,
        vertices
    );
    println!("Instances: {}", scene.instances.len());
    println!("Materials: {}", scene.materials.len());
    println!("Textures: {}", scene.textures.len());
    println!("Environments: {}", scene.environments.len());
}

fn main() -> Result<()> {
    let cmdargs = parse_cmdargs()?;

    let level = if cmdargs.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let scene_path = cmdargs
        .scene_path
        .ok_or_else(|| eyre!("No scene file given, use --scene <path>"))?;

    let options = LoaderOptions {
        always_recompute_normals: cmdargs.recompute_normals,
        allow_missing_world_end: cmdargs.allow_missing_world_end,
        ..Default::default()
    };

    let scene = util::timed_scope("Scene loading", || {
        SceneLoader::open(&scene_path, options)?.load()
    })?;

    print_summary(&scene);
    Ok(())
}
