use std::{
    path::PathBuf,
    sync::atomic::{AtomicUsize, Ordering},
};

use eyre::Result;

use super::{scene_description::SceneDescription, ParseError, SceneLoader};

static DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Scratch directory removed on drop.
pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    pub fn new(name: &str) -> Self {
        let id = DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!(
            "pbrt-scene-{}-{}-{}",
            name,
            std::process::id(),
            id
        ));
        std::fs::create_dir_all(&path).unwrap();
        Self { path }
    }

    pub fn write(&self, rel_path: &str, contents: impl AsRef<[u8]>) {
        let path = self.path.join(rel_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }

    pub fn path(&self) -> PathBuf {
        self.path.clone()
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

pub fn load(txt: &str) -> Result<SceneDescription> {
    SceneLoader::load_from_str(txt, PathBuf::new())
}

pub fn load_err(txt: &str) -> ParseError {
    let err = load(txt).unwrap_err();
    match err.root_cause().downcast_ref::<ParseError>() {
        Some(e) => e.clone(),
        None => panic!("Unexpected error: {err:#}"),
    }
}

/// Wraps directives in a world block.
pub fn world(body: &str) -> String {
    format!("WorldBegin\n{body}\nWorldEnd\n")
}
