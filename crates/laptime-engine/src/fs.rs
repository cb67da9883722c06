use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::companion::CompanionArtifact;
use crate::host::ArtifactEmitter;

/// Writes companion artifacts as source files under a root directory.
///
/// `shapes::CircleAutogenerate` lands in `<root>/shapes/circle_autogenerate.rs`.
/// Files are created, never overwritten: an existing file is an error.
#[derive(Debug)]
pub struct FileEmitter {
    root: PathBuf,
    written: Vec<PathBuf>,
}

impl FileEmitter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            written: Vec::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Files written so far, in emission order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    pub fn path_for(&self, artifact: &CompanionArtifact) -> PathBuf {
        let mut path = self.root.clone();
        path.extend(&artifact.namespace);
        path.push(format!("{}.rs", artifact.file_stem()));
        path
    }
}

impl ArtifactEmitter for FileEmitter {
    fn emit(&mut self, artifact: &CompanionArtifact) -> io::Result<()> {
        let path = self.path_for(artifact);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().write(true).create_new(true).open(&path)?;
        file.write_all(artifact.render().as_bytes())?;
        file.flush()?;

        debug!(path = %path.display(), "wrote companion artifact");
        self.written.push(path);
        Ok(())
    }
}
