use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Clone)]
pub struct Filesystem {
    root: PathBuf,
}

impl Filesystem {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Image files directly inside `dir` (relative to the root), sorted by path.
    pub fn images_in(&self, dir: &str) -> Vec<PathBuf> {
        let mut files: Vec<_> = WalkDir::new(self.root.join(dir))
            .max_depth(1)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                let path = entry.path();
                let ext = path.extension()?.to_str()?.to_lowercase();
                matches!(ext.as_str(), "png" | "jpg" | "jpeg").then(|| path.to_path_buf())
            })
            .collect();
        files.sort();
        files
    }
}
