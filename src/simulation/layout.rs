//! Folder layout of a study.
//!
//! ```text
//! <root>/preprocessing/<name>/<NAME>.DATA   decks and include files
//! <root>/output/<name>/<NAME>.*             simulator output
//! ```

use std::path::{Path, PathBuf};

use super::{RunRequest, SimulatorError};

/// Paths of every run under one output root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunLayout {
    root: PathBuf,
}

impl RunLayout {
    /// Layout rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Output root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deck folder of a run.
    pub fn preprocessing(&self, name: &str) -> PathBuf {
        self.root.join("preprocessing").join(name)
    }

    /// Output folder of a run.
    pub fn output(&self, name: &str) -> PathBuf {
        self.root.join("output").join(name)
    }

    /// Deck file of a run.
    pub fn deck(&self, name: &str) -> PathBuf {
        self.preprocessing(name).join(format!("{}.DATA", name.to_uppercase()))
    }

    /// Output case path (no extension) of a run.
    pub fn case(&self, name: &str) -> PathBuf {
        self.output(name).join(name.to_uppercase())
    }

    /// Create both folders of a run.
    pub fn create(&self, name: &str) -> Result<(), SimulatorError> {
        for dir in [self.preprocessing(name), self.output(name)] {
            std::fs::create_dir_all(&dir).map_err(|source| SimulatorError::Io { path: dir, source })?;
        }
        Ok(())
    }

    /// Simulator request for a run.
    pub fn request(&self, name: &str) -> RunRequest {
        RunRequest {
            name: name.to_string(),
            deck: self.deck(name),
            output_dir: self.output(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let layout = RunLayout::new("study");
        assert_eq!(layout.deck("site_pres_1"), Path::new("study/preprocessing/site_pres_1/SITE_PRES_1.DATA"));
        assert_eq!(layout.case("regional"), Path::new("study/output/regional/REGIONAL"));
        let r = layout.request("regional_2");
        assert_eq!(r.output_dir, Path::new("study/output/regional_2"));
    }

    #[test]
    fn test_create() {
        let dir = tempfile::tempdir().unwrap();
        let layout = RunLayout::new(dir.path());
        layout.create("reference").unwrap();
        assert!(layout.preprocessing("reference").is_dir());
        assert!(layout.output("reference").is_dir());
    }
}
