//! The local working copy of the component dictionary.
//!
//! Definitions are hashed by their first character:
//! `<top>/<project>/<id[0]>/<id>/<id>.cif`. A definition missing from the
//! working copy is checked out on demand before giving up on it.

use crate::config::SandboxConfig;
use crate::error::Result;
use crate::io::mmcif;
use crate::model::DataBlock;
use crate::model::id::is_well_formed;
use crate::vcs::Repository;
use log::{debug, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefPaths {
    top: PathBuf,
    project: String,
}

impl RefPaths {
    pub fn new(top: impl Into<PathBuf>, project: impl Into<String>) -> Self {
        Self {
            top: top.into(),
            project: project.into(),
        }
    }

    pub fn from_config(config: &SandboxConfig) -> Self {
        Self::new(&config.top, &config.project)
    }

    pub fn top(&self) -> &Path {
        &self.top
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// `<id[0]>/<id>`, or `None` for an id that can never name a definition.
    fn hashed_dir(id: &str) -> Option<String> {
        if !is_well_formed(id) {
            return None;
        }
        let first = id.chars().next()?;
        Some(format!("{first}/{id}"))
    }

    pub fn file_dir(&self, id: &str) -> Option<PathBuf> {
        Self::hashed_dir(id).map(|d| self.top.join(&self.project).join(d))
    }

    pub fn file_path(&self, id: &str) -> Option<PathBuf> {
        self.file_dir(id).map(|d| d.join(format!("{id}.cif")))
    }

    /// Project name and the definition's path relative to the project directory.
    pub fn project_info(&self, id: &str) -> Option<(String, String)> {
        Self::hashed_dir(id).map(|d| (self.project.clone(), format!("{d}/{id}.cif")))
    }

    /// Repository module covering the definition's directory.
    pub fn module(&self, id: &str) -> Option<String> {
        Self::hashed_dir(id).map(|d| format!("{}/{}", self.project, d))
    }
}

pub struct Sandbox {
    paths: RefPaths,
    repository: Arc<dyn Repository>,
}

impl Sandbox {
    pub fn new(paths: RefPaths, repository: Arc<dyn Repository>) -> Self {
        Self { paths, repository }
    }

    pub fn paths(&self) -> &RefPaths {
        &self.paths
    }

    pub fn repository(&self) -> &dyn Repository {
        self.repository.as_ref()
    }

    /// Path of the definition for `id`, checking it out if it is not yet in
    /// the working copy. `None` when the repository does not have it either.
    pub fn file_path(&self, id: &str) -> Result<Option<PathBuf>> {
        let Some(path) = self.paths.file_path(id) else {
            return Ok(None);
        };
        if path.exists() {
            return Ok(Some(path));
        }

        if let Some(module) = self.paths.module(id) {
            debug!("{} not in sandbox, checking out {}", id, module);
            let outcome = self.repository.check_out(&module)?;
            if !outcome.ok {
                warn!("Checkout of {} failed: {}", module, outcome.text);
            }
        }

        Ok(path.exists().then_some(path))
    }

    pub fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.file_path(id)?.is_some())
    }

    /// Parsed definition for `id`, if the repository has one.
    pub fn read_block(&self, id: &str) -> Result<Option<DataBlock>> {
        match self.file_path(id)? {
            Some(path) => Ok(Some(mmcif::read_first_block(&path)?)),
            None => Ok(None),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{FakeRepository, write_definition};
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn hashed_layout() {
        let paths = RefPaths::new("/sb", "ligand-dict-v3");
        assert_eq!(
            paths.file_path("ATP").unwrap(),
            Path::new("/sb/ligand-dict-v3/A/ATP/ATP.cif")
        );
        assert_eq!(
            paths.file_dir("7ZTVU").unwrap(),
            Path::new("/sb/ligand-dict-v3/7/7ZTVU")
        );
        assert_eq!(
            paths.project_info("ATP").unwrap(),
            ("ligand-dict-v3".to_string(), "A/ATP/ATP.cif".to_string())
        );
        assert_eq!(paths.file_path(""), None);
        assert_eq!(paths.file_path("../X"), None);
    }

    #[test]
    fn present_files_need_no_checkout() {
        let dir = TempDir::new().unwrap();
        let paths = RefPaths::new(dir.path(), "proj");
        write_definition(&paths, "ATP", "data_ATP\n");
        let repo = Arc::new(FakeRepository::new(dir.path()));
        let sandbox = Sandbox::new(paths, repo.clone());

        assert!(sandbox.exists("ATP").unwrap());
        assert!(repo.commands().is_empty());
    }

    #[test]
    fn missing_files_are_checked_out() {
        let dir = TempDir::new().unwrap();
        let repo = Arc::new(FakeRepository::new(dir.path()));
        repo.seed("proj/H/HEM", "HEM.cif", "data_HEM\n_chem_comp.id HEM\n");
        let sandbox = Sandbox::new(RefPaths::new(dir.path(), "proj"), repo.clone());

        let block = sandbox.read_block("HEM").unwrap().unwrap();
        assert_eq!(block.single_value("chem_comp", "id"), "HEM");
        assert_eq!(repo.commands(), ["checkout proj/H/HEM"]);

        assert_eq!(sandbox.file_path("ZZZ").unwrap(), None);
        assert_eq!(sandbox.file_path("").unwrap(), None);
    }
}
