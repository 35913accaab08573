//! Per-request scratch directories.

use crate::error::{Error, Result};
use crate::io::files;
use log::debug;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: String,
    path: PathBuf,
}

impl Session {
    /// Joins the session named by `requested_id`, or starts a new one when it
    /// is empty. The directory is created if needed.
    pub fn open(sessions_dir: &Path, requested_id: &str) -> Result<Self> {
        let id = if requested_id.is_empty() {
            Uuid::new_v4().to_string()
        } else if is_valid_id(requested_id) {
            requested_id.to_string()
        } else {
            return Err(Error::invalid_parameter("sessionid", requested_id));
        };

        let path = sessions_dir.join(&id);
        files::create_dir_all(&path)?;
        debug!("Using session {} at {}", id, path.display());

        Ok(Self { id, path })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Web-visible path of the session directory.
    pub fn relative_path(&self) -> String {
        format!("/sessions/{}", self.id)
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// Accepts a request value used as a single path component.
pub fn safe_component<'a>(param: &str, name: &'a str) -> Result<&'a str> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
        return Err(Error::invalid_parameter(param, name));
    }
    Ok(name)
}

/// Accepts a relative sub-path made only of safe components.
pub fn safe_subpath(param: &str, subpath: &str) -> Result<PathBuf> {
    let mut out = PathBuf::new();
    for part in subpath.split('/').filter(|p| !p.is_empty()) {
        out.push(safe_component(param, part).map_err(|_| Error::invalid_parameter(param, subpath))?);
    }
    Ok(out)
}
