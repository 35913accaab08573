//! Version control of the component dictionary sandbox.

mod cvs;

pub use cvs::CvsRepository;

use crate::error::Result;

/// Result of one version-control command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Outcome {
    pub ok: bool,
    /// Client output, shown to the curator when the command failed.
    pub text: String,
}

impl Outcome {
    pub fn ok() -> Self {
        Self {
            ok: true,
            text: String::new(),
        }
    }

    pub fn failed(text: impl Into<String>) -> Self {
        Self {
            ok: false,
            text: text.into(),
        }
    }
}

/// Operations the editor needs from the dictionary repository.
///
/// Paths are relative to the sandbox top directory (`check_out`) or to a
/// project directory inside it (`add`, `commit`).
pub trait Repository: Send + Sync {
    fn check_out(&self, module: &str) -> Result<Outcome>;

    fn add(&self, project: &str, rel_path: &str) -> Result<Outcome>;

    fn commit(&self, project: &str, rel_path: &str, message: &str) -> Result<Outcome>;
}
