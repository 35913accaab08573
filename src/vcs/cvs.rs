use super::{Outcome, Repository};
use crate::config::{SandboxConfig, ToolEnv};
use crate::error::Result;
use crate::tools::{Invocation, ToolRunner};
use log::{debug, warn};
use std::path::PathBuf;
use std::sync::Arc;

/// Drives the `cvs` command-line client against the sandbox checkout.
pub struct CvsRepository {
    runner: Arc<dyn ToolRunner>,
    program: PathBuf,
    root: String,
    sandbox_top: PathBuf,
    site_id: String,
}

impl CvsRepository {
    pub fn new(config: &SandboxConfig, site_id: &str, runner: Arc<dyn ToolRunner>) -> Self {
        Self {
            runner,
            program: config.cvs_program.clone(),
            root: cvs_root(config),
            sandbox_top: config.top.clone(),
            site_id: site_id.to_string(),
        }
    }

    fn run(&self, cwd: PathBuf, args: &[&str]) -> Result<Outcome> {
        // CVSROOT travels in the environment, never on the command line.
        let mut env = ToolEnv::new();
        env.set("WWPDB_SITE_ID", &self.site_id);
        env.set("CVSROOT", &self.root);

        let inv = Invocation::new(&self.program, cwd).args(args).env(env);
        let output = self.runner.run(&inv)?;
        if output.success {
            debug!("cvs {} succeeded", args.join(" "));
            Ok(Outcome::ok())
        } else {
            warn!("cvs {} failed: {}", args.join(" "), output.text());
            Ok(Outcome::failed(output.text()))
        }
    }
}

/// `:pserver:` root for a remote repository, or the bare path for a local one.
pub(crate) fn cvs_root(config: &SandboxConfig) -> String {
    if config.cvs_host.is_empty() {
        return config.cvs_path.clone();
    }
    if config.cvs_user.is_empty() {
        return format!(":pserver:{}:{}", config.cvs_host, config.cvs_path);
    }
    if config.cvs_password.is_empty() {
        return format!(
            ":pserver:{}@{}:{}",
            config.cvs_user, config.cvs_host, config.cvs_path
        );
    }
    format!(
        ":pserver:{}:{}@{}:{}",
        config.cvs_user, config.cvs_password, config.cvs_host, config.cvs_path
    )
}

impl Repository for CvsRepository {
    fn check_out(&self, module: &str) -> Result<Outcome> {
        self.run(self.sandbox_top.clone(), &["-Q", "checkout", module])
    }

    fn add(&self, project: &str, rel_path: &str) -> Result<Outcome> {
        self.run(self.sandbox_top.join(project), &["-Q", "add", rel_path])
    }

    fn commit(&self, project: &str, rel_path: &str, message: &str) -> Result<Outcome> {
        self.run(
            self.sandbox_top.join(project),
            &["-Q", "commit", "-m", message, rel_path],
        )
    }
}
