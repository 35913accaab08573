//! External program invocation.
//!
//! Every chemistry operation is delegated to an installed binary. An
//! [`Invocation`] describes one run (program, arguments, environment,
//! working directory and where output goes) and a [`ToolRunner`] executes
//! it. Arguments are passed as a vector, never through a shell.

mod annotation;
mod cactvs;
mod cc;

pub use annotation::{
    check_ccd_definition, find_missing_coordinate, get_atom_match, get_enumeration, precheck_comp,
};
pub use cactvs::{cactvs_2d, cactvs_2d_script};
pub use cc::{ANNOTATE_OPERATIONS, annotate_comp, match_comp, update_comp_cif};

use crate::config::ToolEnv;
use crate::error::{Error, Result};
use log::{debug, warn};
use std::ffi::OsString;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Stdin {
    #[default]
    Null,
    File(PathBuf),
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub env: ToolEnv,
    pub cwd: PathBuf,
    /// File (relative to `cwd`) receiving merged stdout and stderr. When
    /// unset, both streams are captured in the [`ToolOutput`].
    pub log_file: Option<PathBuf>,
    pub stdin: Stdin,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: ToolEnv::new(),
            cwd: cwd.into(),
            log_file: None,
            stdin: Stdin::Null,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, env: ToolEnv) -> Self {
        self.env = self.env.merge(env);
        self
    }

    pub fn log_to(mut self, name: impl Into<PathBuf>) -> Self {
        self.log_file = Some(name.into());
        self
    }

    pub fn stdin(mut self, stdin: Stdin) -> Self {
        self.stdin = stdin;
        self
    }

    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }

    /// Human-readable command line, for logs only.
    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        if let Some(log) = &self.log_file {
            line.push_str(&format!(" > {} 2>&1", log.display()));
        }
        line
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn ok() -> Self {
        Self {
            success: true,
            code: Some(0),
            ..Self::default()
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Captured stdout and stderr, for diagnostics handed back to the user.
    pub fn text(&self) -> String {
        let mut text = self.stdout.trim_end().to_string();
        let err = self.stderr.trim_end();
        if !err.is_empty() {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(err);
        }
        text
    }
}

pub trait ToolRunner: Send + Sync {
    /// Runs the program to completion. A non-zero exit status is reported in
    /// the output, not as an error; only failing to start the program is.
    fn run(&self, invocation: &Invocation) -> Result<ToolOutput>;
}

/// Runs programs as child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ToolRunner for ProcessRunner {
    fn run(&self, inv: &Invocation) -> Result<ToolOutput> {
        debug!("Running: {} (in {})", inv.command_line(), inv.cwd.display());

        let spawn_error = |source| Error::Spawn {
            program: inv.program.clone(),
            source,
        };

        let mut cmd = Command::new(&inv.program);
        cmd.args(&inv.args).current_dir(&inv.cwd);
        for (name, value) in inv.env.iter() {
            cmd.env(name, value);
        }

        match &inv.log_file {
            Some(name) => {
                let path = inv.cwd.join(name);
                let out = File::create(&path).map_err(|e| Error::io(&path, e))?;
                let err = out.try_clone().map_err(|e| Error::io(&path, e))?;
                cmd.stdout(out).stderr(err);
            }
            None => {
                cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
            }
        }

        match &inv.stdin {
            Stdin::Null => {
                cmd.stdin(Stdio::null());
            }
            Stdin::File(path) => {
                let file = File::open(path).map_err(|e| Error::io(path, e))?;
                cmd.stdin(file);
            }
            Stdin::Bytes(_) => {
                cmd.stdin(Stdio::piped());
            }
        }

        let mut child = cmd.spawn().map_err(spawn_error)?;
        let feed = match &inv.stdin {
            Stdin::Bytes(bytes) => child.stdin.take().map(|pipe| (pipe, bytes.as_slice())),
            _ => None,
        };

        // stdin is fed from its own thread while the piped output is drained.
        let output = thread::scope(|scope| {
            let feeder = feed.map(|(mut pipe, bytes)| scope.spawn(move || pipe.write_all(bytes)));
            let output = child.wait_with_output();
            if let Some(Ok(Err(e))) = feeder.map(|handle| handle.join()) {
                warn!("{} did not read all of its input: {}", inv.program_name(), e);
            }
            output
        })
        .map_err(spawn_error)?;
        if !output.status.success() {
            warn!("{} exited with {}", inv.program_name(), output.status);
        }

        Ok(ToolOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

pub(crate) fn read_output(path: &Path) -> Result<Option<String>> {
    crate::io::files::read_if_exists(path)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    type Script = dyn Fn(&Invocation) -> ToolOutput + Send + Sync;

    /// Records every invocation and answers with a scripted closure, which
    /// may also create the files a real tool would have written.
    pub struct ScriptedRunner {
        script: Box<Script>,
        calls: Mutex<Vec<Invocation>>,
    }

    impl ScriptedRunner {
        pub fn new<F>(script: F) -> Self
        where
            F: Fn(&Invocation) -> ToolOutput + Send + Sync + 'static,
        {
            Self {
                script: Box::new(script),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn silent() -> Self {
            Self::new(|_| ToolOutput::ok())
        }

        pub fn calls(&self) -> Vec<Invocation> {
            self.calls.lock().unwrap().clone()
        }

        pub fn programs(&self) -> Vec<String> {
            self.calls().iter().map(Invocation::program_name).collect()
        }
    }

    impl ToolRunner for ScriptedRunner {
        fn run(&self, invocation: &Invocation) -> Result<ToolOutput> {
            self.calls.lock().unwrap().push(invocation.clone());
            Ok((self.script)(invocation))
        }
    }

    /// Value following `flag` in the argument list.
    pub fn arg_after(inv: &Invocation, flag: &str) -> Option<String> {
        inv.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| inv.args.get(i + 1))
            .map(|a| a.to_string_lossy().into_owned())
    }

    pub fn args_of(inv: &Invocation) -> Vec<String> {
        inv.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn log_file_receives_both_streams() {
        let dir = TempDir::new().unwrap();
        let inv = Invocation::new("/bin/sh", dir.path())
            .args(["-c", "echo to-out; echo to-err 1>&2; exit 3"])
            .log_to("_run_log");

        let out = ProcessRunner.run(&inv).unwrap();
        assert!(!out.success);
        assert_eq!(out.code, Some(3));

        let log = std::fs::read_to_string(dir.path().join("_run_log")).unwrap();
        assert!(log.contains("to-out"));
        assert!(log.contains("to-err"));
    }

    #[test]
    fn environment_and_stdin_reach_the_child() {
        let dir = TempDir::new().unwrap();
        let mut env = ToolEnv::new();
        env.set("WWPDB_SITE_ID", "PDBJ");
        let inv = Invocation::new("/bin/sh", dir.path())
            .args(["-c", "read line; echo \"$WWPDB_SITE_ID $line\""])
            .env(env)
            .stdin(Stdin::Bytes(b"hello\n".to_vec()));

        let out = ProcessRunner.run(&inv).unwrap();
        assert!(out.success);
        assert_eq!(out.stdout.trim(), "PDBJ hello");
    }

    #[test]
    fn large_stdin_with_piped_output_completes() {
        let dir = TempDir::new().unwrap();
        let message = "x".repeat(1 << 20);
        let inv = Invocation::new("/bin/sh", dir.path())
            .args(["-c", "cat"])
            .stdin(Stdin::Bytes(message.clone().into_bytes()));

        let out = ProcessRunner.run(&inv).unwrap();
        assert!(out.success);
        assert_eq!(out.stdout.len(), message.len());
    }

    #[test]
    fn child_ignoring_stdin_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let inv = Invocation::new("/bin/sh", dir.path())
            .args(["-c", "exit 0"])
            .stdin(Stdin::Bytes(vec![b'x'; 1 << 20]));

        let out = ProcessRunner.run(&inv).unwrap();
        assert!(out.success);
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let dir = TempDir::new().unwrap();
        let inv = Invocation::new(dir.path().join("no-such-tool"), dir.path());
        assert!(matches!(
            ProcessRunner.run(&inv),
            Err(Error::Spawn { .. })
        ));
    }

    #[test]
    fn command_line_is_readable() {
        let inv = Invocation::new("/opt/cc/bin/matchComp", "/tmp")
            .args(["-i", "in.cif"])
            .log_to("_matchComp_log");
        assert_eq!(
            inv.command_line(),
            "/opt/cc/bin/matchComp -i in.cif > _matchComp_log 2>&1"
        );
        assert_eq!(inv.program_name(), "matchComp");
    }
}
