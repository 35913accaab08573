use std::io::{self, Write};

use anyhow::Error;

use crate::util::text::wrap;

#[rustfmt::skip]
pub fn print_error(err: &Error) {
    let mut stderr = io::stderr().lock();

    let _ = writeln!(stderr);
    let _ = writeln!(stderr, "   ╔══════════════════════════════════════════════════════════════╗");
    let _ = writeln!(stderr, "   ║  ✗ Error                                                     ║");
    let _ = writeln!(stderr, "   ╟──────────────────────────────────────────────────────────────╢");

    for line in wrap(&err.to_string(), 59) {
        let _ = writeln!(stderr, "   ║  {:<59} ║", line);
    }

    let mut source = err.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "   ╟──────────────────────────────────────────────────────────────╢");
        let _ = writeln!(stderr, "   ║  Caused by:                                                  ║");
        for line in wrap(&cause.to_string(), 57) {
            let _ = writeln!(stderr, "   ║    {:<57} ║", line);
        }
        source = cause.source();
    }

    if let Some(hints) = HintCollector::collect(err) {
        let _ = writeln!(stderr, "   ╟──────────────────────────────────────────────────────────────╢");
        let _ = writeln!(stderr, "   ║  Hints:                                                      ║");
        for hint in hints {
            let wrapped = wrap(&hint, 55);
            if let Some((first, rest)) = wrapped.split_first() {
                let _ = writeln!(stderr, "   ║    • {:<55} ║", first);
                for line in rest {
                    let _ = writeln!(stderr, "   ║      {:<55} ║", line);
                }
            }
        }
    }

    let _ = writeln!(stderr, "   ╚══════════════════════════════════════════════════════════════╝");
    let _ = writeln!(stderr);
}

struct HintCollector {
    hints: Vec<String>,
}

impl HintCollector {
    fn collect(err: &Error) -> Option<Vec<String>> {
        let mut collector = Self { hints: Vec::new() };

        if !collector.collect_editor_hints(err) {
            collector.collect_fallback_hints(err);
        }

        if collector.hints.is_empty() {
            None
        } else {
            Some(collector.hints)
        }
    }

    fn add(&mut self, hint: impl Into<String>) {
        self.hints.push(hint.into());
    }

    /// Returns `true` when the error chain carries a library error.
    fn collect_editor_hints(&mut self, err: &Error) -> bool {
        use chem_editor::Error as EditorError;

        let Some(editor_err) = err.chain().find_map(|e| e.downcast_ref::<EditorError>()) else {
            return false;
        };

        match editor_err {
            EditorError::Io { source, .. } => self.collect_std_io_hints(source),

            EditorError::Cif(cif_err) => {
                self.add("A component definition file could not be read or written");
                if let chem_editor::io::Error::Parse { line, .. } = cif_err {
                    self.add(format!("Inspect the file around line {line}"));
                    self.add("Check for unquoted values containing spaces or unbalanced loops");
                }
            }

            EditorError::Config(_) => {
                self.add("The site configuration is not valid TOML or has wrong value types");
                self.add("Run `ccdedit example-config` for a commented template");
            }

            EditorError::Spawn { program, .. } => {
                self.add(format!("Could not start {}", program.display()));
                self.add("Check the tool locations in the [tools] section of the site configuration");
            }

            EditorError::InvalidParameter { name, .. } => {
                self.add(format!("The '{name}' parameter must be a plain name without path separators"));
            }

            EditorError::Template { template, .. } => {
                self.add(format!("Check the site copy of {template} for misspelled %(key)s fields"));
            }

            EditorError::Json(_) => {
                self.add("A tool wrote output that is not valid JSON");
            }

            EditorError::Database(_) => {
                self.add("Check the [database] section and that the server is reachable");
            }

            EditorError::Notify(_) => {
                self.add("Check [notify].sendmail_program and the local mail setup");
            }
        }
        true
    }

    fn collect_std_io_hints(&mut self, source: &std::io::Error) {
        use std::io::ErrorKind;

        match source.kind() {
            ErrorKind::NotFound => {
                self.add("File or directory not found");
                self.add("Check the paths in the site configuration");
            }

            ErrorKind::PermissionDenied => {
                self.add("Permission denied accessing the file");
                self.add("The service user needs write access to the sessions and sandbox trees");
            }

            _ => {
                self.add("I/O operation failed");
                self.add("Check file path, permissions, and disk space");
            }
        }
    }

    fn collect_fallback_hints(&mut self, err: &Error) {
        let msg = error_chain_text(err);

        if msg.contains("address already in use") {
            self.add("Another process is listening on that address");
            self.add("Pick a different one with --bind");
            return;
        }

        if msg.contains("invalid socket address") || msg.contains("bind") {
            self.add("Use HOST:PORT for --bind, e.g. 127.0.0.1:8080");
            return;
        }

        if msg.contains("no such file") || msg.contains("not found") {
            self.add("Check that the file path is correct");
            self.add("Verify the file exists and is readable");
            return;
        }

        if msg.contains("permission denied") {
            self.add("Check file permissions with `ls -la`");
            self.add("Ensure you have the required access rights");
        }
    }
}

fn error_chain_text(err: &Error) -> String {
    let mut text = String::new();

    text.push_str(&err.to_string());

    let mut source = err.source();
    while let Some(cause) = source {
        text.push('\n');
        text.push_str(&cause.to_string());
        source = cause.source();
    }

    text.to_lowercase()
}
