//! Lookup of archive entries that use a component.

use crate::config::{DatabaseConfig, ToolEnv};
use crate::error::{Error, Result};
use crate::model::id::is_well_formed;
use crate::tools::{Invocation, ToolRunner};
use log::{debug, info};
use std::sync::Arc;

const ENTRIES_QUERY: &str =
    "select Structure_ID from pdbx_entity_nonpoly where comp_id = @comp_id";

fn hex(text: &str) -> String {
    text.bytes().map(|b| format!("{b:02X}")).collect()
}

pub trait EntryIndex: Send + Sync {
    /// Deposition ids of entries with a non-polymer entity of `cc_id`.
    fn entries_with_ligand(&self, cc_id: &str) -> Result<Vec<String>>;
}

/// Queries the combined internal database through the `mysql` client.
pub struct MysqlEntryIndex {
    runner: Arc<dyn ToolRunner>,
    config: DatabaseConfig,
}

impl MysqlEntryIndex {
    pub fn new(config: &DatabaseConfig, runner: Arc<dyn ToolRunner>) -> Self {
        Self {
            runner,
            config: config.clone(),
        }
    }
}

impl EntryIndex for MysqlEntryIndex {
    fn entries_with_ligand(&self, cc_id: &str) -> Result<Vec<String>> {
        if cc_id.is_empty() {
            return Ok(Vec::new());
        }
        if !is_well_formed(cc_id) {
            return Err(Error::invalid_parameter("ccid", cc_id));
        }

        debug!("Querying entries with ligand {}", cc_id);
        // The id is bound as a session variable from a hex literal, so the
        // statement text never contains user input.
        let bind = format!(
            "--init-command=SET @comp_id = CONVERT(X'{}' USING utf8mb4)",
            hex(cc_id)
        );
        let mut env = ToolEnv::new();
        env.set("MYSQL_PWD", &self.config.password);

        let port = self.config.port.to_string();
        let inv = Invocation::new(&self.config.mysql_program, std::env::temp_dir())
            .args(["-N", "-B", "-h", self.config.host.as_str(), "-P", port.as_str()])
            .args(["-u", self.config.user.as_str(), "-D", self.config.name.as_str()])
            .arg(bind)
            .args(["-e", ENTRIES_QUERY])
            .env(env);

        let output = self.runner.run(&inv)?;
        if !output.success {
            return Err(Error::Database(output.text()));
        }

        let entries: Vec<String> = output
            .stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect();
        info!("Got {} entries with ligand {}", entries.len(), cc_id);
        Ok(entries)
    }
}
