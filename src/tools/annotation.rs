//! Annotation-pack programs.

use super::{Invocation, ToolRunner, read_output};
use crate::config::SiteConfig;
use crate::error::Result;
use crate::io::files;
use log::warn;
use std::path::Path;

/// Runs the dictionary syntax check on `<id>.cif` and returns its report.
pub fn precheck_comp(
    runner: &dyn ToolRunner,
    config: &SiteConfig,
    dir: &Path,
    id: &str,
) -> Result<Option<String>> {
    let report = dir.join("precheckComp.log");
    files::remove_if_exists(&report)?;

    let cif = format!("{id}.cif");
    let inv = Invocation::new(config.annot_tool("precheckComp"), dir)
        .args(["-i", cif.as_str(), "-id", id, "-o", "precheckComp.log"])
        .env(config.annotation_env())
        .log_to("_precheckComp_log");
    runner.run(&inv)?;

    read_output(&report)
}

/// Checks the complete definition in `<id>.cif`, returning the `<id>.report` text.
pub fn check_ccd_definition(
    runner: &dyn ToolRunner,
    config: &SiteConfig,
    dir: &Path,
    id: &str,
) -> Result<Option<String>> {
    let report_name = format!("{id}.report");
    let report = dir.join(&report_name);
    files::remove_if_exists(&report)?;

    let cif = format!("{id}.cif");
    let inv = Invocation::new(config.annot_tool(&config.tools.ccd_checker), dir)
        .args([
            "-input",
            cif.as_str(),
            "-output",
            report_name.as_str(),
            "-set_ok_flag",
            "yes",
        ])
        .env(config.annotation_env())
        .env(config.cc_tools_env())
        .log_to("_checkCcd_log");
    runner.run(&inv)?;

    read_output(&report)
}

/// Pairs up atoms of two definitions, returning the `match_result` table.
pub fn get_atom_match(
    runner: &dyn ToolRunner,
    config: &SiteConfig,
    dir: &Path,
    first: &Path,
    second: &Path,
) -> Result<Option<String>> {
    let result = dir.join("match_result");
    files::remove_if_exists(&result)?;

    let inv = Invocation::new(config.annot_tool("GetAtomMatch"), dir)
        .arg("-first")
        .arg(first)
        .arg("-second")
        .arg(second)
        .args(["-output", "match_result", "-log", "logfile"])
        .env(config.annotation_env())
        .log_to("_match_log");
    runner.run(&inv)?;

    read_output(&result)
}

/// Fills coordinates missing from `in.cif` using an instance in a cc-link file.
pub fn find_missing_coordinate(
    runner: &dyn ToolRunner,
    config: &SiteConfig,
    dir: &Path,
    cclink: &Path,
    instance_id: &str,
) -> Result<()> {
    let inv = Invocation::new(config.annot_tool("FindMissingCoordinate"), dir)
        .args(["-comp", "in.cif", "-cclink"])
        .arg(cclink)
        .args(["-instanceid", instance_id, "-log", "merge_log"])
        .env(config.cc_tools_env())
        .env(config.annotation_env())
        .log_to("comp_log");
    runner.run(&inv)?;
    Ok(())
}

/// Asks the dictionary for the enumerated values of `items`.
///
/// Returns `None` when the tool wrote nothing or something other than a JSON object.
pub fn get_enumeration(
    runner: &dyn ToolRunner,
    config: &SiteConfig,
    dir: &Path,
    items: &str,
) -> Result<Option<serde_json::Map<String, serde_json::Value>>> {
    let json_path = dir.join("enumeration.json");
    files::remove_if_exists(&json_path)?;

    let inv = Invocation::new(config.annot_tool("GetEnumeration_json"), dir)
        .args(["-input", items, "-output", "enumeration.json"])
        .env(config.annotation_env())
        .log_to("get_enumeration.log");
    runner.run(&inv)?;

    let Some(text) = read_output(&json_path)? else {
        return Ok(None);
    };
    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(serde_json::Value::Object(map)) => Ok(Some(map)),
        Ok(_) => {
            warn!("{} does not hold a JSON object", json_path.display());
            Ok(None)
        }
        Err(e) => {
            warn!("Cannot decode {}: {}", json_path.display(), e);
            Ok(None)
        }
    }
}
