//! Chemical-component tool chain: `annotateComp` and `matchComp`.

use super::{Invocation, ToolOutput, ToolRunner};
use crate::config::SiteConfig;
use crate::error::Result;
use crate::io::files;
use std::path::Path;

/// Steps `annotateComp` applies to a definition before it is shown or stored.
pub const ANNOTATE_OPERATIONS: &str = "stereo-cactvs|aro-cactvs|descriptor-oe|descriptor-cactvs|\
descriptor-inchi|name-oe|name-acd|xyz-ideal-corina|xyz-model-h-oe|rename|fix";

pub fn annotate_comp(
    runner: &dyn ToolRunner,
    config: &SiteConfig,
    dir: &Path,
    input: &str,
    output: &str,
) -> Result<ToolOutput> {
    let inv = Invocation::new(config.cc_tool("annotateComp"), dir)
        .args(["-vv", "-i", input, "-op", ANNOTATE_OPERATIONS, "-o", output])
        .env(config.cc_tools_env())
        .log_to("_comp_log");
    runner.run(&inv)
}

/// Regenerates `input` in place with `annotateComp`.
///
/// Returns `false` when there was no input or the tool produced nothing,
/// leaving the input untouched.
pub fn update_comp_cif(
    runner: &dyn ToolRunner,
    config: &SiteConfig,
    dir: &Path,
    input: &str,
) -> Result<bool> {
    let input_path = dir.join(input);
    if !input_path.exists() {
        return Ok(false);
    }

    let output_path = dir.join("out.cif");
    files::remove_if_exists(&output_path)?;
    annotate_comp(runner, config, dir, input, "out.cif")?;

    if !output_path.exists() {
        return Ok(false);
    }
    files::rename(&output_path, &input_path)?;
    Ok(true)
}

/// Searches the packed dictionary for structures matching `input`, writing
/// the hit table to `output`. Any stale table is removed first.
pub fn match_comp(
    runner: &dyn ToolRunner,
    config: &SiteConfig,
    dir: &Path,
    input: &str,
    output: &str,
    option: &str,
) -> Result<Option<String>> {
    if !dir.join(input).exists() {
        return Ok(None);
    }
    let output_path = dir.join(output);
    files::remove_if_exists(&output_path)?;

    let inv = Invocation::new(config.cc_tool("matchComp"), dir)
        .arg("-i")
        .arg(input)
        .arg("-lib")
        .arg(config.cc_sdb_file())
        .arg("-index")
        .arg(config.cc_idx_file())
        .args(["-type", "structure", "-o", output, "-op", option])
        .env(config.cc_tools_env())
        .env(config.cc_dict_env())
        .log_to("_matchComp_log");
    runner.run(&inv)?;

    super::read_output(&output_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{ScriptedRunner, arg_after, args_of};
    use std::fs;
    use tempfile::TempDir;

    fn config() -> SiteConfig {
        SiteConfig::from_toml_str(
            r#"
            [tools]
            cc_apps_path = "/opt/cc"
            cc_dict_path = "/data/dict"
            "#,
        )
        .unwrap()
    }

    #[test]
    fn annotate_command_line() {
        let dir = TempDir::new().unwrap();
        let runner = ScriptedRunner::silent();
        annotate_comp(&runner, &config(), dir.path(), "in.cif", "out.cif").unwrap();

        let call = &runner.calls()[0];
        assert_eq!(call.program, Path::new("/opt/cc/bin/annotateComp"));
        assert_eq!(
            args_of(call),
            ["-vv", "-i", "in.cif", "-op", ANNOTATE_OPERATIONS, "-o", "out.cif"]
        );
        assert_eq!(call.log_file.as_deref(), Some(Path::new("_comp_log")));
        assert_eq!(call.env.get("CC_TOOLS"), Some("/opt/cc/bin"));
    }

    #[test]
    fn update_replaces_input_with_tool_output() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("in.cif"), "data_OLD\n").unwrap();
        let runner = ScriptedRunner::new(|inv| {
            fs::write(inv.cwd.join("out.cif"), "data_NEW\n").unwrap();
            ToolOutput::ok()
        });

        assert!(update_comp_cif(&runner, &config(), dir.path(), "in.cif").unwrap());
        assert_eq!(fs::read_to_string(dir.path().join("in.cif")).unwrap(), "data_NEW\n");
        assert!(!dir.path().join("out.cif").exists());
    }

    #[test]
    fn update_keeps_input_when_tool_fails() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("in.cif"), "data_OLD\n").unwrap();
        fs::write(dir.path().join("out.cif"), "stale").unwrap();
        let runner = ScriptedRunner::new(|_| ToolOutput::failed(1, "license expired"));

        assert!(!update_comp_cif(&runner, &config(), dir.path(), "in.cif").unwrap());
        assert_eq!(fs::read_to_string(dir.path().join("in.cif")).unwrap(), "data_OLD\n");
    }

    #[test]
    fn update_without_input_runs_nothing() {
        let dir = TempDir::new().unwrap();
        let runner = ScriptedRunner::silent();
        assert!(!update_comp_cif(&runner, &config(), dir.path(), "in.cif").unwrap());
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn match_uses_the_packed_dictionary() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("in.cif"), "data_X\n").unwrap();
        fs::write(dir.path().join("hits"), "stale").unwrap();
        let runner = ScriptedRunner::new(|inv| {
            let out = arg_after(inv, "-o").unwrap();
            fs::write(inv.cwd.join(out), "header\n").unwrap();
            ToolOutput::ok()
        });

        let table = match_comp(
            &runner,
            &config(),
            dir.path(),
            "in.cif",
            "hits",
            "prefilter|strict|exact",
        )
        .unwrap();
        assert_eq!(table.as_deref(), Some("header\n"));

        let call = &runner.calls()[0];
        assert_eq!(arg_after(call, "-lib").as_deref(), Some("/data/dict/Components-all-v3.sdb"));
        assert_eq!(arg_after(call, "-index").as_deref(), Some("/data/dict/Components-all-v3-r4.idx"));
        assert_eq!(arg_after(call, "-op").as_deref(), Some("prefilter|strict|exact"));
        assert_eq!(call.env.get("CC_SDB_FILE"), Some("/data/dict/Components-all-v3.sdb"));
    }

    #[test]
    fn match_without_input_runs_nothing() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("hits"), "stale").unwrap();
        let runner = ScriptedRunner::silent();

        let table = match_comp(&runner, &config(), dir.path(), "in.cif", "hits", "x").unwrap();
        assert_eq!(table, None);
        assert!(runner.calls().is_empty());
        assert_eq!(fs::read_to_string(dir.path().join("hits")).unwrap(), "stale");
    }

    #[test]
    fn match_clears_stale_output_before_running() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("in.cif"), "data_X\n").unwrap();
        fs::write(dir.path().join("hits"), "stale").unwrap();
        let runner = ScriptedRunner::silent();

        let table = match_comp(&runner, &config(), dir.path(), "in.cif", "hits", "x").unwrap();
        assert_eq!(table, None);
        assert_eq!(runner.programs(), ["matchComp"]);
        assert!(!dir.path().join("hits").exists());
    }
}
