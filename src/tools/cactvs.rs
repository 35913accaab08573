//! 2D layout through the CACTVS shell.

use super::{Invocation, Stdin, ToolRunner, read_output};
use crate::config::{SiteConfig, ToolEnv};
use crate::error::Result;
use crate::io::files;
use std::path::Path;

/// CACTVS script reading `in.sdf` and writing a 2D `out.sdf` with stereo
/// perceived. With `add_hydrogens`, implicit hydrogens are made explicit.
pub fn cactvs_2d_script(add_hydrogens: bool) -> String {
    let mut script = String::from("set ehandle [molfile read in.sdf]\n");
    if add_hydrogens {
        script.push_str("ens hadd $ehandle\n");
    }
    for line in [
        "ens need $ehandle E_NATOMS recalc",
        "ens lock $ehandle E_NATOMS",
        "ens need $ehandle {A_SYMBOL A_FREE_ELECTRONS A_XY A_ELEMENT} nofunc",
        "ens lock $ehandle {E_STDBLE A_ELEMENT A_NOM_CHARGE A_CIPSTEREO A_DLSTEREO B_CIPSTEREO B_CTSTEREO}",
        "ens need $ehandle {A_LABSTEREO A_CIPSTEREO A_DLSTEREO} recalc",
        "ens lock $ehandle {A_LABSTEREO A_CIPSTEREO A_DLSTEREO}",
        "ens need $ehandle {B_LABSTEREO B_CIPSTEREO B_CTSTEREO} recalc",
        "ens lock $ehandle {B_LABSTEREO B_CIPSTEREO B_CTSTEREO}",
        "set whandle [molfile open out.sdf w format sdf valencelevel 1]",
        "molfile write $whandle $ehandle",
        "molfile close $whandle",
    ] {
        script.push_str(line);
        script.push('\n');
    }
    script
}

/// Lays out `in.sdf` in `dir` and returns the resulting `out.sdf`, if any.
pub fn cactvs_2d(
    runner: &dyn ToolRunner,
    config: &SiteConfig,
    dir: &Path,
    add_hydrogens: bool,
) -> Result<Option<String>> {
    let script = dir.join("script");
    files::write_text(&script, &cactvs_2d_script(add_hydrogens))?;
    let out = dir.join("out.sdf");
    files::remove_if_exists(&out)?;

    let mut env = ToolEnv::new();
    env.set("WWPDB_SITE_ID", &config.site_id);
    env.set_path("CACTVS_ROOT", &config.tools.cactvs_dir);

    let inv = Invocation::new(config.cactvs_shell(), dir)
        .arg("-d")
        .env(env)
        .stdin(Stdin::File(script))
        .log_to("get2d_log");
    runner.run(&inv)?;

    read_output(&out)
}
