mod op;
mod serve;

use op::run_op;
use serve::run_serve;

use std::path::Path;

use anyhow::{Context, Result};
use chem_editor::SiteConfig;
use log::warn;

use crate::cli::{Cli, Command};

pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Serve(args) => run_serve(args, load_config(cli.config.as_deref())?),
        Command::Op(args) => run_op(args, load_config(cli.config.as_deref())?),
        Command::ExampleConfig => {
            print!("{}", SiteConfig::example_toml());
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<SiteConfig> {
    match path {
        Some(path) => SiteConfig::load(path)
            .with_context(|| format!("Failed to load site configuration {}", path.display())),
        None => {
            warn!("No --config given, using built-in defaults");
            Ok(SiteConfig::default())
        }
    }
}
