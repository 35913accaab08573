use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "ccdedit",
    about = "Chemical component dictionary editor service",
    version,
    before_help = crate::display::banner_for_help(),
    propagate_version = true
)]
pub struct Cli {
    /// Site configuration file (TOML)
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Serve the editor operations over HTTP
    #[command(visible_alias = "s")]
    Serve(ServeArgs),

    /// Run a single operation and print its response
    Op(OpArgs),

    /// Print a commented example site configuration
    ExampleConfig,
}

#[derive(Args)]
pub struct ServeArgs {
    /// Address to listen on (overrides [server].bind)
    #[arg(short, long, value_name = "ADDR")]
    pub bind: Option<String>,
}

#[derive(Args)]
pub struct OpArgs {
    /// Operation path, e.g. /service/chemeditor/get_ligand or just get_ligand
    #[arg(value_name = "PATH")]
    pub path: String,

    /// Request parameters
    #[arg(value_name = "KEY=VALUE", value_parser = parse_param)]
    pub params: Vec<(String, String)>,

    /// Attach a file as a multipart upload, repeatable
    #[arg(
        short,
        long,
        value_name = "KEY=FILE",
        value_parser = parse_param,
        action = clap::ArgAction::Append
    )]
    pub upload: Vec<(String, String)>,
}

impl OpArgs {
    /// The full service path for a bare operation name.
    pub fn service_path(&self) -> String {
        if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/service/chemeditor/{}", self.path)
        }
    }
}

fn parse_param(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn op_arguments() {
        let cli = Cli::try_parse_from([
            "ccdedit",
            "--config",
            "site.toml",
            "op",
            "get_ligand",
            "id=ATP",
            "cif=a=b",
            "--upload",
            "data=ATP.cif",
        ])
        .unwrap();

        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("site.toml")));
        let Command::Op(args) = cli.command else {
            panic!("expected op");
        };
        assert_eq!(args.service_path(), "/service/chemeditor/get_ligand");
        assert_eq!(
            args.params,
            [
                ("id".to_string(), "ATP".to_string()),
                ("cif".to_string(), "a=b".to_string())
            ]
        );
        assert_eq!(args.upload, [("data".to_string(), "ATP.cif".to_string())]);
    }

    #[test]
    fn full_paths_are_kept() {
        let cli = Cli::try_parse_from(["ccdedit", "op", "/service/environment/dump"]).unwrap();
        let Command::Op(args) = cli.command else {
            panic!("expected op");
        };
        assert_eq!(args.service_path(), "/service/environment/dump");
    }

    #[test]
    fn malformed_params_are_rejected() {
        assert!(Cli::try_parse_from(["ccdedit", "op", "get_ligand", "ATP"]).is_err());
        assert!(Cli::try_parse_from(["ccdedit", "op", "get_ligand", "=x"]).is_err());
    }
}
