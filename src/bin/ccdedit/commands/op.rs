use std::fs;
use std::io::{self, Write};

use anyhow::{Context, Result, bail};
use chem_editor::{Request, ReturnFormat, Services, SiteConfig, Upload, dispatch};

use crate::cli::OpArgs;

pub fn run_op(args: OpArgs, config: SiteConfig) -> Result<()> {
    let mut req = Request::new(args.service_path());
    for (key, value) in &args.params {
        req.set_value(key, value.as_str());
    }
    for (key, file) in &args.upload {
        let data = fs::read(file).with_context(|| format!("Failed to read upload {file}"))?;
        req.add_upload(
            key,
            Upload {
                file_name: file.clone(),
                data,
            },
        );
    }

    let services = Services::from_config(config);
    let response = dispatch(&services, &req);

    let mut stdout = io::stdout().lock();
    match response.format() {
        ReturnFormat::Json => writeln!(stdout, "{}", response.json_string())?,
        ReturnFormat::Html => write!(stdout, "{}", response.html())?,
        ReturnFormat::Binary => {
            let Some(file) = response.binary_file() else {
                bail!("Operation {} returned no file", req.path());
            };
            writeln!(stdout, "{}", file.path.display())?;
        }
    }
    Ok(())
}
