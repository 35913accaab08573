use std::sync::Arc;

use anyhow::{Context, Result};
use chem_editor::{Services, SiteConfig};

use crate::cli::ServeArgs;
use crate::display;
use crate::server;

pub fn run_serve(args: ServeArgs, config: SiteConfig) -> Result<()> {
    let bind = args.bind.unwrap_or_else(|| config.server.bind.clone());
    if crate::util::stderr_is_tty() {
        display::print_banner(&config.site_id, &bind);
    }

    let services = Arc::new(Services::from_config(config));
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?;
    runtime.block_on(server::run(services, &bind))
}
