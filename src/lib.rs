//! Service backend for curating the Chemical Component Dictionary (CCD).
//! It stages editor requests in per-request session directories, drives the external
//! cheminformatics and annotation tools over them, and checks finished definitions
//! into the dictionary's version-controlled sandbox.
//!
//! # Features
//!
//! - **Operation dispatch**: a fixed table of `/service/...` paths, each mapped to a
//!   handler that returns a JSON dictionary, an HTML fragment or a file download
//! - **Check-in pipeline**: id checks, syntax and definition checks, duplicate search,
//!   audit-trail merge and repository commit, stopping at the first failure
//! - **Tool invocation**: external programs run without a shell, with their
//!   environment derived from the site configuration
//! - **mmCIF I/O**: reading and writing the component definition files the tools exchange
//!
//! # Quick Start
//!
//! Handlers are reached through [`dispatch`] with a [`Services`] bundle built from a
//! [`SiteConfig`]:
//!
//! ```no_run
//! use chem_editor::{Request, Services, SiteConfig, dispatch};
//!
//! let config = SiteConfig::load("site.toml".as_ref())?;
//! let services = Services::from_config(config);
//!
//! let req = Request::new("/service/chemeditor/get_ligand").with_param("id", "ATP");
//! let response = dispatch(&services, &req);
//! println!("{}", response.json_string());
//! # Ok::<(), chem_editor::Error>(())
//! ```
//!
//! Component files can be handled directly:
//!
//! ```
//! use chem_editor::io::mmcif;
//!
//! let text = "data_ATP\n_chem_comp.id ATP\n_chem_comp.pdbx_release_status REL\n";
//! let blocks = mmcif::read(text.as_bytes())?;
//! assert_eq!(blocks[0].single_value("chem_comp", "pdbx_release_status"), "REL");
//! # Ok::<(), chem_editor::io::Error>(())
//! ```
//!
//! # Module Organization
//!
//! - [`ops`]: dispatch table and request handlers
//! - [`commit`]: the check-in pipeline behind `cvs_commit`
//! - [`tools`]: external program invocation and the wrappers for each tool
//! - [`sandbox`] / [`vcs`]: the dictionary working copy and its repository
//! - [`io`]: mmCIF, match tables and small file helpers
//! - [`config`]: site configuration and tool environments

pub mod commit;
pub mod config;
pub mod entries;
pub mod io;
pub mod model;
pub mod notify;
pub mod ops;
pub mod request;
pub mod response;
pub mod sandbox;
pub mod session;
pub mod template;
pub mod tools;
pub mod vcs;

mod error;

pub use config::SiteConfig;
pub use error::{Error, Result};
pub use model::{Category, DataBlock};
pub use ops::{Services, dispatch};
pub use request::{Request, Upload};
pub use response::{Response, ReturnFormat};
pub use session::Session;
