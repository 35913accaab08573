//! Site configuration.
//!
//! A deployment describes where sessions, the CCD sandbox and the external
//! tool installations live in a single TOML file. Every key has a default so
//! a partial file (or an empty one, in tests) still yields a usable value.

mod env;

pub use env::ToolEnv;

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_SITE_TOML: &str = include_str!("../../resources/default.site.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_site_id")]
    pub site_id: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub sandbox: SandboxConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

fn default_site_id() -> String {
    "WWPDB_DEV".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_sessions_top")]
    pub sessions_top: PathBuf,
    #[serde(default = "default_web_apps_top")]
    pub web_apps_top: PathBuf,
    #[serde(default = "default_unused_codes_file")]
    pub unused_codes_file: PathBuf,
}

fn default_sessions_top() -> PathBuf {
    PathBuf::from("/wwpdb/webapps/htdocs")
}
fn default_web_apps_top() -> PathBuf {
    PathBuf::from("/wwpdb/webapps")
}
fn default_unused_codes_file() -> PathBuf {
    PathBuf::from("/wwpdb/reference/id_codes/unusedCodes.list")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            sessions_top: default_sessions_top(),
            web_apps_top: default_web_apps_top(),
            unused_codes_file: default_unused_codes_file(),
        }
    }
}

/// Local CVS working copy of the component dictionary and the repository
/// it was checked out from.
#[derive(Debug, Clone, Deserialize)]
pub struct SandboxConfig {
    #[serde(default = "default_sandbox_top")]
    pub top: PathBuf,
    #[serde(default = "default_project")]
    pub project: String,
    /// Empty for a repository on the local filesystem.
    #[serde(default)]
    pub cvs_host: String,
    #[serde(default = "default_cvs_path")]
    pub cvs_path: String,
    #[serde(default)]
    pub cvs_user: String,
    #[serde(default)]
    pub cvs_password: String,
    #[serde(default = "default_cvs_program")]
    pub cvs_program: PathBuf,
}

fn default_sandbox_top() -> PathBuf {
    PathBuf::from("/wwpdb/reference/components")
}
fn default_project() -> String {
    "ligand-dict-v3".to_string()
}
fn default_cvs_path() -> String {
    "/cvs-ligands".to_string()
}
fn default_cvs_program() -> PathBuf {
    PathBuf::from("cvs")
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            top: default_sandbox_top(),
            project: default_project(),
            cvs_host: String::new(),
            cvs_path: default_cvs_path(),
            cvs_user: String::new(),
            cvs_password: String::new(),
            cvs_program: default_cvs_program(),
        }
    }
}

/// Installation roots of the external cheminformatics packages.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub cc_apps_path: PathBuf,
    pub annot_tools_path: PathBuf,
    pub cc_cvs_path: PathBuf,
    pub cc_dict_path: PathBuf,
    pub local_apps_path: PathBuf,
    pub oe_dir: PathBuf,
    pub oe_license: PathBuf,
    pub acd_dir: PathBuf,
    pub cactvs_dir: PathBuf,
    pub corina_dir: PathBuf,
    pub babel_dir: PathBuf,
    pub babel_datadir: PathBuf,
    pub babel_lib: PathBuf,
    pub inchi_dir: PathBuf,
    /// Program (under the annotation tools `bin/`) checking a full CCD definition.
    pub ccd_checker: String,
}

fn default_ccd_checker() -> String {
    "CheckCcdDefinition".to_string()
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            cc_apps_path: PathBuf::new(),
            annot_tools_path: PathBuf::new(),
            cc_cvs_path: PathBuf::new(),
            cc_dict_path: PathBuf::new(),
            local_apps_path: PathBuf::new(),
            oe_dir: PathBuf::new(),
            oe_license: PathBuf::new(),
            acd_dir: PathBuf::new(),
            cactvs_dir: PathBuf::new(),
            corina_dir: PathBuf::new(),
            babel_dir: PathBuf::new(),
            babel_datadir: PathBuf::new(),
            babel_lib: PathBuf::new(),
            inchi_dir: PathBuf::new(),
            ccd_checker: default_ccd_checker(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_host")]
    pub host: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_db_name")]
    pub name: String,
    #[serde(default = "default_mysql_program")]
    pub mysql_program: PathBuf,
}

fn default_db_host() -> String {
    "localhost".to_string()
}
fn default_db_port() -> u16 {
    3306
}
fn default_db_name() -> String {
    "da_internal_combine".to_string()
}
fn default_mysql_program() -> PathBuf {
    PathBuf::from("mysql")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: default_db_host(),
            port: default_db_port(),
            user: String::new(),
            password: String::new(),
            name: default_db_name(),
            mysql_program: default_mysql_program(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotifyConfig {
    #[serde(default = "default_sendmail_program")]
    pub sendmail_program: PathBuf,
    #[serde(default = "default_mail_from")]
    pub from: String,
    #[serde(default)]
    pub to: Vec<String>,
    /// Remaining-code counts at which a warning mail goes out.
    #[serde(default = "default_thresholds")]
    pub thresholds: Vec<usize>,
}

fn default_sendmail_program() -> PathBuf {
    PathBuf::from("/usr/sbin/sendmail")
}
fn default_mail_from() -> String {
    "noreply@wwpdb.org".to_string()
}
fn default_thresholds() -> Vec<usize> {
    vec![500, 250, 100, 50, 25, 10, 5, 4, 2, 1]
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            sendmail_program: default_sendmail_program(),
            from: default_mail_from(),
            to: Vec::new(),
            thresholds: default_thresholds(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site_id: default_site_id(),
            paths: PathsConfig::default(),
            sandbox: SandboxConfig::default(),
            tools: ToolsConfig::default(),
            database: DatabaseConfig::default(),
            notify: NotifyConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl SiteConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_toml_str(&text)
    }

    /// The commented example configuration shipped with the crate.
    pub fn example_toml() -> &'static str {
        DEFAULT_SITE_TOML
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.paths.sessions_top.join("sessions")
    }

    pub fn template_dir(&self) -> PathBuf {
        self.paths.web_apps_top.join("htdocs").join("chemeditor")
    }

    pub fn cc_tool(&self, name: &str) -> PathBuf {
        self.tools.cc_apps_path.join("bin").join(name)
    }

    pub fn annot_tool(&self, name: &str) -> PathBuf {
        self.tools.annot_tools_path.join("bin").join(name)
    }

    pub fn cactvs_shell(&self) -> PathBuf {
        self.tools.cactvs_dir.join("csts")
    }

    fn base_env(&self) -> ToolEnv {
        let mut env = ToolEnv::new();
        env.set("WWPDB_SITE_ID", &self.site_id);
        env
    }

    /// Variables expected by the chemical-component tool chain (annotateComp, matchComp).
    pub fn cc_tools_env(&self) -> ToolEnv {
        let t = &self.tools;
        let ld_library_path = format!(
            "{}:{}:{}",
            t.babel_lib.display(),
            t.local_apps_path.join("lib").display(),
            t.acd_dir.display()
        );

        let mut env = self.base_env();
        env.set_path("CC_TOOLS", &t.cc_apps_path.join("bin"));
        env.set_path("OE_DIR", &t.oe_dir);
        env.set_path("OE_LICENSE", &t.oe_license);
        env.set_path("ACD_DIR", &t.acd_dir);
        env.set_path("CACTVS_DIR", &t.cactvs_dir);
        env.set_path("CORINA_DIR", &t.corina_dir.join("bin"));
        env.set_path("BABEL_DIR", &t.babel_dir);
        env.set_path("BABEL_DATADIR", &t.babel_datadir);
        env.set_path("INCHI_DIR", &t.inchi_dir);
        env.set("LD_LIBRARY_PATH", ld_library_path);
        env
    }

    /// Variables expected by the annotation tools (precheckComp, GetAtomMatch, ...).
    pub fn annotation_env(&self) -> ToolEnv {
        let t = &self.tools;
        let mut env = self.base_env();
        env.set_path("RCSBROOT", &t.annot_tools_path);
        env.set_path("COMP_PATH", &t.cc_cvs_path);
        env.set_path("BINPATH", &t.annot_tools_path.join("bin"));
        env
    }

    pub fn cc_idx_file(&self) -> PathBuf {
        self.tools.cc_dict_path.join("Components-all-v3-r4.idx")
    }

    pub fn cc_sdb_file(&self) -> PathBuf {
        self.tools.cc_dict_path.join("Components-all-v3.sdb")
    }

    /// Locations of the packed component dictionary used for structure searches.
    pub fn cc_dict_env(&self) -> ToolEnv {
        let mut env = self.base_env();
        env.set_path("CC_DICT", &self.tools.cc_dict_path);
        env.set_path("CC_IDX_FILE", &self.cc_idx_file());
        env.set_path("CC_SDB_FILE", &self.cc_sdb_file());
        env
    }
}
