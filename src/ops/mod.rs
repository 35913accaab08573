//! Service operations and the path → handler table.
//!
//! Handlers share one [`Services`] bundle holding the site configuration and
//! the external collaborators (tool runner, dictionary sandbox, notifier,
//! entry index). Each handler maps one request to one [`Response`]; the
//! dispatcher turns handler errors into an `Operation failure` response so
//! nothing escapes to the transport layer.

mod curation;
mod editor;
mod ligand;

use crate::config::SiteConfig;
use crate::entries::{EntryIndex, MysqlEntryIndex};
use crate::error::Result;
use crate::notify::{Notifier, SendmailNotifier};
use crate::request::Request;
use crate::response::Response;
use crate::sandbox::{RefPaths, Sandbox};
use crate::session::Session;
use crate::tools::{ProcessRunner, ToolRunner};
use crate::vcs::{CvsRepository, Repository};
use log::{debug, error};
use std::sync::{Arc, Mutex};

/// Everything a handler needs besides the request.
pub struct Services {
    pub config: SiteConfig,
    pub runner: Arc<dyn ToolRunner>,
    pub sandbox: Sandbox,
    pub notifier: Arc<dyn Notifier>,
    pub entries: Arc<dyn EntryIndex>,
    /// Serialises reads and rewrites of the unused-codes list.
    code_lock: Mutex<()>,
}

impl Services {
    pub fn new(
        config: SiteConfig,
        runner: Arc<dyn ToolRunner>,
        repository: Arc<dyn Repository>,
        notifier: Arc<dyn Notifier>,
        entries: Arc<dyn EntryIndex>,
    ) -> Self {
        let sandbox = Sandbox::new(RefPaths::from_config(&config.sandbox), repository);
        Self {
            config,
            runner,
            sandbox,
            notifier,
            entries,
            code_lock: Mutex::new(()),
        }
    }

    /// Wires the production collaborators: real processes, the CVS client,
    /// `sendmail` and the `mysql` client.
    pub fn from_config(config: SiteConfig) -> Self {
        let runner: Arc<dyn ToolRunner> = Arc::new(ProcessRunner);
        let repository = Arc::new(CvsRepository::new(
            &config.sandbox,
            &config.site_id,
            runner.clone(),
        ));
        let notifier = Arc::new(SendmailNotifier::new(
            &config.notify,
            &config.site_id,
            runner.clone(),
        ));
        let entries = Arc::new(MysqlEntryIndex::new(&config.database, runner.clone()));
        Self::new(config, runner, repository, notifier, entries)
    }

    /// Joins or creates the session named by the request's `sessionid`.
    pub fn session(&self, req: &Request) -> Result<Session> {
        Session::open(&self.config.sessions_dir(), req.value("sessionid"))
    }
}

type Handler = fn(&Services, &Request) -> Result<Response>;

const ROUTES: &[(&str, Handler)] = &[
    ("/service/environment/dump", editor::dump),
    ("/service/chemeditor/get_2d", editor::get_2d),
    ("/service/chemeditor/upload", editor::upload),
    ("/service/chemeditor/get_ligand", ligand::get_ligand),
    ("/service/chemeditor/search", ligand::search),
    ("/service/chemeditor/atom_match", editor::atom_match),
    ("/service/chemeditor/echo_file", editor::echo_file),
    ("/service/chemeditor/get_new_code", ligand::get_new_code),
    ("/service/chemeditor/status_code", ligand::status_code),
    ("/service/chemeditor/one_letter_code", ligand::one_letter_code),
    ("/service/chemeditor/update", curation::update),
    ("/service/chemeditor/save_component", curation::save_component),
    ("/service/chemeditor/cvs_commit", curation::cvs_commit),
    ("/service/chemeditor/get_enumeration", ligand::get_enumeration),
    (
        "/service/chemeditor/get_entries_with_ligand",
        ligand::get_entries_with_ligand,
    ),
];

/// Paths served by [`dispatch`].
pub fn operation_paths() -> impl Iterator<Item = &'static str> {
    ROUTES.iter().map(|(path, _)| *path)
}

/// Runs the operation named by the request path.
pub fn dispatch(services: &Services, req: &Request) -> Response {
    let Some((_, handler)) = ROUTES.iter().find(|(path, _)| *path == req.path()) else {
        let mut response = Response::json();
        response.set_error("Unknown operation");
        return response;
    };

    debug!("Dispatching {}", req.path());
    match handler(services, req) {
        Ok(response) => response,
        Err(e) => {
            error!("Operation {} failed: {}", req.path(), e);
            Response::operation_failure()
        }
    }
}

/// JSON response carrying `textcontent`, or the `failed` error when `text` is empty.
fn text_or_failed(text: &str) -> Response {
    let mut response = Response::json();
    if text.is_empty() {
        response.set_error("failed");
    } else {
        response.set_text(text);
    }
    response
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::entries::MysqlEntryIndex;
    use crate::notify::testing::RecordingNotifier;
    use crate::sandbox::testing::FakeRepository;
    use crate::tools::testing::ScriptedRunner;
    use crate::tools::{Invocation, ToolOutput};
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Services rooted in a temporary directory, with scripted tools, a fake
    /// repository and a recording notifier.
    pub struct TestBed {
        pub dir: TempDir,
        pub services: Services,
        pub runner: Arc<ScriptedRunner>,
        pub repo: Arc<FakeRepository>,
        pub notifier: Arc<RecordingNotifier>,
    }

    impl TestBed {
        pub fn new<F>(script: F) -> Self
        where
            F: Fn(&Invocation) -> ToolOutput + Send + Sync + 'static,
        {
            Self::build(script, false)
        }

        pub fn with_failing_commits<F>(script: F) -> Self
        where
            F: Fn(&Invocation) -> ToolOutput + Send + Sync + 'static,
        {
            Self::build(script, true)
        }

        fn build<F>(script: F, fail_commit: bool) -> Self
        where
            F: Fn(&Invocation) -> ToolOutput + Send + Sync + 'static,
        {
            let dir = TempDir::new().unwrap();
            let mut config = SiteConfig::default();
            config.site_id = "WWPDB_TEST".to_string();
            config.paths.sessions_top = dir.path().join("htdocs");
            config.paths.web_apps_top = dir.path().join("webapps");
            config.paths.unused_codes_file = dir.path().join("unusedCodes.list");
            config.sandbox.top = dir.path().join("sandbox");

            let runner = Arc::new(ScriptedRunner::new(script));
            let mut repo = FakeRepository::new(&config.sandbox.top);
            repo.fail_commit = fail_commit;
            let repo = Arc::new(repo);
            let notifier = Arc::new(RecordingNotifier::default());
            let entries = Arc::new(MysqlEntryIndex::new(&config.database, runner.clone()));

            let services = Services::new(
                config,
                runner.clone(),
                repo.clone(),
                notifier.clone(),
                entries,
            );
            Self {
                dir,
                services,
                runner,
                repo,
                notifier,
            }
        }

        pub fn sessions(&self) -> PathBuf {
            self.services.config.sessions_dir()
        }

        pub fn run(&self, req: &Request) -> Response {
            dispatch(&self.services, req)
        }
    }
}
