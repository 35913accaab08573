//! Checking a component definition into the dictionary repository.
//!
//! The pipeline stops at the first stage that reports a problem:
//!
//! 1. the id must be usable and not a reserved code,
//! 2. the submitted definition is saved to `<session>/<id>.cif`,
//! 3. the syntax check (plus parent-id and synonym handling) must pass,
//! 4. the definition check and the duplicate search must both be clean,
//! 5. the file is merged with the existing definition and committed.
//!
//! A `force` request skips stages 2 to 4 and commits the file already in the
//! session. Stage 3 and 4 failures produce HTML reports in the session for the
//! browser to display; stage 4's report offers to continue with `force`.

use crate::error::Result;
use crate::io::files;
use crate::io::match_table;
use crate::io::mmcif;
use crate::io::text::split_id_list;
use crate::model::{Category, id::is_reserved};
use crate::ops::Services;
use crate::request::Request;
use crate::session::Session;
use crate::template;
use crate::tools;
use log::{error, info};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const AUDIT_ITEMS: [&str; 6] = [
    "comp_id",
    "action_type",
    "date",
    "processing_site",
    "annotator",
    "details",
];

const CARRIED_OVER_ITEMS: [&str; 4] = [
    "pdbx_initial_date",
    "pdbx_release_status",
    "pdbx_replaced_by",
    "pdbx_replaces",
];

const PASSTHROUGH_PARAMS: [&str; 5] = [
    "newcodeflag",
    "instanceid",
    "parent_sessionid",
    "filesource",
    "identifier",
];

const COMMIT_FAILED: &str = "CVS commit failed";

/// Runs the check-in pipeline and returns the response dictionary.
pub fn commit(services: &Services, session: &Session, req: &Request) -> Result<Map<String, Value>> {
    let today = chrono::Local::now().format("%Y-%m-%d").to_string();
    Commit::new(services, session, req, today)?.run()
}

struct Commit<'a> {
    services: &'a Services,
    session: &'a Session,
    req: &'a Request,
    id: &'a str,
    source: PathBuf,
    target_dir: Option<PathBuf>,
    today: String,
}

#[derive(Default)]
struct Messages {
    exists: String,
    save: String,
    syntax: bool,
    definition: String,
    duplicate: String,
    commit: String,
    report: bool,
}

impl<'a> Commit<'a> {
    fn new(
        services: &'a Services,
        session: &'a Session,
        req: &'a Request,
        today: String,
    ) -> Result<Self> {
        let id = req.value("id");
        let mut target_dir = None;
        if !id.is_empty() {
            // Brings an existing definition into the working copy.
            services.sandbox.file_path(id)?;
            target_dir = services.sandbox.paths().file_dir(id);
        }
        Ok(Self {
            services,
            session,
            req,
            id,
            source: session.file(&format!("{id}.cif")),
            target_dir,
            today,
        })
    }

    fn run(&self) -> Result<Map<String, Value>> {
        let mut m = Messages {
            exists: self.check_id(),
            ..Messages::default()
        };

        if m.exists.is_empty() {
            if !self.req.value("force").is_empty() {
                m.commit = self.commit_to_repository()?;
            } else {
                m.save = self.save_data()?;
                if m.save.is_empty() {
                    m.syntax = self.check_syntax()?;
                    if !m.syntax {
                        m.definition = self.check_definition()?;
                        m.duplicate = self.check_duplicate()?;
                        if m.definition.is_empty() && m.duplicate.is_empty() {
                            m.commit = self.commit_to_repository()?;
                        }
                    }
                }
                if !m.definition.is_empty() || !m.duplicate.is_empty() {
                    m.report = self.write_error_report(&m.definition, &m.duplicate)?;
                }
            }
        }

        let mut result = Map::new();
        let rel = self.session.relative_path();
        if !m.exists.is_empty() || !m.save.is_empty() || !m.commit.is_empty() {
            let text = [m.exists, m.save, m.commit]
                .into_iter()
                .find(|s| !s.is_empty())
                .unwrap_or_default();
            result.insert("errorflag".into(), Value::Bool(true));
            result.insert("errortext".into(), Value::String(text));
        } else if m.syntax {
            result.insert("errorflag1".into(), Value::Bool(true));
            result.insert("errortext1".into(), Value::String(format!("{rel}/error1.html")));
        } else if m.report {
            result.insert("errorflag2".into(), Value::Bool(true));
            result.insert("errortext2".into(), Value::String(format!("{rel}/error2.html")));
        } else {
            result.insert("errorflag".into(), Value::Bool(false));
        }
        Ok(result)
    }

    fn check_id(&self) -> String {
        if self.target_dir.is_none() {
            return COMMIT_FAILED.to_string();
        }
        if is_reserved(self.id) {
            return format!("Ligand ID '{}' is a reserved ligand code.", self.id);
        }
        String::new()
    }

    fn save_data(&self) -> Result<String> {
        let cif = self.req.value("cif");
        if cif.is_empty() {
            return Ok(COMMIT_FAILED.to_string());
        }
        files::write_text(&self.source, &format!("{cif}\n"))?;
        Ok(String::new())
    }

    /// Returns `true` when `error1.html` was written.
    fn check_syntax(&self) -> Result<bool> {
        let dir = self.session.path();
        let Some(mut report) = tools::precheck_comp(
            self.services.runner.as_ref(),
            &self.services.config,
            dir,
            self.id,
        )?
        else {
            return Ok(false);
        };

        if !report.starts_with("Syntax error:") {
            let clean = report.is_empty();
            report.push_str(&self.check_parents_and_update_synonyms(clean)?);
        }
        if report.is_empty() {
            return Ok(false);
        }

        let html = format!(
            "<html>\n<body>\n<br><br>\n<center><h4>Diagnostic Error Report</h4></center>\n<pre>\n{report}\n</pre>\n</body>\n</html>\n"
        );
        files::write_text(&self.session.file("error1.html"), &html)?;
        Ok(true)
    }

    /// Verifies every parent component exists. When the syntax check was clean
    /// and the parents are fine, `chem_comp.pdbx_synonyms` is rebuilt from the
    /// synonym list.
    fn check_parents_and_update_synonyms(&self, clean: bool) -> Result<String> {
        let mut blocks = mmcif::read_path(&self.source)?;
        let Some(block) = blocks.first_mut() else {
            return Ok(String::new());
        };

        let mut names: Vec<String> = Vec::new();
        for row in block.row_maps("pdbx_chem_comp_synonyms") {
            if let Some(name) = row.get("name") {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
        let synonyms = names.join("; ");

        let mut message = String::new();
        let parents = block.single_value("chem_comp", "mon_nstd_parent_comp_id");
        for parent in split_id_list(parents) {
            let exists = self
                .services
                .sandbox
                .paths()
                .file_path(parent)
                .is_some_and(|p| p.exists());
            if !exists {
                message = format!("Incorrect parent compId: '{parents}'.\n\n");
                break;
            }
        }

        if clean && !synonyms.is_empty() && message.is_empty() {
            block
                .category_or_insert("chem_comp")
                .set_value("pdbx_synonyms", 0, synonyms);
            mmcif::write_path(&self.source, &blocks)?;
        }
        Ok(message)
    }

    fn check_definition(&self) -> Result<String> {
        let report = tools::check_ccd_definition(
            self.services.runner.as_ref(),
            &self.services.config,
            self.session.path(),
            self.id,
        )?;
        Ok(match report {
            Some(text) if !text.is_empty() && text.trim() != "Checking OK!" => text,
            _ => String::new(),
        })
    }

    fn check_duplicate(&self) -> Result<String> {
        let table = tools::match_comp(
            self.services.runner.as_ref(),
            &self.services.config,
            self.session.path(),
            &format!("{}.cif", self.id),
            &format!("{}.match", self.id),
            "prefilter|strict|exact",
        )?;
        let matched = table.as_deref().map(match_table::matched_ids).unwrap_or_default();
        if matched.is_empty() {
            return Ok(String::new());
        }
        Ok(format!("WARNING - {} matches {}", self.id, matched.join(",")))
    }

    /// Writes `error2.html` from the site template. Returns `false` when
    /// there was nothing to report.
    fn write_error_report(&self, definition: &str, duplicate: &str) -> Result<bool> {
        let mut begin_comment = "";
        let mut end_comment = "";
        let mut errors: Vec<&str> = Vec::new();
        for line in definition.lines().map(str::trim).filter(|l| !l.is_empty()) {
            // A hard error hides the "continue anyway" button.
            if line.starts_with("ERROR") {
                begin_comment = "<!-- ";
                end_comment = " -->";
            }
            errors.push(line);
        }
        if !duplicate.is_empty() {
            errors.push(duplicate);
        }
        if errors.is_empty() {
            return Ok(false);
        }

        let error_list: String = errors.iter().map(|e| format!("<li>{e}</li>\n")).collect();
        let mut params = BTreeMap::new();
        params.insert("id".to_string(), self.id.to_string());
        params.insert("sessionid".to_string(), self.session.id().to_string());
        params.insert("existflag".to_string(), self.req.value("existflag").to_string());
        params.insert("error".to_string(), error_list);
        for key in PASSTHROUGH_PARAMS {
            params.insert(key.to_string(), self.req.value(key).to_string());
        }
        params.insert("begin_comment".to_string(), begin_comment.to_string());
        params.insert("end_comment".to_string(), end_comment.to_string());

        let page = template::render(&self.services.config, "cvs_commit_tmplt.html", &params)?;
        files::write_text(&self.session.file("error2.html"), &format!("{page}\n"))?;
        Ok(true)
    }

    fn commit_to_repository(&self) -> Result<String> {
        if !self.source.exists() {
            return Ok(COMMIT_FAILED.to_string());
        }
        let Some(target_dir) = &self.target_dir else {
            return Ok(COMMIT_FAILED.to_string());
        };

        let target = target_dir.join(format!("{}.cif", self.id));
        if target_dir.exists() {
            if !target.exists() {
                return Ok(format!(
                    "{} exists. But {} does not exist. {COMMIT_FAILED}.",
                    target_dir.display(),
                    target.display()
                ));
            }
            if self.req.value("existflag") != "yes" {
                self.merge_existing_values(&target)?;
            }
        }

        self.check_in()
    }

    /// Carries release bookkeeping over from the definition being replaced
    /// and rebuilds the audit trail: existing rows first, then today's new
    /// modification rows, without duplicates.
    fn merge_existing_values(&self, existing_path: &Path) -> Result<()> {
        let existing = mmcif::read_first_block(existing_path)?;
        let mut blocks = mmcif::read_path(&self.source)?;
        let Some(block) = blocks.first_mut() else {
            return Ok(());
        };

        let comp = block.category_or_insert("chem_comp");
        for item in CARRIED_OVER_ITEMS {
            let value = existing.single_value("chem_comp", item);
            if !value.is_empty() {
                comp.set_value(item, 0, value);
            }
        }

        let existing_audits = existing.row_maps("pdbx_chem_comp_audit");
        if !existing_audits.is_empty() {
            let mut audit = Category::with_attributes("pdbx_chem_comp_audit", AUDIT_ITEMS);
            let mut seen: Vec<String> = Vec::new();
            let mut push_unique = |row: &BTreeMap<String, String>, audit: &mut Category| {
                let present: Vec<&str> = AUDIT_ITEMS
                    .iter()
                    .filter_map(|item| row.get(*item).map(String::as_str))
                    .collect();
                if present.is_empty() {
                    return;
                }
                let key = present.join("|");
                if seen.contains(&key) {
                    return;
                }
                seen.push(key);
                audit.push_row(
                    AUDIT_ITEMS
                        .iter()
                        .map(|item| row.get(*item).cloned().unwrap_or_else(|| "?".to_string()))
                        .collect(),
                );
            };

            for row in &existing_audits {
                push_unique(row, &mut audit);
            }
            for row in block.row_maps("pdbx_chem_comp_audit") {
                let dated_today = row.get("date").is_some_and(|d| *d == self.today);
                let modification = row
                    .get("action_type")
                    .is_some_and(|a| a != "Create component");
                if dated_today && modification {
                    push_unique(&row, &mut audit);
                }
            }
            block.replace(audit);
        }

        mmcif::write_path(&self.source, &blocks)?;
        Ok(())
    }

    fn check_in(&self) -> Result<String> {
        let sandbox = &self.services.sandbox;
        let paths = sandbox.paths();
        let (Some((project, rel_path)), Some(target)) =
            (paths.project_info(self.id), paths.file_path(self.id))
        else {
            return Ok(COMMIT_FAILED.to_string());
        };

        let mut texts: Vec<String> = Vec::new();
        if let Err(e) = self.update_sandbox(&project, &rel_path, &target, &mut texts) {
            error!("Check-in of {} failed: {}", self.id, e);
            texts.push(format!("{COMMIT_FAILED} - CVS update exception"));
        }

        if !target.exists() {
            texts.push(format!("CVS commit {} failed", self.id));
        }
        if texts.is_empty() {
            info!("Committed {} as {}/{}", self.id, project, rel_path);
        }
        Ok(texts.join("\n"))
    }

    fn update_sandbox(
        &self,
        project: &str,
        rel_path: &str,
        target: &Path,
        texts: &mut Vec<String>,
    ) -> Result<()> {
        let sandbox = &self.services.sandbox;
        let repo = sandbox.repository();
        let mut keep = |outcome: crate::vcs::Outcome| {
            if !outcome.ok && !outcome.text.is_empty() {
                texts.push(outcome.text);
            }
        };

        if sandbox.file_path(self.id)?.is_some() {
            repo.check_out(&format!("{project}/{rel_path}"))?;
            files::copy(&self.source, target)?;
        } else {
            let project_dir = sandbox.paths().top().join(project);
            let rel_dir = Path::new(rel_path).parent().unwrap_or(Path::new(""));
            let mut partial = PathBuf::new();
            for part in rel_dir.components() {
                partial.push(part);
                if !project_dir.join(&partial).exists() {
                    files::create_dir_all(&project_dir.join(&partial))?;
                    keep(repo.add(project, &partial.to_string_lossy())?);
                }
            }
            files::copy(&self.source, target)?;
            keep(repo.add(project, rel_path)?);
        }

        let message = format!("{}: updated with the chemical component editor", self.id);
        keep(repo.commit(project, rel_path, &message)?);
        Ok(())
    }
}
