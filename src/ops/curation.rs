//! Operations that change a definition: annotation updates, saving back to
//! an instance directory and checking into the dictionary.

use super::{Services, text_or_failed};
use crate::commit;
use crate::error::Result;
use crate::io::{files, mmcif};
use crate::request::Request;
use crate::response::Response;
use crate::session::{Session, is_valid_id, safe_component, safe_subpath};
use crate::tools;
use log::{debug, warn};
use std::path::PathBuf;

const DEFAULT_PROCESSING_SITE: &str = "RCSB";

fn is_unset(value: Option<&str>) -> bool {
    matches!(value, None | Some("?") | Some("."))
}

fn is_placeholder_site(value: Option<&str>) -> bool {
    is_unset(value) || value == Some("ChemCompOB")
}

/// Re-annotates the posted definition and fills in curation defaults.
pub(super) fn update(services: &Services, req: &Request) -> Result<Response> {
    let session = services.session(req)?;
    let dir = session.path();
    let input = session.file("in.cif");
    files::write_text(&input, &format!("{}\n", req.value("cif")))?;

    let instance_id = req.value("instanceid");
    if !instance_id.is_empty() {
        if let Some(cclink) = find_cc_link(services, req) {
            tools::find_missing_coordinate(
                services.runner.as_ref(),
                &services.config,
                dir,
                &cclink,
                instance_id,
            )?;
        }
    }

    let output = session.file("out.cif");
    files::remove_if_exists(&output)?;
    tools::annotate_comp(services.runner.as_ref(), &services.config, dir, "in.cif", "out.cif")?;
    if output.exists() {
        files::rename(&input, &session.file("in.old.cif"))?;
        files::rename(&output, &input)?;
    }

    apply_defaults(services, req, &session)?;
    Ok(text_or_failed(&files::read_text(&input)?))
}

/// The parent session's `<identifier>-cc-link.cif`, trying the identifier
/// as given, upper-cased and lower-cased.
fn find_cc_link(services: &Services, req: &Request) -> Option<PathBuf> {
    let parent = req.value("parent_sessionid");
    let identifier = req.value("identifier");
    if !is_valid_id(parent) || safe_component("identifier", identifier).is_err() {
        return None;
    }

    let parent_dir = services.config.sessions_dir().join(parent);
    [
        identifier.to_string(),
        identifier.to_uppercase(),
        identifier.to_lowercase(),
    ]
    .into_iter()
    .map(|name| parent_dir.join(format!("{name}-cc-link.cif")))
    .find(|path| path.exists())
}

fn apply_defaults(services: &Services, req: &Request, session: &Session) -> Result<()> {
    let path = session.file("in.cif");
    let mut blocks = mmcif::read_path(&path)?;
    let Some(block) = blocks.first_mut() else {
        return Ok(());
    };

    let pdb_id = req.value("pdbid").to_uppercase();
    let annotator = req.value("annotator");
    let site = match req.value("processingsite") {
        "" | "null" => DEFAULT_PROCESSING_SITE,
        site => site,
    };

    let comp_id = block.single_value("chem_comp", "id").to_string();
    let synonyms = services
        .sandbox
        .read_block(&comp_id)?
        .map(|existing| existing.single_value("chem_comp", "pdbx_synonyms").to_string())
        .unwrap_or_default();

    let comp = block.category_or_insert("chem_comp");
    comp.set_value("type", 0, "NON-POLYMER");
    comp.set_value("pdbx_type", 0, "HETAIN");
    comp.set_value("three_letter_code", 0, comp_id.as_str());
    if !synonyms.is_empty() {
        comp.set_value("pdbx_synonyms", 0, synonyms);
    }
    if !pdb_id.is_empty() {
        comp.set_value("pdbx_model_coordinates_db_code", 0, pdb_id);
    }
    if is_placeholder_site(comp.value("pdbx_processing_site", 0)) {
        comp.set_value("pdbx_processing_site", 0, site);
    }

    if let Some(audit) = block.category_mut("pdbx_chem_comp_audit") {
        if is_placeholder_site(audit.value("processing_site", 0)) {
            audit.set_value("processing_site", 0, site);
        }
        if !annotator.is_empty() && is_unset(audit.value("annotator", 0)) {
            audit.set_value("annotator", 0, annotator);
        }
    } else {
        debug!("{} has no audit category", comp_id);
    }

    mmcif::write_path(&path, &blocks)?;
    Ok(())
}

/// Re-annotates an edited instance definition and stores it, and copies of
/// it, in the instance directories of the session.
pub(super) fn save_component(services: &Services, req: &Request) -> Result<Response> {
    let session = services.session(req)?;
    let base = session.path().join(safe_subpath("subpath", req.value("subpath"))?);
    let extension = match req.value("filextension") {
        "" => "cif",
        ext => safe_component("filextension", ext)?,
    };
    let instance_id = safe_component("instanceid", req.value("instanceid"))?;

    let instance_dir = base.join(instance_id);
    let instance_file = instance_dir.join(format!("{instance_id}.{extension}"));
    if !instance_file.exists() {
        return Ok(text_or_failed(""));
    }

    let input = instance_dir.join("in.cif");
    let output = instance_dir.join("out.cif");
    files::write_text(&input, &format!("{}\n", req.value("cif")))?;
    files::remove_if_exists(&output)?;
    tools::annotate_comp(
        services.runner.as_ref(),
        &services.config,
        &instance_dir,
        "in.cif",
        "out.cif",
    )?;
    let saved = if output.exists() { &output } else { &input };
    files::rename(saved, &instance_file)?;

    for related in req.value("related_instanceids").split(',') {
        if related.is_empty() {
            continue;
        }
        let Ok(related) = safe_component("related_instanceids", related) else {
            warn!("Skipping related instance '{}'", related);
            continue;
        };
        let related_file = base.join(related).join(format!("{related}.{extension}"));
        if related_file.exists() {
            files::copy(&instance_file, &related_file)?;
        }
    }

    Ok(text_or_failed("successful"))
}

pub(super) fn cvs_commit(services: &Services, req: &Request) -> Result<Response> {
    let session = services.session(req)?;
    let mut response = Response::json();
    response.add_items(commit::commit(services, &session, req)?);
    Ok(response)
}

#[cfg(test)]
mod tests {
    use crate::io::mmcif;
    use crate::ops::testing::TestBed;
    use crate::request::Request;
    use crate::sandbox::testing::write_definition;
    use crate::tools::ToolOutput;
    use crate::tools::testing::arg_after;
    use std::fs;

    const EDITED: &str = "data_ZZ1
_chem_comp.id ZZ1
_chem_comp.type ?
_chem_comp.pdbx_processing_site ChemCompOB
loop_
_pdbx_chem_comp_audit.comp_id
_pdbx_chem_comp_audit.action_type
_pdbx_chem_comp_audit.processing_site
_pdbx_chem_comp_audit.annotator
ZZ1 'Create component' . ?
ZZ1 'Modify name' . ?
";

    fn op(name: &str) -> Request {
        Request::new(format!("/service/chemeditor/{name}")).with_param("sessionid", "s1")
    }

    #[test]
    fn update_sets_curation_defaults() {
        let bed = TestBed::new(|_| ToolOutput::ok());
        write_definition(
            bed.services.sandbox.paths(),
            "ZZ1",
            "data_ZZ1\n_chem_comp.id ZZ1\n_chem_comp.pdbx_synonyms 'old name'\n",
        );

        let req = op("update")
            .with_param("cif", EDITED)
            .with_param("pdbid", "1abc")
            .with_param("annotator", "JW")
            .with_param("processingsite", "null");
        let response = bed.run(&req);
        let text = response.get("textcontent").unwrap().as_str().unwrap();

        let block = mmcif::read(std::io::Cursor::new(text)).unwrap().remove(0);
        assert_eq!(block.single_value("chem_comp", "type"), "NON-POLYMER");
        assert_eq!(block.single_value("chem_comp", "pdbx_type"), "HETAIN");
        assert_eq!(block.single_value("chem_comp", "three_letter_code"), "ZZ1");
        assert_eq!(block.single_value("chem_comp", "pdbx_synonyms"), "old name");
        assert_eq!(
            block.single_value("chem_comp", "pdbx_model_coordinates_db_code"),
            "1ABC"
        );
        assert_eq!(block.single_value("chem_comp", "pdbx_processing_site"), "RCSB");

        let audit = block.category("pdbx_chem_comp_audit").unwrap();
        assert_eq!(audit.value("processing_site", 0), Some("RCSB"));
        assert_eq!(audit.value("annotator", 0), Some("JW"));
        assert_eq!(audit.value("processing_site", 1), Some("."));
    }

    #[test]
    fn update_handles_non_ascii_names() {
        let bed = TestBed::new(|_| ToolOutput::ok());
        write_definition(
            bed.services.sandbox.paths(),
            "ZZ1",
            "data_ZZ1\n_chem_comp.id ZZ1\n_chem_comp.pdbx_synonyms glycérol\n",
        );
        let cif = EDITED.replace("_chem_comp.type ?", "_chem_comp.type ?\n_chem_comp.name glycéraldéhyde");

        let response = bed.run(&op("update").with_param("cif", &cif));
        assert!(!response.is_error());
        let text = response.get("textcontent").unwrap().as_str().unwrap();

        let block = mmcif::read(std::io::Cursor::new(text)).unwrap().remove(0);
        assert_eq!(block.single_value("chem_comp", "name"), "glycéraldéhyde");
        assert_eq!(block.single_value("chem_comp", "pdbx_synonyms"), "glycérol");
        assert_eq!(block.single_value("chem_comp", "type"), "NON-POLYMER");
    }

    #[test]
    fn update_swaps_in_annotated_output() {
        let bed = TestBed::new(|inv| {
            if inv.program_name() == "annotateComp" {
                fs::write(inv.cwd.join("out.cif"), "data_ZZ2\n_chem_comp.id ZZ2\n").unwrap();
            }
            ToolOutput::ok()
        });

        let response = bed.run(&op("update").with_param("cif", EDITED).with_param("processingsite", "PDBE"));
        let text = response.get("textcontent").unwrap().as_str().unwrap();
        assert!(text.contains("ZZ2"));
        assert!(text.contains("PDBE"));
        let old = fs::read_to_string(bed.sessions().join("s1/in.old.cif")).unwrap();
        assert_eq!(old, format!("{EDITED}\n"));
    }

    #[test]
    fn update_merges_coordinates_from_parent_cc_link() {
        let bed = TestBed::new(|_| ToolOutput::ok());
        let parent = bed.sessions().join("p1");
        fs::create_dir_all(&parent).unwrap();
        fs::write(parent.join("ab12-cc-link.cif"), "data_L\n").unwrap();

        let req = op("update")
            .with_param("cif", EDITED)
            .with_param("instanceid", "A_ZZ1_1")
            .with_param("parent_sessionid", "p1")
            .with_param("identifier", "AB12");
        bed.run(&req);

        let calls = bed.runner.calls();
        assert_eq!(calls[0].program_name(), "FindMissingCoordinate");
        assert_eq!(
            arg_after(&calls[0], "-cclink").unwrap(),
            parent.join("ab12-cc-link.cif").to_string_lossy()
        );
        assert_eq!(arg_after(&calls[0], "-instanceid").unwrap(), "A_ZZ1_1");
        assert_eq!(calls[1].program_name(), "annotateComp");
    }

    #[test]
    fn update_skips_merge_without_cc_link() {
        let bed = TestBed::new(|_| ToolOutput::ok());
        let req = op("update")
            .with_param("cif", EDITED)
            .with_param("instanceid", "A_ZZ1_1")
            .with_param("parent_sessionid", "p1")
            .with_param("identifier", "AB12");
        bed.run(&req);
        assert_eq!(bed.runner.programs(), ["annotateComp"]);
    }

    fn instance(bed: &TestBed, sub: &str, id: &str) -> std::path::PathBuf {
        let dir = bed.sessions().join("s1").join(sub).join(id);
        fs::create_dir_all(&dir).unwrap();
        let file = dir.join(format!("{id}.cif"));
        fs::write(&file, "data_OLD\n").unwrap();
        file
    }

    #[test]
    fn save_component_stores_and_copies() {
        let bed = TestBed::new(|inv| {
            if inv.program_name() == "annotateComp" {
                fs::write(inv.cwd.join("out.cif"), "data_NEW\n").unwrap();
            }
            ToolOutput::ok()
        });
        let target = instance(&bed, "assign", "I1");
        let related = instance(&bed, "assign", "I2");

        let req = op("save_component")
            .with_param("subpath", "assign")
            .with_param("instanceid", "I1")
            .with_param("cif", "data_EDIT")
            .with_param("related_instanceids", "I2,I3");
        let response = bed.run(&req);

        assert_eq!(response.get("textcontent").unwrap(), "successful");
        assert_eq!(fs::read_to_string(&target).unwrap(), "data_NEW\n");
        assert_eq!(fs::read_to_string(&related).unwrap(), "data_NEW\n");
        assert_eq!(bed.runner.calls()[0].cwd, target.parent().unwrap());
    }

    #[test]
    fn save_component_keeps_input_when_annotation_fails() {
        let bed = TestBed::new(|_| ToolOutput::failed(1, "license expired"));
        let target = instance(&bed, "", "I1");

        let req = op("save_component")
            .with_param("instanceid", "I1")
            .with_param("cif", "data_EDIT");
        bed.run(&req);
        assert_eq!(fs::read_to_string(&target).unwrap(), "data_EDIT\n");
    }

    #[test]
    fn save_component_requires_the_instance_file() {
        let bed = TestBed::new(|_| ToolOutput::ok());
        let req = op("save_component")
            .with_param("instanceid", "I9")
            .with_param("cif", "data_EDIT");
        let response = bed.run(&req);
        assert_eq!(response.get("errortext").unwrap(), "failed");
        assert!(bed.runner.calls().is_empty());
    }

    #[test]
    fn cvs_commit_returns_the_pipeline_dictionary() {
        let bed = TestBed::new(|_| ToolOutput::ok());
        let req = op("cvs_commit")
            .with_param("id", "drg")
            .with_param("cif", "data_DRG\n");
        let response = bed.run(&req);
        assert_eq!(response.get("errorflag").unwrap(), true);
        assert_eq!(
            response.get("errortext").unwrap(),
            "Ligand ID 'drg' is a reserved ligand code."
        );
    }
}
