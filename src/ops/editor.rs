//! Editor helpers: layout, uploads, atom mapping and downloads.

use super::{Services, text_or_failed};
use crate::error::Result;
use crate::io::files;
use crate::io::text::{file_name_of, normalize_newlines};
use crate::request::Request;
use crate::response::{Response, ReturnFormat};
use crate::session::safe_component;
use crate::tools;
use log::warn;

pub(super) fn dump(_services: &Services, req: &Request) -> Result<Response> {
    let mut response = Response::new(ReturnFormat::Html);
    response.set_html(req.dump_html());
    Ok(response)
}

/// Computes 2D coordinates for the posted molfile.
pub(super) fn get_2d(services: &Services, req: &Request) -> Result<Response> {
    let session = services.session(req)?;
    files::write_text(&session.file("in.sdf"), &format!("{}\n", req.value("sdf")))?;

    let add_hydrogens = req.value("hflag") == "yes";
    let sdf = tools::cactvs_2d(
        services.runner.as_ref(),
        &services.config,
        session.path(),
        add_hydrogens,
    )?;
    Ok(text_or_failed(sdf.as_deref().unwrap_or_default()))
}

/// Stores the `data` upload in the session and echoes its text back as HTML.
pub(super) fn upload(services: &Services, req: &Request) -> Result<Response> {
    let session = services.session(req)?;
    let mut response = Response::new(ReturnFormat::Html);

    let Some(upload) = req.upload("data") else {
        warn!("Upload request without a data field");
        return Ok(response);
    };
    let name = file_name_of(&upload.file_name);
    let Ok(name) = safe_component("data", &name) else {
        warn!("Rejecting upload named '{}'", upload.file_name);
        return Ok(response);
    };

    let path = session.file(name);
    files::write_bytes(&path, &upload.data)?;
    response.set_html(files::read_if_exists(&path)?.unwrap_or_default());
    Ok(response)
}

/// Pairs atoms of the posted definition with those of dictionary entry `id`.
pub(super) fn atom_match(services: &Services, req: &Request) -> Result<Response> {
    let session = services.session(req)?;
    let input = session.file("in.cif");
    files::write_text(&input, &format!("{}\n", req.value("cif")))?;

    let id = req.value("id");
    if id.is_empty() {
        return Ok(text_or_failed(""));
    }
    let Some(reference) = services.sandbox.file_path(id)? else {
        return Ok(text_or_failed(""));
    };

    let (first, second) = if req.value("reverse") == "yes" {
        (input.as_path(), reference.as_path())
    } else {
        (reference.as_path(), input.as_path())
    };
    let table = tools::get_atom_match(
        services.runner.as_ref(),
        &services.config,
        session.path(),
        first,
        second,
    )?;
    Ok(text_or_failed(table.as_deref().unwrap_or_default()))
}

/// Sends posted text back as a file download.
pub(super) fn echo_file(services: &Services, req: &Request) -> Result<Response> {
    let session = services.session(req)?;
    let name = safe_component("downloadName", req.value("downloadName"))?;
    let data = normalize_newlines(req.value("download"));

    let path = session.file(name);
    files::write_text(&path, &format!("{data}\n"))?;

    let mut response = Response::new(ReturnFormat::Binary);
    response.set_binary_file(&path, true);
    Ok(response)
}

#[cfg(test)]
mod tests {
    use crate::ops::testing::TestBed;
    use crate::request::{Request, Upload};
    use crate::response::ReturnFormat;
    use crate::sandbox::testing::write_definition;
    use crate::tools::testing::{arg_after, args_of};
    use crate::tools::{Stdin, ToolOutput};
    use std::fs;

    fn op(name: &str) -> Request {
        Request::new(format!("/service/chemeditor/{name}")).with_param("sessionid", "s1")
    }

    #[test]
    fn dump_lists_parameters() {
        let bed = TestBed::new(|_| ToolOutput::ok());
        let req = Request::new("/service/environment/dump").with_param("id", "<ATP>");
        let response = bed.run(&req);
        assert_eq!(response.format(), ReturnFormat::Html);
        assert!(response.html().contains("<li>id = &lt;ATP&gt;</li>"));
    }

    #[test]
    fn get_2d_returns_the_laid_out_molfile() {
        let bed = TestBed::new(|inv| {
            let Stdin::File(script) = &inv.stdin else {
                panic!("script not on stdin");
            };
            assert!(fs::read_to_string(script).unwrap().contains("ens hadd"));
            fs::write(inv.cwd.join("out.sdf"), "laid out\n").unwrap();
            ToolOutput::ok()
        });
        let response = bed.run(&op("get_2d").with_param("sdf", "mol").with_param("hflag", "yes"));

        assert_eq!(response.get("textcontent").unwrap(), "laid out\n");
        let staged = fs::read_to_string(bed.sessions().join("s1/in.sdf")).unwrap();
        assert_eq!(staged, "mol\n");
    }

    #[test]
    fn get_2d_without_output_fails() {
        let bed = TestBed::new(|_| ToolOutput::ok());
        let response = bed.run(&op("get_2d").with_param("sdf", "mol"));
        assert_eq!(response.get("errortext").unwrap(), "failed");
    }

    #[test]
    fn upload_stores_under_the_lowercased_basename() {
        let bed = TestBed::new(|_| ToolOutput::ok());
        let mut req = op("upload");
        req.add_upload(
            "data",
            Upload {
                file_name: "C:\\Users\\me\\ATP.CIF".to_string(),
                data: b"data_ATP\n".to_vec(),
            },
        );

        let response = bed.run(&req);
        assert_eq!(response.html(), "data_ATP\n");
        assert!(bed.sessions().join("s1/atp.cif").exists());
    }

    #[test]
    fn upload_without_file_is_empty() {
        let bed = TestBed::new(|_| ToolOutput::ok());
        let response = bed.run(&op("upload"));
        assert_eq!(response.format(), ReturnFormat::Html);
        assert_eq!(response.html(), "");
    }

    #[test]
    fn atom_match_orders_files_by_reverse_flag() {
        let bed = TestBed::new(|inv| {
            fs::write(inv.cwd.join("match_result"), "C1 C1\n").unwrap();
            ToolOutput::ok()
        });
        let reference = write_definition(bed.services.sandbox.paths(), "ATP", "data_ATP\n");

        let response = bed.run(&op("atom_match").with_param("cif", "x").with_param("id", "ATP"));
        assert_eq!(response.get("textcontent").unwrap(), "C1 C1\n");
        let forward = bed.runner.calls().pop().unwrap();
        assert_eq!(arg_after(&forward, "-first").unwrap(), reference.to_string_lossy());

        bed.run(
            &op("atom_match")
                .with_param("cif", "x")
                .with_param("id", "ATP")
                .with_param("reverse", "yes"),
        );
        let reverse = bed.runner.calls().pop().unwrap();
        assert_eq!(arg_after(&reverse, "-second").unwrap(), reference.to_string_lossy());
        assert!(args_of(&reverse)[1].ends_with("in.cif"));
    }

    #[test]
    fn atom_match_needs_a_known_id() {
        let bed = TestBed::new(|_| ToolOutput::ok());
        let response = bed.run(&op("atom_match").with_param("cif", "x").with_param("id", "QQQ"));
        assert_eq!(response.get("errortext").unwrap(), "failed");
        assert!(bed.runner.calls().is_empty());

        let response = bed.run(&op("atom_match").with_param("cif", "x"));
        assert_eq!(response.get("errortext").unwrap(), "failed");
    }

    #[test]
    fn echo_file_normalizes_and_attaches() {
        let bed = TestBed::new(|_| ToolOutput::ok());
        let req = op("echo_file")
            .with_param("download", "a\r\nb\rc")
            .with_param("downloadName", "ATP.cif");

        let response = bed.run(&req);
        assert_eq!(response.format(), ReturnFormat::Binary);
        let file = response.binary_file().unwrap();
        assert!(file.attachment);
        assert_eq!(fs::read_to_string(&file.path).unwrap(), "a\nb\nc\n");
    }

    #[test]
    fn echo_file_rejects_paths() {
        let bed = TestBed::new(|_| ToolOutput::ok());
        let req = op("echo_file")
            .with_param("download", "x")
            .with_param("downloadName", "../escape.cif");
        let response = bed.run(&req);
        assert_eq!(response.get("errortext").unwrap(), "Operation failure");
    }
}
