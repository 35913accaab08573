//! Dictionary lookups: definitions, searches, new codes and related entries.

use super::{Services, text_or_failed};
use crate::error::Result;
use crate::io::{files, match_table};
use crate::notify::threshold_crossed;
use crate::request::Request;
use crate::response::Response;
use crate::tools;
use log::{info, warn};
use std::collections::HashSet;

const EXACT_SEARCH: &[&str] = &["prefilter|strict|skip-h|exact"];
const RELAXED_SEARCH: &[&str] = &[
    "prefilter|relaxedstereo|skip-h|exact",
    "prefilter|relaxed|skip-h|allowextra",
    "prefilter|relaxed|skip-h|close",
];
const SEARCH_COLUMNS: usize = 8;
const MAX_SEARCH_HITS: usize = 15;
/// Largest allowed difference between the hit and query atom counts.
const MAX_ATOM_DIFFERENCE: i64 = 3;

pub(super) fn get_ligand(services: &Services, req: &Request) -> Result<Response> {
    let id = req.value("id");
    let text = match services.sandbox.file_path(id)? {
        Some(path) => files::read_text(&path)?,
        None => String::new(),
    };
    Ok(text_or_failed(&text))
}

fn chem_comp_value(services: &Services, req: &Request, attribute: &str) -> Result<Response> {
    let value = services
        .sandbox
        .read_block(req.value("id"))?
        .map(|block| block.single_value("chem_comp", attribute).to_string())
        .unwrap_or_default();
    Ok(text_or_failed(&value))
}

pub(super) fn status_code(services: &Services, req: &Request) -> Result<Response> {
    chem_comp_value(services, req, "pdbx_release_status")
}

pub(super) fn one_letter_code(services: &Services, req: &Request) -> Result<Response> {
    chem_comp_value(services, req, "one_letter_code")
}

/// Finds released dictionary entries structurally close to the posted definition.
pub(super) fn search(services: &Services, req: &Request) -> Result<Response> {
    let session = services.session(req)?;
    let dir = session.path();
    files::write_text(&session.file("in.cif"), &format!("{}\n", req.value("cif")))?;
    tools::update_comp_cif(services.runner.as_ref(), &services.config, dir, "in.cif")?;

    let options = if req.value("exact") == "yes" {
        EXACT_SEARCH
    } else {
        RELAXED_SEARCH
    };

    let mut seen = HashSet::new();
    let mut hits: Vec<String> = Vec::new();
    for option in options {
        let Some(table) = tools::match_comp(
            services.runner.as_ref(),
            &services.config,
            dir,
            "in.cif",
            "search_result",
            option,
        )?
        else {
            continue;
        };

        for row in match_table::rows(&table) {
            if row.len() != SEARCH_COLUMNS {
                continue;
            }
            let Some(id) = row.matched_id() else {
                continue;
            };
            if seen.contains(id) {
                continue;
            }
            let (Some(query_atoms), Some(hit_atoms)) = (row.int_field(3), row.int_field(7))
            else {
                continue;
            };
            if hit_atoms - query_atoms > MAX_ATOM_DIFFERENCE {
                continue;
            }
            if !is_current_entry(services, id) {
                continue;
            }
            seen.insert(id.to_string());
            hits.push(id.to_string());
        }
    }

    hits.truncate(MAX_SEARCH_HITS);
    Ok(text_or_failed(&hits.join("\n")))
}

/// True when `id` has a sandbox definition that is not obsolete.
fn is_current_entry(services: &Services, id: &str) -> bool {
    match services.sandbox.read_block(id) {
        Ok(Some(block)) => {
            !block
                .single_value("chem_comp", "pdbx_release_status")
                .eq_ignore_ascii_case("OBS")
        }
        Ok(None) => false,
        Err(e) => {
            warn!("Skipping search hit {}: {}", id, e);
            false
        }
    }
}

/// Hands out the next code from the unused-codes list.
///
/// Every code examined is removed from the list, including codes that turn
/// out to be taken already.
pub(super) fn get_new_code(services: &Services, req: &Request) -> Result<Response> {
    let _guard = services
        .code_lock
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    let list_path = &services.config.paths.unused_codes_file;
    let data = files::read_text(list_path)?;
    let ids: Vec<&str> = data.split('\n').collect();

    let mut code = "";
    let mut consumed = 0;
    for &id in &ids {
        consumed += 1;
        if id.is_empty() {
            continue;
        }
        if !services.sandbox.exists(id)? {
            code = id;
            break;
        }
    }

    files::write_text(list_path, &ids[consumed..].join("\n"))?;

    let remaining = ids.len() - consumed;
    if threshold_crossed(ids.len(), remaining, &services.config.notify.thresholds) {
        info!("{} unused component codes left", remaining);
        if req.value("debug_no_notify").is_empty() {
            let subject = format!("CCD count warning : ID left = {remaining}");
            let body = format!(
                "Warning - the number of CCDs left to be assigned is {remaining}\nfor siteId {}",
                services.config.site_id
            );
            if let Err(e) = services.notifier.send(&subject, &body) {
                warn!("Failed to send code count notification: {}", e);
            }
        }
    }

    Ok(text_or_failed(code))
}

pub(super) fn get_enumeration(services: &Services, req: &Request) -> Result<Response> {
    let session = services.session(req)?;
    let mut response = Response::json();

    let items = req.value("cif_items");
    if items.is_empty() {
        response.set_error("Missing cif_items values.");
        return Ok(response);
    }

    match tools::get_enumeration(
        services.runner.as_ref(),
        &services.config,
        session.path(),
        items,
    )? {
        Some(values) if !values.is_empty() => response.add_items(values),
        _ => response.set_error("Get Enumeration values failed."),
    }
    Ok(response)
}

pub(super) fn get_entries_with_ligand(services: &Services, req: &Request) -> Result<Response> {
    let mut response = Response::json();
    match services.entries.entries_with_ligand(req.value("ccid")) {
        Ok(entries) => response.set_data(entries)?,
        Err(e) => {
            warn!("Entry lookup failed: {}", e);
            response.set_error("Could not open a connection to the database");
        }
    }
    Ok(response)
}
