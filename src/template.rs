//! `%(key)s` substitution for the HTML report templates.

use crate::config::SiteConfig;
use crate::error::{Error, Result};
use crate::io::files;
use std::collections::BTreeMap;

const BUNDLED: &[(&str, &str)] = &[(
    "cvs_commit_tmplt.html",
    include_str!("../resources/cvs_commit_tmplt.html"),
)];

/// Replaces each `%(key)s` in `text` with `params[key]`; `%%` is a literal `%`.
/// Any other `%` is copied through unchanged.
pub fn process(name: &str, text: &str, params: &BTreeMap<String, String>) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if let Some(after) = tail.strip_prefix("%%") {
            out.push('%');
            rest = after;
        } else if let Some(inner) = tail.strip_prefix("%(") {
            let Some(close) = inner.find(")s") else {
                out.push('%');
                rest = &tail[1..];
                continue;
            };
            let key = &inner[..close];
            let value = params.get(key).ok_or_else(|| Error::Template {
                template: name.to_string(),
                key: key.to_string(),
            })?;
            out.push_str(value);
            rest = &inner[close + 2..];
        } else {
            out.push('%');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    Ok(out)
}

/// Template text from the site template directory, falling back to the copy
/// shipped with the crate.
pub fn load(config: &SiteConfig, name: &str) -> Result<String> {
    let path = config.template_dir().join(name);
    if let Some(text) = files::read_if_exists(&path)? {
        return Ok(text);
    }
    BUNDLED
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, text)| text.to_string())
        .ok_or_else(|| {
            Error::io(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "template not found"),
            )
        })
}

pub fn render(config: &SiteConfig, name: &str, params: &BTreeMap<String, String>) -> Result<String> {
    process(name, &load(config, name)?, params)
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
