//! Parameters of one service request.

use crate::template::escape_html;
use std::collections::BTreeMap;

/// A file sent as a multipart form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    /// Name as reported by the browser, possibly a full client path.
    pub file_name: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    path: String,
    params: BTreeMap<String, String>,
    uploads: BTreeMap<String, Upload>,
}

impl Request {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set_value(key, value);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Value of `key`, or `""` when the request does not carry it.
    pub fn value(&self, key: &str) -> &str {
        self.params.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn set_value(&mut self, key: &str, value: impl Into<String>) {
        self.params.insert(key.to_string(), value.into());
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    pub fn upload(&self, key: &str) -> Option<&Upload> {
        self.uploads.get(key)
    }

    pub fn add_upload(&mut self, key: &str, upload: Upload) {
        self.uploads.insert(key.to_string(), upload);
    }

    /// Parameter listing for the environment dump page.
    pub fn dump_html(&self) -> String {
        let mut html = String::from("<ul>\n");
        html.push_str(&format!(
            "<li>request path = {}</li>\n",
            escape_html(&self.path)
        ));
        for (key, value) in &self.params {
            html.push_str(&format!(
                "<li>{} = {}</li>\n",
                escape_html(key),
                escape_html(value)
            ));
        }
        for (key, upload) in &self.uploads {
            html.push_str(&format!(
                "<li>{} = (file {}, {} bytes)</li>\n",
                escape_html(key),
                escape_html(&upload.file_name),
                upload.data.len()
            ));
        }
        html.push_str("</ul>\n");
        html
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_values_are_empty() {
        let req = Request::new("/service/chemeditor/get_ligand").with_param("id", "ATP");
        assert_eq!(req.value("id"), "ATP");
        assert_eq!(req.value("sessionid"), "");
    }

    #[test]
    fn dump_escapes_values() {
        let mut req = Request::new("/service/environment/dump").with_param("cif", "<b>&");
        req.add_upload(
            "data",
            Upload {
                file_name: "ATP.cif".into(),
                data: b"data_ATP".to_vec(),
            },
        );
        let html = req.dump_html();
        assert!(html.contains("<li>cif = &lt;b&gt;&amp;</li>"));
        assert!(html.contains("(file ATP.cif, 8 bytes)"));
    }
}
