//! What a handler hands back to the browser.

use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReturnFormat {
    #[default]
    Html,
    Json,
    Binary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryFile {
    pub path: PathBuf,
    /// Served with `Content-Disposition: attachment` when set.
    pub attachment: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    format: ReturnFormat,
    items: Map<String, Value>,
    html: String,
    binary: Option<BinaryFile>,
}

impl Response {
    pub fn new(format: ReturnFormat) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }

    pub fn json() -> Self {
        Self::new(ReturnFormat::Json)
    }

    /// JSON response reporting a handler that did not complete.
    pub fn operation_failure() -> Self {
        let mut response = Self::json();
        response.set_error("Operation failure");
        response
    }

    pub fn format(&self) -> ReturnFormat {
        self.format
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.items.insert("errorflag".into(), Value::Bool(true));
        self.items
            .insert("errortext".into(), Value::String(message.into()));
    }

    pub fn is_error(&self) -> bool {
        self.items.get("errorflag") == Some(&Value::Bool(true))
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.items
            .insert("textcontent".into(), Value::String(text.into()));
    }

    pub fn set_data<T: Serialize>(&mut self, data: T) -> serde_json::Result<()> {
        self.items
            .insert("datacontent".into(), serde_json::to_value(data)?);
        Ok(())
    }

    pub fn set_html(&mut self, html: impl Into<String>) {
        self.html = html.into();
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn add_items(&mut self, items: Map<String, Value>) {
        self.items.extend(items);
    }

    pub fn set_binary_file(&mut self, path: &Path, attachment: bool) {
        self.binary = Some(BinaryFile {
            path: path.to_path_buf(),
            attachment,
        });
    }

    pub fn binary_file(&self) -> Option<&BinaryFile> {
        self.binary.as_ref()
    }

    pub fn items(&self) -> &Map<String, Value> {
        &self.items
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.items.get(key)
    }

    pub fn json_string(&self) -> String {
        Value::Object(self.items.clone()).to_string()
    }
}
