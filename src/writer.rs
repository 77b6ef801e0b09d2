//! Catalog file writer
//!
//! Produces the same XML dialect Cppcheck emits, one `error` element per rule:
//!
//! ```text
//! <results version="2">
//! <errors>
//! <error id="nullPointer" msg="Null pointer dereference since 1.60" verbose="..."/>
//! </errors>
//! </results>
//! ```

use crate::catalog::Catalog;
use crate::message::Message;
use crate::parser::{ERRORS_ELEMENT, ERROR_ELEMENT, REPLACEMENT_ATTRIBUTE};
use std::path::Path;

/// Catalog XML writer
pub struct CatalogWriter {
    output: String,
}

impl CatalogWriter {
    pub fn new() -> Self {
        Self {
            output: String::new(),
        }
    }

    /// Get the written document
    pub fn finish(self) -> String {
        self.output
    }

    fn line(&mut self, s: &str) {
        self.output.push_str(s);
        self.output.push('\n');
    }

    fn write_attribute(&mut self, name: &str, value: &str) {
        self.output.push(' ');
        self.output.push_str(name);
        self.output.push_str("=\"");
        self.output.push_str(&escape_attr(value));
        self.output.push('"');
    }

    /// Write one definition as an `error` element
    pub fn write_definition(&mut self, message: &Message) {
        self.output.push('<');
        self.output.push_str(ERROR_ELEMENT);
        self.write_attribute("id", &message.id);
        self.write_attribute("msg", &message.msg);
        self.write_attribute("verbose", &message.verbose);
        if let Some(replacement) = message.replacement() {
            self.write_attribute(REPLACEMENT_ATTRIBUTE, replacement);
        }
        self.line("/>");
    }

    /// Write a complete document around the given definitions
    pub fn write_document(&mut self, definitions: &[Message]) {
        self.line("<results version=\"2\">");
        self.line(&format!("<{}>", ERRORS_ELEMENT));
        for definition in definitions {
            self.write_definition(definition);
        }
        self.line(&format!("</{}>", ERRORS_ELEMENT));
        self.line("</results>");
    }
}

impl Default for CatalogWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Render a catalog, ordered by rule id
pub fn render_catalog(catalog: &Catalog) -> String {
    let mut writer = CatalogWriter::new();
    writer.write_document(&catalog.definitions());
    writer.finish()
}

/// Render and write a catalog file
pub fn save_catalog(catalog: &Catalog, path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, render_catalog(catalog))
}

/// Escape attribute value
fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
