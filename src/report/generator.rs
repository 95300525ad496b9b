//! Report dispatch and shared cell formatting.

use crate::error::Result;
use crate::models::{ExportFormat, InsightDataset};
use crate::report::{delimited, document, spreadsheet};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::path::Path;
use tracing::info;

/// Rendering knobs that do not come from the dataset itself.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Maximum ranked entries listed per period in the document.
    pub top_n: usize,
    /// Timestamp printed in the document header; `None` means now.
    pub generated_at: Option<DateTime<Utc>>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            top_n: 10,
            generated_at: None,
        }
    }
}

/// Encoded report bytes plus the metadata a caller needs to deliver them.
#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub content_type: &'static str,
    pub filename: &'static str,
    pub bytes: Vec<u8>,
}

impl RenderedReport {
    /// `Content-Disposition` header value for an attachment download.
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.filename)
    }

    /// Write the report bytes to a file.
    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, &self.bytes)
    }
}

/// Render `dataset` in the requested encoding.
pub fn render(
    dataset: &InsightDataset,
    format: ExportFormat,
    options: &RenderOptions,
) -> Result<RenderedReport> {
    let bytes = match format {
        ExportFormat::Csv => delimited::render_csv(dataset)?,
        ExportFormat::Xlsx => spreadsheet::render_xlsx(dataset)?,
        ExportFormat::Pdf => document::render_pdf(dataset, options)?,
    };

    info!(
        "Rendered {} report: {} bytes, {} of {} periods with data",
        format,
        bytes.len(),
        dataset.present().count(),
        dataset.len()
    );

    Ok(RenderedReport {
        content_type: format.content_type(),
        filename: format.filename(),
        bytes,
    })
}

/// Text form of a JSON value for a table cell.
///
/// Strings are written bare, null becomes an empty cell, and nested values
/// are written as compact JSON.
pub(crate) fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
