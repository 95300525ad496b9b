//! Data models for the insights pipeline.
//!
//! This module contains the reporting periods, user roles, the opaque
//! per-period insight record and the period-keyed dataset that the
//! renderers consume.

use crate::error::InsightError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Summary block key inside an insight record.
pub const SUMMARY_KEY: &str = "resumo_geral";
/// Ranked store list key.
pub const TOP_STORES_KEY: &str = "lojas_top";
/// Sales channel breakdown key.
pub const CHANNELS_KEY: &str = "canais_venda";

/// A fixed reporting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PeriodKey {
    #[serde(rename = "30d")]
    Days30,
    #[serde(rename = "60d")]
    Days60,
    #[serde(rename = "90d")]
    Days90,
}

impl PeriodKey {
    /// All known periods in reporting order.
    pub const ALL: [PeriodKey; 3] = [PeriodKey::Days30, PeriodKey::Days60, PeriodKey::Days90];

    /// The argument passed to the external analytics process.
    pub fn as_arg(&self) -> &'static str {
        match self {
            PeriodKey::Days30 => "30d",
            PeriodKey::Days60 => "60d",
            PeriodKey::Days90 => "90d",
        }
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_arg())
    }
}

impl FromStr for PeriodKey {
    type Err = InsightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "30d" => Ok(PeriodKey::Days30),
            "60d" => Ok(PeriodKey::Days60),
            "90d" => Ok(PeriodKey::Days90),
            other => Err(InsightError::UnrecognizedInput(format!(
                "unknown period '{}' (expected 30d, 60d or 90d)",
                other
            ))),
        }
    }
}

/// Which analytics script variant to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Administrative dashboard (all stores).
    Admin,
    /// Restricted client dashboard.
    Client,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Client => write!(f, "client"),
        }
    }
}

impl FromStr for Role {
    type Err = InsightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "client" => Ok(Role::Client),
            other => Err(InsightError::UnrecognizedInput(format!(
                "unknown role '{}' (expected admin or client)",
                other
            ))),
        }
    }
}

/// Structured result for one period, exactly as emitted by the external process.
///
/// Only the top level is known to be a JSON object; every accessor below
/// tolerates absent or oddly-typed fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InsightRecord(Map<String, Value>);

impl InsightRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// The summary block, if present and an object.
    pub fn summary(&self) -> Option<&Map<String, Value>> {
        self.0.get(SUMMARY_KEY).and_then(Value::as_object)
    }

    /// Look up a summary metric; `None` when absent or null.
    pub fn summary_metric(&self, metric: &str) -> Option<&Value> {
        self.summary()
            .and_then(|s| s.get(metric))
            .filter(|v| !v.is_null())
    }

    /// Entries of a ranked list. Non-object entries are skipped.
    pub fn ranked_list(&self, key: &str) -> Vec<&Map<String, Value>> {
        self.0
            .get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_object).collect())
            .unwrap_or_default()
    }

    pub fn top_stores(&self) -> Vec<&Map<String, Value>> {
        self.ranked_list(TOP_STORES_KEY)
    }

    pub fn channels(&self) -> Vec<&Map<String, Value>> {
        self.ranked_list(CHANNELS_KEY)
    }

    /// Replace a ranked list in place.
    pub fn set_ranked_list(&mut self, key: &str, entries: Vec<Value>) {
        self.0.insert(key.to_string(), Value::Array(entries));
    }
}

/// One period's slot in a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodEntry {
    pub period: PeriodKey,
    /// `None` is the missing marker: the period's data could not be obtained.
    pub record: Option<InsightRecord>,
}

/// Period-keyed results of one aggregation, in request order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InsightDataset {
    entries: Vec<PeriodEntry>,
}

impl InsightDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the slot for `period`, keeping its original position if it already exists.
    pub fn insert(&mut self, period: PeriodKey, record: Option<InsightRecord>) {
        match self.entries.iter_mut().find(|e| e.period == period) {
            Some(entry) => entry.record = record,
            None => self.entries.push(PeriodEntry { period, record }),
        }
    }

    pub fn entries(&self) -> &[PeriodEntry] {
        &self.entries
    }

    /// Periods and records for every slot that holds data.
    pub fn present(&self) -> impl Iterator<Item = (PeriodKey, &InsightRecord)> {
        self.entries
            .iter()
            .filter_map(|e| e.record.as_ref().map(|r| (e.period, r)))
    }

    /// Periods that hold the missing marker.
    pub fn missing(&self) -> Vec<PeriodKey> {
        self.entries
            .iter()
            .filter(|e| e.record.is_none())
            .map(|e| e.period)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Output encoding of an exported report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// Delimited text (default)
    #[default]
    Csv,
    /// Spreadsheet workbook
    Xlsx,
    /// Paginated document
    Pdf,
}

impl ExportFormat {
    /// Resolve a type selector; omitted or unrecognized values fall back to CSV.
    pub fn from_selector(selector: Option<&str>) -> Self {
        match selector.map(|s| s.trim().to_lowercase()).as_deref() {
            Some("xlsx") => ExportFormat::Xlsx,
            Some("pdf") => ExportFormat::Pdf,
            _ => ExportFormat::Csv,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ExportFormat::Pdf => "application/pdf",
        }
    }

    pub fn filename(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "relatorio_cannoli.csv",
            ExportFormat::Xlsx => "relatorio_cannoli.xlsx",
            ExportFormat::Pdf => "relatorio_cannoli.pdf",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> InsightRecord {
        match value {
            Value::Object(map) => InsightRecord::new(map),
            _ => panic!("test record must be an object"),
        }
    }

    #[test]
    fn test_period_parsing() {
        assert_eq!("30d".parse::<PeriodKey>().unwrap(), PeriodKey::Days30);
        assert_eq!(" 90D ".parse::<PeriodKey>().unwrap(), PeriodKey::Days90);
        assert!(matches!(
            "45d".parse::<PeriodKey>(),
            Err(InsightError::UnrecognizedInput(_))
        ));
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("client".parse::<Role>().unwrap(), Role::Client);
        assert!("manager".parse::<Role>().is_err());
    }

    #[test]
    fn test_export_format_selector() {
        assert_eq!(ExportFormat::from_selector(None), ExportFormat::Csv);
        assert_eq!(ExportFormat::from_selector(Some("XLSX")), ExportFormat::Xlsx);
        assert_eq!(ExportFormat::from_selector(Some("pdf")), ExportFormat::Pdf);
        assert_eq!(ExportFormat::from_selector(Some("docx")), ExportFormat::Csv);
        assert_eq!(ExportFormat::Pdf.filename(), "relatorio_cannoli.pdf");
    }

    #[test]
    fn test_record_accessors_tolerate_gaps() {
        let rec = record(json!({
            "resumo_geral": {"ticket_medio_geral": 42.5, "tempo_medio_preparo": null},
            "lojas_top": [{"store.name": "A"}, 7, {"store.name": "B"}]
        }));

        assert_eq!(rec.summary_metric("ticket_medio_geral"), Some(&json!(42.5)));
        assert_eq!(rec.summary_metric("tempo_medio_preparo"), None);
        assert_eq!(rec.top_stores().len(), 2);
        assert!(rec.channels().is_empty());
    }

    #[test]
    fn test_dataset_keeps_insertion_order() {
        let mut dataset = InsightDataset::new();
        dataset.insert(PeriodKey::Days90, None);
        dataset.insert(PeriodKey::Days30, Some(InsightRecord::default()));
        dataset.insert(PeriodKey::Days90, Some(InsightRecord::default()));

        let order: Vec<_> = dataset.entries().iter().map(|e| e.period).collect();
        assert_eq!(order, vec![PeriodKey::Days90, PeriodKey::Days30]);
        assert!(dataset.missing().is_empty());
        assert_eq!(dataset.present().count(), 2);
    }
}
