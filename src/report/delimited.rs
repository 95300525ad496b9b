//! Delimited-text (CSV) encoding.
//!
//! Every period's `lojas_top` entries are flattened into one table. The
//! first column is the period; the remaining columns are the union of field
//! names in the order they were first seen.

use crate::error::{InsightError, Result};
use crate::models::InsightDataset;
use crate::report::generator::cell_text;

const PERIOD_COLUMN: &str = "period";

/// Header and rows of the flattened store table.
pub fn table(dataset: &InsightDataset) -> (Vec<String>, Vec<Vec<String>>) {
    let mut header = vec![PERIOD_COLUMN.to_string()];

    for (_, record) in dataset.present() {
        for store in record.top_stores() {
            for key in store.keys() {
                if !header.iter().any(|h| h == key) {
                    header.push(key.clone());
                }
            }
        }
    }

    let mut rows = Vec::new();
    for (period, record) in dataset.present() {
        for store in record.top_stores() {
            let mut row = Vec::with_capacity(header.len());
            row.push(period.to_string());
            for column in header.iter().skip(1) {
                row.push(store.get(column).map(cell_text).unwrap_or_default());
            }
            rows.push(row);
        }
    }

    (header, rows)
}

/// Encode the store table as CSV with a header row.
pub fn render_csv(dataset: &InsightDataset) -> Result<Vec<u8>> {
    let (header, rows) = table(dataset);

    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(&header).map_err(csv_error)?;
    for row in &rows {
        writer.write_record(row).map_err(csv_error)?;
    }

    writer.into_inner().map_err(|e| InsightError::Render {
        format: "csv",
        message: e.to_string(),
    })
}

fn csv_error(e: csv::Error) -> InsightError {
    InsightError::Render {
        format: "csv",
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InsightRecord, PeriodKey};
    use serde_json::{json, Value};
    use std::collections::BTreeSet;

    fn record(value: Value) -> InsightRecord {
        serde_json::from_value(value).unwrap()
    }

    fn dataset() -> InsightDataset {
        let mut dataset = InsightDataset::new();
        dataset.insert(
            PeriodKey::Days30,
            Some(record(json!({
                "lojas_top": [
                    {"store.name": "Centro, SP", "receita": 100, "pedidos": 4},
                    {"store.name": "Norte", "receita": 55.5}
                ]
            }))),
        );
        dataset.insert(PeriodKey::Days60, None);
        dataset.insert(
            PeriodKey::Days90,
            Some(record(json!({
                "lojas_top": [{"store.name": "Praia", "ticket_medio": 31.25}]
            }))),
        );
        dataset
    }

    #[test]
    fn test_header_is_union_in_first_seen_order() {
        let (header, rows) = table(&dataset());
        assert_eq!(
            header,
            vec!["period", "store.name", "receita", "pedidos", "ticket_medio"]
        );
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], vec!["30d", "Norte", "55.5", "", ""]);
        assert_eq!(rows[2], vec!["90d", "Praia", "", "", "31.25"]);
    }

    #[test]
    fn test_reparsed_rows_recover_source_values() {
        let dataset = dataset();
        let bytes = render_csv(&dataset).unwrap();

        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let header: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();

        let mut parsed = BTreeSet::new();
        for row in reader.records() {
            let row = row.unwrap();
            for (column, cell) in header.iter().zip(row.iter()).skip(1) {
                if !cell.is_empty() {
                    parsed.insert((row[0].to_string(), column.clone(), cell.to_string()));
                }
            }
        }

        let mut expected = BTreeSet::new();
        for (period, rec) in dataset.present() {
            for store in rec.top_stores() {
                for (key, value) in store {
                    expected.insert((period.to_string(), key.clone(), cell_text(value)));
                }
            }
        }

        assert_eq!(parsed, expected);
        assert!(parsed.iter().all(|(period, _, _)| period != "60d"));
    }

    #[test]
    fn test_records_without_store_list_render_header_only() {
        let mut dataset = InsightDataset::new();
        dataset.insert(PeriodKey::Days30, Some(record(json!({"resumo_geral": {}}))));
        dataset.insert(PeriodKey::Days60, None);

        let text = String::from_utf8(render_csv(&dataset).unwrap()).unwrap();
        assert_eq!(text, "period\n");
    }
}
