//! Spreadsheet (XLSX) encoding.
//!
//! Each period with data gets two worksheets: `Lojas <period>` for the
//! ranked stores and `Canais <period>` for the sales channel breakdown. A
//! record lacking one of the lists still gets that worksheet, with only
//! its header row.

use crate::error::{InsightError, Result};
use crate::models::{InsightDataset, PeriodKey};
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use serde_json::{Map, Value};

/// A fixed worksheet column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Column {
    pub header: &'static str,
    pub key: &'static str,
    pub width: f64,
}

const fn column(header: &'static str, key: &'static str, width: f64) -> Column {
    Column { header, key, width }
}

pub const STORE_COLUMNS: [Column; 5] = [
    column("Loja", "store.name", 30.0),
    column("Pedidos", "pedidos", 12.0),
    column("Receita", "receita", 14.0),
    column("Ticket Médio", "ticket_medio", 16.0),
    column("Tempo Médio", "tempo_medio", 14.0),
];

pub const CHANNEL_COLUMNS: [Column; 4] = [
    column("Canal", "saleschannel", 20.0),
    column("Pedidos", "pedidos", 12.0),
    column("Receita", "receita", 14.0),
    column("Ticket Médio", "ticket_medio", 16.0),
];

const EMPTY_SHEET: &str = "Relatório";
const EMPTY_NOTICE: &str = "Nenhum dado disponível para os períodos solicitados.";

/// One worksheet to be written.
#[derive(Debug, Clone)]
pub struct SheetPlan<'a> {
    pub name: String,
    pub columns: &'static [Column],
    pub rows: Vec<&'a Map<String, Value>>,
}

/// Worksheets for every period with data, in dataset order.
pub fn plan(dataset: &InsightDataset) -> Vec<SheetPlan<'_>> {
    dataset
        .present()
        .flat_map(|(period, record)| {
            [
                SheetPlan {
                    name: sheet_name("Lojas", period),
                    columns: &STORE_COLUMNS,
                    rows: record.top_stores(),
                },
                SheetPlan {
                    name: sheet_name("Canais", period),
                    columns: &CHANNEL_COLUMNS,
                    rows: record.channels(),
                },
            ]
        })
        .collect()
}

/// Typed worksheet cell for one JSON field.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Text(String),
    Boolean(bool),
}

/// Map a field to its cell; `None` leaves the cell blank.
///
/// Numbers and booleans keep their type, strings are written as is, and
/// nested values are written as compact JSON text.
pub fn cell(value: Option<&Value>) -> Option<Cell> {
    match value? {
        Value::Null => None,
        Value::Number(n) => Some(
            n.as_f64()
                .map(Cell::Number)
                .unwrap_or_else(|| Cell::Text(n.to_string())),
        ),
        Value::String(s) => Some(Cell::Text(s.clone())),
        Value::Bool(b) => Some(Cell::Boolean(*b)),
        other => Some(Cell::Text(other.to_string())),
    }
}

fn sheet_name(prefix: &str, period: PeriodKey) -> String {
    format!("{} {}", prefix, period)
}

/// Encode the dataset as an XLSX workbook.
pub fn render_xlsx(dataset: &InsightDataset) -> Result<Vec<u8>> {
    build_workbook(dataset).map_err(|e| InsightError::Render {
        format: "xlsx",
        message: e.to_string(),
    })
}

fn build_workbook(dataset: &InsightDataset) -> std::result::Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let sheets = plan(dataset);
    if sheets.is_empty() {
        // A workbook needs at least one worksheet.
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(EMPTY_SHEET)?;
        worksheet.write_string(0, 0, EMPTY_NOTICE)?;
    }

    for sheet in &sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet.name)?;
        write_sheet(worksheet, sheet, &header_format)?;
    }

    workbook.save_to_buffer()
}

fn write_sheet(
    worksheet: &mut Worksheet,
    sheet: &SheetPlan<'_>,
    header_format: &Format,
) -> std::result::Result<(), XlsxError> {
    for (col, column) in sheet.columns.iter().enumerate() {
        let col = col as u16;
        worksheet.set_column_width(col, column.width)?;
        worksheet.write_string_with_format(0, col, column.header, header_format)?;
    }
    worksheet.set_freeze_panes(1, 0)?;

    for (index, entry) in sheet.rows.iter().enumerate() {
        let row = index as u32 + 1;
        for (col, column) in sheet.columns.iter().enumerate() {
            let col = col as u16;
            match cell(entry.get(column.key)) {
                None => {}
                Some(Cell::Number(f)) => {
                    worksheet.write_number(row, col, f)?;
                }
                Some(Cell::Text(s)) => {
                    worksheet.write_string(row, col, s)?;
                }
                Some(Cell::Boolean(b)) => {
                    worksheet.write_boolean(row, col, b)?;
                }
            }
        }
    }

    Ok(())
}
