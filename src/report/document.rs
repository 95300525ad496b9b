//! Paginated document (PDF) encoding.
//!
//! The document is built in two steps. [`layout`] turns the dataset into a
//! flat list of styled lines, and [`paginate`] assigns each line a page and
//! a baseline. Only the final step touches `pdf-writer`.

use crate::error::Result;
use crate::models::{InsightDataset, InsightRecord};
use crate::report::generator::RenderOptions;
use chrono::Utc;
use pdf_writer::{Content, Name, Pdf, Rect, Ref, Str};
use serde_json::{Map, Value};

const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;
const MARGIN: f32 = 40.0;
const ITEM_INDENT: f32 = 10.0;

const REGULAR_FONT: Name<'static> = Name(b"F1");
const BOLD_FONT: Name<'static> = Name(b"F2");

const TITLE: &str = "Relatório Consolidado Cannoli";
const NO_DATA: &str = "Nenhum dado disponível para os períodos solicitados.";

/// Style of one document line.
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    /// Centered report title.
    Title(String),
    /// Small print under the title.
    Caption(String),
    /// Underlined period heading.
    Heading(String),
    /// Body text.
    Text(String),
    /// Bold body text.
    Label(String),
    /// Indented list entry.
    Item(String),
    /// Vertical space, in points.
    Gap(f32),
}

impl Line {
    fn size(&self) -> f32 {
        match self {
            Line::Title(_) => 18.0,
            Line::Heading(_) => 14.0,
            Line::Caption(_) => 9.0,
            Line::Text(_) | Line::Label(_) | Line::Item(_) => 12.0,
            Line::Gap(_) => 0.0,
        }
    }

    fn height(&self) -> f32 {
        match self {
            Line::Gap(points) => *points,
            other => other.size() * 1.4,
        }
    }
}

/// Document lines for every period with data.
pub fn layout(dataset: &InsightDataset, options: &RenderOptions) -> Vec<Line> {
    let generated_at = options.generated_at.unwrap_or_else(Utc::now);

    let mut lines = vec![
        Line::Title(TITLE.to_string()),
        Line::Caption(format!(
            "Gerado em {}",
            generated_at.format("%Y-%m-%d %H:%M UTC")
        )),
        Line::Gap(12.0),
    ];

    let mut any = false;
    for (period, record) in dataset.present() {
        any = true;
        lines.push(Line::Heading(format!("Período: {}", period)));
        lines.push(Line::Gap(4.0));
        lines.extend(period_section(record, options.top_n));
        lines.push(Line::Gap(14.0));
    }

    if !any {
        lines.push(Line::Text(NO_DATA.to_string()));
    }

    lines
}

fn period_section(record: &InsightRecord, top_n: usize) -> Vec<Line> {
    let mut lines = vec![
        Line::Text(format!(
            "Ticket médio: R$ {}",
            metric_text(record.summary_metric("ticket_medio_geral"))
        )),
        Line::Text(format!(
            "Tempo médio de preparo: {} min",
            metric_text(record.summary_metric("tempo_medio_preparo"))
        )),
        Line::Gap(6.0),
        Line::Label("Top Lojas:".to_string()),
    ];

    for (index, store) in record.top_stores().into_iter().take(top_n).enumerate() {
        lines.push(Line::Item(format!(
            "{}. {} — R$ {}",
            index + 1,
            store_name(store),
            currency(store.get("receita"))
        )));
    }

    lines
}

/// Summary metric as printed; absent metrics read as zero.
fn metric_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "0".to_string(),
        Some(Value::String(s)) if s.trim().is_empty() => "0".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn store_name(store: &Map<String, Value>) -> String {
    match store.get("store.name") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => "-".to_string(),
    }
}

/// Two-decimal amount; unparseable or absent values read as zero.
fn currency(value: Option<&Value>) -> String {
    let amount = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    let amount = if amount.is_finite() { amount } else { 0.0 };
    format!("{:.2}", amount)
}

/// A line placed on a page at baseline `y`.
#[derive(Debug, Clone, PartialEq)]
pub struct Placed<'a> {
    pub line: &'a Line,
    pub y: f32,
}

/// Flow lines top to bottom, starting a new page when one fills up.
pub fn paginate(lines: &[Line]) -> Vec<Vec<Placed<'_>>> {
    let top = PAGE_HEIGHT - MARGIN;
    let mut pages = vec![Vec::new()];
    let mut cursor = top;

    for line in lines {
        let height = line.height();
        if cursor - height < MARGIN && cursor < top {
            pages.push(Vec::new());
            cursor = top;
        }
        cursor -= height;

        if let Line::Gap(_) = line {
            continue;
        }
        if let Some(page) = pages.last_mut() {
            page.push(Placed { line, y: cursor });
        }
    }

    pages
}

/// Encode the dataset as a PDF document.
pub fn render_pdf(dataset: &InsightDataset, options: &RenderOptions) -> Result<Vec<u8>> {
    let lines = layout(dataset, options);
    let pages = paginate(&lines);

    let catalog_id = Ref::new(1);
    let page_tree_id = Ref::new(2);
    let regular_id = Ref::new(3);
    let bold_id = Ref::new(4);
    let page_ids: Vec<Ref> = (0..pages.len()).map(|i| Ref::new(5 + 2 * i as i32)).collect();

    let mut pdf = Pdf::new();
    pdf.catalog(catalog_id).pages(page_tree_id);
    pdf.pages(page_tree_id)
        .kids(page_ids.iter().copied())
        .count(page_ids.len() as i32);

    pdf.type1_font(regular_id)
        .base_font(Name(b"Helvetica"))
        .encoding_predefined(Name(b"WinAnsiEncoding"));
    pdf.type1_font(bold_id)
        .base_font(Name(b"Helvetica-Bold"))
        .encoding_predefined(Name(b"WinAnsiEncoding"));

    for (page_id, placed) in page_ids.iter().zip(&pages) {
        let content_id = Ref::new(page_id.get() + 1);
        {
            let mut page = pdf.page(*page_id);
            page.media_box(Rect::new(0.0, 0.0, PAGE_WIDTH, PAGE_HEIGHT));
            page.parent(page_tree_id);
            page.contents(content_id);
            page.resources()
                .fonts()
                .pair(REGULAR_FONT, regular_id)
                .pair(BOLD_FONT, bold_id);
        }
        let content = draw_page(placed);
        pdf.stream(content_id, &content);
    }

    Ok(pdf.finish())
}

fn draw_page(placed: &[Placed<'_>]) -> Vec<u8> {
    let mut content = Content::new();

    for item in placed {
        let size = item.line.size();
        let (text, font, x) = match item.line {
            Line::Title(t) => {
                let x = ((PAGE_WIDTH - approx_width(t, size)) / 2.0).max(MARGIN);
                (t, BOLD_FONT, x)
            }
            Line::Heading(t) | Line::Label(t) => (t, BOLD_FONT, MARGIN),
            Line::Caption(t) => {
                let x = ((PAGE_WIDTH - approx_width(t, size)) / 2.0).max(MARGIN);
                (t, REGULAR_FONT, x)
            }
            Line::Text(t) => (t, REGULAR_FONT, MARGIN),
            Line::Item(t) => (t, REGULAR_FONT, MARGIN + ITEM_INDENT),
            Line::Gap(_) => continue,
        };

        let heading = matches!(item.line, Line::Heading(_));
        if heading {
            content.set_fill_rgb(1.0, 0.549, 0.0);
        } else {
            content.set_fill_rgb(0.0, 0.0, 0.0);
        }

        let encoded = win_ansi(text);
        content.begin_text();
        content.set_font(font, size);
        content.next_line(x, item.y);
        content.show(Str(&encoded));
        content.end_text();

        if heading {
            let width = approx_width(text, size);
            content.set_stroke_rgb(1.0, 0.549, 0.0);
            content.set_line_width(0.8);
            content.move_to(x, item.y - 2.0);
            content.line_to(x + width, item.y - 2.0);
            content.stroke();
        }
    }

    content.finish().to_vec()
}

/// Rough Helvetica advance width; good enough for centering and underlines.
fn approx_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * 0.52
}

/// Encode text for the standard fonts' WinAnsi encoding.
///
/// Latin-1 maps directly; the Windows-1252 punctuation range is mapped
/// explicitly and everything else becomes `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\u{a0}'..='\u{ff}' => c as u32 as u8,
            '€' => 0x80,
            '‚' => 0x82,
            'ƒ' => 0x83,
            '„' => 0x84,
            '…' => 0x85,
            '†' => 0x86,
            '‡' => 0x87,
            'ˆ' => 0x88,
            '‰' => 0x89,
            'Š' => 0x8a,
            '‹' => 0x8b,
            'Œ' => 0x8c,
            'Ž' => 0x8e,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '˜' => 0x98,
            '™' => 0x99,
            'š' => 0x9a,
            '›' => 0x9b,
            'œ' => 0x9c,
            'ž' => 0x9e,
            'Ÿ' => 0x9f,
            c if c.is_whitespace() || c.is_control() => b' ',
            _ => b'?',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PeriodKey;
    use chrono::TimeZone;
    use serde_json::json;

    fn options() -> RenderOptions {
        RenderOptions {
            top_n: 10,
            generated_at: Some(Utc.with_ymd_and_hms(2026, 10, 14, 9, 30, 0).unwrap()),
        }
    }

    fn record(value: Value) -> InsightRecord {
        serde_json::from_value(value).unwrap()
    }

    fn texts(lines: &[Line]) -> Vec<String> {
        lines
            .iter()
            .filter_map(|l| match l {
                Line::Title(t)
                | Line::Caption(t)
                | Line::Heading(t)
                | Line::Text(t)
                | Line::Label(t)
                | Line::Item(t) => Some(t.clone()),
                Line::Gap(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_section_with_summary_and_ranked_stores() {
        let mut dataset = InsightDataset::new();
        dataset.insert(
            PeriodKey::Days30,
            Some(record(json!({
                "resumo_geral": {"ticket_medio_geral": 42.5, "tempo_medio_preparo": 17},
                "lojas_top": [
                    {"store.name": "Store A", "receita": 100},
                    {"store.name": "Store B", "receita": "75.456"}
                ]
            }))),
        );

        let lines = texts(&layout(&dataset, &options()));
        assert_eq!(
            lines,
            vec![
                "Relatório Consolidado Cannoli",
                "Gerado em 2026-10-14 09:30 UTC",
                "Período: 30d",
                "Ticket médio: R$ 42.5",
                "Tempo médio de preparo: 17 min",
                "Top Lojas:",
                "1. Store A — R$ 100.00",
                "2. Store B — R$ 75.46",
            ]
        );
    }

    #[test]
    fn test_missing_summary_metrics_render_as_zero() {
        let mut dataset = InsightDataset::new();
        dataset.insert(
            PeriodKey::Days60,
            Some(record(json!({"resumo_geral": {"tempo_medio_preparo": null}}))),
        );
        dataset.insert(PeriodKey::Days90, Some(record(json!({}))));

        let lines = texts(&layout(&dataset, &options()));
        assert_eq!(
            lines.iter().filter(|l| *l == "Ticket médio: R$ 0").count(),
            2
        );
        assert_eq!(
            lines
                .iter()
                .filter(|l| *l == "Tempo médio de preparo: 0 min")
                .count(),
            2
        );
        assert!(!lines.iter().any(|l| l.starts_with("1. ")));
    }

    #[test]
    fn test_missing_periods_produce_no_section() {
        let mut dataset = InsightDataset::new();
        dataset.insert(PeriodKey::Days30, None);
        dataset.insert(PeriodKey::Days60, Some(record(json!({"lojas_top": []}))));

        let lines = texts(&layout(&dataset, &options()));
        assert!(!lines.iter().any(|l| l.contains("30d")));
        assert!(lines.contains(&"Período: 60d".to_string()));

        let mut empty = InsightDataset::new();
        empty.insert(PeriodKey::Days30, None);
        let lines = texts(&layout(&empty, &options()));
        assert_eq!(lines.last().map(String::as_str), Some(NO_DATA));
    }

    #[test]
    fn test_ranked_excerpt_is_capped() {
        let stores: Vec<Value> = (1..=15)
            .map(|i| json!({"store.name": format!("Loja {}", i), "receita": i * 10}))
            .collect();
        let mut dataset = InsightDataset::new();
        dataset.insert(PeriodKey::Days30, Some(record(json!({"lojas_top": stores}))));

        let lines = layout(&dataset, &options());
        let items: Vec<_> = lines
            .iter()
            .filter(|l| matches!(l, Line::Item(_)))
            .collect();
        assert_eq!(items.len(), 10);
        assert_eq!(items[9], &Line::Item("10. Loja 10 — R$ 100.00".to_string()));
    }

    #[test]
    fn test_entries_without_name_or_revenue() {
        let mut dataset = InsightDataset::new();
        dataset.insert(
            PeriodKey::Days30,
            Some(record(json!({"lojas_top": [{"receita": null}]}))),
        );

        let lines = texts(&layout(&dataset, &options()));
        assert!(lines.contains(&"1. - — R$ 0.00".to_string()));
    }

    #[test]
    fn test_long_reports_span_pages() {
        let lines: Vec<Line> = (0..120).map(|i| Line::Text(format!("linha {}", i))).collect();
        let pages = paginate(&lines);

        assert!(pages.len() > 1);
        assert_eq!(pages.iter().map(Vec::len).sum::<usize>(), 120);
        for page in &pages {
            for placed in page {
                assert!(placed.y >= MARGIN);
                assert!(placed.y <= PAGE_HEIGHT - MARGIN);
            }
        }
    }

    #[test]
    fn test_render_pdf_signature() {
        let mut dataset = InsightDataset::new();
        dataset.insert(PeriodKey::Days30, Some(record(json!({"lojas_top": []}))));

        let bytes = render_pdf(&dataset, &options()).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
        assert!(bytes.windows(9).any(|w| w == b"Helvetica"));
    }

    #[test]
    fn test_win_ansi_encoding() {
        assert_eq!(win_ansi("Médio — ok"), b"M\xe9dio \x97 ok".to_vec());
        assert_eq!(win_ansi("📊 x"), b"? x".to_vec());
    }
}
