//! Plain-text rendering of dashboard views.
//!
//! Every function returns a `String` so output can be checked in tests and
//! written to any sink.

use sales_core::formatting::{format_currency, format_quantity};
use sales_core::models::{Record, ViewFilter};
use sales_core::settings::ALL;
use sales_data::aggregator::{DashboardMetrics, GroupTotal, SalesAggregator};
use sales_data::query::QueryResult;
use unicode_width::UnicodeWidthStr;

const SEPARATOR_WIDTH: usize = 60;

/// Column alignment within a text table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
}

/// Title block: name, separator and the active selectors.
pub fn render_header(source: &str, filter: &ViewFilter) -> String {
    let year = filter
        .year
        .map(|y| y.to_string())
        .unwrap_or_else(|| ALL.to_string());
    let product = filter.product.as_deref().unwrap_or(ALL);
    format!(
        "SALES DASHBOARD\n{}\n[ {} | Year: {} | Product: {} ]\n",
        "=".repeat(SEPARATOR_WIDTH),
        source,
        year,
        product
    )
}

/// The three headline metrics.
pub fn render_metrics(metrics: &DashboardMetrics) -> String {
    let top = metrics
        .top_product
        .as_ref()
        .map(|p| format!("{} ({})", p.key, format_currency(p.sales)))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "Total Sales:    {}\nTotal Quantity: {}\nTop Product:    {}\nRecords:        {}\n",
        format_currency(metrics.total_sales),
        format_quantity(metrics.total_quantity),
        top,
        metrics.record_count
    )
}

/// Row-level table of `records`, at most `limit` rows.
pub fn render_records(records: &[Record], limit: usize) -> String {
    let headers = ["Date", "Year", "Month", "Product", "Sales", "Quantity"];
    let aligns = [
        Align::Left,
        Align::Left,
        Align::Left,
        Align::Left,
        Align::Right,
        Align::Right,
    ];

    let rows: Vec<Vec<String>> = records
        .iter()
        .take(limit)
        .map(|r| {
            vec![
                r.date.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
                r.year.map(|y| y.to_string()).unwrap_or_else(|| "-".into()),
                r.month.map(|m| m.name().to_string()).unwrap_or_else(|| "-".into()),
                r.product.clone(),
                format_currency(r.sales),
                format_quantity(r.quantity),
            ]
        })
        .collect();

    let mut out = render_grid(&headers, &aligns, &rows, None);
    if records.len() > limit {
        out.push_str(&format!("... {} more rows\n", records.len() - limit));
    }
    out
}

/// Grouped totals with a totals row, e.g. sales by month.
pub fn render_groups(title: &str, label: &str, groups: &[GroupTotal]) -> String {
    if groups.is_empty() {
        return format!("{title}\n(no data)\n");
    }

    let headers = [label, "Sales", "Quantity", "Rows"];
    let aligns = [Align::Left, Align::Right, Align::Right, Align::Right];
    let to_row = |g: &GroupTotal| {
        vec![
            g.key.clone(),
            format_currency(g.sales),
            format_quantity(g.quantity),
            g.count.to_string(),
        ]
    };

    let rows: Vec<Vec<String>> = groups.iter().map(to_row).collect();
    let totals = to_row(&SalesAggregator::calculate_totals(groups));

    format!("{title}\n{}", render_grid(&headers, &aligns, &rows, Some(totals)))
}

/// A question followed by its answer; warnings are marked.
pub fn render_answer(result: &QueryResult) -> String {
    let prefix = if result.is_warning() { "Warning: " } else { "" };
    format!("Q: {}\n{}{}\n", result.question, prefix, result.message())
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Lay out a table with columns sized to their widest cell.
fn render_grid(
    headers: &[&str],
    aligns: &[Align],
    rows: &[Vec<String>],
    totals: Option<Vec<String>>,
) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.width()).collect();
    for row in rows.iter().chain(totals.iter()) {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.width());
        }
    }

    let line = |cells: &[String]| {
        let padded: Vec<String> = cells
            .iter()
            .enumerate()
            .map(|(i, c)| pad(c, widths[i], aligns[i]))
            .collect();
        format!("{}\n", padded.join("  ").trim_end())
    };
    let rule = format!(
        "{}\n",
        "-".repeat(widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1))
    );

    let header_cells: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    let mut out = line(header_cells.as_slice());
    out.push_str(&rule);
    for row in rows {
        out.push_str(&line(row.as_slice()));
    }
    if let Some(totals) = totals {
        out.push_str(&rule);
        out.push_str(&line(totals.as_slice()));
    }
    out
}

/// Pad `cell` to `width` display columns.
fn pad(cell: &str, width: usize, align: Align) -> String {
    let fill = " ".repeat(width.saturating_sub(cell.width()));
    match align {
        Align::Left => format!("{cell}{fill}"),
        Align::Right => format!("{fill}{cell}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use sales_core::models::Dataset;
    use sales_data::query::answer_question;

    fn rec(date: Option<&str>, product: &str, sales: f64, quantity: f64) -> Record {
        Record::new(
            date.and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
            product,
            sales,
            quantity,
        )
    }

    #[test]
    fn test_header_shows_selectors() {
        let filter = ViewFilter::new().with_year(Some(2023));
        let header = render_header("sales.csv", &filter);
        assert!(header.starts_with("SALES DASHBOARD\n"));
        assert!(header.contains("[ sales.csv | Year: 2023 | Product: All ]"));
    }

    #[test]
    fn test_metrics_block() {
        let metrics = SalesAggregator::summary(&[
            rec(Some("2023-01-01"), "Widget", 1200.0, 3.0),
            rec(Some("2023-01-02"), "Gadget", 30.0, 1.0),
        ]);
        let text = render_metrics(&metrics);
        assert!(text.contains("Total Sales:    $1,230.00"));
        assert!(text.contains("Total Quantity: 4"));
        assert!(text.contains("Top Product:    Widget ($1,200.00)"));
    }

    #[test]
    fn test_metrics_block_empty() {
        let text = render_metrics(&DashboardMetrics::default());
        assert!(text.contains("Top Product:    -"));
    }

    #[test]
    fn test_records_table_aligns_columns() {
        let rows = vec![
            rec(Some("2023-01-15"), "Widget", 100.0, 2.0),
            rec(None, "Café Crème", 5.5, 1.0),
        ];
        let text = render_records(&rows, 10);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Date"));
        assert!(lines[2].contains("January"));
        assert!(lines[3].starts_with("-"));
        // Sales column is right-aligned, so both rows end at the same width.
        assert_eq!(lines[2].width(), lines[3].width());
    }

    #[test]
    fn test_records_table_limit() {
        let rows: Vec<Record> = (1..=5)
            .map(|d| rec(Some(&format!("2023-01-0{d}")), "Widget", 1.0, 1.0))
            .collect();
        let text = render_records(&rows, 2);
        assert!(text.ends_with("... 3 more rows\n"));
    }

    #[test]
    fn test_groups_table_has_totals_row() {
        let groups = vec![
            GroupTotal {
                key: "2022".into(),
                sales: 100.0,
                quantity: 2.0,
                count: 1,
            },
            GroupTotal {
                key: "2023".into(),
                sales: 250.0,
                quantity: 3.0,
                count: 2,
            },
        ];
        let text = render_groups("Sales by Year", "Year", &groups);
        let last = text.lines().last().unwrap();
        assert!(last.starts_with("Total"));
        assert!(last.contains("$350.00"));
    }

    #[test]
    fn test_groups_table_empty() {
        assert_eq!(render_groups("Sales by Month", "Month", &[]), "Sales by Month\n(no data)\n");
    }

    #[test]
    fn test_answer_marks_warnings() {
        let ds = Dataset::default();
        let text = render_answer(&answer_question("hello there", &ds));
        assert!(text.starts_with("Q: hello there\nWarning: Sorry"));

        let text = render_answer(&answer_question("total sales", &ds));
        assert_eq!(text, "Q: total sales\nTotal sales: $0.00\n");
    }
}
