//! HTML email body
//!
//! Builds a self-contained HTML document from the report table. All
//! interpolated text goes through `escape`; the markup itself is fixed.
//!
//! Style classes:
//! - `present` / `missing` / `invalid` on timestamp cells
//! - `incomplete` on summary rows with at least one missing timestamp
//! - `exit` on raw exit events

use crate::domain::report::{ReportLayout, ReportRow, ReportTable};
use std::fmt::Write;

const STYLE: &str = "\
body { font-family: Arial, sans-serif; background-color: #f4f4f4; padding: 20px; }
.card { max-width: 800px; margin: auto; background: #fff; padding: 20px; border-radius: 6px; box-shadow: 0 2px 5px rgba(0,0,0,0.1); }
h2 { text-align: center; color: #cc0000; }
.date { text-align: center; color: #555; }
.counts { text-align: center; color: #333; }
table { width: 100%; border-collapse: collapse; }
th { background-color: #f2f2f2; padding: 8px; }
td { padding: 8px; text-align: center; border: 1px solid #ddd; }
td.present { color: #222; }
td.missing { background-color: #fff4e5; color: #b26a00; }
td.invalid { background-color: #ffe6e6; color: #cc0000; }
tr.incomplete { background-color: #fffaf2; }
tr.exit { background-color: #e6ffe6; }
.footer { text-align: center; font-size: 12px; color: #888; margin-top: 20px; }";

/// Fixed text around the table
#[derive(Debug, Clone)]
pub struct HtmlReportContext<'a> {
    pub title: &'a str,
    /// Already formatted report date, e.g. "Monday, January 1, 2024"
    pub date: &'a str,
    pub organization: &'a str,
    pub year: i32,
}

/// Escape text for HTML element and attribute content
pub fn escape(text: &str) -> String {
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

fn row_class(layout: ReportLayout, row: &ReportRow) -> Option<&'static str> {
    match layout {
        ReportLayout::Summary if row.has_missing() => Some("incomplete"),
        ReportLayout::Events if row.is_exit => Some("exit"),
        _ => None,
    }
}

fn write_open_tag(out: &mut String, tag: &str, class: Option<&str>) {
    match class {
        Some(class) => {
            let _ = write!(out, "<{tag} class=\"{class}\">");
        }
        None => {
            let _ = write!(out, "<{tag}>");
        }
    }
}

fn write_row(out: &mut String, layout: ReportLayout, row: &ReportRow) {
    write_open_tag(out, "tr", row_class(layout, row));
    let _ = write!(out, "<td>{}</td>", escape(&row.device_name));
    for cell in &row.cells {
        write_open_tag(out, "td", cell.css_class());
        let _ = write!(out, "{}</td>", escape(cell.as_str()));
    }
    out.push_str("</tr>\n");
}

/// Render the full email body
pub fn render(table: &ReportTable, ctx: &HtmlReportContext<'_>) -> String {
    let mut out = String::with_capacity(2048 + table.rows.len() * 160);
    let title = escape(ctx.title);

    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n");
    out.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n");
    let _ = writeln!(out, "<title>{title}</title>");
    let _ = writeln!(out, "<style>\n{STYLE}\n</style>");
    out.push_str("</head>\n<body>\n<div class=\"card\">\n");

    let _ = writeln!(out, "<h2>{title}</h2>");
    let _ = writeln!(out, "<p class=\"date\">{}</p>", escape(ctx.date));
    let _ = writeln!(
        out,
        "<p class=\"counts\">Devices: <strong>{}</strong> &middot; Events: <strong>{}</strong></p>",
        table.device_count, table.event_count
    );

    out.push_str("<table>\n<tr>");
    for header in &table.headers {
        let _ = write!(out, "<th>{}</th>", escape(header));
    }
    out.push_str("</tr>\n");

    for row in &table.rows {
        write_row(&mut out, table.layout, row);
    }
    out.push_str("</table>\n");

    let _ = writeln!(
        out,
        "<p class=\"footer\">&copy; {} {}</p>",
        ctx.year,
        escape(ctx.organization)
    );
    out.push_str("</div>\n</body>\n</html>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::report::Cell;

    fn ctx() -> HtmlReportContext<'static> {
        HtmlReportContext {
            title: "Geofence Entry/Exit Report",
            date: "Monday, January 1, 2024",
            organization: "Fleet Management",
            year: 2024,
        }
    }

    fn summary_table() -> ReportTable {
        ReportTable {
            layout: ReportLayout::Summary,
            headers: vec!["Device Name".into(), "First Enter".into(), "Last Exit".into()],
            rows: vec![
                ReportRow {
                    device_name: "Truck A".into(),
                    cells: vec![
                        Cell::Present("2024-01-01 11:10:00".into()),
                        Cell::Present("2024-01-01 16:00:00".into()),
                    ],
                    is_exit: false,
                },
                ReportRow {
                    device_name: "Truck B".into(),
                    cells: vec![Cell::Present("2024-01-01 12:00:00".into()), Cell::Missing],
                    is_exit: false,
                },
            ],
            device_count: 2,
            event_count: 3,
        }
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("<b>\"A&B\"</b>"), "&lt;b&gt;&quot;A&amp;B&quot;&lt;/b&gt;");
        assert_eq!(escape("O'Neil"), "O&#39;Neil");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_render_contains_counts_and_header() {
        let html = render(&summary_table(), &ctx());

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<h2>Geofence Entry/Exit Report</h2>"));
        assert!(html.contains("Monday, January 1, 2024"));
        assert!(html.contains("Devices: <strong>2</strong>"));
        assert!(html.contains("Events: <strong>3</strong>"));
        assert!(html.contains("<th>Last Exit</th>"));
        assert!(html.contains("&copy; 2024 Fleet Management"));
        assert!(html.trim_end().ends_with("</html>"));
    }

    #[test]
    fn test_missing_cell_is_distinguished() {
        let html = render(&summary_table(), &ctx());

        assert!(html.contains("<td class=\"missing\">-</td>"));
        assert!(html.contains("<td class=\"present\">2024-01-01 16:00:00</td>"));
        assert!(html.contains("<tr class=\"incomplete\"><td>Truck B</td>"));
        assert!(html.contains("<tr><td>Truck A</td>"));
    }

    #[test]
    fn test_invalid_time_cell() {
        let mut table = summary_table();
        table.rows[0].cells[0] = Cell::Invalid;

        let html = render(&table, &ctx());
        assert!(html.contains("<td class=\"invalid\">Invalid Time</td>"));
    }

    #[test]
    fn test_event_layout_highlights_exits() {
        let table = ReportTable {
            layout: ReportLayout::Events,
            headers: vec!["Device Name".into(), "Status".into()],
            rows: vec![ReportRow {
                device_name: "Truck A".into(),
                cells: vec![Cell::Text("geofenceExit".into())],
                is_exit: true,
            }],
            device_count: 1,
            event_count: 1,
        };

        let html = render(&table, &ctx());
        assert!(html.contains("<tr class=\"exit\"><td>Truck A</td><td>geofenceExit</td></tr>"));
    }

    #[test]
    fn test_device_names_are_escaped() {
        let mut table = summary_table();
        table.rows[0].device_name = "<script>alert(1)</script>".into();

        let html = render(&table, &ctx());
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
