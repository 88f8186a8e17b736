//! Report emission.
//!
//! Turns a [`CalendarLayout`] into a standalone HTML page or into JSON. This
//! is the only place colours become strings.
//!
//! Multi-project days are drawn with a top-to-bottom `linear-gradient` whose
//! stops come in pairs at the same colour, which produces hard-edged bands
//! instead of a blend.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use tracing::info;

use crate::layout::{Band, CalendarLayout, DayCell, DayFill, MonthRow};

const STYLE: &str = r"
    :root { font-family: system-ui, sans-serif; background: #0d1117; color: #e6edf3; }
    body { max-width: 900px; margin: 1rem auto; padding: 1rem; }
    h1 { font-size: 1.25rem; font-weight: 600; margin-bottom: 0.5rem; }
    .subtitle { color: #8b949e; font-size: 0.875rem; margin-bottom: 1rem; }
    .grid { display: flex; flex-direction: column; gap: 4px; }
    .month-row { display: flex; align-items: center; gap: 8px; }
    .month-label { width: 64px; font-size: 11px; color: #8b949e; }
    .month-cells { display: flex; flex-wrap: wrap; gap: 2px; }
    .cell { width: 12px; height: 12px; border-radius: 2px; display: inline-block; }
    .cell.empty { background: transparent; }
    .cell.none { background: #21262d; }
    .cell.low { opacity: 0.85; }
    .cell.mid { opacity: 1; }
    .cell.high { box-shadow: 0 0 0 1px rgba(255,255,255,0.2); }
    .legend { display: flex; flex-wrap: wrap; align-items: center; gap: 8px 16px; margin-top: 1rem; font-size: 12px; }
    .legend-item { width: 12px; height: 12px; border-radius: 2px; display: inline-block; }
    .legend-name { color: #8b949e; }
";

/// Renders the layout as a self-contained HTML document.
#[must_use]
pub fn render_html(layout: &CalendarLayout) -> String {
    let mut html = String::with_capacity(64 * 1024);

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("  <meta charset=\"utf-8\">\n  <title>Dev activity</title>\n");
    let _ = write!(html, "  <style>{STYLE}  </style>\n</head>\n<body>\n");
    html.push_str("  <h1>Dev activity</h1>\n");
    html.push_str(
        "  <p class=\"subtitle\">Days with file changes, by project (from activity log)</p>\n",
    );

    html.push_str("  <div class=\"grid\">\n");
    for month in &layout.months {
        push_month(&mut html, month);
    }
    html.push_str("  </div>\n");

    html.push_str("  <div class=\"legend\">\n");
    for entry in &layout.legend {
        let _ = writeln!(
            html,
            "    <span class=\"legend-item\" style=\"background:{}\"></span><span class=\"legend-name\">{}</span>",
            entry.color,
            escape(&entry.project)
        );
    }
    html.push_str("  </div>\n</body>\n</html>\n");

    html
}

fn push_month(html: &mut String, month: &MonthRow) {
    let _ = write!(
        html,
        "    <div class=\"month-row\"><span class=\"month-label\">{}</span><div class=\"month-cells\">",
        escape(&month.label)
    );

    for cell in &month.cells {
        match cell {
            DayCell::Placeholder => html.push_str("<span class=\"cell empty\"></span>"),
            DayCell::Empty { date } => {
                let _ = write!(html, "<span class=\"cell none\" title=\"{date}\"></span>");
            }
            DayCell::Active(day) => {
                let background = match &day.fill {
                    DayFill::Solid { color, .. } => color.to_string(),
                    DayFill::Banded { bands } => gradient(bands),
                };
                let _ = write!(
                    html,
                    "<span class=\"cell {}\" style=\"background:{}\" title=\"{}\"></span>",
                    day.intensity.as_str(),
                    background,
                    escape(&day.tooltip)
                );
            }
        }
    }

    html.push_str("</div></div>\n");
}

/// Hard-stop gradient, one pair of stops per band.
fn gradient(bands: &[Band]) -> String {
    let stops: Vec<String> = bands
        .iter()
        .map(|b| {
            format!(
                "{color} {start}%, {color} {end}%",
                color = b.color,
                start = percent(b.start),
                end = percent(b.end)
            )
        })
        .collect();
    format!("linear-gradient(to bottom, {})", stops.join(", "))
}

/// Formats a fraction as a percentage with at most two decimals.
fn percent(fraction: f64) -> String {
    let formatted = format!("{:.2}", fraction * 100.0);
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

/// Escapes text for use in HTML content and double-quoted attributes.
fn escape(text: &str) -> String {
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

/// Renders the layout as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render_json(layout: &CalendarLayout) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(layout)
}

/// Writes a rendered report to `path`, creating parent directories.
///
/// # Errors
///
/// Returns an I/O error if the directories or the file cannot be written.
pub fn write_report(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    info!(path = %path.display(), bytes = contents.len(), "Wrote report");
    Ok(())
}
