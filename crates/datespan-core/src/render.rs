use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use unicode_width::UnicodeWidthStr;

use crate::calendar::{WEEKDAY_LABELS, month_name};
use crate::codec::{DateStyle, encode, format_date};
use crate::config::Config;
use crate::filter::{FilterAction, IntervalFilter};
use crate::grid::MonthGrid;
use crate::range::ResolvedRange;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color })
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip(self, grid), fields(year = grid.year, month0 = grid.month0))]
    pub fn print_grid(&mut self, grid: &MonthGrid) -> anyhow::Result<()> {
        let out = io::stdout().lock();
        self.write_grid(out, grid)
    }

    /// Month title, weekday header and six rows. Highlighted days are
    /// bracketed, today carries a `*`.
    pub fn write_grid<W: Write>(&self, mut out: W, grid: &MonthGrid) -> anyhow::Result<()> {
        let title = format!("{} {}", month_name(grid.month0), grid.year);
        let row_width = WEEKDAY_LABELS.len() * 5;
        let pad = row_width.saturating_sub(UnicodeWidthStr::width(title.as_str())) / 2;
        writeln!(out, "{}{}", " ".repeat(pad), self.paint(&title, "1"))?;

        for label in WEEKDAY_LABELS {
            write!(out, " {label:>3} ")?;
        }
        writeln!(out)?;

        for row in grid.rows() {
            for cell in row {
                let day = format!("{:>2}", cell.day);
                let marked = match (cell.is_highlighted, cell.is_today) {
                    (true, true) => format!("[{day}*"),
                    (true, false) => format!("[{day}]"),
                    (false, true) => format!(" {day}*"),
                    (false, false) => format!(" {day} "),
                };
                let painted = if !cell.in_current_month {
                    self.paint(&marked, "2")
                } else if cell.is_highlighted {
                    self.paint(&marked, "7")
                } else if cell.is_today {
                    self.paint(&marked, "33")
                } else {
                    marked
                };
                write!(out, "{painted} ")?;
            }
            writeln!(out)?;
        }

        Ok(())
    }

    #[tracing::instrument(skip(self, range))]
    pub fn print_range(&mut self, label: &str, range: &ResolvedRange) -> anyhow::Result<()> {
        let out = io::stdout().lock();
        self.write_range(out, label, range)
    }

    pub fn write_range<W: Write>(
        &self,
        out: W,
        label: &str,
        range: &ResolvedRange,
    ) -> anyhow::Result<()> {
        let rows = vec![
            vec!["range".to_string(), self.paint(label, "33")],
            vec![
                "start".to_string(),
                range.start_date().format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
            ],
            vec![
                "end".to_string(),
                range.end_date().format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
            ],
            vec!["days".to_string(), range.day_count().to_string()],
            vec![
                "input".to_string(),
                format!(
                    "{} - {}",
                    format_date(range.start_date(), DateStyle::InputBox),
                    format_date(range.end_date(), DateStyle::InputBox)
                ),
            ],
            vec![
                "anchor".to_string(),
                format!(
                    "{} {}",
                    month_name(range.anchor_month0()),
                    range.anchor_year()
                ),
            ],
            vec!["shared".to_string(), encode(range)],
        ];

        write_table(out, vec!["Key".to_string(), "Value".to_string()], rows)
    }

    pub fn print_rows(&mut self, headers: Vec<String>, rows: Vec<Vec<String>>) -> anyhow::Result<()> {
        let out = io::stdout().lock();
        write_table(out, headers, rows)
    }

    #[tracing::instrument(skip(self, filter))]
    pub fn print_filter(
        &mut self,
        filter: &IntervalFilter,
        action: FilterAction,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        let payload = serde_json::json!({
            "action": action,
            "filter": filter,
        });
        writeln!(out, "{}", serde_json::to_string_pretty(&payload)?)?;
        Ok(())
    }

    pub fn print_line(&mut self, line: &str) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{line}")?;
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
