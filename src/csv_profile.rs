use anyhow::{bail, Result};
use serde::Serialize;
use std::collections::HashSet;

/// How many leading data rows are included verbatim in the prompt
const SAMPLE_ROW_LIMIT: usize = 5;
/// Cells longer than this are truncated before entering the prompt
const CELL_WIDTH_LIMIT: usize = 40;
/// Distinct-value tracking is capped to bound memory on huge files
const DISTINCT_TRACK_LIMIT: usize = 1000;

/// Inferred type of a CSV column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Integer,
    Float,
    Boolean,
    Date,
    Text,
}

impl ColumnKind {
    /// Combine the kinds of two observed values. Mixed numeric widens to
    /// Float, anything else mixed demotes to Text.
    fn merge(self, other: ColumnKind) -> ColumnKind {
        use ColumnKind::*;
        match (self, other) {
            (a, b) if a == b => a,
            (Integer, Float) | (Float, Integer) => Float,
            _ => Text,
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnKind::Integer | ColumnKind::Float)
    }

    fn label(self) -> &'static str {
        match self {
            ColumnKind::Integer => "integer",
            ColumnKind::Float => "float",
            ColumnKind::Boolean => "boolean",
            ColumnKind::Date => "date",
            ColumnKind::Text => "text",
        }
    }
}

/// Summary of one column
#[derive(Debug, Clone, Serialize)]
pub struct ColumnProfile {
    pub name: String,
    pub kind: ColumnKind,
    pub non_null: usize,
    pub distinct: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
}

/// Summary of a parsed CSV dataset, small enough to embed in an LLM prompt
#[derive(Debug, Clone, Serialize)]
pub struct CsvProfile {
    pub row_count: usize,
    pub columns: Vec<ColumnProfile>,
    pub sample_rows: Vec<Vec<String>>,
}

#[derive(Default)]
struct ColumnAcc {
    kind: Option<ColumnKind>,
    non_null: usize,
    distinct: HashSet<String>,
    sum: f64,
    numeric_count: usize,
    min: Option<f64>,
    max: Option<f64>,
}

impl ColumnAcc {
    fn observe(&mut self, raw: &str) {
        let value = raw.trim();
        if value.is_empty() {
            // Blank cells never affect the inferred kind
            return;
        }
        self.non_null += 1;

        if self.distinct.len() < DISTINCT_TRACK_LIMIT {
            self.distinct.insert(value.to_string());
        }

        let kind = classify_value(value);
        self.kind = Some(match self.kind {
            Some(existing) => existing.merge(kind),
            None => kind,
        });

        if kind.is_numeric() {
            if let Ok(n) = value.parse::<f64>() {
                self.sum += n;
                self.numeric_count += 1;
                self.min = Some(self.min.map_or(n, |m| m.min(n)));
                self.max = Some(self.max.map_or(n, |m| m.max(n)));
            }
        }
    }

    fn finish(self, name: String) -> ColumnProfile {
        let kind = self.kind.unwrap_or(ColumnKind::Text);
        let numeric = kind.is_numeric() && self.numeric_count > 0;
        ColumnProfile {
            name,
            kind,
            non_null: self.non_null,
            distinct: self.distinct.len(),
            min: if numeric { self.min } else { None },
            max: if numeric { self.max } else { None },
            mean: if numeric {
                Some(self.sum / self.numeric_count as f64)
            } else {
                None
            },
        }
    }
}

fn classify_value(value: &str) -> ColumnKind {
    let lowered = value.to_ascii_lowercase();
    if matches!(lowered.as_str(), "true" | "false" | "yes" | "no") {
        return ColumnKind::Boolean;
    }
    if value.parse::<i64>().is_ok() {
        return ColumnKind::Integer;
    }
    if value.parse::<f64>().is_ok() {
        return ColumnKind::Float;
    }
    if is_date_like(value) {
        return ColumnKind::Date;
    }
    ColumnKind::Text
}

fn is_date_like(value: &str) -> bool {
    const FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%m/%d/%Y"];
    FORMATS
        .iter()
        .any(|fmt| chrono::NaiveDate::parse_from_str(value, fmt).is_ok())
}

/// Decode uploaded CSV bytes. Strict UTF-8 first, Windows-1252 fallback for
/// the spreadsheet exports that inevitably show up.
pub fn decode_csv_bytes(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Parse raw CSV bytes into a profile. Headers come from the first row;
/// ragged rows are tolerated, cells beyond the header width are ignored.
pub fn profile_csv(bytes: &[u8]) -> Result<CsvProfile> {
    let text = decode_csv_bytes(bytes);
    if text.trim().is_empty() {
        bail!("CSV input is empty");
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let name = h.trim();
            if name.is_empty() {
                format!("column_{}", i + 1)
            } else {
                name.to_string()
            }
        })
        .collect();
    if headers.is_empty() {
        bail!("CSV has no columns");
    }

    let mut accs: Vec<ColumnAcc> = headers.iter().map(|_| ColumnAcc::default()).collect();
    let mut sample_rows: Vec<Vec<String>> = Vec::new();
    let mut row_count = 0usize;

    for record in reader.records() {
        let record = record?;
        row_count += 1;

        for (i, acc) in accs.iter_mut().enumerate() {
            if let Some(cell) = record.get(i) {
                acc.observe(cell);
            }
        }

        if sample_rows.len() < SAMPLE_ROW_LIMIT {
            let row = (0..headers.len())
                .map(|i| truncate_cell(record.get(i).unwrap_or("")))
                .collect();
            sample_rows.push(row);
        }
    }

    let columns = headers
        .into_iter()
        .zip(accs)
        .map(|(name, acc)| acc.finish(name))
        .collect();

    Ok(CsvProfile {
        row_count,
        columns,
        sample_rows,
    })
}

fn truncate_cell(cell: &str) -> String {
    let cell = cell.trim();
    if cell.chars().count() <= CELL_WIDTH_LIMIT {
        return cell.to_string();
    }
    let truncated: String = cell.chars().take(CELL_WIDTH_LIMIT).collect();
    format!("{truncated}…")
}

fn format_stat(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{n:.0}")
    } else {
        format!("{n:.2}")
    }
}

impl CsvProfile {
    /// Render the deterministic plain-text block inserted into the LLM prompt
    pub fn render_prompt(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "Dataset: {} rows x {} columns\n\nColumns:\n",
            self.row_count,
            self.columns.len()
        ));

        for col in &self.columns {
            out.push_str(&format!(
                "- {} ({}): {} non-null, {} distinct",
                col.name,
                col.kind.label(),
                col.non_null,
                col.distinct
            ));
            if let (Some(min), Some(max), Some(mean)) = (col.min, col.max, col.mean) {
                out.push_str(&format!(
                    ", min {}, max {}, mean {}",
                    format_stat(min),
                    format_stat(max),
                    format_stat(mean)
                ));
            }
            out.push('\n');
        }

        if !self.sample_rows.is_empty() {
            out.push_str("\nSample rows:\n");
            let header_line: Vec<&str> =
                self.columns.iter().map(|c| c.name.as_str()).collect();
            out.push_str(&header_line.join(" | "));
            out.push('\n');
            for row in &self.sample_rows {
                out.push_str(&row.join(" | "));
                out.push('\n');
            }
        }

        out
    }
}

#[cfg(test)]
#[path = "csv_profile_test.rs"]
mod tests;
