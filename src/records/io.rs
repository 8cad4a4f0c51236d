// Reading and writing records and keyword tables.
//
// Input files are JSON arrays of objects, JSON Lines or CSV with a header
// row. Outputs go next to the input under a fixed base name, with a numeric
// suffix when the name is taken, so earlier results are never overwritten.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::error::PipelineError;
use crate::topics::frequency::KeywordFrequency;

use super::{value_as_text, Dataset, Record};

/// File formats for records and keyword tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    JsonLines,
    Csv,
}

impl FileFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Json => "json",
            FileFormat::JsonLines => "jsonl",
            FileFormat::Csv => "csv",
        }
    }

    /// Format implied by a path's extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        ext.parse::<FileFormat>()
            .with_context(|| format!("Unsupported file type: {}", path.display()))
    }
}

impl FromStr for FileFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(FileFormat::Json),
            "jsonl" | "ndjson" => Ok(FileFormat::JsonLines),
            "csv" => Ok(FileFormat::Csv),
            other => anyhow::bail!("unknown format '{other}' (expected json, jsonl or csv)"),
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Load records from a `.json`, `.jsonl` or `.csv` file.
pub fn load_dataset(path: &Path) -> Result<Dataset> {
    if !path.exists() {
        anyhow::bail!("Input file not found: {}", path.display());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let dataset = match FileFormat::from_path(path)? {
        FileFormat::Json => parse_json(&content)?,
        FileFormat::JsonLines => parse_json_lines(&content)?,
        FileFormat::Csv => parse_csv(&content)?,
    };

    tracing::info!(
        records = dataset.len(),
        columns = dataset.columns().len(),
        "Loaded {}",
        path.display()
    );
    Ok(dataset)
}

/// Parse a JSON array of objects.
pub fn parse_json(content: &str) -> Result<Dataset> {
    let value: Value = serde_json::from_str(content).context("Input is not valid JSON")?;
    let rows = match value {
        Value::Array(rows) => rows,
        _ => return Err(PipelineError::invalid_input("expected a JSON array of records").into()),
    };
    let records = rows
        .into_iter()
        .enumerate()
        .map(|(i, row)| into_record(row, i + 1))
        .collect::<Result<Vec<_>>>()?;
    Ok(Dataset::from_records(records)?)
}

/// Parse JSON Lines: one object per non-blank line.
pub fn parse_json_lines(content: &str) -> Result<Dataset> {
    let mut records = Vec::new();
    for (i, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line)
            .with_context(|| format!("Line {} is not valid JSON", i + 1))?;
        records.push(into_record(value, i + 1)?);
    }
    Ok(Dataset::from_records(records)?)
}

/// Parse CSV with a header row. Empty cells become null and numeric cells
/// become numbers; everything else stays text.
pub fn parse_csv(content: &str) -> Result<Dataset> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut reader = csv::ReaderBuilder::new().from_reader(content.as_bytes());
    let headers = reader.headers().context("Failed to read CSV header")?.clone();
    for (i, name) in headers.iter().enumerate() {
        if headers.iter().take(i).any(|earlier| earlier == name) {
            let err = PipelineError::invalid_input(format!("duplicate CSV column '{name}'"));
            return Err(err.into());
        }
    }

    let mut records = Vec::new();
    for (i, row) in reader.records().enumerate() {
        let row = row.with_context(|| format!("CSV row {} is malformed", i + 1))?;
        let record: Record = headers
            .iter()
            .zip(row.iter())
            .map(|(name, cell)| (name.to_string(), csv_cell_value(cell)))
            .collect();
        records.push(record);
    }
    Ok(Dataset::from_records(records)?)
}

fn csv_cell_value(cell: &str) -> Value {
    if cell.trim().is_empty() {
        return Value::Null;
    }
    if let Ok(n) = cell.parse::<i64>() {
        return Value::from(n);
    }
    match cell.parse::<f64>() {
        Ok(f) if f.is_finite() => Value::from(f),
        _ => Value::String(cell.to_string()),
    }
}

fn into_record(value: Value, position: usize) -> Result<Record> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(PipelineError::invalid_input(format!("record {position} is not an object")).into()),
    }
}

/// Write all records in the given format.
pub fn save_dataset(dataset: &Dataset, path: &Path, format: FileFormat) -> Result<()> {
    let content: Vec<u8> = match format {
        FileFormat::Json => serde_json::to_string_pretty(dataset.records())?.into_bytes(),
        FileFormat::JsonLines => {
            let mut out = String::new();
            for record in dataset.records() {
                out.push_str(&serde_json::to_string(record)?);
                out.push('\n');
            }
            out.into_bytes()
        }
        FileFormat::Csv => {
            let rows = dataset.records().iter().map(|r| {
                dataset
                    .columns()
                    .iter()
                    .map(|c| r.get(c).and_then(value_as_text).unwrap_or_default())
                    .collect::<Vec<_>>()
            });
            to_csv(dataset.columns(), rows)?
        }
    };
    write_file(path, &content)
}

/// Write a keyword table in the given format.
pub fn save_keywords(table: &[KeywordFrequency], path: &Path, format: FileFormat) -> Result<()> {
    let content: Vec<u8> = match format {
        FileFormat::Json => serde_json::to_string_pretty(table)?.into_bytes(),
        FileFormat::JsonLines => {
            let mut out = String::new();
            for row in table {
                out.push_str(&serde_json::to_string(row)?);
                out.push('\n');
            }
            out.into_bytes()
        }
        FileFormat::Csv => {
            let header = ["cluster", "palabra", "frecuencia"].map(String::from);
            let rows = table
                .iter()
                .map(|r| vec![r.group.clone(), r.word.clone(), r.count.to_string()]);
            to_csv(&header, rows)?
        }
    };
    write_file(path, &content)
}

/// Load a keyword table written by `save_keywords` in any format.
///
/// Rows without a group or word are skipped. A missing or non-integer
/// `frecuencia` is invalid input.
pub fn load_keywords(path: &Path) -> Result<Vec<KeywordFrequency>> {
    let dataset = load_dataset(path)?;
    for field in ["cluster", "palabra", "frecuencia"] {
        dataset.require(field)?;
    }
    let mut table = Vec::with_capacity(dataset.len());
    for (i, record) in dataset.records().iter().enumerate() {
        let (Some(group), Some(word)) = (
            record.get("cluster").and_then(value_as_text),
            record.get("palabra").and_then(value_as_text),
        ) else {
            continue;
        };
        let count = record
            .get("frecuencia")
            .and_then(count_value)
            .ok_or_else(|| {
                PipelineError::invalid_input(format!(
                    "row {}: 'frecuencia' must be a non-negative integer",
                    i + 1
                ))
            })?;
        table.push(KeywordFrequency { group, word, count });
    }
    Ok(table)
}

fn count_value(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// First free path among `dir/base.ext`, `dir/base_1.ext`, `dir/base_2.ext`, ...
pub fn unique_output_path(dir: &Path, base: &str, extension: &str) -> PathBuf {
    let mut candidate = dir.join(format!("{base}.{extension}"));
    let mut counter = 1;
    while candidate.exists() {
        candidate = dir.join(format!("{base}_{counter}.{extension}"));
        counter += 1;
    }
    candidate
}

/// Directory an output should go to: next to the input file.
pub fn output_dir(input: &Path) -> PathBuf {
    match input.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Clean up a path pasted from a file manager: surrounding whitespace and
/// quotes are stripped, backslashes become slashes.
pub fn clean_path_input(raw: &str) -> PathBuf {
    let trimmed = raw.trim().trim_matches('"').trim_matches('\'');
    PathBuf::from(trimmed.replace('\\', "/"))
}

fn write_file(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

fn to_csv<I>(header: &[String], rows: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(&row)?;
    }
    writer.into_inner().map_err(|e| e.into_error().into())
}
