// Post records and the typed views each stage reads.
//
// A record is an ordered map of field name to JSON value, as loaded from the
// input file. Field names are case-insensitive: they are trimmed,
// lower-cased and have inner spaces replaced by `_` at load time. Stages
// never reach into records ad hoc; they ask the dataset for a typed view,
// which checks the schema first.

pub mod io;

use serde_json::{Map, Value};

use crate::error::{PipelineError, PipelineResult};

pub const FIELD_POST: &str = "post";
pub const FIELD_POST_LIMPIO: &str = "post_limpio";
pub const FIELD_CLUSTER: &str = "cluster";
pub const FIELD_PUBLISHED: &str = "published";

/// One input row.
pub type Record = Map<String, Value>;

/// Normalization input.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPost {
    pub post: Option<String>,
}

/// Embedding and global keyword input.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanPost {
    pub post_limpio: String,
}

/// Grouped keyword input. `cluster` is `None` when the row has no label.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusteredPost {
    pub post_limpio: String,
    pub cluster: Option<String>,
}

/// A loaded collection of records with its schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Record>,
}

/// Canonical form of a field name.
pub fn canonical_field(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

impl Dataset {
    /// Build a dataset, canonicalizing field names. The schema is the
    /// ordered union of all field names.
    ///
    /// Two keys of one record that canonicalize to the same name (`"Post"`
    /// and `"post "`) are invalid input.
    pub fn from_records(records: Vec<Record>) -> PipelineResult<Self> {
        let mut dataset = Self::default();
        for (i, record) in records.into_iter().enumerate() {
            let mut row = Record::new();
            for (key, value) in record {
                let field = canonical_field(&key);
                if row.contains_key(&field) {
                    return Err(PipelineError::invalid_input(format!(
                        "record {}: more than one field maps to '{field}'",
                        i + 1
                    )));
                }
                row.insert(field, value);
            }
            for key in row.keys() {
                if !dataset.columns.iter().any(|c| c == key) {
                    dataset.columns.push(key.clone());
                }
            }
            dataset.rows.push(row);
        }
        Ok(dataset)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.rows
    }

    pub fn records_mut(&mut self) -> &mut [Record] {
        &mut self.rows
    }

    pub fn into_records(self) -> Vec<Record> {
        self.rows
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.columns.iter().any(|c| c == field)
    }

    /// Fail with a validation error if `field` is not in the schema.
    pub fn require(&self, field: &str) -> PipelineResult<()> {
        if self.has_field(field) {
            Ok(())
        } else {
            Err(PipelineError::missing_field(field))
        }
    }

    /// Normalization view: raw `post` text per record.
    pub fn raw_posts(&self) -> PipelineResult<Vec<RawPost>> {
        self.require(FIELD_POST)?;
        Ok(self
            .rows
            .iter()
            .map(|r| RawPost {
                post: r.get(FIELD_POST).and_then(value_as_text),
            })
            .collect())
    }

    /// Normalized text per record; missing values become empty strings.
    pub fn clean_posts(&self) -> PipelineResult<Vec<CleanPost>> {
        self.require(FIELD_POST_LIMPIO)?;
        Ok(self
            .rows
            .iter()
            .map(|r| CleanPost {
                post_limpio: r
                    .get(FIELD_POST_LIMPIO)
                    .and_then(value_as_text)
                    .unwrap_or_default(),
            })
            .collect())
    }

    /// Normalized text plus cluster label per record.
    pub fn clustered_posts(&self) -> PipelineResult<Vec<ClusteredPost>> {
        self.require(FIELD_POST_LIMPIO)?;
        self.require(FIELD_CLUSTER)?;
        Ok(self
            .rows
            .iter()
            .map(|r| ClusteredPost {
                post_limpio: r
                    .get(FIELD_POST_LIMPIO)
                    .and_then(value_as_text)
                    .unwrap_or_default(),
                cluster: r.get(FIELD_CLUSTER).and_then(value_as_text),
            })
            .collect())
    }

    /// Set `field` on every record, appending it to the schema if new.
    /// `values` must have one entry per record.
    pub fn set_field(&mut self, field: &str, values: Vec<Value>) -> PipelineResult<()> {
        if values.len() != self.rows.len() {
            return Err(PipelineError::misconfiguration(format!(
                "cannot set '{field}': {} values for {} records",
                values.len(),
                self.rows.len()
            )));
        }
        let field = canonical_field(field);
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.insert(field.clone(), value);
        }
        if !self.has_field(&field) {
            self.columns.push(field);
        }
        Ok(())
    }

    /// Register a column written directly through `records_mut`.
    pub fn add_column(&mut self, field: &str) {
        let field = canonical_field(field);
        if !self.has_field(&field) {
            self.columns.push(field);
        }
    }
}

/// Text content of a field value. Null and empty containers count as
/// missing; numbers and booleans are rendered as text.
pub fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}
