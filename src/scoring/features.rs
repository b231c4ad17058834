//! Feature assembly: raw records to model-ready vectors.

use crate::error::{Error, Result};

/// One raw input record: an identifier plus named numeric values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    /// Caller-assigned identifier, echoed in the score.
    pub id: String,
    /// Named values in arbitrary order.
    pub values: Vec<(String, f64)>,
}

impl Record {
    /// Create an empty record.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            values: Vec::new(),
        }
    }

    /// Add a named value.
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.values.push((name.into(), value));
        self
    }

    /// Look up a value by name. The last occurrence wins.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }
}

/// Turns a record into a feature vector.
///
/// Implementations are pure and called from the stream's task, one record at
/// a time.
pub trait FeatureTransform: Send + Sync {
    /// Build the feature vector for `record`.
    fn assemble(&self, record: &Record) -> Result<Vec<f32>>;

    /// Length of every vector this transform produces.
    fn dimension(&self) -> usize;
}

#[derive(Debug, Clone)]
struct Column {
    name: String,
    scaling: Option<(f64, f64)>,
}

/// Selects a fixed, ordered list of columns, optionally standardizing each.
#[derive(Debug, Clone)]
pub struct ColumnAssembler {
    columns: Vec<Column>,
}

impl ColumnAssembler {
    /// Create an assembler over the given columns, in order.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns
                .into_iter()
                .map(|name| Column {
                    name: name.into(),
                    scaling: None,
                })
                .collect(),
        }
    }

    /// Standardize `column` as `(x - mean) / std`.
    pub fn standardize(mut self, column: &str, mean: f64, std: f64) -> Result<Self> {
        if !(std.is_finite() && std > 0.0) || !mean.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "column '{}': invalid scaling (mean {}, std {})",
                column, mean, std
            )));
        }
        let col = self
            .columns
            .iter_mut()
            .find(|c| c.name == column)
            .ok_or_else(|| Error::InvalidConfig(format!("unknown column '{}'", column)))?;
        col.scaling = Some((mean, std));
        Ok(self)
    }

    /// Column names, in output order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

impl FeatureTransform for ColumnAssembler {
    fn assemble(&self, record: &Record) -> Result<Vec<f32>> {
        self.columns
            .iter()
            .map(|col| {
                let raw = record.get(&col.name).ok_or_else(|| {
                    Error::Feature(format!(
                        "record '{}': missing column '{}'",
                        record.id, col.name
                    ))
                })?;
                if !raw.is_finite() {
                    return Err(Error::Feature(format!(
                        "record '{}': column '{}' is not finite",
                        record.id, col.name
                    )));
                }
                let value = match col.scaling {
                    Some((mean, std)) => (raw - mean) / std,
                    None => raw,
                };
                Ok(value as f32)
            })
            .collect()
    }

    fn dimension(&self) -> usize {
        self.columns.len()
    }
}
