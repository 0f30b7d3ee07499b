//! Built-in data loaders.

use crate::config::{parse_params, Params};
use crate::data::dataset::{Dataset, ID_FIELD};
use crate::error::{DoraError, Result};
use ndarray::Array2;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Loads one fit or score set from disk.
pub trait DataLoader: Send + Sync {
    fn name(&self) -> &'static str;

    /// Check loader parameters without touching the filesystem.
    fn validate_params(&self, params: &Params) -> Result<()>;

    /// Load `path`. The returned dataset has an id per sample and every field
    /// has the same sample count.
    fn load(&self, path: &Path, params: &Params) -> Result<Dataset>;
}

/// Name of the field holding every numeric column of a feature-vector file.
pub const DATA_FIELD: &str = "data";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct FeatureVectorParams {
    #[serde(default = "default_delimiter")]
    delimiter: char,
    #[serde(default = "default_has_header")]
    has_header: bool,
    #[serde(default)]
    id_column: Option<String>,
}

fn default_delimiter() -> char {
    ','
}

fn default_has_header() -> bool {
    true
}

/// Delimited text, one sample per line.
pub struct FeatureVectorLoader;

impl FeatureVectorLoader {
    pub const NAME: &'static str = "featurevector";

    fn params(&self, params: &Params) -> Result<FeatureVectorParams> {
        let parsed: FeatureVectorParams =
            parse_params(&format!("data loader {}", Self::NAME), params)?;
        if parsed.id_column.is_some() && !parsed.has_header {
            return Err(DoraError::config(
                "data loader featurevector: id_column requires has_header",
            ));
        }
        Ok(parsed)
    }
}

impl DataLoader for FeatureVectorLoader {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn validate_params(&self, params: &Params) -> Result<()> {
        self.params(params).map(|_| ())
    }

    fn load(&self, path: &Path, params: &Params) -> Result<Dataset> {
        let params = self.params(params)?;
        let content = std::fs::read_to_string(path)
            .map_err(|e| DoraError::data_load(path, e.to_string()))?;

        let mut lines = content
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'));

        let split = |line: &str| -> Vec<String> {
            line.split(params.delimiter)
                .map(|cell| cell.trim().to_string())
                .collect()
        };

        let header: Option<Vec<String>> = if params.has_header {
            match lines.next() {
                Some((_, line)) => Some(split(line)),
                None => return Err(DoraError::data_load(path, "file has no header line")),
            }
        } else {
            None
        };

        let id_index = match (&params.id_column, &header) {
            (Some(column), Some(header)) => Some(
                header
                    .iter()
                    .position(|h| h == column)
                    .ok_or_else(|| {
                        DoraError::data_load(path, format!("id column '{column}' not in header"))
                    })?,
            ),
            _ => None,
        };

        let mut ids = Vec::new();
        let mut rows: Vec<Vec<f64>> = Vec::new();
        let mut width: Option<usize> = header.as_ref().map(Vec::len);

        for (line_no, line) in lines {
            let cells = split(line);
            match width {
                Some(w) if w != cells.len() => {
                    return Err(DoraError::data_load(
                        path,
                        format!("line {line_no}: expected {w} columns, found {}", cells.len()),
                    ))
                }
                None => width = Some(cells.len()),
                _ => {}
            }

            let mut row = Vec::with_capacity(cells.len());
            for (col, cell) in cells.iter().enumerate() {
                if Some(col) == id_index {
                    ids.push(cell.clone());
                    continue;
                }
                let value: f64 = cell.parse().map_err(|_| {
                    DoraError::data_load(path, format!("line {line_no}: '{cell}' is not a number"))
                })?;
                if !value.is_finite() {
                    return Err(DoraError::data_load(
                        path,
                        format!("line {line_no}: '{cell}' is not a finite number"),
                    ));
                }
                row.push(value);
            }
            if id_index.is_none() {
                ids.push(rows.len().to_string());
            }
            rows.push(row);
        }

        let width = width.unwrap_or(0);
        let names: Vec<String> = match header {
            Some(header) => header
                .into_iter()
                .enumerate()
                .filter(|(col, _)| Some(*col) != id_index)
                .map(|(_, name)| name)
                .collect(),
            None => (0..width).map(|col| format!("col{col}")).collect(),
        };
        if let Some(bad) = names.iter().find(|n| *n == DATA_FIELD || *n == ID_FIELD) {
            return Err(DoraError::data_load(
                path,
                format!("column name '{bad}' is reserved"),
            ));
        }

        let n_rows = rows.len();
        let n_cols = names.len();
        let data = Array2::from_shape_vec((n_rows, n_cols), rows.into_iter().flatten().collect())
            .map_err(|e| DoraError::data_load(path, e.to_string()))?;

        let mut dataset = Dataset::new(ids);
        for (col, name) in names.iter().enumerate() {
            let column = data.column(col).to_owned().insert_axis(ndarray::Axis(1));
            dataset
                .insert_field(name.clone(), column)
                .map_err(|e| DoraError::data_load(path, e.to_string()))?;
        }
        dataset
            .insert_field(DATA_FIELD, data)
            .map_err(|e| DoraError::data_load(path, e.to_string()))?;
        Ok(dataset)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct JsonParams {}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct JsonDataset {
    id: Vec<JsonId>,
    #[serde(default)]
    fields: BTreeMap<String, Vec<JsonSample>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonId {
    Text(String),
    Number(serde_json::Number),
}

impl JsonId {
    fn into_string(self) -> String {
        match self {
            JsonId::Text(text) => text,
            JsonId::Number(number) => number.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonSample {
    Scalar(f64),
    Vector(Vec<f64>),
}

impl JsonSample {
    fn values(&self) -> &[f64] {
        match self {
            JsonSample::Scalar(value) => std::slice::from_ref(value),
            JsonSample::Vector(values) => values,
        }
    }
}

/// `{"id": [...], "fields": {"name": [sample, ...]}}` documents.
pub struct JsonLoader;

impl JsonLoader {
    pub const NAME: &'static str = "json";
}

impl DataLoader for JsonLoader {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn validate_params(&self, params: &Params) -> Result<()> {
        parse_params::<JsonParams>(&format!("data loader {}", Self::NAME), params).map(|_| ())
    }

    fn load(&self, path: &Path, params: &Params) -> Result<Dataset> {
        self.validate_params(params)?;
        let content = std::fs::read_to_string(path)
            .map_err(|e| DoraError::data_load(path, e.to_string()))?;
        let document: JsonDataset = serde_json::from_str(&content)
            .map_err(|e| DoraError::data_load(path, e.to_string()))?;

        let ids: Vec<String> = document.id.into_iter().map(JsonId::into_string).collect();
        let mut dataset = Dataset::new(ids);
        for (name, samples) in document.fields {
            let width = samples.first().map(|s| s.values().len()).unwrap_or(0);
            let mut flat = Vec::with_capacity(samples.len() * width);
            for (index, sample) in samples.iter().enumerate() {
                if sample.values().len() != width {
                    return Err(DoraError::data_load(
                        path,
                        format!(
                            "field '{name}' sample {index} has {} values, expected {width}",
                            sample.values().len()
                        ),
                    ));
                }
                if let Some(value) = sample.values().iter().find(|v| !v.is_finite()) {
                    return Err(DoraError::data_load(
                        path,
                        format!("field '{name}' sample {index}: {value} is not a finite number"),
                    ));
                }
                flat.extend_from_slice(sample.values());
            }
            let values = Array2::from_shape_vec((samples.len(), width), flat)
                .map_err(|e| DoraError::data_load(path, e.to_string()))?;
            dataset
                .insert_field(name, values)
                .map_err(|e| DoraError::data_load(path, e.to_string()))?;
        }
        Ok(dataset)
    }
}
