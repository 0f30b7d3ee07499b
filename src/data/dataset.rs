use crate::error::{DoraError, Result};
use ndarray::{Array2, ArrayView2};
use std::collections::BTreeMap;

/// Name of the mandatory sample-identifier field.
pub const ID_FIELD: &str = "id";

/// A loaded fit or score set.
///
/// Every field holds one row per sample (`n_samples x width`, scalar fields
/// have width 1) and shares the sample count of `ids`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    ids: Vec<String>,
    fields: BTreeMap<String, Array2<f64>>,
}

impl Dataset {
    pub fn new(ids: Vec<String>) -> Self {
        Self {
            ids,
            fields: BTreeMap::new(),
        }
    }

    /// Add or replace a field. Its row count must equal the number of ids.
    pub fn insert_field(&mut self, name: impl Into<String>, values: Array2<f64>) -> Result<()> {
        let name = name.into();
        if name == ID_FIELD {
            return Err(DoraError::feature(format!(
                "field name '{ID_FIELD}' is reserved for sample identifiers"
            )));
        }
        if values.nrows() != self.ids.len() {
            return Err(DoraError::feature(format!(
                "field '{name}' has {} samples but dataset has {} ids",
                values.nrows(),
                self.ids.len()
            )));
        }
        self.fields.insert(name, values);
        Ok(())
    }

    pub fn with_field(mut self, name: impl Into<String>, values: Array2<f64>) -> Result<Self> {
        self.insert_field(name, values)?;
        Ok(self)
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn field(&self, name: &str) -> Option<ArrayView2<'_, f64>> {
        self.fields.get(name).map(|values| values.view())
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
