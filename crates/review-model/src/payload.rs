//! Save payload handed to the persistence collaborator.

use serde::{Deserialize, Serialize};

/// One submitted cell.
///
/// Serializes untagged so the wire form is a plain string, integer or `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PayloadValue {
    Text(String),
    /// Registry id substituted for the name column.
    Identity(i64),
    /// Name column with no identity bound.
    Null,
}

/// Filtered values and their types, in original column order and lockstep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavePayload {
    pub values: Vec<PayloadValue>,
    pub types: Vec<String>,
}

impl SavePayload {
    pub fn push(&mut self, value: PayloadValue, type_name: String) {
        self.values.push(value);
        self.types.push(type_name);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&PayloadValue, &str)> {
        self.values
            .iter()
            .zip(self.types.iter().map(String::as_str))
    }
}
