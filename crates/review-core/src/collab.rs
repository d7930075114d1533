//! External collaborators consumed by the engine.
//!
//! Extraction, the identity registry and persistence are single-shot async
//! calls: each either resolves with a full result or fails. The engine never
//! retries on its own; the operator resubmits.

use std::future::Future;
use std::path::Path;

use chrono::NaiveDate;
use review_model::{Identity, PayloadValue, SavePayload, Table};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{ExtractionError, RegistryLoadError, SaveError};

/// Image (or pre-extracted result) handed to the extraction collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl ImageInput {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Reads a file and guesses its MIME type from the extension.
    pub fn from_path(path: &Path) -> Result<Self, ExtractionError> {
        let data = std::fs::read(path).map_err(|source| ExtractionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();
        Ok(Self::new(file_name, guess_mime_type(path), data))
    }
}

/// MIME type for the inputs the workflow knows about.
pub fn guess_mime_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "heic" => "image/heic",
        "json" => "application/json",
        "csv" => "text/csv",
        _ => "application/octet-stream",
    }
}

/// Turns an uploaded image into a headers-plus-rows table.
pub trait Extractor {
    fn extract(&self, image: &ImageInput) -> impl Future<Output = Result<Table, ExtractionError>>;
}

/// Supplies the reference identities names are resolved against.
pub trait IdentityRegistry {
    fn fetch_identities(&self) -> impl Future<Output = Result<Vec<Identity>, RegistryLoadError>>;
}

/// Persists one finished row.
///
/// Implementations must tolerate the same request being sent again after a
/// failure; [`SaveRequest::idempotency_key`] identifies a resend.
pub trait RowStore {
    fn save(&self, request: &SaveRequest) -> impl Future<Output = Result<(), SaveError>>;
}

/// Everything the persistence collaborator receives for one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveRequest {
    pub row_index: usize,
    pub values: Vec<PayloadValue>,
    pub types: Vec<String>,
    /// `YYYY-MM-DD`.
    pub processing_date: String,
    /// [`table_digest`] of the table the row came from.
    pub table_digest: String,
    /// Hex SHA-256 over the table digest, row index, date, values and types.
    pub idempotency_key: String,
}

impl SaveRequest {
    pub fn new(
        table_digest: &str,
        row_index: usize,
        payload: SavePayload,
        processing_date: NaiveDate,
    ) -> Self {
        let processing_date = processing_date.format("%Y-%m-%d").to_string();
        let idempotency_key = idempotency_key(table_digest, row_index, &processing_date, &payload);
        Self {
            row_index,
            values: payload.values,
            types: payload.types,
            processing_date,
            table_digest: table_digest.to_string(),
            idempotency_key,
        }
    }
}

/// Hex SHA-256 of a table's headers and cells.
///
/// Two rows with the same content but from different tables get different
/// save keys; loading the identical table again yields the same digest.
pub fn table_digest(table: &Table) -> String {
    let mut hasher = Sha256::new();
    hash_strings(&mut hasher, table.headers());
    hasher.update((table.row_count() as u64).to_le_bytes());
    for row in table.rows() {
        hash_strings(&mut hasher, row);
    }
    hex::encode(hasher.finalize())
}

fn hash_strings(hasher: &mut Sha256, values: &[String]) {
    hasher.update((values.len() as u64).to_le_bytes());
    for value in values {
        hasher.update((value.len() as u64).to_le_bytes());
        hasher.update(value.as_bytes());
    }
}

fn idempotency_key(
    table_digest: &str,
    row_index: usize,
    processing_date: &str,
    payload: &SavePayload,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(table_digest.as_bytes());
    hasher.update((row_index as u64).to_le_bytes());
    hasher.update(processing_date.as_bytes());
    for (value, type_name) in payload.pairs() {
        match value {
            PayloadValue::Text(text) => {
                hasher.update([b'T']);
                hasher.update((text.len() as u64).to_le_bytes());
                hasher.update(text.as_bytes());
            }
            PayloadValue::Identity(id) => {
                hasher.update([b'I']);
                hasher.update(id.to_le_bytes());
            }
            PayloadValue::Null => hasher.update([b'N']),
        }
        hasher.update((type_name.len() as u64).to_le_bytes());
        hasher.update(type_name.as_bytes());
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(values: Vec<PayloadValue>) -> SavePayload {
        let types = values.iter().map(|_| "t".to_string()).collect();
        SavePayload { values, types }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn request(row_index: usize, values: Vec<PayloadValue>) -> SaveRequest {
        SaveRequest::new("page", row_index, payload(values), date())
    }

    fn table(rows: &[[&str; 2]]) -> Table {
        Table::new(
            vec!["A".to_string(), "B".to_string()],
            rows.iter()
                .map(|r| r.iter().map(|c| (*c).to_string()).collect())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn idempotency_key_is_stable() {
        let a = request(0, vec![PayloadValue::Identity(2)]);
        let b = request(0, vec![PayloadValue::Identity(2)]);
        assert_eq!(a.idempotency_key, b.idempotency_key);
        assert_eq!(a.idempotency_key.len(), 64);
        assert_eq!(a.processing_date, "2024-03-01");
    }

    #[test]
    fn idempotency_key_tracks_content() {
        let base = request(0, vec![PayloadValue::Identity(2)]);
        let other_row = request(1, vec![PayloadValue::Identity(2)]);
        let other_value = request(0, vec![PayloadValue::Null]);
        let text_two = request(0, vec![PayloadValue::Text("2".to_string())]);
        let other_table = SaveRequest::new(
            "another page",
            0,
            payload(vec![PayloadValue::Identity(2)]),
            date(),
        );
        assert_ne!(base.idempotency_key, other_row.idempotency_key);
        assert_ne!(base.idempotency_key, other_value.idempotency_key);
        assert_ne!(base.idempotency_key, text_two.idempotency_key);
        assert_ne!(base.idempotency_key, other_table.idempotency_key);
    }

    #[test]
    fn table_digest_covers_every_cell() {
        let page = table(&[["x", "5"], ["x", "7"]]);
        assert_eq!(table_digest(&page), table_digest(&page.clone()));
        assert_eq!(table_digest(&page).len(), 64);
        assert_ne!(
            table_digest(&page),
            table_digest(&table(&[["x", "5"], ["x", "9"]]))
        );
        // Cell boundaries are part of the digest.
        assert_ne!(
            table_digest(&table(&[["ab", "c"]])),
            table_digest(&table(&[["a", "bc"]]))
        );
    }

    #[test]
    fn mime_guessing() {
        assert_eq!(guess_mime_type(Path::new("scan.JPG")), "image/jpeg");
        assert_eq!(guess_mime_type(Path::new("table.json")), "application/json");
        assert_eq!(guess_mime_type(Path::new("table.csv")), "text/csv");
        assert_eq!(guess_mime_type(Path::new("README")), "application/octet-stream");
    }
}
