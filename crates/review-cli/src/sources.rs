//! File-backed collaborators for the review session.
//!
//! The binary does not call an OCR model. It reads tables that were already
//! extracted (JSON or CSV), loads identities from a JSON file or a built-in
//! sample list, and saves rows into a simulated store that can be told to
//! fail and to take time.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use review_core::{
    ExtractionError, Extractor, IdentityRegistry, ImageInput, RegistryLoadError, RowStore,
    SaveError, SaveRequest,
};
use review_model::{Identity, Table};
use tracing::{debug, info, warn};

/// Message returned by [`SimulatedRowStore`] for a failed attempt.
pub const SIMULATED_SAVE_FAILURE: &str =
    "Failed to save data to the server. Please check your connection.";

/// Decodes pre-extracted tables.
///
/// Accepts `application/json` (`{"headers": [...], "rows": [[...]]}`) and
/// `text/csv` (first record is the header). Images are rejected because no
/// OCR backend is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileExtractor;

impl Extractor for FileExtractor {
    async fn extract(&self, image: &ImageInput) -> Result<Table, ExtractionError> {
        let table = match image.mime_type.as_str() {
            "application/json" => parse_json_table(&image.data)?,
            "text/csv" => parse_csv_table(&image.data)?,
            other => {
                return Err(ExtractionError::Unsupported {
                    file_name: image.file_name.clone(),
                    mime_type: other.to_string(),
                });
            }
        };
        info!(
            file_name = %image.file_name,
            columns = table.column_count(),
            rows = table.row_count(),
            "table extracted"
        );
        Ok(table)
    }
}

/// Parses the JSON shape returned by the extraction model.
pub fn parse_json_table(data: &[u8]) -> Result<Table, ExtractionError> {
    serde_json::from_slice(data).map_err(|err| ExtractionError::Malformed {
        reason: err.to_string(),
    })
}

pub fn parse_csv_table(data: &[u8]) -> Result<Table, ExtractionError> {
    let malformed = |err: csv::Error| ExtractionError::Malformed {
        reason: err.to_string(),
    };
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(data);
    let headers: Vec<String> = reader
        .headers()
        .map_err(malformed)?
        .iter()
        .map(ToString::to_string)
        .collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(malformed)?;
        rows.push(record.iter().map(ToString::to_string).collect());
    }
    Table::new(headers, rows).map_err(|err| ExtractionError::Malformed {
        reason: err.to_string(),
    })
}

/// Reads a table file and decodes it with [`FileExtractor`].
pub async fn load_table_file(path: &Path) -> Result<Table, ExtractionError> {
    let input = ImageInput::from_path(path)?;
    FileExtractor.extract(&input).await
}

/// Sample identities used when no registry file is given.
pub fn sample_identities() -> Vec<Identity> {
    vec![
        Identity::new(101, "علی رضایی"),
        Identity::new(102, "مریم حسینی"),
        Identity::new(103, "احمد محمدی"),
        Identity::new(104, "فاطمه کریمی"),
        Identity::new(105, "حسین جعفری"),
    ]
}

/// Where identities come from.
#[derive(Debug, Clone)]
pub enum RegistrySource {
    Builtin,
    /// JSON array of `{"id": 1, "name": "..."}` objects.
    File(PathBuf),
}

impl RegistrySource {
    pub fn from_option(path: Option<PathBuf>) -> Self {
        path.map_or(Self::Builtin, Self::File)
    }
}

impl IdentityRegistry for RegistrySource {
    async fn fetch_identities(&self) -> Result<Vec<Identity>, RegistryLoadError> {
        let identities = match self {
            Self::Builtin => sample_identities(),
            Self::File(path) => read_registry_file(path)?,
        };
        info!(count = identities.len(), "identity registry loaded");
        Ok(identities)
    }
}

fn read_registry_file(path: &Path) -> Result<Vec<Identity>, RegistryLoadError> {
    let data = std::fs::read(path).map_err(|source| RegistryLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let identities: Vec<Identity> =
        serde_json::from_slice(&data).map_err(|err| RegistryLoadError::Malformed {
            reason: err.to_string(),
        })?;
    let mut seen = BTreeSet::new();
    for identity in &identities {
        if !seen.insert(identity.id) {
            return Err(RegistryLoadError::Malformed {
                reason: format!("duplicate identity id {}", identity.id),
            });
        }
    }
    Ok(identities)
}

/// In-memory stand-in for the persistence service.
///
/// Every `fail_every`-th attempt fails. Accepted requests are deduplicated by
/// idempotency key, so a resend after an ambiguous failure is stored once.
#[derive(Debug, Default)]
pub struct SimulatedRowStore {
    fail_every: Option<usize>,
    latency: Duration,
    attempts: Cell<usize>,
    accepted: RefCell<Vec<SaveRequest>>,
    keys: RefCell<BTreeSet<String>>,
}

impl SimulatedRowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every `n`-th attempt; `0` never fails.
    #[must_use]
    pub fn with_fail_every(mut self, n: usize) -> Self {
        self.fail_every = (n > 0).then_some(n);
        self
    }

    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn attempts(&self) -> usize {
        self.attempts.get()
    }

    /// Requests accepted so far, in save order.
    pub fn accepted(&self) -> Vec<SaveRequest> {
        self.accepted.borrow().clone()
    }
}

impl RowStore for SimulatedRowStore {
    async fn save(&self, request: &SaveRequest) -> Result<(), SaveError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let attempt = self.attempts.get() + 1;
        self.attempts.set(attempt);

        if self.fail_every.is_some_and(|n| attempt % n == 0) {
            warn!(row_index = request.row_index, attempt, "simulated save failure");
            return Err(SaveError::new(SIMULATED_SAVE_FAILURE));
        }
        if !self.keys.borrow_mut().insert(request.idempotency_key.clone()) {
            debug!(row_index = request.row_index, "duplicate save ignored");
            return Ok(());
        }
        self.accepted.borrow_mut().push(request.clone());
        debug!(
            row_index = request.row_index,
            values = request.values.len(),
            attempt,
            "row stored"
        );
        Ok(())
    }
}
