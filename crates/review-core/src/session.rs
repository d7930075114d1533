//! Session workflow controller.
//!
//! A [`ReviewSession`] owns the whole [`SessionState`] and mutates it only
//! through the workflow operations below. Operator actions are handled one
//! at a time; at most one save may be in flight, and while it is every
//! action that edits or advances the row is rejected.
//!
//! ```text
//! awaiting-input --load_table--> reviewing --submit/skip (last row)--> complete
//!       ^                            |  ^                                   |
//!       |                            |  +-- submit/skip (more rows) --------+
//!       +----------- reset ----------+--------------------------------------+
//! ```

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use review_match::IdentityResolver;
use review_model::{Identity, Table, TypeCatalog, TypeTag};
use serde::Serialize;
use tracing::{Instrument, info, info_span, warn};

use crate::classify::{ClassificationMemory, RowClassification};
use crate::collab::{
    Extractor, IdentityRegistry, ImageInput, RowStore, SaveRequest, table_digest,
};
use crate::config::ReviewConfig;
use crate::error::{ReviewError, SaveError, SessionError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    /// No table loaded yet.
    #[default]
    AwaitingInput,
    /// Walking the rows of a loaded table.
    Reviewing,
    /// Every row was saved or skipped.
    Complete,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AwaitingInput => "awaiting input",
            Self::Reviewing => "reviewing",
            Self::Complete => "complete",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FaultKind {
    Extraction,
    EmptyResult,
    Save,
}

/// Last error shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionFault {
    pub kind: FaultKind,
    pub message: String,
    /// Resubmitting the same action may succeed.
    pub retryable: bool,
}

impl SessionFault {
    fn from_error(kind: FaultKind, error: &ReviewError) -> Self {
        Self {
            kind,
            message: error.user_message(),
            retryable: error.is_retryable(),
        }
    }
}

/// Outcome counts for the loaded table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub total_rows: usize,
    pub saved: usize,
    pub skipped: usize,
    pub failed_attempts: usize,
}

/// Where the session went after a row was saved or skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Now reviewing the row at this index.
    NextRow(usize),
    /// That was the last row.
    Completed,
}

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    phase: Phase,
    table: Option<Arc<Table>>,
    table_digest: String,
    current_row: usize,
    row: Option<RowClassification>,
    memory: Option<ClassificationMemory>,
    last_error: Option<SessionFault>,
    in_flight: Option<SaveRequest>,
    summary: SessionSummary,
}

impl SessionState {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn table(&self) -> Option<&Table> {
        self.table.as_deref()
    }

    pub fn current_row_index(&self) -> usize {
        self.current_row
    }

    pub fn row(&self) -> Option<&RowClassification> {
        self.row.as_ref()
    }

    pub fn memory(&self) -> Option<&ClassificationMemory> {
        self.memory.as_ref()
    }

    pub fn last_error(&self) -> Option<&SessionFault> {
        self.last_error.as_ref()
    }

    /// Request currently being saved, if any.
    pub fn in_flight(&self) -> Option<&SaveRequest> {
        self.in_flight.as_ref()
    }

    pub fn summary(&self) -> SessionSummary {
        self.summary
    }

    pub fn total_rows(&self) -> usize {
        self.table.as_ref().map_or(0, |t| t.row_count())
    }
}

pub struct ReviewSession {
    catalog: Arc<TypeCatalog>,
    resolver: IdentityResolver,
    processing_date: NaiveDate,
    state: SessionState,
}

impl ReviewSession {
    pub fn new(catalog: TypeCatalog, identities: Vec<Identity>, processing_date: NaiveDate) -> Self {
        info!(
            identity_count = identities.len(),
            type_count = catalog.tags().len(),
            %processing_date,
            "review session created"
        );
        Self {
            catalog: Arc::new(catalog),
            resolver: IdentityResolver::new(identities),
            processing_date,
            state: SessionState::default(),
        }
    }

    pub fn from_config(config: &ReviewConfig, identities: Vec<Identity>) -> Self {
        Self::new(config.types.clone(), identities, config.processing_date())
    }

    /// Fetches the identity registry and opens a session.
    ///
    /// A registry failure is fatal for the session; the caller reloads.
    pub async fn start(
        registry: &impl IdentityRegistry,
        config: &ReviewConfig,
    ) -> Result<Self, ReviewError> {
        let identities = registry
            .fetch_identities()
            .await
            .inspect_err(|err| warn!(error = %err, "identity registry fetch failed"))?;
        Ok(Self::from_config(config, identities))
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }

    pub fn resolver(&self) -> &IdentityResolver {
        &self.resolver
    }

    pub fn processing_date(&self) -> NaiveDate {
        self.processing_date
    }

    pub fn current_row(&self) -> Option<&RowClassification> {
        self.state.row.as_ref()
    }

    /// Runs the extraction collaborator and loads its result.
    pub async fn upload(
        &mut self,
        extractor: &impl Extractor,
        image: &ImageInput,
    ) -> Result<(), ReviewError> {
        self.require_phase("upload", Phase::AwaitingInput)?;
        let span = info_span!("upload", file_name = %image.file_name, mime_type = %image.mime_type);
        match extractor.extract(image).instrument(span).await {
            Ok(table) => self.load_table(table),
            Err(err) => {
                let err = ReviewError::from(err);
                warn!(error = %err, "extraction failed");
                self.state.last_error = Some(SessionFault::from_error(FaultKind::Extraction, &err));
                Err(err)
            }
        }
    }

    /// Starts reviewing `table` from its first row.
    ///
    /// A table without rows leaves the session awaiting input and records a
    /// user-visible error.
    pub fn load_table(&mut self, table: Table) -> Result<(), ReviewError> {
        self.require_phase("load a table", Phase::AwaitingInput)?;
        if table.is_empty() {
            let err = ReviewError::EmptyResult;
            warn!(column_count = table.column_count(), "extracted table has no rows");
            self.state.last_error = Some(SessionFault::from_error(FaultKind::EmptyResult, &err));
            return Err(err);
        }

        info!(
            row_count = table.row_count(),
            column_count = table.column_count(),
            "table loaded"
        );
        let table = Arc::new(table);
        self.state = SessionState {
            phase: Phase::Reviewing,
            current_row: 0,
            summary: SessionSummary {
                total_rows: table.row_count(),
                ..SessionSummary::default()
            },
            table_digest: table_digest(&table),
            table: Some(Arc::clone(&table)),
            ..SessionState::default()
        };
        self.state.row = Some(self.initialize_row(&table, 0));
        Ok(())
    }

    pub fn set_type(&mut self, column: usize, tag: Option<TypeTag>) -> Result<(), ReviewError> {
        self.editable_row("change a column type")?
            .set_type(column, tag)
            .map_err(ReviewError::from)
    }

    /// Parses `tag` against the catalog; an empty string clears the type.
    pub fn set_type_named(&mut self, column: usize, tag: &str) -> Result<(), ReviewError> {
        let tag = if tag.trim().is_empty() {
            None
        } else {
            Some(self.catalog.parse(tag)?)
        };
        self.set_type(column, tag)
    }

    pub fn set_inclusion(&mut self, column: usize, included: bool) -> Result<(), ReviewError> {
        self.editable_row("change column inclusion")?
            .set_inclusion(column, included)
            .map_err(ReviewError::from)
    }

    pub fn override_identity(&mut self, id: i64) -> Result<Identity, ReviewError> {
        self.editable_row("pick an identity")?
            .override_identity(id)
            .cloned()
            .map_err(ReviewError::from)
    }

    pub fn edit_cell(&mut self, column: usize, text: &str) -> Result<(), ReviewError> {
        self.editable_row("edit a cell")?
            .edit_cell(column, text)
            .map_err(ReviewError::from)
    }

    pub fn revert_cell(&mut self, column: usize) -> Result<(), ReviewError> {
        self.editable_row("revert a cell")?
            .revert_cell(column)
            .map_err(ReviewError::from)
    }

    /// First half of a submit: builds the request and marks it in flight.
    pub fn begin_submit(&mut self) -> Result<SaveRequest, ReviewError> {
        let processing_date = self.processing_date;
        let row = self.editable_row("submit")?;
        let payload = row.build_payload();
        let row_index = row.row_index();
        let request = SaveRequest::new(
            &self.state.table_digest,
            row_index,
            payload,
            processing_date,
        );
        info!(
            row_index = request.row_index,
            value_count = request.values.len(),
            idempotency_key = %request.idempotency_key,
            "submitting row"
        );
        self.state.in_flight = Some(request.clone());
        Ok(request)
    }

    /// Second half of a submit: applies the persistence outcome.
    ///
    /// On failure the row, its classification and the session memory are
    /// left untouched so a resubmit sends the identical request.
    pub fn finish_submit(&mut self, outcome: Result<(), SaveError>) -> Result<Advance, ReviewError> {
        let request = self
            .state
            .in_flight
            .take()
            .ok_or(SessionError::NoSavePending)?;
        match outcome {
            Ok(()) => {
                info!(row_index = request.row_index, "row saved");
                self.state.summary.saved += 1;
                self.advance()
            }
            Err(err) => {
                self.state.summary.failed_attempts += 1;
                warn!(row_index = request.row_index, error = %err, "row save failed");
                let err = ReviewError::from(err);
                self.state.last_error = Some(SessionFault::from_error(FaultKind::Save, &err));
                Err(err)
            }
        }
    }

    /// Saves the current row through `store` and advances on success.
    pub async fn submit(&mut self, store: &impl RowStore) -> Result<Advance, ReviewError> {
        let request = self.begin_submit()?;
        let span = info_span!("save", row_index = request.row_index);
        let outcome = store.save(&request).instrument(span).await;
        self.finish_submit(outcome)
    }

    /// Advances without saving. The row's data is not persisted, but its
    /// choices still become the next row's defaults.
    pub fn skip(&mut self) -> Result<Advance, ReviewError> {
        let row_index = self.editable_row("skip")?.row_index();
        info!(row_index, "row skipped");
        self.state.summary.skipped += 1;
        self.advance()
    }

    /// Discards the table, memory and error state.
    pub fn reset(&mut self) {
        if let Some(request) = &self.state.in_flight {
            warn!(row_index = request.row_index, "reset with a save in flight");
        }
        info!(phase = %self.state.phase, "session reset");
        self.state = SessionState::default();
    }

    fn advance(&mut self) -> Result<Advance, ReviewError> {
        let (Some(table), Some(row)) = (self.state.table.clone(), self.state.row.take()) else {
            return Err(SessionError::InvalidPhase {
                action: "advance",
                phase: self.state.phase,
            }
            .into());
        };
        self.state.memory = Some(row.memory());
        self.state.last_error = None;
        self.state.current_row += 1;

        if self.state.current_row >= table.row_count() {
            self.state.phase = Phase::Complete;
            let summary = self.state.summary;
            info!(
                saved = summary.saved,
                skipped = summary.skipped,
                failed_attempts = summary.failed_attempts,
                "review complete"
            );
            return Ok(Advance::Completed);
        }
        let next = self.state.current_row;
        self.state.row = Some(self.initialize_row(&table, next));
        Ok(Advance::NextRow(next))
    }

    fn initialize_row(&self, table: &Table, index: usize) -> RowClassification {
        RowClassification::initialize(
            index,
            table.row(index).unwrap_or_default(),
            self.state.memory.as_ref(),
            Arc::clone(&self.catalog),
            self.resolver.clone(),
        )
    }

    fn require_phase(&self, action: &'static str, expected: Phase) -> Result<(), SessionError> {
        if self.state.in_flight.is_some() {
            return Err(SessionError::SaveInFlight);
        }
        if self.state.phase != expected {
            return Err(SessionError::InvalidPhase {
                action,
                phase: self.state.phase,
            });
        }
        Ok(())
    }

    fn editable_row(&mut self, action: &'static str) -> Result<&mut RowClassification, SessionError> {
        self.require_phase(action, Phase::Reviewing)?;
        let phase = self.state.phase;
        self.state
            .row
            .as_mut()
            .ok_or(SessionError::InvalidPhase { action, phase })
    }
}
