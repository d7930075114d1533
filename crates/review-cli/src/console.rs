//! Line-oriented operator loop.
//!
//! Reads [`OperatorCommand`]s, applies them to a [`ReviewSession`] and
//! writes the result. Rejected commands are reported and the loop carries
//! on; only I/O failures end it early.

use std::io::{self, BufRead, Write};

use review_core::{
    Advance, ClassificationError, Extractor, ImageInput, Phase, ReviewError, ReviewSession,
    RowStore,
};
use tracing::{debug, warn};

use crate::logging::redact_value;
use crate::operator::{HELP, OperatorCommand, parse_line};
use crate::render;

/// Candidates listed by `candidates` unless configured otherwise.
pub const DEFAULT_CANDIDATE_LIMIT: usize = 10;

/// Counts from one run of the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub commands: usize,
    pub rejected: usize,
    pub quit: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Continue,
    Rejected,
    Quit,
}

pub struct Console<'a, E, S> {
    session: &'a mut ReviewSession,
    extractor: &'a E,
    store: &'a S,
    candidate_limit: usize,
}

impl<'a, E: Extractor, S: RowStore> Console<'a, E, S> {
    pub fn new(session: &'a mut ReviewSession, extractor: &'a E, store: &'a S) -> Self {
        Self {
            session,
            extractor,
            store,
            candidate_limit: DEFAULT_CANDIDATE_LIMIT,
        }
    }

    #[must_use]
    pub fn with_candidate_limit(mut self, limit: usize) -> Self {
        self.candidate_limit = limit.max(1);
        self
    }

    pub fn session(&self) -> &ReviewSession {
        self.session
    }

    /// Processes every line of `input` until it ends or `quit` is read.
    pub async fn run(&mut self, input: impl BufRead, out: &mut impl Write) -> io::Result<RunReport> {
        let mut report = RunReport::default();
        writeln!(out, "{}", render::status_line(self.session))?;
        for (number, line) in input.lines().enumerate() {
            let line = line?;
            let command = match parse_line(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(err) => {
                    warn!(line = number + 1, error = %err, "unparseable operator command");
                    writeln!(out, "error: {err}")?;
                    report.commands += 1;
                    report.rejected += 1;
                    continue;
                }
            };
            report.commands += 1;
            match self.execute(command, out).await? {
                Step::Continue => {}
                Step::Rejected => report.rejected += 1,
                Step::Quit => {
                    report.quit = true;
                    break;
                }
            }
        }
        Ok(report)
    }

    async fn execute(&mut self, command: OperatorCommand, out: &mut impl Write) -> io::Result<Step> {
        let result = match command {
            OperatorCommand::Help => {
                writeln!(out, "{HELP}")?;
                Ok(())
            }
            OperatorCommand::Quit => return Ok(Step::Quit),
            OperatorCommand::Show => return self.show(out).map(|()| Step::Continue),
            OperatorCommand::Types => {
                let table = render::type_table(self.session.catalog(), self.session.current_row());
                writeln!(out, "{table}")?;
                Ok(())
            }
            OperatorCommand::Candidates => return self.candidates(out),
            OperatorCommand::SetType { column, tag } => self
                .session
                .set_type_named(column, tag.as_deref().unwrap_or_default()),
            OperatorCommand::Include(column) => self.session.set_inclusion(column, true),
            OperatorCommand::Exclude(column) => self.session.set_inclusion(column, false),
            OperatorCommand::Pick(id) => match self.session.override_identity(id) {
                Ok(identity) => {
                    debug!(id, "identity picked");
                    writeln!(out, "bound {identity}")?;
                    Ok(())
                }
                Err(err) => Err(err),
            },
            OperatorCommand::Edit { column, text } => {
                debug!(column, text = redact_value(&text), "cell corrected");
                self.session.edit_cell(column, &text)
            }
            OperatorCommand::Revert(column) => self.session.revert_cell(column),
            OperatorCommand::Submit => match self.session.submit(self.store).await {
                Ok(advance) => return self.advanced("saved", advance, out),
                Err(err) => Err(err),
            },
            OperatorCommand::Skip => match self.session.skip() {
                Ok(advance) => return self.advanced("skipped", advance, out),
                Err(err) => Err(err),
            },
            OperatorCommand::Reset => {
                self.session.reset();
                writeln!(out, "{}", render::status_line(self.session))?;
                Ok(())
            }
            OperatorCommand::Load(path) => match ImageInput::from_path(&path) {
                Ok(image) => match self.session.upload(self.extractor, &image).await {
                    Ok(()) => return self.show(out).map(|()| Step::Continue),
                    Err(err) => Err(err),
                },
                Err(err) => Err(err.into()),
            },
        };

        match result {
            Ok(()) => Ok(Step::Continue),
            Err(err) => {
                report_error(&err, out)?;
                Ok(Step::Rejected)
            }
        }
    }

    fn show(&self, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "{}", render::status_line(self.session))?;
        let state = self.session.state();
        if let (Some(table), Some(row)) = (state.table(), state.row()) {
            writeln!(out, "{}", render::row_table(table.headers(), row))?;
        }
        if let Some(fault) = state.last_error() {
            writeln!(out, "{}", render::fault_line(fault))?;
        }
        Ok(())
    }

    fn candidates(&self, out: &mut impl Write) -> io::Result<Step> {
        let Some(row) = self.session.current_row() else {
            writeln!(out, "error: no row is under review")?;
            return Ok(Step::Rejected);
        };
        if row.name_column().is_none() {
            writeln!(out, "error: no column is typed as a name")?;
            return Ok(Step::Rejected);
        }
        let bound = row.bound_identity().map(|identity| identity.id);
        let table = render::candidate_table(row.candidates(), bound, self.candidate_limit);
        writeln!(out, "{table}")?;
        Ok(Step::Continue)
    }

    fn advanced(&self, verb: &str, advance: Advance, out: &mut impl Write) -> io::Result<Step> {
        match advance {
            Advance::NextRow(index) => {
                writeln!(out, "row {index} {verb}")?;
                self.show(out)?;
            }
            Advance::Completed => {
                writeln!(out, "row {} {verb}", self.session.state().total_rows())?;
                writeln!(out, "{}", render::status_line(self.session))?;
                writeln!(out, "{}", render::summary_table(&self.session.state().summary()))?;
            }
        }
        Ok(Step::Continue)
    }
}

fn report_error(err: &ReviewError, out: &mut impl Write) -> io::Result<()> {
    warn!(error = %err, retryable = err.is_retryable(), "operator command rejected");
    writeln!(out, "error: {}", operator_message(err))?;
    if let Some(suggestion) = err.suggestion() {
        writeln!(out, "hint: {suggestion}")?;
    }
    Ok(())
}

/// Like [`ReviewError::user_message`], with columns numbered from 1.
fn operator_message(err: &ReviewError) -> String {
    match err {
        ReviewError::Classification(ClassificationError::ColumnOutOfRange {
            column,
            column_count,
        }) => format!(
            "column {} is out of range (row has {column_count} columns)",
            column + 1
        ),
        ReviewError::Classification(ClassificationError::TypeAlreadyAssigned { tag, column }) => {
            format!("type '{tag}' is already assigned to column {}", column + 1)
        }
        ReviewError::Classification(ClassificationError::ColumnExcluded { column }) => {
            format!("column {} is excluded from submission", column + 1)
        }
        _ => err.user_message(),
    }
}

/// True when the session ended with every row handled.
pub fn is_finished(session: &ReviewSession) -> bool {
    session.phase() == Phase::Complete
}
