//! Operator command language.
//!
//! One command per line. Columns are numbered from 1 for the operator and
//! converted to 0-based indices here.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorCommand {
    Show,
    Types,
    /// `None` clears the column's type.
    SetType { column: usize, tag: Option<String> },
    Include(usize),
    Exclude(usize),
    Candidates,
    Pick(i64),
    Edit { column: usize, text: String },
    Revert(usize),
    Submit,
    Skip,
    Reset,
    Load(PathBuf),
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperatorParseError {
    #[error("unknown command '{0}' (try 'help')")]
    UnknownCommand(String),

    #[error("'{command}' needs {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    #[error("'{command}' takes no arguments")]
    UnexpectedArgument { command: &'static str },

    #[error("'{0}' is not a number")]
    InvalidNumber(String),

    #[error("columns are numbered from 1")]
    ColumnZero,
}

pub const HELP: &str = "\
show              current row, types and bound identity
types             catalog tags and the columns holding them
type COL TAG      set a column's type (TAG '-' clears it)
include COL       include a column in the saved row
exclude COL       leave a column out of the saved row
candidates        ranked identities for the name column
pick ID           bind an identity instead of the best match
edit COL TEXT     correct a cell's text
revert COL        restore the extracted text
submit            save the row and move on
skip              move on without saving
reset             discard the table and start over
load FILE         load an extracted table (json or csv)
help              this list
quit              stop reading commands";

/// Parses one line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Result<Option<OperatorCommand>, OperatorParseError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "show" => no_args("show", rest, OperatorCommand::Show)?,
        "types" => no_args("types", rest, OperatorCommand::Types)?,
        "candidates" => no_args("candidates", rest, OperatorCommand::Candidates)?,
        "submit" => no_args("submit", rest, OperatorCommand::Submit)?,
        "skip" => no_args("skip", rest, OperatorCommand::Skip)?,
        "reset" => no_args("reset", rest, OperatorCommand::Reset)?,
        "help" | "?" => OperatorCommand::Help,
        "quit" | "exit" => no_args("quit", rest, OperatorCommand::Quit)?,
        "type" => {
            let (column, tag) = column_and_rest("type", rest, "a column and a type")?;
            let tag = match tag {
                "" => {
                    return Err(OperatorParseError::MissingArgument {
                        command: "type",
                        argument: "a column and a type",
                    });
                }
                "-" => None,
                tag => Some(tag.to_string()),
            };
            OperatorCommand::SetType { column, tag }
        }
        "include" => OperatorCommand::Include(single_column("include", rest)?),
        "exclude" => OperatorCommand::Exclude(single_column("exclude", rest)?),
        "revert" => OperatorCommand::Revert(single_column("revert", rest)?),
        "edit" => {
            let (column, text) = column_and_rest("edit", rest, "a column and text")?;
            OperatorCommand::Edit {
                column,
                text: text.to_string(),
            }
        }
        "pick" => {
            if rest.is_empty() {
                return Err(OperatorParseError::MissingArgument {
                    command: "pick",
                    argument: "an identity id",
                });
            }
            let id = rest
                .parse()
                .map_err(|_| OperatorParseError::InvalidNumber(rest.to_string()))?;
            OperatorCommand::Pick(id)
        }
        "load" => {
            if rest.is_empty() {
                return Err(OperatorParseError::MissingArgument {
                    command: "load",
                    argument: "a file",
                });
            }
            OperatorCommand::Load(PathBuf::from(rest))
        }
        _ => return Err(OperatorParseError::UnknownCommand(word.to_string())),
    };
    Ok(Some(command))
}

fn no_args(
    command: &'static str,
    rest: &str,
    parsed: OperatorCommand,
) -> Result<OperatorCommand, OperatorParseError> {
    if rest.is_empty() {
        Ok(parsed)
    } else {
        Err(OperatorParseError::UnexpectedArgument { command })
    }
}

fn single_column(command: &'static str, rest: &str) -> Result<usize, OperatorParseError> {
    if rest.is_empty() {
        return Err(OperatorParseError::MissingArgument {
            command,
            argument: "a column",
        });
    }
    parse_column(rest)
}

fn column_and_rest<'a>(
    command: &'static str,
    rest: &'a str,
    argument: &'static str,
) -> Result<(usize, &'a str), OperatorParseError> {
    if rest.is_empty() {
        return Err(OperatorParseError::MissingArgument { command, argument });
    }
    let (column, tail) = match rest.split_once(char::is_whitespace) {
        Some((column, tail)) => (column, tail.trim()),
        None => (rest, ""),
    };
    Ok((parse_column(column)?, tail))
}

fn parse_column(text: &str) -> Result<usize, OperatorParseError> {
    let number: usize = text
        .parse()
        .map_err(|_| OperatorParseError::InvalidNumber(text.to_string()))?;
    number.checked_sub(1).ok_or(OperatorParseError::ColumnZero)
}
