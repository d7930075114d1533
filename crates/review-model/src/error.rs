use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("row {row} has {found} cells but the table has {expected} headers")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("invalid type tag: {0:?}")]
    InvalidTypeTag(String),
    #[error("unknown type tag: {0}")]
    UnknownTypeTag(String),
    #[error("duplicate type tag in catalog: {0}")]
    DuplicateTypeTag(String),
    #[error("type catalog does not contain the name tag {0}")]
    MissingNameTag(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
