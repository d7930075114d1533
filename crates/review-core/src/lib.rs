//! Row review and reconciliation engine.
//!
//! Walks an extracted table one row at a time:
//!
//! - **Classification** (`classify`): per-row column types, inclusion flags,
//!   cell corrections and the identity bound to the name column
//! - **Session** (`session`): the awaiting-input / reviewing / complete
//!   workflow, submit with retry, skip, and carrying choices forward
//! - **Collaborators** (`collab`): extraction, identity registry and
//!   persistence, supplied by the caller
//!
//! # Error Handling
//!
//! Every operation returns [`ReviewError`], built with `thiserror`, which
//! wraps the per-concern error enums and carries operator-facing messages.
//!
//! # Example
//!
//! ```ignore
//! use review_core::{ReviewConfig, ReviewSession};
//!
//! let mut session = ReviewSession::start(&registry, &ReviewConfig::default()).await?;
//! session.load_table(table)?;
//! session.set_type_named(0, "name")?;
//! match session.submit(&store).await {
//!     Ok(advance) => println!("{advance:?}"),
//!     Err(err) if err.is_retryable() => println!("{}", err.user_message()),
//!     Err(err) => return Err(err),
//! }
//! ```

#![deny(unsafe_code)]

pub mod classify;
pub mod collab;
pub mod config;
pub mod error;
pub mod session;

pub use classify::{ClassificationMemory, IdentitySelection, NameBinding, RowClassification};
pub use collab::{
    Extractor, IdentityRegistry, ImageInput, RowStore, SaveRequest, guess_mime_type,
    table_digest,
};
pub use config::{ReviewConfig, SessionConfig};
pub use error::{
    ClassificationError, ConfigError, ExtractionError, RegistryLoadError, Result, ReviewError,
    SaveError, SessionError,
};
pub use session::{
    Advance, FaultKind, Phase, ReviewSession, SessionFault, SessionState, SessionSummary,
};
