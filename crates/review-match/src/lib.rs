//! Fuzzy matching of extracted name fields against the identity registry.
//!
//! - [`edit_distance`]: Unicode-aware Levenshtein distance
//! - [`IdentityResolver`]: ranks the registry against one extracted name and
//!   exposes the best match plus the full ranked list for manual override

#![deny(unsafe_code)]

pub mod distance;
pub mod resolver;

pub use distance::{edit_distance, similarity};
pub use resolver::{Candidate, IdentityResolver, Ranking};
