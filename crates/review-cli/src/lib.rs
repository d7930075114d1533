//! Operator front end for the row review engine.

pub mod console;
pub mod logging;
pub mod operator;
pub mod render;
pub mod sources;
