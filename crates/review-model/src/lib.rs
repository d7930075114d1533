#![deny(unsafe_code)]

pub mod error;
pub mod identity;
pub mod payload;
pub mod semantic;
pub mod table;

pub use error::{ModelError, Result};
pub use identity::Identity;
pub use payload::{PayloadValue, SavePayload};
pub use semantic::{TypeCatalog, TypeTag, UNSET_TYPE, type_wire_name};
pub use table::Table;
