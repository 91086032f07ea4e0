//! # Material Properties
//!
//! Per-type material data and the registry contact models use to resolve it.
//!
//! - [`table`] - the immutable [`MaterialPropertyTable`](table::MaterialPropertyTable)
//!   loaded from TOML, indexed by 1-based particle type
//! - [`registry`] - name-based [`PropertyRegistry`](registry::PropertyRegistry)
//!   with per-property construction functions
//! - [`factories`] - built-in construction functions (e.g. `coeffRollFrict`)

pub mod factories;
pub mod registry;
pub mod table;

use table::PropertyKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PropertyError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Property '{name}' has {found} entries, expected {expected} (one per type)")]
    Shape {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("Property '{name}' requested by '{caller}' is not defined")]
    Unresolved { name: String, caller: String },
    #[error("Property '{name}' requested by '{caller}' is {found}, expected {expected}")]
    WrongKind {
        name: String,
        caller: String,
        expected: PropertyKind,
        found: PropertyKind,
    },
    #[error("Invalid value for property '{name}': {reason}")]
    InvalidValue { name: String, reason: String },
}
