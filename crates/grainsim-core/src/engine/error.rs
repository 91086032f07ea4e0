use thiserror::Error;

use super::config::ConfigError;
use crate::core::contact::ContactError;
use crate::core::contact::model::SettingsError;
use crate::core::io::table::TableError;
use crate::core::properties::PropertyError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Contact model error: {source}")]
    Contact {
        #[from]
        source: ContactError,
    },

    #[error("Material property error: {source}")]
    Property {
        #[from]
        source: PropertyError,
    },

    #[error("Contact model settings error: {source}")]
    Settings {
        #[from]
        source: SettingsError,
    },

    #[error("Table error: {source}")]
    Table {
        #[from]
        source: TableError,
    },

    #[error("Particle type {particle_type} exceeds the {n_types} types of the material table")]
    TypeOutOfRange { particle_type: usize, n_types: usize },

    #[error("Worker {rank} stopped because another worker failed at step {step}")]
    PeerFailed { rank: usize, step: u64 },

    #[error("Internal logic error: {0}")]
    Internal(String),
}

/// Fails with `TypeOutOfRange` on the first type outside `1..=n_types`.
pub(crate) fn check_type_range(
    types: impl IntoIterator<Item = usize>,
    n_types: usize,
) -> Result<(), EngineError> {
    match types.into_iter().find(|&t| t == 0 || t > n_types) {
        Some(particle_type) => Err(EngineError::TypeOutOfRange {
            particle_type,
            n_types,
        }),
        None => Ok(()),
    }
}
