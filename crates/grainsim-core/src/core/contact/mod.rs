//! # Contact Module
//!
//! Pairwise contact laws and the persistent state they carry between steps.
//!
//! ## Key Components
//!
//! - [`model`] - the [`ContactModel`](model::ContactModel) lifecycle, model settings
//!   and the host environment models validate against
//! - [`flags`] - capability masks and per-contact touch markers
//! - [`history`] - offset allocation and the [`ContactHistoryStore`](history::ContactHistoryStore) arena
//! - [`dispatch`] - the [`ModelSet`](dispatch::ModelSet) dispatcher driving an arbitrary mix of models
//! - [`styles`] - the static style registry
//! - [`rolling`] - the EPSD2 rolling-resistance law
//!
//! A contact model is constructed against a [`HistorySetup`](history::HistorySetup),
//! which hands it a fixed offset into every contact row. From then on the
//! model only sees rows through [`CollisionData`](data::CollisionData) and
//! [`ContactData`](data::ContactData); the rows themselves live in the store,
//! so history survives independently of any model object.

pub mod data;
pub mod dispatch;
pub mod flags;
pub mod history;
pub mod model;
pub mod rolling;
pub mod styles;

use crate::core::properties::PropertyError;
use model::SettingsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContactError {
    #[error("Unknown contact model style '{0}'")]
    UnknownStyle(String),

    #[error("Contact model style '{0}' is listed more than once")]
    DuplicateStyle(String),

    #[error("Two contact models share the identifier {0}")]
    DuplicateId(u32),

    #[error("{model} does not support coarse-graining (factor {factor})")]
    CoarseGrainingUnsupported { model: String, factor: f64 },

    #[error(
        "{model}: wall {wall} provides no wall-relative spin for its contact with particle {particle}"
    )]
    MissingWallSpin {
        model: &'static str,
        particle: usize,
        wall: usize,
    },

    #[error("{model} was used before its material properties were connected")]
    NotConnected { model: &'static str },

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
}
