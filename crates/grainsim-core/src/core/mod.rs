//! # Core Module
//!
//! Stateless building blocks shared by the engine: particle data, material
//! properties, contact laws and their history rows, and table I/O.
//!
//! - [`models`] - particles, ghost-carrying particle systems and neighbor lists
//! - [`properties`] - the material property table and the registry models connect through
//! - [`contact`] - the contact model framework and the EPSD2 rolling-resistance law
//! - [`sph`] - smoothing kernel definitions
//! - [`io`] - CSV particle tables and result tables
//!
//! Nothing in here advances time or talks to other workers; that is the job
//! of [`crate::engine`].

pub mod contact;
pub mod io;
pub mod models;
pub mod properties;
pub mod sph;
