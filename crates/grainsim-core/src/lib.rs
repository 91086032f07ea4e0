//! # grainsim Core Library
//!
//! Contact mechanics and stability diagnostics for discrete-element and SPH
//! particle simulations.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Particle data, the material property table and
//!   registry, the contact model framework with its history store, and the EPSD2
//!   rolling-resistance law.
//!
//! - **[`engine`]: The Logic Core.** The contact force sweep, the stability
//!   monitor, the explicit step context and the collectives workers reduce through.
//!
//! - **[`workflows`]: The Public API.** Complete procedures such as [`workflows::probe`],
//!   which evaluates a particle configuration on several in-process workers.

pub mod core;
pub mod engine;
pub mod workflows;
