//! # Engine Module
//!
//! Stateful machinery that advances a particle configuration by one step at a time.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - run parameters, diagnostic arguments and their builders
//! - **Step Context** ([`context`]) - the explicit per-step context and the worker collectives
//! - **Force Sweep** ([`pipeline`]) - drives the contact models over pairs and walls and owns contact history
//! - **Stability Diagnostics** ([`monitor`]) - the periodic Courant and skin check
//! - **Progress Monitoring** ([`progress`]) - progress events and stability advisories for front ends
//! - **Error Handling** ([`error`]) - engine-level error aggregation
//!
//! Workers never share mutable state. The only points where they wait for each
//! other are the reductions issued through a [`context::Communicator`].

pub mod config;
pub mod context;
pub mod error;
pub mod monitor;
pub mod pipeline;
pub mod progress;
pub mod tasks;
