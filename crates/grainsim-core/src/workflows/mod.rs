//! # Workflows Module
//!
//! End-to-end procedures tying [`crate::core`] and [`crate::engine`] together.
//!
//! - **Probe** ([`probe`]) - evaluates contact forces and stability diagnostics for a
//!   fixed particle configuration, split across in-process workers.

pub mod probe;
