//! Driverforge library exports for testing.
//!
//! This module exposes internal components for integration testing.

pub mod builder;
pub mod catalog;
pub mod config;
pub mod errors;
pub mod gate;
pub mod grouping;
pub mod matrix;
pub mod notes;
pub mod orchestrator;
pub mod process;
pub mod registry;
pub mod resolve;
pub mod timing;
pub mod version;
