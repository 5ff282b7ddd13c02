//! Pipeline Configuration Module
//!
//! Provides pipeline configuration loaded from TOML files, replacing all
//! hardcoded fleet topology, simulation, and risk-threshold values with
//! operator-tunable ones.
//!
//! ## Loading Order
//!
//! 1. `GRIDGUARD_CONFIG` environment variable (path to TOML file)
//! 2. `gridguard.toml` in the current working directory
//! 3. Built-in defaults (matching the reference dataset parameters)
//!
//! Configuration is validated fail-fast at load: an invalid horizon, topology,
//! envelope, or threshold ordering is a fatal startup error surfaced before
//! any generation begins. The loaded config is threaded explicitly into each
//! pipeline stage; there is no global configuration state.

mod pipeline_config;

pub use pipeline_config::*;
