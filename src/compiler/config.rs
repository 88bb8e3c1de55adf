//! Configuration for the normalization pipeline.
//!
//! This module provides the configuration type controlling pass selection, parallelism,
//! the output shape check and fresh-name generation.

/// Configuration for the normalization pipeline.
///
/// # Example
///
/// ```rust
/// use cfgnorm::compiler::{PassScheduler, PipelineConfig};
///
/// let config = PipelineConfig {
///     enable_propagation: false,
///     verify_shape: true,
///     ..PipelineConfig::default()
/// };
/// let scheduler = PassScheduler::canonical(config);
/// assert_eq!(scheduler.pass_names(), vec!["call-flattening", "short-circuit-elimination", "ssa-destruction"]);
/// ```
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Run the propagation pass between short-circuit elimination and SSA destruction
    /// (default: true).
    pub enable_propagation: bool,

    /// Process the procedures of a module on the rayon thread pool (default: true).
    ///
    /// Output order always matches input order.
    pub parallel: bool,

    /// Check the backend shape contract after the last pass (default: false).
    ///
    /// Only meaningful for the canonical pass order.
    pub verify_shape: bool,

    /// Prefix of temporaries introduced for hoisted calls (default: `"t"`).
    pub temp_prefix: String,

    /// Prefix of slots introduced for block parameters (default: `"slot"`).
    pub slot_prefix: String,

    /// Maximum number of candidates tried before fresh-name generation gives up
    /// (default: 65536).
    pub label_probe_limit: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            enable_propagation: true,
            parallel: true,
            verify_shape: false,
            temp_prefix: "t".to_string(),
            slot_prefix: "slot".to_string(),
            label_probe_limit: 65_536,
        }
    }
}

impl PipelineConfig {
    /// Returns a configuration that processes procedures on the calling thread.
    #[must_use]
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            ..Self::default()
        }
    }
}
