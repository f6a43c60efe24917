//! Error types for metaglob.
//!
//! Configuration problems are rejected up front with [`ConfigError`].
//! Rendering backends report resource failures with [`BackendError`]; the
//! frame driver logs those and keeps ticking.

use thiserror::Error;

/// Errors raised while validating or applying engine configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Grid resolution outside the supported range.
    #[error("field resolution must be between {min} and {max} (got {got})")]
    Resolution { got: u32, min: u32, max: u32 },

    /// A duration that must be a finite, non-negative number of seconds.
    #[error("duration `{name}` must be finite and >= 0 (got {value})")]
    Duration { name: &'static str, value: f32 },

    /// A rate, radius or strength that must be finite and positive.
    #[error("parameter `{name}` must be finite and > 0 (got {value})")]
    NonPositive { name: &'static str, value: f32 },

    /// A random range whose start exceeds its end.
    #[error("range `{name}` is inverted ({start} > {end})")]
    InvertedRange { name: &'static str, start: f32, end: f32 },

    /// A random range with a non-finite bound or width.
    #[error("range `{name}` must have finite bounds and width ({start}..{end})")]
    NonFiniteRange { name: &'static str, start: f32, end: f32 },

    /// Motion or burst pools that would be empty.
    #[error("`{0}` must be at least 1")]
    EmptyPool(&'static str),
}

/// Errors reported by a rendering backend.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    /// The reflection probe could not be re-captured.
    #[error("reflection probe refresh failed: {0}")]
    ProbeRefresh(String),

    /// The environment map failed to load.
    #[error("environment load failed: {0}")]
    EnvironmentLoad(String),
}
