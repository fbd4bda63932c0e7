//! Error types for pipeline-level failures

use thiserror::Error;

use crate::combat_log::ParseError;

/// Failures surfaced by the pipeline manager and its C host surface. Every
/// one of them is tolerated: the line is dropped and counted, or the plugin
/// is refused, and the stream continues.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A line that violated the mandatory grammar; dropped and counted.
    #[error("malformed line dropped: {0}")]
    MalformedLine(#[from] ParseError),

    /// An external plugin was built against a different plugin API.
    #[error("plugin api version {plugin} does not match host version {host}")]
    AbiMismatch { plugin: i32, host: i32 },

    /// An external plugin's entry point failed during registration.
    #[error("plugin registration failed: {0}")]
    PluginRegistration(String),

    /// Shared-library loading is not provided by this host.
    #[error("shared-library plugin loading is not available (requested {path:?})")]
    LoaderUnavailable { path: String },
}
