use std::path::PathBuf;

/// Conditions that stop an export before anything is written.
///
/// These travel inside `anyhow::Error`; use `downcast_ref::<ExportError>()`
/// to tell them apart from I/O failures.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("output file already exists: {}", .0.display())]
    OutputExists(PathBuf),

    #[error("no input files found")]
    NoInputs,

    #[error("input path does not exist: {}", .0.display())]
    MissingPath(PathBuf),
}
