use std::path::PathBuf;

use thiserror::Error;

/// Failures that abort a sort run.
///
/// The public API returns [anyhow::Error]; the root cause of a failed run is one of these and can
/// be recovered with `error.downcast_ref::<SortError>()`.
#[derive(Error, Debug)]
pub enum SortError {
    /// A line does not contain the `". "` delimiter.
    #[error("malformed record at {}:{line_number}: {line:?}", path.display())]
    MalformedRecord {
        path: PathBuf,
        line_number: usize,
        line: String,
    },

    /// The run directory or a chunk file could not be created or written.
    #[error("failed to write chunk file {}: {source}", path.display())]
    ChunkWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A sorted chunk file could not be opened or read while merging.
    #[error("failed to read chunk {index} at {}: {source}", path.display())]
    ChunkRead {
        index: usize,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("input file not found: {}", path.display())]
    InputNotFound {
        path: PathBuf,
    },

    #[error("failed to read input {}: {source}", path.display())]
    InputRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write output {}: {source}", path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SortError {
    pub(crate) fn open_input(path: &PathBuf, source: std::io::Error) -> SortError {
        if source.kind() == std::io::ErrorKind::NotFound {
            SortError::InputNotFound {
                path: path.clone(),
            }
        } else {
            SortError::InputRead {
                path: path.clone(),
                source,
            }
        }
    }
}
