use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::command::CommandError;

#[derive(Debug, Error, Diagnostic)]
pub enum FetchError {
    #[error("{0}")]
    UnsupportedMode(String),

    #[error("Failed to download data from {url}")]
    #[diagnostic(help("check the download link and the access credential"))]
    Transfer {
        url: String,
        #[source]
        source: CommandError,
    },

    #[error("invalid zip archive at {path}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("zip entry path traversal detected: {0}")]
    UnsafeArchiveEntry(String),

    #[error("output directory does not exist: {0}")]
    OutputDirMissing(PathBuf),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("missing config file {0}")]
    MissingConfig(PathBuf),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid transfer method: {0}")]
    InvalidMethod(String),

    #[error("input required but running non-interactively: {0}")]
    MissingInput(String),

    #[error("failed to read terminal input: {0}")]
    Prompt(String),
}
