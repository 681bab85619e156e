use std::{io, path::PathBuf};

use thiserror::Error;

/// Everything that can stop a pipeline run. None of these are recovered from.
#[derive(Error, Debug)]
pub enum PlaseekError {
    #[error("{tool} not found at '{}'. Please set PATH to {tool} or pass its path explicitly.", .path.display())]
    BinaryNotFound { tool: &'static str, path: PathBuf },

    #[error("missing required path: {0}")]
    MissingPath(&'static str),

    #[error("invalid input file suffix '{}': the suffix must be .pdb or .m8", .0.display())]
    UnsupportedInput(PathBuf),

    #[error("could not run {program}: {source}")]
    ToolLaunch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} failed (status={status:?}): {stderr}")]
    ToolFailed {
        program: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("malformed table '{}': {source}", .path.display())]
    Table {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("column '{column}' not found in '{}'", .path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error("invalid value '{value}' in column '{column}'")]
    InvalidValue { column: String, value: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, PlaseekError>;
