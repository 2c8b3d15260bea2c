// LAZYBENCH LIBRARY ERRORS
// ONLY CONDITIONS THAT STOP AN OPERATION. ATTEMPT OUTCOMES (TIMEOUT, INCORRECT,
// VERIFICATION FAILURE) ARE DATA, NOT ERRORS.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("cannot read benchmark descriptor {path}: {source}")]
    Descriptor {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("result file error: {0}")]
    ResultCsv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("malformed sample on line {line:?}: {reason}")]
    Sample { line: String, reason: String },

    #[error("invalid value {value:?} for {axis}")]
    Axis { axis: &'static str, value: String },

    #[error("baseline {0:?} has no results")]
    MissingBaseline(String),
}

pub type Result<T> = std::result::Result<T, Error>;
