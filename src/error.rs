use std::fmt;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PargzError {
    #[error("error reading input: {0}")]
    Input(#[source] io::Error),

    #[error("error writing output: {0}")]
    Output(#[source] io::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Compression error in block {block}: {message}")]
    Compression { block: usize, message: String },

    #[error("interrupted while compressing")]
    Interrupted,

    #[error("Thread error: {0}")]
    Thread(String),
}

impl PargzError {
    pub fn compression<T: fmt::Display>(block: usize, msg: T) -> Self {
        PargzError::Compression {
            block,
            message: msg.to_string(),
        }
    }

    pub fn invalid_argument<T: fmt::Display>(msg: T) -> Self {
        PargzError::InvalidArgument(msg.to_string())
    }

    pub fn thread<T: fmt::Display>(msg: T) -> Self {
        PargzError::Thread(msg.to_string())
    }
}

pub type PargzResult<T> = Result<T, PargzError>;
