use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while talking to the chat server or loading configuration
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("response body from {url} is not valid JSON: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("response body from {url} is null")]
    NullBody { url: String },

    #[error("could not determine {0} directory")]
    NoDirectory(&'static str),

    #[error("config file {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config file {path} is malformed: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not serialize config for {path}: {source}")]
    ConfigSerialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid server URL {0:?}")]
    InvalidUrl(String),

    #[error("request task ended unexpectedly: {0}")]
    TaskFailed(String),
}

pub type ChatResult<T> = Result<T, ChatError>;
