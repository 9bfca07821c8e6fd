use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Failures reading or writing the series tables.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("table not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("table has no data: {}", .0.display())]
    Empty(PathBuf),

    #[error("table is missing required column `{0}`")]
    MissingColumn(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Why a single detail page produced no image URL.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(StatusCode),

    #[error("no matching image on page")]
    ImageNotFound,

    #[error("invalid base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

#[derive(Debug, Error)]
pub enum AiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("generation request failed with {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("generation returned no text")]
    EmptyResponse,
}
