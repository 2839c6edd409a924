use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum AppError {
    #[error("Empty link! Paste a YouTube link")]
    EmptyLink,

    #[error("Invalid link! Use a YouTube link")]
    InvalidLink,

    #[error("Select at least one video to download")]
    NothingSelected,

    #[error("No item number {0} in this playlist")]
    InvalidSelection(usize),

    #[error("Analyze a link first")]
    NotAnalyzed,

    #[error("Another {0} is already in progress")]
    Busy(&'static str),

    #[error("Could not analyze the link: {0}")]
    Probe(String),

    #[error("I/O error: {0}")]
    Io(String),
}
