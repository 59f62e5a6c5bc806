use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum PanelError {
    #[error("Value source {key} returned status {status}")]
    ReadStatus { key: String, status: u16 },

    #[error("Value source {0} is not available")]
    SourceUnavailable(String),

    #[error("Command rejected with status {status}")]
    CommandRejected { status: u16 },

    #[error("Unknown control group: {0}")]
    UnknownGroup(String),

    #[error("Unknown option {option} in group {group}")]
    UnknownOption { group: String, option: String },

    #[error("Unknown option id: {0}")]
    UnknownOptionId(String),

    #[error("Unknown bound field: {0}")]
    UnknownField(String),

    #[error("Invalid panel configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, PanelError>;
