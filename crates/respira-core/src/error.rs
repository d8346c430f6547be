use thiserror::Error;

/// A convenience `Result` alias using [`RespiraError`].
pub type RespiraResult<T> = Result<T, RespiraError>;

/// Top-level error type for the Respira bot.
///
/// Each variant corresponds to a subsystem that can produce errors.
#[derive(Error, Debug)]
pub enum RespiraError {
    /// An error from the messaging transport (Telegram API).
    #[error("Channel error: {0}")]
    Channel(String),

    /// An error from the spreadsheet persistence layer.
    #[error("Sheets error: {0}")]
    Sheets(String),

    /// An error related to session lookup or lifecycle.
    #[error("Session error: {0}")]
    Session(String),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// An unexpected failure inside a dialog state handler.
    #[error("Dialog error: {0}")]
    Dialog(String),

    /// A JSON serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
