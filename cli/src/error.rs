use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Non-2xx response. `message` is the server's own text, shown as-is.
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("prompt: {0}")]
    Prompt(#[from] rustyline::error::ReadlineError),
    #[error("output: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    /// Ctrl-C or end of input at a prompt.
    #[error("interrupted")]
    Interrupted,
}

impl CliError {
    /// Errors reported to the operator before returning to the menu; everything else ends the session.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CliError::Http(_) | CliError::Api { .. })
    }
}
