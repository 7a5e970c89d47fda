use thiserror::Error;

#[derive(Error, Debug)]
pub enum RankError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Selector error: {0}")]
    Selector(String),
    #[error("Results feed did not load within {0}s")]
    LoadTimeout(u64),
    #[error("Browsing session failure: {0}")]
    Session(String),
    #[error("Browser error: {0}")]
    Browser(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("{0}")]
    Other(String),
}

impl RankError {
    /// True when the error leaves the browsing session unusable for further jobs.
    pub fn is_session_failure(&self) -> bool {
        match self {
            RankError::Session(_) => true,
            RankError::Browser(message) => {
                let message = message.to_lowercase();
                message.contains("browser closed")
                    || message.contains("browser disconnected")
                    || message.contains("session closed")
                    || message.contains("no response from the chromium instance")
                    || message.contains("channel closed")
                    || message.contains("send failed")
                    || message.contains("websocket")
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, RankError>;
