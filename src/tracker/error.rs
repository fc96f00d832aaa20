use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("tracker already running")]
    AlreadyRunning,
    #[error("poll interval must be greater than zero")]
    ZeroInterval,
    #[error("http client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Failure of a single location fetch. Swallowed by the poller.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response code {0}")]
    ResponseCode(i64),
    #[error("malformed response: {0}")]
    Malformed(String),
}
