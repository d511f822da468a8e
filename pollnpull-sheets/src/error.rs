//! Error types for pollnpull-sheets.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("invalid service account credentials: {0}")]
    InvalidKey(#[from] serde_json::Error),

    #[error("unable to sign token assertion: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("HTTP {status} from {url}: {body}")]
    Status { url: String, status: u16, body: String },

    #[error("unable to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: std::io::Error,
    },
}

impl SheetsError {
    pub(crate) fn from_ureq(url: &str, err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status, response) => Self::Status {
                url: url.to_string(),
                status,
                body: response.into_string().unwrap_or_default(),
            },
            ureq::Error::Transport(transport) => Self::Transport {
                url: url.to_string(),
                message: transport.to_string(),
            },
        }
    }
}
