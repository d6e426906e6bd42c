/// Errors from encoding frames or building endpoint URLs.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("unsupported scheme {0:?} (expected ws or wss)")]
    UnsupportedScheme(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
