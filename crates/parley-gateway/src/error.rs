use parley_bridge::RenderError;

/// Failures talking to the Rocket.Chat REST API.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{endpoint} failed ({status}): {message}")]
    Api {
        endpoint: String,
        status: u16,
        message: String,
    },
}

impl From<HostError> for RenderError {
    fn from(e: HostError) -> Self {
        RenderError(e.to_string())
    }
}
