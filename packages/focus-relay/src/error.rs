use std::time::Duration;

pub type RelayResult<T> = Result<T, RelayError>;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Failed to connect to upstream {addr}: {source}")]
    UpstreamConnect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Timed out after {timeout:?} connecting to upstream {addr}")]
    UpstreamTimeout { addr: String, timeout: Duration },

    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
}
