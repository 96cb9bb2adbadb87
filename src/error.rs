use thiserror::Error;

/// Errors surfaced by the matching pipeline.
///
/// Transport-level and HTTP-level failures are kept distinct because the
/// degradation policy treats them differently: a non-success status still
/// means the catalog answered, while a transport failure means it did not.
#[derive(Debug, Error)]
pub enum RefMatchError {
    #[error("{api}: {message}")]
    Api { api: String, message: String },

    #[error("{api}: invalid JSON response")]
    ApiJson {
        api: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{api}: request failed")]
    Transport {
        api: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to initialize HTTP client")]
    HttpClientInit(#[source] reqwest::Error),
}
