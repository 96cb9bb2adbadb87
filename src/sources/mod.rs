//! Clients for external collaborators.

use std::sync::OnceLock;
use std::time::Duration;

use crate::error::RefMatchError;

pub mod auth;
pub mod catalog;
pub mod extraction;

const BODY_EXCERPT_LEN: usize = 200;

/// Shared HTTP client for all outbound calls.
///
/// No client-wide timeout: each call site sets its own deadline (5s single
/// search, 10s batch/token), so only the connect timeout lives here.
pub(crate) fn shared_client() -> Result<reqwest::Client, RefMatchError> {
    static SHARED_HTTP_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

    if let Some(client) = SHARED_HTTP_CLIENT.get() {
        return Ok(client.clone());
    }

    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(5))
        .user_agent(concat!("refmatch/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(RefMatchError::HttpClientInit)?;

    match SHARED_HTTP_CLIENT.set(client.clone()) {
        Ok(()) => Ok(client),
        Err(_) => SHARED_HTTP_CLIENT
            .get()
            .cloned()
            .ok_or_else(|| RefMatchError::Api {
                api: "http".into(),
                message: "Shared HTTP client initialization race".into(),
            }),
    }
}

/// Short, printable slice of a response body for error messages.
pub(crate) fn body_excerpt(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let trimmed = text.trim();
    if trimmed.len() <= BODY_EXCERPT_LEN {
        trimmed.to_string()
    } else {
        let mut end = BODY_EXCERPT_LEN;
        while !trimmed.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &trimmed[..end])
    }
}
