//! HTTP clients for the third-party chat and image providers.

pub mod fal;
pub mod gemini;
pub mod openrouter;
pub mod perchance;

pub use fal::FalImageClient;
pub use gemini::GeminiImageClient;
pub use openrouter::OpenRouterClient;
pub use perchance::PerchanceClient;

use serde::de::DeserializeOwned;

use crate::collaborators::CollaboratorError;

/// Fail on non-2xx, then decode the body.
async fn read_json<T: DeserializeOwned>(
    provider: &'static str,
    resp: reqwest::Response,
) -> Result<T, CollaboratorError> {
    let status = resp.status();
    let body = resp.text().await?;

    if !status.is_success() {
        tracing::error!(provider, status = status.as_u16(), body = %body, "provider error response");
        return Err(CollaboratorError::Status {
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|e| {
        tracing::error!(provider, error = %e, "malformed provider response");
        CollaboratorError::Provider(format!("Invalid response from {provider}: {e}"))
    })
}
