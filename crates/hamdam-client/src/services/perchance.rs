//! Perchance text-to-image, reached through an authenticated reverse proxy.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::collaborators::{CollaboratorError, ImageCollaborator, ImageRequest};

const PERCHANCE_PATH: &str = "/api/v1/call/ai-text-to-image-generator";

#[derive(Debug, Serialize)]
struct CallBody<'a> {
    method: &'static str,
    args: CallArgs<'a>,
}

#[derive(Debug, Serialize)]
struct CallArgs<'a> {
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    negative_prompt: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    style_preset: Option<&'a str>,
}

impl<'a> CallBody<'a> {
    fn generate(request: &'a ImageRequest) -> Self {
        Self {
            method: "generate",
            args: CallArgs {
                prompt: &request.prompt,
                negative_prompt: request.negative_prompt.as_deref(),
                style_preset: request.style_preset.as_deref(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    output: String,
}

/// Only a successful call with an `https://` output counts as an image.
fn image_url(response: CallResponse) -> Result<String, CollaboratorError> {
    if response.status == "success" && response.output.starts_with("https://") {
        return Ok(response.output);
    }
    if response.output.is_empty() {
        Err(CollaboratorError::Provider(
            "The Perchance response was not valid".into(),
        ))
    } else {
        Err(CollaboratorError::Provider(response.output))
    }
}

pub struct PerchanceClient {
    http: reqwest::Client,
    proxy_url: Option<String>,
    user: Option<String>,
    password: Option<String>,
    timeout: Duration,
}

impl PerchanceClient {
    pub fn new(
        proxy_url: Option<String>,
        user: Option<String>,
        password: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            proxy_url,
            user,
            password,
            timeout,
        }
    }

    async fn call(&self, base: &str, request: &ImageRequest) -> Result<String, CollaboratorError> {
        let url = format!("{}{}", base.trim_end_matches('/'), PERCHANCE_PATH);

        let mut builder = self.http.post(url).json(&CallBody::generate(request));
        if let Some(user) = &self.user {
            builder = builder.basic_auth(user, self.password.as_ref());
        }

        let resp = builder.send().await?;
        let response: CallResponse = super::read_json("Perchance", resp).await?;
        image_url(response)
    }
}

#[async_trait]
impl ImageCollaborator for PerchanceClient {
    async fn generate(&self, request: ImageRequest) -> Result<String, CollaboratorError> {
        let base = self
            .proxy_url
            .as_deref()
            .ok_or(CollaboratorError::MissingApiKey("PERCHANCE_PROXY_URL"))?;

        match tokio::time::timeout(self.timeout, self.call(base, &request)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(timeout_secs = self.timeout.as_secs(), "Perchance request timed out");
                Err(CollaboratorError::Timeout)
            }
        }
    }
}
