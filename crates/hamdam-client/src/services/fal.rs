//! fal.ai fast-sdxl image generation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::collaborators::{CollaboratorError, ImageCollaborator, ImageRequest};

const FAL_URL: &str = "https://fal.run/fal-ai/fast-sdxl";

#[derive(Debug, Serialize)]
struct FalBody<'a> {
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    negative_prompt: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct FalResponse {
    #[serde(default)]
    images: Vec<FalImage>,
}

#[derive(Debug, Deserialize)]
struct FalImage {
    #[serde(default)]
    url: String,
}

fn first_image(response: FalResponse) -> Result<String, CollaboratorError> {
    response
        .images
        .into_iter()
        .map(|img| img.url)
        .find(|url| !url.is_empty())
        .ok_or(CollaboratorError::NoImage)
}

pub struct FalImageClient {
    http: reqwest::Client,
    api_key: Option<String>,
}

impl FalImageClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
        }
    }
}

#[async_trait]
impl ImageCollaborator for FalImageClient {
    async fn generate(&self, request: ImageRequest) -> Result<String, CollaboratorError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(CollaboratorError::MissingApiKey("FAL_API_KEY"))?;

        let body = FalBody {
            prompt: &request.prompt,
            negative_prompt: request.negative_prompt.as_deref(),
        };

        let resp = self
            .http
            .post(FAL_URL)
            .header("Authorization", format!("Key {api_key}"))
            .json(&body)
            .send()
            .await?;

        let response: FalResponse = super::read_json("fal.ai", resp).await?;
        first_image(response)
    }
}
