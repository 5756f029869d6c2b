//! Gemini image generation. Images come back inline as base64.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::collaborators::{CollaboratorError, ImageCollaborator, ImageRequest};

const GEMINI_MODEL: &str = "gemini-2.5-flash-image";

fn endpoint() -> String {
    format!("https://generativelanguage.googleapis.com/v1beta/models/{GEMINI_MODEL}:generateContent")
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateBody<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [TextPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: [&'static str; 1],
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

fn data_url(response: GenerateResponse) -> Result<String, CollaboratorError> {
    if response
        .prompt_feedback
        .as_ref()
        .is_some_and(|f| f.block_reason.is_some())
    {
        return Err(CollaboratorError::SafetyBlocked);
    }

    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(CollaboratorError::NoImage);
    };

    let inline = candidate
        .content
        .into_iter()
        .flat_map(|c| c.parts)
        .find_map(|p| p.inline_data);

    match inline {
        Some(data) => Ok(format!("data:{};base64,{}", data.mime_type, data.data)),
        None if candidate.finish_reason.as_deref() == Some("SAFETY") => {
            Err(CollaboratorError::SafetyBlocked)
        }
        None => Err(CollaboratorError::NoImage),
    }
}

pub struct GeminiImageClient {
    http: reqwest::Client,
    api_key: Option<String>,
}

impl GeminiImageClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
        }
    }
}

#[async_trait]
impl ImageCollaborator for GeminiImageClient {
    async fn generate(&self, request: ImageRequest) -> Result<String, CollaboratorError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(CollaboratorError::MissingApiKey("GEMINI_API_KEY"))?;

        let body = GenerateBody {
            contents: [Content {
                parts: [TextPart {
                    text: &request.prompt,
                }],
            }],
            generation_config: GenerationConfig {
                response_modalities: ["IMAGE"],
            },
        };

        let resp = self
            .http
            .post(endpoint())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let response: GenerateResponse = super::read_json("Gemini", resp).await?;
        data_url(response)
    }
}
