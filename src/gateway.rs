//! Client for the OpenAI-compatible AI gateway.
//!
//! Two calls are made against the same `chat/completions` endpoint: a vision
//! call that returns the material analysis as JSON text, and an image
//! generation call that returns a structure diagram as a data URL.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::prompt;

const LOG_BODY_LIMIT: usize = 500;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("No content in response")]
    EmptyContent,
    #[error("Parse error: {0}")]
    Parse(String),
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<RequestMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    modalities: Option<[&'static str; 2]>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct RequestMessage<'a> {
    role: &'static str,
    content: Content<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Content<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageRef<'a> },
}

#[derive(Serialize)]
struct ImageRef<'a> {
    url: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    images: Option<Vec<GeneratedImage>>,
}

#[derive(Deserialize)]
struct GeneratedImage {
    image_url: Option<GeneratedUrl>,
}

#[derive(Deserialize)]
struct GeneratedUrl {
    url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: String,
    text_model: String,
    image_model: String,
}

impl GatewayClient {
    pub fn new(settings: &Settings) -> Result<Self, GatewayError> {
        let mut builder = Client::builder().timeout(settings.request_timeout);
        if is_local(&settings.gateway_url) {
            builder = builder.no_proxy();
        }
        let client = builder.build()?;
        Ok(Self {
            client,
            base_url: settings.gateway_url.clone(),
            text_model: settings.text_model.clone(),
            image_model: settings.image_model.clone(),
        })
    }

    /// Sends the packaging photo and returns the model's raw JSON text.
    pub async fn analyze_packaging(
        &self,
        api_key: &str,
        image_data_url: &str,
    ) -> Result<String, GatewayError> {
        let payload = CompletionRequest {
            model: &self.text_model,
            messages: vec![RequestMessage {
                role: "user",
                content: Content::Parts(vec![
                    ContentPart::Text {
                        text: prompt::ANALYSIS_PROMPT,
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageRef {
                            url: image_data_url,
                        },
                    },
                ]),
            }],
            response_format: Some(ResponseFormat {
                kind: "json_object",
            }),
            modalities: None,
        };

        tracing::info!(model = %self.text_model, "sending packaging image to AI gateway");
        let response = self.complete(api_key, &payload).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(GatewayError::EmptyContent)
    }

    /// Asks the image model for a skeletal diagram of `formula`.
    ///
    /// `Ok(None)` means the call succeeded but no image came back.
    pub async fn generate_structure(
        &self,
        api_key: &str,
        formula: &str,
    ) -> Result<Option<String>, GatewayError> {
        let image_prompt = prompt::structure_prompt(formula);
        let payload = CompletionRequest {
            model: &self.image_model,
            messages: vec![RequestMessage {
                role: "user",
                content: Content::Text(&image_prompt),
            }],
            response_format: None,
            modalities: Some(["image", "text"]),
        };

        let response = self.complete(api_key, &payload).await?;

        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.images)
            .and_then(|images| images.into_iter().next())
            .and_then(|img| img.image_url)
            .and_then(|u| u.url)
            .filter(|u| !u.is_empty()))
    }

    async fn complete(
        &self,
        api_key: &str,
        payload: &CompletionRequest<'_>,
    ) -> Result<CompletionResponse, GatewayError> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", api_key))
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(
                status = status.as_u16(),
                body = %truncate(&body, LOG_BODY_LIMIT),
                "AI gateway returned an error"
            );
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        serde_json::from_str(&body).map_err(|e| GatewayError::Parse(e.to_string()))
    }
}

fn is_local(url: &str) -> bool {
    url.contains("localhost") || url.contains("127.0.0.1")
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn vision_request_carries_image_and_json_mode() {
        let payload = CompletionRequest {
            model: "m",
            messages: vec![RequestMessage {
                role: "user",
                content: Content::Parts(vec![
                    ContentPart::Text { text: "hi" },
                    ContentPart::ImageUrl {
                        image_url: ImageRef {
                            url: "data:image/jpeg;base64,AAAA",
                        },
                    },
                ]),
            }],
            response_format: Some(ResponseFormat { kind: "json_object" }),
            modalities: None,
        };

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "m",
                "messages": [{
                    "role": "user",
                    "content": [
                        { "type": "text", "text": "hi" },
                        {
                            "type": "image_url",
                            "image_url": { "url": "data:image/jpeg;base64,AAAA" }
                        }
                    ]
                }],
                "response_format": { "type": "json_object" }
            })
        );
    }

    #[test]
    fn image_response_without_images_parses() {
        let response: CompletionResponse =
            serde_json::from_value(json!({ "choices": [{ "message": { "content": "sorry" } }] }))
                .unwrap();
        assert!(response.choices[0].message.images.is_none());
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("ééé", 2), "éé");
    }
}
