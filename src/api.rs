// API client module: a small blocking HTTP client that talks to the
// Pollinations text and image services. It is intentionally small and
// synchronous; every call is a single attempt with no caching or retry.

use anyhow::{Context, Result};
use log::debug;
use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::Deserialize;
use std::fs::File;
use std::path::PathBuf;

use crate::payload::{ChatPayload, ImageRequest};

const DEFAULT_TEXT_BASE_URL: &str = "https://text.pollinations.ai";
const DEFAULT_IMAGE_BASE_URL: &str = "https://image.pollinations.ai";

/// Failures produced by catalog resolution and generation dispatch.
/// Callers only ever observe these as values; nothing in this module
/// panics on a bad response.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("unexpected response body: {raw}")]
    Malformed { raw: String },
    #[error("could not write {path}: {source}")]
    Save {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Base URLs of the two services. Kept as plain fields so tests and
/// alternate deployments can point the client anywhere.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub text_base_url: String,
    pub image_base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            text_base_url: DEFAULT_TEXT_BASE_URL.into(),
            image_base_url: DEFAULT_IMAGE_BASE_URL.into(),
        }
    }
}

impl ApiConfig {
    /// Read the base URLs from `POLLINATIONS_TEXT_URL` and
    /// `POLLINATIONS_IMAGE_URL`, falling back to the public services.
    pub fn from_env() -> Self {
        ApiConfig {
            text_base_url: std::env::var("POLLINATIONS_TEXT_URL")
                .unwrap_or_else(|_| DEFAULT_TEXT_BASE_URL.into()),
            image_base_url: std::env::var("POLLINATIONS_IMAGE_URL")
                .unwrap_or_else(|_| DEFAULT_IMAGE_BASE_URL.into()),
        }
    }

    fn text_models_url(&self) -> String {
        format!("{}/models", self.text_base_url)
    }

    fn text_generation_url(&self) -> String {
        format!("{}/openai", self.text_base_url)
    }

    fn image_models_url(&self) -> String {
        format!("{}/models", self.image_base_url)
    }

    /// Prefix the encoded prompt is appended to when requesting an image.
    pub fn image_prompt_base(&self) -> String {
        format!("{}/prompt/", self.image_base_url)
    }
}

/// One entry of the text-model catalog. Only `name` is required for
/// dispatch; the description and declared input modalities are advisory
/// metadata used when presenting the catalog and shaping payloads.
#[derive(Debug, Clone, Deserialize)]
pub struct TextModel {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub input_modalities: Vec<String>,
}

impl TextModel {
    pub fn supports_image_input(&self) -> bool {
        self.input_modalities.iter().any(|m| m == "image")
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Blocking client holding the shared reqwest client and the endpoint
/// configuration.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    config: ApiConfig,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        Ok(ApiClient { client, config })
    }

    /// Create an ApiClient configured from the environment.
    pub fn from_env() -> Result<Self> {
        Self::new(ApiConfig::from_env())
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Fetch the text-model catalog. Each invocation is a fresh read.
    pub fn text_models(&self) -> Result<Vec<TextModel>, ApiError> {
        let url = self.config.text_models_url();
        debug!("fetching text model catalog from {url}");
        let res = self.client.get(&url).send()?;
        let body = success_body(res)?;
        parse_text_catalog(&body)
    }

    /// Fetch the image-model catalog, a plain list of model names.
    pub fn image_models(&self) -> Result<Vec<String>, ApiError> {
        let url = self.config.image_models_url();
        debug!("fetching image model catalog from {url}");
        let res = self.client.get(&url).send()?;
        let body = success_body(res)?;
        parse_image_catalog(&body)
    }

    /// POST a chat payload and extract the generated reply.
    pub fn generate_text(&self, payload: &ChatPayload) -> Result<String, ApiError> {
        let url = self.config.text_generation_url();
        debug!("posting chat payload for model {} to {url}", payload.model);
        let res = self.client.post(&url).json(payload).send()?;
        let body = success_body(res)?;
        chat_content(&body)
    }

    /// GET a generated image, streaming the body into the request's
    /// derived filename in the current working directory. Returns the
    /// written path. A partial file may remain if the stream dies.
    pub fn generate_image(&self, request: &ImageRequest) -> Result<PathBuf, ApiError> {
        debug!("requesting image from {}", request.url);
        let mut res = self.client.get(&request.url).send()?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().unwrap_or_else(|_| "".into());
            return Err(ApiError::Status { status, body });
        }
        let path = PathBuf::from(&request.filename);
        let mut file = File::create(&path).map_err(|source| ApiError::Save {
            path: path.clone(),
            source,
        })?;
        res.copy_to(&mut file)?;
        Ok(path)
    }
}

/// Consume a response, returning its body on success and a `Status`
/// error (with whatever body text was readable) otherwise.
fn success_body(res: Response) -> Result<String, ApiError> {
    let status = res.status();
    if !status.is_success() {
        let body = res.text().unwrap_or_else(|_| "".into());
        return Err(ApiError::Status { status, body });
    }
    Ok(res.text()?)
}

/// Parse a text-catalog body. Anything other than an array of model
/// objects is `Malformed` with the raw body kept for diagnostics.
fn parse_text_catalog(body: &str) -> Result<Vec<TextModel>, ApiError> {
    serde_json::from_str(body).map_err(|_| ApiError::Malformed {
        raw: body.to_string(),
    })
}

/// Parse an image-catalog body, a plain array of model names.
fn parse_image_catalog(body: &str) -> Result<Vec<String>, ApiError> {
    serde_json::from_str(body).map_err(|_| ApiError::Malformed {
        raw: body.to_string(),
    })
}

/// Pull the first choice's message content out of a chat completion
/// body. Anything else, including valid JSON of the wrong shape, is
/// reported as `Malformed` with the raw body kept for diagnostics.
fn chat_content(body: &str) -> Result<String, ApiError> {
    let parsed: ChatResponse = serde_json::from_str(body).map_err(|_| ApiError::Malformed {
        raw: body.to_string(),
    })?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| ApiError::Malformed {
            raw: body.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_content_extracts_first_choice() {
        let body = r#"{"choices":[{"message":{"content":"hi there"}},{"message":{"content":"ignored"}}]}"#;
        assert_eq!(chat_content(body).unwrap(), "hi there");
    }

    #[test]
    fn chat_content_rejects_missing_choices() {
        let err = chat_content("{}").unwrap_err();
        match err {
            ApiError::Malformed { raw } => assert_eq!(raw, "{}"),
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[test]
    fn chat_content_rejects_empty_choices() {
        assert!(matches!(
            chat_content(r#"{"choices":[]}"#),
            Err(ApiError::Malformed { .. })
        ));
    }

    #[test]
    fn chat_content_rejects_choice_without_content() {
        assert!(matches!(
            chat_content(r#"{"choices":[{"message":{}}]}"#),
            Err(ApiError::Malformed { .. })
        ));
    }

    #[test]
    fn chat_content_keeps_raw_body_on_parse_failure() {
        let err = chat_content("not json at all").unwrap_err();
        match err {
            ApiError::Malformed { raw } => assert_eq!(raw, "not json at all"),
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[test]
    fn text_model_catalog_fills_defaults() {
        let body = r#"[{"name":"gpt-x"},{"name":"gpt-y","description":"general","input_modalities":["text","image"]}]"#;
        let models = parse_text_catalog(body).unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].name, "gpt-x");
        assert!(models[0].description.is_empty());
        assert!(!models[0].supports_image_input());
        assert!(models[1].supports_image_input());
    }

    #[test]
    fn text_catalog_rejects_non_array_body() {
        let err = parse_text_catalog("{}").unwrap_err();
        match err {
            ApiError::Malformed { raw } => assert_eq!(raw, "{}"),
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[test]
    fn image_catalog_parses_bare_names() {
        let models = parse_image_catalog(r#"["flux","turbo"]"#).unwrap();
        assert_eq!(models, vec!["flux".to_string(), "turbo".to_string()]);
    }

    #[test]
    fn image_catalog_rejects_malformed_body() {
        let err = parse_image_catalog("not json").unwrap_err();
        match err {
            ApiError::Malformed { raw } => assert_eq!(raw, "not json"),
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[test]
    fn default_config_derives_endpoints() {
        let config = ApiConfig::default();
        assert_eq!(
            config.text_models_url(),
            "https://text.pollinations.ai/models"
        );
        assert_eq!(
            config.text_generation_url(),
            "https://text.pollinations.ai/openai"
        );
        assert_eq!(
            config.image_models_url(),
            "https://image.pollinations.ai/models"
        );
        assert_eq!(
            config.image_prompt_base(),
            "https://image.pollinations.ai/prompt/"
        );
    }
}
