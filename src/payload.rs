// Request construction: chat payload assembly (with optional inline
// image) and image-request URL / output-filename derivation. Everything
// here is pure apart from reading the attached image file.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use log::warn;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use url::form_urlencoded;

use crate::api::TextModel;

/// One user turn as captured by the session loop: the typed prompt and,
/// optionally, a picked image file to send along with it.
#[derive(Debug, Clone)]
pub struct PromptRequest {
    pub text: String,
    pub attached_image: Option<PathBuf>,
}

/// Wire-shaped chat request body. Built fresh per turn, never mutated
/// after construction.
#[derive(Debug, Serialize)]
pub struct ChatPayload {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: MessageContent,
}

/// A message carries either a bare string or an ordered part list; the
/// API accepts both shapes, so serialization is untagged.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

/// Fully formed image-generation request: the GET URL with the encoded
/// prompt embedded, plus the filename the result will be saved under.
#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub url: String,
    pub filename: String,
}

/// Assemble the chat request body for one turn.
///
/// The attached image is inlined as a `data:` URI only when the model
/// declares image input; otherwise it is dropped with a warning and the
/// turn degrades to plain text. An unreadable image degrades the same
/// way instead of failing the turn.
pub fn build_chat_payload(model: &TextModel, request: &PromptRequest) -> ChatPayload {
    let content = match &request.attached_image {
        Some(path) if model.supports_image_input() => match inline_image_part(path) {
            Ok(image_part) => MessageContent::Parts(vec![
                ContentPart::Text {
                    text: request.text.clone(),
                },
                image_part,
            ]),
            Err(err) => {
                warn!(
                    "could not read {}: {err}; sending text only",
                    path.display()
                );
                MessageContent::Text(request.text.clone())
            }
        },
        Some(path) => {
            warn!(
                "model {} does not accept image input; dropping {}",
                model.name,
                path.display()
            );
            MessageContent::Text(request.text.clone())
        }
        None => MessageContent::Text(request.text.clone()),
    };

    ChatPayload {
        model: model.name.clone(),
        messages: vec![ChatMessage {
            role: "user".into(),
            content,
        }],
    }
}

fn inline_image_part(path: &Path) -> std::io::Result<ContentPart> {
    let bytes = fs::read(path)?;
    // MIME from the extension, image/jpeg when there is nothing to go on.
    let mime = mime_guess::from_path(path).first_or(mime_guess::mime::IMAGE_JPEG);
    let url = format!("data:{};base64,{}", mime.essence_str(), BASE64.encode(bytes));
    Ok(ContentPart::ImageUrl {
        image_url: ImageUrl { url },
    })
}

/// Build the image-generation request for a prompt: quote-plus-encode it
/// onto the prompt base URL with the model as a query parameter, and
/// derive the output filename.
pub fn build_image_request(prompt_base_url: &str, model_name: &str, prompt: &str) -> ImageRequest {
    let url = format!(
        "{}{}?model={}",
        prompt_base_url,
        encode_prompt(prompt),
        encode_prompt(model_name)
    );
    ImageRequest {
        url,
        filename: image_output_filename(model_name, prompt),
    }
}

/// Form-urlencode a prompt for embedding in a URL path: spaces become
/// `+`, reserved characters are percent-escaped.
pub fn encode_prompt(prompt: &str) -> String {
    form_urlencoded::byte_serialize(prompt.as_bytes()).collect()
}

/// Filename for a generated image: the model name plus the first 20
/// characters of the prompt, whitespace flattened to underscores.
pub fn image_output_filename(model_name: &str, prompt: &str) -> String {
    let stub: String = prompt
        .chars()
        .take(20)
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    format!("generated_image_{model_name}_{stub}.png")
}
