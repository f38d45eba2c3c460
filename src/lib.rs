// Library root
// -----------
// This crate exposes a small library surface for the CLI. The binary
// (`main.rs`) uses these modules to implement the interactive client.
//
// Module responsibilities:
// - `api`: Encapsulates HTTP interactions with the Pollinations services
//   (model catalogs, text generation, image generation) and the endpoint
//   configuration.
// - `payload`: Builds the wire-shaped request bodies and URLs, including
//   inline base64 image embedding for multimodal prompts.
// - `ui`: Implements the terminal-based flows (menu, model selection,
//   per-model sessions) and delegates requests to `api`.
//
// Keeping this separation makes it easier to test the request-building
// logic and to script the interactive parts in tests.
pub mod api;
pub mod payload;
pub mod ui;
