// UI layer: interactive menu, model selection and per-model sessions
// using `dialoguer`. Line input, confirmations and the photo picker sit
// behind the `PromptSource` trait so tests can script them.

use crate::api::{ApiClient, TextModel};
use crate::payload::{build_chat_payload, build_image_request, PromptRequest};
use anyhow::Result;
use crossterm::style::Stylize;
use dialoguer::{Confirm, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;

/// Typed to leave a model session and return to the outer menu.
const EXIT_COMMAND: &str = "q";

/// Blocking interactive inputs used by the selection and session flows.
pub trait PromptSource {
    fn read_line(&mut self, prompt: &str) -> Result<String>;
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
    /// Let the user pick an image file; `None` when the dialog is
    /// cancelled.
    fn pick_image(&mut self) -> Option<PathBuf>;
}

/// Console implementation: `dialoguer` prompts plus the native file
/// dialog for photos.
pub struct ConsolePrompts;

impl PromptSource for ConsolePrompts {
    fn read_line(&mut self, prompt: &str) -> Result<String> {
        let line: String = Input::new().with_prompt(prompt).interact_text()?;
        Ok(line)
    }

    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        Ok(Confirm::new().with_prompt(prompt).default(false).interact()?)
    }

    fn pick_image(&mut self) -> Option<PathBuf> {
        rfd::FileDialog::new()
            .set_title("Choose a photo")
            .add_filter("Image files", &["jpg", "jpeg", "png", "gif", "bmp", "webp"])
            .pick_file()
    }
}

/// How a catalog entry is presented in the numbered list. Lets the
/// selection flow work over both catalog shapes.
pub trait CatalogEntry {
    fn label(&self) -> String;
}

impl CatalogEntry for TextModel {
    fn label(&self) -> String {
        if self.description.is_empty() {
            self.name.clone()
        } else {
            format!("{} - {}", self.name, self.description)
        }
    }
}

impl CatalogEntry for String {
    fn label(&self) -> String {
        self.clone()
    }
}

/// Present the catalog with 1-based indices and keep prompting until the
/// user names an entry. `None` means there was nothing to pick from.
pub fn select_model<'a, T: CatalogEntry>(
    input: &mut dyn PromptSource,
    catalog: &'a [T],
) -> Result<Option<&'a T>> {
    if catalog.is_empty() {
        println!("No models are available right now.");
        return Ok(None);
    }

    println!("\nAvailable models:");
    for (i, entry) in catalog.iter().enumerate() {
        println!("{}. {}", i + 1, entry.label());
    }

    loop {
        let line = input.read_line("Model number")?;
        match line.trim().parse::<usize>() {
            Ok(choice) if (1..=catalog.len()).contains(&choice) => {
                return Ok(Some(&catalog[choice - 1]))
            }
            Ok(_) => println!("That number is not in the list, try again."),
            Err(_) => println!("Please enter a number."),
        }
    }
}

/// Main interactive menu. Receives an `ApiClient` instance and runs a
/// select loop until the user chooses "Exit".
pub fn main_menu(api: ApiClient) -> Result<()> {
    let mut prompts = ConsolePrompts;
    println!("{}", "Pollinations generation client".bold());

    loop {
        let items = vec!["Generate text", "Generate an image", "Exit"];
        // `Select` shows a keyboard-navigable list in the terminal.
        let selection = Select::new().items(&items).default(0).interact()?;
        match selection {
            0 => {
                println!("Loading text models...");
                match api.text_models() {
                    Ok(models) => {
                        if let Some(model) = select_model(&mut prompts, &models)? {
                            let model = model.clone();
                            text_session(&api, &mut prompts, &model)?;
                        }
                    }
                    Err(e) => println!("{}", format!("Could not load text models: {e}").red()),
                }
            }
            1 => {
                println!("Loading image models...");
                match api.image_models() {
                    Ok(models) => {
                        if let Some(name) = select_model(&mut prompts, &models)? {
                            let name = name.clone();
                            image_session(&api, &mut prompts, &name)?;
                        }
                    }
                    Err(e) => println!("{}", format!("Could not load image models: {e}").red()),
                }
            }
            2 => break,
            _ => {}
        }
    }
    println!("Goodbye!");
    Ok(())
}

/// Prompt loop for one selected text model. Each turn builds a fresh
/// payload; a failed dispatch is reported and the loop continues.
pub fn text_session(
    api: &ApiClient,
    input: &mut dyn PromptSource,
    model: &TextModel,
) -> Result<()> {
    println!(
        "\nChatting with {} (enter '{EXIT_COMMAND}' to go back)",
        model.label()
    );

    loop {
        let prompt = input.read_line("Prompt")?;
        if prompt.trim().eq_ignore_ascii_case(EXIT_COMMAND) {
            return Ok(());
        }

        // Only models that declare image input get the attachment offer.
        let attached_image = if model.supports_image_input()
            && input.confirm("Attach a photo to this prompt?")?
        {
            let picked = input.pick_image();
            match &picked {
                Some(path) => println!("Attached photo: {}", path.display()),
                None => println!("No photo selected, sending text only."),
            }
            picked
        } else {
            None
        };

        let request = PromptRequest {
            text: prompt,
            attached_image,
        };
        let payload = build_chat_payload(model, &request);

        let spinner = progress_spinner("Generating...");
        let outcome = api.generate_text(&payload);
        spinner.finish_and_clear();

        match outcome {
            Ok(content) => {
                println!("{}", "Model reply:".green().bold());
                println!("{content}");
            }
            Err(e) => println!("{}", format!("Generation failed: {e}").red()),
        }
        println!("{}", "-".repeat(30));
    }
}

/// Prompt loop for one selected image model. Generated images land in
/// the current working directory.
pub fn image_session(api: &ApiClient, input: &mut dyn PromptSource, model_name: &str) -> Result<()> {
    println!("\nGenerating images with {model_name} (enter '{EXIT_COMMAND}' to go back)");

    loop {
        let prompt = input.read_line("Image prompt")?;
        if prompt.trim().eq_ignore_ascii_case(EXIT_COMMAND) {
            return Ok(());
        }

        let request = build_image_request(&api.config().image_prompt_base(), model_name, &prompt);

        let spinner = progress_spinner("Generating...");
        let outcome = api.generate_image(&request);
        spinner.finish_and_clear();

        match outcome {
            Ok(path) => {
                let shown = std::fs::canonicalize(&path).unwrap_or(path);
                println!("{}", format!("Image saved to {}", shown.display()).green());
            }
            Err(e) => println!("{}", format!("Image generation failed: {e}").red()),
        }
        println!("{}", "-".repeat(30));
    }
}

fn progress_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}").unwrap());
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct ScriptedPrompts {
        lines: VecDeque<String>,
    }

    impl ScriptedPrompts {
        fn new(lines: &[&str]) -> Self {
            ScriptedPrompts {
                lines: lines.iter().map(|s| s.to_string()).collect(),
            }
        }
    }

    impl PromptSource for ScriptedPrompts {
        fn read_line(&mut self, _prompt: &str) -> Result<String> {
            self.lines
                .pop_front()
                .ok_or_else(|| anyhow::anyhow!("script exhausted"))
        }

        fn confirm(&mut self, _prompt: &str) -> Result<bool> {
            Ok(false)
        }

        fn pick_image(&mut self) -> Option<PathBuf> {
            None
        }
    }

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn select_returns_entry_for_valid_index() {
        let catalog = names(&["alpha", "beta"]);
        let mut input = ScriptedPrompts::new(&["2"]);
        let picked = select_model(&mut input, &catalog).unwrap();
        assert_eq!(picked, Some(&"beta".to_string()));
    }

    #[test]
    fn select_reprompts_until_index_is_valid() {
        let catalog = names(&["alpha", "beta"]);
        // Zero, past the end and non-numeric input are all rejected.
        let mut input = ScriptedPrompts::new(&["0", "3", "abc", " 1 "]);
        let picked = select_model(&mut input, &catalog).unwrap();
        assert_eq!(picked, Some(&"alpha".to_string()));
        assert!(input.lines.is_empty());
    }

    #[test]
    fn select_on_empty_catalog_is_immediate() {
        let catalog: Vec<String> = Vec::new();
        let mut input = ScriptedPrompts::new(&["1"]);
        let picked = select_model(&mut input, &catalog).unwrap();
        assert_eq!(picked, None);
        // Nothing was consumed from the script.
        assert_eq!(input.lines.len(), 1);
    }

    #[test]
    fn select_works_over_text_model_catalog() {
        let catalog: Vec<TextModel> = serde_json::from_str(
            r#"[{"name":"gpt-x","description":"small"},{"name":"gpt-y"}]"#,
        )
        .unwrap();
        let mut input = ScriptedPrompts::new(&["2"]);
        let picked = select_model(&mut input, &catalog).unwrap().unwrap();
        assert_eq!(picked.name, "gpt-y");
    }

    #[test]
    fn labels_include_description_only_when_present() {
        let with: TextModel =
            serde_json::from_str(r#"{"name":"gpt-x","description":"small"}"#).unwrap();
        let without: TextModel = serde_json::from_str(r#"{"name":"gpt-y"}"#).unwrap();
        assert_eq!(with.label(), "gpt-x - small");
        assert_eq!(without.label(), "gpt-y");
    }
}
