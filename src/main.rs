// Entrypoint for the CLI application.
// - Keeps `main` small: create an API client and hand it to the UI loop.
// - Returns `anyhow::Result` so any setup failure prints with context.

use pollinations_cli::{api::ApiClient, ui::main_menu};

fn main() -> anyhow::Result<()> {
    // Diagnostics go through `log`; enable with RUST_LOG=debug etc.
    env_logger::init();

    // Endpoint bases come from POLLINATIONS_TEXT_URL / POLLINATIONS_IMAGE_URL
    // or default to the public services. See `api::ApiConfig::from_env`.
    let api = ApiClient::from_env()?;

    // Start the interactive menu. This call blocks until the user exits.
    main_menu(api)?;
    Ok(())
}
