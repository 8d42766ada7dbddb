pub mod cli;
pub mod config;
pub mod error;
pub mod history;
pub mod llm;
pub mod models;
pub mod repl;
pub mod session;

use cli::Args;
use config::settings::SessionConfig;
use llm::chat::new_client;
use log::info;
use session::ChatSession;
use std::error::Error;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = SessionConfig::from_args(&args)?;

    info!("--- Chat Configuration ---");
    info!("Backend: {}", config.llm.backend);
    info!("Model: {}", config.llm.model);
    info!("Base URL: {}", config.llm.base_url.as_deref().unwrap_or("client default"));
    info!("Profile: {} ({:?} prompt)", config.profile.name, config.profile.request_form());
    info!("Max Tokens: {}", config.params.max_tokens);
    info!("Temperature: {}", config.params.temperature);
    info!("Top-P: {}", config.params.top_p);
    info!("Timeout: {:?}", config.timeout);
    info!("Seed Messages: {}", config.seed.len());
    if !config.history.is_empty() {
        info!("Resumed Messages: {}", config.history.len());
    }
    info!("--------------------------");

    let client = new_client(&config.llm)?;
    let mut session = ChatSession::new(client, &config);
    repl::run(&mut session).await?;

    Ok(())
}
