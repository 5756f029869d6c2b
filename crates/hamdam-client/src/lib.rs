//! # hamdam-client
//!
//! Session logic for the Hamdam companion-chat app: account and admin
//! commands, the coin ledger, the visitor access gate, character catalogue,
//! chat and image flows, and the HTTP clients for the chat and image
//! providers. The UI layer calls the functions in [`commands`] with a
//! [`SharedState`].

pub mod audit;
pub mod catalog;
pub mod collaborators;
pub mod commands;
pub mod config;
pub mod error;
pub mod gate;
pub mod ledger;
pub mod router;
pub mod services;
pub mod state;

use tracing_subscriber::{fmt, EnvFilter};

pub use config::ClientConfig;
pub use error::ClientError;
pub use state::{AppState, SharedState};

/// Install the global `tracing` subscriber. `RUST_LOG` overrides the default
/// filter. Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("hamdam_client_lib=debug,hamdam_store=info,warn"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}

/// Load configuration from the environment and open the session.
pub fn start() -> SharedState {
    init_tracing();
    let config = ClientConfig::from_env();
    tracing::info!(app = hamdam_shared::constants::APP_NAME, "starting session");
    AppState::open(config).into_shared()
}

/// Chat provider selected by configuration.
pub fn chat_provider(config: &ClientConfig) -> services::OpenRouterClient {
    services::OpenRouterClient::new(config.openrouter_api_key.clone(), config.openrouter_model.clone())
}

/// Image provider for in-chat requests: fal.ai when a key is configured,
/// Gemini otherwise.
pub fn image_provider(config: &ClientConfig) -> Box<dyn collaborators::ImageCollaborator> {
    if config.fal_api_key.is_some() || config.gemini_api_key.is_none() {
        Box::new(services::FalImageClient::new(config.fal_api_key.clone()))
    } else {
        Box::new(services::GeminiImageClient::new(config.gemini_api_key.clone()))
    }
}

/// Image provider for character portraits.
pub fn portrait_provider(config: &ClientConfig) -> services::PerchanceClient {
    services::PerchanceClient::new(
        config.perchance_proxy_url.clone(),
        config.perchance_proxy_user.clone(),
        config.perchance_proxy_password.clone(),
        config.image_timeout,
    )
}
