//! Client configuration loaded from environment variables.
//!
//! Every setting has a development default so the client starts with zero
//! configuration. Provider keys default to `None`, in which case the matching
//! collaborator reports a missing-key error instead of calling out.

use std::path::PathBuf;
use std::time::Duration;

use hamdam_shared::constants::{DEFAULT_CHAT_MODEL, DEFAULT_STARTING_BALANCE, IMAGE_TIMEOUT_SECS};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Directory holding the slice database.
    /// Env: `HAMDAM_DATA_DIR`
    /// Default: the platform data directory.
    pub data_dir: Option<PathBuf>,

    /// Coins granted to every new account.
    /// Env: `STARTING_BALANCE`
    pub starting_balance: u64,

    /// Admin panel credentials. Admin login is disabled unless both are set.
    /// Env: `ADMIN_USERNAME`, `ADMIN_PASSWORD`
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,

    /// Env: `OPENROUTER_API_KEY`
    pub openrouter_api_key: Option<String>,

    /// Env: `OPENROUTER_MODEL`
    /// Default: `openai/gpt-4o-mini`
    pub openrouter_model: String,

    /// Env: `FAL_API_KEY`
    pub fal_api_key: Option<String>,

    /// Env: `GEMINI_API_KEY`
    pub gemini_api_key: Option<String>,

    /// Authenticated reverse proxy in front of the Perchance generator.
    /// Env: `PERCHANCE_PROXY_URL`, `PERCHANCE_PROXY_USER`, `PERCHANCE_PROXY_PASSWORD`
    pub perchance_proxy_url: Option<String>,
    pub perchance_proxy_user: Option<String>,
    pub perchance_proxy_password: Option<String>,

    /// Abort timeout for the proxied image path.
    /// Env: `IMAGE_TIMEOUT_SECS`
    /// Default: 30 s
    pub image_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            starting_balance: DEFAULT_STARTING_BALANCE,
            admin_username: None,
            admin_password: None,
            openrouter_api_key: None,
            openrouter_model: DEFAULT_CHAT_MODEL.to_string(),
            fal_api_key: None,
            gemini_api_key: None,
            perchance_proxy_url: None,
            perchance_proxy_user: None,
            perchance_proxy_password: None,
            image_timeout: Duration::from_secs(IMAGE_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reads variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(dir) = non_empty("HAMDAM_DATA_DIR") {
            config.data_dir = Some(PathBuf::from(dir));
        }

        if let Some(val) = non_empty("STARTING_BALANCE") {
            match val.trim().parse::<u64>() {
                Ok(n) => config.starting_balance = n,
                Err(_) => tracing::warn!(value = %val, "Invalid STARTING_BALANCE, using default"),
            }
        }

        config.admin_username = non_empty("ADMIN_USERNAME");
        config.admin_password = non_empty("ADMIN_PASSWORD");
        config.openrouter_api_key = non_empty("OPENROUTER_API_KEY");
        config.fal_api_key = non_empty("FAL_API_KEY");
        config.gemini_api_key = non_empty("GEMINI_API_KEY");
        config.perchance_proxy_url = non_empty("PERCHANCE_PROXY_URL");
        config.perchance_proxy_user = non_empty("PERCHANCE_PROXY_USER");
        config.perchance_proxy_password = non_empty("PERCHANCE_PROXY_PASSWORD");

        if let Some(model) = non_empty("OPENROUTER_MODEL") {
            config.openrouter_model = model;
        }

        if let Some(val) = non_empty("IMAGE_TIMEOUT_SECS") {
            match val.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.image_timeout = Duration::from_secs(secs),
                _ => tracing::warn!(value = %val, "Invalid IMAGE_TIMEOUT_SECS, using default"),
            }
        }

        if config.admin_username.is_none() || config.admin_password.is_none() {
            tracing::info!("Admin credentials not configured, admin login disabled");
        }

        config
    }

    /// Both halves of the admin credentials, if configured.
    pub fn admin_credentials(&self) -> Option<(&str, &str)> {
        Some((self.admin_username.as_deref()?, self.admin_password.as_deref()?))
    }
}
