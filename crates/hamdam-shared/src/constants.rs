/// Application name
pub const APP_NAME: &str = "Hamdam";

/// Failed admin logins tolerated per visitor before it is banned
pub const MAX_LOGIN_ATTEMPTS: u32 = 5;

/// Coins granted on sign-up unless overridden by configuration
pub const DEFAULT_STARTING_BALANCE: u64 = 0;

/// Timeout applied to the proxied image generation path, in seconds
pub const IMAGE_TIMEOUT_SECS: u64 = 30;

/// Default chat completion model
pub const DEFAULT_CHAT_MODEL: &str = "openai/gpt-4o-mini";

/// Fallback system instruction when a conversation has none
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are a friendly companion chatbot.";

/// Shown in place of generated images for non-premium users
pub const BLURRED_PLACEHOLDER_URL: &str = "https://assets.hamdam.app/placeholder/blurred.jpg";

/// Negative prompt sent along with character portrait requests
pub const PORTRAIT_NEGATIVE_PROMPT: &str =
    "ugly, deformed, noisy, blurry, distorted, grainy, sketch, cartoon, anime, text, watermark, signature";

/// Style preset sent along with character portrait requests
pub const PORTRAIT_STYLE_PRESET: &str = "photographic";

/// Persisted slice keys. Names are kept stable across releases.
pub mod slices {
    pub const USERS: &str = "ai-users";
    pub const CURRENT_USER: &str = "ai-currentUser";
    pub const CHARACTERS: &str = "ai-characters";
    pub const CONVERSATIONS: &str = "ai-conversations";
    pub const BANNED_IDS: &str = "ai-banned-ids";
    pub const VISITOR_ID: &str = "ai-visitor-id";
    pub const AUDIT_LOG: &str = "ai-audit-log";
    pub const LOGIN_ATTEMPTS: &str = "ai-login-attempts";
    pub const THEME: &str = "theme";
    pub const CHAT_MUTED: &str = "ai-chat-muted";

    /// Every slice, in backup order.
    pub const ALL: &[&str] = &[
        USERS,
        CURRENT_USER,
        CHARACTERS,
        CONVERSATIONS,
        BANNED_IDS,
        VISITOR_ID,
        AUDIT_LOG,
        LOGIN_ATTEMPTS,
        THEME,
        CHAT_MUTED,
    ];
}
