use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a string-backed identifier newtype with a fixed prefix.
///
/// Identifiers are persisted as plain JSON strings so slices written by older
/// sessions (which used ad hoc `prefix_<millis>` ids) stay readable.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub const PREFIX: &'static str = $prefix;

            pub fn new() -> Self {
                Self(format!("{}_{}", $prefix, Uuid::new_v4().simple()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Account identifier.
    UserId,
    "user"
);
string_id!(CharacterId, "char");
string_id!(ConversationId, "conv");
string_id!(MessageId, "msg");
string_id!(
    /// Audit log entry identifier.
    LogId,
    "log"
);
string_id!(
    /// Opaque per-installation identifier used by the ban list and the
    /// admin login throttle.
    VisitorId,
    "visitor"
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tone the companion keeps in a conversation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Personality {
    #[default]
    #[serde(rename = "Friendly")]
    Friendly,
    #[serde(rename = "Playful")]
    Playful,
    #[serde(rename = "Calm Supportive")]
    CalmSupportive,
}

/// Content-filter relaxation requested from the chat provider.
///
/// Older conversations stored the Persian display label instead of the
/// snake_case name; both are read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyLevel {
    #[default]
    #[serde(alias = "پیش\u{200c}فرض (توصیه می\u{200c}شود)")]
    Default,
    #[serde(alias = "آسان\u{200c}گیر")]
    Relaxed,
    #[serde(alias = "بدون فیلتر (با احتیاط استفاده شود)")]
    NoFilters,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}
