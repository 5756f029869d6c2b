use thiserror::Error;

use hamdam_shared::SharedError;

use crate::collaborators::CollaboratorError;

/// Errors surfaced to the UI by command functions.
///
/// The `Display` text is what the user sees; none of these are fatal.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The visitor is on the ban list. Checked before anything else.
    #[error("Access to this application has been blocked")]
    Banned,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Input(#[from] SharedError),

    #[error("Please log in first")]
    NotLoggedIn,

    #[error("Admin access required")]
    AdminRequired,

    /// No admin credentials are configured.
    #[error("Admin login is disabled")]
    AdminDisabled,

    #[error("Invalid username or password. {remaining} attempts left")]
    InvalidCredentials { remaining: u32 },

    /// The failed attempt that crossed the threshold.
    #[error("Too many failed attempts. Access has been blocked")]
    BanTriggered,

    #[error("Email or password is incorrect")]
    LoginFailed,

    #[error("An account with this email already exists")]
    EmailTaken,

    #[error("User not found")]
    UserNotFound,

    #[error("Character not found")]
    CharacterNotFound,

    #[error("Conversation not found")]
    ConversationNotFound,

    #[error("No conversation is open")]
    NoActiveConversation,

    #[error("This feature requires a premium subscription")]
    PremiumRequired,

    /// Another chat or image request is still in flight.
    #[error("Please wait for the current reply")]
    Busy,

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    #[error("State lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, ClientError>;
