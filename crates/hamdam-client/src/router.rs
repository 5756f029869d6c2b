//! Which screen is showing, and the gates in front of chat and the creator.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    #[default]
    Login,
    Signup,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "page", content = "mode", rename_all = "kebab-case")]
pub enum Page {
    #[default]
    Landing,
    Chat,
    Admin,
    Privacy,
    Auth(AuthMode),
    Profile,
    CharacterCreator,
}

/// Why an anonymous visitor is being asked to log in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginPurpose {
    Chat,
    Create,
}

/// Result of a navigation request that may be intercepted by a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum NavigationOutcome {
    Navigated { page: Page },
    LoginPrompt { purpose: LoginPurpose },
    PremiumUpsell,
}

pub fn route_to_chat(logged_in: bool) -> NavigationOutcome {
    if logged_in {
        NavigationOutcome::Navigated { page: Page::Chat }
    } else {
        NavigationOutcome::LoginPrompt {
            purpose: LoginPurpose::Chat,
        }
    }
}

pub fn route_to_creator(logged_in: bool, premium: bool) -> NavigationOutcome {
    match (logged_in, premium) {
        (false, _) => NavigationOutcome::LoginPrompt {
            purpose: LoginPurpose::Create,
        },
        (true, false) => NavigationOutcome::PremiumUpsell,
        (true, true) => NavigationOutcome::Navigated {
            page: Page::CharacterCreator,
        },
    }
}
