//! Visitor access control: the ban list and the admin login throttle.
//!
//! Each visitor moves `Clear -> (failed)* -> Banned`. A successful admin login
//! resets the counter; the failure that reaches [`MAX_LOGIN_ATTEMPTS`] adds
//! the visitor to the ban list. Only [`unban`] leaves the banned state.

use subtle::ConstantTimeEq;

use hamdam_shared::constants::MAX_LOGIN_ATTEMPTS;
use hamdam_shared::types::VisitorId;
use hamdam_store::{BanList, LoginAttempts};

/// Checks admin credentials.
pub trait Authenticator: Send {
    fn verify(&self, username: &str, password: &str) -> bool;
}

/// Credentials fixed at startup from configuration.
///
/// They live in the client process, so anyone holding the binary or its
/// environment can read them.
pub struct StaticCredentials {
    username: String,
    password: String,
}

impl StaticCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

fn same(given: &str, expected: &str) -> bool {
    let given = given.as_bytes();
    let expected = expected.as_bytes();
    given.len() == expected.len() && given.ct_eq(expected).unwrap_u8() == 1
}

impl Authenticator for StaticCredentials {
    fn verify(&self, username: &str, password: &str) -> bool {
        // Evaluate both so timing does not reveal which half matched.
        let user_ok = same(username, &self.username);
        let pass_ok = same(password, &self.password);
        user_ok & pass_ok
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    Granted,
    Rejected { remaining: u32 },
    Banned,
}

pub fn is_banned(bans: &BanList, visitor: &VisitorId) -> bool {
    bans.contains(visitor)
}

/// Apply one admin login attempt to the counters.
pub fn record_attempt(
    bans: &mut BanList,
    attempts: &mut LoginAttempts,
    visitor: &VisitorId,
    success: bool,
) -> LoginOutcome {
    if is_banned(bans, visitor) {
        return LoginOutcome::Banned;
    }

    if success {
        attempts.remove(visitor);
        return LoginOutcome::Granted;
    }

    let count = attempts.get(visitor).copied().unwrap_or(0).saturating_add(1);
    attempts.insert(visitor.clone(), count);

    if count >= MAX_LOGIN_ATTEMPTS {
        bans.push(visitor.clone());
        tracing::warn!(visitor = %visitor, attempts = count, "visitor banned after failed admin logins");
        LoginOutcome::Banned
    } else {
        LoginOutcome::Rejected {
            remaining: MAX_LOGIN_ATTEMPTS - count,
        }
    }
}

/// Lift a ban and reset the visitor's counter. Returns whether it was banned.
pub fn unban(bans: &mut BanList, attempts: &mut LoginAttempts, visitor: &VisitorId) -> bool {
    let before = bans.len();
    bans.retain(|v| v != visitor);
    attempts.remove(visitor);
    bans.len() != before
}
