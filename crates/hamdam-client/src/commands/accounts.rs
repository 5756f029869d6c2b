use chrono::Utc;
use serde::Serialize;
use tracing::info;

use hamdam_shared::premium;
use hamdam_store::User;

use crate::error::{ClientError, Result};
use crate::ledger;
use crate::router::Page;
use crate::state::{enter, SharedState};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccountDto {
    pub id: String,
    pub email: String,
    pub balance: u64,
    pub is_premium: bool,
    pub expires_at: Option<String>,
    /// Whole days of premium left, rounded up. `None` without a subscription.
    pub days_remaining: Option<i64>,
    pub created_at: String,
}

impl From<&User> for AccountDto {
    fn from(u: &User) -> Self {
        let now = Utc::now();
        Self {
            id: u.id.to_string(),
            email: u.email.clone(),
            balance: u.balance,
            is_premium: u.is_premium_at(now),
            expires_at: u.expires_at().map(|e| e.to_rfc3339()),
            days_remaining: premium::days_remaining(u.expires_at(), now),
            created_at: u.created_at.to_rfc3339(),
        }
    }
}

/// Register a new account and log it in.
pub fn sign_up(state: &SharedState, email: &str, password: &str) -> Result<AccountDto> {
    let mut guard = enter(state)?;
    let now = Utc::now();

    let mut users = guard.users();
    let starting_balance = guard.config.starting_balance;
    let (user, entry) = ledger::new_account(&users, email, password, starting_balance, now)?;

    users.push(user.clone());
    guard.commit_users(&users);
    guard.append_audit(entry);
    guard.set_current_user(Some(&user));
    guard.page = Page::Landing;

    info!(user_id = %user.id, starting_balance, "account created");
    Ok(AccountDto::from(&user))
}

pub fn log_in(state: &SharedState, email: &str, password: &str) -> Result<AccountDto> {
    let mut guard = enter(state)?;
    let email = email.trim();

    let user = guard
        .users()
        .into_iter()
        .find(|u| u.email.eq_ignore_ascii_case(email) && u.password == password)
        .ok_or(ClientError::LoginFailed)?;

    guard.set_current_user(Some(&user));
    guard.page = Page::Landing;

    info!(user_id = %user.id, "logged in");
    Ok(AccountDto::from(&user))
}

/// Clear the current user and any admin session.
pub fn log_out(state: &SharedState) -> Result<()> {
    let mut guard = enter(state)?;
    guard.set_current_user(None);
    guard.is_admin = false;
    guard.active_conversation = None;
    guard.page = Page::Landing;
    Ok(())
}

pub fn current_account(state: &SharedState) -> Result<Option<AccountDto>> {
    let mut guard = enter(state)?;
    match guard.session_user() {
        Ok(user) => Ok(Some(AccountDto::from(&user))),
        Err(ClientError::NotLoggedIn) => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::state::AppState;
    use hamdam_store::{AuditEvent, SliceStore};

    fn shared(starting_balance: u64) -> SharedState {
        let config = ClientConfig {
            starting_balance,
            ..ClientConfig::default()
        };
        AppState::new(SliceStore::in_memory(), config).into_shared()
    }

    #[test]
    fn sign_up_grants_balance_and_logs_creation() {
        let state = shared(20);
        let account = sign_up(&state, "sara@example.com", "pw").unwrap();
        assert_eq!(account.balance, 20);
        assert!(!account.is_premium);
        assert_eq!(account.days_remaining, None);

        let mut guard = state.lock().unwrap();
        let log = guard.audit_log();
        assert_eq!(log.len(), 1);
        assert!(matches!(log[0].event, AuditEvent::UserCreated(_)));
        assert_eq!(guard.current_user().map(|u| u.email), Some("sara@example.com".into()));
    }

    #[test]
    fn log_in_and_out() {
        let state = shared(0);
        sign_up(&state, "sara@example.com", "pw").unwrap();
        log_out(&state).unwrap();
        assert_eq!(current_account(&state).unwrap(), None);

        assert!(matches!(
            log_in(&state, "sara@example.com", "wrong"),
            Err(ClientError::LoginFailed)
        ));
        let account = log_in(&state, "Sara@Example.com", "pw").unwrap();
        assert_eq!(current_account(&state).unwrap(), Some(account));
    }

    #[test]
    fn duplicate_sign_up_is_rejected() {
        let state = shared(0);
        sign_up(&state, "sara@example.com", "pw").unwrap();
        assert!(matches!(
            sign_up(&state, "SARA@example.com", "other"),
            Err(ClientError::EmailTaken)
        ));
        assert_eq!(state.lock().unwrap().users().len(), 1);
    }
}
