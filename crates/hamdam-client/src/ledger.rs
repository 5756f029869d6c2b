//! Account mutations and the audit entries that record them.
//!
//! Every function here is pure: it takes the current users and returns the
//! updated list together with exactly one [`AuditLogEntry`]. Callers persist
//! both while holding the session lock, so a mutation and its entry are never
//! observed apart.

use chrono::{DateTime, Utc};

use hamdam_shared::premium::{self, Subscription};
use hamdam_shared::types::UserId;
use hamdam_shared::SharedError;
use hamdam_store::audit::{BalanceChange, SubscriptionAdded, SubscriptionRemoved, UserCreated};
use hamdam_store::{AuditActor, AuditEvent, AuditLogEntry, User};

use crate::error::{ClientError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceOp {
    Add,
    Subtract,
}

/// Balance after a clamp-at-zero deduction.
pub fn deduct(balance: u64, cost: u64) -> u64 {
    balance.saturating_sub(cost)
}

fn apply(
    users: &[User],
    target: &UserId,
    change: impl FnOnce(&mut User) -> Result<AuditEvent>,
    now: DateTime<Utc>,
) -> Result<(Vec<User>, AuditLogEntry)> {
    let mut users = users.to_vec();
    let user = users
        .iter_mut()
        .find(|u| &u.id == target)
        .ok_or(ClientError::UserNotFound)?;

    let event = change(user)?;
    let entry = AuditLogEntry::new(AuditActor::Admin, target.clone(), event, now);
    Ok((users, entry))
}

/// Add or subtract coins. Subtraction clamps at zero.
pub fn adjust_balance(
    users: &[User],
    target: &UserId,
    op: BalanceOp,
    amount: u64,
    now: DateTime<Utc>,
) -> Result<(Vec<User>, AuditLogEntry)> {
    if amount == 0 {
        return Err(SharedError::InvalidAmount.into());
    }

    apply(
        users,
        target,
        |user| {
            let old_balance = user.balance;
            user.balance = match op {
                BalanceOp::Add => old_balance.saturating_add(amount),
                BalanceOp::Subtract => deduct(old_balance, amount),
            };
            let change = BalanceChange {
                amount,
                old_balance,
                new_balance: user.balance,
            };
            Ok(match op {
                BalanceOp::Add => AuditEvent::BalanceAdd(change),
                BalanceOp::Subtract => AuditEvent::BalanceSubtract(change),
            })
        },
        now,
    )
}

/// Extend premium by `days`, stacking on an active subscription.
pub fn extend_subscription(
    users: &[User],
    target: &UserId,
    days: u32,
    now: DateTime<Utc>,
) -> Result<(Vec<User>, AuditLogEntry)> {
    if days == 0 {
        return Err(SharedError::InvalidDays.into());
    }

    apply(
        users,
        target,
        |user| {
            let old_expiry = user.expires_at();
            let new_expiry = premium::extend_expiry(old_expiry, days, now)?;
            user.subscription = Some(Subscription::until(new_expiry));
            Ok(AuditEvent::SubscriptionAdd(SubscriptionAdded {
                days_added: days,
                old_expiry,
                new_expiry,
            }))
        },
        now,
    )
}

/// Clear the expiry unconditionally. Revoking twice leaves the same user.
pub fn revoke_subscription(
    users: &[User],
    target: &UserId,
    now: DateTime<Utc>,
) -> Result<(Vec<User>, AuditLogEntry)> {
    apply(
        users,
        target,
        |user| {
            let last_expiry = user.expires_at();
            user.subscription = Some(Subscription::revoked());
            Ok(AuditEvent::SubscriptionRemove(SubscriptionRemoved { last_expiry }))
        },
        now,
    )
}

/// Build a fresh account with its starting grant.
///
/// Email uniqueness is case-insensitive. The entry is attributed to the
/// system rather than an admin.
pub fn new_account(
    users: &[User],
    email: &str,
    password: &str,
    starting_balance: u64,
    now: DateTime<Utc>,
) -> Result<(User, AuditLogEntry)> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(ClientError::Validation(
            "Email and password are required".into(),
        ));
    }
    if users.iter().any(|u| u.email.eq_ignore_ascii_case(email)) {
        return Err(ClientError::EmailTaken);
    }

    let user = User {
        id: UserId::new(),
        email: email.to_string(),
        password: password.to_string(),
        balance: starting_balance,
        created_at: now,
        subscription: None,
    };
    let entry = AuditLogEntry::new(
        AuditActor::System,
        user.id.clone(),
        AuditEvent::UserCreated(UserCreated {
            email: user.email.clone(),
            initial_balance: starting_balance,
        }),
        now,
    );
    Ok((user, entry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn user(id: &str, balance: u64) -> User {
        User {
            id: UserId::from(id),
            email: format!("{id}@example.com"),
            password: "pw".into(),
            balance,
            created_at: now(),
            subscription: None,
        }
    }

    fn find<'a>(users: &'a [User], id: &str) -> &'a User {
        users.iter().find(|u| u.id.as_str() == id).unwrap()
    }

    #[test]
    fn add_then_subtract_clamps_at_zero() {
        let target = UserId::from("u1");
        for start in [0u64, 1, 7, 50, 1_000] {
            for amount in [1u64, 3, 50, 2_000] {
                let users = vec![user("u1", start)];

                let (added, entry) =
                    adjust_balance(&users, &target, BalanceOp::Add, amount, now()).unwrap();
                assert_eq!(find(&added, "u1").balance, start + amount);
                assert_eq!(
                    entry.event,
                    AuditEvent::BalanceAdd(BalanceChange {
                        amount,
                        old_balance: start,
                        new_balance: start + amount
                    })
                );

                let (subbed, entry) =
                    adjust_balance(&users, &target, BalanceOp::Subtract, amount, now()).unwrap();
                let expected = start.saturating_sub(amount);
                assert_eq!(find(&subbed, "u1").balance, expected);
                assert_eq!(entry.target_user_id, target);
                assert_eq!(entry.actor, AuditActor::Admin);
                assert_eq!(
                    entry.event,
                    AuditEvent::BalanceSubtract(BalanceChange {
                        amount,
                        old_balance: start,
                        new_balance: expected
                    })
                );
            }
        }
    }

    #[test]
    fn zero_amount_is_rejected() {
        let users = vec![user("u1", 5)];
        let err = adjust_balance(&users, &UserId::from("u1"), BalanceOp::Add, 0, now());
        assert!(matches!(err, Err(ClientError::Input(SharedError::InvalidAmount))));
    }

    #[test]
    fn unknown_target_is_rejected() {
        let users = vec![user("u1", 5)];
        let err = adjust_balance(&users, &UserId::from("nobody"), BalanceOp::Add, 1, now());
        assert!(matches!(err, Err(ClientError::UserNotFound)));
    }

    #[test]
    fn other_users_are_untouched() {
        let users = vec![user("u1", 5), user("u2", 9)];
        let (next, _) =
            adjust_balance(&users, &UserId::from("u1"), BalanceOp::Add, 1, now()).unwrap();
        assert_eq!(find(&next, "u2"), &users[1]);
    }

    #[test]
    fn extend_from_nothing_starts_now() {
        let users = vec![user("u1", 0)];
        let (next, entry) = extend_subscription(&users, &UserId::from("u1"), 30, now()).unwrap();
        let expiry = find(&next, "u1").expires_at().unwrap();
        assert_eq!(expiry, now() + Duration::days(30));
        assert!(matches!(
            entry.event,
            AuditEvent::SubscriptionAdd(SubscriptionAdded { days_added: 30, old_expiry: None, .. })
        ));
    }

    #[test]
    fn extend_from_past_expiry_starts_now() {
        let mut u = user("u1", 0);
        u.subscription = Some(Subscription::until(now() - Duration::days(3)));
        let (next, _) = extend_subscription(&[u], &UserId::from("u1"), 7, now()).unwrap();
        assert_eq!(find(&next, "u1").expires_at(), Some(now() + Duration::days(7)));
    }

    #[test]
    fn extend_from_future_expiry_stacks() {
        let mut u = user("u1", 0);
        let future = now() + Duration::days(10);
        u.subscription = Some(Subscription::until(future));
        let (next, _) = extend_subscription(&[u], &UserId::from("u1"), 7, now()).unwrap();
        assert_eq!(find(&next, "u1").expires_at(), Some(future + Duration::days(7)));
    }

    #[test]
    fn zero_days_is_rejected() {
        let users = vec![user("u1", 0)];
        let err = extend_subscription(&users, &UserId::from("u1"), 0, now());
        assert!(matches!(err, Err(ClientError::Input(SharedError::InvalidDays))));
    }

    #[test]
    fn out_of_range_days_leave_users_untouched() {
        let users = vec![user("u1", 0)];
        let err = extend_subscription(&users, &UserId::from("u1"), 100_000_000, now());
        assert!(matches!(err, Err(ClientError::Input(SharedError::InvalidDays))));
        assert_eq!(find(&users, "u1").expires_at(), None);
    }

    #[test]
    fn revoke_is_idempotent() {
        let mut u = user("u1", 0);
        let expiry = now() + Duration::days(5);
        u.subscription = Some(Subscription::until(expiry));
        let target = UserId::from("u1");

        let (once, first) = revoke_subscription(&[u], &target, now()).unwrap();
        let (twice, second) = revoke_subscription(&once, &target, now()).unwrap();

        assert_eq!(once, twice);
        assert!(!find(&twice, "u1").is_premium_at(now()));
        assert_eq!(
            first.event,
            AuditEvent::SubscriptionRemove(SubscriptionRemoved { last_expiry: Some(expiry) })
        );
        assert_eq!(
            second.event,
            AuditEvent::SubscriptionRemove(SubscriptionRemoved { last_expiry: None })
        );
    }

    #[test]
    fn new_account_logs_user_created() {
        let (created, entry) = new_account(&[], " a@b.c ", "pw", 10, now()).unwrap();
        assert_eq!(created.email, "a@b.c");
        assert_eq!(created.balance, 10);
        assert_eq!(entry.actor, AuditActor::System);
        assert_eq!(entry.target_user_id, created.id);
        assert_eq!(
            entry.event,
            AuditEvent::UserCreated(UserCreated {
                email: "a@b.c".into(),
                initial_balance: 10
            })
        );
    }

    #[test]
    fn duplicate_email_is_case_insensitive() {
        let existing = vec![user("u1", 0)];
        let err = new_account(&existing, "U1@Example.com", "pw", 0, now());
        assert!(matches!(err, Err(ClientError::EmailTaken)));
    }

    #[test]
    fn blank_fields_are_rejected() {
        assert!(matches!(
            new_account(&[], "", "pw", 0, now()),
            Err(ClientError::Validation(_))
        ));
        assert!(matches!(
            new_account(&[], "a@b.c", "", 0, now()),
            Err(ClientError::Validation(_))
        ));
    }

    #[test]
    fn deduct_never_goes_negative() {
        assert_eq!(deduct(5, 3), 2);
        assert_eq!(deduct(2, 10), 0);
        assert_eq!(deduct(0, 1), 0);
    }
}
