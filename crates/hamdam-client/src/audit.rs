//! Human-readable audit log lines for the admin panel.

use std::collections::HashMap;

use hamdam_shared::types::UserId;
use hamdam_store::{AuditEvent, AuditLogEntry, User};

/// User id to email, for naming the target of an entry.
pub fn email_lookup(users: &[User]) -> HashMap<UserId, String> {
    users
        .iter()
        .map(|u| (u.id.clone(), u.email.clone()))
        .collect()
}

/// One sentence describing `entry`. Targets missing from `emails` are shown
/// by id.
pub fn render_entry(entry: &AuditLogEntry, emails: &HashMap<UserId, String>) -> String {
    let target = emails
        .get(&entry.target_user_id)
        .map(String::as_str)
        .unwrap_or(entry.target_user_id.as_str());

    match &entry.event {
        AuditEvent::UserCreated(d) => format!(
            "User {} signed up with {} starting coins.",
            d.email, d.initial_balance
        ),
        AuditEvent::BalanceAdd(d) => format!(
            "Admin added {} coins to {}. (Previous balance: {})",
            d.amount, target, d.old_balance
        ),
        AuditEvent::BalanceSubtract(d) => format!(
            "Admin removed {} coins from {}. (Previous balance: {})",
            d.amount, target, d.old_balance
        ),
        AuditEvent::SubscriptionAdd(d) => format!(
            "Admin added {} days of subscription to {}. (New expiry: {})",
            d.days_added,
            target,
            d.new_expiry.format("%Y-%m-%d")
        ),
        AuditEvent::SubscriptionRemove(_) => {
            format!("Admin removed the subscription of {target}.")
        }
        AuditEvent::Unknown { action, .. } => format!("Unknown event: {action}"),
    }
}

/// The whole log rendered in stored order, which is newest first.
pub fn render_log(log: &[AuditLogEntry], users: &[User]) -> Vec<String> {
    let emails = email_lookup(users);
    log.iter().map(|entry| render_entry(entry, &emails)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use hamdam_store::audit::{BalanceChange, SubscriptionAdded, UserCreated};
    use hamdam_store::AuditActor;

    fn entry(target: &str, event: AuditEvent) -> AuditLogEntry {
        let now = Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap();
        AuditLogEntry::new(AuditActor::Admin, UserId::from(target), event, now)
    }

    fn emails() -> HashMap<UserId, String> {
        HashMap::from([(UserId::from("u1"), "sara@example.com".to_string())])
    }

    #[test]
    fn balance_lines_name_the_target_by_email() {
        let line = render_entry(
            &entry(
                "u1",
                AuditEvent::BalanceAdd(BalanceChange {
                    amount: 50,
                    old_balance: 0,
                    new_balance: 50,
                }),
            ),
            &emails(),
        );
        assert_eq!(
            line,
            "Admin added 50 coins to sara@example.com. (Previous balance: 0)"
        );
    }

    #[test]
    fn missing_user_falls_back_to_id() {
        let line = render_entry(
            &entry(
                "gone",
                AuditEvent::BalanceSubtract(BalanceChange {
                    amount: 5,
                    old_balance: 3,
                    new_balance: 0,
                }),
            ),
            &emails(),
        );
        assert!(line.contains("from gone."));
    }

    #[test]
    fn subscription_line_shows_new_expiry_date() {
        let expiry = Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap();
        let line = render_entry(
            &entry(
                "u1",
                AuditEvent::SubscriptionAdd(SubscriptionAdded {
                    days_added: 30,
                    old_expiry: None,
                    new_expiry: expiry,
                }),
            ),
            &emails(),
        );
        assert!(line.contains("30 days"));
        assert!(line.ends_with("(New expiry: 2025-05-01)"));
    }

    #[test]
    fn sign_up_uses_the_recorded_email() {
        let line = render_entry(
            &entry(
                "u9",
                AuditEvent::UserCreated(UserCreated {
                    email: "new@example.com".into(),
                    initial_balance: 10,
                }),
            ),
            &HashMap::new(),
        );
        assert_eq!(line, "User new@example.com signed up with 10 starting coins.");
    }

    #[test]
    fn unknown_action_renders_fallback() {
        let line = render_entry(
            &entry(
                "u1",
                AuditEvent::Unknown {
                    action: "PASSWORD_RESET".into(),
                    details: serde_json::Value::Null,
                },
            ),
            &emails(),
        );
        assert_eq!(line, "Unknown event: PASSWORD_RESET");
    }
}
