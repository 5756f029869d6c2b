use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SharedError;

/// Premium subscription attached to a user.
///
/// `expires_at == None` is how a revoked subscription is persisted; a user
/// without any subscription record is equally non-premium.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Subscription {
    pub fn until(expires_at: DateTime<Utc>) -> Self {
        Self {
            expires_at: Some(expires_at),
        }
    }

    pub fn revoked() -> Self {
        Self { expires_at: None }
    }

    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expiry| expiry > now)
    }
}

/// Absent, revoked and lapsed subscriptions are all "not premium".
pub fn is_premium(subscription: Option<&Subscription>, now: DateTime<Utc>) -> bool {
    subscription.is_some_and(|s| s.is_active_at(now))
}

/// New expiry after adding `days`.
///
/// Days stack on top of whatever is left of an active subscription; a lapsed
/// or missing one starts counting from `now`. A day count that would push
/// the expiry past the representable range is rejected.
pub fn extend_expiry(
    current: Option<DateTime<Utc>>,
    days: u32,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, SharedError> {
    let start = match current {
        Some(expiry) if expiry > now => expiry,
        _ => now,
    };
    Duration::try_days(i64::from(days))
        .and_then(|span| start.checked_add_signed(span))
        .ok_or(SharedError::InvalidDays)
}

/// Whole days left on a subscription, partial days rounded up.
///
/// `None` when there is no expiry at all, `0` once it has passed.
pub fn days_remaining(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<i64> {
    let expiry = expires_at?;
    if expiry < now {
        return Some(0);
    }
    let millis = (expiry - now).num_milliseconds();
    let day = Duration::days(1).num_milliseconds();
    Some((millis + day - 1) / day)
}

/// Parse the admin "days to add" field.
pub fn parse_days(input: &str) -> Result<u32, SharedError> {
    match input.trim().parse::<i64>() {
        Ok(days) if days > 0 => u32::try_from(days).map_err(|_| SharedError::InvalidDays),
        _ => Err(SharedError::InvalidDays),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn missing_or_revoked_subscription_is_not_premium() {
        assert!(!is_premium(None, now()));
        assert!(!is_premium(Some(&Subscription::revoked()), now()));
    }

    #[test]
    fn lapsed_subscription_is_not_premium() {
        let sub = Subscription::until(now() - Duration::seconds(1));
        assert!(!is_premium(Some(&sub), now()));
    }

    #[test]
    fn active_subscription_is_premium() {
        let sub = Subscription::until(now() + Duration::days(2));
        assert!(is_premium(Some(&sub), now()));
    }

    #[test]
    fn extend_from_nothing_starts_now() {
        assert_eq!(extend_expiry(None, 30, now()), Ok(now() + Duration::days(30)));
    }

    #[test]
    fn extend_from_past_expiry_starts_now() {
        let past = now() - Duration::days(10);
        assert_eq!(extend_expiry(Some(past), 7, now()), Ok(now() + Duration::days(7)));
    }

    #[test]
    fn extend_stacks_on_remaining_time() {
        let future = now() + Duration::days(5);
        assert_eq!(
            extend_expiry(Some(future), 7, now()),
            Ok(now() + Duration::days(12))
        );
    }

    #[test]
    fn extend_past_calendar_range_is_rejected() {
        assert_eq!(
            extend_expiry(None, 100_000_000, now()),
            Err(SharedError::InvalidDays)
        );
        assert_eq!(
            extend_expiry(Some(now() + Duration::days(1)), u32::MAX, now()),
            Err(SharedError::InvalidDays)
        );
    }

    #[test]
    fn days_remaining_rounds_partial_days_up() {
        let expiry = now() + Duration::hours(25);
        assert_eq!(days_remaining(Some(expiry), now()), Some(2));
        assert_eq!(days_remaining(Some(now() - Duration::days(1)), now()), Some(0));
        assert_eq!(days_remaining(None, now()), None);
    }

    #[test]
    fn parse_days_rejects_non_positive_input() {
        assert_eq!(parse_days(" 30 "), Ok(30));
        assert_eq!(parse_days("0"), Err(SharedError::InvalidDays));
        assert_eq!(parse_days("-4"), Err(SharedError::InvalidDays));
        assert_eq!(parse_days("soon"), Err(SharedError::InvalidDays));
        assert_eq!(parse_days(""), Err(SharedError::InvalidDays));
    }

    #[test]
    fn subscription_reads_null_expiry() {
        let sub: Subscription = serde_json::from_str(r#"{"expiresAt":null}"#).unwrap();
        assert_eq!(sub, Subscription::revoked());
        let sub: Subscription = serde_json::from_str("{}").unwrap();
        assert_eq!(sub.expires_at, None);
    }
}
