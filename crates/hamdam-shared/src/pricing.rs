//! Coin pricing for assistant replies and validation of admin coin input.
//!
//! Reply cost is a policy table, not a formula: the first matching rule
//! wins. Short replies are priced by line count; anything longer than ten
//! lines switches to character length.

use crate::error::SharedError;

/// Condition evaluated against a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostRule {
    /// Fewer than `n` lines.
    LinesBelow(usize),
    /// At most `n` lines.
    LinesAtMost(usize),
    /// At most `n` characters.
    CharsAtMost(usize),
    /// Catch-all.
    Otherwise,
}

impl CostRule {
    fn matches(&self, metrics: &ReplyMetrics) -> bool {
        match *self {
            CostRule::LinesBelow(n) => metrics.lines < n,
            CostRule::LinesAtMost(n) => metrics.lines <= n,
            CostRule::CharsAtMost(n) => metrics.chars <= n,
            CostRule::Otherwise => true,
        }
    }
}

/// Ordered `(rule, coins)` table.
pub const REPLY_COST_TABLE: &[(CostRule, u64)] = &[
    (CostRule::LinesBelow(6), 1),
    (CostRule::LinesAtMost(10), 2),
    (CostRule::CharsAtMost(750), 3),
    (CostRule::CharsAtMost(1500), 5),
    (CostRule::Otherwise, 10),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyMetrics {
    /// Newline-separated segments; an empty reply still counts as one line.
    pub lines: usize,
    pub chars: usize,
}

impl ReplyMetrics {
    pub fn of(text: &str) -> Self {
        Self {
            lines: text.split('\n').count(),
            chars: text.chars().count(),
        }
    }
}

/// Coins charged to a non-premium user for `reply`.
pub fn reply_cost(reply: &str) -> u64 {
    let metrics = ReplyMetrics::of(reply);
    REPLY_COST_TABLE
        .iter()
        .find(|(rule, _)| rule.matches(&metrics))
        .map(|(_, cost)| *cost)
        .unwrap_or(0)
}

/// Parse the admin coin amount field. Balances are whole coins, so
/// fractional, zero, negative or non-numeric input is rejected.
pub fn parse_amount(input: &str) -> Result<u64, SharedError> {
    match input.trim().parse::<u64>() {
        Ok(amount) if amount > 0 => Ok(amount),
        _ => Err(SharedError::InvalidAmount),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(n: usize) -> String {
        vec!["hey"; n].join("\n")
    }

    /// `n` lines totalling exactly `chars` characters.
    fn sized(n: usize, chars: usize) -> String {
        let mut text = vec!["x"; n].join("\n");
        text.push_str(&"y".repeat(chars - text.chars().count()));
        text
    }

    #[test]
    fn short_replies_cost_one() {
        assert_eq!(reply_cost(&lines(5)), 1);
        assert_eq!(reply_cost(""), 1);
    }

    #[test]
    fn medium_replies_cost_two() {
        assert_eq!(reply_cost(&lines(6)), 2);
        assert_eq!(reply_cost(&lines(8)), 2);
        assert_eq!(reply_cost(&lines(10)), 2);
    }

    #[test]
    fn long_replies_are_priced_by_length() {
        assert_eq!(reply_cost(&sized(11, 700)), 3);
        assert_eq!(reply_cost(&sized(11, 750)), 3);
        assert_eq!(reply_cost(&sized(11, 1200)), 5);
        assert_eq!(reply_cost(&sized(11, 1500)), 5);
        assert_eq!(reply_cost(&sized(11, 2000)), 10);
    }

    #[test]
    fn line_count_wins_over_length() {
        // Five very long lines still cost one coin.
        let text = vec!["z".repeat(1000); 5].join("\n");
        assert_eq!(reply_cost(&text), 1);
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let text = format!("{}{}", lines(11), "س".repeat(700));
        assert!(text.len() > 1500);
        assert_eq!(reply_cost(&text), 3);
    }

    #[test]
    fn parse_amount_accepts_positive_whole_numbers_only() {
        assert_eq!(parse_amount("50"), Ok(50));
        assert_eq!(parse_amount(" 7 "), Ok(7));
        assert_eq!(parse_amount("0"), Err(SharedError::InvalidAmount));
        assert_eq!(parse_amount("-3"), Err(SharedError::InvalidAmount));
        assert_eq!(parse_amount("2.5"), Err(SharedError::InvalidAmount));
        assert_eq!(parse_amount("NaN"), Err(SharedError::InvalidAmount));
        assert_eq!(parse_amount("inf"), Err(SharedError::InvalidAmount));
    }
}
