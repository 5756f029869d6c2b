//! CSV transcript export.
//!
//! One row per message. Only the content column is quoted (always, with
//! inner quotes doubled); the other columns are ids, timestamps and roles
//! that never contain separators.

use chrono::SecondsFormat;

use crate::models::Conversation;

pub const CSV_HEADER: &str = "conversationId,userId,messageId,timestamp,role,content";

/// Placeholder written when a conversation has no owner.
pub const GUEST_USER: &str = "guest";

pub fn conversations_to_csv(conversations: &[Conversation]) -> String {
    let rows = conversations.iter().flat_map(|conv| {
        let user = conv
            .user_id
            .as_ref()
            .map(|u| u.as_str())
            .unwrap_or(GUEST_USER);

        conv.messages.iter().map(move |msg| {
            [
                conv.id.as_str().to_string(),
                user.to_string(),
                msg.id.as_str().to_string(),
                msg.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
                msg.role.as_str().to_string(),
                quote(msg.content.as_deref().unwrap_or("")),
            ]
            .join(",")
        })
    });

    std::iter::once(CSV_HEADER.to_string())
        .chain(rows)
        .collect::<Vec<_>>()
        .join("\n")
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}
