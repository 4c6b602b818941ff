use chat_core::{ContactSummary, Message};
use std::collections::HashMap;

/// Recomputes a per-contact summary for `user` straight from the message log.
///
/// Messages are grouped by the other participant and only the latest one per
/// contact is kept; on equal timestamps the first one seen wins. Rows come back
/// newest first, and contacts whose latest timestamps are equal stay in the
/// order they first appeared. Messages not involving `user` are ignored.
pub fn summarize_contacts(user: &str, messages: &[Message]) -> Vec<ContactSummary> {
    let mut summaries: Vec<ContactSummary> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for message in messages.iter().filter(|m| m.involves(user)) {
        let contact = message.counterpart(user);

        match positions.get(contact) {
            Some(&i) => {
                let summary = &mut summaries[i];
                if message.timestamp > summary.timestamp {
                    summary.last_message = message.content.clone();
                    summary.timestamp = message.timestamp;
                }
            }
            None => {
                positions.insert(contact, summaries.len());
                summaries.push(ContactSummary {
                    user_id: contact.to_string(),
                    last_message: message.content.clone(),
                    timestamp: message.timestamp,
                });
            }
        }
    }

    summaries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn msg(sender: &str, receiver: &str, content: &str, secs: i64) -> Message {
        Message {
            sender: sender.to_string(),
            receiver: receiver.to_string(),
            content: content.to_string(),
            timestamp: at(secs),
            is_read: false,
        }
    }

    #[test]
    fn test_latest_message_per_contact_newest_first() {
        let messages = vec![
            msg("alice", "bob", "hi bob", 1),
            msg("carol", "alice", "hi alice", 2),
            msg("bob", "alice", "hey", 3),
            msg("bob", "carol", "not alice", 4),
        ];

        let summaries = summarize_contacts("alice", &messages);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].user_id, "bob");
        assert_eq!(summaries[0].last_message, "hey");
        assert_eq!(summaries[0].timestamp, at(3));
        assert_eq!(summaries[1].user_id, "carol");
        assert_eq!(summaries[1].last_message, "hi alice");
    }

    #[test]
    fn test_out_of_order_input_keeps_latest() {
        let messages = vec![
            msg("alice", "bob", "newer", 9),
            msg("bob", "alice", "older", 2),
        ];

        let summaries = summarize_contacts("alice", &messages);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].last_message, "newer");
    }

    #[test]
    fn test_equal_timestamps_keep_first_encountered() {
        let messages = vec![
            msg("alice", "bob", "first", 5),
            msg("bob", "alice", "second", 5),
            msg("alice", "carol", "carol", 5),
        ];

        let summaries = summarize_contacts("alice", &messages);
        assert_eq!(summaries[0].user_id, "bob");
        assert_eq!(summaries[0].last_message, "first");
        assert_eq!(summaries[1].user_id, "carol");
    }

    #[test]
    fn test_self_messages_group_under_user() {
        let messages = vec![msg("alice", "alice", "memo", 1)];

        let summaries = summarize_contacts("alice", &messages);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].user_id, "alice");
    }

    #[test]
    fn test_empty_log() {
        assert!(summarize_contacts("alice", &[]).is_empty());
    }
}
