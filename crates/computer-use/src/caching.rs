//! Cache breakpoint placement across conversation turns
//!
//! The backend caches the request prefix up to each block carrying a `cache_control`
//! marker. One breakpoint is spent on the system prompt (which also covers the tool
//! declarations ahead of it); the rest go on the most recent user turns, since those
//! are the prefixes most likely to be resent unchanged on the next call.
use crate::models::content::CacheControl;
use crate::models::message::Message;
use crate::models::role::Role;

/// Breakpoints available for conversation turns
pub const TURN_BREAKPOINTS: usize = 3;

/// Mark the last block of the three most recent non-empty user turns as cacheable and
/// clear every other marker in the conversation.
pub fn inject_prompt_caching(messages: &mut [Message]) {
    for block in messages.iter_mut().flat_map(|message| message.content.iter_mut()) {
        block.set_cache_control(None);
    }

    let turns = messages
        .iter_mut()
        .rev()
        .filter(|message| message.role == Role::User)
        .filter_map(|message| message.content.last_mut())
        .take(TURN_BREAKPOINTS);

    for last_block in turns {
        last_block.set_cache_control(Some(CacheControl::Ephemeral));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::message::{MessageContent, ToolResultBlock};
    use serde_json::json;

    fn marked(messages: &[Message]) -> Vec<(usize, usize)> {
        messages
            .iter()
            .enumerate()
            .flat_map(|(m, message)| {
                message
                    .content
                    .iter()
                    .enumerate()
                    .filter(|(_, block)| block.cache_control().is_some())
                    .map(move |(b, _)| (m, b))
            })
            .collect()
    }

    fn tool_round(id: &str) -> [Message; 2] {
        [
            Message::assistant().with_tool_use(id, "bash", json!({"command": "ls"})),
            Message::user().with_tool_result(ToolResultBlock {
                tool_use_id: id.into(),
                content: vec![],
                is_error: false,
                cache_control: None,
            }),
        ]
    }

    fn conversation(rounds: usize) -> Vec<Message> {
        let mut messages = vec![Message::user().with_text("hello").with_text("open a browser")];
        for i in 0..rounds {
            messages.extend(tool_round(&format!("t{}", i)));
        }
        messages
    }

    #[test]
    fn test_marks_last_block_of_three_most_recent_user_turns() {
        let mut messages = conversation(4);
        inject_prompt_caching(&mut messages);
        // user turns sit at indices 0, 2, 4, 6, 8
        assert_eq!(marked(&messages), vec![(4, 0), (6, 0), (8, 0)]);
    }

    #[test]
    fn test_fewer_turns_than_budget() {
        let mut messages = conversation(0);
        inject_prompt_caching(&mut messages);
        assert_eq!(marked(&messages), vec![(0, 1)]);
    }

    #[test]
    fn test_stale_markers_are_cleared() {
        let mut messages = conversation(2);
        inject_prompt_caching(&mut messages);
        assert_eq!(marked(&messages).len(), 3);

        messages.extend(tool_round("t_next"));
        messages[1].content[0].set_cache_control(Some(CacheControl::Ephemeral));
        inject_prompt_caching(&mut messages);

        assert_eq!(marked(&messages), vec![(2, 0), (4, 0), (6, 0)]);
    }

    #[test]
    fn test_markers_inside_turns_are_cleared() {
        let mut messages = conversation(0);
        messages[0].content[0].set_cache_control(Some(CacheControl::Ephemeral));
        inject_prompt_caching(&mut messages);
        assert_eq!(marked(&messages), vec![(0, 1)]);
    }

    #[test]
    fn test_empty_user_turns_are_skipped() {
        let mut messages = conversation(1);
        messages.push(Message::user());
        inject_prompt_caching(&mut messages);
        assert_eq!(marked(&messages), vec![(0, 1), (2, 0)]);
    }

    #[test]
    fn test_never_more_than_three_markers() {
        for rounds in 0..8 {
            let mut messages = conversation(rounds);
            for message in messages.iter_mut() {
                for block in message.content.iter_mut() {
                    block.set_cache_control(Some(CacheControl::Ephemeral));
                }
            }
            inject_prompt_caching(&mut messages);
            let marks = marked(&messages);
            assert!(marks.len() <= TURN_BREAKPOINTS);
            assert_eq!(marks.len(), (rounds + 1).min(TURN_BREAKPOINTS));
            assert!(marks
                .iter()
                .all(|(m, _)| messages[*m].role == Role::User));
            assert!(!matches!(
                messages[marks[0].0].content.last(),
                Some(MessageContent::ToolUse(_))
            ));
        }
    }
}
