//! Bounding the number of screenshots carried in the conversation
use crate::models::message::{Message, MessageContent, ToolResultBlock};

fn tool_results_mut(messages: &mut [Message]) -> impl Iterator<Item = &mut ToolResultBlock> {
    messages
        .iter_mut()
        .flat_map(|message| message.content.iter_mut())
        .filter_map(MessageContent::as_tool_result_mut)
}

/// Count the images held in tool results across the conversation
pub fn count_tool_result_images(messages: &[Message]) -> usize {
    messages
        .iter()
        .flat_map(|message| &message.content)
        .filter_map(MessageContent::as_tool_result)
        .map(ToolResultBlock::image_count)
        .sum()
}

/// Drop the oldest images in tool results so that roughly `images_to_keep` remain.
///
/// Images are removed in multiples of `min_removal_threshold`, so up to
/// `min_removal_threshold - 1` extra images may be kept. Removing in fixed chunks keeps
/// the conversation prefix stable for several turns instead of changing it, and
/// invalidating the prompt cache, on every call. `None` disables pruning. Returns the
/// number of images removed.
pub fn filter_to_n_most_recent_images(
    messages: &mut [Message],
    images_to_keep: Option<usize>,
    min_removal_threshold: usize,
) -> usize {
    let Some(images_to_keep) = images_to_keep else {
        return 0;
    };

    let total_images = count_tool_result_images(messages);
    let mut images_to_remove = total_images.saturating_sub(images_to_keep);
    images_to_remove -= images_to_remove % min_removal_threshold.max(1);
    let removed = images_to_remove;

    for result in tool_results_mut(messages) {
        if images_to_remove == 0 {
            break;
        }
        result.content.retain(|content| {
            if content.is_image() && images_to_remove > 0 {
                images_to_remove -= 1;
                false
            } else {
                true
            }
        });
    }

    removed
}
