//! These models represent the conversation as it is exchanged with the model backend
//!
//! The message list is sent verbatim on every iteration of the sampling loop, so the
//! structs here serialize directly into the messages API wire format: content blocks are
//! internally tagged by `type`, and every block can carry an optional `cache_control`
//! marker. The loop mutates blocks in place (cache markers, image pruning) and only ever
//! appends whole messages.
pub mod content;
pub mod message;
pub mod role;
pub mod tool;
