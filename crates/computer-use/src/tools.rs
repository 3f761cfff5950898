//! Tools the model can invoke, and the registry the sampling loop dispatches through
pub mod base;
pub mod bash;
pub mod collection;
pub mod edit;
pub mod result;

pub use base::Tool;
pub use bash::BashTool;
pub use collection::ToolCollection;
pub use edit::EditTool;
pub use result::ToolResult;
