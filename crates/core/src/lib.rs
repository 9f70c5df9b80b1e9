pub mod error;
pub mod models;
pub mod prompt;

pub use error::DeskError;
pub use models::*;
pub use prompt::{build_draft_prompt, DraftRequest};
